//! Shared data model for the detection exploration widgets.
//!
//! These types define the vocabulary the scatter plot, image overlay,
//! score table and parameter forms exchange: images, categories,
//! detection annotations, raw model predictions, tunable-parameter
//! descriptions, and the fixed-arity numeric tuples used for points and
//! colors. They are value types with documented invariants and no
//! behavior - the widgets copy them, the
//! [`color`](crate::color) encoder renders the numeric ones, and
//! [`validation`](crate::validation) checks what the types cannot
//! express.
//!
//! # Design Principles
//!
//! 1. **Type Safety**: Newtype ids keep image, category and annotation
//!    identifiers from being mixed up at compile time.
//!
//! 2. **Canonical Conventions**: Bounding boxes are
//!    `[x, y, width, height]` in pixel coordinates, top-left origin.
//!
//! 3. **Permissive Construction**: "Invalid" data (zero-sized images,
//!    dangling category references) is representable, so that validation
//!    can report issues rather than parsing panicking.

mod annotation;
mod ids;
mod parameter;
mod vector;

// Re-export core types for convenient access
pub use annotation::{Annotation, Category, ImageMetadata, Prediction, PredictionBox};
pub use ids::{AnnotationId, CategoryId, ImageId};
pub use parameter::{ParameterDescription, ParameterType, ParameterValue};
pub use vector::{Vector2, Vector3, Vector4, Vector5, Vector6};
