//! Core domain entities shared by the visualization widgets.
//!
//! These are passive value types: the scatter plot, image overlay, score
//! table and forms all copy them around, but no behavior lives here beyond
//! construction helpers. Invariants that cannot be expressed in the types
//! (positive image dimensions, resolvable category references) are checked
//! by [`validation`](crate::validation), not enforced on construction.

use serde::{Deserialize, Serialize};

use super::ids::{AnnotationId, CategoryId, ImageId};
use super::vector::Vector4;

/// Metadata for one source image. Immutable once loaded.
///
/// Width and height are declared in pixels and expected to be positive;
/// zero dimensions are representable and flagged by validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Unique identifier for this image.
    pub id: ImageId,

    /// Filename or path of the image, relative to the dataset file.
    pub file_name: String,

    /// Width of the image in pixels.
    pub width: u32,

    /// Height of the image in pixels.
    pub height: u32,
}

impl ImageMetadata {
    /// Creates new image metadata with the given properties.
    pub fn new(id: impl Into<ImageId>, file_name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            width,
            height,
        }
    }
}

/// A category (class label) in the closed lookup table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier for this category.
    pub id: CategoryId,

    /// Name of the category (e.g., "person", "car", "dog").
    pub name: String,
}

impl Category {
    /// Creates a new category with the given properties.
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One detected object instance.
///
/// The bounding box is `[x, y, width, height]` in image pixel coordinates
/// with the origin at the top-left corner (the COCO convention).
/// Classification-only detections carry no box.
///
/// The image association is carried externally - annotations live grouped
/// per image id inside [`Dataset`](crate::dataset::Dataset), not here.
///
/// `category_id` is a foreign key into the category table and may have no
/// match there; consumers must then fall back to `label` (displayed
/// verbatim) when it is present. That degradation is the caller's
/// responsibility - nothing here enforces it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Unique identifier for this annotation.
    pub id: AnnotationId,

    /// ID of the category (class) for this annotation, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,

    /// Fallback label for when `category_id` has no match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Confidence score (e.g., from model predictions). Ground-truth
    /// annotations usually omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// Bounding box as `[x, y, width, height]` in pixel coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vector4<f64>>,
}

impl Annotation {
    /// Creates a new annotation with a resolved category and a box.
    pub fn new(
        id: impl Into<AnnotationId>,
        category_id: impl Into<CategoryId>,
        bbox: Vector4<f64>,
    ) -> Self {
        Self {
            id: id.into(),
            category_id: Some(category_id.into()),
            label: None,
            score: None,
            bbox: Some(bbox),
        }
    }

    /// Adds a fallback label to the annotation.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Adds a confidence score to the annotation.
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Returns the box corners as `(xmin, ymin, xmax, ymax)`, if a box is
    /// present.
    #[inline]
    pub fn corners(&self) -> Option<(f64, f64, f64, f64)> {
        self.bbox.map(|[x, y, w, h]| (x, y, x + w, y + h))
    }
}

/// A raw detector output box, corner-point form.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

/// Raw output of an object detection or classification model, before it is
/// reconciled with the category table.
///
/// Detection pipelines emit label/score/box triples; classification
/// pipelines emit label/score with no box. Every field is optional so the
/// type is total over what models actually return.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted class label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Confidence score in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// Predicted box, corner-point form.
    #[serde(default, rename = "box", skip_serializing_if = "Option::is_none")]
    pub bbox: Option<PredictionBox>,
}

impl Prediction {
    /// Converts a raw prediction into an annotation.
    ///
    /// The corner-point box becomes `[x, y, width, height]`. The category
    /// id is left unresolved; normalization in
    /// [`scoring`](crate::scoring) resolves it from the label against the
    /// category table.
    pub fn into_annotation(self, id: impl Into<AnnotationId>) -> Annotation {
        Annotation {
            id: id.into(),
            category_id: None,
            label: self.label,
            score: self.score,
            bbox: self.bbox.map(|b| [b.xmin, b.ymin, b.xmax - b.xmin, b.ymax - b.ymin]),
        }
    }
}
