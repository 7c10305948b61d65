//! Fixed-arity numeric tuple types.
//!
//! These are structural aliases, not a class hierarchy: a 2D point, an RGB
//! color and an RGBA color are all just fixed-length ordered sequences of
//! one scalar type. Arity is checked by the type system; code that must
//! survive runtime-shaped input (the color encoder) accepts slices
//! instead.

/// An ordered pair, typically a 2D point.
pub type Vector2<T> = [T; 2];

/// An ordered triple, typically an RGB color.
pub type Vector3<T> = [T; 3];

/// An ordered 4-tuple, typically an RGBA color or a bounding box.
pub type Vector4<T> = [T; 4];

/// An ordered 5-tuple.
pub type Vector5<T> = [T; 5];

/// An ordered 6-tuple.
pub type Vector6<T> = [T; 6];
