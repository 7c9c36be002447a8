//! Plain geometric value types and the parametric shapes a frame is built from.

/// Ordered collections of shapes traced as one image.
pub mod frame;
/// Parametric curves sampled over `t ∈ [0, 1]`.
pub mod shape;
/// 2D and 3D vector value types.
pub mod vector;

pub use frame::Frame;
pub use shape::{CubicBezier, Ellipse, Line, Shape};
pub use vector::{Vector2, Vector3};
