#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::{Vector2, Vector3};

/// Affine framing applied to every point of a frame: scale, then rotate, then
/// translate.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: f32,
    /// Radians, counter-clockwise.
    pub rotation: f32,
    pub translation: Vector2,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        rotation: 0.0,
        translation: Vector2::ZERO,
    };

    pub fn apply(&self, point: Vector2) -> Vector2 {
        (point * self.scale).rotate(self.rotation) + self.translation
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Camera and motion settings understood by 3D sources.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectSettings {
    pub camera_position: Vector3,
    pub focal_length: f32,
    /// Radians per second about `rotation_axis`.
    pub rotate_speed: f32,
    pub rotation_axis: Vector3,
    /// Accumulated object rotation (Euler angles).
    pub current_rotation: Vector3,
}

impl Default for ObjectSettings {
    fn default() -> Self {
        Self {
            camera_position: Vector3::new(0.0, 0.0, -3.0),
            focal_length: 1.0,
            rotate_speed: 0.0,
            rotation_axis: Vector3::new(1.0, 1.0, 0.0),
            current_rotation: Vector3::ZERO,
        }
    }
}

/// Configuration snapshot handed to a frame source.
///
/// Always replaced as a whole. The producer reads it once at the top of every
/// frame, so an update never lands halfway through one.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameSettings {
    pub transform: Transform,
    /// Present only for sources that render 3D objects.
    pub object: Option<ObjectSettings>,
}

impl FrameSettings {
    pub fn with_object(object: ObjectSettings) -> Self {
        Self {
            transform: Transform::IDENTITY,
            object: Some(object),
        }
    }

    /// Settings for a newly selected source that start from `self`.
    ///
    /// The transform always carries over. Object settings carry over only when
    /// `next` (the new source's own settings) is also a 3D source.
    pub fn carry_over(&self, next: &FrameSettings) -> FrameSettings {
        FrameSettings {
            transform: self.transform,
            object: match (self.object, next.object) {
                (Some(previous), Some(_)) => Some(previous),
                (_, object) => object,
            },
        }
    }
}

/// The object fields driven from parameters.
///
/// Merged into a source's live settings at a frame boundary, so the rotation
/// the source has accumulated since is left alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectParameters {
    pub focal_length: f32,
    pub rotate_speed: f32,
}

impl ObjectParameters {
    /// Overwrite the matching fields. Flat settings are left unchanged.
    pub fn apply(&self, settings: &mut FrameSettings) {
        if let Some(object) = settings.object.as_mut() {
            object.focal_length = self.focal_length;
            object.rotate_speed = self.rotate_speed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_transform_order_is_scale_rotate_translate() {
        let transform = Transform {
            scale: 2.0,
            rotation: FRAC_PI_2,
            translation: Vector2::new(0.5, 0.0),
        };
        let p = transform.apply(Vector2::new(1.0, 0.0));
        assert!((p.x - 0.5).abs() < 1e-5, "got {:?}", p);
        assert!((p.y - 2.0).abs() < 1e-5, "got {:?}", p);
    }

    #[test]
    fn test_carry_over_keeps_object_only_for_3d_targets() {
        let mut object = ObjectSettings::default();
        object.focal_length = 2.5;
        let old = FrameSettings {
            transform: Transform {
                scale: 0.5,
                ..Transform::IDENTITY
            },
            object: Some(object),
        };

        let flat = old.carry_over(&FrameSettings::default());
        assert_eq!(flat.transform.scale, 0.5);
        assert!(flat.object.is_none());

        let solid = old.carry_over(&FrameSettings::with_object(ObjectSettings::default()));
        assert_eq!(solid.object.map(|o| o.focal_length), Some(2.5));
    }

    #[test]
    fn test_object_parameters_keep_rotation() {
        let mut object = ObjectSettings::default();
        object.current_rotation = Vector3::new(0.3, 0.3, 0.0);
        let mut settings = FrameSettings::with_object(object);

        let parameters = ObjectParameters {
            focal_length: 2.0,
            rotate_speed: 1.5,
        };
        parameters.apply(&mut settings);
        let object = settings.object.unwrap();
        assert_eq!(object.focal_length, 2.0);
        assert_eq!(object.rotate_speed, 1.5);
        assert_eq!(object.current_rotation, Vector3::new(0.3, 0.3, 0.0));

        let mut flat = FrameSettings::default();
        parameters.apply(&mut flat);
        assert_eq!(flat, FrameSettings::default());
    }
}
