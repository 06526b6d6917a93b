//! Rigid transforms for body frames and offsets.

use nalgebra::{Isometry3, Point3, Quaternion, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::quantity::parse_optional_list;
use crate::units::{Quantity, UnitContext};

/// Position and orientation of a frame.
///
/// # Example
///
/// ```
/// use sim_sml::Pose;
/// use nalgebra::Point3;
///
/// let body = Pose::from_position(Point3::new(0.0, 0.0, 1.0));
/// let offset = Pose::from_position(Point3::new(1.0, 0.0, 0.0));
/// let world = body.compose(&offset);
/// assert_eq!(world.position, Point3::new(1.0, 0.0, 1.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose {
    /// Position of the frame origin.
    pub position: Point3<f64>,
    /// Orientation as a unit quaternion.
    pub rotation: UnitQuaternion<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    /// Identity pose (origin, no rotation).
    #[must_use]
    pub fn identity() -> Self {
        Self {
            position: Point3::origin(),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Pose from position only.
    #[must_use]
    pub fn from_position(position: Point3<f64>) -> Self {
        Self {
            position,
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Pose from position and rotation.
    #[must_use]
    pub const fn from_position_rotation(
        position: Point3<f64>,
        rotation: UnitQuaternion<f64>,
    ) -> Self {
        Self { position, rotation }
    }

    /// Convert to an isometry.
    #[must_use]
    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(self.position.coords.into(), self.rotation)
    }

    /// Transform a point from this frame into the parent frame.
    #[must_use]
    pub fn transform_point(&self, local: &Point3<f64>) -> Point3<f64> {
        self.position + self.rotation * local.coords
    }

    /// Inverse transform.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let inv_rotation = self.rotation.inverse();
        Self {
            position: Point3::from(-(inv_rotation * self.position.coords)),
            rotation: inv_rotation,
        }
    }

    /// Compose two poses: `self * other`.
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            position: self.transform_point(&other.position),
            rotation: self.rotation * other.rotation,
        }
    }

    /// Decode a transform literal in document units.
    ///
    /// Accepts 3 values (`x y z`) or 7 values (`x y z qx qy qz qw`). The
    /// translation is scaled to internal length units and the quaternion is
    /// normalized. A missing or blank literal is the identity.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Format`] for bad tokens, any other component
    /// count, or a zero quaternion.
    pub fn from_literal(literal: Option<&str>, units: &UnitContext) -> Result<Self, BuildError> {
        let Some(values) = parse_optional_list(literal)? else {
            return Ok(Self::identity());
        };
        let (translation, quat) = match values.as_slice() {
            [x, y, z] => ([*x, *y, *z], None),
            [x, y, z, qx, qy, qz, qw] => ([*x, *y, *z], Some([*qx, *qy, *qz, *qw])),
            _ => {
                return Err(BuildError::format(format!(
                    "transform needs 3 or 7 values, got {}",
                    values.len()
                )));
            }
        };
        let position = Point3::from(Vector3::from(translation) * units.factor(Quantity::Length));
        let Some([qx, qy, qz, qw]) = quat else {
            return Ok(Self::from_position(position));
        };

        // Quaternion is written x y z w.
        let q = Quaternion::new(qw, qx, qy, qz);
        if q.norm() < 1e-12 {
            return Err(BuildError::format("transform quaternion has zero length"));
        }
        Ok(Self::from_position_rotation(
            position,
            UnitQuaternion::from_quaternion(q),
        ))
    }

    /// Translation part as a vector.
    #[must_use]
    pub fn translation(&self) -> Vector3<f64> {
        self.position.coords
    }
}
