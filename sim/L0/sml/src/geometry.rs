//! Mass properties from mesh geometry.
//!
//! The [`GeometryService`] trait is the seam between the rigid body builder
//! and whatever computes inertia from a mesh. [`MeshInertiaService`] is the
//! default: it loads the mesh with [`crate::mesh`] and integrates a uniform
//! density solid.

use std::path::Path;

use nalgebra::{Matrix3, Point3, Rotation3, UnitQuaternion, Vector3};
use tracing::debug;

use crate::error::BuildError;
use crate::mesh::load_mesh;
use crate::pose::Pose;

/// Mass properties of a body derived from its mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshInertia {
    /// Total mass.
    pub mass: f64,
    /// Enclosed volume.
    pub volume: f64,
    /// Principal moments of inertia, about [`Self::frame`]'s axes.
    pub inertia: Vector3<f64>,
    /// Centre of mass and principal axes, in the frame the placement is
    /// expressed in.
    pub frame: Pose,
}

/// Computes body mass properties from a mesh file.
pub trait GeometryService {
    /// Load `path` and integrate a solid of uniform `density`.
    ///
    /// Mesh vertices are multiplied by `length_scale` to bring them into
    /// internal units. The returned frame is `placement` composed with the
    /// mesh's centre of mass and principal axes.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Geometry`] if the mesh cannot be loaded.
    fn load_mesh_inertia(
        &self,
        path: &Path,
        density: f64,
        placement: &Pose,
        length_scale: f64,
    ) -> Result<MeshInertia, BuildError>;
}

/// Default geometry service backed by STL/OBJ loading.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshInertiaService;

impl GeometryService for MeshInertiaService {
    fn load_mesh_inertia(
        &self,
        path: &Path,
        density: f64,
        placement: &Pose,
        length_scale: f64,
    ) -> Result<MeshInertia, BuildError> {
        let mesh = load_mesh(path)
            .map_err(|e| BuildError::geometry(format!("{}: {e}", path.display())))?
            .scaled(length_scale);
        let props = mesh.mass_properties();

        let (moments, axes) = principal_axes(&(props.inertia * density));
        let com = Pose::from_position_rotation(Point3::from(props.center_of_mass), axes);

        debug!(
            mesh = %path.display(),
            volume = props.volume,
            faces = mesh.faces.len(),
            "computed mesh inertia"
        );

        Ok(MeshInertia {
            mass: props.volume * density,
            volume: props.volume,
            inertia: moments,
            frame: placement.compose(&com),
        })
    }
}

/// Diagonalize a symmetric inertia tensor.
///
/// Returns the principal moments and the rotation whose columns are the
/// principal axes. The rotation is kept right-handed. A tensor that is
/// already diagonal keeps the identity rotation, so symmetric solids do not
/// pick up arbitrary axes from round-off.
pub fn principal_axes(inertia: &Matrix3<f64>) -> (Vector3<f64>, UnitQuaternion<f64>) {
    let off_diagonal = inertia[(0, 1)].abs() + inertia[(0, 2)].abs() + inertia[(1, 2)].abs();
    if off_diagonal <= 1e-12 * inertia.trace().abs() {
        return (inertia.diagonal().map(f64::abs), UnitQuaternion::identity());
    }

    let eigen = inertia.symmetric_eigen();
    let moments = eigen.eigenvalues.map(f64::abs);

    let mut rot = eigen.eigenvectors;
    if rot.determinant() < 0.0 {
        rot.set_column(2, &(-rot.column(2)));
    }
    (
        moments,
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix(&rot)),
    )
}

/// Build a symmetric inertia tensor from a literal's values.
///
/// Three values are a diagonal; six are `ixx iyy izz ixy ixz iyz`.
///
/// # Errors
///
/// Returns [`BuildError::Format`] for any other count.
pub fn inertia_from_values(values: &[f64]) -> Result<Matrix3<f64>, BuildError> {
    match *values {
        [ixx, iyy, izz] => Ok(Matrix3::from_diagonal(&Vector3::new(ixx, iyy, izz))),
        [ixx, iyy, izz, ixy, ixz, iyz] => Ok(Matrix3::new(
            ixx, ixy, ixz, //
            ixy, iyy, iyz, //
            ixz, iyz, izz,
        )),
        _ => Err(BuildError::format(format!(
            "inertia needs 3 or 6 values, got {}",
            values.len()
        ))),
    }
}
