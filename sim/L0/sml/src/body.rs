//! Rigid body construction.
//!
//! Mass properties come from one of two sources:
//!
//! - `<density>`: mass and inertia integrated over the mesh.
//! - `<mass>`: the given mass with either the given `<inertia>` or the mesh's
//!   inertia rescaled to that mass.
//!
//! The mesh is required in both cases: it locates the centre of mass and is
//! attached to the scene as visual and collision geometry.

use std::path::Path;

use nalgebra::Vector3;

use crate::error::{BuildError, Diagnostic, EntityKind};
use crate::geometry::{GeometryService, inertia_from_values, principal_axes};
use crate::model::RigidBody;
use crate::pose::Pose;
use crate::quantity::{parse_optional_list, parse_optional_scalar};
use crate::scene::SceneBuilder;
use crate::sink::SceneSink;
use crate::types::SmlRigid;
use crate::units::Quantity;

/// Mass properties resolved for one body.
struct Inertial {
    mass: f64,
    inertia: Vector3<f64>,
    frame: Pose,
}

impl<S: SceneSink, G: GeometryService> SceneBuilder<'_, S, G> {
    /// Build one `<rigid>` declaration. Failures are recorded, never raised.
    pub(crate) fn process_rigid(&mut self, index: usize, decl: &SmlRigid) {
        let Some(name) = decl.name.as_deref() else {
            self.record(Diagnostic::new(
                EntityKind::Rigid,
                format!("<rigid #{index}>"),
                BuildError::incomplete("rigid body has no name"),
            ));
            return;
        };
        tracing::debug!(rigid = name, "processing rigid body");

        if !self.declare(EntityKind::Rigid, name) {
            self.record(Diagnostic::new(
                EntityKind::Rigid,
                name,
                BuildError::duplicate(EntityKind::Rigid, name),
            ));
            return;
        }

        if let Err(e) = self.build_rigid(name, decl) {
            self.record(Diagnostic::new(EntityKind::Rigid, name, e));
        }
    }

    fn build_rigid(&mut self, name: &str, decl: &SmlRigid) -> Result<(), BuildError> {
        let mesh = decl
            .mesh
            .as_deref()
            .ok_or_else(|| BuildError::incomplete("rigid body has no <mesh> reference"))?;
        let mesh = self.base_dir.join(mesh);

        let placement = Pose::from_literal(decl.position.as_deref(), &self.model.units)?;
        let Inertial {
            mass,
            inertia,
            frame,
        } = self.inertial(decl, &mesh, &placement)?;

        let node = self
            .sink
            .create_rigid_body_node(self.model.node, name, &frame, mass, &inertia);
        self.sink.set_visible(node, self.params.show_rigid);
        self.sink.set_display_scale(node, self.params.show_rigid_scale);
        if self.params.attach_meshes {
            self.sink.attach_visual_model(node, &mesh);
            self.sink.attach_collision_mesh(node, &mesh);
        }

        self.model.add_body(RigidBody {
            name: name.to_string(),
            mesh,
            placement,
            frame,
            mass,
            inertia,
            node,
        });
        Ok(())
    }

    fn inertial(
        &self,
        decl: &SmlRigid,
        mesh: &Path,
        placement: &Pose,
    ) -> Result<Inertial, BuildError> {
        let units = &self.model.units;
        let length_scale = units.factor(Quantity::Length);
        let density = parse_optional_scalar(decl.density.as_deref())?;
        let mass = parse_optional_scalar(decl.mass.as_deref())?;

        match (density, mass) {
            (Some(density), _) => {
                if mass.is_some() {
                    tracing::debug!("<mass> ignored when <density> is given");
                }
                let density = units.to_internal(Quantity::Density, density);
                let mi = self
                    .geometry
                    .load_mesh_inertia(mesh, density, placement, length_scale)?;
                Ok(Inertial {
                    mass: mi.mass,
                    inertia: mi.inertia,
                    frame: mi.frame,
                })
            }
            (None, Some(mass)) => {
                let mass = units.to_internal(Quantity::Mass, mass);
                let unit = self
                    .geometry
                    .load_mesh_inertia(mesh, 1.0, placement, length_scale)?;

                if let Some(values) = parse_optional_list(decl.inertia.as_deref())? {
                    // Given about the centre of mass, in the placement axes.
                    let local = inertia_from_values(&values)? * units.factor(Quantity::Inertia);
                    let r = placement.rotation.to_rotation_matrix();
                    let world = r.matrix() * local * r.matrix().transpose();
                    let (moments, axes) = principal_axes(&world);
                    return Ok(Inertial {
                        mass,
                        inertia: moments,
                        frame: Pose::from_position_rotation(unit.frame.position, axes),
                    });
                }

                if unit.mass <= 0.0 {
                    return Err(BuildError::geometry(format!(
                        "{} encloses no volume; give <inertia> with <mass>",
                        mesh.display()
                    )));
                }
                Ok(Inertial {
                    mass,
                    inertia: unit.inertia * (mass / unit.mass),
                    frame: unit.frame,
                })
            }
            (None, None) => Err(BuildError::incomplete(
                "rigid body needs <density> or <mass>",
            )),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::SceneParams;
    use crate::error::ErrorKind;
    use crate::geometry::MeshInertiaService;
    use crate::mesh::tests::box_obj;
    use crate::model::Model;
    use crate::sink::{NodeKind, SceneGraph};
    use crate::units::{UnitContext, UnitRegistry};
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn run(
        dir: &Path,
        units: UnitContext,
        params: &SceneParams,
        rigids: &[SmlRigid],
    ) -> (Model, Vec<Diagnostic>, SceneGraph) {
        let mut graph = SceneGraph::new();
        let node = graph.create_model_node("m");
        let (model, diagnostics) = {
            let mut b = SceneBuilder::new(
                &mut graph,
                &MeshInertiaService,
                params,
                dir,
                Model::new("m", units, node),
            );
            for (i, r) in rigids.iter().enumerate() {
                b.process_rigid(i, r);
            }
            (b.model, b.diagnostics)
        };
        (model, diagnostics, graph)
    }

    fn cube_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cube.obj"), box_obj(1.0, 1.0, 1.0)).unwrap();
        std::fs::write(dir.path().join("cube_mm.obj"), box_obj(100.0, 100.0, 100.0)).unwrap();
        dir
    }

    fn mm_g() -> UnitContext {
        UnitContext::si()
            .resolve(
                &[
                    ("length".to_string(), "mm".to_string()),
                    ("mass".to_string(), "g".to_string()),
                ],
                &UnitRegistry::standard(),
            )
            .context
    }

    #[test]
    fn test_density_body() {
        let dir = cube_dir();
        let rigid = SmlRigid::new("a", "cube.obj")
            .with_density("1000")
            .with_position("0 0 1");
        let (model, diags, graph) =
            run(dir.path(), UnitContext::si(), &SceneParams::default(), &[rigid]);

        assert!(diags.is_empty(), "{diags:?}");
        let body = model.body("a").unwrap();
        assert_relative_eq!(body.mass, 1000.0, epsilon = 1e-9);
        assert_relative_eq!(body.inertia[0], 1000.0 / 6.0, epsilon = 1e-9);
        assert_relative_eq!(body.frame.position, Point3::new(0.5, 0.5, 1.5), epsilon = 1e-12);
        assert_eq!(body.placement.position, Point3::new(0.0, 0.0, 1.0));
        assert_eq!(body.mesh, dir.path().join("cube.obj"));

        let node = graph.node(body.node).unwrap();
        assert!(matches!(node.kind, NodeKind::RigidBody { .. }));
        assert!(!node.visible);
        assert_eq!(node.display_scale, Some(0.5));
        assert_eq!(node.visual.as_deref(), Some(body.mesh.as_path()));
        assert_eq!(node.collision.as_deref(), Some(body.mesh.as_path()));
    }

    #[test]
    fn test_density_in_document_units() {
        let dir = cube_dir();
        // 100 mm cube at 0.001 g/mm³ (= 1000 kg/m³) weighs 1 kg.
        let rigid = SmlRigid::new("a", "cube_mm.obj").with_density("0.001");
        let (model, diags, _) = run(dir.path(), mm_g(), &SceneParams::default(), &[rigid]);

        assert!(diags.is_empty(), "{diags:?}");
        let body = model.body("a").unwrap();
        assert_relative_eq!(body.mass, 1.0, epsilon = 1e-9);
        assert_relative_eq!(body.frame.position, Point3::new(0.05, 0.05, 0.05), epsilon = 1e-12);
    }

    #[test]
    fn test_mass_rescales_mesh_inertia() {
        let dir = cube_dir();
        let rigid = SmlRigid::new("a", "cube.obj").with_mass("6");
        let (model, diags, _) =
            run(dir.path(), UnitContext::si(), &SceneParams::default(), &[rigid]);

        assert!(diags.is_empty(), "{diags:?}");
        let body = model.body("a").unwrap();
        assert_relative_eq!(body.mass, 6.0, epsilon = 1e-12);
        for i in 0..3 {
            assert_relative_eq!(body.inertia[i], 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_mass_with_explicit_inertia() {
        let dir = cube_dir();
        let rigid = SmlRigid::new("a", "cube_mm.obj")
            .with_mass("500")
            .with_inertia("1000 2000 3000");
        let (model, diags, _) = run(dir.path(), mm_g(), &SceneParams::default(), &[rigid]);

        assert!(diags.is_empty(), "{diags:?}");
        let body = model.body("a").unwrap();
        assert_relative_eq!(body.mass, 0.5, epsilon = 1e-12);
        // g·mm² → kg·m² is 1e-9.
        let mut moments: Vec<f64> = body.inertia.iter().copied().collect();
        moments.sort_by(f64::total_cmp);
        assert_relative_eq!(moments[0], 1e-6, epsilon = 1e-12);
        assert_relative_eq!(moments[2], 3e-6, epsilon = 1e-12);
        assert_relative_eq!(body.frame.position, Point3::new(0.05, 0.05, 0.05), epsilon = 1e-12);
    }

    #[test]
    fn test_missing_mesh_skips_body() {
        let dir = cube_dir();
        let rigids = [
            SmlRigid {
                name: Some("a".into()),
                density: Some("1".into()),
                ..Default::default()
            },
            SmlRigid::new("b", "cube.obj").with_density("1"),
        ];
        let (model, diags, _) =
            run(dir.path(), UnitContext::si(), &SceneParams::default(), &rigids);

        assert!(model.body("a").is_none());
        assert!(model.body("b").is_some());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].entity_name, "a");
        assert_eq!(diags[0].kind(), ErrorKind::IncompleteSpecification);
    }

    #[test]
    fn test_neither_density_nor_mass() {
        let dir = cube_dir();
        let rigid = SmlRigid::new("a", "cube.obj");
        let (model, diags, graph) =
            run(dir.path(), UnitContext::si(), &SceneParams::default(), &[rigid]);

        assert_eq!(model.body_count(), 0);
        assert_eq!(diags[0].kind(), ErrorKind::IncompleteSpecification);
        // Only the model node exists.
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_duplicate_name_keeps_first() {
        let dir = cube_dir();
        let rigids = [
            SmlRigid::new("a", "cube.obj").with_density("1"),
            SmlRigid::new("a", "cube.obj").with_density("2"),
        ];
        let (model, diags, _) =
            run(dir.path(), UnitContext::si(), &SceneParams::default(), &rigids);

        assert_eq!(model.body_count(), 1);
        assert_relative_eq!(model.body("a").unwrap().mass, 1.0, epsilon = 1e-12);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind(), ErrorKind::DuplicateEntity);
    }

    #[test]
    fn test_failed_body_still_claims_its_name() {
        let dir = cube_dir();
        let rigids = [
            SmlRigid::new("a", "cube.obj"),
            SmlRigid::new("a", "cube.obj").with_density("7"),
            SmlRigid::new("b", "cube.obj").with_density("1"),
        ];
        let (model, diags, _) =
            run(dir.path(), UnitContext::si(), &SceneParams::default(), &rigids);

        assert!(model.body("a").is_none());
        assert!(model.body("b").is_some());
        let kinds: Vec<_> = diags.iter().map(Diagnostic::kind).collect();
        assert_eq!(
            kinds,
            vec![ErrorKind::IncompleteSpecification, ErrorKind::DuplicateEntity]
        );
        assert!(diags.iter().all(|d| d.entity_name == "a"));
    }

    #[test]
    fn test_unnamed_and_malformed() {
        let dir = cube_dir();
        let rigids = [
            SmlRigid {
                mesh: Some("cube.obj".into()),
                density: Some("1".into()),
                ..Default::default()
            },
            SmlRigid::new("b", "cube.obj").with_density("heavy"),
            SmlRigid::new("c", "cube.obj")
                .with_density("1")
                .with_position("1 2"),
            SmlRigid::new("d", "missing.obj").with_density("1"),
        ];
        let (model, diags, _) =
            run(dir.path(), UnitContext::si(), &SceneParams::default(), &rigids);

        assert_eq!(model.body_count(), 0);
        let kinds: Vec<_> = diags.iter().map(|d| (d.entity_name.as_str(), d.kind())).collect();
        assert_eq!(
            kinds,
            vec![
                ("<rigid #0>", ErrorKind::IncompleteSpecification),
                ("b", ErrorKind::Format),
                ("c", ErrorKind::Format),
                ("d", ErrorKind::Geometry),
            ]
        );
    }

    #[test]
    fn test_display_preferences_and_no_attach() {
        let dir = cube_dir();
        let params = SceneParams::default()
            .with_show_rigid(true)
            .with_show_rigid_scale(0.2)
            .with_attach_meshes(false);
        let rigid = SmlRigid::new("a", "cube.obj").with_density("1");
        let (model, _, graph) = run(dir.path(), UnitContext::si(), &params, &[rigid]);

        let node = graph.node(model.body("a").unwrap().node).unwrap();
        assert!(node.visible);
        assert_eq!(node.display_scale, Some(0.2));
        assert!(node.visual.is_none());
        assert!(node.collision.is_none());
    }
}
