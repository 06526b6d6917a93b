//! SML (Simulation Markup Language) scene loader.
//!
//! This crate reads SML documents, which describe rigid bodies, the offset
//! frames joints attach to, and the joints themselves, and builds them into a
//! linked scene graph ready for simulation.
//!
//! # Features
//!
//! - Per-document units (`<units length="mm" mass="g"/>`), converted to SI
//! - Mass and inertia from mesh geometry and density (STL and OBJ meshes)
//! - Explicit mass, with or without an explicit inertia tensor
//! - Absolute and relative offset frames, created once per joint endpoint
//! - Six-slot locked/free degree-of-freedom masks
//! - Best-effort builds: a bad entity is skipped and reported, never fatal
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. Output goes
//! through the [`SceneSink`] trait, so any engine can receive the scene;
//! [`SceneGraph`] is an in-memory implementation.
//!
//! # Example
//!
//! ```
//! use sim_sml::load_sml_str;
//!
//! let sml = r#"
//!     <model name="empty">
//!         <units length="mm"/>
//!         <joint name="j">
//!             <parent name="missing"/>
//!             <child name="also_missing"/>
//!         </joint>
//!     </model>
//! "#;
//!
//! let scene = load_sml_str(sml, ".").expect("should parse");
//! assert_eq!(scene.build.model.name, "empty");
//!
//! // The joint refers to bodies that do not exist: it is skipped and reported.
//! assert!(scene.build.model.joint("j").is_none());
//! assert_eq!(scene.build.diagnostics.len(), 1);
//! ```
//!
//! # Document Structure
//!
//! - `<model name="...">` - Root element
//! - `<units length="..." mass="..." time="..."/>` - Document units
//! - `<rigid name="...">` - Rigid body
//!   - `<mesh>` - Mesh file, relative to the document
//!   - `<density>` - Derive mass and inertia from the mesh
//!   - `<mass>`, `<inertia>` - Explicit mass properties (when no density)
//!   - `<position>` - Placement, `x y z` or `x y z qx qy qz qw`
//! - `<joint name="...">` - Joint between two frames
//!   - `<parent name="body">`, `<child name="body">` - Endpoints
//!   - `<offset type="absolute|relative">` - Endpoint offset frame
//!   - `<dof index="0..5"/>` - Free degree of freedom
//!
//! # Errors
//!
//! Only a missing or malformed document is an error ([`SmlError`]). Problems
//! with single entities are returned as [`Diagnostic`]s next to the model.

#![doc(html_root_url = "https://docs.rs/sim-sml/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::redundant_closure_for_method_calls,
    clippy::should_implement_trait,
    clippy::option_if_let_else,
    clippy::doc_markdown,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::suboptimal_flops,
    clippy::too_many_lines,
    clippy::use_self
)]

mod body;
mod config;
mod document;
mod error;
mod geometry;
mod joint;
pub mod mesh;
mod model;
mod offset;
mod parser;
mod pose;
mod quantity;
mod scene;
mod sink;
mod types;
mod units;

pub use config::SceneParams;
pub use document::{Element, parse_document};
pub use error::{
    BuildError, Diagnostic, EntityKind, ErrorKind, ResolutionError, Result, SmlError,
};
pub use geometry::{
    GeometryService, MeshInertia, MeshInertiaService, inertia_from_values, principal_axes,
};
pub use joint::{DofMask, parse_dof_index};
pub use model::{
    BodyId, Frame, Joint, JointId, Model, Offset, OffsetId, OffsetKind, RigidBody,
};
pub use parser::{model_from_element, parse_sml_str};
pub use pose::Pose;
pub use quantity::{
    Arity, parse_float_list, parse_literal, parse_optional_list, parse_optional_scalar,
    parse_scalar, parse_vector,
};
pub use scene::{Build, LoadedScene, Scene, UNNAMED_MODEL, load_sml_file, load_sml_str};
pub use sink::{NodeHandle, NodeKind, SceneGraph, SceneNode, SceneSink};
pub use types::{EndpointRole, SmlDof, SmlEndpoint, SmlJoint, SmlModel, SmlOffset, SmlRigid};
pub use units::{
    Quantity, UnitCategory, UnitChoice, UnitContext, UnitRegistry, UnitResolution,
};
