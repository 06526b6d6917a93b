//! Scene assembly.
//!
//! A build runs in a fixed order: units, then every rigid body, then every
//! joint (which creates offsets on demand). Per-entity failures are logged
//! and collected in [`Build::diagnostics`]; only a missing or unparsable
//! document aborts the build.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::SceneParams;
use crate::error::{Diagnostic, EntityKind, Result, SmlError};
use crate::geometry::{GeometryService, MeshInertiaService};
use crate::model::Model;
use crate::parser::parse_sml_str;
use crate::sink::{SceneGraph, SceneSink};
use crate::types::SmlModel;

/// Name used when neither the caller nor the document gives one.
pub const UNNAMED_MODEL: &str = "unnamed";

/// Outcome of a build: whatever was created plus what went wrong.
#[derive(Debug, Clone)]
pub struct Build {
    /// The built model.
    pub model: Model,
    /// Per-entity failures, in the order they happened.
    pub diagnostics: Vec<Diagnostic>,
}

impl Build {
    /// Whether every declaration was built.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Diagnostics raised by the entity with this name.
    pub fn diagnostics_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.entity_name == name)
    }
}

/// A build into the in-memory [`SceneGraph`].
#[derive(Debug, Clone)]
pub struct LoadedScene {
    /// Model and diagnostics.
    pub build: Build,
    /// Every node that was created.
    pub graph: SceneGraph,
}

/// Configured scene build.
///
/// # Example
///
/// ```no_run
/// use sim_sml::{MeshInertiaService, Scene, SceneGraph, SceneParams};
///
/// let mut graph = SceneGraph::new();
/// let build = Scene::new()
///     .with_name("arm")
///     .with_params(SceneParams::default().with_show_rigid(true))
///     .build_file("robot/arm.sml", &mut graph, &MeshInertiaService)
///     .expect("document should load");
///
/// for d in &build.diagnostics {
///     eprintln!("{d}");
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Scene {
    name: Option<String>,
    params: SceneParams,
}

impl Scene {
    /// Scene with default parameters and the document's own name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the model name given in the document.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set build parameters.
    #[must_use]
    pub fn with_params(mut self, params: SceneParams) -> Self {
        self.params = params;
        self
    }

    /// Build parameters.
    pub fn params(&self) -> &SceneParams {
        &self.params
    }

    /// Load and build a document from disk.
    ///
    /// Mesh paths resolve against the document's directory.
    ///
    /// # Errors
    ///
    /// [`SmlError::DocumentNotFound`] if `path` does not exist, otherwise any
    /// read or parse failure. Per-entity problems never fail the build.
    pub fn build_file<S: SceneSink, G: GeometryService>(
        &self,
        path: impl AsRef<Path>,
        sink: &mut S,
        geometry: &G,
    ) -> Result<Build> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SmlError::DocumentNotFound {
                path: path.to_path_buf(),
            });
        }
        let xml = std::fs::read_to_string(path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        self.build_str(&xml, &base_dir, sink, geometry)
    }

    /// Build a document held in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the XML is malformed or has no root element.
    pub fn build_str<S: SceneSink, G: GeometryService>(
        &self,
        xml: &str,
        base_dir: &Path,
        sink: &mut S,
        geometry: &G,
    ) -> Result<Build> {
        let decl = parse_sml_str(xml)?;
        Ok(self.build(&decl, base_dir, sink, geometry))
    }

    /// Build already parsed declarations. Never fails as a whole.
    pub fn build<S: SceneSink, G: GeometryService>(
        &self,
        decl: &SmlModel,
        base_dir: &Path,
        sink: &mut S,
        geometry: &G,
    ) -> Build {
        let name = self
            .name
            .as_deref()
            .or(decl.name.as_deref())
            .unwrap_or(UNNAMED_MODEL)
            .to_string();
        tracing::info!(model = %name, "building scene");

        let (units, unit_errors) = match &decl.units {
            Some(declared) => {
                let resolution = self.params.units.resolve(declared, &self.params.registry);
                (resolution.context, resolution.errors)
            }
            None => (self.params.units.clone(), Vec::new()),
        };

        let node = sink.create_model_node(&name);
        let model = Model::new(name, units, node);
        let mut builder = SceneBuilder::new(sink, geometry, &self.params, base_dir, model);

        for error in unit_errors {
            builder.record(Diagnostic::new(EntityKind::Units, "units", error));
        }
        for (index, rigid) in decl.rigids.iter().enumerate() {
            builder.process_rigid(index, rigid);
        }
        for (index, joint) in decl.joints.iter().enumerate() {
            builder.process_joint(index, joint);
        }

        builder.finish()
    }
}

/// Per-build state shared by the rigid body, offset and joint builders.
pub(crate) struct SceneBuilder<'a, S, G> {
    pub(crate) sink: &'a mut S,
    pub(crate) geometry: &'a G,
    pub(crate) params: &'a SceneParams,
    pub(crate) base_dir: &'a Path,
    pub(crate) model: Model,
    pub(crate) diagnostics: Vec<Diagnostic>,
    /// Every name declared so far, whether or not it built.
    declared: HashSet<(EntityKind, String)>,
}

impl<'a, S: SceneSink, G: GeometryService> SceneBuilder<'a, S, G> {
    pub(crate) fn new(
        sink: &'a mut S,
        geometry: &'a G,
        params: &'a SceneParams,
        base_dir: &'a Path,
        model: Model,
    ) -> Self {
        Self {
            sink,
            geometry,
            params,
            base_dir,
            model,
            diagnostics: Vec::new(),
            declared: HashSet::new(),
        }
    }

    /// Claim `name` for this build. Returns `false` if an earlier
    /// declaration of the same kind already used it.
    pub(crate) fn declare(&mut self, kind: EntityKind, name: &str) -> bool {
        self.declared.insert((kind, name.to_string()))
    }

    /// Log and keep a per-entity failure.
    pub(crate) fn record(&mut self, diagnostic: Diagnostic) {
        tracing::warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    fn finish(self) -> Build {
        tracing::info!(
            model = %self.model.name,
            bodies = self.model.body_count(),
            offsets = self.model.offset_count(),
            joints = self.model.joint_count(),
            errors = self.diagnostics.len(),
            "scene built"
        );
        Build {
            model: self.model,
            diagnostics: self.diagnostics,
        }
    }
}

/// Load an SML file into a fresh [`SceneGraph`] with default parameters.
///
/// # Errors
///
/// See [`Scene::build_file`].
pub fn load_sml_file(path: impl AsRef<Path>) -> Result<LoadedScene> {
    let mut graph = SceneGraph::new();
    let build = Scene::new().build_file(path, &mut graph, &MeshInertiaService)?;
    Ok(LoadedScene { build, graph })
}

/// Load an SML string into a fresh [`SceneGraph`] with default parameters.
///
/// Mesh paths resolve against `base_dir`.
///
/// # Errors
///
/// See [`Scene::build_str`].
pub fn load_sml_str(xml: &str, base_dir: impl Into<PathBuf>) -> Result<LoadedScene> {
    let mut graph = SceneGraph::new();
    let base_dir = base_dir.into();
    let build = Scene::new().build_str(xml, &base_dir, &mut graph, &MeshInertiaService)?;
    Ok(LoadedScene { build, graph })
}
