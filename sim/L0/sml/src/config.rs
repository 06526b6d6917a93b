//! Build configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::units::{UnitContext, UnitRegistry};

/// Options for a scene build.
///
/// Display sizes are in internal (SI) length units.
///
/// # Example
///
/// ```
/// use sim_sml::SceneParams;
///
/// let params = SceneParams::default()
///     .with_show_rigid(true)
///     .with_show_rigid_scale(0.2);
/// assert!(params.show_rigid);
/// assert!(!params.show_offset);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SceneParams {
    /// Show body frames.
    pub show_rigid: bool,
    /// Display size of body frames.
    pub show_rigid_scale: f64,
    /// Show offset frames.
    pub show_offset: bool,
    /// Display size of offset frames.
    pub show_offset_scale: f64,
    /// Attach each body's mesh as visual model and collision mesh.
    pub attach_meshes: bool,
    /// Units in effect before the document's `<units>` is applied.
    pub units: UnitContext,
    /// Known unit symbols.
    pub registry: UnitRegistry,
}

impl Default for SceneParams {
    fn default() -> Self {
        Self {
            show_rigid: false,
            show_rigid_scale: 0.5,
            show_offset: false,
            show_offset_scale: 0.1,
            attach_meshes: true,
            units: UnitContext::si(),
            registry: UnitRegistry::standard(),
        }
    }
}

impl SceneParams {
    /// Set body frame visibility.
    #[must_use]
    pub fn with_show_rigid(mut self, show: bool) -> Self {
        self.show_rigid = show;
        self
    }

    /// Set body frame display size.
    #[must_use]
    pub fn with_show_rigid_scale(mut self, scale: f64) -> Self {
        self.show_rigid_scale = scale;
        self
    }

    /// Set offset frame visibility.
    #[must_use]
    pub fn with_show_offset(mut self, show: bool) -> Self {
        self.show_offset = show;
        self
    }

    /// Set offset frame display size.
    #[must_use]
    pub fn with_show_offset_scale(mut self, scale: f64) -> Self {
        self.show_offset_scale = scale;
        self
    }

    /// Enable or disable visual/collision mesh attachment.
    #[must_use]
    pub fn with_attach_meshes(mut self, attach: bool) -> Self {
        self.attach_meshes = attach;
        self
    }

    /// Set the starting units.
    #[must_use]
    pub fn with_units(mut self, units: UnitContext) -> Self {
        self.units = units;
        self
    }

    /// Replace the unit registry.
    #[must_use]
    pub fn with_registry(mut self, registry: UnitRegistry) -> Self {
        self.registry = registry;
        self
    }
}
