//! Declaration types for SML documents.
//!
//! These mirror the document structure one-to-one. Numeric literals are kept
//! as text here: they are interpreted later, under the build's unit context,
//! so that a malformed literal fails only the entity that carries it.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Root `<model>` declaration.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SmlModel {
    /// Value of the root `name` attribute.
    pub name: Option<String>,
    /// `<units>` attributes, category → symbol, in document order.
    pub units: Option<Vec<(String, String)>>,
    /// `<rigid>` declarations in document order.
    pub rigids: Vec<SmlRigid>,
    /// `<joint>` declarations in document order.
    pub joints: Vec<SmlJoint>,
}

impl SmlModel {
    /// Create an empty model declaration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Add a rigid declaration.
    #[must_use]
    pub fn with_rigid(mut self, rigid: SmlRigid) -> Self {
        self.rigids.push(rigid);
        self
    }

    /// Add a joint declaration.
    #[must_use]
    pub fn with_joint(mut self, joint: SmlJoint) -> Self {
        self.joints.push(joint);
        self
    }

    /// Add a unit override.
    #[must_use]
    pub fn with_unit(mut self, category: impl Into<String>, symbol: impl Into<String>) -> Self {
        self.units
            .get_or_insert_with(Vec::new)
            .push((category.into(), symbol.into()));
        self
    }
}

/// `<rigid>` declaration.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SmlRigid {
    /// `name` attribute.
    pub name: Option<String>,
    /// `<mesh>` text: path relative to the document directory.
    pub mesh: Option<String>,
    /// `<density>` text.
    pub density: Option<String>,
    /// `<mass>` text.
    pub mass: Option<String>,
    /// `<inertia>` text: 3 (diagonal) or 6 (`ixx iyy izz ixy ixz iyz`) values.
    pub inertia: Option<String>,
    /// `<position>` text: placement of the mesh frame.
    pub position: Option<String>,
}

impl SmlRigid {
    /// Create a rigid declaration with a name and mesh path.
    pub fn new(name: impl Into<String>, mesh: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            mesh: Some(mesh.into()),
            ..Default::default()
        }
    }

    /// Set the density literal.
    #[must_use]
    pub fn with_density(mut self, density: impl Into<String>) -> Self {
        self.density = Some(density.into());
        self
    }

    /// Set the mass literal.
    #[must_use]
    pub fn with_mass(mut self, mass: impl Into<String>) -> Self {
        self.mass = Some(mass.into());
        self
    }

    /// Set the inertia literal.
    #[must_use]
    pub fn with_inertia(mut self, inertia: impl Into<String>) -> Self {
        self.inertia = Some(inertia.into());
        self
    }

    /// Set the placement literal.
    #[must_use]
    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }
}

/// `<joint>` declaration.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SmlJoint {
    /// `name` attribute.
    pub name: Option<String>,
    /// `<parent>` endpoint.
    pub parent: Option<SmlEndpoint>,
    /// `<child>` endpoint.
    pub child: Option<SmlEndpoint>,
    /// `<dof>` entries marking free degrees of freedom.
    pub dofs: Vec<SmlDof>,
}

impl SmlJoint {
    /// Create a joint declaration between two endpoints.
    pub fn new(name: impl Into<String>, parent: SmlEndpoint, child: SmlEndpoint) -> Self {
        Self {
            name: Some(name.into()),
            parent: Some(parent),
            child: Some(child),
            dofs: Vec::new(),
        }
    }

    /// Mark a degree of freedom as free.
    #[must_use]
    pub fn with_free_dof(mut self, index: impl Into<String>) -> Self {
        self.dofs.push(SmlDof {
            index: Some(index.into()),
            ..Default::default()
        });
        self
    }

    /// Endpoint declaration for a role.
    pub fn endpoint(&self, role: EndpointRole) -> Option<&SmlEndpoint> {
        match role {
            EndpointRole::Parent => self.parent.as_ref(),
            EndpointRole::Child => self.child.as_ref(),
        }
    }
}

/// `<parent>` or `<child>` of a joint.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SmlEndpoint {
    /// Referenced rigid body name.
    pub body: Option<String>,
    /// Optional `<offset>` clause.
    pub offset: Option<SmlOffset>,
}

impl SmlEndpoint {
    /// Endpoint at the body's own frame.
    pub fn body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            offset: None,
        }
    }

    /// Attach an offset clause.
    #[must_use]
    pub fn with_offset(mut self, offset: SmlOffset) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// `<offset>` clause, classified once when the document is read.
///
/// Only the exact `type="absolute"` selects [`SmlOffset::Absolute`]; every
/// other value, including a missing attribute, reads as relative.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SmlOffset {
    /// Transform literal expressed in the body's reference frame.
    Absolute(String),
    /// Transform literal composed onto the body's current frame.
    Relative(String),
}

impl SmlOffset {
    /// Classify an offset clause from its `type` attribute.
    pub fn from_type(offset_type: Option<&str>, literal: impl Into<String>) -> Self {
        if offset_type == Some("absolute") {
            Self::Absolute(literal.into())
        } else {
            Self::Relative(literal.into())
        }
    }

    /// The transform literal.
    pub fn literal(&self) -> &str {
        match self {
            Self::Absolute(s) | Self::Relative(s) => s,
        }
    }

    /// Whether this is an absolute offset.
    pub fn is_absolute(&self) -> bool {
        matches!(self, Self::Absolute(_))
    }
}

/// `<dof>` entry of a joint.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SmlDof {
    /// `index` attribute (0..=5).
    pub index: Option<String>,
    /// `min` attribute. Range limits are not applied.
    pub min: Option<String>,
    /// `max` attribute. Range limits are not applied.
    pub max: Option<String>,
}

/// Which end of a joint an endpoint is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EndpointRole {
    /// `<parent>` endpoint.
    Parent,
    /// `<child>` endpoint.
    Child,
}

impl EndpointRole {
    /// Both roles, parent first.
    pub const ALL: [Self; 2] = [Self::Parent, Self::Child];

    /// Element name of this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Child => "child",
        }
    }
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
