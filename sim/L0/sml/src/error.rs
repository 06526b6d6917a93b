//! Error types for SML loading and scene building.
//!
//! Two channels are kept apart:
//!
//! - [`SmlError`] is fatal. The document could not be opened or parsed and
//!   no model is produced.
//! - [`BuildError`] is scoped to one entity (a unit declaration, a rigid
//!   body, an offset, a joint). It is recorded as a [`Diagnostic`] and the
//!   build carries on with the remaining declarations.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::EndpointRole;

/// Fatal errors that abort a whole build.
#[derive(Debug, Error)]
pub enum SmlError {
    /// The source document does not exist.
    #[error("document not found: {}", path.display())]
    DocumentNotFound {
        /// Path that was requested.
        path: PathBuf,
    },

    /// The source document exists but could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The source document is not well-formed XML.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// Missing required element.
    #[error("missing required element: {element} in {context}")]
    MissingElement {
        /// The missing element name.
        element: &'static str,
        /// Where the element was expected.
        context: String,
    },
}

impl SmlError {
    /// Create a missing element error.
    pub fn missing_element(element: &'static str, context: impl Into<String>) -> Self {
        Self::MissingElement {
            element,
            context: context.into(),
        }
    }
}

/// Result type for fatal SML operations.
pub type Result<T> = std::result::Result<T, SmlError>;

/// Why a name reference could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// The referenced rigid body is not in the body table.
    #[error("unknown rigid body '{0}'")]
    UnknownBody(String),
}

/// Per-entity build failure.
///
/// Never aborts the build: the offending entity is skipped and the error is
/// recorded alongside the entity that raised it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    /// Unknown unit category or symbol, or an out-of-range dof index.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed numeric literal or wrong number of components.
    #[error("format error: {0}")]
    Format(String),

    /// A second declaration reused an existing name.
    #[error("duplicate {kind} name: {name}")]
    DuplicateEntity {
        /// Kind of entity whose name collided.
        kind: EntityKind,
        /// The colliding name.
        name: String,
    },

    /// A required piece of the declaration is missing.
    #[error("incomplete specification: {0}")]
    IncompleteSpecification(String),

    /// A name reference could not be resolved.
    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// The geometry collaborator could not produce mass properties.
    #[error("geometry error: {0}")]
    Geometry(String),
}

impl BuildError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a format error.
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    /// Create a duplicate entity error.
    pub fn duplicate(kind: EntityKind, name: impl Into<String>) -> Self {
        Self::DuplicateEntity {
            kind,
            name: name.into(),
        }
    }

    /// Create an incomplete specification error.
    pub fn incomplete(message: impl Into<String>) -> Self {
        Self::IncompleteSpecification(message.into())
    }

    /// Create an unknown body resolution error.
    pub fn unknown_body(body: impl Into<String>) -> Self {
        Self::Resolution(ResolutionError::UnknownBody(body.into()))
    }

    /// Create a geometry error.
    pub fn geometry(message: impl Into<String>) -> Self {
        Self::Geometry(message.into())
    }

    /// Coarse classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Format(_) => ErrorKind::Format,
            Self::DuplicateEntity { .. } => ErrorKind::DuplicateEntity,
            Self::IncompleteSpecification(_) => ErrorKind::IncompleteSpecification,
            Self::Resolution(_) => ErrorKind::Resolution,
            Self::Geometry(_) => ErrorKind::Geometry,
        }
    }
}

/// Classification of a [`BuildError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    /// See [`BuildError::Configuration`].
    Configuration,
    /// See [`BuildError::Format`].
    Format,
    /// See [`BuildError::DuplicateEntity`].
    DuplicateEntity,
    /// See [`BuildError::IncompleteSpecification`].
    IncompleteSpecification,
    /// See [`BuildError::Resolution`].
    Resolution,
    /// See [`BuildError::Geometry`].
    Geometry,
}

/// Kind of entity a diagnostic is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityKind {
    /// The `<units>` declaration.
    Units,
    /// A `<rigid>` declaration.
    Rigid,
    /// A `<joint>` declaration.
    Joint,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Units => "units",
            Self::Rigid => "rigid",
            Self::Joint => "joint",
        })
    }
}

/// A recorded, non-fatal failure: `(entity kind, entity name, error)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Kind of the entity that failed.
    pub entity_kind: EntityKind,
    /// Name of the entity that failed (a placeholder for unnamed ones).
    pub entity_name: String,
    /// Joint endpoint that failed, for joint resolution failures.
    pub endpoint: Option<EndpointRole>,
    /// What went wrong.
    pub error: BuildError,
}

impl Diagnostic {
    /// Create a diagnostic for an entity.
    pub fn new(entity_kind: EntityKind, entity_name: impl Into<String>, error: BuildError) -> Self {
        Self {
            entity_kind,
            entity_name: entity_name.into(),
            endpoint: None,
            error,
        }
    }

    /// Attach the failing joint endpoint.
    #[must_use]
    pub fn at_endpoint(mut self, endpoint: EndpointRole) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Classification of the underlying error.
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// Human-readable message of the underlying error.
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.entity_kind, self.entity_name)?;
        if let Some(endpoint) = self.endpoint {
            write!(f, " ({endpoint})")?;
        }
        write!(f, ": {}", self.error)
    }
}
