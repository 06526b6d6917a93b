//! Joint construction.
//!
//! A joint is built only when both endpoints resolve. Both endpoints are
//! planned before either is resolved, so a joint whose child fails does not
//! leave an orphan offset behind on its parent body.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Diagnostic, EntityKind};
use crate::geometry::GeometryService;
use crate::model::Joint;
use crate::scene::SceneBuilder;
use crate::sink::SceneSink;
use crate::types::{EndpointRole, SmlDof, SmlJoint, SmlOffset};

/// Locked/free pattern over the six relative degrees of freedom.
///
/// Slots 0..3 are translations along x, y, z; slots 3..6 are rotations
/// about x, y, z. Every slot starts [`LOCKED`](Self::LOCKED).
///
/// # Example
///
/// ```
/// use sim_sml::DofMask;
///
/// let mut mask = DofMask::default();
/// mask.free(2).unwrap();
/// assert_eq!(mask.as_array(), [1, 1, 0, 1, 1, 1]);
/// assert!(mask.free(6).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DofMask([u8; 6]);

impl Default for DofMask {
    fn default() -> Self {
        Self([Self::LOCKED; Self::SIZE])
    }
}

impl DofMask {
    /// Number of slots.
    pub const SIZE: usize = 6;
    /// Constrained slot.
    pub const LOCKED: u8 = 1;
    /// Unconstrained slot.
    pub const FREE: u8 = 0;

    /// Mark one slot free.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Configuration`] if `index` is not in `0..6`; the
    /// mask is left unchanged.
    pub fn free(&mut self, index: usize) -> Result<(), BuildError> {
        let slot = self.0.get_mut(index).ok_or_else(|| {
            BuildError::configuration(format!("dof index {index} out of range 0..=5"))
        })?;
        *slot = Self::FREE;
        Ok(())
    }

    /// Whether a slot is free. Out-of-range slots are reported locked.
    pub fn is_free(&self, index: usize) -> bool {
        self.0.get(index) == Some(&Self::FREE)
    }

    /// Number of free slots.
    pub fn free_count(&self) -> usize {
        self.0.iter().filter(|&&s| s == Self::FREE).count()
    }

    /// Slot values, `1` locked and `0` free.
    pub fn as_array(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for DofMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for slot in self.0 {
            write!(f, "{slot}")?;
        }
        Ok(())
    }
}

/// Parse a `<dof index>` attribute.
///
/// # Errors
///
/// [`BuildError::Format`] for a non-integer, [`BuildError::Configuration`]
/// for an integer outside `0..6`.
pub fn parse_dof_index(index: &str) -> Result<usize, BuildError> {
    let value: i64 = index
        .trim()
        .parse()
        .map_err(|_| BuildError::format(format!("dof index '{index}' is not an integer")))?;
    usize::try_from(value)
        .ok()
        .filter(|&i| i < DofMask::SIZE)
        .ok_or_else(|| BuildError::configuration(format!("dof index {value} out of range 0..=5")))
}

/// Body name and offset clause of one endpoint.
fn endpoint_ref(
    decl: &SmlJoint,
    role: EndpointRole,
) -> Result<(&str, Option<&SmlOffset>), BuildError> {
    let endpoint = decl
        .endpoint(role)
        .ok_or_else(|| BuildError::incomplete(format!("joint has no <{role}> endpoint")))?;
    let body = endpoint
        .body
        .as_deref()
        .ok_or_else(|| BuildError::incomplete(format!("<{role}> endpoint has no body name")))?;
    Ok((body, endpoint.offset.as_ref()))
}

impl<S: SceneSink, G: GeometryService> SceneBuilder<'_, S, G> {
    /// Build one `<joint>` declaration. Failures are recorded, never raised.
    pub(crate) fn process_joint(&mut self, index: usize, decl: &SmlJoint) {
        let Some(name) = decl.name.as_deref() else {
            self.record(Diagnostic::new(
                EntityKind::Joint,
                format!("<joint #{index}>"),
                BuildError::incomplete("joint has no name"),
            ));
            return;
        };
        tracing::debug!(joint = name, "processing joint");

        if !self.declare(EntityKind::Joint, name) {
            self.record(Diagnostic::new(
                EntityKind::Joint,
                name,
                BuildError::duplicate(EntityKind::Joint, name),
            ));
            return;
        }

        let offset_name = format!("offset_{name}");
        // Both endpoints are checked before either creates an offset.
        for role in EndpointRole::ALL {
            let checked = endpoint_ref(decl, role)
                .and_then(|(body, clause)| self.plan_frame(&offset_name, role, body, clause));
            if let Err(e) = checked {
                self.record(Diagnostic::new(EntityKind::Joint, name, e).at_endpoint(role));
                return;
            }
        }

        let dof_mask = self.dof_mask(name, &decl.dofs);

        let mut frames = Vec::with_capacity(2);
        for role in EndpointRole::ALL {
            let resolved = endpoint_ref(decl, role)
                .and_then(|(body, clause)| self.resolve_offset(&offset_name, role, body, clause));
            match resolved {
                Ok(frame) => frames.push(frame),
                Err(e) => {
                    self.record(Diagnostic::new(EntityKind::Joint, name, e).at_endpoint(role));
                    return;
                }
            }
        }
        let [(parent, parent_node), (child, child_node)] = frames[..] else {
            return;
        };

        let node = self
            .sink
            .create_joint_node(self.model.node, name, parent_node, child_node, dof_mask);
        self.model.add_joint(Joint {
            name: name.to_string(),
            parent,
            child,
            dof_mask,
            node,
        });
    }

    /// Mask with every declared index freed. Bad indices are recorded and
    /// skipped.
    fn dof_mask(&mut self, joint: &str, dofs: &[SmlDof]) -> DofMask {
        let mut mask = DofMask::default();
        for dof in dofs {
            let freed = dof
                .index
                .as_deref()
                .ok_or_else(|| BuildError::configuration("<dof> has no index"))
                .and_then(parse_dof_index)
                .and_then(|i| mask.free(i));
            if let Err(e) = freed {
                self.record(Diagnostic::new(EntityKind::Joint, joint, e));
                continue;
            }
            if dof.min.is_some() || dof.max.is_some() {
                tracing::debug!(
                    joint,
                    index = dof.index.as_deref().unwrap_or_default(),
                    "dof limits are not applied"
                );
            }
        }
        mask
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::SceneParams;
    use crate::error::ErrorKind;
    use crate::model::Frame;
    use crate::offset::FramePlan;
    use crate::offset::tests::builder;
    use crate::sink::SceneGraph;
    use crate::types::SmlEndpoint;

    #[test]
    fn test_default_mask_is_locked() {
        let mask = DofMask::default();
        assert_eq!(mask.as_array(), [1; 6]);
        assert_eq!(mask.free_count(), 0);
        assert_eq!(mask.to_string(), "111111");
    }

    #[test]
    fn test_free_slots() {
        let mut mask = DofMask::default();
        mask.free(0).unwrap();
        mask.free(5).unwrap();
        mask.free(5).unwrap();
        assert_eq!(mask.as_array(), [0, 1, 1, 1, 1, 0]);
        assert!(mask.is_free(0));
        assert!(!mask.is_free(1));
        assert!(!mask.is_free(9));
        assert_eq!(mask.free_count(), 2);
    }

    #[test]
    fn test_out_of_range_leaves_mask_unchanged() {
        let mut mask = DofMask::default();
        let err = mask.free(6).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(mask, DofMask::default());
    }

    #[test]
    fn test_parse_dof_index() {
        assert_eq!(parse_dof_index("3").unwrap(), 3);
        assert_eq!(parse_dof_index(" 0 ").unwrap(), 0);
        assert_eq!(
            parse_dof_index("6").unwrap_err().kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            parse_dof_index("-1").unwrap_err().kind(),
            ErrorKind::Configuration
        );
        assert_eq!(parse_dof_index("x").unwrap_err().kind(), ErrorKind::Format);
        assert_eq!(parse_dof_index("2.5").unwrap_err().kind(), ErrorKind::Format);
    }

    #[test]
    fn test_joint_offsets_are_reused_by_later_lookups() {
        let mut graph = SceneGraph::new();
        let params = SceneParams::default();
        let mut b = builder(&mut graph, &params);
        let clause = SmlOffset::Relative("1 0 0".into());

        let decl = SmlJoint::new(
            "j",
            SmlEndpoint::body("b"),
            SmlEndpoint::body("b").with_offset(clause.clone()),
        )
        .with_free_dof("2");
        b.process_joint(0, &decl);
        assert!(b.diagnostics.is_empty(), "{:?}", b.diagnostics);
        assert_eq!(b.model.offset_count(), 1);
        let child = b.model.joint("j").unwrap().child;

        let plan = b
            .plan_frame("offset_j", EndpointRole::Child, "b", Some(&clause))
            .unwrap();
        let FramePlan::Existing { offset, .. } = plan else {
            panic!("expected the joint's offset to be reused, got {plan:?}");
        };
        assert_eq!(Frame::Offset(offset), child);

        let (frame, _) = b
            .resolve_offset("offset_j", EndpointRole::Child, "b", Some(&clause))
            .unwrap();
        assert_eq!(frame, child);
        assert_eq!(b.model.offset_count(), 1);
    }

    #[test]
    fn test_failed_joint_still_claims_its_name() {
        let mut graph = SceneGraph::new();
        let params = SceneParams::default();
        let mut b = builder(&mut graph, &params);

        b.process_joint(
            0,
            &SmlJoint::new("j", SmlEndpoint::body("ghost"), SmlEndpoint::body("b")),
        );
        b.process_joint(
            1,
            &SmlJoint::new("j", SmlEndpoint::body("b"), SmlEndpoint::body("b")),
        );

        assert!(b.model.joint("j").is_none());
        let kinds: Vec<_> = b.diagnostics.iter().map(Diagnostic::kind).collect();
        assert_eq!(kinds, vec![ErrorKind::Resolution, ErrorKind::DuplicateEntity]);
        assert_eq!(b.diagnostics[1].endpoint, None);
    }

    #[test]
    fn test_missing_endpoint_body_is_incomplete() {
        let mut graph = SceneGraph::new();
        let params = SceneParams::default();
        let mut b = builder(&mut graph, &params);

        let mut decl = SmlJoint::new("j", SmlEndpoint::body("b"), SmlEndpoint::body("b"));
        decl.child = None;
        b.process_joint(0, &decl);

        assert_eq!(b.model.joint_count(), 0);
        assert_eq!(b.diagnostics.len(), 1);
        assert_eq!(b.diagnostics[0].kind(), ErrorKind::IncompleteSpecification);
        assert_eq!(b.diagnostics[0].endpoint, Some(EndpointRole::Child));
    }
}
