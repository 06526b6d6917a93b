//! Offset resolution.
//!
//! A joint endpoint names a body and optionally an `<offset>`. Without an
//! offset the endpoint is the body's own frame. With one, an [`Offset`] is
//! created on the body the first time `(name, role)` is seen and reused on
//! every later lookup.

use crate::error::BuildError;
use crate::geometry::GeometryService;
use crate::model::{BodyId, Frame, Offset, OffsetId, OffsetKind};
use crate::pose::Pose;
use crate::scene::SceneBuilder;
use crate::sink::{NodeHandle, SceneSink};
use crate::types::{EndpointRole, SmlOffset};

/// Everything needed to produce a frame, checked but not yet created.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FramePlan {
    /// The body's own frame.
    Body { body: BodyId, node: NodeHandle },
    /// An offset that already exists.
    Existing { offset: OffsetId, node: NodeHandle },
    /// A new offset.
    New {
        name: String,
        role: EndpointRole,
        body: BodyId,
        body_node: NodeHandle,
        kind: OffsetKind,
        transform: Pose,
        local: Pose,
    },
}

impl<S: SceneSink, G: GeometryService> SceneBuilder<'_, S, G> {
    /// Resolve an endpoint reference to a frame and its scene node,
    /// creating the offset if needed.
    ///
    /// # Errors
    ///
    /// [`BuildError::Resolution`] if `body_name` was never built,
    /// [`BuildError::Format`] if the offset literal is malformed.
    pub(crate) fn resolve_offset(
        &mut self,
        offset_name: &str,
        role: EndpointRole,
        body_name: &str,
        clause: Option<&SmlOffset>,
    ) -> Result<(Frame, NodeHandle), BuildError> {
        let plan = self.plan_frame(offset_name, role, body_name, clause)?;
        Ok(self.materialize(plan))
    }

    /// Check a reference and decode its offset without touching the sink.
    pub(crate) fn plan_frame(
        &self,
        offset_name: &str,
        role: EndpointRole,
        body_name: &str,
        clause: Option<&SmlOffset>,
    ) -> Result<FramePlan, BuildError> {
        let id = self
            .model
            .body_id(body_name)
            .ok_or_else(|| BuildError::unknown_body(body_name))?;
        let body = self
            .model
            .get_body(id)
            .ok_or_else(|| BuildError::unknown_body(body_name))?;

        let Some(clause) = clause else {
            return Ok(FramePlan::Body {
                body: id,
                node: body.node,
            });
        };

        if let Some(existing) = self.model.offset_id(offset_name, role) {
            if let Some(offset) = self.model.get_offset(existing) {
                return Ok(FramePlan::Existing {
                    offset: existing,
                    node: offset.node,
                });
            }
        }

        let transform = Pose::from_literal(Some(clause.literal()), &self.model.units)?;
        let (kind, local) = match clause {
            // Absolute offsets are given in the body's reference frame.
            SmlOffset::Absolute(_) => (
                OffsetKind::Absolute,
                body.frame
                    .inverse()
                    .compose(&body.placement)
                    .compose(&transform),
            ),
            SmlOffset::Relative(_) => (OffsetKind::Relative, transform),
        };

        Ok(FramePlan::New {
            name: offset_name.to_string(),
            role,
            body: id,
            body_node: body.node,
            kind,
            transform,
            local,
        })
    }

    /// Create whatever a plan still needs. Cannot fail.
    fn materialize(&mut self, plan: FramePlan) -> (Frame, NodeHandle) {
        match plan {
            FramePlan::Body { body, node } => (Frame::Body(body), node),
            FramePlan::Existing { offset, node } => (Frame::Offset(offset), node),
            FramePlan::New {
                name,
                role,
                body,
                body_node,
                kind,
                transform,
                local,
            } => {
                let node = self.sink.create_offset_node(
                    body_node,
                    &name,
                    &transform,
                    kind == OffsetKind::Absolute,
                );
                self.sink.set_visible(node, self.params.show_offset);
                self.sink.set_display_scale(node, self.params.show_offset_scale);

                tracing::debug!(offset = %name, %role, ?kind, "created offset");
                let id = self.model.add_offset(Offset {
                    name,
                    role,
                    body,
                    kind,
                    transform,
                    local,
                    node,
                });
                (Frame::Offset(id), node)
            }
        }
    }
}
