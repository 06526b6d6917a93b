//! Scene graph output.
//!
//! The builders never hold engine objects directly. They call a
//! [`SceneSink`], get back opaque [`NodeHandle`]s, and store those handles in
//! the [`Model`](crate::Model). [`SceneGraph`] is an in-memory sink that
//! records every node, used by the file loaders and for inspection.

use std::path::{Path, PathBuf};

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::joint::DofMask;
use crate::pose::Pose;

/// Opaque handle to a node created by a [`SceneSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeHandle(pub u64);

/// Receives the nodes of a scene as they are built.
///
/// Calls arrive in construction order: the model node first, then every
/// rigid body, then offsets and joints interleaved per joint.
pub trait SceneSink {
    /// Create the root node of a model.
    fn create_model_node(&mut self, name: &str) -> NodeHandle;

    /// Create a rigid body under `parent` with its body frame (centre of mass
    /// and principal axes), mass, and principal moments of inertia.
    fn create_rigid_body_node(
        &mut self,
        parent: NodeHandle,
        name: &str,
        frame: &Pose,
        mass: f64,
        inertia: &Vector3<f64>,
    ) -> NodeHandle;

    /// Create an offset frame attached to a rigid body node.
    ///
    /// `transform` is as declared; `absolute` tells whether it is expressed
    /// in the body's reference frame or composed onto the body frame.
    fn create_offset_node(
        &mut self,
        parent: NodeHandle,
        name: &str,
        transform: &Pose,
        absolute: bool,
    ) -> NodeHandle;

    /// Create a joint between two frame nodes, owned by `model`.
    fn create_joint_node(
        &mut self,
        model: NodeHandle,
        name: &str,
        parent: NodeHandle,
        child: NodeHandle,
        dofs: DofMask,
    ) -> NodeHandle;

    /// Show or hide a node's frame.
    fn set_visible(&mut self, node: NodeHandle, visible: bool);

    /// Display size of a node's frame, in internal length units.
    fn set_display_scale(&mut self, node: NodeHandle, scale: f64);

    /// Attach a visual model loaded from `mesh`.
    fn attach_visual_model(&mut self, _node: NodeHandle, _mesh: &Path) {}

    /// Attach a collision mesh loaded from `mesh`.
    fn attach_collision_mesh(&mut self, _node: NodeHandle, _mesh: &Path) {}
}

/// What a [`SceneNode`] represents.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Root of a model.
    Model,
    /// A rigid body.
    RigidBody {
        /// Body frame.
        frame: Pose,
        /// Mass.
        mass: f64,
        /// Principal moments of inertia.
        inertia: Vector3<f64>,
    },
    /// An offset frame.
    Offset {
        /// Declared transform.
        transform: Pose,
        /// Whether the transform is absolute.
        absolute: bool,
    },
    /// A joint between two frames.
    Joint {
        /// Parent frame node.
        parent: NodeHandle,
        /// Child frame node.
        child: NodeHandle,
        /// Locked/free mask.
        dofs: DofMask,
    },
}

/// One recorded node.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// Node name.
    pub name: String,
    /// Node payload.
    pub kind: NodeKind,
    /// Owning node, `None` for models.
    pub parent: Option<NodeHandle>,
    /// Frame visibility.
    pub visible: bool,
    /// Frame display size.
    pub display_scale: Option<f64>,
    /// Attached visual model.
    pub visual: Option<PathBuf>,
    /// Attached collision mesh.
    pub collision: Option<PathBuf>,
}

/// In-memory [`SceneSink`].
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
}

impl SceneGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node was created.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node.
    pub fn node(&self, handle: NodeHandle) -> Option<&SceneNode> {
        usize::try_from(handle.0)
            .ok()
            .and_then(|i| self.nodes.get(i))
    }

    /// All nodes with their handles, in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeHandle, &SceneNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeHandle(i as u64), n))
    }

    /// Direct children of a node.
    pub fn children(&self, parent: NodeHandle) -> impl Iterator<Item = (NodeHandle, &SceneNode)> {
        self.iter().filter(move |(_, n)| n.parent == Some(parent))
    }

    fn push(&mut self, name: &str, kind: NodeKind, parent: Option<NodeHandle>) -> NodeHandle {
        let handle = NodeHandle(self.nodes.len() as u64);
        self.nodes.push(SceneNode {
            name: name.to_string(),
            kind,
            parent,
            visible: false,
            display_scale: None,
            visual: None,
            collision: None,
        });
        handle
    }

    fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut SceneNode> {
        usize::try_from(handle.0)
            .ok()
            .and_then(|i| self.nodes.get_mut(i))
    }
}

impl SceneSink for SceneGraph {
    fn create_model_node(&mut self, name: &str) -> NodeHandle {
        self.push(name, NodeKind::Model, None)
    }

    fn create_rigid_body_node(
        &mut self,
        parent: NodeHandle,
        name: &str,
        frame: &Pose,
        mass: f64,
        inertia: &Vector3<f64>,
    ) -> NodeHandle {
        let kind = NodeKind::RigidBody {
            frame: *frame,
            mass,
            inertia: *inertia,
        };
        self.push(name, kind, Some(parent))
    }

    fn create_offset_node(
        &mut self,
        parent: NodeHandle,
        name: &str,
        transform: &Pose,
        absolute: bool,
    ) -> NodeHandle {
        let kind = NodeKind::Offset {
            transform: *transform,
            absolute,
        };
        self.push(name, kind, Some(parent))
    }

    fn create_joint_node(
        &mut self,
        model: NodeHandle,
        name: &str,
        parent: NodeHandle,
        child: NodeHandle,
        dofs: DofMask,
    ) -> NodeHandle {
        let kind = NodeKind::Joint {
            parent,
            child,
            dofs,
        };
        self.push(name, kind, Some(model))
    }

    fn set_visible(&mut self, node: NodeHandle, visible: bool) {
        if let Some(n) = self.node_mut(node) {
            n.visible = visible;
        }
    }

    fn set_display_scale(&mut self, node: NodeHandle, scale: f64) {
        if let Some(n) = self.node_mut(node) {
            n.display_scale = Some(scale);
        }
    }

    fn attach_visual_model(&mut self, node: NodeHandle, mesh: &Path) {
        if let Some(n) = self.node_mut(node) {
            n.visual = Some(mesh.to_path_buf());
        }
    }

    fn attach_collision_mesh(&mut self, node: NodeHandle, mesh: &Path) {
        if let Some(n) = self.node_mut(node) {
            n.collision = Some(mesh.to_path_buf());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_graph_records_nodes_in_order() {
        let mut graph = SceneGraph::new();
        let model = graph.create_model_node("arm");
        let body = graph.create_rigid_body_node(
            model,
            "base",
            &Pose::identity(),
            2.0,
            &Vector3::new(1.0, 1.0, 1.0),
        );
        let offset = graph.create_offset_node(
            body,
            "offset_j",
            &Pose::from_position(Point3::new(0.0, 0.0, 1.0)),
            true,
        );
        let joint = graph.create_joint_node(model, "j", body, offset, DofMask::default());

        assert_eq!(graph.len(), 4);
        assert_eq!(model, NodeHandle(0));
        assert_eq!(joint, NodeHandle(3));
        assert_eq!(graph.node(body).unwrap().parent, Some(model));
        assert!(matches!(
            graph.node(offset).unwrap().kind,
            NodeKind::Offset { absolute: true, .. }
        ));

        let children: Vec<_> = graph.children(model).map(|(h, _)| h).collect();
        assert_eq!(children, vec![body, joint]);
    }

    #[test]
    fn test_display_attributes() {
        let mut graph = SceneGraph::new();
        let model = graph.create_model_node("m");
        assert!(!graph.node(model).unwrap().visible);

        graph.set_visible(model, true);
        graph.set_display_scale(model, 0.5);
        graph.attach_visual_model(model, Path::new("a.stl"));
        graph.attach_collision_mesh(model, Path::new("a.stl"));

        let node = graph.node(model).unwrap();
        assert!(node.visible);
        assert_eq!(node.display_scale, Some(0.5));
        assert_eq!(node.visual.as_deref(), Some(Path::new("a.stl")));
        assert_eq!(node.collision.as_deref(), Some(Path::new("a.stl")));

        // Unknown handles are ignored.
        graph.set_visible(NodeHandle(99), true);
        assert!(graph.node(NodeHandle(99)).is_none());
    }
}
