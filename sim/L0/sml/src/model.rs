//! Built model.
//!
//! Entities live in per-kind arenas owned by [`Model`]. Cross references
//! (joint → frame, offset → body) are typed indices into those arenas, and
//! name lookups go through hash maps filled as entities are registered.

use std::collections::HashMap;
use std::path::PathBuf;

use nalgebra::{Matrix3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::joint::DofMask;
use crate::pose::Pose;
use crate::sink::NodeHandle;
use crate::types::EndpointRole;
use crate::units::UnitContext;

/// Index of a rigid body in its [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyId(pub usize);

/// Index of an offset in its [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OffsetId(pub usize);

/// Index of a joint in its [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JointId(pub usize);

/// A built rigid body.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    /// Unique name.
    pub name: String,
    /// Mesh file, resolved against the document directory.
    pub mesh: PathBuf,
    /// Reference frame from `<position>`.
    pub placement: Pose,
    /// Body frame: centre of mass and principal axes.
    pub frame: Pose,
    /// Mass in internal units.
    pub mass: f64,
    /// Principal moments of inertia about the body frame axes.
    pub inertia: Vector3<f64>,
    /// Scene node.
    pub node: NodeHandle,
}

impl RigidBody {
    /// Inertia tensor about the centre of mass, in world axes.
    pub fn inertia_tensor(&self) -> Matrix3<f64> {
        let r = self.frame.rotation.to_rotation_matrix();
        r.matrix() * Matrix3::from_diagonal(&self.inertia) * r.matrix().transpose()
    }
}

/// How an offset's declared transform is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OffsetKind {
    /// Expressed directly in the body's reference frame.
    Absolute,
    /// Composed onto the body frame.
    Relative,
}

/// A named attachment frame on a rigid body.
#[derive(Debug, Clone, PartialEq)]
pub struct Offset {
    /// Deterministic name, `offset_<joint>`.
    pub name: String,
    /// Joint endpoint that created it.
    pub role: EndpointRole,
    /// Owning body.
    pub body: BodyId,
    /// Interpretation of [`Self::transform`].
    pub kind: OffsetKind,
    /// Transform as declared, in internal units.
    pub transform: Pose,
    /// Transform relative to the owning body frame.
    pub local: Pose,
    /// Scene node.
    pub node: NodeHandle,
}

/// A frame a joint can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Frame {
    /// A body's own frame.
    Body(BodyId),
    /// An offset frame.
    Offset(OffsetId),
}

/// A built joint.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    /// Unique name.
    pub name: String,
    /// Parent frame.
    pub parent: Frame,
    /// Child frame.
    pub child: Frame,
    /// Locked/free mask.
    pub dof_mask: DofMask,
    /// Scene node.
    pub node: NodeHandle,
}

/// Result of a scene build: every entity that was successfully created.
#[derive(Debug, Clone)]
pub struct Model {
    /// Model name.
    pub name: String,
    /// Units the document was read in.
    pub units: UnitContext,
    /// Root scene node.
    pub node: NodeHandle,
    bodies: Vec<RigidBody>,
    body_names: HashMap<String, BodyId>,
    offsets: Vec<Offset>,
    offset_keys: HashMap<(String, EndpointRole), OffsetId>,
    joints: Vec<Joint>,
    joint_names: HashMap<String, JointId>,
}

impl Model {
    /// Create an empty model.
    pub fn new(name: impl Into<String>, units: UnitContext, node: NodeHandle) -> Self {
        Self {
            name: name.into(),
            units,
            node,
            bodies: Vec::new(),
            body_names: HashMap::new(),
            offsets: Vec::new(),
            offset_keys: HashMap::new(),
            joints: Vec::new(),
            joint_names: HashMap::new(),
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Add a body. The caller has already checked the name is free.
    pub(crate) fn add_body(&mut self, body: RigidBody) -> BodyId {
        let id = BodyId(self.bodies.len());
        self.body_names.insert(body.name.clone(), id);
        self.bodies.push(body);
        id
    }

    pub(crate) fn add_offset(&mut self, offset: Offset) -> OffsetId {
        let id = OffsetId(self.offsets.len());
        self.offset_keys.insert((offset.name.clone(), offset.role), id);
        self.offsets.push(offset);
        id
    }

    pub(crate) fn add_joint(&mut self, joint: Joint) -> JointId {
        let id = JointId(self.joints.len());
        self.joint_names.insert(joint.name.clone(), id);
        self.joints.push(joint);
        id
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Id of the body with this name.
    pub fn body_id(&self, name: &str) -> Option<BodyId> {
        self.body_names.get(name).copied()
    }

    /// Body with this name.
    pub fn body(&self, name: &str) -> Option<&RigidBody> {
        self.body_id(name).and_then(|id| self.get_body(id))
    }

    /// Body by id.
    pub fn get_body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id.0)
    }

    /// Id of the offset created for `(name, role)`.
    pub fn offset_id(&self, name: &str, role: EndpointRole) -> Option<OffsetId> {
        self.offset_keys.get(&(name.to_string(), role)).copied()
    }

    /// Offset created for `(name, role)`.
    pub fn offset(&self, name: &str, role: EndpointRole) -> Option<&Offset> {
        self.offset_id(name, role).and_then(|id| self.get_offset(id))
    }

    /// Offset by id.
    pub fn get_offset(&self, id: OffsetId) -> Option<&Offset> {
        self.offsets.get(id.0)
    }

    /// Joint with this name.
    pub fn joint(&self, name: &str) -> Option<&Joint> {
        let id = self.joint_names.get(name)?;
        self.get_joint(*id)
    }

    /// Joint by id.
    pub fn get_joint(&self, id: JointId) -> Option<&Joint> {
        self.joints.get(id.0)
    }

    /// Whether a joint with this name exists.
    pub fn has_joint(&self, name: &str) -> bool {
        self.joint_names.contains_key(name)
    }

    /// Bodies in creation order.
    pub fn bodies(&self) -> impl Iterator<Item = &RigidBody> {
        self.bodies.iter()
    }

    /// Offsets in creation order.
    pub fn offsets(&self) -> impl Iterator<Item = &Offset> {
        self.offsets.iter()
    }

    /// Joints in creation order.
    pub fn joints(&self) -> impl Iterator<Item = &Joint> {
        self.joints.iter()
    }

    /// Number of bodies.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of offsets.
    pub fn offset_count(&self) -> usize {
        self.offsets.len()
    }

    /// Number of joints.
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    // ========================================================================
    // Frames
    // ========================================================================

    /// Owning body of a frame.
    pub fn frame_body(&self, frame: Frame) -> Option<&RigidBody> {
        match frame {
            Frame::Body(id) => self.get_body(id),
            Frame::Offset(id) => self.get_offset(id).and_then(|o| self.get_body(o.body)),
        }
    }

    /// World pose of a frame.
    pub fn frame_pose(&self, frame: Frame) -> Option<Pose> {
        match frame {
            Frame::Body(id) => self.get_body(id).map(|b| b.frame),
            Frame::Offset(id) => {
                let offset = self.get_offset(id)?;
                let body = self.get_body(offset.body)?;
                Some(body.frame.compose(&offset.local))
            }
        }
    }

    /// Scene node of a frame.
    pub fn frame_node(&self, frame: Frame) -> Option<NodeHandle> {
        match frame {
            Frame::Body(id) => self.get_body(id).map(|b| b.node),
            Frame::Offset(id) => self.get_offset(id).map(|o| o.node),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, UnitQuaternion};
    use std::f64::consts::FRAC_PI_2;

    fn body(name: &str, z: f64) -> RigidBody {
        let frame = Pose::from_position(Point3::new(0.0, 0.0, z));
        RigidBody {
            name: name.to_string(),
            mesh: PathBuf::from(format!("{name}.stl")),
            placement: frame,
            frame,
            mass: 1.0,
            inertia: Vector3::new(1.0, 2.0, 3.0),
            node: NodeHandle(1),
        }
    }

    #[test]
    fn test_lookups_by_name_and_id() {
        let mut model = Model::new("m", UnitContext::si(), NodeHandle(0));
        let a = model.add_body(body("a", 0.0));
        let b = model.add_body(body("b", 1.0));
        assert_eq!(a, BodyId(0));
        assert_eq!(model.body_id("b"), Some(b));
        assert_eq!(model.body("a").unwrap().name, "a");
        assert!(model.body("c").is_none());
        assert_eq!(model.body_count(), 2);

        let o = model.add_offset(Offset {
            name: "offset_j".into(),
            role: EndpointRole::Child,
            body: b,
            kind: OffsetKind::Relative,
            transform: Pose::from_position(Point3::new(1.0, 0.0, 0.0)),
            local: Pose::from_position(Point3::new(1.0, 0.0, 0.0)),
            node: NodeHandle(3),
        });
        assert_eq!(model.offset_id("offset_j", EndpointRole::Child), Some(o));
        assert!(model.offset("offset_j", EndpointRole::Parent).is_none());

        model.add_joint(Joint {
            name: "j".into(),
            parent: Frame::Body(a),
            child: Frame::Offset(o),
            dof_mask: DofMask::default(),
            node: NodeHandle(4),
        });
        assert!(model.has_joint("j"));
        assert_eq!(model.joint("j").unwrap().child, Frame::Offset(o));
        assert_eq!(model.joint_count(), 1);
    }

    #[test]
    fn test_frame_pose_and_node() {
        let mut model = Model::new("m", UnitContext::si(), NodeHandle(0));
        let b = model.add_body(body("b", 1.0));
        let o = model.add_offset(Offset {
            name: "offset_j".into(),
            role: EndpointRole::Parent,
            body: b,
            kind: OffsetKind::Relative,
            transform: Pose::from_position(Point3::new(1.0, 0.0, 0.0)),
            local: Pose::from_position(Point3::new(1.0, 0.0, 0.0)),
            node: NodeHandle(7),
        });

        let pose = model.frame_pose(Frame::Offset(o)).unwrap();
        assert_relative_eq!(pose.position, Point3::new(1.0, 0.0, 1.0));
        assert_eq!(model.frame_node(Frame::Offset(o)), Some(NodeHandle(7)));
        assert_eq!(model.frame_body(Frame::Offset(o)).unwrap().name, "b");
        assert_eq!(model.frame_node(Frame::Body(BodyId(5))), None);
    }

    #[test]
    fn test_inertia_tensor_rotates_principal_moments() {
        let mut b = body("b", 0.0);
        b.frame.rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        let tensor = b.inertia_tensor();
        // x and y moments swap under a quarter turn about z.
        assert_relative_eq!(tensor[(0, 0)], 2.0, epsilon = 1e-12);
        assert_relative_eq!(tensor[(1, 1)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(tensor[(2, 2)], 3.0, epsilon = 1e-12);
    }
}
