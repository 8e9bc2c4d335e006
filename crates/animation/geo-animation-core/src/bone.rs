//! Bone nodes and the matrix math used to pose them.
//!
//! A bone owns its local transform (written by controllers every frame) and,
//! when matrix tracking is enabled, the matrices resolved for it during the
//! last hierarchy pass.

use nalgebra::{Matrix4, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::ids::BoneId;
use crate::interp::functions::lerp_vec3;

/// Local TRS transform of one bone. Rotation is XYZ euler in radians,
/// applied in Z, Y, X order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoneTransform {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BoneTransform {
    pub const IDENTITY: BoneTransform = BoneTransform {
        position: [0.0; 3],
        rotation: [0.0; 3],
        scale: [1.0; 3],
    };

    /// Component-wise blend. Rotation is blended on euler angles, matching how
    /// keyframes are authored.
    pub fn lerp(&self, other: &BoneTransform, t: f32) -> BoneTransform {
        BoneTransform {
            position: lerp_vec3(self.position, other.position, t),
            rotation: lerp_vec3(self.rotation, other.rotation, t),
            scale: lerp_vec3(self.scale, other.scale, t),
        }
    }

    /// `T(pivot + position) * Rz * Ry * Rx * S * T(-pivot)`
    pub fn to_matrix(&self, pivot: [f32; 3]) -> Matrix4<f32> {
        let pivot = Vector3::from(pivot);
        let translate = Matrix4::new_translation(&(pivot + Vector3::from(self.position)));
        let [rx, ry, rz] = self.rotation;
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), rz)
            * Rotation3::from_axis_angle(&Vector3::y_axis(), ry)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), rx);
        let scale = Matrix4::new_nonuniform_scaling(&Vector3::from(self.scale));
        translate * rotation.to_homogeneous() * scale * Matrix4::new_translation(&(-pivot))
    }
}

/// One node of a [`crate::skeleton::Skeleton`].
#[derive(Clone, Debug)]
pub struct Bone {
    pub(crate) id: BoneId,
    pub(crate) name: String,
    pub(crate) parent: Option<BoneId>,
    pub(crate) children: Vec<BoneId>,
    pub(crate) pivot: [f32; 3],
    pub(crate) rest: BoneTransform,
    pub(crate) local: BoneTransform,
    pub(crate) hidden: bool,
    pub(crate) track_matrices: bool,
    pub(crate) model_space: Matrix4<f32>,
    pub(crate) local_space: Matrix4<f32>,
}

impl Bone {
    pub(crate) fn new(
        id: BoneId,
        name: String,
        parent: Option<BoneId>,
        pivot: [f32; 3],
        rest: BoneTransform,
    ) -> Self {
        Self {
            id,
            name,
            parent,
            children: Vec::new(),
            pivot,
            rest,
            local: rest,
            hidden: false,
            track_matrices: false,
            model_space: Matrix4::identity(),
            local_space: Matrix4::identity(),
        }
    }

    pub fn id(&self) -> BoneId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<BoneId> {
        self.parent
    }

    pub fn children(&self) -> &[BoneId] {
        &self.children
    }

    pub fn pivot(&self) -> [f32; 3] {
        self.pivot
    }

    /// Pose the bone had when the model was built.
    pub fn rest_pose(&self) -> &BoneTransform {
        &self.rest
    }

    pub fn transform(&self) -> &BoneTransform {
        &self.local
    }

    pub fn set_transform(&mut self, transform: BoneTransform) {
        self.local = transform;
    }

    pub fn reset_to_rest_pose(&mut self) {
        self.local = self.rest;
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    pub fn is_tracking_matrices(&self) -> bool {
        self.track_matrices
    }

    /// Opt this bone into keeping its resolved matrices across frames.
    pub fn set_tracking_matrices(&mut self, track: bool) {
        self.track_matrices = track;
        if !track {
            self.model_space = Matrix4::identity();
            self.local_space = Matrix4::identity();
        }
    }

    /// Model-space matrix from the last pass. Identity unless tracking is enabled.
    pub fn model_space_matrix(&self) -> &Matrix4<f32> {
        &self.model_space
    }

    /// Render-local matrix from the last pass. Identity unless tracking is enabled.
    pub fn local_space_matrix(&self) -> &Matrix4<f32> {
        &self.local_space
    }

    /// World position of the bone pivot in model space, if tracked.
    pub fn model_position(&self) -> Option<[f32; 3]> {
        if !self.track_matrices {
            return None;
        }
        let p = self
            .model_space
            .transform_point(&nalgebra::Point3::from(self.pivot));
        Some([p.x, p.y, p.z])
    }
}

/// Compose the bone's local transform onto an already resolved parent matrix.
#[inline]
pub fn resolve_model_space_matrix(bone: &Bone, parent: &Matrix4<f32>) -> Matrix4<f32> {
    parent * bone.local.to_matrix(bone.pivot)
}

/// Map a model-space matrix into the render-local frame. `reference` carries
/// the transforms the renderer applied between its local origin and the model
/// origin (scale, offsets), so an identity reference yields model space.
#[inline]
pub fn resolve_local_space_matrix(model_space: &Matrix4<f32>, reference: &Matrix4<f32>) -> Matrix4<f32> {
    reference * model_space
}
