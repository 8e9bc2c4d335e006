//! Bone hierarchy (arena of [`Bone`]s) and the per-frame matrix pass.

use hashbrown::HashMap;
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use crate::bone::{resolve_local_space_matrix, resolve_model_space_matrix, Bone, BoneTransform};
use crate::error::SkeletonError;
use crate::ids::BoneId;

/// Serializable description of one bone, listed parent-first.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BoneDef {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub pivot: [f32; 3],
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default)]
    pub track_matrices: bool,
}

/// Incrementally assembles a [`Skeleton`]. Parents must be added before their
/// children, which rules out cycles.
#[derive(Debug, Default)]
pub struct SkeletonBuilder {
    bones: Vec<Bone>,
    roots: Vec<BoneId>,
    by_name: HashMap<String, BoneId>,
}

impl SkeletonBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bone(
        &mut self,
        name: &str,
        parent: Option<&str>,
        pivot: [f32; 3],
        rest: BoneTransform,
    ) -> Result<BoneId, SkeletonError> {
        if self.by_name.contains_key(name) {
            return Err(SkeletonError::DuplicateBone {
                name: name.to_string(),
            });
        }
        let parent_id = match parent {
            Some(p) => Some(*self.by_name.get(p).ok_or_else(|| SkeletonError::MissingParent {
                bone: name.to_string(),
                parent: p.to_string(),
            })?),
            None => None,
        };

        let id = BoneId(self.bones.len() as u32);
        self.bones
            .push(Bone::new(id, name.to_string(), parent_id, pivot, rest));
        match parent_id {
            Some(pid) => self.bones[pid.index()].children.push(id),
            None => self.roots.push(id),
        }
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Chainable form of [`SkeletonBuilder::add_bone`] for the common case.
    pub fn bone(mut self, name: &str, parent: Option<&str>) -> Result<Self, SkeletonError> {
        self.add_bone(name, parent, [0.0; 3], BoneTransform::IDENTITY)?;
        Ok(self)
    }

    pub fn build(self) -> Skeleton {
        Skeleton {
            bones: self.bones,
            roots: self.roots,
            by_name: self.by_name,
        }
    }
}

/// A rigid bone tree owned by one baked model.
#[derive(Clone, Debug, Default)]
pub struct Skeleton {
    bones: Vec<Bone>,
    roots: Vec<BoneId>,
    by_name: HashMap<String, BoneId>,
}

impl Skeleton {
    pub fn builder() -> SkeletonBuilder {
        SkeletonBuilder::new()
    }

    /// Build from parent-first definitions (e.g. deserialized model data).
    pub fn from_defs(defs: &[BoneDef]) -> Result<Self, SkeletonError> {
        let mut builder = SkeletonBuilder::new();
        for def in defs {
            let rest = BoneTransform {
                rotation: def.rotation,
                ..BoneTransform::IDENTITY
            };
            let id = builder.add_bone(&def.name, def.parent.as_deref(), def.pivot, rest)?;
            if def.track_matrices {
                builder.bones[id.index()].track_matrices = true;
            }
        }
        Ok(builder.build())
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn roots(&self) -> &[BoneId] {
        &self.roots
    }

    pub fn bones(&self) -> impl Iterator<Item = &Bone> {
        self.bones.iter()
    }

    pub fn id_of(&self, name: &str) -> Option<BoneId> {
        self.by_name.get(name).copied()
    }

    /// Look a bone up by name. Content may legitimately omit bones.
    pub fn bone(&self, name: &str) -> Option<&Bone> {
        self.id_of(name).map(|id| &self.bones[id.index()])
    }

    pub fn bone_mut(&mut self, name: &str) -> Option<&mut Bone> {
        let id = self.id_of(name)?;
        self.bones.get_mut(id.index())
    }

    pub fn bone_by_id(&self, id: BoneId) -> Option<&Bone> {
        self.bones.get(id.index())
    }

    /// Enable or disable matrix tracking for a bone; returns false if absent.
    pub fn set_tracking(&mut self, name: &str, track: bool) -> bool {
        match self.bone_mut(name) {
            Some(bone) => {
                bone.set_tracking_matrices(track);
                true
            }
            None => false,
        }
    }

    pub fn reset_to_rest_pose(&mut self) {
        for bone in &mut self.bones {
            bone.reset_to_rest_pose();
        }
    }

    /// Resolve every bone's model-space matrix depth-first, parents before
    /// children, in one pass. Only tracked bones keep the result; `reference`
    /// maps model space into the renderer's local frame.
    ///
    /// Returns the number of bones visited.
    pub fn resolve_matrices(&mut self, reference: &Matrix4<f32>) -> usize {
        let mut visited = 0;
        let mut stack: Vec<(BoneId, Matrix4<f32>)> = self
            .roots
            .iter()
            .rev()
            .map(|id| (*id, Matrix4::identity()))
            .collect();

        while let Some((id, parent_matrix)) = stack.pop() {
            let bone = &mut self.bones[id.index()];
            let model = resolve_model_space_matrix(bone, &parent_matrix);
            if bone.track_matrices {
                bone.local_space = resolve_local_space_matrix(&model, reference);
                bone.model_space = model;
            }
            visited += 1;
            for child in bone.children.iter().rev() {
                stack.push((*child, model));
            }
        }
        visited
    }
}
