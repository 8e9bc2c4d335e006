//! Clip sampling and pose composition.
//!
//! Model:
//! - A channel sampled before its first keyframe holds the first value, after
//!   its last keyframe holds the last value.
//! - Between keyframes the right keyframe's easing shapes progress, then the
//!   value is lerped component-wise.
//! - A clip sample is a [`Pose`]: per-bone offsets from the rest pose. Bones
//!   the clip does not touch are absent from the pose.

use hashbrown::HashMap;

use crate::bone::BoneTransform;
use crate::data::{AnimationClip, KeyframeChannel};
use crate::interp::functions::lerp_vec3;
use crate::skeleton::Skeleton;

/// Sample one channel at `time` seconds. `None` when the channel is empty.
pub fn sample_channel(channel: &KeyframeChannel, time: f32) -> Option<[f32; 3]> {
    let keys = &channel.keyframes;
    let first = keys.first()?;
    if keys.len() == 1 || time <= first.time {
        return Some(first.value);
    }
    let last = &keys[keys.len() - 1];
    if time >= last.time {
        return Some(last.value);
    }
    // Index of the first keyframe strictly after `time`.
    let right_idx = keys.partition_point(|k| k.time <= time);
    let left = &keys[right_idx - 1];
    let right = &keys[right_idx];
    let span = (right.time - left.time).max(f32::EPSILON);
    let progress = right.easing.apply((time - left.time) / span);
    Some(lerp_vec3(left.value, right.value, progress))
}

/// Per-bone offsets produced by sampling or blending clips.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pose {
    offsets: HashMap<String, BoneTransform>,
}

impl Pose {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bone: &str, offset: BoneTransform) {
        self.offsets.insert(bone.to_string(), offset);
    }

    pub fn get(&self, bone: &str) -> Option<&BoneTransform> {
        self.offsets.get(bone)
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoneTransform)> {
        self.offsets.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overlay `other` on top of this pose; bones present in both take `other`'s offset.
    pub fn overlay(&mut self, other: Pose) {
        self.offsets.extend(other.offsets);
    }

    /// Blend towards `target` by weight `t`. A bone missing on one side blends
    /// against the identity offset, so it eases in or out of its rest pose.
    pub fn blend(&self, target: &Pose, t: f32) -> Pose {
        let mut out = Pose::new();
        for (bone, from) in &self.offsets {
            let to = target.offsets.get(bone).unwrap_or(&BoneTransform::IDENTITY);
            out.offsets.insert(bone.clone(), from.lerp(to, t));
        }
        for (bone, to) in &target.offsets {
            if !self.offsets.contains_key(bone) {
                out.offsets
                    .insert(bone.clone(), BoneTransform::IDENTITY.lerp(to, t));
            }
        }
        out
    }
}

/// Sample every animated bone of `clip` at `time` seconds.
pub fn sample_clip(clip: &AnimationClip, time: f32) -> Pose {
    let mut pose = Pose::new();
    for anim in &clip.bones {
        let mut offset = BoneTransform::IDENTITY;
        let mut touched = false;
        if let Some(rot) = sample_channel(&anim.rotation, time) {
            offset.rotation = rot.map(f32::to_radians);
            touched = true;
        }
        if let Some(pos) = sample_channel(&anim.position, time) {
            offset.position = pos;
            touched = true;
        }
        if let Some(scale) = sample_channel(&anim.scale, time) {
            offset.scale = scale;
            touched = true;
        }
        if touched {
            pose.insert(&anim.bone, offset);
        }
    }
    pose
}

/// Combine a rest pose with an animation offset: rotation and position add,
/// scale multiplies.
pub fn compose(rest: &BoneTransform, offset: &BoneTransform) -> BoneTransform {
    BoneTransform {
        position: [
            rest.position[0] + offset.position[0],
            rest.position[1] + offset.position[1],
            rest.position[2] + offset.position[2],
        ],
        rotation: [
            rest.rotation[0] + offset.rotation[0],
            rest.rotation[1] + offset.rotation[1],
            rest.rotation[2] + offset.rotation[2],
        ],
        scale: [
            rest.scale[0] * offset.scale[0],
            rest.scale[1] * offset.scale[1],
            rest.scale[2] * offset.scale[2],
        ],
    }
}

/// Reset the skeleton to its rest pose and write `pose` on top.
/// Returns how many posed bones were missing from the skeleton.
pub fn apply_pose(skeleton: &mut Skeleton, pose: &Pose) -> usize {
    skeleton.reset_to_rest_pose();
    let mut missing = 0;
    for (name, offset) in pose.iter() {
        match skeleton.bone_mut(name) {
            Some(bone) => {
                let posed = compose(bone.rest_pose(), offset);
                bone.set_transform(posed);
            }
            None => {
                log::debug!("pose targets bone '{name}' which the model does not have");
                missing += 1;
            }
        }
    }
    missing
}
