//! Clip data model: keyframed bone channels grouped into named clips, and the
//! library a model's controllers resolve clip names against.
//!
//! Rotation keyframes are authored in degrees; positions in model units.
//! Values are offsets applied on top of each bone's rest pose.

use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::AnimationError;
use crate::interp::Easing;

/// What a clip does when its local time reaches its length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipLoop {
    #[default]
    PlayOnce,
    Loop,
    HoldOnLastFrame,
}

/// A single keyframe. `easing` shapes the segment arriving at this keyframe.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Seconds from clip start.
    pub time: f32,
    pub value: [f32; 3],
    #[serde(default)]
    pub easing: Easing,
}

impl Keyframe {
    pub fn new(time: f32, value: [f32; 3]) -> Self {
        Self {
            time,
            value,
            easing: Easing::Linear,
        }
    }

    pub fn eased(time: f32, value: [f32; 3], easing: Easing) -> Self {
        Self {
            time,
            value,
            easing,
        }
    }
}

/// Time-ordered keyframes for one channel of one bone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyframeChannel {
    pub keyframes: Vec<Keyframe>,
}

impl KeyframeChannel {
    pub fn new(keyframes: Vec<Keyframe>) -> Self {
        Self { keyframes }
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }
}

/// Channels animating one named bone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoneAnimation {
    pub bone: String,
    #[serde(default)]
    pub rotation: KeyframeChannel,
    #[serde(default)]
    pub position: KeyframeChannel,
    #[serde(default)]
    pub scale: KeyframeChannel,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub name: String,
    #[serde(rename = "length")]
    pub length_secs: f32,
    #[serde(default, rename = "loop")]
    pub loop_mode: ClipLoop,
    #[serde(default)]
    pub bones: Vec<BoneAnimation>,
}

impl AnimationClip {
    pub fn new(name: &str, length_secs: f32, loop_mode: ClipLoop) -> Self {
        Self {
            name: name.to_string(),
            length_secs,
            loop_mode,
            bones: Vec::new(),
        }
    }

    pub fn with_bone(mut self, bone: BoneAnimation) -> Self {
        self.bones.push(bone);
        self
    }

    /// Validate basic invariants (finite non-negative length, keyframes
    /// ordered and inside the clip).
    pub fn validate(&self) -> Result<(), AnimationError> {
        if !self.length_secs.is_finite() || self.length_secs < 0.0 {
            return Err(AnimationError::InvalidData {
                reason: format!("clip '{}' has invalid length {}", self.name, self.length_secs),
            });
        }
        for bone in &self.bones {
            for (channel, label) in [
                (&bone.rotation, "rotation"),
                (&bone.position, "position"),
                (&bone.scale, "scale"),
            ] {
                let mut last = f32::NEG_INFINITY;
                for k in &channel.keyframes {
                    if !k.time.is_finite() || k.time < 0.0 || k.time > self.length_secs + 1e-4 {
                        return Err(AnimationError::InvalidData {
                            reason: format!(
                                "clip '{}' bone '{}' {label} keyframe at {} is outside [0, {}]",
                                self.name, bone.bone, k.time, self.length_secs
                            ),
                        });
                    }
                    if k.time < last {
                        return Err(AnimationError::InvalidData {
                            reason: format!(
                                "clip '{}' bone '{}' {label} keyframes are not time-ordered",
                                self.name, bone.bone
                            ),
                        });
                    }
                    last = k.time;
                }
            }
        }
        Ok(())
    }
}

/// Named clips available to one model. Clips are shared, never mutated.
#[derive(Clone, Debug, Default)]
pub struct AnimationLibrary {
    clips: HashMap<String, Arc<AnimationClip>>,
}

impl AnimationLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON array of clips, validating each one.
    pub fn from_json_str(raw: &str) -> Result<Self, AnimationError> {
        let clips: Vec<AnimationClip> =
            serde_json::from_str(raw).map_err(|e| AnimationError::InvalidData {
                reason: e.to_string(),
            })?;
        let mut lib = Self::new();
        for clip in clips {
            lib.insert(clip)?;
        }
        Ok(lib)
    }

    /// Insert or replace a clip by name.
    pub fn insert(&mut self, clip: AnimationClip) -> Result<(), AnimationError> {
        clip.validate()?;
        self.clips.insert(clip.name.clone(), Arc::new(clip));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<AnimationClip>> {
        self.clips.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clips.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.clips.keys().map(|k| k.as_str())
    }
}
