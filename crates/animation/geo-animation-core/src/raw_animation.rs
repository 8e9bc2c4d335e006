//! Ordered animation stages requested from a controller.
//!
//! A [`RawAnimation`] names clips rather than holding them; clips are resolved
//! against the model's [`crate::data::AnimationLibrary`] when a stage starts.

use serde::{Deserialize, Serialize};

use crate::data::ClipLoop;

/// How a stage behaves at the end of its clip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopType {
    /// Use the loop mode stored on the clip.
    #[default]
    ClipDefault,
    PlayOnce,
    Loop,
    HoldOnLastFrame,
}

impl LoopType {
    pub fn resolve(self, clip_default: ClipLoop) -> ClipLoop {
        match self {
            LoopType::ClipDefault => clip_default,
            LoopType::PlayOnce => ClipLoop::PlayOnce,
            LoopType::Loop => ClipLoop::Loop,
            LoopType::HoldOnLastFrame => ClipLoop::HoldOnLastFrame,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stage {
    pub animation: String,
    #[serde(default)]
    pub loop_type: LoopType,
}

/// Builder-style list of stages, played in order.
///
/// ```
/// use geo_animation_core::RawAnimation;
/// let raw = RawAnimation::begin().then_play("draw").then_loop("aim");
/// assert_eq!(raw.stages().len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawAnimation {
    stages: Vec<Stage>,
}

impl RawAnimation {
    pub fn begin() -> Self {
        Self::default()
    }

    pub fn then(mut self, animation: &str, loop_type: LoopType) -> Self {
        self.stages.push(Stage {
            animation: animation.to_string(),
            loop_type,
        });
        self
    }

    pub fn then_play(self, animation: &str) -> Self {
        self.then(animation, LoopType::PlayOnce)
    }

    pub fn then_loop(self, animation: &str) -> Self {
        self.then(animation, LoopType::Loop)
    }

    pub fn then_play_and_hold(self, animation: &str) -> Self {
        self.then(animation, LoopType::HoldOnLastFrame)
    }

    /// Single-stage animation using the clip's own loop mode.
    pub fn clip(animation: &str) -> Self {
        Self::begin().then(animation, LoopType::ClipDefault)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
