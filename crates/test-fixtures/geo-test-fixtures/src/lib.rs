//! Shared fixtures for the geo crates' tests: JSON skeletons and clip
//! libraries under `fixtures/`, plus small in-code builders.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use geo_animation_core::{
    AnimationClip, AnimationController, AnimationLibrary, BoneAnimation, BoneDef, ClipLoop,
    ControllerFactory, Keyframe, KeyframeChannel, RawAnimation, Skeleton,
};

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    animations: HashMap<String, String>,
    skeletons: HashMap<String, String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a>(map: &'a HashMap<String, String>, kind: &str, name: &str) -> Result<&'a String> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

pub mod animations {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.animations.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.animations, "animation", name)?;
        read_to_string(rel)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let rel = lookup(&MANIFEST.animations, "animation", name)?;
        super::load_json(rel)
    }

    /// Parsed and validated clip library.
    pub fn library(name: &str) -> Result<AnimationLibrary> {
        let text = json(name)?;
        AnimationLibrary::from_json_str(&text)
            .with_context(|| format!("invalid animation library fixture '{name}'"))
    }
}

pub mod skeletons {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.skeletons.keys().cloned().collect()
    }

    pub fn defs(name: &str) -> Result<Vec<BoneDef>> {
        let rel = lookup(&MANIFEST.skeletons, "skeleton", name)?;
        super::load_json(rel)
    }

    pub fn build(name: &str) -> Result<Skeleton> {
        let defs = defs(name)?;
        Skeleton::from_defs(&defs).with_context(|| format!("invalid skeleton fixture '{name}'"))
    }
}

/// Clip with a single constant position offset on `bone`.
pub fn constant_clip(name: &str, length: f32, mode: ClipLoop, bone: &str, offset: [f32; 3]) -> AnimationClip {
    AnimationClip::new(name, length, mode).with_bone(BoneAnimation {
        bone: bone.to_string(),
        position: KeyframeChannel::new(vec![Keyframe::new(0.0, offset)]),
        ..Default::default()
    })
}

/// Controllers of the biped fixture: a "main" controller looping idle or walk
/// by the `moving` flag, with jump/attack/sit triggerables, and an "arms"
/// controller that also declares "attack".
pub fn biped_controllers(moving: geo_animation_core::DataTicket<bool>) -> Vec<AnimationController> {
    vec![
        AnimationController::new("main")
            .triggerable("jump", RawAnimation::begin().then_play("jump"))
            .triggerable("attack", RawAnimation::begin().then_play("attack"))
            .triggerable("sit", RawAnimation::begin().then_play_and_hold("sit"))
            .with_state_handler(move |test| {
                if test.data(&moving).copied().unwrap_or(false) {
                    Some(RawAnimation::begin().then_loop("walk"))
                } else {
                    Some(RawAnimation::begin().then_loop("idle"))
                }
            }),
        AnimationController::new("arms")
            .triggerable("attack", RawAnimation::begin().then_play("attack")),
    ]
}

pub fn biped_factory(moving: geo_animation_core::DataTicket<bool>) -> ControllerFactory {
    Arc::new(move || biped_controllers(moving))
}
