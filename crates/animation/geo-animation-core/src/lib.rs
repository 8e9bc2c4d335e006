//! Geo Animation Core (engine-agnostic)
//!
//! Skeletal animation evaluation for host-rendered animatables: bone
//! hierarchies and matrix resolution, keyframed clips, per-instance controller
//! state machines with triggers and eased transitions, typed synced data, and
//! the instance caches that own it all. Host integration is limited to a
//! [`FrameContext`] per render and the [`GeoModel`] capability trait.

pub mod bone;
pub mod cache;
pub mod config;
pub mod controller;
pub mod data;
pub mod data_ticket;
pub mod error;
pub mod ids;
pub mod interp;
pub mod manager;
pub mod model;
pub mod raw_animation;
pub mod render;
pub mod sampling;
pub mod skeleton;

// Re-exports for consumers (renderers, networking)
pub use bone::{Bone, BoneTransform};
pub use cache::{
    AnimatableInstanceCache, ControllerFactory, InstancedAnimatableCache, SingletonAnimatableCache,
};
pub use config::Config;
pub use controller::{
    AnimationController, AnimationTest, ControllerSnapshot, ControllerState, ControllerStep,
    StateHandler,
};
pub use data::{AnimationClip, AnimationLibrary, BoneAnimation, ClipLoop, Keyframe, KeyframeChannel};
pub use data_ticket::{DataStore, DataTicket, ErasedValue, TicketKey};
pub use error::{AnimationError, SkeletonError};
pub use ids::{BoneId, InstanceId};
pub use interp::Easing;
pub use manager::{AnimatableManager, FrameContext, ManagerSnapshot, ManagerStep};
pub use model::{DefaultedGeoModel, GeoModel, ModelSubtype, ResourcePath};
pub use raw_animation::{LoopType, RawAnimation, Stage};
pub use render::{
    AnimatableRenderer, BoneFilterLayer, RenderContext, RenderHooks, RenderLayer, RenderOutcome,
};
pub use sampling::{apply_pose, sample_clip, Pose};
pub use skeleton::{BoneDef, Skeleton, SkeletonBuilder};
