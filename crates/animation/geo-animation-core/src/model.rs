//! Model capability trait and the conventional asset layout.
//!
//! A [`GeoModel`] names the model, texture and animation resources of an
//! animatable and decides how its animations are applied each frame.
//! [`DefaultedGeoModel`] derives all three resources from one base path and a
//! subtype directory (`entity`, `block`, `item`, ...).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::AnimationLibrary;
use crate::error::AnimationError;
use crate::ids::InstanceId;
use crate::manager::{AnimatableManager, FrameContext};
use crate::skeleton::Skeleton;

pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Namespaced asset path, written `namespace:path`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourcePath {
    namespace: String,
    path: String,
}

fn valid_namespace(ns: &str) -> bool {
    !ns.is_empty()
        && ns
            .bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.'))
}

fn valid_path(path: &str) -> bool {
    !path.is_empty()
        && path
            .bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b'/'))
}

impl ResourcePath {
    pub fn new(namespace: &str, path: &str) -> Result<Self, AnimationError> {
        if !valid_namespace(namespace) {
            return Err(AnimationError::InvalidData {
                reason: format!("invalid resource namespace '{namespace}'"),
            });
        }
        if !valid_path(path) {
            return Err(AnimationError::InvalidData {
                reason: format!("invalid resource path '{path}'"),
            });
        }
        Ok(Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        })
    }

    /// Parse `namespace:path`; a bare `path` uses [`DEFAULT_NAMESPACE`].
    pub fn parse(raw: &str) -> Result<Self, AnimationError> {
        match raw.split_once(':') {
            Some((ns, path)) => Self::new(ns, path),
            None => Self::new(DEFAULT_NAMESPACE, raw),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn with_prefix(&self, prefix: &str) -> Self {
        Self {
            namespace: self.namespace.clone(),
            path: format!("{prefix}{}", self.path),
        }
    }

    pub fn with_path(&self, path: impl Into<String>) -> Self {
        Self {
            namespace: self.namespace.clone(),
            path: path.into(),
        }
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for ResourcePath {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourcePath {
    type Error = AnimationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourcePath> for String {
    fn from(value: ResourcePath) -> Self {
        value.to_string()
    }
}

/// What a renderer needs from a model.
pub trait GeoModel {
    fn model_resource(&self) -> &ResourcePath;
    fn texture_resource(&self) -> &ResourcePath;
    fn animation_resource(&self) -> &ResourcePath;

    /// Advance the instance's controllers and pose `skeleton`.
    /// Returns whether any controller changed state.
    fn handle_animations(
        &self,
        instance: InstanceId,
        manager: &mut AnimatableManager,
        frame: &FrameContext,
        library: &AnimationLibrary,
        skeleton: &mut Skeleton,
    ) -> bool {
        let changed = manager.update(frame, library, skeleton);
        if !frame.is_re_render {
            self.set_custom_animations(instance, manager, frame, skeleton);
        }
        changed
    }

    /// Procedural adjustments applied after keyframed animation, e.g. head
    /// rotation following a look target.
    fn set_custom_animations(
        &self,
        _instance: InstanceId,
        _manager: &AnimatableManager,
        _frame: &FrameContext,
        _skeleton: &mut Skeleton,
    ) {
    }
}

/// Asset subdirectory a defaulted model sorts its files into.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSubtype {
    Entity,
    Block,
    Item,
    Custom(String),
}

impl ModelSubtype {
    pub fn as_str(&self) -> &str {
        match self {
            ModelSubtype::Entity => "entity",
            ModelSubtype::Block => "block",
            ModelSubtype::Item => "item",
            ModelSubtype::Custom(s) => s,
        }
    }
}

/// Model whose resources follow the conventional layout:
/// - model: `ns:{subtype}/{path}`
/// - animations: `ns:{subtype}/{path}`
/// - texture: `ns:textures/{subtype}/{path}.png`
#[derive(Clone, Debug, PartialEq)]
pub struct DefaultedGeoModel {
    subtype: ModelSubtype,
    model: ResourcePath,
    texture: ResourcePath,
    animations: ResourcePath,
}

impl DefaultedGeoModel {
    pub fn new(subtype: ModelSubtype, base: &ResourcePath) -> Self {
        Self {
            model: model_path(&subtype, base),
            texture: texture_path(&subtype, base),
            animations: model_path(&subtype, base),
            subtype,
        }
    }

    pub fn entity(base: &ResourcePath) -> Self {
        Self::new(ModelSubtype::Entity, base)
    }

    pub fn block(base: &ResourcePath) -> Self {
        Self::new(ModelSubtype::Block, base)
    }

    pub fn item(base: &ResourcePath) -> Self {
        Self::new(ModelSubtype::Item, base)
    }

    pub fn subtype(&self) -> &ModelSubtype {
        &self.subtype
    }

    /// Share another animatable's model file.
    pub fn with_alt_model(mut self, alt: &ResourcePath) -> Self {
        self.model = model_path(&self.subtype, alt);
        self
    }

    pub fn with_alt_texture(mut self, alt: &ResourcePath) -> Self {
        self.texture = texture_path(&self.subtype, alt);
        self
    }

    pub fn with_alt_animations(mut self, alt: &ResourcePath) -> Self {
        self.animations = model_path(&self.subtype, alt);
        self
    }
}

fn model_path(subtype: &ModelSubtype, base: &ResourcePath) -> ResourcePath {
    base.with_prefix(&format!("{}/", subtype.as_str()))
}

fn texture_path(subtype: &ModelSubtype, base: &ResourcePath) -> ResourcePath {
    base.with_path(format!("textures/{}/{}.png", subtype.as_str(), base.path()))
}

impl GeoModel for DefaultedGeoModel {
    fn model_resource(&self) -> &ResourcePath {
        &self.model
    }

    fn texture_resource(&self) -> &ResourcePath {
        &self.texture
    }

    fn animation_resource(&self) -> &ResourcePath {
        &self.animations
    }
}
