//! Identifiers for animatable subjects and skeleton nodes.

use serde::{Deserialize, Serialize};

/// Stable 64-bit identifier for one animatable subject.
///
/// Entities use their network id, block entities their packed position and
/// items a composite stack id. Many short-lived host objects may share one id.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct InstanceId(pub u64);

impl From<u64> for InstanceId {
    #[inline]
    fn from(v: u64) -> Self {
        InstanceId(v)
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dense index of a bone inside its owning [`crate::skeleton::Skeleton`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BoneId(pub u32);

impl BoneId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
