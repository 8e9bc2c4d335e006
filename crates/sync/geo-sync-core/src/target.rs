//! Host-side identities animation state is synchronized against.

use std::fmt;

use serde::{Deserialize, Serialize};

use geo_animation_core::InstanceId;

/// Network id of a host entity.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EntityId(pub i32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// An entity as seen by the sending side.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct EntityRef {
    pub id: EntityId,
    /// The entity is a player (or otherwise driven by a connected client) that
    /// must receive its own updates.
    pub has_controlling_client: bool,
}

impl EntityRef {
    pub fn new(id: i32) -> Self {
        Self {
            id: EntityId(id),
            has_controlling_client: false,
        }
    }

    pub fn player(id: i32) -> Self {
        Self {
            id: EntityId(id),
            has_controlling_client: true,
        }
    }
}

/// Integer block position.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

const XZ_BITS: u32 = 26;
const Y_BITS: u32 = 12;
const XZ_MASK: i64 = (1 << XZ_BITS) - 1;
const Y_MASK: i64 = (1 << Y_BITS) - 1;
const Z_SHIFT: u32 = Y_BITS;
const X_SHIFT: u32 = Y_BITS + XZ_BITS;

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Pack into one 64-bit value: 26 bits x, 26 bits z, 12 bits y.
    pub fn as_long(&self) -> i64 {
        ((self.x as i64 & XZ_MASK) << X_SHIFT)
            | ((self.z as i64 & XZ_MASK) << Z_SHIFT)
            | (self.y as i64 & Y_MASK)
    }

    pub fn from_long(packed: i64) -> Self {
        Self {
            x: (packed >> X_SHIFT) as i32,
            y: ((packed << (64 - Y_BITS)) >> (64 - Y_BITS)) as i32,
            z: ((packed << (64 - X_SHIFT)) >> (64 - XZ_BITS)) as i32,
        }
    }

    /// Chunk column containing this position.
    pub fn chunk(&self) -> ChunkPos {
        ChunkPos {
            x: self.x >> 4,
            z: self.z >> 4,
        }
    }

    /// Instance id a block entity at this position animates under.
    pub fn instance_id(&self) -> InstanceId {
        InstanceId(self.as_long() as u64)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

/// What a synchronized message is about.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SyncTarget {
    Entity(EntityId),
    BlockEntity(BlockPos),
    /// An instance of a singleton animatable, identified by the animatable's
    /// registered sync id. `related` is the entity whose tracking scope
    /// carries the message (e.g. the player holding an item).
    Singleton {
        sync_id: String,
        instance: InstanceId,
        related: EntityId,
    },
}

impl SyncTarget {
    pub fn instance_id(&self) -> InstanceId {
        match self {
            SyncTarget::Entity(id) => InstanceId(id.0 as u32 as u64),
            SyncTarget::BlockEntity(pos) => pos.instance_id(),
            SyncTarget::Singleton { instance, .. } => *instance,
        }
    }
}

impl fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncTarget::Entity(id) => write!(f, "{id}"),
            SyncTarget::BlockEntity(pos) => write!(f, "block entity at {pos}"),
            SyncTarget::Singleton {
                sync_id, instance, ..
            } => write!(f, "{sync_id} instance {instance}"),
        }
    }
}
