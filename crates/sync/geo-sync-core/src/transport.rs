//! Outbound delivery seam. The host's packet layer implements
//! [`SyncTransport`]; this crate only decides who should receive a frame.

use crate::target::{ChunkPos, EntityId};

/// Audience of an outbound frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PacketTarget {
    /// Every client currently tracking the entity.
    TrackingEntity(EntityId),
    /// As [`PacketTarget::TrackingEntity`], plus the entity's own client.
    TrackingEntityAndSelf(EntityId),
    /// Every client with the chunk loaded.
    TrackingChunk(ChunkPos),
}

pub trait SyncTransport {
    /// Hand one encoded frame to the host for delivery. Delivery is ordered
    /// per connection but may be dropped for clients outside the audience.
    fn send(&self, target: PacketTarget, frame: Vec<u8>);
}

impl<T: SyncTransport + ?Sized> SyncTransport for &T {
    fn send(&self, target: PacketTarget, frame: Vec<u8>) {
        (**self).send(target, frame)
    }
}

impl<T: SyncTransport + ?Sized> SyncTransport for std::sync::Arc<T> {
    fn send(&self, target: PacketTarget, frame: Vec<u8>) {
        (**self).send(target, frame)
    }
}
