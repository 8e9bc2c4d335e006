//! Geo Sync Core
//!
//! Keeps client-side animation state in step with an authoritative server.
//! The server encodes typed data-ticket values and animation triggers into
//! compact frames and routes them to the clients that can see the subject
//! (entity, block entity, or singleton instance riding on a related entity).
//! Clients decode on the receipt thread, queue, and apply on the tick thread
//! through the same path local calls use.

pub mod client;
pub mod config;
pub mod error;
pub mod inbound;
pub mod message;
pub mod network;
pub mod registry;
pub mod target;
pub mod transport;

pub use client::{ApplyOutcome, BoxedCache, ClientAnimatables};
pub use config::SyncConfig;
pub use error::SyncError;
pub use inbound::{inbound_channel, DrainReport, InboundQueue, InboundSender};
pub use message::{encode_data, encode_trigger, DataPayload, MessageKind, SyncAction, SyncMessage};
pub use network::{AnimSyncNetwork, Side};
pub use registry::TicketRegistry;
pub use target::{BlockPos, ChunkPos, EntityId, EntityRef, SyncTarget};
pub use transport::{PacketTarget, SyncTransport};
