//! Wire frames for data-sync and trigger messages.
//!
//! Frame layout (bincode, fixed-width integers, little endian):
//!   `kind: u8` then a kind-specific body
//!   - data:    `(target, ticket_id: String, payload: Vec<u8>)`
//!   - trigger: `(target, controller: Option<String>, animation: String)`
//!
//! where `target` is an `i32` entity id, an `i64` packed block position, or
//! `(sync_id: String, instance: u64, related_entity: i32)` for singletons.
//! Decoding consumes the whole frame; anything left over is an error.

use std::fmt;

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use geo_animation_core::{DataTicket, ErasedValue, InstanceId, TicketKey};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::registry::TicketRegistry;
use crate::target::{BlockPos, EntityId, SyncTarget};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    EntityData = 0,
    EntityTrigger = 1,
    BlockEntityData = 2,
    BlockEntityTrigger = 3,
    SingletonData = 4,
    SingletonTrigger = 5,
}

impl MessageKind {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => MessageKind::EntityData,
            1 => MessageKind::EntityTrigger,
            2 => MessageKind::BlockEntityData,
            3 => MessageKind::BlockEntityTrigger,
            4 => MessageKind::SingletonData,
            5 => MessageKind::SingletonTrigger,
            _ => return None,
        })
    }

    fn of(target: &SyncTarget, is_trigger: bool) -> Self {
        match (target, is_trigger) {
            (SyncTarget::Entity(_), false) => MessageKind::EntityData,
            (SyncTarget::Entity(_), true) => MessageKind::EntityTrigger,
            (SyncTarget::BlockEntity(_), false) => MessageKind::BlockEntityData,
            (SyncTarget::BlockEntity(_), true) => MessageKind::BlockEntityTrigger,
            (SyncTarget::Singleton { .. }, false) => MessageKind::SingletonData,
            (SyncTarget::Singleton { .. }, true) => MessageKind::SingletonTrigger,
        }
    }

    pub fn is_trigger(self) -> bool {
        matches!(
            self,
            MessageKind::EntityTrigger
                | MessageKind::BlockEntityTrigger
                | MessageKind::SingletonTrigger
        )
    }
}

/// A ticket value decoded against the registry, ready to be stored.
pub struct DataPayload {
    pub key: TicketKey,
    pub value: ErasedValue,
}

impl fmt::Debug for DataPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataPayload")
            .field("ticket", &self.key.id())
            .field("type", &self.key.type_name())
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum SyncAction {
    SetData(DataPayload),
    Trigger {
        controller: Option<String>,
        animation: String,
    },
}

/// A decoded inbound message. `Send`, so it can be handed from the receipt
/// thread to the tick thread.
#[derive(Debug)]
pub struct SyncMessage {
    pub target: SyncTarget,
    pub action: SyncAction,
}

fn frame_options(limit: usize) -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(limit as u64)
        .allow_trailing_bytes()
}

fn malformed(e: bincode::Error) -> SyncError {
    SyncError::Malformed {
        reason: e.to_string(),
    }
}

type SingletonWire = (String, u64, i32);

fn write_part<T: Serialize + ?Sized>(out: &mut Vec<u8>, part: &T, cfg: &SyncConfig) -> Result<(), SyncError> {
    frame_options(cfg.max_message_bytes)
        .serialize_into(&mut *out, part)
        .map_err(malformed)
}

fn write_target(out: &mut Vec<u8>, target: &SyncTarget, cfg: &SyncConfig) -> Result<(), SyncError> {
    match target {
        SyncTarget::Entity(id) => write_part(out, &id.0, cfg),
        SyncTarget::BlockEntity(pos) => write_part(out, &pos.as_long(), cfg),
        SyncTarget::Singleton {
            sync_id,
            instance,
            related,
        } => write_part(out, &(sync_id.as_str(), instance.0, related.0), cfg),
    }
}

fn finish(out: Vec<u8>, cfg: &SyncConfig) -> Result<Vec<u8>, SyncError> {
    if out.len() > cfg.max_message_bytes {
        return Err(SyncError::Oversize {
            len: out.len(),
            max: cfg.max_message_bytes,
        });
    }
    Ok(out)
}

/// Encode a data-sync frame for `ticket`, which must be registered.
pub fn encode_data<D>(
    target: &SyncTarget,
    ticket: &DataTicket<D>,
    value: &D,
    registry: &TicketRegistry,
    cfg: &SyncConfig,
) -> Result<Vec<u8>, SyncError>
where
    D: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let payload = registry.encode_value(ticket, value, cfg.max_payload_bytes)?;
    let mut out = vec![MessageKind::of(target, false).tag()];
    write_target(&mut out, target, cfg)?;
    write_part(&mut out, &(ticket.id(), payload), cfg)?;
    finish(out, cfg)
}

/// Encode a trigger frame. `controller: None` lets the receiver pick the first
/// controller declaring `animation`.
pub fn encode_trigger(
    target: &SyncTarget,
    controller: Option<&str>,
    animation: &str,
    cfg: &SyncConfig,
) -> Result<Vec<u8>, SyncError> {
    let mut out = vec![MessageKind::of(target, true).tag()];
    write_target(&mut out, target, cfg)?;
    write_part(&mut out, &(controller, animation), cfg)?;
    finish(out, cfg)
}

fn read_part<T: DeserializeOwned>(reader: &mut &[u8], cfg: &SyncConfig) -> Result<T, SyncError> {
    frame_options(cfg.max_message_bytes)
        .deserialize_from(reader)
        .map_err(malformed)
}

fn read_target(kind: MessageKind, reader: &mut &[u8], cfg: &SyncConfig) -> Result<SyncTarget, SyncError> {
    Ok(match kind {
        MessageKind::EntityData | MessageKind::EntityTrigger => {
            SyncTarget::Entity(EntityId(read_part::<i32>(reader, cfg)?))
        }
        MessageKind::BlockEntityData | MessageKind::BlockEntityTrigger => {
            SyncTarget::BlockEntity(BlockPos::from_long(read_part::<i64>(reader, cfg)?))
        }
        MessageKind::SingletonData | MessageKind::SingletonTrigger => {
            let (sync_id, instance, related): SingletonWire = read_part(reader, cfg)?;
            SyncTarget::Singleton {
                sync_id,
                instance: InstanceId(instance),
                related: EntityId(related),
            }
        }
    })
}

impl SyncMessage {
    /// Decode one frame. Safe to call on any thread; nothing is mutated.
    pub fn decode(bytes: &[u8], registry: &TicketRegistry, cfg: &SyncConfig) -> Result<Self, SyncError> {
        if bytes.len() > cfg.max_message_bytes {
            return Err(SyncError::Oversize {
                len: bytes.len(),
                max: cfg.max_message_bytes,
            });
        }
        let (&tag, mut reader) = bytes.split_first().ok_or_else(|| SyncError::Malformed {
            reason: "empty frame".into(),
        })?;
        let kind = MessageKind::from_tag(tag).ok_or(SyncError::UnknownKind { tag })?;
        let target = read_target(kind, &mut reader, cfg)?;

        let action = if kind.is_trigger() {
            let (controller, animation): (Option<String>, String) = read_part(&mut reader, cfg)?;
            SyncAction::Trigger {
                controller,
                animation,
            }
        } else {
            let (ticket, payload): (String, Vec<u8>) = read_part(&mut reader, cfg)?;
            let (key, value) = registry.decode_value(&ticket, &payload, cfg.max_payload_bytes)?;
            SyncAction::SetData(DataPayload { key, value })
        };

        if !reader.is_empty() {
            return Err(SyncError::TrailingBytes {
                count: reader.len(),
            });
        }
        Ok(Self { target, action })
    }

    pub fn kind(&self) -> MessageKind {
        MessageKind::of(&self.target, matches!(self.action, SyncAction::Trigger { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEED: DataTicket<f32> = DataTicket::new("test:speed");

    fn registry() -> TicketRegistry {
        let mut reg = TicketRegistry::new();
        reg.register(&SPEED).unwrap();
        reg
    }

    fn singleton() -> SyncTarget {
        SyncTarget::Singleton {
            sync_id: "geo:wand".into(),
            instance: InstanceId(991),
            related: EntityId(4),
        }
    }

    #[test]
    fn data_frame_decodes_typed_value() {
        let cfg = SyncConfig::default();
        let reg = registry();
        let target = SyncTarget::BlockEntity(BlockPos::new(-10, 64, 300));
        let bytes = encode_data(&target, &SPEED, &1.5, &reg, &cfg).unwrap();
        assert_eq!(bytes[0], MessageKind::BlockEntityData.tag());

        let msg = SyncMessage::decode(&bytes, &reg, &cfg).unwrap();
        assert_eq!(msg.target, target);
        assert_eq!(msg.kind(), MessageKind::BlockEntityData);
        match msg.action {
            SyncAction::SetData(p) => {
                assert_eq!(p.key, SPEED.key());
                assert_eq!(p.value.downcast_ref::<f32>(), Some(&1.5));
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn trigger_frame_keeps_optional_controller() {
        let cfg = SyncConfig::default();
        let reg = registry();
        for controller in [None, Some("main")] {
            let bytes = encode_trigger(&singleton(), controller, "swing", &cfg).unwrap();
            let msg = SyncMessage::decode(&bytes, &reg, &cfg).unwrap();
            assert_eq!(msg.target, singleton());
            match msg.action {
                SyncAction::Trigger {
                    controller: c,
                    animation,
                } => {
                    assert_eq!(c.as_deref(), controller);
                    assert_eq!(animation, "swing");
                }
                other => panic!("unexpected action {other:?}"),
            }
        }
    }

    #[test]
    fn malformed_frames_are_rejected() {
        let cfg = SyncConfig::default();
        let reg = registry();
        let bytes = encode_trigger(&SyncTarget::Entity(EntityId(3)), None, "jump", &cfg).unwrap();

        assert!(matches!(
            SyncMessage::decode(&[], &reg, &cfg),
            Err(SyncError::Malformed { .. })
        ));
        let mut bad_kind = bytes.clone();
        bad_kind[0] = 42;
        assert_eq!(
            SyncMessage::decode(&bad_kind, &reg, &cfg).unwrap_err(),
            SyncError::UnknownKind { tag: 42 }
        );
        assert!(matches!(
            SyncMessage::decode(&bytes[..bytes.len() - 2], &reg, &cfg),
            Err(SyncError::Malformed { .. })
        ));
        let mut trailing = bytes.clone();
        trailing.extend_from_slice(&[0, 0, 0]);
        assert_eq!(
            SyncMessage::decode(&trailing, &reg, &cfg).unwrap_err(),
            SyncError::TrailingBytes { count: 3 }
        );
    }

    #[test]
    fn unknown_ticket_is_rejected_on_decode() {
        let cfg = SyncConfig::default();
        let bytes = encode_data(&SyncTarget::Entity(EntityId(1)), &SPEED, &2.0, &registry(), &cfg).unwrap();
        assert_eq!(
            SyncMessage::decode(&bytes, &TicketRegistry::new(), &cfg).unwrap_err(),
            SyncError::UnknownTicket {
                id: "test:speed".into()
            }
        );
    }

    #[test]
    fn oversize_frames_are_rejected() {
        let cfg = SyncConfig {
            max_message_bytes: 16,
            max_payload_bytes: 8,
        };
        let target = SyncTarget::Entity(EntityId(1));
        assert!(matches!(
            encode_trigger(&target, Some("a-very-long-controller"), "jump", &cfg),
            Err(SyncError::Malformed { .. } | SyncError::Oversize { .. })
        ));
        assert!(matches!(
            SyncMessage::decode(&[0u8; 17], &registry(), &cfg),
            Err(SyncError::Oversize { len: 17, max: 16 })
        ));
    }

    #[test]
    fn decoded_messages_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<SyncMessage>();
    }
}
