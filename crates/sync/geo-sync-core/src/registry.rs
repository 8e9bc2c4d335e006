//! Serializable data tickets known to both ends of the connection.
//!
//! A ticket must be registered, with the same value type, on the sending and
//! receiving side before values for it can cross the wire. The registry keeps
//! one type-erased decoder per ticket id.

use std::any::Any;

use bincode::Options;
use hashbrown::HashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use geo_animation_core::{DataTicket, ErasedValue, TicketKey};

use crate::error::SyncError;

type DecodeFn = fn(&[u8], u64) -> Result<ErasedValue, bincode::Error>;

pub(crate) fn payload_options(limit: u64) -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(limit)
        .reject_trailing_bytes()
}

fn decode_erased<D>(bytes: &[u8], limit: u64) -> Result<ErasedValue, bincode::Error>
where
    D: DeserializeOwned + Any + Send + Sync,
{
    let value: D = payload_options(limit).deserialize(bytes)?;
    Ok(Box::new(value))
}

#[derive(Clone, Copy)]
struct RegisteredTicket {
    key: TicketKey,
    decode: DecodeFn,
}

#[derive(Default, Clone)]
pub struct TicketRegistry {
    tickets: HashMap<&'static str, RegisteredTicket>,
}

impl std::fmt::Debug for TicketRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids = self.ids();
        ids.sort_unstable();
        f.debug_struct("TicketRegistry").field("tickets", &ids).finish()
    }
}

impl TicketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a ticket. Registering the same ticket twice is a no-op;
    /// reusing an id with a different value type is an error.
    pub fn register<D>(&mut self, ticket: &DataTicket<D>) -> Result<(), SyncError>
    where
        D: Serialize + DeserializeOwned + Any + Send + Sync,
    {
        let key = ticket.key();
        if let Some(existing) = self.tickets.get(key.id()) {
            if existing.key == key {
                return Ok(());
            }
            return Err(SyncError::TicketConflict {
                id: key.id().to_string(),
                registered: existing.key.type_name(),
                requested: key.type_name(),
            });
        }
        self.tickets.insert(
            key.id(),
            RegisteredTicket {
                key,
                decode: decode_erased::<D>,
            },
        );
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tickets.contains_key(id)
    }

    pub fn key(&self, id: &str) -> Option<TicketKey> {
        self.tickets.get(id).map(|t| t.key)
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.tickets.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// Serialize a value for `ticket`, which must be registered with the same type.
    pub fn encode_value<D>(
        &self,
        ticket: &DataTicket<D>,
        value: &D,
        max_payload_bytes: usize,
    ) -> Result<Vec<u8>, SyncError>
    where
        D: Serialize + Any,
    {
        let key = ticket.key();
        match self.tickets.get(key.id()) {
            None => {
                return Err(SyncError::UnknownTicket {
                    id: key.id().to_string(),
                })
            }
            Some(existing) if existing.key != key => {
                return Err(SyncError::TicketConflict {
                    id: key.id().to_string(),
                    registered: existing.key.type_name(),
                    requested: key.type_name(),
                })
            }
            Some(_) => {}
        }
        let bytes = payload_options(max_payload_bytes as u64)
            .serialize(value)
            .map_err(|e| SyncError::Payload {
                ticket: key.id().to_string(),
                reason: e.to_string(),
            })?;
        Ok(bytes)
    }

    /// Decode a payload for the ticket registered under `id`.
    pub fn decode_value(
        &self,
        id: &str,
        bytes: &[u8],
        max_payload_bytes: usize,
    ) -> Result<(TicketKey, ErasedValue), SyncError> {
        let ticket = self.tickets.get(id).ok_or_else(|| SyncError::UnknownTicket {
            id: id.to_string(),
        })?;
        if bytes.len() > max_payload_bytes {
            return Err(SyncError::Oversize {
                len: bytes.len(),
                max: max_payload_bytes,
            });
        }
        let value = (ticket.decode)(bytes, max_payload_bytes as u64).map_err(|e| {
            SyncError::Payload {
                ticket: id.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok((ticket.key, value))
    }
}
