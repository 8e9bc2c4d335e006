//! Typed keys and the per-instance synced data store.
//!
//! A [`DataTicket<D>`] pairs a string id with the value type it stores. The
//! store is keyed by [`TicketKey`], which carries both, so two subsystems that
//! happen to pick the same id string for different types never collide.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;

use hashbrown::HashMap;

use crate::error::AnimationError;

/// Type-erased identity of a ticket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TicketKey {
    id: &'static str,
    type_id: TypeId,
    type_name: &'static str,
}

impl TicketKey {
    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Typed key for a value of type `D` in a [`DataStore`].
///
/// ```
/// use geo_animation_core::DataTicket;
/// const SPIN_SPEED: DataTicket<f32> = DataTicket::new("mymod:spin_speed");
/// assert_eq!(SPIN_SPEED.id(), "mymod:spin_speed");
/// ```
pub struct DataTicket<D> {
    id: &'static str,
    _marker: PhantomData<fn() -> D>,
}

impl<D> DataTicket<D> {
    pub const fn new(id: &'static str) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }
}

impl<D: 'static> DataTicket<D> {
    pub fn key(&self) -> TicketKey {
        TicketKey {
            id: self.id,
            type_id: TypeId::of::<D>(),
            type_name: type_name::<D>(),
        }
    }
}

impl<D> Clone for DataTicket<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for DataTicket<D> {}

impl<D> fmt::Debug for DataTicket<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataTicket")
            .field("id", &self.id)
            .field("type", &type_name::<D>())
            .finish()
    }
}

impl<D> PartialEq for DataTicket<D> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<D> Eq for DataTicket<D> {}

/// Values every synced data type must satisfy to live in a [`DataStore`].
pub type ErasedValue = Box<dyn Any + Send + Sync>;

/// Heterogeneous ticket → value map. Writes overwrite, never merge.
#[derive(Default)]
pub struct DataStore {
    values: HashMap<TicketKey, ErasedValue>,
}

impl fmt::Debug for DataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.values.keys().map(|k| k.id))
            .finish()
    }
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<D: Any + Send + Sync>(&mut self, ticket: &DataTicket<D>, value: D) {
        self.values.insert(ticket.key(), Box::new(value));
    }

    /// Read a value; `None` if the ticket was never set.
    ///
    /// A stored value of a different type is an internal invariant violation;
    /// it is logged and reported as absent. Use [`DataStore::try_get`] to
    /// surface it as an error instead.
    pub fn get<D: Any + Send + Sync>(&self, ticket: &DataTicket<D>) -> Option<&D> {
        match self.try_get(ticket) {
            Ok(v) => v,
            Err(err) => {
                log::error!("{err}");
                None
            }
        }
    }

    pub fn try_get<D: Any + Send + Sync>(
        &self,
        ticket: &DataTicket<D>,
    ) -> Result<Option<&D>, AnimationError> {
        let key = ticket.key();
        match self.values.get(&key) {
            None => Ok(None),
            Some(boxed) => boxed
                .downcast_ref::<D>()
                .map(Some)
                .ok_or(AnimationError::TicketTypeMismatch {
                    ticket: key.id.to_string(),
                    expected: key.type_name,
                    actual: "an incompatible type",
                }),
        }
    }

    pub fn remove<D: Any + Send + Sync>(&mut self, ticket: &DataTicket<D>) -> Option<D> {
        self.values
            .remove(&ticket.key())
            .and_then(|boxed| boxed.downcast::<D>().ok())
            .map(|b| *b)
    }

    pub fn contains<D: 'static>(&self, ticket: &DataTicket<D>) -> bool {
        self.values.contains_key(&ticket.key())
    }

    /// Store an already type-erased value, checking it against the key's type.
    pub fn set_erased(&mut self, key: TicketKey, value: ErasedValue) -> Result<(), AnimationError> {
        if (*value).type_id() != key.type_id {
            return Err(AnimationError::TicketTypeMismatch {
                ticket: key.id.to_string(),
                expected: key.type_name,
                actual: "an incompatible type",
            });
        }
        self.values.insert(key, value);
        Ok(())
    }

    pub fn get_erased(&self, key: &TicketKey) -> Option<&(dyn Any + Send + Sync)> {
        self.values.get(key).map(|b| b.as_ref())
    }

    /// Ids of every stored ticket, sorted for stable comparison.
    pub fn ticket_ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = self.values.keys().map(|k| k.id).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
