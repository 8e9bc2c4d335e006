//! Receiving side: the animatables a client knows about, and the one code
//! path that applies data and triggers to them.
//!
//! Decoded network messages and local client-side calls both end up in
//! [`ClientAnimatables::set_data`] / [`ClientAnimatables::trigger`], so a
//! network trigger leaves exactly the state a local trigger would.

use std::any::Any;

use hashbrown::HashMap;

use geo_animation_core::{
    AnimatableInstanceCache, AnimatableManager, DataTicket, ErasedValue, SingletonAnimatableCache,
    TicketKey,
};

use crate::message::{SyncAction, SyncMessage};
use crate::target::{BlockPos, EntityId, SyncTarget};

pub type BoxedCache = Box<dyn AnimatableInstanceCache + Send>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The target exists but refused the update (undeclared trigger, value
    /// of the wrong type).
    Rejected,
    /// The target is not (or no longer) known on this client.
    StaleTarget,
}

#[derive(Default)]
pub struct ClientAnimatables {
    entities: HashMap<EntityId, BoxedCache>,
    block_entities: HashMap<BlockPos, BoxedCache>,
    singletons: HashMap<String, SingletonAnimatableCache>,
}

impl std::fmt::Debug for ClientAnimatables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientAnimatables")
            .field("entities", &self.entities.len())
            .field("block_entities", &self.block_entities.len())
            .field("singletons", &self.singletons.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ClientAnimatables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an entity with its animatable cache. Replaces any
    /// previous cache for the id.
    pub fn track_entity<C>(&mut self, id: EntityId, cache: C)
    where
        C: AnimatableInstanceCache + Send + 'static,
    {
        self.entities.insert(id, Box::new(cache));
    }

    pub fn untrack_entity(&mut self, id: EntityId) -> bool {
        self.entities.remove(&id).is_some()
    }

    pub fn track_block_entity<C>(&mut self, pos: BlockPos, cache: C)
    where
        C: AnimatableInstanceCache + Send + 'static,
    {
        self.block_entities.insert(pos, Box::new(cache));
    }

    pub fn untrack_block_entity(&mut self, pos: BlockPos) -> bool {
        self.block_entities.remove(&pos).is_some()
    }

    /// Register a singleton animatable under its sync id. Registering an id
    /// again keeps the existing cache and returns `false`.
    pub fn register_singleton(&mut self, sync_id: &str, cache: SingletonAnimatableCache) -> bool {
        if self.singletons.contains_key(sync_id) {
            log::debug!("singleton animatable '{sync_id}' already registered");
            return false;
        }
        self.singletons.insert(sync_id.to_string(), cache);
        true
    }

    pub fn singleton(&self, sync_id: &str) -> Option<&SingletonAnimatableCache> {
        self.singletons.get(sync_id)
    }

    pub fn singleton_mut(&mut self, sync_id: &str) -> Option<&mut SingletonAnimatableCache> {
        self.singletons.get_mut(sync_id)
    }

    /// Advance every singleton cache clock and drop idle managers.
    pub fn evict_stale(&mut self, now: f64) -> usize {
        self.singletons
            .values_mut()
            .map(|cache| cache.evict_stale(now))
            .sum()
    }

    /// Manager for `target`, created on first use inside the target's cache.
    /// `None` when the target itself is unknown.
    pub fn manager(&mut self, target: &SyncTarget) -> Option<&mut AnimatableManager> {
        let instance = target.instance_id();
        match target {
            SyncTarget::Entity(id) => self
                .entities
                .get_mut(id)
                .map(|cache| cache.manager_for_id(instance)),
            SyncTarget::BlockEntity(pos) => self
                .block_entities
                .get_mut(pos)
                .map(|cache| cache.manager_for_id(instance)),
            SyncTarget::Singleton { sync_id, .. } => self
                .singletons
                .get_mut(sync_id.as_str())
                .map(|cache| cache.manager_for_id(instance)),
        }
    }

    /// Store a typed value on `target`'s manager.
    pub fn set_data<D>(&mut self, target: &SyncTarget, ticket: &DataTicket<D>, value: D) -> ApplyOutcome
    where
        D: Any + Send + Sync,
    {
        self.set_erased(target, ticket.key(), Box::new(value))
    }

    fn set_erased(&mut self, target: &SyncTarget, key: TicketKey, value: ErasedValue) -> ApplyOutcome {
        let Some(manager) = self.manager(target) else {
            log::trace!("dropping data '{}' for unknown {target}", key.id());
            return ApplyOutcome::StaleTarget;
        };
        match manager.data_store_mut().set_erased(key, value) {
            Ok(()) => ApplyOutcome::Applied,
            Err(err) => {
                log::error!("rejected data for {target}: {err}");
                ApplyOutcome::Rejected
            }
        }
    }

    /// Request a triggerable animation on `target`.
    pub fn trigger(&mut self, target: &SyncTarget, controller: Option<&str>, animation: &str) -> ApplyOutcome {
        let Some(manager) = self.manager(target) else {
            log::trace!("dropping trigger '{animation}' for unknown {target}");
            return ApplyOutcome::StaleTarget;
        };
        if manager.try_trigger_animation(controller, animation) {
            ApplyOutcome::Applied
        } else {
            ApplyOutcome::Rejected
        }
    }

    /// Apply a decoded network message. Must run on the tick thread.
    pub fn apply(&mut self, msg: SyncMessage) -> ApplyOutcome {
        let SyncMessage { target, action } = msg;
        match action {
            SyncAction::SetData(payload) => self.set_erased(&target, payload.key, payload.value),
            SyncAction::Trigger {
                controller,
                animation,
            } => self.trigger(&target, controller.as_deref(), &animation),
        }
    }
}
