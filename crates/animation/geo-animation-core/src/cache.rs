//! Instance caches: map animatable instance ids to their managers.
//!
//! Two lifecycles exist:
//! - [`InstancedAnimatableCache`] belongs to one host object and holds exactly
//!   one manager; it dies with the object.
//! - [`SingletonAnimatableCache`] is shared by every transient object of one
//!   animatable kind (item stacks, ...). Entries expire when they have not been
//!   touched for the configured eviction window.

use std::sync::Arc;

use hashbrown::HashMap;

use crate::config::Config;
use crate::controller::AnimationController;
use crate::ids::InstanceId;
use crate::manager::AnimatableManager;

/// Builds the controllers of a freshly created manager.
pub type ControllerFactory = Arc<dyn Fn() -> Vec<AnimationController> + Send + Sync>;

pub trait AnimatableInstanceCache {
    /// Manager for `id`, created empty (plus factory controllers) if absent.
    fn manager_for_id(&mut self, id: InstanceId) -> &mut AnimatableManager;

    /// Whether a manager for `id` currently exists.
    fn contains(&self, id: InstanceId) -> bool;
}

fn fresh_manager(factory: Option<&ControllerFactory>) -> AnimatableManager {
    match factory {
        Some(make) => AnimatableManager::with_controllers(make()),
        None => AnimatableManager::new(),
    }
}

/// Cache owned by a single host object.
#[derive(Default)]
pub struct InstancedAnimatableCache {
    factory: Option<ControllerFactory>,
    manager: Option<(InstanceId, AnimatableManager)>,
}

impl InstancedAnimatableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_factory(factory: ControllerFactory) -> Self {
        Self {
            factory: Some(factory),
            manager: None,
        }
    }
}

impl AnimatableInstanceCache for InstancedAnimatableCache {
    fn manager_for_id(&mut self, id: InstanceId) -> &mut AnimatableManager {
        if let Some((owner, _)) = &self.manager {
            if *owner != id {
                log::debug!("instanced cache for {owner} asked for {id}; serving the owner's manager");
            }
        }
        let factory = self.factory.as_ref();
        let (_, manager) = self
            .manager
            .get_or_insert_with(|| (id, fresh_manager(factory)));
        manager
    }

    fn contains(&self, id: InstanceId) -> bool {
        self.manager.as_ref().is_some_and(|(owner, _)| *owner == id)
    }
}

struct SingletonEntry {
    manager: AnimatableManager,
    last_touched: f64,
}

/// Shared id-keyed cache with time-based eviction.
///
/// The host drives the clock with [`SingletonAnimatableCache::set_clock`];
/// every access stamps the entry with the current clock value.
pub struct SingletonAnimatableCache {
    factory: Option<ControllerFactory>,
    entries: HashMap<InstanceId, SingletonEntry>,
    eviction_window_secs: f64,
    now: f64,
}

impl Default for SingletonAnimatableCache {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl std::fmt::Debug for SingletonAnimatableCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingletonAnimatableCache")
            .field("entries", &self.entries.len())
            .field("eviction_window_secs", &self.eviction_window_secs)
            .field("now", &self.now)
            .finish()
    }
}

impl SingletonAnimatableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self {
            factory: None,
            entries: HashMap::new(),
            eviction_window_secs: cfg.eviction_window_secs,
            now: 0.0,
        }
    }

    pub fn with_factory(mut self, factory: ControllerFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn eviction_window_secs(&self) -> f64 {
        self.eviction_window_secs
    }

    /// Advance the cache clock. Time never moves backwards.
    pub fn set_clock(&mut self, now: f64) {
        if now > self.now {
            self.now = now;
        }
    }

    pub fn clock(&self) -> f64 {
        self.now
    }

    /// Drop entries idle for at least the eviction window. Returns how many
    /// were removed.
    pub fn evict_stale(&mut self, now: f64) -> usize {
        self.set_clock(now);
        let window = self.eviction_window_secs;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now - entry.last_touched < window);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            log::debug!("evicted {evicted} idle singleton animatable managers");
        }
        evicted
    }

    pub fn remove(&mut self, id: InstanceId) -> Option<AnimatableManager> {
        self.entries.remove(&id).map(|e| e.manager)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AnimatableInstanceCache for SingletonAnimatableCache {
    fn manager_for_id(&mut self, id: InstanceId) -> &mut AnimatableManager {
        let now = self.now;
        let factory = self.factory.as_ref();
        let entry = self.entries.entry(id).or_insert_with(|| SingletonEntry {
            manager: fresh_manager(factory),
            last_touched: now,
        });
        entry.last_touched = now;
        &mut entry.manager
    }

    fn contains(&self, id: InstanceId) -> bool {
        self.entries.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_ticket::DataTicket;
    use crate::raw_animation::RawAnimation;

    const COLOR: DataTicket<u32> = DataTicket::new("test:color");

    fn factory() -> ControllerFactory {
        Arc::new(|| {
            vec![AnimationController::new("main")
                .triggerable("swing", RawAnimation::begin().then_play("swing"))]
        })
    }

    #[test]
    fn first_access_creates_empty_manager() {
        let mut cache = SingletonAnimatableCache::new();
        assert!(!cache.contains(InstanceId(42)));
        let m = cache.manager_for_id(InstanceId(42));
        assert_eq!(m.controller_count(), 0);
        assert!(m.data_store().is_empty());
        assert!(cache.contains(InstanceId(42)));
    }

    #[test]
    fn repeated_access_returns_same_manager() {
        let mut cache = SingletonAnimatableCache::new();
        cache.manager_for_id(InstanceId(7)).set_data(&COLOR, 0xff0000);
        assert_eq!(cache.manager_for_id(InstanceId(7)).data(&COLOR), Some(&0xff0000));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn factory_registers_controllers() {
        let mut cache = SingletonAnimatableCache::new().with_factory(factory());
        let m = cache.manager_for_id(InstanceId(1));
        assert!(m.controller("main").is_some());
        assert!(m.try_trigger_animation(None, "swing"));
    }

    #[test]
    fn eviction_window_is_inclusive() {
        let mut cache = SingletonAnimatableCache::new();
        cache.set_clock(100.0);
        cache.manager_for_id(InstanceId(3)).set_data(&COLOR, 1);
        assert_eq!(cache.evict_stale(129.9), 0);
        assert_eq!(cache.evict_stale(130.0), 1);
        assert!(cache.manager_for_id(InstanceId(3)).data(&COLOR).is_none());
    }

    #[test]
    fn access_refreshes_entry() {
        let mut cache = SingletonAnimatableCache::new();
        cache.manager_for_id(InstanceId(3));
        cache.set_clock(20.0);
        cache.manager_for_id(InstanceId(3));
        assert_eq!(cache.evict_stale(45.0), 0);
        assert_eq!(cache.evict_stale(50.0), 1);
    }

    #[test]
    fn instanced_cache_holds_one_manager() {
        let mut cache = InstancedAnimatableCache::with_factory(factory());
        assert!(!cache.contains(InstanceId(9)));
        cache.manager_for_id(InstanceId(9)).set_data(&COLOR, 5);
        assert!(cache.contains(InstanceId(9)));
        assert_eq!(cache.manager_for_id(InstanceId(9)).data(&COLOR), Some(&5));
        assert_eq!(cache.manager_for_id(InstanceId(9)).controller_count(), 1);
    }
}
