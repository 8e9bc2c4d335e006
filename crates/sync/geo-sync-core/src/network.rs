//! Sending side: encode data and triggers and route each frame to the
//! audience that can see its subject.
//!
//! Routing:
//! - entity: clients tracking the entity, plus the entity's own client when
//!   it has one
//! - block entity: clients tracking the chunk containing the position
//! - singleton: clients tracking the related entity, plus that entity's own
//!   client

use std::any::Any;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use geo_animation_core::{DataTicket, InstanceId};

use crate::client::{ApplyOutcome, ClientAnimatables};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::message::{encode_data, encode_trigger};
use crate::registry::TicketRegistry;
use crate::target::{BlockPos, EntityRef, SyncTarget};
use crate::transport::{PacketTarget, SyncTransport};

/// Server-side sender. Constructed explicitly and passed to whatever needs
/// to sync animation state.
#[derive(Debug)]
pub struct AnimSyncNetwork<T: SyncTransport> {
    transport: T,
    registry: Arc<TicketRegistry>,
    config: SyncConfig,
}

impl<T: SyncTransport> AnimSyncNetwork<T> {
    pub fn new(transport: T, registry: Arc<TicketRegistry>, config: SyncConfig) -> Result<Self, SyncError> {
        config.validate()?;
        Ok(Self {
            transport,
            registry,
            config,
        })
    }

    pub fn registry(&self) -> &TicketRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn audience(target: &SyncTarget, entity_has_client: bool) -> PacketTarget {
        match target {
            SyncTarget::Entity(id) if entity_has_client => PacketTarget::TrackingEntityAndSelf(*id),
            SyncTarget::Entity(id) => PacketTarget::TrackingEntity(*id),
            SyncTarget::BlockEntity(pos) => PacketTarget::TrackingChunk(pos.chunk()),
            SyncTarget::Singleton { related, .. } => PacketTarget::TrackingEntityAndSelf(*related),
        }
    }

    fn send_data<D>(&self, target: SyncTarget, has_client: bool, ticket: &DataTicket<D>, value: &D) -> Result<(), SyncError>
    where
        D: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let frame = encode_data(&target, ticket, value, &self.registry, &self.config)?;
        let audience = Self::audience(&target, has_client);
        log::trace!("sync '{}' for {target} to {audience:?}", ticket.id());
        self.transport.send(audience, frame);
        Ok(())
    }

    fn send_trigger(
        &self,
        target: SyncTarget,
        has_client: bool,
        controller: Option<&str>,
        animation: &str,
    ) -> Result<(), SyncError> {
        let frame = encode_trigger(&target, controller, animation, &self.config)?;
        let audience = Self::audience(&target, has_client);
        log::trace!("trigger '{animation}' for {target} to {audience:?}");
        self.transport.send(audience, frame);
        Ok(())
    }

    pub fn sync_entity_data<D>(&self, entity: EntityRef, ticket: &DataTicket<D>, value: &D) -> Result<(), SyncError>
    where
        D: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.send_data(SyncTarget::Entity(entity.id), entity.has_controlling_client, ticket, value)
    }

    pub fn trigger_entity_anim(
        &self,
        entity: EntityRef,
        controller: Option<&str>,
        animation: &str,
    ) -> Result<(), SyncError> {
        self.send_trigger(
            SyncTarget::Entity(entity.id),
            entity.has_controlling_client,
            controller,
            animation,
        )
    }

    pub fn sync_block_entity_data<D>(&self, pos: BlockPos, ticket: &DataTicket<D>, value: &D) -> Result<(), SyncError>
    where
        D: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.send_data(SyncTarget::BlockEntity(pos), false, ticket, value)
    }

    pub fn trigger_block_entity_anim(
        &self,
        pos: BlockPos,
        controller: Option<&str>,
        animation: &str,
    ) -> Result<(), SyncError> {
        self.send_trigger(SyncTarget::BlockEntity(pos), false, controller, animation)
    }

    pub fn sync_singleton_data<D>(
        &self,
        sync_id: &str,
        instance: InstanceId,
        related: EntityRef,
        ticket: &DataTicket<D>,
        value: &D,
    ) -> Result<(), SyncError>
    where
        D: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let target = SyncTarget::Singleton {
            sync_id: sync_id.to_string(),
            instance,
            related: related.id,
        };
        self.send_data(target, true, ticket, value)
    }

    pub fn trigger_singleton_anim(
        &self,
        sync_id: &str,
        instance: InstanceId,
        related: EntityRef,
        controller: Option<&str>,
        animation: &str,
    ) -> Result<(), SyncError> {
        let target = SyncTarget::Singleton {
            sync_id: sync_id.to_string(),
            instance,
            related: related.id,
        };
        self.send_trigger(target, true, controller, animation)
    }
}

/// Which end a call is made on. Server calls sync to observers; client calls
/// apply locally through the same path network messages use.
pub enum Side<'a, T: SyncTransport> {
    Server(&'a AnimSyncNetwork<T>),
    Client(&'a mut ClientAnimatables),
}

fn local(outcome: ApplyOutcome) -> bool {
    outcome == ApplyOutcome::Applied
}

impl<'a, T: SyncTransport> Side<'a, T> {
    pub fn is_client(&self) -> bool {
        matches!(self, Side::Client(_))
    }

    /// Returns whether the value was sent (server) or stored (client).
    pub fn set_entity_anim_data<D>(&mut self, entity: EntityRef, ticket: &DataTicket<D>, value: D) -> Result<bool, SyncError>
    where
        D: Serialize + DeserializeOwned + Any + Send + Sync,
    {
        match self {
            Side::Server(net) => net.sync_entity_data(entity, ticket, &value).map(|()| true),
            Side::Client(client) => Ok(local(client.set_data(&SyncTarget::Entity(entity.id), ticket, value))),
        }
    }

    pub fn trigger_entity_anim(
        &mut self,
        entity: EntityRef,
        controller: Option<&str>,
        animation: &str,
    ) -> Result<bool, SyncError> {
        match self {
            Side::Server(net) => net
                .trigger_entity_anim(entity, controller, animation)
                .map(|()| true),
            Side::Client(client) => Ok(local(client.trigger(
                &SyncTarget::Entity(entity.id),
                controller,
                animation,
            ))),
        }
    }

    pub fn set_block_entity_anim_data<D>(&mut self, pos: BlockPos, ticket: &DataTicket<D>, value: D) -> Result<bool, SyncError>
    where
        D: Serialize + DeserializeOwned + Any + Send + Sync,
    {
        match self {
            Side::Server(net) => net.sync_block_entity_data(pos, ticket, &value).map(|()| true),
            Side::Client(client) => Ok(local(client.set_data(&SyncTarget::BlockEntity(pos), ticket, value))),
        }
    }

    pub fn trigger_block_entity_anim(
        &mut self,
        pos: BlockPos,
        controller: Option<&str>,
        animation: &str,
    ) -> Result<bool, SyncError> {
        match self {
            Side::Server(net) => net
                .trigger_block_entity_anim(pos, controller, animation)
                .map(|()| true),
            Side::Client(client) => Ok(local(client.trigger(
                &SyncTarget::BlockEntity(pos),
                controller,
                animation,
            ))),
        }
    }

    pub fn set_singleton_anim_data<D>(
        &mut self,
        sync_id: &str,
        instance: InstanceId,
        related: EntityRef,
        ticket: &DataTicket<D>,
        value: D,
    ) -> Result<bool, SyncError>
    where
        D: Serialize + DeserializeOwned + Any + Send + Sync,
    {
        match self {
            Side::Server(net) => net
                .sync_singleton_data(sync_id, instance, related, ticket, &value)
                .map(|()| true),
            Side::Client(client) => {
                let target = SyncTarget::Singleton {
                    sync_id: sync_id.to_string(),
                    instance,
                    related: related.id,
                };
                Ok(local(client.set_data(&target, ticket, value)))
            }
        }
    }

    pub fn trigger_singleton_anim(
        &mut self,
        sync_id: &str,
        instance: InstanceId,
        related: EntityRef,
        controller: Option<&str>,
        animation: &str,
    ) -> Result<bool, SyncError> {
        match self {
            Side::Server(net) => net
                .trigger_singleton_anim(sync_id, instance, related, controller, animation)
                .map(|()| true),
            Side::Client(client) => {
                let target = SyncTarget::Singleton {
                    sync_id: sync_id.to_string(),
                    instance,
                    related: related.id,
                };
                Ok(local(client.trigger(&target, controller, animation)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::target::{ChunkPos, EntityId};

    const SPEED: DataTicket<f32> = DataTicket::new("test:speed");

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(PacketTarget, Vec<u8>)>>);

    impl SyncTransport for Recorder {
        fn send(&self, target: PacketTarget, frame: Vec<u8>) {
            self.0.lock().unwrap().push((target, frame));
        }
    }

    impl Recorder {
        fn targets(&self) -> Vec<PacketTarget> {
            self.0.lock().unwrap().iter().map(|(t, _)| *t).collect()
        }
    }

    fn network() -> AnimSyncNetwork<Recorder> {
        let mut reg = TicketRegistry::new();
        reg.register(&SPEED).unwrap();
        AnimSyncNetwork::new(Recorder::default(), Arc::new(reg), SyncConfig::default()).unwrap()
    }

    #[test]
    fn each_scope_routes_to_its_audience() {
        let net = network();
        net.sync_entity_data(EntityRef::new(3), &SPEED, &1.0).unwrap();
        net.trigger_entity_anim(EntityRef::player(4), None, "wave").unwrap();
        net.trigger_block_entity_anim(BlockPos::new(-20, 64, 40), Some("lid"), "open")
            .unwrap();
        net.trigger_singleton_anim("geo:wand", InstanceId(8), EntityRef::player(4), None, "zap")
            .unwrap();
        assert_eq!(
            net.transport().targets(),
            vec![
                PacketTarget::TrackingEntity(EntityId(3)),
                PacketTarget::TrackingEntityAndSelf(EntityId(4)),
                PacketTarget::TrackingChunk(ChunkPos { x: -2, z: 2 }),
                PacketTarget::TrackingEntityAndSelf(EntityId(4)),
            ]
        );
    }

    #[test]
    fn unregistered_ticket_sends_nothing() {
        const OTHER: DataTicket<f32> = DataTicket::new("test:other");
        let net = network();
        let err = net.sync_entity_data(EntityRef::new(1), &OTHER, &2.0).unwrap_err();
        assert!(matches!(err, SyncError::UnknownTicket { .. }));
        assert!(net.transport().targets().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = SyncConfig {
            max_message_bytes: 0,
            max_payload_bytes: 0,
        };
        assert!(AnimSyncNetwork::new(Recorder::default(), Arc::new(TicketRegistry::new()), cfg).is_err());
    }

    #[test]
    fn client_side_sets_locally() {
        let mut client = ClientAnimatables::new();
        client.track_entity(EntityId(3), geo_animation_core::InstancedAnimatableCache::new());
        let mut side: Side<'_, Recorder> = Side::Client(&mut client);
        assert!(side.is_client());
        assert!(side.set_entity_anim_data(EntityRef::new(3), &SPEED, 0.5).unwrap());
        assert!(!side.set_entity_anim_data(EntityRef::new(9), &SPEED, 0.5).unwrap());
        let manager = client.manager(&SyncTarget::Entity(EntityId(3))).unwrap();
        assert_eq!(manager.data(&SPEED), Some(&0.5));
    }
}
