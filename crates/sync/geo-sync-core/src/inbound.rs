//! Hand-off from the network receipt thread to the tick thread.
//!
//! Frames are decoded where they arrive; only fully decoded messages cross
//! the channel, and only [`InboundQueue::drain`] (on the tick thread) touches
//! animatable state.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;

use crate::client::{ApplyOutcome, ClientAnimatables};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::message::SyncMessage;
use crate::registry::TicketRegistry;

/// Receipt-thread handle. Cheap to clone.
#[derive(Clone, Debug)]
pub struct InboundSender {
    tx: Sender<SyncMessage>,
    registry: Arc<TicketRegistry>,
    config: SyncConfig,
}

/// Tick-thread end of the inbound channel.
#[derive(Debug)]
pub struct InboundQueue {
    rx: Receiver<SyncMessage>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub applied: usize,
    pub rejected: usize,
    pub stale: usize,
}

impl DrainReport {
    pub fn total(&self) -> usize {
        self.applied + self.rejected + self.stale
    }
}

pub fn inbound_channel(registry: Arc<TicketRegistry>, config: SyncConfig) -> (InboundSender, InboundQueue) {
    let (tx, rx) = mpsc::channel();
    (
        InboundSender {
            tx,
            registry,
            config,
        },
        InboundQueue { rx },
    )
}

impl InboundSender {
    /// Decode one frame and queue it. A frame that fails to decode is logged
    /// and dropped without queuing anything.
    pub fn receive(&self, frame: &[u8]) -> Result<(), SyncError> {
        let msg = match SyncMessage::decode(frame, &self.registry, &self.config) {
            Ok(msg) => msg,
            Err(err) => {
                log::error!("dropping animation sync frame: {err}");
                return Err(err);
            }
        };
        if self.tx.send(msg).is_err() {
            log::warn!("animation sync queue closed; frame dropped");
        }
        Ok(())
    }
}

impl InboundQueue {
    /// Apply every queued message in arrival order.
    pub fn drain(&mut self, client: &mut ClientAnimatables) -> DrainReport {
        let mut report = DrainReport::default();
        loop {
            match self.rx.try_recv() {
                Ok(msg) => match client.apply(msg) {
                    ApplyOutcome::Applied => report.applied += 1,
                    ApplyOutcome::Rejected => report.rejected += 1,
                    ApplyOutcome::StaleTarget => report.stale += 1,
                },
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::encode_trigger;
    use crate::target::{EntityId, SyncTarget};

    #[test]
    fn frames_decoded_on_another_thread_apply_in_order() {
        let cfg = SyncConfig::default();
        let (tx, mut queue) = inbound_channel(Arc::new(TicketRegistry::new()), cfg.clone());
        let frames: Vec<Vec<u8>> = (0..3)
            .map(|i| encode_trigger(&SyncTarget::Entity(EntityId(i)), None, "wave", &cfg).unwrap())
            .collect();

        std::thread::spawn(move || {
            for frame in frames {
                tx.receive(&frame).unwrap();
            }
            assert!(tx.receive(&[9, 9]).is_err());
        })
        .join()
        .unwrap();

        let mut client = ClientAnimatables::new();
        let report = queue.drain(&mut client);
        assert_eq!(report, DrainReport { applied: 0, rejected: 0, stale: 3 });
        assert_eq!(queue.drain(&mut client).total(), 0);
    }
}
