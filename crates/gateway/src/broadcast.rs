use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use {
    parlor_protocol::{EventEnvelope, EventFrame, Room},
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use parlor_metrics::{counter, labels, rooms as room_metrics};

use crate::directory::SessionSocketDirectory;

/// Name of the event frame carrying room broadcasts.
pub const ROOM_EVENT: &str = "room";

/// Publishes envelopes to every socket currently in a room.
///
/// Delivery is at-most-once per member and fire-and-forget: sockets that
/// join later get nothing, sockets whose write loop is gone are skipped.
pub struct EventBroadcaster {
    directory: Arc<SessionSocketDirectory>,
    seq: AtomicU64,
}

impl EventBroadcaster {
    pub fn new(directory: Arc<SessionSocketDirectory>) -> Self {
        Self {
            directory,
            seq: AtomicU64::new(0),
        }
    }

    /// Next frame sequence number (monotonic across all frames the gateway pushes).
    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Deliver `envelope` to the members of `room`. Returns how many sockets
    /// accepted the frame.
    pub async fn broadcast(&self, room: Room, envelope: &EventEnvelope) -> usize {
        let payload = match serde_json::to_value(envelope) {
            Ok(v) => v,
            Err(e) => {
                warn!(%room, op = %envelope.op, "failed to serialize room event: {e}");
                return 0;
            },
        };
        let seq = self.next_seq();
        let frame = EventFrame::new(ROOM_EVENT, payload, seq).in_room(room);
        let json = match serde_json::to_string(&frame) {
            Ok(j) => j,
            Err(e) => {
                warn!(%room, "failed to serialize room frame: {e}");
                return 0;
            },
        };

        // Snapshot first, send after: the directory lock is released before any delivery.
        let members: Vec<_> = self
            .directory
            .all()
            .await
            .into_iter()
            .filter(|c| c.in_room(room))
            .collect();

        let delivered = members.iter().filter(|c| c.send(&json)).count();
        debug!(
            %room,
            op = %envelope.op,
            seq,
            members = members.len(),
            delivered,
            "broadcast room event"
        );

        #[cfg(feature = "metrics")]
        {
            counter!(room_metrics::BROADCASTS_TOTAL, labels::ROOM => room.as_str()).increment(1);
            counter!(room_metrics::DELIVERIES_TOTAL, labels::ROOM => room.as_str())
                .increment(delivered as u64);
        }

        delivered
    }
}
