use std::sync::Arc;

use {
    parlor_protocol::Room,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use parlor_metrics::{counter, labels, rooms as room_metrics};

use crate::{
    directory::SessionSocketDirectory,
    error::{GatewayError, Result},
};

/// Joins an operator session's sockets to broadcast rooms.
pub struct NotificationRoomCoordinator {
    directory: Arc<SessionSocketDirectory>,
}

impl NotificationRoomCoordinator {
    pub fn new(directory: Arc<SessionSocketDirectory>) -> Self {
        Self { directory }
    }

    /// Join every notification-eligible socket of `session_id` to `room`.
    ///
    /// Fails with `InvalidArgument` for a blank session id and with
    /// `NoEligibleConnections` when the session has no socket that may join.
    /// Public subscriber sockets are skipped. Re-joining is a no-op. Returns
    /// the number of eligible sockets now in the room.
    pub async fn join_room(&self, session_id: &str, room: Room) -> Result<usize> {
        if session_id.trim().is_empty() {
            reject(room, "invalid_session");
            return Err(GatewayError::invalid_argument("SessionId is required!"));
        }

        let conns = self.directory.connections_for(session_id).await?;
        let total = conns.len();
        let eligible: Vec<_> = conns
            .into_iter()
            .filter(|c| c.notification_eligible)
            .collect();

        if eligible.is_empty() {
            warn!(session_id, %room, sockets = total, "no notification sockets found");
            reject(room, "no_eligible_connections");
            return Err(GatewayError::no_eligible_connections(session_id));
        }

        let mut newly_joined = 0;
        for conn in &eligible {
            if conn.join(room) {
                newly_joined += 1;
                debug!(conn_id = %conn.conn_id, %room, "socket joined room");
            }
        }

        #[cfg(feature = "metrics")]
        counter!(room_metrics::JOINS_TOTAL, labels::ROOM => room.as_str())
            .increment(newly_joined as u64);

        info!(
            session_id,
            %room,
            sockets = eligible.len(),
            newly_joined,
            skipped = total - eligible.len(),
            "session joined room"
        );
        Ok(eligible.len())
    }
}

fn reject(room: Room, reason: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(
        room_metrics::JOIN_REJECTIONS_TOTAL,
        labels::ROOM => room.as_str(),
        labels::REASON => reason
    )
    .increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = (room, reason);
}
