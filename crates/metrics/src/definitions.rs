//! Metric name and label definitions.
//!
//! All metric names used throughout parlor live here so dashboards and code
//! agree on spelling.

/// WebSocket metrics
pub mod websocket {
    /// Total number of WebSocket connections established
    pub const CONNECTIONS_TOTAL: &str = "parlor_websocket_connections_total";
    /// Number of currently active WebSocket connections
    pub const CONNECTIONS_ACTIVE: &str = "parlor_websocket_connections_active";
    /// Total number of WebSocket frames received
    pub const MESSAGES_RECEIVED_TOTAL: &str = "parlor_websocket_messages_received_total";
    /// Connection lifetime in seconds
    pub const CONNECTION_DURATION_SECONDS: &str = "parlor_websocket_connection_duration_seconds";
}

/// Channel dispatch metrics
pub mod channels {
    /// Number of registered channel handlers
    pub const REGISTERED: &str = "parlor_channels_registered";
    /// Total number of requests dispatched to a channel handler
    pub const DISPATCH_TOTAL: &str = "parlor_channel_dispatch_total";
    /// Dispatches that failed (unknown channel, unauthorized, handler error)
    pub const DISPATCH_ERRORS_TOTAL: &str = "parlor_channel_dispatch_errors_total";
    /// Handler processing time in seconds
    pub const DISPATCH_DURATION_SECONDS: &str = "parlor_channel_dispatch_duration_seconds";
}

/// Room join / broadcast metrics
pub mod rooms {
    /// Successful room joins (per connection)
    pub const JOINS_TOTAL: &str = "parlor_room_joins_total";
    /// Rejected room joins (invalid session id, no eligible connections)
    pub const JOIN_REJECTIONS_TOTAL: &str = "parlor_room_join_rejections_total";
    /// Broadcast calls
    pub const BROADCASTS_TOTAL: &str = "parlor_room_broadcasts_total";
    /// Frames delivered to room members
    pub const DELIVERIES_TOTAL: &str = "parlor_room_deliveries_total";
}

/// Session collaborator metrics
pub mod sessions {
    /// Chat profiles created by find-or-create
    pub const PROFILES_CREATED_TOTAL: &str = "parlor_chat_profiles_created_total";
}

/// NLU provider synchronisation metrics
pub mod nlu {
    /// Provider calls that succeeded
    pub const SYNC_TOTAL: &str = "parlor_nlu_sync_total";
    /// Provider calls that failed (logged, never propagated)
    pub const SYNC_FAILURES_TOTAL: &str = "parlor_nlu_sync_failures_total";
}

/// Common label keys
pub mod labels {
    pub const CHANNEL: &str = "channel";
    pub const ROOM: &str = "room";
    pub const OPERATION: &str = "operation";
    pub const REASON: &str = "reason";
}

/// Histogram bucket presets
pub mod buckets {
    /// Dispatch duration buckets (in seconds), 1ms to 30s
    pub const DISPATCH_DURATION: &[f64] = &[
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
    ];

    /// Connection lifetime buckets (in seconds), 1s to 1 day
    pub const CONNECTION_DURATION: &[f64] = &[
        1.0, 10.0, 60.0, 300.0, 900.0, 3600.0, 14400.0, 86400.0,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_share_prefix() {
        for name in [
            websocket::CONNECTIONS_TOTAL,
            channels::DISPATCH_TOTAL,
            rooms::JOINS_TOTAL,
            nlu::SYNC_FAILURES_TOTAL,
        ] {
            assert!(name.starts_with("parlor_"), "{name}");
        }
    }

    #[test]
    fn buckets_are_sorted() {
        for set in [buckets::DISPATCH_DURATION, buckets::CONNECTION_DURATION] {
            assert!(set.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
