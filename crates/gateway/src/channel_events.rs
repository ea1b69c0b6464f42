use std::sync::Arc;

use {
    async_trait::async_trait,
    parlor_channels::{ChannelEvent, ChannelEventSink, ChannelName, HandlerRegistry, SocketChannel},
    parlor_protocol::{EventEnvelope, Room},
    tracing::{debug, warn},
};

use crate::broadcast::EventBroadcaster;

/// Turns channel events into broadcasts on one room.
pub struct RoomEventSink {
    broadcaster: Arc<EventBroadcaster>,
    room: Room,
}

impl RoomEventSink {
    pub fn new(broadcaster: Arc<EventBroadcaster>, room: Room) -> Self {
        Self { broadcaster, room }
    }
}

#[async_trait]
impl ChannelEventSink for RoomEventSink {
    async fn emit(&self, event: ChannelEvent) {
        let data = match serde_json::to_value(&event) {
            Ok(v) => v,
            Err(e) => {
                warn!(op = event.op(), "failed to serialize channel event: {e}");
                return;
            },
        };
        let mut envelope = EventEnvelope::new(event.op(), data);
        if let Some(speaker) = event.speaker() {
            envelope = envelope.with_speaker(speaker);
        }
        self.broadcaster.broadcast(self.room, &envelope).await;
    }
}

/// Register the built-in socket channels named in `enabled`.
///
/// Only `web-channel` and `console-channel` have a built-in implementation;
/// other names are skipped with a warning.
pub fn register_builtin_channels(
    registry: &mut HandlerRegistry,
    enabled: &[String],
    broadcaster: &Arc<EventBroadcaster>,
) {
    let sink: Arc<dyn ChannelEventSink> =
        Arc::new(RoomEventSink::new(Arc::clone(broadcaster), Room::Message));
    for name in enabled {
        let name = ChannelName::new(name.as_str());
        if name != ChannelName::web() && name != ChannelName::console() {
            warn!(channel = %name, "no built-in handler for channel, skipping");
            continue;
        }
        debug!(channel = %name, "enabling built-in socket channel");
        let handler = SocketChannel::new(name.clone()).with_sink(Arc::clone(&sink));
        registry.register(name, Arc::new(handler));
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use {
        super::*,
        crate::directory::{SessionSocketDirectory, tests::conn},
    };

    #[tokio::test]
    async fn channel_events_reach_message_room() {
        let dir = Arc::new(SessionSocketDirectory::new());
        let broadcaster = Arc::new(EventBroadcaster::new(Arc::clone(&dir)));
        let (op, mut rx) = conn("c1", "s1", true);
        op.join(Room::Message);
        dir.bind(op).await;

        let sink = RoomEventSink::new(broadcaster, Room::Message);
        sink.emit(ChannelEvent::MessageReceived {
            channel: "web-channel".into(),
            session_id: "s9".into(),
            author: Some("p-1".into()),
            mid: "m-1".into(),
            text: "hello".into(),
        })
        .await;

        let frame: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(frame["payload"]["op"], "messageReceived");
        assert_eq!(frame["payload"]["speakerId"], "p-1");
        assert_eq!(frame["payload"]["data"]["kind"], "message_received");
        assert_eq!(frame["payload"]["data"]["text"], "hello");
    }

    #[test]
    fn only_known_builtins_are_registered() {
        let dir = Arc::new(SessionSocketDirectory::new());
        let broadcaster = Arc::new(EventBroadcaster::new(dir));
        let mut registry = HandlerRegistry::new();
        register_builtin_channels(
            &mut registry,
            &[
                "web-channel".into(),
                "console-channel".into(),
                "messenger-channel".into(),
            ],
            &broadcaster,
        );
        assert_eq!(registry.len(), 2);
        assert!(registry.find("messenger-channel").is_none());
    }
}
