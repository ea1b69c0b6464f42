use async_trait::async_trait;

use crate::{
    error::{Error, Result},
    request::{ChannelRequest, ChannelResponse, Download},
};

// ── Channel events (pub/sub) ────────────────────────────────────────────────

/// Events emitted by channel handlers for real-time operator updates.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelEvent {
    /// A subscriber (or operator acting as one) sent a message.
    MessageReceived {
        channel: String,
        session_id: String,
        /// Chat profile id of the author, when the session carries one.
        author: Option<String>,
        mid: String,
        text: String,
    },
}

impl ChannelEvent {
    /// Operation tag used in room broadcast envelopes.
    pub fn op(&self) -> &'static str {
        match self {
            Self::MessageReceived { .. } => "messageReceived",
        }
    }

    pub fn speaker(&self) -> Option<&str> {
        match self {
            Self::MessageReceived { author, .. } => author.as_deref(),
        }
    }
}

/// Sink for channel events. The gateway provides the concrete implementation.
#[async_trait]
pub trait ChannelEventSink: Send + Sync {
    /// Publish an event to interested operator connections.
    async fn emit(&self, event: ChannelEvent);
}

// ── Handler capability ──────────────────────────────────────────────────────

/// Core channel handler trait. Each inbound surface implements this.
///
/// Handlers own whatever state they need privately; the gateway only sees this
/// interface.
#[async_trait]
pub trait ChannelHandler: Send + Sync {
    /// Registry key, e.g. `web-channel`.
    fn name(&self) -> &str;

    /// Validate, process and answer one inbound request.
    async fn handle(&self, req: &ChannelRequest, res: &mut ChannelResponse) -> Result<()>;

    /// Resolve a signed download token into a byte stream.
    async fn download(&self, _token: &str, _req: &ChannelRequest) -> Result<Download> {
        Err(Error::unavailable(format!(
            "{} does not serve downloads",
            self.name()
        )))
    }
}
