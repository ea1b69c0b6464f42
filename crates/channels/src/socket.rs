//! Built-in handler for the socket-capable channels (web widget and console).

use std::sync::Arc;

use {
    async_trait::async_trait,
    http::Method,
    parlor_protocol::channels,
    serde_json::json,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    name::ChannelName,
    plugin::{ChannelEvent, ChannelEventSink, ChannelHandler},
    request::{ChannelRequest, ChannelResponse},
};

/// Minimal conversational surface: `GET` returns the caller's chat profile,
/// `POST {"text"}` accepts a message and publishes it to operators.
///
/// The console instance only serves authenticated sessions with an attached
/// chat profile, whichever route the request came in on.
pub struct SocketChannel {
    name: ChannelName,
    sink: Option<Arc<dyn ChannelEventSink>>,
}

impl SocketChannel {
    pub fn new(name: impl Into<ChannelName>) -> Self {
        Self {
            name: name.into(),
            sink: None,
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ChannelEventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Rejects console requests that did not come through operator login.
    fn authorize(&self, req: &ChannelRequest) -> Result<()> {
        if self.name.as_str() != channels::CONSOLE {
            return Ok(());
        }
        if req.session.principal().is_some() && req.session.web.is_some() {
            return Ok(());
        }
        warn!(channel = %self.name, session_id = %req.session.id, "anonymous console request refused");
        Err(Error::unauthorized(channels::CONSOLE_UNAUTHORIZED))
    }

    fn profile_json(req: &ChannelRequest) -> serde_json::Value {
        req.session
            .web
            .as_ref()
            .and_then(|web| serde_json::to_value(&web.profile).ok())
            .unwrap_or(serde_json::Value::Null)
    }
}

#[async_trait]
impl ChannelHandler for SocketChannel {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    async fn handle(&self, req: &ChannelRequest, res: &mut ChannelResponse) -> Result<()> {
        self.authorize(req)?;
        match req.method {
            Method::GET => {
                res.ok(json!({
                    "channel": self.name,
                    "profile": Self::profile_json(req),
                }));
                Ok(())
            },
            Method::POST => {
                let text = req
                    .body
                    .as_ref()
                    .and_then(|b| b.get("text"))
                    .and_then(|t| t.as_str())
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| Error::invalid_input("missing message text"))?;

                let mid = uuid::Uuid::new_v4().to_string();
                let author = req.session.web.as_ref().map(|w| w.profile.id.clone());
                info!(
                    channel = %self.name,
                    session_id = %req.session.id,
                    mid = %mid,
                    "message received"
                );

                if let Some(sink) = &self.sink {
                    sink.emit(ChannelEvent::MessageReceived {
                        channel: self.name.to_string(),
                        session_id: req.session.id.clone(),
                        author,
                        mid: mid.clone(),
                        text: text.to_string(),
                    })
                    .await;
                } else {
                    debug!(channel = %self.name, "no event sink attached, message not published");
                }

                res.ok(json!({ "mid": mid, "status": "sent" }));
                Ok(())
            },
            ref other => Err(Error::invalid_input(format!("unsupported method {other}"))),
        }
    }
}
