//! Transport-neutral request/response types handed to channel handlers.
//!
//! Both the HTTP webhook routes and the socket `req` frames are normalised into
//! a [`ChannelRequest`] before dispatch.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    futures::stream::{self, BoxStream, StreamExt},
    http::{HeaderMap, Method, StatusCode},
    parlor_sessions::{Principal, WebSessionState},
    tokio::task::AbortHandle,
    tokio_util::sync::CancellationToken,
    tracing::debug,
};

// ── Session context ─────────────────────────────────────────────────────────

/// What the transport knows about the session behind a request.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub id: String,
    pub principal: Option<Principal>,
    pub web: Option<WebSessionState>,
}

impl SessionContext {
    pub fn anonymous(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn authenticated(id: impl Into<String>, principal: Principal) -> Self {
        Self {
            id: id.into(),
            principal: Some(principal),
            web: None,
        }
    }

    /// The principal, if it carries a non-blank id.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref().filter(|p| p.is_authenticated())
    }
}

// ── Socket handle ───────────────────────────────────────────────────────────

/// Handle to the live socket a request arrived on.
///
/// Cancelling the close token makes the gateway's read loop drop the
/// connection.
#[derive(Clone)]
pub struct SocketHandle {
    conn_id: String,
    close: CancellationToken,
    pending_close: Arc<Mutex<Option<AbortHandle>>>,
}

impl SocketHandle {
    pub fn new(conn_id: impl Into<String>, close: CancellationToken) -> Self {
        Self {
            conn_id: conn_id.into(),
            close,
            pending_close: Arc::new(Mutex::new(None)),
        }
    }

    pub fn conn_id(&self) -> &str {
        &self.conn_id
    }

    pub fn close_token(&self) -> &CancellationToken {
        &self.close
    }

    pub fn is_closed(&self) -> bool {
        self.close.is_cancelled()
    }

    /// Close the socket after `delay`. Fire-and-forget: a later reconnect on
    /// the same session is not protected, only this physical connection is
    /// targeted. Must be called from within a tokio runtime.
    pub fn close_after(&self, delay: Duration) {
        let token = self.close.clone();
        let conn_id = self.conn_id.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!(conn_id = %conn_id, "closing socket after grace delay");
            token.cancel();
        });
        if let Ok(mut pending) = self.pending_close.lock()
            && let Some(previous) = pending.replace(task.abort_handle())
        {
            previous.abort();
        }
    }

    /// Abort a scheduled close. Returns `true` if one was pending.
    pub fn cancel_pending_close(&self) -> bool {
        match self.pending_close.lock() {
            Ok(mut pending) => match pending.take() {
                Some(handle) if !handle.is_finished() => {
                    handle.abort();
                    true
                },
                _ => false,
            },
            Err(_) => false,
        }
    }
}

impl fmt::Debug for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketHandle")
            .field("conn_id", &self.conn_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ── Request / response ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ChannelRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
    pub session: SessionContext,
    /// Set when the request arrived over a live socket.
    pub socket: Option<SocketHandle>,
}

impl ChannelRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: HashMap::new(),
            headers: HeaderMap::new(),
            body: None,
            session: SessionContext::default(),
            socket: None,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_session(mut self, session: SessionContext) -> Self {
        self.session = session;
        self
    }

    #[must_use]
    pub fn with_socket(mut self, socket: SocketHandle) -> Self {
        self.socket = Some(socket);
        self
    }

    pub fn is_socket(&self) -> bool {
        self.socket.is_some()
    }
}

/// Response a handler fills in. Defaults to `200` with no body.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelResponse {
    pub status: StatusCode,
    pub body: Option<serde_json::Value>,
}

impl Default for ChannelResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelResponse {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            body: None,
        }
    }

    pub fn json(&mut self, status: StatusCode, body: serde_json::Value) {
        self.status = status;
        self.body = Some(body);
    }

    pub fn ok(&mut self, body: serde_json::Value) {
        self.json(StatusCode::OK, body);
    }
}

// ── Download ────────────────────────────────────────────────────────────────

/// Streamable payload returned by [`crate::ChannelHandler::download`].
pub struct Download {
    pub content_type: String,
    pub file_name: Option<String>,
    pub stream: BoxStream<'static, std::io::Result<Vec<u8>>>,
}

impl Download {
    pub fn from_bytes(content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            content_type: content_type.into(),
            file_name: None,
            stream: stream::once(async move { Ok(bytes) }).boxed(),
        }
    }

    #[must_use]
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }
}

impl fmt::Debug for Download {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Download")
            .field("content_type", &self.content_type)
            .field("file_name", &self.file_name)
            .finish_non_exhaustive()
    }
}
