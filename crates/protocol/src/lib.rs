//! Socket protocol definitions shared by the gateway and its clients.
//!
//! All communication uses JSON frames over WebSocket.
//!
//! Frame types:
//! - `ClientFrame::Request`     : client → gateway socket request (`get`/`post` on a url)
//! - `ClientFrame::Healthcheck` : client → gateway liveness check
//! - `ResponseFrame`            : gateway → client reply to a socket request
//! - `EventFrame`               : gateway → client server-push (room broadcasts included)

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

// ── Constants ────────────────────────────────────────────────────────────────

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_PAYLOAD_BYTES: usize = 524_288; // 512 KB
pub const PING_INTERVAL_MS: u64 = 25_000; // 25s
pub const PING_TIMEOUT_MS: u64 = 60_000; // 60s
/// Grace period between rejecting an unauthenticated console request and
/// closing its transport, so the rejection frame is flushed first.
pub const UNAUTHORIZED_CLOSE_DELAY_MS: u64 = 300;

pub const DEFAULT_SOCKET_PATH: &str = "/socket";

pub mod channels {
    /// Public, socket-capable web widget channel.
    pub const WEB: &str = "web-channel";
    /// Authenticated operator console channel.
    pub const CONSOLE: &str = "console-channel";
    /// Suffix appended to a short channel id to form its registry key.
    pub const SUFFIX: &str = "-channel";
    /// Refusal sent for console requests without an operator session.
    pub const CONSOLE_UNAUTHORIZED: &str =
        "Only authenticated users are allowed to use this channel";
}

pub mod paths {
    /// Socket url routed to the web channel handler.
    pub const WEB_WEBHOOK: &str = "/webhook/web-channel/";
    /// Socket url routed to the console channel handler.
    pub const CONSOLE_WEBHOOK: &str = "/webhook/console-channel/";
}

// ── Error codes ──────────────────────────────────────────────────────────────

pub mod error_codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
    pub const NO_ELIGIBLE_CONNECTIONS: &str = "NO_ELIGIBLE_CONNECTIONS";
    pub const UNAVAILABLE: &str = "UNAVAILABLE";
    pub const CHANNEL_ERROR: &str = "CHANNEL_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
}

// ── Error shape ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorShape {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorShape {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }
}

// ── Rooms ────────────────────────────────────────────────────────────────────

/// Named broadcast groups operator connections can join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Room {
    /// Operator-wide message notifications.
    Message,
    /// Subscriber lifecycle notifications (new subscriber, handover, ...).
    Subscriber,
}

impl Room {
    pub const ALL: &'static [Room] = &[Self::Message, Self::Subscriber];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Subscriber => "subscriber",
        }
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown room: {0}")]
pub struct UnknownRoom(pub String);

impl FromStr for Room {
    type Err = UnknownRoom;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(Self::Message),
            "subscriber" => Ok(Self::Subscriber),
            other => Err(UnknownRoom(other.to_string())),
        }
    }
}

// ── Event envelope ───────────────────────────────────────────────────────────

/// Application-defined event delivered verbatim to room members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub op: String,
    #[serde(rename = "speakerId", skip_serializing_if = "Option::is_none")]
    pub speaker_id: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl EventEnvelope {
    pub fn new(op: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            op: op.into(),
            speaker_id: None,
            data,
        }
    }

    #[must_use]
    pub fn with_speaker(mut self, speaker_id: impl Into<String>) -> Self {
        self.speaker_id = Some(speaker_id.into());
        self
    }
}

// ── Frames ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketMethod {
    Get,
    Post,
}

impl fmt::Display for SocketMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// Discriminated union of frames a client may send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    #[serde(rename = "req")]
    Request(SocketRequestFrame),
    #[serde(rename = "healthcheck")]
    Healthcheck {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
    },
}

/// Client → gateway socket request, routed by `url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketRequestFrame {
    pub id: String,
    pub method: SocketMethod,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

/// Gateway → client reply to a socket request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFrame {
    pub r#type: String, // always "res"
    pub id: String,
    pub status: u16,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorShape>,
}

impl ResponseFrame {
    pub fn ok(id: impl Into<String>, status: u16, body: serde_json::Value) -> Self {
        Self {
            r#type: "res".into(),
            id: id.into(),
            status,
            ok: true,
            body: Some(body),
            error: None,
        }
    }

    pub fn err(id: impl Into<String>, status: u16, error: ErrorShape) -> Self {
        Self {
            r#type: "res".into(),
            id: id.into(),
            status,
            ok: false,
            body: None,
            error: Some(error),
        }
    }
}

/// Gateway → client server-push event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFrame {
    pub r#type: String, // always "event"
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<Room>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

impl EventFrame {
    pub fn new(event: impl Into<String>, payload: serde_json::Value, seq: u64) -> Self {
        Self {
            r#type: "event".into(),
            event: event.into(),
            room: None,
            payload: Some(payload),
            seq: Some(seq),
        }
    }

    #[must_use]
    pub fn in_room(mut self, room: Room) -> Self {
        self.room = Some(room);
        self
    }
}
