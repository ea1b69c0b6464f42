//! Gateway: HTTP webhooks and the WebSocket transport in front of the channel
//! handlers, plus the live-socket directory and notification rooms.
//!
//! Lifecycle:
//! 1. Load config, register built-in channel handlers
//! 2. Build [`GatewayState`](state::GatewayState)
//! 3. Serve HTTP (health, webhooks, downloads, room joins, NLU) and sockets
//!
//! Channel semantics live in the handlers registered with the
//! [`HandlerRegistry`](parlor_channels::HandlerRegistry); this crate only
//! routes to them.

pub mod auth;
pub mod broadcast;
pub mod channel_events;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod nlu;
pub mod rooms;
pub mod server;
pub mod state;
pub mod ws;

pub use {
    broadcast::EventBroadcaster,
    directory::{LiveConnection, SessionSocketDirectory},
    dispatch::ChannelDispatchService,
    error::{GatewayError, Result},
    nlu::NluService,
    rooms::NotificationRoomCoordinator,
    server::{AppState, build_gateway_app, start_gateway},
    state::{GatewayState, GatewayStateBuilder},
};
