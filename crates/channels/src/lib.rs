//! Channel handler system.
//!
//! Each inbound surface (web widget, operator console, third-party messaging
//! platforms) implements [`ChannelHandler`]. Handlers are registered once per
//! boot in a [`HandlerRegistry`] keyed by [`ChannelName`]; the gateway resolves
//! them by name for every webhook, download and socket request.

pub mod error;
pub mod name;
pub mod plugin;
pub mod registry;
pub mod request;
pub mod socket;

pub use {
    error::{Error, Result},
    name::ChannelName,
    plugin::{ChannelEvent, ChannelEventSink, ChannelHandler},
    registry::HandlerRegistry,
    request::{ChannelRequest, ChannelResponse, Download, SessionContext, SocketHandle},
    socket::SocketChannel,
};
