use std::{collections::HashMap, sync::Arc};

use tracing::{debug, warn};

#[cfg(feature = "metrics")]
use parlor_metrics::{channels as ch_metrics, gauge};

use crate::{
    error::{Error, Result},
    name::ChannelName,
    plugin::ChannelHandler,
};

/// Registry of channel handlers, one per channel name.
///
/// Populated once at boot, then shared read-only behind an `Arc`.
pub struct HandlerRegistry {
    handlers: HashMap<ChannelName, Arc<dyn ChannelHandler>>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Store `handler` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<ChannelName>, handler: Arc<dyn ChannelHandler>) {
        let name = name.into();
        if self.handlers.insert(name.clone(), handler).is_some() {
            warn!(channel = %name, "channel handler registered twice, keeping the latest");
        } else {
            debug!(channel = %name, "registered channel handler");
        }
        #[cfg(feature = "metrics")]
        gauge!(ch_metrics::REGISTERED).set(self.handlers.len() as f64);
    }

    /// Register under the handler's own name.
    pub fn register_handler(&mut self, handler: Arc<dyn ChannelHandler>) {
        let name = ChannelName::new(handler.name());
        self.register(name, handler);
    }

    /// Every registered handler, in no particular order.
    pub fn all(&self) -> Vec<Arc<dyn ChannelHandler>> {
        self.handlers.values().cloned().collect()
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn ChannelHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Like [`find`](Self::find), but an unknown name is an error.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ChannelHandler>> {
        self.find(name).ok_or_else(|| Error::channel_not_found(name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.keys().map(ChannelName::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
