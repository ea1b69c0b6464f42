use std::sync::Arc;

#[cfg(feature = "metrics")]
use parlor_metrics::MetricsHandle;

use {
    parlor_channels::{ChannelHandler, ChannelName, HandlerRegistry},
    parlor_config::ParlorConfig,
    parlor_sessions::{
        InMemoryProfileStore, InMemorySessions, ProfileStore, SessionExtensionStore,
        SessionResolver,
    },
};

use crate::{
    broadcast::EventBroadcaster, channel_events::register_builtin_channels,
    directory::SessionSocketDirectory, dispatch::ChannelDispatchService, nlu::NluService,
    rooms::NotificationRoomCoordinator,
};

// ── Gateway state ────────────────────────────────────────────────────────────

/// Shared gateway runtime state, wrapped in Arc for use across async tasks.
pub struct GatewayState {
    pub version: String,
    pub config: ParlorConfig,
    pub directory: Arc<SessionSocketDirectory>,
    pub rooms: NotificationRoomCoordinator,
    pub broadcaster: Arc<EventBroadcaster>,
    pub dispatch: ChannelDispatchService,
    pub sessions: Arc<dyn SessionResolver>,
    pub extensions: Arc<SessionExtensionStore>,
    /// Always present for scoring; provider sync only when configured.
    pub nlu: NluService,
    #[cfg(feature = "metrics")]
    pub metrics_handle: Option<MetricsHandle>,
}

impl GatewayState {
    pub fn builder(config: ParlorConfig) -> GatewayStateBuilder {
        GatewayStateBuilder::new(config)
    }

    pub fn next_seq(&self) -> u64 {
        self.broadcaster.next_seq()
    }

    pub async fn client_count(&self) -> usize {
        self.directory.len().await
    }
}

// ── Builder ──────────────────────────────────────────────────────────────────

pub struct GatewayStateBuilder {
    config: ParlorConfig,
    sessions: Option<(Arc<dyn SessionResolver>, Arc<SessionExtensionStore>)>,
    profiles: Option<Arc<dyn ProfileStore>>,
    handlers: Vec<(ChannelName, Arc<dyn ChannelHandler>)>,
    nlu: Option<NluService>,
    #[cfg(feature = "metrics")]
    metrics_handle: Option<MetricsHandle>,
}

impl GatewayStateBuilder {
    fn new(config: ParlorConfig) -> Self {
        Self {
            config,
            sessions: None,
            profiles: None,
            handlers: Vec::new(),
            nlu: None,
            #[cfg(feature = "metrics")]
            metrics_handle: None,
        }
    }

    /// Session resolver plus the extension store it clears on logout.
    #[must_use]
    pub fn sessions(
        mut self,
        resolver: Arc<dyn SessionResolver>,
        extensions: Arc<SessionExtensionStore>,
    ) -> Self {
        self.sessions = Some((resolver, extensions));
        self
    }

    #[must_use]
    pub fn in_memory_sessions(self, sessions: Arc<InMemorySessions>) -> Self {
        let extensions = Arc::clone(sessions.extensions());
        self.sessions(sessions, extensions)
    }

    #[must_use]
    pub fn profiles(mut self, profiles: Arc<dyn ProfileStore>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    /// Register an extra channel handler. Registered after the built-in
    /// channels, so a handler under a built-in name replaces it.
    #[must_use]
    pub fn handler(mut self, name: impl Into<ChannelName>, handler: Arc<dyn ChannelHandler>) -> Self {
        self.handlers.push((name.into(), handler));
        self
    }

    #[must_use]
    pub fn nlu(mut self, nlu: NluService) -> Self {
        self.nlu = Some(nlu);
        self
    }

    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn metrics_handle(mut self, handle: MetricsHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    pub fn build(self) -> Arc<GatewayState> {
        let directory = Arc::new(SessionSocketDirectory::new());
        let broadcaster = Arc::new(EventBroadcaster::new(Arc::clone(&directory)));

        let mut registry = HandlerRegistry::new();
        register_builtin_channels(&mut registry, &self.config.channels.enabled, &broadcaster);
        for (name, handler) in self.handlers {
            registry.register(name, handler);
        }

        let (sessions, extensions) = self.sessions.unwrap_or_else(|| {
            let extensions = Arc::new(SessionExtensionStore::new());
            let resolver: Arc<dyn SessionResolver> =
                Arc::new(InMemorySessions::new(Arc::clone(&extensions)));
            (resolver, extensions)
        });
        let profiles: Arc<dyn ProfileStore> = match self.profiles {
            Some(profiles) => profiles,
            None => Arc::new(InMemoryProfileStore::new()),
        };

        Arc::new(GatewayState {
            version: env!("CARGO_PKG_VERSION").to_string(),
            rooms: NotificationRoomCoordinator::new(Arc::clone(&directory)),
            dispatch: ChannelDispatchService::new(
                Arc::new(registry),
                profiles,
                Arc::clone(&extensions),
            ),
            config: self.config,
            directory,
            broadcaster,
            sessions,
            extensions,
            nlu: self.nlu.unwrap_or_default(),
            #[cfg(feature = "metrics")]
            metrics_handle: self.metrics_handle,
        })
    }
}

#[cfg(test)]
mod tests {
    use {super::*, parlor_channels::SocketChannel};

    #[test]
    fn builtin_channels_follow_config() {
        let mut config = ParlorConfig::default();
        config.channels.enabled = vec!["web-channel".into()];
        let state = GatewayState::builder(config).build();
        assert_eq!(state.dispatch.registry().names(), ["web-channel"]);
    }

    #[test]
    fn extra_handlers_override_builtins() {
        let replacement: Arc<dyn ChannelHandler> = Arc::new(SocketChannel::new("web-channel"));
        let state = GatewayState::builder(ParlorConfig::default())
            .handler("web-channel", Arc::clone(&replacement))
            .build();
        let registered = state.dispatch.registry().find("web-channel");
        assert!(registered.is_some_and(|h| Arc::ptr_eq(&h, &replacement)));
        assert_eq!(state.dispatch.registry().len(), 2);
    }
}
