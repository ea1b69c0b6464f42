//! Routes inbound requests to channel handlers.

use std::{sync::Arc, time::Duration};

use {
    parlor_channels::{
        ChannelHandler, ChannelName, ChannelRequest, ChannelResponse, Download, HandlerRegistry,
    },
    parlor_protocol::{UNAUTHORIZED_CLOSE_DELAY_MS, channels::CONSOLE_UNAUTHORIZED},
    parlor_sessions::{ProfileSeed, ProfileStore, SessionExtensionStore, WebSessionState},
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use {
    parlor_metrics::{channels as ch_metrics, counter, histogram, labels},
    std::time::Instant,
};

use crate::error::{GatewayError, Result};

/// Resolves handlers through the registry and owns the two socket paths that
/// need session-aware pre-processing (public web, authenticated console).
pub struct ChannelDispatchService {
    registry: Arc<HandlerRegistry>,
    profiles: Arc<dyn ProfileStore>,
    extensions: Arc<SessionExtensionStore>,
}

impl ChannelDispatchService {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        profiles: Arc<dyn ProfileStore>,
        extensions: Arc<SessionExtensionStore>,
    ) -> Self {
        Self {
            registry,
            profiles,
            extensions,
        }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    fn resolve(&self, name: &ChannelName) -> Result<Arc<dyn ChannelHandler>> {
        self.registry.resolve(name.as_str()).map_err(|e| {
            record_error(name, "not_found");
            GatewayError::from(e)
        })
    }

    /// Generic webhook: `channel_id` is the short id, e.g. `web`.
    pub async fn dispatch(
        &self,
        channel_id: &str,
        req: &ChannelRequest,
        res: &mut ChannelResponse,
    ) -> Result<()> {
        let name = ChannelName::from_id(channel_id);
        debug!(channel = %name, method = %req.method, "dispatching webhook");
        let handler = self.resolve(&name)?;
        run_handler(&name, handler.as_ref(), req, res).await
    }

    /// Signed attachment download through the channel's handler.
    pub async fn dispatch_download(
        &self,
        channel_id: &str,
        token: &str,
        req: &ChannelRequest,
    ) -> Result<Download> {
        let name = ChannelName::from_id(channel_id);
        debug!(channel = %name, "dispatching download");
        let handler = self.resolve(&name)?;
        handler.download(token, req).await.map_err(|e| {
            record_error(&name, "handler");
            GatewayError::from(e)
        })
    }

    /// Socket request for the public web channel.
    pub async fn dispatch_web_socket(
        &self,
        req: &ChannelRequest,
        res: &mut ChannelResponse,
    ) -> Result<()> {
        let name = ChannelName::web();
        info!(method = %req.method, "channel notification (web socket)");
        let handler = self.resolve(&name)?;
        run_handler(&name, handler.as_ref(), req, res).await
    }

    /// Socket request for the operator console channel.
    ///
    /// Without an authenticated principal the socket is closed after a short
    /// grace delay and the call fails with `Unauthorized`. Otherwise the
    /// principal's chat profile is found or created, attached to the session's
    /// web state, and the console handler takes over.
    pub async fn dispatch_admin_console(
        &self,
        req: &mut ChannelRequest,
        res: &mut ChannelResponse,
    ) -> Result<()> {
        let name = ChannelName::console();
        info!(method = %req.method, "channel notification (admin chat console socket)");

        let Some(principal) = req.session.principal().cloned() else {
            if let Some(socket) = &req.socket {
                warn!(
                    conn_id = %socket.conn_id(),
                    session_id = %req.session.id,
                    "unauthenticated console access, closing socket"
                );
                socket.close_after(Duration::from_millis(UNAUTHORIZED_CLOSE_DELAY_MS));
            }
            record_error(&name, "unauthorized");
            return Err(GatewayError::unauthorized(CONSOLE_UNAUTHORIZED));
        };

        let profile = self
            .profiles
            .find_or_create(&principal.id, ProfileSeed::from(&principal))
            .await
            .inspect_err(|_| record_error(&name, "profile"))?;

        let web = WebSessionState::socket(profile);
        self.extensions.attach_web(&req.session.id, web.clone());
        req.session.web = Some(web);

        let handler = self.resolve(&name)?;
        run_handler(&name, handler.as_ref(), req, res).await
    }
}

async fn run_handler(
    name: &ChannelName,
    handler: &dyn ChannelHandler,
    req: &ChannelRequest,
    res: &mut ChannelResponse,
) -> Result<()> {
    #[cfg(feature = "metrics")]
    let started = Instant::now();

    let result = handler.handle(req, res).await;

    #[cfg(feature = "metrics")]
    {
        counter!(ch_metrics::DISPATCH_TOTAL, labels::CHANNEL => name.to_string()).increment(1);
        histogram!(ch_metrics::DISPATCH_DURATION_SECONDS, labels::CHANNEL => name.to_string())
            .record(started.elapsed().as_secs_f64());
    }

    result.map_err(|e| {
        warn!(channel = %name, error = %e, "channel handler failed");
        record_error(name, "handler");
        GatewayError::from(e)
    })
}

fn record_error(name: &ChannelName, reason: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(
        ch_metrics::DISPATCH_ERRORS_TOTAL,
        labels::CHANNEL => name.to_string(),
        labels::REASON => reason
    )
    .increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = (name, reason);
}
