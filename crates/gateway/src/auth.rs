//! Session lookup for HTTP requests and socket connections.
//!
//! Authentication itself happens elsewhere; the gateway only reads the session
//! cookie and asks the [`SessionResolver`](parlor_sessions::SessionResolver)
//! who is behind it.

use std::{convert::Infallible, sync::Arc};

use {
    axum::{
        extract::{FromRef, FromRequestParts},
        http::{HeaderMap, header, request::Parts},
    },
    parlor_channels::SessionContext,
};

use crate::state::GatewayState;

/// Session id carried by the request's session cookie, if any.
pub fn session_id_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|raw| parse_cookie(raw, cookie_name))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Build the session context for `session_id` as it stands right now.
///
/// A blank id never resolves to a principal.
pub async fn resolve_session(state: &GatewayState, session_id: &str) -> SessionContext {
    let principal = if session_id.trim().is_empty() {
        None
    } else {
        state
            .sessions
            .resolve(session_id)
            .await
            .filter(|p| p.is_authenticated())
    };
    SessionContext {
        id: session_id.to_string(),
        principal,
        web: state.extensions.web(session_id),
    }
}

/// Axum extractor yielding the caller's session context.
///
/// Never rejects: a request without a session cookie gets an anonymous
/// context with an empty id, and the operation decides what that means.
pub struct CallerSession(pub SessionContext);

impl<S> FromRequestParts<S> for CallerSession
where
    S: Send + Sync,
    Arc<GatewayState>: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gw = Arc::<GatewayState>::from_ref(state);
        let session_id =
            session_id_from_headers(&parts.headers, &gw.config.auth.session_cookie)
                .unwrap_or_default();
        Ok(Self(resolve_session(&gw, &session_id).await))
    }
}

/// Find `name` in a `Cookie` header value.
pub fn parse_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    for part in header.split(';') {
        let part = part.trim();
        if let Some(value) = part.strip_prefix(name)
            && let Some(value) = value.strip_prefix('=')
        {
            return Some(value);
        }
    }
    None
}
