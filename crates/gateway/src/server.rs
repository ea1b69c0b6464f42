use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        body::{Body, Bytes},
        extract::{FromRef, Path, Query, State, WebSocketUpgrade},
        http::{HeaderMap, HeaderValue, Method, StatusCode, header},
        response::{IntoResponse, Json, Response},
        routing::{get, post},
    },
    parlor_channels::{ChannelRequest, ChannelResponse},
    parlor_nlu::{NluEvent, ParsedEntity},
    parlor_protocol::{PROTOCOL_VERSION, Room, channels},
    serde::Deserialize,
    tower_http::{
        cors::{AllowOrigin, Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{info, warn},
};

use crate::{
    auth::{CallerSession, session_id_from_headers},
    error::{GatewayError, Result},
    state::GatewayState,
    ws::handle_connection,
};

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayState>,
}

impl FromRef<AppState> for Arc<GatewayState> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.gateway)
    }
}

// ── Router ───────────────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: Arc<GatewayState>) -> Router {
    let cors = cors_layer(&state.config.sockets.allowed_origins);
    let socket_path = state.config.sockets.path.clone();

    let router = Router::new()
        .route("/health", get(health_handler))
        .route(&socket_path, get(ws_upgrade_handler))
        .route("/webhook/{channel}", get(webhook_handler).post(webhook_handler))
        .route("/webhook/{channel}/download/{token}", get(download_handler))
        .route("/api/notifications/join", post(join_room_handler))
        .route("/api/nlu/events", post(nlu_event_handler))
        .route("/api/nlu/score", post(nlu_score_handler));

    #[cfg(feature = "prometheus")]
    let router = router.route("/metrics", get(metrics_handler));

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { gateway: state })
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid allowed origin");
                None
            },
        })
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}

/// Start the gateway HTTP + WebSocket server and serve until ctrl-c.
pub async fn start_gateway(state: Arc<GatewayState>) -> anyhow::Result<()> {
    let addr: SocketAddr =
        format!("{}:{}", state.config.server.bind, state.config.server.port).parse()?;
    let socket_path = state.config.sockets.path.clone();
    let channels = state.dispatch.registry().names().join(", ");
    let app = build_gateway_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        addr = %listener.local_addr()?,
        socket = %socket_path,
        channels = %channels,
        "gateway listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let count = state.gateway.client_count().await;
    Json(serde_json::json!({
        "status": "ok",
        "version": state.gateway.version,
        "protocol": PROTOCOL_VERSION,
        "connections": count,
    }))
}

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let sockets = &state.gateway.config.sockets;
    if let Some(origin) = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok())
        && !sockets.is_origin_allowed(origin)
    {
        warn!(origin, "ws: rejected connection from disallowed origin");
        return (StatusCode::FORBIDDEN, "origin not allowed").into_response();
    }

    let max_message_size = sockets.max_payload_bytes.saturating_mul(2);

    let session_id = session_id_from_headers(&headers, &state.gateway.config.auth.session_cookie);
    let subscriber = params.get("channel").is_some_and(|c| c == channels::WEB);
    ws.max_message_size(max_message_size)
        .on_upgrade(move |socket| handle_connection(socket, state.gateway, session_id, subscriber))
        .into_response()
}

/// Webhook bodies are usually JSON; anything else is passed on as a string.
fn parse_body(bytes: &Bytes) -> Option<serde_json::Value> {
    if bytes.is_empty() {
        return None;
    }
    serde_json::from_slice(bytes).ok().or_else(|| {
        Some(serde_json::Value::String(
            String::from_utf8_lossy(bytes).into_owned(),
        ))
    })
}

fn channel_response(res: ChannelResponse) -> Response {
    match res.body {
        Some(body) => (res.status, Json(body)).into_response(),
        None => res.status.into_response(),
    }
}

async fn webhook_handler(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    CallerSession(session): CallerSession,
    body: Bytes,
) -> Result<Response> {
    let mut req = ChannelRequest::new(method, format!("/webhook/{channel}"))
        .with_query(query)
        .with_headers(headers)
        .with_session(session);
    if let Some(body) = parse_body(&body) {
        req = req.with_body(body);
    }
    let mut res = ChannelResponse::new();
    state.gateway.dispatch.dispatch(&channel, &req, &mut res).await?;
    Ok(channel_response(res))
}

async fn download_handler(
    State(state): State<AppState>,
    Path((channel, token)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    CallerSession(session): CallerSession,
) -> Result<Response> {
    let req = ChannelRequest::new(
        Method::GET,
        format!("/webhook/{channel}/download/{token}"),
    )
    .with_query(query)
    .with_headers(headers)
    .with_session(session);
    let download = state
        .gateway
        .dispatch
        .dispatch_download(&channel, &token, &req)
        .await?;

    let mut response = Body::from_stream(download.stream).into_response();
    let response_headers = response.headers_mut();
    if let Ok(content_type) = HeaderValue::from_str(&download.content_type) {
        response_headers.insert(header::CONTENT_TYPE, content_type);
    }
    if let Some(name) = download.file_name
        && let Ok(disposition) =
            HeaderValue::from_str(&format!("attachment; filename=\"{}\"", name.replace('"', "")))
    {
        response_headers.insert(header::CONTENT_DISPOSITION, disposition);
    }
    Ok(response)
}

#[derive(Deserialize)]
struct JoinRoomRequest {
    room: Room,
}

async fn join_room_handler(
    State(state): State<AppState>,
    CallerSession(session): CallerSession,
    Json(body): Json<JoinRoomRequest>,
) -> Result<Json<serde_json::Value>> {
    let joined = state.gateway.rooms.join_room(&session.id, body.room).await?;
    Ok(Json(serde_json::json!({
        "room": body.room,
        "sockets": joined,
    })))
}

async fn nlu_event_handler(
    State(state): State<AppState>,
    Json(event): Json<NluEvent>,
) -> Result<StatusCode> {
    state
        .gateway
        .nlu
        .record(event)
        .map(|()| StatusCode::ACCEPTED)
        .map_err(|e| GatewayError::unavailable(e.to_string()))
}

#[derive(Deserialize)]
struct ScoreRequest {
    entities: Vec<ParsedEntity>,
}

async fn nlu_score_handler(
    State(state): State<AppState>,
    Json(body): Json<ScoreRequest>,
) -> Result<Json<serde_json::Value>> {
    let scored = state
        .gateway
        .nlu
        .compute_prediction_score(&body.entities)
        .await?;
    Ok(Json(serde_json::json!({ "entities": scored })))
}

#[cfg(feature = "prometheus")]
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = state
        .gateway
        .metrics_handle
        .as_ref()
        .map(|h| h.render())
        .unwrap_or_default();
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
