use std::{collections::HashMap, sync::Arc, time::Duration};

use {
    axum::{
        extract::{
            Query,
            ws::{Message, WebSocket},
        },
        http::{Method, Uri},
    },
    futures::{SinkExt, stream::StreamExt},
    parlor_channels::{ChannelRequest, ChannelResponse},
    parlor_protocol::{
        ClientFrame, ErrorShape, EventFrame, ResponseFrame, SocketMethod, SocketRequestFrame,
        error_codes, paths,
    },
    serde::Serialize,
    tokio::sync::mpsc,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use parlor_metrics::{counter, gauge, histogram, websocket as ws_metrics};

use crate::{auth::resolve_session, directory::LiveConnection, state::GatewayState};

/// Handle a single WebSocket connection through its full lifecycle:
/// bind → message loop → cleanup.
///
/// `session_id` comes from the session cookie; without one the connection
/// gets a fresh anonymous session. `subscriber` marks public widget sockets,
/// which never join operator rooms.
pub async fn handle_connection(
    socket: WebSocket,
    state: Arc<GatewayState>,
    session_id: Option<String>,
    subscriber: bool,
) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let session_id = session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let session = resolve_session(&state, &session_id).await;
    let eligible = session.principal().is_some() && !subscriber;
    info!(
        conn_id = %conn_id,
        session_id = %session_id,
        authenticated = session.principal().is_some(),
        subscriber,
        "ws: new connection"
    );

    let sockets = &state.config.sockets;
    let ping_interval = Duration::from_millis(sockets.ping_interval_ms.max(1));
    let ping_timeout = Duration::from_millis(sockets.ping_timeout_ms);
    let max_payload = sockets.max_payload_bytes;

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (client_tx, mut client_rx) = mpsc::unbounded_channel::<String>();

    // Write loop: forwards frames from the connection's channel and pings.
    // Ends once every sender is gone, i.e. after the connection is unbound.
    let write_conn_id = conn_id.clone();
    let write_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ping_interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                msg = client_rx.recv() => {
                    let Some(msg) = msg else { break };
                    if ws_tx.send(Message::Text(msg.into())).await.is_err() {
                        debug!(conn_id = %write_conn_id, "ws: write loop closed");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        debug!(conn_id = %write_conn_id, "ws: ping failed");
                        break;
                    }
                },
            }
        }
        let _ = ws_tx.close().await;
    });

    let conn = Arc::new(LiveConnection::new(
        conn_id.clone(),
        session_id.clone(),
        eligible,
        client_tx,
    ));
    let close = conn.close_token().clone();
    state.directory.bind(Arc::clone(&conn)).await;

    #[cfg(feature = "metrics")]
    {
        counter!(ws_metrics::CONNECTIONS_TOTAL).increment(1);
        gauge!(ws_metrics::CONNECTIONS_ACTIVE).increment(1.0);
    }

    send_frame(
        &conn,
        &EventFrame::new(
            "connected",
            serde_json::json!({
                "connId": conn_id,
                "sessionId": session_id,
                "eligible": eligible,
            }),
            state.next_seq(),
        ),
    );

    // ── Message loop ─────────────────────────────────────────────────────

    loop {
        let next = tokio::select! {
            () = close.cancelled() => {
                info!(conn_id = %conn_id, "ws: closed by server");
                break;
            },
            next = tokio::time::timeout(ping_timeout, ws_rx.next()) => next,
        };
        let msg = match next {
            Err(_) => {
                warn!(conn_id = %conn_id, "ws: no traffic within ping timeout");
                break;
            },
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                debug!(conn_id = %conn_id, error = %e, "ws: read error");
                break;
            },
            Ok(Some(Ok(msg))) => msg,
        };
        let text = match msg {
            Message::Text(t) => t.to_string(),
            Message::Close(_) => break,
            _ => continue,
        };

        #[cfg(feature = "metrics")]
        counter!(ws_metrics::MESSAGES_RECEIVED_TOTAL).increment(1);

        if text.len() > max_payload {
            warn!(conn_id = %conn_id, size = text.len(), "ws: payload too large");
            send_frame(
                &conn,
                &EventFrame::new(
                    "error",
                    serde_json::json!({ "message": "payload too large", "maxBytes": max_payload }),
                    state.next_seq(),
                ),
            );
            continue;
        }

        let frame: ClientFrame = match serde_json::from_str(&text) {
            Ok(f) => f,
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "ws: invalid frame");
                send_frame(
                    &conn,
                    &EventFrame::new(
                        "error",
                        serde_json::json!({ "message": "invalid frame" }),
                        state.next_seq(),
                    ),
                );
                continue;
            },
        };

        match frame {
            ClientFrame::Healthcheck { .. } => {
                send_frame(
                    &conn,
                    &EventFrame::new("event", serde_json::json!("OK"), state.next_seq()),
                );
            },
            ClientFrame::Request(req) => {
                debug!(
                    conn_id = %conn_id,
                    request_id = %req.id,
                    method = %req.method,
                    url = %req.url,
                    "ws: received request frame"
                );
                let response = handle_request(&state, &conn, req).await;
                send_frame(&conn, &response);
            },
        }
    }

    // ── Cleanup ──────────────────────────────────────────────────────────

    let duration = state
        .directory
        .unbind(&conn_id)
        .await
        .map(|c| c.connected_at.elapsed())
        .unwrap_or_default();
    drop(conn);

    #[cfg(feature = "metrics")]
    {
        gauge!(ws_metrics::CONNECTIONS_ACTIVE).decrement(1.0);
        histogram!(ws_metrics::CONNECTION_DURATION_SECONDS).record(duration.as_secs_f64());
    }

    info!(
        conn_id = %conn_id,
        session_id = %session_id,
        duration_secs = duration.as_secs(),
        "ws: connection closed"
    );

    // Give the write loop a moment to flush and send the close frame.
    if tokio::time::timeout(Duration::from_secs(1), write_handle)
        .await
        .is_err()
    {
        debug!(conn_id = %conn_id, "ws: write loop did not finish in time");
    }
}

/// Route one socket request frame and build its reply.
///
/// The session is resolved again for every request, so a login or logout
/// after the socket opened is honoured.
async fn handle_request(
    state: &GatewayState,
    conn: &LiveConnection,
    frame: SocketRequestFrame,
) -> ResponseFrame {
    let uri: Uri = match frame.url.parse() {
        Ok(uri) => uri,
        Err(_) => {
            return ResponseFrame::err(
                frame.id,
                400,
                ErrorShape::new(error_codes::INVALID_REQUEST, "malformed url"),
            );
        },
    };
    let query = Query::<HashMap<String, String>>::try_from_uri(&uri)
        .map(|Query(q)| q)
        .unwrap_or_default();
    let method = match frame.method {
        SocketMethod::Get => Method::GET,
        SocketMethod::Post => Method::POST,
    };

    let session = resolve_session(state, &conn.session_id).await;
    let mut req = ChannelRequest::new(method, uri.path())
        .with_query(query)
        .with_session(session)
        .with_socket(conn.socket());
    if let Some(body) = frame.body {
        req = req.with_body(body);
    }
    let mut res = ChannelResponse::new();

    let result = match uri.path() {
        paths::WEB_WEBHOOK => state.dispatch.dispatch_web_socket(&req, &mut res).await,
        paths::CONSOLE_WEBHOOK => {
            state
                .dispatch
                .dispatch_admin_console(&mut req, &mut res)
                .await
        },
        other => {
            debug!(conn_id = %conn.conn_id, url = other, "ws: no socket route");
            return ResponseFrame::err(
                frame.id,
                404,
                ErrorShape::new(error_codes::NOT_FOUND, format!("no socket route for {other}")),
            );
        },
    };

    match result {
        Ok(()) => ResponseFrame::ok(
            frame.id,
            res.status.as_u16(),
            res.body.unwrap_or(serde_json::Value::Null),
        ),
        Err(e) => {
            debug!(conn_id = %conn.conn_id, error = %e, "ws: request failed");
            ResponseFrame::err(frame.id, e.status().as_u16(), e.to_error_shape())
        },
    }
}

fn send_frame<T: Serialize>(conn: &LiveConnection, frame: &T) {
    match serde_json::to_string(frame) {
        Ok(json) => {
            if !conn.send(&json) {
                debug!(conn_id = %conn.conn_id, "ws: write loop gone, frame dropped");
            }
        },
        Err(e) => warn!(conn_id = %conn.conn_id, error = %e, "ws: failed to serialize frame"),
    }
}
