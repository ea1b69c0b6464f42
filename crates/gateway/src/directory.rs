//! Session id → live socket connections.
//!
//! One lock guards both the connection table and the per-session index, so a
//! reader never sees a connection without its session entry or the reverse.
//! The lock is never held across an await on I/O.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, RwLock as StdRwLock},
    time::Instant,
};

use {
    parlor_channels::SocketHandle,
    parlor_protocol::Room,
    tokio::sync::{RwLock, mpsc},
    tokio_util::sync::CancellationToken,
    tracing::debug,
};

use crate::error::{GatewayError, Result};

// ── Live connection ─────────────────────────────────────────────────────────

/// One physical socket.
pub struct LiveConnection {
    pub conn_id: String,
    pub session_id: String,
    /// Only admin-authenticated sockets may join operator rooms.
    pub notification_eligible: bool,
    pub connected_at: Instant,
    /// Channel feeding this socket's write loop.
    sender: mpsc::UnboundedSender<String>,
    rooms: StdRwLock<HashSet<Room>>,
    socket: SocketHandle,
}

impl LiveConnection {
    pub fn new(
        conn_id: impl Into<String>,
        session_id: impl Into<String>,
        notification_eligible: bool,
        sender: mpsc::UnboundedSender<String>,
    ) -> Self {
        let conn_id = conn_id.into();
        Self {
            socket: SocketHandle::new(conn_id.clone(), CancellationToken::new()),
            conn_id,
            session_id: session_id.into(),
            notification_eligible,
            connected_at: Instant::now(),
            sender,
            rooms: StdRwLock::new(HashSet::new()),
        }
    }

    /// Send a serialized JSON frame. `false` once the write loop is gone.
    pub fn send(&self, frame: &str) -> bool {
        self.sender.send(frame.to_string()).is_ok()
    }

    /// Add a room membership. Returns `false` if already a member.
    pub fn join(&self, room: Room) -> bool {
        match self.rooms.write() {
            Ok(mut rooms) => rooms.insert(room),
            Err(poisoned) => poisoned.into_inner().insert(room),
        }
    }

    pub fn in_room(&self, room: Room) -> bool {
        match self.rooms.read() {
            Ok(rooms) => rooms.contains(&room),
            Err(poisoned) => poisoned.into_inner().contains(&room),
        }
    }

    pub fn rooms(&self) -> Vec<Room> {
        Room::ALL
            .iter()
            .copied()
            .filter(|r| self.in_room(*r))
            .collect()
    }

    /// Transport handle handed to channel handlers.
    pub fn socket(&self) -> SocketHandle {
        self.socket.clone()
    }

    pub fn close_token(&self) -> &CancellationToken {
        self.socket.close_token()
    }
}

impl std::fmt::Debug for LiveConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveConnection")
            .field("conn_id", &self.conn_id)
            .field("session_id", &self.session_id)
            .field("notification_eligible", &self.notification_eligible)
            .field("rooms", &self.rooms())
            .finish()
    }
}

// ── Directory ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct Inner {
    conns: HashMap<String, Arc<LiveConnection>>,
    by_session: HashMap<String, HashSet<String>>,
}

fn detach(by_session: &mut HashMap<String, HashSet<String>>, conn: &LiveConnection) {
    if let Some(ids) = by_session.get_mut(&conn.session_id) {
        ids.remove(&conn.conn_id);
        if ids.is_empty() {
            by_session.remove(&conn.session_id);
        }
    }
}

#[derive(Default)]
pub struct SessionSocketDirectory {
    inner: RwLock<Inner>,
}

impl SessionSocketDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly connected socket.
    pub async fn bind(&self, conn: Arc<LiveConnection>) {
        let mut inner = self.inner.write().await;
        debug!(
            conn_id = %conn.conn_id,
            session_id = %conn.session_id,
            eligible = conn.notification_eligible,
            "directory: bind"
        );
        if let Some(previous) = inner.conns.remove(&conn.conn_id) {
            detach(&mut inner.by_session, &previous);
        }
        inner
            .by_session
            .entry(conn.session_id.clone())
            .or_default()
            .insert(conn.conn_id.clone());
        inner.conns.insert(conn.conn_id.clone(), conn);
    }

    /// Forget a socket. Called on every disconnect path.
    pub async fn unbind(&self, conn_id: &str) -> Option<Arc<LiveConnection>> {
        let mut inner = self.inner.write().await;
        let conn = inner.conns.remove(conn_id)?;
        detach(&mut inner.by_session, &conn);
        debug!(conn_id, session_id = %conn.session_id, "directory: unbind");
        Some(conn)
    }

    /// Every live connection of `session_id`, possibly none.
    pub async fn connections_for(&self, session_id: &str) -> Result<Vec<Arc<LiveConnection>>> {
        if session_id.trim().is_empty() {
            return Err(GatewayError::invalid_argument("SessionId is required!"));
        }
        let inner = self.inner.read().await;
        Ok(inner
            .by_session
            .get(session_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.conns.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn get(&self, conn_id: &str) -> Option<Arc<LiveConnection>> {
        self.inner.read().await.conns.get(conn_id).cloned()
    }

    /// Snapshot of all live connections.
    pub async fn all(&self) -> Vec<Arc<LiveConnection>> {
        self.inner.read().await.conns.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.conns.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.conns.is_empty()
    }

    pub async fn session_count(&self) -> usize {
        self.inner.read().await.by_session.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    pub(crate) fn conn(
        conn_id: &str,
        session_id: &str,
        eligible: bool,
    ) -> (Arc<LiveConnection>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(LiveConnection::new(conn_id, session_id, eligible, tx)),
            rx,
        )
    }

    #[tokio::test]
    async fn empty_session_id_is_invalid() {
        let dir = SessionSocketDirectory::new();
        for id in ["", "   "] {
            assert!(matches!(
                dir.connections_for(id).await,
                Err(GatewayError::InvalidArgument(_))
            ));
        }
    }

    #[tokio::test]
    async fn unknown_session_has_no_connections() {
        let dir = SessionSocketDirectory::new();
        assert!(dir.connections_for("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn multiple_tabs_share_a_session() {
        let dir = SessionSocketDirectory::new();
        let (a, _ra) = conn("c1", "s1", true);
        let (b, _rb) = conn("c2", "s1", false);
        let (c, _rc) = conn("c3", "s2", true);
        dir.bind(a).await;
        dir.bind(b).await;
        dir.bind(c).await;

        let mut ids: Vec<String> = dir
            .connections_for("s1")
            .await
            .unwrap()
            .iter()
            .map(|c| c.conn_id.clone())
            .collect();
        ids.sort();
        assert_eq!(ids, ["c1", "c2"]);
        assert_eq!(dir.session_count().await, 2);
    }

    #[tokio::test]
    async fn unbind_clears_both_indexes() {
        let dir = SessionSocketDirectory::new();
        let (a, _ra) = conn("c1", "s1", true);
        dir.bind(a).await;

        assert!(dir.unbind("c1").await.is_some());
        assert!(dir.unbind("c1").await.is_none());
        assert!(dir.connections_for("s1").await.unwrap().is_empty());
        assert!(dir.is_empty().await);
        assert_eq!(dir.session_count().await, 0);
    }

    #[tokio::test]
    async fn concurrent_bind_and_unbind_stay_consistent() {
        let dir = Arc::new(SessionSocketDirectory::new());
        let mut tasks = Vec::new();
        for i in 0..32 {
            let dir = Arc::clone(&dir);
            tasks.push(tokio::spawn(async move {
                let (c, _rx) = conn(&format!("c{i}"), &format!("s{}", i % 4), true);
                dir.bind(c).await;
                if i % 2 == 0 {
                    dir.unbind(&format!("c{i}")).await;
                }
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }

        assert_eq!(dir.len().await, 16);
        let mut total = 0;
        for s in 0..4 {
            for c in dir.connections_for(&format!("s{s}")).await.unwrap() {
                assert_eq!(c.session_id, format!("s{s}"));
                total += 1;
            }
        }
        assert_eq!(total, 16);
    }

    #[test]
    fn room_membership_is_a_set() {
        let (c, _rx) = conn("c1", "s1", true);
        assert!(c.join(Room::Message));
        assert!(!c.join(Room::Message));
        assert!(c.in_room(Room::Message));
        assert!(!c.in_room(Room::Subscriber));
        assert_eq!(c.rooms(), [Room::Message]);
    }
}
