//! Session store: one entry per open stream.
//!
//! The store owns the only long-lived sender of each session's outbound
//! channel. Removing an entry drops that sender, which ends the stream
//! reading from the matching receiver.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::RngCore;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Number of random bytes in a session id (hex-encoded on the wire).
pub const SESSION_ID_BYTES: usize = 32;

/// Snapshot of a session's metadata.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub protocol_version: &'static str,
    /// Advisory id the client sent when opening the stream.
    pub client_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

struct SessionEntry {
    session: Session,
    tx: mpsc::Sender<String>,
    last_activity: Instant,
}

struct Inner {
    sessions: DashMap<String, SessionEntry>,
    channel_capacity: usize,
}

/// Concurrent map of open sessions. Cloning shares the same map.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: DashMap::new(),
                channel_capacity: channel_capacity.max(1),
            }),
        }
    }

    /// Allocate a session and return it with the receiving end of its
    /// outbound channel.
    pub fn open(
        &self,
        protocol_version: &'static str,
        client_session_id: Option<String>,
    ) -> (Session, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.inner.channel_capacity);
        let session = Session {
            id: generate_session_id(),
            protocol_version,
            client_session_id,
            created_at: Utc::now(),
        };
        self.inner.sessions.insert(
            session.id.clone(),
            SessionEntry {
                session: session.clone(),
                tx,
                last_activity: Instant::now(),
            },
        );
        debug!(session = %session.id, version = protocol_version, "Session opened");
        (session, rx)
    }

    /// Like [`open`](Self::open), but refuses once `max` sessions are open.
    ///
    /// The entry is inserted before the count is checked and removed again
    /// if the store went over `max`, so racing opens never overshoot.
    pub fn try_open(
        &self,
        protocol_version: &'static str,
        client_session_id: Option<String>,
        max: usize,
    ) -> Option<(Session, mpsc::Receiver<String>)> {
        if self.len() >= max {
            return None;
        }
        let (session, rx) = self.open(protocol_version, client_session_id);
        if self.len() > max {
            self.inner.sessions.remove(&session.id);
            debug!(session = %session.id, "Session admission rolled back");
            return None;
        }
        Some((session, rx))
    }

    /// Guard that removes the session when dropped.
    pub fn guard(&self, id: &str) -> SessionGuard {
        SessionGuard {
            store: self.clone(),
            id: id.to_string(),
        }
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.inner.sessions.get(id).map(|e| e.session.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.sessions.contains_key(id)
    }

    /// Mark activity on a session. Returns `false` if it no longer exists.
    pub fn touch(&self, id: &str) -> bool {
        match self.inner.sessions.get_mut(id) {
            Some(mut entry) => {
                entry.last_activity = Instant::now();
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: &str) -> bool {
        let removed = self.inner.sessions.remove(id).is_some();
        if removed {
            debug!(session = %id, "Session removed");
        }
        removed
    }

    /// Push a message onto a session's stream.
    ///
    /// Waits while the channel is full. Returns `false` when the session is
    /// gone, in which case the message is dropped.
    pub async fn deliver(&self, id: &str, message: String) -> bool {
        // Clone the sender so no map shard lock is held across the await.
        let tx = match self.inner.sessions.get_mut(id) {
            Some(mut entry) => {
                entry.last_activity = Instant::now();
                entry.tx.clone()
            }
            None => {
                debug!(session = %id, "Discarding message for closed session");
                return false;
            }
        };
        if tx.send(message).await.is_err() {
            debug!(session = %id, "Discarding message, stream receiver dropped");
            return false;
        }
        true
    }

    pub fn len(&self) -> usize {
        self.inner.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.sessions.is_empty()
    }

    /// Remove every session idle for longer than `max_idle`.
    pub fn reap_idle(&self, max_idle: Duration) -> usize {
        let before = self.len();
        self.inner
            .sessions
            .retain(|_, entry| entry.last_activity.elapsed() <= max_idle);
        let reaped = before.saturating_sub(self.len());
        if reaped > 0 {
            info!("Reaped {reaped} idle session(s)");
        }
        reaped
    }

    /// Remove all sessions, ending every open stream.
    pub fn close_all(&self) -> usize {
        let count = self.len();
        self.inner.sessions.clear();
        count
    }

    /// Spawn the periodic idle reaper. `None` when `idle_timeout` is zero.
    pub fn spawn_reaper(&self, idle_timeout: Duration) -> Option<JoinHandle<()>> {
        if idle_timeout.is_zero() {
            return None;
        }
        let store = self.clone();
        let period = (idle_timeout / 2).clamp(Duration::from_millis(50), Duration::from_secs(30));
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                store.reap_idle(idle_timeout);
            }
        }))
    }
}

/// Removes its session from the store on drop.
///
/// Owned by the outbound stream so a client disconnect cleans up.
pub struct SessionGuard {
    store: SessionStore,
    id: String,
}

impl SessionGuard {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.store.remove(&self.id);
    }
}

fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
