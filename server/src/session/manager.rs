//! Session manager for tracking clients and their subscriptions

use super::connection::SessionHandle;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;
use tvlink_shared::{link, Frame};

/// Manages all active client sessions
pub struct SessionManager {
    /// Map of session id -> entry
    sessions: RwLock<HashMap<u64, SessionEntry>>,
    next_id: AtomicU64,
}

struct SessionEntry {
    handle: SessionHandle,
    topics: HashSet<String>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Allocate an id for a new session
    pub fn next_session_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub async fn register(&self, handle: SessionHandle) {
        let entry = SessionEntry {
            handle,
            topics: HashSet::new(),
        };
        let mut sessions = self.sessions.write().await;
        sessions.insert(entry.handle.id, entry);
    }

    pub async fn unregister(&self, id: u64) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&id);
    }

    /// Add a topic subscription; false if the session is unknown
    pub async fn subscribe(&self, id: u64, topic: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(entry) => {
                entry.topics.insert(topic.to_string());
                true
            }
            None => false,
        }
    }

    /// Deliver `payload` to every subscriber of `topic` and return how many got it
    pub async fn publish(&self, topic: &str, payload: &str) -> u32 {
        let frame = Frame::Message {
            topic: topic.to_string(),
            payload: payload.to_string(),
        };

        let subscribers: Vec<SessionHandle> = {
            let sessions = self.sessions.read().await;
            sessions
                .values()
                .filter(|e| e.topics.contains(topic))
                .map(|e| e.handle.clone())
                .collect()
        };

        let mut delivered = 0;
        for handle in subscribers {
            match handle.send(&frame).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Failed to deliver to session {} ({}): {}", handle.id, handle.addr, e),
            }
        }
        delivered
    }

    /// Number of sessions subscribed to `topic`
    pub async fn subscribers(&self, topic: &str) -> usize {
        let sessions = self.sessions.read().await;
        sessions.values().filter(|e| e.topics.contains(topic)).count()
    }

    /// Sessions silent for longer than `timeout`
    pub async fn check_dead_sessions(&self, timeout: Duration) -> Vec<u64> {
        let sessions = self.sessions.read().await;
        let now = Instant::now();
        let mut dead = Vec::new();
        for (id, entry) in sessions.iter() {
            let last_seen = *entry.handle.last_seen.lock().await;
            if now.duration_since(last_seen) > timeout {
                dead.push(*id);
            }
        }
        dead
    }

    /// Remove sessions past the heartbeat timeout and return their ids
    pub async fn remove_dead_sessions(&self) -> Vec<u64> {
        self.remove_sessions_silent_for(Duration::from_millis(link::HEARTBEAT_TIMEOUT_MS))
            .await
    }

    pub async fn remove_sessions_silent_for(&self, timeout: Duration) -> Vec<u64> {
        let dead = self.check_dead_sessions(timeout).await;
        if !dead.is_empty() {
            let removed: Vec<SessionHandle> = {
                let mut sessions = self.sessions.write().await;
                dead.iter()
                    .filter_map(|id| sessions.remove(id))
                    .map(|e| e.handle)
                    .collect()
            };
            for handle in removed {
                handle.shutdown().await;
            }
        }
        dead
    }

    /// Get the number of connected clients
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
