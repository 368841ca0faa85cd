//! Connection registry for WebSocket sessions using DashMap.
//!
//! Each session carries an outbound channel plus the client's last reported
//! location. Geofenced pushes only reach sessions that have reported a
//! location inside the target radius; sessions that never sent one receive
//! global broadcasts only.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;

use roadsafe_core::models::{Coordinate, ServerEvent};

/// One connected WebSocket client.
pub struct ClientSession {
    pub tx: UnboundedSender<ServerEvent>,
    pub location: Option<Coordinate>,
    pub last_update: DateTime<Utc>,
}

/// Thread-safe registry of live sessions.
pub struct ConnectionHub {
    sessions: DashMap<u64, ClientSession>,
    session_counter: AtomicU64,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            session_counter: AtomicU64::new(0),
        }
    }

    /// Register a new session and return its id.
    pub fn register(&self, tx: UnboundedSender<ServerEvent>) -> u64 {
        let id = self.session_counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.sessions.insert(
            id,
            ClientSession {
                tx,
                location: None,
                last_update: Utc::now(),
            },
        );
        tracing::debug!(session_id = id, "session registered");
        id
    }

    /// Remove a session. Safe to call more than once for the same id.
    pub fn unregister(&self, session_id: u64) {
        if self.sessions.remove(&session_id).is_some() {
            tracing::debug!(session_id, "session removed");
        }
    }

    /// Record the latest location reported by a session.
    pub fn update_location(&self, session_id: u64, location: Coordinate) {
        if let Some(mut session) = self.sessions.get_mut(&session_id) {
            session.location = Some(location);
            session.last_update = Utc::now();
        }
    }

    /// Send an event to one session. Returns false if the session is gone or
    /// its channel is closed; the dead session is removed.
    pub fn send_to(&self, session_id: u64, event: ServerEvent) -> bool {
        let failed = match self.sessions.get(&session_id) {
            Some(session) => session.tx.send(event).is_err(),
            None => return false,
        };
        // The map guard must be released before removal.
        if failed {
            self.unregister(session_id);
            return false;
        }
        true
    }

    /// Deliver an event to every session, then reap any whose channel is closed.
    pub fn broadcast(&self, event: &ServerEvent) -> usize {
        let targets: Vec<u64> = self.sessions.iter().map(|entry| *entry.key()).collect();
        self.deliver(&targets, event)
    }

    /// Deliver an event to sessions whose last known location lies within
    /// `radius_km` of `center` (inclusive). Location-less sessions are skipped.
    pub fn broadcast_to_area(&self, center: Coordinate, radius_km: f64, event: &ServerEvent) -> usize {
        let targets: Vec<u64> = self
            .sessions
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .location
                    .map(|location| location.is_within_km(&center, radius_km))
                    .unwrap_or(false)
            })
            .map(|entry| *entry.key())
            .collect();
        self.deliver(&targets, event)
    }

    fn deliver(&self, targets: &[u64], event: &ServerEvent) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();
        for &session_id in targets {
            if let Some(session) = self.sessions.get(&session_id) {
                if session.tx.send(event.clone()).is_ok() {
                    delivered += 1;
                } else {
                    dead.push(session_id);
                }
            }
        }
        for session_id in dead {
            self.unregister(session_id);
        }
        delivered
    }

    pub fn connection_count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new()
    }
}
