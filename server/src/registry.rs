//! Session lookup, creation, and join admission
//!
//! The registry maps opaque session identifiers to running hubs. Joining a
//! session hands out a [`Seat`]: a token that holds the player's name for as
//! long as the connection lives. Seats are what enforce name uniqueness and
//! the capacity cap, so those checks never have to ask the hub.

use crate::error::JoinError;
use crate::hub::{Hub, HubConfig, HubHandle};
use crate::roster::{ConnectionId, Outbound};
use log::{info, warn};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{interval, Instant};

pub struct Session {
    id: String,
    hub: HubHandle,
    max_players: usize,
    seats: Mutex<Seats>,
}

struct Seats {
    taken: HashSet<String>,
    next_connection: ConnectionId,
    /// When the last seat was given up, `None` while anyone is seated
    vacant_since: Option<Instant>,
}

impl Session {
    fn new(id: String, hub: HubHandle, max_players: usize) -> Self {
        Self {
            id,
            hub,
            max_players,
            seats: Mutex::new(Seats {
                taken: HashSet::new(),
                next_connection: 1,
                vacant_since: Some(Instant::now()),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// Number of names currently held by live connections
    pub fn seated(&self) -> usize {
        self.seats.lock().taken.len()
    }

    fn claim(self: &Arc<Self>, name: &str) -> Result<Seat, JoinError> {
        let mut seats = self.seats.lock();

        if seats.taken.contains(name) {
            return Err(JoinError::NameInUse);
        }
        if seats.taken.len() >= self.max_players {
            return Err(JoinError::SessionFull);
        }

        let connection = seats.next_connection;
        seats.next_connection += 1;
        seats.taken.insert(name.to_string());
        seats.vacant_since = None;

        Ok(Seat {
            session: Arc::clone(self),
            name: name.to_string(),
            connection,
        })
    }

    fn release(&self, name: &str) {
        let mut seats = self.seats.lock();
        seats.taken.remove(name);
        if seats.taken.is_empty() {
            seats.vacant_since = Some(Instant::now());
        }
    }

    fn idle_for(&self, now: Instant) -> Option<Duration> {
        self.seats
            .lock()
            .vacant_since
            .map(|since| now.saturating_duration_since(since))
    }
}

/// A name held in a session by one live connection
///
/// Dropping the seat unregisters the connection from the hub and then frees
/// the name, in that order, so a reconnect under the same name always
/// reaches the hub after the old connection's unregister.
pub struct Seat {
    session: Arc<Session>,
    name: String,
    connection: ConnectionId,
}

impl Seat {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn session_id(&self) -> &str {
        self.session.id()
    }

    /// Hands the hub this connection's outbound queue
    pub fn register(&self, outbound: Outbound) {
        self.session
            .hub
            .register(&self.name, self.connection, outbound);
    }

    pub fn submit(&self, value: i64) {
        self.session.hub.submit(&self.name, value);
    }
}

impl Drop for Seat {
    fn drop(&mut self) {
        self.session.hub.unregister(&self.name, self.connection);
        self.session.release(&self.name);
    }
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    config: HubConfig,
    max_players: usize,
}

impl SessionRegistry {
    pub fn new(config: HubConfig, max_players: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
            max_players,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Starts a new hub and returns its fresh identifier
    pub async fn create_session(&self) -> String {
        let mut sessions = self.sessions.write().await;

        let id = loop {
            let candidate = generate_session_id();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };

        let hub = Hub::spawn(self.config.clone());
        sessions.insert(
            id.clone(),
            Arc::new(Session::new(id.clone(), hub, self.max_players)),
        );

        info!("Created hub {} ({} running)", id, sessions.len());
        id
    }

    pub async fn session(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Admits `name` into session `id`
    ///
    /// Checked in order: the session exists, the name is not blank, no live
    /// connection holds the name, a seat is free.
    pub async fn join(&self, id: &str, name: &str) -> Result<Seat, JoinError> {
        let session = self.session(id).await.ok_or(JoinError::UnknownSession)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(JoinError::MissingName);
        }

        let seat = session.claim(name)?;
        info!(
            "{} joined hub {} (connection {})",
            name,
            id,
            seat.connection()
        );
        Ok(seat)
    }

    /// Forgets a session; its hub stops once the last seat is gone
    pub async fn remove_session(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            info!("Removed hub {}", id);
        }
        removed
    }

    /// Removes sessions nobody has been seated in for `idle_timeout`, and
    /// sessions whose hub loop is no longer running
    pub async fn reap_idle(&self, idle_timeout: Duration) -> Vec<String> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        let idle: Vec<String> = sessions
            .values()
            .filter(|s| {
                s.hub.is_closed()
                    || s.idle_for(now).is_some_and(|idle| idle >= idle_timeout)
            })
            .map(|s| s.id.clone())
            .collect();

        for id in &idle {
            if let Some(session) = sessions.remove(id) {
                if session.hub.is_closed() {
                    warn!("Hub {} stopped running, removed", id);
                } else {
                    info!("Hub {} idle for {:?}, removed", id, idle_timeout);
                }
            }
        }
        idle
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Spawns a task that periodically removes idle sessions
    pub fn spawn_reaper(registry: Arc<Self>, idle_timeout: Duration, every: Duration) {
        tokio::spawn(async move {
            let mut ticker = interval(every);

            loop {
                ticker.tick().await;
                let removed = registry.reap_idle(idle_timeout).await;
                if !removed.is_empty() {
                    info!("Reaped {} idle hubs", removed.len());
                }
                if Arc::strong_count(&registry) == 1 {
                    info!("Registry no longer shared, stopping reaper");
                    break;
                }
            }
        });
    }
}

/// Eight lowercase hex characters from four random bytes
fn generate_session_id() -> String {
    let bytes: [u8; 4] = rand::random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
