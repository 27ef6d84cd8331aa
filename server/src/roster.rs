//! Participant bookkeeping for a single session
//!
//! This module keeps the two views of "who is playing" that a session needs:
//! - A stable name → record table holding score and elimination state, kept
//!   for the whole session so a reconnecting player picks up where they left
//! - The set of live connections, in join order, each with the bounded
//!   outbound queue the hub delivers snapshots onto
//!
//! The roster is owned by the hub's event loop and never shared, so none of
//! it needs locking.

use log::info;
use shared::{RoundOutcome, ELIMINATION_SCORE};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Identifies one physical connection, unique within its session.
pub type ConnectionId = u64;

/// Sending half of a participant's outbound queue.
pub type Outbound = mpsc::Sender<Arc<String>>;

/// Score and elimination state of one named player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub name: String,
    pub score: i32,
    /// Never goes back to false once set
    pub eliminated: bool,
}

impl Participant {
    pub fn new(name: &str, score: i32) -> Self {
        Self {
            name: name.to_string(),
            score,
            eliminated: false,
        }
    }

    /// Takes one point off for a lost round
    ///
    /// Returns true when this loss is the one that eliminated the player.
    /// Already eliminated players are left untouched.
    pub fn lose_round(&mut self) -> bool {
        if self.eliminated {
            return false;
        }

        self.score -= 1;
        if self.score <= ELIMINATION_SCORE {
            self.eliminated = true;
            return true;
        }
        false
    }
}

#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub name: String,
    pub outbound: Outbound,
}

pub struct Roster {
    /// Every name that ever joined, connected or not
    records: HashMap<String, Participant>,
    /// Live connections in join order
    connected: Vec<Connection>,
    initial_score: i32,
}

impl Roster {
    pub fn new(initial_score: i32) -> Self {
        Self {
            records: HashMap::new(),
            connected: Vec::new(),
            initial_score,
        }
    }

    /// Attaches a connection under `name`
    ///
    /// Known names keep their record, so score and elimination survive a
    /// reconnect. If the name is already connected its connection is
    /// replaced in place instead of being listed twice. Returns true when
    /// the name had been seen before.
    pub fn connect(&mut self, name: &str, id: ConnectionId, outbound: Outbound) -> bool {
        let returning = self.records.contains_key(name);
        if !returning {
            self.records
                .insert(name.to_string(), Participant::new(name, self.initial_score));
        }

        match self.connected.iter_mut().find(|c| c.name == name) {
            Some(existing) => {
                existing.id = id;
                existing.outbound = outbound;
            }
            None => self.connected.push(Connection {
                id,
                name: name.to_string(),
                outbound,
            }),
        }

        info!(
            "Participant {} connected (connection {}, returning: {})",
            name, id, returning
        );
        returning
    }

    /// Detaches `name` if `id` is still its current connection
    ///
    /// A stale id (the name has since reconnected) leaves the roster as is.
    pub fn disconnect(&mut self, name: &str, id: ConnectionId) -> bool {
        let before = self.connected.len();
        self.connected.retain(|c| !(c.name == name && c.id == id));
        let removed = self.connected.len() != before;
        if removed {
            info!("Participant {} disconnected (connection {})", name, id);
        }
        removed
    }

    /// Drops the connection of `name` whatever its id
    ///
    /// Dropping the stored sender closes the participant's outbound queue.
    pub fn evict(&mut self, name: &str) -> bool {
        let before = self.connected.len();
        self.connected.retain(|c| c.name != name);
        self.connected.len() != before
    }

    pub fn is_connected(&self, name: &str) -> bool {
        self.connected.iter().any(|c| c.name == name)
    }

    /// Connected and not eliminated
    pub fn is_active(&self, name: &str) -> bool {
        self.is_connected(name) && self.participant(name).is_some_and(|p| !p.eliminated)
    }

    pub fn active_count(&self) -> usize {
        self.connected_participants()
            .filter(|p| !p.eliminated)
            .count()
    }

    pub fn participant(&self, name: &str) -> Option<&Participant> {
        self.records.get(name)
    }

    /// Records of connected players, in join order
    pub fn connected_participants(&self) -> impl Iterator<Item = &Participant> {
        self.connected
            .iter()
            .filter_map(|c| self.records.get(&c.name))
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connected
    }

    /// Scores a resolved round
    ///
    /// Every active player not in the winner set loses a point. Returns the
    /// names eliminated by this round.
    pub fn apply_losses(&mut self, outcome: &RoundOutcome) -> Vec<String> {
        let losers: Vec<String> = self
            .connected
            .iter()
            .map(|c| c.name.clone())
            .filter(|name| !outcome.is_winner(name))
            .collect();

        let mut eliminated = Vec::new();
        for name in losers {
            if let Some(participant) = self.records.get_mut(&name) {
                if participant.lose_round() {
                    info!("Participant {} eliminated", name);
                    eliminated.push(name);
                }
            }
        }
        eliminated
    }

    /// Number of live connections
    pub fn len(&self) -> usize {
        self.connected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connected.is_empty()
    }

    /// Number of names ever seen in this session
    pub fn known(&self) -> usize {
        self.records.len()
    }
}
