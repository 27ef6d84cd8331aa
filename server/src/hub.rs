//! The per-session game orchestrator
//!
//! A `Hub` owns everything mutable about one session: the roster, the
//! answers collected for the current round, and the round phase. It runs as
//! a single task that takes one command at a time off an mpsc channel, so
//! concurrent connections never race on session state. Connections talk to
//! it only through a cloneable [`HubHandle`].
//!
//! Round lifecycle:
//!
//! ```text
//!   Open --all active answered--> Locked --reset deadline--> Open
//!     \
//!      `--<=1 active left after scoring--> Terminal
//! ```

use crate::broadcast::{self, SnapshotKind};
use crate::roster::{ConnectionId, Outbound, Participant, Roster};
use log::{debug, info, warn};
use shared::{Resolver, RoundOutcome, INITIAL_SCORE, RESET_DELAY_SECS};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};

/// Tunables for one hub
#[derive(Debug, Clone, PartialEq)]
pub struct HubConfig {
    /// How long a round result stays on display before the next round opens
    pub reset_delay: Duration,
    /// Score every new participant starts with
    pub initial_score: i32,
    /// Bound of each participant's outbound queue
    pub outbound_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            reset_delay: Duration::from_secs(RESET_DELAY_SECS),
            initial_score: INITIAL_SCORE,
            outbound_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// Collecting answers
    Open,
    /// Result on display, reset pending
    Locked,
    /// Game over, no further rounds
    Terminal,
}

/// Commands sent from connections to the hub loop
#[derive(Debug)]
pub enum HubCommand {
    Register {
        name: String,
        connection: ConnectionId,
        outbound: Outbound,
    },
    Unregister {
        name: String,
        connection: ConnectionId,
    },
    Submit {
        name: String,
        value: i64,
    },
    Status {
        reply: oneshot::Sender<HubStatus>,
    },
}

/// Point-in-time summary of a hub, for monitoring and tests
#[derive(Debug, Clone, PartialEq)]
pub struct HubStatus {
    pub phase: RoundPhase,
    /// Connected participants in join order
    pub participants: Vec<Participant>,
    pub responses: usize,
    pub reset_pending: bool,
}

impl HubStatus {
    pub fn participant(&self, name: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.name == name)
    }
}

/// Cheap, cloneable entry point into a running hub
#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::UnboundedSender<HubCommand>,
}

impl HubHandle {
    pub fn register(&self, name: &str, connection: ConnectionId, outbound: Outbound) {
        self.send(HubCommand::Register {
            name: name.to_string(),
            connection,
            outbound,
        });
    }

    pub fn unregister(&self, name: &str, connection: ConnectionId) {
        self.send(HubCommand::Unregister {
            name: name.to_string(),
            connection,
        });
    }

    pub fn submit(&self, name: &str, value: i64) {
        self.send(HubCommand::Submit {
            name: name.to_string(),
            value,
        });
    }

    /// Returns `None` once the hub loop has stopped
    pub async fn status(&self) -> Option<HubStatus> {
        let (reply, response) = oneshot::channel();
        self.send(HubCommand::Status { reply });
        response.await.ok()
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    fn send(&self, command: HubCommand) {
        if let Err(e) = self.commands.send(command) {
            warn!("Hub is no longer running, dropped {:?}", e.0);
        }
    }
}

pub struct Hub {
    config: HubConfig,
    roster: Roster,
    /// This round's answers, keyed by name; only active participants appear
    responses: BTreeMap<String, i64>,
    phase: RoundPhase,
    /// Armed only while `Locked`
    reset_at: Option<Instant>,
    commands: mpsc::UnboundedReceiver<HubCommand>,
}

impl Hub {
    pub fn new(config: HubConfig) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let hub = Hub {
            roster: Roster::new(config.initial_score),
            config,
            responses: BTreeMap::new(),
            phase: RoundPhase::Open,
            reset_at: None,
            commands: rx,
        };
        (hub, HubHandle { commands: tx })
    }

    /// Starts a hub on the current runtime and returns its handle
    pub fn spawn(config: HubConfig) -> HubHandle {
        let (hub, handle) = Hub::new(config);
        tokio::spawn(hub.run());
        handle
    }

    /// Main loop: one command or one reset deadline at a time
    ///
    /// Ends when every handle has been dropped.
    pub async fn run(mut self) {
        debug!("Hub started");

        loop {
            let reset_at = self.reset_at;

            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(command) => self.handle_command(command),
                        None => break,
                    }
                },

                _ = wait_for_reset(reset_at) => {
                    self.reset_round();
                },
            }
        }

        info!(
            "Hub shutting down ({} participants known)",
            self.roster.known()
        );
    }

    fn handle_command(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register {
                name,
                connection,
                outbound,
            } => self.register(&name, connection, outbound),
            HubCommand::Unregister { name, connection } => self.unregister(&name, connection),
            HubCommand::Submit { name, value } => self.submit(&name, value),
            HubCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }

    fn register(&mut self, name: &str, connection: ConnectionId, outbound: Outbound) {
        self.roster.connect(name, connection, outbound);
        self.publish(SnapshotKind::State, None);
    }

    fn unregister(&mut self, name: &str, connection: ConnectionId) {
        if !self.roster.disconnect(name, connection) {
            debug!("Ignoring unregister of {} (connection {})", name, connection);
            return;
        }
        self.responses.remove(name);
        self.settle();
    }

    fn submit(&mut self, name: &str, value: i64) {
        if self.phase != RoundPhase::Open {
            debug!("Ignoring answer from {}: round is {:?}", name, self.phase);
            return;
        }
        if !self.roster.is_active(name) {
            debug!("Ignoring answer from {}: not an active participant", name);
            return;
        }
        if self.responses.contains_key(name) {
            debug!("Ignoring repeated answer from {}", name);
            return;
        }

        self.responses.insert(name.to_string(), value);
        debug!(
            "{} answered ({}/{})",
            name,
            self.responses.len(),
            self.roster.active_count()
        );
        self.settle();
    }

    /// Resolves the round if it is complete, otherwise shows the ongoing state
    fn settle(&mut self) {
        if self.phase == RoundPhase::Open && self.round_complete() {
            self.resolve_round();
        } else {
            self.publish(SnapshotKind::State, None);
        }
    }

    fn round_complete(&self) -> bool {
        let active = self.roster.active_count();
        active > 0 && self.responses.len() == active
    }

    fn resolve_round(&mut self) {
        let active = self.roster.active_count();
        let resolver = Resolver::for_player_count(active);
        let outcome = resolver.resolve(&self.responses);

        info!(
            "Round resolved with {:?} for {} players, winners: {:?}",
            resolver, active, outcome.winners
        );

        self.roster.apply_losses(&outcome);

        if self.roster.active_count() <= 1 {
            info!("Game over");
            self.phase = RoundPhase::Terminal;
            self.reset_at = None;
            self.publish(SnapshotKind::Gameover, Some(&outcome));
        } else {
            self.phase = RoundPhase::Locked;
            self.reset_at = Some(Instant::now() + self.config.reset_delay);
            self.publish(SnapshotKind::Result, Some(&outcome));
        }
    }

    fn reset_round(&mut self) {
        self.reset_at = None;
        if self.phase != RoundPhase::Locked {
            return;
        }

        self.responses.clear();
        self.phase = RoundPhase::Open;
        info!("New round open");
        self.publish(SnapshotKind::State, None);
    }

    /// Snapshots the session and fans it out
    ///
    /// Participants evicted for not keeping up are handled like a
    /// disconnect: their answer is dropped and, while a round is open, the
    /// round is re-checked.
    fn publish(&mut self, kind: SnapshotKind, outcome: Option<&RoundOutcome>) {
        let snapshot = broadcast::build_snapshot(&self.roster, &self.responses, outcome);
        let message = broadcast::snapshot_message(kind, snapshot);
        let evicted = broadcast::deliver(&mut self.roster, &message);

        if evicted.is_empty() {
            return;
        }
        for name in &evicted {
            self.responses.remove(name);
        }
        if self.phase == RoundPhase::Open {
            self.settle();
        }
    }

    fn status(&self) -> HubStatus {
        HubStatus {
            phase: self.phase,
            participants: self.roster.connected_participants().cloned().collect(),
            responses: self.responses.len(),
            reset_pending: self.reset_at.is_some(),
        }
    }
}

async fn wait_for_reset(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
