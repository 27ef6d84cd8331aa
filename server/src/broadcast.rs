//! Snapshot encoding and non-blocking fan-out to participants

use crate::roster::Roster;
use log::{debug, error, warn};
use shared::{PlayerView, ResponseView, RoundOutcome, ServerMessage, Snapshot};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    /// Round still collecting answers
    State,
    /// Round just resolved, result on display
    Result,
    /// Final round of the session
    Gameover,
}

/// Builds the full view of the session as it is right now.
///
/// Every connected player is listed with score and elimination flag. Active
/// players also show their answer or the pending placeholder; eliminated
/// players show neither. Resolver outputs are attached when `outcome` is
/// given.
pub fn build_snapshot(
    roster: &Roster,
    responses: &BTreeMap<String, i64>,
    outcome: Option<&RoundOutcome>,
) -> Snapshot {
    let players = roster
        .connected_participants()
        .map(|p| PlayerView {
            name: p.name.clone(),
            response: if p.eliminated {
                None
            } else {
                Some(match responses.get(&p.name) {
                    Some(&value) => ResponseView::Value(value),
                    None => ResponseView::pending(),
                })
            },
            score: p.score,
            eliminated: p.eliminated,
        })
        .collect();

    Snapshot {
        players,
        average: outcome.and_then(|o| o.average),
        target: outcome.and_then(|o| o.target),
        winners: outcome.map(|o| o.winners.clone()),
    }
}

pub fn snapshot_message(kind: SnapshotKind, snapshot: Snapshot) -> ServerMessage {
    match kind {
        SnapshotKind::State => ServerMessage::State(snapshot),
        SnapshotKind::Result => ServerMessage::Result(snapshot),
        SnapshotKind::Gameover => ServerMessage::Gameover(snapshot),
    }
}

/// Encodes once, then offers the frame to every connected participant.
///
/// Delivery never waits: a participant whose queue is full, or whose
/// receiver is gone, is evicted from the roster on the spot (which closes
/// its queue). Returns the evicted names. An encoding failure is logged and
/// nothing is sent.
pub fn deliver(roster: &mut Roster, message: &ServerMessage) -> Vec<String> {
    let payload = match message.to_json() {
        Ok(json) => Arc::new(json),
        Err(e) => {
            error!("Failed to encode snapshot: {}", e);
            return Vec::new();
        }
    };

    let mut unresponsive = Vec::new();
    for connection in roster.connections() {
        match connection.outbound.try_send(Arc::clone(&payload)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(
                    "Outbound queue of {} is full, dropping participant",
                    connection.name
                );
                unresponsive.push(connection.name.clone());
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Outbound queue of {} already closed", connection.name);
                unresponsive.push(connection.name.clone());
            }
        }
    }

    for name in &unresponsive {
        roster.evict(name);
    }

    unresponsive
}
