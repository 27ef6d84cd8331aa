use serde::{Deserialize, Serialize};

pub mod resolver;

pub use resolver::{resolve_round, Hand, Resolver, RoundOutcome};

pub const MAX_PLAYERS: usize = 7;
pub const INITIAL_SCORE: i32 = 3;
pub const ELIMINATION_SCORE: i32 = 0;
pub const RESET_DELAY_SECS: u64 = 5;
pub const TARGET_FACTOR: f64 = 0.8;
pub const MIN_GUESS: i64 = 0;
pub const MAX_GUESS: i64 = 100;
pub const PENDING_RESPONSE: &str = "still needs to respond";

/// Every message the server pushes down a participant's connection.
///
/// Encoded as one JSON object per frame with a `type` discriminator:
/// `state` while a round collects answers, `result` once it resolved,
/// `gameover` when at most one player is left standing, and `error` for
/// input the transport refused.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    State(Snapshot),
    Result(Snapshot),
    Gameover(Snapshot),
    Error { message: String },
}

impl ServerMessage {
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            ServerMessage::State(s) | ServerMessage::Result(s) | ServerMessage::Gameover(s) => {
                Some(s)
            }
            ServerMessage::Error { .. } => None,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Full view of a session at the moment it was taken.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub players: Vec<PlayerView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winners: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerView {
    pub name: String,
    /// Absent for eliminated players.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseView>,
    pub score: i32,
    pub eliminated: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ResponseView {
    Value(i64),
    Pending(String),
}

impl ResponseView {
    pub fn pending() -> Self {
        ResponseView::Pending(PENDING_RESPONSE.to_string())
    }

    pub fn value(&self) -> Option<i64> {
        match self {
            ResponseView::Value(v) => Some(*v),
            ResponseView::Pending(_) => None,
        }
    }
}

/// Parses one submission as typed by a participant.
///
/// Accepts a decimal integer inside `MIN_GUESS..=MAX_GUESS`, surrounding
/// whitespace allowed. The error string is meant to be shown to the user.
pub fn parse_guess(text: &str) -> Result<i64, String> {
    let value: i64 = text
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a whole number", text.trim()))?;

    if !(MIN_GUESS..=MAX_GUESS).contains(&value) {
        return Err(format!(
            "{} is out of range, pick a number between {} and {}",
            value, MIN_GUESS, MAX_GUESS
        ));
    }

    Ok(value)
}
