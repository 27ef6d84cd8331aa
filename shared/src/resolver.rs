//! Round resolution for the beauty contest.
//!
//! Two rules exist and the number of players answering picks between them:
//!
//! - **Averaging** (any count except two): the target is `0.8 ×` the mean of
//!   all answers and every player closest to it wins. Ties are all kept.
//! - **Hand game** (exactly two): averaging is degenerate for two players, so
//!   each answer is read as a hand instead (`0` rock, `100` paper, anything
//!   else scissors). Rock beats scissors, scissors beat paper, and rock also
//!   beats paper, so `0` beats everything and `100` loses to everything.
//!
//! Both rules are pure functions of the answers. Iteration order never
//! changes the winner set.

use crate::TARGET_FACTOR;
use std::collections::BTreeMap;

/// What a resolved round produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoundOutcome {
    /// Names credited with not losing the round, sorted.
    pub winners: Vec<String>,
    /// Mean of all answers, `None` for the hand game.
    pub average: Option<f64>,
    /// `average * 0.8`, `None` for the hand game.
    pub target: Option<f64>,
}

impl RoundOutcome {
    pub fn is_winner(&self, name: &str) -> bool {
        self.winners.iter().any(|w| w == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolver {
    Averaging,
    HandGame,
}

impl Resolver {
    pub fn for_player_count(active: usize) -> Self {
        if active == 2 {
            Resolver::HandGame
        } else {
            Resolver::Averaging
        }
    }

    pub fn resolve(self, responses: &BTreeMap<String, i64>) -> RoundOutcome {
        match self {
            Resolver::Averaging => resolve_average(responses),
            Resolver::HandGame => resolve_hands(responses),
        }
    }
}

/// Resolves a round with the rule matching the number of answers.
pub fn resolve_round(responses: &BTreeMap<String, i64>) -> RoundOutcome {
    Resolver::for_player_count(responses.len()).resolve(responses)
}

fn resolve_average(responses: &BTreeMap<String, i64>) -> RoundOutcome {
    if responses.is_empty() {
        return RoundOutcome::default();
    }

    let count = responses.len() as i128;
    let sum: i128 = responses.values().map(|&v| v as i128).sum();

    let average = sum as f64 / count as f64;
    let target = average * TARGET_FACTOR;

    // |v - 4*sum/(5n)| scaled by 5n, so ties are compared exactly
    let distance = |v: i64| (5 * count * v as i128 - 4 * sum).abs();

    let best = responses
        .values()
        .map(|&v| distance(v))
        .min()
        .unwrap_or_default();

    let winners = responses
        .iter()
        .filter(|&(_, &v)| distance(v) == best)
        .map(|(name, _)| name.clone())
        .collect();

    RoundOutcome {
        winners,
        average: Some(average),
        target: Some(target),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hand {
    Rock,
    Paper,
    Scissors,
}

impl Hand {
    pub fn from_value(value: i64) -> Self {
        match value {
            0 => Hand::Rock,
            100 => Hand::Paper,
            _ => Hand::Scissors,
        }
    }

    /// Rock > scissors > paper; the relation is a strict order, not a cycle
    fn rank(self) -> u8 {
        match self {
            Hand::Rock => 2,
            Hand::Scissors => 1,
            Hand::Paper => 0,
        }
    }

    pub fn beats(self, other: Hand) -> bool {
        self.rank() > other.rank()
    }
}

/// A player wins unless some other hand beats theirs. With two players this
/// is the plain game: one winner, or both on a draw. With more hands on the
/// table the strongest hand present wins.
fn resolve_hands(responses: &BTreeMap<String, i64>) -> RoundOutcome {
    let hands: Vec<(&String, Hand)> = responses
        .iter()
        .map(|(name, &v)| (name, Hand::from_value(v)))
        .collect();

    let winners = hands
        .iter()
        .filter(|(_, mine)| !hands.iter().any(|(_, theirs)| theirs.beats(*mine)))
        .map(|(name, _)| (*name).clone())
        .collect();

    RoundOutcome {
        winners,
        average: None,
        target: None,
    }
}
