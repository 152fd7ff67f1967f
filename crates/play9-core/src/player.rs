//! Player identity and per-seat state.

use crate::card::Hand;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque 128-bit player token. Stable for the lifetime of the table seat,
/// independent of any particular connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A seated player. Presence (connected or not) is tracked separately by
/// the session — a player stays in this list, with their hand and score
/// intact, after their connection drops.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub hand: Hand,
    /// Number of cards this player has revealed during the `reveal` phase
    /// (capped at 2; full reveal happens gradually during `play`).
    pub revealed_count: u8,
    pub last_active_epoch: u64,
    /// Set once this player has taken their one extra turn during the
    /// final lap.
    pub final_turn_taken: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: String, hand: Hand, now: u64) -> Self {
        Self {
            id,
            name,
            hand,
            revealed_count: 0,
            last_active_epoch: now,
            final_turn_taken: false,
        }
    }
}
