//! Rejections the pure engine can itself detect. Connection-level kinds
//! (`already_connected`, `table_full`, `not_a_player`, `game_already_started`,
//! `invalid_name`) belong to the session/hub boundary in `play9-server`,
//! since the engine has no notion of connections or names.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Malformed intent for the current state (e.g. a card index out of
    /// range for this hand).
    InvalidInput,
    /// The intent is not legal in the table's current phase.
    WrongPhase,
    /// The actor is not the current turn holder.
    NotYourTurn,
    /// The intent's target is illegal (flip on a face-up card, draw from
    /// a pile that is empty and cannot be reshuffled, etc).
    IllegalTarget,
}
