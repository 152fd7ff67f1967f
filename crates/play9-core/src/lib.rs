//! play9-core — deck and hand logic, and the turn-based game engine.
//!
//! This crate has no I/O, no async, and no locking: it is compiled as a
//! plain library used by `play9-server`'s single-writer session task and
//! exercised directly by the property tests in `tests/`.

mod card;
mod deck;
mod engine;
mod event;
mod intent;
mod player;
mod rejection;
mod state;

pub use card::{score_hand, Card, Hand, COLUMNS, HAND_SIZE, HIDDEN_VALUE, MAX_VALUE, MIN_VALUE};
pub use deck::{total_deck_size, Deck, DeckError, DiscardPile};
pub use engine::{apply, force_minimum_action};
pub use event::Event;
pub use intent::Intent;
pub use player::{Player, PlayerId};
pub use rejection::Rejection;
pub use state::{AffectedCard, DrawnFrom, JoinError, Phase, RestartVote, TableState};
