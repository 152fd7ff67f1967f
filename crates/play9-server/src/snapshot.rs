//! Builds the redacted snapshot broadcast to every subscriber of a table
//! (spec.md §4.D, §6). Redaction happens here, at serialization time, from
//! a borrow of the authoritative `TableState` — the state itself never
//! stores a `-99`.
//!
//! There is exactly one snapshot per broadcast: every subscriber, player
//! or spectator, sees the same redacted view. A player's own face-down
//! cards are redacted identically to anyone else's (spec.md §4.D) and the
//! freshly drawn card is always shown at its true value regardless of
//! `drawn_from`, so no per-viewer branching is needed.

use play9_core::{Card, DrawnFrom, Phase, PlayerId, TableState, HIDDEN_VALUE};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RedactedCard {
    pub value: i8,
    pub face_up: bool,
}

impl RedactedCard {
    fn hidden(card: &Card) -> Self {
        Self {
            value: card.redacted_value(),
            face_up: card.face_up,
        }
    }

    /// The drawn card is always shown at its true value: drawing it is
    /// itself the observable gesture, whichever pile it came from.
    fn revealed(card: &Card) -> Self {
        Self {
            value: card.value,
            face_up: true,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub hand: Vec<RedactedCard>,
    pub revealed_count: u8,
    pub final_turn_taken: bool,
}

/// Redacted mirror of `play9_core::TableState` (spec.md §3), plus the
/// presence and idle-turn annotations of §4.D/§4.C.
#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub phase: Phase,
    pub players: Vec<PlayerView>,
    pub dealer_idx: usize,
    pub current_player_idx: usize,
    pub draw_pile: Vec<RedactedCard>,
    pub discard_pile: Vec<RedactedCard>,
    pub drawn_card: Option<RedactedCard>,
    pub drawn_from: Option<DrawnFrom>,
    pub must_flip_after_discard: bool,
    pub last_affected_card: Option<(PlayerId, usize)>,
    pub round_num: u32,
    pub round_scores: HashMap<PlayerId, i32>,
    pub scores: HashMap<PlayerId, i32>,
    pub final_lap_trigger_idx: Option<usize>,
    pub restart_requested_by: Option<PlayerId>,
    pub restart_yes_votes: HashSet<PlayerId>,
    pub active_player_ids: HashSet<PlayerId>,
    pub player_last_active: HashMap<PlayerId, u64>,
    pub inactive_turn_name: Option<String>,
}

/// Builds the single redacted snapshot broadcast to every subscriber.
/// `inactive_turn_name` is set by the session while the idle-turn
/// countdown for the current player is running (spec.md §4.C).
pub fn build_snapshot(state: &TableState, inactive_turn_name: Option<String>) -> Snapshot {
    let players = state
        .players
        .iter()
        .map(|p| PlayerView {
            id: p.id,
            name: p.name.clone(),
            hand: p.hand.iter().map(RedactedCard::hidden).collect(),
            revealed_count: p.revealed_count,
            final_turn_taken: p.final_turn_taken,
        })
        .collect();

    debug_assert!(
        state
            .draw_pile
            .cards()
            .iter()
            .all(|c| c.redacted_value() == HIDDEN_VALUE),
        "draw pile cards must never be stored face up"
    );

    Snapshot {
        phase: state.phase,
        players,
        dealer_idx: state.dealer_idx,
        current_player_idx: state.current_player_idx,
        draw_pile: state
            .draw_pile
            .cards()
            .iter()
            .map(RedactedCard::hidden)
            .collect(),
        discard_pile: state
            .discard_pile
            .cards()
            .iter()
            .map(RedactedCard::hidden)
            .collect(),
        drawn_card: state.drawn_card.as_ref().map(RedactedCard::revealed),
        drawn_from: state.drawn_from,
        must_flip_after_discard: state.must_flip_after_discard,
        last_affected_card: state.last_affected_card,
        round_num: state.round_num,
        round_scores: state.round_scores.clone(),
        scores: state.scores.clone(),
        final_lap_trigger_idx: state.final_lap_trigger_idx,
        restart_requested_by: state.restart_vote.requested_by,
        restart_yes_votes: state.restart_vote.yes_votes.clone(),
        active_player_ids: state.active_player_ids.clone(),
        player_last_active: state.player_last_active.clone(),
        inactive_turn_name,
    }
}
