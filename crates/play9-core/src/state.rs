//! Table state: the single value the engine transitions and the session
//! owns and persists.

use crate::card::Card;
use crate::deck::{Deck, DiscardPile};
use crate::player::{Player, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Empty,
    Waiting,
    Reveal,
    Play,
    Scoring,
}

impl Default for Phase {
    /// A table with no recorded phase on disk defaults to `Empty`, the
    /// same phase a table starts in before its first join (spec.md §6:
    /// "missing fields default to their initial values").
    fn default() -> Self {
        Phase::Empty
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawnFrom {
    Draw,
    Discard,
}

/// `(player_id, card_index)` — identifies the most recent mutation, for UI
/// highlighting.
pub type AffectedCard = (PlayerId, usize);

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartVote {
    pub requested_by: Option<PlayerId>,
    pub requested_at: Option<u64>,
    pub yes_votes: HashSet<PlayerId>,
}

impl RestartVote {
    pub fn is_pending(&self) -> bool {
        self.requested_by.is_some()
    }

    pub fn clear(&mut self) {
        self.requested_by = None;
        self.requested_at = None;
        self.yes_votes.clear();
    }
}

/// `#[serde(default)]` on every field (via the container attribute below)
/// means a snapshot written by an older compatible schema that is missing
/// a field deserializes with that field set to its initial value instead
/// of failing the whole table load (spec.md §6). Schema changes large
/// enough that a blanket per-field default is wrong should bump the
/// persisted envelope's version instead — see `play9-server::persistence`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TableState {
    pub phase: Phase,
    pub players: Vec<Player>,
    pub dealer_idx: usize,
    pub current_player_idx: usize,
    pub draw_pile: Deck,
    pub discard_pile: DiscardPile,
    pub drawn_card: Option<Card>,
    pub drawn_from: Option<DrawnFrom>,
    pub must_flip_after_discard: bool,
    pub last_affected_card: Option<AffectedCard>,
    pub round_num: u32,
    pub round_scores: HashMap<PlayerId, i32>,
    pub scores: HashMap<PlayerId, i32>,
    pub final_lap_trigger_idx: Option<usize>,
    pub restart_vote: RestartVote,
    pub active_player_ids: HashSet<PlayerId>,
    pub player_last_active: HashMap<PlayerId, u64>,
}

impl TableState {
    /// A freshly created table: no players, no cards.
    pub fn empty() -> Self {
        Self {
            phase: Phase::Empty,
            players: Vec::new(),
            dealer_idx: 0,
            current_player_idx: 0,
            draw_pile: Deck::shuffled(2, &mut rand::thread_rng())
                .expect("2 players is always a legal deck size"),
            discard_pile: DiscardPile::default(),
            drawn_card: None,
            drawn_from: None,
            must_flip_after_discard: false,
            last_affected_card: None,
            round_num: 0,
            round_scores: HashMap::new(),
            scores: HashMap::new(),
            final_lap_trigger_idx: None,
            restart_vote: RestartVote::default(),
            active_player_ids: HashSet::new(),
            player_last_active: HashMap::new(),
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn player_index(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_player_idx)
    }

    pub fn current_player_mut(&mut self) -> Option<&mut Player> {
        self.players.get_mut(self.current_player_idx)
    }

    /// Sum of `round_scores` recorded so far for `id` (invariant 6 of
    /// `spec.md` §3: `scores[p]` must equal this after every commit).
    pub fn cumulative_for(&self, id: PlayerId) -> i32 {
        self.scores.get(&id).copied().unwrap_or(0)
    }

    pub fn player_by_name(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    /// Seats a new player, or reuses an existing seat with the same name.
    /// Only legal while `phase` is `Empty` or `Waiting` for a genuinely
    /// new seat (spec.md §4.C); reusing an existing name's seat is always
    /// allowed, since it is how a reconnecting player resumes.
    pub fn join_player(&mut self, name: &str, now: u64) -> Result<PlayerId, JoinError> {
        if let Some(existing) = self.player_by_name(name) {
            let id = existing.id;
            self.active_player_ids.insert(id);
            self.touch_activity(id, now);
            return Ok(id);
        }

        if !matches!(self.phase, Phase::Empty | Phase::Waiting) {
            return Err(JoinError::GameAlreadyStarted);
        }
        if self.players.len() >= 8 {
            return Err(JoinError::TableFull);
        }

        let id = PlayerId::new();
        let hand = crate::card::Hand::from_cards(
            [crate::card::Card::new(0); crate::card::HAND_SIZE],
        );
        self.players.push(Player::new(id, name.to_string(), hand, now));
        self.active_player_ids.insert(id);
        self.player_last_active.insert(id, now);
        if self.phase == Phase::Empty {
            self.phase = Phase::Waiting;
        }

        Ok(id)
    }

    /// Marks a player's connection as closed. The player stays seated
    /// (hand and score preserved); only presence is cleared.
    pub fn mark_disconnected(&mut self, id: PlayerId) {
        self.active_player_ids.remove(&id);
    }

    pub fn mark_connected(&mut self, id: PlayerId, now: u64) {
        self.active_player_ids.insert(id);
        self.touch_activity(id, now);
    }

    /// Records `now` as the last time `id` was seen active, keeping the
    /// table-level `player_last_active` map and the seat's own
    /// `last_active_epoch` in sync (spec.md §3 lists both).
    pub fn touch_activity(&mut self, id: PlayerId, now: u64) {
        self.player_last_active.insert(id, now);
        if let Some(player) = self.player_mut(id) {
            player.last_active_epoch = now;
        }
    }

    /// Fully removes a player's seat. Distinct from [`Self::mark_disconnected`],
    /// which only clears presence when a connection drops: this is the
    /// explicit `leave` request of spec.md §4.F, and it is idempotent —
    /// leaving twice, or leaving an id that was never seated, is a no-op.
    pub fn leave_player(&mut self, id: PlayerId) {
        if let Some(pos) = self.players.iter().position(|p| p.id == id) {
            self.players.remove(pos);
        }
        self.active_player_ids.remove(&id);
        self.player_last_active.remove(&id);
        self.scores.remove(&id);
        self.round_scores.remove(&id);

        if self.players.is_empty() {
            self.phase = Phase::Empty;
            self.dealer_idx = 0;
            self.current_player_idx = 0;
        } else if self.current_player_idx >= self.players.len() {
            self.current_player_idx = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leave_player_is_idempotent_and_empties_the_table() {
        let mut state = TableState::empty();
        let alice = state.join_player("Alice", 0).unwrap();
        assert_eq!(state.phase, Phase::Waiting);

        state.leave_player(alice);
        assert!(state.players.is_empty());
        assert_eq!(state.phase, Phase::Empty);

        // Leaving again is a no-op, not an error.
        state.leave_player(alice);
        assert!(state.players.is_empty());
    }

    #[test]
    fn leave_player_keeps_other_seats() {
        let mut state = TableState::empty();
        let alice = state.join_player("Alice", 0).unwrap();
        let _bob = state.join_player("Bob", 0).unwrap();

        state.leave_player(alice);
        assert_eq!(state.players.len(), 1);
        assert_eq!(state.phase, Phase::Waiting);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinError {
    TableFull,
    GameAlreadyStarted,
}
