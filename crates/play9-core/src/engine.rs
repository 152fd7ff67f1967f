//! The game engine: a pure-ish state-transition function. `apply` is the
//! only mutating entry point components outside this crate should use;
//! everything else here is a private helper it calls.
//!
//! `apply` takes an external RNG rather than owning one: shuffling needs
//! randomness, but persisting RNG state is unnecessary (the spec does not
//! require replaying a table from a seed), so the session supplies one
//! per call instead of the engine carrying hidden mutable state.

use crate::card::{score_hand, Card, HAND_SIZE};
use crate::deck::Deck;
use crate::event::Event;
use crate::intent::Intent;
use crate::player::PlayerId;
use crate::rejection::Rejection;
use crate::state::{DrawnFrom, Phase, TableState};
use rand::Rng;

/// Applies `intent` from `actor` to `state`, mutating it in place on
/// success. On rejection `state` is left untouched.
pub fn apply<R: Rng + ?Sized>(
    state: &mut TableState,
    intent: Intent,
    actor: PlayerId,
    now: u64,
    rng: &mut R,
) -> Result<Event, Rejection> {
    match intent {
        Intent::Start => start(state, actor, rng),
        Intent::Reveal { card_index } => reveal(state, actor, card_index),
        Intent::DrawFromDraw => draw_from_draw(state, actor, rng),
        Intent::DrawFromDiscard => draw_from_discard(state, actor),
        Intent::PlayReplace { card_index } => play_replace(state, actor, card_index),
        Intent::PlayDiscardOnly => play_discard_only(state, actor),
        Intent::PlayFlipAfterDiscard { card_index } => {
            play_flip_after_discard(state, actor, card_index)
        }
        Intent::PlayPutBack => play_put_back(state, actor),
        Intent::AdvanceScoring => advance_scoring(state, rng),
        Intent::RequestRestart => request_restart(state, actor, now),
        Intent::VoteRestart => vote_restart(state, actor),
        Intent::VoteRestartNo => vote_restart_no(state, actor),
        Intent::Heartbeat => heartbeat(state, actor, now),
    }
}

fn require_phase(state: &TableState, phase: Phase) -> Result<(), Rejection> {
    if state.phase == phase {
        Ok(())
    } else {
        Err(Rejection::WrongPhase)
    }
}

fn require_current_player(state: &TableState, actor: PlayerId) -> Result<(), Rejection> {
    match state.current_player() {
        Some(p) if p.id == actor => Ok(()),
        _ => Err(Rejection::NotYourTurn),
    }
}

fn deal_round(state: &mut TableState, rng: &mut (impl Rng + ?Sized)) -> Result<(), Rejection> {
    let n = state.players.len();
    let deck = Deck::shuffled(n, rng).map_err(|_| Rejection::InvalidInput)?;
    state.draw_pile = deck;

    let mut hands: Vec<Vec<Card>> = vec![Vec::with_capacity(HAND_SIZE); n];
    for _ in 0..HAND_SIZE {
        for hand in hands.iter_mut() {
            if let Some(card) = state.draw_pile.draw() {
                hand.push(card);
            }
        }
    }
    for (player, cards) in state.players.iter_mut().zip(hands.into_iter()) {
        let array: [Card; HAND_SIZE] = cards
            .try_into()
            .unwrap_or_else(|_| panic!("deck must contain enough cards for every hand"));
        player.hand = crate::card::Hand::from_cards(array);
        player.revealed_count = 0;
        player.final_turn_taken = false;
    }

    state.discard_pile = crate::deck::DiscardPile::default();
    if let Some(card) = state.draw_pile.draw() {
        state.discard_pile.push(card);
    }

    state.drawn_card = None;
    state.drawn_from = None;
    state.must_flip_after_discard = false;
    state.last_affected_card = None;
    state.final_lap_trigger_idx = None;
    state.round_scores.clear();

    Ok(())
}

fn start(
    state: &mut TableState,
    _actor: PlayerId,
    rng: &mut (impl Rng + ?Sized),
) -> Result<Event, Rejection> {
    require_phase(state, Phase::Waiting)?;
    if state.players.len() < 2 {
        return Err(Rejection::IllegalTarget);
    }

    // A fresh game always starts at zero cumulative score (see DESIGN.md
    // for the resolution of spec.md §9 open question 3).
    state.scores.clear();
    state.round_scores.clear();
    state.round_num = 1;
    state.dealer_idx = state.players.len() - 1;
    deal_round(state, rng)?;
    state.current_player_idx = (state.dealer_idx + 1) % state.players.len();
    state.phase = Phase::Reveal;

    Ok(Event::Started)
}

fn reveal(state: &mut TableState, actor: PlayerId, card_index: usize) -> Result<Event, Rejection> {
    require_phase(state, Phase::Reveal)?;

    let player = state.player_mut(actor).ok_or(Rejection::InvalidInput)?;
    if player.revealed_count >= 2 {
        return Err(Rejection::IllegalTarget);
    }
    let card = player.hand.get_mut(card_index).ok_or(Rejection::InvalidInput)?;
    if card.face_up {
        return Err(Rejection::IllegalTarget);
    }
    card.flip();
    player.revealed_count += 1;

    state.last_affected_card = Some((actor, card_index));

    if state.players.iter().all(|p| p.revealed_count >= 2) {
        state.phase = Phase::Play;
    }

    Ok(Event::Revealed { player: actor, card_index })
}

fn reshuffle_draw_if_empty(state: &mut TableState, rng: &mut (impl Rng + ?Sized)) {
    if state.draw_pile.is_empty() {
        let cards = state.discard_pile.drain_all_but_top();
        if !cards.is_empty() {
            state.draw_pile.refill_from(cards, rng);
        }
    }
}

fn draw_from_draw(
    state: &mut TableState,
    actor: PlayerId,
    rng: &mut (impl Rng + ?Sized),
) -> Result<Event, Rejection> {
    require_phase(state, Phase::Play)?;
    require_current_player(state, actor)?;
    if state.drawn_card.is_some() || state.must_flip_after_discard {
        return Err(Rejection::WrongPhase);
    }

    reshuffle_draw_if_empty(state, rng);
    let card = state.draw_pile.draw().ok_or(Rejection::IllegalTarget)?;
    state.drawn_card = Some(card);
    state.drawn_from = Some(DrawnFrom::Draw);
    reshuffle_draw_if_empty(state, rng);

    Ok(Event::DrewFromDraw { player: actor })
}

fn draw_from_discard(state: &mut TableState, actor: PlayerId) -> Result<Event, Rejection> {
    require_phase(state, Phase::Play)?;
    require_current_player(state, actor)?;
    if state.drawn_card.is_some() || state.must_flip_after_discard {
        return Err(Rejection::WrongPhase);
    }

    let card = state.discard_pile.pop().ok_or(Rejection::IllegalTarget)?;
    state.drawn_card = Some(card);
    state.drawn_from = Some(DrawnFrom::Discard);

    Ok(Event::DrewFromDiscard { player: actor })
}

fn play_replace(
    state: &mut TableState,
    actor: PlayerId,
    card_index: usize,
) -> Result<Event, Rejection> {
    require_current_player(state, actor)?;
    let drawn = state.drawn_card.ok_or(Rejection::WrongPhase)?;

    let player = state.current_player_mut().expect("current player must exist");
    let old = player
        .hand
        .replace(card_index, Card::face_up(drawn.value))
        .ok_or(Rejection::InvalidInput)?;

    state.discard_pile.push(old);
    state.drawn_card = None;
    state.drawn_from = None;
    state.last_affected_card = Some((actor, card_index));

    complete_turn(state);
    Ok(Event::Replaced { player: actor, card_index })
}

fn play_discard_only(state: &mut TableState, actor: PlayerId) -> Result<Event, Rejection> {
    require_current_player(state, actor)?;
    let drawn = state.drawn_card.ok_or(Rejection::WrongPhase)?;
    if state.drawn_from != Some(DrawnFrom::Draw) {
        return Err(Rejection::IllegalTarget);
    }

    state.discard_pile.push(drawn);
    state.drawn_card = None;
    state.drawn_from = None;

    let player = state.current_player().expect("current player must exist");
    if player.hand.face_down_count() > 0 {
        state.must_flip_after_discard = true;
    } else {
        complete_turn(state);
    }

    Ok(Event::DiscardedOnly { player: actor })
}

fn play_flip_after_discard(
    state: &mut TableState,
    actor: PlayerId,
    card_index: usize,
) -> Result<Event, Rejection> {
    require_current_player(state, actor)?;
    if !state.must_flip_after_discard {
        return Err(Rejection::WrongPhase);
    }

    let player = state.current_player_mut().expect("current player must exist");
    let card = player.hand.get_mut(card_index).ok_or(Rejection::InvalidInput)?;
    if card.face_up {
        return Err(Rejection::IllegalTarget);
    }
    card.flip();

    state.must_flip_after_discard = false;
    state.last_affected_card = Some((actor, card_index));

    complete_turn(state);
    Ok(Event::FlippedAfterDiscard { player: actor, card_index })
}

fn play_put_back(state: &mut TableState, actor: PlayerId) -> Result<Event, Rejection> {
    require_current_player(state, actor)?;
    let drawn = state.drawn_card.ok_or(Rejection::WrongPhase)?;
    if state.drawn_from != Some(DrawnFrom::Discard) {
        return Err(Rejection::IllegalTarget);
    }

    // Returning a drawn-from-discard card is a legal un-commit: the turn
    // does not end (spec.md §4.B / §9 open question 2).
    state.discard_pile.push(drawn);
    state.drawn_card = None;
    state.drawn_from = None;

    Ok(Event::PutBack { player: actor })
}

/// Clears per-turn transient fields, advances the turn, and closes out the
/// round if the final lap has completed.
fn complete_turn(state: &mut TableState) {
    state.drawn_card = None;
    state.drawn_from = None;
    state.must_flip_after_discard = false;

    let acting_idx = state.current_player_idx;
    let n = state.players.len();

    if state.players[acting_idx].hand.face_down_count() == 0
        && state.final_lap_trigger_idx.is_none()
    {
        state.final_lap_trigger_idx = Some(acting_idx);
    }

    if let Some(trigger) = state.final_lap_trigger_idx {
        if acting_idx != trigger {
            state.players[acting_idx].final_turn_taken = true;
        }
    }

    let next_idx = (acting_idx + 1) % n;
    state.current_player_idx = next_idx;

    if let Some(trigger) = state.final_lap_trigger_idx {
        if next_idx == trigger {
            let all_done = state
                .players
                .iter()
                .enumerate()
                .all(|(i, p)| i == trigger || p.final_turn_taken);
            if all_done {
                end_round(state);
            }
        }
    }
}

fn end_round(state: &mut TableState) {
    for player in state.players.iter_mut() {
        for card in player.hand.iter_mut() {
            card.flip();
        }
    }

    state.round_scores.clear();
    for player in state.players.iter() {
        let score = score_hand(&player.hand);
        state.round_scores.insert(player.id, score);
        *state.scores.entry(player.id).or_insert(0) += score;
    }

    state.phase = Phase::Scoring;
}

fn advance_scoring(
    state: &mut TableState,
    rng: &mut (impl Rng + ?Sized),
) -> Result<Event, Rejection> {
    require_phase(state, Phase::Scoring)?;

    if state.round_num < 9 {
        state.round_num += 1;
        state.dealer_idx = (state.dealer_idx + 1) % state.players.len();
        deal_round(state, rng)?;
        state.current_player_idx = (state.dealer_idx + 1) % state.players.len();
        state.phase = Phase::Reveal;
        Ok(Event::RoundAdvanced)
    } else {
        // Cumulative scores are left visible on the waiting screen; a
        // subsequent `start` clears them for the next game.
        state.phase = Phase::Waiting;
        state.round_num = 0;
        state.final_lap_trigger_idx = None;
        for player in state.players.iter_mut() {
            player.final_turn_taken = false;
            player.revealed_count = 0;
        }
        Ok(Event::GameReset)
    }
}

fn request_restart(
    state: &mut TableState,
    actor: PlayerId,
    now: u64,
) -> Result<Event, Rejection> {
    state.restart_vote.requested_by = Some(actor);
    state.restart_vote.requested_at = Some(now);
    state.restart_vote.yes_votes.clear();
    state.restart_vote.yes_votes.insert(actor);

    Ok(Event::RestartRequested { player: actor })
}

fn vote_restart(state: &mut TableState, actor: PlayerId) -> Result<Event, Rejection> {
    if !state.restart_vote.is_pending() {
        return Err(Rejection::WrongPhase);
    }

    state.restart_vote.yes_votes.insert(actor);

    let all_voted = state
        .active_player_ids
        .iter()
        .all(|id| state.restart_vote.yes_votes.contains(id));

    if all_voted {
        reset_for_restart(state);
    }

    Ok(Event::RestartVoted { player: actor })
}

fn vote_restart_no(state: &mut TableState, _actor: PlayerId) -> Result<Event, Rejection> {
    if !state.restart_vote.is_pending() {
        return Err(Rejection::WrongPhase);
    }

    state.restart_vote.clear();
    Ok(Event::RestartVoteCancelled)
}

fn reset_for_restart(state: &mut TableState) {
    state.phase = Phase::Waiting;
    state.round_num = 0;
    state.scores.clear();
    state.round_scores.clear();
    state.drawn_card = None;
    state.drawn_from = None;
    state.must_flip_after_discard = false;
    state.last_affected_card = None;
    state.final_lap_trigger_idx = None;
    state.restart_vote.clear();
    for player in state.players.iter_mut() {
        player.revealed_count = 0;
        player.final_turn_taken = false;
    }
}

fn heartbeat(state: &mut TableState, actor: PlayerId, now: u64) -> Result<Event, Rejection> {
    state.touch_activity(actor, now);
    Ok(Event::Heartbeat { player: actor })
}

/// Synthesizes the minimum legal action for an idle current player: draw
/// from draw, discard it, and flip the first remaining face-down card if
/// required. Used by the session's idle-turn timer (spec.md §4.C).
pub fn force_minimum_action<R: Rng + ?Sized>(
    state: &mut TableState,
    now: u64,
    rng: &mut R,
) -> Result<Vec<Event>, Rejection> {
    let actor = state.current_player().ok_or(Rejection::WrongPhase)?.id;
    let mut events = vec![apply(state, Intent::DrawFromDraw, actor, now, rng)?];
    events.push(apply(state, Intent::PlayDiscardOnly, actor, now, rng)?);

    if state.must_flip_after_discard {
        let index = state
            .current_player()
            .and_then(|p| p.hand.first_face_down())
            .ok_or(Rejection::IllegalTarget)?;
        events.push(apply(
            state,
            Intent::PlayFlipAfterDiscard { card_index: index },
            actor,
            now,
            rng,
        )?);
    }

    Ok(events)
}
