//! Deck composition and shuffling.

use crate::card::{Card, MAX_VALUE, MIN_VALUE};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of packs used per pack copy: 2 per value (for `-5`), 4 per value
/// otherwise, as in a standard 54-card "golf" pack.
fn pack() -> Vec<i8> {
    let mut values = Vec::with_capacity(54);
    values.extend(std::iter::repeat(MIN_VALUE).take(2));
    for v in 0..=MAX_VALUE {
        values.extend(std::iter::repeat(v).take(4));
    }
    values
}

/// Number of packs combined for a given player count: 2 packs (108 cards)
/// for 2-6 players, 3 packs (162 cards) for 7-8.
fn packs_for(player_count: usize) -> usize {
    if player_count <= 6 {
        2
    } else {
        3
    }
}

/// Total deck size for a given player count.
pub fn total_deck_size(player_count: usize) -> usize {
    packs_for(player_count) * pack().len()
}

/// Errors that can occur while constructing a deck.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeckError {
    /// More than 8 players were requested.
    TooManyPlayers,
}

/// Ordered sequence of hidden cards; the top of the pile is the last
/// element (pop from the back).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// Builds a freshly shuffled deck sized for `player_count` players.
    pub fn shuffled<R: Rng + ?Sized>(player_count: usize, rng: &mut R) -> Result<Self, DeckError> {
        if player_count > 8 {
            return Err(DeckError::TooManyPlayers);
        }

        let mut values = Vec::new();
        for _ in 0..packs_for(player_count) {
            values.extend(pack());
        }
        values.shuffle(rng);

        Ok(Self {
            cards: values.into_iter().map(Card::new).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// All cards currently in the pile, bottom first, top last. Used when
    /// building a redacted snapshot for observers.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Pops the top card, if any.
    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    /// Deals `n` face-down cards off the top, topmost card last (so the
    /// caller sees them in deal order).
    pub fn deal(&mut self, n: usize) -> Vec<Card> {
        let mut dealt = Vec::with_capacity(n);
        for _ in 0..n {
            if let Some(card) = self.draw() {
                dealt.push(card);
            }
        }
        dealt
    }

    /// Rebuilds the draw pile from a shuffled copy of `cards`.
    pub fn refill_from<R: Rng + ?Sized>(&mut self, mut cards: Vec<Card>, rng: &mut R) {
        cards.shuffle(rng);
        self.cards = cards;
    }
}

/// Ordered sequence of face-up cards; top of the pile is the last element.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DiscardPile {
    cards: Vec<Card>,
}

impl DiscardPile {
    pub fn push(&mut self, mut card: Card) {
        card.flip();
        self.cards.push(card);
    }

    pub fn top(&self) -> Option<&Card> {
        self.cards.last()
    }

    /// All cards currently in the pile, bottom first, top last. Used when
    /// building a redacted snapshot for observers.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn pop(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Drains every card except the top one, for reshuffling into the draw
    /// pile. Leaves the top card in place.
    pub fn drain_all_but_top(&mut self) -> Vec<Card> {
        if self.cards.len() <= 1 {
            return Vec::new();
        }
        let top = self.cards.pop();
        let rest = std::mem::take(&mut self.cards);
        if let Some(top) = top {
            self.cards.push(top);
        }
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn deck_size_switches_at_seven_players() {
        assert_eq!(total_deck_size(2), 108);
        assert_eq!(total_deck_size(6), 108);
        assert_eq!(total_deck_size(7), 162);
        assert_eq!(total_deck_size(8), 162);
    }

    #[test]
    fn rejects_more_than_eight_players() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            Deck::shuffled(9, &mut rng).unwrap_err(),
            DeckError::TooManyPlayers
        );
    }

    #[test]
    fn same_seed_yields_same_shuffle() {
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        let deck_a = Deck::shuffled(4, &mut rng_a).unwrap();
        let deck_b = Deck::shuffled(4, &mut rng_b).unwrap();
        assert_eq!(
            deck_a.cards.iter().map(|c| c.value).collect::<Vec<_>>(),
            deck_b.cards.iter().map(|c| c.value).collect::<Vec<_>>()
        );
    }

    #[test]
    fn discard_drain_keeps_top() {
        let mut pile = DiscardPile::default();
        pile.push(Card::new(1));
        pile.push(Card::new(2));
        pile.push(Card::new(3));
        let drained = pile.drain_all_but_top();
        assert_eq!(drained.len(), 2);
        assert_eq!(pile.top().unwrap().value, 3);
    }
}
