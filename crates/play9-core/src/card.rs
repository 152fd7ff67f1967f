//! Card and hand types.

use serde::{Deserialize, Serialize};

/// Sentinel value emitted on the wire for a face-down card whose value is
/// hidden from the observer. Never stored in a [`Card`] — redaction happens
/// at serialization time, not at rest.
pub const HIDDEN_VALUE: i8 = -99;

/// Lowest legal card value ("hole-in-one").
pub const MIN_VALUE: i8 = -5;

/// Highest legal card value.
pub const MAX_VALUE: i8 = 12;

/// A single playing card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub value: i8,
    pub face_up: bool,
}

impl Card {
    pub fn new(value: i8) -> Self {
        debug_assert!((MIN_VALUE..=MAX_VALUE).contains(&value));
        Self {
            value,
            face_up: false,
        }
    }

    pub fn face_up(value: i8) -> Self {
        Self {
            value,
            face_up: true,
        }
    }

    pub fn flip(&mut self) {
        self.face_up = true;
    }

    /// The value this card shows to an observer, redacting it to
    /// [`HIDDEN_VALUE`] when face down. The server never stores the
    /// redacted form; this is only used when building a snapshot.
    pub fn redacted_value(&self) -> i8 {
        if self.face_up {
            self.value
        } else {
            HIDDEN_VALUE
        }
    }
}

/// A player's hand: exactly 8 cards, laid out as 4 columns x 2 rows.
/// Index `c` is the top of column `c`, index `c + 4` is the bottom.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Hand {
    cards: Vec<Card>,
}

pub const HAND_SIZE: usize = 8;
pub const COLUMNS: usize = 4;

impl Hand {
    /// Builds a hand from exactly 8 cards dealt face down.
    pub fn from_cards(cards: [Card; HAND_SIZE]) -> Self {
        Self {
            cards: cards.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Card> {
        self.cards.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Card> {
        self.cards.iter_mut()
    }

    /// Swaps the card at `index` with `card`, returning the one displaced.
    pub fn replace(&mut self, index: usize, card: Card) -> Option<Card> {
        let slot = self.cards.get_mut(index)?;
        Some(std::mem::replace(slot, card))
    }

    pub fn all_face_up(&self) -> bool {
        self.cards.iter().all(|c| c.face_up)
    }

    pub fn face_down_count(&self) -> usize {
        self.cards.iter().filter(|c| !c.face_up).count()
    }

    /// Index of the first face-down card, if any.
    pub fn first_face_down(&self) -> Option<usize> {
        self.cards.iter().position(|c| !c.face_up)
    }

    /// The two cards making up column `c` (top, bottom).
    fn column(&self, c: usize) -> (Card, Card) {
        (self.cards[c], self.cards[c + COLUMNS])
    }
}

/// Computes the score of a fully face-up hand, including shaving-strokes
/// bonuses for matched columns.
///
/// Columns pair index `c` with `c + 4`. A matched column (equal values)
/// contributes `-10` if the shared value is `-5` (hole-in-one), else `0`;
/// otherwise the column contributes the sum of its two values. After
/// summing columns, the largest group of columns sharing the same matched
/// value determines a shaving-strokes bonus: `-15` for 3 or more matching
/// columns, `-10` for exactly 2, none for fewer.
///
/// Panics if any card in `hand` is face down; callers must only score a
/// hand once all 8 cards are revealed (see [`Hand::all_face_up`]).
pub fn score_hand(hand: &Hand) -> i32 {
    assert!(
        hand.all_face_up(),
        "score_hand called on a hand with face-down cards"
    );

    let mut total = 0i32;
    // value -> number of columns matched on that value.
    let mut matched_counts: std::collections::HashMap<i8, u8> = std::collections::HashMap::new();

    for c in 0..COLUMNS {
        let (top, bottom) = hand.column(c);
        if top.value == bottom.value {
            matched_counts
                .entry(top.value)
                .and_modify(|n| *n += 1)
                .or_insert(1);
            total += if top.value == MIN_VALUE { -10 } else { 0 };
        } else {
            total += top.value as i32 + bottom.value as i32;
        }
    }

    let max_matched = matched_counts.values().copied().max().unwrap_or(0);
    total += match max_matched {
        0..=1 => 0,
        2 => -10,
        _ => -15,
    };

    total
}
