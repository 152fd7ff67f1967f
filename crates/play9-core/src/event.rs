//! Events produced by committed intents — used for `last_affected_card`
//! highlighting and for session-side logging.

use crate::player::PlayerId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Started,
    Revealed { player: PlayerId, card_index: usize },
    DrewFromDraw { player: PlayerId },
    DrewFromDiscard { player: PlayerId },
    Replaced { player: PlayerId, card_index: usize },
    DiscardedOnly { player: PlayerId },
    FlippedAfterDiscard { player: PlayerId, card_index: usize },
    PutBack { player: PlayerId },
    RoundAdvanced,
    GameReset,
    RestartRequested { player: PlayerId },
    RestartVoted { player: PlayerId },
    RestartVoteCancelled,
    Heartbeat { player: PlayerId },
}
