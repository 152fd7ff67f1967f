//! Client-originated intents.

use serde::{Deserialize, Serialize};

/// A client-originated message describing a desired state change. The
/// acting player is supplied out of band by the caller (the subscriber
/// hub binds a connection to a `PlayerId`; see `play9-server::hub`) —
/// it is not part of the wire payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    Start,
    Reveal { card_index: usize },
    DrawFromDraw,
    DrawFromDiscard,
    PlayReplace { card_index: usize },
    PlayDiscardOnly,
    PlayFlipAfterDiscard { card_index: usize },
    PlayPutBack,
    AdvanceScoring,
    RequestRestart,
    VoteRestart,
    VoteRestartNo,
    Heartbeat,
}
