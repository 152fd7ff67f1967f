//! Wire messages exchanged over a WS connection. Inbound intents are just
//! `play9_core::Intent` deserialized straight off the socket (the engine's
//! `#[serde(tag = "type")]` already matches spec.md §6's wire format);
//! this module only adds the outbound envelope.

use crate::error::ApiError;
use crate::snapshot::Snapshot;
use serde::Serialize;

/// A message sent down a connection's outbound channel.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Snapshot(Snapshot),
    Error { detail: ApiError },
}

impl From<Snapshot> for ServerMessage {
    fn from(snapshot: Snapshot) -> Self {
        ServerMessage::Snapshot(snapshot)
    }
}

impl From<ApiError> for ServerMessage {
    fn from(detail: ApiError) -> Self {
        ServerMessage::Error { detail }
    }
}
