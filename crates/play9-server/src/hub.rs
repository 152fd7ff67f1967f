//! Subscriber hub (spec.md §4.D): per-table connection bookkeeping and
//! broadcast fan-out. A player may have at most one live connection; any
//! number of spectator connections may attach. Routing of inbound intents
//! (validating that an actor matches its bound connection) happens in
//! `session.rs`, which owns the hub — this module only tracks who gets a
//! copy of each outbound snapshot.

use crate::message::ServerMessage;
use ahash::AHashMap;
use play9_core::PlayerId;
use tokio::sync::mpsc;

pub type ConnId = u64;

enum Subscriber {
    Player {
        player_id: PlayerId,
        tx: mpsc::Sender<ServerMessage>,
    },
    Spectator {
        tx: mpsc::Sender<ServerMessage>,
    },
}

/// Per-table set of connections, split into player-bound and spectator
/// subscribers (spec.md §4.D).
#[derive(Default)]
pub struct Hub {
    next_conn_id: ConnId,
    subscribers: AHashMap<ConnId, Subscriber>,
}

impl Hub {
    /// True if `player_id` already has a live connection (spec.md §4.D:
    /// a second join for the same id is rejected).
    pub fn is_player_connected(&self, player_id: PlayerId) -> bool {
        self.subscribers
            .values()
            .any(|s| matches!(s, Subscriber::Player { player_id: p, .. } if *p == player_id))
    }

    pub fn add_player(&mut self, player_id: PlayerId, tx: mpsc::Sender<ServerMessage>) -> ConnId {
        let id = self.next_conn_id;
        self.next_conn_id += 1;
        self.subscribers
            .insert(id, Subscriber::Player { player_id, tx });
        id
    }

    pub fn add_spectator(&mut self, tx: mpsc::Sender<ServerMessage>) -> ConnId {
        let id = self.next_conn_id;
        self.next_conn_id += 1;
        self.subscribers.insert(id, Subscriber::Spectator { tx });
        id
    }

    /// Removes a connection. Returns the bound player id if it was a
    /// player connection, so the caller can update presence.
    pub fn remove(&mut self, conn_id: ConnId) -> Option<PlayerId> {
        match self.subscribers.remove(&conn_id)? {
            Subscriber::Player { player_id, .. } => Some(player_id),
            Subscriber::Spectator { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn has_player_connections(&self) -> bool {
        self.subscribers
            .values()
            .any(|s| matches!(s, Subscriber::Player { .. }))
    }

    /// Sends `msg` to every subscriber. A full or closed channel is
    /// dropped silently; the connection's own read/write loop will notice
    /// and unsubscribe (spec.md §5: closing a connection only cancels its
    /// own loops).
    pub async fn broadcast(&self, msg: &ServerMessage) {
        for sub in self.subscribers.values() {
            let tx = match sub {
                Subscriber::Player { tx, .. } => tx,
                Subscriber::Spectator { tx } => tx,
            };
            let _ = tx.send(msg.clone()).await;
        }
    }
}
