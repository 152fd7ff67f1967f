//! Table session: the single-writer owner of one table's authoritative
//! `TableState`, its subscriber hub, its idle-turn and restart-vote
//! timers, and its on-disk snapshot (spec.md §4.C).
//!
//! Grounded in the teacher pack's closest table-session exemplar
//! (`examples/other_examples/…vincev-freezeout…table-state.rs.rs`): one
//! owning tokio task per table, driven by `tokio::select!` between an
//! inbound command channel and a periodic tick, exactly freezeout's
//! `State::tick` shape. Every command that is a committed intent runs
//! through `play9_core::apply`, then persists and broadcasts; this task
//! is the only place that ever mutates the table's `TableState`, which is
//! the single-writer discipline spec.md §5 requires.

use crate::config::Config;
use crate::error::ApiError;
use crate::hub::{ConnId, Hub};
use crate::message::ServerMessage;
use crate::persistence;
use crate::registry::Registry;
use crate::snapshot::build_snapshot;
use crate::time::now_epoch;
use log::{debug, error, info};
use play9_core::{apply, force_minimum_action, Intent, Phase, PlayerId, TableState};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};

/// A table with no seated players is destroyed after this many seconds of
/// sitting empty, whether it has spectators or not (spec.md §3 Lifecycle:
/// "spectator-only tables are destroyed after an idle interval"). Not one
/// of the env-configurable durations in spec.md §6, so it is a constant
/// here; see DESIGN.md.
const EMPTY_TABLE_IDLE_SECS: u64 = 300;

const TICK_PERIOD: Duration = Duration::from_secs(1);

pub enum SessionCommand {
    Join {
        player_name: String,
        reply: oneshot::Sender<Result<PlayerId, ApiError>>,
    },
    Leave {
        player_id: PlayerId,
    },
    Intent {
        /// `None` for a spectator connection, which may only heartbeat.
        actor: Option<PlayerId>,
        intent: Intent,
        reply: oneshot::Sender<Result<(), ApiError>>,
    },
    Subscribe {
        player_id: Option<PlayerId>,
        tx: mpsc::Sender<ServerMessage>,
        reply: oneshot::Sender<Result<ConnId, ApiError>>,
    },
    Unsubscribe {
        conn_id: ConnId,
    },
    Snapshot {
        reply: oneshot::Sender<ServerMessage>,
    },
}

/// A lightweight, cloneable reference to a running table session. Talking
/// to the session always means sending a command down this channel and
/// awaiting a reply — never touching `TableState` directly.
#[derive(Clone)]
pub struct SessionHandle {
    pub table_name: String,
    cmd_tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub async fn join(&self, player_name: String) -> Result<PlayerId, ApiError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::Join { player_name, reply })
            .await
            .map_err(|_| ApiError::Internal)?;
        rx.await.map_err(|_| ApiError::Internal)?
    }

    pub async fn leave(&self, player_id: PlayerId) {
        let _ = self
            .cmd_tx
            .send(SessionCommand::Leave { player_id })
            .await;
    }

    pub async fn apply_intent(
        &self,
        actor: Option<PlayerId>,
        intent: Intent,
    ) -> Result<(), ApiError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::Intent {
                actor,
                intent,
                reply,
            })
            .await
            .map_err(|_| ApiError::Internal)?;
        rx.await.map_err(|_| ApiError::Internal)?
    }

    pub async fn subscribe(
        &self,
        player_id: Option<PlayerId>,
        tx: mpsc::Sender<ServerMessage>,
    ) -> Result<ConnId, ApiError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::Subscribe {
                player_id,
                tx,
                reply,
            })
            .await
            .map_err(|_| ApiError::Internal)?;
        rx.await.map_err(|_| ApiError::Internal)?
    }

    /// Best-effort: if the session has already shut down there is nothing
    /// left to unsubscribe from.
    pub fn unsubscribe(&self, conn_id: ConnId) {
        let _ = self.cmd_tx.try_send(SessionCommand::Unsubscribe { conn_id });
    }

    pub async fn snapshot(&self) -> Result<ServerMessage, ApiError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::Snapshot { reply })
            .await
            .map_err(|_| ApiError::Internal)?;
        rx.await.map_err(|_| ApiError::Internal)
    }
}

struct Session {
    table_name: String,
    state: TableState,
    hub: Hub,
    config: Arc<Config>,
    registry: Arc<Registry>,
    rng: StdRng,
    cmd_rx: mpsc::Receiver<SessionCommand>,
}

/// Spawns the owning task for a table and returns a handle to it
/// (spec.md §5: per-table logic runs on a dedicated single-writer
/// executor).
pub fn spawn(
    table_name: String,
    state: TableState,
    config: Arc<Config>,
    registry: Arc<Registry>,
) -> SessionHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(128);
    let handle = SessionHandle {
        table_name: table_name.clone(),
        cmd_tx,
    };

    let session = Session {
        table_name,
        state,
        hub: Hub::default(),
        config,
        registry,
        rng: StdRng::from_entropy(),
        cmd_rx,
    };

    tokio::spawn(session.run());
    handle
}

impl Session {
    async fn run(mut self) {
        info!("table {} session started", self.table_name);
        let mut ticker = interval(TICK_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }

            if self.should_destroy() {
                self.destroy().await;
                break;
            }
        }

        info!("table {} session stopped", self.table_name);
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Join { player_name, reply } => {
                let now = now_epoch();
                let result = self
                    .state
                    .join_player(&player_name, now)
                    .map_err(ApiError::from);
                if result.is_ok() {
                    self.commit().await;
                }
                let _ = reply.send(result);
            }
            SessionCommand::Leave { player_id } => {
                self.state.leave_player(player_id);
                self.commit().await;
            }
            SessionCommand::Intent {
                actor,
                intent,
                reply,
            } => {
                let result = self.handle_intent(actor, intent).await;
                let _ = reply.send(result);
            }
            SessionCommand::Subscribe {
                player_id,
                tx,
                reply,
            } => {
                let result = self.handle_subscribe(player_id, tx).await;
                let _ = reply.send(result);
            }
            SessionCommand::Unsubscribe { conn_id } => {
                if let Some(player_id) = self.hub.remove(conn_id) {
                    self.state.mark_disconnected(player_id);
                    self.commit().await;
                }
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot_message());
            }
        }
    }

    async fn handle_intent(
        &mut self,
        actor: Option<PlayerId>,
        intent: Intent,
    ) -> Result<(), ApiError> {
        let Some(actor) = actor else {
            return match intent {
                Intent::Heartbeat => Ok(()),
                _ => Err(ApiError::NotAPlayer),
            };
        };

        let now = now_epoch();
        match apply(&mut self.state, intent, actor, now, &mut self.rng) {
            Ok(event) => {
                debug!("table {}: applied {event:?}", self.table_name);
                self.state.player_last_active.insert(actor, now);
                // A heartbeat only updates presence timestamps; it never
                // changes anything observers need to see, so it persists
                // quietly instead of triggering a broadcast (spec.md §4.B).
                if matches!(intent, Intent::Heartbeat) {
                    self.persist();
                } else {
                    self.commit().await;
                }
                Ok(())
            }
            Err(rejection) => {
                debug!("table {}: rejected {rejection:?}", self.table_name);
                Err(rejection.into())
            }
        }
    }

    async fn handle_subscribe(
        &mut self,
        player_id: Option<PlayerId>,
        tx: mpsc::Sender<ServerMessage>,
    ) -> Result<ConnId, ApiError> {
        match player_id {
            Some(id) => {
                if self.hub.is_player_connected(id) {
                    return Err(ApiError::AlreadyConnected);
                }
                if self.state.player(id).is_none() {
                    return Err(ApiError::NotFound);
                }
                let conn_id = self.hub.add_player(id, tx);
                self.state.mark_connected(id, now_epoch());
                // `commit` broadcasts to every subscriber, including the
                // one just added above, so the new connection gets its
                // first snapshot from that broadcast — no separate send.
                self.commit().await;
                Ok(conn_id)
            }
            None => {
                // A spectator's join has nothing to commit, so it needs
                // its own direct send to get an initial snapshot at all.
                let conn_id = self.hub.add_spectator(tx.clone());
                let _ = tx.send(self.snapshot_message()).await;
                Ok(conn_id)
            }
        }
    }

    /// The idle-turn timer and restart-vote timeout (spec.md §4.C, §6).
    async fn tick(&mut self) {
        self.check_idle_turn().await;
        self.check_restart_vote_timeout().await;
    }

    async fn check_idle_turn(&mut self) {
        if self.state.phase != Phase::Play {
            return;
        }
        let Some(current) = self.state.current_player() else {
            return;
        };
        let current_id = current.id;
        let basis = self
            .state
            .player_last_active
            .get(&current_id)
            .copied()
            .unwrap_or(0);
        let now = now_epoch();
        if now.saturating_sub(basis) < self.config.idle_turn_timeout.as_secs() {
            return;
        }

        match force_minimum_action(&mut self.state, now, &mut self.rng) {
            Ok(events) => {
                info!(
                    "table {}: idle-turn timeout forced {} action(s) for {current_id}",
                    self.table_name,
                    events.len()
                );
                self.state.player_last_active.insert(current_id, now);
                self.commit().await;
            }
            Err(rejection) => {
                error!(
                    "table {}: idle-turn forcing failed for {current_id}: {rejection:?}",
                    self.table_name
                );
            }
        }
    }

    async fn check_restart_vote_timeout(&mut self) {
        let Some(requested_at) = self.state.restart_vote.requested_at else {
            return;
        };
        let now = now_epoch();
        if now.saturating_sub(requested_at) < self.config.restart_vote_timeout.as_secs() {
            return;
        }

        info!("table {}: restart vote timed out", self.table_name);
        self.state.restart_vote.clear();
        self.commit().await;
    }

    /// Persists the current state and broadcasts a fresh snapshot to
    /// every subscriber. Called after every committed change (spec.md
    /// §4.C): intents, joins, leaves, presence changes, and timer-forced
    /// actions all funnel through here.
    async fn commit(&mut self) {
        self.persist();
        let msg = self.snapshot_message();
        self.hub.broadcast(&msg).await;
    }

    /// Persists without broadcasting, for commits the spec exempts from
    /// fan-out (just a heartbeat's presence timestamp; see spec.md §4.B).
    fn persist(&mut self) {
        if let Err(e) = persistence::save(&self.config.snapshot_dir, &self.table_name, &self.state)
        {
            error!("table {}: failed to persist snapshot: {e}", self.table_name);
        }
    }

    fn snapshot_message(&self) -> ServerMessage {
        let inactive_turn_name = match self.state.phase {
            Phase::Play => self.state.current_player().map(|p| p.name.clone()),
            _ => None,
        };
        ServerMessage::Snapshot(build_snapshot(&self.state, inactive_turn_name))
    }

    fn should_destroy(&self) -> bool {
        if !self.state.players.is_empty() {
            return false;
        }
        if self.state.phase != Phase::Empty {
            return false;
        }
        // No seats at all: either the last player just left (destroy
        // immediately) or this table only ever had spectators (destroy
        // once it's been idle for a while).
        if self.hub.has_player_connections() {
            return false;
        }
        if self.hub.is_empty() {
            return true;
        }
        self.state
            .player_last_active
            .values()
            .max()
            .map(|&last| now_epoch().saturating_sub(last) >= EMPTY_TABLE_IDLE_SECS)
            .unwrap_or(true)
    }

    async fn destroy(&mut self) {
        info!("table {}: destroying (empty)", self.table_name);
        if let Err(e) = persistence::delete(&self.config.snapshot_dir, &self.table_name) {
            error!("table {}: failed to delete snapshot: {e}", self.table_name);
        }
        self.registry.remove(&self.table_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;

    fn test_config(dir: &std::path::Path) -> Arc<Config> {
        Arc::new(Config {
            listen_addr: std::net::IpAddr::from([127, 0, 0, 1]),
            listen_port: 0,
            snapshot_dir: dir.to_path_buf(),
            idle_turn_timeout: Duration::from_secs(60),
            restart_vote_timeout: Duration::from_secs(30),
        })
    }

    async fn expect_snapshot(rx: &mut mpsc::Receiver<ServerMessage>) -> Snapshot {
        match rx.recv().await.expect("subscriber channel closed") {
            ServerMessage::Snapshot(s) => s,
            ServerMessage::Error { detail } => panic!("unexpected rejection: {detail:?}"),
        }
    }

    #[tokio::test]
    async fn join_start_and_play_broadcasts_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(test_config(dir.path()));
        let handle = registry.get_or_create("t1");

        let alice = handle.join("Alice".to_string()).await.unwrap();
        let bob = handle.join("Bob".to_string()).await.unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        handle.subscribe(Some(alice), tx).await.unwrap();
        let snap = expect_snapshot(&mut rx).await;
        assert_eq!(snap.players.len(), 2);

        handle
            .apply_intent(Some(alice), Intent::Start)
            .await
            .unwrap();
        let mut snap = expect_snapshot(&mut rx).await;
        assert_eq!(snap.phase, Phase::Reveal);

        for id in [alice, bob] {
            handle
                .apply_intent(Some(id), Intent::Reveal { card_index: 0 })
                .await
                .unwrap();
            snap = expect_snapshot(&mut rx).await;
            handle
                .apply_intent(Some(id), Intent::Reveal { card_index: 4 })
                .await
                .unwrap();
            snap = expect_snapshot(&mut rx).await;
        }
        assert_eq!(snap.phase, Phase::Play);

        let current_id = snap.players[snap.current_player_idx].id;
        handle
            .apply_intent(Some(current_id), Intent::DrawFromDraw)
            .await
            .unwrap();
        let snap = expect_snapshot(&mut rx).await;
        assert!(snap.drawn_card.is_some());

        handle
            .apply_intent(Some(current_id), Intent::PlayReplace { card_index: 0 })
            .await
            .unwrap();
        let snap = expect_snapshot(&mut rx).await;
        assert!(snap.drawn_card.is_none());
        assert_ne!(snap.players[snap.current_player_idx].id, current_id);
    }

    #[tokio::test]
    async fn spectator_connection_cannot_send_gameplay_intents() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(test_config(dir.path()));
        let handle = registry.get_or_create("t1");
        handle.join("Alice".to_string()).await.unwrap();
        handle.join("Bob".to_string()).await.unwrap();

        let err = handle.apply_intent(None, Intent::Start).await.unwrap_err();
        assert_eq!(err, ApiError::NotAPlayer);

        // A spectator's heartbeat is fine; it just never broadcasts.
        handle.apply_intent(None, Intent::Heartbeat).await.unwrap();
    }

    #[tokio::test]
    async fn a_second_connection_for_the_same_player_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(test_config(dir.path()));
        let handle = registry.get_or_create("t1");
        let alice = handle.join("Alice".to_string()).await.unwrap();

        let (tx1, _rx1) = mpsc::channel(4);
        handle.subscribe(Some(alice), tx1).await.unwrap();

        let (tx2, _rx2) = mpsc::channel(4);
        let err = handle.subscribe(Some(alice), tx2).await.unwrap_err();
        assert_eq!(err, ApiError::AlreadyConnected);
    }

    #[tokio::test]
    async fn restart_vote_resets_both_players_to_waiting() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(test_config(dir.path()));
        let handle = registry.get_or_create("t1");
        let alice = handle.join("Alice".to_string()).await.unwrap();
        let bob = handle.join("Bob".to_string()).await.unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        handle.subscribe(Some(alice), tx).await.unwrap();
        expect_snapshot(&mut rx).await; // join snapshot

        handle
            .apply_intent(Some(alice), Intent::Start)
            .await
            .unwrap();
        expect_snapshot(&mut rx).await;

        handle
            .apply_intent(Some(alice), Intent::RequestRestart)
            .await
            .unwrap();
        let snap = expect_snapshot(&mut rx).await;
        assert_eq!(snap.restart_requested_by, Some(alice));

        handle
            .apply_intent(Some(bob), Intent::VoteRestart)
            .await
            .unwrap();
        let snap = expect_snapshot(&mut rx).await;
        assert_eq!(snap.phase, Phase::Waiting);
        assert!(snap.restart_requested_by.is_none());
    }

    #[tokio::test]
    async fn idle_turn_forces_minimum_action_after_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = (*test_config(dir.path())).clone();
        config.idle_turn_timeout = Duration::from_secs(0);
        let registry = Registry::new(Arc::new(config));
        let handle = registry.get_or_create("t1");
        let alice = handle.join("Alice".to_string()).await.unwrap();
        let bob = handle.join("Bob".to_string()).await.unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        handle.subscribe(Some(alice), tx).await.unwrap();
        expect_snapshot(&mut rx).await;

        handle
            .apply_intent(Some(alice), Intent::Start)
            .await
            .unwrap();
        let mut snap = expect_snapshot(&mut rx).await;

        for id in [alice, bob] {
            handle
                .apply_intent(Some(id), Intent::Reveal { card_index: 0 })
                .await
                .unwrap();
            snap = expect_snapshot(&mut rx).await;
            handle
                .apply_intent(Some(id), Intent::Reveal { card_index: 4 })
                .await
                .unwrap();
            snap = expect_snapshot(&mut rx).await;
        }
        let current_id = snap.players[snap.current_player_idx].id;

        // The next tick sees elapsed time >= the zeroed-out timeout and
        // synthesizes a draw/discard(/flip) for the idle current player.
        let forced = tokio::time::timeout(Duration::from_secs(3), async {
            loop {
                let snap = expect_snapshot(&mut rx).await;
                if snap.players[snap.current_player_idx].id != current_id {
                    break snap;
                }
            }
        })
        .await
        .expect("idle-turn timer never fired");
        assert_ne!(forced.players[forced.current_player_idx].id, current_id);
    }
}
