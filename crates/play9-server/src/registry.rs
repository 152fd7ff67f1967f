//! Process-wide table registry: maps table names to their running
//! session, creating one on first use and restoring any snapshots left
//! on disk at startup (spec.md §4.E).

use crate::config::Config;
use crate::error::ApiError;
use crate::persistence;
use crate::session::{self, SessionHandle};
use ahash::AHashMap;
use log::info;
use parking_lot::Mutex;
use play9_core::TableState;
use std::sync::Arc;

pub struct Registry {
    config: Arc<Config>,
    sessions: Mutex<AHashMap<String, SessionHandle>>,
}

impl Registry {
    pub fn new(config: Arc<Config>) -> Arc<Self> {
        Arc::new(Self {
            config,
            sessions: Mutex::new(AHashMap::new()),
        })
    }

    /// Spawns a session for every snapshot found in the configured
    /// directory, so tables survive a server restart (spec.md §4.E).
    /// Must be called with the `Arc<Registry>` already constructed, since
    /// each restored session holds a reference back to it.
    pub fn restore_from_disk(self: &Arc<Self>) -> anyhow::Result<()> {
        let snapshots = persistence::scan(&self.config.snapshot_dir)?;
        let mut sessions = self.sessions.lock();
        for (table_name, state) in snapshots {
            info!("restoring table {table_name} from snapshot");
            let handle = session::spawn(
                table_name.clone(),
                state,
                Arc::clone(&self.config),
                Arc::clone(self),
            );
            sessions.insert(table_name, handle);
        }
        Ok(())
    }

    /// Returns the named table's session, spawning a fresh empty one if it
    /// does not yet exist (spec.md §3 Lifecycle: "created on first join").
    pub fn get_or_create(self: &Arc<Self>, table_name: &str) -> SessionHandle {
        let mut sessions = self.sessions.lock();
        if let Some(handle) = sessions.get(table_name) {
            return handle.clone();
        }

        let handle = session::spawn(
            table_name.to_string(),
            TableState::empty(),
            Arc::clone(&self.config),
            Arc::clone(self),
        );
        sessions.insert(table_name.to_string(), handle.clone());
        handle
    }

    /// Looks up a table that must already exist (spec.md §7: a request
    /// against an unknown table is `not_found`, not an implicit create).
    pub fn get(&self, table_name: &str) -> Result<SessionHandle, ApiError> {
        self.sessions
            .lock()
            .get(table_name)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    /// Drops a session from the registry. Called by the session itself
    /// once it has decided to shut down.
    pub fn remove(&self, table_name: &str) {
        self.sessions.lock().remove(table_name);
    }
}
