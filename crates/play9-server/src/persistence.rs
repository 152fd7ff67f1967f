//! Snapshot-to-disk persistence (spec.md §4.E, §6). One JSON file per
//! table, named `<table>.json` inside the configured snapshot directory,
//! written atomically via write-temp-then-rename.

use log::warn;
use play9_core::TableState;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// Current envelope schema version. Bumped whenever `TableState`'s shape
/// changes in a way that old files can no longer be read as-is.
pub const CURRENT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    state: TableState,
}

/// Builds the path a table's snapshot file lives at.
pub fn path_for(dir: &Path, table_name: &str) -> PathBuf {
    dir.join(format!("{table_name}.json"))
}

/// Writes `state` to `path` atomically: serialize to a temp file in the
/// same directory, then rename over the target. Unknown/missing fields on
/// load are handled by serde's defaults (§6); this function only concerns
/// itself with the write side.
pub fn save(dir: &Path, table_name: &str, state: &TableState) -> io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let envelope = Envelope {
        version: CURRENT_VERSION,
        state: state.clone(),
    };
    let json = serde_json::to_vec_pretty(&envelope)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    use std::io::Write;
    tmp.write_all(&json)?;
    tmp.persist(path_for(dir, table_name))
        .map_err(|e| e.error)?;
    Ok(())
}

/// Removes a table's snapshot file, if it exists.
pub fn delete(dir: &Path, table_name: &str) -> io::Result<()> {
    let path = path_for(dir, table_name);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Loads a single table snapshot, returning `None` (and logging a
/// warning) if the file's schema version is unrecognized. Restored tables
/// start with no active connections (§4.C): the caller is responsible for
/// clearing `active_player_ids` after load.
pub fn load(path: &Path) -> io::Result<Option<TableState>> {
    let bytes = std::fs::read(path)?;
    let envelope: Envelope = match serde_json::from_slice(&bytes) {
        Ok(e) => e,
        Err(e) => {
            warn!("skipping snapshot {}: {e}", path.display());
            return Ok(None);
        }
    };

    if envelope.version != CURRENT_VERSION {
        warn!(
            "skipping snapshot {} with unknown version {}",
            path.display(),
            envelope.version
        );
        return Ok(None);
    }

    Ok(Some(envelope.state))
}

/// Scans `dir` for `*.json` snapshot files, returning `(table_name, state)`
/// pairs for every one that loads successfully.
pub fn scan(dir: &Path) -> io::Result<Vec<(String, TableState)>> {
    let mut out = Vec::new();
    if !dir.exists() {
        return Ok(out);
    }

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(table_name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        match load(&path) {
            Ok(Some(mut state)) => {
                state.active_player_ids.clear();
                out.push((table_name.to_string(), state));
            }
            Ok(None) => {}
            Err(e) => warn!("failed to read snapshot {}: {e}", path.display()),
        }
    }

    Ok(out)
}
