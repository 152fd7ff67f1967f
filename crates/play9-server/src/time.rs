//! Wall-clock seconds since the epoch, the unit `play9_core`'s engine and
//! `TableState` use for activity timestamps.

use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
