//! Startup configuration, parsed once from the environment (spec.md §6).

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: IpAddr,
    pub listen_port: u16,
    pub snapshot_dir: PathBuf,
    pub idle_turn_timeout: Duration,
    pub restart_vote_timeout: Duration,
}

impl Config {
    pub const DEFAULT_PORT: u16 = 9999;

    /// Reads configuration from the environment, falling back to defaults
    /// for anything unset. Malformed values are a startup error: this
    /// service fails fast rather than silently ignoring bad config.
    pub fn from_env() -> anyhow::Result<Self> {
        let listen_addr = match std::env::var("PLAY9_LISTEN_ADDR") {
            Ok(v) => v.parse().map_err(|e| {
                anyhow::anyhow!("PLAY9_LISTEN_ADDR={v:?} is not a valid IP address: {e}")
            })?,
            Err(_) => IpAddr::from([0, 0, 0, 0]),
        };

        let listen_port = match std::env::var("PLAY9_LISTEN_PORT") {
            Ok(v) => v
                .parse()
                .map_err(|e| anyhow::anyhow!("PLAY9_LISTEN_PORT={v:?} is not a valid port: {e}"))?,
            Err(_) => Self::DEFAULT_PORT,
        };

        let snapshot_dir = std::env::var("PLAY9_SNAPSHOT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let idle_turn_timeout = Duration::from_secs(parse_secs_env("PLAY9_IDLE_TURN_SECS", 60)?);
        let restart_vote_timeout =
            Duration::from_secs(parse_secs_env("PLAY9_RESTART_VOTE_SECS", 30)?);

        Ok(Self {
            listen_addr,
            listen_port,
            snapshot_dir,
            idle_turn_timeout,
            restart_vote_timeout,
        })
    }
}

fn parse_secs_env(key: &str, default: u64) -> anyhow::Result<u64> {
    match std::env::var(key) {
        Ok(v) => v
            .parse()
            .map_err(|e| anyhow::anyhow!("{key}={v:?} is not a valid number of seconds: {e}")),
        Err(_) => Ok(default),
    }
}
