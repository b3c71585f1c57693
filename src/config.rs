//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_HOTKEY: &str = "Alt+F2";
const DEFAULT_POLL_MS: u64 = 100;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directories from `$PATH`, in search order
    pub search_path: Vec<PathBuf>,

    /// Hotkey combination string, e.g. `Alt+F2`
    pub hotkey: String,

    /// How long each listener loop waits before re-checking its stop flag
    pub poll_interval: Duration,

    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` in place of the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let search_path: Vec<PathBuf> = lookup("PATH")
            .map(|path| {
                path.split(':')
                    .filter(|segment| !segment.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default();
        if search_path.is_empty() {
            bail!("missing PATH");
        }

        let hotkey = lookup("LAUNCHER_HOTKEY").unwrap_or_else(|| DEFAULT_HOTKEY.to_string());

        let poll_ms = match lookup("LAUNCHER_POLL_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid LAUNCHER_POLL_MS: {raw:?}"))?,
            None => DEFAULT_POLL_MS,
        };
        if poll_ms == 0 {
            bail!("LAUNCHER_POLL_MS must be greater than zero");
        }

        let socket_path = match lookup("LAUNCHER_SOCKET") {
            Some(path) => PathBuf::from(path),
            None => default_socket_path(&lookup)?,
        };

        Ok(Self {
            search_path,
            hotkey,
            poll_interval: Duration::from_millis(poll_ms),
            socket_path,
        })
    }
}

fn default_socket_path<F>(lookup: &F) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(runtime_dir) = lookup("XDG_RUNTIME_DIR").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(runtime_dir).join("launcher-daemon.sock"));
    }

    let home = lookup("HOME").context("neither XDG_RUNTIME_DIR nor HOME is set")?;
    Ok(PathBuf::from(home)
        .join(".local")
        .join("share")
        .join("launcher-daemon")
        .join("daemon.sock"))
}
