//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::events::MonitorEvent;
use crate::index::Snapshot;
use crate::lifecycle::ListenerState;

/// Upper bound on a single frame body
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

const DEFAULT_CANDIDATE_LIMIT: usize = 50;
pub const MAX_CANDIDATE_LIMIT: usize = 1000;

fn default_limit() -> usize {
    DEFAULT_CANDIDATE_LIMIT
}

/// Requests from the front-end to the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request current daemon status
    GetStatus,

    /// Full copy of the path index
    GetIndex,

    /// Filenames starting with `prefix`
    Complete {
        prefix: String,
        #[serde(default = "default_limit")]
        limit: usize,
    },

    /// Subscribe to change and activation notifications
    Subscribe,
}

/// One completion candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub directory: String,
    pub name: String,
}

/// Responses and pushed notifications from daemon to front-end
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Current daemon status
    Status(DaemonStatus),

    /// Directory -> filenames copy of the index
    Index { directories: Snapshot },

    /// Completion candidates in index order
    Candidates { items: Vec<Candidate> },

    /// Subscription confirmed
    Subscribed,

    /// Pushed to subscribed clients
    Notification { event: MonitorEvent },

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Full daemon status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Uptime in seconds
    pub uptime_secs: u64,

    /// Directories in the index
    pub directories: usize,

    /// Filenames across all directories
    pub files: usize,

    /// Canonical text of the bound hotkey, if any
    pub hotkey: Option<String>,

    pub watcher: ListenerState,

    /// `None` when no hotkey listener was configured
    pub hotkey_listener: Option<ListenerState>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = Request::Complete {
            prefix: "gre".to_string(),
            limit: 5,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("complete"));
        assert!(json.contains("gre"));
    }

    #[test]
    fn test_complete_default_limit() {
        let req: Request = serde_json::from_str(r#"{"type":"complete","prefix":"ls"}"#).unwrap();
        assert_eq!(
            req,
            Request::Complete {
                prefix: "ls".to_string(),
                limit: DEFAULT_CANDIDATE_LIMIT,
            }
        );
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(DaemonStatus {
            version: "0.1.0".to_string(),
            uptime_secs: 3,
            directories: 2,
            files: 10,
            hotkey: Some("Alt+F2".to_string()),
            watcher: ListenerState::Running,
            hotkey_listener: None,
        });
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""type":"status""#));
        assert!(json.contains(r#""watcher":"running""#));
    }

    #[test]
    fn test_notification_serialization() {
        let resp = Response::Notification {
            event: MonitorEvent::Activated,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("notification"));
        assert!(json.contains("activated"));
    }
}
