//! Events module for notifications raised by the background listeners
//!
//! Listener threads never touch consumer state directly. They push
//! `MonitorEvent`s through a `Notifier` into an unbounded channel that the
//! consumer's own loop drains.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Which background listener an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerKind {
    /// The directory watcher
    Watcher,
    /// The global hotkey listener
    Hotkey,
}

impl std::fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerKind::Watcher => write!(f, "watcher"),
            ListenerKind::Hotkey => write!(f, "hotkey"),
        }
    }
}

/// Events emitted by the background listeners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// A batch of filesystem events was applied to the path index.
    /// Carries no snapshot; readers re-read the index.
    PathsChanged,

    /// The bound key combination was pressed
    Activated,

    /// A listener loop hit a transport error and exited
    ListenerFailed {
        /// Which loop failed
        listener: ListenerKind,
        /// Human readable failure description
        message: String,
    },
}

impl std::fmt::Display for MonitorEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorEvent::PathsChanged => write!(f, "PATHS_CHANGED"),
            MonitorEvent::Activated => write!(f, "ACTIVATED"),
            MonitorEvent::ListenerFailed { listener, message } => {
                write!(f, "LISTENER_FAILED ({listener}: {message})")
            }
        }
    }
}

/// Sending half handed to each listener thread
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<MonitorEvent>,
}

impl Notifier {
    /// Create a notifier and the receiver the consumer loop drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<MonitorEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue an event for the consumer. Never blocks.
    pub fn notify(&self, event: MonitorEvent) {
        if self.tx.send(event).is_err() {
            debug!("consumer receiver dropped, discarding event");
        }
    }

    pub fn failed(&self, listener: ListenerKind, message: impl Into<String>) {
        self.notify(MonitorEvent::ListenerFailed {
            listener,
            message: message.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = MonitorEvent::ListenerFailed {
            listener: ListenerKind::Watcher,
            message: "inotify closed".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("listener_failed"));
        assert!(json.contains("watcher"));
        assert!(json.contains("inotify closed"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"paths_changed"}"#;
        let event: MonitorEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, MonitorEvent::PathsChanged);
    }

    #[test]
    fn test_notifier_delivers_in_order() {
        let (notifier, mut rx) = Notifier::channel();
        notifier.notify(MonitorEvent::PathsChanged);
        notifier.notify(MonitorEvent::Activated);

        assert_eq!(rx.try_recv().unwrap(), MonitorEvent::PathsChanged);
        assert_eq!(rx.try_recv().unwrap(), MonitorEvent::Activated);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_notify_after_receiver_dropped() {
        let (notifier, rx) = Notifier::channel();
        drop(rx);
        notifier.notify(MonitorEvent::Activated);
    }
}
