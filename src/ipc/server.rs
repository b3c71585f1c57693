//! Unix domain socket server for IPC
//!
//! Provides request-response access to the path index and pushes
//! monitor notifications to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::events::MonitorEvent;
use crate::lifecycle::MonitorStatus;

use super::protocol::{
    Candidate, DaemonStatus, Request, Response, MAX_CANDIDATE_LIMIT, MAX_FRAME_LEN,
};

/// State shared by every client handler
struct Shared {
    status: MonitorStatus,
    start_time: Instant,
    events: broadcast::Sender<MonitorEvent>,
}

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    shared: Arc<Shared>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Bind the socket. `events` is the broadcast the consumer loop
    /// re-publishes monitor notifications on.
    pub fn new(
        socket_path: &Path,
        status: MonitorStatus,
        events: broadcast::Sender<MonitorEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            shared: Arc::new(Shared {
                status,
                start_time: Instant::now(),
                events,
            }),
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections until `shutdown()`
    pub async fn run(&self) -> Result<()> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                _ = shutdown_rx.recv() => return Ok(()),
            };

            match accepted {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let shared = Arc::clone(&self.shared);
                    let mut client_shutdown = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = handle_client(stream, shared) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = client_shutdown.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Handle a single client connection
async fn handle_client(stream: UnixStream, shared: Arc<Shared>) -> Result<()> {
    let (mut reader, writer) = stream.into_split();
    let (out_tx, out_rx) = mpsc::channel::<Response>(64);
    let writer_task = tokio::spawn(write_responses(writer, out_rx));
    let mut forwarder = None;

    let result = loop {
        let body = match read_frame(&mut reader).await {
            Ok(Some(body)) => body,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        };

        let request: Request = match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "failed to parse request");
                if out_tx.send(Response::error("bad_request", e.to_string())).await.is_err() {
                    break Ok(());
                }
                continue;
            }
        };
        debug!(?request, "received request");

        let subscription = match (&request, &forwarder) {
            (Request::Subscribe, None) => Some(shared.events.subscribe()),
            _ => None,
        };

        if out_tx.send(process_request(request, &shared)).await.is_err() {
            break Ok(());
        }

        if let Some(events) = subscription {
            debug!("client subscribed to notifications");
            forwarder = Some(tokio::spawn(forward_events(events, out_tx.clone())));
        }
    };

    debug!("client disconnected");
    if let Some(forwarder) = forwarder {
        forwarder.abort();
    }
    drop(out_tx);
    writer_task.await??;
    result
}

/// Read one length-prefixed frame; `None` on clean disconnect
async fn read_frame(reader: &mut OwnedReadHalf) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        warn!(len, "message too large, disconnecting");
        return Ok(None);
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

async fn write_responses(mut writer: OwnedWriteHalf, mut rx: mpsc::Receiver<Response>) -> Result<()> {
    while let Some(response) = rx.recv().await {
        send_message(&mut writer, &response).await?;
    }
    Ok(())
}

async fn forward_events(mut events: broadcast::Receiver<MonitorEvent>, out_tx: mpsc::Sender<Response>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if out_tx.send(Response::Notification { event }).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "subscriber lagged, notifications dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Send a length-prefixed JSON message
async fn send_message<T: serde::Serialize>(writer: &mut OwnedWriteHalf, msg: &T) -> Result<()> {
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;

    Ok(())
}

/// Process a request and return a response
fn process_request(request: Request, shared: &Shared) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::GetStatus => {
            let index = &shared.status.index;
            Response::Status(DaemonStatus {
                version: env!("CARGO_PKG_VERSION").to_string(),
                uptime_secs: shared.start_time.elapsed().as_secs(),
                directories: index.directory_count(),
                files: index.file_count(),
                hotkey: shared.status.binding.clone(),
                watcher: shared.status.watcher_state(),
                hotkey_listener: shared.status.hotkey_state(),
            })
        }

        Request::GetIndex => Response::Index {
            directories: shared.status.index.snapshot(),
        },

        Request::Complete { prefix, limit } => {
            let items = shared
                .status
                .index
                .candidates(&prefix, limit.min(MAX_CANDIDATE_LIMIT))
                .into_iter()
                .map(|(directory, name)| Candidate { directory, name })
                .collect();
            Response::Candidates { items }
        }

        Request::Subscribe => Response::Subscribed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::fake::FakeSession;
    use crate::lifecycle::{ListenerState, Monitor};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    async fn request(stream: &mut UnixStream, request: &Request) -> Response {
        let body = serde_json::to_vec(request).unwrap();
        stream
            .write_all(&(body.len() as u32).to_le_bytes())
            .await
            .unwrap();
        stream.write_all(&body).await.unwrap();
        read_response(stream).await
    }

    async fn read_response(stream: &mut UnixStream) -> Response {
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.unwrap();
        let mut body = vec![0u8; u32::from_le_bytes(len_buf) as usize];
        stream.read_exact(&mut body).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    struct Fixture {
        _dir: TempDir,
        _monitor: Monitor<FakeSession>,
        server: Arc<Server>,
        events: broadcast::Sender<MonitorEvent>,
        socket: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let (monitor, _rx) = Monitor::<FakeSession>::new(Duration::from_millis(20));
        monitor
            .index()
            .insert_listing("/usr/bin", vec!["ls".to_string(), "cat".to_string()]);
        monitor.index().insert_listing("/bin", vec!["cp".to_string()]);

        let (events, _) = broadcast::channel(16);
        let socket = dir.path().join("ipc").join("daemon.sock");
        let server = Arc::new(Server::new(&socket, monitor.status(), events.clone()).unwrap());

        let runner = Arc::clone(&server);
        tokio::spawn(async move { runner.run().await });

        Fixture {
            _dir: dir,
            _monitor: monitor,
            server,
            events,
            socket,
        }
    }

    #[tokio::test]
    async fn test_ping_status_and_index() {
        let fx = fixture();
        let mut stream = UnixStream::connect(&fx.socket).await.unwrap();

        assert!(matches!(request(&mut stream, &Request::Ping).await, Response::Pong));

        match request(&mut stream, &Request::GetStatus).await {
            Response::Status(status) => {
                assert_eq!(status.directories, 2);
                assert_eq!(status.files, 3);
                assert_eq!(status.watcher, ListenerState::NotStarted);
                assert_eq!(status.hotkey_listener, None);
            }
            other => panic!("unexpected response: {other:?}"),
        }

        match request(&mut stream, &Request::GetIndex).await {
            Response::Index { directories } => {
                assert_eq!(directories["/usr/bin"], vec!["ls", "cat"]);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete() {
        let fx = fixture();
        let mut stream = UnixStream::connect(&fx.socket).await.unwrap();

        let req = Request::Complete {
            prefix: "c".to_string(),
            limit: 10,
        };
        match request(&mut stream, &req).await {
            Response::Candidates { items } => {
                let names: Vec<_> = items.iter().map(|c| c.name.as_str()).collect();
                assert_eq!(names, vec!["cp", "cat"]);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bad_request_keeps_connection() {
        let fx = fixture();
        let mut stream = UnixStream::connect(&fx.socket).await.unwrap();

        let garbage = b"{not json";
        stream
            .write_all(&(garbage.len() as u32).to_le_bytes())
            .await
            .unwrap();
        stream.write_all(garbage).await.unwrap();
        assert!(matches!(
            read_response(&mut stream).await,
            Response::Error { ref code, .. } if code == "bad_request"
        ));

        assert!(matches!(request(&mut stream, &Request::Ping).await, Response::Pong));
    }

    #[tokio::test]
    async fn test_subscribe_receives_notifications() {
        let fx = fixture();
        let mut stream = UnixStream::connect(&fx.socket).await.unwrap();

        assert!(matches!(
            request(&mut stream, &Request::Subscribe).await,
            Response::Subscribed
        ));

        assert_ok!(fx.events.send(MonitorEvent::PathsChanged));
        let pushed = tokio::time::timeout(Duration::from_secs(2), read_response(&mut stream))
            .await
            .unwrap();
        assert!(matches!(
            pushed,
            Response::Notification {
                event: MonitorEvent::PathsChanged
            }
        ));
    }

    #[tokio::test]
    async fn test_shutdown_removes_socket() {
        let fx = fixture();
        assert!(fx.socket.exists());
        fx.server.shutdown().await;
        assert!(!fx.socket.exists());
    }
}
