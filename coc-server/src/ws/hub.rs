//! The WebSocket client set: registration, per-client subscription filter,
//! broadcast fan-out, and the 60s/90s heartbeat. Owned by [`crate::state::AppState`]
//! and shared with every connection task.

use std::sync::Mutex as StdMutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use coc_shared::ids::{ClientId, WorkspaceId};
use coc_shared::time::now;
use dashmap::DashMap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::frame::{self, Frame, OP_CLOSE, OP_PING, OP_PONG, OP_TEXT};
use super::messages::{ClientMessage, ServerMessage};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);
const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(90);
const READ_BUF_INITIAL: usize = 4096;

struct ClientHandle {
    outbox: mpsc::UnboundedSender<Vec<u8>>,
    last_seen: StdMutex<DateTime<Utc>>,
    workspace_filter: StdMutex<Option<WorkspaceId>>,
    cancel: CancellationToken,
}

#[derive(Debug)]
pub struct WsHub {
    handles: DashMap<ClientId, std::sync::Arc<ClientHandle>>,
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle").finish()
    }
}

impl WsHub {
    pub fn new() -> std::sync::Arc<Self> {
        let hub = std::sync::Arc::new(Self {
            handles: DashMap::new(),
        });
        hub.clone().spawn_heartbeat();
        hub
    }

    fn spawn_heartbeat(self: std::sync::Arc<Self>) {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(HEARTBEAT_INTERVAL);
            loop {
                tick.tick().await;
                let now = now();
                let stale: Vec<ClientId> = self
                    .handles
                    .iter()
                    .filter(|entry| {
                        let last_seen = *entry.value().last_seen.lock().unwrap();
                        now.signed_duration_since(last_seen).num_seconds() as u64 > HEARTBEAT_TIMEOUT.as_secs()
                    })
                    .map(|entry| entry.key().clone())
                    .collect();
                for id in stale {
                    tracing::info!(client_id = %id, "pruning stale websocket client");
                    self.remove(&id);
                }
            }
        });
    }

    /// Registers a new client and returns a receiver the connection task
    /// drains to write raw frame bytes to the socket.
    fn register(&self, id: ClientId) -> mpsc::UnboundedReceiver<Vec<u8>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = std::sync::Arc::new(ClientHandle {
            outbox: tx,
            last_seen: StdMutex::new(now()),
            workspace_filter: StdMutex::new(None),
            cancel: CancellationToken::new(),
        });
        self.handles.insert(id, handle);
        rx
    }

    pub fn remove(&self, id: &ClientId) {
        if let Some((_, handle)) = self.handles.remove(id) {
            handle.cancel.cancel();
        }
    }

    /// `closeAll` — terminates every connection; the heartbeat keeps
    /// running (it's a background tokio task, not a blocking timer, so
    /// there's nothing to unref beyond letting the process exit).
    pub fn close_all(&self) {
        let ids: Vec<ClientId> = self.handles.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.remove(&id);
        }
    }

    pub fn client_count(&self) -> usize {
        self.handles.len()
    }

    fn send_to(&self, id: &ClientId, message: &ServerMessage) {
        if let Some(handle) = self.handles.get(id) {
            let _ = handle.outbox.send(frame::encode_text_frame(&message.to_json()));
        }
    }

    /// Broadcast filtering per the wire contract: messages carrying a
    /// workspace id only reach clients subscribed to it or unsubscribed;
    /// messages without one reach everyone.
    pub fn broadcast(&self, message: ServerMessage) {
        let target_workspace = message.workspace_id();
        let payload = frame::encode_text_frame(&message.to_json());
        for entry in self.handles.iter() {
            let subscription = entry.value().workspace_filter.lock().unwrap().clone();
            let matches = match (&target_workspace, &subscription) {
                (None, _) => true,
                (Some(_), None) => true,
                (Some(w), Some(sub)) => w == sub,
            };
            if matches {
                let _ = entry.value().outbox.send(payload.clone());
            }
        }
    }

    /// Drives one accepted connection to completion: handshake already
    /// happened in the route handler, `io` is the raw post-upgrade duplex
    /// stream.
    pub async fn handle_connection<S>(self: std::sync::Arc<Self>, mut io: S)
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        let id = ClientId::new_v4();
        let mut outbox = self.register(id.clone());
        let cancel = self
            .handles
            .get(&id)
            .map(|h| h.cancel.clone())
            .unwrap_or_default();

        self.send_to(
            &id,
            &ServerMessage::Welcome {
                client_id: id.clone(),
                timestamp: now().timestamp_millis(),
            },
        );

        let mut read_buf = Vec::with_capacity(READ_BUF_INITIAL);
        let mut chunk = [0u8; READ_BUF_INITIAL];

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    let _ = io.write_all(&frame::encode_close_frame()).await;
                    break;
                }

                maybe_outgoing = outbox.recv() => {
                    match maybe_outgoing {
                        Some(bytes) => {
                            if io.write_all(&bytes).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }

                read_result = io.read(&mut chunk) => {
                    match read_result {
                        Ok(0) => break, // EOF
                        Ok(n) => {
                            read_buf.extend_from_slice(&chunk[..n]);
                            if !self.drain_frames(&id, &mut read_buf) {
                                let _ = io.write_all(&frame::encode_close_frame()).await;
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::debug!(client_id = %id, error = %e, "websocket read error");
                            break;
                        }
                    }
                }
            }
        }

        self.remove(&id);
        tracing::debug!(client_id = %id, "websocket client disconnected");
    }

    /// Decodes every complete frame at the front of `buf`, dispatching
    /// each. Returns `false` if a close frame was seen (caller should stop
    /// the connection).
    fn drain_frames(&self, id: &ClientId, buf: &mut Vec<u8>) -> bool {
        loop {
            let Some((frame, consumed)) = frame::decode_frame(buf) else {
                break;
            };
            buf.drain(..consumed);
            if !self.handle_frame(id, frame) {
                return false;
            }
        }
        true
    }

    fn handle_frame(&self, id: &ClientId, frame: Frame) -> bool {
        match frame.opcode {
            OP_CLOSE => return false,
            OP_PING | OP_PONG => {}
            OP_TEXT => {
                if let Some(text) = frame.as_text() {
                    self.handle_text_message(id, &text);
                }
            }
            _ => {}
        }
        true
    }

    fn handle_text_message(&self, id: &ClientId, text: &str) {
        let Ok(message) = serde_json::from_str::<ClientMessage>(text) else {
            tracing::debug!(client_id = %id, "ignoring unparseable websocket message");
            return;
        };
        let Some(handle) = self.handles.get(id) else {
            return;
        };
        *handle.last_seen.lock().unwrap() = now();
        match message {
            ClientMessage::Ping => {
                drop(handle);
                self.send_to(id, &ServerMessage::Pong);
            }
            ClientMessage::Subscribe { workspace_id } => {
                *handle.workspace_filter.lock().unwrap() = workspace_id;
            }
        }
    }
}
