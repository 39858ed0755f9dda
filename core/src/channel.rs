/// Conversation-scoped push channel
///
/// One authenticated websocket per selected conversation. The connection is
/// owned by a spawned reader task that yields tagged events over an mpsc in
/// arrival order; the consumer runs a single dispatch loop instead of
/// juggling on-message/on-error callbacks. There is no automatic reconnect:
/// a dropped channel degrades the view to backfill-only until the
/// conversation is reselected.
use crate::error::{ChatError, Result};
use crate::types::PushEvent;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};
use url::Url;

/// Channel lifecycle and payload events, in arrival order
#[derive(Debug)]
pub enum ChannelEvent {
    Connected,
    Push(PushEvent),
    /// Non-fatal: the view keeps working through history fetches
    Error(String),
    Closed,
}

pub struct ChatChannel {
    listing_id: i64,
    task: tokio::task::JoinHandle<()>,
    closed: bool,
}

impl ChatChannel {
    /// Open the push channel for one listing. Fails with an authentication
    /// error before any network activity when no credential is present; the
    /// connection itself is established by the reader task, which reports
    /// failures as `ChannelEvent::Error`.
    pub fn open(
        ws_base_url: &str,
        access_token: Option<&str>,
        listing_id: i64,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ChannelEvent>)> {
        let token = access_token
            .ok_or_else(|| ChatError::Authentication("authentication token not found".to_string()))?;

        let url = channel_url(ws_base_url, listing_id, token)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_channel(url, listing_id, tx));

        Ok((
            Self {
                listing_id,
                task,
                closed: false,
            },
            rx,
        ))
    }

    /// Idempotent: safe on an already-closed handle
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.task.abort();
        debug!(listing_id = self.listing_id, "push channel closed");
    }

    pub fn listing_id(&self) -> i64 {
        self.listing_id
    }
}

impl Drop for ChatChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Build `{base}/chat/ws/{listing_id}/{token}` with the token
/// percent-encoded as a path segment
fn channel_url(ws_base_url: &str, listing_id: i64, token: &str) -> Result<String> {
    let mut url = Url::parse(ws_base_url)
        .map_err(|e| ChatError::Channel(format!("invalid channel base url: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| ChatError::Channel("channel base url cannot carry a path".to_string()))?
        .pop_if_empty()
        .extend(["chat", "ws"])
        .push(&listing_id.to_string())
        .push(token);
    Ok(url.into())
}

async fn run_channel(url: String, listing_id: i64, tx: mpsc::UnboundedSender<ChannelEvent>) {
    let ws_stream = match connect_async(&url).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            warn!(listing_id, "push channel connect failed: {}", e);
            let _ = tx.send(ChannelEvent::Error(format!("connect failed: {}", e)));
            let _ = tx.send(ChannelEvent::Closed);
            return;
        }
    };

    debug!(listing_id, "push channel connected");
    if tx.send(ChannelEvent::Connected).is_err() {
        return;
    }

    let (_, mut receiver) = ws_stream.split();

    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<PushEvent>(&text) {
                Ok(event) => {
                    if tx.send(ChannelEvent::Push(event)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    // Unknown event shapes are skipped, not fatal
                    debug!(listing_id, "ignoring unparseable push: {}", e);
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(listing_id, "push channel dropped: {}", e);
                let _ = tx.send(ChannelEvent::Error(e.to_string()));
                break;
            }
        }
    }

    let _ = tx.send(ChannelEvent::Closed);
}
