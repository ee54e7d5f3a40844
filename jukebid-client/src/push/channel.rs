//! Push channel transport
//!
//! Connects to the per-party event stream, decodes frames, and feeds
//! messages to the session over an unbounded channel. Reconnects with
//! exponential backoff; one malformed frame is dropped and logged, it
//! never tears down a live session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use jukebid_core::config::PushConfig;
use jukebid_core::models::PartyId;
use jukebid_core::{Error, Result};

use super::message::PartyMessage;

/// Raw frame source for one party's event stream.
///
/// Implementations own the wire protocol; the channel owns reconnect,
/// decode, and delivery.
#[async_trait]
pub trait PushTransport: Send + Sync + 'static {
    /// Open the stream, yielding one raw JSON frame per message
    async fn connect(&self, party_id: &PartyId) -> Result<BoxStream<'static, Result<String>>>;
}

/// Server-sent-events transport over HTTP
pub struct SseTransport {
    http: reqwest::Client,
    base_url: String,
}

impl SseTransport {
    /// Build the transport. The underlying client sets a connect timeout
    /// only; the event stream itself is long-lived and must not be
    /// subject to a request deadline.
    pub fn new(config: &PushConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PushTransport for SseTransport {
    async fn connect(&self, party_id: &PartyId) -> Result<BoxStream<'static, Result<String>>> {
        let url = format!("{}/parties/{}/events", self.base_url, party_id.as_str());

        let response = self
            .http
            .get(&url)
            .header("accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| Error::TransientNetwork(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::TransientNetwork(e.to_string()))?;

        let mut bytes = response.bytes_stream();

        let stream = async_stream::stream! {
            let mut buf = Vec::new();
            let mut data_lines: Vec<String> = Vec::new();

            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => buf.extend_from_slice(&chunk),
                    Err(e) => {
                        yield Err(Error::TransientNetwork(e.to_string()));
                        return;
                    }
                }

                while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line);
                    let line = line.trim_end_matches(['\n', '\r']);

                    if let Some(payload) = line.strip_prefix("data:") {
                        data_lines.push(payload.trim_start().to_string());
                    } else if line.is_empty() && !data_lines.is_empty() {
                        yield Ok(data_lines.join("\n"));
                        data_lines.clear();
                    }
                    // event:/id:/retry: fields and comments are ignored
                }
            }
        };

        Ok(stream.boxed())
    }
}

/// Decoded push messages for one party
pub struct PushChannel {
    messages: mpsc::UnboundedReceiver<PartyMessage>,
}

impl PushChannel {
    /// Spawn the channel task: connect (with backoff), decode, deliver.
    /// The task stops when this handle is dropped.
    #[must_use]
    pub fn spawn(transport: Arc<dyn PushTransport>, party_id: PartyId, config: &PushConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_channel(transport, party_id, config.clone(), tx));
        Self { messages: rx }
    }

    /// Next decoded message; None once the channel task has stopped
    pub async fn recv(&mut self) -> Option<PartyMessage> {
        self.messages.recv().await
    }
}

async fn run_channel(
    transport: Arc<dyn PushTransport>,
    party_id: PartyId,
    config: PushConfig,
    tx: mpsc::UnboundedSender<PartyMessage>,
) {
    loop {
        if tx.is_closed() {
            return;
        }

        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(config.reconnect_min_delay_ms))
            .with_max_delay(Duration::from_millis(config.reconnect_max_delay_ms))
            .with_jitter()
            .without_max_times();

        let connect = || {
            let transport = transport.clone();
            let party_id = party_id.clone();
            async move { transport.connect(&party_id).await }
        };

        let mut stream = match connect
            .retry(backoff)
            .notify(|err, delay| {
                warn!(
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "Push connect failed, retrying"
                );
            })
            .await
        {
            Ok(stream) => stream,
            Err(err) => {
                warn!(error = %err, "Push connect gave up");
                return;
            }
        };

        info!(party_id = %party_id.as_str(), "Push channel connected");

        while let Some(frame) = stream.next().await {
            let raw = match frame {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(error = %err, "Push stream error, reconnecting");
                    break;
                }
            };

            match serde_json::from_str::<PartyMessage>(&raw) {
                Ok(message) if message.party_id() == &party_id => {
                    debug!(
                        message_type = message.message_type(),
                        "Push message received"
                    );
                    if tx.send(message).is_err() {
                        return;
                    }
                }
                Ok(message) => {
                    debug!(
                        got = %message.party_id().as_str(),
                        "Push message for another party dropped"
                    );
                }
                Err(err) => {
                    warn!(error = %err, "Malformed push message dropped");
                }
            }
        }

        warn!(party_id = %party_id.as_str(), "Push channel disconnected, reconnecting");
    }
}
