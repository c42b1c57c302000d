use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::types::{LogEntry, Quote};

/// Server-to-client notifications delivered over the persistent connection.
/// `Connected`/`Disconnected` are synthesized from transport state; the rest
/// map one-to-one onto the server's event names.
#[derive(Debug, Clone)]
pub enum PushEvent {
    MarketData(Quote),
    BotStatus(serde_json::Value),
    TradeExecuted(serde_json::Value),
    Log(LogEntry),
    Connected,
    Disconnected,
}

/// Wire envelope: `{"event": <name>, "data": <payload>}` both directions.
#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct Outbound<'a> {
    event: &'a str,
    data: serde_json::Value,
}

enum FeedCommand {
    Subscribe(Vec<String>),
}

/// Client half of the push connection. Sending is fire-and-forget; a command
/// issued while the link is down is replayed once it comes back.
#[derive(Clone)]
pub struct PushHandle {
    tx: mpsc::Sender<FeedCommand>,
}

impl PushHandle {
    pub async fn subscribe_market_data(&self, symbols: Vec<String>) {
        if self.tx.send(FeedCommand::Subscribe(symbols)).await.is_err() {
            warn!("push feed task is gone, subscription dropped");
        }
    }
}

pub struct PushFeed {
    url: String,
}

impl PushFeed {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }

    /// Spawns the connection task and returns the command handle plus the
    /// event stream. The task owns reconnection (5s delay) and re-sends the
    /// last market-data subscription after each reconnect.
    pub fn connect(self) -> (PushHandle, mpsc::Receiver<PushEvent>) {
        let (event_tx, event_rx) = mpsc::channel(1000);
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        tokio::spawn(run_feed(self.url, event_tx, cmd_rx));

        (PushHandle { tx: cmd_tx }, event_rx)
    }
}

async fn run_feed(
    url: String,
    events: mpsc::Sender<PushEvent>,
    mut commands: mpsc::Receiver<FeedCommand>,
) {
    let mut last_subscription: Option<Vec<String>> = None;

    loop {
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                info!("push feed connected: {}", url);
                if events.send(PushEvent::Connected).await.is_err() {
                    return;
                }

                let (mut write, mut read) = stream.split();

                if let Some(symbols) = &last_subscription {
                    if let Err(e) = write.send(subscribe_message(symbols)).await {
                        warn!("failed to replay subscription: {}", e);
                    }
                }

                loop {
                    tokio::select! {
                        msg = read.next() => match msg {
                            Some(Ok(Message::Text(text))) => {
                                if let Some(event) = parse_message(&text) {
                                    if events.send(event).await.is_err() {
                                        return;
                                    }
                                }
                            }
                            Some(Ok(Message::Ping(payload))) => {
                                let _ = write.send(Message::Pong(payload)).await;
                            }
                            Some(Ok(Message::Close(_))) => {
                                info!("push feed closed by server");
                                break;
                            }
                            Some(Err(e)) => {
                                error!("push feed error: {}", e);
                                break;
                            }
                            None => break,
                            _ => {}
                        },
                        Some(cmd) = commands.recv() => match cmd {
                            FeedCommand::Subscribe(symbols) => {
                                last_subscription = Some(symbols.clone());
                                if let Err(e) = write.send(subscribe_message(&symbols)).await {
                                    warn!("subscribe send failed: {}", e);
                                    break;
                                }
                            }
                        },
                    }
                }

                if events.send(PushEvent::Disconnected).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                error!("push feed connect failed: {}", e);
                if events.send(PushEvent::Disconnected).await.is_err() {
                    return;
                }
            }
        }

        warn!("push feed reconnecting in 5s...");
        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
    }
}

fn subscribe_message(symbols: &[String]) -> Message {
    let envelope = Outbound {
        event: "subscribe_market_data",
        data: serde_json::json!({ "symbols": symbols }),
    };
    Message::Text(serde_json::to_string(&envelope).unwrap_or_default())
}

fn parse_message(text: &str) -> Option<PushEvent> {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            debug!("unparseable push message ({}): {}", e, text);
            return None;
        }
    };

    match envelope.event.as_str() {
        "market_data_update" => match serde_json::from_value::<Quote>(envelope.data) {
            Ok(quote) => Some(PushEvent::MarketData(quote)),
            Err(e) => {
                warn!("bad market_data_update payload: {}", e);
                None
            }
        },
        "bot_status_update" => Some(PushEvent::BotStatus(envelope.data)),
        "trade_executed" => Some(PushEvent::TradeExecuted(envelope.data)),
        "log_update" => match serde_json::from_value::<LogEntry>(envelope.data) {
            Ok(entry) => Some(PushEvent::Log(entry)),
            Err(e) => {
                warn!("bad log_update payload: {}", e);
                None
            }
        },
        other => {
            debug!("ignoring push event: {}", other);
            None
        }
    }
}
