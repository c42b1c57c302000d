use std::io::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::commands::{self, Command, CommandReport, ParseError};
use crate::config::Settings;
use crate::render::{DashboardView, NoticeLevel};
use crate::scheduler::spawn_poller;
use crate::state::StateCache;
use crate::transport::{BotApi, HttpApi, PushEvent, PushFeed};
use crate::types::{BotSession, MarketStatus, OrderRecord, Position, WatchEntry};

/// Results flowing back into the session loop from loaders and dispatched
/// commands. Loaders race freely; whichever completes last wins in the cache.
enum AppEvent {
    MarketStatus(MarketStatus),
    Bots(Vec<BotSession>),
    Portfolio(Vec<Position>, Vec<OrderRecord>),
    Watchlist(Vec<WatchEntry>),
    Command(CommandReport),
    Input(String),
}

pub async fn run(settings: Settings) -> Result<()> {
    let api = Arc::new(HttpApi::new(&settings.server.base_url));
    let (push, mut push_rx) = PushFeed::new(&settings.server.ws_url).connect();
    let (tx, mut rx) = mpsc::channel::<AppEvent>(256);

    let mut cache = StateCache::new();
    let mut view = DashboardView::new();
    let order_limit = settings.poll.order_history_limit;

    // Initial load: all four endpoints concurrently, results land as events.
    tokio::spawn(load_market_status(Arc::clone(&api), tx.clone()));
    tokio::spawn(load_bots(Arc::clone(&api), tx.clone()));
    tokio::spawn(load_portfolio(Arc::clone(&api), tx.clone(), order_limit));
    tokio::spawn(load_watchlist(Arc::clone(&api), tx.clone()));

    let pollers = vec![
        {
            let api = Arc::clone(&api);
            let tx = tx.clone();
            spawn_poller(
                "market_status",
                Duration::from_millis(settings.poll.market_status_ms),
                move || load_market_status(Arc::clone(&api), tx.clone()),
            )
        },
        {
            let api = Arc::clone(&api);
            let tx = tx.clone();
            spawn_poller(
                "active_bots",
                Duration::from_millis(settings.poll.active_bots_ms),
                move || load_bots(Arc::clone(&api), tx.clone()),
            )
        },
        {
            let api = Arc::clone(&api);
            let tx = tx.clone();
            spawn_poller(
                "portfolio",
                Duration::from_millis(settings.poll.portfolio_ms),
                move || load_portfolio(Arc::clone(&api), tx.clone(), order_limit),
            )
        },
    ];

    // Operator input, one command per line.
    let input_tx = tx.clone();
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if input_tx.send(AppEvent::Input(line)).await.is_err() {
                break;
            }
        }
    });

    let mut frame = tokio::time::interval(Duration::from_millis(settings.display.frame_ms));
    let mut subscribed = false;

    info!("dashboard session started against {}", settings.server.base_url);

    loop {
        tokio::select! {
            Some(event) = push_rx.recv() => {
                handle_push(&mut cache, &mut view, event, Instant::now());
            }
            Some(event) = rx.recv() => {
                match event {
                    AppEvent::MarketStatus(status) => cache.market = Some(status),
                    AppEvent::Bots(bots) => cache.bots = bots,
                    AppEvent::Portfolio(positions, orders) => {
                        cache.positions = positions;
                        cache.orders = orders;
                    }
                    AppEvent::Watchlist(entries) => {
                        if !subscribed {
                            subscribed = true;
                            let symbols: Vec<String> =
                                entries.into_iter().map(|e| e.symbol).collect();
                            info!("subscribing to {} symbols", symbols.len());
                            push.subscribe_market_data(symbols).await;
                        }
                    }
                    AppEvent::Command(report) => {
                        let now = Instant::now();
                        for (level, message) in report.notices {
                            view.notices.push(level, message, now);
                        }
                        if report.refresh_bots {
                            tokio::spawn(load_bots(Arc::clone(&api), tx.clone()));
                        }
                        if report.refresh_portfolio {
                            tokio::spawn(load_portfolio(Arc::clone(&api), tx.clone(), order_limit));
                        }
                    }
                    AppEvent::Input(line) => match commands::parse(&line) {
                        Ok(Command::Quit) => break,
                        Ok(command) => {
                            let api = Arc::clone(&api);
                            let tx = tx.clone();
                            tokio::spawn(async move {
                                let report = commands::run_command(api.as_ref(), command).await;
                                let _ = tx.send(AppEvent::Command(report)).await;
                            });
                        }
                        Err(ParseError::Empty) => {}
                        Err(e) => {
                            view.notices
                                .push(NoticeLevel::Warning, e.to_string(), Instant::now());
                        }
                    },
                }
            }
            _ = frame.tick() => {
                let now = Instant::now();
                view.tick(now);
                draw(&view.render(&cache, now));
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    for poller in pollers {
        poller.stop();
    }

    Ok(())
}

// Background loaders. Failures are logged and swallowed: the view keeps its
// stale data until the next scheduled attempt, and the user is only notified
// about commands they issued themselves.

async fn load_market_status(api: Arc<HttpApi>, tx: mpsc::Sender<AppEvent>) {
    match api.market_status().await {
        Ok(status) => {
            let _ = tx.send(AppEvent::MarketStatus(status)).await;
        }
        Err(e) => warn!("market status load failed: {}", e),
    }
}

async fn load_bots(api: Arc<HttpApi>, tx: mpsc::Sender<AppEvent>) {
    match api.active_bots().await {
        Ok(bots) => {
            let _ = tx.send(AppEvent::Bots(bots)).await;
        }
        Err(e) => warn!("active bots load failed: {}", e),
    }
}

async fn load_portfolio(api: Arc<HttpApi>, tx: mpsc::Sender<AppEvent>, order_limit: u32) {
    let (positions, orders) = tokio::join!(api.positions(), api.recent_orders(order_limit));
    match (positions, orders) {
        (Ok(positions), Ok(orders)) => {
            let _ = tx.send(AppEvent::Portfolio(positions, orders)).await;
        }
        (Err(e), _) | (_, Err(e)) => warn!("portfolio load failed: {}", e),
    }
}

async fn load_watchlist(api: Arc<HttpApi>, tx: mpsc::Sender<AppEvent>) {
    match api.market_watch().await {
        Ok(entries) => {
            let _ = tx.send(AppEvent::Watchlist(entries)).await;
        }
        Err(e) => warn!("market watch load failed: {}", e),
    }
}

fn handle_push(cache: &mut StateCache, view: &mut DashboardView, event: PushEvent, now: Instant) {
    match event {
        PushEvent::MarketData(quote) => {
            view.apply_quote(&quote, now);
            cache.apply_quote(quote);
        }
        PushEvent::BotStatus(payload) => {
            view.push_log(bot_status_line(&payload));
        }
        PushEvent::TradeExecuted(payload) => {
            view.push_log(trade_line(&payload));
        }
        PushEvent::Log(entry) => {
            view.push_log(format!("{} {}", entry.level, entry.message));
        }
        PushEvent::Connected => {
            cache.connected = true;
            view.notices
                .push(NoticeLevel::Success, "Connected to trading server", now);
        }
        PushEvent::Disconnected => {
            cache.connected = false;
            view.notices
                .push(NoticeLevel::Warning, "Disconnected from trading server", now);
        }
    }
}

/// Rendered, not interpreted: pick the common fields when present and fall
/// back to the raw payload.
fn trade_line(payload: &serde_json::Value) -> String {
    match (
        payload.get("action").and_then(|v| v.as_str()),
        payload.get("symbol").and_then(|v| v.as_str()),
    ) {
        (Some(action), Some(symbol)) => {
            let quantity = payload.get("quantity").and_then(|v| v.as_i64()).unwrap_or(0);
            let price = payload.get("price").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let mode = payload.get("mode").and_then(|v| v.as_str()).unwrap_or("?");
            format!(
                "trade: {} {} {} @ {:.2} ({})",
                action, quantity, symbol, price, mode
            )
        }
        _ => format!("trade: {}", payload),
    }
}

fn bot_status_line(payload: &serde_json::Value) -> String {
    match payload.get("status").and_then(|v| v.as_str()) {
        Some(status) => {
            let id = payload
                .get("session_id")
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            format!("bot #{}: {}", id, status)
        }
        None => format!("bot status: {}", payload),
    }
}

fn draw(frame: &str) {
    let mut stdout = std::io::stdout();
    // Home + clear-to-end keeps the redraw flicker-free enough for a 250ms cadence.
    let _ = write!(stdout, "\x1b[H\x1b[2J{}", frame);
    let _ = stdout.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Quote;
    use serde_json::json;

    fn quote(symbol: &str, last_price: f64) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            last_price,
            change: -3.0,
            change_percent: -0.1,
            volume: 10,
            open: last_price,
            high: last_price,
            low: last_price,
            close: last_price,
            timestamp: None,
        }
    }

    #[test]
    fn market_data_push_updates_cache_and_view() {
        let mut cache = StateCache::new();
        let mut view = DashboardView::new();
        let now = Instant::now();

        handle_push(
            &mut cache,
            &mut view,
            PushEvent::MarketData(quote("ITC", 230.0)),
            now,
        );
        handle_push(
            &mut cache,
            &mut view,
            PushEvent::MarketData(quote("ITC", 231.5)),
            now,
        );

        assert_eq!(cache.quote("ITC").unwrap().last_price, 231.5);
        assert_eq!(view.market_watch.len(), 1);
    }

    #[test]
    fn connection_transitions_surface_notices() {
        let mut cache = StateCache::new();
        let mut view = DashboardView::new();
        let now = Instant::now();

        handle_push(&mut cache, &mut view, PushEvent::Connected, now);
        assert!(cache.connected);
        assert!(view.notices.contains("Connected to trading server"));

        handle_push(&mut cache, &mut view, PushEvent::Disconnected, now);
        assert!(!cache.connected);
        assert!(view.notices.contains("Disconnected from trading server"));
    }

    #[test]
    fn trade_line_prefers_structured_fields() {
        let line = trade_line(&json!({
            "session_id": 3,
            "symbol": "TCS",
            "action": "BUY",
            "quantity": 10,
            "price": 3400.5,
            "mode": "paper"
        }));
        assert_eq!(line, "trade: BUY 10 TCS @ 3400.50 (paper)");

        let raw = trade_line(&json!({"weird": true}));
        assert!(raw.starts_with("trade: "));
    }

    #[test]
    fn bot_status_line_reads_status_field() {
        let line = bot_status_line(&json!({"session_id": 4, "status": "started"}));
        assert_eq!(line, "bot #4: started");
    }
}
