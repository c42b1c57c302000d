use std::collections::VecDeque;
use std::fmt::Write as _;
use std::time::{Duration, Instant};

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;

use crate::render::format::{fixed2, format_count, format_inr, ist_clock};
use crate::render::table::{Cell, KeyedTable};
use crate::state::StateCache;
use crate::types::Quote;

/// Notifications auto-expire; nothing is correctness-bearing here.
const NOTICE_TTL: Duration = Duration::from_secs(5);
const MAX_LOG_LINES: usize = 100;
const LOG_TAIL_SHOWN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    fn tag(self) -> &'static str {
        match self {
            NoticeLevel::Info => "[i]",
            NoticeLevel::Success => "[+]",
            NoticeLevel::Warning => "[!]",
            NoticeLevel::Error => "[x]",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct NotificationLog {
    notices: VecDeque<Notice>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>, now: Instant) {
        self.notices.push_back(Notice {
            level,
            message: message.into(),
            expires_at: now + NOTICE_TTL,
        });
    }

    pub fn prune(&mut self, now: Instant) {
        self.notices.retain(|n| n.expires_at > now);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.notices.iter().any(|n| n.message.contains(needle))
    }
}

/// Presentation state layered over the cache: the keyed quote table (row
/// identity, transient highlights), the notification area and the log tail.
/// Everything else is projected straight from the StateCache per frame.
pub struct DashboardView {
    pub market_watch: KeyedTable,
    pub notices: NotificationLog,
    logs: VecDeque<String>,
}

impl DashboardView {
    pub fn new() -> Self {
        Self {
            market_watch: KeyedTable::new(vec![
                "Symbol", "LTP", "Change", "Change %", "Volume", "Open", "High", "Low", "Close",
            ]),
            notices: NotificationLog::new(),
            logs: VecDeque::new(),
        }
    }

    pub fn apply_quote(&mut self, quote: &Quote, now: Instant) {
        self.market_watch
            .upsert(&quote.symbol, quote_cells(quote), now);
    }

    pub fn push_log(&mut self, line: impl Into<String>) {
        self.logs.push_back(line.into());
        if self.logs.len() > MAX_LOG_LINES {
            self.logs.pop_front();
        }
    }

    /// Frame-tick housekeeping: expired highlights and notices drop out.
    pub fn tick(&mut self, now: Instant) {
        self.market_watch.clear_expired(now);
        self.notices.prune(now);
    }

    pub fn render(&self, cache: &StateCache, now: Instant) -> String {
        let mut out = String::with_capacity(4096);

        self.render_header(cache, &mut out);
        self.render_summary(cache, &mut out);

        out.push_str("\nMarket Watch\n");
        if self.market_watch.is_empty() {
            out.push_str("  Waiting for market data...\n");
        } else {
            self.market_watch.render_into(&mut out, now);
        }

        self.render_bots(cache, &mut out);
        self.render_positions(cache, &mut out);
        self.render_orders(cache, &mut out);

        for notice in self.notices.iter() {
            let _ = writeln!(out, "{} {}", notice.level.tag(), notice.message);
        }

        if !self.logs.is_empty() {
            out.push_str("\nActivity\n");
            let skip = self.logs.len().saturating_sub(LOG_TAIL_SHOWN);
            for line in self.logs.iter().skip(skip) {
                let _ = writeln!(out, "  {}", line);
            }
        }

        out.push_str("\ncommands: start <strategy> [key=value ...] | stop <id> | refresh | help | quit\n");
        out
    }

    fn render_header(&self, cache: &StateCache, out: &mut String) {
        let market = match &cache.market {
            Some(status) if status.is_open => "MARKET OPEN",
            Some(_) => "MARKET CLOSED",
            None => "MARKET --",
        };
        let link = if cache.connected {
            "connected"
        } else {
            "disconnected"
        };
        let _ = writeln!(
            out,
            "Trading Bot Dashboard  |  {}  |  {} IST  |  push: {}",
            market,
            ist_clock(Utc::now()),
            link
        );
        if let Some(message) = cache.market.as_ref().and_then(|m| m.message.as_deref()) {
            let _ = writeln!(out, "  {}", message);
        }
    }

    fn render_summary(&self, cache: &StateCache, out: &mut String) {
        let summary = cache.portfolio_summary();
        let _ = writeln!(
            out,
            "Portfolio {}  |  P&L {}  |  Cash {}",
            format_inr(summary.total_value.to_f64().unwrap_or_default()),
            format_inr(summary.total_pnl.to_f64().unwrap_or_default()),
            format_inr(summary.available_cash.to_f64().unwrap_or_default()),
        );
    }

    /// No per-row identity to preserve: the whole section regenerates from
    /// the latest listing.
    fn render_bots(&self, cache: &StateCache, out: &mut String) {
        out.push_str("\nActive Bots\n");
        if cache.bots.is_empty() {
            out.push_str("  No active bots\n");
            return;
        }
        for bot in &cache.bots {
            let _ = writeln!(
                out,
                "  [#{}] {}  {} \u{2022} {} \u{2022} {}  RUNNING  (stop {})",
                bot.id,
                bot.strategy_name,
                bot.instrument_type.to_uppercase(),
                bot.trading_mode.to_uppercase(),
                format_inr(bot.initial_capital),
                bot.id,
            );
        }
    }

    fn render_positions(&self, cache: &StateCache, out: &mut String) {
        if cache.positions.is_empty() {
            return;
        }
        out.push_str("\nPositions\n");
        let rows: Vec<Vec<Cell>> = cache
            .positions
            .iter()
            .map(|p| {
                vec![
                    Cell::strong(&p.symbol),
                    Cell::plain(p.quantity.to_string()),
                    Cell::plain(fixed2(p.average_price)),
                    Cell::plain(format_inr(p.invested_amount)),
                    Cell::plain(fixed2(p.current_price)),
                    Cell::signed(format_inr(p.unrealized_pnl), p.unrealized_pnl >= 0.0),
                ]
            })
            .collect();
        render_plain(
            out,
            &["Symbol", "Qty", "Avg Price", "Invested", "LTP", "P&L"],
            &rows,
        );
    }

    fn render_orders(&self, cache: &StateCache, out: &mut String) {
        if cache.orders.is_empty() {
            return;
        }
        out.push_str("\nRecent Orders\n");
        let rows: Vec<Vec<Cell>> = cache
            .orders
            .iter()
            .map(|o| {
                let time = o
                    .timestamp
                    .map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string());
                vec![
                    Cell::plain(time),
                    Cell::strong(&o.symbol),
                    Cell::signed(&o.action, o.action.eq_ignore_ascii_case("buy")),
                    Cell::plain(o.quantity.to_string()),
                    Cell::plain(fixed2(o.price)),
                    Cell::plain(&o.status),
                ]
            })
            .collect();
        render_plain(
            out,
            &["Time", "Symbol", "Action", "Qty", "Price", "Status"],
            &rows,
        );
    }
}

impl Default for DashboardView {
    fn default() -> Self {
        Self::new()
    }
}

fn quote_cells(quote: &Quote) -> Vec<Cell> {
    let up = quote.is_up();
    vec![
        Cell::strong(&quote.symbol),
        Cell::plain(fixed2(quote.last_price)),
        Cell::signed(fixed2(quote.change), up),
        Cell::signed(format!("{}%", fixed2(quote.change_percent)), up),
        Cell::plain(format_count(quote.volume)),
        Cell::plain(fixed2(quote.open)),
        Cell::plain(fixed2(quote.high)),
        Cell::plain(fixed2(quote.low)),
        Cell::plain(fixed2(quote.close)),
    ]
}

/// Width-aligned dump without keyed rows or highlights, for the list-shaped
/// sections that fully regenerate.
fn render_plain(out: &mut String, columns: &[&str], rows: &[Vec<Cell>]) {
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.text.chars().count());
            }
        }
    }
    for (i, column) in columns.iter().enumerate() {
        let _ = write!(out, "  {:width$}", column, width = widths[i]);
    }
    out.push('\n');
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            let width = widths.get(i).copied().unwrap_or(0);
            let _ = write!(out, "  {:width$}", cell.text, width = width);
        }
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BotSession;

    fn quote(symbol: &str, last_price: f64) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            last_price,
            change: 2.0,
            change_percent: 0.2,
            volume: 1000,
            open: last_price,
            high: last_price,
            low: last_price,
            close: last_price,
            timestamp: None,
        }
    }

    #[test]
    fn empty_bot_list_renders_placeholder() {
        let view = DashboardView::new();
        let cache = StateCache::new();
        let frame = view.render(&cache, Instant::now());
        assert!(frame.contains("No active bots"));
    }

    #[test]
    fn bot_list_replaces_placeholder() {
        let view = DashboardView::new();
        let mut cache = StateCache::new();
        cache.bots.push(BotSession {
            id: 3,
            instrument_type: "stocks".to_string(),
            strategy_name: "RSI Strategy".to_string(),
            trading_mode: "paper".to_string(),
            initial_capital: 100000.0,
            started_at: None,
        });

        let frame = view.render(&cache, Instant::now());
        assert!(!frame.contains("No active bots"));
        assert!(frame.contains("RSI Strategy"));
        assert!(frame.contains("STOCKS \u{2022} PAPER \u{2022} ₹1,00,000.00"));
        assert!(frame.contains("stop 3"));
    }

    #[test]
    fn repeated_quote_updates_keep_one_row() {
        let mut view = DashboardView::new();
        let now = Instant::now();
        view.apply_quote(&quote("NIFTY", 19500.0), now);
        view.apply_quote(&quote("NIFTY", 19512.0), now);
        view.apply_quote(&quote("NIFTY", 19498.5), now);

        assert_eq!(view.market_watch.len(), 1);
        assert_eq!(view.market_watch.row("NIFTY").unwrap()[1].text, "19498.50");
    }

    #[test]
    fn notices_expire_after_five_seconds() {
        let mut view = DashboardView::new();
        let now = Instant::now();
        view.notices
            .push(NoticeLevel::Error, "Failed to start bot: boom", now);
        assert!(view.notices.contains("boom"));

        view.tick(now + Duration::from_millis(4_999));
        assert!(view.notices.contains("boom"));

        view.tick(now + Duration::from_millis(5_001));
        assert!(!view.notices.contains("boom"));
    }
}
