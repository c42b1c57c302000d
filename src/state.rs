use std::collections::HashMap;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::types::{BotSession, MarketStatus, OrderRecord, PortfolioSummary, Position, Quote};

/// Cash the summary line assumes on top of invested value. The server does
/// not report available cash on the portfolio endpoints yet.
/// TODO: fetch /api/wallet_balance instead once the paper engine reports it.
pub const CASH_BASELINE: f64 = 1_000_000.0;

/// In-memory snapshot of everything the dashboard shows. Rebuilt from each
/// push event or poll response; nothing here survives the session.
#[derive(Debug, Default)]
pub struct StateCache {
    quotes: HashMap<String, Quote>,
    pub bots: Vec<BotSession>,
    pub positions: Vec<Position>,
    pub orders: Vec<OrderRecord>,
    pub market: Option<MarketStatus>,
    pub connected: bool,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last writer wins per symbol. No ordering metadata: a poll response
    /// landing after a newer push overwrites it and the next update corrects
    /// the row. Accepted per the single-value semantics of a quote.
    pub fn apply_quote(&mut self, quote: Quote) {
        self.quotes.insert(quote.symbol.clone(), quote);
    }

    pub fn quote(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(symbol)
    }

    pub fn quote_count(&self) -> usize {
        self.quotes.len()
    }

    /// Derived on demand, never stored. Decimal so the totals shown do not
    /// drift from summing many f64 amounts.
    pub fn portfolio_summary(&self) -> PortfolioSummary {
        let mut invested = Decimal::ZERO;
        let mut pnl = Decimal::ZERO;
        for position in &self.positions {
            invested += Decimal::from_f64(position.invested_amount).unwrap_or_default();
            pnl += Decimal::from_f64(position.unrealized_pnl).unwrap_or_default();
        }
        let cash = Decimal::from_f64(CASH_BASELINE).unwrap_or_default();
        PortfolioSummary {
            total_value: invested + cash,
            total_pnl: pnl,
            available_cash: cash,
        }
    }
}
