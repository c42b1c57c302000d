#![allow(dead_code)]
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Symbol-scoped holding from `/api/positions`. Fully replaced on each
/// portfolio refresh; there is no client-side identity beyond listing order.
#[derive(Debug, Clone, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub average_price: f64,
    pub invested_amount: f64,
    #[serde(default)]
    pub current_price: f64,
    #[serde(default)]
    pub unrealized_pnl: f64,
}

/// Recent order record from `/api/orders?limit=N`. Read-only; the renderer
/// binds it to table columns and nothing else interprets it.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRecord {
    pub id: i64,
    pub symbol: String,
    pub action: String,
    pub quantity: i64,
    pub price: f64,
    #[serde(default)]
    pub order_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(default)]
    pub trading_mode: String,
}

/// Derived totals, never fetched or stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioSummary {
    pub total_value: Decimal,
    pub total_pnl: Decimal,
    pub available_cash: Decimal,
}
