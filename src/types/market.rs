#![allow(dead_code)]
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Latest traded-price snapshot for one instrument. Identity is the symbol;
/// entries are replaced wholesale on every push event or poll response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub last_price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
}

impl Quote {
    pub fn is_up(&self) -> bool {
        self.change >= 0.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketStatus {
    pub is_open: bool,
    #[serde(default)]
    pub is_weekend: bool,
    #[serde(default)]
    pub current_day: Option<String>,
    #[serde(default)]
    pub current_time: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One entry of the market-watch listing. The server sends more fields
/// (last_price, change) but only the symbol is used: it seeds the push
/// subscription and the quote table fills in from there.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchEntry {
    pub symbol: String,
}

/// `log_update` push payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    #[serde(default = "default_log_level")]
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
}

fn default_log_level() -> String {
    "INFO".to_string()
}
