#![allow(dead_code)]
use serde::{Deserialize, Serialize};

/// One running bot as reported by `/api/active_bots`. The client holds no
/// further identity: a session absent from the next listing is gone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSession {
    pub id: i64,
    pub instrument_type: String,
    pub strategy_name: String,
    pub trading_mode: String,
    pub initial_capital: f64,
    #[serde(default)]
    pub started_at: Option<String>,
}

/// Body for `POST /api/start_bot`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StartBotRequest {
    pub instrument_type: String,
    pub strategy: String,
    pub trading_mode: String,
    pub capital: f64,
    pub symbols: Vec<String>,
    pub strategy_params: StrategyParams,
}

/// Strategy-specific launch parameters. Untagged so the request body carries
/// exactly the selected strategy's keys and an empty object for anything else.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum StrategyParams {
    MovingAverage {
        fast_period: u32,
        slow_period: u32,
        capital_per_trade: u32,
    },
    Rsi {
        rsi_period: u32,
        oversold: u32,
        overbought: u32,
        capital_per_trade: u32,
    },
    Empty {},
}

impl StrategyParams {
    /// Defaults and ranges mirror the launcher form's inputs; out-of-range
    /// overrides are clamped rather than rejected.
    pub fn moving_average(
        fast_period: Option<u32>,
        slow_period: Option<u32>,
        capital_per_trade: Option<u32>,
    ) -> Self {
        StrategyParams::MovingAverage {
            fast_period: fast_period.unwrap_or(10).clamp(5, 50),
            slow_period: slow_period.unwrap_or(20).clamp(10, 100),
            capital_per_trade: capital_per_trade.unwrap_or(10_000).max(1_000),
        }
    }

    pub fn rsi(
        rsi_period: Option<u32>,
        oversold: Option<u32>,
        overbought: Option<u32>,
        capital_per_trade: Option<u32>,
    ) -> Self {
        StrategyParams::Rsi {
            rsi_period: rsi_period.unwrap_or(14).clamp(5, 30),
            oversold: oversold.unwrap_or(30).clamp(10, 40),
            overbought: overbought.unwrap_or(70).clamp(60, 90),
            capital_per_trade: capital_per_trade.unwrap_or(10_000).max(1_000),
        }
    }

    pub fn empty() -> Self {
        StrategyParams::Empty {}
    }
}

/// `{success, error?}` acknowledgement shared by start_bot and stop_bot.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandAck {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub session_id: Option<i64>,
}
