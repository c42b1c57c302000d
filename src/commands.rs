use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::render::NoticeLevel;
use crate::transport::{ApiError, BotApi};
use crate::types::{StartBotRequest, StrategyParams};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start(StartBotRequest),
    Stop(i64),
    Refresh,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0} (try 'help')")]
    Unknown(String),
    #[error("usage: start <strategy> [instrument=stocks] [mode=paper] [capital=100000] [symbols=A,B] [param=value ...]")]
    StartUsage,
    #[error("usage: stop <id>")]
    StopUsage,
    #[error("invalid value for {0}")]
    BadValue(String),
}

/// Operator input line -> command. The launcher grammar mirrors the original
/// form: free-form key=value fields with per-strategy parameters; anything
/// unrecognized is ignored rather than rejected.
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let mut parts = line.split_whitespace();
    match parts.next() {
        None => Err(ParseError::Empty),
        Some("start") => parse_start(parts),
        Some("stop") => {
            let id = parts
                .next()
                .ok_or(ParseError::StopUsage)?
                .parse::<i64>()
                .map_err(|_| ParseError::StopUsage)?;
            Ok(Command::Stop(id))
        }
        Some("refresh") => Ok(Command::Refresh),
        Some("help") => Ok(Command::Help),
        Some("quit") | Some("exit") => Ok(Command::Quit),
        Some(other) => Err(ParseError::Unknown(other.to_string())),
    }
}

fn parse_start<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Command, ParseError> {
    let mut parts = parts;
    let strategy = parts.next().ok_or(ParseError::StartUsage)?.to_string();

    let mut fields: HashMap<&str, &str> = HashMap::new();
    for part in parts {
        match part.split_once('=') {
            Some((key, value)) => {
                fields.insert(key, value);
            }
            None => return Err(ParseError::StartUsage),
        }
    }

    let instrument_type = fields.remove("instrument").unwrap_or("stocks").to_string();
    let trading_mode = fields.remove("mode").unwrap_or("paper").to_string();
    let capital = match fields.remove("capital") {
        Some(raw) => raw
            .parse::<f64>()
            .map_err(|_| ParseError::BadValue("capital".to_string()))?,
        None => 100_000.0,
    };
    let symbols = fields
        .remove("symbols")
        .map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let strategy_params = match strategy.as_str() {
        "moving_average" => StrategyParams::moving_average(
            field_u32(&mut fields, "fast_period")?,
            field_u32(&mut fields, "slow_period")?,
            field_u32(&mut fields, "capital_per_trade")?,
        ),
        "rsi" => StrategyParams::rsi(
            field_u32(&mut fields, "rsi_period")?,
            field_u32(&mut fields, "oversold")?,
            field_u32(&mut fields, "overbought")?,
            field_u32(&mut fields, "capital_per_trade")?,
        ),
        // Not rejected here; the server decides what strategies exist.
        _ => StrategyParams::empty(),
    };

    for key in fields.keys() {
        debug!("ignoring unknown start field: {}", key);
    }

    Ok(Command::Start(StartBotRequest {
        instrument_type,
        strategy,
        trading_mode,
        capital,
        symbols,
        strategy_params,
    }))
}

fn field_u32(fields: &mut HashMap<&str, &str>, key: &'static str) -> Result<Option<u32>, ParseError> {
    match fields.remove(key) {
        Some(raw) => raw
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ParseError::BadValue(key.to_string())),
        None => Ok(None),
    }
}

/// Outcome of a dispatched command, applied to the view by the session.
#[derive(Debug, Default)]
pub struct CommandReport {
    pub notices: Vec<(NoticeLevel, String)>,
    pub refresh_bots: bool,
    pub refresh_portfolio: bool,
}

impl CommandReport {
    fn notice(mut self, level: NoticeLevel, message: impl Into<String>) -> Self {
        self.notices.push((level, message.into()));
        self
    }
}

/// User-initiated writes surface their failures as notifications, with the
/// server's error text when it sent one. No retries.
pub async fn run_command(api: &dyn BotApi, command: Command) -> CommandReport {
    match command {
        Command::Start(request) => match api.start_bot(&request).await {
            Ok(ack) if ack.success => CommandReport {
                refresh_bots: true,
                ..Default::default()
            }
            .notice(NoticeLevel::Success, "Trading bot started successfully!"),
            Ok(ack) => CommandReport::default().notice(
                NoticeLevel::Error,
                format!(
                    "Failed to start bot: {}",
                    ack.error.as_deref().unwrap_or("Unknown error")
                ),
            ),
            Err(ApiError::Server(message)) => CommandReport::default().notice(
                NoticeLevel::Error,
                format!("Failed to start bot: {}", message),
            ),
            Err(ApiError::Http(_)) => CommandReport::default()
                .notice(NoticeLevel::Error, "Network error while starting bot"),
        },
        Command::Stop(id) => match api.stop_bot(id).await {
            Ok(ack) if ack.success => CommandReport {
                refresh_bots: true,
                ..Default::default()
            }
            .notice(NoticeLevel::Success, "Bot stopped successfully"),
            Ok(_) => CommandReport::default().notice(NoticeLevel::Error, "Failed to stop bot"),
            Err(ApiError::Server(message)) => CommandReport::default().notice(
                NoticeLevel::Error,
                format!("Failed to stop bot: {}", message),
            ),
            Err(ApiError::Http(_)) => CommandReport::default()
                .notice(NoticeLevel::Error, "Network error while stopping bot"),
        },
        Command::Refresh => CommandReport {
            refresh_bots: true,
            refresh_portfolio: true,
            ..Default::default()
        },
        Command::Help => CommandReport::default().notice(
            NoticeLevel::Info,
            "strategies: moving_average (fast_period, slow_period, capital_per_trade), rsi (rsi_period, oversold, overbought, capital_per_trade)",
        ),
        // Handled by the session loop before dispatch.
        Command::Quit => CommandReport::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockBotApi;
    use crate::types::CommandAck;
    use serde_json::json;

    #[test]
    fn start_builds_defaults_for_moving_average() {
        let Command::Start(request) = parse("start moving_average symbols=TCS,SBIN").unwrap()
        else {
            panic!("expected start command");
        };
        assert_eq!(request.instrument_type, "stocks");
        assert_eq!(request.trading_mode, "paper");
        assert_eq!(request.capital, 100_000.0);
        assert_eq!(request.symbols, vec!["TCS", "SBIN"]);
        assert_eq!(
            serde_json::to_value(&request.strategy_params).unwrap(),
            json!({"fast_period": 10, "slow_period": 20, "capital_per_trade": 10000})
        );
    }

    #[test]
    fn start_rsi_overrides_omit_other_strategy_keys() {
        let Command::Start(request) =
            parse("start rsi rsi_period=21 capital=50000 mode=live").unwrap()
        else {
            panic!("expected start command");
        };
        assert_eq!(request.trading_mode, "live");
        assert_eq!(request.capital, 50_000.0);
        let params = serde_json::to_value(&request.strategy_params).unwrap();
        assert_eq!(
            params,
            json!({"rsi_period": 21, "oversold": 30, "overbought": 70, "capital_per_trade": 10000})
        );
        assert!(params.get("fast_period").is_none());
    }

    #[test]
    fn unknown_strategy_gets_empty_params_without_rejection() {
        let Command::Start(request) = parse("start breakout symbols=NIFTY").unwrap() else {
            panic!("expected start command");
        };
        assert_eq!(
            serde_json::to_value(&request.strategy_params).unwrap(),
            json!({})
        );
    }

    #[test]
    fn parse_errors() {
        assert_eq!(parse(""), Err(ParseError::Empty));
        assert_eq!(parse("stop"), Err(ParseError::StopUsage));
        assert_eq!(parse("stop seven"), Err(ParseError::StopUsage));
        assert!(matches!(parse("launch rsi"), Err(ParseError::Unknown(_))));
        assert_eq!(
            parse("start rsi rsi_period=abc"),
            Err(ParseError::BadValue("rsi_period".to_string()))
        );
        assert_eq!(parse("stop 7"), Ok(Command::Stop(7)));
    }

    fn start_request() -> StartBotRequest {
        StartBotRequest {
            instrument_type: "stocks".to_string(),
            strategy: "rsi".to_string(),
            trading_mode: "paper".to_string(),
            capital: 100_000.0,
            symbols: vec!["TCS".to_string()],
            strategy_params: StrategyParams::rsi(None, None, None, None),
        }
    }

    #[tokio::test]
    async fn start_success_notifies_and_requests_bot_refresh() {
        let mut api = MockBotApi::new();
        api.expect_start_bot()
            .withf(|request| request.strategy == "rsi")
            .returning(|_| {
                Ok(CommandAck {
                    success: true,
                    error: None,
                    session_id: Some(9),
                })
            });

        let report = run_command(&api, Command::Start(start_request())).await;
        assert!(report.refresh_bots);
        assert!(report
            .notices
            .iter()
            .any(|(level, message)| *level == NoticeLevel::Success && message.contains("started")));
    }

    #[tokio::test]
    async fn start_failure_surfaces_server_error_text() {
        let mut api = MockBotApi::new();
        api.expect_start_bot().returning(|_| {
            Ok(CommandAck {
                success: false,
                error: Some("Invalid strategy parameters".to_string()),
                session_id: None,
            })
        });

        let report = run_command(&api, Command::Start(start_request())).await;
        assert!(!report.refresh_bots);
        assert!(report
            .notices
            .iter()
            .any(|(_, message)| message.contains("Invalid strategy parameters")));
    }

    #[tokio::test]
    async fn start_failure_without_error_uses_generic_fallback() {
        let mut api = MockBotApi::new();
        api.expect_start_bot().returning(|_| {
            Ok(CommandAck {
                success: false,
                error: None,
                session_id: None,
            })
        });

        let report = run_command(&api, Command::Start(start_request())).await;
        assert!(report
            .notices
            .iter()
            .any(|(_, message)| message.contains("Unknown error")));
    }

    #[tokio::test]
    async fn stop_success_refreshes_bots() {
        let mut api = MockBotApi::new();
        api.expect_stop_bot()
            .withf(|id| *id == 7)
            .returning(|_| {
                Ok(CommandAck {
                    success: true,
                    error: None,
                    session_id: None,
                })
            });

        let report = run_command(&api, Command::Stop(7)).await;
        assert!(report.refresh_bots);
    }

    #[tokio::test]
    async fn stop_failure_is_generic() {
        let mut api = MockBotApi::new();
        api.expect_stop_bot().returning(|_| {
            Ok(CommandAck {
                success: false,
                error: None,
                session_id: None,
            })
        });

        let report = run_command(&api, Command::Stop(7)).await;
        assert!(report
            .notices
            .iter()
            .any(|(level, message)| *level == NoticeLevel::Error
                && message == "Failed to stop bot"));
    }
}
