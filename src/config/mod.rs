use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub poll: PollSettings,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub base_url: String,
    pub ws_url: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            ws_url: "ws://localhost:5000/ws".to_string(),
        }
    }
}

/// Poll cadences. These are consistency backstops on top of the push feed,
/// not the primary data path, so the defaults are deliberately coarse for
/// everything except the market-status clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub market_status_ms: u64,
    pub active_bots_ms: u64,
    pub portfolio_ms: u64,
    pub order_history_limit: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            market_status_ms: 1_000,
            active_bots_ms: 10_000,
            portfolio_ms: 30_000,
            order_history_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub frame_ms: u64,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self { frame_ms: 250 }
    }
}

impl Settings {
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.base_url.is_empty() {
            errors.push("server.base_url must not be empty".to_string());
        }
        if self.server.ws_url.is_empty() {
            errors.push("server.ws_url must not be empty".to_string());
        }
        if self.poll.market_status_ms == 0
            || self.poll.active_bots_ms == 0
            || self.poll.portfolio_ms == 0
        {
            errors.push("poll intervals must be > 0".to_string());
        }
        if self.poll.order_history_limit == 0 {
            errors.push("poll.order_history_limit must be > 0".to_string());
        }
        if self.display.frame_ms == 0 {
            errors.push("display.frame_ms must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Missing file means defaults; a present-but-broken file is an error.
pub fn load(path: &Path) -> Result<Settings> {
    if !path.exists() {
        info!("no config file at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let settings: Settings =
        toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(settings)
}
