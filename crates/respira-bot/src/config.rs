//! Bot configuration, loaded from a TOML file.

use respira_core::{RespiraError, RespiraResult};
use respira_dialog::MessageCatalog;
use serde::Deserialize;

/// Top-level configuration for the bot process.
#[derive(Debug, Deserialize)]
pub struct RespiraConfig {
    /// Telegram tokens and polling settings.
    pub telegram: TelegramConfig,
    /// Session inactivity settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Spreadsheet destinations.
    pub sheets: SheetsConfig,
    /// Message-text catalog consumed by the dialog engine.
    #[serde(default)]
    pub messages: MessageCatalog,
}

/// Telegram settings.
#[derive(Debug, Deserialize)]
pub struct TelegramConfig {
    /// Bot token for the development bot.
    pub dev_token: String,
    /// Bot token for the production bot.
    pub production_token: String,
    /// Capacity of the inbound turn buffer.
    #[serde(default = "default_turn_buffer")]
    pub turn_buffer: usize,
}

/// Session inactivity settings.
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    /// A session idle longer than this many seconds times out.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// How often the timeout sweeper runs.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Spreadsheet destination settings.
#[derive(Debug, Deserialize)]
pub struct SheetsConfig {
    /// Primary spreadsheet id.
    pub spreadsheet: String,
    /// Backup spreadsheet id; receives an identical row per record.
    pub backup_spreadsheet: String,
    /// Bearer token with write scope for both spreadsheets.
    pub access_token: String,
    /// Sheet receiving confirm-branch records.
    #[serde(default = "default_confirmed_sheet")]
    pub confirmed_sheet: String,
    /// Sheet receiving schedule-branch records.
    #[serde(default = "default_scheduled_sheet")]
    pub scheduled_sheet: String,
    /// API base URL override (tests / proxies).
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_turn_buffer() -> usize {
    64
}
fn default_timeout_secs() -> u64 {
    300
}
fn default_sweep_interval_secs() -> u64 {
    30
}
fn default_confirmed_sheet() -> String {
    "Confirmadas".to_string()
}
fn default_scheduled_sheet() -> String {
    "Programadas".to_string()
}

impl RespiraConfig {
    /// Parses a TOML configuration document.
    pub fn from_toml(raw: &str) -> RespiraResult<Self> {
        toml::from_str(raw).map_err(|e| RespiraError::Config(format!("Invalid config: {e}")))
    }

    /// The bot token for the selected run mode.
    pub fn token(&self, production: bool) -> &str {
        if production {
            &self.telegram.production_token
        } else {
            &self.telegram.dev_token
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [telegram]
        dev_token = "dev-tok"
        production_token = "prod-tok"

        [sheets]
        spreadsheet = "sheet-main"
        backup_spreadsheet = "sheet-backup"
        access_token = "bearer-tok"
    "#;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = RespiraConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.session.timeout_secs, 300);
        assert_eq!(config.session.sweep_interval_secs, 30);
        assert_eq!(config.sheets.confirmed_sheet, "Confirmadas");
        assert_eq!(config.sheets.scheduled_sheet, "Programadas");
        assert_eq!(config.telegram.turn_buffer, 64);
        assert_eq!(config.messages.apology_leads.len(), 3);
    }

    #[test]
    fn test_token_selection() {
        let config = RespiraConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.token(false), "dev-tok");
        assert_eq!(config.token(true), "prod-tok");
    }

    #[test]
    fn test_catalog_overrides() {
        let raw = format!(
            "{MINIMAL}\n[messages]\napology_leads = [\"Eh, \"]\napology_follows = [\", usa los botones\"]\n"
        );
        let config = RespiraConfig::from_toml(&raw).unwrap();
        assert_eq!(config.messages.apology_leads, vec!["Eh, ".to_string()]);
    }

    #[test]
    fn test_missing_tokens_is_an_error() {
        let err = RespiraConfig::from_toml("[sheets]\nspreadsheet = \"x\"").unwrap_err();
        assert!(err.to_string().contains("Config"));
    }
}
