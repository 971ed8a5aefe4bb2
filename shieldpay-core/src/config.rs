//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "app": { "demoMode": false, "pendingInputTimeoutSecs": 300 },
//!   "ledger": { "stableMint": "...", "shieldedMint": "...", "botAddress": "...", ... }
//! }
//! ```
//! Fields this crate does not manage are preserved on save.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::{AssetMints, Signer};

pub const DEFAULT_STABLE_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
pub const DEFAULT_SHIELDED_MINT: &str = "CNfuSdLitgsFyRKhpaAVA2WM9q8wbEgvksJRvwgVoak3";
pub const DEFAULT_BOT_ADDRESS: &str = "ErEBS6qJqRBmF8Brot77LyrGnGJgRijX1LudBjwN6EAs";
pub const DEFAULT_PENDING_INPUT_TIMEOUT_SECS: u64 = 300;
/// Longest a transfer conversation may wait for a recipient (30 days)
pub const MAX_PENDING_INPUT_TIMEOUT_SECS: u64 = 30 * 24 * 60 * 60;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    ledger: LedgerSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    demo_mode: bool,
    #[serde(default = "default_timeout")]
    pending_input_timeout_secs: u64,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            demo_mode: false,
            pending_input_timeout_secs: DEFAULT_PENDING_INPUT_TIMEOUT_SECS,
            other: HashMap::new(),
        }
    }
}

fn default_timeout() -> u64 {
    DEFAULT_PENDING_INPUT_TIMEOUT_SECS
}

/// Ledger constants and tool locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedgerSettings {
    pub stable_mint: String,
    pub shielded_mint: String,
    pub bot_address: String,
    /// Bot keypair file; relative paths resolve against the data directory
    pub bot_keypair: PathBuf,
    pub solana_cli: String,
    pub spl_token_cli: String,
    pub rpc_url: Option<String>,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            stable_mint: DEFAULT_STABLE_MINT.to_string(),
            shielded_mint: DEFAULT_SHIELDED_MINT.to_string(),
            bot_address: DEFAULT_BOT_ADDRESS.to_string(),
            bot_keypair: PathBuf::from("bot_keypair").join(format!("{}.json", DEFAULT_BOT_ADDRESS)),
            solana_cli: "solana".to_string(),
            spl_token_cli: "spl-token".to_string(),
            rpc_url: None,
        }
    }
}

impl LedgerSettings {
    pub fn mints(&self) -> AssetMints {
        AssetMints {
            stable: self.stable_mint.clone(),
            shielded: self.shielded_mint.clone(),
        }
    }

    /// The custodial bot's signing identity
    pub fn bot_signer(&self, data_dir: &Path) -> Signer {
        let key_path = if self.bot_keypair.is_absolute() {
            self.bot_keypair.clone()
        } else {
            data_dir.join(&self.bot_keypair)
        };
        Signer::new(self.bot_address.clone(), key_path)
    }
}

/// ShieldPay configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub demo_mode: bool,
    pub pending_input_timeout_secs: u64,
    pub ledger: LedgerSettings,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            demo_mode: false,
            pending_input_timeout_secs: DEFAULT_PENDING_INPUT_TIMEOUT_SECS,
            ledger: LedgerSettings::default(),
            _raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// Demo mode can be enabled via:
    /// 1. Settings file (shieldpay demo on)
    /// 2. Environment variable SHIELDPAY_DEMO_MODE (for CI/testing)
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content)?
        } else {
            SettingsFile::default()
        };

        if raw.app.pending_input_timeout_secs > MAX_PENDING_INPUT_TIMEOUT_SECS {
            bail!(
                "pendingInputTimeoutSecs is {} but may be at most {}",
                raw.app.pending_input_timeout_secs,
                MAX_PENDING_INPUT_TIMEOUT_SECS
            );
        }

        let demo_mode = match std::env::var("SHIELDPAY_DEMO_MODE").ok().as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => false,
            _ => raw.app.demo_mode,
        };

        Ok(Self {
            demo_mode,
            pending_input_timeout_secs: raw.app.pending_input_timeout_secs,
            ledger: raw.ledger.clone(),
            _raw_settings: raw,
        })
    }

    /// Save config to the data directory
    /// Preserves other settings that this crate doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join("settings.json");

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        settings.app.demo_mode = self.demo_mode;
        settings.app.pending_input_timeout_secs = self.pending_input_timeout_secs;
        settings.ledger = self.ledger.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// How long a pending recipient question stays open
    pub fn pending_input_timeout(&self) -> Duration {
        let secs = self.pending_input_timeout_secs.min(MAX_PENDING_INPUT_TIMEOUT_SECS);
        Duration::seconds(secs as i64)
    }

    /// Enable demo mode
    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
    }

    /// Disable demo mode
    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();

        assert_eq!(config.ledger.stable_mint, DEFAULT_STABLE_MINT);
        assert_eq!(config.ledger.shielded_mint, DEFAULT_SHIELDED_MINT);
        assert_eq!(config.pending_input_timeout_secs, 300);
        let bot = config.ledger.bot_signer(dir.path());
        assert_eq!(bot.public_id, DEFAULT_BOT_ADDRESS);
        assert!(bot.key_path.starts_with(dir.path()));
    }

    #[test]
    fn test_partial_ledger_section_keeps_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{
                "ledger": { "rpcUrl": "https://api.devnet.solana.com" },
                "app": { "pendingInputTimeoutSecs": 60 }
            }"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(
            config.ledger.rpc_url.as_deref(),
            Some("https://api.devnet.solana.com")
        );
        assert_eq!(config.ledger.spl_token_cli, "spl-token");
        assert_eq!(config.pending_input_timeout_secs, 60);
    }

    #[test]
    fn test_save_preserves_unmanaged_fields() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{ "app": { "theme": "dark" }, "frontend": { "chat": "telegram" } }"#,
        )
        .unwrap();

        let mut config = Config::load(dir.path()).unwrap();
        config.enable_demo_mode();
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["app"]["theme"], "dark");
        assert_eq!(value["app"]["demoMode"], true);
        assert_eq!(value["frontend"]["chat"], "telegram");
    }

    #[test]
    fn test_oversized_timeout_is_rejected() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{ "app": { "pendingInputTimeoutSecs": 18446744073709551615 } }"#,
        )
        .unwrap();

        let err = Config::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("pendingInputTimeoutSecs"));
    }

    #[test]
    fn test_timeout_duration_is_clamped() {
        let config = Config {
            pending_input_timeout_secs: u64::MAX,
            ..Config::default()
        };

        assert_eq!(
            config.pending_input_timeout(),
            Duration::seconds(MAX_PENDING_INPUT_TIMEOUT_SECS as i64)
        );
    }
}
