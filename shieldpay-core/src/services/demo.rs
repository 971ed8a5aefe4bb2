//! Demo service - manage demo mode
//!
//! Demo mode swaps the real ledger tooling for the in-memory ledger and
//! keeps demo wallets in their own directory so they never mix with real
//! keypairs.

use std::path::{Path, PathBuf};

use anyhow::Result;
use rust_decimal::Decimal;

use crate::adapters::demo::{DemoLedger, StarterFunds};
use crate::config::{Config, LedgerSettings};

/// Directory holding demo-mode state inside the data directory
pub fn demo_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("demo")
}

/// In-memory ledger where every new wallet starts with some SOL and USDC
/// and the bot holds enough of both assets to serve conversions
pub fn demo_ledger(ledger: &LedgerSettings) -> DemoLedger {
    let ledger_state = DemoLedger::new().with_starter_funds(StarterFunds {
        native: Decimal::ONE,
        tokens: vec![(ledger.stable_mint.clone(), Decimal::ONE)],
    });
    ledger_state.fund_token(&ledger.bot_address, &ledger.stable_mint, Decimal::new(100, 0));
    ledger_state.fund_token(&ledger.bot_address, &ledger.shielded_mint, Decimal::ZERO);
    ledger_state.fund_shielded(&ledger.bot_address, &ledger.shielded_mint, Decimal::new(100, 0));
    ledger_state
}

/// Demo service for managing demo mode
pub struct DemoService {
    data_dir: PathBuf,
}

impl DemoService {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
        }
    }

    pub fn is_enabled(&self) -> Result<bool> {
        let config = Config::load(&self.data_dir)?;
        Ok(config.demo_mode)
    }

    /// Enable demo mode, starting from an empty demo directory
    pub fn enable(&self) -> Result<()> {
        let dir = demo_dir(&self.data_dir);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }

        let mut config = Config::load(&self.data_dir).unwrap_or_default();
        config.enable_demo_mode();
        config.save(&self.data_dir)?;
        Ok(())
    }

    /// Disable demo mode; demo wallets are kept until the next `enable`
    pub fn disable(&self) -> Result<()> {
        let mut config = Config::load(&self.data_dir).unwrap_or_default();
        config.disable_demo_mode();
        config.save(&self.data_dir)?;
        Ok(())
    }
}
