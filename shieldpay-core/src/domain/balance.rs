//! Balance snapshot domain model

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Token holdings of one owner, keyed by mint address.
///
/// A mint being present means the owner has a holding account for it,
/// even if the balance is zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Holdings {
    pub balances: HashMap<String, Decimal>,
}

impl Holdings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mint: impl Into<String>, balance: Decimal) {
        self.balances.insert(mint.into(), balance);
    }

    pub fn balance(&self, mint: &str) -> Option<Decimal> {
        self.balances.get(mint).copied()
    }

    pub fn has_account(&self, mint: &str) -> bool {
        self.balances.contains_key(mint)
    }
}

/// Balances of one wallet read at a single point in a workflow.
///
/// Never cached: a workflow that needs a second check reads again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// Native balance (pays ledger fees)
    pub native: Decimal,
    /// Stable public asset (USDC)
    pub stable: Decimal,
    /// Shielded counterpart asset
    pub shielded: Decimal,
    pub shielded_account_exists: bool,
}

impl BalanceSnapshot {
    /// Assemble a snapshot from raw ledger reads, defaulting absent mints to zero
    pub fn from_holdings(
        native: Decimal,
        holdings: &Holdings,
        stable_mint: &str,
        shielded_mint: &str,
    ) -> Self {
        Self {
            native,
            stable: holdings.balance(stable_mint).unwrap_or(Decimal::ZERO),
            shielded: holdings.balance(shielded_mint).unwrap_or(Decimal::ZERO),
            shielded_account_exists: holdings.has_account(shielded_mint),
        }
    }
}
