//! Balance aggregator - one consistent snapshot of a wallet

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{AccountRecord, AssetMints, BalanceSnapshot};
use crate::ports::LedgerClient;

/// Reads native and token balances for a wallet
pub struct BalanceAggregator {
    ledger: Arc<dyn LedgerClient>,
    mints: AssetMints,
}

impl BalanceAggregator {
    pub fn new(ledger: Arc<dyn LedgerClient>, mints: AssetMints) -> Self {
        Self { ledger, mints }
    }

    /// Query the ledger once for native balance and once for holdings.
    ///
    /// Any read failure is `LedgerUnavailable`; the caller must not act on
    /// partial balances.
    pub fn snapshot(&self, record: &AccountRecord) -> Result<BalanceSnapshot> {
        let native = self
            .ledger
            .query_balance(&record.public_id)
            .map_err(|e| Error::LedgerUnavailable(e.stderr))?;
        let holdings = self
            .ledger
            .list_holdings(&record.signer())
            .map_err(|e| Error::LedgerUnavailable(e.stderr))?;

        Ok(BalanceSnapshot::from_holdings(
            native,
            &holdings,
            &self.mints.stable,
            &self.mints.shielded,
        ))
    }

    /// Human-readable balance report
    pub fn render(public_id: &str, snapshot: &BalanceSnapshot) -> String {
        let cnf_status = if snapshot.shielded_account_exists {
            "exists"
        } else {
            "does not exist"
        };
        format!(
            "Public Key: {}\nBalances:\n- SOL: {}\n- USDC: {}\n- cnfUSD: {}\nCNf Account: {}",
            public_id, snapshot.native, snapshot.stable, snapshot.shielded, cnf_status
        )
    }
}
