//! Ledger client port
//!
//! Defines the primitive operations the workflows run against the external
//! ledger. Implementations shell out to the ledger tooling (production) or
//! simulate balances in memory (demo mode, tests).

use rust_decimal::Decimal;

use crate::domain::result::LedgerError;
use crate::domain::{Holdings, Receipt, Signer};

/// Result of a single ledger call
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Ledger client trait
///
/// Every call is synchronous, blocking and NOT idempotent: invoking a
/// transfer again after a failure may move funds twice, so callers must
/// never retry on their own.
pub trait LedgerClient: Send + Sync {
    /// Adapter name (e.g., "spl-token", "demo")
    fn name(&self) -> &str;

    /// Native balance of an address
    fn query_balance(&self, public_id: &str) -> LedgerResult<Decimal>;

    /// Token holdings of a signer, one entry per holding account
    fn list_holdings(&self, owner: &Signer) -> LedgerResult<Holdings>;

    /// Transfer `amount` of `mint` from `owner` to `destination`
    ///
    /// # Arguments
    /// * `confidential` - Send into the recipient's pending shielded balance
    fn transfer(
        &self,
        owner: &Signer,
        mint: &str,
        amount: Decimal,
        destination: &str,
        confidential: bool,
    ) -> LedgerResult<Receipt>;

    /// Create a holding account for `mint`, returning its address
    fn create_holding_account(&self, owner: &Signer, mint: &str) -> LedgerResult<(String, Receipt)>;

    /// Enable confidential transfers on the owner's holding account
    fn configure_confidential(&self, owner: &Signer, mint: &str) -> LedgerResult<Receipt>;

    /// Move pending shielded balance into the spendable shielded balance
    fn apply_pending_balance(&self, owner: &Signer, mint: &str) -> LedgerResult<Receipt>;

    /// Move `amount` from the shielded balance to the public balance
    fn withdraw_shielded(
        &self,
        owner: &Signer,
        mint: &str,
        amount: Decimal,
    ) -> LedgerResult<Receipt>;
}
