//! Demo ledger
//!
//! In-memory ledger used by demo mode and by tests. It keeps per-address
//! native and token balances (public, pending shielded, available shielded),
//! records every call, and can be told to fail a given operation.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use rust_decimal::Decimal;

use crate::domain::result::LedgerError;
use crate::domain::{Holdings, Receipt, Signer};
use crate::ports::{LedgerClient, LedgerResult};

/// Native fee charged per mutating call (0.000005)
const DEMO_FEE: Decimal = Decimal::from_parts(5, 0, 0, false, 6);

/// Ledger operation kinds, for call accounting and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerCallKind {
    QueryBalance,
    ListHoldings,
    Transfer,
    CreateHoldingAccount,
    ConfigureConfidential,
    ApplyPendingBalance,
    WithdrawShielded,
}

impl LedgerCallKind {
    /// Whether the call changes ledger state
    pub fn is_mutation(&self) -> bool {
        !matches!(self, LedgerCallKind::QueryBalance | LedgerCallKind::ListHoldings)
    }
}

/// One recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerCall {
    pub kind: LedgerCallKind,
    /// Address of the signer, or the queried address
    pub address: String,
    pub mint: Option<String>,
    pub amount: Option<Decimal>,
    pub destination: Option<String>,
    pub confidential: bool,
}

impl LedgerCall {
    fn new(kind: LedgerCallKind, address: &str) -> Self {
        Self {
            kind,
            address: address.to_string(),
            mint: None,
            amount: None,
            destination: None,
            confidential: false,
        }
    }
}

/// Funds given to addresses the ledger has never seen
#[derive(Debug, Clone, PartialEq)]
pub struct StarterFunds {
    pub native: Decimal,
    pub tokens: Vec<(String, Decimal)>,
}

#[derive(Debug, Clone, Default)]
struct TokenAccount {
    address: String,
    public: Decimal,
    pending_shielded: Decimal,
    available_shielded: Decimal,
    confidential: bool,
}

impl TokenAccount {
    fn open() -> Self {
        Self {
            address: random_address(),
            ..Default::default()
        }
    }

    /// What `list_holdings` reports
    fn visible_balance(&self) -> Decimal {
        self.public + self.available_shielded
    }
}

#[derive(Debug, Clone, Default)]
struct Wallet {
    native: Decimal,
    tokens: HashMap<String, TokenAccount>,
}

#[derive(Debug, Default)]
struct State {
    wallets: HashMap<String, Wallet>,
    calls: Vec<LedgerCall>,
    failures: HashMap<LedgerCallKind, VecDeque<LedgerError>>,
}

/// In-memory ledger
#[derive(Debug, Default)]
pub struct DemoLedger {
    state: Mutex<State>,
    starter: Option<StarterFunds>,
}

fn random_address() -> String {
    bs58::encode(rand::random::<[u8; 32]>()).into_string()
}

fn random_signature() -> String {
    let mut bytes = rand::random::<[u8; 32]>().to_vec();
    bytes.extend_from_slice(&rand::random::<[u8; 32]>());
    bs58::encode(bytes).into_string()
}

fn rejected(msg: impl Into<String>) -> LedgerError {
    LedgerError::new(Some(1), msg)
}

impl DemoLedger {
    /// Empty ledger: unknown addresses hold nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Give every address seen for the first time `starter` funds
    pub fn with_starter_funds(mut self, starter: StarterFunds) -> Self {
        self.starter = Some(starter);
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn wallet<'a>(&self, state: &'a mut State, address: &str) -> &'a mut Wallet {
        let starter = self.starter.as_ref();
        state.wallets.entry(address.to_string()).or_insert_with(|| {
            let mut wallet = Wallet::default();
            if let Some(funds) = starter {
                wallet.native = funds.native;
                for (mint, amount) in &funds.tokens {
                    let mut account = TokenAccount::open();
                    account.public = *amount;
                    wallet.tokens.insert(mint.clone(), account);
                }
            }
            wallet
        })
    }

    /// Credit native balance
    pub fn fund_native(&self, address: &str, amount: Decimal) {
        let mut state = self.state();
        self.wallet(&mut state, address).native += amount;
    }

    /// Credit public token balance, opening the holding account if needed
    pub fn fund_token(&self, address: &str, mint: &str, amount: Decimal) {
        let mut state = self.state();
        let wallet = self.wallet(&mut state, address);
        wallet
            .tokens
            .entry(mint.to_string())
            .or_insert_with(TokenAccount::open)
            .public += amount;
    }

    /// Credit spendable shielded balance, opening a confidential account if needed
    pub fn fund_shielded(&self, address: &str, mint: &str, amount: Decimal) {
        let mut state = self.state();
        let wallet = self.wallet(&mut state, address);
        let account = wallet
            .tokens
            .entry(mint.to_string())
            .or_insert_with(TokenAccount::open);
        account.confidential = true;
        account.available_shielded += amount;
    }

    /// Make the next call of `kind` fail with `error`
    pub fn fail_next(&self, kind: LedgerCallKind, error: LedgerError) {
        self.state().failures.entry(kind).or_default().push_back(error);
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, kind: LedgerCallKind) -> usize {
        self.state().calls.iter().filter(|c| c.kind == kind).count()
    }

    pub fn mutation_count(&self) -> usize {
        self.state().calls.iter().filter(|c| c.kind.is_mutation()).count()
    }

    /// Pending (not yet applied) shielded balance
    pub fn pending_shielded(&self, address: &str, mint: &str) -> Decimal {
        self.state()
            .wallets
            .get(address)
            .and_then(|w| w.tokens.get(mint))
            .map(|a| a.pending_shielded)
            .unwrap_or(Decimal::ZERO)
    }

    /// Record the call and pop an injected failure, if any
    fn begin(&self, state: &mut State, call: LedgerCall) -> LedgerResult<()> {
        let kind = call.kind;
        state.calls.push(call);
        if let Some(error) = state.failures.get_mut(&kind).and_then(|q| q.pop_front()) {
            return Err(error);
        }
        Ok(())
    }

    fn charge_fee(&self, state: &mut State, address: &str) -> LedgerResult<()> {
        let wallet = self.wallet(state, address);
        if wallet.native < DEMO_FEE {
            return Err(rejected(
                "Error: Account has insufficient funds for fee".to_string(),
            ));
        }
        wallet.native -= DEMO_FEE;
        Ok(())
    }
}

impl LedgerClient for DemoLedger {
    fn name(&self) -> &str {
        "demo"
    }

    fn query_balance(&self, public_id: &str) -> LedgerResult<Decimal> {
        let mut state = self.state();
        self.begin(&mut state, LedgerCall::new(LedgerCallKind::QueryBalance, public_id))?;
        Ok(self.wallet(&mut state, public_id).native)
    }

    fn list_holdings(&self, owner: &Signer) -> LedgerResult<Holdings> {
        let mut state = self.state();
        self.begin(&mut state, LedgerCall::new(LedgerCallKind::ListHoldings, &owner.public_id))?;
        let mut holdings = Holdings::new();
        for (mint, account) in &self.wallet(&mut state, &owner.public_id).tokens {
            holdings.insert(mint.clone(), account.visible_balance());
        }
        Ok(holdings)
    }

    fn transfer(
        &self,
        owner: &Signer,
        mint: &str,
        amount: Decimal,
        destination: &str,
        confidential: bool,
    ) -> LedgerResult<Receipt> {
        let mut state = self.state();
        let mut call = LedgerCall::new(LedgerCallKind::Transfer, &owner.public_id);
        call.mint = Some(mint.to_string());
        call.amount = Some(amount);
        call.destination = Some(destination.to_string());
        call.confidential = confidential;
        self.begin(&mut state, call)?;
        self.charge_fee(&mut state, &owner.public_id)?;

        let source = self
            .wallet(&mut state, &owner.public_id)
            .tokens
            .get_mut(mint)
            .ok_or_else(|| rejected(format!("Error: Account not found for mint {}", mint)))?;
        if source.visible_balance() < amount {
            return Err(rejected(format!(
                "Error: Insufficient funds, current balance is {}",
                source.visible_balance()
            )));
        }
        // Spend the public balance first, then the shielded one
        let from_public = source.public.min(amount);
        source.public -= from_public;
        source.available_shielded -= amount - from_public;

        let target = self
            .wallet(&mut state, destination)
            .tokens
            .entry(mint.to_string())
            .or_insert_with(TokenAccount::open);
        if confidential {
            target.confidential = true;
            target.pending_shielded += amount;
        } else {
            target.public += amount;
        }

        let signature = random_signature();
        let output = format!(
            "Transfer {} tokens\n  Sender: {}\n  Recipient: {}\n\nSignature: {}\n",
            amount, owner.public_id, destination, signature
        );
        Ok(Receipt::new(signature, output))
    }

    fn create_holding_account(
        &self,
        owner: &Signer,
        mint: &str,
    ) -> LedgerResult<(String, Receipt)> {
        let mut state = self.state();
        let mut call = LedgerCall::new(LedgerCallKind::CreateHoldingAccount, &owner.public_id);
        call.mint = Some(mint.to_string());
        self.begin(&mut state, call)?;
        self.charge_fee(&mut state, &owner.public_id)?;

        let wallet = self.wallet(&mut state, &owner.public_id);
        if let Some(existing) = wallet.tokens.get(mint) {
            return Err(rejected(format!(
                "Error: Account {} already exists",
                existing.address
            )));
        }
        let account = TokenAccount::open();
        let address = account.address.clone();
        wallet.tokens.insert(mint.to_string(), account);

        let signature = random_signature();
        let output = format!("Creating account {}\n\nSignature: {}\n", address, signature);
        Ok((address, Receipt::new(signature, output)))
    }

    fn configure_confidential(&self, owner: &Signer, mint: &str) -> LedgerResult<Receipt> {
        let mut state = self.state();
        let mut call = LedgerCall::new(LedgerCallKind::ConfigureConfidential, &owner.public_id);
        call.mint = Some(mint.to_string());
        self.begin(&mut state, call)?;
        self.charge_fee(&mut state, &owner.public_id)?;

        let account = self
            .wallet(&mut state, &owner.public_id)
            .tokens
            .get_mut(mint)
            .ok_or_else(|| rejected(format!("Error: Account not found for mint {}", mint)))?;
        account.confidential = true;

        let signature = random_signature();
        Ok(Receipt::new(signature.clone(), format!("Signature: {}\n", signature)))
    }

    fn apply_pending_balance(&self, owner: &Signer, mint: &str) -> LedgerResult<Receipt> {
        let mut state = self.state();
        let mut call = LedgerCall::new(LedgerCallKind::ApplyPendingBalance, &owner.public_id);
        call.mint = Some(mint.to_string());
        self.begin(&mut state, call)?;
        self.charge_fee(&mut state, &owner.public_id)?;

        let account = self
            .wallet(&mut state, &owner.public_id)
            .tokens
            .get_mut(mint)
            .ok_or_else(|| rejected(format!("Error: Account not found for mint {}", mint)))?;
        account.available_shielded += account.pending_shielded;
        account.pending_shielded = Decimal::ZERO;

        let signature = random_signature();
        Ok(Receipt::new(signature.clone(), format!("Signature: {}\n", signature)))
    }

    fn withdraw_shielded(
        &self,
        owner: &Signer,
        mint: &str,
        amount: Decimal,
    ) -> LedgerResult<Receipt> {
        let mut state = self.state();
        let mut call = LedgerCall::new(LedgerCallKind::WithdrawShielded, &owner.public_id);
        call.mint = Some(mint.to_string());
        call.amount = Some(amount);
        self.begin(&mut state, call)?;
        self.charge_fee(&mut state, &owner.public_id)?;

        let account = self
            .wallet(&mut state, &owner.public_id)
            .tokens
            .get_mut(mint)
            .ok_or_else(|| rejected(format!("Error: Account not found for mint {}", mint)))?;
        if account.available_shielded < amount {
            return Err(rejected(format!(
                "Error: Insufficient confidential balance, available {}",
                account.available_shielded
            )));
        }
        account.available_shielded -= amount;
        account.public += amount;

        let signature = random_signature();
        Ok(Receipt::new(signature.clone(), format!("Signature: {}\n", signature)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINT: &str = "CNfuSdLitgsFyRKhpaAVA2WM9q8wbEgvksJRvwgVoak3";

    fn signer(address: &str) -> Signer {
        Signer::new(address, format!("/tmp/{}.json", address))
    }

    #[test]
    fn test_confidential_transfer_lands_in_pending() {
        let ledger = DemoLedger::new();
        ledger.fund_native("alice", Decimal::ONE);
        ledger.fund_token("alice", MINT, Decimal::ONE);

        ledger
            .transfer(&signer("alice"), MINT, Decimal::new(42, 2), "bob", true)
            .unwrap();

        assert_eq!(ledger.pending_shielded("bob", MINT), Decimal::new(42, 2));
        let holdings = ledger.list_holdings(&signer("bob")).unwrap();
        assert_eq!(holdings.balance(MINT), Some(Decimal::ZERO));

        ledger.fund_native("bob", Decimal::ONE);
        ledger.apply_pending_balance(&signer("bob"), MINT).unwrap();
        let holdings = ledger.list_holdings(&signer("bob")).unwrap();
        assert_eq!(holdings.balance(MINT), Some(Decimal::new(42, 2)));
    }

    #[test]
    fn test_insufficient_funds_is_rejected() {
        let ledger = DemoLedger::new();
        ledger.fund_native("alice", Decimal::ONE);
        ledger.fund_token("alice", MINT, Decimal::new(1, 2));

        let err = ledger
            .transfer(&signer("alice"), MINT, Decimal::new(42, 2), "bob", false)
            .unwrap_err();
        assert_eq!(err.exit_code, Some(1));
        assert!(err.stderr.contains("Insufficient funds"));
    }

    #[test]
    fn test_injected_failure_is_one_shot() {
        let ledger = DemoLedger::new();
        ledger.fail_next(LedgerCallKind::QueryBalance, LedgerError::new(Some(1), "rpc down"));

        assert_eq!(ledger.query_balance("alice").unwrap_err().stderr, "rpc down");
        assert_eq!(ledger.query_balance("alice").unwrap(), Decimal::ZERO);
        assert_eq!(ledger.call_count(LedgerCallKind::QueryBalance), 2);
        assert_eq!(ledger.mutation_count(), 0);
    }

    #[test]
    fn test_starter_funds_apply_once() {
        let ledger = DemoLedger::new().with_starter_funds(StarterFunds {
            native: Decimal::new(5, 2),
            tokens: vec![("USDC".to_string(), Decimal::ONE)],
        });

        assert_eq!(ledger.query_balance("carol").unwrap(), Decimal::new(5, 2));
        let holdings = ledger.list_holdings(&signer("carol")).unwrap();
        assert_eq!(holdings.balance("USDC"), Some(Decimal::ONE));
        assert_eq!(ledger.query_balance("carol").unwrap(), Decimal::new(5, 2));
    }

    #[test]
    fn test_create_holding_account_twice_fails() {
        let ledger = DemoLedger::new();
        ledger.fund_native("alice", Decimal::ONE);

        let (address, receipt) = ledger.create_holding_account(&signer("alice"), MINT).unwrap();
        assert!(receipt.raw_output.contains(&address));
        assert!(ledger.create_holding_account(&signer("alice"), MINT).is_err());
    }
}
