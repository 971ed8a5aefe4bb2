//! Concurrent access tests
//!
//! First contact and workflow runs can race when several chat updates for
//! the same user arrive at once. These tests verify that a record is
//! created exactly once and that a user never has two runs in flight.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use rust_decimal::Decimal;
use tempfile::TempDir;

use shieldpay_core::adapters::demo::{DemoLedger, LedgerCallKind};
use shieldpay_core::config::{DEFAULT_SHIELDED_MINT, DEFAULT_STABLE_MINT};
use shieldpay_core::domain::{AssetMints, Holdings, Receipt, Signer, WorkflowKind};
use shieldpay_core::ports::{LedgerClient, LedgerResult, RecordingNotifier};
use shieldpay_core::services::{AccountStore, WorkflowEngine};
use shieldpay_core::Error;

/// Number of concurrent threads for stress tests
const THREAD_COUNT: usize = 6;

/// Demo ledger whose mutations take a while, so runs overlap
struct SlowLedger {
    inner: DemoLedger,
    delay: Duration,
}

impl LedgerClient for SlowLedger {
    fn name(&self) -> &str {
        "slow-demo"
    }

    fn query_balance(&self, public_id: &str) -> LedgerResult<Decimal> {
        self.inner.query_balance(public_id)
    }

    fn list_holdings(&self, owner: &Signer) -> LedgerResult<Holdings> {
        self.inner.list_holdings(owner)
    }

    fn transfer(
        &self,
        owner: &Signer,
        mint: &str,
        amount: Decimal,
        destination: &str,
        confidential: bool,
    ) -> LedgerResult<Receipt> {
        thread::sleep(self.delay);
        self.inner.transfer(owner, mint, amount, destination, confidential)
    }

    fn create_holding_account(
        &self,
        owner: &Signer,
        mint: &str,
    ) -> LedgerResult<(String, Receipt)> {
        thread::sleep(self.delay);
        self.inner.create_holding_account(owner, mint)
    }

    fn configure_confidential(&self, owner: &Signer, mint: &str) -> LedgerResult<Receipt> {
        thread::sleep(self.delay);
        self.inner.configure_confidential(owner, mint)
    }

    fn apply_pending_balance(&self, owner: &Signer, mint: &str) -> LedgerResult<Receipt> {
        thread::sleep(self.delay);
        self.inner.apply_pending_balance(owner, mint)
    }

    fn withdraw_shielded(
        &self,
        owner: &Signer,
        mint: &str,
        amount: Decimal,
    ) -> LedgerResult<Receipt> {
        thread::sleep(self.delay);
        self.inner.withdraw_shielded(owner, mint, amount)
    }
}

fn mints() -> AssetMints {
    AssetMints {
        stable: DEFAULT_STABLE_MINT.to_string(),
        shielded: DEFAULT_SHIELDED_MINT.to_string(),
    }
}

/// Test: every thread asks for the same new user's wallet at once.
///
/// Expected: one record on disk, one disclosure, the same public id for all.
#[test]
fn test_concurrent_first_contact_creates_one_record() {
    let dir = TempDir::new().unwrap();
    let store = AccountStore::new(dir.path()).unwrap();
    let barrier = Arc::new(Barrier::new(THREAD_COUNT));

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|_| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store.get_or_create("race").unwrap()
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let disclosed = results.iter().filter(|(_, d)| d.is_new()).count();
    assert_eq!(disclosed, 1, "secret must be disclosed exactly once");

    let on_disk = store.load("race").unwrap().unwrap();
    for (record, _) in &results {
        assert_eq!(record.public_id, on_disk.public_id);
    }
}

/// Test: two runs for one user start together.
///
/// Expected: one runs, the other is rejected as busy without touching the
/// ledger.
#[test]
fn test_same_user_runs_are_exclusive() {
    let dir = TempDir::new().unwrap();
    let store = AccountStore::new(dir.path()).unwrap();
    let (record, _) = store.get_or_create("busy").unwrap();

    let ledger = Arc::new(SlowLedger {
        inner: DemoLedger::new(),
        delay: Duration::from_millis(300),
    });
    ledger.inner.fund_native(&record.public_id, Decimal::ONE);
    ledger
        .inner
        .fund_shielded(&record.public_id, DEFAULT_SHIELDED_MINT, Decimal::new(10, 0));

    let engine = Arc::new(WorkflowEngine::new(
        store,
        ledger.clone(),
        mints(),
        Signer::new("bot", dir.path().join("bot.json")),
        None,
    ));
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let notifier = RecordingNotifier::new();
                barrier.wait();
                engine.run("busy", &WorkflowKind::Withdraw, &notifier)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let completed = results
        .iter()
        .filter(|r| matches!(r, Ok(report) if report.is_completed()))
        .count();
    let busy = results
        .iter()
        .filter(|r| matches!(r, Err(Error::WorkflowBusy(_))))
        .count();
    assert_eq!(completed, 1);
    assert_eq!(busy, 1);
    assert_eq!(ledger.inner.call_count(LedgerCallKind::WithdrawShielded), 1);
}

/// Test: different users run at the same time without contention.
#[test]
fn test_different_users_run_in_parallel() {
    let dir = TempDir::new().unwrap();
    let store = AccountStore::new(dir.path()).unwrap();
    let ledger = Arc::new(SlowLedger {
        inner: DemoLedger::new(),
        delay: Duration::from_millis(50),
    });

    let users: Vec<String> = (0..THREAD_COUNT).map(|i| format!("user{}", i)).collect();
    for user in &users {
        let (record, _) = store.get_or_create(user).unwrap();
        ledger.inner.fund_native(&record.public_id, Decimal::ONE);
        ledger
            .inner
            .fund_shielded(&record.public_id, DEFAULT_SHIELDED_MINT, Decimal::ONE);
    }

    let engine = Arc::new(WorkflowEngine::new(
        store,
        ledger.clone(),
        mints(),
        Signer::new("bot", dir.path().join("bot.json")),
        None,
    ));
    let barrier = Arc::new(Barrier::new(THREAD_COUNT));

    let handles: Vec<_> = users
        .into_iter()
        .map(|user| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let notifier = RecordingNotifier::new();
                barrier.wait();
                engine.run(&user, &WorkflowKind::Withdraw, &notifier)
            })
        })
        .collect();

    for handle in handles {
        let report = handle.join().unwrap().unwrap();
        assert!(report.is_completed());
    }
    assert_eq!(
        ledger.inner.call_count(LedgerCallKind::WithdrawShielded),
        THREAD_COUNT
    );
}
