//! Wallet service - onboarding and balance checks

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{ActionMenu, BalanceSnapshot, Disclosure};
use crate::ports::Notifier;

use super::account::AccountStore;
use super::balance::BalanceAggregator;
use super::logging::{events, LogEvent, LoggingService};

/// Result of `start`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletInfo {
    pub user_id: String,
    pub public_id: String,
    pub created: bool,
}

/// Result of `check_balance`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceReport {
    pub public_id: String,
    pub snapshot: BalanceSnapshot,
}

pub struct WalletService {
    accounts: AccountStore,
    balances: BalanceAggregator,
    logger: Option<Arc<LoggingService>>,
}

impl WalletService {
    pub fn new(
        accounts: AccountStore,
        balances: BalanceAggregator,
        logger: Option<Arc<LoggingService>>,
    ) -> Self {
        Self {
            accounts,
            balances,
            logger,
        }
    }

    /// First contact creates the wallet and reveals its secret once;
    /// later calls greet the user with the public key only
    pub fn start(&self, user_id: &str, notifier: &dyn Notifier) -> Result<WalletInfo> {
        let (record, disclosure) = match self.accounts.get_or_create(user_id) {
            Ok(created) => created,
            Err(e) => {
                notifier.deliver(user_id, &e.user_message(), None);
                return Err(e);
            }
        };

        let text = match &disclosure {
            Disclosure::New { secret_json } => {
                if let Some(logger) = &self.logger {
                    let _ = logger.log(LogEvent::new(events::WALLET_CREATED).with_user(user_id));
                }
                format!(
                    "New wallet created!\nPublic Key: {}\nPrivate Key: {}\n\n\
                     ⚠️ Save your private key and delete this message!",
                    record.public_id, secret_json
                )
            }
            Disclosure::Existing => format!("Welcome back!\nPublic Key: {}", record.public_id),
        };
        notifier.deliver(user_id, &text, Some(&ActionMenu::main()));

        Ok(WalletInfo {
            user_id: user_id.to_string(),
            public_id: record.public_id,
            created: disclosure.is_new(),
        })
    }

    pub fn check_balance(&self, user_id: &str, notifier: &dyn Notifier) -> Result<BalanceReport> {
        let report = self.accounts.load(user_id).and_then(|record| {
            let record = record.ok_or(Error::NoWallet)?;
            let snapshot = self.balances.snapshot(&record)?;
            Ok(BalanceReport {
                public_id: record.public_id,
                snapshot,
            })
        });

        match report {
            Ok(report) => {
                let text = BalanceAggregator::render(&report.public_id, &report.snapshot);
                notifier.deliver(user_id, &text, Some(&ActionMenu::main()));
                Ok(report)
            }
            Err(e) => {
                notifier.deliver(user_id, &e.user_message(), None);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::demo::DemoLedger;
    use crate::domain::AssetMints;
    use crate::ports::RecordingNotifier;
    use rust_decimal::Decimal;
    use tempfile::tempdir;

    fn service(dir: &std::path::Path, ledger: Arc<DemoLedger>) -> WalletService {
        let mints = AssetMints {
            stable: "USDC_MINT".to_string(),
            shielded: "CNF_MINT".to_string(),
        };
        WalletService::new(
            AccountStore::new(dir).unwrap(),
            BalanceAggregator::new(ledger, mints),
            None,
        )
    }

    #[test]
    fn test_start_discloses_secret_only_once() {
        let dir = tempdir().unwrap();
        let wallet = service(dir.path(), Arc::new(DemoLedger::new()));
        let notifier = RecordingNotifier::new();

        let first = wallet.start("u1", &notifier).unwrap();
        let second = wallet.start("u1", &notifier).unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.public_id, second.public_id);
        let texts = notifier.texts();
        assert!(texts[0].contains("Private Key: ["));
        assert!(texts[1].starts_with("Welcome back!"));
        assert!(!texts[1].contains("Private Key"));
    }

    #[test]
    fn test_check_balance_without_wallet() {
        let dir = tempdir().unwrap();
        let wallet = service(dir.path(), Arc::new(DemoLedger::new()));
        let notifier = RecordingNotifier::new();

        assert!(matches!(wallet.check_balance("u1", &notifier), Err(Error::NoWallet)));
        assert_eq!(notifier.texts(), vec!["No wallet found. Use /start.".to_string()]);
    }

    #[test]
    fn test_check_balance_reports_snapshot() {
        let dir = tempdir().unwrap();
        let ledger = Arc::new(DemoLedger::new());
        let wallet = service(dir.path(), ledger.clone());
        let notifier = RecordingNotifier::new();
        let info = wallet.start("u1", &notifier).unwrap();
        ledger.fund_native(&info.public_id, Decimal::new(5, 2));
        ledger.fund_token(&info.public_id, "CNF_MINT", Decimal::ZERO);

        let report = wallet.check_balance("u1", &notifier).unwrap();

        assert_eq!(report.snapshot.native, Decimal::new(5, 2));
        assert!(report.snapshot.shielded_account_exists);
        assert!(notifier.texts().last().unwrap().contains("CNf Account: exists"));
    }
}
