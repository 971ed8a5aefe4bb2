//! ShieldPay Core - custodial wallet and conversion workflows over an
//! external token ledger
//!
//! This crate follows a hexagonal architecture:
//!
//! - **domain**: Core entities (AccountRecord, BalanceSnapshot, WorkflowKind, ...)
//! - **ports**: Trait definitions for external dependencies (LedgerClient, Notifier)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (spl-token CLI, in-memory demo ledger)

pub mod adapters;
pub mod config;
pub mod domain;
mod log_migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use adapters::spl_token::SplTokenCli;
use config::Config;
use domain::{Action, WorkflowKind};
use ports::{LedgerClient, Notifier};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, LedgerError, OperationResult};
pub use domain::{AccountRecord, ActionMenu, BalanceSnapshot, Recipient};

/// Main context for ShieldPay operations
///
/// This is the primary entry point for all business logic. It holds the
/// configuration, the ledger client and all services.
pub struct ShieldpayContext {
    pub config: Config,
    /// Directory holding the keypair records (a separate one in demo mode)
    pub wallet_dir: PathBuf,
    pub accounts: AccountStore,
    pub ledger: Arc<dyn LedgerClient>,
    pub logger: Option<Arc<LoggingService>>,
    pub wallet_service: WalletService,
    pub workflow_engine: Arc<WorkflowEngine>,
    pub transfer_conversation: TransferConversation,
}

impl ShieldpayContext {
    /// Create a context from the settings in `data_dir`
    ///
    /// Demo mode uses the in-memory ledger; otherwise the configured
    /// `solana`/`spl-token` binaries are driven.
    pub fn new(data_dir: &Path, entry_point: EntryPoint) -> Result<Self> {
        let config = Config::load(data_dir)?;

        let ledger: Arc<dyn LedgerClient> = if config.demo_mode {
            Arc::new(services::demo::demo_ledger(&config.ledger))
        } else {
            Arc::new(
                SplTokenCli::new(&config.ledger.solana_cli, &config.ledger.spl_token_cli)
                    .with_rpc_url(config.ledger.rpc_url.clone()),
            )
        };

        // The event log is best effort: a locked or unwritable logs.duckdb
        // must not stop the wallet from working
        let logger = LoggingService::new(data_dir, entry_point, env!("CARGO_PKG_VERSION"))
            .ok()
            .map(Arc::new);

        Self::with_ledger(data_dir, config, ledger, logger)
    }

    /// Create a context around an explicit ledger client
    pub fn with_ledger(
        data_dir: &Path,
        config: Config,
        ledger: Arc<dyn LedgerClient>,
        logger: Option<Arc<LoggingService>>,
    ) -> Result<Self> {
        let wallet_dir = if config.demo_mode {
            services::demo::demo_dir(data_dir)
        } else {
            data_dir.to_path_buf()
        };
        std::fs::create_dir_all(&wallet_dir)?;

        let accounts = AccountStore::new(&wallet_dir)?;
        let mints = config.ledger.mints();
        let bot = config.ledger.bot_signer(data_dir);

        let wallet_service = WalletService::new(
            accounts.clone(),
            BalanceAggregator::new(Arc::clone(&ledger), mints.clone()),
            logger.clone(),
        );
        let workflow_engine = Arc::new(WorkflowEngine::new(
            accounts.clone(),
            Arc::clone(&ledger),
            mints,
            bot,
            logger.clone(),
        ));
        let transfer_conversation = TransferConversation::new(
            Arc::clone(&workflow_engine),
            config.pending_input_timeout(),
            logger.clone(),
        );

        Ok(Self {
            config,
            wallet_dir,
            accounts,
            ledger,
            logger,
            wallet_service,
            workflow_engine,
            transfer_conversation,
        })
    }

    /// Route a menu trigger to its service
    ///
    /// Returns the workflow report when the action ran a workflow.
    pub fn trigger(
        &self,
        user_id: &str,
        action: Action,
        notifier: &dyn Notifier,
    ) -> domain::result::Result<Option<WorkflowReport>> {
        match action {
            Action::CheckBalance => {
                self.wallet_service.check_balance(user_id, notifier)?;
                Ok(None)
            }
            Action::ConfidentialTransfer => {
                self.transfer_conversation.begin(user_id, notifier);
                Ok(None)
            }
            other => match other.workflow() {
                Some(kind) => self.run(user_id, &kind, notifier).map(Some),
                None => Ok(None),
            },
        }
    }

    /// Run a workflow directly
    pub fn run(
        &self,
        user_id: &str,
        kind: &WorkflowKind,
        notifier: &dyn Notifier,
    ) -> domain::result::Result<WorkflowReport> {
        self.workflow_engine.run(user_id, kind, notifier)
    }
}
