//! Workflow engine - precondition, then strictly sequential ledger steps
//!
//! A run loads the user's record, checks the workflow's precondition
//! against a fresh balance snapshot and executes each step in order. The
//! first failing step stops the run. Nothing is retried or rolled back;
//! the report keeps every step that committed before the failure.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::result::{Error, LedgerError, Result};
use crate::domain::{
    AccountRecord, ActionMenu, AssetMints, Destination, LedgerOp, Owner, Signer, Step, StepReceipt,
    WorkflowKind,
};
use crate::ports::{LedgerClient, LedgerResult, Notifier};

use super::account::AccountStore;
use super::balance::BalanceAggregator;
use super::locks::UserLocks;
use super::logging::{events, LogEvent, LoggingService};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkflowStatus {
    Completed,
    Failed {
        step_index: usize,
        step: String,
        error: LedgerError,
    },
}

/// Outcome of a run that got past its precondition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub run_id: String,
    pub workflow: String,
    /// Steps that committed, in execution order
    pub receipts: Vec<StepReceipt>,
    #[serde(flatten)]
    pub status: WorkflowStatus,
    /// The final message delivered to the user
    pub final_message: String,
}

impl WorkflowReport {
    pub fn is_completed(&self) -> bool {
        self.status == WorkflowStatus::Completed
    }
}

/// Executes steps one at a time and records what committed
struct StepSequencer<'a> {
    ledger: &'a dyn LedgerClient,
    mints: &'a AssetMints,
    user: Signer,
    bot: &'a Signer,
    committed: Vec<StepReceipt>,
}

impl<'a> StepSequencer<'a> {
    fn signer(&self, owner: Owner) -> &Signer {
        match owner {
            Owner::User => &self.user,
            Owner::Bot => self.bot,
        }
    }

    fn address(&self, destination: &Destination) -> String {
        match destination {
            Destination::User => self.user.public_id.clone(),
            Destination::Bot => self.bot.public_id.clone(),
            Destination::External(recipient) => recipient.as_str().to_string(),
        }
    }

    /// Run one step's ledger call; on success the receipt is recorded
    fn execute(&mut self, step: &Step) -> LedgerResult<&StepReceipt> {
        let mut holding_account = None;
        let receipt = match &step.op {
            LedgerOp::Transfer {
                owner,
                asset,
                amount,
                destination,
                confidential,
            } => self.ledger.transfer(
                self.signer(*owner),
                self.mints.mint(*asset),
                *amount,
                &self.address(destination),
                *confidential,
            )?,
            LedgerOp::CreateHoldingAccount { asset } => {
                let (account, receipt) = self
                    .ledger
                    .create_holding_account(&self.user, self.mints.mint(*asset))?;
                holding_account = Some(account);
                receipt
            }
            LedgerOp::ConfigureConfidential { asset } => self
                .ledger
                .configure_confidential(&self.user, self.mints.mint(*asset))?,
            LedgerOp::ApplyPendingBalance { owner, asset } => self
                .ledger
                .apply_pending_balance(self.signer(*owner), self.mints.mint(*asset))?,
            LedgerOp::WithdrawShielded { asset, amount } => {
                self.ledger
                    .withdraw_shielded(&self.user, self.mints.mint(*asset), *amount)?
            }
        };

        self.committed.push(StepReceipt {
            step: step.description.to_string(),
            receipt,
            holding_account,
        });
        // just pushed
        Ok(&self.committed[self.committed.len() - 1])
    }

    fn into_committed(self) -> Vec<StepReceipt> {
        self.committed
    }
}

/// Runs workflows for users
pub struct WorkflowEngine {
    accounts: AccountStore,
    balances: BalanceAggregator,
    ledger: Arc<dyn LedgerClient>,
    mints: AssetMints,
    bot: Signer,
    locks: UserLocks,
    logger: Option<Arc<LoggingService>>,
}

impl WorkflowEngine {
    pub fn new(
        accounts: AccountStore,
        ledger: Arc<dyn LedgerClient>,
        mints: AssetMints,
        bot: Signer,
        logger: Option<Arc<LoggingService>>,
    ) -> Self {
        let locks = UserLocks::new(accounts.keys_dir());
        let balances = BalanceAggregator::new(Arc::clone(&ledger), mints.clone());
        Self {
            accounts,
            balances,
            ledger,
            mints,
            bot,
            locks,
            logger,
        }
    }

    pub fn mints(&self) -> &AssetMints {
        &self.mints
    }

    pub fn bot(&self) -> &Signer {
        &self.bot
    }

    fn log(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            let _ = logger.log(event);
        }
    }

    /// Execute a workflow for `user_id`.
    ///
    /// Failures before the first step (no wallet, precondition, ledger
    /// unreadable, run already in progress) deliver one message and return
    /// `Err`. Once steps start the run always returns a report; a failed
    /// step is reported through [`WorkflowStatus::Failed`].
    pub fn run(
        &self,
        user_id: &str,
        kind: &WorkflowKind,
        notifier: &dyn Notifier,
    ) -> Result<WorkflowReport> {
        let run_id = Uuid::new_v4().to_string();
        let workflow = kind.name();
        let base_event = |name: &str| {
            LogEvent::new(name)
                .with_user(user_id)
                .with_workflow(workflow)
                .with_run_id(run_id.as_str())
        };

        let prepared = AccountRecord::validate_user_id(user_id)
            .and_then(|_| self.locks.try_acquire(user_id))
            .and_then(|guard| self.prepare(user_id, kind).map(|record| (guard, record)));

        let (_guard, record) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                let event = match e {
                    Error::InsufficientBalance { .. } => events::PRECONDITION_FAILED,
                    _ => events::WORKFLOW_FAILED,
                };
                self.log(base_event(event).with_error(e.to_string()));
                notifier.deliver(user_id, &e.user_message(), Some(&ActionMenu::main()));
                return Err(e);
            }
        };

        self.log(base_event(events::WORKFLOW_STARTED));

        let spec = kind.spec(&self.mints);
        let mut sequencer = StepSequencer {
            ledger: self.ledger.as_ref(),
            mints: &self.mints,
            user: record.signer(),
            bot: &self.bot,
            committed: Vec::new(),
        };
        let menu = ActionMenu::main();
        let last = spec.steps.len().saturating_sub(1);

        for (index, step) in spec.steps.iter().enumerate() {
            if let Some(progress) = &step.progress_text {
                notifier.deliver(user_id, progress, None);
            }

            match sequencer.execute(step) {
                Ok(receipt) => {
                    let text = step.success_text(receipt);
                    let is_final = index == last && spec.summary.is_none();
                    notifier.deliver(user_id, &text, is_final.then_some(&menu));
                }
                Err(error) => {
                    let final_message = format!("{}: {}", spec.failure_prefix, error.stderr);
                    notifier.deliver(user_id, &final_message, Some(&menu));
                    self.log(
                        base_event(events::WORKFLOW_FAILED)
                            .with_step(step.description)
                            .with_error(error.stderr.clone()),
                    );
                    return Ok(WorkflowReport {
                        run_id: run_id.clone(),
                        workflow: workflow.to_string(),
                        receipts: sequencer.into_committed(),
                        status: WorkflowStatus::Failed {
                            step_index: index,
                            step: step.description.to_string(),
                            error,
                        },
                        final_message,
                    });
                }
            }
        }

        let receipts = sequencer.into_committed();
        let final_message = match &spec.summary {
            Some(summary) => {
                notifier.deliver(user_id, summary, Some(&menu));
                summary.clone()
            }
            None => match (spec.steps.last(), receipts.last()) {
                (Some(step), Some(receipt)) => step.success_text(receipt),
                _ => String::new(),
            },
        };

        self.log(base_event(events::WORKFLOW_COMPLETED));

        Ok(WorkflowReport {
            run_id,
            workflow: workflow.to_string(),
            receipts,
            status: WorkflowStatus::Completed,
            final_message,
        })
    }

    /// Load the record and check the precondition against fresh balances
    fn prepare(&self, user_id: &str, kind: &WorkflowKind) -> Result<AccountRecord> {
        let record = self.accounts.load(user_id)?.ok_or(Error::NoWallet)?;
        let snapshot = self.balances.snapshot(&record)?;
        kind.spec(&self.mints).precondition.check(&snapshot)?;
        Ok(record)
    }
}
