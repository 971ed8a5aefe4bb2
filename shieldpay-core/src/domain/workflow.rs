//! Workflow definitions
//!
//! Every conversion the bot offers is a [`WorkflowKind`]. A kind expands
//! into a [`WorkflowSpec`]: one precondition checked against a fresh
//! [`BalanceSnapshot`] and an ordered list of [`Step`]s, each wrapping a
//! single ledger operation. Execution lives in `services::workflow`.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::balance::BalanceSnapshot;
use super::receipt::StepReceipt;
use super::recipient::Recipient;
use super::result::{Error, Result};

/// Minimum native balance to cover ledger fees (0.03)
pub const MIN_NATIVE: Decimal = Decimal::from_parts(3, 0, 0, false, 2);
/// Fixed conversion amount (0.42)
pub const CONVERSION_AMOUNT: Decimal = Decimal::from_parts(42, 0, 0, false, 2);
/// Stable balance required before converting (0.43)
pub const MIN_STABLE_FOR_CONVERSION: Decimal = Decimal::from_parts(43, 0, 0, false, 2);
/// Fixed shielded withdrawal amount (0.4)
pub const WITHDRAW_AMOUNT: Decimal = Decimal::from_parts(4, 0, 0, false, 1);
/// Redemption fee rate, 0.42% (0.0042)
pub const REDEEM_FEE_RATE: Decimal = Decimal::from_parts(42, 0, 0, false, 4);

/// Name of the workflow fed by the recipient conversation
pub const CONFIDENTIAL_TRANSFER: &str = "confidential_transfer";

/// Mint addresses of the two well-known assets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMints {
    pub stable: String,
    pub shielded: String,
}

impl AssetMints {
    pub fn mint(&self, asset: Asset) -> &str {
        match asset {
            Asset::Stable => &self.stable,
            Asset::Shielded => &self.shielded,
        }
    }
}

/// Token asset handled by the workflows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Asset {
    Stable,
    Shielded,
}

impl Asset {
    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::Stable => "USDC",
            Asset::Shielded => "cnfUSD",
        }
    }
}

/// A balance a precondition can test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceKind {
    Native,
    Token(Asset),
}

impl BalanceKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            BalanceKind::Native => "SOL",
            BalanceKind::Token(asset) => asset.symbol(),
        }
    }

    fn read(&self, snapshot: &BalanceSnapshot) -> Decimal {
        match self {
            BalanceKind::Native => snapshot.native,
            BalanceKind::Token(Asset::Stable) => snapshot.stable,
            BalanceKind::Token(Asset::Shielded) => snapshot.shielded,
        }
    }
}

/// `balance >= minimum`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    pub balance: BalanceKind,
    pub minimum: Decimal,
}

/// Conjunction of minimum balances, evaluated once before the first step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precondition {
    pub requirements: Vec<Requirement>,
}

impl Precondition {
    fn native_only() -> Self {
        Self {
            requirements: vec![Requirement {
                balance: BalanceKind::Native,
                minimum: MIN_NATIVE,
            }],
        }
    }

    fn native_and(asset: Asset, minimum: Decimal) -> Self {
        let mut precondition = Self::native_only();
        precondition.requirements.push(Requirement {
            balance: BalanceKind::Token(asset),
            minimum,
        });
        precondition
    }

    pub fn is_satisfied(&self, snapshot: &BalanceSnapshot) -> bool {
        self.check(snapshot).is_ok()
    }

    /// Fails with the first unmet requirement
    pub fn check(&self, snapshot: &BalanceSnapshot) -> Result<()> {
        for requirement in &self.requirements {
            let actual = requirement.balance.read(snapshot);
            if actual < requirement.minimum {
                return Err(Error::InsufficientBalance {
                    asset: requirement.balance.symbol().to_string(),
                    required: requirement.minimum,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// Who signs an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    User,
    Bot,
}

/// Where a transfer goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    User,
    Bot,
    External(Recipient),
}

/// The single ledger call a step performs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOp {
    Transfer {
        owner: Owner,
        asset: Asset,
        amount: Decimal,
        destination: Destination,
        confidential: bool,
    },
    CreateHoldingAccount {
        asset: Asset,
    },
    ConfigureConfidential {
        asset: Asset,
    },
    ApplyPendingBalance {
        owner: Owner,
        asset: Asset,
    },
    WithdrawShielded {
        asset: Asset,
        amount: Decimal,
    },
}

type SuccessText = Box<dyn Fn(&StepReceipt) -> String + Send + Sync>;

/// One ledger call plus the texts shown around it
pub struct Step {
    pub description: &'static str,
    pub op: LedgerOp,
    pub progress_text: Option<String>,
    success_text: SuccessText,
}

impl Step {
    fn new(
        description: &'static str,
        op: LedgerOp,
        progress_text: Option<String>,
        success_text: impl Fn(&StepReceipt) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            description,
            op,
            progress_text,
            success_text: Box::new(success_text),
        }
    }

    pub fn success_text(&self, receipt: &StepReceipt) -> String {
        (self.success_text)(receipt)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("description", &self.description)
            .field("op", &self.op)
            .finish()
    }
}

fn tx_line(receipt: &StepReceipt) -> String {
    format!("Tx: `{}`", receipt.receipt.transaction_id)
}

/// Fee split of a redemption, computed in exact decimal arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemQuote {
    pub gross: Decimal,
    pub fee: Decimal,
    pub net: Decimal,
}

impl RedeemQuote {
    pub fn for_amount(gross: Decimal) -> Self {
        let fee = gross * REDEEM_FEE_RATE;
        Self {
            gross,
            fee,
            net: gross - fee,
        }
    }
}

/// Closed set of workflows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowKind {
    CreateAccount,
    Configure,
    SendAndReceive,
    Redeem,
    Withdraw,
    ConfidentialTransfer(Recipient),
}

impl WorkflowKind {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowKind::CreateAccount => "create_account",
            WorkflowKind::Configure => "configure",
            WorkflowKind::SendAndReceive => "send_and_receive",
            WorkflowKind::Redeem => "redeem",
            WorkflowKind::Withdraw => "withdraw",
            WorkflowKind::ConfidentialTransfer(_) => CONFIDENTIAL_TRANSFER,
        }
    }

    /// Expand into the precondition and ordered steps
    pub fn spec(&self, mints: &AssetMints) -> WorkflowSpec {
        match self {
            WorkflowKind::CreateAccount => WorkflowSpec {
                name: self.name(),
                precondition: Precondition::native_only(),
                steps: vec![Step::new(
                    "create shielded holding account",
                    LedgerOp::CreateHoldingAccount { asset: Asset::Shielded },
                    Some("⚡ Creating your CNf account...".to_string()),
                    |r| {
                        format!(
                            "✅ CNf account created: {}\n{}",
                            r.holding_account.as_deref().unwrap_or("unknown"),
                            tx_line(r)
                        )
                    },
                )],
                summary: None,
                failure_prefix: "❌ Error",
            },
            WorkflowKind::Configure => WorkflowSpec {
                name: self.name(),
                precondition: Precondition::native_only(),
                steps: vec![Step::new(
                    "configure confidential transfers",
                    LedgerOp::ConfigureConfidential { asset: Asset::Shielded },
                    Some("⚡ Configuring confidential transfers...".to_string()),
                    |r| format!("✅ Confidential transfers ready!\n{}", tx_line(r)),
                )],
                summary: None,
                failure_prefix: "❌ Error",
            },
            WorkflowKind::Withdraw => WorkflowSpec {
                name: self.name(),
                precondition: Precondition::native_only(),
                steps: vec![Step::new(
                    "withdraw shielded balance",
                    LedgerOp::WithdrawShielded {
                        asset: Asset::Shielded,
                        amount: WITHDRAW_AMOUNT,
                    },
                    Some(format!("⚡ Withdrawing {} confidential tokens...", WITHDRAW_AMOUNT)),
                    |r| format!("✅ Withdrew {} tokens!\n{}", WITHDRAW_AMOUNT, tx_line(r)),
                )],
                summary: None,
                failure_prefix: "❌ Error",
            },
            WorkflowKind::SendAndReceive => WorkflowSpec {
                name: self.name(),
                precondition: Precondition::native_and(Asset::Stable, MIN_STABLE_FOR_CONVERSION),
                steps: vec![
                    Step::new(
                        "user sends stable asset to bot",
                        LedgerOp::Transfer {
                            owner: Owner::User,
                            asset: Asset::Stable,
                            amount: CONVERSION_AMOUNT,
                            destination: Destination::Bot,
                            confidential: false,
                        },
                        Some(format!(
                            "⚡ Sending {} USDC to get your cnfUSD...",
                            CONVERSION_AMOUNT
                        )),
                        |r| format!("✅ Sent {} USDC!\n{}", CONVERSION_AMOUNT, tx_line(r)),
                    ),
                    Step::new(
                        "bot sends shielded asset to user",
                        LedgerOp::Transfer {
                            owner: Owner::Bot,
                            asset: Asset::Shielded,
                            amount: CONVERSION_AMOUNT,
                            destination: Destination::User,
                            confidential: true,
                        },
                        Some(format!(
                            "⚡ Bot's sending {} cnfUSD your way...",
                            CONVERSION_AMOUNT
                        )),
                        |r| {
                            format!(
                                "✅ Got {} cnfUSD (private)!\n{}",
                                CONVERSION_AMOUNT,
                                tx_line(r)
                            )
                        },
                    ),
                    Step::new(
                        "bot applies pending balance",
                        LedgerOp::ApplyPendingBalance {
                            owner: Owner::Bot,
                            asset: Asset::Shielded,
                        },
                        Some("⚡ Bot's locking in its balance...".to_string()),
                        |r| format!("✅ Bot's balance set!\n{}", tx_line(r)),
                    ),
                    Step::new(
                        "user applies pending balance",
                        LedgerOp::ApplyPendingBalance {
                            owner: Owner::User,
                            asset: Asset::Shielded,
                        },
                        Some("⚡ Locking in your balance...".to_string()),
                        |r| format!("✅ Your balance is ready!\n{}", tx_line(r)),
                    ),
                ],
                summary: Some(format!(
                    "🎉 Done! You've got {amount} cnfUSD (private USD). Cash it out anytime with:\n\
                     ```\nspl-token withdraw-confidential-tokens {mint} {amount}\n```",
                    amount = CONVERSION_AMOUNT,
                    mint = mints.shielded
                )),
                failure_prefix: "❌ Oops, something broke",
            },
            WorkflowKind::Redeem => {
                let quote = RedeemQuote::for_amount(CONVERSION_AMOUNT);
                WorkflowSpec {
                    name: self.name(),
                    precondition: Precondition::native_and(Asset::Shielded, CONVERSION_AMOUNT),
                    steps: vec![
                        Step::new(
                            "user sends shielded asset to bot",
                            LedgerOp::Transfer {
                                owner: Owner::User,
                                asset: Asset::Shielded,
                                amount: quote.gross,
                                destination: Destination::Bot,
                                confidential: false,
                            },
                            Some(format!("⚡ Sending {} cnfUSD to bot...", quote.gross)),
                            move |r| format!("✅ Sent {} cnfUSD!\n{}", quote.gross, tx_line(r)),
                        ),
                        Step::new(
                            "bot sends stable asset net of fee",
                            LedgerOp::Transfer {
                                owner: Owner::Bot,
                                asset: Asset::Stable,
                                amount: quote.net,
                                destination: Destination::User,
                                confidential: false,
                            },
                            Some(format!(
                                "⚡ Bot's sending {:.6} USDC (after 0.42% fee)...",
                                quote.net
                            )),
                            move |r| format!("✅ Got {:.6} USDC!\n{}", quote.net, tx_line(r)),
                        ),
                    ],
                    summary: Some(format!(
                        "🎉 Sweet! You've swapped {} cnfUSD for {:.6} USDC (fee: {:.6}).",
                        quote.gross, quote.net, quote.fee
                    )),
                    failure_prefix: "❌ Damn, error hit",
                }
            }
            WorkflowKind::ConfidentialTransfer(recipient) => {
                let to = recipient.clone();
                WorkflowSpec {
                    name: self.name(),
                    precondition: Precondition::native_and(Asset::Shielded, CONVERSION_AMOUNT),
                    steps: vec![Step::new(
                        "confidential transfer to recipient",
                        LedgerOp::Transfer {
                            owner: Owner::User,
                            asset: Asset::Shielded,
                            amount: CONVERSION_AMOUNT,
                            destination: Destination::External(recipient.clone()),
                            confidential: true,
                        },
                        Some(format!(
                            "⚡ Sending {} confUSD to {}...",
                            CONVERSION_AMOUNT, recipient
                        )),
                        move |r| {
                            format!(
                                "✅ Sent {} confUSD to {}!\n{}",
                                CONVERSION_AMOUNT,
                                to,
                                tx_line(r)
                            )
                        },
                    )],
                    summary: None,
                    failure_prefix: "❌ Error during transfer",
                }
            }
        }
    }
}

/// A workflow expanded for execution
#[derive(Debug)]
pub struct WorkflowSpec {
    pub name: &'static str,
    pub precondition: Precondition,
    pub steps: Vec<Step>,
    /// Final message; when absent the last step's success text is final
    pub summary: Option<String>,
    /// Prepended to the raw ledger error when a step fails
    pub failure_prefix: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::receipt::Receipt;

    fn mints() -> AssetMints {
        AssetMints {
            stable: "STABLE".to_string(),
            shielded: "SHIELDED".to_string(),
        }
    }

    fn snapshot(native: Decimal, stable: Decimal, shielded: Decimal) -> BalanceSnapshot {
        BalanceSnapshot {
            native,
            stable,
            shielded,
            shielded_account_exists: true,
        }
    }

    #[test]
    fn test_redeem_fee_is_exact() {
        let quote = RedeemQuote::for_amount(CONVERSION_AMOUNT);
        assert_eq!(quote.fee, "0.001764".parse::<Decimal>().unwrap());
        assert_eq!(quote.net, "0.418236".parse::<Decimal>().unwrap());
        assert_eq!(format!("{:.6}", quote.net), "0.418236");
        assert_eq!(format!("{:.6}", quote.fee), "0.001764");
    }

    #[test]
    fn test_redeem_summary_reports_net_and_fee() {
        let spec = WorkflowKind::Redeem.spec(&mints());
        let summary = spec.summary.unwrap();
        assert!(summary.contains("0.418236 USDC"));
        assert!(summary.contains("fee: 0.001764"));
        assert_eq!(
            spec.steps[1].op,
            LedgerOp::Transfer {
                owner: Owner::Bot,
                asset: Asset::Stable,
                amount: "0.418236".parse().unwrap(),
                destination: Destination::User,
                confidential: false,
            }
        );
    }

    #[test]
    fn test_send_and_receive_step_order() {
        let spec = WorkflowKind::SendAndReceive.spec(&mints());
        let ops: Vec<_> = spec.steps.iter().map(|s| s.op.clone()).collect();
        assert_eq!(ops.len(), 4);
        assert!(matches!(
            ops[0],
            LedgerOp::Transfer { owner: Owner::User, asset: Asset::Stable, .. }
        ));
        assert!(matches!(
            ops[1],
            LedgerOp::Transfer {
                owner: Owner::Bot,
                asset: Asset::Shielded,
                confidential: true,
                ..
            }
        ));
        assert_eq!(
            ops[2],
            LedgerOp::ApplyPendingBalance { owner: Owner::Bot, asset: Asset::Shielded }
        );
        assert_eq!(
            ops[3],
            LedgerOp::ApplyPendingBalance { owner: Owner::User, asset: Asset::Shielded }
        );
        assert!(spec.summary.unwrap().contains("withdraw-confidential-tokens SHIELDED 0.42"));
    }

    #[test]
    fn test_precondition_boundaries() {
        let spec = WorkflowKind::SendAndReceive.spec(&mints());
        let exact = snapshot(MIN_NATIVE, MIN_STABLE_FOR_CONVERSION, Decimal::ZERO);
        assert!(spec.precondition.is_satisfied(&exact));

        let short = snapshot(MIN_NATIVE, CONVERSION_AMOUNT, Decimal::ZERO);
        match spec.precondition.check(&short) {
            Err(Error::InsufficientBalance { asset, required, actual }) => {
                assert_eq!(asset, "USDC");
                assert_eq!(required, MIN_STABLE_FOR_CONVERSION);
                assert_eq!(actual, CONVERSION_AMOUNT);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_native_checked_first() {
        let spec = WorkflowKind::Redeem.spec(&mints());
        let poor = snapshot(Decimal::new(1, 2), Decimal::ZERO, Decimal::ZERO);
        match spec.precondition.check(&poor) {
            Err(Error::InsufficientBalance { asset, required, actual }) => {
                assert_eq!(asset, "SOL");
                assert_eq!(required, Decimal::new(3, 2));
                assert_eq!(actual, Decimal::new(1, 2));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_create_account_text_uses_holding_account() {
        let spec = WorkflowKind::CreateAccount.spec(&mints());
        let receipt = StepReceipt {
            step: spec.steps[0].description.to_string(),
            receipt: Receipt::new("5sig", "raw"),
            holding_account: Some("HoLd1ng".to_string()),
        };
        let text = spec.steps[0].success_text(&receipt);
        assert!(text.contains("HoLd1ng"));
        assert!(text.contains("5sig"));
    }
}
