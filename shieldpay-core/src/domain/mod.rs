//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
pub mod balance;
mod menu;
mod receipt;
mod recipient;
pub mod result;
mod session;
pub mod workflow;

pub use account::{AccountRecord, Disclosure, KeyMaterial, Signer, KEYPAIR_LEN};
pub use balance::{BalanceSnapshot, Holdings};
pub use menu::{Action, ActionMenu};
pub use receipt::{Receipt, StepReceipt};
pub use recipient::{Recipient, RECIPIENT_LEN};
pub use session::{AwaitedField, PendingInputSession};
pub use workflow::{
    Asset, AssetMints, Destination, LedgerOp, Owner, Precondition, RedeemQuote, Step,
    WorkflowKind, WorkflowSpec,
};
