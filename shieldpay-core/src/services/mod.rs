//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod account;
mod balance;
pub mod conversation;
pub mod demo;
mod locks;
pub mod logging;
mod wallet;
mod workflow;

pub use account::AccountStore;
pub use balance::BalanceAggregator;
pub use conversation::{InputOutcome, SessionRegistry, TransferConversation};
pub use demo::DemoService;
pub use locks::{UserLockGuard, UserLocks};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use wallet::{BalanceReport, WalletInfo, WalletService};
pub use workflow::{WorkflowEngine, WorkflowReport, WorkflowStatus};
