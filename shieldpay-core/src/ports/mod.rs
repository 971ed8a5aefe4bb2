//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod ledger;
mod notifier;

pub use ledger::{LedgerClient, LedgerResult};
pub use notifier::{Delivery, Notifier, RecordingNotifier};
