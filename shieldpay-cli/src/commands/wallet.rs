//! Wallet commands - onboarding and balances

use anyhow::Result;
use shieldpay_core::services::EntryPoint;

use super::{finish, get_context};
use crate::output::TerminalNotifier;

/// Create the wallet on first use, otherwise greet the user
pub fn start(user: &str, json: bool) -> Result<()> {
    let ctx = get_context(EntryPoint::Cli)?;
    finish(ctx.wallet_service.start(user, &TerminalNotifier::for_json(json)), json)
}

pub fn balance(user: &str, json: bool) -> Result<()> {
    let ctx = get_context(EntryPoint::Cli)?;
    finish(ctx.wallet_service.check_balance(user, &TerminalNotifier::for_json(json)), json)
}
