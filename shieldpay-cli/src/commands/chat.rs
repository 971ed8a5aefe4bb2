//! Chat command - a line-based stand-in for the chat transport
//!
//! Each line is handled like a chat message: `/start`, a menu trigger
//! (`send_usdc`, `transfer_conf`, ...) or free text answering a pending
//! question. `/quit` or end of input leaves the loop.

use std::io::{BufRead, Write};

use anyhow::Result;
use colored::Colorize;
use shieldpay_core::domain::Action;
use shieldpay_core::ports::Notifier;
use shieldpay_core::services::{EntryPoint, InputOutcome};
use shieldpay_core::{ActionMenu, ShieldpayContext};

use super::get_context;
use crate::output::{self, TerminalNotifier};

pub fn run(user: &str) -> Result<()> {
    let ctx = get_context(EntryPoint::Chat)?;
    let notifier = TerminalNotifier::new();
    let interactive = atty::is(atty::Stream::Stdin);

    if ctx.config.demo_mode {
        output::warning("Demo mode: ledger calls are simulated.");
    }
    output::info(&format!("Chatting as {}. Type /start, a trigger or /quit.", user));

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        if interactive {
            print!("{} ", ">".bold());
            std::io::stdout().flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == "/quit" {
            break;
        }
        handle_message(&ctx, user, message, &notifier);
    }

    Ok(())
}

/// Route one message; failures were already shown through the notifier
fn handle_message(ctx: &ShieldpayContext, user: &str, message: &str, notifier: &TerminalNotifier) {
    if message == "/start" {
        let _ = ctx.wallet_service.start(user, notifier);
        return;
    }
    if message == "/menu" {
        notifier.deliver(user, "Pick an action:", Some(&ActionMenu::main()));
        return;
    }
    if let Some(action) = Action::from_trigger(message) {
        let _ = ctx.trigger(user, action, notifier);
        return;
    }

    match ctx.transfer_conversation.handle_text(user, message, notifier) {
        Ok(InputOutcome::Ignored) => {
            output::warning("Nothing is waiting for input. Type /menu to see the actions.")
        }
        Ok(_) | Err(_) => {}
    }
}
