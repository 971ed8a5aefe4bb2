//! Transfer command - confidential transfer to a recipient the user types in

use std::io::BufRead;

use anyhow::{anyhow, Result};
use dialoguer::Input;
use shieldpay_core::services::{EntryPoint, InputOutcome};
use shieldpay_core::Error;

use super::{finish, get_context, AlreadyReported};
use crate::output::TerminalNotifier;

/// Ask for a recipient until one is accepted, then run the transfer
///
/// With `--recipient` the value is used as the first answer; an invalid
/// one still falls back to prompting on an interactive terminal.
pub fn run(user: &str, recipient: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context(EntryPoint::Cli)?;
    let notifier = TerminalNotifier::for_json(json);
    let interactive = !json && atty::is(atty::Stream::Stdin);

    ctx.transfer_conversation.begin(user, &notifier);
    let mut answer = recipient;

    loop {
        let text = match answer.take() {
            Some(text) => text,
            None if interactive => Input::<String>::new().with_prompt("Recipient").interact_text()?,
            None if json => return Err(anyhow!("--recipient is required with --json")),
            None => read_line()?,
        };

        match ctx.transfer_conversation.handle_text(user, &text, &notifier) {
            Err(Error::Validation(_)) if interactive => continue,
            Ok(InputOutcome::Executed(report)) => {
                let completed = report.is_completed();
                finish(Ok(report), json)?;
                if !completed {
                    return Err(AlreadyReported.into());
                }
                return Ok(());
            }
            Ok(InputOutcome::Ignored) | Ok(InputOutcome::Expired) => {
                return Err(AlreadyReported.into())
            }
            Err(e) => return finish::<()>(Err(e), json),
        }
    }
}

fn read_line() -> Result<String> {
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(anyhow!("No recipient given"));
    }
    Ok(line)
}
