//! Workflow commands - one per conversion

use anyhow::Result;
use shieldpay_core::domain::WorkflowKind;
use shieldpay_core::services::EntryPoint;

use super::{finish, get_context, AlreadyReported};
use crate::output::TerminalNotifier;

/// Run a workflow for `user`; a failed step exits non-zero
pub fn run(user: &str, kind: WorkflowKind, json: bool) -> Result<()> {
    let ctx = get_context(EntryPoint::Cli)?;
    let notifier = TerminalNotifier::for_json(json);

    let result = ctx.run(user, &kind, &notifier);
    let completed = matches!(&result, Ok(report) if report.is_completed());
    finish(result, json)?;
    if !completed {
        return Err(AlreadyReported.into());
    }
    Ok(())
}
