//! CLI command implementations

pub mod chat;
pub mod demo;
pub mod logs;
pub mod transfer;
pub mod wallet;
pub mod workflow;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use shieldpay_core::services::EntryPoint;
use shieldpay_core::ShieldpayContext;

/// Get the data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("SHIELDPAY_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".shieldpay"))
        .ok_or_else(|| anyhow!("Could not find home directory; set SHIELDPAY_DIR"))
}

/// Build the context for the given front end
pub fn get_context(entry_point: EntryPoint) -> Result<ShieldpayContext> {
    let data_dir = get_data_dir()?;

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    ShieldpayContext::new(&data_dir, entry_point).context("Failed to initialize shieldpay context")
}

/// The user every wallet command acts for
pub fn require_user(user: Option<String>) -> Result<String> {
    user.filter(|u| !u.trim().is_empty())
        .map(|u| u.trim().to_string())
        .ok_or_else(|| anyhow!("No user given. Pass --user <id> or set SHIELDPAY_USER."))
}

/// Marks a failure whose message the user already saw through the notifier
#[derive(Debug)]
pub struct AlreadyReported;

impl std::fmt::Display for AlreadyReported {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "operation failed")
    }
}

impl std::error::Error for AlreadyReported {}

/// Print a core result the way the command was asked to
///
/// In JSON mode the whole result is printed. Otherwise the notifier has
/// already shown everything and only the exit status is left to set.
pub fn finish<T: serde::Serialize>(
    result: shieldpay_core::domain::result::Result<T>,
    json: bool,
) -> Result<()> {
    let failed = result.is_err();
    if json {
        crate::output::print_json(result.into())?;
    }
    if failed {
        return Err(AlreadyReported.into());
    }
    Ok(())
}
