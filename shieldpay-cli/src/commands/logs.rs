//! Logs command - view and manage the workflow event log

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;

use super::get_data_dir;
use crate::output::create_table;
use shieldpay_core::services::{EntryPoint, LoggingService};

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only failures
        #[arg(long)]
        errors: bool,
        /// Show the events of one workflow run
        #[arg(long)]
        run: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear old log entries
    Clear {
        /// Delete logs older than N days (all logs when 0)
        #[arg(long, default_value = "30")]
        older_than_days: u64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show log statistics and database path
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn get_logging_service() -> Result<LoggingService> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

/// Unix ms `days` before `now`, `None` when that lies outside the calendar
fn cutoff_ms(days: u64, now: DateTime<Utc>) -> Option<i64> {
    let age = Duration::try_days(i64::try_from(days).ok()?)?;
    now.checked_sub_signed(age).map(|cutoff| cutoff.timestamp_millis())
}

pub fn run(command: LogsCommands) -> Result<()> {
    match command {
        LogsCommands::List {
            limit,
            errors,
            run,
            json,
        } => {
            let service = get_logging_service()?;
            let entries = match (&run, errors) {
                (Some(run_id), _) => service.get_run(run_id)?,
                (None, true) => service.get_errors(limit)?,
                (None, false) => service.get_recent(limit)?,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            if entries.is_empty() {
                println!("No log entries found.");
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["Time", "Entry", "Event", "User", "Workflow", "Step", "Error"]);

            for entry in entries {
                let event = if entry.error_message.is_some() {
                    entry.event.red().to_string()
                } else {
                    entry.event
                };
                table.add_row(vec![
                    format_timestamp(entry.timestamp),
                    entry.entry_point,
                    event,
                    entry.user_id.unwrap_or_default(),
                    entry.workflow.unwrap_or_default(),
                    entry.step.unwrap_or_default(),
                    entry.error_message.unwrap_or_default(),
                ]);
            }

            println!("{}", table);
        }
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => {
            let service = get_logging_service()?;

            if !force && !json {
                use dialoguer::Confirm;
                let prompt = if older_than_days == 0 {
                    "Delete all logs?".to_string()
                } else {
                    format!("Delete logs older than {} days?", older_than_days)
                };
                if !Confirm::new().with_prompt(prompt).default(false).interact()? {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let deleted = match (older_than_days, cutoff_ms(older_than_days, Utc::now())) {
                (0, _) => service.clear()?,
                (_, Some(cutoff)) => service.delete_before(cutoff)?,
                // older than anything that can be stored
                (_, None) => 0,
            };

            if json {
                println!("{}", serde_json::json!({ "deleted": deleted }));
            } else {
                println!("Deleted {} log entries", deleted);
            }
        }
        LogsCommands::Stats { json } => {
            let service = get_logging_service()?;
            let total = service.count()?;
            let errors = service.count_errors()?;
            let db_path = service.db_path().to_path_buf();
            let size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "total_entries": total,
                        "error_count": errors,
                        "database_path": db_path.to_string_lossy(),
                        "database_size_bytes": size_bytes
                    })
                );
            } else {
                println!("{}", "Log Statistics".bold());
                println!("  Total entries: {}", total);
                println!("  Errors: {}", errors);
                println!("  Database: {}", db_path.display());
                println!("  Size: {} bytes", size_bytes);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cutoff_ms() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        assert_eq!(cutoff_ms(1, now), Some(1_700_000_000_000 - 86_400_000));
        assert_eq!(cutoff_ms(u64::MAX, now), None);
        assert_eq!(cutoff_ms(i64::MAX as u64, now), None);
        assert_eq!(cutoff_ms(100_000_000, now), None);
    }
}
