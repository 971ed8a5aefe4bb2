//! Demo command - switch between the simulated and the real ledger

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::get_data_dir;
use shieldpay_core::services::demo::demo_dir;
use shieldpay_core::services::DemoService;

#[derive(Subcommand)]
pub enum DemoCommands {
    /// Simulate the ledger with funded starter wallets
    #[command(name = "on")]
    On,
    /// Go back to the configured ledger tooling
    #[command(name = "off")]
    Off,
    /// Show whether ledger calls are simulated
    Status,
}

pub fn run(command: Option<DemoCommands>) -> Result<()> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    let service = DemoService::new(&data_dir);

    match command {
        Some(DemoCommands::On) => {
            service.enable()?;
            println!("{}", "Demo ledger on, demo wallets reset".green());
            println!("Try it with 'shieldpay chat --user <id>' and type /start.");
        }
        Some(DemoCommands::Off) => {
            service.disable()?;
            println!("{}", "Demo ledger off".yellow());
        }
        Some(DemoCommands::Status) | None => {
            let wallets = demo_dir(&data_dir).join("keypairs");
            let count = std::fs::read_dir(&wallets)
                .map(|entries| {
                    entries
                        .filter_map(|e| e.ok())
                        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
                        .count()
                })
                .unwrap_or(0);
            let state = if service.is_enabled()? {
                "ON".green()
            } else {
                "OFF".yellow()
            };
            println!("Demo ledger is {} ({} demo wallets)", state, count);
        }
    }
    Ok(())
}
