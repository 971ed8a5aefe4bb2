//! ShieldPay CLI - custodial wallet and private-dollar conversions in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use shieldpay_core::domain::WorkflowKind;

mod commands;
mod output;

use commands::{chat, demo, logs, require_user, transfer, wallet, workflow, AlreadyReported};

/// ShieldPay - swap USDC for confidential cnfUSD and back
#[derive(Parser)]
#[command(name = "shieldpay", version, about, long_about = None)]
struct Cli {
    /// User the wallet belongs to
    #[arg(long, short, global = true, env = "SHIELDPAY_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create your wallet, or show it if it exists
    Start {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show SOL, USDC and cnfUSD balances
    Balance {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create the cnfUSD holding account
    CreateAccount {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Enable confidential transfers on the cnfUSD account
    Configure {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move 0.4 cnfUSD from the confidential to the public balance
    Withdraw {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send 0.42 USDC and receive 0.42 confidential cnfUSD
    Send {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Swap 0.42 cnfUSD back to USDC (0.42% fee)
    Redeem {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Confidentially transfer 0.42 cnfUSD to another wallet
    Transfer {
        /// Recipient public key (prompted for when omitted)
        #[arg(long)]
        recipient: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Talk to the wallet the way the chat bot does
    Chat,

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.downcast_ref::<AlreadyReported>().is_none() {
                output::error(&e.to_string());
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let user = cli.user;
    match cli.command {
        Commands::Start { json } => wallet::start(&require_user(user)?, json),
        Commands::Balance { json } => wallet::balance(&require_user(user)?, json),
        Commands::CreateAccount { json } => {
            workflow::run(&require_user(user)?, WorkflowKind::CreateAccount, json)
        }
        Commands::Configure { json } => {
            workflow::run(&require_user(user)?, WorkflowKind::Configure, json)
        }
        Commands::Withdraw { json } => {
            workflow::run(&require_user(user)?, WorkflowKind::Withdraw, json)
        }
        Commands::Send { json } => {
            workflow::run(&require_user(user)?, WorkflowKind::SendAndReceive, json)
        }
        Commands::Redeem { json } => {
            workflow::run(&require_user(user)?, WorkflowKind::Redeem, json)
        }
        Commands::Transfer { recipient, json } => {
            transfer::run(&require_user(user)?, recipient, json)
        }
        Commands::Chat => chat::run(&require_user(user)?),
        Commands::Logs { command } => logs::run(command),
        Commands::Demo { command } => demo::run(command),
    }
}
