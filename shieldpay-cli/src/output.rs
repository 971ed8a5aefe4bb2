//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use serde::Serialize;

use shieldpay_core::ports::Notifier;
use shieldpay_core::{ActionMenu, OperationResult};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Print an operation result as JSON
pub fn print_json<T: Serialize>(result: OperationResult<T>) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Renders chat messages on the terminal
///
/// Messages are coloured by their leading marker; a menu becomes a table
/// of trigger names. A quiet notifier prints nothing (used with `--json`).
#[derive(Default)]
pub struct TerminalNotifier {
    quiet: bool,
}

impl TerminalNotifier {
    pub fn new() -> Self {
        Self { quiet: false }
    }

    /// Quiet when the command prints JSON instead
    pub fn for_json(json: bool) -> Self {
        Self { quiet: json }
    }
}

impl Notifier for TerminalNotifier {
    fn deliver(&self, _user_id: &str, text: &str, menu: Option<&ActionMenu>) {
        if self.quiet {
            return;
        }

        if text.starts_with('❌') {
            error(text);
        } else if text.starts_with('✅') || text.starts_with('🎉') {
            success(text);
        } else if text.starts_with('⚡') {
            info(text);
        } else if text.starts_with('⚠') || text.starts_with('⌛') || text.starts_with('⏳') {
            warning(text);
        } else {
            println!("{}", text);
        }

        if let Some(menu) = menu {
            let mut table = create_table();
            table.set_header(vec!["Trigger", "Action"]);
            for action in &menu.actions {
                table.add_row(vec![action.trigger(), action.label()]);
            }
            println!("{}", table);
        }
    }
}
