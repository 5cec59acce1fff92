//! Output formatting utilities for the CLI

use tabled::{settings::Style, Table, Tabled};

use kg_core::KernelHandle;

/// Format a list of kernels as an ASCII table
///
/// Returns "No kernels running" if the list is empty.
pub fn format_kernels(kernels: &[KernelHandle]) -> String {
    if kernels.is_empty() {
        return "No kernels running".to_string();
    }

    #[derive(Tabled)]
    struct KernelRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "STATE")]
        state: String,
        #[tabled(rename = "CONNECTIONS")]
        connections: String,
        #[tabled(rename = "LAST ACTIVITY")]
        last_activity: String,
    }

    let rows: Vec<KernelRow> = kernels
        .iter()
        .map(|k| KernelRow {
            id: k.id().to_string(),
            name: k.name().to_string(),
            state: k.execution_state().unwrap_or("-").to_string(),
            connections: k
                .connections()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
            last_activity: k.last_activity().unwrap_or("-").to_string(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red to stderr
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow to stderr
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}
