//! Table formatting utilities using comfy-table.

use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use monokit_core::{DispatchReport, Outcome, PackageOutcome};
use serde::Serialize;

use super::{format_elapsed, Status};

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(*h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        )
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// One line of `monokit list`.
#[derive(Debug, Serialize)]
pub struct PackageRow {
    pub name: String,
    pub version: Option<String>,
    pub path: String,
    pub private: bool,
}

pub fn print_package_table(rows: &[PackageRow]) {
    let mut table = new_table(&["Package", "Version", "Path"]);
    for row in rows {
        let name = if row.private {
            format!("{} (private)", row.name)
        } else {
            row.name.clone()
        };
        table.add_row(vec![
            Cell::new(name).fg(Color::White),
            Cell::new(row.version.as_deref().unwrap_or("-")).fg(Color::Cyan),
            Cell::new(&row.path).fg(Color::DarkGrey),
        ]);
    }
    println!("{}", table);
}

/// Prints one row per package in dispatch order.
pub fn print_outcome_table(report: &DispatchReport) {
    let mut table = new_table(&["Status", "Package", "Time", "Details"]);
    for outcome in &report.outcomes {
        let time = outcome.duration.map(format_elapsed).unwrap_or_default();
        if outcome.is_success() {
            table.add_row(vec![
                Cell::new(Status::Success.symbol()).fg(Color::Green),
                Cell::new(&outcome.package).fg(Color::White),
                Cell::new(time).fg(Color::DarkGrey),
                Cell::new(""),
            ]);
        } else {
            table.add_row(vec![
                Cell::new(Status::Error.symbol()).fg(Color::Red),
                Cell::new(&outcome.package).fg(Color::Red),
                Cell::new(time).fg(Color::DarkGrey),
                Cell::new(failure_detail(outcome)).fg(Color::Red),
            ]);
        }
    }
    println!("{}", table);
}

fn failure_detail(outcome: &PackageOutcome) -> String {
    let last_line = outcome.detail.lines().last().unwrap_or("").trim();
    match outcome.outcome {
        Outcome::Succeeded => String::new(),
        Outcome::ConfigUnresolved { .. } => "config not found".to_string(),
        Outcome::Failed { exit_code: Some(code) } if last_line.is_empty() => {
            format!("exited with code {}", code)
        }
        Outcome::Failed { exit_code: Some(code) } => {
            format!("exited with code {}: {}", code, last_line)
        }
        Outcome::Failed { exit_code: None } => "terminated by signal".to_string(),
        Outcome::SpawnFailed => last_line.to_string(),
    }
}
