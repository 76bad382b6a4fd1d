//! Plain-text rendering of a report for the terminal.

use std::fmt::Write;

use crate::model::{CirculationNode, CirculationReport, DataIssue};

/// Render the supply tree, token sections, totals and freshness as text
///
/// **Public** - printed by `report --summary`
pub fn render_summary(report: &CirculationReport) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "DeSo circulation report (schema {}, generated {})",
        report.version,
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    out.push('\n');

    render_node(&mut out, &report.supply_tree, 0);
    for section in &report.token_sections {
        render_node(&mut out, section, 0);
    }

    let totals = &report.totals;
    out.push('\n');
    let _ = writeln!(out, "Totals");
    let _ = writeln!(out, "  issued:       {}", format_amount(totals.total_issued));
    let _ = writeln!(out, "  staked:       {}", format_amount(totals.total_staked));
    let _ = writeln!(
        out,
        "  unattributed: {}",
        format_amount(totals.unattributed_stake)
    );
    let _ = writeln!(
        out,
        "  classified:   {}",
        format_amount(totals.classified_unstaked)
    );
    let _ = writeln!(out, "  free float:   {}", format_amount(totals.free_float));

    let freshness = &report.freshness;
    out.push('\n');
    let _ = writeln!(
        out,
        "Source: {:?}{}",
        freshness.source,
        if freshness.stale { " (stale)" } else { "" }
    );
    for issue in &freshness.issues {
        let _ = writeln!(out, "  ! {}", describe_issue(issue));
    }

    out
}

fn render_node(out: &mut String, node: &CirculationNode, depth: usize) {
    let _ = writeln!(
        out,
        "{:indent$}{:<width$} {:>20}  ${:>16}",
        "",
        node.label,
        format_amount(node.amount),
        format_amount(node.usd_value),
        indent = depth * 2,
        width = 36usize.saturating_sub(depth * 2),
    );
    for child in &node.children {
        render_node(out, child, depth + 1);
    }
}

/// Two decimals with thousands separators
fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac)
}

fn describe_issue(issue: &DataIssue) -> String {
    match issue {
        DataIssue::TransportFailure { scope, message } => {
            format!("{}: transport failure: {}", scope, message)
        }
        DataIssue::MalformedResponse { scope, message } => {
            format!("{}: malformed response: {}", scope, message)
        }
        DataIssue::PartialDataFailure {
            scope,
            failed,
            attempted,
        } => format!("{}: {} of {} failed", scope, failed, attempted),
        DataIssue::StaleFallback { reason } => format!("stale fallback: {}", reason),
    }
}
