//! End-of-run summary table

use console::style;
use simreg_common::RunReport;
use std::path::Path;
use tracing::info;

const SEP_LEN: usize = 50;

fn row(name: &str, code: &str, reason: &str) -> String {
    format!("{name:<30}: {code:<15} {reason}")
}

/// Plain rows of the summary with each row's pass flag, header first
pub fn summary_rows(report: &RunReport) -> Vec<(bool, String)> {
    let mut rows = vec![(true, row("Test name", "Error code", "Reason"))];
    rows.extend(report.iter().map(|(id, result)| {
        (result.is_success(), row(id, result.status.code(), &result.reason))
    }));
    rows
}

/// Print the colored table to stdout and mirror it, uncolored, into the log
pub fn print_summary(report: &RunReport, log_file: &Path) {
    let separator = "=".repeat(SEP_LEN);
    let mut lines = vec![
        separator.clone(),
        "Short summary: (Fail will be colored as red, passed will be colored as green.)".to_string(),
        separator.clone(),
    ];
    for line in &lines {
        println!("{line}");
    }

    for (pass, line) in summary_rows(report) {
        if pass {
            println!("{}", style(&line).green());
        } else {
            println!("{}", style(&line).red());
        }
        lines.push(line);
    }

    let mut tail = vec![separator];
    if let Some(reason) = &report.aborted {
        tail.push(format!("Run aborted: {reason}"));
    }
    tail.push(format!(
        "{} passed, {} failed, {} total",
        report.passed_count(),
        report.failed_count(),
        report.len()
    ));
    tail.push(format!("Please check <{}> for the detailed message.", log_file.display()));
    for line in &tail {
        println!("{line}");
    }
    lines.extend(tail);

    for line in lines {
        info!(target: "simreg::summary", "{line}");
    }
}
