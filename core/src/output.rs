//! Output formatting: terminal and JSON.

use crate::scan::FileReport;
use crate::types::{Issue, Severity, Statistics};
use colored::*;
use serde::Serialize;

pub fn print_results(report: &FileReport, verbose: bool) {
    let result = &report.result;
    println!("\n{}", "═".repeat(60).dimmed());
    println!("{} {}", "Scanning:".bold(), report.path.display());
    println!("{}", "═".repeat(60).dimmed());

    if !result.has_issues() {
        println!("{}", "✓ No issues found!".green().bold());
    } else {
        println!("{} {} issue(s) found:\n", "⚠".yellow(), result.issues().len());

        for severity in Severity::ALL {
            let group: Vec<&Issue> = result
                .issues()
                .iter()
                .filter(|issue| issue.severity == severity)
                .collect();
            if group.is_empty() {
                continue;
            }
            println!("{} ({})", severity.as_colored_str(), group.len());
            for (index, issue) in group.into_iter().enumerate() {
                issue.print(index + 1, verbose);
            }
            println!();
        }
    }

    if result.has_errors() {
        println!("{}", "Errors".red().bold());
        for error in result.errors() {
            println!("  Error in {}: {}", error.detector.bold(), error.message);
        }
    }
}

pub fn print_summary(stats: &Statistics) {
    println!("{}", "─".repeat(60).dimmed());
    println!(
        "{} Scanned {} file(s), {} issue(s)",
        "Summary".bold(),
        stats.files,
        stats.total_issues()
    );
    if stats.critical > 0 {
        println!("  {} Critical: {}", "●".red(), stats.critical);
    }
    if stats.high > 0 {
        println!("  {} High: {}", "●".red(), stats.high);
    }
    if stats.medium > 0 {
        println!("  {} Medium: {}", "●".yellow(), stats.medium);
    }
    if stats.low > 0 {
        println!("  {} Low: {}", "●".blue(), stats.low);
    }
    if stats.errors > 0 {
        println!("  {} Errors: {}", "●".magenta(), stats.errors);
    }
    println!();
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    reports: &'a [FileReport],
    statistics: &'a Statistics,
}

pub fn to_json(reports: &[FileReport], stats: &Statistics) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonOutput {
        reports,
        statistics: stats,
    })
}

pub fn print_json(reports: &[FileReport], stats: &Statistics) -> serde_json::Result<()> {
    println!("{}", to_json(reports, stats)?);
    Ok(())
}
