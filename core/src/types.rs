//! Core types: severity, issues, detector errors, per-file analysis results.

use colored::*;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Report order, most severe first.
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn as_colored_str(&self) -> ColoredString {
        match self {
            Severity::Critical => "Critical".red().bold(),
            Severity::High => "High".red(),
            Severity::Medium => "Medium".yellow(),
            Severity::Low => "Low".blue(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

/// A single finding. Line numbers are 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub issue_type: String,
    pub severity: Severity,
    pub description: String,
    pub line_start: usize,
    pub line_end: usize,
    pub code_snippet: String,
    pub recommendation: String,
}

impl Issue {
    pub fn print(&self, index: usize, verbose: bool) {
        println!("  [{}] {}", index, self.issue_type.bold());
        println!("      Lines {}-{}", self.line_start, self.line_end);
        if verbose {
            println!("      {} {}", "Description:".dimmed(), self.description);
            println!("      {} {}", "Code:".dimmed(), self.code_snippet);
        }
        println!("      {} {}", "Recommendation:".green().bold(), self.recommendation);
    }
}

/// A detector that failed on one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisError {
    pub detector: String,
    pub message: String,
}

/// Issue sink for one analyzed file. Issues and errors keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    issues: Vec<Issue>,
    errors: Vec<AnalysisError>,
}

impl AnalysisResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn add_error(&mut self, detector: impl Into<String>, message: impl Into<String>) {
        self.errors.push(AnalysisError {
            detector: detector.into(),
            message: message.into(),
        });
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn errors(&self) -> &[AnalysisError] {
        &self.errors
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub files: u32,
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub errors: u32,
}

impl Statistics {
    pub fn total_issues(&self) -> u32 {
        self.critical + self.high + self.medium + self.low
    }
}
