//! Scanning: read Stylus sources, parse them, run detectors, collect reports.

use crate::detectors::{run_detectors, Detector};
use crate::error::ScanError;
use crate::parser::ContractParser;
use crate::types::{AnalysisResult, Severity, Statistics};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    /// Descend into subdirectories when the scan path is a directory.
    pub recursive: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self { recursive: true }
    }
}

/// Analysis result for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub result: AnalysisResult,
}

pub fn scan_source(
    parser: &mut ContractParser,
    source: &str,
    detectors: &[Box<dyn Detector>],
) -> Result<AnalysisResult, ScanError> {
    let tree = parser.parse(source)?;
    if tree.root_node().has_error() {
        debug!("source has syntax errors; analyzing the partial tree");
    }
    Ok(run_detectors(detectors, &tree, source))
}

pub fn scan_file(
    parser: &mut ContractParser,
    path: &Path,
    detectors: &[Box<dyn Detector>],
) -> Result<FileReport, ScanError> {
    let source = fs::read_to_string(path).map_err(|source| ScanError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let result = scan_source(parser, &source, detectors)?;
    debug!(path = %path.display(), issues = result.issues().len(), "scanned file");
    Ok(FileReport {
        path: path.to_path_buf(),
        result,
    })
}

/// Scan a single file or every contract file under a directory.
///
/// A file that cannot be read or parsed gets a report carrying the error; the
/// other files are still scanned. A missing grammar aborts the whole scan.
pub fn scan_path(
    path: &Path,
    detectors: &[Box<dyn Detector>],
    options: &ScanOptions,
) -> Result<Vec<FileReport>, ScanError> {
    let files = if path.is_dir() {
        collect_contract_files(path, options.recursive)
    } else if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        return Err(ScanError::MissingPath(path.to_path_buf()));
    };
    info!(path = %path.display(), files = files.len(), "starting scan");

    let mut parser = ContractParser::new();
    let mut reports = Vec::with_capacity(files.len());
    for file in files {
        match scan_file(&mut parser, &file, detectors) {
            Ok(report) => reports.push(report),
            Err(e @ ScanError::Grammar(_)) => return Err(e),
            Err(e) => {
                warn!(path = %file.display(), error = %e, "skipping file");
                let mut result = AnalysisResult::new();
                result.add_error("scan", e.to_string());
                reports.push(FileReport { path: file, result });
            }
        }
    }
    Ok(reports)
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name == "target"
}

/// All `.rs` files under `dir`, sorted. Build output and hidden directories
/// are skipped.
pub fn collect_contract_files(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let walker = if recursive {
        WalkDir::new(dir)
    } else {
        WalkDir::new(dir).max_depth(1)
    };
    let mut files: Vec<PathBuf> = walker
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "rs"))
        .collect();
    files.sort();
    files
}

pub fn calculate_statistics(reports: &[FileReport]) -> Statistics {
    let mut stats = Statistics {
        files: reports.len() as u32,
        ..Statistics::default()
    };

    for report in reports {
        for issue in report.result.issues() {
            match issue.severity {
                Severity::Critical => stats.critical += 1,
                Severity::High => stats.high += 1,
                Severity::Medium => stats.medium += 1,
                Severity::Low => stats.low += 1,
            }
        }
        stats.errors += report.result.errors().len() as u32;
    }

    stats
}
