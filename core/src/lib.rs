//! Stylus Scan - static security analysis for Stylus (Rust) smart contracts.
//!
//! Sources are parsed with tree-sitter; detectors walk the tree and the
//! embedded Solidity blocks (`sol!`, `sol_interface!`, `sol_storage!`) and
//! write issues into an [`AnalysisResult`].

pub mod ascent;
pub mod detectors;
pub mod embedded;
pub mod error;
pub mod helpers;
pub mod output;
pub mod parser;
pub mod patterns;
pub mod scan;
pub mod types;

pub use detectors::{default_detectors, run_all_detectors, run_detectors, Detector};
pub use error::{DetectorError, ScanError};
pub use output::{print_json, print_results, print_summary};
pub use parser::ContractParser;
pub use scan::{
    calculate_statistics, collect_contract_files, scan_file, scan_path, scan_source, FileReport,
    ScanOptions,
};
pub use types::{AnalysisError, AnalysisResult, Issue, Severity, Statistics};
