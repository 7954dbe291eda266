//! Security detectors for Stylus smart contracts.
//!
//! Each sub-module implements one detector. [`run_detectors`] invokes every
//! detector against a parsed tree-sitter tree and collects issues into a single
//! [`AnalysisResult`]. A detector that fails is recorded as an error on the
//! result; the remaining detectors still run.

mod guard;
mod unchecked_transfer;
mod unsafe_transfer;

pub use guard::{FirstMentionGuard, GuardStrategy, PrecedingGuard};
pub use unchecked_transfer::UncheckedTransferDetector;
pub use unsafe_transfer::UnsafeTransferDetector;

use crate::error::DetectorError;
use crate::types::AnalysisResult;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

pub trait Detector {
    /// Stable identifier, also used as the issue type.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn detect(
        &self,
        tree: &tree_sitter::Tree,
        source: &str,
        sink: &mut AnalysisResult,
    ) -> Result<(), DetectorError>;
}

pub fn default_detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(UncheckedTransferDetector),
        Box::new(UnsafeTransferDetector::new()),
    ]
}

/// Run `detectors` in order against one parsed file.
pub fn run_detectors(
    detectors: &[Box<dyn Detector>],
    tree: &tree_sitter::Tree,
    source: &str,
) -> AnalysisResult {
    let mut result = AnalysisResult::new();

    for detector in detectors {
        let before = result.issues().len();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            detector.detect(tree, source, &mut result)
        }));
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };
        match failure {
            Some(message) => {
                warn!(detector = detector.name(), %message, "detector failed");
                result.add_error(detector.name(), message);
            }
            None => debug!(
                detector = detector.name(),
                issues = result.issues().len() - before,
                "detector finished"
            ),
        }
    }

    result
}

/// Run every default detector.
pub fn run_all_detectors(tree: &tree_sitter::Tree, source: &str) -> AnalysisResult {
    run_detectors(&default_detectors(), tree, source)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
