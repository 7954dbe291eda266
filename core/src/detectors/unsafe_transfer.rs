//! Detector: Transfers to unvalidated recipients.
//!
//! Flags transfer calls whose recipient comes straight from a function
//! parameter that is never validated, or from an expression too complex to
//! reason about without data flow. A transfer to the caller is always safe.

use super::guard::{FirstMentionGuard, GuardStrategy};
use super::Detector;
use crate::embedded::{extract_functions, extract_sections, EmbeddedFunction};
use crate::error::DetectorError;
use crate::helpers::{
    call_arguments, callee_name, enclosing_function, function_parameters, is_sender_reference,
    is_transfer_method, line_range, mentions_identifier, node_text, preorder, split_line_comment,
};
use crate::patterns::{ADDRESS_PARAM, LOW_LEVEL_CALL, TOKEN_TRANSFER_CALL, VALIDATION_WORDS};
use crate::types::{AnalysisResult, Issue, Severity};
use tracing::trace;
use tree_sitter::{Node, Tree};

const ISSUE_TYPE: &str = "unsafe_transfer";

const DESCRIPTION: &str = "Transfer to potentially unsafe or unvalidated address. This can lead to funds being sent to malicious contracts or incorrect addresses.";

const RECOMMENDATION: &str = "Validate recipient addresses before transfers. Consider implementing address whitelisting or validation checks.";

pub struct UnsafeTransferDetector {
    guard: Box<dyn GuardStrategy>,
}

impl UnsafeTransferDetector {
    pub fn new() -> Self {
        Self::with_guard(FirstMentionGuard)
    }

    pub fn with_guard(guard: impl GuardStrategy + 'static) -> Self {
        Self {
            guard: Box::new(guard),
        }
    }
}

impl Default for UnsafeTransferDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for UnsafeTransferDetector {
    fn name(&self) -> &'static str {
        ISSUE_TYPE
    }

    fn description(&self) -> &'static str {
        "Detects potentially unsafe transfers to unvalidated addresses"
    }

    fn detect(&self, tree: &Tree, source: &str, sink: &mut AnalysisResult) -> Result<(), DetectorError> {
        for call in preorder(tree.root_node()).filter(|n| n.kind() == "call_expression") {
            let Some(method) = callee_name(&call, source).filter(|name| is_transfer_method(name)) else {
                continue;
            };
            let Some(recipient) = recipient_argument(&call, method, source) else {
                continue;
            };
            if !self.recipient_is_unsafe(call, recipient, source) {
                continue;
            }

            let (line_start, line_end) = line_range(&call);
            sink.add_issue(Issue {
                issue_type: ISSUE_TYPE.to_string(),
                severity: Severity::Medium,
                description: DESCRIPTION.to_string(),
                line_start,
                line_end,
                code_snippet: node_text(&call, source).to_string(),
                recommendation: RECOMMENDATION.to_string(),
            });
        }

        for section in extract_sections(source) {
            for function in extract_functions(&section) {
                check_embedded_function(&function, sink);
            }
        }
        Ok(())
    }
}

impl UnsafeTransferDetector {
    fn recipient_is_unsafe(&self, call: Node, recipient: Node, source: &str) -> bool {
        let text = node_text(&recipient, source);
        if is_sender_reference(text) {
            return false;
        }
        match recipient.kind() {
            "identifier" => {
                let Some(function) = enclosing_function(&call) else {
                    return false;
                };
                let is_param = function_parameters(&function, source).iter().any(|p| p == text);
                let unsafe_param = is_param && !self.guard.is_validated(function, text, call, source);
                trace!(recipient = text, is_param, unsafe_param, guard = self.guard.name());
                unsafe_param
            }
            // no data flow to prove these safe
            "binary_expression" | "call_expression" => true,
            _ => false,
        }
    }
}

/// Inline Stylus call context: `self`, `&mut *self`, `Call::new_in(self)`.
fn is_call_context(arg: &Node, source: &str) -> bool {
    let text: String = node_text(arg, source).chars().filter(|c| !c.is_whitespace()).collect();
    arg.kind() == "self" || matches!(text.as_str(), "self" | "&mut*self" | "&*self" | "&mutself")
        || text.starts_with("Call::")
}

/// Recipient of a transfer call: the first argument, or the second for
/// `transferFrom`. References are looked through.
///
/// Stylus interface calls take a call context first, either inline or bound
/// to a local (`let config = Call::new_in(self)`). It is skipped when the call
/// has one argument more than the ERC-20 signature, or looks like a context.
fn recipient_argument<'tree>(call: &Node<'tree>, method: &str, source: &str) -> Option<Node<'tree>> {
    let arguments = call_arguments(call);
    let (index, arity) = match method {
        "transferFrom" | "transfer_from" => (1, 3),
        _ => (0, 2),
    };
    let has_context = arguments.len() == arity + 1
        || arguments.first().is_some_and(|arg| is_call_context(arg, source));
    let mut recipient = *arguments.get(usize::from(has_context) + index)?;
    while recipient.kind() == "reference_expression" {
        recipient = recipient.child_by_field_name("value")?;
    }
    Some(recipient)
}

fn check_embedded_function(function: &EmbeddedFunction, sink: &mut AnalysisResult) {
    let address_params: Vec<&str> = ADDRESS_PARAM
        .captures_iter(&function.params)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect();
    if address_params.is_empty() {
        return;
    }

    let is_validated = |param: &str| {
        function.lines.iter().any(|(_, line)| {
            let (code, _) = split_line_comment(line);
            VALIDATION_WORDS.iter().any(|word| code.contains(word)) && mentions_identifier(code, param)
        })
    };

    let flagged = function.body_lines().find(|(_, line)| {
        let (code, _) = split_line_comment(line);
        let transfer_shaped = TOKEN_TRANSFER_CALL.is_match(code) || LOW_LEVEL_CALL.is_match(code);
        transfer_shaped
            && address_params
                .iter()
                .any(|&param| mentions_identifier(code, param) && !is_validated(param))
    });

    if let Some((line_no, line)) = flagged {
        sink.add_issue(Issue {
            issue_type: ISSUE_TYPE.to_string(),
            severity: Severity::Medium,
            description: format!(
                "Function '{}' transfers to an address parameter that is never validated.",
                function.name
            ),
            line_start: line_no,
            line_end: line_no,
            code_snippet: line.trim().to_string(),
            recommendation: RECOMMENDATION.to_string(),
        });
    }
}
