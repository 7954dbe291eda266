//! Detector: Unchecked transfer return values.
//!
//! Flags `transfer()`, `send()` and `transferFrom()` calls whose success value
//! is never inspected, `match` arms that swallow a transfer error, and low-level
//! calls carrying transfer calldata whose result is ignored. Solidity embedded
//! in `sol!` blocks gets the same treatment through a line-based scan.

use super::Detector;
use crate::ascent::{ascend, AscentContext, CallKind, Verdict, VALUE_CHECK_STOPS};
use crate::embedded::{extract_functions, extract_sections, EmbeddedFunction};
use crate::error::DetectorError;
use crate::helpers::{
    bound_identifiers, callee_name, enclosing_function, is_transfer_method, node_text,
    line_range, preorder, split_line_comment,
};
use crate::patterns::{
    guards_name, scan_for_guard, GuardScan, BOOL_DECLARATION, LOW_LEVEL_CALL,
    PAYABLE_TRANSFER, TOKEN_TRANSFER_CALL, TUPLE_BOOL_BINDING, WRAPPING_GUARD,
};
use crate::types::{AnalysisResult, Issue, Severity};
use tree_sitter::{Node, Tree};

const ISSUE_TYPE: &str = "unchecked_transfer";

/// Text that ties a call to a token interface binding.
const TOKEN_INTERFACE_MARKERS: &[&str] = &["IERC20", "sol_interface!"];

/// Wrapper names known to wrap an unchecked low-level token call.
const UNSAFE_WRAPPERS: &[&str] = &[
    "unsafeTransferERC20",
    "unsafeTransferFromERC20",
    "unsafe_transfer_erc20",
    "unsafe_transfer_from_erc20",
];

/// Lines after a wrapper's declaration searched for a low-level call.
const WRAPPER_LOOKAHEAD: usize = 10;

/// Lines before a call searched for its success boolean.
const BOOL_LOOKBEHIND: usize = 2;

const RECOMMENDATION: &str = "Check the return value of transfer calls or use a function that reverts on failure (like transfer_or_revert).";

#[derive(Debug, Default, Clone, Copy)]
pub struct UncheckedTransferDetector;

impl Detector for UncheckedTransferDetector {
    fn name(&self) -> &'static str {
        ISSUE_TYPE
    }

    fn description(&self) -> &'static str {
        "Detects unchecked transfer calls where the return value is not checked"
    }

    fn detect(&self, tree: &Tree, source: &str, sink: &mut AnalysisResult) -> Result<(), DetectorError> {
        for node in preorder(tree.root_node()) {
            match node.kind() {
                "call_expression" => check_call(node, source, sink)?,
                "match_expression" => check_ignored_errors(node, source, sink),
                _ => {}
            }
        }

        for section in extract_sections(source) {
            for function in extract_functions(&section) {
                check_embedded_function(&function, sink);
            }
        }
        Ok(())
    }
}

fn call_kind(call: &Node, source: &str) -> Option<CallKind> {
    let name = callee_name(call, source)?;
    if is_transfer_method(name) || (name == "approve" && bound_to_token_interface(call, source)) {
        Some(CallKind::ValueReturning)
    } else if name == "call" && node_text(call, source).contains("transfer") {
        Some(CallKind::LowLevel)
    } else {
        None
    }
}

fn bound_to_token_interface(call: &Node, source: &str) -> bool {
    let in_function = enclosing_function(call)
        .map(|function| node_text(&function, source))
        .is_some_and(|text| TOKEN_INTERFACE_MARKERS.iter().any(|m| text.contains(m)));
    let preceding = source.get(..call.start_byte()).unwrap_or("");
    in_function || TOKEN_INTERFACE_MARKERS.iter().any(|m| preceding.contains(m))
}

fn check_call(call: Node, source: &str, sink: &mut AnalysisResult) -> Result<(), DetectorError> {
    let Some(kind) = call_kind(&call, source) else {
        return Ok(());
    };

    let ctx = AscentContext { call, kind, source };
    let mut checked = match ascend(VALUE_CHECK_STOPS, &ctx) {
        Some(Verdict::Checked) => true,
        Some(Verdict::Bound(binding)) => binding_is_guarded(binding, source)?,
        Some(Verdict::Unchecked) | None => false,
    };
    if kind == CallKind::LowLevel && !checked {
        checked = low_level_result_guarded(&call, source);
    }
    if checked {
        return Ok(());
    }

    let description = match kind {
        CallKind::ValueReturning => "Transfer call with unchecked return value. This can lead to silent failures when transfers fail.",
        CallKind::LowLevel => "Low-level call performing a transfer without checking its success. The transfer might fail silently.",
    };
    let (line_start, line_end) = line_range(&call);
    sink.add_issue(Issue {
        issue_type: ISSUE_TYPE.to_string(),
        severity: Severity::High,
        description: description.to_string(),
        line_start,
        line_end,
        code_snippet: node_text(&call, source).to_string(),
        recommendation: RECOMMENDATION.to_string(),
    });
    Ok(())
}

/// Names a `let` or assignment binds the call's value to. Empty for `_`.
fn binding_names(binding: &Node, source: &str) -> Vec<String> {
    match binding.kind() {
        "let_declaration" => binding
            .child_by_field_name("pattern")
            .map(|pattern| bound_identifiers(&pattern, source))
            .unwrap_or_default(),
        "assignment_expression" => binding
            .child_by_field_name("left")
            .filter(|left| matches!(left.kind(), "identifier" | "field_expression"))
            .map(|left| vec![node_text(&left, source).to_string()])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Text from the end of `node` to the end of its enclosing function (or file).
fn text_after<'a>(node: &Node, source: &'a str) -> &'a str {
    let end = enclosing_function(node).map_or(source.len(), |function| function.end_byte());
    source.get(node.end_byte()..end).unwrap_or("")
}

fn binding_is_guarded(binding: Node, source: &str) -> Result<bool, DetectorError> {
    let rest = text_after(&binding, source);
    for name in binding_names(&binding, source) {
        if scan_for_guard(rest, &name)? == GuardScan::Guarded {
            return Ok(true);
        }
    }
    Ok(false)
}

/// `(bool, ..)`-shaped binding in the enclosing function followed by a guard
/// on the boolean.
fn low_level_result_guarded(call: &Node, source: &str) -> bool {
    let Some(function) = enclosing_function(call) else {
        return false;
    };
    let text = node_text(&function, source);
    TUPLE_BOOL_BINDING.captures_iter(text).any(|caps| {
        caps.get(1).is_some_and(|name| {
            text[name.end()..]
                .lines()
                .any(|line| guards_name(split_line_comment(line).0, name.as_str()))
        })
    })
}

fn check_ignored_errors(node: Node, source: &str, sink: &mut AnalysisResult) {
    if !node_text(&node, source).contains("transfer") {
        return;
    }
    let Some(body) = node.child_by_field_name("body") else {
        return;
    };

    let mut cursor = body.walk();
    let arms: Vec<Node> = body
        .named_children(&mut cursor)
        .filter(|child| child.kind() == "match_arm")
        .collect();

    for arm in arms {
        let is_error_arm = arm
            .child_by_field_name("pattern")
            .is_some_and(|pattern| node_text(&pattern, source).trim_start().starts_with("Err"));
        let swallowed = arm
            .child_by_field_name("value")
            .is_some_and(|value| is_empty_body(&value));
        if !(is_error_arm && swallowed) {
            continue;
        }

        let (line_start, line_end) = line_range(&arm);
        sink.add_issue(Issue {
            issue_type: ISSUE_TYPE.to_string(),
            severity: Severity::High,
            description: "Transfer errors are explicitly ignored. Execution continues even if the transfer failed.".to_string(),
            line_start,
            line_end,
            code_snippet: node_text(&arm, source).to_string(),
            recommendation: "Return or propagate the error from the Err arm instead of ignoring it.".to_string(),
        });
    }
}

/// `{}` (comments allowed) or `()`.
fn is_empty_body(value: &Node) -> bool {
    match value.kind() {
        "unit_expression" => true,
        "block" => {
            let mut cursor = value.walk();
            let empty = value
                .named_children(&mut cursor)
                .all(|child| matches!(child.kind(), "line_comment" | "block_comment"));
            empty
        }
        _ => false,
    }
}

fn check_embedded_function(function: &EmbeddedFunction, sink: &mut AnalysisResult) {
    if UNSAFE_WRAPPERS.contains(&function.name) {
        let mut window = function.lines.iter().take(WRAPPER_LOOKAHEAD + 1);
        if let Some(&(line_no, line)) =
            window.find(|(_, line)| LOW_LEVEL_CALL.is_match(split_line_comment(line).0))
        {
            sink.add_issue(embedded_issue(
                line_no,
                line,
                format!(
                    "Known unsafe transfer wrapper '{}' performs a low-level call without checking its result.",
                    function.name
                ),
            ));
        }
        // reported or not, the generic check does not apply to deny-listed wrappers
        return;
    }

    for (index, &(line_no, line)) in function.lines.iter().enumerate() {
        let (code, _) = split_line_comment(line);
        if !is_embedded_transfer(code) || WRAPPING_GUARD.is_match(code) {
            continue;
        }
        if !success_checked(&function.lines, index) {
            sink.add_issue(embedded_issue(
                line_no,
                line,
                "Transfer call in embedded Solidity without a success check. The transfer might fail silently.".to_string(),
            ));
        }
    }
}

fn is_embedded_transfer(code: &str) -> bool {
    let token_transfer = TOKEN_TRANSFER_CALL.is_match(code) && !PAYABLE_TRANSFER.is_match(code);
    let low_level = LOW_LEVEL_CALL.is_match(code) && code.contains("transfer");
    token_transfer || low_level
}

/// A `bool` declared on the call line or just before it, guarded afterwards.
fn success_checked(lines: &[(usize, &str)], index: usize) -> bool {
    let from = index.saturating_sub(BOOL_LOOKBEHIND);
    lines[from..=index].iter().any(|&(_, line)| {
        let (code, _) = split_line_comment(line);
        BOOL_DECLARATION
            .captures(code)
            .and_then(|caps| caps.get(1))
            .is_some_and(|name| {
                lines[index..]
                    .iter()
                    .any(|(_, later)| guards_name(split_line_comment(later).0, name.as_str()))
            })
    })
}

fn embedded_issue(line_no: usize, line: &str, description: String) -> Issue {
    Issue {
        issue_type: ISSUE_TYPE.to_string(),
        severity: Severity::High,
        description,
        line_start: line_no,
        line_end: line_no,
        code_snippet: line.trim().to_string(),
        recommendation: "Capture the call result in a success boolean and require it, e.g. (bool success, ) = token.call(...); require(success);".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ContractParser;

    fn detect(source: &str) -> AnalysisResult {
        let tree = ContractParser::new().parse(source).unwrap();
        let mut result = AnalysisResult::new();
        UncheckedTransferDetector.detect(&tree, source, &mut result).unwrap();
        result
    }

    #[test]
    fn test_bound_and_guarded_transfer_is_clean() {
        let source = "fn pay(to: Address, amt: U256) { let ok = token.transfer(to, amt); if !ok { revert(); } }";
        assert!(!detect(source).has_issues());
    }

    #[test]
    fn test_discarded_transfer_is_reported() {
        let source = "fn pay(to: Address, amt: U256) {\n    let _ = token.transfer(to, amt);\n}";
        let result = detect(source);
        assert_eq!(result.issues().len(), 1);
        let issue = &result.issues()[0];
        assert_eq!(issue.issue_type, "unchecked_transfer");
        assert_eq!(issue.severity, Severity::High);
        assert_eq!((issue.line_start, issue.line_end), (2, 2));
        assert_eq!(issue.code_snippet, "token.transfer(to, amt)");
    }

    #[test]
    fn test_compound_guard_on_binding_is_clean() {
        let source = "fn pay(to: Address, amt: U256) {\n    let ok = token.transfer(to, amt);\n    if amount > 0 && !ok { revert(); }\n}";
        assert!(!detect(source).has_issues());

        let asserted = "fn pay() {\n    let ok = token.transfer(to, amt);\n    assert_eq!(ok, true);\n}";
        assert!(!detect(asserted).has_issues());
    }

    #[test]
    fn test_assignment_binding() {
        let guarded = "fn pay() {\n    let mut ok = false;\n    ok = token.transfer(to, amt);\n    if !ok { revert(); }\n}";
        assert!(!detect(guarded).has_issues());

        let unguarded = "fn pay() {\n    let mut ok = false;\n    ok = token.transfer(to, amt);\n}";
        let lines: Vec<usize> = detect(unguarded).issues().iter().map(|i| i.line_start).collect();
        assert_eq!(lines, vec![3]);
    }

    #[test]
    fn test_transfer_in_binary_expression_is_clean() {
        let source = "fn pay() {\n    let both = token.transfer(to, amt) && other.transfer(to, amt);\n    both\n}";
        assert!(!detect(source).has_issues());
    }

    #[test]
    fn test_transfer_as_if_condition_is_clean() {
        let source = "fn pay() { if token.transfer(to, amt) { done(); } else { revert(); } }";
        assert!(!detect(source).has_issues());
    }

    #[test]
    fn test_expression_statement_is_reported() {
        let source = "fn pay() {\n    token.send(to, amt);\n    token.transferFrom(from, to, amt);\n}";
        let lines: Vec<usize> = detect(source).issues().iter().map(|i| i.line_start).collect();
        assert_eq!(lines, vec![2, 3]);
    }

    #[test]
    fn test_commented_out_guard_is_unchecked() {
        let source = "fn pay() {\n    let ok = token.transfer(to, amt);\n    // if !ok { return Err(e); }\n    Ok(())\n}";
        assert_eq!(detect(source).issues().len(), 1);
    }

    #[test]
    fn test_return_before_guard_is_unchecked() {
        let source = "fn pay() -> bool {\n    let ok = token.transfer(to, amt);\n    return ok;\n}";
        assert_eq!(detect(source).issues().len(), 1);
    }

    #[test]
    fn test_try_then_guard_is_clean() {
        let source = "fn pay() -> Result<(), Vec<u8>> {\n    let success = token.transfer(self, to, amount)?;\n    if !success {\n        return Err(vec![]);\n    }\n    Ok(())\n}";
        assert!(!detect(source).has_issues());
    }

    #[test]
    fn test_approve_needs_token_interface() {
        let plain = "fn f() { pool.approve(spender, amt); }";
        assert!(!detect(plain).has_issues());

        let bound = "sol_interface! { interface IERC20 { function approve(address s, uint256 a) external returns (bool); } }\nfn f(token: IERC20) { token.approve(self, spender, amt); }";
        assert_eq!(detect(bound).issues().len(), 1);
    }

    #[test]
    fn test_match_with_empty_err_arm_is_reported() {
        let source = "fn pay() {\n    match token.transfer(self, to, amount) {\n        Ok(_) => {}\n        Err(_) => {}\n    }\n}";
        let result = detect(source);
        assert_eq!(result.issues().len(), 1);
        assert_eq!(result.issues()[0].line_start, 4);
        assert!(result.issues()[0].description.contains("explicitly ignored"));
    }

    #[test]
    fn test_match_with_returning_err_arm_is_clean() {
        let source = "fn pay() -> Result<(), Vec<u8>> {\n    match token.transfer(self, to, amount) {\n        Ok(_) => {}\n        Err(e) => return Err(e),\n    }\n    Ok(())\n}";
        assert!(!detect(source).has_issues());
    }

    #[test]
    fn test_low_level_call_with_tuple_guard_is_clean() {
        let unchecked = "fn f() {\n    token.call(encode(\"transfer(address,uint256)\", to, amt));\n}";
        assert_eq!(detect(unchecked).issues().len(), 1);

        let checked = "fn f() {\n    let (success, _data) = token.call(encode(\"transfer(address,uint256)\", to, amt));\n    require(success);\n}";
        assert!(!detect(checked).has_issues());
    }

    #[test]
    fn test_embedded_unchecked_low_level_call() {
        let source = r#"sol! {
    contract Payer {
        function pay(address token, address to, uint256 amount) public {
            token.call(abi.encodeWithSignature("transfer(address,uint256)", to, amount));
        }

        function payChecked(address token, address to, uint256 amount) public {
            (bool success, bytes memory data) = token.call(abi.encodeWithSignature("transfer(address,uint256)", to, amount));
            require(success, "transfer failed");
        }

        function refund(address to, uint256 amount) public {
            payable(to).transfer(amount);
        }
    }
}
"#;
        let result = detect(source);
        assert_eq!(result.issues().len(), 1);
        assert_eq!(result.issues()[0].line_start, 4);
        assert!(result.issues()[0].code_snippet.starts_with("token.call("));
    }

    #[test]
    fn test_embedded_unsafe_wrapper_reported_once() {
        let source = r#"sol! {
    contract Wrapper {
        function unsafeTransferERC20(address token, address to, uint256 amount) public {
            // no return value check
            token.call(abi.encodeWithSignature("transfer(address,uint256)", to, amount));
        }
    }
}
"#;
        let result = detect(source);
        assert_eq!(result.issues().len(), 1);
        assert_eq!(result.issues()[0].line_start, 5);
        assert!(result.issues()[0].description.contains("unsafeTransferERC20"));
    }

    #[test]
    fn test_embedded_function_on_closing_line() {
        let source = "sol! {\n    contract A {\n        function pay(address t, address to) public { t.call(abi.encodeWithSignature(\"transfer(address,uint256)\", to, 1)); } } }";
        let lines: Vec<usize> = detect(source).issues().iter().map(|i| i.line_start).collect();
        assert_eq!(lines, vec![3]);
    }

    #[test]
    fn test_unterminated_embedded_block_is_ignored() {
        let source = "sol! {\n    contract Broken {\n        function f(address t) public {\n            t.call(\"transfer\");\n";
        let tree = ContractParser::new().parse(source).unwrap();
        let mut result = AnalysisResult::new();
        assert!(UncheckedTransferDetector.detect(&tree, source, &mut result).is_ok());
        assert!(!result.has_issues());
        assert!(!result.has_errors());
    }
}
