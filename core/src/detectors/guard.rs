//! Recipient validation strategies.
//!
//! A strategy answers one question: is this parameter validated in this
//! function before (or around) the given use? The search is a heuristic over
//! guard statements, not a dominance proof.

use crate::helpers::{is_guard_call, mentions_identifier, node_text, preorder};
use tree_sitter::Node;

/// Macros that abort on a false condition.
const GUARD_MACROS: &[&str] = &["assert", "assert_ne", "assert_eq", "require", "ensure"];

pub trait GuardStrategy {
    fn name(&self) -> &'static str;

    fn is_validated(&self, function: Node, param: &str, use_site: Node, source: &str) -> bool;
}

/// Validated if any guard in the function body mentions the parameter. The
/// search stops at the first match.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstMentionGuard;

impl GuardStrategy for FirstMentionGuard {
    fn name(&self) -> &'static str {
        "first-mention"
    }

    fn is_validated(&self, function: Node, param: &str, use_site: Node, source: &str) -> bool {
        let Some(body) = function.child_by_field_name("body") else {
            return false;
        };
        preorder(body).any(|node| guards_parameter(&node, param, &use_site, source))
    }
}

/// Like [`FirstMentionGuard`], but the guard must end before the use starts.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrecedingGuard;

impl GuardStrategy for PrecedingGuard {
    fn name(&self) -> &'static str {
        "preceding"
    }

    fn is_validated(&self, function: Node, param: &str, use_site: Node, source: &str) -> bool {
        let Some(body) = function.child_by_field_name("body") else {
            return false;
        };
        preorder(body)
            .filter(|node| node.end_byte() <= use_site.start_byte())
            .any(|node| guards_parameter(&node, param, &use_site, source))
    }
}

fn contains(outer: &Node, inner: &Node) -> bool {
    outer.start_byte() <= inner.start_byte() && inner.end_byte() <= outer.end_byte()
}

/// A guard mentioning `param`. A guard whose own condition is the transfer
/// (`require(token.transfer(to, ..))`) does not validate the recipient.
fn guards_parameter(node: &Node, param: &str, use_site: &Node, source: &str) -> bool {
    let checks = |part: Node| !contains(&part, use_site) && mentions_identifier(node_text(&part, source), param);
    match node.kind() {
        "call_expression" if is_guard_call(node, source) => {
            node.child_by_field_name("arguments").is_some_and(checks)
        }
        "macro_invocation" => {
            let is_guard = node
                .child_by_field_name("macro")
                .is_some_and(|name| GUARD_MACROS.contains(&node_text(&name, source)));
            is_guard && checks(*node)
        }
        "if_expression" => node.child_by_field_name("condition").is_some_and(checks),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::{callee_name, is_function};
    use crate::parser::ContractParser;

    fn check(strategy: &dyn GuardStrategy, source: &str, param: &str) -> bool {
        let tree = ContractParser::new().parse(source).unwrap();
        let function = preorder(tree.root_node()).find(is_function).unwrap();
        let use_site = preorder(function)
            .find(|n| callee_name(n, source) == Some("transfer"))
            .unwrap();
        strategy.is_validated(function, param, use_site, source)
    }

    #[test]
    fn test_require_and_if_validate() {
        let guarded = "fn f(to: Address) { require(to != Address::ZERO); token.transfer(to, a); }";
        assert!(check(&FirstMentionGuard, guarded, "to"));

        let branched = "fn f(to: Address) { if to.is_zero() { return; } token.transfer(to, a); }";
        assert!(check(&FirstMentionGuard, branched, "to"));

        let asserted = "fn f(to: Address) { assert!(to != Address::ZERO); token.transfer(to, a); }";
        assert!(check(&FirstMentionGuard, asserted, "to"));
    }

    #[test]
    fn test_unrelated_guard_does_not_validate() {
        let source = "fn f(to: Address, total: U256) { require(total > 0); token.transfer(to, a); }";
        assert!(!check(&FirstMentionGuard, source, "to"));
    }

    #[test]
    fn test_wrapping_guard_does_not_validate_its_own_transfer() {
        let required = "fn f(to: Address) { require(token.transfer(to, a)); }";
        assert!(!check(&FirstMentionGuard, required, "to"));

        let branched = "fn f(to: Address) { if !token.transfer(self, to, a)? { revert(); } }";
        assert!(!check(&FirstMentionGuard, branched, "to"));
        assert!(!check(&PrecedingGuard, branched, "to"));
    }

    #[test]
    fn test_preceding_guard_rejects_late_checks() {
        let source = "fn f(to: Address) { token.transfer(to, a); require(to != Address::ZERO); }";
        assert!(check(&FirstMentionGuard, source, "to"));
        assert!(!check(&PrecedingGuard, source, "to"));
    }
}
