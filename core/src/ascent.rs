//! Upward search from a call to the nearest ancestor that decides whether the
//! call's value is inspected.
//!
//! The search is driven by a table of stop kinds. Each entry classifies one
//! ancestor kind and either stops the ascent with a [`Verdict`] or lets it
//! continue to the next parent.

use crate::helpers::is_guard_call;
use tree_sitter::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// A call returning a success value (`transfer`, `send`, `transferFrom`, `approve`).
    ValueReturning,
    /// A raw `call` carrying transfer calldata.
    LowLevel,
}

pub struct AscentContext<'a, 'tree> {
    pub call: Node<'tree>,
    pub kind: CallKind,
    pub source: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict<'tree> {
    Checked,
    Unchecked,
    /// The value is bound by this `let` or assignment; a later guard decides.
    Bound(Node<'tree>),
}

pub enum Step<'tree> {
    Continue,
    Stop(Verdict<'tree>),
}

pub type Classifier = for<'a, 'tree> fn(Node<'tree>, &AscentContext<'a, 'tree>) -> Step<'tree>;

pub const VALUE_CHECK_STOPS: &[(&str, Classifier)] = &[
    ("if_expression", classify_conditional),
    ("match_expression", classify_match),
    ("binary_expression", checked),
    ("call_expression", classify_guard_call),
    ("try_expression", classify_try),
    ("let_declaration", bound),
    ("assignment_expression", classify_assignment),
    ("block", unchecked),
    ("function_item", unchecked),
];

/// Walk the parents of `ctx.call` until a stop kind yields a verdict.
/// Returns `None` when the root is reached without one.
pub fn ascend<'tree>(
    table: &[(&str, Classifier)],
    ctx: &AscentContext<'_, 'tree>,
) -> Option<Verdict<'tree>> {
    let mut current = ctx.call.parent();
    while let Some(node) = current {
        if let Some((_, classify)) = table.iter().find(|(kind, _)| *kind == node.kind()) {
            if let Step::Stop(verdict) = classify(node, ctx) {
                return Some(verdict);
            }
        }
        current = node.parent();
    }
    None
}

fn contains(outer: &Node, inner: &Node) -> bool {
    outer.start_byte() <= inner.start_byte() && inner.end_byte() <= outer.end_byte()
}

fn field_contains_call(node: &Node, field: &str, ctx: &AscentContext) -> bool {
    node.child_by_field_name(field)
        .is_some_and(|child| contains(&child, &ctx.call))
}

fn checked<'tree>(_: Node<'tree>, _: &AscentContext<'_, 'tree>) -> Step<'tree> {
    Step::Stop(Verdict::Checked)
}

fn unchecked<'tree>(_: Node<'tree>, _: &AscentContext<'_, 'tree>) -> Step<'tree> {
    Step::Stop(Verdict::Unchecked)
}

fn bound<'tree>(node: Node<'tree>, _: &AscentContext<'_, 'tree>) -> Step<'tree> {
    Step::Stop(Verdict::Bound(node))
}

fn classify_conditional<'tree>(node: Node<'tree>, ctx: &AscentContext<'_, 'tree>) -> Step<'tree> {
    if field_contains_call(&node, "condition", ctx) {
        Step::Stop(Verdict::Checked)
    } else {
        Step::Continue
    }
}

fn classify_match<'tree>(node: Node<'tree>, ctx: &AscentContext<'_, 'tree>) -> Step<'tree> {
    if field_contains_call(&node, "value", ctx) {
        Step::Stop(Verdict::Checked)
    } else {
        Step::Continue
    }
}

fn classify_guard_call<'tree>(node: Node<'tree>, ctx: &AscentContext<'_, 'tree>) -> Step<'tree> {
    if is_guard_call(&node, ctx.source) {
        Step::Stop(Verdict::Checked)
    } else {
        Step::Continue
    }
}

// `?` handles the whole result of a low-level call, but only the error half of
// a value-returning one.
fn classify_try<'tree>(_: Node<'tree>, ctx: &AscentContext<'_, 'tree>) -> Step<'tree> {
    match ctx.kind {
        CallKind::LowLevel => Step::Stop(Verdict::Checked),
        CallKind::ValueReturning => Step::Continue,
    }
}

fn classify_assignment<'tree>(node: Node<'tree>, ctx: &AscentContext<'_, 'tree>) -> Step<'tree> {
    if field_contains_call(&node, "right", ctx) {
        Step::Stop(Verdict::Bound(node))
    } else {
        Step::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::{callee_name, preorder};
    use crate::parser::ContractParser;

    fn verdict_for(source: &str, method: &str, kind: CallKind) -> Option<&'static str> {
        let tree = ContractParser::new().parse(source).unwrap();
        let call = preorder(tree.root_node())
            .find(|n| n.kind() == "call_expression" && callee_name(n, source) == Some(method))
            .unwrap();
        let ctx = AscentContext { call, kind, source };
        ascend(VALUE_CHECK_STOPS, &ctx).map(|verdict| match verdict {
            Verdict::Checked => "checked",
            Verdict::Unchecked => "unchecked",
            Verdict::Bound(_) => "bound",
        })
    }

    #[test]
    fn test_if_condition_is_checked() {
        let source = "fn f() { if token.transfer(to, amt) { g(); } }";
        assert_eq!(verdict_for(source, "transfer", CallKind::ValueReturning), Some("checked"));
    }

    #[test]
    fn test_statement_is_unchecked() {
        let source = "fn f() { token.transfer(to, amt); }";
        assert_eq!(verdict_for(source, "transfer", CallKind::ValueReturning), Some("unchecked"));
    }

    #[test]
    fn test_let_binding_through_try_is_bound() {
        let source = "fn f() { let ok = token.transfer(to, amt)?; }";
        assert_eq!(verdict_for(source, "transfer", CallKind::ValueReturning), Some("bound"));
    }

    #[test]
    fn test_try_checks_low_level_call() {
        let source = "fn f() { call(ctx, token, &data)?; }";
        assert_eq!(verdict_for(source, "call", CallKind::LowLevel), Some("checked"));
    }

    #[test]
    fn test_require_argument_is_checked() {
        let source = "fn f() { require(token.transfer(to, amt)); }";
        assert_eq!(verdict_for(source, "transfer", CallKind::ValueReturning), Some("checked"));
    }

    #[test]
    fn test_assignment_right_side_is_bound() {
        let source = "fn f() { let mut ok = false; ok = token.transfer(to, amt); }";
        assert_eq!(verdict_for(source, "transfer", CallKind::ValueReturning), Some("bound"));
    }

    #[test]
    fn test_binary_operand_is_checked() {
        let source = "fn f() { let b = token.transfer(to, amt) && x; }";
        assert_eq!(verdict_for(source, "transfer", CallKind::ValueReturning), Some("checked"));
    }

    #[test]
    fn test_match_arm_body_is_not_the_scrutinee() {
        let source = "fn f() { match x { _ => token.transfer(to, amt), } }";
        assert_eq!(verdict_for(source, "transfer", CallKind::ValueReturning), Some("unchecked"));
    }
}
