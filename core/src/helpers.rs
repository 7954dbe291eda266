//! Shared helpers for detectors: node text, line ranges, traversal, call shape.

use tree_sitter::Node;

/// Transfer-like method names. `transfer_from` is the Stylus binding of `transferFrom`.
pub const TRANSFER_METHODS: &[&str] = &["transfer", "send", "transferFrom", "transfer_from"];

/// Calls that abort execution when their argument is false.
pub const GUARD_CALLS: &[&str] = &["require", "assert", "ensure"];

/// Exact source text spanned by the node, or "" if the range falls outside `source`.
pub fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    source.get(node.byte_range()).unwrap_or("")
}

/// Inclusive 1-based start and end lines of the node.
pub fn line_range(node: &Node) -> (usize, usize) {
    (node.start_position().row + 1, node.end_position().row + 1)
}

/// Pre-order traversal driven by an explicit stack, so deep trees cannot
/// exhaust the call stack.
pub struct Preorder<'tree> {
    stack: Vec<Node<'tree>>,
}

impl<'tree> Iterator for Preorder<'tree> {
    type Item = Node<'tree>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let mut cursor = node.walk();
        let children: Vec<Node<'tree>> = node.children(&mut cursor).collect();
        self.stack.extend(children.into_iter().rev());
        Some(node)
    }
}

pub fn preorder(root: Node<'_>) -> Preorder<'_> {
    Preorder { stack: vec![root] }
}

pub fn is_function(node: &Node) -> bool {
    node.kind() == "function_item"
}

pub fn enclosing_function<'tree>(node: &Node<'tree>) -> Option<Node<'tree>> {
    let mut current = node.parent();
    while let Some(candidate) = current {
        if is_function(&candidate) {
            return Some(candidate);
        }
        current = candidate.parent();
    }
    None
}

/// Name of the method or function a `call_expression` invokes.
///
/// Field access (`token.transfer`) yields the field identifier, a bare
/// identifier yields itself, a scoped path (`IERC20::transfer`) its last segment.
pub fn callee_name<'a>(call: &Node, source: &'a str) -> Option<&'a str> {
    if call.kind() != "call_expression" {
        return None;
    }
    let function = call.child_by_field_name("function")?;
    match function.kind() {
        "field_expression" => function
            .child_by_field_name("field")
            .map(|field| node_text(&field, source)),
        "identifier" => Some(node_text(&function, source)),
        "scoped_identifier" => function
            .child_by_field_name("name")
            .map(|name| node_text(&name, source)),
        "generic_function" => {
            let inner = function.child_by_field_name("function")?;
            match inner.kind() {
                "field_expression" => inner
                    .child_by_field_name("field")
                    .map(|field| node_text(&field, source)),
                _ => Some(node_text(&inner, source)),
            }
        }
        _ => None,
    }
}

pub fn is_transfer_method(name: &str) -> bool {
    TRANSFER_METHODS.contains(&name)
}

pub fn is_guard_call(call: &Node, source: &str) -> bool {
    let Some(function) = call.child_by_field_name("function") else {
        return false;
    };
    function.kind() == "identifier" && GUARD_CALLS.contains(&node_text(&function, source))
}

/// Positional arguments of a call, without punctuation or comments.
pub fn call_arguments<'tree>(call: &Node<'tree>) -> Vec<Node<'tree>> {
    let Some(arguments) = call.child_by_field_name("arguments") else {
        return Vec::new();
    };
    let mut cursor = arguments.walk();
    arguments
        .named_children(&mut cursor)
        .filter(|arg| !matches!(arg.kind(), "line_comment" | "block_comment"))
        .collect()
}

/// Names bound by the function's parameter list, in declaration order.
pub fn function_parameters(function: &Node, source: &str) -> Vec<String> {
    let Some(parameters) = function.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut cursor = parameters.walk();
    parameters
        .named_children(&mut cursor)
        .filter(|param| param.kind() == "parameter")
        .filter_map(|param| param.child_by_field_name("pattern"))
        .flat_map(|pattern| bound_identifiers(&pattern, source))
        .collect()
}

/// Identifiers introduced by a pattern. The discard pattern `_` binds nothing.
pub fn bound_identifiers(pattern: &Node, source: &str) -> Vec<String> {
    preorder(*pattern)
        .filter(|node| node.kind() == "identifier")
        // `Err` in `Err(e)` names a variant, not a binding
        .filter(|node| {
            node.parent()
                .and_then(|parent| parent.child_by_field_name("type"))
                .map_or(true, |ty| ty.id() != node.id())
        })
        .map(|node| node_text(&node, source).to_string())
        .collect()
}

/// True if `name` occurs in `text` as a whole identifier (`to` does not match `total`).
pub fn mentions_identifier(text: &str, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    text.match_indices(name).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + name.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

/// Split a line into its code and its trailing `//` comment, ignoring `//`
/// inside string literals.
pub fn split_line_comment(line: &str) -> (&str, Option<&str>) {
    let mut in_string = false;
    let mut escaped = false;
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                return (&line[..i], Some(&line[i + 2..]));
            }
            _ => {}
        }
    }
    (line, None)
}

/// A direct reference to the transaction sender.
pub fn is_sender_reference(text: &str) -> bool {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    compact.contains("msg.sender") || compact.contains("msg::sender()") || compact.contains("msg_sender()")
}
