//! Text patterns shared by the tree and embedded-block passes.

use crate::helpers::{mentions_identifier, split_line_comment};
use once_cell::sync::Lazy;
use regex::Regex;

/// `let (ok, ..) =` in Rust or `(bool ok, ..) =` in Solidity.
pub static TUPLE_BOOL_BINDING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\blet\s+(?:mut\s+)?\(\s*(?:mut\s+)?|\(\s*bool\s+)([A-Za-z_][A-Za-z0-9_]*)\s*,").unwrap()
});

/// `bool ok` declaration in Solidity.
pub static BOOL_DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bbool\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap());

/// `token.transfer(`, `token.transferFrom(`, `to.send(`
pub static TOKEN_TRANSFER_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.\s*(?:transfer|transferFrom|send)\s*\(").unwrap());

/// `target.call(` or `target.call{value: v}(`
pub static LOW_LEVEL_CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.\s*call\s*[({]").unwrap());

/// ETH transfer on a payable address; reverts on failure.
pub static PAYABLE_TRANSFER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"payable\s*\([^)]*\)\s*\.\s*transfer\s*\(").unwrap());

/// Statement that aborts on a false call result when wrapped around it.
pub static WRAPPING_GUARD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:require|assert|if)\s*\(").unwrap());

/// `address to` or `address payable to` in a Solidity parameter list.
pub static ADDRESS_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\baddress\s+(?:payable\s+)?([A-Za-z_][A-Za-z0-9_]*)").unwrap()
});

/// Words that mark a line as validating something.
pub const VALIDATION_WORDS: &[&str] = &["require", "assert", "revert", "address(0)"];

/// Start of a guard: `if`, `match`, or a `require(` / `assert!(` /
/// `assert_eq!(` / `ensure!(` style call or macro.
static GUARD_OPENER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:if|match)\b|\b(?:require|assert|assert_eq|assert_ne|ensure)!?\s*\(").unwrap()
});

/// Condition text of every guard opened on `code`. An `if`/`match` condition
/// runs to its `{` (or the end of the line), a guard call's to its closing `)`.
pub fn guard_conditions(code: &str) -> Vec<&str> {
    GUARD_OPENER
        .find_iter(code)
        .map(|opener| {
            let rest = &code[opener.end()..];
            let is_call = opener.as_str().ends_with('(');
            let mut depth = 0usize;
            for (at, c) in rest.char_indices() {
                match c {
                    '(' => depth += 1,
                    ')' if is_call && depth == 0 => return &rest[..at],
                    ')' => depth = depth.saturating_sub(1),
                    '{' if !is_call && depth == 0 => return &rest[..at],
                    _ => {}
                }
            }
            rest
        })
        .collect()
}

/// True if some guard opened on `code` has a condition mentioning `name`.
pub fn guards_name(code: &str, name: &str) -> bool {
    guard_conditions(code)
        .iter()
        .any(|condition| mentions_identifier(condition, name))
}

pub fn return_pattern(name: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"\breturn\s+{}\b", regex::escape(name)))
}

/// Outcome of scanning the text after a binding for a guard on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardScan {
    Guarded,
    /// The guard is present but commented out.
    CommentedOut,
    /// The value is returned before any guard.
    ReturnedUnchecked,
    Missing,
}

/// Scan `text` line by line for the first decision about `name`.
pub fn scan_for_guard(text: &str, name: &str) -> Result<GuardScan, regex::Error> {
    let ret = return_pattern(name)?;
    for line in text.lines() {
        let (code, comment) = split_line_comment(line);
        if guards_name(code, name) {
            return Ok(GuardScan::Guarded);
        }
        if comment.is_some_and(|c| guards_name(c, name)) {
            return Ok(GuardScan::CommentedOut);
        }
        if ret.is_match(code) {
            return Ok(GuardScan::ReturnedUnchecked);
        }
    }
    Ok(GuardScan::Missing)
}
