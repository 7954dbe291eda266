//! Extraction of Solidity text embedded in Stylus macros (`sol! { ... }`).
//!
//! There is no grammar for the embedded language here; sections and function
//! bodies are found by counting braces over raw lines. Braces inside string
//! literals and `//` comments are ignored. Anything unterminated is dropped.

use crate::helpers::split_line_comment;
use once_cell::sync::Lazy;
use regex::Regex;

/// Macros whose body is Solidity-style definition text.
pub const BLOCK_MARKERS: &[&str] = &["sol!", "sol_interface!", "sol_storage!"];

static FUNCTION_DECL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bfunction\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedBlockSection {
    /// Lines strictly between the opening and closing lines, verbatim.
    pub text: String,
    /// 1-based line number of the first line of `text`.
    pub start_line: usize,
}

impl EmbeddedBlockSection {
    /// `(absolute line number, line)` pairs.
    pub fn numbered_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.text
            .lines()
            .enumerate()
            .map(move |(offset, line)| (self.start_line + offset, line))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedFunction<'a> {
    pub name: &'a str,
    /// Text between the parentheses of the declaration.
    pub params: String,
    pub start_line: usize,
    /// Declaration through closing brace, with absolute line numbers.
    pub lines: Vec<(usize, &'a str)>,
    /// Index into `lines` and byte offset just past the parameter list.
    header_end: (usize, usize),
}

impl<'a> EmbeddedFunction<'a> {
    /// Lines after the parameter list. The line that closes the list is cut
    /// to the text following its `)`.
    pub fn body_lines(&self) -> impl Iterator<Item = (usize, &'a str)> + '_ {
        let (row, offset) = self.header_end;
        self.lines
            .iter()
            .enumerate()
            .skip(row)
            .map(move |(index, &(line_no, line))| {
                if index == row {
                    (line_no, line.get(offset..).unwrap_or(""))
                } else {
                    (line_no, line)
                }
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Outside,
    /// Marker seen, opening brace not yet.
    Opening,
    Inside { depth: usize, start: usize },
}

/// Characters of `code` outside string literals, with their byte offsets.
fn unquoted(code: &str) -> impl Iterator<Item = (usize, char)> + '_ {
    let mut in_string = false;
    let mut escaped = false;
    code.char_indices().filter(move |&(_, c)| {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            false
        } else if c == '"' {
            in_string = true;
            false
        } else {
            true
        }
    })
}

/// Braces of a line in order with their offsets, skipping string literals
/// and `//` comments.
fn braces(line: &str) -> Vec<(usize, char)> {
    let (code, _) = split_line_comment(line);
    unquoted(code).filter(|&(_, c)| c == '{' || c == '}').collect()
}

fn marker_position(line: &str) -> Option<usize> {
    let (code, _) = split_line_comment(line);
    unquoted(code)
        .map(|(at, _)| at)
        .find(|&at| {
            // `sol!` must not match the tail of `my_sol!`
            let bounded = !code[..at]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric() || c == '_');
            bounded && BLOCK_MARKERS.iter().any(|marker| code[at..].starts_with(marker))
        })
}

/// Find every embedded definition block in `source`.
pub fn extract_sections(source: &str) -> Vec<EmbeddedBlockSection> {
    let lines: Vec<&str> = source.lines().collect();
    let mut sections = Vec::new();
    let mut state = State::Outside;

    for (index, &line) in lines.iter().enumerate() {
        let line_no = index + 1;
        let code = match state {
            State::Outside => match marker_position(line) {
                Some(at) => {
                    state = State::Opening;
                    &line[at..]
                }
                None => continue,
            },
            _ => line,
        };

        for (at, brace) in braces(code) {
            state = match (state, brace) {
                (State::Opening, '{') => State::Inside { depth: 1, start: line_no + 1 },
                (State::Inside { depth, start }, '{') => State::Inside { depth: depth + 1, start },
                (State::Inside { depth: 1, start }, _) => {
                    if let Some(body) = lines.get(start - 1..index) {
                        let mut body = body.to_vec();
                        // code sharing the closing line belongs to the block
                        let tail = &code[..at];
                        if !tail.trim().is_empty() {
                            body.push(tail);
                        }
                        if !body.is_empty() {
                            sections.push(EmbeddedBlockSection {
                                text: body.join("\n"),
                                start_line: start,
                            });
                        }
                    }
                    State::Outside
                }
                (State::Inside { depth, start }, _) => State::Inside { depth: depth - 1, start },
                (other, _) => other,
            };
            if state == State::Outside {
                break;
            }
        }
    }

    sections
}

/// Functions declared with a body inside `section`. Declarations without a
/// body (interface members) and unbalanced bodies are skipped.
pub fn extract_functions(section: &EmbeddedBlockSection) -> Vec<EmbeddedFunction<'_>> {
    let lines: Vec<(usize, &str)> = section.numbered_lines().collect();
    let mut functions = Vec::new();

    for (index, &(line_no, line)) in lines.iter().enumerate() {
        let (code, _) = split_line_comment(line);
        let Some(name) = FUNCTION_DECL.captures(code).and_then(|caps| caps.get(1)) else {
            continue;
        };
        let Some(body) = balanced_body(&lines[index..]) else {
            continue;
        };
        let declaration = body
            .iter()
            .map(|(_, l)| *l)
            .collect::<Vec<_>>()
            .join("\n");
        let header_end = parameter_list_end(&body, name.end()).unwrap_or((0, 0));
        functions.push(EmbeddedFunction {
            name: name.as_str(),
            params: parameter_text(&declaration),
            start_line: line_no,
            lines: body,
            header_end,
        });
    }
    functions
}

fn balanced_body<'a>(lines: &[(usize, &'a str)]) -> Option<Vec<(usize, &'a str)>> {
    let mut depth = 0usize;
    let mut opened = false;
    for (i, &(_, line)) in lines.iter().enumerate() {
        let found = braces(line);
        if !opened && found.is_empty() && split_line_comment(line).0.contains(';') {
            return None;
        }
        for (_, brace) in found {
            if brace == '{' {
                depth += 1;
                opened = true;
            } else {
                depth = depth.checked_sub(1)?;
            }
            if opened && depth == 0 {
                return Some(lines[..=i].to_vec());
            }
        }
    }
    None
}

/// Row and offset just past the `)` closing the parameter list that opens
/// at or after byte `from` of the first line.
fn parameter_list_end(lines: &[(usize, &str)], from: usize) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    for (row, &(_, line)) in lines.iter().enumerate() {
        let start = if row == 0 { from } else { 0 };
        let rest = line.get(start..)?;
        for (at, c) in rest.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some((row, start + at + 1));
                    }
                }
                _ => {}
            }
        }
    }
    None
}

fn parameter_text(declaration: &str) -> String {
    let Some(open) = declaration.find('(') else {
        return String::new();
    };
    let mut depth = 0usize;
    for (i, c) in declaration[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return declaration[open + 1..open + i].to_string();
                }
            }
            _ => {}
        }
    }
    String::new()
}
