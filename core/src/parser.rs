//! Caller-owned tree-sitter parser for Stylus (Rust) contract source.

use crate::error::ScanError;
use tracing::debug;
use tree_sitter::{Parser, Tree};

/// Parser state built on first use and reused for every later file.
#[derive(Default)]
pub struct ContractParser {
    inner: Option<Parser>,
}

impl ContractParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&mut self, source: &str) -> Result<Tree, ScanError> {
        let parser = match self.inner.take() {
            Some(parser) => parser,
            None => {
                debug!("initializing Rust grammar");
                let mut parser = Parser::new();
                parser.set_language(&tree_sitter_rust::LANGUAGE.into())?;
                parser
            }
        };
        let parser = self.inner.insert(parser);
        parser.parse(source, None).ok_or(ScanError::Parse)
    }
}
