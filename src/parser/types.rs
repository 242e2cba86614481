//! Parser Types and Constants
//!
//! Shared types, the parser seam, and limits used across parser modules.

use std::fmt;
use thiserror::Error;

use crate::ast::{CommandTree, TreeError};
use crate::parser::lexer::LexerError;

// Parser limits to keep a single bad prediction from stalling a batch
pub const MAX_INPUT_SIZE: usize = 100_000;
pub const MAX_TOKENS: usize = 10_000;
pub const MAX_PARSER_DEPTH: usize = 64;

/// Anything that turns a command line into a normalized command tree
pub trait CommandParser {
    fn parse(&self, cmd: &str) -> Result<CommandTree, ParseException>;
}

impl<F> CommandParser for F
where
    F: Fn(&str) -> Result<CommandTree, ParseException>,
{
    fn parse(&self, cmd: &str) -> Result<CommandTree, ParseException> {
        self(cmd)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub struct ParseException {
    pub message: String,
    /// Character offset where the problem was found
    pub offset: usize,
}

impl fmt::Display for ParseException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parse error at {}: {}", self.offset, self.message)
    }
}

impl ParseException {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

impl From<LexerError> for ParseException {
    fn from(e: LexerError) -> Self {
        Self::new(e.message, e.offset)
    }
}

impl From<TreeError> for ParseException {
    fn from(e: TreeError) -> Self {
        Self::new(e.to_string(), 0)
    }
}
