//! Parser module for command lines
//!
//! This module contains the lexer, the surface corrections and the
//! normalizer that turns a command line into a `CommandTree`.

pub mod types;
pub mod lexer;
pub mod surface;
pub mod grammar;
pub mod parser;

// Re-exports
pub use types::{CommandParser, ParseException};
pub use lexer::{Lexer, LexerError, Token, TokenType};
pub use surface::correct_errors_and_normalize_surface;
pub use parser::{bash_parser, Normalizer};
