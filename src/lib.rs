//! cmdtree-eval - Structural similarity scoring for shell commands
//!
//! This library normalizes bash command lines into typed command trees and
//! compares them with a Zhang–Shasha tree edit distance under
//! domain-aware label costs, alongside token and utility/flag overlap
//! scores used to evaluate predicted commands.

pub mod ast;
pub mod config;
pub mod error;
pub mod eval;
pub mod parser;

pub use ast::{CommandTree, Node, NodeId, NodeKind, TreeBuilder, TreeError};
pub use config::{ConfigError, ScoreConfig};
pub use error::{Error, Result};
pub use eval::{tree_distance, MatchMode, ScoreRecord, Scorer};
pub use parser::{bash_parser, CommandParser, Normalizer, ParseException};
