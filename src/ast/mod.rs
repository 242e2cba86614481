//! Command Tree Model
//!
//! This module defines the normalized tree form of a shell command and
//! the operations used to build, query and serialize it.
//!
//! Architecture:
//!   Command string → Normalizer → CommandTree → Annotator → Edit Distance → Scores

pub mod types;
pub mod tree;
pub mod builder;
pub mod serialize;

pub use builder::TreeBuilder;
pub use serialize::{ast2command, ast2template, ast2tokens, pretty_print, TokenOptions};
pub use tree::CommandTree;
pub use types::{ArgType, Associativity, Node, NodeId, NodeKind, TreeError};
