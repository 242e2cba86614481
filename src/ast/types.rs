//! Command Tree Node Types
//!
//! This module defines the node vocabulary of a normalized command tree.
//! A single `Node` struct is tagged by `NodeKind`; kind-specific fields
//! (the argument type and occurrence index) are only meaningful for
//! argument nodes.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Index of a node inside a `CommandTree` arena
pub type NodeId = usize;

/// Separator between a node kind and its value in prefixed tokens
pub const KIND_PREFIX: &str = "<KIND_PREFIX>";

/// Separator between a flag and the argument types it takes
pub const FLAG_SUFFIX: &str = "<FLAG_SUFFIX>";

/// Tokens that keep their literal value even in templates
pub const RESERVED_TOKENS: &[&str] = &["+", ";", "{}"];

/// Unary logic operators written before their operand
pub const RIGHT_ASSOCIATE_UNARY_LOGIC_OPERATORS: &[&str] = &["!", "-not"];

/// Unary logic operators written after their operand
pub const LEFT_ASSOCIATE_UNARY_LOGIC_OPERATORS: &[&str] = &["-prune"];

pub const BINARY_LOGIC_OPERATORS: &[&str] = &["-and", "-or", "||", "&&", "-o", "-a", ";"];

// =============================================================================
// ERRORS
// =============================================================================

/// Errors raised while building or querying a command tree
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("structural violation: {message}")]
    StructuralViolation { message: String },

    #[error("no utility found above node {node}")]
    NoUtilityFound { node: NodeId },

    #[error("node {node} does not exist in this tree")]
    InvalidNode { node: NodeId },

    #[error("unsupported {kind} value '{value}'")]
    Unsupported { kind: NodeKind, value: String },
}

impl TreeError {
    pub fn structural(message: impl Into<String>) -> Self {
        Self::StructuralViolation {
            message: message.into(),
        }
    }
}

// =============================================================================
// NODE KINDS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Pipeline,
    Utility,
    Flag,
    Argument,
    Operator,
    UnaryLogicOp,
    BinaryLogicOp,
    Bracket,
    Redirect,
    CommandSubstitution,
    ProcessSubstitution,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Pipeline => "pipeline",
            Self::Utility => "utility",
            Self::Flag => "flag",
            Self::Argument => "argument",
            Self::Operator => "operator",
            Self::UnaryLogicOp => "unarylogicop",
            Self::BinaryLogicOp => "binarylogicop",
            Self::Bracket => "bracket",
            Self::Redirect => "redirect",
            Self::CommandSubstitution => "commandsubstitution",
            Self::ProcessSubstitution => "processsubstitution",
        }
    }

    /// Upper-case form used in labels and token prefixes
    pub fn upper(&self) -> String {
        self.as_str().to_ascii_uppercase()
    }

    /// Maximum number of children a node of this kind may own.
    /// `None` means any number.
    pub fn max_children(&self) -> Option<usize> {
        match self {
            Self::Operator => Some(0),
            Self::UnaryLogicOp | Self::CommandSubstitution | Self::ProcessSubstitution => Some(1),
            Self::Redirect => Some(2),
            _ => None,
        }
    }

    /// Children a node of this kind needs to be complete
    pub fn min_children(&self) -> usize {
        match self {
            Self::UnaryLogicOp | Self::CommandSubstitution | Self::ProcessSubstitution | Self::Redirect => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// ARGUMENT TYPES
// =============================================================================

/// Semantic category of an argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArgType {
    File,
    Directory,
    Path,
    Permission,
    DateTime,
    Timespan,
    Regex,
    Size,
    Number,
    Quantity,
    Type,
    Option,
    Format,
    ReservedWord,
    Unknown,
}

impl ArgType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "File",
            Self::Directory => "Directory",
            Self::Path => "Path",
            Self::Permission => "Permission",
            Self::DateTime => "DateTime",
            Self::Timespan => "Timespan",
            Self::Regex => "Regex",
            Self::Size => "Size",
            Self::Number => "Number",
            Self::Quantity => "Quantity",
            Self::Type => "Type",
            Self::Option => "Option",
            Self::Format => "Format",
            Self::ReservedWord => "ReservedWord",
            Self::Unknown => "Unknown",
        }
    }

    /// Quantities keep their sign in templates (`+Size`, `-Timespan`)
    pub fn is_quantity(&self) -> bool {
        matches!(
            self,
            Self::Number
                | Self::Quantity
                | Self::Size
                | Self::Timespan
                | Self::DateTime
                | Self::Permission
        )
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, Self::Regex | Self::File | Self::Directory | Self::Path)
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ArgType {
    type Err = std::convert::Infallible;

    /// Unrecognized names map to `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "File" => Self::File,
            "Directory" => Self::Directory,
            "Path" => Self::Path,
            "Permission" => Self::Permission,
            "DateTime" => Self::DateTime,
            "Timespan" => Self::Timespan,
            "Regex" => Self::Regex,
            "Size" => Self::Size,
            "Number" => Self::Number,
            "Quantity" => Self::Quantity,
            "Type" => Self::Type,
            "Option" => Self::Option,
            "Format" => Self::Format,
            "ReservedWord" => Self::ReservedWord,
            _ => Self::Unknown,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    /// Operator follows its operand: `expr -prune`
    Left,
    /// Operator precedes its operand: `! expr`
    Right,
}

// =============================================================================
// NODE
// =============================================================================

/// One element of a command tree.
///
/// Structural links are arena indices owned by `CommandTree`; a node
/// created through the constructors below is detached until it is
/// added to a tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub value: String,
    /// Only set for argument nodes
    pub arg_type: Option<ArgType>,
    /// 1-based occurrence of `arg_type` within the governing utility or flag
    pub index: usize,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) lsb: Option<NodeId>,
    pub(crate) rsb: Option<NodeId>,
}

impl Node {
    fn new(kind: NodeKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            arg_type: None,
            index: 1,
            parent: None,
            children: Vec::new(),
            lsb: None,
            rsb: None,
        }
    }

    pub fn root() -> Self {
        Self::new(NodeKind::Root, "root")
    }

    pub fn pipeline() -> Self {
        Self::new(NodeKind::Pipeline, "")
    }

    pub fn utility(value: impl Into<String>) -> Self {
        Self::new(NodeKind::Utility, value)
    }

    pub fn flag(value: impl Into<String>) -> Self {
        Self::new(NodeKind::Flag, value)
    }

    pub fn argument(value: impl Into<String>, arg_type: ArgType) -> Self {
        let mut node = Self::new(NodeKind::Argument, value);
        node.arg_type = Some(arg_type);
        node
    }

    pub fn operator(value: impl Into<String>) -> Self {
        Self::new(NodeKind::Operator, value)
    }

    pub fn unary_logic_op(value: impl Into<String>) -> Result<Self, TreeError> {
        let value = value.into();
        let known = RIGHT_ASSOCIATE_UNARY_LOGIC_OPERATORS.contains(&value.as_str())
            || LEFT_ASSOCIATE_UNARY_LOGIC_OPERATORS.contains(&value.as_str());
        if !known {
            return Err(TreeError::Unsupported {
                kind: NodeKind::UnaryLogicOp,
                value,
            });
        }
        Ok(Self::new(NodeKind::UnaryLogicOp, value))
    }

    pub fn binary_logic_op(value: impl Into<String>) -> Self {
        Self::new(NodeKind::BinaryLogicOp, value)
    }

    pub fn bracket() -> Self {
        Self::new(NodeKind::Bracket, "")
    }

    pub fn redirect(value: impl Into<String>) -> Self {
        Self::new(NodeKind::Redirect, value)
    }

    pub fn command_substitution() -> Self {
        Self::new(NodeKind::CommandSubstitution, "")
    }

    pub fn process_substitution(value: impl Into<String>) -> Result<Self, TreeError> {
        let value = value.into();
        if value != "<" && value != ">" {
            return Err(TreeError::Unsupported {
                kind: NodeKind::ProcessSubstitution,
                value,
            });
        }
        Ok(Self::new(NodeKind::ProcessSubstitution, value))
    }

    // -------------------------------------------------------------------------
    // Kind queries
    // -------------------------------------------------------------------------

    pub fn is_root(&self) -> bool {
        matches!(self.kind, NodeKind::Root)
    }

    pub fn is_utility(&self) -> bool {
        matches!(self.kind, NodeKind::Utility)
    }

    pub fn is_option(&self) -> bool {
        matches!(self.kind, NodeKind::Flag)
    }

    pub fn is_argument(&self) -> bool {
        matches!(self.kind, NodeKind::Argument)
    }

    pub fn is_command(&self, name: &str) -> bool {
        self.is_utility() && self.value == name
    }

    /// Parenthesis placeholder left by the parser before bracket collapsing
    pub fn is_bracket(&self) -> bool {
        self.is_argument() && (self.value == "(" || self.value == ")")
    }

    pub fn is_long_option(&self) -> bool {
        self.is_option() && self.value.starts_with("--")
    }

    pub fn is_reserved(&self) -> bool {
        match self.kind {
            NodeKind::Argument => RESERVED_TOKENS.contains(&self.value.as_str()),
            _ => true,
        }
    }

    /// Open-vocabulary arguments are replaced by their type in templates
    pub fn is_open_vocab(&self) -> bool {
        if !self.is_argument() || self.is_reserved() {
            return false;
        }
        !matches!(
            self.arg_type,
            Some(ArgType::Type) | Some(ArgType::Option) | Some(ArgType::Format)
        )
    }

    pub fn associativity(&self) -> Option<Associativity> {
        if !matches!(self.kind, NodeKind::UnaryLogicOp) {
            return None;
        }
        if LEFT_ASSOCIATE_UNARY_LOGIC_OPERATORS.contains(&self.value.as_str()) {
            Some(Associativity::Left)
        } else {
            Some(Associativity::Right)
        }
    }

    pub fn arg_type(&self) -> ArgType {
        self.arg_type.unwrap_or(ArgType::Unknown)
    }

    // -------------------------------------------------------------------------
    // Labels
    // -------------------------------------------------------------------------

    /// Label used for evaluation only: `UPPER(kind)_value`
    pub fn get_label(&self) -> String {
        format!("{}_{}", self.kind.upper(), self.value)
    }

    pub fn prefix(&self) -> String {
        format!("{}{}", self.kind.upper(), KIND_PREFIX)
    }

    pub fn symbol(&self) -> String {
        format!("{}{}", self.prefix(), self.value)
    }

    /// Splits an `-exec::;` style flag value into the flag and its terminator
    pub fn exec_parts(&self) -> Option<(&str, &str)> {
        if !self.is_option() {
            return None;
        }
        if !(self.value.starts_with("-exec") || self.value.starts_with("-ok")) {
            return None;
        }
        self.value.split_once("::")
    }

    // -------------------------------------------------------------------------
    // Structural accessors
    // -------------------------------------------------------------------------

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn left_sibling(&self) -> Option<NodeId> {
        self.lsb
    }

    pub fn right_sibling(&self) -> Option<NodeId> {
        self.rsb
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind.upper(), self.value)?;
        if let Some(arg_type) = self.arg_type {
            write!(f, "<{}>", arg_type)?;
        }
        Ok(())
    }
}
