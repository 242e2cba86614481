//! Tree Serialization
//!
//! Flattens a command tree into token sequences, templates (literal
//! arguments replaced by their type) and plain command strings. These
//! forms are only used for match checks and display.

use super::tree::CommandTree;
use super::types::{Associativity, NodeId, NodeKind, FLAG_SUFFIX};

/// Arguments of `find` that stay literal under `keep_common_args`
pub const FIND_COMMON_ARGS: &[&str] = &[".", "./", "~", "~/", "/"];

/// Switches for `ast2tokens`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenOptions {
    /// Tolerate nodes whose child count does not match their kind
    pub loose_constraints: bool,
    /// Emit utility children sorted by value
    pub ignore_flag_order: bool,
    /// Emit argument types instead of open-vocabulary literals
    pub arg_type_only: bool,
    /// Keep common `find` paths literal under `arg_type_only`
    pub keep_common_args: bool,
    /// Append `_ArgType` to argument tokens
    pub with_arg_type: bool,
    /// Prefix flags with `utility@@`
    pub with_flag_head: bool,
    /// Append the types of a flag's arguments to the flag token
    pub with_flag_argtype: bool,
    /// Prefix every token with its node kind
    pub with_prefix: bool,
    /// Append `-NN` to arguments whose type repeats in scope
    pub indexing_args: bool,
}

impl TokenOptions {
    pub fn loose() -> Self {
        Self {
            loose_constraints: true,
            ..Self::default()
        }
    }

    pub fn arg_type_only(mut self, on: bool) -> Self {
        self.arg_type_only = on;
        self
    }
}

pub fn ast2tokens(tree: &CommandTree, options: &TokenOptions) -> Vec<String> {
    let mut tokens = Vec::new();
    to_tokens(tree, tree.root(), options, &mut tokens);
    tokens
}

fn to_tokens(tree: &CommandTree, id: NodeId, opts: &TokenOptions, tokens: &mut Vec<String>) {
    let lc = opts.loose_constraints;
    let node = tree.get(id);
    let children = node.children();

    match node.kind {
        NodeKind::Root => {
            if lc {
                for &child in children {
                    to_tokens(tree, child, opts, tokens);
                }
            } else if let Some(&first) = children.first() {
                to_tokens(tree, first, opts, tokens);
            }
        }
        NodeKind::Pipeline => {
            if lc && children.is_empty() {
                tokens.push("|".to_string());
            } else if lc && children.len() == 1 {
                to_tokens(tree, children[0], opts, tokens);
            } else {
                for (i, &child) in children.iter().enumerate() {
                    if i > 0 {
                        tokens.push("|".to_string());
                    }
                    to_tokens(tree, child, opts, tokens);
                }
            }
        }
        NodeKind::CommandSubstitution => {
            tokens.push("$(".to_string());
            if let Some(&first) = children.first() {
                to_tokens(tree, first, opts, tokens);
            }
            tokens.push(")".to_string());
        }
        NodeKind::ProcessSubstitution => {
            tokens.push(format!("{}(", node.value));
            if let Some(&first) = children.first() {
                to_tokens(tree, first, opts, tokens);
            }
            tokens.push(")".to_string());
        }
        NodeKind::Utility => {
            let mut token = node.value.clone();
            if opts.with_prefix {
                token = node.prefix() + &token;
            }
            tokens.push(token);
            let mut ordered = children.to_vec();
            if opts.ignore_flag_order {
                ordered.sort_by(|&a, &b| tree.get(a).value.cmp(&tree.get(b).value));
            }
            for child in ordered {
                to_tokens(tree, child, opts, tokens);
            }
        }
        NodeKind::Flag => {
            let exec = node.exec_parts();
            let mut token = match exec {
                Some((flag, _)) => flag.to_string(),
                None => node.value.clone(),
            };
            if opts.with_flag_head {
                if let Ok(utility) = tree.utility_of(id) {
                    token = format!("{}@@{}", tree.get(utility).value, token);
                }
            }
            if opts.with_prefix {
                token = node.prefix() + &token;
            }
            if opts.with_flag_argtype {
                token.push_str(FLAG_SUFFIX);
                token.push_str(&flag_argtype_suffix(tree, id));
            }
            tokens.push(token);
            for &child in children {
                to_tokens(tree, child, opts, tokens);
            }
            if let Some((_, terminator)) = exec {
                let terminator = if terminator == ";" { "\\;" } else { terminator };
                tokens.push(terminator.to_string());
            }
        }
        NodeKind::Operator => tokens.push(node.value.clone()),
        NodeKind::Redirect => {
            tokens.push(node.value.clone());
            for &child in children {
                to_tokens(tree, child, opts, tokens);
            }
        }
        NodeKind::BinaryLogicOp => {
            if lc && !children.is_empty() {
                for (i, &child) in children.iter().enumerate() {
                    if i > 0 {
                        tokens.push(node.value.clone());
                    }
                    to_tokens(tree, child, opts, tokens);
                }
            } else {
                tokens.push(node.value.clone());
            }
        }
        NodeKind::UnaryLogicOp => {
            if lc && !children.is_empty() {
                if node.associativity() == Some(Associativity::Left) {
                    to_tokens(tree, children[0], opts, tokens);
                    tokens.push(node.value.clone());
                } else {
                    tokens.push(node.value.clone());
                    to_tokens(tree, children[0], opts, tokens);
                }
            } else {
                tokens.push(node.value.clone());
            }
        }
        NodeKind::Bracket => {
            if lc && children.len() < 2 {
                for &child in children {
                    to_tokens(tree, child, opts, tokens);
                }
            } else {
                tokens.push("\\(".to_string());
                for &child in children {
                    to_tokens(tree, child, opts, tokens);
                }
                tokens.push("\\)".to_string());
            }
        }
        NodeKind::Argument => {
            tokens.push(argument_token(tree, id, opts));
            if lc {
                for &child in children {
                    to_tokens(tree, child, opts, tokens);
                }
            }
        }
    }
}

fn argument_token(tree: &CommandTree, id: NodeId, opts: &TokenOptions) -> String {
    let node = tree.get(id);
    let arg_type = node.arg_type();
    let mut token = if opts.arg_type_only && node.is_open_vocab() {
        let under_find = node
            .parent()
            .map(|p| tree.get(p).is_command("find"))
            .unwrap_or(false);
        if opts.keep_common_args && under_find && FIND_COMMON_ARGS.contains(&node.value.as_str()) {
            node.value.clone()
        } else if arg_type.is_quantity() && node.value.starts_with('+') {
            format!("+{}", arg_type)
        } else if arg_type.is_quantity() && node.value.starts_with('-') {
            format!("-{}", arg_type)
        } else {
            arg_type.to_string()
        }
    } else {
        node.value.clone()
    };
    if opts.with_prefix {
        token = node.prefix() + &token;
    }
    if opts.with_arg_type {
        token = format!("{}_{}", token, arg_type);
    }
    if opts.indexing_args && tree.to_index(id) {
        token = format!("{}-{:02}", token, node.index);
    }
    token
}

/// Types of the arguments (or `UTILITY` for nested commands) a flag holds
pub fn flag_argtype_suffix(tree: &CommandTree, flag: NodeId) -> String {
    let mut suffix = String::new();
    for &child in tree.get_children(flag) {
        let node = tree.get(child);
        if node.is_argument() {
            suffix.push_str(node.arg_type().as_str());
        } else if node.is_utility() {
            suffix.push_str("UTILITY");
        }
    }
    suffix
}

/// Template of a tree: reserved words plus argument types
pub fn ast2template(tree: &CommandTree, options: &TokenOptions) -> String {
    ast2tokens(tree, options).join(" ")
}

/// Render the tree back into a command line
pub fn ast2command(tree: &CommandTree, loose_constraints: bool, ignore_flag_order: bool) -> String {
    to_command(tree, tree.root(), loose_constraints, ignore_flag_order)
}

fn to_command(tree: &CommandTree, id: NodeId, lc: bool, ifo: bool) -> String {
    let node = tree.get(id);
    let children = node.children();
    let join = |ids: &[NodeId], sep: &str| -> String {
        ids.iter()
            .map(|&c| to_command(tree, c, lc, ifo))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(sep)
    };

    match node.kind {
        NodeKind::Root => {
            if lc {
                join(children, " ")
            } else {
                children.first().map(|&c| to_command(tree, c, lc, ifo)).unwrap_or_default()
            }
        }
        NodeKind::Pipeline => join(children, " | "),
        NodeKind::CommandSubstitution => match children.first() {
            Some(&c) => format!("$({})", to_command(tree, c, lc, ifo)),
            None => String::new(),
        },
        NodeKind::ProcessSubstitution => match children.first() {
            Some(&c) => format!("{}({})", node.value, to_command(tree, c, lc, ifo)),
            None => String::new(),
        },
        NodeKind::Utility => {
            let mut ordered = children.to_vec();
            if ifo {
                ordered.sort_by(|&a, &b| tree.get(a).value.cmp(&tree.get(b).value));
            }
            let rest = join(&ordered, " ");
            if rest.is_empty() {
                node.value.clone()
            } else {
                format!("{} {}", node.value, rest)
            }
        }
        NodeKind::Flag => {
            if let Some((flag, terminator)) = node.exec_parts() {
                let terminator = if terminator == ";" { "\\;" } else { terminator };
                let inner = join(children, " ");
                return [flag, inner.as_str(), terminator]
                    .iter()
                    .filter(|s| !s.is_empty())
                    .copied()
                    .collect::<Vec<_>>()
                    .join(" ");
            }
            if children.is_empty() {
                return node.value.clone();
            }
            let connector = if node.is_long_option() { "=" } else { " " };
            format!("{}{}{}", node.value, connector, join(children, " "))
        }
        NodeKind::Operator => node.value.clone(),
        NodeKind::Redirect => {
            let target = join(children, " ");
            format!("{} {}", node.value, target).trim().to_string()
        }
        NodeKind::BinaryLogicOp => {
            if children.is_empty() {
                node.value.clone()
            } else {
                join(children, &format!(" {} ", node.value))
            }
        }
        NodeKind::UnaryLogicOp => match children.first() {
            Some(&c) => {
                let operand = to_command(tree, c, lc, ifo);
                if node.associativity() == Some(Associativity::Left) {
                    format!("{} {}", operand, node.value)
                } else {
                    format!("{} {}", node.value, operand)
                }
            }
            None => node.value.clone(),
        },
        NodeKind::Bracket => {
            if lc && children.len() < 2 {
                join(children, " ")
            } else {
                format!("\\( {} \\)", join(children, " "))
            }
        }
        NodeKind::Argument => {
            let mut s = node.value.clone();
            if lc {
                for &c in children {
                    s.push_str(&to_command(tree, c, lc, ifo));
                }
            }
            s
        }
    }
}

/// Indented `KIND(value)<ArgType>` rendering, one node per line
pub fn pretty_print(tree: &CommandTree) -> String {
    let mut lines = Vec::new();
    let mut stack = vec![(tree.root(), 0usize)];
    while let Some((id, depth)) = stack.pop() {
        lines.push(format!("{}{}", "    ".repeat(depth), tree.get(id)));
        for &child in tree.get_children(id).iter().rev() {
            stack.push((child, depth + 1));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builder::TreeBuilder;
    use crate::ast::types::{ArgType, Node};

    /// find . -name "*.txt" -exec rm {} \; | wc -l
    fn sample() -> CommandTree {
        let mut b = TreeBuilder::new();
        let root = b.root();
        let pipe = b.add(root, Node::pipeline()).unwrap();
        let find = b.add(pipe, Node::utility("find")).unwrap();
        b.add(find, Node::argument(".", ArgType::Path)).unwrap();
        let name = b.add(find, Node::flag("-name")).unwrap();
        b.add(name, Node::argument("\"*.txt\"", ArgType::Regex)).unwrap();
        let exec = b.add(find, Node::flag("-exec::;")).unwrap();
        let rm = b.add(exec, Node::utility("rm")).unwrap();
        b.add(rm, Node::argument("{}", ArgType::ReservedWord)).unwrap();
        let wc = b.add(pipe, Node::utility("wc")).unwrap();
        b.add(wc, Node::flag("-l")).unwrap();
        b.finish()
    }

    #[test]
    fn test_tokens_literal() {
        let tokens = ast2tokens(&sample(), &TokenOptions::loose());
        assert_eq!(
            tokens,
            vec!["find", ".", "-name", "\"*.txt\"", "-exec", "rm", "{}", "\\;", "|", "wc", "-l"]
        );
    }

    #[test]
    fn test_template_elides_literals() {
        let template = ast2template(&sample(), &TokenOptions::loose().arg_type_only(true));
        assert_eq!(template, "find Path -name Regex -exec rm {} \\; | wc -l");
    }

    #[test]
    fn test_keep_common_args() {
        let options = TokenOptions {
            keep_common_args: true,
            ..TokenOptions::loose().arg_type_only(true)
        };
        assert!(ast2template(&sample(), &options).starts_with("find . -name Regex"));
    }

    #[test]
    fn test_prefix_and_flag_argtype() {
        let options = TokenOptions {
            with_prefix: true,
            with_flag_argtype: true,
            ..TokenOptions::loose().arg_type_only(true)
        };
        let tokens = ast2tokens(&sample(), &options);
        assert_eq!(tokens[0], "UTILITY<KIND_PREFIX>find");
        assert_eq!(tokens[2], "FLAG<KIND_PREFIX>-name<FLAG_SUFFIX>Regex");
        assert_eq!(tokens[4], "FLAG<KIND_PREFIX>-exec<FLAG_SUFFIX>UTILITY");
    }

    #[test]
    fn test_flag_head() {
        let options = TokenOptions {
            with_flag_head: true,
            ..TokenOptions::loose()
        };
        let tokens = ast2tokens(&sample(), &options);
        assert!(tokens.contains(&"find@@-name".to_string()));
        assert!(tokens.contains(&"wc@@-l".to_string()));
    }

    #[test]
    fn test_quantity_sign_kept() {
        let mut b = TreeBuilder::new();
        let root = b.root();
        let find = b.add(root, Node::utility("find")).unwrap();
        let mtime = b.add(find, Node::flag("-mtime")).unwrap();
        b.add(mtime, Node::argument("+7", ArgType::Timespan)).unwrap();
        let template = ast2template(&b.finish(), &TokenOptions::loose().arg_type_only(true));
        assert_eq!(template, "find -mtime +Timespan");
    }

    #[test]
    fn test_indexing_args() {
        let mut b = TreeBuilder::new();
        let root = b.root();
        let cp = b.add(root, Node::utility("cp")).unwrap();
        b.add(cp, Node::argument("a", ArgType::File)).unwrap();
        b.add(cp, Node::argument("b", ArgType::File)).unwrap();
        let options = TokenOptions {
            indexing_args: true,
            ..TokenOptions::loose().arg_type_only(true)
        };
        assert_eq!(ast2template(&b.finish(), &options), "cp File-01 File-02");
    }

    #[test]
    fn test_logic_ops_and_brackets() {
        let mut b = TreeBuilder::new();
        let root = b.root();
        let find = b.add(root, Node::utility("find")).unwrap();
        let bracket = b.add(find, Node::bracket()).unwrap();
        b.add(bracket, Node::flag("-empty")).unwrap();
        b.add(bracket, Node::binary_logic_op("-or")).unwrap();
        b.add(bracket, Node::flag("-newer")).unwrap();
        let not = b.add(find, Node::unary_logic_op("!").unwrap()).unwrap();
        b.add(not, Node::flag("-readable")).unwrap();
        let tree = b.finish();
        assert_eq!(
            ast2template(&tree, &TokenOptions::loose()),
            "find \\( -empty -or -newer \\) ! -readable"
        );
    }

    #[test]
    fn test_ast2command() {
        let tree = sample();
        assert_eq!(
            ast2command(&tree, true, false),
            "find . -name \"*.txt\" -exec rm {} \\; | wc -l"
        );
    }

    #[test]
    fn test_long_option_uses_equals() {
        let mut b = TreeBuilder::new();
        let root = b.root();
        let grep = b.add(root, Node::utility("grep")).unwrap();
        let include = b.add(grep, Node::flag("--include")).unwrap();
        b.add(include, Node::argument("*.rs", ArgType::Regex)).unwrap();
        assert_eq!(ast2command(&b.finish(), true, false), "grep --include=*.rs");
    }

    #[test]
    fn test_pretty_print() {
        let printed = pretty_print(&sample());
        let lines: Vec<&str> = printed.lines().collect();
        assert_eq!(lines[0], "ROOT(root)");
        assert_eq!(lines[1], "    PIPELINE()");
        assert_eq!(lines[2], "        UTILITY(find)");
        assert_eq!(lines[3], "            ARGUMENT(.)<Path>");
    }

    #[test]
    fn test_empty_tree_serializes_to_nothing() {
        let tree = CommandTree::new();
        assert!(ast2tokens(&tree, &TokenOptions::loose()).is_empty());
        assert_eq!(ast2command(&tree, true, false), "");
    }
}
