//! Command Normalizer
//!
//! Recursive descent over the lexer's tokens, producing a normalized
//! `CommandTree`. Unlike a shell parser it does not keep the syntax of
//! the input; it keeps what the command *means* to an evaluator:
//! utilities, their flags, typed arguments and the logic operators of
//! `find` expressions.
//!
//! Grammar (simplified):
//!   list      ::= pipeline ((&& | '||' | ; | &) pipeline)* [; | &]
//!   pipeline  ::= command ('|' command)*
//!   command   ::= word (word | redirection | substitution)*
//!   subst     ::= '$(' list ')' | '<(' list ')' | '>(' list ')'

use tracing::trace;

use crate::ast::types::RESERVED_TOKENS;
use crate::ast::{ArgType, Associativity, CommandTree, Node, NodeId, NodeKind, TreeBuilder};
use crate::parser::grammar::{
    flag_argument_type, infer_flag_argument, infer_positional, is_flag_word, split_flag_word,
};
use crate::parser::lexer::{Lexer, Token, TokenType};
use crate::parser::surface::correct_errors_and_normalize_surface;
use crate::parser::types::{
    CommandParser, ParseException, MAX_INPUT_SIZE, MAX_PARSER_DEPTH, MAX_TOKENS,
};

const EXEC_FLAGS: &[&str] = &["-exec", "-execdir", "-ok", "-okdir"];

/// Flags that supply the pattern a utility would otherwise take positionally
const PATTERN_FLAGS: &[(&str, &str)] = &[
    ("grep", "-e"),
    ("grep", "-f"),
    ("grep", "--regexp"),
    ("grep", "--file"),
    ("sed", "-e"),
    ("sed", "-f"),
    ("awk", "-f"),
];

/// The default command parser.
///
/// Surface-corrects the input, tokenizes it and builds the normalized
/// tree. Constructs the normalizer cannot represent (subshells, variable
/// assignments) fail with a `ParseException`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, cmd: &str) -> Result<CommandTree, ParseException> {
        if cmd.len() > MAX_INPUT_SIZE {
            return Err(ParseException::new(
                format!("Input too large: {} bytes exceeds limit of {}", cmd.len(), MAX_INPUT_SIZE),
                0,
            ));
        }
        let cmd = correct_errors_and_normalize_surface(cmd);
        if cmd.is_empty() {
            return Err(ParseException::new("empty command", 0));
        }

        let tokens = Lexer::new(&cmd).tokenize()?;
        if tokens.len() > MAX_TOKENS {
            return Err(ParseException::new(
                format!("Too many tokens: {} exceeds limit of {}", tokens.len(), MAX_TOKENS),
                0,
            ));
        }
        trace!(command = %cmd, tokens = tokens.len(), "normalizing");
        Parser::new(tokens).parse()
    }
}

impl CommandParser for Normalizer {
    fn parse(&self, cmd: &str) -> Result<CommandTree, ParseException> {
        self.normalize(cmd)
    }
}

/// Parse a command line with the default normalizer
pub fn bash_parser(cmd: &str) -> Result<CommandTree, ParseException> {
    Normalizer::new().normalize(cmd)
}

/// Where the words of a command end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    /// At a control operator or end of input
    CommandEnd,
    /// At the `;` or `+` closing a `find -exec` command
    ExecTerminator,
}

/// Per-command bookkeeping while its words are consumed
struct CommandState {
    /// Name used for grammar lookups (`egrep` is looked up as `grep`)
    utility: String,
    /// Flag still waiting for its argument
    pending: Option<NodeId>,
    positional: usize,
    pattern_given: bool,
    end_of_options: bool,
    /// Unescaped `(` tokens seen inside a `find` expression
    open_parens: usize,
}

impl CommandState {
    fn new(utility: &str) -> Self {
        let utility = match utility {
            "egrep" | "fgrep" => "grep",
            other => other,
        };
        Self {
            utility: utility.to_string(),
            pending: None,
            positional: 0,
            pattern_given: false,
            end_of_options: false,
            open_parens: 0,
        }
    }

    fn is_find(&self) -> bool {
        self.utility == "find"
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    builder: TreeBuilder,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            builder: TreeBuilder::new(),
        }
    }

    fn parse(mut self) -> Result<CommandTree, ParseException> {
        let root = self.builder.root();
        let list = self.parse_list()?;
        self.builder.add_child(root, list)?;

        let token = self.current();
        if token.token_type != TokenType::Eof {
            return Err(ParseException::new(
                format!("unexpected '{}'", token.value),
                token.start,
            ));
        }
        Ok(self.builder.finish())
    }

    // ===========================================================================
    // HELPER METHODS
    // ===========================================================================

    fn current(&self) -> &Token {
        // The token stream always ends with Eof.
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn previous_word(&self) -> Option<&str> {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .filter(|t| t.is_word())
            .map(|t| t.word.as_str())
    }

    fn enter(&mut self) -> Result<(), ParseException> {
        self.depth += 1;
        if self.depth > MAX_PARSER_DEPTH {
            return Err(ParseException::new(
                format!("nesting deeper than {}", MAX_PARSER_DEPTH),
                self.current().start,
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // ===========================================================================
    // LISTS AND PIPELINES
    // ===========================================================================

    /// Returns a detached node holding the whole list
    fn parse_list(&mut self) -> Result<NodeId, ParseException> {
        self.enter()?;
        let mut left = self.parse_pipeline()?;
        loop {
            let op = match self.current().token_type {
                TokenType::AndAnd => "&&",
                TokenType::OrOr => "||",
                TokenType::Semicolon | TokenType::Amp => ";",
                _ => break,
            };
            self.advance();
            if op == ";" && matches!(self.current().token_type, TokenType::Eof | TokenType::RParen) {
                break;
            }
            let right = self.parse_pipeline()?;
            left = self.join(left, op, right)?;
        }
        self.leave();
        Ok(left)
    }

    /// Runs of the same list operator share one node
    fn join(&mut self, left: NodeId, op: &str, right: NodeId) -> Result<NodeId, ParseException> {
        let node = self.builder.node(left)?;
        if node.kind == NodeKind::BinaryLogicOp && node.value == op {
            self.builder.add_child(left, right)?;
            return Ok(left);
        }
        let joined = self.builder.create(Node::binary_logic_op(op))?;
        self.builder.add_child(joined, left)?;
        self.builder.add_child(joined, right)?;
        Ok(joined)
    }

    fn parse_pipeline(&mut self) -> Result<NodeId, ParseException> {
        let first = self.parse_command(Stop::CommandEnd)?;
        if self.current().token_type != TokenType::Pipe {
            return Ok(first);
        }
        let pipeline = self.builder.create(Node::pipeline())?;
        self.builder.add_child(pipeline, first)?;
        while self.current().token_type == TokenType::Pipe {
            self.advance();
            let next = self.parse_command(Stop::CommandEnd)?;
            self.builder.add_child(pipeline, next)?;
        }
        Ok(pipeline)
    }

    // ===========================================================================
    // COMMANDS
    // ===========================================================================

    /// Returns the detached utility node of one command
    fn parse_command(&mut self, stop: Stop) -> Result<NodeId, ParseException> {
        self.enter()?;
        let token = self.current().clone();
        match token.token_type {
            TokenType::Word => {}
            TokenType::LParen => {
                return Err(ParseException::new("unsupported: subshell", token.start));
            }
            _ => {
                return Err(ParseException::new(
                    format!("expected a command, got '{}'", token.value),
                    token.start,
                ));
            }
        }
        if is_assignment(&token.word) {
            return Err(ParseException::new(
                format!("unsupported: variable assignment '{}'", token.word),
                token.start,
            ));
        }
        self.advance();

        let head = self.builder.create(Node::utility(token.word.clone()))?;
        let mut state = CommandState::new(&token.word);
        self.parse_words(head, &mut state, stop)?;

        if let Some(flag) = state.pending {
            let flag = self.builder.node(flag)?.value.clone();
            return Err(ParseException::new(
                format!("flag {} of {} expects an argument", flag, state.utility),
                self.current().start,
            ));
        }
        self.post_process(head)?;
        trace!(utility = %token.word, "command normalized");
        self.leave();
        Ok(head)
    }

    fn parse_words(&mut self, head: NodeId, state: &mut CommandState, stop: Stop) -> Result<(), ParseException> {
        loop {
            let token = self.current().clone();
            match token.token_type {
                TokenType::Word => {
                    if stop == Stop::ExecTerminator && self.is_exec_terminator(&token) {
                        break;
                    }
                    let starts_subcommand = state.utility == "xargs"
                        && state.pending.is_none()
                        && !is_flag_word(&token.word);
                    if starts_subcommand {
                        let sub = self.parse_command(stop)?;
                        self.builder.add_child(head, sub)?;
                        continue;
                    }
                    self.advance();
                    if state.is_find() {
                        self.find_word(head, state, &token)?;
                    } else {
                        self.command_word(head, state, &token)?;
                    }
                }
                TokenType::Semicolon if stop == Stop::ExecTerminator => break,
                TokenType::Redirect => {
                    self.advance();
                    self.redirect(head, &token)?;
                }
                TokenType::CommandSubStart => {
                    self.advance();
                    let node = self.substitution(Node::command_substitution(), token.start)?;
                    self.attach_value(head, state, node)?;
                }
                TokenType::ProcessSubStart => {
                    self.advance();
                    let node = self.substitution(Node::process_substitution(token.value.clone())?, token.start)?;
                    self.attach_value(head, state, node)?;
                }
                TokenType::LParen if state.is_find() => {
                    self.advance();
                    state.open_parens += 1;
                    self.builder.add(head, Node::argument("(", ArgType::Unknown))?;
                }
                TokenType::RParen if state.is_find() && state.open_parens > 0 => {
                    self.advance();
                    state.open_parens -= 1;
                    self.builder.add(head, Node::argument(")", ArgType::Unknown))?;
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn is_exec_terminator(&self, token: &Token) -> bool {
        match token.word.as_str() {
            ";" => true,
            "+" => self.previous_word() == Some("{}"),
            _ => false,
        }
    }

    /// A word of any utility other than `find`
    fn command_word(&mut self, head: NodeId, state: &mut CommandState, token: &Token) -> Result<(), ParseException> {
        if let Some(flag) = state.pending.take() {
            return self.flag_argument(flag, state, token);
        }
        let word = token.word.as_str();
        if state.end_of_options || !is_flag_word(word) {
            return self.positional(head, state, token);
        }
        if word == "--" {
            self.builder.add(head, Node::operator("--"))?;
            state.end_of_options = true;
            return Ok(());
        }

        let pieces = split_flag_word(&state.utility, word);
        let last = pieces.len().saturating_sub(1);
        for (i, (name, inline)) in pieces.into_iter().enumerate() {
            if PATTERN_FLAGS.contains(&(state.utility.as_str(), name.as_str())) {
                state.pattern_given = true;
            }
            let takes_value = flag_argument_type(&state.utility, &name).is_some();
            let flag = self.builder.add(head, Node::flag(name.clone()))?;
            match inline {
                Some(value) => {
                    let arg_type = argument_type_for_flag(&state.utility, &name, &value);
                    self.builder.add(flag, Node::argument(value, arg_type))?;
                }
                None if i == last && takes_value => state.pending = Some(flag),
                None => {}
            }
        }
        Ok(())
    }

    /// A word of a `find` expression
    fn find_word(&mut self, head: NodeId, state: &mut CommandState, token: &Token) -> Result<(), ParseException> {
        if let Some(flag) = state.pending.take() {
            return self.flag_argument(flag, state, token);
        }
        let word = token.word.as_str();
        match word {
            "(" | ")" => {
                self.builder.add(head, Node::argument(word, ArgType::Unknown))?;
            }
            "!" | "-not" | "-prune" => {
                self.builder.add(head, Node::unary_logic_op(word)?)?;
            }
            "-and" | "-a" | "," => {
                self.builder.add(head, Node::binary_logic_op("-and"))?;
            }
            "-or" | "-o" => {
                self.builder.add(head, Node::binary_logic_op("-or"))?;
            }
            w if EXEC_FLAGS.contains(&w) => self.exec_flag(head, w)?,
            w if is_flag_word(w) => {
                let flag = self.builder.add(head, Node::flag(w))?;
                if flag_argument_type("find", w).is_some() {
                    state.pending = Some(flag);
                }
            }
            _ => self.positional(head, state, token)?,
        }
        Ok(())
    }

    /// `-exec cmd ... ;` holds the nested command; the flag value records
    /// its terminator
    fn exec_flag(&mut self, head: NodeId, name: &str) -> Result<(), ParseException> {
        let flag = self.builder.add(head, Node::flag(name))?;
        let sub = self.parse_command(Stop::ExecTerminator)?;
        self.builder.add_child(flag, sub)?;

        let token = self.current().clone();
        let terminator = match token.token_type {
            TokenType::Word if self.is_exec_terminator(&token) => {
                self.advance();
                token.word
            }
            TokenType::Semicolon => {
                self.advance();
                ";".to_string()
            }
            _ => {
                trace!(flag = name, "exec without terminator, assuming ';'");
                ";".to_string()
            }
        };
        self.builder.node_mut(flag)?.value = format!("{}::{}", name, terminator);
        Ok(())
    }

    fn flag_argument(&mut self, flag: NodeId, state: &CommandState, token: &Token) -> Result<(), ParseException> {
        let name = self.builder.node(flag)?.value.clone();
        let arg_type = argument_type_for_flag(&state.utility, &name, &token.word);
        // xargs matches its replacement string without quotes
        let value = if state.utility == "xargs" && name == "-I" {
            token.word.clone()
        } else {
            argument_value(token)
        };
        self.builder.add(flag, Node::argument(value, arg_type))?;
        Ok(())
    }

    fn positional(&mut self, head: NodeId, state: &mut CommandState, token: &Token) -> Result<(), ParseException> {
        let arg_type = infer_positional(&state.utility, &token.word, state.positional, state.pattern_given);
        state.positional += 1;
        self.builder.add(head, Node::argument(argument_value(token), arg_type))?;
        Ok(())
    }

    /// Substitutions fill a pending flag's argument slot, otherwise a positional one
    fn attach_value(&mut self, head: NodeId, state: &mut CommandState, node: NodeId) -> Result<(), ParseException> {
        match state.pending.take() {
            Some(flag) => self.builder.add_child(flag, node)?,
            None => {
                state.positional += 1;
                self.builder.add_child(head, node)?;
            }
        }
        Ok(())
    }

    fn redirect(&mut self, head: NodeId, op: &Token) -> Result<(), ParseException> {
        let target = self.current().clone();
        if target.token_type != TokenType::Word {
            return Err(ParseException::new(
                format!("missing target for redirection '{}'", op.value),
                op.start,
            ));
        }
        self.advance();
        let redirect = self.builder.add(head, Node::redirect(op.value.clone()))?;
        let duplicates_fd = op.value.ends_with('&') && target.word.chars().all(|c| c.is_ascii_digit());
        let arg_type = if duplicates_fd { ArgType::Number } else { ArgType::File };
        self.builder.add(redirect, Node::argument(target.value, arg_type))?;
        Ok(())
    }

    fn substitution(&mut self, node: Node, start: usize) -> Result<NodeId, ParseException> {
        let container = self.builder.create(node)?;
        let inner = self.parse_list()?;
        self.builder.add_child(container, inner)?;
        if self.current().token_type != TokenType::RParen {
            return Err(ParseException::new("unterminated substitution", start));
        }
        self.advance();
        Ok(container)
    }

    // ===========================================================================
    // POST-PROCESSING
    // ===========================================================================

    fn post_process(&mut self, head: NodeId) -> Result<(), ParseException> {
        let name = self.builder.node(head)?.value.clone();
        match name.as_str() {
            "find" => {
                self.collapse_brackets(head)?;
                self.attach_unary_operands(head)?;
                self.implicit_find_path(head)?;
            }
            "egrep" => self.grep_dialect(head, "-E", "--extended-regexp")?,
            "fgrep" => self.grep_dialect(head, "-F", "--fixed-strings")?,
            "xargs" => self.normalize_xargs(head)?,
            _ => {}
        }
        Ok(())
    }

    /// Turn matched parenthesis markers into bracket nodes, innermost
    /// first. A stray `)` is dropped and an unclosed `(` is closed at
    /// the end of the expression.
    fn collapse_brackets(&mut self, head: NodeId) -> Result<(), ParseException> {
        loop {
            let children = self.builder.tree().get_children(head).to_vec();
            let mut open = Vec::new();
            let mut closed = None;
            let mut stray = None;
            for (i, &child) in children.iter().enumerate() {
                let node = self.builder.node(child)?;
                if !node.is_bracket() {
                    continue;
                }
                if node.value == "(" {
                    open.push(i);
                } else {
                    match open.pop() {
                        Some(left) => closed = Some((left, i)),
                        None => stray = Some(child),
                    }
                    break;
                }
            }

            if let Some(child) = stray {
                trace!("dropping unmatched ')'");
                self.builder.remove_child(head, child)?;
            } else if let Some((left, right)) = closed {
                let inner = &children[left + 1..right];
                let new_child = match inner {
                    [single] => *single,
                    _ => self.builder.create(Node::bracket())?,
                };
                self.builder
                    .substitute_parentheses(head, children[left], children[right], new_child)?;
            } else if !open.is_empty() {
                trace!("closing unmatched '('");
                self.builder.add(head, Node::argument(")", ArgType::Unknown))?;
            } else {
                return Ok(());
            }
        }
    }

    /// Give each unary logic operator its operand: the node after `!`
    /// and `-not`, the node before `-prune`. A `-prune` with nothing to
    /// apply to stays a plain flag.
    fn attach_unary_operands(&mut self, container: NodeId) -> Result<(), ParseException> {
        for child in self.builder.tree().get_children(container).to_vec() {
            if self.builder.node(child)?.kind == NodeKind::Bracket {
                self.attach_unary_operands(child)?;
            }
        }

        let mut i = self.builder.tree().get_children(container).len();
        while i > 0 {
            i -= 1;
            let children = self.builder.tree().get_children(container).to_vec();
            let op = children[i];
            if !self.is_pending_unary(op, Associativity::Right)? {
                continue;
            }
            match children.get(i + 1) {
                Some(&operand) if self.is_logic_operand(operand)? => {
                    self.builder.remove_child(container, operand)?;
                    self.builder.add_child(op, operand)?;
                }
                _ => {
                    let value = self.builder.node(op)?.value.clone();
                    return Err(ParseException::new(format!("missing operand for '{}'", value), 0));
                }
            }
        }

        let mut i = 0;
        while i < self.builder.tree().get_children(container).len() {
            let children = self.builder.tree().get_children(container).to_vec();
            let op = children[i];
            if !self.is_pending_unary(op, Associativity::Left)? {
                i += 1;
                continue;
            }
            let operand = match i.checked_sub(1).map(|p| children[p]) {
                Some(prev) if self.is_logic_operand(prev)? => prev,
                _ => {
                    trace!("-prune without operand kept as a flag");
                    self.builder.node_mut(op)?.kind = NodeKind::Flag;
                    i += 1;
                    continue;
                }
            };
            self.builder.remove_child(container, operand)?;
            self.builder.add_child(op, operand)?;
        }
        Ok(())
    }

    fn is_pending_unary(&self, id: NodeId, side: Associativity) -> Result<bool, ParseException> {
        let node = self.builder.node(id)?;
        Ok(node.associativity() == Some(side) && !node.has_children())
    }

    /// Flags, brackets and operators that already hold their operand
    fn is_logic_operand(&self, id: NodeId) -> Result<bool, ParseException> {
        let node = self.builder.node(id)?;
        Ok(match node.kind {
            NodeKind::Flag | NodeKind::Bracket => true,
            NodeKind::UnaryLogicOp => node.has_children(),
            _ => false,
        })
    }

    fn implicit_find_path(&mut self, head: NodeId) -> Result<(), ParseException> {
        let tree = self.builder.tree();
        let children = tree.get_children(head);
        if children.is_empty() || children.iter().any(|&c| tree.is_argument(c)) {
            return Ok(());
        }
        let dot = self.builder.create(Node::argument(".", ArgType::Path))?;
        self.builder.insert_child(head, 0, dot)?;
        Ok(())
    }

    fn grep_dialect(&mut self, head: NodeId, short: &str, long: &str) -> Result<(), ParseException> {
        self.builder.node_mut(head)?.value = "grep".to_string();
        let tree = self.builder.tree();
        let present = tree.get_flags(head).into_iter().any(|f| {
            let value = tree.get(f).value.as_str();
            value == short || value == long
        });
        if !present {
            let flag = self.builder.create(Node::flag(short))?;
            self.builder.insert_child(head, 0, flag)?;
        }
        Ok(())
    }

    /// Make the replacement string of `xargs` explicit and spell it `{}`
    fn normalize_xargs(&mut self, head: NodeId) -> Result<(), ParseException> {
        let tree = self.builder.tree();
        let Some(sub) = tree.get_subcommand(head) else {
            return Ok(());
        };
        let replace_flag = tree
            .get_flags(head)
            .into_iter()
            .find(|&f| tree.get(f).value == "-I");

        match replace_flag {
            Some(flag) => {
                let Some(arg) = tree.get_argument(flag) else {
                    return Ok(());
                };
                let replacement = tree.get(arg).value.clone();
                if replacement != "{}" {
                    self.replace_in_arguments(sub, &replacement)?;
                    let node = self.builder.node_mut(arg)?;
                    node.value = "{}".to_string();
                    node.arg_type = Some(ArgType::ReservedWord);
                }
            }
            None => {
                let position = tree
                    .get_children(head)
                    .iter()
                    .position(|&c| c == sub)
                    .unwrap_or(0);
                let flag = self.builder.create(Node::flag("-I"))?;
                self.builder.insert_child(head, position, flag)?;
                self.builder.add(flag, Node::argument("{}", ArgType::ReservedWord))?;
                self.builder.add(sub, Node::argument("{}", ArgType::ReservedWord))?;
            }
        }
        Ok(())
    }

    fn replace_in_arguments(&mut self, from: NodeId, replacement: &str) -> Result<(), ParseException> {
        let mut stack = self.builder.tree().get_children(from).to_vec();
        while let Some(id) = stack.pop() {
            let node = self.builder.node_mut(id)?;
            if !node.is_argument() {
                stack.extend(self.builder.tree().get_children(id).iter().copied());
                continue;
            }
            if node.value.contains(replacement) {
                node.value = node.value.replace(replacement, "{}");
                if node.value == "{}" {
                    node.arg_type = Some(ArgType::ReservedWord);
                }
            }
        }
        Ok(())
    }
}

/// Surface text of an argument; reserved words lose their escapes
fn argument_value(token: &Token) -> String {
    if RESERVED_TOKENS.contains(&token.word.as_str()) {
        token.word.clone()
    } else {
        token.value.clone()
    }
}

fn argument_type_for_flag(utility: &str, flag: &str, word: &str) -> ArgType {
    if RESERVED_TOKENS.contains(&word) {
        ArgType::ReservedWord
    } else {
        infer_flag_argument(utility, flag, word)
    }
}

/// `NAME=value` in command position
fn is_assignment(word: &str) -> bool {
    let Some((name, _)) = word.split_once('=') else {
        return false;
    };
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ast2command, ast2template, TokenOptions};

    fn template(cmd: &str) -> String {
        let tree = bash_parser(cmd).unwrap();
        ast2template(&tree, &TokenOptions::loose().arg_type_only(true))
    }

    fn literal(cmd: &str) -> String {
        let tree = bash_parser(cmd).unwrap();
        ast2template(&tree, &TokenOptions::loose())
    }

    #[test]
    fn test_simple_command() {
        let tree = bash_parser("ls -l /tmp").unwrap();
        let ls = tree.get_children(tree.root())[0];
        assert!(tree.get(ls).is_command("ls"));
        assert_eq!(tree.child_kind(ls, 0), Some(NodeKind::Flag));
        assert_eq!(tree.child_kind(ls, 1), Some(NodeKind::Argument));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_find_template() {
        assert_eq!(
            template("find . -name '*.txt' -exec rm {} \\; | wc -l"),
            "find Path -name Regex -exec rm {} \\; | wc -l"
        );
    }

    #[test]
    fn test_find_quantities() {
        assert_eq!(
            template("find /var -mtime +7 -size -10M -type f"),
            "find Path -mtime +Timespan -size -Size -type f"
        );
    }

    #[test]
    fn test_find_logic_operators() {
        assert_eq!(
            literal("find . -name a -o -name b -a ! -empty"),
            "find . -name a -or -name b -and ! -empty"
        );
    }

    #[test]
    fn test_unary_operators_take_operands() {
        let tree = bash_parser("find . ! -name a -path b -prune -o -print").unwrap();
        assert!(tree.validate().is_ok());
        let find = tree.get_children(tree.root())[0];
        assert_eq!(tree.child_kind(find, 1), Some(NodeKind::UnaryLogicOp));
        let not = tree.get_children(find)[1];
        assert_eq!(tree.child_kind(not, 0), Some(NodeKind::Flag));
        let prune = tree.get_children(find)[2];
        assert_eq!(tree.get(prune).value, "-prune");
        assert_eq!(tree.get(tree.get_children(prune)[0]).value, "-path");
        assert_eq!(
            literal("find . ! -name a -path b -prune -o -print"),
            "find . ! -name a -path b -prune -or -print"
        );
    }

    #[test]
    fn test_unary_operator_on_bracket() {
        let tree = bash_parser("find . ! \\( -name a -o -name b \\)").unwrap();
        assert!(tree.validate().is_ok());
        let find = tree.get_children(tree.root())[0];
        let not = tree.get_children(find)[1];
        assert_eq!(tree.child_kind(not, 0), Some(NodeKind::Bracket));
    }

    #[test]
    fn test_bare_prune_is_a_flag() {
        let tree = bash_parser("find . -prune").unwrap();
        let find = tree.get_children(tree.root())[0];
        assert_eq!(tree.child_kind(find, 1), Some(NodeKind::Flag));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_dangling_negation_fails() {
        assert!(bash_parser("find . -name a !").is_err());
    }

    #[test]
    fn test_find_brackets() {
        let tree = bash_parser("find . \\( -name a -o -name b \\) -print").unwrap();
        let find = tree.get_children(tree.root())[0];
        assert_eq!(tree.child_kind(find, 1), Some(NodeKind::Bracket));
        let bracket = tree.get_children(find)[1];
        assert_eq!(tree.get_children(bracket).len(), 3);
        assert_eq!(
            ast2template(&tree, &TokenOptions::loose()),
            "find . \\( -name a -or -name b \\) -print"
        );
    }

    #[test]
    fn test_single_bracketed_child_collapses() {
        assert_eq!(literal("find . \\( -empty \\)"), "find . -empty");
    }

    #[test]
    fn test_unbalanced_brackets_are_repaired() {
        assert_eq!(literal("find . -empty \\) -print"), "find . -empty -print");
        assert_eq!(
            literal("find . \\( -empty -o -newer x"),
            "find . \\( -empty -or -newer x \\)"
        );
    }

    #[test]
    fn test_implicit_find_path() {
        assert_eq!(literal("find -name x"), "find . -name x");
    }

    #[test]
    fn test_exec_plus_terminator() {
        let tree = bash_parser("find . -type f -exec grep -l foo {} +").unwrap();
        let find = tree.get_children(tree.root())[0];
        let exec = tree.get_flags(find)[1];
        assert_eq!(tree.get(exec).value, "-exec::+");
        let grep = tree.get_subcommand(exec).unwrap();
        assert!(tree.get(grep).is_command("grep"));
    }

    #[test]
    fn test_exec_without_terminator() {
        let tree = bash_parser("find . -exec rm {}").unwrap();
        let find = tree.get_children(tree.root())[0];
        let exec = tree.get_flags(find)[0];
        assert_eq!(tree.get(exec).value, "-exec::;");
    }

    #[test]
    fn test_bundled_short_flags() {
        assert_eq!(literal("rm -rf build"), "rm -r -f build");
    }

    #[test]
    fn test_flag_arguments() {
        let tree = bash_parser("head -n 5 log.txt").unwrap();
        let head = tree.get_children(tree.root())[0];
        let n = tree.get_flags(head)[0];
        let five = tree.get_argument(n).unwrap();
        assert_eq!(tree.get(five).arg_type(), ArgType::Number);
        assert_eq!(template("head -n5 log.txt"), "head -n Number File");
    }

    #[test]
    fn test_long_option_value() {
        assert_eq!(
            template("grep -r --include=*.rs TODO ."),
            "grep -r --include Regex Regex File"
        );
    }

    #[test]
    fn test_double_dash() {
        let tree = bash_parser("rm -- -file").unwrap();
        let rm = tree.get_children(tree.root())[0];
        assert_eq!(tree.child_kind(rm, 0), Some(NodeKind::Operator));
        assert_eq!(tree.child_kind(rm, 1), Some(NodeKind::Argument));
    }

    #[test]
    fn test_grep_pattern_flag() {
        assert_eq!(template("grep -e foo a.txt"), "grep -e Regex File");
    }

    #[test]
    fn test_egrep_becomes_grep() {
        assert_eq!(literal("egrep foo a.txt"), "grep -E foo a.txt");
        assert_eq!(literal("egrep -E foo a.txt"), "grep -E foo a.txt");
        assert_eq!(literal("fgrep foo a.txt"), "grep -F foo a.txt");
    }

    #[test]
    fn test_xargs_gets_replacement_string() {
        assert_eq!(literal("find . -name x | xargs rm"), "find . -name x | xargs -I {} rm {}");
    }

    #[test]
    fn test_xargs_quoted_replacement_string() {
        assert_eq!(
            literal("ls | xargs -I \"%\" mv % %.bak"),
            "ls | xargs -I {} mv {} {}.bak"
        );
        assert_eq!(literal("ls | xargs -I '%' rm %"), "ls | xargs -I {} rm {}");
    }

    #[test]
    fn test_xargs_replacement_string_normalized() {
        assert_eq!(
            literal("ls | xargs -I X mv X X.bak"),
            "ls | xargs -I {} mv {} {}.bak"
        );
    }

    #[test]
    fn test_list_operators() {
        let tree = bash_parser("mkdir out && cd out && ls").unwrap();
        let list = tree.get_children(tree.root())[0];
        assert_eq!(tree.get(list).kind, NodeKind::BinaryLogicOp);
        assert_eq!(tree.get(list).value, "&&");
        assert_eq!(tree.get_children(list).len(), 3);

        let tree = bash_parser("make || echo failed; echo done").unwrap();
        let outer = tree.get_children(tree.root())[0];
        assert_eq!(tree.get(outer).value, ";");
        let inner = tree.get_children(outer)[0];
        assert_eq!(tree.get(inner).value, "||");
    }

    #[test]
    fn test_trailing_separator() {
        assert_eq!(literal("ls;"), "ls");
    }

    #[test]
    fn test_redirection() {
        let tree = bash_parser("sort a.txt > b.txt 2>&1").unwrap();
        let sort = tree.get_children(tree.root())[0];
        assert_eq!(tree.child_kind(sort, 1), Some(NodeKind::Redirect));
        assert_eq!(ast2command(&tree, true, false), "sort a.txt > b.txt 2>& 1");
    }

    #[test]
    fn test_command_substitution() {
        let tree = bash_parser("echo $(date +%s)").unwrap();
        let echo = tree.get_children(tree.root())[0];
        assert_eq!(tree.child_kind(echo, 0), Some(NodeKind::CommandSubstitution));
        assert_eq!(ast2command(&tree, true, false), "echo $(date +%s)");
    }

    #[test]
    fn test_process_substitution() {
        let tree = bash_parser("diff <(ls a) <(ls b)").unwrap();
        let diff = tree.get_children(tree.root())[0];
        assert_eq!(tree.get_children(diff).len(), 2);
        assert_eq!(tree.child_kind(diff, 0), Some(NodeKind::ProcessSubstitution));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_surface_corrections_applied() {
        assert_eq!(literal("sudo /usr/bin/find . -prin"), "find . -print");
    }

    #[test]
    fn test_unsupported_constructs() {
        assert!(bash_parser("").is_err());
        assert!(bash_parser("FOO=1 ls").is_err());
        assert!(bash_parser("(cd x && ls)").is_err());
        assert!(bash_parser("echo 'unterminated").is_err());
        assert!(bash_parser("| ls").is_err());
        assert!(bash_parser("echo $(ls").is_err());
        assert!(bash_parser("find . -name").is_err());
    }

    #[test]
    fn test_closure_parser_seam() {
        let parser = |cmd: &str| bash_parser(cmd);
        assert!(CommandParser::parse(&parser, "ls").is_ok());
        assert!(Normalizer::new().parse("ls").is_ok());
    }
}
