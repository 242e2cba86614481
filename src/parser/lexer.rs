//! Lexer for Command Lines
//!
//! The lexer tokenizes a single command line into the tokens the
//! normalizer consumes. It handles:
//! - Control operators (`|`, `&&`, `||`, `;`, `&`)
//! - Redirections, with an optional file descriptor prefix
//! - Command and process substitution openers (`$(`, `<(`, `>(`)
//! - Words, with single/double quoting and backslash escapes
//! - Comments

use std::collections::HashMap;

/// Token types for the command lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Eof,

    // Control operators
    Pipe,      // | or |&
    AndAnd,    // &&
    OrOr,      // ||
    Semicolon, // ;
    Amp,       // &

    /// Any redirection operator; the value holds its spelling
    Redirect,

    // Grouping
    LParen,           // (
    RParen,           // )
    CommandSubStart,  // $(
    ProcessSubStart,  // <( or >(

    Word,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eof => "EOF",
            Self::Pipe => "|",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Semicolon => ";",
            Self::Amp => "&",
            Self::Redirect => "REDIRECT",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::CommandSubStart => "$(",
            Self::ProcessSubStart => "PROCSUB",
            Self::Word => "WORD",
        }
    }

    /// Tokens that end a simple command
    pub fn ends_command(&self) -> bool {
        matches!(
            self,
            Self::Eof | Self::Pipe | Self::AndAnd | Self::OrOr | Self::Semicolon | Self::Amp | Self::RParen
        )
    }
}

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    /// Surface text, quotes and escapes retained
    pub value: String,
    /// Text after quote removal; equal to `value` for operators
    pub word: String,
    pub start: usize,
    pub end: usize,
    pub quoted: bool,
    pub single_quoted: bool,
}

impl Token {
    pub fn new(token_type: TokenType, value: impl Into<String>, start: usize, end: usize) -> Self {
        let value = value.into();
        Self {
            token_type,
            word: value.clone(),
            value,
            start,
            end,
            quoted: false,
            single_quoted: false,
        }
    }

    pub fn is_word(&self) -> bool {
        self.token_type == TokenType::Word
    }
}

/// Unterminated quote or substitution, with its character offset
#[derive(Debug, Clone, PartialEq)]
pub struct LexerError {
    pub message: String,
    pub offset: usize,
}

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "offset {}: {}", self.offset, self.message)
    }
}

impl std::error::Error for LexerError {}

impl LexerError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

lazy_static::lazy_static! {
    /// Single-character control operators
    static ref SINGLE_CHAR_OPS: HashMap<char, TokenType> = {
        let mut m = HashMap::new();
        m.insert('|', TokenType::Pipe);
        m.insert('&', TokenType::Amp);
        m.insert(';', TokenType::Semicolon);
        m.insert('(', TokenType::LParen);
        m.insert(')', TokenType::RParen);
        m
    };
}

/// Two-character control operators
const TWO_CHAR_OPS: &[(&str, TokenType)] = &[
    ("&&", TokenType::AndAnd),
    ("||", TokenType::OrOr),
    ("|&", TokenType::Pipe),
    ("$(", TokenType::CommandSubStart),
    ("<(", TokenType::ProcessSubStart),
    (">(", TokenType::ProcessSubStart),
];

/// Redirection operators, longest first
const REDIRECT_OPS: &[&str] = &["&>>", "<<<", "&>", ">>", ">&", "<&", "<>", ">|", "<<", ">", "<"];

/// Characters that end an unquoted word
fn is_word_boundary(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | ';' | '&' | '|' | '(' | ')' | '<' | '>')
}

pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexerError> {
        while self.pos < self.input.len() {
            self.skip_whitespace();
            if self.pos >= self.input.len() {
                break;
            }
            if let Some(token) = self.next_token()? {
                self.tokens.push(token);
            }
        }
        self.tokens.push(Token::new(TokenType::Eof, "", self.pos, self.pos));
        Ok(self.tokens)
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek(i) == Some(c))
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current() {
            if c == ' ' || c == '\t' || c == '\n' || c == '\r' {
                self.pos += 1;
            } else if c == '\\' && self.peek(1) == Some('\n') {
                self.pos += 2;
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, LexerError> {
        let start = self.pos;
        let c0 = match self.current() {
            Some(c) => c,
            None => return Ok(None),
        };

        // Comments run to end of line
        if c0 == '#' {
            while let Some(c) = self.current() {
                if c == '\n' {
                    break;
                }
                self.pos += 1;
            }
            return Ok(None);
        }

        for (op, token_type) in TWO_CHAR_OPS {
            if self.starts_with(op) {
                self.pos += 2;
                let value = match token_type {
                    TokenType::ProcessSubStart => c0.to_string(),
                    _ => op.to_string(),
                };
                return Ok(Some(Token::new(*token_type, value, start, self.pos)));
            }
        }

        if let Some(token) = self.read_redirect(start) {
            return Ok(Some(token));
        }

        if let Some(&token_type) = SINGLE_CHAR_OPS.get(&c0) {
            self.pos += 1;
            return Ok(Some(Token::new(token_type, c0.to_string(), start, self.pos)));
        }

        self.read_word(start).map(Some)
    }

    /// Redirection operator with an optional leading file descriptor
    fn read_redirect(&mut self, start: usize) -> Option<Token> {
        let digits = self.input[self.pos..]
            .iter()
            .take_while(|c| c.is_ascii_digit())
            .count();
        let saved = self.pos;
        self.pos += digits;
        for op in REDIRECT_OPS {
            if self.starts_with(op) && !(op.starts_with('&') && digits > 0) {
                self.pos += op.chars().count();
                let value: String = self.input[start..self.pos].iter().collect();
                return Some(Token::new(TokenType::Redirect, value, start, self.pos));
            }
        }
        self.pos = saved;
        None
    }

    fn read_word(&mut self, start: usize) -> Result<Token, LexerError> {
        let mut value = String::new();
        let mut word = String::new();
        let mut quoted = false;
        let mut single_quoted = false;

        while let Some(c) = self.current() {
            if is_word_boundary(c) {
                break;
            }
            match c {
                '\'' => {
                    quoted = true;
                    single_quoted = true;
                    let inner = self.read_until_quote('\'')?;
                    value.push('\'');
                    value.push_str(&inner);
                    value.push('\'');
                    word.push_str(&inner);
                }
                '"' => {
                    quoted = true;
                    let (raw, inner) = self.read_double_quoted()?;
                    value.push('"');
                    value.push_str(&raw);
                    value.push('"');
                    word.push_str(&inner);
                }
                '\\' => {
                    self.pos += 1;
                    match self.current() {
                        Some(next) => {
                            value.push('\\');
                            value.push(next);
                            word.push(next);
                            self.pos += 1;
                        }
                        None => {
                            value.push('\\');
                            word.push('\\');
                        }
                    }
                }
                '`' => {
                    let inner = self.read_until_quote('`')?;
                    let text = format!("`{}`", inner);
                    value.push_str(&text);
                    word.push_str(&text);
                }
                '$' if self.peek(1) == Some('(') => {
                    let text = self.read_balanced_dollar_paren()?;
                    value.push_str(&text);
                    word.push_str(&text);
                }
                _ => {
                    value.push(c);
                    word.push(c);
                    self.pos += 1;
                }
            }
        }

        let mut token = Token::new(TokenType::Word, value, start, self.pos);
        token.word = word;
        token.quoted = quoted;
        token.single_quoted = single_quoted;
        Ok(token)
    }

    /// Consume `quote ... quote` and return the inner text verbatim
    fn read_until_quote(&mut self, quote: char) -> Result<String, LexerError> {
        let open = self.pos;
        self.pos += 1;
        let mut inner = String::new();
        while let Some(c) = self.current() {
            self.pos += 1;
            if c == quote {
                return Ok(inner);
            }
            inner.push(c);
        }
        Err(LexerError::new(format!("unterminated {} quote", quote), open))
    }

    /// Returns the raw inner text and the text after escape processing
    fn read_double_quoted(&mut self) -> Result<(String, String), LexerError> {
        let open = self.pos;
        self.pos += 1;
        let mut raw = String::new();
        let mut inner = String::new();
        while let Some(c) = self.current() {
            self.pos += 1;
            match c {
                '"' => return Ok((raw, inner)),
                '\\' => {
                    if let Some(next) = self.current() {
                        self.pos += 1;
                        raw.push('\\');
                        raw.push(next);
                        if matches!(next, '"' | '\\' | '$' | '`') {
                            inner.push(next);
                        } else {
                            inner.push('\\');
                            inner.push(next);
                        }
                    }
                }
                _ => {
                    raw.push(c);
                    inner.push(c);
                }
            }
        }
        Err(LexerError::new("unterminated \" quote", open))
    }

    /// A `$(...)` embedded in a word is kept as literal text
    fn read_balanced_dollar_paren(&mut self) -> Result<String, LexerError> {
        let open = self.pos;
        let mut text = String::from("$(");
        self.pos += 2;
        let mut depth = 1;
        while let Some(c) = self.current() {
            self.pos += 1;
            text.push(c);
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(text);
                    }
                }
                _ => {}
            }
        }
        Err(LexerError::new("unterminated command substitution", open))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(input: &str) -> Vec<TokenType> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn test_simple_command() {
        let tokens = Lexer::new("ls -la /tmp").tokenize().unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].value, "ls");
        assert_eq!(tokens[1].value, "-la");
        assert_eq!(tokens[3].token_type, TokenType::Eof);
    }

    #[test]
    fn test_pipeline_and_lists() {
        assert_eq!(
            types("a | b && c || d; e &"),
            vec![
                TokenType::Word,
                TokenType::Pipe,
                TokenType::Word,
                TokenType::AndAnd,
                TokenType::Word,
                TokenType::OrOr,
                TokenType::Word,
                TokenType::Semicolon,
                TokenType::Word,
                TokenType::Amp,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_redirections() {
        let tokens = Lexer::new("cmd > out 2>&1 >> log < in").tokenize().unwrap();
        let redirects: Vec<&str> = tokens
            .iter()
            .filter(|t| t.token_type == TokenType::Redirect)
            .map(|t| t.value.as_str())
            .collect();
        assert_eq!(redirects, vec![">", "2>&", ">>", "<"]);
    }

    #[test]
    fn test_digits_without_redirect_are_words() {
        let tokens = Lexer::new("head -n 10 file").tokenize().unwrap();
        assert_eq!(tokens[2].token_type, TokenType::Word);
        assert_eq!(tokens[2].value, "10");
    }

    #[test]
    fn test_quotes_keep_surface() {
        let tokens = Lexer::new("grep \"a b\" 'c d'").tokenize().unwrap();
        assert_eq!(tokens[1].value, "\"a b\"");
        assert_eq!(tokens[1].word, "a b");
        assert!(tokens[1].quoted);
        assert!(!tokens[1].single_quoted);
        assert_eq!(tokens[2].value, "'c d'");
        assert!(tokens[2].single_quoted);
    }

    #[test]
    fn test_escaped_characters() {
        let tokens = Lexer::new("find . \\( -name x \\) -exec rm {} \\;").tokenize().unwrap();
        assert_eq!(tokens[2].value, "\\(");
        assert_eq!(tokens[2].word, "(");
        let last = &tokens[tokens.len() - 2];
        assert_eq!(last.value, "\\;");
        assert_eq!(last.word, ";");
    }

    #[test]
    fn test_substitution_openers() {
        assert_eq!(
            types("echo $(date) <(ls)"),
            vec![
                TokenType::Word,
                TokenType::CommandSubStart,
                TokenType::Word,
                TokenType::RParen,
                TokenType::ProcessSubStart,
                TokenType::Word,
                TokenType::RParen,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_embedded_substitution_stays_in_word() {
        let tokens = Lexer::new("echo pre$(date)post").tokenize().unwrap();
        assert_eq!(tokens[1].value, "pre$(date)post");
    }

    #[test]
    fn test_unterminated_quote() {
        let err = Lexer::new("echo 'oops").tokenize().unwrap_err();
        assert_eq!(err.offset, 5);
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn test_comment_is_skipped() {
        assert_eq!(types("ls # list"), vec![TokenType::Word, TokenType::Eof]);
    }
}
