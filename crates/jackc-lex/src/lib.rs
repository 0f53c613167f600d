//! Tokenizer for Jack source files.
//!
//! Reads the whole file eagerly at construction and strips comments
//! line-by-line before scanning each line for tokens. Offers the one- and
//! two-token lookahead the compilation engine needs to disambiguate
//! identifier-led terms (`identifier`, `identifier[`, `identifier.`,
//! `identifier(`).

use std::fmt;
use std::fs;
use std::path::Path;

const KEYWORDS: &[&str] = &[
    "class",
    "constructor",
    "function",
    "method",
    "field",
    "static",
    "var",
    "int",
    "char",
    "boolean",
    "void",
    "true",
    "false",
    "null",
    "this",
    "let",
    "do",
    "if",
    "else",
    "while",
    "return",
];

const SYMBOLS: &str = "{}()[].,;+-*/&|<>=~";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Identifier,
    IntegerConstant,
    StringConstant,
    Symbol,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Keyword => "keyword",
            TokenKind::Identifier => "identifier",
            TokenKind::IntegerConstant => "integerConstant",
            TokenKind::StringConstant => "stringConstant",
            TokenKind::Symbol => "symbol",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
}

#[derive(Debug)]
pub enum LexError {
    Io { path: String, source: std::io::Error },
    UnrecognizedChar { line: usize, ch: char },
    UnterminatedString { line: usize },
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::Io { path, source } => write!(f, "failed to read {path}: {source}"),
            LexError::UnrecognizedChar { line, ch } => {
                write!(f, "line {line}: unrecognized character '{ch}'")
            }
            LexError::UnterminatedString { line } => {
                write!(f, "line {line}: unterminated string constant")
            }
        }
    }
}

impl std::error::Error for LexError {}

/// An eager, array-backed stream of tokens with one- and two-token peek.
pub struct Tokenizer {
    tokens: Vec<Token>,
    pos: usize,
}

impl Tokenizer {
    pub fn from_file(path: &Path) -> Result<Self, LexError> {
        let content = fs::read_to_string(path).map_err(|source| LexError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_source(&content)
    }

    pub fn from_source(source: &str) -> Result<Self, LexError> {
        let tokens = tokenize(source)?;
        Ok(Self { tokens, pos: 0 })
    }

    pub fn has_more(&self) -> bool {
        self.pos < self.tokens.len()
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    pub fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    pub fn current_lexeme(&self) -> &str {
        &self.current().lexeme
    }

    pub fn current_line(&self) -> usize {
        self.current().line
    }

    pub fn next_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| t.kind)
    }

    pub fn next_lexeme(&self) -> Option<&str> {
        self.tokens.get(self.pos + 1).map(|t| t.lexeme.as_str())
    }

    /// Discards the current token. Panics if the stream is already empty -
    /// the engine only ever advances after checking `has_more`/peeking the
    /// current token, so an empty advance means a grammar production ran
    /// past the end of the token stream.
    pub fn advance(&mut self) {
        assert!(self.has_more(), "advance() called past end of token stream");
        self.pos += 1;
    }
}

fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut in_block_comment = false;

    for (line_no, raw_line) in source.lines().enumerate() {
        let line_no = line_no + 1;
        let line = strip_comments(raw_line.trim(), &mut in_block_comment);

        if in_block_comment || line.is_empty() {
            continue;
        }

        scan_line(&line, line_no, &mut tokens)?;
    }

    Ok(tokens)
}

/// Strips `//` line comments and `/* ... */` block comments from a single
/// line, replicating the reference tokenizer's flat, order-dependent
/// substring checks rather than a real comment grammar: each `in`/`find`
/// below runs unconditionally, in this order, with no awareness of string
/// literals. That makes this a faithful *re*-implementation of a known
/// quirk, not an improvement on it:
///
/// - a `//` that happens to fall inside a string constant still truncates
///   the line, same as the reference tokenizer;
/// - the `//` check runs before the `/* ... */` check, so a `//` inside a
///   block comment's own text can eat the comment's closing `*/` before
///   the block-comment logic ever sees it;
/// - a line that opens an unclosed block comment is dropped in its
///   entirety (including any real code before the `/*`), because the
///   reference tokenizer sets its "in comment" flag and then skips the
///   whole line rather than just the trailing comment span.
fn strip_comments(line: &str, in_block_comment: &mut bool) -> String {
    let mut line = line.to_string();

    if *in_block_comment {
        if let Some(end) = line.find("*/") {
            line = line[end + 2..].to_string();
            *in_block_comment = false;
        }
    }

    if let Some(idx) = line.find("//") {
        line.truncate(idx);
    }

    match (line.find("/*"), line.find("*/")) {
        (Some(open), Some(close)) => {
            let mut spliced = line[..open].to_string();
            spliced.push_str(&line[close + 2..]);
            line = spliced;
        }
        (Some(_), None) => *in_block_comment = true,
        _ => {}
    }

    line
}

fn scan_line(line: &str, line_no: usize, tokens: &mut Vec<Token>) -> Result<(), LexError> {
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c == '"' {
            let start = i + 1;
            let mut j = start;
            while j < chars.len() && chars[j] != '"' {
                j += 1;
            }
            if j >= chars.len() {
                return Err(LexError::UnterminatedString { line: line_no });
            }
            let text: String = chars[start..j].iter().collect();
            tokens.push(Token {
                kind: TokenKind::StringConstant,
                lexeme: text,
                line: line_no,
            });
            i = j + 1;
            continue;
        }

        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            tokens.push(Token {
                kind: TokenKind::IntegerConstant,
                lexeme: text,
                line: line_no,
            });
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let kind = if is_keyword(&text) {
                TokenKind::Keyword
            } else {
                TokenKind::Identifier
            };
            tokens.push(Token {
                kind,
                lexeme: text,
                line: line_no,
            });
            continue;
        }

        if SYMBOLS.contains(c) {
            tokens.push(Token {
                kind: TokenKind::Symbol,
                lexeme: c.to_string(),
                line: line_no,
            });
            i += 1;
            continue;
        }

        return Err(LexError::UnrecognizedChar { line: line_no, ch: c });
    }

    Ok(())
}
