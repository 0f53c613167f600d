//! Error kinds for the translation pipeline (spec §7): I/O, lexical
//! (delegated to `jackc_lex::LexError`), syntactic, and "semantic-lite"
//! (a name absent from both scopes in an assignment target context).
//!
//! None of these recover: the first one returned aborts the current
//! translation unit, matching the spec's "no error recovery" non-goal.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum CompileError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Lex(jackc_lex::LexError),
    Syntax {
        line: usize,
        message: String,
    },
    UnknownName {
        name: String,
        line: usize,
    },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Io { path, source } => write!(f, "{}: {source}", path.display()),
            CompileError::Lex(e) => write!(f, "{e}"),
            CompileError::Syntax { line, message } => write!(f, "line {line}: {message}"),
            CompileError::UnknownName { name, line } => {
                write!(f, "line {line}: unknown identifier \"{name}\"")
            }
        }
    }
}

impl std::error::Error for CompileError {}

impl From<jackc_lex::LexError> for CompileError {
    fn from(e: jackc_lex::LexError) -> Self {
        CompileError::Lex(e)
    }
}
