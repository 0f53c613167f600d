//! Single-pass Jack-to-VM translation: wires the tokenizer
//! ([`jackc_lex`]), the two-scope symbol table ([`jackc_sym`]), and the VM
//! emitter ([`jackc_vm`]) together behind the file/directory entry points
//! the CLI binary drives.

pub mod engine;
pub mod error;

pub use engine::Engine;
pub use error::CompileError;

use jackc_lex::Tokenizer;
use std::fs;
use std::path::{Path, PathBuf};

/// Translates one `.jack` source file to its sibling `.vm` file (same stem,
/// same directory), returning the output path on success. One input handle
/// and one output handle are opened and released within this call,
/// regardless of outcome.
pub fn translate_file(path: &Path) -> Result<PathBuf, CompileError> {
    let tokenizer = Tokenizer::from_file(path)?;
    let mut engine = Engine::new(tokenizer);
    engine.compile_class()?;

    let output_path = path.with_extension("vm");
    fs::write(&output_path, engine.into_output()).map_err(|source| CompileError::Io {
        path: output_path.clone(),
        source,
    })?;
    Ok(output_path)
}

/// Translates every `*.jack` file directly inside `dir` (non-recursive,
/// `std::fs::read_dir`'s own enumeration order - the original implementation
/// doesn't sort either). Each file is an independent translation unit with
/// fresh symbol scopes; there is no cross-file linking.
///
/// Per spec §7, a failing file does not abort the batch: every file is
/// attempted and failures are collected for the caller to report, rather
/// than the first bad file aborting the whole directory.
pub fn translate_dir(dir: &Path) -> (Vec<(PathBuf, PathBuf)>, Vec<(PathBuf, CompileError)>) {
    let mut translated = Vec::new();
    let mut failed = Vec::new();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(source) => {
            failed.push((
                dir.to_path_buf(),
                CompileError::Io { path: dir.to_path_buf(), source },
            ));
            return (translated, failed);
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(source) => {
                failed.push((
                    dir.to_path_buf(),
                    CompileError::Io { path: dir.to_path_buf(), source },
                ));
                continue;
            }
        };

        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("jack") {
            continue;
        }

        match translate_file(&path) {
            Ok(output) => translated.push((path, output)),
            Err(e) => failed.push((path, e)),
        }
    }

    (translated, failed)
}
