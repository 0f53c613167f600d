//! Jack compiler CLI
//!
//! Command-line front end over [`jackc_compiler`]'s file/directory
//! translation entry points.

use clap::Parser;
use jackc_compiler::{translate_dir, translate_file};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "jackc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compiles Jack source files to VM code", long_about = None)]
struct Cli {
    /// A .jack source file, or a directory of .jack files
    input: PathBuf,

    /// Print one "Compiled <in> -> <out>" line per translated file
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let is_jack_file = cli.input.is_file()
        && cli.input.extension().and_then(|ext| ext.to_str()) == Some("jack");

    if is_jack_file {
        run_file(&cli.input, cli.verbose)
    } else if cli.input.is_dir() {
        run_dir(&cli.input, cli.verbose)
    } else {
        eprintln!("Usage: jackc <file.jack | directory>");
        ExitCode::FAILURE
    }
}

fn run_file(input: &PathBuf, verbose: bool) -> ExitCode {
    match translate_file(input) {
        Ok(output) => {
            if verbose {
                println!("Compiled {} -> {}", input.display(), output.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}: {e}", input.display());
            ExitCode::FAILURE
        }
    }
}

fn run_dir(input: &PathBuf, verbose: bool) -> ExitCode {
    let (translated, failed) = translate_dir(input);

    if verbose {
        for (source, output) in &translated {
            println!("Compiled {} -> {}", source.display(), output.display());
        }
    }
    for (path, e) in &failed {
        eprintln!("error: {}: {e}", path.display());
    }

    if failed.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
