//! Compiler service for TypeScript and JavaScript files.
//!
//! Usage: `codemeta-tsc <file>`. Prints a JSON array of entities on stdout
//! and exits 0. On failure prints one line on stderr and exits 2 for syntax
//! errors, 1 for anything else.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use codemeta_core::extract::{ScriptExtractor, SYNTAX_EXIT_CODE};
use codemeta_core::ExtractError;

const EXIT_FAILURE: u8 = 1;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CODEMETA_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [path] = args.as_slice() else {
        eprintln!("usage: codemeta-tsc <file>");
        return ExitCode::from(EXIT_FAILURE);
    };

    match run(PathBuf::from(path)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Exactly one line: the bridge reports the first stderr line.
            eprintln!("{}", err.to_string().replace('\n', " "));
            match err {
                ExtractError::Syntax { .. } => ExitCode::from(SYNTAX_EXIT_CODE as u8),
                _ => ExitCode::from(EXIT_FAILURE),
            }
        }
    }
}

fn run(path: PathBuf) -> Result<(), ExtractError> {
    let extractor = ScriptExtractor::for_path(&path).ok_or_else(|| {
        ExtractError::UnsupportedExtension { path: path.clone() }
    })?;
    let extraction = extractor.extract_in_process(&path)?;

    let json = serde_json::to_string(&extraction.entities)
        .map_err(|e| ExtractError::InvalidOutput(e.to_string()))?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", json)
        .and_then(|()| stdout.flush())
        .map_err(|e| ExtractError::InvalidOutput(format!("failed to write entities: {}", e)))?;

    // Reaches the bridge on stderr, which relays it to the caller's log.
    for diagnostic in &extraction.diagnostics {
        tracing::warn!(path = %path.display(), "{}", diagnostic);
    }
    Ok(())
}
