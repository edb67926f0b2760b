use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use ignore::WalkBuilder;
use tracing_subscriber::EnvFilter;

use codemeta_core::{Config, EntityParser, ExtractionStats, ParseReport};

/// Environment variable holding the log filter for both binaries.
const LOG_ENV: &str = "CODEMETA_LOG";

#[derive(Parser)]
#[command(name = "codemeta")]
#[command(about = "Extract uniform code entities from source files", long_about = None)]
struct Cli {
    /// Config file to use instead of the default search path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract entities from files or directories
    Parse {
        /// Files or directories; directories are walked honouring .gitignore
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,

        /// Emit one report per file, with diagnostics, instead of a flat entity list
        #[arg(long)]
        report: bool,

        /// Print entity counts to stderr when done
        #[arg(long)]
        stats: bool,
    },
    /// List supported file extensions
    Extensions,
    /// Print the effective configuration as TOML
    Config {
        /// Print the built-in defaults instead
        #[arg(long)]
        default: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Parse {
            paths,
            pretty,
            report,
            stats,
        } => run_parse(&config, &paths, pretty, report, stats),
        Commands::Extensions => {
            let parser = EntityParser::from_config(&config);
            let mut stdout = std::io::stdout().lock();
            for (language, extensions) in parser.registry().list_extractors() {
                writeln!(stdout, "{:<12}{}", language, extensions.join(", "))?;
            }
            Ok(())
        }
        Commands::Config { default } => {
            let rendered = if default {
                Config::default_config_string()
            } else {
                toml::to_string_pretty(&config).wrap_err("failed to render configuration")?
            };
            print!("{}", rendered);
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .wrap_err_with(|| format!("failed to load config from {}", path.display())),
        None => Config::load().wrap_err("failed to load configuration"),
    }
}

// =============================================================================
// parse
// =============================================================================

fn run_parse(
    config: &Config,
    paths: &[PathBuf],
    pretty: bool,
    report: bool,
    stats: bool,
) -> Result<()> {
    let parser = EntityParser::from_config(config);
    let files = collect_files(&parser, paths)?;
    tracing::info!(files = files.len(), "Parsing files");

    let reports: Vec<ParseReport> = files
        .iter()
        .map(|file| parser.parse_file_report(file))
        .collect();

    if stats {
        let mut total = ExtractionStats::default();
        for report in &reports {
            total.absorb(&report.stats());
        }
        eprintln!("Files: {}", reports.len());
        eprint!("{}", total);
    }

    let mut stdout = std::io::stdout().lock();
    if report {
        write_json(&mut stdout, &reports, pretty)?;
    } else {
        let entities: Vec<_> = reports.iter().flat_map(|r| &r.entities).collect();
        write_json(&mut stdout, &entities, pretty)?;
    }
    writeln!(stdout)?;
    Ok(())
}

/// Explicit files are kept as given; directories contribute supported files only.
fn collect_files(parser: &EntityParser, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            return Err(eyre!("no such file or directory: {}", path.display()));
        }

        let walker = WalkBuilder::new(path)
            .hidden(true)
            .git_ignore(true)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let file_path = entry.path();
            if file_path.is_file() && parser.is_supported(file_path) {
                files.push(file_path.to_path_buf());
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn write_json<T: serde::Serialize>(out: &mut impl Write, value: &T, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(out, value)?;
    } else {
        serde_json::to_writer(out, value)?;
    }
    Ok(())
}
