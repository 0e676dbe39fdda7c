//! oaslint CLI - OpenAPI/Swagger contract analyser

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use glob::glob;
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::debug;
use oaslint::checks::builtin_rules;
use oaslint::config::{ColorMode, Config, FilesConfig, OutputFormat};
use oaslint::engine::{CancelFlag, Engine};
use oaslint::output::formatter;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "oaslint",
    version,
    about = "OpenAPI/Swagger contract analyser",
    long_about = "Validates Swagger 2.0 and OpenAPI 3.x documents against their grammar and a catalog of rules."
)]
struct Cli {
    /// Files, directories or glob patterns to analyse
    files: Vec<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Analyse files one after another
    #[arg(long)]
    sequential: bool,

    /// Disable specific rules (comma-separated)
    #[arg(long, value_delimiter = ',')]
    disable: Option<Vec<String>>,

    /// Only enable specific rules (comma-separated)
    #[arg(long, value_delimiter = ',')]
    select: Option<Vec<String>>,

    /// Print the measures of each file
    #[arg(long)]
    metrics: bool,

    /// Print rule timing statistics
    #[arg(long)]
    timings: bool,

    /// List available rules and exit
    #[arg(long)]
    list_rules: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            std::process::exit(2);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    if cli.list_rules {
        for spec in builtin_rules() {
            let rule = spec.create();
            println!(
                "{:<20} {:<8} {}",
                spec.key.cyan(),
                rule.severity(),
                rule.description()
            );
        }
        return Ok(0);
    }

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load_default().context("Failed to load config")?,
    };

    let format = cli.format.map(|f| match f {
        Format::Text => OutputFormat::Text,
        Format::Json => OutputFormat::Json,
    });
    config.merge_cli(
        format,
        cli.verbose.then_some(true),
        cli.jobs,
        cli.disable.clone(),
        cli.select.clone(),
    );
    if cli.sequential {
        config.engine.parallel = false;
    }
    if cli.metrics {
        config.output.metrics = true;
    }
    if cli.no_color {
        config.output.color = ColorMode::Never;
    }
    match config.output.color {
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Auto => {}
    }

    let files = collect_files(&cli.files, &config.files)?;
    if files.is_empty() {
        bail!("No files found to analyse");
    }
    debug!("{} file(s) to analyse", files.len());

    let engine = Engine::new(config).context("Invalid rule configuration")?;
    let result = engine.analyze(&files, &CancelFlag::new());

    print!("{}", formatter(&engine.config().output).format(&result));
    if cli.timings {
        eprintln!("{}", result.format_timings());
    }

    Ok(result.exit_code())
}

fn glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid pattern '{}'", pattern))?);
    }
    Ok(builder.build()?)
}

/// Expand CLI arguments: files are taken as-is, directories are searched
/// with the include patterns, anything else is a glob pattern
fn collect_files(args: &[String], settings: &FilesConfig) -> Result<Vec<PathBuf>> {
    let include = glob_set(&settings.include)?;
    let exclude = glob_set(&settings.exclude)?;
    let wanted = |path: &Path| !exclude.is_match(path);

    let mut files = Vec::new();
    for arg in args {
        let path = Path::new(arg);
        if path.is_file() {
            files.push(path.to_path_buf());
            continue;
        }

        let pattern = if path.is_dir() {
            format!("{}/**/*", arg.trim_end_matches('/'))
        } else {
            arg.clone()
        };
        let from_dir = path.is_dir();
        for entry in glob(&pattern)
            .with_context(|| format!("Invalid pattern '{}'", pattern))?
            .flatten()
        {
            if !entry.is_file() || !wanted(&entry) {
                continue;
            }
            if from_dir && !include.is_match(&entry) {
                continue;
            }
            files.push(entry);
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}
