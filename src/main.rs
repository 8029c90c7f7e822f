use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use fencefmt::action::{FormatCodeBlocks, Outcome};
use fencefmt::config::{self, CONFIG_FILE, Settings};
use fencefmt::discovery::find_markdown_files;
use fencefmt::document::{FsStore, MemoryStore};
use fencefmt::exit_codes::{self, exit};
use fencefmt::formatter::Formatter;
use fencefmt::notify::{Notice, Notifier, TerminalNotifier};

#[derive(Parser)]
#[command(author, version, about = "Format shell code blocks in Markdown files", long_about = None)]
struct Cli {
    /// Markdown files or directories to format
    #[arg(required = false)]
    paths: Vec<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Formatter to use instead of the configured one ("builtin" or a tool id)
    #[arg(long)]
    formatter: Option<String>,

    #[arg(long, help = "Exit with code 1 if any code block would be reformatted, without writing")]
    check: bool,

    #[arg(long, help = "Read a document from stdin and write the result to stdout")]
    stdin: bool,

    #[arg(long, help = "Name to use for the stdin document in messages")]
    stdin_filename: Option<String>,

    /// Show debug logging
    #[arg(short, long)]
    verbose: bool,

    #[arg(short, long, help = "Only print errors")]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default .fencefmt.toml in the current directory
    Init,
    /// Show the effective configuration
    Config,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "error" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(exit_codes::SUCCESS) => exit::success(),
        Ok(exit_codes::CHANGES_NEEDED) => exit::changes_needed(),
        Ok(_) => exit::tool_error(),
        Err(err) => {
            eprintln!("{} {err:#}", "Error:".red().bold());
            exit::tool_error();
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    let cwd = std::env::current_dir().context("Failed to determine the working directory")?;

    match cli.command {
        Some(Commands::Init) => return init_config(cli.quiet),
        Some(Commands::Config) => return show_config(cli.config.as_deref(), &cwd),
        None => {}
    }

    let (mut settings, source) = config::load_settings(cli.config.as_deref(), &cwd)?;
    if let Some(path) = &source {
        log::debug!("Using configuration from {}", path.display());
    }
    if let Some(name) = &cli.formatter {
        settings.formatter = name.clone();
    }
    let formatter = settings.build_formatter()?;

    if cli.stdin {
        return format_stdin(cli, formatter.as_ref());
    }
    format_paths(cli, &settings, formatter.as_ref())
}

fn init_config(quiet: bool) -> anyhow::Result<i32> {
    config::create_default_config(Path::new(CONFIG_FILE))?;
    if !quiet {
        println!("Created default configuration file: {CONFIG_FILE}");
    }
    Ok(exit_codes::SUCCESS)
}

fn show_config(explicit: Option<&Path>, cwd: &Path) -> anyhow::Result<i32> {
    let (settings, source) = config::load_settings(explicit, cwd)?;
    match source {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => println!("# No {CONFIG_FILE} found, showing defaults"),
    }
    print!("{}", settings.to_toml()?);
    Ok(exit_codes::SUCCESS)
}

fn format_stdin(cli: &Cli, formatter: &dyn Formatter) -> anyhow::Result<i32> {
    let mut content = String::new();
    io::stdin()
        .read_to_string(&mut content)
        .context("Failed to read from stdin")?;

    let id = PathBuf::from(cli.stdin_filename.as_deref().unwrap_or("<stdin>"));
    let mut store = MemoryStore::new();
    store.insert(id.clone(), content);

    let mut notifier = TerminalNotifier::new(cli.quiet);
    let action = FormatCodeBlocks::new(formatter).check_only(cli.check);
    let outcome = action.run(&mut store, Some(&id), &mut notifier)?;

    if cli.check {
        return Ok(exit_code(&[outcome], false, true));
    }

    let output = store.get(&id).unwrap_or_default();
    io::stdout()
        .write_all(output.as_bytes())
        .context("Failed to write to stdout")?;
    Ok(exit_code(&[outcome], false, false))
}

fn format_paths(cli: &Cli, settings: &Settings, formatter: &dyn Formatter) -> anyhow::Result<i32> {
    let mut notifier = TerminalNotifier::new(cli.quiet);
    let action = FormatCodeBlocks::new(formatter).check_only(cli.check);
    let mut store = FsStore;

    if cli.paths.is_empty() {
        action.run(&mut store, None, &mut notifier)?;
        return Ok(exit_codes::TOOL_ERROR);
    }

    let files = find_markdown_files(&cli.paths, settings)?;
    if files.is_empty() {
        notifier.notify(Notice::info(None, "No Markdown files found."));
        return Ok(exit_codes::SUCCESS);
    }

    let start = Instant::now();
    let mut outcomes = Vec::with_capacity(files.len());
    let mut had_error = false;

    for file in &files {
        match action.run(&mut store, Some(file), &mut notifier) {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => {
                log::debug!("Skipping {}: {err}", file.display());
                had_error = true;
            }
        }
    }

    if files.len() > 1 && !cli.quiet {
        let changed = outcomes.iter().filter(|o| is_modified(o)).count();
        let verb = if cli.check { "Would reformat" } else { "Reformatted" };
        eprintln!(
            "\n{} {changed} of {} files ({}ms)",
            verb.bold(),
            files.len(),
            start.elapsed().as_millis()
        );
    }

    Ok(exit_code(&outcomes, had_error, cli.check))
}

fn is_modified(outcome: &Outcome) -> bool {
    matches!(outcome, Outcome::Formatted { modified: true, .. })
}

/// Document errors win over pending changes. Per-block failures were already
/// reported as notices and do not affect the code.
fn exit_code(outcomes: &[Outcome], had_error: bool, check: bool) -> i32 {
    if had_error {
        exit_codes::TOOL_ERROR
    } else if check && outcomes.iter().any(is_modified) {
        exit_codes::CHANGES_NEEDED
    } else {
        exit_codes::SUCCESS
    }
}
