//! # Skim Notes CLI (`skim-notes`)
//!
//! Converts Skim PDF annotations into dated snapshots of markdown notes.
//!
//! ## Usage
//!
//! ```bash
//! skim-notes --config ./config/skim-notes.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `skim-notes run` | Flush the editor, convert annotations, write today's snapshot |
//! | `skim-notes convert` | Convert out-of-date `.skim` files only |
//! | `skim-notes init` | Create the watched and destination folders |
//! | `skim-notes sources` | List watched folders and what they contain |
//! | `skim-notes inspect <file>` | Show the blocks and concepts of one rendering |
//! | `skim-notes completions <shell>` | Print a shell completion script |
//!
//! Logging goes to stderr and is controlled by `SKIM_NOTES_LOG`
//! (e.g. `SKIM_NOTES_LOG=debug`).

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use skim_notes::analysis::AnalyzerHandle;
use skim_notes::config::{self, Config};
use skim_notes::convert::convert_all;
use skim_notes::extract::read_rendering;
use skim_notes::pipeline::{self, RunOptions};
use skim_notes::progress::ProgressMode;
use skim_notes::sources;
use skim_notes_core::blocks::{analysis_text, parse_blocks};
use skim_notes_core::concepts::rank_concepts;

const DEFAULT_CONFIG_PATH: &str = "./config/skim-notes.toml";

/// Skim Notes: incremental markdown notes from PDF annotations.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Without one, `./config/skim-notes.toml` is used if present and the
/// built-in defaults otherwise.
#[derive(Parser)]
#[command(
    name = "skim-notes",
    about = "Skim Notes: incremental markdown notes from PDF annotations",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Produce a new snapshot of notes for the documents that changed.
    Run {
        /// Snapshot date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Report what would be generated without writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Do not ask the editor to save unsaved annotations first.
        #[arg(long)]
        no_automation: bool,

        /// Skip the `.skim` → rendering conversion step.
        #[arg(long)]
        no_convert: bool,

        /// Progress on stderr: `off`, `human`, or `json`.
        /// Defaults to `human` when stderr is a terminal.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Convert out-of-date `.skim` annotation files into renderings.
    Convert,

    /// Create the watched folders and the destination folder.
    Init,

    /// List watched folders, whether they exist, and what they contain.
    Sources,

    /// Print the annotation blocks and ranked concepts of one rendering.
    Inspect {
        /// Rendering to inspect (RTF or plain text).
        file: PathBuf,
    },

    /// Print a shell completion script.
    Completions {
        shell: Shell,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SKIM_NOTES_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        generate(*shell, &mut Cli::command(), "skim-notes", &mut std::io::stdout());
        return Ok(());
    }

    let allow_missing = cli.config == PathBuf::from(DEFAULT_CONFIG_PATH);
    let cfg = config::load_config(&cli.config, allow_missing)?;

    match cli.command {
        Commands::Run {
            date,
            dry_run,
            no_automation,
            no_convert,
            progress,
        } => {
            let opts = RunOptions {
                date: date.unwrap_or_else(|| Local::now().date_naive()),
                dry_run,
                automation: !no_automation,
                convert: !no_convert,
                progress: progress.unwrap_or_else(ProgressMode::default_for_tty),
            };
            pipeline::run(&cfg, &opts)?;
        }
        Commands::Convert => {
            let summary = convert_all(&cfg)?;
            println!("convert");
            println!("  converted: {}", summary.converted);
            println!("  up to date: {}", summary.up_to_date);
            println!("  failed: {}", summary.failed);
            println!("ok");
        }
        Commands::Init => init_folders(&cfg)?,
        Commands::Sources => sources::list_sources(&cfg)?,
        Commands::Inspect { file } => inspect(&cfg, &file)?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}

fn init_folders(cfg: &Config) -> Result<()> {
    for dir in cfg.paths.watched_dirs().into_iter().chain([cfg.paths.dest()]) {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create folder: {}", dir.display()))?;
        println!("  {}", dir.display());
    }
    println!("Folders ready.");
    Ok(())
}

fn inspect(cfg: &Config, file: &std::path::Path) -> Result<()> {
    let text = read_rendering(file)
        .with_context(|| format!("Failed to read rendering: {}", file.display()))?;
    let blocks = parse_blocks(&text);

    println!("{}", file.display());
    println!("  blocks: {}", blocks.len());
    for block in &blocks {
        let preview: String = block.body.chars().take(72).collect();
        println!("  p.{:<5} {}", block.page, preview.replace('\n', " "));
    }
    if blocks.is_empty() {
        return Ok(());
    }

    let analyzer = AnalyzerHandle::new(&cfg.analysis);
    let params = pipeline::rank_params(&cfg.analysis);
    match rank_concepts(&analyzer, &analysis_text(&blocks, cfg.analysis.max_chars), &params) {
        Ok(concepts) => {
            println!("  concepts:");
            for c in concepts {
                println!("    {:>4}  {}", c.count, c.term);
            }
        }
        Err(e) => println!("  concepts: unavailable ({:#})", e),
    }
    Ok(())
}
