// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Deck-Lite CLI - keyword deck extraction, similarity and diff.
//!
//! # Commands
//!
//! - `deck-lite extract` - write the Parts matching a filter (and everything
//!   they reference) to `<prefix><file name>`
//! - `deck-lite similarity` - rank design variants against a reference deck
//! - `deck-lite diff` - report Section thickness changes across every pair of
//!   variants, one `Diff_<a>_VS_<b>.csv` per differing pair
//! - `deck-lite inspect` - entity counts and dangling references of one deck
//!
//! Defaults come from `DECK_LITE_*` environment variables; flags override them.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use deck_lite_processing::{BatchOptions, LoadOptions, PartFilter};
use std::path::PathBuf;

mod commands;
mod config;
mod discover;
mod output;

use commands::RunContext;
use config::Config;

/// Keyword deck extraction, similarity scoring and batch diffing.
#[derive(Parser)]
#[command(name = "deck-lite", version, about)]
struct Cli {
    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Worker threads for parsing (default: DECK_LITE_WORKERS or CPU count)
    #[arg(long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

/// Input selection shared by the batch commands
#[derive(Args)]
struct InputArgs {
    /// Directory holding the deck files
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Comma-separated file patterns (default: DECK_LITE_PATTERN or *.k)
    #[arg(short, long)]
    pattern: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract Parts matching a filter into new decks
    Extract {
        #[command(flatten)]
        input: InputArgs,
        /// Part filter: odd, even, all, ids:1,2,5 or range:10-20
        #[arg(short, long, default_value = "odd")]
        filter: PartFilter,
        /// Output file name prefix
        #[arg(long, default_value = "Odd_Comps_")]
        prefix: String,
        /// Output directory (default: DECK_LITE_OUTPUT_DIR)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Score every deck against a reference
    Similarity {
        #[command(flatten)]
        input: InputArgs,
        /// Reference deck (default: first file in natural order)
        #[arg(short, long)]
        reference: Option<PathBuf>,
        /// Compare the listed files only, without expanding *INCLUDE
        #[arg(long)]
        no_includes: bool,
    },

    /// Report Part thickness changes across every pair of decks
    Diff {
        #[command(flatten)]
        input: InputArgs,
        /// Absolute tolerance (default: DECK_LITE_TOLERANCE or 0.001)
        #[arg(short, long)]
        tolerance: Option<f64>,
        /// Output directory for CSV files (default: DECK_LITE_OUTPUT_DIR)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Summarize entities and cross references of one deck
    Inspect {
        /// Deck file
        file: PathBuf,
        /// Expand *INCLUDE files
        #[arg(long)]
        includes: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "debug"
    } else {
        "info,deck_lite_processing=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::from_env();
    let workers = cli.workers.unwrap_or(config.workers);
    tracing::debug!(
        workers,
        pattern = %config.pattern,
        tolerance = config.tolerance,
        output_dir = %config.output_dir.display(),
        "Configuration loaded"
    );

    let mut ctx = RunContext {
        json: cli.json,
        batch: BatchOptions {
            workers: Some(workers),
            pair_warn_threshold: config.pair_warn_threshold,
            ..BatchOptions::default()
        },
    };
    let pattern = |input: &InputArgs| input.pattern.clone().unwrap_or_else(|| config.pattern.clone());

    match cli.command {
        Commands::Extract {
            input,
            filter,
            prefix,
            output_dir,
        } => {
            let output_dir = output_dir.unwrap_or_else(|| config.output_dir.clone());
            commands::extract_files(
                &ctx,
                &input.dir,
                &pattern(&input),
                &output_dir,
                &filter,
                &prefix,
            )
        }
        Commands::Similarity {
            input,
            reference,
            no_includes,
        } => {
            ctx.batch.load = LoadOptions {
                includes: !no_includes,
            };
            commands::similarity(&ctx, &input.dir, &pattern(&input), reference.as_deref())
        }
        Commands::Diff {
            input,
            tolerance,
            output_dir,
        } => {
            let tolerance = tolerance.unwrap_or(config.tolerance);
            let output_dir = output_dir.unwrap_or_else(|| config.output_dir.clone());
            commands::diff(&ctx, &input.dir, &pattern(&input), &output_dir, tolerance)
        }
        Commands::Inspect { file, includes } => {
            ctx.batch.load = LoadOptions { includes };
            commands::inspect(&ctx, &file)
        }
    }
}
