// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Defaults loaded from environment variables.
//!
//! Command-line flags override these values.

use deck_lite_processing::batch::DEFAULT_PAIR_WARN_THRESHOLD;
use deck_lite_processing::DEFAULT_TOLERANCE;
use std::path::PathBuf;

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// File pattern(s) matched inside the input directory, comma-separated.
    pub pattern: String,
    /// Absolute tolerance for the batch diff.
    pub tolerance: f64,
    /// Number of worker threads for parallel parsing.
    pub workers: usize,
    /// Directory for extracted decks and diff CSVs.
    pub output_dir: PathBuf,
    /// Pair count above which a warning is logged.
    pub pair_warn_threshold: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            pattern: std::env::var("DECK_LITE_PATTERN").unwrap_or_else(|_| "*.k".into()),
            tolerance: std::env::var("DECK_LITE_TOLERANCE")
                .unwrap_or_else(|_| DEFAULT_TOLERANCE.to_string())
                .parse()
                .unwrap_or(DEFAULT_TOLERANCE),
            workers: std::env::var("DECK_LITE_WORKERS")
                .unwrap_or_else(|_| num_cpus::get().to_string())
                .parse()
                .unwrap_or_else(|_| num_cpus::get()),
            output_dir: std::env::var("DECK_LITE_OUTPUT_DIR")
                .unwrap_or_else(|_| "./deck_lite_out".into())
                .into(),
            pair_warn_threshold: std::env::var("DECK_LITE_PAIR_WARN")
                .unwrap_or_else(|_| DEFAULT_PAIR_WARN_THRESHOLD.to_string())
                .parse()
                .unwrap_or(DEFAULT_PAIR_WARN_THRESHOLD),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
