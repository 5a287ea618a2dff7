// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for processing operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that surface from batch and comparison runs
#[derive(Error, Debug)]
pub enum Error {
    #[error("No input files")]
    NoInputFiles,

    #[error("Need at least 2 files to compare, found {found}")]
    NotEnoughFiles { found: usize },

    #[error("Reference deck {} has no keywords", path.display())]
    EmptyReference { path: PathBuf },

    #[error("Invalid part filter: {0}")]
    InvalidFilter(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Core error: {0}")]
    Core(#[from] deck_lite_core::Error),
}
