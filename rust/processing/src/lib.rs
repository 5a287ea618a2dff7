// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Deck processing pipeline shared by the CLI and tests.
//!
//! - [`extract`]: referentially closed subsets selected by a Part predicate
//! - [`similarity`]: weighted structural + parametric scoring against a reference
//! - [`diff`]: pairwise diff of Section thickness across design variants
//! - [`batch`]: parallel shared-nothing loading with cancellation

pub mod batch;
pub mod diff;
pub mod error;
pub mod extract;
pub mod filter;
pub mod loader;
pub mod report;
pub mod similarity;

pub use batch::{load_all, natural_cmp, BatchOptions, CancelToken, Loaded};
pub use diff::{diff_all, diff_parts, TrackedParts, DEFAULT_TOLERANCE};
pub use error::{Error, Result};
pub use extract::{extract, Extraction, ExtractionCounts, Selection};
pub use filter::PartFilter;
pub use loader::{load_deck, LoadOptions};
pub use report::{DiffReport, FieldMismatch, PartDelta, RecordKey, SimilarityReport};
pub use similarity::{score, CanonicalDeck, SimilarityEngine};
