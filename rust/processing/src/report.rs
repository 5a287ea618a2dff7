// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structured results handed to output formatters.

use deck_lite_core::{EntityId, FieldValue};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Identity of a canonical record within its keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKey {
    /// Keyword without an identifying field (e.g. control cards)
    Global,
    Id(EntityId),
}

/// A reference field that did not match the target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMismatch {
    pub keyword: String,
    pub record: RecordKey,
    pub field: String,
    pub reference: FieldValue,
    /// `None` when the target record lacks the field
    pub target: Option<FieldValue>,
}

/// Similarity of one target deck against the reference.
///
/// Scores are percentages in `0..=100`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityReport {
    pub reference: PathBuf,
    pub target: PathBuf,
    pub structural: f64,
    pub parametric: f64,
    pub combined: f64,
    pub mismatches: Vec<FieldMismatch>,
    /// Set when the target could not be loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SimilarityReport {
    /// Zero-score report for a target that could not be loaded
    pub fn failed(reference: &Path, target: &Path, error: impl ToString) -> Self {
        Self {
            reference: reference.to_path_buf(),
            target: target.to_path_buf(),
            structural: 0.0,
            parametric: 0.0,
            combined: 0.0,
            mismatches: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// One Part whose tracked value differs between two files
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartDelta {
    pub part_id: EntityId,
    pub name: String,
    pub value_a: f64,
    pub value_b: f64,
    /// `value_b - value_a`
    pub delta: f64,
}

/// Differences found between one pair of files
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffReport {
    pub file_a: PathBuf,
    pub file_b: PathBuf,
    pub deltas: Vec<PartDelta>,
}

impl DiffReport {
    /// File names of the pair, for headings and output naming
    pub fn names(&self) -> (String, String) {
        (file_label(&self.file_a), file_label(&self.file_b))
    }

    /// `Diff_<a>_VS_<b>.csv`
    pub fn output_name(&self) -> String {
        let (a, b) = self.names();
        format!("Diff_{}_VS_{}.csv", a, b)
    }
}

/// File name of a path, or the whole path when it has none
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
