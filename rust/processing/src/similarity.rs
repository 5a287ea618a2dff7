// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Similarity engine
//!
//! Canonicalizes decks into `keyword -> record -> {field -> value}` and scores a
//! target against a reference:
//!
//! - structural: Jaccard index over keyword names
//! - parametric: share of reference fields matched by the target, over records
//!   present in both decks
//! - combined: `0.2 * structural + 0.8 * parametric`, as a percentage rounded
//!   to 2 decimals
//!
//! The score is asymmetric: the reference's fields are the basis.

use deck_lite_core::value::round_to;
use deck_lite_core::{Deck, DeckModel, FieldValue, KeywordKind, Namespace};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::batch::{natural_path_cmp, BatchOptions};
use crate::error::{Error, Result};
use crate::loader::{load_deck, LoadOptions};
use crate::report::{FieldMismatch, RecordKey, SimilarityReport};

/// Weight of the structural score in the combined score
pub const STRUCTURAL_WEIGHT: f64 = 0.2;

/// Weight of the parametric score in the combined score
pub const PARAMETRIC_WEIGHT: f64 = 0.8;

/// Normalized field values of one record
pub type Record = BTreeMap<String, FieldValue>;

/// Deck reduced to normalized records for comparison
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalDeck {
    keywords: BTreeSet<String>,
    records: BTreeMap<String, BTreeMap<RecordKey, Record>>,
}

impl CanonicalDeck {
    /// Canonicalize a deck.
    ///
    /// Modelled entities are keyed by id under their block keyword. Blocks the
    /// model does not interpret become one `Global` record per keyword, with
    /// positional fields `c<card>_<index>`. Later records replace earlier ones.
    pub fn build(deck: &Deck) -> Self {
        let model = DeckModel::build(deck);
        let mut canonical = Self {
            keywords: deck.keywords().into_iter().map(str::to_string).collect(),
            records: BTreeMap::new(),
        };

        for namespace in Namespace::ALL {
            for entity in model.sorted(namespace) {
                let record = entity
                    .fields
                    .iter()
                    .map(|(name, value)| (name.clone(), value.normalized()))
                    .collect();
                canonical
                    .records
                    .entry(entity.keyword.clone())
                    .or_default()
                    .insert(RecordKey::Id(entity.id), record);
            }
        }

        for block in deck.blocks() {
            if block.is_preamble() || !matches!(block.kind(), KeywordKind::Unrecognized(_)) {
                continue;
            }
            let record = block
                .data_lines()
                .filter(|(_, line)| !line.is_blank())
                .enumerate()
                .flat_map(|(card, (_, line))| {
                    line.fields().iter().enumerate().map(move |(index, value)| {
                        (format!("c{}_{}", card, index), value.normalized())
                    })
                })
                .collect();
            canonical
                .records
                .entry(block.keyword().to_string())
                .or_default()
                .insert(RecordKey::Global, record);
        }

        canonical
    }

    /// Keyword names present (sentinels excluded)
    pub fn keywords(&self) -> &BTreeSet<String> {
        &self.keywords
    }

    pub fn records(&self, keyword: &str) -> Option<&BTreeMap<RecordKey, Record>> {
        self.records.get(keyword)
    }

    /// Number of fields across all records
    pub fn field_count(&self) -> usize {
        self.records
            .values()
            .flat_map(|records| records.values())
            .map(|record| record.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

/// Raw similarity ratios in `0..=1`
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub structural: f64,
    pub parametric: f64,
    pub total_fields: usize,
    pub matching_fields: usize,
    pub mismatches: Vec<FieldMismatch>,
}

impl Comparison {
    /// Combined score as a percentage rounded to 2 decimals
    pub fn combined_percent(&self) -> f64 {
        let combined = STRUCTURAL_WEIGHT * self.structural + PARAMETRIC_WEIGHT * self.parametric;
        round_to(combined * 100.0, 2)
    }
}

/// Compare a target against a reference
pub fn compare(reference: &CanonicalDeck, target: &CanonicalDeck) -> Comparison {
    let common: BTreeSet<&String> = reference.keywords.intersection(&target.keywords).collect();
    let union = reference.keywords.union(&target.keywords).count();
    let structural = if union == 0 {
        0.0
    } else {
        common.len() as f64 / union as f64
    };

    let mut total_fields = 0;
    let mut matching_fields = 0;
    let mut mismatches = Vec::new();

    for keyword in common {
        let (Some(ref_records), Some(tgt_records)) =
            (reference.records(keyword), target.records(keyword))
        else {
            continue;
        };

        for (key, ref_record) in ref_records {
            let Some(tgt_record) = tgt_records.get(key) else {
                continue;
            };
            for (field, ref_value) in ref_record {
                total_fields += 1;
                let tgt_value = tgt_record.get(field);
                if tgt_value.is_some_and(|v| ref_value.matches(v)) {
                    matching_fields += 1;
                } else {
                    mismatches.push(FieldMismatch {
                        keyword: keyword.clone(),
                        record: *key,
                        field: field.clone(),
                        reference: ref_value.clone(),
                        target: tgt_value.cloned(),
                    });
                }
            }
        }
    }

    let parametric = if total_fields == 0 {
        0.0
    } else {
        matching_fields as f64 / total_fields as f64
    };

    Comparison {
        structural,
        parametric,
        total_fields,
        matching_fields,
        mismatches,
    }
}

/// Scores targets against one canonicalized reference
#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    reference_path: PathBuf,
    reference: CanonicalDeck,
}

impl SimilarityEngine {
    /// Build from a parsed reference deck.
    ///
    /// Fails with [`Error::EmptyReference`] when the deck has no keywords.
    pub fn new(reference: &Deck) -> Result<Self> {
        let reference_path = reference
            .source()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(reference.source_name()));
        let canonical = CanonicalDeck::build(reference);
        if canonical.is_empty() {
            return Err(Error::EmptyReference {
                path: reference_path,
            });
        }

        tracing::info!(
            reference = %reference_path.display(),
            keywords = canonical.keywords().len(),
            fields = canonical.field_count(),
            "Reference loaded"
        );

        Ok(Self {
            reference_path,
            reference: canonical,
        })
    }

    /// Load and canonicalize the reference file
    pub fn load(path: impl AsRef<Path>, options: LoadOptions) -> Result<Self> {
        let deck = load_deck(path, options)?;
        Self::new(&deck)
    }

    pub fn reference_path(&self) -> &Path {
        &self.reference_path
    }

    pub fn reference(&self) -> &CanonicalDeck {
        &self.reference
    }

    /// Score a parsed target deck
    pub fn score(&self, target: &Deck) -> SimilarityReport {
        let target_path = target
            .source()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(target.source_name()));
        let comparison = compare(&self.reference, &CanonicalDeck::build(target));

        SimilarityReport {
            reference: self.reference_path.clone(),
            target: target_path,
            structural: comparison.structural * 100.0,
            parametric: comparison.parametric * 100.0,
            combined: comparison.combined_percent(),
            mismatches: comparison.mismatches,
            error: None,
        }
    }

    /// Load and score a target file.
    ///
    /// A target that cannot be loaded scores 0 and carries the error.
    pub fn score_path(&self, path: &Path, options: LoadOptions) -> SimilarityReport {
        tracing::debug!(target = %path.display(), "Comparing");
        match load_deck(path, options) {
            Ok(deck) => self.score(&deck),
            Err(e) => {
                tracing::error!(target = %path.display(), error = %e, "Failed to load target");
                SimilarityReport::failed(&self.reference_path, path, e)
            }
        }
    }

    /// Score every target in parallel, in natural path order
    pub fn score_all(
        &self,
        targets: &[PathBuf],
        options: &BatchOptions,
    ) -> Result<Vec<SimilarityReport>> {
        let cancel = &options.cancel;
        let load = options.load;
        let reports: Vec<Option<SimilarityReport>> = options.install(|| {
            targets
                .par_iter()
                .map(|path| {
                    if cancel.is_cancelled() {
                        None
                    } else {
                        Some(self.score_path(path, load))
                    }
                })
                .collect()
        })?;
        options.check_cancelled()?;

        let mut reports = reports
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or(Error::Cancelled)?;
        reports.sort_by(|a, b| natural_path_cmp(&a.target, &b.target));
        Ok(reports)
    }
}

/// Score `target` against `reference`
pub fn score(reference: &Deck, target: &Deck) -> Result<SimilarityReport> {
    Ok(SimilarityEngine::new(reference)?.score(target))
}
