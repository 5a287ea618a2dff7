// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Batch diff of a tracked Part attribute across design variants.
//!
//! The tracked value of a Part is the thickness-like attribute of its Section
//! (0.0 when the Section or attribute is missing).

use deck_lite_core::{CrossReferenceGraph, Deck, DeckModel, EntityId, Namespace};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::batch::{load_all, pairs, warn_on_pair_explosion, BatchOptions};
use crate::error::{Error, Result};
use crate::loader::load_deck;
use crate::report::{file_label, DiffReport, PartDelta};

/// Default absolute tolerance for flagging a difference
pub const DEFAULT_TOLERANCE: f64 = 0.001;

/// Name used for Parts without a heading
pub const UNKNOWN_PART_NAME: &str = "Unknown";

/// Tracked value and name of one Part
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedPart {
    pub name: String,
    pub value: f64,
}

/// Part id → tracked value for one deck
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackedParts {
    parts: BTreeMap<EntityId, TrackedPart>,
}

impl TrackedParts {
    pub fn from_deck(deck: &Deck) -> Self {
        let model = DeckModel::build(deck);
        let graph = CrossReferenceGraph::build(&model);
        Self::from_model(&model, &graph)
    }

    pub fn from_model(model: &DeckModel, graph: &CrossReferenceGraph) -> Self {
        let parts = model
            .entities(Namespace::Part)
            .map(|part| {
                let name = part
                    .text("heading")
                    .unwrap_or(UNKNOWN_PART_NAME)
                    .to_string();
                let value = graph
                    .section_of(part.id)
                    .and_then(|secid| model.get(Namespace::Section, secid))
                    .and_then(|section| section.attribute)
                    .unwrap_or(0.0);
                (part.id, TrackedPart { name, value })
            })
            .collect();
        Self { parts }
    }

    pub fn get(&self, id: EntityId) -> Option<&TrackedPart> {
        self.parts.get(&id)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &TrackedPart)> + '_ {
        self.parts.iter().map(|(id, part)| (*id, part))
    }
}

/// Parts present in both maps whose values differ by more than `tolerance`,
/// skipping pairs where both values are zero. Sorted by Part id; names come
/// from `a`.
pub fn diff_parts(a: &TrackedParts, b: &TrackedParts, tolerance: f64) -> Vec<PartDelta> {
    a.iter()
        .filter_map(|(id, part_a)| {
            let part_b = b.get(id)?;
            let (value_a, value_b) = (part_a.value, part_b.value);
            let differs = (value_a - value_b).abs() > tolerance;
            let resolved = value_a != 0.0 || value_b != 0.0;
            (differs && resolved).then(|| PartDelta {
                part_id: id,
                name: part_a.name.clone(),
                value_a,
                value_b,
                delta: value_b - value_a,
            })
        })
        .collect()
}

/// Diff every unordered pair of `files`.
///
/// Files that cannot be read are skipped with a warning. Only pairs with at
/// least one flagged Part produce a report; reports follow the natural order
/// of the file names.
pub fn diff_all(files: &[PathBuf], tolerance: f64, options: &BatchOptions) -> Result<Vec<DiffReport>> {
    if files.is_empty() {
        return Err(Error::NoInputFiles);
    }
    if files.len() < 2 {
        return Err(Error::NotEnoughFiles { found: files.len() });
    }

    tracing::info!(files = files.len(), tolerance, "Parsing files");
    let loaded = load_all(files, options, |path| {
        let deck = load_deck(path, options.load)?;
        Ok(TrackedParts::from_deck(&deck))
    })?;
    if loaded.entries.len() < 2 {
        return Err(Error::NotEnoughFiles {
            found: loaded.entries.len(),
        });
    }

    let total = warn_on_pair_explosion(loaded.entries.len(), options.pair_warn_threshold);
    tracing::info!(pairs = total, "Comparing pairs");

    let mut reports = Vec::new();
    for (i, j) in pairs(loaded.entries.len()) {
        options.check_cancelled()?;
        let (file_a, parts_a) = &loaded.entries[i];
        let (file_b, parts_b) = &loaded.entries[j];

        let deltas = diff_parts(parts_a, parts_b, tolerance);
        if deltas.is_empty() {
            continue;
        }
        tracing::info!(
            file_a = %file_label(file_a),
            file_b = %file_label(file_b),
            parts = deltas.len(),
            "Change detected"
        );
        reports.push(DiffReport {
            file_a: file_a.clone(),
            file_b: file_b.clone(),
            deltas,
        });
    }

    tracing::info!(differing = reports.len(), pairs = total, "Diff complete");
    Ok(reports)
}
