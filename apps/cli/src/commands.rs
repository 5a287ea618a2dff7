// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subcommand implementations.

use anyhow::{bail, Context, Result};
use deck_lite_core::{CrossReferenceGraph, DeckModel, EdgeKind, EdgeStats, EntityId, Namespace};
use deck_lite_processing::batch::pair_count;
use deck_lite_processing::{
    diff_all, extract, load_all, load_deck, BatchOptions, Error as ProcessingError,
    ExtractionCounts, PartFilter, SimilarityEngine,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::discover::find_files;
use crate::output;

/// Settings shared by every subcommand after merging flags over the environment.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub json: bool,
    pub batch: BatchOptions,
}

#[derive(Debug, Serialize)]
struct ExtractedFile {
    source: PathBuf,
    output: Option<PathBuf>,
    counts: ExtractionCounts,
}

/// Extract the Parts matching `filter` from every input file.
pub fn extract_files(
    ctx: &RunContext,
    dir: &Path,
    pattern: &str,
    output_dir: &Path,
    filter: &PartFilter,
    prefix: &str,
) -> Result<()> {
    let files = require_files(dir, pattern, 1)?;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Could not create output dir {}", output_dir.display()))?;

    tracing::info!(files = files.len(), filter = %filter, "Extracting components");
    let loaded = load_all(&files, &ctx.batch, |path| {
        let deck = load_deck(path, ctx.batch.load)?;
        Ok(extract(&deck, |id| filter.matches(id)))
    })?;

    let mut results = Vec::with_capacity(loaded.entries.len());
    for (source, extraction) in &loaded.entries {
        if extraction.is_empty() {
            tracing::info!(file = %source.display(), "No matching parts, skipping");
            results.push(ExtractedFile {
                source: source.clone(),
                output: None,
                counts: extraction.counts,
            });
            continue;
        }
        let written = output::write_deck(output_dir, prefix, source, &extraction.deck)?;
        tracing::info!(
            file = %source.display(),
            output = %written.display(),
            parts = extraction.counts.parts,
            nodes = extraction.counts.nodes,
            "Saved"
        );
        results.push(ExtractedFile {
            source: source.clone(),
            output: Some(written),
            counts: extraction.counts,
        });
    }

    if ctx.json {
        output::print_json(&results)?;
    } else {
        let written = results.iter().filter(|r| r.output.is_some()).count();
        println!(
            "Extraction complete: {} of {} files written to {}",
            written,
            files.len(),
            output_dir.display()
        );
    }
    Ok(())
}

/// Score every input file against the reference.
pub fn similarity(
    ctx: &RunContext,
    dir: &Path,
    pattern: &str,
    reference: Option<&Path>,
) -> Result<()> {
    let files = require_files(dir, pattern, 2)?;
    let reference = match reference {
        Some(path) => path.to_path_buf(),
        None => files[0].clone(),
    };
    let targets: Vec<PathBuf> = files.into_iter().filter(|f| *f != reference).collect();

    let engine = SimilarityEngine::load(&reference, ctx.batch.load)
        .with_context(|| format!("Cannot use {} as reference", reference.display()))?;
    let reports = engine.score_all(&targets, &ctx.batch)?;

    if ctx.json {
        output::print_json(&reports)?;
    } else {
        print!("{}", output::similarity_table(engine.reference_path(), &reports));
    }
    Ok(())
}

/// Diff the tracked Part attribute across every pair of input files.
pub fn diff(
    ctx: &RunContext,
    dir: &Path,
    pattern: &str,
    output_dir: &Path,
    tolerance: f64,
) -> Result<()> {
    let files = require_files(dir, pattern, 2)?;
    let reports = diff_all(&files, tolerance, &ctx.batch)?;

    if ctx.json {
        return output::print_json(&reports);
    }

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Could not create output dir {}", output_dir.display()))?;
    for report in &reports {
        print!("{}", output::diff_summary(report));
        let path = output::write_diff_csv(output_dir, report)?;
        tracing::debug!(path = %path.display(), "Wrote diff");
    }
    let pairs = pair_count(files.len());
    println!(
        "Done. Found differences in {} of {} pairs.",
        reports.len(),
        pairs
    );
    Ok(())
}

#[derive(Debug, Serialize)]
struct DeckSummary {
    source: PathBuf,
    keywords: Vec<String>,
    entities: BTreeMap<&'static str, usize>,
    overrides: usize,
    edges: BTreeMap<&'static str, EdgeStats>,
    dangling: BTreeMap<&'static str, Vec<(EntityId, EntityId)>>,
}

/// Report entity counts and dangling references of one deck.
pub fn inspect(ctx: &RunContext, file: &Path) -> Result<()> {
    let deck = load_deck(file, ctx.batch.load)?;
    let model = DeckModel::build(&deck);
    let graph = CrossReferenceGraph::build(&model);

    let summary = DeckSummary {
        source: file.to_path_buf(),
        keywords: deck.keywords().into_iter().map(str::to_string).collect(),
        entities: Namespace::ALL
            .into_iter()
            .map(|ns| (ns.label(), model.len(ns)))
            .collect(),
        overrides: model.overrides(),
        edges: EdgeKind::ALL
            .into_iter()
            .map(|kind| (kind.label(), graph.stats(kind, &model)))
            .collect(),
        dangling: EdgeKind::ALL
            .into_iter()
            .map(|kind| (kind.label(), graph.dangling(kind, &model)))
            .filter(|(_, edges)| !edges.is_empty())
            .collect(),
    };

    if ctx.json {
        return output::print_json(&summary);
    }

    println!("{}", summary.source.display());
    println!("  keywords: {}", summary.keywords.join(" "));
    for (namespace, count) in &summary.entities {
        println!("  {:<14} {}", namespace, count);
    }
    if summary.overrides > 0 {
        println!("  overridden definitions: {}", summary.overrides);
    }
    for (kind, stats) in &summary.edges {
        println!("  {:<14} {} edges, {} dangling", kind, stats.total, stats.dangling);
    }
    for (kind, edges) in &summary.dangling {
        let shown: Vec<String> = edges
            .iter()
            .take(10)
            .map(|(from, to)| format!("{}->{}", from, to))
            .collect();
        println!("  dangling {}: {}", kind, shown.join(", "));
    }
    Ok(())
}

/// Discover input files, failing when fewer than `min` are found.
fn require_files(dir: &Path, pattern: &str, min: usize) -> Result<Vec<PathBuf>> {
    let files = find_files(dir, pattern)?;
    if files.is_empty() {
        bail!(
            "No files matching '{}' in {}",
            pattern,
            dir.display()
        );
    }
    if files.len() < min {
        return Err(ProcessingError::NotEnoughFiles { found: files.len() }.into());
    }
    Ok(files)
}

