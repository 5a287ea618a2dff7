// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Similarity scoring against reference decks.

use approx::assert_relative_eq;
use deck_lite_core::Deck;
use deck_lite_processing::{score, BatchOptions, LoadOptions, SimilarityEngine};
use proptest::prelude::*;
use std::fs;
use std::path::PathBuf;

fn shell_deck(thickness: f64, nodes: usize) -> String {
    let mut text = String::from(
        "*KEYWORD\n*CONTROL_TERMINATION\n 0.12\n*PART\nPanel\n 1 10 100\n*SECTION_SHELL\n 10 2\n",
    );
    text.push_str(&format!(" {:?} {:?} {:?} {:?}\n", thickness, thickness, thickness, thickness));
    text.push_str("*MAT_ELASTIC\n 100 7.85e-9 210000.0 0.3\n*NODE\n");
    for nid in 1..=nodes {
        text.push_str(&format!(" {} {} 0.0 0.0\n", nid, nid as f64 * 0.25));
    }
    text.push_str("*END\n");
    text
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A non-empty deck is fully similar to itself.
    #[test]
    fn prop_self_similarity(thickness in 0.1f64..10.0, nodes in 0usize..20) {
        let deck = Deck::parse(&shell_deck(thickness, nodes));
        let report = score(&deck, &deck).unwrap();
        prop_assert_eq!(report.combined, 100.0);
        prop_assert!(report.mismatches.is_empty());
    }
}

#[test]
fn test_reference_fields_are_the_basis() {
    let full = Deck::parse("*PART\nBracket\n 1 10 100\n");
    let partial = Deck::parse("*PART\nBracket\n 1 10\n");

    let forward = score(&full, &partial).unwrap();
    let backward = score(&partial, &full).unwrap();

    assert_relative_eq!(backward.parametric, 100.0);
    assert_relative_eq!(forward.parametric, 75.0);
    assert_ne!(forward.parametric, backward.parametric);
    assert_eq!(forward.mismatches.len(), 1);
    assert_eq!(forward.mismatches[0].field, "mid");
    assert!(forward.mismatches[0].target.is_none());
}

#[test]
fn test_combined_weighting() {
    // One shared keyword out of two, all shared fields equal.
    let reference = Deck::parse("*NODE\n 1 0.0 0.0 0.0\n*CONTROL_TERMINATION\n 0.1\n");
    let target = Deck::parse("*NODE\n 1 0.0 0.0 0.0\n");
    let report = score(&reference, &target).unwrap();
    assert_relative_eq!(report.structural, 50.0);
    assert_relative_eq!(report.parametric, 100.0);
    assert_eq!(report.combined, 90.0);
}

#[test]
fn test_relative_tolerance_on_floats() {
    let reference = Deck::parse(&shell_deck(2.0, 3));
    let close = Deck::parse(&shell_deck(2.0 + 1e-6, 3));
    let far = Deck::parse(&shell_deck(2.1, 3));

    assert_eq!(score(&reference, &close).unwrap().combined, 100.0);
    let report = score(&reference, &far).unwrap();
    assert!(report.combined < 100.0);
    assert_eq!(report.mismatches.len(), 4);
}

#[test]
fn test_batch_scoring_with_unreadable_target() {
    let dir = tempfile::tempdir().unwrap();
    let write = |name: &str, text: &str| {
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        path
    };
    let reference = write("design_1.k", &shell_deck(2.0, 4));
    let targets: Vec<PathBuf> = vec![
        write("design_10.k", &shell_deck(2.5, 4)),
        write("design_2.k", &shell_deck(2.0, 4)),
        dir.path().join("design_3.k"),
    ];

    let engine = SimilarityEngine::load(&reference, LoadOptions::with_includes()).unwrap();
    let reports = engine.score_all(&targets, &BatchOptions::default()).unwrap();

    let names: Vec<_> = reports
        .iter()
        .map(|r| r.target.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["design_2.k", "design_3.k", "design_10.k"]);
    assert_eq!(reports[0].combined, 100.0);
    assert!(reports[1].is_failed());
    assert_eq!(reports[1].combined, 0.0);
    assert!(reports[2].combined < 100.0);
}

#[test]
fn test_includes_compared_as_one_assembly() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("mesh.k"), "*NODE\n 1 0.0 0.0 0.0\n 2 1.0 0.0 0.0\n").unwrap();
    fs::write(dir.path().join("a.k"), "*KEYWORD\n*INCLUDE\nmesh.k\n*END\n").unwrap();
    fs::write(
        dir.path().join("b.k"),
        "*KEYWORD\n*NODE\n 1 0.0 0.0 0.0\n 2 1.0 0.0 0.0\n*END\n",
    )
    .unwrap();

    let engine = SimilarityEngine::load(dir.path().join("a.k"), LoadOptions::with_includes()).unwrap();
    let report = engine.score_path(&dir.path().join("b.k"), LoadOptions::with_includes());
    assert_eq!(report.combined, 100.0);
}
