// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Console tables, CSV files and JSON output.

use anyhow::{Context, Result};
use deck_lite_core::Deck;
use deck_lite_processing::report::file_label;
use deck_lite_processing::{DiffReport, SimilarityReport};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const RULE_WIDTH: usize = 60;

/// Print any report as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    println!("{}", text);
    Ok(())
}

/// Ranking table with the reference listed first at 100%.
pub fn similarity_table(reference: &Path, reports: &[SimilarityReport]) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "DECK SIMILARITY REPORT");
    let _ = writeln!(out, "Reference Model: {}", file_label(reference));
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "{:<30} | {:<15}", "Design Variant", "Similarity Score");
    let _ = writeln!(out, "{} | {}", "-".repeat(30), "-".repeat(15));
    let _ = writeln!(out, "{:<30} | {:.2}%", file_label(reference), 100.0);
    for report in reports {
        let _ = match &report.error {
            Some(error) => writeln!(
                out,
                "{:<30} | {:.2}% (failed: {})",
                file_label(&report.target),
                report.combined,
                error
            ),
            None => writeln!(
                out,
                "{:<30} | {:.2}%",
                file_label(&report.target),
                report.combined
            ),
        };
    }
    let _ = writeln!(out, "{}", rule);
    out
}

/// Console summary of one differing pair.
pub fn diff_summary(report: &DiffReport) -> String {
    let (a, b) = report.names();
    let mut out = String::new();
    let _ = writeln!(out, "[!] CHANGE DETECTED: {} vs {}", a, b);
    let _ = writeln!(
        out,
        "    {:<10} {:<8} {:<8} {:<8} Name",
        "PID", "Val_A", "Val_B", "Delta"
    );
    let _ = writeln!(out, "    {}", "-".repeat(RULE_WIDTH));
    for delta in &report.deltas {
        let name: String = delta.name.chars().take(30).collect();
        let _ = writeln!(
            out,
            "    {:<10} {:<8.3} {:<8.3} {:<8.3} {}",
            delta.part_id, delta.value_a, delta.value_b, delta.delta, name
        );
    }
    out
}

/// Write `Diff_<a>_VS_<b>.csv` into `dir`.
pub fn write_diff_csv(dir: &Path, report: &DiffReport) -> Result<PathBuf> {
    let path = dir.join(report.output_name());
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let (a, b) = report.names();
    writer.write_record(["Comparison", a.as_str(), b.as_str()])?;
    writer.write_record(["PID", "PartName", "Value_A", "Value_B", "Delta"])?;
    for delta in &report.deltas {
        writer.write_record([
            delta.part_id.to_string(),
            delta.name.clone(),
            delta.value_a.to_string(),
            delta.value_b.to_string(),
            delta.delta.to_string(),
        ])?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Write an extracted deck as `<prefix><file name>` into `dir`.
pub fn write_deck(dir: &Path, prefix: &str, source: &Path, deck: &Deck) -> Result<PathBuf> {
    let path = dir.join(format!("{}{}", prefix, file_label(source)));
    let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    deck.write_to(&mut out)
        .and_then(|_| out.flush())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_lite_processing::PartDelta;
    use std::fs;

    fn report() -> DiffReport {
        DiffReport {
            file_a: PathBuf::from("runs/Design_1.dyn"),
            file_b: PathBuf::from("runs/Design_2.dyn"),
            deltas: vec![PartDelta {
                part_id: 1,
                name: "Roof, front".to_string(),
                value_a: 2.0,
                value_b: 2.5,
                delta: 0.5,
            }],
        }
    }

    #[test]
    fn test_diff_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_diff_csv(dir.path(), &report()).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            "Diff_Design_1.dyn_VS_Design_2.dyn.csv"
        );

        let text = fs::read_to_string(path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Comparison,Design_1.dyn,Design_2.dyn");
        assert_eq!(lines[1], "PID,PartName,Value_A,Value_B,Delta");
        assert_eq!(lines[2], "1,\"Roof, front\",2,2.5,0.5");
    }

    #[test]
    fn test_similarity_table_lists_reference_first() {
        let reports = vec![
            SimilarityReport {
                reference: PathBuf::from("design_1.k"),
                target: PathBuf::from("design_2.k"),
                structural: 100.0,
                parametric: 96.5,
                combined: 97.2,
                mismatches: Vec::new(),
                error: None,
            },
            SimilarityReport::failed(Path::new("design_1.k"), Path::new("design_3.k"), "gone"),
        ];
        let table = similarity_table(Path::new("design_1.k"), &reports);
        let rows: Vec<_> = table.lines().filter(|l| l.starts_with("design_")).collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].ends_with("| 100.00%"));
        assert!(rows[1].ends_with("| 97.20%"));
        assert!(rows[2].contains("0.00% (failed: gone)"));
    }

    #[test]
    fn test_write_deck_uses_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let deck = Deck::parse("*NODE\n 1 0 0 0\n");
        let path = write_deck(dir.path(), "Odd_Comps_", Path::new("in/model.k"), &deck).unwrap();
        assert!(path.ends_with("Odd_Comps_model.k"));
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "*KEYWORD\n*NODE\n 1 0 0 0\n*END\n"
        );
    }
}
