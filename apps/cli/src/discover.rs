// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Input file discovery.

use anyhow::{bail, Context, Result};
use deck_lite_processing::batch::natural_path_cmp;
use std::path::{Path, PathBuf};

/// Files in `dir` matching any of the comma-separated glob `patterns`,
/// deduplicated and in natural order.
pub fn find_files(dir: &Path, patterns: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Input directory not found: {}", dir.display());
    }

    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let mut files = Vec::new();
    for pattern in patterns.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let full = Path::new(&base).join(pattern);
        let full = full.to_string_lossy();
        let entries =
            glob::glob(&full).with_context(|| format!("Invalid file pattern: {}", pattern))?;
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Skipping unreadable path"),
            }
        }
    }

    files.sort_by(|a, b| natural_path_cmp(a, b));
    files.dedup();

    tracing::debug!(dir = %dir.display(), patterns, files = files.len(), "Discovered input files");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_natural_order_and_multiple_patterns() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["design_10.k", "design_2.dyn", "design_1.k", "notes.txt"] {
            fs::write(dir.path().join(name), "*KEYWORD\n*END\n").unwrap();
        }

        let files = find_files(dir.path(), "*.k, *.dyn").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["design_1.k", "design_2.dyn", "design_10.k"]);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(find_files(&missing, "*.k").is_err());
    }

    #[test]
    fn test_no_matches_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_files(dir.path(), "*.k").unwrap().is_empty());
    }
}
