// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Deck loading with optional `*INCLUDE` expansion

use deck_lite_core::lexer::strip_inline_comment;
use deck_lite_core::{read_deck, Block, Deck};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Keyword whose data lines name further deck files
pub const INCLUDE_KEYWORD: &str = "*INCLUDE";

/// Nesting limit for include expansion
pub const MAX_INCLUDE_DEPTH: usize = 16;

/// Options for [`load_deck`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Splice included files in place of `*INCLUDE` blocks
    pub includes: bool,
}

impl LoadOptions {
    pub fn with_includes() -> Self {
        Self { includes: true }
    }
}

/// Read a deck from disk.
///
/// With `includes` set, every `*INCLUDE` block is replaced by the blocks of the
/// files it names (resolved relative to the including file). Missing includes
/// and cycles are logged and skipped. Only the top-level file can fail.
pub fn load_deck(path: impl AsRef<Path>, options: LoadOptions) -> Result<Deck> {
    let path = path.as_ref();
    let deck = read_deck(path)?;
    if !options.includes {
        return Ok(deck);
    }

    let mut stack = vec![identity(path)];
    let blocks = expand(deck, &mut stack);
    Ok(Deck::new(Some(path.to_path_buf()), blocks))
}

/// File names listed by an include block
pub fn include_targets(block: &Block) -> Vec<String> {
    block
        .data_lines()
        .map(|(_, line)| strip_inline_comment(line.raw()).trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

fn expand(deck: Deck, stack: &mut Vec<PathBuf>) -> Vec<Block> {
    let base = deck
        .source()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let mut blocks = Vec::new();
    for block in deck.into_blocks() {
        if block.keyword() != INCLUDE_KEYWORD {
            blocks.push(block);
            continue;
        }

        for name in include_targets(&block) {
            let target = base.join(&name);
            let key = identity(&target);

            if stack.len() > MAX_INCLUDE_DEPTH {
                tracing::warn!(include = %target.display(), depth = stack.len(), "Include depth limit reached");
                continue;
            }
            if stack.contains(&key) {
                tracing::warn!(include = %target.display(), "Include cycle, skipping");
                continue;
            }

            match read_deck(&target) {
                Ok(included) => {
                    tracing::debug!(include = %target.display(), "Expanding include");
                    stack.push(key);
                    let inner = expand(included, stack);
                    stack.pop();
                    blocks.extend(inner.into_iter().filter(|b| !b.kind().is_sentinel()));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable include");
                }
            }
        }
    }
    blocks
}

fn identity(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_lite_core::{DeckModel, Namespace};
    use std::fs;

    #[test]
    fn test_include_targets_strip_comments() {
        let deck = Deck::parse("*INCLUDE\n$ files\nmesh.k $ shared mesh\n\nparts.k\n");
        assert_eq!(include_targets(&deck.blocks()[0]), vec!["mesh.k", "parts.k"]);
    }

    #[test]
    fn test_includes_spliced_in_place() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("main.k"),
            "*KEYWORD\n*PART\nP\n 1 10 100\n*INCLUDE\nmesh.k\n*END\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("mesh.k"),
            "*KEYWORD\n*NODE\n 5 0 0 0\n*END\n",
        )
        .unwrap();

        let deck = load_deck(dir.path().join("main.k"), LoadOptions::with_includes()).unwrap();
        let keywords: Vec<_> = deck.blocks().iter().map(|b| b.keyword()).collect();
        assert_eq!(keywords, vec!["*KEYWORD", "*PART", "*NODE", "*END"]);

        let plain = load_deck(dir.path().join("main.k"), LoadOptions::default()).unwrap();
        assert!(plain.keywords().contains("*INCLUDE"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.k");
        fs::write(&path, b"*KEYWORD\n*PART\nT\xff\xfeitle\n 1 10 100\n*END\n").unwrap();

        let deck = load_deck(&path, LoadOptions::default()).unwrap();
        let model = DeckModel::build(&deck);
        assert_eq!(model.ids(Namespace::Part), vec![1]);
        let part = model.get(Namespace::Part, 1).unwrap();
        assert_eq!(part.text("heading"), Some("T\u{FFFD}\u{FFFD}itle"));
        assert_eq!(part.identifier("secid"), Some(10));
    }

    #[test]
    fn test_include_cycle_and_missing_file_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.k"), "*NODE\n 1 0 0 0\n*INCLUDE\nb.k\nmissing.k\n").unwrap();
        fs::write(dir.path().join("b.k"), "*NODE\n 2 0 0 0\n*INCLUDE\na.k\n").unwrap();

        let deck = load_deck(dir.path().join("a.k"), LoadOptions::with_includes()).unwrap();
        let keywords: Vec<_> = deck.blocks().iter().map(|b| b.keyword()).collect();
        assert_eq!(keywords, vec!["*NODE", "*NODE"]);
    }
}
