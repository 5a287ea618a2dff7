// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared-nothing batch loading
//!
//! Each file is loaded on a rayon worker into an owned value; the coordinator
//! collects the results, drops failures with a warning and orders the rest
//! naturally by path. Worker count only affects speed.

use rayon::prelude::*;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::loader::LoadOptions;

/// Pair count above which a warning is logged
pub const DEFAULT_PAIR_WARN_THRESHOLD: usize = 10_000;

/// Cooperative cancellation flag, checked between files
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::SeqCst)
    }
}

/// Batch run settings
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Dedicated pool size; `None` uses the global rayon pool
    pub workers: Option<usize>,
    pub cancel: CancelToken,
    pub pair_warn_threshold: usize,
    pub load: LoadOptions,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: None,
            cancel: CancelToken::default(),
            pair_warn_threshold: DEFAULT_PAIR_WARN_THRESHOLD,
            load: LoadOptions::default(),
        }
    }
}

impl BatchOptions {
    /// Run `op` on the configured pool
    pub fn install<T, F>(&self, op: F) -> Result<T>
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        match self.workers {
            Some(workers) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers.max(1))
                    .build()?;
                Ok(pool.install(op))
            }
            None => Ok(op()),
        }
    }

    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Outcome of loading a set of files
#[derive(Debug)]
pub struct Loaded<T> {
    /// Successfully loaded values in natural path order
    pub entries: Vec<(PathBuf, T)>,
    /// Files that could not be loaded, with the reason
    pub skipped: Vec<(PathBuf, String)>,
}

/// Load every path in parallel with `load`.
///
/// Failing files are logged and reported in [`Loaded::skipped`]. A cancelled
/// run returns [`Error::Cancelled`] and discards everything loaded so far.
pub fn load_all<T, F>(paths: &[PathBuf], options: &BatchOptions, load: F) -> Result<Loaded<T>>
where
    T: Send,
    F: Fn(&Path) -> Result<T> + Sync,
{
    let cancel = &options.cancel;
    let results: Vec<(PathBuf, Option<Result<T>>)> = options.install(|| {
        paths
            .par_iter()
            .map(|path| {
                if cancel.is_cancelled() {
                    return (path.clone(), None);
                }
                (path.clone(), Some(load(path)))
            })
            .collect()
    })?;
    options.check_cancelled()?;

    let mut entries = Vec::with_capacity(results.len());
    let mut skipped = Vec::new();
    for (path, result) in results {
        match result {
            Some(Ok(value)) => entries.push((path, value)),
            Some(Err(e)) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping file");
                skipped.push((path, e.to_string()));
            }
            None => return Err(Error::Cancelled),
        }
    }
    entries.sort_by(|a, b| natural_path_cmp(&a.0, &b.0));

    tracing::debug!(loaded = entries.len(), skipped = skipped.len(), "Batch load complete");
    Ok(Loaded { entries, skipped })
}

/// Number of unordered pairs among `n` items
#[inline]
pub fn pair_count(n: usize) -> usize {
    n.saturating_mul(n.saturating_sub(1)) / 2
}

/// Unordered index pairs `(i, j)` with `i < j`
pub fn pairs(n: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..n).flat_map(move |i| (i + 1..n).map(move |j| (i, j)))
}

/// Log a warning when the pairwise stage would be large
pub fn warn_on_pair_explosion(files: usize, threshold: usize) -> usize {
    let count = pair_count(files);
    if count > threshold {
        tracing::warn!(files, pairs = count, threshold, "Large number of comparison pairs");
    }
    count
}

/// Order paths so that `design_2` sorts before `design_10`
pub fn natural_path_cmp(a: &Path, b: &Path) -> Ordering {
    natural_cmp(&a.to_string_lossy(), &b.to_string_lossy())
}

/// Numeric-aware string comparison.
///
/// Digit runs compare by value, other runs case-insensitively. Equal keys
/// fall back to plain byte order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = chunks(a);
    let mut right = chunks(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = compare_chunk(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn compare_chunk(x: &str, y: &str) -> Ordering {
    let x_digits = x.as_bytes()[0].is_ascii_digit();
    let y_digits = y.as_bytes()[0].is_ascii_digit();
    match (x_digits, y_digits) {
        (true, true) => {
            let x = x.trim_start_matches('0');
            let y = y.trim_start_matches('0');
            x.len().cmp(&y.len()).then_with(|| x.cmp(y))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => x
            .chars()
            .flat_map(char::to_lowercase)
            .cmp(y.chars().flat_map(char::to_lowercase)),
    }
}

/// Split into alternating digit / non-digit runs
fn chunks(s: &str) -> impl Iterator<Item = &str> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map_or(rest.len(), |(i, _)| i);
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_order() {
        let mut names = vec!["design_10.k", "Design_2.k", "design_1.k", "design_02b.k"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["design_1.k", "Design_2.k", "design_02b.k", "design_10.k"]);
    }

    #[test]
    fn test_pairs() {
        let all: Vec<_> = pairs(4).collect();
        assert_eq!(all, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
        assert_eq!(pair_count(4), 6);
        assert_eq!(pair_count(1), 0);
        assert_eq!(pair_count(0), 0);
        assert_eq!(pairs(1).count(), 0);
    }

    #[test]
    fn test_load_all_skips_failures() {
        let paths: Vec<PathBuf> = ["b_10", "b_2", "bad"].iter().map(PathBuf::from).collect();
        let loaded = load_all(&paths, &BatchOptions::default(), |path| {
            if path == Path::new("bad") {
                Err(Error::NoInputFiles)
            } else {
                Ok(path.display().to_string())
            }
        })
        .unwrap();
        let names: Vec<_> = loaded.entries.iter().map(|(_, v)| v.as_str()).collect();
        assert_eq!(names, vec!["b_2", "b_10"]);
        assert_eq!(loaded.skipped.len(), 1);
    }

    #[test]
    fn test_cancelled_run_discards_results() {
        let options = BatchOptions::default();
        options.cancel.cancel();
        let paths = vec![PathBuf::from("a")];
        let result = load_all(&paths, &options, |_| Ok(1));
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_dedicated_pool() {
        let options = BatchOptions {
            workers: Some(2),
            ..BatchOptions::default()
        };
        assert_eq!(options.install(rayon::current_num_threads).unwrap(), 2);
    }
}
