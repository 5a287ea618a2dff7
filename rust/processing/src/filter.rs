// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Part selection predicates

use deck_lite_core::{parse_identifier, EntityId};
use rustc_hash::FxHashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Predicate over Part ids.
///
/// Parses from `odd`, `even`, `all`, `ids:1,2,5` and `range:10-20` (inclusive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartFilter {
    All,
    Odd,
    Even,
    Ids(FxHashSet<EntityId>),
    Range { start: EntityId, end: EntityId },
}

impl PartFilter {
    #[inline]
    pub fn matches(&self, id: EntityId) -> bool {
        match self {
            PartFilter::All => true,
            PartFilter::Odd => id % 2 == 1,
            PartFilter::Even => id % 2 == 0,
            PartFilter::Ids(ids) => ids.contains(&id),
            PartFilter::Range { start, end } => (*start..=*end).contains(&id),
        }
    }
}

impl Default for PartFilter {
    fn default() -> Self {
        PartFilter::Odd
    }
}

impl FromStr for PartFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || Error::InvalidFilter(s.to_string());

        match s.to_ascii_lowercase().as_str() {
            "all" => return Ok(PartFilter::All),
            "odd" => return Ok(PartFilter::Odd),
            "even" => return Ok(PartFilter::Even),
            _ => {}
        }

        if let Some(list) = s.strip_prefix("ids:") {
            let ids = list
                .split(',')
                .map(|token| parse_identifier(token).ok_or_else(invalid))
                .collect::<Result<FxHashSet<_>, _>>()?;
            return Ok(PartFilter::Ids(ids));
        }

        if let Some(range) = s.strip_prefix("range:") {
            let (start, end) = range.split_once('-').ok_or_else(invalid)?;
            let start = parse_identifier(start).ok_or_else(invalid)?;
            let end = parse_identifier(end).ok_or_else(invalid)?;
            if start > end {
                return Err(invalid());
            }
            return Ok(PartFilter::Range { start, end });
        }

        Err(invalid())
    }
}

impl fmt::Display for PartFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartFilter::All => f.write_str("all"),
            PartFilter::Odd => f.write_str("odd"),
            PartFilter::Even => f.write_str("even"),
            PartFilter::Ids(ids) => {
                let mut ids: Vec<_> = ids.iter().collect();
                ids.sort_unstable();
                let list: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
                write!(f, "ids:{}", list.join(","))
            }
            PartFilter::Range { start, end } => write!(f, "range:{}-{}", start, end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keywords() {
        assert_eq!("odd".parse::<PartFilter>().unwrap(), PartFilter::Odd);
        assert_eq!("EVEN".parse::<PartFilter>().unwrap(), PartFilter::Even);
        assert_eq!(" all ".parse::<PartFilter>().unwrap(), PartFilter::All);
    }

    #[test]
    fn test_parse_ids_and_range() {
        let ids: PartFilter = "ids:1, 2,5".parse().unwrap();
        assert!(ids.matches(5));
        assert!(!ids.matches(3));

        let range: PartFilter = "range:10-20".parse().unwrap();
        assert!(range.matches(10));
        assert!(range.matches(20));
        assert!(!range.matches(21));
        assert_eq!(range.to_string(), "range:10-20");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("prime".parse::<PartFilter>().is_err());
        assert!("ids:1,x".parse::<PartFilter>().is_err());
        assert!("range:20-10".parse::<PartFilter>().is_err());
        assert!("range:5".parse::<PartFilter>().is_err());
    }

    #[test]
    fn test_odd_even() {
        assert!(PartFilter::Odd.matches(1));
        assert!(!PartFilter::Odd.matches(2));
        assert!(PartFilter::Even.matches(2));
    }
}
