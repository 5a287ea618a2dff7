// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Keyword deck tokenizer using nom
//!
//! Classifies raw lines and splits data lines into fields. Numeric literals are
//! recognized with nom and converted with lexical-core / fast-float.

use nom::{
    branch::alt,
    character::complete::{char, digit1, one_of},
    combinator::{all_consuming, opt, recognize},
    sequence::{pair, tuple},
    IResult,
};

/// Line classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineKind {
    /// First non-blank character is `$`
    Comment,
    /// First non-blank character is `*`
    KeywordHeader,
    /// Anything else, including blank lines
    Data,
}

/// Numeric literal recognized in a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

/// Classify a raw line by its first non-blank character
#[inline]
pub fn classify_line(raw: &str) -> LineKind {
    match raw.trim_start().as_bytes().first() {
        Some(b'*') => LineKind::KeywordHeader,
        Some(b'$') => LineKind::Comment,
        _ => LineKind::Data,
    }
}

/// Truncate a line at the first `$` (inline comment)
#[inline]
pub fn strip_inline_comment(raw: &str) -> &str {
    match memchr::memchr(b'$', raw.as_bytes()) {
        Some(pos) => &raw[..pos],
        None => raw,
    }
}

/// Split a line into raw tokens on runs of commas and/or whitespace.
///
/// Inline comments are removed first and empty tokens are dropped.
#[inline]
pub fn tokenize(raw: &str) -> impl Iterator<Item = &str> + '_ {
    strip_inline_comment(raw)
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
}

/// Keyword name of a header line: its first token, uppercased.
///
/// Returns an empty string for a header line without a keyword token.
pub fn header_keyword(raw: &str) -> String {
    tokenize(raw)
        .next()
        .map(|token| token.to_ascii_uppercase())
        .unwrap_or_default()
}

/// Integer literal: 42, -42, +7
fn integer_literal(input: &str) -> IResult<&str, &str> {
    recognize(pair(opt(one_of("+-")), digit1))(input)
}

/// Exponent part: e10, E-3, e+02
fn exponent(input: &str) -> IResult<&str, &str> {
    recognize(tuple((one_of("eE"), opt(one_of("+-")), digit1)))(input)
}

/// Float literal: 1.5, -0.25, 2., .5, 1e3, 1.5E-10
fn float_literal(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(one_of("+-")),
        alt((
            recognize(tuple((digit1, char('.'), opt(digit1)))),
            recognize(pair(char('.'), digit1)),
            digit1,
        )),
        opt(exponent),
    )))(input)
}

/// Recognize a whole token as a numeric literal.
///
/// Integer literals that overflow `i64` fall back to floats.
pub fn parse_number(token: &str) -> Option<Number> {
    let unsigned = token.strip_prefix('+').unwrap_or(token);

    if all_consuming(integer_literal)(token).is_ok() {
        if let Ok(value) = lexical_core::parse::<i64>(unsigned.as_bytes()) {
            return Some(Number::Integer(value));
        }
    }

    if all_consuming(float_literal)(token).is_ok() {
        return fast_float::parse::<f64, _>(unsigned).ok().map(Number::Float);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_line() {
        assert_eq!(classify_line("*PART"), LineKind::KeywordHeader);
        assert_eq!(classify_line("   *NODE"), LineKind::KeywordHeader);
        assert_eq!(classify_line("$# pid secid mid"), LineKind::Comment);
        assert_eq!(classify_line("  $ indented"), LineKind::Comment);
        assert_eq!(classify_line("       1       2"), LineKind::Data);
        assert_eq!(classify_line(""), LineKind::Data);
    }

    #[test]
    fn test_tokenize_mixed_separators() {
        let tokens: Vec<_> = tokenize("1,, 2\t3 ,4").collect();
        assert_eq!(tokens, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_tokenize_inline_comment() {
        let tokens: Vec<_> = tokenize("10 20 $ trailing note 30").collect();
        assert_eq!(tokens, vec!["10", "20"]);
        assert_eq!(tokenize("   ").count(), 0);
    }

    #[test]
    fn test_header_keyword() {
        assert_eq!(header_keyword("*part"), "*PART");
        assert_eq!(header_keyword("*SECTION_SHELL_TITLE $ shells"), "*SECTION_SHELL_TITLE");
        assert_eq!(header_keyword("*KEYWORD 64M"), "*KEYWORD");
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_number("42"), Some(Number::Integer(42)));
        assert_eq!(parse_number("-42"), Some(Number::Integer(-42)));
        assert_eq!(parse_number("+7"), Some(Number::Integer(7)));
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_number("3.25"), Some(Number::Float(3.25)));
        assert_eq!(parse_number("2."), Some(Number::Float(2.0)));
        assert_eq!(parse_number(".5"), Some(Number::Float(0.5)));
        assert_eq!(parse_number("1.5E-10"), Some(Number::Float(1.5e-10)));
        assert_eq!(parse_number("7e3"), Some(Number::Float(7000.0)));
    }

    #[test]
    fn test_parse_overflowing_integer_falls_back_to_float() {
        assert!(matches!(
            parse_number("99999999999999999999"),
            Some(Number::Float(_))
        ));
    }

    #[test]
    fn test_parse_non_numeric() {
        assert_eq!(parse_number("Part"), None);
        assert_eq!(parse_number("1.2.3"), None);
        assert_eq!(parse_number("e5"), None);
        assert_eq!(parse_number("nan"), None);
        assert_eq!(parse_number("-"), None);
    }
}
