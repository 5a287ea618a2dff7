// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Deck parser and emitter
//!
//! A [`Deck`] is the ordered list of [`Block`]s of one keyword file. Parsing
//! never fails: text before the first header becomes a preamble block with an
//! empty keyword, and unknown keywords are kept verbatim so the deck can be
//! written back out.

use crate::error::{Error, Result};
use crate::keyword::KeywordKind;
use crate::lexer::{classify_line, header_keyword, tokenize, LineKind};
use crate::value::FieldValue;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Deck-open marker written at the top of emitted decks
pub const DECK_OPEN: &str = "*KEYWORD";

/// Deck-close marker written at the bottom of emitted decks
pub const DECK_CLOSE: &str = "*END";

/// One raw line of a block with lazily tokenized fields
#[derive(Debug, Clone)]
pub struct Line {
    raw: String,
    kind: LineKind,
    fields: OnceLock<Vec<FieldValue>>,
}

impl Line {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let kind = classify_line(&raw);
        Self {
            raw,
            kind,
            fields: OnceLock::new(),
        }
    }

    #[inline]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[inline]
    pub fn kind(&self) -> LineKind {
        self.kind
    }

    #[inline]
    pub fn is_comment(&self) -> bool {
        self.kind == LineKind::Comment
    }

    /// Data line with no tokens
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.kind == LineKind::Data && self.tokens().next().is_none()
    }

    /// Raw tokens, inline comments removed
    #[inline]
    pub fn tokens(&self) -> impl Iterator<Item = &str> + '_ {
        tokenize(&self.raw)
    }

    /// Raw token at a position
    #[inline]
    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens().nth(index)
    }

    /// Typed fields, converted on first access
    pub fn fields(&self) -> &[FieldValue] {
        self.fields
            .get_or_init(|| self.tokens().map(FieldValue::from_token).collect())
    }
}

impl PartialEq for Line {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

/// Position of a block in its source, as 0-based line numbers (end exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A keyword header plus the comment and data lines that follow it
#[derive(Debug, Clone)]
pub struct Block {
    keyword: String,
    kind: KeywordKind,
    header: Option<String>,
    lines: Vec<Line>,
    span: Option<Span>,
}

impl Block {
    /// Block opened by a header line
    pub fn new(header: impl Into<String>) -> Self {
        let header = header.into();
        let keyword = header_keyword(&header);
        let kind = KeywordKind::classify(&keyword);
        Self {
            keyword,
            kind,
            header: Some(header),
            lines: Vec::new(),
            span: None,
        }
    }

    /// Block for text that precedes the first header
    pub fn preamble() -> Self {
        Self {
            keyword: String::new(),
            kind: KeywordKind::Unrecognized(String::new()),
            header: None,
            lines: Vec::new(),
            span: None,
        }
    }

    /// Block built from a header and lines, with no source position
    pub fn with_lines(header: impl Into<String>, lines: Vec<Line>) -> Self {
        let mut block = Self::new(header);
        block.lines = lines;
        block
    }

    pub fn push(&mut self, line: Line) {
        self.lines.push(line);
    }

    /// Uppercase keyword name, `""` for the preamble
    #[inline]
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    #[inline]
    pub fn kind(&self) -> &KeywordKind {
        &self.kind
    }

    /// Raw header line, `None` for the preamble
    #[inline]
    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    #[inline]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    #[inline]
    pub fn span(&self) -> Option<Span> {
        self.span
    }

    /// True for the block holding text before the first header
    #[inline]
    pub fn is_preamble(&self) -> bool {
        self.header.is_none()
    }

    /// Non-comment lines with their index in [`Block::lines`]
    pub fn data_lines(&self) -> impl Iterator<Item = (usize, &Line)> + '_ {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| !line.is_comment())
    }

    /// Write header and lines, one per output line
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if let Some(header) = &self.header {
            writeln!(out, "{}", header)?;
        }
        self.write_lines(out)
    }

    /// Write the lines without the header
    pub fn write_lines<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for line in &self.lines {
            writeln!(out, "{}", line.raw())?;
        }
        Ok(())
    }
}

impl PartialEq for Block {
    // Source position is provenance, not content.
    fn eq(&self, other: &Self) -> bool {
        self.keyword == other.keyword && self.header == other.header && self.lines == other.lines
    }
}

/// Parser state while splitting text into blocks
enum ParseState {
    /// Before the first header line
    AwaitingHeader(Block),
    /// Collecting lines of the current block
    InBlock(Block),
}

/// Parsed keyword file
#[derive(Debug, Clone, PartialEq)]
pub struct Deck {
    source: Option<PathBuf>,
    blocks: Vec<Block>,
}

impl Deck {
    /// Assemble a deck from blocks
    pub fn new(source: Option<PathBuf>, blocks: Vec<Block>) -> Self {
        Self { source, blocks }
    }

    /// Parse deck text. Never fails.
    pub fn parse(text: &str) -> Self {
        let mut blocks = Vec::new();
        let mut state = ParseState::AwaitingHeader(Block::preamble());

        for (index, raw) in text.lines().enumerate() {
            let line = Line::new(raw);
            let is_header = line.kind() == LineKind::KeywordHeader;

            state = match state {
                ParseState::AwaitingHeader(mut preamble) if is_header => {
                    if !preamble.lines.is_empty() {
                        preamble.span = Some(Span { start: 0, end: index });
                        blocks.push(preamble);
                    }
                    ParseState::InBlock(open_block(raw, index))
                }
                ParseState::AwaitingHeader(mut preamble) => {
                    preamble.push(line);
                    ParseState::AwaitingHeader(preamble)
                }
                ParseState::InBlock(block) if is_header => {
                    blocks.push(close_block(block, index));
                    ParseState::InBlock(open_block(raw, index))
                }
                ParseState::InBlock(mut block) => {
                    block.push(line);
                    ParseState::InBlock(block)
                }
            };
        }

        let line_count = text.lines().count();
        match state {
            ParseState::AwaitingHeader(mut preamble) => {
                if !preamble.lines.is_empty() {
                    preamble.span = Some(Span {
                        start: 0,
                        end: line_count,
                    });
                    blocks.push(preamble);
                }
            }
            ParseState::InBlock(block) => blocks.push(close_block(block, line_count)),
        }

        Self {
            source: None,
            blocks,
        }
    }

    /// Parse deck text and record where it came from
    pub fn parse_with_source(text: &str, source: impl Into<PathBuf>) -> Self {
        let mut deck = Self::parse(text);
        deck.source = Some(source.into());
        deck
    }

    #[inline]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// File name of the source, for provenance comments and reports
    pub fn source_name(&self) -> String {
        self.source
            .as_deref()
            .and_then(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "<memory>".to_string())
    }

    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    /// Keyword names present, excluding sentinels and the preamble
    pub fn keywords(&self) -> BTreeSet<&str> {
        self.blocks
            .iter()
            .filter(|b| !b.is_preamble() && !b.kind().is_sentinel())
            .map(|b| b.keyword())
            .collect()
    }

    /// True when no content blocks were found
    pub fn is_empty(&self) -> bool {
        self.keywords().is_empty()
    }

    /// Write the deck as keyword text. The open marker always comes first,
    /// followed by any preamble text; later open markers are dropped. The
    /// close marker is added when the blocks do not already end with one.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let opener = self
            .blocks
            .iter()
            .find(|b| *b.kind() == KeywordKind::DeckOpen);
        writeln!(
            out,
            "{}",
            opener.and_then(Block::header).unwrap_or(DECK_OPEN)
        )?;
        for block in self.blocks.iter().filter(|b| b.is_preamble()) {
            block.write_lines(out)?;
        }
        if let Some(opener) = opener {
            opener.write_lines(out)?;
        }
        for block in &self.blocks {
            if block.is_preamble() || *block.kind() == KeywordKind::DeckOpen {
                continue;
            }
            block.write_to(out)?;
        }

        let closes = self
            .blocks
            .last()
            .is_some_and(|b| *b.kind() == KeywordKind::DeckClose);
        if !closes {
            writeln!(out, "{}", DECK_CLOSE)?;
        }
        Ok(())
    }

    /// Emit as a string
    pub fn to_text(&self) -> String {
        let mut out = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut out);
        String::from_utf8_lossy(&out).into_owned()
    }
}

fn open_block(raw: &str, index: usize) -> Block {
    let mut block = Block::new(raw);
    block.span = Some(Span {
        start: index,
        end: index + 1,
    });
    block
}

fn close_block(mut block: Block, end: usize) -> Block {
    if let Some(span) = block.span.as_mut() {
        span.end = end;
    }
    block
}

/// Read and parse a deck file.
///
/// Invalid UTF-8 sequences are replaced rather than rejected.
pub fn read_deck(path: impl AsRef<Path>) -> Result<Deck> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let len = file.metadata().map_err(|e| Error::io(path, e))?.len();
    if len == 0 {
        return Ok(Deck::parse_with_source("", path));
    }

    // SAFETY: the mapping is read-only and dropped before this function returns.
    let map = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| Error::io(path, e))?;
    let text = String::from_utf8_lossy(&map);
    Ok(Deck::parse_with_source(&text, path))
}
