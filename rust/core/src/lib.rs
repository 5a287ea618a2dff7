// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Deck-Lite Core
//!
//! Tolerant parser and canonical model for keyword-format simulation decks
//! (`*KEYWORD` ... `*END`), built with [nom](https://docs.rs/nom).
//!
//! ## Overview
//!
//! - **Lexing**: line classification and comma/whitespace tokenization
//! - **Deck**: ordered blocks that preserve raw text for byte-faithful output
//! - **Model**: Part, Section, Material, Node, Element and Mass entities keyed by id
//! - **Graph**: cross references between entities, with dangling edges reported
//!
//! Parsing never fails on malformed content: unknown keywords pass through,
//! unparseable ids are skipped and garbage fields stay as text.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use deck_lite_core::{read_deck, CrossReferenceGraph, DeckModel, Namespace};
//!
//! let deck = read_deck("model.k")?;
//! let model = DeckModel::build(&deck);
//! let graph = CrossReferenceGraph::build(&model);
//!
//! for part in model.sorted(Namespace::Part) {
//!     println!("part {} uses section {:?}", part.id, graph.section_of(part.id));
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization support for model types

pub mod deck;
pub mod error;
pub mod graph;
pub mod keyword;
pub mod lexer;
pub mod model;
pub mod value;

pub use deck::{read_deck, Block, Deck, Line, Span, DECK_CLOSE, DECK_OPEN};
pub use error::{Error, Result};
pub use graph::{CrossReferenceGraph, EdgeKind, EdgeStats};
pub use keyword::{ElementKind, KeywordKind, SectionKind};
pub use lexer::{classify_line, tokenize, LineKind};
pub use model::{DeckModel, Entity, Namespace, Origin, LOOKAHEAD_LINES};
pub use value::{parse_identifier, parse_real, EntityId, FieldValue};
