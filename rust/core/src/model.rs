// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Canonical model builder
//!
//! Interprets Part, Section, Material, Node, Element and Mass blocks into
//! [`Entity`] records keyed by id within their [`Namespace`]. Ids that fail to
//! convert are skipped; later definitions of an id replace earlier ones.

use crate::deck::{Block, Deck, Line};
use crate::keyword::{KeywordKind, SectionKind};
use crate::value::{parse_identifier, parse_real, EntityId, FieldValue};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// How many lines after a header are searched for the identifying data line.
/// Comment lines count toward the window.
pub const LOOKAHEAD_LINES: usize = 4;

const PART_CARD: &[&str] = &["pid", "secid", "mid", "eosid", "hgid", "grav", "adpopt", "tmid"];
const MATERIAL_CARD: &[&str] = &["mid", "ro", "e", "pr"];
const NODE_CARD: &[&str] = &["nid", "x", "y", "z", "tc", "rc"];
const MASS_CARD: &[&str] = &["eid", "nid", "mass", "pid"];

/// Identifier namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Namespace {
    Part,
    Section,
    Material,
    Node,
    Element,
    MassElement,
}

impl Namespace {
    pub const ALL: [Namespace; 6] = [
        Namespace::Part,
        Namespace::Section,
        Namespace::Material,
        Namespace::Node,
        Namespace::Element,
        Namespace::MassElement,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Namespace::Part => "part",
            Namespace::Section => "section",
            Namespace::Material => "material",
            Namespace::Node => "node",
            Namespace::Element => "element",
            Namespace::MassElement => "mass-element",
        }
    }
}

/// Location of the identifying line of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Origin {
    /// Index into [`Deck::blocks`]
    pub block: usize,
    /// Index into [`Block::lines`]
    pub line: usize,
}

/// Typed, identified record derived from one or more data lines
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub namespace: Namespace,
    pub id: EntityId,
    /// Keyword of the block the entity came from
    pub keyword: String,
    /// Field name → value, in card order
    pub fields: Vec<(String, FieldValue)>,
    /// Section thickness-like attribute (first field of the second card)
    pub attribute: Option<f64>,
    pub origin: Origin,
}

impl Entity {
    /// Get field by name
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Get field by name as an identifier
    #[inline]
    pub fn identifier(&self, name: &str) -> Option<EntityId> {
        self.field(name).and_then(FieldValue::as_identifier)
    }

    /// Get field by name as text
    #[inline]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(FieldValue::as_text)
    }

    /// Identifiers found in positional fields after the first two
    /// (element connectivity)
    pub fn trailing_identifiers(&self) -> SmallVec<[EntityId; 8]> {
        self.fields
            .iter()
            .skip(2)
            .filter_map(|(_, value)| value.as_identifier())
            .collect()
    }
}

/// Scanner state for the cards of one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CardState {
    /// Searching for the identifying line; `remaining` lines left in the window
    AwaitingData { remaining: usize },
    /// Identifying line found; reading the following cards
    InData,
}

/// Identifying line plus the data lines passed over to reach it
struct Identified<'b> {
    index: usize,
    line: &'b Line,
    titles: Vec<&'b Line>,
}

/// Walks the lines of a block with the lookahead rule
struct CardScanner<'b> {
    lines: &'b [Line],
    pos: usize,
    state: CardState,
}

impl<'b> CardScanner<'b> {
    fn new(block: &'b Block) -> Self {
        Self {
            lines: block.lines(),
            pos: 0,
            state: CardState::AwaitingData {
                remaining: LOOKAHEAD_LINES,
            },
        }
    }

    /// Find the first data line within the window that `qualifies`
    fn identify(&mut self, qualifies: impl Fn(&Line) -> bool) -> Option<Identified<'b>> {
        let CardState::AwaitingData { mut remaining } = self.state else {
            return None;
        };

        let mut titles = Vec::new();
        while remaining > 0 && self.pos < self.lines.len() {
            let index = self.pos;
            let line = &self.lines[index];
            self.pos += 1;
            remaining -= 1;

            if line.is_comment() {
                continue;
            }
            if qualifies(line) {
                self.state = CardState::InData;
                return Some(Identified { index, line, titles });
            }
            titles.push(line);
        }

        self.state = CardState::AwaitingData { remaining };
        None
    }

    /// Next non-comment, non-blank line after the identifying line
    fn next_card(&mut self) -> Option<&'b Line> {
        if self.state != CardState::InData {
            return None;
        }
        while self.pos < self.lines.len() {
            let line = &self.lines[self.pos];
            self.pos += 1;
            if line.is_comment() || line.is_blank() {
                continue;
            }
            return Some(line);
        }
        None
    }
}

/// All entities of a deck
#[derive(Debug, Clone, Default)]
pub struct DeckModel {
    entities: FxHashMap<Namespace, FxHashMap<EntityId, Entity>>,
    overrides: usize,
}

impl DeckModel {
    /// Interpret every recognized block of a deck
    pub fn build(deck: &Deck) -> Self {
        let mut model = Self::default();

        for (block_index, block) in deck.blocks().iter().enumerate() {
            match block.kind() {
                KeywordKind::Part => model.read_part(block_index, block),
                KeywordKind::Section(kind) => model.read_section(block_index, block, *kind),
                KeywordKind::Material => model.read_material(block_index, block),
                KeywordKind::Node => {
                    model.read_list(block_index, block, Namespace::Node, |i| named(NODE_CARD, i))
                }
                KeywordKind::Element(_) => {
                    model.read_list(block_index, block, Namespace::Element, element_field_name)
                }
                KeywordKind::MassElement => model.read_list(
                    block_index,
                    block,
                    Namespace::MassElement,
                    |i| named(MASS_CARD, i),
                ),
                KeywordKind::DeckOpen | KeywordKind::DeckClose | KeywordKind::Unrecognized(_) => {}
            }
        }

        model
    }

    /// Insert an entity; a later definition of the same id replaces the earlier one
    pub fn insert(&mut self, entity: Entity) {
        let replaced = self
            .entities
            .entry(entity.namespace)
            .or_default()
            .insert(entity.id, entity);
        if replaced.is_some() {
            self.overrides += 1;
        }
    }

    #[inline]
    pub fn get(&self, namespace: Namespace, id: EntityId) -> Option<&Entity> {
        self.entities.get(&namespace)?.get(&id)
    }

    #[inline]
    pub fn contains(&self, namespace: Namespace, id: EntityId) -> bool {
        self.get(namespace, id).is_some()
    }

    /// Entities of a namespace in arbitrary order
    pub fn entities(&self, namespace: Namespace) -> impl Iterator<Item = &Entity> + '_ {
        self.entities
            .get(&namespace)
            .into_iter()
            .flat_map(|map| map.values())
    }

    /// Entities of a namespace in source order
    pub fn sorted(&self, namespace: Namespace) -> Vec<&Entity> {
        let mut entities: Vec<_> = self.entities(namespace).collect();
        entities.sort_by_key(|e| e.origin);
        entities
    }

    /// Ids of a namespace in ascending order
    pub fn ids(&self, namespace: Namespace) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.entities(namespace).map(|e| e.id).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self, namespace: Namespace) -> usize {
        self.entities.get(&namespace).map_or(0, |map| map.len())
    }

    /// Number of entities across all namespaces
    pub fn total(&self) -> usize {
        self.entities.values().map(|map| map.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// How many definitions were replaced by a later one with the same id
    pub fn overrides(&self) -> usize {
        self.overrides
    }

    fn read_part(&mut self, block_index: usize, block: &Block) {
        // A heading may itself start with a number; prefer a line whose pid
        // and secid both convert.
        let mut scanner = CardScanner::new(block);
        let mut identified = scanner.identify(has_part_card);
        if identified.is_none() {
            scanner = CardScanner::new(block);
            identified = scanner.identify(has_identifier);
        }
        let Some(identified) = identified else {
            return;
        };
        let Some(id) = first_identifier(identified.line) else {
            return;
        };

        let mut fields = Vec::new();
        if let Some(heading) = identified.titles.first() {
            fields.push((
                "heading".to_string(),
                FieldValue::Text(heading.raw().trim().to_string()),
            ));
        }
        fields.extend(card_fields(identified.line, 0, |i| named(PART_CARD, i)));
        let mut card = 1;
        while let Some(line) = scanner.next_card() {
            fields.extend(card_fields(line, card, |_| None));
            card += 1;
        }

        self.insert(Entity {
            namespace: Namespace::Part,
            id,
            keyword: block.keyword().to_string(),
            fields,
            attribute: None,
            origin: Origin {
                block: block_index,
                line: identified.index,
            },
        });
    }

    fn read_section(&mut self, block_index: usize, block: &Block, kind: SectionKind) {
        let mut scanner = CardScanner::new(block);
        let Some(identified) = scanner.identify(has_identifier) else {
            return;
        };
        let Some(id) = first_identifier(identified.line) else {
            return;
        };

        let (first, second) = section_cards(kind);
        let mut fields = title_field(&identified.titles);
        fields.extend(card_fields(identified.line, 0, |i| named(first, i)));

        let mut attribute = None;
        if let Some(line) = scanner.next_card() {
            attribute = line.token(0).and_then(parse_real);
            fields.extend(card_fields(line, 1, |i| named(second, i)));
        }
        let mut card = 2;
        while let Some(line) = scanner.next_card() {
            fields.extend(card_fields(line, card, |_| None));
            card += 1;
        }

        self.insert(Entity {
            namespace: Namespace::Section,
            id,
            keyword: block.keyword().to_string(),
            fields,
            attribute,
            origin: Origin {
                block: block_index,
                line: identified.index,
            },
        });
    }

    fn read_material(&mut self, block_index: usize, block: &Block) {
        let mut scanner = CardScanner::new(block);
        let Some(identified) = scanner.identify(has_identifier) else {
            return;
        };
        let Some(id) = first_identifier(identified.line) else {
            return;
        };

        let mut fields = title_field(&identified.titles);
        fields.extend(card_fields(identified.line, 0, |i| named(MATERIAL_CARD, i)));
        let mut card = 1;
        while let Some(line) = scanner.next_card() {
            fields.extend(card_fields(line, card, |_| None));
            card += 1;
        }

        self.insert(Entity {
            namespace: Namespace::Material,
            id,
            keyword: block.keyword().to_string(),
            fields,
            attribute: None,
            origin: Origin {
                block: block_index,
                line: identified.index,
            },
        });
    }

    /// One entity per data line (nodes, elements, mass elements)
    fn read_list(
        &mut self,
        block_index: usize,
        block: &Block,
        namespace: Namespace,
        name: impl Fn(usize) -> Option<String>,
    ) {
        for (line_index, line) in block.data_lines() {
            let Some(id) = first_identifier(line) else {
                continue;
            };
            self.insert(Entity {
                namespace,
                id,
                keyword: block.keyword().to_string(),
                fields: card_fields(line, 0, &name).collect(),
                attribute: None,
                origin: Origin {
                    block: block_index,
                    line: line_index,
                },
            });
        }
    }
}

#[inline]
fn first_identifier(line: &Line) -> Option<EntityId> {
    line.token(0).and_then(parse_identifier)
}

#[inline]
fn has_identifier(line: &Line) -> bool {
    first_identifier(line).is_some()
}

/// First two tokens are both identifiers
#[inline]
fn has_part_card(line: &Line) -> bool {
    let mut ids = line.tokens().take(2).map(parse_identifier);
    matches!((ids.next(), ids.next()), (Some(Some(_)), Some(Some(_))))
}

#[inline]
fn named(card: &[&str], index: usize) -> Option<String> {
    card.get(index).map(|s| s.to_string())
}

fn element_field_name(index: usize) -> Option<String> {
    match index {
        0 => Some("eid".to_string()),
        1 => Some("pid".to_string()),
        n => Some(format!("n{}", n - 1)),
    }
}

fn section_cards(kind: SectionKind) -> (&'static [&'static str], &'static [&'static str]) {
    match kind {
        SectionKind::Shell => (
            &["secid", "elform", "shrf", "nip", "propt", "qr", "icomp", "setyp"],
            &["t1", "t2", "t3", "t4", "nloc", "marea", "idof", "edgset"],
        ),
        SectionKind::Beam => (
            &["secid", "elform", "shrf", "qr", "cst", "scoor", "nsm"],
            &["ts1", "ts2", "tt1", "tt2", "nsloc", "ntloc"],
        ),
        SectionKind::Solid => (&["secid", "elform", "aet"], &[]),
        SectionKind::Discrete => (&["secid", "dro", "kd", "v0", "cl", "fd"], &["cdl", "tdl"]),
    }
}

fn title_field(titles: &[&Line]) -> Vec<(String, FieldValue)> {
    titles
        .first()
        .map(|line| {
            (
                "title".to_string(),
                FieldValue::Text(line.raw().trim().to_string()),
            )
        })
        .into_iter()
        .collect()
}

/// Name the fields of one card; unnamed positions become `c<card>_<index>`
fn card_fields<'l>(
    line: &'l Line,
    card: usize,
    name: impl Fn(usize) -> Option<String> + 'l,
) -> impl Iterator<Item = (String, FieldValue)> + 'l {
    line.fields().iter().enumerate().map(move |(index, value)| {
        let field = name(index).unwrap_or_else(|| format!("c{}_{}", card, index));
        (field, value.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(text: &str) -> DeckModel {
        DeckModel::build(&Deck::parse(text))
    }

    #[test]
    fn test_part_with_heading() {
        let m = model(
            "*PART\n$# title\nDoor inner panel\n$#  pid secid mid\n  1  10  100\n*END\n",
        );
        let part = m.get(Namespace::Part, 1).unwrap();
        assert_eq!(part.text("heading"), Some("Door inner panel"));
        assert_eq!(part.identifier("secid"), Some(10));
        assert_eq!(part.identifier("mid"), Some(100));
        assert_eq!(part.origin, Origin { block: 0, line: 3 });
    }

    #[test]
    fn test_part_garbage_fields_are_unset() {
        let m = model("*PART\nBracket\n 7 abc\n");
        let part = m.get(Namespace::Part, 7).unwrap();
        assert_eq!(part.identifier("secid"), None);
        assert_eq!(part.identifier("mid"), None);
    }

    #[test]
    fn test_part_heading_starting_with_number() {
        let m = model(
            "*PART\n1001 B-PILLAR\n 7 10 100\n*SECTION_SHELL\n 10 2\n 1.5 1.5 1.5 1.5\n",
        );
        assert_eq!(m.ids(Namespace::Part), vec![7]);
        let part = m.get(Namespace::Part, 7).unwrap();
        assert_eq!(part.text("heading"), Some("1001 B-PILLAR"));
        assert_eq!(part.identifier("secid"), Some(10));
        assert_eq!(part.identifier("mid"), Some(100));
    }

    #[test]
    fn test_part_outside_lookahead_window_is_ignored() {
        let m = model("*PART\n$ a\n$ b\n$ c\nheading\n 1 2 3\n");
        assert_eq!(m.len(Namespace::Part), 0);
    }

    #[test]
    fn test_section_thickness_from_next_card() {
        let m = model(
            "*SECTION_SHELL\n$# secid elform\n  10  2\n$#  t1  t2  t3  t4\n  1.5 1.5 1.5 1.5\n",
        );
        let section = m.get(Namespace::Section, 10).unwrap();
        assert_eq!(section.attribute, Some(1.5));
        assert_eq!(section.field("t1"), Some(&FieldValue::Float(1.5)));
        assert_eq!(section.field("elform"), Some(&FieldValue::Integer(2)));
    }

    #[test]
    fn test_section_title_variant() {
        let m = model("*SECTION_BEAM_TITLE\nmain rail\n 20 1\n 3.0 3.0\n");
        let section = m.get(Namespace::Section, 20).unwrap();
        assert_eq!(section.text("title"), Some("main rail"));
        assert_eq!(section.attribute, Some(3.0));
    }

    #[test]
    fn test_section_without_second_card() {
        let m = model("*SECTION_SOLID\n 30 1\n*END\n");
        assert_eq!(m.get(Namespace::Section, 30).unwrap().attribute, None);
    }

    #[test]
    fn test_material_id() {
        let m = model("*MAT_ELASTIC\n$# mid ro e pr\n 100 7.85e-9 210000.0 0.3\n");
        let mat = m.get(Namespace::Material, 100).unwrap();
        assert_eq!(mat.field("e"), Some(&FieldValue::Float(210000.0)));
    }

    #[test]
    fn test_nodes_one_per_line() {
        let m = model("*NODE\n 5 0.0 0.0 0.0\n$ c\n 6 1.0 0.0 0.0\n bad 1 1 1\n");
        assert_eq!(m.ids(Namespace::Node), vec![5, 6]);
        assert_eq!(
            m.get(Namespace::Node, 6).unwrap().field("x"),
            Some(&FieldValue::Float(1.0))
        );
    }

    #[test]
    fn test_elements_and_mass() {
        let m = model(
            "*ELEMENT_SHELL\n 1 1 5 6 7 8\n*ELEMENT_MASS\n 90 5 0.25\n",
        );
        let element = m.get(Namespace::Element, 1).unwrap();
        assert_eq!(element.identifier("pid"), Some(1));
        assert_eq!(element.trailing_identifiers().as_slice(), &[5, 6, 7, 8]);
        assert_eq!(m.get(Namespace::MassElement, 90).unwrap().identifier("nid"), Some(5));
    }

    #[test]
    fn test_duplicate_id_last_wins() {
        let m = model("*PART\nfirst\n 1 10 100\n*PART\nsecond\n 1 20 100\n");
        assert_eq!(m.len(Namespace::Part), 1);
        assert_eq!(m.overrides(), 1);
        assert_eq!(m.get(Namespace::Part, 1).unwrap().identifier("secid"), Some(20));
    }

    #[test]
    fn test_unknown_keywords_produce_no_entities() {
        let m = model("*CONTROL_TERMINATION\n 1.0\n*DATABASE_GLSTAT\n 0.1\n");
        assert!(m.is_empty());
    }
}
