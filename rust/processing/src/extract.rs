// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extraction engine
//!
//! Selects Parts by predicate, closes the selection over the cross-reference
//! graph and emits a new deck holding only the retained records.
//!
//! Emitted layout: deck-open marker with a provenance comment, Nodes, Element
//! blocks (one per element keyword, in first-appearance order), Mass elements,
//! then the retained Part blocks, Section blocks and Material blocks (each group
//! in source order), and the deck-close marker. Any other block is dropped.

use deck_lite_core::{
    Block, CrossReferenceGraph, Deck, DeckModel, EntityId, Line, Namespace, DECK_CLOSE,
    DECK_OPEN,
};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

/// Retained ids per namespace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub parts: FxHashSet<EntityId>,
    pub sections: FxHashSet<EntityId>,
    pub materials: FxHashSet<EntityId>,
    pub elements: FxHashSet<EntityId>,
    pub nodes: FxHashSet<EntityId>,
    pub mass_elements: FxHashSet<EntityId>,
}

impl Selection {
    /// Compute the referential closure of the Parts accepted by `predicate`.
    ///
    /// Section, Material and Node ids come from the graph and may name
    /// entities absent from the model; those never produce output records.
    pub fn resolve(
        model: &DeckModel,
        graph: &CrossReferenceGraph,
        predicate: impl Fn(EntityId) -> bool,
    ) -> Self {
        let mut selection = Self::default();

        for part in model.entities(Namespace::Part) {
            if predicate(part.id) {
                selection.parts.insert(part.id);
            }
        }

        for &part in &selection.parts {
            if let Some(secid) = graph.section_of(part) {
                selection.sections.insert(secid);
            }
            if let Some(mid) = graph.material_of(part) {
                selection.materials.insert(mid);
            }
        }

        for element in model.entities(Namespace::Element) {
            let owned = graph
                .part_of(element.id)
                .is_some_and(|pid| selection.parts.contains(&pid));
            if owned {
                selection.elements.insert(element.id);
                selection.nodes.extend(graph.nodes_of(element.id));
            }
        }

        for mass in model.entities(Namespace::MassElement) {
            let touches = graph
                .node_of_mass(mass.id)
                .is_some_and(|nid| selection.nodes.contains(&nid));
            if touches {
                selection.mass_elements.insert(mass.id);
            }
        }

        selection
    }

    /// Whether an entity of `namespace` survives
    pub fn contains(&self, namespace: Namespace, id: EntityId) -> bool {
        let set = match namespace {
            Namespace::Part => &self.parts,
            Namespace::Section => &self.sections,
            Namespace::Material => &self.materials,
            Namespace::Node => &self.nodes,
            Namespace::Element => &self.elements,
            Namespace::MassElement => &self.mass_elements,
        };
        set.contains(&id)
    }
}

/// Record counts of an extracted deck
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionCounts {
    pub parts: usize,
    pub sections: usize,
    pub materials: usize,
    pub elements: usize,
    pub nodes: usize,
    pub mass_elements: usize,
}

/// Filtered deck plus what was kept
#[derive(Debug, Clone)]
pub struct Extraction {
    pub deck: Deck,
    pub selection: Selection,
    pub counts: ExtractionCounts,
}

impl Extraction {
    /// True when the predicate matched no Part
    pub fn is_empty(&self) -> bool {
        self.selection.parts.is_empty()
    }
}

/// Filter a deck down to the Parts accepted by `predicate` and everything
/// they reference.
pub fn extract(deck: &Deck, predicate: impl Fn(EntityId) -> bool) -> Extraction {
    let model = DeckModel::build(deck);
    let graph = CrossReferenceGraph::build(&model);
    let selection = Selection::resolve(&model, &graph, predicate);

    let mut counts = ExtractionCounts::default();
    let mut blocks = vec![Block::with_lines(
        DECK_OPEN,
        vec![Line::new(format!("$ Extracted from {}", deck.source_name()))],
    )];

    let list_groups = [
        (Namespace::Node, &mut counts.nodes),
        (Namespace::Element, &mut counts.elements),
        (Namespace::MassElement, &mut counts.mass_elements),
    ];
    for (namespace, count) in list_groups {
        for block in rebuild_list_blocks(deck, &model, &selection, namespace) {
            *count += block.data_lines().count();
            blocks.push(block);
        }
    }

    let whole_groups = [
        (Namespace::Part, &mut counts.parts),
        (Namespace::Section, &mut counts.sections),
        (Namespace::Material, &mut counts.materials),
    ];
    for (namespace, count) in whole_groups {
        let mut kept: Vec<usize> = model
            .entities(namespace)
            .filter(|entity| selection.contains(namespace, entity.id))
            .map(|entity| entity.origin.block)
            .collect();
        kept.sort_unstable();
        kept.dedup();
        *count += kept.len();
        blocks.extend(kept.into_iter().map(|index| deck.blocks()[index].clone()));
    }

    blocks.push(Block::new(DECK_CLOSE));

    tracing::debug!(
        source = %deck.source_name(),
        parts = counts.parts,
        elements = counts.elements,
        nodes = counts.nodes,
        "Extraction complete"
    );

    Extraction {
        deck: Deck::new(deck.source().map(|p| p.to_path_buf()), blocks),
        selection,
        counts,
    }
}

/// One block per keyword holding the surviving entities of a list namespace.
///
/// Each block reuses the header and leading comments of the first source block
/// with that keyword. Entities appear in source order.
fn rebuild_list_blocks(
    deck: &Deck,
    model: &DeckModel,
    selection: &Selection,
    namespace: Namespace,
) -> Vec<Block> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: FxHashMap<&str, Vec<Line>> = FxHashMap::default();

    for entity in model.sorted(namespace) {
        if !selection.contains(namespace, entity.id) {
            continue;
        }
        let source = &deck.blocks()[entity.origin.block];
        let keyword = source.keyword();
        let lines = groups.entry(keyword).or_insert_with(|| {
            order.push(keyword);
            let first = deck
                .blocks()
                .iter()
                .find(|b| b.keyword() == keyword)
                .unwrap_or(source);
            leading_comments(first)
        });
        lines.push(source.lines()[entity.origin.line].clone());
    }

    // Keyword order follows the first source block of each keyword.
    order.sort_by_key(|keyword| {
        deck.blocks()
            .iter()
            .position(|b| b.keyword() == *keyword)
            .unwrap_or(usize::MAX)
    });

    order
        .into_iter()
        .filter_map(|keyword| {
            let lines = groups.remove(keyword)?;
            let first = deck.blocks().iter().find(|b| b.keyword() == keyword)?;
            Some(Block::with_lines(first.header().unwrap_or(keyword), lines))
        })
        .collect()
}

/// Comment lines before the first data line
fn leading_comments(block: &Block) -> Vec<Line> {
    block
        .lines()
        .iter()
        .take_while(|line| line.is_comment())
        .cloned()
        .collect()
}
