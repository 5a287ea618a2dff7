// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cross-reference graph between entities
//!
//! Edges are recorded as written in the deck; a target may be missing from the
//! model (dangling reference). Dangling edges are reported, never fatal.

use crate::model::{DeckModel, Namespace};
use crate::value::EntityId;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Kind of reference between two entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EdgeKind {
    PartSection,
    PartMaterial,
    ElementPart,
    ElementNode,
    MassNode,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 5] = [
        EdgeKind::PartSection,
        EdgeKind::PartMaterial,
        EdgeKind::ElementPart,
        EdgeKind::ElementNode,
        EdgeKind::MassNode,
    ];

    /// Namespace the edge points into
    pub fn target(&self) -> Namespace {
        match self {
            EdgeKind::PartSection => Namespace::Section,
            EdgeKind::PartMaterial => Namespace::Material,
            EdgeKind::ElementPart => Namespace::Part,
            EdgeKind::ElementNode | EdgeKind::MassNode => Namespace::Node,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EdgeKind::PartSection => "part->section",
            EdgeKind::PartMaterial => "part->material",
            EdgeKind::ElementPart => "element->part",
            EdgeKind::ElementNode => "element->node",
            EdgeKind::MassNode => "mass->node",
        }
    }
}

/// Edge counts for one kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeStats {
    pub total: usize,
    pub dangling: usize,
}

/// References between the entities of one model
#[derive(Debug, Clone, Default)]
pub struct CrossReferenceGraph {
    part_to_section: FxHashMap<EntityId, EntityId>,
    part_to_material: FxHashMap<EntityId, EntityId>,
    element_to_part: FxHashMap<EntityId, EntityId>,
    element_to_nodes: FxHashMap<EntityId, SmallVec<[EntityId; 8]>>,
    mass_to_node: FxHashMap<EntityId, EntityId>,
}

impl CrossReferenceGraph {
    /// Collect edges from a model. Unset references produce no edge.
    pub fn build(model: &DeckModel) -> Self {
        let mut graph = Self::default();

        for part in model.entities(Namespace::Part) {
            if let Some(secid) = part.identifier("secid") {
                graph.part_to_section.insert(part.id, secid);
            }
            if let Some(mid) = part.identifier("mid") {
                graph.part_to_material.insert(part.id, mid);
            }
        }

        for element in model.entities(Namespace::Element) {
            if let Some(pid) = element.identifier("pid") {
                graph.element_to_part.insert(element.id, pid);
            }
            let nodes = element.trailing_identifiers();
            if !nodes.is_empty() {
                graph.element_to_nodes.insert(element.id, nodes);
            }
        }

        for mass in model.entities(Namespace::MassElement) {
            if let Some(nid) = mass.identifier("nid") {
                graph.mass_to_node.insert(mass.id, nid);
            }
        }

        graph
    }

    #[inline]
    pub fn section_of(&self, part: EntityId) -> Option<EntityId> {
        self.part_to_section.get(&part).copied()
    }

    #[inline]
    pub fn material_of(&self, part: EntityId) -> Option<EntityId> {
        self.part_to_material.get(&part).copied()
    }

    #[inline]
    pub fn part_of(&self, element: EntityId) -> Option<EntityId> {
        self.element_to_part.get(&element).copied()
    }

    /// Node ids of an element, in connectivity order
    pub fn nodes_of(&self, element: EntityId) -> &[EntityId] {
        self.element_to_nodes
            .get(&element)
            .map(|nodes| nodes.as_slice())
            .unwrap_or(&[])
    }

    #[inline]
    pub fn node_of_mass(&self, mass: EntityId) -> Option<EntityId> {
        self.mass_to_node.get(&mass).copied()
    }

    /// Every edge of a kind as (source, target) pairs
    pub fn edges(&self, kind: EdgeKind) -> Vec<(EntityId, EntityId)> {
        let single = |map: &FxHashMap<EntityId, EntityId>| -> Vec<(EntityId, EntityId)> {
            map.iter().map(|(from, to)| (*from, *to)).collect()
        };
        match kind {
            EdgeKind::PartSection => single(&self.part_to_section),
            EdgeKind::PartMaterial => single(&self.part_to_material),
            EdgeKind::ElementPart => single(&self.element_to_part),
            EdgeKind::MassNode => single(&self.mass_to_node),
            EdgeKind::ElementNode => self
                .element_to_nodes
                .iter()
                .flat_map(|(from, nodes)| nodes.iter().map(move |to| (*from, *to)))
                .collect(),
        }
    }

    /// Edge counts against the entities present in `model`
    pub fn stats(&self, kind: EdgeKind, model: &DeckModel) -> EdgeStats {
        let target = kind.target();
        let edges = self.edges(kind);
        EdgeStats {
            total: edges.len(),
            dangling: edges
                .iter()
                .filter(|(_, to)| !model.contains(target, *to))
                .count(),
        }
    }

    /// Dangling edges of a kind, sorted by source then target
    pub fn dangling(&self, kind: EdgeKind, model: &DeckModel) -> Vec<(EntityId, EntityId)> {
        let target = kind.target();
        let mut edges: Vec<_> = self
            .edges(kind)
            .into_iter()
            .filter(|(_, to)| !model.contains(target, *to))
            .collect();
        edges.sort_unstable();
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::Deck;

    const DECK: &str = "\
*KEYWORD
*PART
Panel
 1 10 100
*PART
Bracket
 2 11 100
*SECTION_SHELL
 10 2
 1.2 1.2 1.2 1.2
*MAT_ELASTIC
 100 7.85e-9 210000.0 0.3
*NODE
 5 0.0 0.0 0.0
 6 1.0 0.0 0.0
 7 1.0 1.0 0.0
*ELEMENT_SHELL
 1 1 5 6 7 8
*ELEMENT_MASS
 90 6 0.5
*END
";

    fn build() -> (DeckModel, CrossReferenceGraph) {
        let model = DeckModel::build(&Deck::parse(DECK));
        let graph = CrossReferenceGraph::build(&model);
        (model, graph)
    }

    #[test]
    fn test_edges_follow_fields() {
        let (_, graph) = build();
        assert_eq!(graph.section_of(1), Some(10));
        assert_eq!(graph.material_of(2), Some(100));
        assert_eq!(graph.part_of(1), Some(1));
        assert_eq!(graph.nodes_of(1), &[5, 6, 7, 8]);
        assert_eq!(graph.node_of_mass(90), Some(6));
        assert!(graph.nodes_of(42).is_empty());
    }

    #[test]
    fn test_dangling_references_reported() {
        let (model, graph) = build();
        assert_eq!(graph.dangling(EdgeKind::PartSection, &model), vec![(2, 11)]);
        assert_eq!(graph.dangling(EdgeKind::ElementNode, &model), vec![(1, 8)]);
        assert!(graph.dangling(EdgeKind::PartMaterial, &model).is_empty());

        let stats = graph.stats(EdgeKind::ElementNode, &model);
        assert_eq!(stats, EdgeStats { total: 4, dangling: 1 });
    }
}
