use std::collections::{HashMap, HashSet};

use tracing::trace;

use super::alignment::Alignment;
use super::types::{Position, Rect};
use crate::config::LayoutConfig;
use crate::ir::{GraphSnapshot, NodeRecord};

/// Index of a node in its selection's arena.
pub type NodeId = usize;

/// Eligible members for a chain walk.
pub type NodeSet = HashSet<NodeId>;

#[derive(Debug, Clone)]
pub struct Node {
    pub identifier: u64,
    pub position: Position,
    pub width: f32,
    pub height: f32,
    pub slots: usize,
    inputs: Vec<NodeId>,
    outputs: Vec<NodeId>,
    pub alignment: Alignment,
}

impl Node {
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    pub fn is_root(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn has_branching_inputs(&self) -> bool {
        self.inputs.len() > 1
    }

    pub fn has_branching_outputs(&self) -> bool {
        self.outputs.len() > 1
    }

    pub fn rect(&self) -> Rect {
        Rect::centered(self.position, self.width, self.height)
    }

    /// The node this one is positioned relative to, if any.
    pub fn anchor(&self) -> Option<NodeId> {
        self.alignment.anchor()
    }
}

/// All nodes of one layout invocation in a flat arena. Membership is fixed at
/// construction; only positions and alignments change afterwards.
#[derive(Debug, Clone, Default)]
pub struct NodeSelection {
    nodes: Vec<Node>,
    index: HashMap<u64, NodeId>,
}

impl NodeSelection {
    pub fn from_snapshot(snapshot: &GraphSnapshot, config: &LayoutConfig) -> Self {
        let mut selection = Self::default();
        for record in &snapshot.nodes {
            selection.push_record(record, config);
        }

        // Stable sort keeps record order among connections into the same slot.
        let mut connections: Vec<_> = snapshot.connections.iter().collect();
        connections.sort_by_key(|conn| conn.to_slot);
        for conn in connections {
            let (Some(&from), Some(&to)) =
                (selection.index.get(&conn.from), selection.index.get(&conn.to))
            else {
                trace!(from = conn.from, to = conn.to, "connection leaves the selection");
                continue;
            };
            if from == to {
                continue;
            }
            if !selection.nodes[to].inputs.contains(&from) {
                selection.nodes[to].inputs.push(from);
            }
        }

        // Outputs follow record order rather than slot order.
        for conn in &snapshot.connections {
            let (Some(&from), Some(&to)) =
                (selection.index.get(&conn.from), selection.index.get(&conn.to))
            else {
                continue;
            };
            if from != to && !selection.nodes[from].outputs.contains(&to) {
                selection.nodes[from].outputs.push(to);
            }
        }

        selection
    }

    fn push_record(&mut self, record: &NodeRecord, config: &LayoutConfig) {
        if self.index.contains_key(&record.id) {
            trace!(id = record.id, "duplicate node record ignored");
            return;
        }
        let id = self.nodes.len();
        let position = Position::new(record.x, record.y);
        self.nodes.push(Node {
            identifier: record.id,
            position,
            width: record.width.unwrap_or(config.node_width).max(1.0),
            height: config.node_height(record.slots),
            slots: record.slots,
            inputs: Vec::new(),
            outputs: Vec::new(),
            alignment: Alignment::Free,
        });
        self.index.insert(record.id, id);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> std::ops::Range<NodeId> {
        0..self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn lookup(&self, identifier: u64) -> Option<NodeId> {
        self.index.get(&identifier).copied()
    }

    pub fn position(&self, id: NodeId) -> Position {
        self.nodes[id].position
    }

    pub fn set_position(&mut self, id: NodeId, position: Position) {
        self.nodes[id].position = position;
    }

    pub fn inputs(&self, id: NodeId) -> &[NodeId] {
        self.nodes[id].inputs()
    }

    pub fn outputs(&self, id: NodeId) -> &[NodeId] {
        self.nodes[id].outputs()
    }

    pub fn rect(&self, id: NodeId) -> Rect {
        self.nodes[id].rect()
    }

    /// Nodes without outputs, in declaration order.
    pub fn roots(&self) -> Vec<NodeId> {
        self.ids().filter(|&id| self.nodes[id].is_root()).collect()
    }

    /// Inputs of `id` whose alignment is anchored to `id`, in input order.
    pub fn anchored_inputs(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id]
            .inputs
            .iter()
            .copied()
            .filter(|&input| self.nodes[input].anchor() == Some(id))
            .collect()
    }

    /// Horizontal centre-to-centre distance between an output and its input.
    pub fn horizontal_spacing(&self, output: NodeId, input: NodeId, gap: f32) -> f32 {
        self.nodes[output].width / 2.0 + gap + self.nodes[input].width / 2.0
    }

    /// Output with the largest X; the first declared wins ties. Outputs that
    /// are themselves anchored to `id` are skipped so anchors never loop.
    pub fn rightmost_output(&self, id: NodeId) -> Option<NodeId> {
        let mut best: Option<NodeId> = None;
        for &output in self.outputs(id) {
            if self.nodes[output].anchor() == Some(id) {
                continue;
            }
            match best {
                Some(current) if self.position(current).x >= self.position(output).x => {}
                _ => best = Some(output),
            }
        }
        best
    }

    /// Whether following anchors from `start` reaches `target`.
    pub fn anchors_through(&self, start: NodeId, target: NodeId) -> bool {
        let mut current = start;
        for _ in 0..self.nodes.len() {
            match self.nodes[current].anchor() {
                Some(anchor) if anchor == target => return true,
                Some(anchor) => current = anchor,
                None => return false,
            }
        }
        false
    }

    /// Whether walking downstream from `start` reaches a root other than
    /// `exclude` without passing through `exclude`.
    pub fn reaches_other_root(&self, start: NodeId, exclude: NodeId) -> bool {
        let mut stack = vec![start];
        let mut seen = NodeSet::new();
        while let Some(id) = stack.pop() {
            if id == exclude || !seen.insert(id) {
                continue;
            }
            let node = &self.nodes[id];
            if node.is_root() {
                return true;
            }
            stack.extend(node.outputs.iter().copied());
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Connection;

    fn snapshot(ids: &[u64], edges: &[(u64, u64, usize)]) -> GraphSnapshot {
        GraphSnapshot {
            nodes: ids.iter().map(|&id| NodeRecord::new(id)).collect(),
            connections: edges
                .iter()
                .map(|&(from, to, slot)| Connection::new(from, to, slot))
                .collect(),
        }
    }

    #[test]
    fn inputs_follow_slot_order_and_deduplicate() {
        let snap = snapshot(&[1, 2, 3], &[(3, 1, 1), (2, 1, 0), (2, 1, 2)]);
        let selection = NodeSelection::from_snapshot(&snap, &LayoutConfig::default());
        let root = selection.lookup(1).unwrap();
        let inputs: Vec<u64> = selection
            .inputs(root)
            .iter()
            .map(|&id| selection.node(id).identifier)
            .collect();
        assert_eq!(inputs, vec![2, 3]);
        let two = selection.lookup(2).unwrap();
        assert_eq!(selection.outputs(two), &[root]);
    }

    #[test]
    fn connections_outside_selection_are_ignored() {
        let snap = snapshot(&[1, 2], &[(2, 1, 0), (9, 1, 1), (2, 9, 0), (1, 1, 0)]);
        let selection = NodeSelection::from_snapshot(&snap, &LayoutConfig::default());
        let root = selection.lookup(1).unwrap();
        let two = selection.lookup(2).unwrap();
        assert_eq!(selection.inputs(root), &[two]);
        assert!(!selection.node(two).has_branching_outputs());
        assert_eq!(selection.roots(), vec![root]);
    }

    #[test]
    fn branching_flags_and_heights() {
        let mut snap = snapshot(&[1, 2, 3, 4], &[(2, 1, 0), (3, 1, 1), (4, 2, 0), (4, 3, 0)]);
        snap.nodes[0].slots = 5;
        let config = LayoutConfig::default();
        let selection = NodeSelection::from_snapshot(&snap, &config);
        let root = selection.lookup(1).unwrap();
        let source = selection.lookup(4).unwrap();
        assert!(selection.node(root).has_branching_inputs());
        assert!(selection.node(source).has_branching_outputs());
        assert!(selection.node(root).is_root());
        assert!((selection.node(root).height - config.node_height(5)).abs() < 1e-4);
        assert_eq!(selection.node(source).height, 96.0);
    }

    #[test]
    fn anchor_walk_finds_distant_anchor() {
        let snap = snapshot(&[1, 2, 3, 4], &[(2, 1, 0), (3, 2, 0), (4, 1, 1)]);
        let mut selection = NodeSelection::from_snapshot(&snap, &LayoutConfig::default());
        let (one, two, three, four) = (0, 1, 2, 3);
        selection.node_mut(two).alignment = Alignment::FixedOffset {
            anchor: Some(one),
            offset: Position::ORIGIN,
        };
        selection.node_mut(three).alignment = Alignment::FixedOffset {
            anchor: Some(two),
            offset: Position::ORIGIN,
        };
        assert!(selection.anchors_through(three, one));
        assert!(!selection.anchors_through(three, four));
        assert!(!selection.anchors_through(one, three));
    }

    #[test]
    fn detects_shared_upstream_between_roots() {
        // 3 feeds both roots 1 and 2; 4 only feeds 1.
        let snap = snapshot(&[1, 2, 3, 4], &[(3, 1, 0), (3, 2, 0), (4, 1, 1)]);
        let selection = NodeSelection::from_snapshot(&snap, &LayoutConfig::default());
        let one = selection.lookup(1).unwrap();
        let three = selection.lookup(3).unwrap();
        let four = selection.lookup(4).unwrap();
        assert!(selection.reaches_other_root(three, one));
        assert!(!selection.reaches_other_root(four, one));
    }
}
