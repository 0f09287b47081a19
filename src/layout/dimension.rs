//! Bounding boxes of upstream chains.
//!
//! A chain dimension is always measured against an explicit member set: the
//! passes routinely measure a chain with sibling branches or already stacked
//! nodes removed, so the result is never cached on the node.

use super::error::ChainError;
use super::graph::{NodeId, NodeSelection, NodeSet};
use super::types::{Bound, Rect};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainDimension {
    pub left: f32,
    pub right: f32,
    pub upper: f32,
    pub lower: f32,
    pub leftmost: NodeId,
    pub rightmost: NodeId,
    pub topmost: NodeId,
    pub bottommost: NodeId,
    pub node_count: usize,
}

impl ChainDimension {
    fn from_node(id: NodeId, rect: Rect) -> Self {
        Self {
            left: rect.left,
            right: rect.right,
            upper: rect.upper,
            lower: rect.lower,
            leftmost: id,
            rightmost: id,
            topmost: id,
            bottommost: id,
            node_count: 1,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.lower - self.upper
    }

    pub fn rect(&self) -> Rect {
        Rect {
            left: self.left,
            right: self.right,
            upper: self.upper,
            lower: self.lower,
        }
    }

    /// Folds a node's box into the chain. The right side is never extended:
    /// only branches further left matter for stacking.
    fn absorb(&mut self, id: NodeId, rect: &Rect) {
        if rect.left < self.left {
            self.left = rect.left;
            self.leftmost = id;
        }
        if rect.upper < self.upper {
            self.upper = rect.upper;
            self.topmost = id;
        }
        if rect.lower > self.lower {
            self.lower = rect.lower;
            self.bottommost = id;
        }
        self.node_count += 1;
    }
}

/// Measures `node` and every upstream member reachable through member inputs
/// that lie inside `limit`.
pub fn calculate_chain_dimension(
    selection: &NodeSelection,
    node: NodeId,
    members: &NodeSet,
    limit: &Bound,
) -> Result<ChainDimension, ChainError> {
    if !members.contains(&node) {
        return Err(ChainError::NotInChain(node));
    }
    let rect = selection.rect(node);
    if !limit.contains(&rect) {
        return Err(ChainError::OutOfBounds(node));
    }

    let mut dimension = ChainDimension::from_node(node, rect);
    let mut visited = NodeSet::new();
    visited.insert(node);
    let mut stack: Vec<NodeId> = selection.inputs(node).iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        if !members.contains(&id) || visited.contains(&id) {
            continue;
        }
        let rect = selection.rect(id);
        // An out-of-bounds input ends the walk along that branch.
        if !limit.contains(&rect) {
            continue;
        }
        visited.insert(id);
        dimension.absorb(id, &rect);
        stack.extend(selection.inputs(id).iter().rev().copied());
    }
    Ok(dimension)
}

pub fn single_node_dimension(selection: &NodeSelection, node: NodeId) -> ChainDimension {
    ChainDimension::from_node(node, selection.rect(node))
}

/// Like [`calculate_chain_dimension`], but a node that is not a member or
/// sits outside `limit` is measured as its own box.
pub fn dimension_or_self(
    selection: &NodeSelection,
    node: NodeId,
    members: &NodeSet,
    limit: &Bound,
) -> ChainDimension {
    calculate_chain_dimension(selection, node, members, limit)
        .unwrap_or_else(|_| single_node_dimension(selection, node))
}

/// `node` plus all of its ancestors.
pub fn upstream_chain(selection: &NodeSelection, node: NodeId) -> NodeSet {
    let mut chain = NodeSet::new();
    let mut stack = vec![node];
    while let Some(id) = stack.pop() {
        if chain.insert(id) {
            stack.extend(selection.inputs(id).iter().copied());
        }
    }
    chain
}

/// `node` plus every input that is (transitively) anchored to it: exactly
/// the nodes that follow when `node` moves.
pub fn relative_chain(selection: &NodeSelection, node: NodeId) -> NodeSet {
    let mut chain = NodeSet::new();
    let mut stack = vec![node];
    while let Some(id) = stack.pop() {
        if chain.insert(id) {
            stack.extend(selection.anchored_inputs(id));
        }
    }
    chain
}

/// Unbounded dimension of the full upstream chain.
pub fn full_chain_dimension(selection: &NodeSelection, node: NodeId) -> ChainDimension {
    let members = upstream_chain(selection, node);
    dimension_or_self(selection, node, &members, &Bound::UNBOUNDED)
}
