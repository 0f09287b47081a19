pub mod alignment;
pub mod dimension;
mod error;
pub mod graph;
pub mod mainline;
pub mod sorter;
pub(crate) mod types;
pub mod vertical;

pub use alignment::Alignment;
pub use dimension::{ChainDimension, calculate_chain_dimension};
pub use error::ChainError;
pub use graph::{Node, NodeId, NodeSelection, NodeSet};
pub use types::*;

use std::collections::BTreeMap;

use tracing::debug_span;

use crate::config::LayoutConfig;
use crate::ir::GraphSnapshot;
use mainline::align_mainlines;
use sorter::sort_nodes;
use vertical::align_vertically;

/// Lays out a snapshot and returns the final positions.
pub fn compute_layout(snapshot: &GraphSnapshot, config: &LayoutConfig) -> Layout {
    let mut selection = NodeSelection::from_snapshot(snapshot, config);
    arrange(&mut selection, config);
    collect_layout(&selection)
}

/// Runs the horizontal, mainline and vertical passes over `selection`.
pub fn arrange(selection: &mut NodeSelection, config: &LayoutConfig) {
    if selection.is_empty() {
        return;
    }
    let _span = debug_span!("arrange", nodes = selection.len()).entered();
    sort_nodes(selection, config);
    if config.mainline {
        align_mainlines(selection, config);
    }
    align_vertically(selection, config);
}

pub fn collect_layout(selection: &NodeSelection) -> Layout {
    let mut nodes = BTreeMap::new();
    let mut left = f32::INFINITY;
    let mut right = f32::NEG_INFINITY;
    let mut upper = f32::INFINITY;
    let mut lower = f32::NEG_INFINITY;
    for node in selection.nodes() {
        let rect = node.rect();
        left = left.min(rect.left);
        right = right.max(rect.right);
        upper = upper.min(rect.upper);
        lower = lower.max(rect.lower);
        nodes.insert(
            node.identifier,
            NodeLayout {
                id: node.identifier,
                x: node.position.x,
                y: node.position.y,
                width: node.width,
                height: node.height,
                inputs: node
                    .inputs()
                    .iter()
                    .map(|&input| selection.node(input).identifier)
                    .collect(),
                root: node.is_root(),
            },
        );
    }
    if nodes.is_empty() {
        return Layout::default();
    }
    Layout {
        nodes,
        left,
        upper,
        width: right - left,
        height: lower - upper,
    }
}

/// Writes the computed positions back into the snapshot's node records.
pub fn apply_layout(snapshot: &mut GraphSnapshot, layout: &Layout) {
    for record in &mut snapshot.nodes {
        if let Some(position) = layout.position(record.id) {
            record.x = position.x;
            record.y = position.y;
        }
    }
}
