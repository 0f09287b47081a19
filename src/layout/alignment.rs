//! Position resolution.
//!
//! Every node carries an [`Alignment`] describing where it belongs relative
//! to other nodes. Passes move whole sub-chains by moving one anchor and
//! calling [`update_all_chain_positions`].

use super::dimension::{dimension_or_self, relative_chain};
use super::graph::{NodeId, NodeSelection};
use super::types::{Bound, Position};
use crate::config::VerticalAlignment;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Alignment {
    /// Not yet assigned; the position is kept as is.
    #[default]
    Free,
    /// `anchor.position + offset`, or `offset` alone when unanchored.
    FixedOffset {
        anchor: Option<NodeId>,
        offset: Position,
    },
    /// Y is the midpoint of the two tracked nodes; X is untouched.
    AverageOfTwo { top: NodeId, bottom: NodeId },
}

impl Alignment {
    pub fn anchor(&self) -> Option<NodeId> {
        match self {
            Self::FixedOffset { anchor, .. } => *anchor,
            Self::Free | Self::AverageOfTwo { .. } => None,
        }
    }

    pub fn pinned(position: Position) -> Self {
        Self::FixedOffset {
            anchor: None,
            offset: position,
        }
    }
}

/// Where `node` belongs according to its alignment.
pub fn resolve(selection: &NodeSelection, node: NodeId) -> Position {
    let current = selection.position(node);
    match selection.node(node).alignment {
        Alignment::Free => current,
        Alignment::FixedOffset { anchor: None, offset } => offset,
        Alignment::FixedOffset {
            anchor: Some(anchor),
            offset,
        } => selection.position(anchor) + offset,
        Alignment::AverageOfTwo { top, bottom } => {
            let y = (selection.position(top).y + selection.position(bottom).y) / 2.0;
            Position::new(current.x, y)
        }
    }
}

pub fn exec(selection: &mut NodeSelection, node: NodeId) {
    let position = resolve(selection, node);
    selection.set_position(node, position);
}

/// Places `node` at `position`, keeping its anchor and rewriting the offset.
pub fn update_offset(selection: &mut NodeSelection, node: NodeId, position: Position) {
    let alignment = match selection.node(node).alignment {
        Alignment::FixedOffset { anchor, .. } => {
            let base = anchor.map_or(Position::ORIGIN, |anchor| selection.position(anchor));
            Alignment::FixedOffset {
                anchor,
                offset: position - base,
            }
        }
        other => other,
    };
    let entry = selection.node_mut(node);
    entry.alignment = alignment;
    entry.position = position;
}

/// Re-anchors `node` to `anchor` at `position`.
pub fn offset_node(selection: &mut NodeSelection, node: NodeId, anchor: NodeId, position: Position) {
    let offset = position - selection.position(anchor);
    let entry = selection.node_mut(node);
    entry.alignment = Alignment::FixedOffset {
        anchor: Some(anchor),
        offset,
    };
    entry.position = position;
}

/// Re-resolves every input anchored to `node`, recursively. Inputs anchored
/// to another node are left alone, and so is everything behind them.
pub fn update_all_chain_positions(selection: &mut NodeSelection, node: NodeId) {
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        for input in selection.anchored_inputs(current) {
            exec(selection, input);
            stack.push(input);
        }
    }
}

/// Re-resolves the Y of roots anchored to a shared input (declaration order,
/// so a root anchored inside another dependent tree follows that tree) and
/// carries their chains along. X stays where the horizontal passes left it.
pub fn refresh_dependent_roots(selection: &mut NodeSelection) {
    for root in selection.roots() {
        if selection.node(root).anchor().is_some() {
            let x = selection.position(root).x;
            let y = resolve(selection, root).y;
            update_offset(selection, root, Position::new(x, y));
            update_all_chain_positions(selection, root);
        }
    }
}

/// Moves `node` by `delta` and carries its relative chain along.
pub fn shift_chain(selection: &mut NodeSelection, node: NodeId, delta: Position) {
    let target = selection.position(node) + delta;
    update_offset(selection, node, target);
    update_all_chain_positions(selection, node);
}

/// Lines `input` up with `output` vertically and refreshes its chain.
pub fn align_in_line(
    selection: &mut NodeSelection,
    input: NodeId,
    output: NodeId,
    policy: VerticalAlignment,
) {
    let current = selection.position(input);
    let y = match policy {
        VerticalAlignment::MainlineAnchored | VerticalAlignment::Centered => {
            selection.position(output).y
        }
        VerticalAlignment::TopStacked => {
            let members = relative_chain(selection, input);
            let chain = dimension_or_self(selection, input, &members, &Bound::UNBOUNDED);
            current.y + (selection.rect(output).upper - chain.upper)
        }
    };
    update_offset(selection, input, Position::new(current.x, y));
    update_all_chain_positions(selection, input);
}
