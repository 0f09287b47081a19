use tracing::{debug, trace};

use super::alignment::{
    Alignment, align_in_line, exec, refresh_dependent_roots, shift_chain, update_all_chain_positions,
    update_offset,
};
use super::dimension::{ChainDimension, dimension_or_self, relative_chain};
use super::graph::{NodeId, NodeSelection, NodeSet};
use super::types::{Bound, Position};
use crate::config::{LayoutConfig, VerticalAlignment};

/// Vertical pass: stacks the anchored inputs of every node top to bottom so
/// that sibling chains never overlap. Inputs are stacked before the node they
/// feed, so every measured chain is already final.
pub fn align_vertically(selection: &mut NodeSelection, config: &LayoutConfig) {
    let mut visited = NodeSet::new();
    for root in selection.roots() {
        for node in post_order(selection, root, &mut visited) {
            stack_inputs(selection, node, config);
        }
    }
    refresh_dependent_roots(selection);
}

/// Anchor-tree post-order from `root`: every node after all of its anchored
/// inputs.
fn post_order(selection: &NodeSelection, root: NodeId, visited: &mut NodeSet) -> Vec<NodeId> {
    let mut order = Vec::new();
    let mut stack: Vec<(NodeId, bool)> = vec![(root, false)];
    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            order.push(id);
            continue;
        }
        if !visited.insert(id) {
            continue;
        }
        stack.push((id, true));
        for input in selection.anchored_inputs(id).into_iter().rev() {
            stack.push((input, false));
        }
    }
    order
}

/// Measures two sibling chains the way the stacker compares them: both relative
/// chains, cut at the left edge of whichever reaches back less far.
pub fn measure_pair(
    selection: &NodeSelection,
    above: NodeId,
    below: NodeId,
) -> (ChainDimension, ChainDimension) {
    let above_members = relative_chain(selection, above);
    let below_members = relative_chain(selection, below);
    let above_full = dimension_or_self(selection, above, &above_members, &Bound::UNBOUNDED);
    let below_full = dimension_or_self(selection, below, &below_members, &Bound::UNBOUNDED);
    let limit = Bound::left(above_full.left.max(below_full.left));
    (
        dimension_or_self(selection, above, &above_members, &limit),
        dimension_or_self(selection, below, &below_members, &limit),
    )
}

fn stack_inputs(selection: &mut NodeSelection, node: NodeId, config: &LayoutConfig) {
    let stacked = selection.anchored_inputs(node);
    if stacked.len() < 2 {
        return;
    }
    let policy = config.vertical_alignment;
    align_in_line(selection, stacked[0], node, policy);

    for (idx, &current) in stacked.iter().enumerate().skip(1) {
        let position = selection.position(current);
        let mut target = f32::NEG_INFINITY;
        for &above in &stacked[..idx] {
            if selection.outputs(current).contains(&above) {
                // Loop-back: `above` consumes `current` too. Its relative chain
                // never holds `current`, so this compares against `above` and
                // its other inputs only.
                trace!(
                    node = selection.node(current).identifier,
                    above = selection.node(above).identifier,
                    "loop-back sibling"
                );
            }
            let (upper_chain, chain) = measure_pair(selection, above, current);
            let y = upper_chain.lower + config.node_spacing + (position.y - chain.upper);
            target = target.max(y);
        }
        update_offset(selection, current, Position::new(position.x, target));
        update_all_chain_positions(selection, current);
    }

    recenter(selection, node, &stacked, policy);
    debug!(
        node = selection.node(node).identifier,
        inputs = stacked.len(),
        "stacked inputs"
    );
}

/// Moves the stacked inputs so `node` sits at the midpoint of the first and
/// last one. The node itself never moves, which keeps roots where the host
/// put them.
fn recenter(
    selection: &mut NodeSelection,
    node: NodeId,
    stacked: &[NodeId],
    policy: VerticalAlignment,
) {
    let averaging = matches!(selection.node(node).alignment, Alignment::AverageOfTwo { .. });
    let applies = match policy {
        VerticalAlignment::MainlineAnchored => false,
        VerticalAlignment::Centered => averaging || !selection.node(node).is_root(),
        VerticalAlignment::TopStacked => averaging,
    };
    let (Some(&top), Some(&bottom)) = (stacked.first(), stacked.last()) else {
        return;
    };
    if !applies {
        return;
    }

    let mid = (selection.position(top).y + selection.position(bottom).y) / 2.0;
    let delta = Position::new(0.0, selection.position(node).y - mid);
    for &input in stacked {
        shift_chain(selection, input, delta);
    }
    if averaging {
        selection.node_mut(node).alignment = Alignment::AverageOfTwo { top, bottom };
        exec(selection, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Connection, GraphSnapshot, NodeRecord};
    use crate::layout::sorter::sort_nodes;
    use crate::layout::types::EPSILON;

    fn laid_out(
        ids: &[u64],
        edges: &[(u64, u64, usize)],
        config: &LayoutConfig,
    ) -> NodeSelection {
        let snapshot = GraphSnapshot {
            nodes: ids.iter().map(|&id| NodeRecord::new(id)).collect(),
            connections: edges
                .iter()
                .map(|&(from, to, slot)| Connection::new(from, to, slot))
                .collect(),
        };
        let mut selection = NodeSelection::from_snapshot(&snapshot, config);
        sort_nodes(&mut selection, config);
        align_vertically(&mut selection, config);
        selection
    }

    fn y(selection: &NodeSelection, identifier: u64) -> f32 {
        selection.position(selection.lookup(identifier).unwrap()).y
    }

    fn assert_stacked(selection: &NodeSelection, config: &LayoutConfig) {
        for node in selection.ids() {
            let stacked = selection.anchored_inputs(node);
            for pair in stacked.windows(2) {
                let (above, below) = measure_pair(selection, pair[0], pair[1]);
                assert!(
                    above.lower + config.node_spacing <= below.upper + EPSILON,
                    "inputs {:?} of {} overlap",
                    pair,
                    node
                );
            }
        }
    }

    #[test]
    fn three_inputs_stack_in_order() {
        let config = LayoutConfig::default();
        let sel = laid_out(&[1, 2, 3, 4], &[(2, 1, 0), (3, 1, 1), (4, 1, 2)], &config);
        let step = 96.0 + config.node_spacing;
        assert!((y(&sel, 3) - y(&sel, 2) - step).abs() < EPSILON);
        assert!((y(&sel, 4) - y(&sel, 3) - step).abs() < EPSILON);
        // Centred on the root, which never moves.
        assert!(y(&sel, 1).abs() < EPSILON);
        assert!((y(&sel, 2) + y(&sel, 4)).abs() < EPSILON);
        assert_stacked(&sel, &config);
    }

    #[test]
    fn tall_upper_branch_pushes_lower_sibling_down() {
        // 2 has two stacked inputs of its own, so 3 must clear both.
        let config = LayoutConfig {
            vertical_alignment: VerticalAlignment::MainlineAnchored,
            ..LayoutConfig::default()
        };
        let sel = laid_out(
            &[1, 2, 3, 4, 5],
            &[(2, 1, 0), (3, 1, 1), (4, 2, 0), (5, 2, 1)],
            &config,
        );
        assert!(y(&sel, 1).abs() < EPSILON);
        assert!(y(&sel, 2).abs() < EPSILON);
        assert!(y(&sel, 4).abs() < EPSILON);
        let spacing = config.node_spacing;
        assert!((y(&sel, 5) - (96.0 + spacing)).abs() < EPSILON);
        // 5 sits one column further back than 3, so the shared left limit
        // leaves it out and 3 only has to clear 2.
        assert!((y(&sel, 3) - (96.0 + spacing)).abs() < EPSILON);
        assert_stacked(&sel, &config);
    }

    #[test]
    fn deep_lower_branch_clears_deep_upper_branch() {
        // 1 <- 2 <- 4, 2 <- 5 and 1 <- 3 <- 6: both siblings reach two
        // columns back, so 3 has to clear 5 as well.
        let config = LayoutConfig {
            vertical_alignment: VerticalAlignment::MainlineAnchored,
            ..LayoutConfig::default()
        };
        let sel = laid_out(
            &[1, 2, 3, 4, 5, 6],
            &[(2, 1, 0), (3, 1, 1), (4, 2, 0), (5, 2, 1), (6, 3, 0)],
            &config,
        );
        let step = 96.0 + config.node_spacing;
        assert!((y(&sel, 5) - step).abs() < EPSILON);
        assert!((y(&sel, 3) - 2.0 * step).abs() < EPSILON);
        assert!((y(&sel, 6) - 2.0 * step).abs() < EPSILON);
        assert_stacked(&sel, &config);
    }

    #[test]
    fn top_stacked_keeps_non_roots_on_their_line() {
        let config = LayoutConfig {
            vertical_alignment: VerticalAlignment::TopStacked,
            ..LayoutConfig::default()
        };
        let sel = laid_out(
            &[1, 2, 3, 4],
            &[(2, 1, 0), (3, 2, 0), (4, 2, 1)],
            &config,
        );
        // 2 is not a root: its first input hangs from its top edge.
        assert!((y(&sel, 3) - y(&sel, 2)).abs() < EPSILON);
        assert!(y(&sel, 4) > y(&sel, 3));
        assert_stacked(&sel, &config);
    }

    #[test]
    fn pinned_root_is_not_recentred() {
        // 2 also feeds root 9, so root 1 is pinned and keeps 2 in line.
        let config = LayoutConfig::default();
        let sel = laid_out(
            &[1, 9, 2, 3],
            &[(2, 1, 0), (3, 1, 1), (2, 9, 0)],
            &config,
        );
        assert!(y(&sel, 1).abs() < EPSILON);
        assert!(y(&sel, 2).abs() < EPSILON);
        assert!((y(&sel, 3) - (96.0 + config.node_spacing)).abs() < EPSILON);
        // The dependent root follows the shared input.
        assert!((y(&sel, 9) - y(&sel, 2)).abs() < EPSILON);
    }

    #[test]
    fn loop_back_sibling_stays_clear() {
        // 3 feeds the root and 2. The mainline pass anchors it to the root,
        // so it is stacked below 2 even though 2 consumes it.
        let config = LayoutConfig::default();
        let snapshot = GraphSnapshot {
            nodes: (1..=5).map(NodeRecord::new).collect(),
            connections: vec![
                Connection::new(2, 1, 0),
                Connection::new(3, 1, 1),
                Connection::new(3, 2, 0),
                Connection::new(4, 2, 1),
                Connection::new(5, 4, 0),
            ],
        };
        let mut sel = NodeSelection::from_snapshot(&snapshot, &config);
        crate::layout::arrange(&mut sel, &config);

        let root = sel.lookup(1).unwrap();
        let three = sel.lookup(3).unwrap();
        assert_eq!(sel.node(three).anchor(), Some(root));
        assert_eq!(sel.anchored_inputs(root), vec![sel.lookup(2).unwrap(), three]);
        assert_stacked(&sel, &config);
        assert!(y(&sel, 3) > y(&sel, 2));
        for a in sel.ids() {
            for b in sel.ids().filter(|&b| b > a) {
                assert!(!sel.rect(a).overlaps(&sel.rect(b)), "{a} and {b} overlap");
            }
        }
    }

    #[test]
    fn stacking_is_independent_of_starting_positions() {
        let config = LayoutConfig::default();
        let edges = [(2, 1, 0), (3, 1, 1), (4, 3, 0), (5, 3, 1), (6, 1, 2)];
        let first = laid_out(&[1, 2, 3, 4, 5, 6], &edges, &config);
        let snapshot = GraphSnapshot {
            nodes: vec![
                NodeRecord::new(1),
                NodeRecord::new(2).at(900.0, -40.0),
                NodeRecord::new(3).at(-30.0, 77.0),
                NodeRecord::new(4).at(5.0, 5.0),
                NodeRecord::new(5).at(-700.0, 300.0),
                NodeRecord::new(6).at(12.0, -600.0),
            ],
            connections: edges
                .iter()
                .map(|&(from, to, slot)| Connection::new(from, to, slot))
                .collect(),
        };
        let mut second = NodeSelection::from_snapshot(&snapshot, &config);
        sort_nodes(&mut second, &config);
        align_vertically(&mut second, &config);
        for id in first.ids() {
            assert!(first.position(id).approx_eq(second.position(id), EPSILON));
        }
    }
}
