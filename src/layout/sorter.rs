use std::collections::VecDeque;

use tracing::{debug, trace};

use super::alignment::{Alignment, offset_node, update_all_chain_positions};
use super::dimension::relative_chain;
use super::graph::{NodeId, NodeSelection, NodeSet};
use super::types::{EPSILON, Position};
use crate::config::LayoutConfig;

/// Horizontal pass: walks every root tree from outputs to inputs, gives each
/// node its X (and a provisional Y) and assigns its alignment.
///
/// Roots are processed in declaration order. A node reachable from several
/// roots belongs to the first root that reaches it; later roots treat it as
/// fixed, except that it is pushed further left when one of their nodes
/// consumes it.
pub fn sort_nodes(selection: &mut NodeSelection, config: &LayoutConfig) {
    let mut owner: Vec<Option<usize>> = vec![None; selection.len()];
    for (tree, root) in selection.roots().into_iter().enumerate() {
        owner[root] = Some(tree);
        let members = claim_tree(selection, root, tree, &mut owner);
        let position = selection.position(root);
        selection.node_mut(root).alignment = Alignment::pinned(position);
        place_tree(selection, root, &members, config);

        let shared = selection
            .inputs(root)
            .iter()
            .copied()
            .find(|&input| owner[input].is_some_and(|other| other != tree));
        if let Some(shared) = shared {
            place_dependent_root(selection, root, shared, config);
        }
        push_inputs_behind(selection, root, config);

        if shared.is_none() && averages_inputs(selection, root) {
            let anchored = selection.anchored_inputs(root);
            if let (Some(&top), Some(&bottom)) = (anchored.first(), anchored.last()) {
                selection.node_mut(root).alignment = Alignment::AverageOfTwo { top, bottom };
            }
        }
        debug!(
            root = selection.node(root).identifier,
            tree_size = members.len(),
            dependent = shared.is_some(),
            "horizontal pass placed tree"
        );
    }
}

/// Re-checks every tree after later passes moved nodes: dependent roots are
/// placed again against their anchor and every root pushes its upstream
/// behind it.
pub fn settle_trees(selection: &mut NodeSelection, config: &LayoutConfig) {
    for root in selection.roots() {
        if let Some(anchor) = selection.node(root).anchor() {
            place_dependent_root(selection, root, anchor, config);
        }
        push_inputs_behind(selection, root, config);
    }
}

/// Claims every unowned ancestor of `root` for `tree`; the result includes
/// the root itself.
fn claim_tree(
    selection: &NodeSelection,
    root: NodeId,
    tree: usize,
    owner: &mut [Option<usize>],
) -> NodeSet {
    let mut members = NodeSet::from([root]);
    let mut stack: Vec<NodeId> = selection.inputs(root).to_vec();
    while let Some(id) = stack.pop() {
        if owner[id].is_some() {
            continue;
        }
        owner[id] = Some(tree);
        members.insert(id);
        stack.extend(selection.inputs(id).iter().copied());
    }
    members
}

/// Whether a pinned root may float at the midpoint of its inputs.
fn averages_inputs(selection: &NodeSelection, root: NodeId) -> bool {
    let inputs = selection.inputs(root);
    !inputs.is_empty()
        && !inputs
            .iter()
            .any(|&input| selection.reaches_other_root(input, root))
}

/// Anchors `root` to `shared`, an input owned by an earlier tree, on the
/// shared input's row. The root clears that input by the root spacing and
/// sits far enough right that every connection entering its tree from
/// outside runs left to right.
pub fn place_dependent_root(
    selection: &mut NodeSelection,
    root: NodeId,
    shared: NodeId,
    config: &LayoutConfig,
) {
    let chain = relative_chain(selection, root);
    if chain.contains(&shared) {
        return;
    }
    let root_x = selection.position(root).x;
    let mut x = f32::NEG_INFINITY;
    for consumer in selection.ids().filter(|id| chain.contains(id)) {
        for &source in selection.inputs(consumer) {
            if chain.contains(&source) || selection.node(source).alignment == Alignment::Free {
                continue;
            }
            let gap = if consumer == root {
                config.node_spacing * config.root_spacing_multiplier
            } else {
                config.node_spacing
            };
            let behind = root_x - selection.position(consumer).x;
            let needed = selection.position(source).x
                + selection.horizontal_spacing(consumer, source, gap)
                + behind;
            x = x.max(needed);
        }
    }
    let anchor = selection.position(shared);
    if !x.is_finite() {
        x = anchor.x + selection.horizontal_spacing(root, shared, config.node_spacing);
    }
    offset_node(selection, root, shared, Position::new(x, anchor.y));
    update_all_chain_positions(selection, root);
}

/// Re-runs horizontal placement upstream of `node`: any input that now sits
/// closer than one spacing behind a consumer is re-anchored to it. Shared
/// inputs owned by another tree are moved as well, so every connection keeps
/// running left to right.
pub fn push_inputs_behind(selection: &mut NodeSelection, node: NodeId, config: &LayoutConfig) {
    let mut stack = vec![node];
    // A cyclic input would never settle.
    let mut budget = selection.len() * selection.len() + 1;
    while let Some(current) = stack.pop() {
        if budget == 0 {
            debug!(node = selection.node(node).identifier, "upstream push did not settle");
            break;
        }
        budget -= 1;
        let origin = selection.position(current);
        for input in selection.inputs(current).to_vec() {
            let max_x = origin.x - selection.horizontal_spacing(current, input, config.node_spacing);
            if selection.position(input).x > max_x + EPSILON {
                if selection.anchors_through(current, input) {
                    trace!(
                        node = selection.node(input).identifier,
                        consumer = selection.node(current).identifier,
                        "input carries its consumer, not re-anchored"
                    );
                    continue;
                }
                offset_node(selection, input, current, Position::new(max_x, origin.y));
                update_all_chain_positions(selection, input);
                stack.push(input);
            } else if selection.node(input).anchor() == Some(current) {
                stack.push(input);
            }
        }
    }
}

/// Places the tree's nodes once all of their in-tree outputs are placed. Each
/// node sits one spacing behind its leftmost output and takes that output's Y.
fn place_tree(
    selection: &mut NodeSelection,
    root: NodeId,
    members: &NodeSet,
    config: &LayoutConfig,
) {
    let mut pending: Vec<usize> = vec![0; selection.len()];
    for &id in members {
        if id != root {
            pending[id] = selection
                .outputs(id)
                .iter()
                .filter(|output| members.contains(output))
                .count();
        }
    }

    let mut queue = VecDeque::from([root]);
    while let Some(current) = queue.pop_front() {
        for input in selection.inputs(current).to_vec() {
            if input == root || !members.contains(&input) || pending[input] == 0 {
                continue;
            }
            pending[input] -= 1;
            if pending[input] > 0 {
                continue;
            }

            let mut closest: Option<(NodeId, f32)> = None;
            for &output in selection.outputs(input) {
                if !members.contains(&output) {
                    continue;
                }
                let x = selection.position(output).x
                    - selection.horizontal_spacing(output, input, config.node_spacing);
                if closest.is_none_or(|(_, best)| x < best) {
                    closest = Some((output, x));
                }
            }
            let Some((anchor, x)) = closest else {
                continue;
            };
            let y = selection.position(anchor).y;
            offset_node(selection, input, anchor, Position::new(x, y));
            trace!(
                node = selection.node(input).identifier,
                anchor = selection.node(anchor).identifier,
                x,
                "placed"
            );
            queue.push_back(input);
        }
    }
}
