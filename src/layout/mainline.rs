use std::cmp::Ordering;

use tracing::{debug, trace};

use super::alignment::{offset_node, update_all_chain_positions};
use super::dimension::{ChainDimension, dimension_or_self, full_chain_dimension, upstream_chain};
use super::graph::{NodeId, NodeSelection};
use super::sorter::{push_inputs_behind, settle_trees};
use super::types::{Bound, EPSILON, Position};
use crate::config::LayoutConfig;

/// Mainline pass. For every node with several inputs one input is picked as
/// the mainline and pushed behind the chains of its siblings, so the busiest
/// path reads as a straight backbone.
///
/// Mainlines that feed more than one consumer are not moved while their node
/// is processed; a second sweep pushes them behind the widest chain among all
/// of their consumers instead.
pub fn align_mainlines(selection: &mut NodeSelection, config: &LayoutConfig) {
    let mut branching: Vec<NodeId> = selection
        .ids()
        .filter(|&id| selection.node(id).has_branching_inputs())
        .collect();
    sort_by_x(selection, &mut branching, false);

    let mut deferred: Vec<NodeId> = Vec::new();
    for node in branching {
        let Some(mainline) = pick_mainline(selection, node, config) else {
            continue;
        };
        trace!(
            node = selection.node(node).identifier,
            mainline = selection.node(mainline).identifier,
            "picked mainline"
        );
        if selection.node(mainline).has_branching_outputs() {
            if !deferred.contains(&mainline) {
                deferred.push(mainline);
            }
            continue;
        }
        push_behind_siblings(selection, node, mainline, config);
    }

    // Right to left, so a consumer chain is final before its feeders move.
    sort_by_x(selection, &mut deferred, true);
    for node in deferred {
        push_behind_consumers(selection, node, config);
    }
    settle_trees(selection, config);
}

fn sort_by_x(selection: &NodeSelection, nodes: &mut [NodeId], descending: bool) {
    nodes.sort_by(|&a, &b| {
        let ord = selection.position(a).x.total_cmp(&selection.position(b).x);
        let ord = if descending { ord.reverse() } else { ord };
        ord.then(a.cmp(&b))
    });
}

/// The input of `node` that should form its backbone, if any qualifies.
pub fn pick_mainline(
    selection: &NodeSelection,
    node: NodeId,
    config: &LayoutConfig,
) -> Option<NodeId> {
    let inputs = selection.inputs(node);
    let branching: Vec<NodeId> = inputs
        .iter()
        .copied()
        .filter(|&input| selection.node(input).has_branching_outputs())
        .collect();
    let pool = if branching.is_empty() {
        inputs.to_vec()
    } else {
        branching
    };

    let measured: Vec<(NodeId, ChainDimension)> = pool
        .into_iter()
        .map(|input| (input, full_chain_dimension(selection, input)))
        .filter(|(_, chain)| chain.width() >= config.min_chain_width - EPSILON)
        .collect();
    let min_x = measured
        .iter()
        .map(|&(input, _)| selection.position(input).x)
        .min_by(f32::total_cmp)?;

    let mut best: Option<(NodeId, ChainDimension)> = None;
    for (input, chain) in measured {
        if selection.position(input).x > min_x + EPSILON {
            continue;
        }
        best = match best {
            None => Some((input, chain)),
            Some((current, current_chain)) => {
                if compare_candidates(&chain, &current_chain) == Ordering::Less {
                    Some((input, chain))
                } else {
                    Some((current, current_chain))
                }
            }
        };
    }
    best.map(|(input, _)| input)
}

/// Leftmost chain first, then the chain with fewer members. Equal candidates
/// compare equal so the earlier declared input is kept.
fn compare_candidates(a: &ChainDimension, b: &ChainDimension) -> Ordering {
    if (a.left - b.left).abs() > EPSILON {
        return a.left.total_cmp(&b.left);
    }
    a.node_count.cmp(&b.node_count)
}

fn push_behind_siblings(
    selection: &mut NodeSelection,
    node: NodeId,
    mainline: NodeId,
    config: &LayoutConfig,
) {
    let own = upstream_chain(selection, mainline);
    let mut left = f32::INFINITY;
    for &sibling in selection.inputs(node) {
        if sibling == mainline || own.contains(&sibling) {
            continue;
        }
        let mut members = upstream_chain(selection, sibling);
        members.retain(|id| !own.contains(id));
        let chain = dimension_or_self(selection, sibling, &members, &Bound::UNBOUNDED);
        left = left.min(chain.left);
    }
    push_behind(selection, mainline, left, config);
}

fn push_behind_consumers(selection: &mut NodeSelection, node: NodeId, config: &LayoutConfig) {
    let own = upstream_chain(selection, node);
    let mut left = f32::INFINITY;
    for &output in selection.outputs(node) {
        let mut members = upstream_chain(selection, output);
        members.retain(|id| !own.contains(id));
        let chain = dimension_or_self(selection, output, &members, &Bound::UNBOUNDED);
        left = left.min(chain.left);
    }
    push_behind(selection, node, left, config);
}

/// Moves `node` behind `left` when a neighbouring chain reaches further back
/// than the node itself. Nodes only ever move left.
fn push_behind(selection: &mut NodeSelection, node: NodeId, left: f32, config: &LayoutConfig) {
    if !left.is_finite() || left >= selection.rect(node).left - EPSILON {
        return;
    }
    let current = selection.position(node);
    let x = left - config.mainline_spacing() - selection.node(node).width / 2.0;
    if x >= current.x - EPSILON {
        return;
    }
    let Some(anchor) = selection.rightmost_output(node) else {
        return;
    };
    debug!(
        node = selection.node(node).identifier,
        anchor = selection.node(anchor).identifier,
        from = current.x,
        to = x,
        "pushing mainline back"
    );
    offset_node(selection, node, anchor, Position::new(x, current.y));
    update_all_chain_positions(selection, node);
    push_inputs_behind(selection, node, config);
}
