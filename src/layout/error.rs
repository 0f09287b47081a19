use thiserror::Error;

use super::graph::NodeId;

/// Signals raised by a chain-dimension walk. Both are routinely caught: the
/// usual recovery is to measure the node's own box instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("node {0} is not a member of the measured chain")]
    NotInChain(NodeId),
    #[error("node {0} lies outside the limiting bound")]
    OutOfBounds(NodeId),
}
