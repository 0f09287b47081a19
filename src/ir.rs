use serde::{Deserialize, Serialize};

/// One node handle as the host hands it over: identity, current centre and
/// enough shape metadata to derive the box size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: u64,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    /// Number of connectable slots (inputs plus outputs) drawn on the node.
    #[serde(default = "default_slots")]
    pub slots: usize,
    /// Overrides `LayoutConfig::node_width` for this node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
}

fn default_slots() -> usize {
    1
}

impl NodeRecord {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            x: 0.0,
            y: 0.0,
            slots: default_slots(),
            width: None,
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_slots(mut self, slots: usize) -> Self {
        self.slots = slots;
        self
    }
}

/// A resolved connection: `from`'s output slot feeds `to`'s input slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from: u64,
    #[serde(default, rename = "fromSlot", alias = "from_slot")]
    pub from_slot: usize,
    pub to: u64,
    #[serde(default, rename = "toSlot", alias = "to_slot")]
    pub to_slot: usize,
}

impl Connection {
    pub fn new(from: u64, to: u64, to_slot: usize) -> Self {
        Self {
            from,
            from_slot: 0,
            to,
            to_slot,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl GraphSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node record unless the identifier is already present.
    pub fn ensure_node(&mut self, id: u64) -> &mut NodeRecord {
        let idx = match self.nodes.iter().position(|node| node.id == id) {
            Some(idx) => idx,
            None => {
                self.nodes.push(NodeRecord::new(id));
                self.nodes.len() - 1
            }
        };
        &mut self.nodes[idx]
    }

    /// Connects `from` into the next free input slot of `to`.
    pub fn connect(&mut self, from: u64, to: u64) {
        let slot = self
            .connections
            .iter()
            .filter(|conn| conn.to == to)
            .map(|conn| conn.to_slot + 1)
            .max()
            .unwrap_or(0);
        self.connections.push(Connection::new(from, to, slot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_assigns_increasing_input_slots() {
        let mut snapshot = GraphSnapshot::new();
        snapshot.ensure_node(1);
        snapshot.ensure_node(2);
        snapshot.ensure_node(3);
        snapshot.connect(2, 1);
        snapshot.connect(3, 1);
        assert_eq!(snapshot.connections[0].to_slot, 0);
        assert_eq!(snapshot.connections[1].to_slot, 1);
    }

    #[test]
    fn ensure_node_is_idempotent() {
        let mut snapshot = GraphSnapshot::new();
        snapshot.ensure_node(7).x = 12.0;
        snapshot.ensure_node(7);
        assert_eq!(snapshot.nodes.len(), 1);
        assert_eq!(snapshot.nodes[0].x, 12.0);
    }
}
