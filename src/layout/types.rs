use std::collections::BTreeMap;
use std::ops::{Add, Sub};

use serde::Serialize;

/// Tolerance used for every positional comparison in the passes.
pub const EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn approx_eq(self, other: Self, epsilon: f32) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.y - other.y).abs() <= epsilon
    }
}

impl Add for Position {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Position {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Axis-aligned box in graph space (Y grows downward, so `upper < lower`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub right: f32,
    pub upper: f32,
    pub lower: f32,
}

impl Rect {
    pub fn centered(center: Position, width: f32, height: f32) -> Self {
        Self {
            left: center.x - width / 2.0,
            right: center.x + width / 2.0,
            upper: center.y - height / 2.0,
            lower: center.y + height / 2.0,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.lower - self.upper
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left < other.right - EPSILON
            && other.left < self.right - EPSILON
            && self.upper < other.lower - EPSILON
            && other.upper < self.lower - EPSILON
    }
}

/// Partial box limiting a chain walk; an unset side never excludes anything.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bound {
    pub left: Option<f32>,
    pub right: Option<f32>,
    pub upper: Option<f32>,
    pub lower: Option<f32>,
}

impl Bound {
    pub const UNBOUNDED: Self = Self {
        left: None,
        right: None,
        upper: None,
        lower: None,
    };

    pub fn left(limit: f32) -> Self {
        Self {
            left: Some(limit),
            ..Self::UNBOUNDED
        }
    }

    pub fn contains(&self, rect: &Rect) -> bool {
        self.left.is_none_or(|limit| rect.left >= limit - EPSILON)
            && self.right.is_none_or(|limit| rect.right <= limit + EPSILON)
            && self.upper.is_none_or(|limit| rect.upper >= limit - EPSILON)
            && self.lower.is_none_or(|limit| rect.lower <= limit + EPSILON)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeLayout {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub inputs: Vec<u64>,
    pub root: bool,
}

impl NodeLayout {
    pub fn rect(&self) -> Rect {
        Rect::centered(Position::new(self.x, self.y), self.width, self.height)
    }
}

/// Final positions of one layout invocation, keyed by external identifier.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub nodes: BTreeMap<u64, NodeLayout>,
    pub left: f32,
    pub upper: f32,
    pub width: f32,
    pub height: f32,
}

impl Layout {
    pub fn positions(&self) -> Vec<(u64, Position)> {
        self.nodes
            .values()
            .map(|node| (node.id, Position::new(node.x, node.y)))
            .collect()
    }

    pub fn position(&self, id: u64) -> Option<Position> {
        self.nodes.get(&id).map(|node| Position::new(node.x, node.y))
    }

    /// Straight connectors from each input's right edge to its consumer's
    /// left edge, in consumer order.
    pub fn connectors(&self) -> Vec<Connector> {
        let mut connectors = Vec::new();
        for node in self.nodes.values() {
            let target = node.rect();
            for input in &node.inputs {
                let Some(source) = self.nodes.get(input) else {
                    continue;
                };
                connectors.push(Connector {
                    from: *input,
                    to: node.id,
                    start: Position::new(source.rect().right, source.y),
                    end: Position::new(target.left, node.y),
                });
            }
        }
        connectors
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connector {
    pub from: u64,
    pub to: u64,
    pub start: Position,
    pub end: Position,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_from_center() {
        let rect = Rect::centered(Position::new(10.0, 20.0), 100.0, 50.0);
        assert_eq!(rect.left, -40.0);
        assert_eq!(rect.right, 60.0);
        assert_eq!(rect.upper, -5.0);
        assert_eq!(rect.lower, 45.0);
        assert_eq!(rect.width(), 100.0);
        assert_eq!(rect.height(), 50.0);
    }

    #[test]
    fn unset_bound_contains_everything() {
        let rect = Rect::centered(Position::new(-5000.0, 3000.0), 10.0, 10.0);
        assert!(Bound::UNBOUNDED.contains(&rect));
        assert!(!Bound::left(0.0).contains(&rect));
    }

    #[test]
    fn touching_boxes_do_not_overlap() {
        let a = Rect::centered(Position::new(0.0, 0.0), 10.0, 10.0);
        let b = Rect::centered(Position::new(0.0, 10.0), 10.0, 10.0);
        let c = Rect::centered(Position::new(0.0, 9.0), 10.0, 10.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
    }

    #[test]
    fn connectors_join_facing_edges() {
        let mut layout = Layout::default();
        for (id, x, inputs) in [(1, 200.0, vec![2]), (2, 0.0, vec![])] {
            layout.nodes.insert(
                id,
                NodeLayout {
                    id,
                    x,
                    y: 10.0,
                    width: 100.0,
                    height: 40.0,
                    inputs,
                    root: id == 1,
                },
            );
        }
        let connectors = layout.connectors();
        assert_eq!(connectors.len(), 1);
        assert_eq!(connectors[0].from, 2);
        assert_eq!(connectors[0].start, Position::new(50.0, 10.0));
        assert_eq!(connectors[0].end, Position::new(150.0, 10.0));
    }
}
