use crate::ir::{Connection, GraphSnapshot};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static NODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^node\s+(?P<id>\d+)(?P<rest>.*)$").unwrap());
static AT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bat\s+(?P<x>-?\d+(?:\.\d+)?)\s*,\s*(?P<y>-?\d+(?:\.\d+)?)").unwrap()
});
static SLOTS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bslots\s+(?P<n>\d+)").unwrap());
static WIDTH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bwidth\s+(?P<w>\d+(?:\.\d+)?)").unwrap());
static EDGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<from>\d+)(?::(?P<from_slot>\d+))?\s*->\s*(?P<to>\d+)(?::(?P<to_slot>\d+))?$",
    )
    .unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("invalid JSON snapshot: {0}")]
    Json(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Text,
}

pub fn detect_format(input: &str) -> SnapshotFormat {
    let first = input
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with("//"));
    match first {
        Some(line) if line.starts_with('{') => SnapshotFormat::Json,
        _ => SnapshotFormat::Text,
    }
}

/// Parses a snapshot in either supported format.
pub fn parse_snapshot(input: &str) -> Result<GraphSnapshot, ParseError> {
    match detect_format(input) {
        SnapshotFormat::Json => parse_json_snapshot(input),
        SnapshotFormat::Text => parse_text_snapshot(input),
    }
}

/// JSON (or JSON5: comments and trailing commas are fine) snapshot.
pub fn parse_json_snapshot(input: &str) -> Result<GraphSnapshot, ParseError> {
    json5::from_str(input).map_err(|err| ParseError::Json(err.to_string()))
}

/// Line-based snapshot:
///
/// ```text
/// # comment
/// node 1 at 400,0 slots 2
/// 2 -> 1
/// 3:0 -> 1:1
/// ```
///
/// Connections may name nodes that have no `node` line; those are created
/// with default attributes. A connection without an input slot takes the
/// next free slot of its target.
pub fn parse_text_snapshot(input: &str) -> Result<GraphSnapshot, ParseError> {
    let mut snapshot = GraphSnapshot::new();
    for (idx, raw) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = NODE_RE.captures(line) {
            let id = parse_number::<u64>(&caps["id"], line_no)?;
            let rest = &caps["rest"];
            let record = snapshot.ensure_node(id);
            if let Some(at) = AT_RE.captures(rest) {
                record.x = parse_number(&at["x"], line_no)?;
                record.y = parse_number(&at["y"], line_no)?;
            }
            if let Some(slots) = SLOTS_RE.captures(rest) {
                record.slots = parse_number(&slots["n"], line_no)?;
            }
            if let Some(width) = WIDTH_RE.captures(rest) {
                record.width = Some(parse_number(&width["w"], line_no)?);
            }
            continue;
        }

        if let Some(caps) = EDGE_RE.captures(line) {
            let from = parse_number::<u64>(&caps["from"], line_no)?;
            let to = parse_number::<u64>(&caps["to"], line_no)?;
            if from == to {
                return Err(ParseError::Syntax {
                    line: line_no,
                    message: format!("node {from} cannot feed itself"),
                });
            }
            snapshot.ensure_node(from);
            snapshot.ensure_node(to);
            match caps.name("to_slot") {
                Some(slot) => {
                    let to_slot = parse_number(slot.as_str(), line_no)?;
                    let from_slot = match caps.name("from_slot") {
                        Some(slot) => parse_number(slot.as_str(), line_no)?,
                        None => 0,
                    };
                    snapshot.connections.push(Connection {
                        from,
                        from_slot,
                        to,
                        to_slot,
                    });
                }
                None => {
                    snapshot.connect(from, to);
                    if let (Some(slot), Some(conn)) =
                        (caps.name("from_slot"), snapshot.connections.last_mut())
                    {
                        conn.from_slot = parse_number(slot.as_str(), line_no)?;
                    }
                }
            }
            continue;
        }

        return Err(ParseError::Syntax {
            line: line_no,
            message: format!("unrecognised statement `{line}`"),
        });
    }
    Ok(snapshot)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn parse_number<T: std::str::FromStr>(token: &str, line: usize) -> Result<T, ParseError> {
    token.parse().map_err(|_| ParseError::Syntax {
        line,
        message: format!("invalid number `{token}`"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_text_nodes_and_edges() {
        let input = "# comp\nnode 1 at 400,-20.5 slots 5\nnode 2 width 80\n2 -> 1\n3:1 -> 1:4\n";
        let snapshot = parse_snapshot(input).unwrap();
        assert_eq!(snapshot.nodes.len(), 3);
        assert_eq!(snapshot.nodes[0].x, 400.0);
        assert_eq!(snapshot.nodes[0].y, -20.5);
        assert_eq!(snapshot.nodes[0].slots, 5);
        assert_eq!(snapshot.nodes[1].width, Some(80.0));
        assert_eq!(snapshot.connections.len(), 2);
        assert_eq!(snapshot.connections[0].to_slot, 0);
        assert_eq!(snapshot.connections[1].from_slot, 1);
        assert_eq!(snapshot.connections[1].to_slot, 4);
    }

    #[test]
    fn parse_text_assigns_free_slots() {
        let snapshot = parse_snapshot("2 -> 1\n3 -> 1 # second\n4 -> 1").unwrap();
        let slots: Vec<usize> = snapshot.connections.iter().map(|c| c.to_slot).collect();
        assert_eq!(slots, vec![0, 1, 2]);
    }

    #[test]
    fn parse_text_reports_line() {
        let err = parse_snapshot("2 -> 1\n\nthis is not a graph").unwrap_err();
        assert_eq!(
            err,
            ParseError::Syntax {
                line: 3,
                message: "unrecognised statement `this is not a graph`".to_string()
            }
        );
        let err = parse_snapshot("4 -> 4").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn parse_json5_snapshot() {
        let input = r#"{
            // hand-written
            nodes: [{id: 1, x: 10, y: 20}, {id: 2, slots: 4},],
            connections: [{from: 2, to: 1, toSlot: 0}],
        }"#;
        assert_eq!(detect_format(input), SnapshotFormat::Json);
        let snapshot = parse_snapshot(input).unwrap();
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.nodes[1].slots, 4);
        assert_eq!(snapshot.nodes[0].slots, 1);
        assert_eq!(snapshot.connections[0].from, 2);
    }

    #[test]
    fn parse_strict_json_snapshot() {
        let input = r#"{"nodes": [{"id": 5}], "connections": []}"#;
        let snapshot = parse_snapshot(input).unwrap();
        assert_eq!(snapshot.nodes[0].id, 5);
        assert!(matches!(parse_snapshot("{nodes: [}"), Err(ParseError::Json(_))));
    }
}
