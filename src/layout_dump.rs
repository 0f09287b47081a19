use crate::layout::Layout;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub left: f32,
    pub upper: f32,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub connections: Vec<ConnectionDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub root: bool,
}

#[derive(Debug, Serialize)]
pub struct ConnectionDump {
    pub from: u64,
    pub to: u64,
    pub points: Vec<[f32; 2]>,
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout) -> Self {
        let nodes = layout
            .nodes
            .values()
            .map(|node| NodeDump {
                id: node.id,
                x: node.x,
                y: node.y,
                width: node.width,
                height: node.height,
                root: node.root,
            })
            .collect();

        let connections = layout
            .connectors()
            .into_iter()
            .map(|connector| ConnectionDump {
                from: connector.from,
                to: connector.to,
                points: vec![
                    [connector.start.x, connector.start.y],
                    [connector.end.x, connector.end.y],
                ],
            })
            .collect();

        LayoutDump {
            left: layout.left,
            upper: layout.upper,
            width: layout.width,
            height: layout.height,
            nodes,
            connections,
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn write_layout_dump(path: &Path, layout: &Layout) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
