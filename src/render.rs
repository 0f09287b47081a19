use crate::config::RenderConfig;
use crate::layout::{Connector, Layout};
use anyhow::Result;
use std::path::Path;

/// Preview rendering: one box per node, labelled with its identifier, and an
/// elbow connector per connection. Roots get a heavier outline.
pub fn render_svg(layout: &Layout, config: &RenderConfig) -> String {
    let mut svg = String::new();
    let pad = config.padding;
    let width = (layout.width + pad * 2.0).max(200.0);
    let height = (layout.height + pad * 2.0).max(200.0);
    // Layout coordinates may be negative; shift everything into the canvas.
    let dx = pad - layout.left;
    let dy = pad - layout.upper;

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"0 0 {width:.2} {height:.2}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        config.background
    ));
    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        config.line_color
    ));
    svg.push_str("</defs>");

    for connector in layout.connectors() {
        svg.push_str(&format!(
            "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.4\" marker-end=\"url(#arrow)\" />",
            connector_path(&connector, dx, dy),
            config.line_color
        ));
    }

    for node in layout.nodes.values() {
        let rect = node.rect();
        let stroke_width = if node.root { 2.4 } else { 1.4 };
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"8\" ry=\"8\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{stroke_width}\"/>",
            rect.left + dx,
            rect.upper + dy,
            rect.width(),
            rect.height(),
            config.node_fill,
            config.node_stroke
        ));
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" dominant-baseline=\"central\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            node.x + dx,
            node.y + dy,
            escape_xml(&config.font_family),
            config.font_size,
            config.text_color,
            node.id
        ));
    }

    svg.push_str("</svg>");
    svg
}

/// Horizontal out of the source, vertical in the gap, horizontal into the
/// consumer.
fn connector_path(connector: &Connector, dx: f32, dy: f32) -> String {
    let (sx, sy) = (connector.start.x + dx, connector.start.y + dy);
    let (ex, ey) = (connector.end.x + dx, connector.end.y + dy);
    if (sy - ey).abs() < 0.01 {
        return format!("M {sx:.2} {sy:.2} L {ex:.2} {ey:.2}");
    }
    let mid = (sx + ex) / 2.0;
    format!("M {sx:.2} {sy:.2} L {mid:.2} {sy:.2} L {mid:.2} {ey:.2} L {ex:.2} {ey:.2}")
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = render_cfg
        .font_family
        .split(',')
        .next()
        .map(|family| family.trim().to_string())
        .unwrap_or_default();
    opt.fontdb_mut().load_system_fonts();
    if let Some(size) = usvg::Size::from_wh(render_cfg.width, render_cfg.height) {
        opt.default_size = size;
    }

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
