use node_arrange::layout_dump::LayoutDump;
use node_arrange::{LayoutConfig, VerticalAlignment, compute_layout, parse_snapshot};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArrangeOptions {
    alignment: Option<String>,
    node_spacing: Option<f32>,
    mainline: Option<bool>,
    node_width: Option<f32>,
}

fn build_layout_config(options: ArrangeOptions) -> Result<LayoutConfig, String> {
    let mut config = LayoutConfig::default();
    if let Some(token) = options.alignment {
        config.vertical_alignment = VerticalAlignment::from_token(&token)
            .ok_or_else(|| format!("unknown alignment `{token}`"))?;
    }
    if let Some(spacing) = options.node_spacing {
        config.node_spacing = spacing.max(0.0);
    }
    if let Some(mainline) = options.mainline {
        config.mainline = mainline;
    }
    if let Some(width) = options.node_width {
        config.node_width = width.max(1.0);
    }
    Ok(config)
}

fn layout_json(input: &str, options_json: Option<&str>) -> Result<String, String> {
    let options = match options_json {
        Some(raw) => serde_json::from_str::<ArrangeOptions>(raw).map_err(|err| err.to_string())?,
        None => ArrangeOptions::default(),
    };
    let config = build_layout_config(options)?;
    let snapshot = parse_snapshot(input).map_err(|err| err.to_string())?;
    let layout = compute_layout(&snapshot, &config);
    LayoutDump::from_layout(&layout)
        .to_json()
        .map_err(|err| err.to_string())
}

/// Lays out a snapshot (JSON or text) and returns the layout dump as JSON.
#[wasm_bindgen]
pub fn layout_snapshot_json(input: &str, options_json: Option<String>) -> Result<String, JsValue> {
    layout_json(input, options_json.as_deref()).map_err(|error| JsValue::from_str(&error))
}

#[cfg(test)]
mod tests {
    use crate::{ArrangeOptions, build_layout_config, layout_json};
    use node_arrange::VerticalAlignment;

    #[test]
    fn lays_out_text_snapshot() {
        let json = layout_json("node 1 at 500,0\n2 -> 1\n3 -> 1", Some(r#"{"alignment": "top"}"#))
            .expect("snapshot should lay out");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["nodes"].as_array().map(Vec::len), Some(3));
        assert_eq!(value["connections"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn rejects_unknown_alignment() {
        let options = ArrangeOptions {
            alignment: Some("sideways".to_string()),
            ..ArrangeOptions::default()
        };
        assert!(build_layout_config(options).is_err());
        let options = ArrangeOptions {
            alignment: Some("mainline".to_string()),
            mainline: Some(false),
            ..ArrangeOptions::default()
        };
        let config = build_layout_config(options).unwrap();
        assert_eq!(config.vertical_alignment, VerticalAlignment::MainlineAnchored);
        assert!(!config.mainline);
    }
}
