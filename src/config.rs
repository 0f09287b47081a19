use serde::{Deserialize, Serialize};
use std::path::Path;

/// How sibling input chains are placed relative to the node they feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum VerticalAlignment {
    /// The first input stays in line with its consumer; no re-centering.
    MainlineAnchored,
    /// Stacked inputs are shifted so the consumer sits at their midpoint.
    #[default]
    Centered,
    /// Input stacks hang from the consumer's top edge.
    TopStacked,
}

impl VerticalAlignment {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "mainline" | "mainline-anchored" | "mainline_anchored" => Some(Self::MainlineAnchored),
            "center" | "centered" | "centre" => Some(Self::Centered),
            "top" | "top-stacked" | "top_stacked" => Some(Self::TopStacked),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Base gap between neighbouring boxes, horizontally and vertically.
    pub node_spacing: f32,
    /// Extra gap added on top of `node_spacing` when a mainline is pushed back.
    pub mainline_offset: f32,
    /// Chains narrower than this are never picked as a mainline.
    pub min_chain_width: f32,
    pub vertical_alignment: VerticalAlignment,
    /// Run the mainline pass between the horizontal and vertical passes.
    pub mainline: bool,
    pub node_width: f32,
    pub node_base_height: f32,
    /// Height added per slot beyond the third, on each side of the node.
    pub slot_height: f32,
    /// Gap multiplier between a root and the shared input it is pinned to.
    pub root_spacing_multiplier: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_spacing: 40.0,
            mainline_offset: 0.0,
            min_chain_width: 0.0,
            vertical_alignment: VerticalAlignment::Centered,
            mainline: true,
            node_width: 120.0,
            node_base_height: 96.0,
            slot_height: 10.7,
            root_spacing_multiplier: 4.0,
        }
    }
}

impl LayoutConfig {
    /// Box height for a node with `slots` connectable slots.
    pub fn node_height(&self, slots: usize) -> f32 {
        let extra = slots.saturating_sub(3) as f32;
        self.node_base_height + extra * 2.0 * self.slot_height
    }

    pub fn mainline_spacing(&self) -> f32 {
        self.node_spacing + self.mainline_offset
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub padding: f32,
    pub background: String,
    pub node_fill: String,
    pub node_stroke: String,
    pub line_color: String,
    pub text_color: String,
    pub font_family: String,
    pub font_size: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            padding: 24.0,
            background: "#FFFFFF".to_string(),
            node_fill: "#ECECFF".to_string(),
            node_stroke: "#9370DB".to_string(),
            line_color: "#333333".to_string(),
            text_color: "#131300".to_string(),
            font_family: "Inter, sans-serif".to_string(),
            font_size: 14.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    node_spacing: Option<f32>,
    mainline_offset: Option<f32>,
    min_chain_width: Option<f32>,
    vertical_alignment: Option<String>,
    mainline: Option<bool>,
    node_width: Option<f32>,
    node_base_height: Option<f32>,
    slot_height: Option<f32>,
    root_spacing_multiplier: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    padding: Option<f32>,
    background: Option<String>,
    node_fill: Option<String>,
    node_stroke: Option<String>,
    line_color: Option<String>,
    text_color: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    layout: Option<LayoutConfigFile>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(file) = parsed.layout {
        let layout = &mut config.layout;
        if let Some(v) = file.node_spacing {
            layout.node_spacing = v.max(0.0);
        }
        if let Some(v) = file.mainline_offset {
            layout.mainline_offset = v;
        }
        if let Some(v) = file.min_chain_width {
            layout.min_chain_width = v.max(0.0);
        }
        if let Some(token) = file.vertical_alignment.as_deref() {
            layout.vertical_alignment = VerticalAlignment::from_token(token).ok_or_else(|| {
                anyhow::anyhow!("unknown verticalAlignment `{token}` (expected mainline, centered or top)")
            })?;
        }
        if let Some(v) = file.mainline {
            layout.mainline = v;
        }
        if let Some(v) = file.node_width {
            layout.node_width = v.max(1.0);
        }
        if let Some(v) = file.node_base_height {
            layout.node_base_height = v.max(1.0);
        }
        if let Some(v) = file.slot_height {
            layout.slot_height = v.max(0.0);
        }
        if let Some(v) = file.root_spacing_multiplier {
            layout.root_spacing_multiplier = v.max(0.0);
        }
    }

    if let Some(file) = parsed.render {
        let render = &mut config.render;
        if let Some(v) = file.width {
            render.width = v;
        }
        if let Some(v) = file.height {
            render.height = v;
        }
        if let Some(v) = file.padding {
            render.padding = v.max(0.0);
        }
        if let Some(v) = file.background {
            render.background = v;
        }
        if let Some(v) = file.node_fill {
            render.node_fill = v;
        }
        if let Some(v) = file.node_stroke {
            render.node_stroke = v;
        }
        if let Some(v) = file.line_color {
            render.line_color = v;
        }
        if let Some(v) = file.text_color {
            render.text_color = v;
        }
        if let Some(v) = file.font_family {
            render.font_family = v;
        }
        if let Some(v) = file.font_size {
            render.font_size = v;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_height_grows_past_three_slots() {
        let config = LayoutConfig::default();
        assert_eq!(config.node_height(0), 96.0);
        assert_eq!(config.node_height(3), 96.0);
        assert!((config.node_height(4) - 117.4).abs() < 1e-4);
        assert!((config.node_height(6) - 160.2).abs() < 1e-3);
    }

    #[test]
    fn parses_layout_overrides() {
        let config = parse_config(
            r#"{"layout": {"nodeSpacing": 25, "verticalAlignment": "top", "mainline": false}}"#,
        )
        .unwrap();
        assert_eq!(config.layout.node_spacing, 25.0);
        assert_eq!(config.layout.vertical_alignment, VerticalAlignment::TopStacked);
        assert!(!config.layout.mainline);
        assert_eq!(config.layout.node_width, LayoutConfig::default().node_width);
    }

    #[test]
    fn rejects_unknown_alignment() {
        let err = parse_config(r#"{"layout": {"verticalAlignment": "diagonal"}}"#).unwrap_err();
        assert!(err.to_string().contains("diagonal"));
    }

    #[test]
    fn alignment_tokens() {
        assert_eq!(
            VerticalAlignment::from_token("Mainline"),
            Some(VerticalAlignment::MainlineAnchored)
        );
        assert_eq!(VerticalAlignment::from_token("centre"), Some(VerticalAlignment::Centered));
        assert_eq!(VerticalAlignment::from_token("sideways"), None);
    }
}
