#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod render;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, VerticalAlignment, load_config};
pub use ir::{Connection, GraphSnapshot, NodeRecord};
pub use layout::{Layout, apply_layout, compute_layout};
pub use parser::{ParseError, parse_snapshot};
pub use render::render_svg;
