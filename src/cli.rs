use crate::config::{Config, VerticalAlignment, load_config};
use crate::layout::compute_layout;
use crate::layout_dump::{LayoutDump, write_layout_dump};
use crate::parser::parse_snapshot;
use crate::render::{render_svg, write_output_svg};
use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "narrange", version, about = "Auto-arrange node graph snapshots")]
pub struct Args {
    /// Input snapshot (JSON or text) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for JSON and SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Config JSON file with layout and render overrides
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Vertical alignment policy
    #[arg(long = "alignment", value_enum)]
    pub alignment: Option<AlignmentArg>,

    /// Gap between neighbouring nodes
    #[arg(long = "spacing")]
    pub spacing: Option<f32>,

    /// Skip the mainline pass
    #[arg(long = "no-mainline")]
    pub no_mainline: bool,

    /// More log output on stderr (repeat for trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Svg,
    Png,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentArg {
    Mainline,
    Centered,
    Top,
}

impl From<AlignmentArg> for VerticalAlignment {
    fn from(arg: AlignmentArg) -> Self {
        match arg {
            AlignmentArg::Mainline => VerticalAlignment::MainlineAnchored,
            AlignmentArg::Centered => VerticalAlignment::Centered,
            AlignmentArg::Top => VerticalAlignment::TopStacked,
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose)?;

    let config = apply_overrides(load_config(args.config.as_deref())?, &args);
    let input = read_input(args.input.as_deref())?;
    let snapshot = parse_snapshot(&input)?;
    debug!(
        nodes = snapshot.nodes.len(),
        connections = snapshot.connections.len(),
        "parsed snapshot"
    );

    let layout = compute_layout(&snapshot, &config.layout);
    info!(
        nodes = layout.nodes.len(),
        width = layout.width,
        height = layout.height,
        "layout done"
    );

    match args.output_format {
        OutputFormat::Json => match args.output.as_deref() {
            Some(path) => write_layout_dump(path, &layout)?,
            None => println!("{}", LayoutDump::from_layout(&layout).to_json()?),
        },
        OutputFormat::Svg => {
            let svg = render_svg(&layout, &config.render);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_png(&render_svg(&layout, &config.render), &output, &config)?;
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, config: &Config) -> Result<()> {
    crate::render::write_output_png(svg, output, &config.render)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _config: &Config) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

/// Logs go to stderr so stdout stays clean for output. `RUST_LOG` wins over
/// `--verbose`.
fn init_tracing(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init()?;
    Ok(())
}

fn apply_overrides(mut config: Config, args: &Args) -> Config {
    if let Some(alignment) = args.alignment {
        config.layout.vertical_alignment = alignment.into();
    }
    if let Some(spacing) = args.spacing {
        config.layout.node_spacing = spacing.max(0.0);
    }
    if args.no_mainline {
        config.layout.mainline = false;
    }
    config
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
