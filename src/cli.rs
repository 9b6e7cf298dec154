use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, ValueEnum};

use crate::config::load_config;
use crate::document::Document;
use crate::layout::auto_layout;
use crate::layout::routing::route_all_edges;
use crate::render::{render_svg, write_output_svg};
use crate::text_metrics::{FixedMetrics, FontMetrics, SystemFonts};

#[derive(Parser, Debug)]
#[command(name = "mmed", version, about = "Mind-map layout and SVG renderer")]
pub struct Args {
    /// Input document (.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file overriding editor defaults
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Viewport width
    #[arg(short = 'w', long = "width", default_value_t = 1200.0)]
    pub width: f32,

    /// Viewport height
    #[arg(short = 'H', long = "height", default_value_t = 800.0)]
    pub height: f32,

    /// Re-run the radial auto layout before rendering
    #[arg(short = 'l', long = "layout")]
    pub layout: bool,

    /// Use fixed per-character metrics instead of system fonts
    #[arg(long = "fixedMetrics")]
    pub fixed_metrics: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    /// Routed geometry as JSON, for tooling and diffing.
    JsonDump,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let metrics: Box<dyn FontMetrics> = if args.fixed_metrics {
        Box::new(FixedMetrics::default())
    } else {
        Box::new(SystemFonts::new(
            config.theme.font_family.clone(),
            config.theme.font_size,
        ))
    };

    let raw = read_input(args.input.as_deref())?;
    let doc: Document = serde_json::from_str(&raw)?;
    let mut ws = doc.into_workspace(metrics.as_ref(), &config)?;

    if args.layout {
        auto_layout(&mut ws, (args.width, args.height), &config);
    }
    let edges = route_all_edges(&mut ws, &config);

    match args.output_format {
        OutputFormat::Svg => {
            let svg = render_svg(
                &ws,
                &edges,
                None,
                (args.width, args.height),
                metrics.as_ref(),
                &config,
            );
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::JsonDump => {
            let dump = geometry_dump(&ws, &edges);
            let json = serde_json::to_string_pretty(&dump)?;
            match &args.output {
                Some(path) => std::fs::write(path, json)?,
                None => println!("{json}"),
            }
        }
    }
    Ok(())
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

fn geometry_dump(
    ws: &crate::model::Workspace,
    edges: &[crate::layout::routing::EdgePath],
) -> serde_json::Value {
    serde_json::json!({
        "root": ws.root(),
        "nodes": ws
            .nodes()
            .map(|(id, node)| {
                serde_json::json!({
                    "id": id,
                    "text": node.text,
                    "x": node.x,
                    "y": node.y,
                    "width": node.width,
                    "height": node.height,
                    "fill": node.fill,
                })
            })
            .collect::<Vec<_>>(),
        "edges": edges
            .iter()
            .map(|edge| {
                serde_json::json!({
                    "parent": edge.parent,
                    "child": edge.child,
                    "offset": edge.offset,
                    "points": edge.points,
                })
            })
            .collect::<Vec<_>>(),
    })
}
