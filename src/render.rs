use std::path::Path;

use anyhow::Result;

use crate::config::EditorConfig;
use crate::layout::routing::EdgePath;
use crate::layout::text::parse_formatted_lines;
use crate::model::{NodeId, Workspace};
use crate::text_metrics::FontMetrics;

/// Render the workspace to an SVG string. Edges are emitted first so node
/// shapes layer above them; nodes draw in ascending id order, matching the
/// hit-test stacking.
pub fn render_svg(
    ws: &Workspace,
    edges: &[EdgePath],
    selected: Option<NodeId>,
    viewport: (f32, f32),
    metrics: &dyn FontMetrics,
    config: &EditorConfig,
) -> String {
    let theme = &config.theme;
    let mut svg = String::new();
    let width = viewport.0.max(200.0);
    let height = viewport.1.max(200.0);
    let scale = if ws.view.scale == 0.0 { 1.0 } else { ws.view.scale };

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    for edge in edges {
        let d = points_to_path(&edge.points);
        svg.push_str(&format!(
            "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{:.2}\"/>",
            d,
            theme.edge_color,
            config.routing.edge_width * scale
        ));
    }

    for (id, node) in ws.nodes() {
        let Some((cx, cy)) = ws.screen_center(id) else {
            continue;
        };
        let rx = node.width * scale / 2.0;
        let ry = node.height * scale / 2.0;
        let fill = node.fill.as_deref().unwrap_or("#ffffff");
        let outline = if selected == Some(id) {
            theme.selection_outline.as_str()
        } else {
            theme.node_outline.as_str()
        };
        svg.push_str(&format!(
            "<ellipse cx=\"{cx:.2}\" cy=\"{cy:.2}\" rx=\"{rx:.2}\" ry=\"{ry:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{:.2}\"/>",
            fill,
            outline,
            config.node.outline_width * scale
        ));
        svg.push_str(&node_text_svg(&node.text, (cx, cy), scale, metrics, config));
    }

    svg.push_str("</svg>");
    svg
}

fn points_to_path(points: &[(f32, f32)]) -> String {
    if points.is_empty() {
        return String::new();
    }
    let mut d = String::new();
    d.push_str(&format!("M {:.2} {:.2}", points[0].0, points[0].1));
    for point in points.iter().skip(1) {
        d.push_str(&format!(" L {:.2} {:.2}", point.0, point.1));
    }
    d
}

/// Styled node text centered on `(cx, cy)`: one `<text>` per line so lines
/// can be positioned vertically, with a `<tspan>` per style run inside it.
fn node_text_svg(
    text: &str,
    (cx, cy): (f32, f32),
    scale: f32,
    metrics: &dyn FontMetrics,
    config: &EditorConfig,
) -> String {
    let theme = &config.theme;
    let lines = parse_formatted_lines(if text.is_empty() { " " } else { text });
    let line_heights: Vec<f32> = lines
        .iter()
        .map(|line| {
            line.iter()
                .map(|seg| metrics.line_height(seg.bold, seg.italic))
                .fold(0.0f32, f32::max)
                * scale
        })
        .collect();
    let gap = config.node.line_gap * scale;
    let total: f32 = line_heights.iter().sum::<f32>() + gap * (lines.len().saturating_sub(1)) as f32;

    let mut out = String::new();
    let mut y = cy - total / 2.0;
    for (line, line_height) in lines.iter().zip(&line_heights) {
        // Approximate the baseline within the line box.
        let baseline = y + line_height * 0.8;
        out.push_str(&format!(
            "<text x=\"{cx:.2}\" y=\"{baseline:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{:.2}\" fill=\"{}\">",
            theme.font_family,
            theme.font_size * scale,
            theme.text_color
        ));
        for seg in line {
            let weight = if seg.bold { " font-weight=\"bold\"" } else { "" };
            let style = if seg.italic { " font-style=\"italic\"" } else { "" };
            out.push_str(&format!(
                "<tspan{weight}{style}>{}</tspan>",
                escape_xml(&seg.text)
            ));
        }
        out.push_str("</text>");
        y += line_height + gap;
    }
    out
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

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
