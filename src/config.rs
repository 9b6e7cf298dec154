use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Minimum node width; also the unit for layout columns and routing pull
    /// distances.
    pub base_width: f32,
    /// Minimum node height.
    pub base_height: f32,
    /// Clearance kept around node bodies by the free-position finder and the
    /// router's obstacle test.
    pub margin: f32,
    pub padding_side: f32,
    pub padding_top: f32,
    pub padding_bottom: f32,
    pub line_gap: f32,
    pub outline_width: f32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            base_width: 160.0,
            base_height: 56.0,
            margin: 18.0,
            padding_side: 14.0,
            padding_top: 12.0,
            padding_bottom: 12.0,
            line_gap: 4.0,
            outline_width: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Horizontal gap between depth columns.
    pub horizontal_gap: f32,
    /// Vertical gap between slot rows.
    pub vertical_gap: f32,
    /// Blend weight pulling a child's slot toward its parent's slot. Zero
    /// for children of the root.
    pub parent_pull: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            horizontal_gap: 60.0,
            vertical_gap: 36.0,
            parent_pull: 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Spacing between successive lateral offset candidates, in screen units.
    pub candidate_step: f32,
    /// Number of ± rounds tried after the base offset (4 rounds gives the
    /// ladder 0, ±step, ±2·step, ±3·step, ±4·step).
    pub candidate_rounds: usize,
    /// Uniform parameter steps when flattening a cubic into a polyline.
    pub curve_samples: usize,
    /// Minimum outward push of the exit point off the node ellipse.
    pub exit_margin_min: f32,
    /// Zoom-proportional part of the exit margin.
    pub exit_margin_scale: f32,
    /// Edges whose endpoints sit within this distance of each other are
    /// allowed to touch without counting as a crossing.
    pub shared_endpoint_tol: f32,
    /// Per-segment endpoint tolerance inside the intersection test.
    pub segment_endpoint_tol: f32,
    pub edge_width: f32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            candidate_step: 20.0,
            candidate_rounds: 4,
            curve_samples: 32,
            exit_margin_min: 1.5,
            exit_margin_scale: 1.2,
            shared_endpoint_tol: 6.0,
            segment_endpoint_tol: 1.5,
            edge_width: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    pub zoom_min: f32,
    pub zoom_max: f32,
    pub zoom_step: f32,
    pub pan_step: f32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            zoom_min: 0.4,
            zoom_max: 2.5,
            zoom_step: 1.1,
            pan_step: 60.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub view: ViewConfig,
}

/// Overlay file for `load_config`. Absent sections keep their defaults.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    theme: Option<Theme>,
    node: Option<NodeConfig>,
    layout: Option<LayoutConfig>,
    routing: Option<RoutingConfig>,
    view: Option<ViewConfig>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<EditorConfig> {
    let mut config = EditorConfig::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;
    if let Some(theme) = parsed.theme {
        config.theme = theme;
    }
    if let Some(node) = parsed.node {
        config.node = node;
    }
    if let Some(layout) = parsed.layout {
        config.layout = layout;
    }
    if let Some(routing) = parsed.routing {
        config.routing = routing;
    }
    if let Some(view) = parsed.view {
        config.view = view;
    }
    Ok(config)
}
