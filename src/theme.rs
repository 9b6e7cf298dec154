use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub background: String,
    pub node_outline: String,
    pub selection_outline: String,
    pub edge_color: String,
    pub text_color: String,
    /// Fill palette cycled through for new nodes and depth-derived fills.
    pub palette: Vec<String>,
}

impl Theme {
    pub fn pastel() -> Self {
        Self {
            font_family: "Segoe UI, Inter, system-ui, sans-serif".to_string(),
            font_size: 11.0,
            background: "#fbfbfd".to_string(),
            node_outline: "#d4d4d8".to_string(),
            selection_outline: "#0ea5e9".to_string(),
            edge_color: "#555555".to_string(),
            text_color: "#1c2430".to_string(),
            palette: vec![
                "#B9C2FF".to_string(),
                "#FFB3BE".to_string(),
                "#FFF49A".to_string(),
                "#C6FFB0".to_string(),
                "#B7F0FF".to_string(),
                "#DDB096".to_string(),
                "#B5A0DD".to_string(),
                "#9DDDD0".to_string(),
                "#DDA0B7".to_string(),
                "#B1DD53".to_string(),
            ],
        }
    }

    /// Fill for a node whose color was never customized.
    pub fn depth_fill(&self, depth: usize) -> String {
        if self.palette.is_empty() {
            return "#ffffff".to_string();
        }
        self.palette[depth % self.palette.len()].clone()
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::pastel()
    }
}
