use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;
use crate::error::DocumentError;
use crate::model::{Node, NodeId, Workspace};
use crate::text_metrics::FontMetrics;

/// On-disk document shape. Node ids are JSON object keys and therefore
/// strings; everything else carries defaults so older or hand-edited files
/// still load.
#[derive(Debug, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub root: Option<NodeId>,
    #[serde(default)]
    pub next_id: Option<NodeId>,
    #[serde(default)]
    pub nodes: BTreeMap<String, DocNode>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DocNode {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub children: Vec<NodeId>,
    #[serde(default)]
    pub fill: Option<String>,
    #[serde(default)]
    pub custom: bool,
}

impl Document {
    pub fn from_workspace(ws: &Workspace) -> Self {
        Self {
            root: ws.root(),
            next_id: Some(ws.next_id()),
            nodes: ws
                .nodes()
                .map(|(id, node)| {
                    (
                        id.to_string(),
                        DocNode {
                            text: node.text.clone(),
                            x: node.x,
                            y: node.y,
                            children: node.children.clone(),
                            fill: node.fill.clone(),
                            custom: node.custom,
                        },
                    )
                })
                .collect(),
        }
    }

    /// Rebuild a workspace from the document. The view transform comes back
    /// at identity and the edge-offset memory starts empty; node sizes are
    /// re-derived from text so a file edited by hand still renders correctly.
    ///
    /// Children pointing at missing ids are dropped. A declared root that no
    /// longer exists falls back to the smallest surviving id. `next_id` is
    /// bumped past the largest id on disk so loaded ids are never reissued.
    pub fn into_workspace(
        self,
        metrics: &dyn FontMetrics,
        config: &EditorConfig,
    ) -> Result<Workspace, DocumentError> {
        let mut nodes: BTreeMap<NodeId, Node> = BTreeMap::new();
        let mut max_id = 0;
        for (key, doc_node) in self.nodes {
            let id: NodeId = key
                .parse()
                .map_err(|_| DocumentError::InvalidNodeId(key.clone()))?;
            max_id = max_id.max(id);
            nodes.insert(
                id,
                Node {
                    text: doc_node.text,
                    x: doc_node.x,
                    y: doc_node.y,
                    width: config.node.base_width,
                    height: config.node.base_height,
                    children: doc_node.children,
                    fill: doc_node.fill,
                    custom: doc_node.custom,
                },
            );
        }

        let ids: Vec<NodeId> = nodes.keys().copied().collect();
        for id in &ids {
            if let Some(node) = nodes.get_mut(id) {
                node.children.retain(|c| ids.binary_search(c).is_ok());
            }
        }

        let mut ws = Workspace::new();
        ws.nodes = nodes;
        let links: Vec<(NodeId, NodeId)> = ws
            .nodes
            .iter()
            .flat_map(|(pid, node)| node.children.iter().map(|cid| (*cid, *pid)))
            .collect();
        for (cid, pid) in links {
            ws.parent.insert(cid, pid);
        }
        ws.root = self
            .root
            .filter(|id| ws.nodes.contains_key(id))
            .or_else(|| ws.nodes.keys().next().copied());
        if let Some(root) = ws.root {
            ws.parent.remove(&root);
        }
        ws.next_id = self.next_id.unwrap_or(0).max(max_id + 1);
        ws.palette_index = ws.nodes.len();

        for id in ids {
            ws.recompute_size(id, metrics, config);
        }
        Ok(ws)
    }
}

pub fn save_workspace(ws: &Workspace, path: &Path) -> Result<(), DocumentError> {
    let doc = Document::from_workspace(ws);
    let json = serde_json::to_string_pretty(&doc)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn load_workspace(
    path: &Path,
    metrics: &dyn FontMetrics,
    config: &EditorConfig,
) -> Result<Workspace, DocumentError> {
    let raw = fs::read_to_string(path)?;
    let doc: Document = serde_json::from_str(&raw)?;
    doc.into_workspace(metrics, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_metrics::FixedMetrics;
    use crate::theme::Theme;

    fn round_trip(ws: &Workspace) -> Workspace {
        let doc = Document::from_workspace(ws);
        let json = serde_json::to_string(&doc).unwrap();
        let parsed: Document = serde_json::from_str(&json).unwrap();
        parsed
            .into_workspace(&FixedMetrics::default(), &EditorConfig::default())
            .unwrap()
    }

    #[test]
    fn round_trip_preserves_structure() {
        let config = EditorConfig::default();
        let theme = Theme::pastel();
        let mut ws = Workspace::new();
        let root = ws.create_node("root", (0.0, 0.0), None, &config);
        let a = ws.create_node("**bold** child", (400.0, 0.0), None, &config);
        let b = ws.create_node("other", (0.0, 400.0), None, &config);
        ws.add_edge(root, a, &theme);
        ws.add_edge(root, b, &theme);
        ws.set_color(b, "#123456");

        let loaded = round_trip(&ws);
        assert_eq!(loaded.root(), Some(root));
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.node(root).unwrap().children, vec![a, b]);
        assert_eq!(loaded.parent_of(a), Some(root));
        assert_eq!(loaded.node(b).unwrap().fill.as_deref(), Some("#123456"));
        assert!(loaded.node(b).unwrap().custom);
        assert!(loaded.next_id() > b);
    }

    #[test]
    fn load_resets_view_and_offsets() {
        let config = EditorConfig::default();
        let mut ws = Workspace::new();
        ws.create_node("root", (0.0, 0.0), None, &config);
        ws.view.scale = 2.0;
        ws.view.offset_x = 40.0;

        let loaded = round_trip(&ws);
        assert_eq!(loaded.view.scale, 1.0);
        assert_eq!(loaded.view.offset_x, 0.0);
    }

    #[test]
    fn dangling_children_are_dropped() {
        let json = r#"{
            "root": 1,
            "next_id": 3,
            "nodes": {
                "1": {"text": "root", "children": [2, 99]},
                "2": {"text": "child"}
            }
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        let ws = doc
            .into_workspace(&FixedMetrics::default(), &EditorConfig::default())
            .unwrap();
        assert_eq!(ws.node(1).unwrap().children, vec![2]);
        assert_eq!(ws.parent_of(2), Some(1));
    }

    #[test]
    fn missing_root_falls_back_to_smallest_id() {
        let json = r#"{
            "root": 42,
            "nodes": {
                "7": {"text": "a"},
                "3": {"text": "b"}
            }
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        let ws = doc
            .into_workspace(&FixedMetrics::default(), &EditorConfig::default())
            .unwrap();
        assert_eq!(ws.root(), Some(3));
        assert_eq!(ws.next_id(), 8);
    }

    #[test]
    fn non_numeric_id_is_rejected() {
        let json = r#"{"nodes": {"seven": {"text": "a"}}}"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        let err = doc
            .into_workspace(&FixedMetrics::default(), &EditorConfig::default())
            .unwrap_err();
        assert!(matches!(err, DocumentError::InvalidNodeId(key) if key == "seven"));
    }

    #[test]
    fn sizes_are_rederived_on_load() {
        let config = EditorConfig::default();
        let metrics = FixedMetrics::default();
        let mut ws = Workspace::new();
        let id = ws.create_node("x", (0.0, 0.0), None, &config);
        let long: String = "m".repeat(80);
        ws.set_text(id, long, &metrics, &config);
        let width = ws.node(id).unwrap().width;
        assert!(width > config.node.base_width);

        let loaded = round_trip(&ws);
        assert!((loaded.node(id).unwrap().width - width).abs() < 1e-3);
    }
}
