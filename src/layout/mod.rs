pub mod placement;
pub mod routing;
pub mod text;

use std::collections::{HashMap, HashSet, VecDeque};

use crate::config::EditorConfig;
use crate::model::{NodeId, Workspace};

/// Lateral side of the root a subtree is laid out on.
pub const DIR_LEFT: i32 = -1;
pub const DIR_CENTER: i32 = 0;
pub const DIR_RIGHT: i32 = 1;

/// The per-node coordinates the auto-layout derives before placement.
#[derive(Debug, Clone)]
pub struct LayoutPlan {
    pub root: NodeId,
    pub directions: HashMap<NodeId, i32>,
    pub depths: HashMap<NodeId, usize>,
    pub slots: HashMap<NodeId, f32>,
}

/// Root gets direction 0; its children alternate left/right by child-list
/// index parity (even index left). Every descendant inherits its ancestor's
/// side via breadth-first traversal. Nodes unreachable from the root default
/// to the right side.
fn assign_directions(ws: &Workspace, root: NodeId) -> HashMap<NodeId, i32> {
    let mut directions = HashMap::new();
    directions.insert(root, DIR_CENTER);
    let mut queue = VecDeque::new();
    if let Some(root_node) = ws.node(root) {
        for (index, child) in root_node.children.iter().enumerate() {
            let side = if index % 2 == 0 { DIR_LEFT } else { DIR_RIGHT };
            directions.insert(*child, side);
            queue.push_back(*child);
        }
    }
    let mut visited: HashSet<NodeId> = HashSet::new();
    visited.insert(root);
    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }
        let side = directions.get(&id).copied().unwrap_or(DIR_RIGHT);
        if let Some(node) = ws.node(id) {
            for child in &node.children {
                directions.entry(*child).or_insert(side);
                queue.push_back(*child);
            }
        }
    }
    for (id, _) in ws.nodes() {
        directions
            .entry(id)
            .or_insert(if id == root { DIR_CENTER } else { DIR_RIGHT });
    }
    directions
}

/// Depth-first depths from the root, visited-guarded so malformed (cyclic)
/// input terminates. Unreached nodes fall back to their raw parent's depth
/// plus one, or zero without a parent.
fn compute_depths(ws: &Workspace, root: NodeId) -> HashMap<NodeId, usize> {
    let mut depths = HashMap::new();
    depths.insert(root, 0usize);
    let mut stack = vec![root];
    let mut visited: HashSet<NodeId> = HashSet::new();
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let depth = depths.get(&id).copied().unwrap_or(0);
        if let Some(node) = ws.node(id) {
            for child in &node.children {
                if !visited.contains(child) {
                    depths.insert(*child, depth + 1);
                    stack.push(*child);
                }
            }
        }
    }
    for (id, _) in ws.nodes() {
        if !depths.contains_key(&id) {
            let fallback = match ws.parent_of(id) {
                Some(parent) => depths.get(&parent).copied().unwrap_or(0) + 1,
                None => 0,
            };
            depths.insert(id, fallback);
        }
    }
    depths
}

/// Symmetric lateral positions for `count` entries, ascending: ±0.5, ±1.5,…
/// for even counts; 0, ±1, ±2,… for odd counts.
fn symmetric_positions(count: usize) -> Vec<f32> {
    let mut positions = Vec::with_capacity(count);
    if count == 0 {
        return positions;
    }
    let mut offset;
    if count % 2 == 0 {
        offset = 0.5;
    } else {
        positions.push(0.0);
        offset = 1.0;
    }
    while positions.len() < count {
        positions.push(-offset);
        positions.push(offset);
        offset += 1.0;
    }
    positions.truncate(count);
    positions.sort_by(|a, b| a.partial_cmp(b).expect("finite positions"));
    positions
}

/// Per-depth slot assignment. Each level is partitioned into left, right and
/// center buckets; left and right share one symmetric sequence sized by the
/// larger bucket so the two sides line up. Bucket entries are ordered by
/// (parent slot, ordinal among siblings, id) and blended a quarter of the way
/// toward the parent's slot, except directly under the root.
fn compute_slots(
    ws: &Workspace,
    root: NodeId,
    directions: &HashMap<NodeId, i32>,
    depths: &HashMap<NodeId, usize>,
    parent_pull: f32,
) -> HashMap<NodeId, f32> {
    let mut slots: HashMap<NodeId, f32> = HashMap::new();
    slots.insert(root, 0.0);

    let mut levels: HashMap<usize, Vec<NodeId>> = HashMap::new();
    let mut max_depth = 0usize;
    for (id, _) in ws.nodes() {
        let depth = depths.get(&id).copied().unwrap_or(0);
        max_depth = max_depth.max(depth);
        levels.entry(depth).or_default().push(id);
    }

    struct Entry {
        parent_slot: f32,
        ordinal: usize,
        id: NodeId,
        parent: Option<NodeId>,
    }

    for depth in 1..=max_depth {
        let Some(ids) = levels.get(&depth) else {
            continue;
        };
        let mut left: Vec<Entry> = Vec::new();
        let mut right: Vec<Entry> = Vec::new();
        let mut center: Vec<Entry> = Vec::new();
        for id in ids {
            let parent = ws.parent_of(*id);
            let parent_slot = parent
                .and_then(|pid| slots.get(&pid).copied())
                .unwrap_or(0.0);
            let ordinal = parent
                .and_then(|pid| ws.node(pid))
                .and_then(|node| node.children.iter().position(|c| c == id))
                .unwrap_or(0);
            let side = directions
                .get(id)
                .copied()
                .or_else(|| parent.and_then(|pid| directions.get(&pid).copied()))
                .unwrap_or(DIR_CENTER);
            let entry = Entry {
                parent_slot,
                ordinal,
                id: *id,
                parent,
            };
            if side > 0 {
                right.push(entry);
            } else if side < 0 {
                left.push(entry);
            } else {
                center.push(entry);
            }
        }

        let side_positions = symmetric_positions(left.len().max(right.len()));
        let center_positions = symmetric_positions(center.len());

        let mut assign = |entries: &mut Vec<Entry>, positions: &[f32]| {
            entries.sort_by(|a, b| {
                a.parent_slot
                    .partial_cmp(&b.parent_slot)
                    .expect("finite slots")
                    .then(a.ordinal.cmp(&b.ordinal))
                    .then(a.id.cmp(&b.id))
            });
            for (idx, entry) in entries.iter().enumerate() {
                let base = if positions.is_empty() {
                    0.0
                } else {
                    positions[idx.min(positions.len() - 1)]
                };
                let weight = match entry.parent {
                    None => 0.0,
                    Some(pid) if pid == root => 0.0,
                    Some(_) => parent_pull,
                };
                slots.insert(entry.id, base * (1.0 - weight) + entry.parent_slot * weight);
            }
        };

        assign(&mut left, &side_positions);
        assign(&mut right, &side_positions);
        assign(&mut center, &center_positions);
    }

    for (id, _) in ws.nodes() {
        slots.entry(id).or_insert(0.0);
    }
    slots
}

/// Derive directions, depths and slots for the tree under `root` (or the
/// workspace root, or the first node) without touching positions.
pub fn plan_layout(ws: &Workspace, root: Option<NodeId>) -> Option<LayoutPlan> {
    let root = root
        .or(ws.root())
        .or_else(|| ws.nodes().next().map(|(id, _)| id))?;
    let directions = assign_directions(ws, root);
    let depths = compute_depths(ws, root);
    Some(LayoutPlan {
        root,
        directions,
        depths,
        slots: HashMap::new(),
    })
}

/// Rewrite every node's logical position from (direction, depth, slot),
/// centered on the logical point under the middle of `viewport` (screen
/// size). Non-custom fills are reset to their depth color as a side effect.
pub fn auto_layout(ws: &mut Workspace, viewport: (f32, f32), config: &EditorConfig) {
    auto_layout_from(ws, None, viewport, config);
}

/// Like [`auto_layout`] but rooted at an explicit node instead of the
/// workspace root.
pub fn auto_layout_from(
    ws: &mut Workspace,
    root: Option<NodeId>,
    viewport: (f32, f32),
    config: &EditorConfig,
) {
    let Some(mut plan) = plan_layout(ws, root) else {
        return;
    };
    plan.slots = compute_slots(
        ws,
        plan.root,
        &plan.directions,
        &plan.depths,
        config.layout.parent_pull,
    );

    let viewport_w = viewport.0.max(config.node.base_width * 2.0);
    let viewport_h = viewport.1.max(config.node.base_height * 2.0);
    let (base_x, base_y) = ws.view.to_logical(viewport_w / 2.0, viewport_h / 2.0);

    let column = config.node.base_width + config.layout.horizontal_gap;
    let row = config.node.base_height + config.layout.vertical_gap;
    let root_slot = plan.slots.get(&plan.root).copied().unwrap_or(0.0);

    let ids: Vec<NodeId> = ws.nodes().map(|(id, _)| id).collect();
    for id in ids {
        let direction = plan
            .directions
            .get(&id)
            .copied()
            .unwrap_or(if id == plan.root { DIR_CENTER } else { DIR_RIGHT });
        let depth = plan.depths.get(&id).copied().unwrap_or(0);
        let slot = plan.slots.get(&id).copied().unwrap_or(root_slot);
        let x = base_x + direction as f32 * depth as f32 * column;
        let y = base_y + (slot - root_slot) * row;
        ws.move_node(id, x, y);
        let custom = ws.node(id).map(|node| node.custom).unwrap_or(true);
        if !custom
            && let Some(node) = ws.node_mut(id)
        {
            node.fill = Some(config.theme.depth_fill(depth));
        }
    }
}

/// Slots for an already-derived plan; exposed so callers and tests can
/// inspect slot assignment without applying positions.
pub fn plan_slots(ws: &Workspace, plan: &LayoutPlan, config: &EditorConfig) -> HashMap<NodeId, f32> {
    compute_slots(
        ws,
        plan.root,
        &plan.directions,
        &plan.depths,
        config.layout.parent_pull,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Theme;

    fn build_tree(children_per_level: &[usize]) -> (Workspace, EditorConfig) {
        let config = EditorConfig::default();
        let theme = Theme::pastel();
        let mut ws = Workspace::new();
        let root = ws.create_node("root", (0.0, 0.0), None, &config);
        let mut frontier = vec![root];
        for count in children_per_level {
            let mut next = Vec::new();
            for parent in frontier {
                for i in 0..*count {
                    let child =
                        ws.create_node(format!("c{i}"), (2000.0, 2000.0), None, &config);
                    ws.add_edge(parent, child, &theme);
                    next.push(child);
                }
            }
            frontier = next;
        }
        (ws, config)
    }

    #[test]
    fn root_children_alternate_sides() {
        let (ws, _) = build_tree(&[4]);
        let root = ws.root().unwrap();
        let plan = plan_layout(&ws, None).unwrap();
        let children = &ws.node(root).unwrap().children;
        let sides: Vec<i32> = children
            .iter()
            .map(|c| plan.directions[c])
            .collect();
        assert_eq!(sides, vec![DIR_LEFT, DIR_RIGHT, DIR_LEFT, DIR_RIGHT]);
    }

    #[test]
    fn descendants_inherit_side() {
        let (mut ws, config) = build_tree(&[2]);
        let theme = Theme::pastel();
        let root = ws.root().unwrap();
        let children = ws.node(root).unwrap().children.clone();
        let grand = ws.create_node("g", (4000.0, 0.0), None, &config);
        ws.add_edge(children[0], grand, &theme);
        let plan = plan_layout(&ws, None).unwrap();
        assert_eq!(plan.directions[&grand], plan.directions[&children[0]]);
        assert_eq!(plan.depths[&grand], 2);
    }

    #[test]
    fn symmetric_positions_are_symmetric_and_sorted() {
        assert_eq!(symmetric_positions(0), Vec::<f32>::new());
        assert_eq!(symmetric_positions(1), vec![0.0]);
        assert_eq!(symmetric_positions(2), vec![-0.5, 0.5]);
        assert_eq!(symmetric_positions(3), vec![-1.0, 0.0, 1.0]);
        assert_eq!(symmetric_positions(4), vec![-1.5, -0.5, 0.5, 1.5]);
        for count in 0..12 {
            let positions = symmetric_positions(count);
            let sum: f32 = positions.iter().sum();
            assert!(sum.abs() < 1e-4, "count {count} not centered");
        }
    }

    #[test]
    fn sibling_slots_sum_to_zero_under_root() {
        // Four children split 2/2, so both sides fill the shared sequence.
        let (ws, config) = build_tree(&[4]);
        let plan = plan_layout(&ws, None).unwrap();
        let slots = plan_slots(&ws, &plan, &config);
        let root = ws.root().unwrap();
        for side in [DIR_LEFT, DIR_RIGHT] {
            let sum: f32 = ws
                .node(root)
                .unwrap()
                .children
                .iter()
                .filter(|c| plan.directions[c] == side)
                .map(|c| slots[c])
                .sum();
            assert!(sum.abs() < 1e-4);
        }
    }

    #[test]
    fn uneven_sides_share_the_larger_side_sequence() {
        // Five children split 3 left / 2 right. Both sides index into the
        // length-3 sequence [-1, 0, 1]: the full left side is centered, the
        // shorter right side takes the sequence's first two values.
        let (ws, config) = build_tree(&[5]);
        let plan = plan_layout(&ws, None).unwrap();
        let slots = plan_slots(&ws, &plan, &config);
        let root = ws.root().unwrap();
        let children = &ws.node(root).unwrap().children;

        let side_slots = |side: i32| -> Vec<f32> {
            children
                .iter()
                .filter(|c| plan.directions[c] == side)
                .map(|c| slots[c])
                .collect()
        };
        let left = side_slots(DIR_LEFT);
        let right = side_slots(DIR_RIGHT);
        assert_eq!(left, vec![-1.0, 0.0, 1.0]);
        assert_eq!(right, vec![-1.0, 0.0]);
        assert!(left.iter().sum::<f32>().abs() < 1e-4);
    }

    #[test]
    fn auto_layout_is_deterministic() {
        let (mut ws, config) = build_tree(&[3, 2]);
        auto_layout(&mut ws, (1200.0, 800.0), &config);
        let first: Vec<(NodeId, f32, f32)> =
            ws.nodes().map(|(id, n)| (id, n.x, n.y)).collect();
        auto_layout(&mut ws, (1200.0, 800.0), &config);
        let second: Vec<(NodeId, f32, f32)> =
            ws.nodes().map(|(id, n)| (id, n.x, n.y)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn columns_grow_with_depth_and_side() {
        let (mut ws, config) = build_tree(&[2, 1]);
        auto_layout(&mut ws, (1200.0, 800.0), &config);
        let root = ws.root().unwrap();
        let root_x = ws.node(root).unwrap().x;
        let plan = plan_layout(&ws, None).unwrap();
        for (id, node) in ws.nodes() {
            if id == root {
                continue;
            }
            let depth = plan.depths[&id] as f32;
            let expected = root_x
                + plan.directions[&id] as f32
                    * depth
                    * (config.node.base_width + config.layout.horizontal_gap);
            assert!((node.x - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn layout_resets_non_custom_fills_by_depth() {
        let (mut ws, config) = build_tree(&[2]);
        let root = ws.root().unwrap();
        let child = ws.node(root).unwrap().children[0];
        if let Some(node) = ws.node_mut(child) {
            node.custom = false;
            node.fill = Some("#000000".to_string());
        }
        auto_layout(&mut ws, (1200.0, 800.0), &config);
        assert_eq!(
            ws.node(child).unwrap().fill.as_deref(),
            Some(config.theme.depth_fill(1).as_str())
        );
        // Custom fills are untouched.
        let sibling = ws.node(root).unwrap().children[1];
        assert_eq!(
            ws.node(sibling).unwrap().fill.as_deref(),
            Some(config.theme.palette[2].as_str())
        );
    }
}
