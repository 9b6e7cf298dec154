use crate::config::EditorConfig;
use crate::model::Workspace;

/// Ring radii searched before giving up.
const MAX_RING_RADIUS: i32 = 8;
/// Grid distance of the unconditional fallback cell.
const FALLBACK_RADIUS: f32 = 10.0;

/// True when no existing node center is within the occupancy threshold of
/// `(x, y)` on either axis.
pub fn is_position_free(ws: &Workspace, x: f32, y: f32, config: &EditorConfig) -> bool {
    if ws.is_empty() {
        return true;
    }
    let threshold_x = config.node.base_width + config.node.margin;
    let threshold_y = config.node.base_height + config.node.margin;
    for (_, node) in ws.nodes() {
        if (x - node.x).abs() < threshold_x && (y - node.y).abs() < threshold_y {
            return false;
        }
    }
    true
}

/// Nearest free point to `at`, searched over expanding Chebyshev rings of a
/// node-sized grid. Ring cells are visited in a fixed dx-then-dy order, so
/// the result is deterministic. A bounded fallback far along the grid is
/// returned when every ring cell is occupied; it is not re-checked.
pub fn find_free_position(ws: &Workspace, at: (f32, f32), config: &EditorConfig) -> (f32, f32) {
    let (x, y) = at;
    if is_position_free(ws, x, y, config) {
        return (x, y);
    }
    let step_x = config.node.base_width + config.layout.horizontal_gap;
    let step_y = config.node.base_height + config.layout.vertical_gap;
    for radius in 1..=MAX_RING_RADIUS {
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                if dx.abs() != radius && dy.abs() != radius {
                    continue;
                }
                let candidate_x = x + dx as f32 * step_x;
                let candidate_y = y + dy as f32 * step_y;
                if is_position_free(ws, candidate_x, candidate_y, config) {
                    return (candidate_x, candidate_y);
                }
            }
        }
    }
    (x + FALLBACK_RADIUS * step_x, y + FALLBACK_RADIUS * step_y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_workspace_keeps_candidate() {
        let config = EditorConfig::default();
        let ws = Workspace::new();
        assert_eq!(find_free_position(&ws, (13.0, -7.0), &config), (13.0, -7.0));
    }

    #[test]
    fn occupied_candidate_moves_to_grid_cell() {
        let config = EditorConfig::default();
        let mut ws = Workspace::new();
        ws.create_node("root", (0.0, 0.0), None, &config);

        let found = find_free_position(&ws, (5.0, 5.0), &config);
        assert!(is_position_free(&ws, found.0, found.1, &config));

        // The returned point sits on the search grid anchored at the
        // candidate.
        let step_x = config.node.base_width + config.layout.horizontal_gap;
        let step_y = config.node.base_height + config.layout.vertical_gap;
        let gx = (found.0 - 5.0) / step_x;
        let gy = (found.1 - 5.0) / step_y;
        assert!((gx - gx.round()).abs() < 1e-4);
        assert!((gy - gy.round()).abs() < 1e-4);
    }

    #[test]
    fn search_is_deterministic() {
        let config = EditorConfig::default();
        let mut ws = Workspace::new();
        ws.create_node("root", (0.0, 0.0), None, &config);
        let a = find_free_position(&ws, (1.0, 1.0), &config);
        let b = find_free_position(&ws, (1.0, 1.0), &config);
        assert_eq!(a, b);
    }

    #[test]
    fn saturated_neighborhood_falls_back_without_looping() {
        let mut config = EditorConfig::default();
        // Shrink the grid so a handful of nodes saturate every ring cell.
        config.node.base_width = 10.0;
        config.node.base_height = 10.0;
        config.node.margin = 4.0;
        config.layout.horizontal_gap = 0.0;
        config.layout.vertical_gap = 0.0;

        let mut ws = Workspace::new();
        for dx in -9..=9 {
            for dy in -9..=9 {
                let id =
                    ws.create_node("fill", (dx as f32 * 10.0, dy as f32 * 10.0), None, &config);
                ws.move_node(id, dx as f32 * 10.0, dy as f32 * 10.0);
            }
        }
        let found = find_free_position(&ws, (0.0, 0.0), &config);
        assert_eq!(found, (100.0, 100.0));
    }
}
