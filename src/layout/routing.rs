use std::collections::HashSet;

use crate::config::EditorConfig;
use crate::model::{NodeId, Workspace};

// ── Exit points ─────────────────────────────────────────────────────
/// Manhattan distance below which the two exit points count as coincident.
const COINCIDENT_EXIT_TOL: f32 = 6.0;
/// Blend factor pulling coincident exit points back toward their centers.
const EXIT_NUDGE: f32 = 0.1;

// ── Control-point shaping ───────────────────────────────────────────
/// Smoothing shrinks toward this floor for short edges.
const SMOOTHING_MIN: f32 = 0.25;
/// Edge length (in base node widths) at which smoothing saturates.
const SMOOTHING_SPAN: f32 = 1.25;
/// Sibling fan strength as a ratio of base node height.
const SIBLING_FAN_RATIO: f32 = 0.32;
/// Pull distance as a ratio of edge length, and its clamp range in base
/// node widths.
const PULL_DIST_RATIO: f32 = 0.22;
const PULL_MIN_RATIO: f32 = 0.3;
const PULL_MAX_RATIO: f32 = 1.05;
const PULL_SMOOTH_BASE: f32 = 0.75;
const PULL_SMOOTH_SPAN: f32 = 0.55;
/// Edges shorter than this many base node widths use a reduced pull and fan.
const SHORT_EDGE_RATIO: f32 = 0.75;
const SHORT_EDGE_PULL: f32 = 0.3;
const SHORT_EDGE_LATERAL: f32 = 0.4;

// ── Obstacle repulsion ──────────────────────────────────────────────
/// Safety band around the straight line, as a ratio of the larger base node
/// dimension.
const OBSTACLE_SAFETY_RATIO: f32 = 0.5;
const OBSTACLE_PUSH_RADIUS_RATIO: f32 = 0.45;
const OBSTACLE_PUSH_DIST_RATIO: f32 = 0.18;
const OBSTACLE_PUSH_MAX_RATIO: f32 = 0.4;
/// Exponent skewing the push toward the control point nearer the obstacle.
const OBSTACLE_WEIGHT_EXP: f32 = 1.3;

// ── Clamp & orientation ─────────────────────────────────────────────
const PERP_SMOOTH_RATIO: f32 = 0.4;
const PERP_BASE_RATIO: f32 = 0.18;
const PERP_DIST_RATIO: f32 = 0.22;
/// Control points stay within [ratio, 1 - ratio] of the edge length.
const ALONG_CLAMP_RATIO: f32 = 0.1;
const MIN_OFFSET_RATIO: f32 = 0.1;
const MIN_OFFSET_PAD: f32 = 3.0;
/// Tie-break toward the side matching the lateral sign.
const ORIENT_BIAS: f32 = 0.04;

/// Geometric epsilon for the segment intersection predicate.
const SEG_EPS: f32 = 1e-6;

/// One routed edge: the accepted screen-space polyline and the lateral
/// offset it was routed with.
#[derive(Debug, Clone)]
pub struct EdgePath {
    pub parent: NodeId,
    pub child: NodeId,
    pub points: Vec<(f32, f32)>,
    pub offset: f32,
}

struct DrawnPath {
    points: Vec<(f32, f32)>,
    start: (f32, f32),
    end: (f32, f32),
}

/// Route every parent→child edge in ascending parent id then child-list
/// order. Stale entries in the edge-offset memory are pruned first; accepted
/// offsets are written back so edges keep their shape across redraws.
///
/// Candidate acceptance checks each sampled polyline against every
/// previously accepted one, so a full redraw is
/// O(edges² × candidates × samples²) in the worst case. Fine at interactive
/// node counts; a scaling limit for anything larger.
pub fn route_all_edges(ws: &mut Workspace, config: &EditorConfig) -> Vec<EdgePath> {
    let edges = ws.edges();
    let valid: HashSet<(NodeId, NodeId)> = edges.iter().copied().collect();
    ws.edge_offsets.retain(|key, _| valid.contains(key));

    let mut drawn: Vec<DrawnPath> = Vec::new();
    let mut routed = Vec::with_capacity(edges.len());
    for (pid, cid) in edges {
        let Some(path) = route_edge(ws, pid, cid, &drawn, config) else {
            continue;
        };
        ws.edge_offsets.insert((pid, cid), path.offset);
        drawn.push(DrawnPath {
            points: path.points.clone(),
            start: path.points[0],
            end: *path.points.last().expect("sampled polyline is non-empty"),
        });
        routed.push(path);
    }
    routed
}

fn route_edge(
    ws: &Workspace,
    pid: NodeId,
    cid: NodeId,
    drawn: &[DrawnPath],
    config: &EditorConfig,
) -> Option<EdgePath> {
    let parent_center = ws.screen_center(pid)?;
    let child_center = ws.screen_center(cid)?;
    let mut start = exit_point(ws, pid, child_center, config)?;
    let mut end = exit_point(ws, cid, parent_center, config)?;

    // Overlapping nodes produce near-coincident exits; nudge both back
    // toward their own centers so the curve has some length to work with.
    if (start.0 - end.0).abs() + (start.1 - end.1).abs() < COINCIDENT_EXIT_TOL {
        start = (
            start.0 * (1.0 - EXIT_NUDGE) + parent_center.0 * EXIT_NUDGE,
            start.1 * (1.0 - EXIT_NUDGE) + parent_center.1 * EXIT_NUDGE,
        );
        end = (
            end.0 * (1.0 - EXIT_NUDGE) + child_center.0 * EXIT_NUDGE,
            end.1 * (1.0 - EXIT_NUDGE) + child_center.1 * EXIT_NUDGE,
        );
    }

    let base = ws.remembered_offset(pid, cid).unwrap_or(0.0);
    let candidates = offset_candidates(base, config);
    let mut chosen: Option<(Vec<(f32, f32)>, f32)> = None;
    for offset in &candidates {
        let (cp1, cp2) = control_points(ws, pid, cid, start, end, *offset, config);
        let points = sample_cubic(start, cp1, cp2, end, config.routing.curve_samples);
        if !path_intersects(&points, drawn, start, end, config) {
            chosen = Some((points, *offset));
            break;
        }
    }
    let (points, offset) = chosen.unwrap_or_else(|| {
        // Every candidate crossed something; take the widest swing anyway.
        let fallback = *candidates.last().expect("candidate ladder is non-empty");
        let (cp1, cp2) = control_points(ws, pid, cid, start, end, fallback, config);
        (
            sample_cubic(start, cp1, cp2, end, config.routing.curve_samples),
            fallback,
        )
    });

    Some(EdgePath {
        parent: pid,
        child: cid,
        points,
        offset,
    })
}

/// Point where the edge leaves `id`'s bounding ellipse heading toward
/// `target`, pushed outward by a small zoom-scaled margin. Coincident
/// centers default the exit direction to straight down.
fn exit_point(
    ws: &Workspace,
    id: NodeId,
    target: (f32, f32),
    config: &EditorConfig,
) -> Option<(f32, f32)> {
    let node = ws.node(id)?;
    let scale = effective_scale(ws);
    let (cx, cy) = ws.screen_center(id)?;
    let a = (node.width * scale / 2.0).max(1.0);
    let b = (node.height * scale / 2.0).max(1.0);
    let mut dx = target.0 - cx;
    let mut dy = target.1 - cy;
    if dx.abs() < 1e-4 && dy.abs() < 1e-4 {
        dx = 0.0;
        dy = b;
    }
    let factor = ((dx * dx) / (a * a) + (dy * dy) / (b * b)).sqrt();
    let t = if factor == 0.0 { 1.0 } else { 1.0 / factor };
    let vx = dx * t;
    let vy = dy * t;
    let length = vx.hypot(vy).max(1e-6);
    let margin = config
        .routing
        .exit_margin_min
        .max(scale * config.routing.exit_margin_scale);
    Some((
        cx + vx + (vx / length) * margin,
        cy + vy + (vy / length) * margin,
    ))
}

fn effective_scale(ws: &Workspace) -> f32 {
    if ws.view.scale == 0.0 { 1.0 } else { ws.view.scale }
}

/// Lateral offsets to try, widening around the remembered base offset.
/// Consecutive duplicates (step 0 after a remembered 0) are collapsed.
fn offset_candidates(base: f32, config: &EditorConfig) -> Vec<f32> {
    let step = config.routing.candidate_step;
    let mut offsets = Vec::with_capacity(config.routing.candidate_rounds * 2 + 1);
    let mut push = |candidate: f32| {
        if offsets.last().is_none_or(|last: &f32| (last - candidate).abs() > 1e-6) {
            offsets.push(candidate);
        }
    };
    push(base);
    for round in 1..=config.routing.candidate_rounds {
        let delta = step * round as f32;
        push(base + delta);
        push(base - delta);
    }
    offsets
}

/// Cubic control points for one edge: pulled along the edge direction,
/// fanned laterally by sibling index, repelled by intervening node bodies,
/// clamped to the edge's middle band, then oriented to whichever side needs
/// the smaller corrective nudge.
fn control_points(
    ws: &Workspace,
    pid: NodeId,
    cid: NodeId,
    start: (f32, f32),
    end: (f32, f32),
    extra_lateral: f32,
    config: &EditorConfig,
) -> ((f32, f32), (f32, f32)) {
    let (sx, sy) = start;
    let (ex, ey) = end;
    let dx = ex - sx;
    let dy = ey - sy;
    let dist = dx.hypot(dy).max(1.0);
    let scale = effective_scale(ws);
    let base_w = config.node.base_width * scale;
    let base_h = config.node.base_height * scale;

    let spread = ws
        .node(pid)
        .map(|parent| &parent.children)
        .filter(|siblings| siblings.len() > 1)
        .and_then(|siblings| {
            siblings
                .iter()
                .position(|c| *c == cid)
                .map(|idx| idx as f32 - (siblings.len() - 1) as f32 / 2.0)
        })
        .unwrap_or(0.0);

    let smoothing = (dist / (base_w * SMOOTHING_SPAN)).clamp(SMOOTHING_MIN, 1.0);
    let mut lateral = spread * base_h * SIBLING_FAN_RATIO * smoothing;

    let nx = dx / dist;
    let ny = dy / dist;
    let tx = -ny;
    let ty = nx;

    let mut base_pull =
        (dist * PULL_DIST_RATIO).clamp(base_w * PULL_MIN_RATIO, base_w * PULL_MAX_RATIO);
    base_pull *= PULL_SMOOTH_BASE + smoothing * PULL_SMOOTH_SPAN;
    if dist < base_w * SHORT_EDGE_RATIO {
        base_pull = dist * SHORT_EDGE_PULL;
        lateral *= SHORT_EDGE_LATERAL;
    }
    lateral += extra_lateral;

    let mut cp1 = [sx + nx * base_pull + tx * lateral, sy + ny * base_pull + ty * lateral];
    let mut cp2 = [ex - nx * base_pull + tx * lateral, ey - ny * base_pull + ty * lateral];

    // Push the control points away from nodes sitting between the exits.
    let node_radius = (base_w / 2.0).hypot(base_h / 2.0) + config.node.margin * scale;
    let safety = base_w.max(base_h) * OBSTACLE_SAFETY_RATIO;
    let seg_len_sq = (dist * dist).max(1.0);
    for (other_id, _) in ws.nodes() {
        if other_id == pid || other_id == cid {
            continue;
        }
        let Some((ox, oy)) = ws.screen_center(other_id) else {
            continue;
        };
        let t = ((ox - sx) * dx + (oy - sy) * dy) / seg_len_sq;
        if t <= 0.0 || t >= 1.0 {
            continue;
        }
        let closest_x = sx + dx * t;
        let closest_y = sy + dy * t;
        let vec_x = closest_x - ox;
        let vec_y = closest_y - oy;
        let separation = vec_x.hypot(vec_y);
        let clearance = separation - node_radius;
        if clearance >= safety {
            continue;
        }
        let influence = ((safety - clearance) / safety).clamp(0.0, 1.0) * smoothing;
        let (push_dir_x, push_dir_y) = if separation > 0.0 {
            (vec_x / separation, vec_y / separation)
        } else {
            (tx, ty)
        };
        let push_mag = (influence
            * (node_radius * OBSTACLE_PUSH_RADIUS_RATIO + dist * OBSTACLE_PUSH_DIST_RATIO))
            .min(dist * OBSTACLE_PUSH_MAX_RATIO);
        let push_x = push_dir_x * push_mag;
        let push_y = push_dir_y * push_mag;
        let mut w1 = (1.0 - t).powf(OBSTACLE_WEIGHT_EXP);
        let mut w2 = t.powf(OBSTACLE_WEIGHT_EXP);
        let total = w1 + w2;
        if total > 0.0 {
            w1 /= total;
            w2 /= total;
        }
        cp1[0] += push_x * w1;
        cp1[1] += push_y * w1;
        cp2[0] += push_x * w2;
        cp2[1] += push_y * w2;
    }

    let max_perp = (base_h * (PERP_SMOOTH_RATIO * smoothing + PERP_BASE_RATIO))
        .max(dist * PERP_DIST_RATIO);
    let min_along = dist * ALONG_CLAMP_RATIO;
    let max_along = dist - min_along;
    let clamp_point = |point: [f32; 2]| -> [f32; 2] {
        let rel_x = point[0] - sx;
        let rel_y = point[1] - sy;
        let along = (rel_x * nx + rel_y * ny).clamp(min_along, max_along);
        let mut perp = rel_x * tx + rel_y * ty;
        if perp.abs() > max_perp {
            perp = max_perp.copysign(perp);
        }
        [sx + nx * along + tx * perp, sy + ny * along + ty * perp]
    };
    cp1 = clamp_point(cp1);
    cp2 = clamp_point(cp2);

    // Pick the bulge side: whichever orientation needs less total nudging
    // to keep both control points clear of the straight line, biased toward
    // the side the lateral component already chose.
    let min_offset = base_h * MIN_OFFSET_RATIO + MIN_OFFSET_PAD;
    let orient = |base_sign: f32| -> ([f32; 2], [f32; 2], f32) {
        let mut total_adjust = 0.0;
        let mut oriented = [cp1, cp2];
        for point in &mut oriented {
            let signed = ((point[0] - sx) * dy - (point[1] - sy) * dx) / dist;
            if signed * base_sign < min_offset {
                let delta = min_offset - signed * base_sign;
                point[0] += tx * base_sign * delta;
                point[1] += ty * base_sign * delta;
                total_adjust += delta;
            }
        }
        (oriented[0], oriented[1], total_adjust)
    };
    let (cp1_pos, cp2_pos, adjust_pos) = orient(1.0);
    let (cp1_neg, cp2_neg, adjust_neg) = orient(-1.0);
    let bias = if lateral >= 0.0 { ORIENT_BIAS } else { -ORIENT_BIAS };
    let (cp1, cp2) = if adjust_pos + (-bias).max(0.0) <= adjust_neg + bias.max(0.0) {
        (cp1_pos, cp2_pos)
    } else {
        (cp1_neg, cp2_neg)
    };

    ((cp1[0], cp1[1]), (cp2[0], cp2[1]))
}

/// Flatten a cubic Bézier into `steps` uniform parameter samples.
pub fn sample_cubic(
    start: (f32, f32),
    cp1: (f32, f32),
    cp2: (f32, f32),
    end: (f32, f32),
    steps: usize,
) -> Vec<(f32, f32)> {
    let steps = steps.max(2);
    let mut points = Vec::with_capacity(steps + 1);
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let mt = 1.0 - t;
        let x = mt.powi(3) * start.0
            + 3.0 * mt.powi(2) * t * cp1.0
            + 3.0 * mt * t.powi(2) * cp2.0
            + t.powi(3) * end.0;
        let y = mt.powi(3) * start.1
            + 3.0 * mt.powi(2) * t * cp1.1
            + 3.0 * mt * t.powi(2) * cp2.1
            + t.powi(3) * end.1;
        points.push((x, y));
    }
    points
}

fn path_intersects(
    points: &[(f32, f32)],
    drawn: &[DrawnPath],
    start: (f32, f32),
    end: (f32, f32),
    config: &EditorConfig,
) -> bool {
    let shared_tol = config.routing.shared_endpoint_tol;
    let segment_tol = config.routing.segment_endpoint_tol;
    for info in drawn {
        if shares_endpoint(start, end, info.start, info.end, shared_tol) {
            continue;
        }
        if paths_cross(points, &info.points, segment_tol) {
            return true;
        }
    }
    false
}

fn shares_endpoint(
    start_a: (f32, f32),
    end_a: (f32, f32),
    start_b: (f32, f32),
    end_b: (f32, f32),
    tol: f32,
) -> bool {
    points_close(start_a, start_b, tol)
        || points_close(start_a, end_b, tol)
        || points_close(end_a, start_b, tol)
        || points_close(end_a, end_b, tol)
}

fn points_close(a: (f32, f32), b: (f32, f32), tol: f32) -> bool {
    (a.0 - b.0).abs() <= tol && (a.1 - b.1).abs() <= tol
}

/// True when any non-endpoint-sharing segment pair of the two polylines has
/// a true geometric intersection.
pub fn paths_cross(a: &[(f32, f32)], b: &[(f32, f32)], endpoint_tol: f32) -> bool {
    for seg_a in a.windows(2) {
        for seg_b in b.windows(2) {
            if shares_endpoint(seg_a[0], seg_a[1], seg_b[0], seg_b[1], endpoint_tol) {
                continue;
            }
            if segments_intersect(seg_a[0], seg_a[1], seg_b[0], seg_b[1]) {
                return true;
            }
        }
    }
    false
}

/// Orientation-based segment intersection, including collinear overlap.
pub fn segments_intersect(
    p1: (f32, f32),
    p2: (f32, f32),
    q1: (f32, f32),
    q2: (f32, f32),
) -> bool {
    fn orientation(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> f32 {
        (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
    }
    fn on_segment(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> bool {
        a.0.min(c.0) - SEG_EPS <= b.0
            && b.0 <= a.0.max(c.0) + SEG_EPS
            && a.1.min(c.1) - SEG_EPS <= b.1
            && b.1 <= a.1.max(c.1) + SEG_EPS
    }

    let o1 = orientation(p1, p2, q1);
    let o2 = orientation(p1, p2, q2);
    let o3 = orientation(q1, q2, p1);
    let o4 = orientation(q1, q2, p2);
    if ((o1 > SEG_EPS && o2 < -SEG_EPS) || (o1 < -SEG_EPS && o2 > SEG_EPS))
        && ((o3 > SEG_EPS && o4 < -SEG_EPS) || (o3 < -SEG_EPS && o4 > SEG_EPS))
    {
        return true;
    }
    (o1.abs() <= SEG_EPS && on_segment(p1, q1, p2))
        || (o2.abs() <= SEG_EPS && on_segment(p1, q2, p2))
        || (o3.abs() <= SEG_EPS && on_segment(q1, p1, q2))
        || (o4.abs() <= SEG_EPS && on_segment(q1, p2, q2))
}
