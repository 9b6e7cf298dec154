use crate::config::ViewConfig;
use serde::{Deserialize, Serialize};

/// Uniform scale plus screen-space translation between logical (layout)
/// coordinates and screen coordinates. One per workspace.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ViewTransform {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl ViewTransform {
    pub fn to_screen(&self, x: f32, y: f32) -> (f32, f32) {
        (self.offset_x + x * self.scale, self.offset_y + y * self.scale)
    }

    pub fn to_logical(&self, x: f32, y: f32) -> (f32, f32) {
        if self.scale == 0.0 {
            return (x, y);
        }
        ((x - self.offset_x) / self.scale, (y - self.offset_y) / self.scale)
    }

    /// Pan by a screen-space delta.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    /// Multiply the scale by `factor`, clamped to the configured bounds,
    /// keeping the logical point under `origin` fixed on screen. Returns
    /// false when the clamped change is negligible and nothing moved.
    pub fn zoom(&mut self, factor: f32, origin: (f32, f32), config: &ViewConfig) -> bool {
        let old_scale = self.scale;
        let new_scale = (old_scale * factor).clamp(config.zoom_min, config.zoom_max);
        if (new_scale - old_scale).abs() < 1e-3 {
            return false;
        }
        let (cx, cy) = origin;
        let ratio = if old_scale != 0.0 {
            new_scale / old_scale
        } else {
            1.0
        };
        self.offset_x = cx - ratio * (cx - self.offset_x);
        self.offset_y = cy - ratio * (cy - self.offset_y);
        self.scale = new_scale;
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
