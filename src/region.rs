// Copyright (c) 2026 rezky_nightky

/// Axis-aligned rectangle in cell coordinates, fractional so moving
/// entities can test against it without rounding first.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RectF {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl RectF {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> RectF {
        RectF { x, y, w, h }
    }

    /// The same rect expanded by `margin` on every side. Collision tests
    /// use a grown rect so fast movers cannot tunnel straight through a
    /// one-cell-tall bar in a single step.
    pub fn grown(&self, margin: f32) -> RectF {
        RectF {
            x: self.x - margin,
            y: self.y - margin,
            w: self.w + margin * 2.0,
            h: self.h + margin * 2.0,
        }
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_half_open() {
        let r = RectF::new(2.0, 10.0, 20.0, 3.0);
        assert!(r.contains(2.0, 10.0));
        assert!(r.contains(21.9, 12.9));
        assert!(!r.contains(22.0, 10.0));
        assert!(!r.contains(2.0, 13.0));
        assert!(!r.contains(1.9, 10.0));
    }

    #[test]
    fn grown_expands_every_side() {
        let r = RectF::new(5.0, 5.0, 10.0, 1.0).grown(0.5);
        assert!((r.x - 4.5).abs() < 1e-6);
        assert!((r.y - 4.5).abs() < 1e-6);
        assert!((r.w - 11.0).abs() < 1e-6);
        assert!((r.h - 2.0).abs() < 1e-6);
        assert!(r.contains(4.6, 5.4));
    }
}
