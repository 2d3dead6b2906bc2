// Copyright (c) 2026 rezky_nightky

use crate::cell::Cell;
use crate::drop::ALPHA_FLOOR;
use crate::frame::Frame;
use crate::palette::Palette;
use crate::region::RectF;
use crate::tokens::Token;

// Tuned defaults. Vertical unit is rows; horizontal launch velocity is
// pre-scaled by the cell aspect so bursts look circular.
pub(crate) const PARTICLE_CAP: usize = 160;
pub(crate) const GRAVITY: f32 = 22.0;
pub(crate) const DRAG_X: f32 = 0.99;
pub(crate) const RESTITUTION: f32 = 0.55;
pub(crate) const BOUNCE_DAMP_X: f32 = 0.7;
pub(crate) const BOUNCE_SPIN: f32 = 1.6;
pub(crate) const BOUNCE_LIFE_CAP: f32 = 0.8;
pub(crate) const REGION_MARGIN: f32 = 0.5;
pub(crate) const SIDE_MARGIN: f32 = 4.0;
pub(crate) const LIFE_MIN: f32 = 1.2;
pub(crate) const LIFE_MAX: f32 = 2.6;
pub(crate) const WARMUP: f32 = 0.12;
pub(crate) const FADE_TAIL: f32 = 0.5;
pub(crate) const LAUNCH_SPEED_MIN: f32 = 6.0;
pub(crate) const LAUNCH_SPEED_MAX: f32 = 18.0;
pub(crate) const LAUNCH_UP_BIAS: f32 = 8.0;
pub(crate) const ROT_VEL_MAX: f32 = 6.0;
pub(crate) const BASE_OPACITY_MIN: f32 = 0.6;
pub(crate) const BASE_OPACITY_MAX: f32 = 1.0;

#[derive(Clone, Debug)]
pub struct Particle {
    pub token: &'static Token,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub rot: f32,
    pub rot_vel: f32,
    pub life: f32,
    pub age: f32,
    pub base_opacity: f32,
    pub bounced: bool,
}

impl Particle {
    /// One integration step plus the at-most-once bounce test against the
    /// pushed collision region.
    pub fn step(&mut self, dt: f32, region: Option<&RectF>) {
        self.age += dt;
        self.life -= dt;
        self.vy += GRAVITY * dt;
        self.vx *= DRAG_X;
        self.x += self.vx * dt;
        self.y += self.vy * dt;
        self.rot += self.rot_vel * dt;

        if !self.bounced && self.vy > 0.0 {
            if let Some(r) = region {
                if r.grown(REGION_MARGIN).contains(self.x, self.y) {
                    self.vy = -self.vy.abs() * RESTITUTION;
                    self.vx *= BOUNCE_DAMP_X;
                    self.rot_vel *= BOUNCE_SPIN;
                    self.life = self.life.min(BOUNCE_LIFE_CAP);
                    self.bounced = true;
                }
            }
        }
    }

    /// Escape above stays live; gravity brings it back.
    pub fn expired(&self, cols: f32, rows: f32) -> bool {
        self.life <= 0.0
            || self.x < -SIDE_MARGIN
            || self.x > cols + SIDE_MARGIN
            || self.y > rows + SIDE_MARGIN
    }

    /// Warm-up ramp in, lifetime tail out, both over the fixed base.
    pub fn opacity(&self) -> f32 {
        let warm = (self.age / WARMUP).clamp(0.0, 1.0);
        let tail = (self.life / FADE_TAIL).clamp(0.0, 1.0);
        warm * tail * self.base_opacity
    }

    /// Every particle draws with its own orientation from its own rotation
    /// angle: horizontal in quadrants 0/2 (reversed in 2), stacked
    /// vertically in 1/3.
    pub fn draw(&self, frame: &mut Frame, pal: &Palette) {
        let alpha = self.opacity();
        if alpha <= ALPHA_FLOOR {
            return;
        }
        let fg = pal.resolve(self.token.color, alpha);
        let x0 = self.x.round() as i32;
        let y0 = self.y.round() as i32;
        let count = self.token.text.chars().count() as i32;
        let half = count / 2;

        let tau = std::f32::consts::TAU;
        let quadrant = (self.rot.rem_euclid(tau) / (tau / 4.0)) as usize % 4;
        let mut put = |i: i32, ch: char| {
            let (x, y) = match quadrant {
                0 | 2 => (x0 - half + i, y0),
                _ => (x0, y0 - half + i),
            };
            frame.set_clipped(x, y, Cell::glyph(ch, fg, pal.bg));
        };
        match quadrant {
            0 | 1 => {
                for (i, ch) in self.token.text.chars().enumerate() {
                    put(i as i32, ch);
                }
            }
            _ => {
                for (i, ch) in self.token.text.chars().rev().enumerate() {
                    put(i as i32, ch);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::build_palette;
    use crate::runtime::{ColorMode, Theme};
    use crate::tokens::BURST;

    fn still_particle() -> Particle {
        Particle {
            token: &BURST[0],
            x: 10.0,
            y: 10.0,
            vx: 0.0,
            vy: 0.0,
            rot: 0.0,
            rot_vel: 0.0,
            life: 2.0,
            age: 1.0,
            base_opacity: 1.0,
            bounced: false,
        }
    }

    #[test]
    fn gravity_integrates_before_position() {
        let mut p = still_particle();
        p.step(0.1, None);
        assert!((p.vy - GRAVITY * 0.1).abs() < 1e-6);
        assert!((p.y - (10.0 + p.vy * 0.1)).abs() < 1e-6);
    }

    #[test]
    fn downward_hit_reflects_once_with_restitution() {
        let region = RectF::new(5.0, 9.0, 10.0, 2.0);
        let mut p = still_particle();
        p.vy = 5.0;
        // dt = 0 keeps velocity and position exact through the step
        p.step(0.0, Some(&region));
        assert_eq!(p.vy, -5.0 * RESTITUTION);
        assert!(p.bounced);
        assert_eq!(p.life, BOUNCE_LIFE_CAP);

        // repositioned inside with downward velocity: stays reflected-free
        p.vy = 3.0;
        p.x = 10.0;
        p.y = 10.0;
        p.step(0.0, Some(&region));
        assert!(p.bounced);
        assert_eq!(p.vy, 3.0);
    }

    #[test]
    fn upward_travel_never_bounces() {
        let region = RectF::new(5.0, 9.0, 10.0, 2.0);
        let mut p = still_particle();
        p.vy = -4.0;
        p.step(0.0, Some(&region));
        assert!(!p.bounced);
        assert_eq!(p.vy, -4.0);
    }

    #[test]
    fn no_region_means_pass_through() {
        let mut p = still_particle();
        p.vy = 5.0;
        p.step(0.0, None);
        assert!(!p.bounced);
    }

    #[test]
    fn expiry_covers_lifetime_and_side_exits() {
        let mut p = still_particle();
        p.life = 0.05;
        p.step(0.1, None);
        assert!(p.expired(80.0, 24.0));

        let mut p = still_particle();
        p.x = 80.0 + SIDE_MARGIN + 1.0;
        assert!(p.expired(80.0, 24.0));

        // above the top is not an exit
        let mut p = still_particle();
        p.y = -30.0;
        assert!(!p.expired(80.0, 24.0));
    }

    #[test]
    fn opacity_warms_up_and_tails_out() {
        let mut p = still_particle();
        p.age = 0.0;
        assert_eq!(p.opacity(), 0.0);
        p.age = WARMUP * 2.0;
        assert!((p.opacity() - 1.0).abs() < 1e-6);
        p.life = FADE_TAIL / 2.0;
        assert!((p.opacity() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn rotation_quadrant_flips_orientation() {
        let pal = build_palette(Theme::Dark, ColorMode::TrueColor);
        let mut frame = Frame::new(20, 20, pal.bg);
        let mut p = still_particle();
        // BURST[0] is "+1": half = 1, horizontal at rot 0
        p.draw(&mut frame, &pal);
        assert_eq!(frame.get(9, 10).unwrap().ch, '+');
        assert_eq!(frame.get(10, 10).unwrap().ch, '1');

        let mut frame = Frame::new(20, 20, pal.bg);
        p.rot = std::f32::consts::FRAC_PI_2 + 0.1;
        p.draw(&mut frame, &pal);
        assert_eq!(frame.get(10, 9).unwrap().ch, '+');
        assert_eq!(frame.get(10, 10).unwrap().ch, '1');
    }
}
