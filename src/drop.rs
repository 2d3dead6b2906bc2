// Copyright (c) 2026 rezky_nightky

use crate::cell::Cell;
use crate::frame::Frame;
use crate::palette::{blend, Palette};
use crate::tokens::{Snippet, Token, RAIN};

// Tuned defaults. Treat as adjustable, not physical law.
pub(crate) const TYPE_INTERVAL_FACTOR: f32 = 0.4;
pub(crate) const CARET_PERIOD: f32 = 0.8;
pub(crate) const CARET_CH: char = '▌';
pub(crate) const DWELL_MIN: f32 = 2.0;
pub(crate) const DWELL_MAX: f32 = 7.0;
pub(crate) const FADE_RATE: f32 = 0.45;
pub(crate) const BLUR_THRESHOLD: f32 = 0.6;
pub(crate) const BLUR_DIM_GAIN: f32 = 0.5;
pub(crate) const STRIKE_CHANCE: f32 = 0.05;
pub(crate) const EDIT_CHANCE: f32 = 0.06;
pub(crate) const CODEBLOCK_CHANCE: f32 = 0.035;
pub(crate) const STRIKE_RATE: f32 = 0.55;
pub(crate) const EDIT_RATE: f32 = 0.35;
pub(crate) const CODEBLOCK_RATE: f32 = 0.25;
pub(crate) const ALPHA_FLOOR: f32 = 0.02;

const STRIKE_COLOR_END: f32 = 0.3;
const STRIKE_SWEEP_END: f32 = 0.7;
const EDIT_DELETE_END: f32 = 0.3;
const EDIT_HOLD_END: f32 = 0.4;
const EDIT_TYPE_END: f32 = 0.8;
const CODE_TYPE_END: f32 = 0.6;
const CODE_FADE_START: f32 = 0.8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Typing,
    Visible,
    Fading,
}

/// Size class standing in for font size: far drops render dim, near
/// drops bold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
    Tiny,
    Normal,
    Large,
}

impl Tier {
    pub(crate) fn from_roll(r: f32) -> Tier {
        if r < 0.55 {
            Tier::Tiny
        } else if r < 0.85 {
            Tier::Normal
        } else {
            Tier::Large
        }
    }

    /// (bold, dim) glyph weight for the tier.
    pub fn weight(self) -> (bool, bool) {
        match self {
            Tier::Tiny => (false, true),
            Tier::Normal => (false, false),
            Tier::Large => (true, false),
        }
    }

    /// Fall speed range in rows per second.
    pub(crate) fn speed_range(self) -> (f32, f32) {
        match self {
            Tier::Tiny => (2.0, 4.0),
            Tier::Normal => (3.5, 6.5),
            Tier::Large => (6.0, 10.0),
        }
    }

    /// Slice of the palette's opacity range this tier draws from,
    /// as (lo, hi) fractions.
    pub(crate) fn opacity_window(self) -> (f32, f32) {
        match self {
            Tier::Tiny => (0.0, 0.45),
            Tier::Normal => (0.35, 0.75),
            Tier::Large => (0.65, 1.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SubAnim {
    Strikeout { progress: f32 },
    Edit { progress: f32, replacement: &'static Token },
    Codeblock { progress: f32, snippet: Snippet },
}

#[derive(Clone, Debug)]
pub struct Drop {
    pub token: &'static Token,
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub tier: Tier,
    pub base_opacity: f32,
    pub phase: Phase,
    pub revealed: usize,
    pub type_accum: f32,
    pub type_interval: f32,
    pub dwell: f32,
    pub fade: f32,
    pub sub: Option<SubAnim>,
}

impl Drop {
    /// Inert pool filler; the engine re-inits every slot before first use.
    pub(crate) fn placeholder() -> Drop {
        Drop {
            token: &RAIN[0],
            x: 0.0,
            y: -1.0,
            speed: 1.0,
            tier: Tier::Normal,
            base_opacity: 0.0,
            phase: Phase::Typing,
            revealed: 0,
            type_accum: 0.0,
            type_interval: 1.0,
            dwell: 0.0,
            fade: 0.0,
            sub: None,
        }
    }

    pub(crate) fn can_start_sub(&self) -> bool {
        self.phase == Phase::Visible && self.sub.is_none()
    }

    /// Reveal characters while in Typing; flips to Visible on the same call
    /// that reveals the last one.
    pub fn advance_typing(&mut self, dt: f32) {
        if self.phase != Phase::Typing {
            return;
        }
        let len = self.token.text.chars().count();
        self.type_accum += dt;
        while self.type_accum >= self.type_interval && self.revealed < len {
            self.type_accum -= self.type_interval;
            self.revealed += 1;
        }
        if self.revealed >= len {
            self.phase = Phase::Visible;
        }
    }

    /// Advance the sub-animation slot; past full progress the slot empties.
    pub fn advance_sub(&mut self, dt: f32) {
        if let Some(sub) = &mut self.sub {
            let (progress, rate) = match sub {
                SubAnim::Strikeout { progress } => (progress, STRIKE_RATE),
                SubAnim::Edit { progress, .. } => (progress, EDIT_RATE),
                SubAnim::Codeblock { progress, .. } => (progress, CODEBLOCK_RATE),
            };
            *progress += rate * dt;
            if *progress >= 1.0 {
                self.sub = None;
            }
        }
    }

    /// Opacity factor from the coarse phase: full until Fading, then an
    /// ease-out ramp to zero.
    pub fn phase_alpha(&self) -> f32 {
        match self.phase {
            Phase::Typing | Phase::Visible => 1.0,
            Phase::Fading => {
                let r = (1.0 - self.fade).clamp(0.0, 1.0);
                r * r
            }
        }
    }

    fn blurred(&self) -> bool {
        self.phase == Phase::Fading && self.fade > BLUR_THRESHOLD
    }

    /// Stand-in for the fading blur: dim the glyphs and bleed extra alpha
    /// proportional to how far past the threshold the fade is.
    fn blur_factor(&self) -> f32 {
        if !self.blurred() {
            return 1.0;
        }
        let depth = (self.fade - BLUR_THRESHOLD) / (1.0 - BLUR_THRESHOLD);
        1.0 - BLUR_DIM_GAIN * depth.clamp(0.0, 1.0)
    }

    /// Draw path for drops with no active sub-animation. Callers group by
    /// tier so same-weight glyphs land adjacent in the style run batching.
    pub fn draw_idle(&self, frame: &mut Frame, pal: &Palette, caret_on: bool) {
        let alpha = self.base_opacity * self.phase_alpha() * self.blur_factor();
        if alpha <= ALPHA_FLOOR {
            return;
        }
        let (mut bold, mut dim) = self.tier.weight();
        if self.blurred() {
            bold = false;
            dim = true;
        }
        let fg = pal.resolve(self.token.color, alpha);
        let x0 = self.x.round() as i32;
        let y = self.y.round() as i32;
        let limit = match self.phase {
            Phase::Typing => self.revealed,
            _ => usize::MAX,
        };
        let mut i = 0i32;
        for ch in self.token.text.chars().take(limit) {
            frame.set_clipped(x0 + i, y, Cell::glyph(ch, fg, pal.bg).weighted(bold, dim));
            i += 1;
        }
        if self.phase == Phase::Typing && caret_on {
            let caret = pal.resolve(pal.caret_rgb, alpha);
            frame.set_clipped(x0 + i, y, Cell::glyph(CARET_CH, caret, pal.bg).weighted(bold, dim));
        }
    }

    /// Draw path for drops with an active sub-animation; each variant needs
    /// its own text and color per frame, so no batching here.
    pub fn draw_sub(&self, frame: &mut Frame, pal: &Palette) {
        let Some(sub) = &self.sub else {
            return;
        };
        let phase_a = self.base_opacity * self.phase_alpha() * self.blur_factor();
        if phase_a <= ALPHA_FLOOR {
            return;
        }
        let (bold, dim) = self.tier.weight();
        let x0 = self.x.round() as i32;
        let y = self.y.round() as i32;

        match sub {
            SubAnim::Strikeout { progress } => {
                let p = *progress;
                let shift = (p / STRIKE_COLOR_END).min(1.0);
                let rgb = blend(pal.flag_rgb, self.token.color, shift);
                let sweep =
                    ((p - STRIKE_COLOR_END) / (STRIKE_SWEEP_END - STRIKE_COLOR_END)).clamp(0.0, 1.0);
                let fade = if p > STRIKE_SWEEP_END {
                    1.0 - (p - STRIKE_SWEEP_END) / (1.0 - STRIKE_SWEEP_END)
                } else {
                    1.0
                };
                let alpha = phase_a * fade.max(0.0);
                if alpha <= ALPHA_FLOOR {
                    return;
                }
                let fg = pal.resolve(rgb, alpha);
                let len = self.token.text.chars().count();
                let struck = (sweep * len as f32).round() as usize;
                for (i, ch) in self.token.text.chars().enumerate() {
                    let mut cell = Cell::glyph(ch, fg, pal.bg).weighted(bold, dim);
                    if i < struck {
                        cell = cell.struck();
                    }
                    frame.set_clipped(x0 + i as i32, y, cell);
                }
            }
            SubAnim::Edit {
                progress,
                replacement,
            } => {
                let p = *progress;
                let caret = pal.resolve(pal.caret_rgb, phase_a);
                if p < EDIT_DELETE_END {
                    let keep_frac = 1.0 - p / EDIT_DELETE_END;
                    let len = self.token.text.chars().count();
                    let keep = (keep_frac * len as f32).round() as usize;
                    let fg = pal.resolve(self.token.color, phase_a);
                    let mut i = 0i32;
                    for ch in self.token.text.chars().take(keep) {
                        frame.set_clipped(x0 + i, y, Cell::glyph(ch, fg, pal.bg).weighted(bold, dim));
                        i += 1;
                    }
                    frame.set_clipped(x0 + i, y, Cell::glyph(CARET_CH, caret, pal.bg).weighted(bold, dim));
                } else if p < EDIT_HOLD_END {
                    frame.set_clipped(x0, y, Cell::glyph(CARET_CH, caret, pal.bg).weighted(bold, dim));
                } else if p < EDIT_TYPE_END {
                    let frac = (p - EDIT_HOLD_END) / (EDIT_TYPE_END - EDIT_HOLD_END);
                    let rlen = replacement.text.chars().count();
                    let shown = (frac * rlen as f32).round() as usize;
                    let fg = pal.resolve(replacement.color, phase_a);
                    let mut i = 0i32;
                    for ch in replacement.text.chars().take(shown) {
                        frame.set_clipped(x0 + i, y, Cell::glyph(ch, fg, pal.bg).weighted(bold, dim));
                        i += 1;
                    }
                    frame.set_clipped(x0 + i, y, Cell::glyph(CARET_CH, caret, pal.bg).weighted(bold, dim));
                } else {
                    let fade = 1.0 - (p - EDIT_TYPE_END) / (1.0 - EDIT_TYPE_END);
                    let alpha = phase_a * fade.max(0.0);
                    if alpha <= ALPHA_FLOOR {
                        return;
                    }
                    let fg = pal.resolve(replacement.color, alpha);
                    for (i, ch) in replacement.text.chars().enumerate() {
                        frame.set_clipped(x0 + i as i32, y, Cell::glyph(ch, fg, pal.bg).weighted(bold, dim));
                    }
                }
            }
            SubAnim::Codeblock { progress, snippet } => {
                let p = *progress;
                let fade = if p >= CODE_FADE_START {
                    1.0 - (p - CODE_FADE_START) / (1.0 - CODE_FADE_START)
                } else {
                    1.0
                };
                let alpha = phase_a * fade.max(0.0);
                if alpha <= ALPHA_FLOOR {
                    return;
                }
                let total: usize = snippet.iter().map(|l| l.text.chars().count()).sum();
                let typed = if p < CODE_TYPE_END {
                    ((p / CODE_TYPE_END) * total as f32) as usize
                } else {
                    total
                };
                let caret = pal.resolve(pal.caret_rgb, alpha);
                let mut budget = typed;
                for (li, line) in snippet.iter().enumerate() {
                    let shown = budget.min(line.text.chars().count());
                    let fg = pal.resolve(line.color, alpha);
                    for (i, ch) in line.text.chars().take(shown).enumerate() {
                        frame.set_clipped(
                            x0 + i as i32,
                            y + li as i32,
                            Cell::glyph(ch, fg, pal.bg).weighted(bold, dim),
                        );
                    }
                    budget -= shown;
                    if budget == 0 && typed < total {
                        frame.set_clipped(
                            x0 + shown as i32,
                            y + li as i32,
                            Cell::glyph(CARET_CH, caret, pal.bg).weighted(bold, dim),
                        );
                        break;
                    }
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
    use crate::tokens::Token;

    static FIVE: Token = Token {
        text: "abcde",
        color: (200, 200, 200),
    };

    fn typing_drop(interval: f32) -> Drop {
        let mut d = Drop::placeholder();
        d.token = &FIVE;
        d.type_interval = interval;
        d
    }

    #[test]
    fn five_chars_at_two_tick_interval_take_ten_ticks() {
        let mut d = typing_drop(2.0);
        for tick in 1..=10 {
            d.advance_typing(1.0);
            if tick == 9 {
                assert_eq!(d.phase, Phase::Typing);
                assert_eq!(d.revealed, 4);
            }
        }
        assert_eq!(d.phase, Phase::Visible);
        assert_eq!(d.revealed, 5);
    }

    #[test]
    fn oversized_step_reveals_several_at_once() {
        let mut d = typing_drop(0.5);
        d.advance_typing(1.6);
        assert_eq!(d.revealed, 3);
        assert_eq!(d.phase, Phase::Typing);
        d.advance_typing(10.0);
        assert_eq!(d.phase, Phase::Visible);
    }

    #[test]
    fn sub_slot_empties_past_full_progress() {
        let mut d = typing_drop(1.0);
        d.phase = Phase::Visible;
        d.sub = Some(SubAnim::Strikeout { progress: 0.0 });
        let steps = (1.0 / (STRIKE_RATE * 0.1)).ceil() as usize + 1;
        for _ in 0..steps {
            d.advance_sub(0.1);
        }
        assert!(d.sub.is_none());
    }

    #[test]
    fn fade_alpha_eases_out_monotonically() {
        let mut d = typing_drop(1.0);
        d.phase = Phase::Fading;
        let mut last = 1.0;
        for k in 0..=10 {
            d.fade = k as f32 / 10.0;
            let a = d.phase_alpha();
            assert!(a <= last);
            last = a;
        }
        assert!(last.abs() < 1e-6);
    }

    #[test]
    fn strikeout_sweep_strikes_a_prefix() {
        let pal = build_palette(Theme::Dark, ColorMode::TrueColor);
        let mut frame = Frame::new(20, 3, pal.bg);
        let mut d = typing_drop(1.0);
        d.phase = Phase::Visible;
        d.base_opacity = 1.0;
        d.x = 2.0;
        d.y = 1.0;
        d.sub = Some(SubAnim::Strikeout { progress: 0.5 });
        d.draw_sub(&mut frame, &pal);
        // sweep midpoint: first half struck, second half not
        assert!(frame.get(2, 1).unwrap().strike);
        assert!(frame.get(3, 1).unwrap().strike);
        assert!(!frame.get(6, 1).unwrap().strike);
        assert_eq!(frame.get(6, 1).unwrap().ch, 'e');
    }

    #[test]
    fn edit_mid_delete_keeps_a_prefix_and_caret() {
        let pal = build_palette(Theme::Dark, ColorMode::TrueColor);
        let mut frame = Frame::new(20, 3, pal.bg);
        let mut d = typing_drop(1.0);
        d.phase = Phase::Visible;
        d.base_opacity = 1.0;
        d.x = 0.0;
        d.y = 0.0;
        d.sub = Some(SubAnim::Edit {
            progress: 0.15,
            replacement: &RAIN[1],
        });
        d.draw_sub(&mut frame, &pal);
        // keeps round(2.5) = 3 chars, caret right after, tail blank
        assert_eq!(frame.get(0, 0).unwrap().ch, 'a');
        assert_eq!(frame.get(1, 0).unwrap().ch, 'b');
        assert_eq!(frame.get(3, 0).unwrap().ch, CARET_CH);
        assert_eq!(frame.get(4, 0).unwrap().ch, ' ');
    }

    #[test]
    fn codeblock_draws_stacked_lines_while_typing() {
        let pal = build_palette(Theme::Dark, ColorMode::TrueColor);
        let mut frame = Frame::new(40, 8, pal.bg);
        let mut d = typing_drop(1.0);
        d.phase = Phase::Visible;
        d.base_opacity = 1.0;
        d.x = 0.0;
        d.y = 0.0;
        d.sub = Some(SubAnim::Codeblock {
            progress: 0.3,
            snippet: crate::tokens::SNIPPETS[0],
        });
        d.draw_sub(&mut frame, &pal);
        // first line fully typed by midway, later lines still blank
        assert_eq!(frame.get(0, 0).unwrap().ch, 'l');
        assert_eq!(frame.get(0, 3).unwrap().ch, ' ');
    }
}
