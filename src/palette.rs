// Copyright (c) 2026 rezky_nightky

use crossterm::style::Color;

use crate::runtime::{ColorMode, Theme};

/// Resolved theme + color-mode state shared by every draw pass.
pub struct Palette {
    pub mode: ColorMode,
    pub bg_rgb: (u8, u8, u8),
    /// Cell background, `None` when the mode cannot express it and the
    /// terminal's own background should show through.
    pub bg: Option<Color>,
    pub bar_rgb: (u8, u8, u8),
    pub bar_text_rgb: (u8, u8, u8),
    pub caret_rgb: (u8, u8, u8),
    /// Target hue the strikeout animation pulls token text toward.
    pub flag_rgb: (u8, u8, u8),
    /// Theme multiplier applied to the configured drop density.
    pub density: f32,
    /// Base opacity range assigned to freshly spawned drops.
    pub opacity_lo: f32,
    pub opacity_hi: f32,
    theme: Theme,
}

pub fn build_palette(theme: Theme, mode: ColorMode) -> Palette {
    let (bg_rgb, bar_rgb, bar_text_rgb, caret_rgb, flag_rgb, density, opacity_lo, opacity_hi) =
        match theme {
            Theme::Dark => (
                (13, 17, 23),
                (22, 27, 34),
                (201, 209, 217),
                (88, 166, 255),
                (248, 81, 73),
                1.0,
                0.35,
                0.95,
            ),
            Theme::Light => (
                (250, 250, 249),
                (234, 238, 242),
                (36, 41, 47),
                (9, 105, 218),
                (207, 34, 46),
                0.8,
                0.45,
                1.0,
            ),
        };
    let bg = match mode {
        ColorMode::TrueColor | ColorMode::Color256 => Some(to_mode(bg_rgb, mode)),
        ColorMode::Color16 | ColorMode::Mono => None,
    };
    Palette {
        mode,
        bg_rgb,
        bg,
        bar_rgb,
        bar_text_rgb,
        caret_rgb,
        flag_rgb,
        density,
        opacity_lo,
        opacity_hi,
        theme,
    }
}

impl Palette {
    /// Token color adjusted for the theme. The catalog stores dark-theme
    /// hues, so the light theme pulls them toward black for contrast.
    pub fn tint(&self, rgb: (u8, u8, u8)) -> (u8, u8, u8) {
        match self.theme {
            Theme::Dark => rgb,
            Theme::Light => (
                (rgb.0 as f32 * 0.62) as u8,
                (rgb.1 as f32 * 0.62) as u8,
                (rgb.2 as f32 * 0.62) as u8,
            ),
        }
    }

    /// Alpha-composite a foreground toward the theme background, then
    /// narrow to whatever the color mode can carry. `None` means "draw
    /// with the terminal's default foreground" and is what Mono gets.
    pub fn resolve(&self, rgb: (u8, u8, u8), alpha: f32) -> Option<Color> {
        if self.mode == ColorMode::Mono {
            return None;
        }
        let mixed = blend(self.tint(rgb), self.bg_rgb, alpha);
        Some(to_mode(mixed, self.mode))
    }

    /// Like `resolve` but at full opacity, for chrome that never fades.
    pub fn solid(&self, rgb: (u8, u8, u8)) -> Option<Color> {
        self.resolve(rgb, 1.0)
    }

    pub fn bar_bg(&self) -> Option<Color> {
        if self.mode == ColorMode::Mono {
            return None;
        }
        Some(to_mode(self.bar_rgb, self.mode))
    }
}

/// Linear blend of `fg` over `bg` by `alpha`, clamped to [0, 1].
pub fn blend(fg: (u8, u8, u8), bg: (u8, u8, u8), alpha: f32) -> (u8, u8, u8) {
    let t = alpha.clamp(0.0, 1.0);
    (
        lerp_u8(bg.0, fg.0, t),
        lerp_u8(bg.1, fg.1, t),
        lerp_u8(bg.2, fg.2, t),
    )
}

fn to_mode(rgb: (u8, u8, u8), mode: ColorMode) -> Color {
    match mode {
        ColorMode::Mono => Color::White,
        ColorMode::TrueColor => Color::Rgb {
            r: rgb.0,
            g: rgb.1,
            b: rgb.2,
        },
        ColorMode::Color256 => Color::AnsiValue(rgb_to_ansi256(rgb.0, rgb.1, rgb.2)),
        ColorMode::Color16 => rgb_to_color16(rgb.0, rgb.1, rgb.2),
    }
}

fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round().clamp(0.0, 255.0) as u8
}

fn dist2(a: (u8, u8, u8), b: (u8, u8, u8)) -> i32 {
    let dr = a.0 as i32 - b.0 as i32;
    let dg = a.1 as i32 - b.1 as i32;
    let db = a.2 as i32 - b.2 as i32;
    dr * dr + dg * dg + db * db
}

/// Nearest xterm-256 index: compare the 6x6x6 cube candidate against the
/// 24-step grayscale ramp and keep whichever is closer.
fn rgb_to_ansi256(r: u8, g: u8, b: u8) -> u8 {
    fn cube_idx(c: u8) -> i32 {
        if (c as i32) < 48 {
            0
        } else if (c as i32) < 115 {
            1
        } else {
            (c as i32 - 35) / 40
        }
    }
    fn cube_val(i: i32) -> u8 {
        if i == 0 {
            0
        } else {
            (55 + i * 40) as u8
        }
    }
    let (ir, ig, ib) = (cube_idx(r), cube_idx(g), cube_idx(b));
    let cube = (cube_val(ir), cube_val(ig), cube_val(ib));
    let cube_code = (16 + 36 * ir + 6 * ig + ib) as u8;

    let gray_avg = (r as i32 + g as i32 + b as i32) / 3;
    let gi = ((gray_avg - 3) / 10).clamp(0, 23);
    let gv = (8 + gi * 10) as u8;
    let gray = (gv, gv, gv);
    let gray_code = (232 + gi) as u8;

    if dist2((r, g, b), gray) < dist2((r, g, b), cube) {
        gray_code
    } else {
        cube_code
    }
}

const ANSI16: [((u8, u8, u8), Color); 16] = [
    ((0, 0, 0), Color::Black),
    ((128, 0, 0), Color::DarkRed),
    ((0, 128, 0), Color::DarkGreen),
    ((128, 128, 0), Color::DarkYellow),
    ((0, 0, 128), Color::DarkBlue),
    ((128, 0, 128), Color::DarkMagenta),
    ((0, 128, 128), Color::DarkCyan),
    ((192, 192, 192), Color::Grey),
    ((128, 128, 128), Color::DarkGrey),
    ((255, 0, 0), Color::Red),
    ((0, 255, 0), Color::Green),
    ((255, 255, 0), Color::Yellow),
    ((0, 0, 255), Color::Blue),
    ((255, 0, 255), Color::Magenta),
    ((0, 255, 255), Color::Cyan),
    ((255, 255, 255), Color::White),
];

fn rgb_to_color16(r: u8, g: u8, b: u8) -> Color {
    let mut best = ANSI16[0].1;
    let mut best_d = i32::MAX;
    for (rgb, color) in ANSI16 {
        let d = dist2((r, g, b), rgb);
        if d < best_d {
            best_d = d;
            best = color;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_endpoints_and_clamp() {
        let fg = (200, 100, 50);
        let bg = (10, 20, 30);
        assert_eq!(blend(fg, bg, 0.0), bg);
        assert_eq!(blend(fg, bg, 1.0), fg);
        assert_eq!(blend(fg, bg, -2.0), bg);
        assert_eq!(blend(fg, bg, 7.5), fg);
        let mid = blend((0, 0, 0), (255, 255, 255), 0.5);
        assert!(mid.0 > 120 && mid.0 < 135);
    }

    #[test]
    fn ansi256_grays_use_the_ramp() {
        let code = rgb_to_ansi256(128, 128, 128);
        assert!((232..=255).contains(&code), "got {code}");
        assert_eq!(rgb_to_ansi256(0, 0, 0), 16);
    }

    #[test]
    fn color16_snaps_primaries() {
        assert_eq!(rgb_to_color16(250, 10, 10), Color::Red);
        assert_eq!(rgb_to_color16(10, 10, 250), Color::Blue);
        assert_eq!(rgb_to_color16(255, 255, 255), Color::White);
    }

    #[test]
    fn mono_resolves_to_default_fg() {
        let p = build_palette(Theme::Dark, ColorMode::Mono);
        assert!(p.resolve((200, 50, 50), 0.8).is_none());
        assert!(p.bg.is_none());
    }

    #[test]
    fn light_theme_darkens_catalog_hues() {
        let p = build_palette(Theme::Light, ColorMode::TrueColor);
        let t = p.tint((200, 100, 50));
        assert!(t.0 < 200 && t.1 < 100 && t.2 < 50);
    }
}
