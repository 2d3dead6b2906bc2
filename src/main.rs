// Copyright (c) 2026 rezky_nightky

mod cell;
mod config;
mod drop;
mod engine;
mod frame;
mod palette;
mod particle;
mod region;
mod runtime;
mod terminal;
mod tokens;

use std::env;
use std::time::{Duration, Instant};

#[cfg(unix)]
use std::thread;

use clap::builder::styling::{AnsiColor as ClapAnsiColor, Color as ClapColor};
use clap::builder::styling::{Effects as ClapEffects, Style as ClapStyle};
use clap::builder::Styles as ClapStyles;
use clap::{CommandFactory, FromArgMatches};
use crossterm::event::{Event, KeyCode, KeyEventKind, MouseButton, MouseEventKind};

#[cfg(unix)]
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
#[cfg(unix)]
use signal_hook::iterator::Signals;

use crate::cell::Cell;
use crate::config::{
    color_enabled_stdout, default_params_usage_for_help, print_help_detail, print_list_themes,
    print_list_tokens, Args,
};
use crate::drop::{CARET_CH, CARET_PERIOD};
use crate::engine::{EngineOpts, Storm};
use crate::frame::Frame;
use crate::palette::Palette;
use crate::region::RectF;
use crate::runtime::ColorMode;
use crate::terminal::{restore_terminal_best_effort, Terminal};

const HELP_TEMPLATE_PLAIN: &str = "\
{before-help}{about-with-newline}
USAGE:
  {usage}

{all-args}{after-help}";

const HELP_TEMPLATE_COLOR: &str = "\
{before-help}{about-with-newline}
\x1b[1;36mUSAGE:\x1b[0m
  {usage}

{all-args}{after-help}";

fn build_info() -> &'static str {
    env!("TOKENFALL_BUILD")
}

fn git_sha() -> &'static str {
    env!("TOKENFALL_GIT_SHA")
}

fn clap_styles() -> ClapStyles {
    ClapStyles::styled()
        .header(
            ClapStyle::new()
                .effects(ClapEffects::BOLD)
                .fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Cyan))),
        )
        .usage(
            ClapStyle::new()
                .effects(ClapEffects::BOLD)
                .fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Green))),
        )
        .literal(ClapStyle::new().fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Yellow))))
        .placeholder(ClapStyle::new().fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Magenta))))
}

fn require_f64_range(name: &str, v: f64, min: f64, max: f64) -> f64 {
    if !v.is_finite() {
        eprintln!("failed to apply {} {} (must be a finite number)", name, v);
        std::process::exit(1);
    }
    if v < min || v > max {
        eprintln!("failed to apply {} {} (min {} max {})", name, v, min, max);
        std::process::exit(1);
    }
    v
}

fn require_f32_range(name: &str, v: f32, min: f32, max: f32) -> f32 {
    if !v.is_finite() {
        eprintln!("failed to apply {} {} (must be a finite number)", name, v);
        std::process::exit(1);
    }
    if v < min || v > max {
        eprintln!("failed to apply {} {} (min {} max {})", name, v, min, max);
        std::process::exit(1);
    }
    v
}

fn require_u32_range(name: &str, v: u32, min: u32, max: u32) -> u32 {
    if v < min || v > max {
        eprintln!("failed to apply {} {} (min {} max {})", name, v, min, max);
        std::process::exit(1);
    }
    v
}

fn detect_color_mode_auto() -> ColorMode {
    let colorterm = env::var("COLORTERM")
        .unwrap_or_default()
        .to_ascii_lowercase();
    if colorterm.contains("truecolor") || colorterm.contains("24bit") {
        return ColorMode::TrueColor;
    }

    let term = env::var("TERM").unwrap_or_default().to_ascii_lowercase();
    if term == "dumb" {
        return ColorMode::Mono;
    }
    if term.contains("256color") {
        return ColorMode::Color256;
    }

    ColorMode::Color16
}

fn detect_color_mode(args: &Args) -> ColorMode {
    if let Some(m) = args.colormode {
        return match m {
            0 => ColorMode::Mono,
            16 => ColorMode::Color16,
            8 | 256 => ColorMode::Color256,
            24 | 32 => ColorMode::TrueColor,
            _ => {
                eprintln!("invalid --colormode: {} (allowed: 0,16,8,24)", m);
                std::process::exit(1);
            }
        };
    }

    detect_color_mode_auto()
}

fn color_mode_label(m: ColorMode) -> &'static str {
    match m {
        ColorMode::TrueColor => "24-bit truecolor",
        ColorMode::Color256 => "8-bit (256-color)",
        ColorMode::Color16 => "16-color",
        ColorMode::Mono => "mono",
    }
}

fn query_cell_px() -> Option<(u16, u16)> {
    let ws = crossterm::terminal::window_size().ok()?;
    if ws.columns == 0 || ws.rows == 0 || ws.width == 0 || ws.height == 0 {
        return None;
    }
    Some((ws.width / ws.columns, ws.height / ws.rows))
}

fn bar_region(cols: u16, row: u16) -> RectF {
    RectF::new(2.0, row as f32, cols.saturating_sub(4) as f32, 1.0)
}

fn blank_bar_row(frame: &mut Frame, pal: &Palette, row: u16) {
    if row >= frame.height {
        return;
    }
    for x in 2..frame.width.saturating_sub(2) {
        frame.set(x, row, Cell::blank_with_bg(pal.bg));
    }
}

fn draw_input_bar(frame: &mut Frame, pal: &Palette, row: u16, caret_on: bool) {
    if row >= frame.height || frame.width < 8 {
        return;
    }
    let x0 = 2u16;
    let x1 = frame.width - 2;
    let bg = pal.bar_bg();
    for x in x0..x1 {
        frame.set(x, row, Cell::blank_with_bg(bg));
    }

    let text = pal.solid(pal.bar_text_rgb);
    frame.set(x0 + 1, row, Cell::glyph('>', text, bg).weighted(true, false));
    if caret_on {
        let caret = pal.solid(pal.caret_rgb);
        frame.set(x0 + 3, row, Cell::glyph(CARET_CH, caret, bg));
    }
    for (i, ch) in "Type a message".chars().enumerate() {
        let x = x0 + 5 + i as u16;
        if x >= x1 {
            break;
        }
        frame.set(x, row, Cell::glyph(ch, text, bg).weighted(false, true));
    }
}

fn main() -> std::io::Result<()> {
    std::panic::set_hook(Box::new(|info| {
        restore_terminal_best_effort();
        eprintln!("{}", info);
    }));

    #[cfg(unix)]
    {
        if let Ok(mut signals) = Signals::new([SIGINT, SIGTERM, SIGHUP]) {
            thread::spawn(move || {
                if let Some(sig) = signals.forever().next() {
                    restore_terminal_best_effort();
                    std::process::exit(128 + sig);
                }
            });
        }
    }

    #[cfg(windows)]
    {
        if let Err(e) = ctrlc::set_handler(|| {
            restore_terminal_best_effort();
            std::process::exit(130);
        }) {
            eprintln!("failed to install Ctrl-C handler: {}", e);
        }
    }

    let mut cmd = Args::command();
    cmd = cmd.styles(clap_styles());
    cmd = cmd.before_help(default_params_usage_for_help());
    let help_template = if color_enabled_stdout() {
        HELP_TEMPLATE_COLOR
    } else {
        HELP_TEMPLATE_PLAIN
    };
    cmd = cmd.help_template(help_template);
    cmd.build();

    if cmd.get_arguments().any(|a| a.get_id().as_str() == "help") {
        cmd = cmd.mut_arg("help", |a| a.help_heading("HELP"));
    }
    cmd.build();

    let matches = cmd.get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    if args.list_themes {
        print_list_themes();
        return Ok(());
    }

    if args.list_tokens {
        print_list_tokens();
        return Ok(());
    }

    if args.help_detail {
        print_help_detail();
        return Ok(());
    }

    if args.check_bitcolor {
        let colorterm = env::var("COLORTERM").unwrap_or_default();
        let term = env::var("TERM").unwrap_or_default();
        let auto = detect_color_mode_auto();
        let effective = detect_color_mode(&args);

        println!("BITCOLOR CHECK:");
        println!(
            "  COLORTERM: {}",
            if colorterm.is_empty() {
                "(unset)"
            } else {
                &colorterm
            }
        );
        println!(
            "  TERM: {}",
            if term.is_empty() { "(unset)" } else { &term }
        );
        println!("  auto_detected: {}", color_mode_label(auto));
        if args.colormode.is_some() {
            println!("  forced: {}", color_mode_label(effective));
        }
        println!("  effective: {}", color_mode_label(effective));
        return Ok(());
    }

    if args.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if args.info {
        println!("Version: v{}", env!("CARGO_PKG_VERSION"));
        println!("Build: {}", build_info());
        if !git_sha().is_empty() {
            println!("Commit: {}", git_sha());
        }
        println!("Copyright: (c) 2026 {}", env!("CARGO_PKG_AUTHORS"));
        println!("License: {}", env!("CARGO_PKG_LICENSE"));
        println!("Source: {}", env!("CARGO_PKG_REPOSITORY"));
        return Ok(());
    }

    let color_mode = detect_color_mode(&args);

    let target_fps = require_f64_range("--fps", args.fps, 1.0, 240.0);
    let duration_s = args.duration.map(|s| {
        if !s.is_finite() {
            eprintln!("failed to apply --duration {} (must be a finite number)", s);
            std::process::exit(1);
        }
        if s > 0.0 {
            return require_f64_range("--duration", s, 0.1, 86400.0);
        }
        s
    });
    let density = require_f32_range("--density", args.density, 0.05, 3.0);
    let burst_count = require_u32_range("--burst-count", args.burst_count, 1, 120);

    let opts = EngineOpts {
        theme: args.theme.theme(),
        mode: color_mode,
        density,
        fps: target_fps.round() as u32,
        seed: args.seed,
    };

    let (w, h) = crossterm::terminal::size()?;
    let mut term = Terminal::new(w, h)?;
    let mut storm = Storm::new(w, h, query_cell_px(), &opts);
    storm.set_reduced_motion(args.reduced_motion);
    let mut frame = Frame::new(w, h, storm.palette.bg);

    let mut bar_row = h.saturating_sub(2).max(1);
    if !args.no_input_bar {
        storm.set_collision_region(Some(bar_region(w, bar_row)));
    }

    let mut running = true;
    let mut paused = args.paused;

    let start_time = Instant::now();
    let mut last_tick = start_time;
    let end_time = args.duration.and_then(|s| {
        if !s.is_finite() || s <= 0.0 {
            return None;
        }
        let s = duration_s.unwrap_or(s);
        Some(start_time + Duration::from_secs_f64(s))
    });

    let target_period = Duration::from_secs_f64(1.0 / target_fps);
    let mut next_frame = Instant::now();

    let mut perf_frames: u64 = 0;
    let mut perf_drawn_frames: u64 = 0;
    let mut perf_work_sum_s: f64 = 0.0;
    let mut perf_work_max_s: f32 = 0.0;
    let mut cells_written: u64 = 0;

    while running {
        if end_time.is_some_and(|end| Instant::now() >= end) {
            break;
        }
        let mut pending_resize: Option<(u16, u16)> = None;

        loop {
            while Terminal::poll_event(Duration::from_millis(0))? {
                let ev = Terminal::read_event()?;
                match ev {
                    Event::Resize(nw, nh) => {
                        pending_resize = Some((nw, nh));
                    }
                    Event::FocusGained => storm.set_visible(true),
                    Event::FocusLost => storm.set_visible(false),
                    Event::Mouse(m) => {
                        if let MouseEventKind::Down(MouseButton::Left) = m.kind {
                            storm.request_burst(m.column as f32, m.row as f32, burst_count);
                        }
                    }
                    Event::Key(k) if k.kind == KeyEventKind::Press => {
                        if args.screensaver {
                            running = false;
                            break;
                        }

                        match k.code {
                            KeyCode::Esc => running = false,
                            KeyCode::Char('q') => running = false,
                            KeyCode::Char(' ') => paused = !paused,
                            KeyCode::Char('m') => {
                                storm.set_reduced_motion(!storm.reduced_motion());
                            }
                            KeyCode::Char('t') => {
                                storm.set_theme(storm.theme().toggled());
                                frame.clear_with_bg(storm.palette.bg);
                            }
                            KeyCode::Char('b') => {
                                storm.request_burst(
                                    frame.width as f32 * 0.5,
                                    frame.height as f32 * 0.5,
                                    burst_count,
                                );
                            }
                            KeyCode::Up => {
                                if !args.no_input_bar && bar_row > 1 {
                                    blank_bar_row(&mut frame, &storm.palette, bar_row);
                                    bar_row -= 1;
                                    storm.set_collision_region(Some(bar_region(
                                        frame.width,
                                        bar_row,
                                    )));
                                }
                            }
                            KeyCode::Down => {
                                if !args.no_input_bar && bar_row + 2 < frame.height {
                                    blank_bar_row(&mut frame, &storm.palette, bar_row);
                                    bar_row += 1;
                                    storm.set_collision_region(Some(bar_region(
                                        frame.width,
                                        bar_row,
                                    )));
                                }
                            }
                            _ => {}
                        }
                    }
                    _ => {}
                }
            }

            if !running || pending_resize.is_some() {
                break;
            }

            let now = Instant::now();
            if now >= next_frame {
                break;
            }

            let mut timeout = next_frame - now;
            if let Some(end) = end_time {
                if now >= end {
                    break;
                }
                timeout = timeout.min(end - now);
            }
            let _ = Terminal::poll_event(timeout)?;
        }

        if !running {
            break;
        }

        if let Some((nw, nh)) = pending_resize {
            storm.resize(nw, nh, query_cell_px());
            term.resize(nw, nh);
            frame = Frame::new(nw, nh, storm.palette.bg);
            bar_row = bar_row.min(nh.saturating_sub(2)).max(1);
            if !args.no_input_bar {
                storm.set_collision_region(Some(bar_region(nw, bar_row)));
            }
        }

        let now = Instant::now();
        let dt = now.duration_since(last_tick).as_secs_f32();
        last_tick = now;

        let work_start = Instant::now();
        if !paused {
            storm.tick(dt, &mut frame);
        }
        if !args.no_input_bar {
            let caret_on =
                start_time.elapsed().as_secs_f32() % CARET_PERIOD < CARET_PERIOD * 0.5;
            draw_input_bar(&mut frame, &storm.palette, bar_row, caret_on);
        }
        let did_draw = frame.is_dirty_all() || !frame.dirty_indices().is_empty();
        if did_draw {
            cells_written = cells_written.saturating_add(term.draw(&mut frame)?);
        }
        let work_s = work_start.elapsed().as_secs_f32();

        if args.perf_stats {
            perf_frames = perf_frames.saturating_add(1);
            if did_draw {
                perf_drawn_frames = perf_drawn_frames.saturating_add(1);
            }
            perf_work_sum_s += work_s as f64;
            perf_work_max_s = perf_work_max_s.max(work_s);
        }

        next_frame += target_period;
        let now = Instant::now();
        if now > next_frame {
            next_frame = now;
        }
    }

    if args.perf_stats {
        drop(term);
        let elapsed = start_time.elapsed();
        let elapsed_s = elapsed.as_secs_f64().max(0.000_001);

        let frames = perf_frames.max(1);
        let avg_work_ms = (perf_work_sum_s / frames as f64) * 1000.0;
        let avg_fps = (perf_frames as f64) / elapsed_s;
        let drawn_ratio = (perf_drawn_frames as f64) / (perf_frames as f64).max(1.0);

        println!("PERF STATS:");
        println!("  elapsed_s: {:.3}", elapsed_s);
        println!("  target_fps: {:.3}", target_fps);
        println!("  avg_fps: {:.3}", avg_fps);
        println!("  frames: {}", perf_frames);
        println!(
            "  drawn_frames: {} ({:.1}%)",
            perf_drawn_frames,
            drawn_ratio * 100.0
        );
        println!("  avg_work_ms: {:.3}", avg_work_ms);
        println!("  max_work_ms: {:.3}", perf_work_max_s as f64 * 1000.0);
        println!("  engine_ticks: {}", storm.ticks_run);
        println!("  skipped_ticks: {}", storm.ticks_skipped);
        println!("  cells_written: {}", cells_written);
    }

    Ok(())
}
