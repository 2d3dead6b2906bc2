// Copyright (c) 2026 rezky_nightky

use std::io::IsTerminal;

use clap::Parser;

use crate::runtime::Theme;
use crate::tokens;

pub const DEFAULT_PARAMS_USAGE: &str = "DEFAULT PARAMS USAGE:\n  tokenfall --duration 0 --theme dark --fps 60 --density 1 --burst-count 24";

pub fn color_enabled_stdout() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if matches!(std::env::var("CLICOLOR").ok().as_deref(), Some("0")) {
        return false;
    }
    std::io::stdout().is_terminal()
}

fn colorize_help_detail(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 64);
    for chunk in text.split_inclusive('\n') {
        let (line, nl) = chunk
            .strip_suffix('\n')
            .map(|l| (l, "\n"))
            .unwrap_or((chunk, ""));

        let is_heading =
            !line.starts_with(' ') && line.ends_with(':') && line == line.to_ascii_uppercase();

        if is_heading {
            out.push_str("\x1b[1;36m");
            out.push_str(line);
            out.push_str("\x1b[0m");
            out.push_str(nl);
            continue;
        }

        if let Some(rest) = line.strip_prefix("      Example:") {
            out.push_str("      \x1b[32mExample:\x1b[0m");
            out.push_str(rest);
            out.push_str(nl);
            continue;
        }

        if let Some(rest) = line.strip_prefix("  tokenfall") {
            out.push_str("  \x1b[1;34mtokenfall\x1b[0m");
            out.push_str(rest);
            out.push_str(nl);
            continue;
        }

        if let Some(rest) = line.strip_prefix("  -") {
            out.push_str("  \x1b[33m-");
            out.push_str(rest);
            out.push_str("\x1b[0m");
            out.push_str(nl);
            continue;
        }

        if let Some(rest) = line.strip_prefix("  --") {
            out.push_str("  \x1b[33m--");
            out.push_str(rest);
            out.push_str("\x1b[0m");
            out.push_str(nl);
            continue;
        }

        out.push_str(line);
        out.push_str(nl);
    }
    out
}

pub fn default_params_usage_for_help() -> String {
    if color_enabled_stdout() {
        colorize_help_detail(DEFAULT_PARAMS_USAGE)
    } else {
        DEFAULT_PARAMS_USAGE.to_string()
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeArg {
    #[value(name = "dark")]
    Dark,
    #[value(name = "light")]
    Light,
}

impl ThemeArg {
    pub fn theme(self) -> Theme {
        match self {
            ThemeArg::Dark => Theme::Dark,
            ThemeArg::Light => Theme::Light,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "tokenfall", version, disable_version_flag = true)]
pub struct Args {
    #[arg(
        long = "duration",
        help_heading = "GENERAL",
        help = "Stop after N seconds (min 0.1 max 86400; <=0 disables)"
    )]
    pub duration: Option<f64>,

    #[arg(
        short = 's',
        long = "screensaver",
        help_heading = "GENERAL",
        help = "Screensaver mode (exit on keypress)"
    )]
    pub screensaver: bool,

    #[arg(
        long = "no-input-bar",
        help_heading = "GENERAL",
        help = "Hide the input bar (particles fall through unbounced)"
    )]
    pub no_input_bar: bool,

    #[arg(
        long = "paused",
        help_heading = "GENERAL",
        help = "Start paused (Space resumes)"
    )]
    pub paused: bool,

    #[arg(
        long = "reduced-motion",
        help_heading = "GENERAL",
        help = "Start with motion frozen (m toggles at runtime)"
    )]
    pub reduced_motion: bool,

    #[arg(
        short = 't',
        long = "theme",
        default_value_t = ThemeArg::Dark,
        value_enum,
        help_heading = "APPEARANCE",
        help = "Color theme (see --list-themes)"
    )]
    pub theme: ThemeArg,

    #[arg(
        long = "colormode",
        help_heading = "APPEARANCE",
        help = "Force color mode (allowed: 0,16,8/256,24/32). Default: 24-bit if supported (COLORTERM), else 8-bit (TERM=...256color), else 16-color"
    )]
    pub colormode: Option<u16>,

    #[arg(
        short = 'f',
        long = "fps",
        default_value_t = 60.0,
        help_heading = "PERFORMANCE",
        help = "Target FPS (min 1 max 240)"
    )]
    pub fps: f64,

    #[arg(
        short = 'd',
        long = "density",
        default_value_t = 1.0,
        help_heading = "PERFORMANCE",
        help = "Drop density multiplier (min 0.05 max 3.0)"
    )]
    pub density: f32,

    #[arg(
        long = "perf-stats",
        help_heading = "PERFORMANCE",
        help = "Print performance statistics summary on exit"
    )]
    pub perf_stats: bool,

    #[arg(
        long = "burst-count",
        default_value_t = 24,
        help_heading = "BURST",
        help = "Particles per click burst (min 1 max 120)"
    )]
    pub burst_count: u32,

    #[arg(
        long = "seed",
        help_heading = "BURST",
        help = "Fix the RNG seed for reproducible runs (default: OS entropy)"
    )]
    pub seed: Option<u64>,

    #[arg(
        long = "check-bitcolor",
        help_heading = "HELP",
        help = "Print detected terminal color capability and exit"
    )]
    pub check_bitcolor: bool,

    #[arg(
        long = "help-detail",
        help_heading = "HELP",
        help = "Show detailed help for all parameters and exit"
    )]
    pub help_detail: bool,

    #[arg(
        long = "list-themes",
        help_heading = "HELP",
        help = "List available themes and exit"
    )]
    pub list_themes: bool,

    #[arg(
        long = "list-tokens",
        help_heading = "HELP",
        help = "List the token catalogs and exit"
    )]
    pub list_tokens: bool,

    #[arg(
        long = "info",
        short = 'i',
        help_heading = "HELP",
        help = "Print version info and exit"
    )]
    pub info: bool,

    #[arg(
        long = "version",
        short = 'v',
        help_heading = "HELP",
        help = "Print version and exit"
    )]
    pub version: bool,
}

pub fn print_list_themes() {
    if color_enabled_stdout() {
        println!("\x1b[1;36mAVAILABLE THEMES:\x1b[0m");
        println!("\x1b[2mNOTE: Use only the VALUE (left side) with --theme.\x1b[0m");
    } else {
        println!("AVAILABLE THEMES:");
        println!("NOTE: Use only the VALUE (left side) with --theme.");
    }
    println!();
    println!("VALUE        DESCRIPTION");
    println!("dark         Dark background, full density (default)");
    println!("light        Light background, reduced density, darkened token hues");
}

pub fn print_list_tokens() {
    let color = color_enabled_stdout();
    let heading = |s: &str| {
        if color {
            println!("\x1b[1;36m{}\x1b[0m", s);
        } else {
            println!("{}", s);
        }
    };

    heading("RAIN TOKENS:");
    for t in tokens::RAIN {
        println!("  {}", t.text);
    }
    println!();

    heading("SNIPPETS:");
    for (i, snippet) in tokens::SNIPPETS.iter().enumerate() {
        if i > 0 {
            println!();
        }
        for line in snippet.iter() {
            println!("  {}", line.text);
        }
    }
    println!();

    heading("BURST TOKENS:");
    let joined: Vec<&str> = tokens::BURST.iter().map(|t| t.text).collect();
    println!("  {}", joined.join("  "));
}

pub fn print_help_detail() {
    let block = format!(
        "{}\n\nUSAGE:\n  tokenfall [OPTIONS]\n\nGENERAL:\n  -s, --screensaver\n      Screensaver mode (exit on first keypress).\n      Example: tokenfall -s\n\n  --duration <seconds>\n      Stop after N seconds (min 0.1 max 86400).\n      Example: tokenfall --duration 10\n\n  --no-input-bar\n      Hide the input bar; burst particles fall straight through.\n      Example: tokenfall --no-input-bar\n\n  --paused\n      Start paused; press Space to start the rain.\n      Example: tokenfall --paused\n\n  --reduced-motion\n      Start with motion frozen; m toggles it at runtime.\n      Example: tokenfall --reduced-motion\n\nAPPEARANCE:\n  -t, --theme <dark|light>\n      Color theme (see --list-themes).\n      Example: tokenfall --theme light\n\n  --colormode <0|16|8|24>\n      Force color mode; otherwise auto-detected from COLORTERM/TERM.\n      Example: tokenfall --colormode 24\n\nPERFORMANCE:\n  -f, --fps <number>\n      Target FPS (min 1 max 240). Above 90 the engine updates every\n      other frame and banks the skipped delta.\n      Example: tokenfall --fps 30\n\n  -d, --density <number>\n      Drop density multiplier over the theme default (min 0.05 max 3.0).\n      Example: tokenfall --density 1.5\n\n  --perf-stats\n      Print performance statistics summary on exit.\n      Example: tokenfall --duration 10 --perf-stats\n\nBURST:\n  --burst-count <number>\n      Particles created per click burst (min 1 max 120).\n      Example: tokenfall --burst-count 60\n\n  --seed <number>\n      Fix the RNG seed for a reproducible run.\n      Example: tokenfall --seed 42\n\nHELP:\n  --check-bitcolor\n      Print detected terminal color capability and exit.\n\n  --help\n      Show short help.\n\n  --help-detail\n      Show this detailed help.\n\n  --list-themes\n      List available themes and exit.\n\n  --list-tokens\n      List the token catalogs and exit.\n\n  -v, --version\n      Print version and exit.\n\n  -i, --info\n      Print version info and exit.\n\nKEYS:\n  q / Esc        quit\n  Space          pause / resume\n  m              toggle reduced motion\n  t              toggle theme\n  b              burst at screen center\n  mouse click    burst at the pointer\n  Up / Down      move the input bar\n",
        DEFAULT_PARAMS_USAGE
    );

    if color_enabled_stdout() {
        print!("{}", colorize_help_detail(&block));
    } else {
        print!("{}", block);
    }

    let tail = "\nVALUE LISTS:\n  tokenfall --list-themes\n  tokenfall --list-tokens\n\nLIMITS / VALID RANGES:\n";
    if color_enabled_stdout() {
        print!("{}", colorize_help_detail(tail));
    } else {
        print!("{}", tail);
    }
    println!("  --duration <seconds>     min 0.1 max 86400 (<=0 disables)");
    println!("  --fps <number>           min 1 max 240");
    println!("  --density <number>       min 0.05 max 3.0");
    println!("  --burst-count <number>   min 1 max 120");
    println!("  --colormode <0|16|8|24>  allowed values only (8==256, 24==32)");
    println!();
    print_list_themes();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduced_motion_flag_parses() {
        let args = Args::try_parse_from(["tokenfall", "--reduced-motion"]).unwrap();
        assert!(args.reduced_motion);

        let args = Args::try_parse_from(["tokenfall"]).unwrap();
        assert!(!args.reduced_motion);
    }
}
