// Copyright (c) 2026 rezky_nightky

use std::io::{self, stdout, BufWriter, Stdout, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{
    DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture,
};
use crossterm::style::{
    Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, Clear, ClearType, DisableLineWrap, EnableLineWrap,
    EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{execute, queue};

use crate::cell::Cell;
use crate::frame::Frame;

/// Raw-mode screen writer. Keeps the last flushed grid so dirty updates can
/// skip cells that did not actually change, and dedupes SGR state so runs of
/// same-styled glyphs cost one escape sequence.
pub struct Terminal {
    out: BufWriter<Stdout>,
    width: u16,
    height: u16,
    last: Vec<Cell>,
    force_full: bool,
    cur_fg: Option<Color>,
    cur_bg: Option<Color>,
    cur_bold: bool,
    cur_dim: bool,
    cur_strike: bool,
    run_buf: String,
    scratch: Vec<usize>,
}

impl Terminal {
    pub fn new(width: u16, height: u16) -> io::Result<Terminal> {
        enable_raw_mode()?;
        let init_res: io::Result<()> = (|| {
            let mut out = stdout();
            execute!(
                out,
                EnterAlternateScreen,
                EnableMouseCapture,
                EnableFocusChange,
                Hide
            )?;
            // Not every terminal supports it; a refused wrap toggle is fine.
            let _ = execute!(out, DisableLineWrap);
            execute!(out, Clear(ClearType::All))?;
            Ok(())
        })();
        if let Err(e) = init_res {
            restore_terminal_best_effort();
            return Err(e);
        }
        let len = width as usize * height as usize;
        Ok(Terminal {
            out: BufWriter::with_capacity(64 * 1024, stdout()),
            width,
            height,
            last: vec![Cell::blank_with_bg(None); len],
            force_full: true,
            cur_fg: None,
            cur_bg: None,
            cur_bold: false,
            cur_dim: false,
            cur_strike: false,
            run_buf: String::new(),
            scratch: Vec::new(),
        })
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.last = vec![Cell::blank_with_bg(None); width as usize * height as usize];
        self.force_full = true;
    }

    pub fn poll_event(timeout: std::time::Duration) -> io::Result<bool> {
        crossterm::event::poll(timeout)
    }

    pub fn read_event() -> io::Result<crossterm::event::Event> {
        crossterm::event::read()
    }

    /// Flush a frame to the screen. Returns the cell count written so the
    /// perf report can track draw volume.
    pub fn draw(&mut self, frame: &mut Frame) -> io::Result<u64> {
        let total = self.last.len();
        // Past a third of the screen, row batching beats cursor seeking.
        let full = self.force_full
            || frame.is_dirty_all()
            || frame.dirty_indices().len() >= total / 3;
        let written = if full {
            self.draw_full(frame)?
        } else {
            self.draw_dirty(frame)?
        };
        frame.clear_dirty();
        self.force_full = false;
        self.out.flush()?;
        Ok(written)
    }

    fn reset_style(&mut self) -> io::Result<()> {
        queue!(self.out, SetAttribute(Attribute::Reset), ResetColor)?;
        self.cur_fg = Some(Color::Reset);
        self.cur_bg = Some(Color::Reset);
        self.cur_bold = false;
        self.cur_dim = false;
        self.cur_strike = false;
        Ok(())
    }

    fn sync_style(&mut self, cell: &Cell) -> io::Result<()> {
        let want_fg = cell.fg.unwrap_or(Color::Reset);
        if self.cur_fg != Some(want_fg) {
            queue!(self.out, SetForegroundColor(want_fg))?;
            self.cur_fg = Some(want_fg);
        }
        let want_bg = cell.bg.unwrap_or(Color::Reset);
        if self.cur_bg != Some(want_bg) {
            queue!(self.out, SetBackgroundColor(want_bg))?;
            self.cur_bg = Some(want_bg);
        }
        if cell.bold != self.cur_bold || cell.dim != self.cur_dim {
            // NormalIntensity clears both weight flags, so re-apply what stays.
            queue!(self.out, SetAttribute(Attribute::NormalIntensity))?;
            if cell.bold {
                queue!(self.out, SetAttribute(Attribute::Bold))?;
            }
            if cell.dim {
                queue!(self.out, SetAttribute(Attribute::Dim))?;
            }
            self.cur_bold = cell.bold;
            self.cur_dim = cell.dim;
        }
        if cell.strike != self.cur_strike {
            let attr = if cell.strike {
                Attribute::CrossedOut
            } else {
                Attribute::NotCrossedOut
            };
            queue!(self.out, SetAttribute(attr))?;
            self.cur_strike = cell.strike;
        }
        Ok(())
    }

    fn same_style(a: &Cell, b: &Cell) -> bool {
        a.fg == b.fg && a.bg == b.bg && a.bold == b.bold && a.dim == b.dim && a.strike == b.strike
    }

    fn draw_full(&mut self, frame: &Frame) -> io::Result<u64> {
        self.reset_style()?;
        let mut run = std::mem::take(&mut self.run_buf);
        let mut written = 0u64;
        let width = self.width as usize;
        for y in 0..self.height {
            queue!(self.out, MoveTo(0, y))?;
            run.clear();
            let row = y as usize * width;
            let mut style: Option<Cell> = None;
            for x in 0..width {
                let cell = frame.cell_at_index(row + x);
                let same = style.as_ref().is_some_and(|s| Self::same_style(s, &cell));
                if !same {
                    if !run.is_empty() {
                        queue!(self.out, Print(&run))?;
                        run.clear();
                    }
                    self.sync_style(&cell)?;
                    style = Some(cell);
                }
                run.push(cell.ch);
                self.last[row + x] = cell;
                written += 1;
            }
            if !run.is_empty() {
                queue!(self.out, Print(&run))?;
            }
        }
        run.clear();
        self.run_buf = run;
        Ok(written)
    }

    fn draw_dirty(&mut self, frame: &Frame) -> io::Result<u64> {
        let mut idxs = std::mem::take(&mut self.scratch);
        idxs.clear();
        idxs.extend_from_slice(frame.dirty_indices());
        idxs.sort_unstable();

        let mut run = std::mem::take(&mut self.run_buf);
        run.clear();
        let mut written = 0u64;
        let width = self.width as usize;
        let mut style: Option<Cell> = None;
        let mut next: Option<usize> = None;
        for &i in &idxs {
            if i >= self.last.len() {
                continue;
            }
            let cell = frame.cell_at_index(i);
            if cell == self.last[i] {
                continue;
            }
            // Runs never wrap a row edge; autowrap is not reliable enough.
            let contiguous = next == Some(i) && i % width != 0;
            let same = contiguous && style.as_ref().is_some_and(|s| Self::same_style(s, &cell));
            if !same {
                if !run.is_empty() {
                    queue!(self.out, Print(&run))?;
                    run.clear();
                }
                if !contiguous {
                    let x = (i % width) as u16;
                    let y = (i / width) as u16;
                    queue!(self.out, MoveTo(x, y))?;
                }
                self.sync_style(&cell)?;
                style = Some(cell);
            }
            run.push(cell.ch);
            self.last[i] = cell;
            next = Some(i + 1);
            written += 1;
        }
        if !run.is_empty() {
            queue!(self.out, Print(&run))?;
        }
        run.clear();
        self.run_buf = run;
        self.scratch = idxs;
        Ok(written)
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        restore_terminal_best_effort();
    }
}

/// Undo every terminal mode we might have touched. Safe to call from panic
/// hooks and signal handlers even if setup never finished.
pub fn restore_terminal_best_effort() {
    let _ = disable_raw_mode();
    let _ = execute!(
        stdout(),
        SetAttribute(Attribute::Reset),
        ResetColor,
        DisableMouseCapture,
        DisableFocusChange,
        EnableLineWrap,
        LeaveAlternateScreen,
        Show
    );
}
