// Copyright (c) 2026 rezky_nightky

use crate::cell::Cell;

#[derive(Clone, Debug)]
pub struct Frame {
    pub width: u16,
    pub height: u16,
    pub cells: Vec<Cell>,
    gen: u32,
    cell_gen: Vec<u32>,
    blank: Cell,
    dirty_all: bool,
    dirty_map: Vec<bool>,
    dirty: Vec<usize>,
    lit: Vec<usize>,
    prev_lit: Vec<usize>,
}

impl Frame {
    pub fn new(width: u16, height: u16, bg: Option<crossterm::style::Color>) -> Self {
        let len = width as usize * height as usize;
        let blank = Cell::blank_with_bg(bg);
        let gen = 1u32;
        Self {
            width,
            height,
            cells: vec![blank; len],
            gen,
            cell_gen: vec![gen; len],
            blank,
            dirty_all: true,
            dirty_map: vec![false; len],
            dirty: Vec::new(),
            lit: Vec::new(),
            prev_lit: Vec::new(),
        }
    }

    pub fn clear_with_bg(&mut self, bg: Option<crossterm::style::Color>) {
        self.blank = Cell::blank_with_bg(bg);
        self.gen = self.gen.wrapping_add(1);
        if self.gen == 0 {
            self.cell_gen.fill(0);
            self.gen = 1;
        }
        self.dirty_all = true;
        self.dirty.clear();
        self.lit.clear();
        self.prev_lit.clear();
    }

    /// Start a scene pass: everything drawn last pass becomes stale and reads
    /// as blank until rewritten.
    pub fn begin_scene(&mut self) {
        std::mem::swap(&mut self.prev_lit, &mut self.lit);
        self.lit.clear();
        self.gen = self.gen.wrapping_add(1);
        if self.gen == 0 {
            self.cell_gen.fill(0);
            self.gen = 1;
        }
    }

    /// Finish a scene pass: cells lit last pass but not rewritten are marked
    /// dirty so the terminal diff erases them.
    pub fn end_scene(&mut self) {
        if self.dirty_all {
            return;
        }
        for k in 0..self.prev_lit.len() {
            let i = self.prev_lit[k];
            if self.cell_gen.get(i).copied() == Some(self.gen) {
                continue;
            }
            if self.dirty_map.get(i).copied() == Some(false) {
                self.dirty_map[i] = true;
                self.dirty.push(i);
            }
        }
    }

    pub fn is_dirty_all(&self) -> bool {
        self.dirty_all
    }

    pub fn dirty_indices(&self) -> &[usize] {
        &self.dirty
    }

    pub fn clear_dirty(&mut self) {
        if self.dirty_all {
            self.dirty_all = false;
            self.dirty_map.fill(false);
            self.dirty.clear();
            return;
        }

        for &i in &self.dirty {
            if let Some(v) = self.dirty_map.get_mut(i) {
                *v = false;
            }
        }
        self.dirty.clear();
    }

    pub fn index(&self, x: u16, y: u16) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    #[allow(dead_code)]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.index(x, y).map(|i| {
            if self.cell_gen.get(i).copied() == Some(self.gen) {
                &self.cells[i]
            } else {
                &self.blank
            }
        })
    }

    pub fn cell_at_index(&self, i: usize) -> Cell {
        if self.cell_gen.get(i).copied() == Some(self.gen) {
            self.cells[i]
        } else {
            self.blank
        }
    }

    /// `set` for entity draw code working in signed coordinates; anything
    /// off the grid is silently clipped.
    pub fn set_clipped(&mut self, x: i32, y: i32, cell: Cell) {
        if !(0..=u16::MAX as i32).contains(&x) || !(0..=u16::MAX as i32).contains(&y) {
            return;
        }
        self.set(x as u16, y as u16, cell);
    }

    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        if let Some(i) = self.index(x, y) {
            let fresh = self.cell_gen.get(i).copied() == Some(self.gen);
            let cur = if fresh { self.cells[i] } else { self.blank };
            if cur == cell {
                return;
            }

            self.cells[i] = cell;
            if !fresh {
                if let Some(v) = self.cell_gen.get_mut(i) {
                    *v = self.gen;
                }
                self.lit.push(i);
            }
            if !self.dirty_all && self.dirty_map.get(i).copied() == Some(false) {
                self.dirty_map[i] = true;
                self.dirty.push(i);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_with_bg_makes_cells_effectively_blank() {
        let mut f = Frame::new(2, 2, None);
        f.set(0, 0, Cell::glyph('x', None, None));
        assert_eq!(f.get(0, 0).unwrap().ch, 'x');
        f.clear_with_bg(None);
        assert_eq!(f.get(0, 0).unwrap().ch, ' ');
    }

    #[test]
    fn rewriting_identical_content_without_scene_change_is_a_noop() {
        let mut f = Frame::new(2, 1, None);
        f.clear_dirty();

        f.set(0, 0, Cell::glyph('a', None, None));
        f.clear_dirty();

        // Same glyph again, and a blank onto an already-blank cell.
        f.set(0, 0, Cell::glyph('a', None, None));
        f.set(1, 0, Cell::blank_with_bg(None));
        assert!(f.dirty_indices().is_empty());
        assert!(!f.is_dirty_all());
    }

    #[test]
    fn stale_cell_rejoins_scene_when_rewritten() {
        let mut f = Frame::new(2, 1, None);
        f.clear_dirty();

        f.begin_scene();
        f.set(0, 0, Cell::glyph('x', None, None));
        f.end_scene();
        assert_eq!(f.cell_at_index(0).ch, 'x');
        f.clear_dirty();

        f.begin_scene();
        assert_eq!(f.cell_at_index(0).ch, ' ');
        f.set(0, 0, Cell::glyph('x', None, None));
        assert_eq!(f.cell_at_index(0).ch, 'x');
        f.end_scene();
        // Flagged for the writer; the last-flush compare decides the bytes.
        assert!(f.dirty_indices().contains(&0));
    }

    #[test]
    fn scene_cycle_erases_cells_not_rewritten() {
        let mut f = Frame::new(4, 2, None);
        f.clear_dirty();

        f.begin_scene();
        f.set(1, 0, Cell::glyph('a', None, None));
        f.set(2, 0, Cell::glyph('b', None, None));
        f.end_scene();
        assert_eq!(f.get(1, 0).unwrap().ch, 'a');
        f.clear_dirty();

        f.begin_scene();
        f.set(2, 0, Cell::glyph('c', None, None));
        f.end_scene();

        // (1,0) went stale and must be flagged for the diff writer.
        assert_eq!(f.get(1, 0).unwrap().ch, ' ');
        assert_eq!(f.get(2, 0).unwrap().ch, 'c');
        let idx = f.index(1, 0).unwrap();
        assert!(f.dirty_indices().contains(&idx));
    }
}
