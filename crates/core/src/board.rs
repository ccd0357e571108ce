//! Board module - one player's 10x20 playfield
//!
//! Flat row-major storage, row 0 at the top. Rows are shifted with `copy_within`
//! so line clears and penalty pushes never allocate.

use arrayvec::ArrayVec;

use crate::pieces::Piece;
use crate::types::{Cell, BOARD_HEIGHT, BOARD_WIDTH};

const WIDTH: usize = BOARD_WIDTH as usize;
const HEIGHT: usize = BOARD_HEIGHT as usize;
const BOARD_SIZE: usize = WIDTH * HEIGHT;

/// A row of cells as exposed in snapshots
pub type Row = [Cell; WIDTH];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    /// Row-major cells (`y * WIDTH + x`)
    cells: [Cell; BOARD_SIZE],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [Cell::Empty; BOARD_SIZE],
        }
    }

    #[inline(always)]
    fn index(x: i8, y: i8) -> Option<usize> {
        if x < 0 || x >= BOARD_WIDTH as i8 || y < 0 || y >= BOARD_HEIGHT as i8 {
            return None;
        }
        Some((y as usize) * WIDTH + (x as usize))
    }

    /// Cell at (x, y), `None` when out of bounds
    pub fn get(&self, x: i8, y: i8) -> Option<Cell> {
        Self::index(x, y).map(|idx| self.cells[idx])
    }

    /// Returns false if out of bounds
    pub fn set(&mut self, x: i8, y: i8, cell: Cell) -> bool {
        match Self::index(x, y) {
            Some(idx) => {
                self.cells[idx] = cell;
                true
            }
            None => false,
        }
    }

    /// Whether a piece cell may sit at (x, y).
    ///
    /// Columns must be on the board and rows above the floor. Rows above the top
    /// edge are always accepted.
    pub fn accepts(&self, x: i8, y: i8) -> bool {
        if x < 0 || x >= BOARD_WIDTH as i8 || y >= BOARD_HEIGHT as i8 {
            return false;
        }
        if y < 0 {
            return true;
        }
        matches!(self.get(x, y), Some(Cell::Empty))
    }

    fn row(&self, y: usize) -> &[Cell] {
        let start = y * WIDTH;
        &self.cells[start..start + WIDTH]
    }

    fn fill_row(&mut self, y: usize, cell: Cell) {
        let start = y * WIDTH;
        self.cells[start..start + WIDTH].fill(cell);
    }

    /// A row clears when it has no empty cell and no penalty cell
    pub fn is_row_clearable(&self, y: usize) -> bool {
        y < HEIGHT
            && self
                .row(y)
                .iter()
                .all(|cell| matches!(cell, Cell::Block(_)))
    }

    /// Stamp the piece's id into every occupied cell inside the board.
    ///
    /// Cells above the top edge are dropped silently.
    pub fn lock_piece(&mut self, piece: &Piece) {
        let cell = Cell::Block(piece.kind);
        for (x, y) in piece.cells() {
            self.set(x, y, cell);
        }
    }

    /// Remove every clearable row, compacting the rest toward the floor.
    ///
    /// Returns the original indices of the removed rows, bottom to top.
    pub fn clear_lines(&mut self) -> ArrayVec<usize, HEIGHT> {
        let mut cleared = ArrayVec::new();
        let mut write_y = HEIGHT;

        for read_y in (0..HEIGHT).rev() {
            if self.is_row_clearable(read_y) {
                cleared.push(read_y);
            } else {
                write_y -= 1;
                if write_y != read_y {
                    let src = read_y * WIDTH;
                    self.cells.copy_within(src..src + WIDTH, write_y * WIDTH);
                }
            }
        }

        for y in 0..write_y {
            self.fill_row(y, Cell::Empty);
        }

        cleared
    }

    /// Drop the top row, shift everything up by one and fill the bottom row with
    /// penalty cells.
    pub fn push_penalty_row(&mut self) {
        self.cells.copy_within(WIDTH..BOARD_SIZE, 0);
        self.fill_row(HEIGHT - 1, Cell::Penalty);
    }

    /// Height of each column: `HEIGHT - (top-most non-empty row)`, 0 for an empty column
    pub fn spectrum(&self) -> [u8; WIDTH] {
        let mut heights = [0u8; WIDTH];
        for (x, height) in heights.iter_mut().enumerate() {
            if let Some(top) = (0..HEIGHT).find(|&y| !self.cells[y * WIDTH + x].is_empty()) {
                *height = (HEIGHT - top) as u8;
            }
        }
        heights
    }

    /// Copy of the grid as rows, top to bottom
    pub fn rows(&self) -> [Row; HEIGHT] {
        let mut rows = [[Cell::Empty; WIDTH]; HEIGHT];
        for (y, row) in rows.iter_mut().enumerate() {
            row.copy_from_slice(self.row(y));
        }
        rows
    }

    /// Build a board from rows of wire ids (tests and fixtures).
    ///
    /// Missing rows are empty; rows are aligned to the bottom of the board.
    pub fn from_bottom_rows(rows: &[[i8; WIDTH]]) -> Self {
        let mut board = Self::new();
        let offset = HEIGHT.saturating_sub(rows.len());
        for (i, row) in rows.iter().take(HEIGHT).enumerate() {
            for (x, &id) in row.iter().enumerate() {
                let cell = Cell::from_id(id).unwrap_or(Cell::Empty);
                board.cells[(offset + i) * WIDTH + x] = cell;
            }
        }
        board
    }

    pub fn clear(&mut self) {
        self.cells.fill(Cell::Empty);
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Cell::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PieceKind;

    const FULL: [i8; WIDTH] = [1; WIDTH];
    const GAP: [i8; WIDTH] = [1, 1, 1, 1, 0, 1, 1, 1, 1, 1];
    const PENALTY: [i8; WIDTH] = [-1; WIDTH];

    #[test]
    fn new_board_is_empty() {
        let board = Board::new();
        assert!(board.is_empty());
        assert_eq!(board.spectrum(), [0; WIDTH]);
        assert_eq!(board.get(0, 0), Some(Cell::Empty));
        assert_eq!(board.get(10, 0), None);
        assert_eq!(board.get(0, 20), None);
    }

    #[test]
    fn accepts_above_top_but_not_below_floor() {
        let board = Board::new();
        assert!(board.accepts(0, -3));
        assert!(!board.accepts(-1, -3));
        assert!(!board.accepts(0, 20));
        assert!(!board.accepts(10, 5));
    }

    #[test]
    fn clear_removes_full_rows_and_compacts() {
        let mut board = Board::from_bottom_rows(&[GAP, FULL, GAP, FULL]);
        let cleared = board.clear_lines();
        assert_eq!(cleared.as_slice(), &[19, 17]);

        let rows = board.rows();
        assert!(rows[17].iter().all(Cell::is_empty));
        assert_eq!(rows[18][4], Cell::Empty);
        assert_eq!(rows[19][4], Cell::Empty);
        assert_eq!(rows[19][0], Cell::Block(PieceKind::I));
    }

    #[test]
    fn penalty_rows_never_clear() {
        let mut board = Board::from_bottom_rows(&[FULL, PENALTY]);
        let cleared = board.clear_lines();
        assert_eq!(cleared.as_slice(), &[18]);
        assert_eq!(board.rows()[19], [Cell::Penalty; WIDTH]);
    }

    #[test]
    fn penalty_push_shifts_up() {
        let mut board = Board::from_bottom_rows(&[GAP]);
        board.push_penalty_row();
        let rows = board.rows();
        assert_eq!(rows[19], [Cell::Penalty; WIDTH]);
        assert_eq!(rows[18][0], Cell::Block(PieceKind::I));
        assert_eq!(rows[18][4], Cell::Empty);
        assert_eq!(board.spectrum()[4], 1);
        assert_eq!(board.spectrum()[0], 2);
    }

    #[test]
    fn lock_skips_rows_above_top() {
        let mut board = Board::new();
        let mut piece = Piece::new(PieceKind::O);
        piece.y = -1;
        board.lock_piece(&piece);
        assert_eq!(board.get(0, 0), Some(Cell::Block(PieceKind::O)));
        assert_eq!(board.get(1, 0), Some(Cell::Block(PieceKind::O)));
        assert_eq!(board.cells.iter().filter(|c| !c.is_empty()).count(), 2);
    }

    #[test]
    fn spectrum_uses_topmost_cell() {
        let mut board = Board::new();
        board.set(2, 15, Cell::Block(PieceKind::T));
        board.set(2, 19, Cell::Block(PieceKind::T));
        assert_eq!(board.spectrum()[2], 5);
        assert_eq!(board.spectrum()[3], 0);
    }
}
