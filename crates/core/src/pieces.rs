//! Pieces module - tetromino catalog, shape matrices and rotation
//!
//! Every piece kind has a square base shape (2x2, 3x3 or 4x4) and a display color.
//! Rotation is a plain 90° clockwise matrix transform; wall kicks are the engine's job.

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use crate::board::Board;
use crate::error::PieceError;
use crate::types::{Cell, PieceKind, BOARD_WIDTH, PENALTY_COLOR};

/// Largest shape side length in the catalog (the I piece)
pub const MAX_SHAPE_SIZE: usize = 4;

/// Square occupancy matrix of a piece, `size` x `size`, stored in a fixed 4x4 grid.
///
/// Indexed as `cells[y][x]`; cells outside `size` are always empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    size: u8,
    cells: [[u8; MAX_SHAPE_SIZE]; MAX_SHAPE_SIZE],
}

impl Shape {
    const fn new(size: u8, cells: [[u8; MAX_SHAPE_SIZE]; MAX_SHAPE_SIZE]) -> Self {
        Self { size, cells }
    }

    /// Build a shape from square rows (nonzero = occupied).
    ///
    /// # Panics
    ///
    /// Panics if the rows are not square or larger than [`MAX_SHAPE_SIZE`].
    pub fn from_rows(rows: &[&[u8]]) -> Self {
        let size = rows.len();
        assert!(
            (1..=MAX_SHAPE_SIZE).contains(&size),
            "shape size {size} out of range"
        );
        let mut cells = [[0u8; MAX_SHAPE_SIZE]; MAX_SHAPE_SIZE];
        for (y, row) in rows.iter().enumerate() {
            assert_eq!(row.len(), size, "shape rows must be square");
            for (x, &v) in row.iter().enumerate() {
                cells[y][x] = u8::from(v != 0);
            }
        }
        Self {
            size: size as u8,
            cells,
        }
    }

    /// Side length N of the N x N matrix
    pub fn size(&self) -> usize {
        self.size as usize
    }

    pub fn is_filled(&self, x: usize, y: usize) -> bool {
        x < self.size() && y < self.size() && self.cells[y][x] != 0
    }

    /// Rotate 90° clockwise: `new[x][N-1-y] = old[y][x]`
    pub fn rotated_cw(&self) -> Self {
        let n = self.size();
        let mut cells = [[0u8; MAX_SHAPE_SIZE]; MAX_SHAPE_SIZE];
        for y in 0..n {
            for x in 0..n {
                cells[x][n - 1 - y] = self.cells[y][x];
            }
        }
        Self {
            size: self.size,
            cells,
        }
    }

    /// Offsets `(dx, dy)` of every occupied cell, row by row
    pub fn filled_offsets(&self) -> impl Iterator<Item = (i8, i8)> + '_ {
        let n = self.size();
        (0..n).flat_map(move |y| {
            (0..n)
                .filter(move |&x| self.cells[y][x] != 0)
                .map(move |x| (x as i8, y as i8))
        })
    }

    /// Rows of the matrix as owned vectors (for display and tests)
    pub fn rows(&self) -> Vec<Vec<u8>> {
        let n = self.size();
        self.cells[..n].iter().map(|row| row[..n].to_vec()).collect()
    }
}

impl Serialize for Shape {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let n = self.size();
        let mut seq = serializer.serialize_seq(Some(n))?;
        for row in &self.cells[..n] {
            seq.serialize_element(&row[..n])?;
        }
        seq.end()
    }
}

/// Static catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceDef {
    pub kind: PieceKind,
    pub shape: Shape,
    pub color: &'static str,
}

static CATALOG: [PieceDef; 7] = [
    PieceDef {
        kind: PieceKind::I,
        shape: Shape::new(4, [[0, 0, 0, 0], [1, 1, 1, 1], [0, 0, 0, 0], [0, 0, 0, 0]]),
        color: "rgb(0, 255, 255)",
    },
    PieceDef {
        kind: PieceKind::O,
        shape: Shape::new(2, [[1, 1, 0, 0], [1, 1, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]),
        color: "rgb(255, 255, 0)",
    },
    PieceDef {
        kind: PieceKind::T,
        shape: Shape::new(3, [[0, 1, 0, 0], [1, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]]),
        color: "rgb(128, 0, 128)",
    },
    PieceDef {
        kind: PieceKind::S,
        shape: Shape::new(3, [[0, 1, 1, 0], [1, 1, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]),
        color: "rgb(0, 255, 0)",
    },
    PieceDef {
        kind: PieceKind::Z,
        shape: Shape::new(3, [[1, 1, 0, 0], [0, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]]),
        color: "rgb(255, 0, 0)",
    },
    PieceDef {
        kind: PieceKind::J,
        shape: Shape::new(3, [[1, 0, 0, 0], [1, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]]),
        color: "rgb(0, 0, 255)",
    },
    PieceDef {
        kind: PieceKind::L,
        shape: Shape::new(3, [[0, 0, 1, 0], [1, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]]),
        color: "rgb(255, 165, 0)",
    },
];

/// Look up the catalog entry for a piece kind
pub fn piece_def(kind: PieceKind) -> &'static PieceDef {
    match kind {
        PieceKind::I => &CATALOG[0],
        PieceKind::O => &CATALOG[1],
        PieceKind::T => &CATALOG[2],
        PieceKind::S => &CATALOG[3],
        PieceKind::Z => &CATALOG[4],
        PieceKind::J => &CATALOG[5],
        PieceKind::L => &CATALOG[6],
    }
}

/// Display color of a board cell; empty cells have none
pub fn cell_color(cell: Cell) -> Option<&'static str> {
    match cell {
        Cell::Empty => None,
        Cell::Block(kind) => Some(piece_def(kind).color),
        Cell::Penalty => Some(PENALTY_COLOR),
    }
}

/// Horizontal offsets tried after a rotation, in order
pub const WALL_KICKS: [(i8, i8); 5] = [(0, 0), (-1, 0), (1, 0), (-2, 0), (2, 0)];

/// Column where a shape of the given width spawns (centered)
pub fn spawn_x(shape_size: usize) -> i8 {
    (BOARD_WIDTH as i8) / 2 - (shape_size as i8) / 2
}

/// A falling piece: kind, current rotation matrix and anchor (top-left of the matrix)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub shape: Shape,
    pub x: i8,
    pub y: i8,
}

impl Piece {
    /// New piece with the catalog shape, anchored at (0, 0)
    pub fn new(kind: PieceKind) -> Self {
        Self {
            kind,
            shape: piece_def(kind).shape,
            x: 0,
            y: 0,
        }
    }

    /// New piece from a wire symbol such as `"T"`
    pub fn from_symbol(symbol: &str) -> Result<Self, PieceError> {
        PieceKind::from_str(symbol)
            .map(Self::new)
            .ok_or_else(|| PieceError::UnknownKind(symbol.to_string()))
    }

    /// Catalog piece centered horizontally on the top row
    pub fn spawned(kind: PieceKind) -> Self {
        let mut piece = Self::new(kind);
        piece.x = spawn_x(piece.shape.size());
        piece
    }

    pub fn color(&self) -> &'static str {
        piece_def(self.kind).color
    }

    /// Same piece moved by `(dx, dy)`
    pub fn shifted(&self, dx: i8, dy: i8) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Board coordinates of every occupied cell
    pub fn cells(&self) -> impl Iterator<Item = (i8, i8)> + '_ {
        self.shape
            .filled_offsets()
            .map(move |(dx, dy)| (self.x + dx, self.y + dy))
    }

    /// Whether this placement is legal on `board`.
    ///
    /// Cells above the board (negative row) are allowed and not checked against contents.
    pub fn is_valid(&self, board: &Board) -> bool {
        self.cells().all(|(x, y)| board.accepts(x, y))
    }
}
