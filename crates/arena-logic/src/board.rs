//! 3x3 board and line detection
//!
//! Stateless rules over a plain grid. The state machine owns the board and
//! decides when a line or a full grid ends a round.

use serde::{Deserialize, Serialize};

use crate::error::ArenaError;

pub const BOARD_SIZE: usize = 3;
pub const CELL_COUNT: usize = BOARD_SIZE * BOARD_SIZE;

/// Content of a single cell
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mark {
    #[default]
    Empty,
    P1,
    P2,
}

impl Mark {
    /// Mark placed by the player in roster slot `seat`
    pub fn for_seat(seat: usize) -> Mark {
        if seat == 0 {
            Mark::P1
        } else {
            Mark::P2
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Mark::Empty => 0,
            Mark::P1 => 1,
            Mark::P2 => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Mark> {
        match value {
            0 => Some(Mark::Empty),
            1 => Some(Mark::P1),
            2 => Some(Mark::P2),
            _ => None,
        }
    }
}

/// The 8 winning lines as (x, y) coordinates: 3 rows, 3 columns, 2 diagonals
pub const LINES: [[(usize, usize); 3]; 8] = [
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub cells: [[Mark; BOARD_SIZE]; BOARD_SIZE],
    pub move_count: u8,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all cells and the move counter
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Mark> {
        self.cells.get(x).and_then(|row| row.get(y)).copied()
    }

    /// Write `mark` into an empty in-range cell
    pub fn place(&mut self, x: usize, y: usize, mark: Mark) -> Result<(), ArenaError> {
        match self.get(x, y) {
            None => Err(ArenaError::CellOutOfRange { x, y }),
            Some(Mark::Empty) => {
                self.cells[x][y] = mark;
                self.move_count += 1;
                Ok(())
            }
            Some(_) => Err(ArenaError::CellOccupied { x, y }),
        }
    }

    pub fn has_line(&self, mark: Mark) -> bool {
        has_line(self, mark)
    }

    pub fn is_full(&self) -> bool {
        self.move_count as usize >= CELL_COUNT
    }

    /// Row-major cell encoding used by the on-chain account
    pub fn to_bytes(&self) -> [u8; CELL_COUNT] {
        let mut out = [0u8; CELL_COUNT];
        for x in 0..BOARD_SIZE {
            for y in 0..BOARD_SIZE {
                out[x * BOARD_SIZE + y] = self.cells[x][y].to_u8();
            }
        }
        out
    }

    /// Rebuild from row-major bytes; `None` if any byte is not a mark
    /// or the move counter disagrees with the occupied cells.
    pub fn from_bytes(cells: &[u8; CELL_COUNT], move_count: u8) -> Option<Board> {
        let mut board = Board::new();
        let mut occupied = 0u8;
        for (i, byte) in cells.iter().enumerate() {
            let mark = Mark::from_u8(*byte)?;
            if mark != Mark::Empty {
                occupied += 1;
            }
            board.cells[i / BOARD_SIZE][i % BOARD_SIZE] = mark;
        }
        if occupied != move_count {
            return None;
        }
        board.move_count = move_count;
        Some(board)
    }
}

/// True when any row, column or diagonal holds three `mark`s.
/// `Mark::Empty` never forms a line.
pub fn has_line(board: &Board, mark: Mark) -> bool {
    if mark == Mark::Empty {
        return false;
    }
    LINES
        .iter()
        .any(|line| line.iter().all(|&(x, y)| board.cells[x][y] == mark))
}
