use crate::board::Board;
use crate::geom::{Aabb, Vec2};

/// Offsets around the snake head the encoder can represent.
pub const STATE_RANGE: Aabb = Aabb::new(Vec2::new(-1, -1), Vec2::new(1, 1));

/// Number of distinct local states: 3^9.
pub const STATE_COUNT: usize = 19683;

/// Label alphabet for one window cell.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum Cell {
    Empty = 0,
    Fruit = 1,
    Obstacle = 2,
}

impl Cell {
    fn from_digit(digit: usize) -> Cell {
        match digit {
            0 => Cell::Empty,
            1 => Cell::Fruit,
            _ => Cell::Obstacle,
        }
    }
}

/// The learned representation: a 3x3 view around the snake head, row-major
/// over window offsets, compared and hashed by content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct LocalState([Cell; 9]);

impl LocalState {
    pub fn empty() -> Self {
        Self([Cell::Empty; 9])
    }

    fn slot(offset: Vec2) -> usize {
        ((offset.y + 1) * 3 + (offset.x + 1)) as usize
    }

    /// Cell at a window offset, `None` outside the representable window.
    pub fn get(&self, offset: Vec2) -> Option<Cell> {
        STATE_RANGE.contains(offset).then(|| self.0[Self::slot(offset)])
    }

    /// Overwrites the cell at an in-window offset.
    pub fn set(&mut self, offset: Vec2, cell: Cell) {
        self.0[Self::slot(offset)] = cell;
    }

    /// Packs the nine ternary cells into a table index, slot 0 most
    /// significant.
    pub fn to_index(self) -> usize {
        self.0.iter().fold(0, |acc, &cell| acc * 3 + cell as usize)
    }

    /// Inverse of `to_index`; enumerating 0..STATE_COUNT visits every state
    /// once, most-significant slot varying slowest.
    pub fn from_index(mut index: usize) -> Self {
        let mut cells = [Cell::Empty; 9];
        for slot in (0..9).rev() {
            cells[slot] = Cell::from_digit(index % 3);
            index /= 3;
        }
        Self(cells)
    }
}

/// Encodes the board into the local view around the snake head. Pure.
///
/// Pass order matters and is load-bearing for what gets learned: fruit
/// first, then body, then edge/walls, with later passes overwriting earlier
/// ones. A fruit outside the window is projected onto the nearest boundary
/// cell by clamping each axis; when several fruits collide the
/// last-processed one wins (set iteration order).
pub fn encode(board: &Board) -> LocalState {
    let mut state = LocalState::empty();
    let head = board.snake.head();

    for &fruit in &board.fruits {
        let rel = fruit - head;
        if STATE_RANGE.contains(rel) {
            state.set(rel, Cell::Fruit);
        } else {
            state.set(rel.clamp(-1, 1), Cell::Fruit);
        }
    }

    for segment in board.snake.positions() {
        let rel = segment - head;
        if STATE_RANGE.contains(rel) {
            state.set(rel, Cell::Obstacle);
        }
    }

    for y in -1..=1 {
        for x in -1..=1 {
            let offset = Vec2::new(x, y);
            let cell = head + offset;
            if !board.range.contains(cell) || board.walls.contains(&cell) {
                state.set(offset, Cell::Obstacle);
            }
        }
    }

    state
}
