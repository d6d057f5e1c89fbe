use crate::geom::{Aabb, Vec2};
use ahash::AHashSet;
use rand::Rng;
use std::collections::VecDeque;

/// Movement direction, doubling as the Q-table's action key.
/// `ALL` is the canonical order; ties in action selection resolve to the
/// first entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    pub const ALL: [Dir; 4] = [Dir::Up, Dir::Down, Dir::Left, Dir::Right];

    /// Unit step for this direction; y grows downward.
    pub fn offset(self) -> Vec2 {
        match self {
            Dir::Up => Vec2::new(0, -1),
            Dir::Down => Vec2::new(0, 1),
            Dir::Left => Vec2::new(-1, 0),
            Dir::Right => Vec2::new(1, 0),
        }
    }

    pub fn index(self) -> usize {
        match self {
            Dir::Up => 0,
            Dir::Down => 1,
            Dir::Left => 2,
            Dir::Right => 3,
        }
    }
}

/// Snake body as an ordered position queue, head at the front.
#[derive(Clone, Debug)]
pub struct Snake {
    pub dir: Dir,
    pub body: VecDeque<Vec2>,
}

impl Snake {
    pub fn new(position: Vec2, dir: Dir) -> Self {
        let mut body = VecDeque::new();
        body.push_front(position);
        Self { dir, body }
    }

    pub fn head(&self) -> Vec2 {
        *self.body.front().unwrap()
    }

    /// Cell the head will occupy after the next tick.
    pub fn next_head(&self) -> Vec2 {
        self.head() + self.dir.offset()
    }

    pub fn contains(&self, v: Vec2) -> bool {
        self.body.iter().any(|&s| s == v)
    }

    /// Moves one step in the current direction; keeps the tail when growing.
    pub fn advance(&mut self, grow: bool) {
        let next = self.next_head();
        self.body.push_front(next);
        if !grow {
            self.body.pop_back();
        }
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.body.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }
}

/// Playable area plus everything occupying it. Fruit and wall sets never
/// overlap the snake; placement retries until a free cell is found.
#[derive(Clone, Debug)]
pub struct Board {
    pub range: Aabb,
    pub snake: Snake,
    pub fruits: AHashSet<Vec2>,
    pub walls: AHashSet<Vec2>,
}

impl Board {
    pub fn new(range: Aabb, rng: &mut impl Rng) -> Self {
        Self {
            range,
            snake: Snake::new(range.random_point(rng), Dir::Up),
            fruits: AHashSet::new(),
            walls: AHashSet::new(),
        }
    }

    pub fn random_free_position(&self, rng: &mut impl Rng) -> Vec2 {
        loop {
            let pos = self.range.random_point(rng);
            if !self.snake.contains(pos) && !self.fruits.contains(&pos) && !self.walls.contains(&pos)
            {
                return pos;
            }
        }
    }

    pub fn add_fruit(&mut self, rng: &mut impl Rng) {
        let pos = self.random_free_position(rng);
        self.fruits.insert(pos);
    }

    pub fn add_wall(&mut self, rng: &mut impl Rng) {
        let pos = self.random_free_position(rng);
        self.walls.insert(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn canonical_action_order() {
        assert_eq!(Dir::ALL, [Dir::Up, Dir::Down, Dir::Left, Dir::Right]);
        for (i, dir) in Dir::ALL.into_iter().enumerate() {
            assert_eq!(dir.index(), i);
        }
    }

    #[test]
    fn offsets_are_unit_steps() {
        for dir in Dir::ALL {
            let o = dir.offset();
            assert_eq!(o.x.abs() + o.y.abs(), 1);
        }
        assert_eq!(Dir::Up.offset(), Vec2::new(0, -1));
        assert_eq!(Dir::Down.offset(), Vec2::new(0, 1));
    }

    #[test]
    fn snake_advances_and_grows() {
        let mut snake = Snake::new(Vec2::new(5, 5), Dir::Right);
        snake.advance(false);
        assert_eq!(snake.head(), Vec2::new(6, 5));
        assert_eq!(snake.len(), 1);

        snake.advance(true);
        assert_eq!(snake.head(), Vec2::new(7, 5));
        assert_eq!(snake.len(), 2);
        assert!(snake.contains(Vec2::new(6, 5)));
        assert!(!snake.contains(Vec2::new(5, 5)));
    }

    #[test]
    fn placement_avoids_occupied_cells() {
        let range = Aabb::new(Vec2::new(0, 0), Vec2::new(1, 1));
        let mut rng = SmallRng::seed_from_u64(3);
        let mut board = Board::new(range, &mut rng);
        board.add_fruit(&mut rng);
        board.add_wall(&mut rng);

        // 4 cells: snake + fruit + wall leaves exactly one free.
        let free = board.random_free_position(&mut rng);
        assert!(!board.snake.contains(free));
        assert!(!board.fruits.contains(&free));
        assert!(!board.walls.contains(&free));

        let fruit = *board.fruits.iter().next().unwrap();
        let wall = *board.walls.iter().next().unwrap();
        assert!(!board.snake.contains(fruit));
        assert_ne!(fruit, wall);
    }
}
