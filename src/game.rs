use crate::board::{Board, Dir};
use crate::geom::{Aabb, Vec2};
use crate::qlearn::QError;
use rand::SeedableRng;
use rand::rngs::SmallRng;

/// Board size and initial occupancy for each fresh episode.
#[derive(Clone, Copy, Debug)]
pub struct GameConfig {
    pub range: Aabb,
    pub fruits: usize,
    pub walls: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            range: Aabb::new(Vec2::new(0, 0), Vec2::new(32, 32)),
            fruits: 1,
            walls: 0,
        }
    }
}

impl GameConfig {
    /// Cells in the playable area, bounds included.
    pub fn cell_count(&self) -> i64 {
        (self.range.width() as i64 + 1) * (self.range.height() as i64 + 1)
    }

    /// Rejects boards the simulation cannot spawn: inverted bounds make the
    /// range unsampleable, and more occupants than cells would make the
    /// retry-until-free placement loop spin forever.
    pub fn validate(&self) -> Result<(), QError> {
        if self.range.min.x > self.range.max.x || self.range.min.y > self.range.max.y {
            return Err(QError::Config(format!(
                "board range must satisfy min <= max, got {:?} to {:?}",
                self.range.min, self.range.max
            )));
        }
        let occupants = (self.fruits as i64)
            .saturating_add(self.walls as i64)
            .saturating_add(1);
        if occupants > self.cell_count() {
            return Err(QError::Config(format!(
                "board has {} cells but needs {} for the snake, {} fruits and {} walls",
                self.cell_count(),
                occupants,
                self.fruits,
                self.walls
            )));
        }
        Ok(())
    }
}

/// Deterministic per-tick snake simulation. Owns its RNG so a seeded run
/// replays exactly.
pub struct Game {
    pub config: GameConfig,
    pub board: Board,
    pub alive: bool,
    pub score: usize,
    rng: SmallRng,
}

impl Game {
    pub fn new(config: GameConfig, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let board = Self::fresh_board(config, &mut rng);
        Self {
            config,
            board,
            alive: true,
            score: 0,
            rng,
        }
    }

    fn fresh_board(config: GameConfig, rng: &mut SmallRng) -> Board {
        let mut board = Board::new(config.range, rng);
        for _ in 0..config.fruits {
            board.add_fruit(rng);
        }
        for _ in 0..config.walls {
            board.add_wall(rng);
        }
        board
    }

    /// New random snake position, direction up, fresh fruit/wall placement.
    pub fn reset(&mut self) {
        self.board = Self::fresh_board(self.config, &mut self.rng);
        self.alive = true;
        self.score = 0;
    }

    /// Sets the pending movement direction verbatim. Reversing into the body
    /// is a legal move that the next tick punishes with death.
    pub fn apply_direction(&mut self, dir: Dir) {
        self.board.snake.dir = dir;
    }

    /// Advances the simulation by one step. Returns true if the snake died
    /// on this tick.
    pub fn tick(&mut self) -> bool {
        if !self.alive {
            return true;
        }

        let next = self.board.snake.next_head();
        if self.board.snake.contains(next)
            || self.board.walls.contains(&next)
            || !self.board.range.contains(next)
        {
            self.alive = false;
            return true;
        }

        let ate = self.board.fruits.remove(&next);
        self.board.snake.advance(ate);
        if ate {
            self.score += 1;
            self.board.add_fruit(&mut self.rng);
        }
        false
    }
}
