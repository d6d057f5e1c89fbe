use crate::board::Dir;
use crate::game::Game;
use crate::geom::Vec2;
use crate::state::{self, Cell, LocalState, STATE_COUNT};
use ahash::AHashMap;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Reward for stepping onto a fruit cell.
pub const FRUIT: f64 = 100.0;
/// Reward for surviving a step onto open space.
pub const ALIVE: f64 = 1.0;
/// Reward for stepping into an obstacle.
pub const DEAD: f64 = -100.0;

#[derive(Debug, Error)]
pub enum QError {
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The table is exhaustive after `init_table`, so a miss is a broken
    /// internal invariant, not a recoverable condition.
    #[error("q-table has no entry for state {state} / action {action:?}")]
    MissingState { state: usize, action: Dir },
}

/// Hyperparameters for one training run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QConfig {
    pub epsilon: f64,
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub max_iterations: u64,
}

impl Default for QConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.2,
            learning_rate: 0.5,
            discount_factor: 0.9,
            max_iterations: 10_000,
        }
    }
}

impl QConfig {
    /// Rejects bad hyperparameters up front instead of letting them surface
    /// mid-training.
    pub fn validate(&self) -> Result<(), QError> {
        for (name, value) in [
            ("epsilon", self.epsilon),
            ("learning_rate", self.learning_rate),
            ("discount_factor", self.discount_factor),
        ] {
            if !value.is_finite() {
                return Err(QError::Config(format!("{name} must be finite, got {value}")));
            }
            if !(0.0..=1.0).contains(&value) {
                return Err(QError::Config(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if self.max_iterations == 0 {
            return Err(QError::Config("max_iterations must be at least 1".into()));
        }
        Ok(())
    }
}

/// Summary of a finished (or cancelled) training run.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrainReport {
    pub episodes: u64,
    pub steps: u64,
    pub best_score: usize,
}

/// Cancellation token for a running `train`. Cleared once, checked at
/// episode boundaries; an in-flight episode always runs to its death.
#[derive(Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Reward for taking `action` out of `state`, judged entirely on the
/// pre-move view: the destination cell decides between fruit, death and
/// plain survival, and on open space every fruit-labeled cell around the
/// destination adds a quarter-fruit shaping bonus. Neighbors outside the
/// representable window contribute nothing.
pub fn step_reward(state: LocalState, action: Dir) -> f64 {
    let target = action.offset();
    match state.get(target) {
        Some(Cell::Obstacle) => DEAD,
        Some(Cell::Fruit) => FRUIT,
        _ => {
            let mut reward = ALIVE;
            for y in -1..=1 {
                for x in -1..=1 {
                    if state.get(target + Vec2::new(x, y)) == Some(Cell::Fruit) {
                        reward += FRUIT / 4.0;
                    }
                }
            }
            reward
        }
    }
}

/// Tabular Q-learning engine: owns the action-value table, the exploration
/// policy and the temporal-difference update. One instance per training run;
/// the table is never persisted.
pub struct QLearning {
    config: QConfig,
    table: AHashMap<LocalState, [f64; 4]>,
    training: Arc<AtomicBool>,
    rng: SmallRng,
}

impl QLearning {
    pub fn new(config: QConfig, seed: u64) -> Result<Self, QError> {
        config.validate()?;
        Ok(Self {
            config,
            table: AHashMap::with_capacity(STATE_COUNT),
            training: Arc::new(AtomicBool::new(true)),
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    pub fn config(&self) -> &QConfig {
        &self.config
    }

    /// Eagerly creates every one of the 19683 states with zeroed values for
    /// all four actions. Idempotent; calling it again resets learning.
    pub fn init_table(&mut self) {
        self.table.clear();
        for index in 0..STATE_COUNT {
            self.table.insert(LocalState::from_index(index), [0.0; 4]);
        }
    }

    pub fn value_of(&self, state: LocalState, action: Dir) -> Result<f64, QError> {
        self.table
            .get(&state)
            .map(|values| values[action.index()])
            .ok_or(QError::MissingState {
                state: state.to_index(),
                action,
            })
    }

    pub fn set_value(&mut self, state: LocalState, action: Dir, value: f64) -> Result<(), QError> {
        let values = self.table.get_mut(&state).ok_or(QError::MissingState {
            state: state.to_index(),
            action,
        })?;
        values[action.index()] = value;
        Ok(())
    }

    /// Best-known action for a state. Comparison is strict, so the first of
    /// {Up, Down, Left, Right} wins ties.
    pub fn best_action(&self, state: LocalState) -> Result<Dir, QError> {
        let mut best = Dir::Up;
        let mut max = f64::NEG_INFINITY;
        for action in Dir::ALL {
            let value = self.value_of(state, action)?;
            if max < value {
                max = value;
                best = action;
            }
        }
        Ok(best)
    }

    /// Epsilon-greedy: explore uniformly with probability epsilon, otherwise
    /// exploit the best-known action.
    pub fn choose_action(&mut self, state: LocalState) -> Result<Dir, QError> {
        if self.rng.r#gen::<f64>() < self.config.epsilon {
            Ok(Dir::ALL[self.rng.gen_range(0..Dir::ALL.len())])
        } else {
            self.best_action(state)
        }
    }

    fn updated_value(&self, q_sa: f64, reward: f64, q_next_best: f64) -> f64 {
        let alpha = self.config.learning_rate;
        let gamma = self.config.discount_factor;
        (1.0 - alpha) * q_sa + alpha * (reward + gamma * q_next_best)
    }

    /// Token for requesting cooperative cancellation from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.training))
    }

    /// Requests cancellation at the next episode boundary.
    pub fn stop(&self) {
        self.training.store(false, Ordering::SeqCst);
    }

    /// Runs up to `max_iterations` episodes against the simulation. Each
    /// episode starts from a fresh board and plays until death; the stop
    /// flag is polled only between episodes. Any table miss aborts the whole
    /// run.
    pub fn train(&mut self, game: &mut Game) -> Result<TrainReport, QError> {
        let mut report = TrainReport::default();

        for episode in 0..self.config.max_iterations {
            if !self.training.load(Ordering::SeqCst) {
                tracing::info!(episode, "training cancelled");
                break;
            }

            game.reset();
            loop {
                let state = state::encode(&game.board);
                let action = self.choose_action(state)?;
                game.apply_direction(action);
                let died = game.tick();
                let next_state = state::encode(&game.board);

                let reward = step_reward(state, action);
                let best_next = self.best_action(next_state)?;
                let value = self.updated_value(
                    self.value_of(state, action)?,
                    reward,
                    self.value_of(next_state, best_next)?,
                );
                self.set_value(state, action, value)?;

                report.steps += 1;
                if died {
                    break;
                }
            }

            report.episodes += 1;
            report.best_score = report.best_score.max(game.score);
            if report.episodes % 1000 == 0 {
                tracing::debug!(
                    episodes = report.episodes,
                    steps = report.steps,
                    best_score = report.best_score,
                    "training progress"
                );
            }
        }

        Ok(report)
    }
}
