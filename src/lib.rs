//! Snake with a tabular Q-learning agent.
//!
//! The game state is abstracted into a 3x3 local view around the snake head
//! (the `state` module), an exhaustive 19683-state action-value table is
//! trained with an epsilon-greedy temporal-difference loop (`qlearn`), and a
//! session layer runs training on a background thread with cooperative
//! cancellation (`session`).

pub mod board;
pub mod game;
pub mod geom;
pub mod qlearn;
pub mod session;
pub mod state;

pub use board::Dir;
pub use game::{Game, GameConfig};
pub use qlearn::{QConfig, QError, QLearning, TrainReport};
pub use session::{SessionHandle, TrainedAgent, TrainingSession};
pub use state::{Cell, LocalState};
