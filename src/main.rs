use anyhow::{Context, Result};
use clap::Parser;
use snake_qlearning::game::{Game, GameConfig};
use snake_qlearning::geom::{Aabb, Vec2};
use snake_qlearning::qlearn::QConfig;
use snake_qlearning::session::TrainingSession;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Headless trainer: runs tabular Q-learning against the snake simulation,
/// then plays greedy evaluation games with the learned table.
#[derive(Parser)]
#[command(name = "snake-qlearning", version)]
struct Cli {
    /// JSON file with the hyperparameter set; the flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Exploration probability, in [0, 1]
    #[arg(long)]
    epsilon: Option<f64>,

    /// TD update step size, in [0, 1]
    #[arg(long)]
    learning_rate: Option<f64>,

    /// Discount for future rewards, in [0, 1]
    #[arg(long)]
    discount_factor: Option<f64>,

    /// Number of training episodes
    #[arg(long)]
    max_iterations: Option<u64>,

    /// Playable area is (0,0) to (n,n), bounds included
    #[arg(long, default_value_t = 32)]
    board_size: i32,

    /// Fruits on the board at any time
    #[arg(long, default_value_t = 1)]
    fruits: usize,

    /// Random wall cells placed at each reset
    #[arg(long, default_value_t = 0)]
    walls: usize,

    /// Stop training after this many seconds instead of waiting for
    /// max-iterations (the in-flight episode still completes)
    #[arg(long)]
    train_seconds: Option<f64>,

    /// Greedy games to play after training
    #[arg(long, default_value_t = 10)]
    eval_episodes: u32,

    /// Step cap per greedy evaluation game
    #[arg(long, default_value_t = 5000)]
    step_cap: u64,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

impl Cli {
    fn q_config(&self) -> Result<QConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => QConfig::default(),
        };
        if let Some(epsilon) = self.epsilon {
            config.epsilon = epsilon;
        }
        if let Some(learning_rate) = self.learning_rate {
            config.learning_rate = learning_rate;
        }
        if let Some(discount_factor) = self.discount_factor {
            config.discount_factor = discount_factor;
        }
        if let Some(max_iterations) = self.max_iterations {
            config.max_iterations = max_iterations;
        }
        Ok(config)
    }

    fn game_config(&self) -> GameConfig {
        GameConfig {
            range: Aabb::new(Vec2::new(0, 0), Vec2::new(self.board_size, self.board_size)),
            fruits: self.fruits,
            walls: self.walls,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let cli = Cli::parse();

    let q_config = cli.q_config()?;
    let game_config = cli.game_config();

    info!(?q_config, "starting training");
    let session = TrainingSession::new(q_config, game_config, cli.seed)?;
    let handle = session.spawn();
    if let Some(seconds) = cli.train_seconds {
        std::thread::sleep(Duration::from_secs_f64(seconds));
        handle.stop();
    }
    let agent = handle.join()?;
    info!(
        episodes = agent.report.episodes,
        steps = agent.report.steps,
        best_score = agent.report.best_score,
        "training finished"
    );

    let mut game = Game::new(game_config, cli.seed.wrapping_add(0xfeed));
    for episode in 0..cli.eval_episodes {
        let score = agent.play_greedy(&mut game, cli.step_cap)?;
        info!(episode, score, "greedy evaluation");
    }

    Ok(())
}
