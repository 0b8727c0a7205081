use crate::bandits::BanditType;
use crate::collaborative::CollaborativeLearnerType;
use crate::learners::LearnerType;
use crate::protocols::Checkpoints;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Deserialize)]
pub struct RunningConfig {
    pub horizon: u64,
    /// Snapshot the regret every this many actions.
    pub checkpoint_every: Option<u64>,
    /// Snapshot the regret every this many rounds.
    pub checkpoint_every_rounds: Option<u64>,
    /// Extra rounds to snapshot.
    #[serde(default)]
    pub checkpoint_rounds: Vec<u64>,
    #[serde(default = "default_trials")]
    pub trials: usize,
    pub max_parallelism: Option<usize>,
    #[serde(default)]
    pub debug: bool,
    pub seed: Option<u64>,
    pub output: PathBuf,
}

impl RunningConfig {
    pub fn checkpoints(&self) -> Checkpoints {
        let mut checkpoints = Checkpoints::new(self.checkpoint_rounds.iter().copied(), []);
        if let Some(step) = self.checkpoint_every {
            checkpoints = checkpoints.with_action_step(step, self.horizon);
        }
        if let Some(step) = self.checkpoint_every_rounds {
            checkpoints = checkpoints.with_round_step(step);
        }
        checkpoints
    }
}

fn default_trials() -> usize {
    1
}

#[derive(Debug, Deserialize)]
pub struct ExperimentConfig {
    pub bandit: BanditType,
    #[serde(default)]
    pub learners: Vec<LearnerType>,
    #[serde(default)]
    pub collaborative_learners: Vec<CollaborativeLearnerType>,
    pub running: RunningConfig,
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub experiment: ExperimentConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// `log_level`, raised to debug for this crate in debug runs so the
    /// per-round events show up.
    pub fn log_filter(&self) -> String {
        if !self.experiment.running.debug {
            return self.log_level.clone();
        }
        match self.log_level.parse::<LevelFilter>() {
            Ok(level) if level == LevelFilter::DEBUG || level == LevelFilter::TRACE => {
                self.log_level.clone()
            }
            _ => format!("{},{}=debug", self.log_level, env!("CARGO_CRATE_NAME")),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_builder(Config::builder().add_source(File::with_name("config")))
    }

    /// Layers `APP_`-prefixed environment variables, e.g.
    /// `APP_EXPERIMENT__RUNNING__TRIALS`, on top of `builder`.
    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let builder = builder
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        builder.try_deserialize()
    }
}
