use bandit_sim::config::{AppConfig, ExperimentConfig};
use bandit_sim::errors::SimulationError;
use bandit_sim::protocols::{
    play, CancellationToken, CollaborativeProtocol, PlayOptions, Protocol,
    SinglePlayerProtocol,
};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[actix::main]
async fn main() -> Result<(), SimulationError> {
    let config = AppConfig::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
        )
        .init();

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        actix::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling running trials");
                cancel.cancel();
            }
        });
    }

    run(config.experiment, cancel).await
}

async fn run(experiment: ExperimentConfig, cancel: CancellationToken) -> Result<(), SimulationError> {
    let running = experiment.running;
    let checkpoints = running.checkpoints();
    let options = PlayOptions {
        trials: running.trials,
        max_parallelism: running.max_parallelism,
        debug: running.debug,
        seed: running.seed,
    };
    let bandit = experiment.bandit.into_inner()?;
    let sink = BufWriter::new(File::create(&running.output)?);
    info!(bandit = bandit.name(), output = %running.output.display(), "Loaded experiment");

    let mut writer = match (
        experiment.learners.is_empty(),
        experiment.collaborative_learners.is_empty(),
    ) {
        (false, true) => {
            let learners = experiment
                .learners
                .into_iter()
                .map(|learner| learner.into_inner())
                .collect::<Result<Vec<_>, _>>()?;
            let protocol = SinglePlayerProtocol::new(bandit, learners, running.horizon, checkpoints)?;
            execute(protocol, sink, options, cancel).await?
        }
        (true, false) => {
            let learners = experiment
                .collaborative_learners
                .into_iter()
                .map(|learner| learner.into_inner())
                .collect::<Result<Vec<_>, _>>()?;
            let protocol = CollaborativeProtocol::new(bandit, learners, checkpoints)?;
            execute(protocol, sink, options, cancel).await?
        }
        _ => {
            return Err(SimulationError::InvalidExperiment(
                "configure either learners or collaborative_learners".to_string(),
            ))
        }
    };

    writer.flush()?;
    Ok(())
}

async fn execute<P: Protocol>(
    protocol: P,
    sink: BufWriter<File>,
    options: PlayOptions,
    cancel: CancellationToken,
) -> Result<BufWriter<File>, SimulationError> {
    Ok(play(Arc::new(protocol), sink, options, cancel).await?)
}
