//! Runs every trial of a protocol on a pool of worker threads and streams the
//! records to a single writer as they complete.

use super::errors::ProtocolError;
use super::record::{write_record, TrialRecord};
use super::{CancellationToken, Protocol, TrialControl};

use crate::rng::SeedSource;

use actix::prelude::*;
use std::io::Write;
use std::marker::PhantomData;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread::available_parallelism;
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Clone, Debug, Default)]
pub struct PlayOptions {
    pub trials: usize,
    /// Worker threads, the available parallelism when unset.
    pub max_parallelism: Option<usize>,
    /// Forces a single trial and logs every round.
    pub debug: bool,
    pub seed: Option<u64>,
}

impl PlayOptions {
    fn parallelism(&self) -> usize {
        self.max_parallelism
            .unwrap_or_else(|| available_parallelism().map_or(1, NonZeroUsize::get))
            .max(1)
    }
}

struct TrialWorker<P: Protocol> {
    protocol: Arc<P>,
    control: TrialControl,
}

impl<P: Protocol> Actor for TrialWorker<P> {
    type Context = SyncContext<Self>;
}

#[derive(Message)]
#[rtype(result = "Result<TrialRecord, ProtocolError>")]
struct RunTrial {
    job: usize,
    seed: u64,
}

impl<P: Protocol> Handler<RunTrial> for TrialWorker<P> {
    type Result = Result<TrialRecord, ProtocolError>;

    fn handle(&mut self, msg: RunTrial, _: &mut Self::Context) -> Self::Result {
        self.protocol.one_trial(msg.job, msg.seed, &self.control)
    }
}

/// Sole owner of the output.
struct TrialSink<W: Write + Unpin + 'static> {
    writer: Option<W>,
    written: usize,
}

impl<W: Write + Unpin + 'static> TrialSink<W> {
    fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
            written: 0,
        }
    }
}

impl<W: Write + Unpin + 'static> Actor for TrialSink<W> {
    type Context = Context<Self>;
}

#[derive(Message)]
#[rtype(result = "Result<(), ProtocolError>")]
struct WriteRecord(TrialRecord);

/// Hands the writer back.
struct CloseSink<W>(PhantomData<W>);

impl<W: 'static> Message for CloseSink<W> {
    type Result = Option<W>;
}

impl<W: Write + Unpin + 'static> Handler<WriteRecord> for TrialSink<W> {
    type Result = Result<(), ProtocolError>;

    fn handle(&mut self, msg: WriteRecord, _: &mut Self::Context) -> Self::Result {
        let writer = self.writer.as_mut().ok_or(ProtocolError::SinkClosed)?;
        write_record(writer, &msg.0)?;
        self.written += 1;
        Ok(())
    }
}

impl<W: Write + Unpin + 'static> Handler<CloseSink<W>> for TrialSink<W> {
    type Result = MessageResult<CloseSink<W>>;

    fn handle(&mut self, _: CloseSink<W>, ctx: &mut Self::Context) -> Self::Result {
        info!(records = self.written, "Closing result sink");
        ctx.stop();
        MessageResult(self.writer.take())
    }
}

/// Plays `trials` trials of every job of `protocol`, each with a fresh seed.
/// Failed trials are not written; the first failure is returned once every
/// trial has finished. Returns the writer on success.
pub async fn play<P, W>(
    protocol: Arc<P>,
    sink: W,
    options: PlayOptions,
    cancel: CancellationToken,
) -> Result<W, ProtocolError>
where
    P: Protocol,
    W: Write + Unpin + Send + 'static,
{
    let trials = if options.debug { 1 } else { options.trials };
    let jobs = protocol.jobs();
    let workers_num = options.parallelism();
    info!(
        protocol = protocol.name(),
        trials,
        jobs,
        workers = workers_num,
        "Starting trials"
    );

    let control = TrialControl {
        cancel,
        debug: options.debug,
    };
    let workers = {
        let protocol = Arc::clone(&protocol);
        SyncArbiter::start(workers_num, move || TrialWorker {
            protocol: Arc::clone(&protocol),
            control: control.clone(),
        })
    };
    let sink = TrialSink::new(sink).start();

    let (results, mut completed) = mpsc::unbounded_channel();
    let mut seeds = SeedSource::new(options.seed);
    for job in (0..trials).flat_map(|_| 0..jobs) {
        let seed = seeds.next_seed();
        let request = workers.send(RunTrial { job, seed });
        let results = results.clone();
        actix::spawn(async move {
            // the receiver outlives every trial
            let _ = results.send((job, seed, request.await));
        });
    }
    drop(results);
    drop(workers);

    let mut first_error = None;
    let mut written = 0;
    while let Some((job, seed, result)) = completed.recv().await {
        let outcome = match result {
            Ok(Ok(record)) => match sink.send(WriteRecord(record)).await {
                Ok(outcome) => outcome,
                Err(err) => Err(err.into()),
            },
            Ok(Err(err)) => Err(err),
            Err(err) => Err(err.into()),
        };
        match outcome {
            Ok(()) => written += 1,
            Err(err) => {
                error!(job, seed, error = %err, "Trial failed");
                first_error.get_or_insert(err);
            }
        }
    }

    let writer = sink.send(CloseSink(PhantomData)).await?;
    info!(written, "Finished trials");
    match first_error {
        Some(err) => Err(err),
        None => writer.ok_or(ProtocolError::SinkClosed),
    }
}
