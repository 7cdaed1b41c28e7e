use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::pipeline::intake_sweep::IntakeSweep;
use crate::pipeline::source_pipeline::SourcePipeline;

/// Handles for the running pipeline threads. Dropping this without calling
/// [`Runner::join`] detaches the threads.
pub struct Runner {
    shutdown: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl Runner {
    /// Spawns one thread per source pipeline plus one for the intake sweep.
    ///
    /// All threads poll `shutdown` between units of work, so a stop request
    /// takes effect at the next tick boundary rather than mid-frame.
    pub fn spawn(
        pipelines: Vec<SourcePipeline>,
        sweep: IntakeSweep,
        sweep_interval: Duration,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let mut handles = Vec::with_capacity(pipelines.len() + 1);
        for pipeline in pipelines {
            handles.push(spawn_pipeline(pipeline, shutdown.clone()));
        }
        handles.push(spawn_sweep(sweep, sweep_interval, shutdown.clone()));
        Self { shutdown, handles }
    }

    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Signals shutdown and waits for every thread to finish its current
    /// unit of work and exit.
    pub fn join(self) {
        self.shutdown.store(true, Ordering::Relaxed);
        for handle in self.handles {
            if handle.join().is_err() {
                log::error!("pipeline thread panicked");
            }
        }
    }
}

fn spawn_pipeline(mut pipeline: SourcePipeline, shutdown: Arc<AtomicBool>) -> JoinHandle<()> {
    let source_id = pipeline.context().source_id.clone();
    std::thread::spawn(move || {
        log::info!("source {source_id}: pipeline started");
        while !shutdown.load(Ordering::Relaxed) {
            pipeline.tick();
        }
        log::info!("source {source_id}: pipeline stopped");
    })
}

fn spawn_sweep(
    sweep: IntakeSweep,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        log::info!("intake sweep started");
        let ticker = crossbeam_channel::tick(interval);
        while !shutdown.load(Ordering::Relaxed) {
            // Bounded recv so shutdown is noticed even with a long interval.
            match ticker.recv_timeout(Duration::from_millis(200)) {
                Ok(_) => sweep.sweep(),
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }
        log::info!("intake sweep stopped");
    })
}
