//! The block-size sweep: run a round, aggregate it, double the block size,
//! until the block size reaches the device size or the device stops
//! delivering.

use std::{num::NonZeroUsize, sync::Arc, time::Duration};

use tracing::{info, warn};

use crate::{
    engines::Engine,
    worker::{latency_histogram, RoundConfig},
    Device, Error, WorkerResult,
};

/// Smallest block size a sweep may start at.
pub const MIN_BLOCK_SIZE: u64 = 512;

/// Percentiles reported for per-read latency.
pub const LATENCY_PERCENTILES: [f64; 4] = [50.0, 90.0, 99.0, 99.9];

#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub threads: NonZeroUsize,
    pub target_duration: Duration,
    pub start_block_size: u64,
    pub direct_io: bool,
    pub seed: Option<u64>,
}

/// Aggregate of one round.
#[derive(Debug, Clone)]
pub struct RoundStats {
    pub block_size: u64,
    pub total_reads: u64,
    pub mean_elapsed: Duration,
    pub iops: f64,
    pub per_worker_reads: Vec<u64>,
    /// Workers that stopped before the deadline: open, allocation or read failure.
    pub failed_workers: usize,
    pub latencies: hdrhistogram::Histogram<u64>,
}

impl RoundStats {
    pub fn bandwidth_bytes_per_sec(&self) -> f64 {
        self.block_size as f64 * self.iops
    }
}

/// Sums the reads of all workers and divides by their mean elapsed time.
///
/// A round in which no worker ran at all has zero IOPS.
pub fn aggregate(block_size: u64, results: &[WorkerResult]) -> RoundStats {
    let total_reads: u64 = results.iter().map(|r| r.count).sum();
    let elapsed_secs: f64 = results.iter().map(|r| r.elapsed.as_secs_f64()).sum();
    let mean_elapsed_secs = if results.is_empty() {
        0.0
    } else {
        elapsed_secs / results.len() as f64
    };
    let iops = if mean_elapsed_secs > 0.0 {
        total_reads as f64 / mean_elapsed_secs
    } else {
        0.0
    };
    let mut latencies = latency_histogram();
    for r in results {
        latencies += &r.latencies;
    }
    RoundStats {
        block_size,
        total_reads,
        mean_elapsed: Duration::from_secs_f64(mean_elapsed_secs),
        iops,
        per_worker_reads: results.iter().map(|r| r.count).collect(),
        failed_workers: results.iter().filter(|r| r.stop_reason.is_failure()).count(),
        latencies,
    }
}

/// IOPS at or below which the sweep gives up on larger blocks.
pub fn low_activity_threshold(threads: NonZeroUsize) -> f64 {
    (threads.get() / 4).max(1) as f64
}

/// Iterator over the rounds of one sweep.
///
/// Each call to `next` runs a whole round and blocks until its workers are
/// done. After the last round, or after an error, the sweep yields `None`.
pub struct Sweep<'e> {
    device: Arc<Device>,
    config: SweepConfig,
    engine: &'e dyn Engine,
    block_size: u64,
    last_iops: f64,
    done: bool,
}

impl<'e> Sweep<'e> {
    pub fn new(
        device: Arc<Device>,
        config: SweepConfig,
        engine: &'e dyn Engine,
    ) -> Result<Self, Error> {
        let start = config.start_block_size;
        if start < MIN_BLOCK_SIZE || !start.is_power_of_two() {
            return Err(Error::InvalidBlockSize(start));
        }
        let last_iops = (config.threads.get() + 1) as f64;
        Ok(Sweep {
            device,
            config,
            engine,
            block_size: start,
            last_iops,
            done: false,
        })
    }

    fn should_continue(&self) -> bool {
        self.block_size < self.device.size()
            && self.last_iops > low_activity_threshold(self.config.threads)
    }

    fn run_round(&mut self) -> Result<RoundStats, Error> {
        let round = RoundConfig {
            device: Arc::clone(&self.device),
            block_size: self.block_size,
            target_duration: self.config.target_duration,
            worker_count: self.config.threads.get(),
            direct_io: self.config.direct_io,
            seed: self.config.seed,
        };
        let results = self.engine.run_round(&round)?;
        if results.len() != round.worker_count {
            return Err(Error::WorkerJoin(format!(
                "expected {} worker results, got {}",
                round.worker_count,
                results.len()
            )));
        }
        let stats = aggregate(self.block_size, &results);
        if stats.failed_workers > 0 {
            warn!(
                block_size = stats.block_size,
                failed_workers = stats.failed_workers,
                "workers stopped early"
            );
        }
        info!(
            block_size = stats.block_size,
            total_reads = stats.total_reads,
            iops = stats.iops,
            mean_elapsed = ?stats.mean_elapsed,
            latency_p50_us = stats.latencies.value_at_percentile(50.0) as f64 / 1000.0,
            latency_p99_us = stats.latencies.value_at_percentile(99.0) as f64 / 1000.0,
            "round complete"
        );
        Ok(stats)
    }
}

impl Iterator for Sweep<'_> {
    type Item = Result<RoundStats, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || !self.should_continue() {
            self.done = true;
            return None;
        }
        match self.run_round() {
            Ok(stats) => {
                self.last_iops = stats.iops;
                self.block_size = self.block_size.saturating_mul(2);
                Some(Ok(stats))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Runs a full sweep with `engine`. See [`Sweep`].
pub fn run<'e>(
    device: Arc<Device>,
    config: SweepConfig,
    engine: &'e dyn Engine,
) -> Result<Sweep<'e>, Error> {
    Sweep::new(device, config, engine)
}
