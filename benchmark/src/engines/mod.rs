//! Strategies for spawning and joining the workers of one round.

use crate::{worker::RoundConfig, Error, WorkerResult};

pub mod std_thread;
pub mod tokio_spawn_blocking;

pub use std_thread::EngineStd;
pub use tokio_spawn_blocking::EngineTokioSpawnBlocking;

/// Runs `config.worker_count` workers and waits for all of them.
///
/// Implementations must not return before every worker has finished, and
/// must return exactly one result per worker.
pub trait Engine {
    fn run_round(&self, config: &RoundConfig) -> Result<Vec<WorkerResult>, Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EngineKind {
    Std,
    TokioSpawnBlocking,
}

pub fn setup_engine(kind: EngineKind, worker_count: usize) -> Result<Box<dyn Engine>, Error> {
    Ok(match kind {
        EngineKind::Std => Box::new(EngineStd {}),
        EngineKind::TokioSpawnBlocking => Box::new(EngineTokioSpawnBlocking::new(worker_count)?),
    })
}

fn join_error(worker_index: usize, panic: &(dyn std::any::Any + Send)) -> Error {
    let msg = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_owned());
    Error::WorkerJoin(format!("worker {worker_index} panicked: {msg}"))
}

#[cfg(test)]
mod tests {
    use std::{io::Write, sync::Arc, time::Duration};

    use super::*;
    use crate::{Device, StopReason};

    fn round(worker_count: usize) -> (tempfile::NamedTempFile, RoundConfig) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![1u8; 256 * 1024]).unwrap();
        file.flush().unwrap();
        let device = Device::open(file.path()).unwrap();
        let config = RoundConfig {
            device: Arc::new(device),
            block_size: 4096,
            target_duration: Duration::from_millis(30),
            worker_count,
            direct_io: false,
            seed: None,
        };
        (file, config)
    }

    fn check_engine(kind: EngineKind) {
        let (_file, config) = round(3);
        let engine = setup_engine(kind, config.worker_count).unwrap();
        let results = engine.run_round(&config).unwrap();
        assert_eq!(results.len(), 3);
        for res in results {
            assert_eq!(res.stop_reason, StopReason::Deadline);
            assert!(res.count > 0);
            assert!(res.elapsed >= config.target_duration);
        }
    }

    #[test]
    fn std_engine_runs_all_workers() {
        check_engine(EngineKind::Std);
    }

    #[test]
    fn tokio_spawn_blocking_engine_runs_all_workers() {
        check_engine(EngineKind::TokioSpawnBlocking);
    }

    #[test]
    fn join_error_keeps_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        let err = join_error(2, payload.as_ref());
        assert_eq!(err.to_string(), "waiting for worker: worker 2 panicked: boom");
    }
}
