use tracing::debug;

use crate::{engines::Engine, worker, worker::RoundConfig, Error, WorkerResult};

/// Every worker runs as a `spawn_blocking` task on a tokio runtime whose
/// blocking pool is sized to the worker count, so all of them run at once.
pub struct EngineTokioSpawnBlocking {
    rt: tokio::runtime::Runtime,
}

impl EngineTokioSpawnBlocking {
    pub fn new(max_blocking_threads: usize) -> Result<Self, Error> {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .max_blocking_threads(max_blocking_threads.max(1))
            .build()
            .map_err(Error::Runtime)?;
        Ok(Self { rt })
    }
}

impl Engine for EngineTokioSpawnBlocking {
    fn run_round(&self, config: &RoundConfig) -> Result<Vec<WorkerResult>, Error> {
        self.rt.block_on(async {
            let mut handles = Vec::with_capacity(config.worker_count);
            for i in 0..config.worker_count {
                let config = config.clone();
                handles.push(tokio::task::spawn_blocking(move || worker::run(&config, i)));
            }
            debug!(workers = handles.len(), "waiting for workers");
            let mut results = Vec::with_capacity(handles.len());
            for (i, handle) in handles.into_iter().enumerate() {
                match handle.await {
                    Ok(res) => results.push(res),
                    Err(e) if e.is_panic() => {
                        return Err(super::join_error(i, e.into_panic().as_ref()));
                    }
                    Err(e) => return Err(Error::WorkerJoin(format!("worker {i}: {e}"))),
                }
            }
            Ok(results)
        })
    }
}
