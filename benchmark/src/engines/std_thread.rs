use tracing::debug;

use crate::{engines::Engine, worker, worker::RoundConfig, Error, WorkerResult};

/// One scoped OS thread per worker, joined at the end of the round.
pub struct EngineStd {}

impl Engine for EngineStd {
    fn run_round(&self, config: &RoundConfig) -> Result<Vec<WorkerResult>, Error> {
        std::thread::scope(|scope| -> Result<Vec<WorkerResult>, Error> {
            let mut jhs = Vec::with_capacity(config.worker_count);
            for i in 0..config.worker_count {
                let jh = std::thread::Builder::new()
                    .name(format!("worker-{i}"))
                    .spawn_scoped(scope, move || worker::run(config, i))
                    .map_err(|e| Error::WorkerJoin(format!("spawning worker {i}: {e}")))?;
                jhs.push(jh);
            }
            debug!(workers = jhs.len(), "waiting for workers");
            // Join every handle before looking at the results, a panicked worker
            // left unjoined would make the scope itself panic.
            let joined: Vec<_> = jhs.into_iter().map(|jh| jh.join()).collect();
            joined
                .into_iter()
                .enumerate()
                .map(|(i, res)| res.map_err(|panic| super::join_error(i, panic.as_ref())))
                .collect()
        })
    }
}
