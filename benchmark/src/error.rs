use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot open {path:?}: {source}")]
    DeviceNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot determine size of {path:?}: {source}")]
    DeviceSize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("block size must be a power of two >= 512, got {0}")]
    InvalidBlockSize(u64),
    #[error("building the tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("waiting for worker: {0}")]
    WorkerJoin(String),
}
