//! Random-read IOPS sweep for block devices and files.
//!
//! A [`Sweep`] runs rounds of concurrent, fixed-duration random reads. Every
//! round uses twice the block size of the previous one, starting at 512 bytes,
//! until the block size reaches the size of the target or the target stops
//! delivering reads. Each round reports the aggregate IOPS of its workers.
//!
//! ```no_run
//! use std::{num::NonZeroUsize, sync::Arc, time::Duration};
//!
//! use randread_sweep::{engines::EngineStd, Device, SweepConfig};
//!
//! let device = Arc::new(Device::open("/dev/nvme0n1").unwrap());
//! let config = SweepConfig {
//!     threads: NonZeroUsize::new(16).unwrap(),
//!     target_duration: Duration::from_secs(2),
//!     start_block_size: 512,
//!     direct_io: true,
//!     seed: None,
//! };
//! for round in randread_sweep::run(device, config, &EngineStd {}).unwrap() {
//!     let round = round.unwrap();
//!     println!("{} {:.1}", round.block_size, round.iops);
//! }
//! ```

pub mod config;
mod device;
pub mod engines;
mod error;
pub mod offset;
pub mod report;
pub mod sweep;
pub mod units;
pub mod worker;

pub use device::Device;
pub use error::Error;
pub use sweep::{run, RoundStats, Sweep, SweepConfig};
pub use worker::{RoundConfig, StopReason, WorkerResult};
