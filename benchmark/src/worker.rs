use std::{
    alloc::Layout,
    os::unix::prelude::FileExt,
    ptr::NonNull,
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::{debug, warn};

use crate::{
    offset::{random_offset, worker_rng, SECTOR_SIZE},
    Device,
};

/// Everything a worker needs for one round. Cloned into every worker.
#[derive(Debug, Clone)]
pub struct RoundConfig {
    pub device: Arc<Device>,
    pub block_size: u64,
    pub target_duration: Duration,
    pub worker_count: usize,
    pub direct_io: bool,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Deadline,
    ReadFailed,
    OpenFailed,
    AllocFailed,
}

impl StopReason {
    pub fn is_failure(self) -> bool {
        self != StopReason::Deadline
    }
}

#[derive(Debug, Clone)]
pub struct WorkerResult {
    pub count: u64,
    pub elapsed: Duration,
    pub latencies: hdrhistogram::Histogram<u64>,
    pub stop_reason: StopReason,
}

pub(crate) fn latency_histogram() -> hdrhistogram::Histogram<u64> {
    // 1ns..1s with 3 significant digits; slower reads saturate at the top.
    hdrhistogram::Histogram::new_with_bounds(1, 1_000_000_000, 3)
        .expect("static histogram bounds are valid")
}

impl WorkerResult {
    fn without_reads(stop_reason: StopReason) -> Self {
        WorkerResult {
            count: 0,
            elapsed: Duration::ZERO,
            latencies: latency_histogram(),
            stop_reason,
        }
    }
}

/// Runs one worker until `config.target_duration` has passed.
///
/// The deadline is only checked between reads, so the last read may finish
/// after it. A failed read ends the worker early but keeps the reads done
/// so far. A worker that cannot open the device or allocate its buffer
/// reports zero reads and zero elapsed time.
pub fn run(config: &RoundConfig, worker_index: usize) -> WorkerResult {
    debug!(worker_index, block_size = config.block_size, "worker starting");

    let file = match config.device.open_reader(config.direct_io) {
        Ok(file) => file,
        Err(e) => {
            warn!(worker_index, path = ?config.device.path(), "cannot open device: {e}");
            return WorkerResult::without_reads(StopReason::OpenFailed);
        }
    };
    let Some(mut buf) = usize::try_from(config.block_size)
        .ok()
        .and_then(AlignedBuf::new)
    else {
        warn!(worker_index, block_size = config.block_size, "cannot allocate read buffer");
        return WorkerResult::without_reads(StopReason::AllocFailed);
    };
    let mut rng = worker_rng(config.seed, config.block_size, worker_index);
    let mut latencies = latency_histogram();
    let device_size = config.device.size();

    let mut count = 0;
    let mut stop_reason = StopReason::Deadline;
    let start = Instant::now();
    while start.elapsed() < config.target_duration {
        let offset = random_offset(&mut rng, device_size, config.block_size);
        let read_start = Instant::now();
        if let Err(e) = file.read_exact_at(buf.as_mut_slice(), offset) {
            warn!(worker_index, offset, "read failed, stopping worker: {e}");
            stop_reason = StopReason::ReadFailed;
            break;
        }
        let latency_ns = u64::try_from(read_start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        latencies.saturating_record(latency_ns);
        count += 1;
    }
    let elapsed = start.elapsed();

    debug!(worker_index, count, ?elapsed, ?stop_reason, "worker stopping");
    WorkerResult {
        count,
        elapsed,
        latencies,
        stop_reason,
    }
}

/// Heap buffer aligned to [`SECTOR_SIZE`] so it can be used with `O_DIRECT`.
/// Owned by exactly one worker.
struct AlignedBuf {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl AlignedBuf {
    fn new(len: usize) -> Option<Self> {
        if len == 0 {
            return None;
        }
        let layout = Layout::from_size_align(len, SECTOR_SIZE as usize).ok()?;
        // SAFETY: layout has a non-zero size
        let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr)?;
        Some(AlignedBuf { ptr, layout })
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: ptr points to layout.size() initialized bytes that we own exclusively
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl Drop for AlignedBuf {
    fn drop(&mut self) {
        // SAFETY: allocated in `new` with this exact layout
        unsafe { std::alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}
