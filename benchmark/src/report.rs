use std::{collections::BTreeMap, io::Write, path::PathBuf};

use itertools::Itertools;
use serde_with::serde_as;

use crate::{
    offset::SECTOR_SIZE,
    sweep::{RoundStats, LATENCY_PERCENTILES},
    units::{Abbreviation, SizeFormatter},
    Device,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(serde::Serialize)]
struct Header {
    path: PathBuf,
    size_bytes: u64,
    sector_size_bytes: u64,
    threads: usize,
    pattern: &'static str,
}

fn latency_percentiles_serialize<S>(
    values: &[f64; LATENCY_PERCENTILES.len()],
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serde::Serialize::serialize(
        &LATENCY_PERCENTILES
            .iter()
            .map(|p| format!("p{p}"))
            .zip(values.iter().cloned())
            .collect::<BTreeMap<_, _>>(),
        serializer,
    )
}

#[serde_as]
#[derive(serde::Serialize)]
struct RoundSummary {
    block_size: u64,
    iops: f64,
    bandwidth_bytes_per_sec: f64,
    #[serde_as(as = "serde_with::DurationMicroSeconds")]
    elapsed_mean_us: std::time::Duration,
    total_reads: u64,
    sorted_per_worker_reads: Vec<u64>,
    failed_workers: usize,
    #[serde(serialize_with = "latency_percentiles_serialize")]
    latency_percentiles_us: [f64; LATENCY_PERCENTILES.len()],
}

impl From<&RoundStats> for RoundSummary {
    fn from(stats: &RoundStats) -> Self {
        RoundSummary {
            block_size: stats.block_size,
            iops: stats.iops,
            bandwidth_bytes_per_sec: stats.bandwidth_bytes_per_sec(),
            elapsed_mean_us: stats.mean_elapsed,
            total_reads: stats.total_reads,
            sorted_per_worker_reads: stats.per_worker_reads.iter().copied().sorted().collect(),
            failed_workers: stats.failed_workers,
            latency_percentiles_us: LATENCY_PERCENTILES
                .map(|p| stats.latencies.value_at_percentile(p) as f64 / 1000.0),
        }
    }
}

/// Writes the report of a sweep: one header, then one entry per round.
pub struct Reporter<W> {
    out: W,
    format: OutputFormat,
    sizes: SizeFormatter,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: OutputFormat, abbrev: Abbreviation) -> Self {
        Reporter {
            out,
            format,
            sizes: SizeFormatter::new(abbrev),
        }
    }

    pub fn header(&mut self, device: &Device, threads: usize) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(
                self.out,
                "{}, {}B, sectorsize {}B, #threads {}, pattern random:",
                device.path().display(),
                self.sizes.bytes(device.size()),
                SECTOR_SIZE,
                threads,
            ),
            OutputFormat::Json => {
                let header = Header {
                    path: device.path().to_path_buf(),
                    size_bytes: device.size(),
                    sector_size_bytes: SECTOR_SIZE,
                    threads,
                    pattern: "random",
                };
                serde_json::to_writer(&mut self.out, &header)?;
                writeln!(self.out)
            }
        }
    }

    pub fn round(&mut self, stats: &RoundStats) -> std::io::Result<()> {
        let written = match self.format {
            OutputFormat::Text => {
                let bytes_per_sec = stats.bandwidth_bytes_per_sec();
                writeln!(
                    self.out,
                    "{}B blocks: {:.1} IO/s, {}B/s ({}bit/s)",
                    self.sizes.bytes(stats.block_size),
                    stats.iops,
                    self.sizes.rate(bytes_per_sec),
                    self.sizes.rate(bytes_per_sec * 8.0),
                )
            }
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, &RoundSummary::from(stats))?;
                writeln!(self.out)
            }
        };
        written?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::worker::latency_histogram;

    fn device() -> Device {
        Device {
            path: "/dev/sdz".into(),
            size: 1 << 30,
        }
    }

    fn stats() -> RoundStats {
        let mut latencies = latency_histogram();
        latencies.record(100_000).unwrap();
        RoundStats {
            block_size: 1 << 20,
            total_reads: 200,
            mean_elapsed: Duration::from_secs(2),
            iops: 100.0,
            per_worker_reads: vec![120, 80],
            failed_workers: 1,
            latencies,
        }
    }

    fn text(abbrev: Abbreviation) -> String {
        let mut r = Reporter::new(Vec::new(), OutputFormat::Text, abbrev);
        r.header(&device(), 8).unwrap();
        r.round(&stats()).unwrap();
        String::from_utf8(r.into_inner()).unwrap()
    }

    #[test]
    fn text_binary() {
        assert_eq!(
            text(Abbreviation::Binary),
            "/dev/sdz, 1 GiB, sectorsize 4096B, #threads 8, pattern random:\n\
             1 MiB blocks: 100.0 IO/s, 100.0 MiB/s (800.0 Mibit/s)\n"
        );
    }

    #[test]
    fn text_decimal() {
        assert_eq!(
            text(Abbreviation::Decimal),
            "/dev/sdz, 1 GB, sectorsize 4096B, #threads 8, pattern random:\n\
             1 MB blocks: 100.0 IO/s, 104.9 MB/s (838.9 Mbit/s)\n"
        );
    }

    #[test]
    fn json_lines() {
        let mut r = Reporter::new(Vec::new(), OutputFormat::Json, Abbreviation::Binary);
        r.header(&device(), 8).unwrap();
        r.round(&stats()).unwrap();
        let out = String::from_utf8(r.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["size_bytes"], 1u64 << 30);
        assert_eq!(lines[0]["threads"], 8);
        assert_eq!(lines[1]["block_size"], 1u64 << 20);
        assert_eq!(lines[1]["iops"], 100.0);
        assert_eq!(lines[1]["elapsed_mean_us"], 2_000_000);
        assert_eq!(lines[1]["sorted_per_worker_reads"], serde_json::json!([80, 120]));
        assert_eq!(lines[1]["failed_workers"], 1);
        assert!(lines[1]["latency_percentiles_us"]["p50"].as_f64().unwrap() > 99.0);
    }
}
