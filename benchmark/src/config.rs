use std::{num::NonZeroUsize, path::PathBuf, time::Duration};

use crate::{engines::EngineKind, report::OutputFormat, sweep::SweepConfig, units::Abbreviation};

/// Random-read IOPS sweep over doubling block sizes.
#[derive(Debug, Clone, clap::Parser)]
#[command(version, about)]
pub struct Args {
    /// Block device or file to read from.
    pub path: PathBuf,
    /// Concurrent workers per round.
    #[clap(short, long, default_value = "32")]
    pub threads: NonZeroUsize,
    /// How long every round reads, e.g. `2s` or `500ms`.
    #[clap(short, long, default_value = "2s", value_parser = parse_duration)]
    pub duration: Duration,
    /// Block size of the first round: bytes, or with a k/Ki/m/Mi suffix.
    #[clap(short = 'b', long, default_value = "512", value_parser = parse_block_size)]
    pub start_block_size: u64,
    /// How sizes and rates are abbreviated.
    #[clap(short, long, value_enum, default_value_t = Abbreviation::Binary)]
    pub abbrev: Abbreviation,
    #[clap(long, value_enum, default_value_t = EngineKind::Std)]
    pub engine: EngineKind,
    /// Open the target with O_DIRECT, bypassing the page cache.
    #[clap(long)]
    pub direct_io: bool,
    /// Seed the per-worker offset generators for a reproducible access pattern.
    #[clap(long)]
    pub seed: Option<u64>,
    #[clap(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

impl Args {
    pub fn sweep_config(&self) -> SweepConfig {
        SweepConfig {
            threads: self.threads,
            target_duration: self.duration,
            start_block_size: self.start_block_size,
            direct_io: self.direct_io,
            seed: self.seed,
        }
    }
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    match humantime::parse_duration(s) {
        Ok(d) if d.is_zero() => Err(format!("duration must be positive: {s:?}")),
        Ok(d) => Ok(d),
        Err(e) => Err(format!("invalid duration: {e}: {s:?}")),
    }
}

fn parse_block_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, suffix) = s.split_at(split);
    let n: u64 = digits
        .parse()
        .map_err(|e| format!("invalid block size: {e}: {s:?}"))?;
    let multiplier: u64 = match suffix.to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" => 1000,
        "ki" | "kib" => 1 << 10,
        "m" | "mb" => 1000 * 1000,
        "mi" | "mib" => 1 << 20,
        "g" | "gb" => 1000 * 1000 * 1000,
        "gi" | "gib" => 1 << 30,
        _ => return Err(format!("unknown block size suffix {suffix:?}: {s:?}")),
    };
    let bytes = n
        .checked_mul(multiplier)
        .ok_or_else(|| format!("block size overflows: {s:?}"))?;
    if bytes < crate::sweep::MIN_BLOCK_SIZE || !bytes.is_power_of_two() {
        return Err(format!("block size must be a power of two >= 512: {s:?}"));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["randread-sweep", "/dev/sda"]).unwrap();
        assert_eq!(args.path, PathBuf::from("/dev/sda"));
        assert_eq!(args.threads.get(), 32);
        assert_eq!(args.duration, Duration::from_secs(2));
        assert_eq!(args.start_block_size, 512);
        assert_eq!(args.abbrev, Abbreviation::Binary);
        assert_eq!(args.engine, EngineKind::Std);
        assert_eq!(args.output, OutputFormat::Text);
        assert!(!args.direct_io);
        assert_eq!(args.seed, None);
    }

    #[test]
    fn all_flags() {
        let args = Args::try_parse_from([
            "randread-sweep",
            "-t",
            "8",
            "-d",
            "250ms",
            "-b",
            "4Ki",
            "-a",
            "decimal",
            "--engine",
            "tokio-spawn-blocking",
            "--direct-io",
            "--seed",
            "9",
            "--output",
            "json",
            "disk.img",
        ])
        .unwrap();
        let cfg = args.sweep_config();
        assert_eq!(cfg.threads.get(), 8);
        assert_eq!(cfg.target_duration, Duration::from_millis(250));
        assert_eq!(cfg.start_block_size, 4096);
        assert!(cfg.direct_io);
        assert_eq!(cfg.seed, Some(9));
        assert_eq!(args.abbrev, Abbreviation::Decimal);
        assert_eq!(args.engine, EngineKind::TokioSpawnBlocking);
        assert_eq!(args.output, OutputFormat::Json);
    }

    #[test]
    fn rejects_bad_values() {
        for argv in [
            vec!["x"],
            vec!["x", "-t", "0", "p"],
            vec!["x", "-d", "0s", "p"],
            vec!["x", "-d", "soon", "p"],
            vec!["x", "-b", "1000", "p"],
            vec!["x", "-b", "256", "p"],
            vec!["x", "-a", "metric", "p"],
        ] {
            assert!(Args::try_parse_from(argv.iter().copied()).is_err(), "{argv:?}");
        }
    }

    #[test]
    fn block_size_suffixes() {
        assert_eq!(parse_block_size("512"), Ok(512));
        assert_eq!(parse_block_size("1Mi"), Ok(1 << 20));
        assert_eq!(parse_block_size("64KiB"), Ok(65536));
        assert!(parse_block_size("4k").is_err());
        assert!(parse_block_size("1Xi").is_err());
    }
}
