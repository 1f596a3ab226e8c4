use rand::{rngs::StdRng, Rng, SeedableRng};

/// Granularity of every read offset. Raw and `O_DIRECT` reads want offsets
/// on physical block boundaries, and 4096 covers both 512e and 4Kn drives.
pub const SECTOR_SIZE: u64 = 4096;

/// Picks a random read offset for a `block_size` read on a target of
/// `device_size` bytes.
///
/// The raw draw is uniform in `[0, device_size - block_size)` and then rounded
/// down to a multiple of [`SECTOR_SIZE`], so the read always ends inside the
/// target.
///
/// Caller guarantees `block_size < device_size`.
pub fn random_offset<R: Rng + ?Sized>(rng: &mut R, device_size: u64, block_size: u64) -> u64 {
    debug_assert!(block_size < device_size);
    let raw = rng.gen_range(0..device_size - block_size);
    raw & !(SECTOR_SIZE - 1)
}

/// Builds the private generator of one worker.
///
/// Without a seed every worker draws from OS entropy. With a seed the stream
/// depends only on `(seed, block_size, worker_index)` which makes a sweep's
/// offset sequences reproducible.
pub(crate) fn worker_rng(seed: Option<u64>, block_size: u64, worker_index: usize) -> StdRng {
    match seed {
        None => StdRng::from_entropy(),
        Some(seed) => {
            let mixed = seed
                ^ block_size.rotate_left(32)
                ^ (worker_index as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
            StdRng::seed_from_u64(mixed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_in_range_and_aligned() {
        let mut rng = StdRng::seed_from_u64(1);
        for device_size in [8192u64, 1 << 20, (1 << 20) + 777, 10 * 1024 * 1024 * 1024] {
            let mut block_size = 512;
            while block_size < device_size {
                for _ in 0..2000 {
                    let o = random_offset(&mut rng, device_size, block_size);
                    assert!(o <= device_size - block_size, "{o} {device_size} {block_size}");
                    assert_eq!(o % SECTOR_SIZE, 0);
                }
                block_size *= 2;
            }
        }
    }

    #[test]
    fn offsets_below_one_sector_collapse_to_zero() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            assert_eq!(random_offset(&mut rng, 4096, 512), 0);
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..64)
                .map(|_| random_offset(&mut rng, 1 << 30, 65536))
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(42), draw(42));
        assert_ne!(draw(42), draw(43));
    }

    #[test]
    fn seeded_worker_rngs_are_reproducible_and_distinct() {
        let seq = |worker| {
            let mut rng = worker_rng(Some(7), 4096, worker);
            (0..16)
                .map(|_| random_offset(&mut rng, 1 << 30, 4096))
                .collect::<Vec<_>>()
        };
        assert_eq!(seq(0), seq(0));
        assert_ne!(seq(0), seq(1));
    }
}
