//! Explicit random streams and seed scoping

use rand::rngs::StdRng;
use rand::SeedableRng;

/// A seeded stream, or one seeded from the OS when `seed` is `None`
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Derive the seed of a child stream; `None` stays unseeded
pub fn derive_seed(seed: Option<u64>, stream: u64) -> Option<u64> {
    seed.map(|s| s.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(stream))
}

struct SeedGuard<'a> {
    rng: &'a mut StdRng,
    saved: StdRng,
}

impl Drop for SeedGuard<'_> {
    fn drop(&mut self) {
        *self.rng = self.saved.clone();
    }
}

/// Run `f` with `rng` temporarily reseeded to `seed`.
///
/// The previous state of `rng` is restored afterwards, including when `f`
/// panics, so the surrounding stream continues exactly where it left off.
pub fn with_temp_seed<R, F>(rng: &mut StdRng, seed: u64, f: F) -> R
where
    F: FnOnce(&mut StdRng) -> R,
{
    let saved = std::mem::replace(rng, StdRng::seed_from_u64(seed));
    let guard = SeedGuard { rng, saved };
    f(&mut *guard.rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_temp_seed_is_reproducible_and_restores() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut reference = rng.clone();

        let a: u64 = with_temp_seed(&mut rng, 42, |r| r.random());
        let b: u64 = with_temp_seed(&mut rng, 42, |r| r.random());
        assert_eq!(a, b);

        // the outer stream is untouched by the scoped draws
        assert_eq!(rng.random::<u64>(), reference.random::<u64>());
    }

    #[test]
    fn test_temp_seed_restores_after_panic() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut reference = rng.clone();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            with_temp_seed(&mut rng, 3, |r| {
                let _: u32 = r.random();
                panic!("boom");
            })
        }));
        assert!(result.is_err());
        assert_eq!(rng.random::<u32>(), reference.random::<u32>());
    }

    #[test]
    fn test_derived_seeds_differ() {
        assert_ne!(derive_seed(Some(5), 0), derive_seed(Some(5), 1));
        assert_eq!(derive_seed(None, 3), None);
    }
}
