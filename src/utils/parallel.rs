//! Thread pool and seed helpers

use crate::error::{Result, SelectError};
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Run `f` on a dedicated rayon pool of `n_threads`, or on the global pool when `None`.
pub fn with_thread_pool<T, F>(n_threads: Option<usize>, f: F) -> Result<T>
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    match n_threads {
        None => Ok(f()),
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n.max(1))
                .build()
                .map_err(|e| SelectError::ConfigError(format!("thread pool: {}", e)))?;
            Ok(pool.install(f))
        }
    }
}

/// Derive an independent seed for a named stage from the run seed.
pub fn derive_seed(base: u64, stage: &str) -> u64 {
    xxh3_64_with_seed(stage.as_bytes(), base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_dedicated_pool() {
        let n = with_thread_pool(Some(2), rayon::current_num_threads).unwrap();
        assert_eq!(n, 2);

        let sum: i64 = with_thread_pool(Some(3), || (0..100i64).into_par_iter().sum()).unwrap();
        assert_eq!(sum, 4950);
    }

    #[test]
    fn test_derive_seed_is_stable_and_distinct() {
        assert_eq!(derive_seed(42, "holdout"), derive_seed(42, "holdout"));
        assert_ne!(derive_seed(42, "holdout"), derive_seed(42, "search:SVM"));
        assert_ne!(derive_seed(42, "holdout"), derive_seed(43, "holdout"));
    }
}
