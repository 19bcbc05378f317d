//! Randomised delays for scheduled work.

use std::time::Duration;

use rand::Rng;

/// A random delay in `0..=max_ms` milliseconds, so replicas of this service
/// started together do not probe the database in lockstep.
pub fn jitter(max_ms: u64) -> Duration {
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_bounds() {
        assert_eq!(jitter(0), Duration::ZERO);
        for _ in 0..100 {
            assert!(jitter(250) <= Duration::from_millis(250));
        }
    }
}
