use tracing::warn;

use crate::error::StoreResult;

pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Bounded retry for store operations.
///
/// Only errors reporting [`StoreError::is_transient`](crate::StoreError::is_transient)
/// are retried; everything else is returned on the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn run<T, F>(&self, op: &str, mut f: F) -> StoreResult<T>
    where
        F: FnMut() -> StoreResult<T>,
    {
        let mut attempt = 1;
        loop {
            match f() {
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!(op, attempt, max = self.max_attempts, error = %e, "transient store fault, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_transient_then_success() {
        let policy = RetryPolicy::default();
        let mut calls = 0;
        let result = policy.run("get", || {
            calls += 1;
            if calls < 3 {
                Err(StoreError::transient("busy"))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_transient_exhausts_attempts() {
        let policy = RetryPolicy::new(3);
        let mut calls = 0;
        let result: StoreResult<()> = policy.run("get", || {
            calls += 1;
            Err(StoreError::transient("busy"))
        });
        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_permanent_fault_not_retried() {
        let policy = RetryPolicy::default();
        let mut calls = 0;
        let result: StoreResult<()> = policy.run("insert", || {
            calls += 1;
            Err(StoreError::permanent("disk gone"))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_duplicate_key_not_retried() {
        let policy = RetryPolicy::default();
        let mut calls = 0;
        let result: StoreResult<()> = policy.run("insert", || {
            calls += 1;
            Err(StoreError::duplicate(crate::UniqueField::Name, "X"))
        });
        assert!(matches!(result, Err(StoreError::DuplicateKey { .. })));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0).max_attempts(), 1);
    }
}
