//! Progress sink for scans, catalog loads and organize runs.

/// Receives coarse progress updates from long-running operations.
///
/// Implemented for closures, so callers can pass
/// `&|current, total, message| ...` directly.
pub trait Progress: Sync {
    fn update(&self, current: u64, total: u64, message: &str);
}

impl<F> Progress for F
where
    F: Fn(u64, u64, &str) + Sync,
{
    fn update(&self, current: u64, total: u64, message: &str) {
        self(current, total, message)
    }
}

/// Discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;
impl Progress for NoProgress {
    fn update(&self, _: u64, _: u64, _: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn report(progress: &dyn Progress) {
        progress.update(1, 2, "half way");
    }

    #[test]
    fn test_closures_are_sinks() {
        let seen = Mutex::new(Vec::new());
        let record = |current: u64, total: u64, message: &str| {
            seen.lock().unwrap().push((current, total, message.to_string()));
        };
        report(&record);
        assert_eq!(seen.into_inner().unwrap(), vec![(1, 2, "half way".to_string())]);
        report(&NoProgress);
    }
}
