//! Blocking counting semaphore.

use parking_lot::{Condvar, Mutex};

/// A counting semaphore: `acquire` blocks until a permit is available.
#[derive(Debug)]
pub(crate) struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    /// Takes one permit, waiting for one if none are available.
    pub fn acquire(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
    }

    /// Takes one permit if one is available right now.
    #[cfg(test)]
    pub fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Returns `n` permits, waking up to `n` waiters.
    pub fn release(&self, n: usize) {
        *self.permits.lock() += n;
        for _ in 0..n {
            self.available.notify_one();
        }
    }

    #[cfg(test)]
    pub fn available(&self) -> usize {
        *self.permits.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[test]
    fn test_initial_permits() {
        let sem = Semaphore::new(2);
        assert!(sem.try_acquire());
        assert!(sem.try_acquire());
        assert!(!sem.try_acquire());
        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn test_release_restores_permits() {
        let sem = Semaphore::new(0);
        sem.release(3);
        assert_eq!(sem.available(), 3);
        sem.acquire();
        assert_eq!(sem.available(), 2);
    }

    #[test]
    fn test_acquire_blocks_until_release() {
        let sem = Semaphore::new(0);
        let acquired = AtomicBool::new(false);

        std::thread::scope(|s| {
            s.spawn(|| {
                sem.acquire();
                acquired.store(true, Ordering::SeqCst);
            });

            std::thread::sleep(Duration::from_millis(50));
            assert!(!acquired.load(Ordering::SeqCst));

            sem.release(1);
        });

        assert!(acquired.load(Ordering::SeqCst));
        assert_eq!(sem.available(), 0);
    }
}
