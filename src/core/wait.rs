use std::sync::{Condvar, Mutex};
use std::time::Duration;

use super::lock::lock_mutex;

/// Interruptible fixed sleep for worker loops.
pub struct StopWait {
    lock: Mutex<()>,
    condvar: Condvar,
}

impl StopWait {
    pub fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            condvar: Condvar::new(),
        }
    }

    pub fn wait_timeout(&self, duration: Duration) {
        let guard = lock_mutex(&self.lock, "StopWait::wait_timeout");
        let _ = self.condvar.wait_timeout(guard, duration);
    }

    pub fn notify_all(&self) {
        let _guard = lock_mutex(&self.lock, "StopWait::notify_all");
        self.condvar.notify_all();
    }
}

impl Default for StopWait {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_notify_cuts_wait_short() {
        let wait = Arc::new(StopWait::new());
        let waiter = wait.clone();
        let start = Instant::now();
        let handle = std::thread::spawn(move || waiter.wait_timeout(Duration::from_secs(10)));
        while !handle.is_finished() {
            wait.notify_all();
            std::thread::sleep(Duration::from_millis(10));
        }
        handle.join().unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
