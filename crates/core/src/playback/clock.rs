use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Shared flag that asks a running show to stop.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Monotonic time source the scheduler sleeps on.
pub trait Clock {
    /// Seconds since some fixed point.
    fn now(&self) -> f64;

    /// Sleep for `seconds`. Returns false if `cancel` fired before the time was up.
    fn sleep(&mut self, seconds: f64, cancel: &CancelToken) -> bool;
}

const SLEEP_SLICE: Duration = Duration::from_millis(10);

pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn sleep(&mut self, seconds: f64, cancel: &CancelToken) -> bool {
        if !seconds.is_finite() || seconds <= 0.0 {
            return !cancel.is_cancelled();
        }

        let deadline = Instant::now() + Duration::from_secs_f64(seconds);
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_waits() {
        let mut clock = SystemClock::new();
        let cancel = CancelToken::new();
        let before = clock.now();
        assert!(clock.sleep(0.02, &cancel));
        assert!(clock.now() - before >= 0.02);
    }

    #[test]
    fn test_cancelled_sleep_returns_early() {
        let mut clock = SystemClock::new();
        let cancel = CancelToken::new();
        let remote = cancel.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        let before = Instant::now();
        assert!(!clock.sleep(5.0, &cancel));
        assert!(before.elapsed() < Duration::from_secs(2));
        canceller.join().unwrap();

        cancel.reset();
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn test_non_positive_sleep_is_immediate() {
        let mut clock = SystemClock::new();
        let cancel = CancelToken::new();
        assert!(clock.sleep(-1.0, &cancel));
        assert!(clock.sleep(f64::NAN, &cancel));
        cancel.cancel();
        assert!(!clock.sleep(0.0, &cancel));
    }
}
