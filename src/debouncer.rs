//! Quiet-period debouncing for refresh requests
//!
//! The debouncer holds at most one pending task. Every new request replaces
//! the pending one and restarts the quiet period; the task becomes due only
//! once the period elapses with no further requests. Nothing runs on its
//! own: the owner polls it from its event loop, the same way expiring
//! notifications are polled.

use std::time::{Duration, Instant};

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(200);

#[derive(Debug)]
struct Pending<T> {
    task: T,
    due_at: Instant,
}

#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<Pending<T>>,
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn debounce(&mut self, task: T) {
        self.debounce_at(task, Instant::now());
    }

    /// Schedule `task` to become due `delay` after `now`, dropping any
    /// previously pending task
    pub fn debounce_at(&mut self, task: T, now: Instant) {
        self.pending = Some(Pending {
            task,
            due_at: now + self.delay,
        });
    }

    /// Discard the pending task without running it. Returns true if one was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn due_at(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due_at)
    }

    /// Time left before the pending task is due, if any is pending
    pub fn time_remaining(&self, now: Instant) -> Option<Duration> {
        self.due_at().map(|due| due.saturating_duration_since(now))
    }

    pub fn poll(&mut self) -> Option<T> {
        self.poll_at(Instant::now())
    }

    /// Take the pending task if its quiet period has elapsed by `now`
    pub fn poll_at(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some(pending) if now >= pending.due_at => self.pending.take().map(|p| p.task),
            _ => None,
        }
    }
}

impl<F: FnOnce()> Debouncer<F> {
    /// Run the pending closure if it is due. Returns true if it ran.
    pub fn run_due_at(&mut self, now: Instant) -> bool {
        match self.poll_at(now) {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counter_task(counter: &Rc<Cell<u32>>) -> impl FnOnce() + use<> {
        let counter = Rc::clone(counter);
        move || counter.set(counter.get() + 1)
    }

    #[test]
    fn rapid_requests_run_once() {
        let calls = Rc::new(Cell::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(200));
        let start = Instant::now();

        debouncer.debounce_at(counter_task(&calls), start);
        debouncer.debounce_at(counter_task(&calls), start + Duration::from_millis(50));
        debouncer.debounce_at(counter_task(&calls), start + Duration::from_millis(100));

        assert!(!debouncer.run_due_at(start + Duration::from_millis(100)));
        assert_eq!(calls.get(), 0);

        assert!(debouncer.run_due_at(start + Duration::from_millis(300)));
        assert_eq!(calls.get(), 1);

        assert!(!debouncer.run_due_at(start + Duration::from_secs(10)));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn quiet_period_counts_from_last_request() {
        let mut debouncer = Debouncer::new(Duration::from_millis(200));
        let start = Instant::now();

        debouncer.debounce_at("first", start);
        debouncer.debounce_at("second", start + Duration::from_millis(150));

        assert_eq!(debouncer.poll_at(start + Duration::from_millis(200)), None);
        assert_eq!(
            debouncer.time_remaining(start + Duration::from_millis(200)),
            Some(Duration::from_millis(150))
        );
        assert_eq!(
            debouncer.poll_at(start + Duration::from_millis(350)),
            Some("second")
        );
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn cancel_discards_pending_task() {
        let calls = Rc::new(Cell::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(200));
        let start = Instant::now();

        debouncer.debounce_at(counter_task(&calls), start);
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        assert!(!debouncer.run_due_at(start + Duration::from_millis(500)));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn default_uses_200ms() {
        let debouncer: Debouncer<()> = Debouncer::default();
        assert_eq!(debouncer.delay(), Duration::from_millis(200));
        assert_eq!(debouncer.due_at(), None);
    }
}
