//! Re-evaluation triggers: a throttled heartbeat and a debounced on-demand
//! queue

use log::trace;

/// Debounced on-demand trigger
///
/// The first request opens a window; every request until the window
/// closes folds into one run at its end, so runs are at least one window
/// apart.
#[derive(Debug, Clone)]
pub struct UpdateScheduler {
    window: f64,
    auto_update: bool,
    respect_update_queue: bool,
    deadline: Option<f64>,
    last_run: Option<f64>,
    runs: u64,
}

impl UpdateScheduler {
    /// Create a scheduler with a debounce window in time units
    pub fn new(window: f64, auto_update: bool, respect_update_queue: bool) -> Self {
        Self {
            window,
            auto_update,
            respect_update_queue,
            deadline: None,
            last_run: None,
            runs: 0,
        }
    }

    /// Raise an on-demand trigger at `now`; false when auto-update is off
    pub fn request(&mut self, now: f64) -> bool {
        if !self.auto_update {
            return false;
        }
        if self.deadline.is_some() {
            trace!("update request at {now} coalesced");
            return true;
        }
        let deadline = if self.respect_update_queue {
            now + self.window
        } else {
            now
        };
        self.deadline = Some(deadline);
        true
    }

    /// Run the pending update if its deadline has passed
    pub fn poll(&mut self, now: f64) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.last_run = Some(now);
                self.runs += 1;
                true
            }
            _ => false,
        }
    }

    /// Whether a run is queued
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Deadline of the queued run
    pub fn deadline(&self) -> Option<f64> {
        self.deadline
    }

    /// Time of the latest run
    pub fn last_run(&self) -> Option<f64> {
        self.last_run
    }

    /// Completed on-demand runs
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Enable or disable on-demand triggers; disabling drops a queued run
    pub fn set_auto_update(&mut self, enabled: bool) {
        self.auto_update = enabled;
        if !enabled {
            self.deadline = None;
        }
    }

    /// Whether on-demand triggers are honoured
    pub fn auto_update(&self) -> bool {
        self.auto_update
    }

    /// Enable or disable debouncing
    pub fn set_respect_update_queue(&mut self, enabled: bool) {
        self.respect_update_queue = enabled;
    }

    /// Whether requests are debounced
    pub fn respect_update_queue(&self) -> bool {
        self.respect_update_queue
    }
}

/// Fixed-interval tick gate; an interval of zero fires on every step
#[derive(Debug, Clone)]
pub struct Heartbeat {
    interval: f64,
    last: Option<f64>,
}

impl Heartbeat {
    /// Create a heartbeat
    pub fn new(interval: f64) -> Self {
        Self { interval, last: None }
    }

    /// Whether a beat is due at `now`; records the beat when it is
    pub fn due(&mut self, now: f64) -> bool {
        let due = self.last.map_or(true, |last| now - last >= self.interval);
        if due {
            self.last = Some(now);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_collapses_to_one_run() {
        let mut scheduler = UpdateScheduler::new(0.1, true, true);
        let mut runs = 0;
        for i in 0..10 {
            let now = i as f64 * 0.009;
            scheduler.request(now);
            if scheduler.poll(now) {
                runs += 1;
            }
        }
        for i in 0..50 {
            if scheduler.poll(0.09 + i as f64 * 0.01) {
                runs += 1;
            }
        }
        assert_eq!(runs, 1);
        assert_eq!(scheduler.runs(), 1);
    }

    #[test]
    fn test_run_waits_for_window_end() {
        let mut scheduler = UpdateScheduler::new(0.1, true, true);
        scheduler.request(1.0);
        assert!(!scheduler.poll(1.05));
        assert!(scheduler.poll(1.1));
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn test_next_request_opens_new_window() {
        let mut scheduler = UpdateScheduler::new(0.1, true, true);
        scheduler.request(0.0);
        assert!(scheduler.poll(0.5));
        scheduler.request(0.5);
        assert_eq!(scheduler.deadline(), Some(0.6));
        assert_eq!(scheduler.last_run(), Some(0.5));
    }

    #[test]
    fn test_without_queue_runs_on_next_poll() {
        let mut scheduler = UpdateScheduler::new(0.1, true, false);
        scheduler.request(2.0);
        scheduler.request(2.0);
        assert!(scheduler.poll(2.0));
        assert!(!scheduler.poll(2.0));
    }

    #[test]
    fn test_auto_update_off_ignores_requests() {
        let mut scheduler = UpdateScheduler::new(0.1, true, true);
        scheduler.request(0.0);
        scheduler.set_auto_update(false);
        assert!(!scheduler.is_pending());
        assert!(!scheduler.request(0.0));
        assert!(!scheduler.poll(10.0));
    }

    #[test]
    fn test_heartbeat_interval() {
        let mut every_step = Heartbeat::new(0.0);
        assert!(every_step.due(0.0));
        assert!(every_step.due(0.0));

        let mut slow = Heartbeat::new(1.0);
        assert!(slow.due(0.0));
        assert!(!slow.due(0.5));
        assert!(slow.due(1.0));
    }
}
