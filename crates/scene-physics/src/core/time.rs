use std::time::{Duration, Instant};

/// Fixed timestep accumulator.
/// Splits a variable wall-clock delta into a bounded number of fixed engine steps.
pub struct FixedTimestep {
    /// The fixed delta time per step.
    dt: f32,
    /// Accumulated time from variable deltas.
    accumulator: f32,
    /// Most steps a single `accumulate` call may return.
    max_steps: u32,
}

impl FixedTimestep {
    pub fn new(dt: f32) -> Self {
        Self::with_max_steps(dt, 10)
    }

    pub fn with_max_steps(dt: f32, max_steps: u32) -> Self {
        Self {
            dt,
            accumulator: 0.0,
            max_steps: max_steps.max(1),
        }
    }

    /// Add elapsed time to the accumulator. Returns the number of fixed steps to run.
    pub fn accumulate(&mut self, elapsed: f32) -> u32 {
        self.accumulator += elapsed.max(0.0);
        let steps = (self.accumulator / self.dt) as u32;
        if steps >= self.max_steps {
            // Cap to prevent spiral of death; the excess is dropped.
            self.accumulator = 0.0;
            return self.max_steps;
        }
        self.accumulator -= steps as f32 * self.dt;
        steps
    }

    /// Drop any leftover time.
    pub fn clear(&mut self) {
        self.accumulator = 0.0;
    }
}

const DEFAULT_TICK_RATE: f32 = 60.0;

/// Fixed-rate timer, independent of the render loop.
///
/// The host polls it with the current time; it fires at most once per poll and
/// never bursts to catch up after a stall.
pub struct TickScheduler {
    interval: Duration,
    next_due: Option<Instant>,
}

impl TickScheduler {
    /// Scheduler firing `rate` times per second. Unusable rates fall back to 60 Hz.
    pub fn new(rate: f32) -> Self {
        let interval = Duration::try_from_secs_f32(1.0 / rate)
            .unwrap_or_else(|_| Duration::from_secs_f32(1.0 / DEFAULT_TICK_RATE));
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns `true` when a tick is due at `now`. The first poll always fires.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now < due => false,
            Some(due) => {
                let next = due + self.interval;
                self.next_due = Some(if next <= now { now + self.interval } else { next });
                true
            }
            None => {
                self.next_due = Some(now + self.interval);
                true
            }
        }
    }

    /// Forget the schedule; the next poll fires immediately.
    pub fn restart(&mut self) {
        self.next_due = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_step_exact() {
        let mut ts = FixedTimestep::new(1.0 / 60.0);
        let steps = ts.accumulate(1.0 / 60.0);
        assert_eq!(steps, 1);
    }

    #[test]
    fn accumulates_partial() {
        let mut ts = FixedTimestep::new(1.0 / 60.0);
        let steps = ts.accumulate(0.008); // half a step
        assert_eq!(steps, 0);
        let steps = ts.accumulate(0.010); // over one step total
        assert_eq!(steps, 1);
    }

    #[test]
    fn caps_at_ten_steps() {
        let mut ts = FixedTimestep::new(1.0 / 60.0);
        let steps = ts.accumulate(1.0); // 60 steps worth, but capped at 10
        assert_eq!(steps, 10);
        // The excess past the cap is dropped, not carried.
        assert_eq!(ts.accumulate(0.0), 0);
    }

    #[test]
    fn custom_cap() {
        let mut ts = FixedTimestep::with_max_steps(0.01, 3);
        assert_eq!(ts.accumulate(1.0), 3);
    }

    #[test]
    fn negative_elapsed_is_ignored() {
        let mut ts = FixedTimestep::new(1.0 / 60.0);
        assert_eq!(ts.accumulate(-1.0), 0);
        assert_eq!(ts.accumulate(1.0 / 60.0), 1);
    }

    #[test]
    fn scheduler_fires_on_interval() {
        let start = Instant::now();
        let mut sched = TickScheduler::new(60.0);
        let interval = sched.interval();

        assert!(sched.poll(start));
        assert!(!sched.poll(start + interval / 2));
        assert!(sched.poll(start + interval));
        assert!(!sched.poll(start + interval + interval / 2));
        assert!(sched.poll(start + interval * 2));
    }

    #[test]
    fn scheduler_does_not_burst_after_stall() {
        let start = Instant::now();
        let mut sched = TickScheduler::new(60.0);
        let interval = sched.interval();

        assert!(sched.poll(start));
        let late = start + interval * 10;
        assert!(sched.poll(late));
        assert!(!sched.poll(late));
        assert!(sched.poll(late + interval));
    }

    #[test]
    fn scheduler_rejects_bad_rates() {
        let fallback = TickScheduler::new(60.0).interval();
        assert_eq!(TickScheduler::new(-5.0).interval(), fallback);
        assert_eq!(TickScheduler::new(f32::NAN).interval(), fallback);
    }

    #[test]
    fn scheduler_restart_fires_immediately() {
        let start = Instant::now();
        let mut sched = TickScheduler::new(60.0);
        assert!(sched.poll(start));
        assert!(!sched.poll(start));
        sched.restart();
        assert!(sched.poll(start));
    }
}
