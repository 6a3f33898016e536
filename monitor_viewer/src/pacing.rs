use std::time::{Duration, Instant};

/// Longest step handed to the compositor after a stall.
const MAX_STEP: Duration = Duration::from_millis(100);

/// Fixed-rate frame scheduling for the event loop.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Duration,
    next: Instant,
    last: Instant,
}

impl FramePacer {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next: now,
            last: now,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.next
    }

    pub fn due(&self, now: Instant) -> bool {
        now >= self.next
    }

    /// Mark a frame as started at `now` and return the seconds since the
    /// previous one, capped at [`MAX_STEP`]. A late frame pushes the schedule
    /// back rather than bunching frames to catch up.
    pub fn begin_frame(&mut self, now: Instant) -> f32 {
        let dt = now.saturating_duration_since(self.last).min(MAX_STEP);
        self.last = now;
        self.next += self.interval;
        if self.next <= now {
            self.next = now + self.interval;
        }
        dt.as_secs_f32()
    }
}
