use std::time::{Duration, Instant};

/// Timer state for auto-play. The session advances once per elapsed
/// interval when ticked.
#[derive(Debug, Clone)]
pub struct Autoplay {
    interval: Duration,
    last_advance: Instant,
}

impl Autoplay {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Autoplay {
            interval,
            last_advance: now,
        }
    }

    /// True, and restarts the interval, when it has elapsed at `now`.
    pub fn due(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_advance) >= self.interval {
            self.last_advance = now;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_interval() {
        let start = Instant::now();
        let mut timer = Autoplay::new(Duration::from_millis(100), start);
        assert!(!timer.due(start + Duration::from_millis(50)));
        assert!(timer.due(start + Duration::from_millis(100)));
        assert!(!timer.due(start + Duration::from_millis(150)));
        assert!(timer.due(start + Duration::from_millis(250)));
    }
}
