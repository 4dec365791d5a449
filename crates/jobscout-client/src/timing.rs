//! Randomized pauses that make request timing look less mechanical.

use std::ops::Range;
use std::time::Duration;

use rand::Rng;

/// Pre/post request delays for HTTP executors.
#[derive(Debug, Clone)]
pub struct HumanTiming {
    pub before: Range<Duration>,
    pub after: Range<Duration>,
}

impl Default for HumanTiming {
    fn default() -> Self {
        Self {
            before: Duration::from_millis(1000)..Duration::from_millis(3000),
            after: Duration::from_millis(500)..Duration::from_millis(2000),
        }
    }
}

impl HumanTiming {
    /// No waiting at all (tests, offline runs).
    pub fn none() -> Self {
        Self {
            before: Duration::ZERO..Duration::ZERO,
            after: Duration::ZERO..Duration::ZERO,
        }
    }

    pub async fn pause_before(&self) {
        sleep_in(&self.before).await;
    }

    pub async fn pause_after(&self) {
        sleep_in(&self.after).await;
    }
}

/// What a browser session does on a page before reading it.
#[derive(Debug, Clone)]
pub struct BrowserBehavior {
    pub scrolls: Range<u32>,
    pub mouse_moves: Range<u32>,
    pub read_pause: Range<Duration>,
    /// Chance of pausing to "read" at all.
    pub read_probability: f64,
}

impl Default for BrowserBehavior {
    fn default() -> Self {
        Self {
            scrolls: 2..7,
            mouse_moves: 2..6,
            read_pause: Duration::from_secs(1)..Duration::from_secs(3),
            read_probability: 0.5,
        }
    }
}

impl BrowserBehavior {
    pub fn none() -> Self {
        Self {
            scrolls: 0..0,
            mouse_moves: 0..0,
            read_pause: Duration::ZERO..Duration::ZERO,
            read_probability: 0.0,
        }
    }

    pub fn scroll_count(&self) -> u32 {
        pick_count(&self.scrolls)
    }

    pub fn mouse_move_count(&self) -> u32 {
        pick_count(&self.mouse_moves)
    }

    /// `Some(pause)` when this page gets a reading pause.
    pub fn reading_pause(&self) -> Option<Duration> {
        let mut rng = rand::thread_rng();
        if self.read_probability <= 0.0 || !rng.gen_bool(self.read_probability.min(1.0)) {
            return None;
        }
        Some(pick_duration(&self.read_pause))
    }
}

/// A uniformly random duration in `range` (its start when empty).
pub fn pick_duration(range: &Range<Duration>) -> Duration {
    if range.is_empty() {
        return range.start;
    }
    let millis = rand::thread_rng().gen_range(range.start.as_millis() as u64..range.end.as_millis() as u64);
    Duration::from_millis(millis)
}

fn pick_count(range: &Range<u32>) -> u32 {
    if range.is_empty() {
        return range.start;
    }
    rand::thread_rng().gen_range(range.clone())
}

async fn sleep_in(range: &Range<Duration>) {
    let delay = pick_duration(range);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_duration_stays_in_range() {
        let range = Duration::from_millis(10)..Duration::from_millis(20);
        for _ in 0..100 {
            let d = pick_duration(&range);
            assert!(d >= range.start && d < range.end);
        }
        assert_eq!(pick_duration(&(Duration::ZERO..Duration::ZERO)), Duration::ZERO);
    }

    #[test]
    fn test_behavior_counts() {
        let behavior = BrowserBehavior::default();
        for _ in 0..50 {
            assert!((2..7).contains(&behavior.scroll_count()));
            assert!((2..6).contains(&behavior.mouse_move_count()));
        }
        let none = BrowserBehavior::none();
        assert_eq!(none.scroll_count(), 0);
        assert_eq!(none.reading_pause(), None);
    }

    #[tokio::test]
    async fn test_no_timing_returns_immediately() {
        let start = std::time::Instant::now();
        HumanTiming::none().pause_before().await;
        HumanTiming::none().pause_after().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
