//! Fixed-width windowing of the sorted message stream.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use timeline_core::config::TimelineConfig;
use timeline_core::error::{Result, TimelineError};
use timeline_core::models::{NormalizedMessage, Timeline, TimeWindow};
use tracing::debug;

// ── TimelineAggregator ────────────────────────────────────────────────────────

/// Buckets messages into contiguous windows of one fixed width.
///
/// The first window closes one width after the first message (truncated to
/// whole seconds). A message belongs to the open window while its timestamp
/// is at or before the closing boundary; idle stretches produce empty windows
/// so the timeline never has holes.
pub struct TimelineAggregator {
    window: TimeDelta,
}

impl TimelineAggregator {
    pub fn new(window: TimeDelta) -> Result<Self> {
        if window <= TimeDelta::zero() {
            return Err(TimelineError::Config(format!(
                "window must be positive, got {}s",
                window.num_seconds()
            )));
        }
        Ok(Self { window })
    }

    pub fn from_config(config: &TimelineConfig) -> Result<Self> {
        Self::new(config.window()?)
    }

    /// Build the timeline. `messages` must already be sorted by timestamp.
    pub fn build(&self, messages: &[NormalizedMessage]) -> Result<Timeline> {
        let first = messages.first().ok_or(TimelineError::EmptyInput)?;

        let mut boundary = self.advance(Self::truncate_to_second(first.timestamp()))?;
        let mut current = TimeWindow::empty(boundary, self.window);
        let mut windows: Vec<TimeWindow> = Vec::new();
        let mut gap_windows = 0usize;

        for message in messages {
            if message.timestamp() > boundary {
                windows.push(current);
                boundary = self.advance(boundary)?;

                while message.timestamp() > boundary {
                    windows.push(TimeWindow::empty(boundary, self.window));
                    boundary = self.advance(boundary)?;
                    gap_windows += 1;
                }
                current = TimeWindow::empty(boundary, self.window);
            }
            current.add_message(message);
        }
        windows.push(current);

        debug!(
            "Built {} windows ({} empty) from {} messages",
            windows.len(),
            gap_windows,
            messages.len()
        );

        Ok(Timeline::from_windows(self.window, windows))
    }

    /// The boundary one window after `boundary`.
    fn advance(&self, boundary: DateTime<Utc>) -> Result<DateTime<Utc>> {
        boundary.checked_add_signed(self.window).ok_or_else(|| {
            TimelineError::Config(format!(
                "window of {}s after {} is past the last representable time",
                self.window.num_seconds(),
                boundary
            ))
        })
    }

    fn truncate_to_second(ts: DateTime<Utc>) -> DateTime<Utc> {
        ts.duration_trunc(TimeDelta::seconds(1)).unwrap_or(ts)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeSet;

    fn at(h: u32, m: u32, s: u32, millis: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 10, h, m, s).unwrap() + TimeDelta::milliseconds(millis)
    }

    fn msg(id: &str, ts: DateTime<Utc>, tokens: &[&str], emotes: &[&str]) -> NormalizedMessage {
        let set = |words: &[&str]| words.iter().map(|w| w.to_string()).collect::<BTreeSet<_>>();
        NormalizedMessage::new(id, ts, set(tokens), set(emotes))
    }

    fn minute() -> TimelineAggregator {
        TimelineAggregator::new(TimeDelta::seconds(60)).unwrap()
    }

    // ── build ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_empty_input_is_error() {
        assert!(matches!(minute().build(&[]), Err(TimelineError::EmptyInput)));
    }

    #[test]
    fn test_two_messages_two_windows() {
        let messages = vec![
            msg("1", at(12, 0, 0, 200), &["Hello world"], &[]),
            msg("2", at(12, 1, 10, 0), &[], &["Kappa"]),
        ];
        let timeline = minute().build(&messages).unwrap();

        let points: Vec<_> = timeline.points().collect();
        assert_eq!(points.len(), 2);

        assert_eq!(points[0].0, at(12, 1, 0, 0));
        assert_eq!(points[0].1, 1);
        assert_eq!(points[0].2.get("Hello world"), Some(&1));

        assert_eq!(points[1].0, at(12, 2, 0, 0));
        assert_eq!(points[1].1, 1);
        assert_eq!(points[1].2.get("Kappa"), Some(&1));
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let messages = vec![
            msg("1", at(12, 0, 0, 0), &["a"], &[]),
            msg("2", at(12, 1, 0, 0), &["b"], &[]),
            msg("3", at(12, 1, 0, 1), &["c"], &[]),
        ];
        let timeline = minute().build(&messages).unwrap();
        let counts: Vec<u64> = timeline.windows().iter().map(|w| w.message_count).collect();
        assert_eq!(counts, vec![2, 1]);
    }

    #[test]
    fn test_gap_filled_with_empty_windows() {
        let t = at(12, 0, 0, 0);
        let messages = vec![
            msg("1", t, &["a"], &[]),
            msg("2", t + TimeDelta::seconds(210), &["b"], &[]),
        ];
        let timeline = minute().build(&messages).unwrap();

        let counts: Vec<u64> = timeline.windows().iter().map(|w| w.message_count).collect();
        // Closing boundaries 12:01, 12:02, 12:03, 12:04; the second message
        // at 12:03:30 lands in the window closing at 12:04.
        assert_eq!(counts, vec![1, 0, 0, 1]);
        assert!(timeline.windows()[1].word_counts.is_empty());
        assert_eq!(timeline.windows()[3].end, at(12, 4, 0, 0));
    }

    #[test]
    fn test_windows_are_contiguous() {
        let t = at(12, 0, 0, 0);
        let messages = vec![
            msg("1", t, &["a"], &[]),
            msg("2", t + TimeDelta::seconds(61), &["a"], &[]),
            msg("3", t + TimeDelta::seconds(600), &["a"], &[]),
        ];
        let timeline = minute().build(&messages).unwrap();

        for pair in timeline.windows().windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert_eq!(pair[1].end - pair[0].end, TimeDelta::seconds(60));
        }
        assert_eq!(timeline.total_messages(), 3);
        assert_eq!(timeline.len(), 10);
    }

    #[test]
    fn test_word_counted_once_per_message() {
        let t = at(12, 0, 0, 0);
        let messages = vec![
            msg("1", t, &["cat"], &["Kappa"]),
            msg("2", t + TimeDelta::seconds(5), &["cat", "dog"], &[]),
            msg("3", t + TimeDelta::seconds(6), &[], &[]),
        ];
        let timeline = minute().build(&messages).unwrap();
        let window = &timeline.windows()[0];

        assert_eq!(window.message_count, 3);
        assert_eq!(window.count_of("cat"), 2);
        assert_eq!(window.count_of("dog"), 1);
        assert_eq!(window.count_of("Kappa"), 1);
        assert_eq!(window.count_of("bird"), 0);
    }

    #[test]
    fn test_first_window_anchored_to_whole_second() {
        let messages = vec![msg("1", at(12, 0, 5, 900), &["a"], &[])];
        let timeline = minute().build(&messages).unwrap();
        assert_eq!(timeline.windows()[0].start, at(12, 0, 5, 0));
        assert_eq!(timeline.windows()[0].end, at(12, 1, 5, 0));
    }

    #[test]
    fn test_build_is_deterministic() {
        let t = at(12, 0, 0, 0);
        let messages: Vec<_> = (0..50)
            .map(|i| msg(&i.to_string(), t + TimeDelta::seconds(i * 17), &["w"], &[]))
            .collect();
        let a = minute().build(&messages).unwrap();
        let b = minute().build(&messages).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_window_past_end_of_time_is_error() {
        let aggregator = TimelineAggregator::new(TimeDelta::weeks(1)).unwrap();
        let late = DateTime::<Utc>::MAX_UTC - TimeDelta::days(1);
        let err = aggregator.build(&[msg("a", late, &["x"], &[])]).unwrap_err();
        assert!(matches!(err, TimelineError::Config(_)), "{err}");
    }

    #[test]
    fn test_from_config_rejects_unrepresentable_window() {
        let config = TimelineConfig {
            window_secs: u64::MAX,
            ..TimelineConfig::default()
        };
        assert!(TimelineAggregator::from_config(&config).is_err());
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(TimelineAggregator::new(TimeDelta::zero()).is_err());
    }
}
