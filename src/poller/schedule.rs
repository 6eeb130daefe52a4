use crate::constants::DEFAULT_POLL_SCHEDULE_SECS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delays between the balance polls of a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSchedule {
    /// Delay before each poll, relative to the previous one.
    #[serde(with = "crate::serde::duration::vec")]
    pub delays: Vec<Duration>,
    /// Stop watching once this much time has elapsed, defaults to the sum of the delays.
    #[serde(
        default,
        with = "crate::serde::duration::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_elapsed: Option<Duration>,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            delays: DEFAULT_POLL_SCHEDULE_SECS.into_iter().map(Duration::from_secs).collect(),
            max_elapsed: None,
        }
    }
}

impl PollSchedule {
    /// Creates a schedule from the given delays.
    pub fn new(delays: impl IntoIterator<Item = Duration>) -> Self {
        Self { delays: delays.into_iter().collect(), max_elapsed: None }
    }

    /// Caps the total time spent watching.
    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = Some(max_elapsed);
        self
    }

    /// Returns the delays to sleep before each poll, truncated to `max_elapsed`.
    pub fn iter(&self) -> impl Iterator<Item = Duration> + '_ {
        let limit = self.max_elapsed.unwrap_or(Duration::MAX);
        self.delays
            .iter()
            .scan(Duration::ZERO, move |elapsed, delay| {
                *elapsed = elapsed.saturating_add(*delay);
                (*elapsed <= limit).then_some(*delay)
            })
    }

    /// Total time spent watching if nothing is observed.
    pub fn total(&self) -> Duration {
        self.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_dense_then_sparse() {
        let schedule = PollSchedule::default();
        let delays: Vec<_> = schedule.iter().collect();

        assert_eq!(delays.len(), 12);
        assert!(delays[..5].iter().all(|delay| *delay <= Duration::from_secs(5)));
        assert!(delays.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(schedule.total(), Duration::from_secs(1151));
    }

    #[test]
    fn max_elapsed_truncates() {
        let schedule = PollSchedule::default().with_max_elapsed(Duration::from_secs(20));
        let delays: Vec<_> = schedule.iter().map(|delay| delay.as_secs()).collect();
        assert_eq!(delays, [1, 2, 3, 5, 5]);
    }

    #[test]
    fn yaml_seconds() {
        let schedule: PollSchedule =
            serde_yaml::from_str("delays: [1, 2, 60]\nmaxElapsed: 30\n").unwrap();
        assert_eq!(schedule.total(), Duration::from_secs(3));
    }
}
