//! Periodic re-evaluation of the batch suggestion.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::observability;
use crate::sessions::{SessionMatcher, Suggestion};

/// Keeps the latest suggestion in a watch channel, recomputing it on a
/// fixed period. The timer task is aborted when the refresher is dropped.
#[derive(Debug)]
pub struct SuggestionRefresher {
    rx: watch::Receiver<Suggestion>,
    handle: JoinHandle<()>,
}

impl SuggestionRefresher {
    /// Evaluate once right away, then every `period`. Must be called from
    /// within a tokio runtime.
    pub fn spawn(matcher: SessionMatcher, period: Duration, clock: Arc<dyn Clock>) -> Self {
        let period = period.max(Duration::from_millis(1));
        let (tx, rx) = watch::channel(matcher.suggest(clock.week_time()));
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the initial value is
            // already in the channel.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let next = matcher.suggest(clock.week_time());
                observability::record_refresh(next.status.as_str());
                tx.send_if_modified(|current| {
                    if *current == next {
                        return false;
                    }
                    tracing::debug!(
                        batch = %next.batch_id,
                        status = next.status.as_str(),
                        "batch suggestion changed"
                    );
                    *current = next;
                    true
                });
                if tx.is_closed() {
                    break;
                }
            }
        });
        Self { rx, handle }
    }

    pub fn subscribe(&self) -> watch::Receiver<Suggestion> {
        self.rx.clone()
    }

    pub fn current(&self) -> Suggestion {
        self.rx.borrow().clone()
    }

    /// Cancel the timer. Equivalent to dropping the refresher.
    pub fn stop(self) {}
}

impl Drop for SuggestionRefresher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::sessions::{SuggestionStatus, WeekTime};
    use chrono::Weekday;
    use std::sync::atomic::{AtomicU16, Ordering};

    /// Monday clock whose minute can be moved by the test.
    struct MovableClock(AtomicU16);

    impl Clock for MovableClock {
        fn week_time(&self) -> WeekTime {
            WeekTime::new(Weekday::Mon, self.0.load(Ordering::SeqCst)).expect("minute")
        }

        fn today(&self) -> String {
            "2024-03-04".into()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn initial_value_is_available_immediately() {
        let clock = Arc::new(MovableClock(AtomicU16::new(390)));
        let refresher =
            SuggestionRefresher::spawn(SessionMatcher::default(), Duration::from_secs(60), clock);
        assert_eq!(
            refresher.current(),
            Suggestion::new("morning", SuggestionStatus::Upcoming)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn tick_publishes_new_suggestion() {
        let clock = Arc::new(MovableClock(AtomicU16::new(390)));
        let refresher = SuggestionRefresher::spawn(
            SessionMatcher::default(),
            Duration::from_secs(60),
            clock.clone(),
        );
        let mut rx = refresher.subscribe();
        clock.0.store(425, Ordering::SeqCst);
        rx.changed().await.expect("refresher alive");
        assert_eq!(
            *rx.borrow(),
            Suggestion::new("morning", SuggestionStatus::Current)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_suggestion_does_not_notify() {
        let clock = Arc::new(MovableClock(AtomicU16::new(390)));
        let refresher =
            SuggestionRefresher::spawn(SessionMatcher::default(), Duration::from_secs(60), clock);
        let mut rx = refresher.subscribe();
        let waited = tokio::time::timeout(Duration::from_secs(600), rx.changed()).await;
        assert!(waited.is_err(), "no change expected while the clock stands still");
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_refresher_stops_the_timer() {
        let clock = Arc::new(MovableClock(AtomicU16::new(390)));
        let refresher =
            SuggestionRefresher::spawn(SessionMatcher::default(), Duration::from_secs(60), clock);
        let mut rx = refresher.subscribe();
        refresher.stop();
        assert!(rx.changed().await.is_err());
    }
}
