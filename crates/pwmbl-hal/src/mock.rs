//! Mock sink for testing without PWM hardware
//!
//! The recording sink keeps every level it was asked to apply and can be
//! cloned freely; all clones share the same state, so a test can hand one
//! clone to the controller and inspect the other.
//!
//! # Usage
//!
//! ```
//! use pwmbl_hal::mock::RecordingSink;
//! use pwmbl_hal::{BoardVariant, IntensityController};
//!
//! let profile = BoardVariant::P4.profile();
//! let sink = RecordingSink::new();
//! let controller = IntensityController::attach(
//!     profile.calibration_curve().unwrap(),
//!     profile.default_intensity,
//!     profile.max_level,
//!     sink.clone(),
//! )
//! .unwrap();
//!
//! controller.set(255).unwrap();
//! assert_eq!(sink.applied(), vec![784, 1600]);
//! ```

use crate::sink::{PwmSink, SinkError};
use std::fmt;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

/// Reads the level the owner of the sink currently publishes
#[derive(Clone)]
pub struct LevelObserver(Arc<dyn Fn() -> Option<u32> + Send + Sync>);

impl fmt::Debug for LevelObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LevelObserver")
    }
}

/// Shared state behind every clone of a [`RecordingSink`]
#[derive(Debug, Default)]
pub struct MockSinkState {
    pub applied: Vec<u32>,
    pub fail_remaining: u32,
    pub in_flight: u32,
    pub overlaps: u32,
    /// Applies that found the published level differing from the last
    /// recorded one
    pub stale_levels: u32,
    pub apply_delay: Option<Duration>,
    pub observer: Option<LevelObserver>,
}

/// In-memory sink recording applied levels
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    state: Arc<RwLock<MockSinkState>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold each apply for `delay`, widening the window for overlap detection
    pub fn with_delay(delay: Duration) -> Self {
        let sink = Self::new();
        if let Ok(mut state) = sink.state.write() {
            state.apply_delay = Some(delay);
        }
        sink
    }

    /// Reject the next `count` applies
    pub fn fail_next(&self, count: u32) {
        if let Ok(mut state) = self.state.write() {
            state.fail_remaining = count;
        }
    }

    /// All successfully applied levels, oldest first
    pub fn applied(&self) -> Vec<u32> {
        self.state
            .read()
            .map(|s| s.applied.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<u32> {
        self.state.read().ok().and_then(|s| s.applied.last().copied())
    }

    /// Number of applies that started while another was still running
    pub fn overlaps(&self) -> u32 {
        self.state.read().map(|s| s.overlaps).unwrap_or(0)
    }

    /// Check the published level against the last recorded one on every apply.
    ///
    /// `published` returns `None` once its owner is gone.
    pub fn observe_published(
        &self,
        published: impl Fn() -> Option<u32> + Send + Sync + 'static,
    ) {
        if let Ok(mut state) = self.state.write() {
            state.observer = Some(LevelObserver(Arc::new(published)));
        }
    }

    /// Number of applies that saw a level published out of step with the sink
    pub fn stale_levels(&self) -> u32 {
        self.state.read().map(|s| s.stale_levels).unwrap_or(0)
    }

    /// Get shared state for manipulation in tests
    pub fn state(&self) -> Arc<RwLock<MockSinkState>> {
        Arc::clone(&self.state)
    }
}

impl PwmSink for RecordingSink {
    fn apply(&mut self, level: u32) -> Result<(), SinkError> {
        let delay = {
            let mut state = self.state.write().map_err(|_| SinkError::Rejected {
                level,
                reason: "mock state poisoned".into(),
            })?;

            if state.fail_remaining > 0 {
                state.fail_remaining -= 1;
                return Err(SinkError::Rejected {
                    level,
                    reason: "injected failure".into(),
                });
            }

            let published = state.observer.as_ref().and_then(|observer| (observer.0)());
            if published.is_some_and(|level| state.applied.last() != Some(&level)) {
                state.stale_levels += 1;
            }

            state.in_flight += 1;
            if state.in_flight > 1 {
                state.overlaps += 1;
            }
            state.apply_delay
        };

        if let Some(delay) = delay {
            thread::sleep(delay);
        }

        let mut state = self.state.write().map_err(|_| SinkError::Rejected {
            level,
            reason: "mock state poisoned".into(),
        })?;
        state.applied.push(level);
        state.in_flight -= 1;
        tracing::debug!("[MOCK] PWM level {}", level);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_levels() {
        let sink = RecordingSink::new();
        let mut writer = sink.clone();
        writer.apply(10).unwrap();
        writer.apply(20).unwrap();
        assert_eq!(sink.applied(), vec![10, 20]);
        assert_eq!(sink.last(), Some(20));
        assert_eq!(sink.overlaps(), 0);
    }

    #[test]
    fn test_injected_failures() {
        let sink = RecordingSink::new();
        let mut writer = sink.clone();
        sink.fail_next(2);
        assert!(writer.apply(1).is_err());
        assert!(writer.apply(2).is_err());
        assert!(writer.apply(3).is_ok());
        assert_eq!(sink.applied(), vec![3]);
    }

    #[test]
    fn test_detects_overlap() {
        let sink = RecordingSink::new();
        let mut writer = sink.clone();

        // Pretend another apply is still running
        sink.state().write().unwrap().in_flight = 1;
        writer.apply(5).unwrap();

        assert_eq!(sink.overlaps(), 1);
        assert_eq!(sink.state().read().unwrap().in_flight, 1);
    }

    #[test]
    fn test_flags_stale_published_level() {
        let sink = RecordingSink::new();
        let mut writer = sink.clone();
        writer.apply(100).unwrap();

        sink.observe_published(|| Some(100));
        writer.apply(200).unwrap();
        assert_eq!(sink.stale_levels(), 0);

        // Owner still reports 100 although 200 reached the sink
        writer.apply(300).unwrap();
        assert_eq!(sink.stale_levels(), 1);
    }

    #[test]
    fn test_gone_owner_is_not_stale() {
        let sink = RecordingSink::new();
        let mut writer = sink.clone();
        sink.observe_published(|| None);
        writer.apply(1).unwrap();
        writer.apply(2).unwrap();
        assert_eq!(sink.stale_levels(), 0);
    }

    #[test]
    fn test_poisoned_state_rejects_apply() {
        let sink = RecordingSink::with_delay(Duration::from_millis(300));
        let mut writer = sink.clone();
        let applying = thread::spawn(move || writer.apply(7));

        // Poison the state while the apply is sleeping
        thread::sleep(Duration::from_millis(50));
        let state = sink.state();
        let _ = thread::spawn(move || {
            let _guard = state.write().unwrap();
            panic!("poison the mock state");
        })
        .join();

        assert!(matches!(
            applying.join().unwrap(),
            Err(SinkError::Rejected { level: 7, .. })
        ));
    }
}
