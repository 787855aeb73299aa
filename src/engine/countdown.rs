//! Countdown - Generation-tagged schedule of timed countdown steps
//!
//! The countdown never blocks the frame loop. Starting it queues every step
//! with its due time; each frame drains the steps whose time has come.
//! Steps carry the generation they were queued under, and cancelling bumps
//! the generation, so nothing queued before a reset can ever fire after it.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::engine::error::ConfigError;

/// Longest a single label or gap may last (seconds)
pub const MAX_STEP_SECS: f32 = 60.0;

/// Countdown labels and timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountdownConfig {
    /// Labels shown in order, the last one being the go signal
    pub labels: Vec<String>,
    /// How long each label stays on screen (seconds)
    pub hold_secs: f32,
    /// Blank gap after each label (seconds)
    pub gap_secs: f32,
}

impl CountdownConfig {
    fn hold(&self) -> Duration {
        seconds(self.hold_secs)
    }

    fn gap(&self) -> Duration {
        seconds(self.gap_secs)
    }

    /// Reject timings outside `0..=MAX_STEP_SECS`
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("hold_secs", self.hold_secs), ("gap_secs", self.gap_secs)] {
            if !(0.0..=MAX_STEP_SECS).contains(&value) {
                return Err(ConfigError::CountdownTiming {
                    field,
                    value,
                    max: MAX_STEP_SECS,
                });
            }
        }
        Ok(())
    }
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            labels: vec!["3".into(), "2".into(), "1".into(), "GO!".into()],
            hold_secs: 0.7,
            gap_secs: 0.15,
        }
    }
}

/// Unvalidated timings are capped at `MAX_STEP_SECS`, negative or NaN is zero
fn seconds(secs: f32) -> Duration {
    if secs.is_nan() {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f32(secs.min(MAX_STEP_SECS)).unwrap_or(Duration::ZERO)
}

fn later(at: Instant, by: Duration) -> Instant {
    at.checked_add(by).unwrap_or(at)
}

/// A single countdown action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownStep {
    /// Show a label and fire its tick cue
    Show(String),
    /// Clear the overlay between labels
    Blank,
    /// Sequence complete, the race begins
    Start,
}

#[derive(Debug, Clone)]
struct ScheduledStep {
    due: Instant,
    generation: u64,
    step: CountdownStep,
}

/// Pending countdown steps for the current generation
#[derive(Debug, Clone, Default)]
pub struct CountdownSchedule {
    generation: u64,
    steps: VecDeque<ScheduledStep>,
}

impl CountdownSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a full countdown starting at `now`, invalidating any earlier one.
    ///
    /// Returns the generation the new steps were tagged with.
    pub fn begin(&mut self, now: Instant, config: &CountdownConfig) -> u64 {
        self.cancel();

        let slot = config.hold() + config.gap();
        let mut at = now;
        for label in &config.labels {
            self.push(at, CountdownStep::Show(label.clone()));
            self.push(later(at, config.hold()), CountdownStep::Blank);
            at = later(at, slot);
        }
        self.push(at, CountdownStep::Start);

        self.generation
    }

    fn push(&mut self, due: Instant, step: CountdownStep) {
        self.steps.push_back(ScheduledStep {
            due,
            generation: self.generation,
            step,
        });
    }

    /// Drop every queued step and move to a new generation
    pub fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.steps.clear();
    }

    /// Remove and return the steps due at `now`, oldest first
    pub fn drain_due(&mut self, now: Instant) -> Vec<CountdownStep> {
        let mut due = Vec::new();
        while self.steps.front().is_some_and(|s| s.due <= now) {
            if let Some(scheduled) = self.steps.pop_front() {
                if scheduled.generation == self.generation {
                    due.push(scheduled.step);
                }
            }
        }
        due
    }

    pub fn is_pending(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Cue key for a countdown label: `"3"` becomes `"tick:3"`, `"GO!"` becomes `"tick:go"`
pub fn tick_cue_name(label: &str) -> String {
    let key: String = label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    format!("tick:{}", key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn steps_fire_in_order_at_their_due_times() {
        let t0 = Instant::now();
        let config = CountdownConfig {
            labels: vec!["2".into(), "1".into()],
            hold_secs: 0.5,
            gap_secs: 0.1,
        };
        let mut schedule = CountdownSchedule::new();
        schedule.begin(t0, &config);

        assert_eq!(schedule.drain_due(t0), vec![CountdownStep::Show("2".into())]);
        assert!(schedule.drain_due(t0 + ms(499)).is_empty());
        assert_eq!(schedule.drain_due(t0 + ms(500)), vec![CountdownStep::Blank]);
        assert_eq!(
            schedule.drain_due(t0 + ms(1101)),
            vec![CountdownStep::Show("1".into()), CountdownStep::Blank]
        );
        assert!(schedule.is_pending());
        assert_eq!(schedule.drain_due(t0 + ms(1201)), vec![CountdownStep::Start]);
        assert!(!schedule.is_pending());
    }

    #[test]
    fn stalled_frame_drains_everything_due() {
        let t0 = Instant::now();
        let mut schedule = CountdownSchedule::new();
        schedule.begin(t0, &CountdownConfig::default());
        let steps = schedule.drain_due(t0 + ms(10_000));
        assert_eq!(steps.len(), 9);
        assert_eq!(steps.last(), Some(&CountdownStep::Start));
    }

    #[test]
    fn cancel_prevents_queued_steps() {
        let t0 = Instant::now();
        let mut schedule = CountdownSchedule::new();
        let first = schedule.begin(t0, &CountdownConfig::default());
        schedule.drain_due(t0);
        schedule.cancel();
        assert_ne!(schedule.generation(), first);
        assert!(schedule.drain_due(t0 + ms(10_000)).is_empty());
    }

    #[test]
    fn oversized_timings_are_capped() {
        let t0 = Instant::now();
        let config = CountdownConfig {
            labels: vec!["GO!".into()],
            hold_secs: 1e30,
            gap_secs: f32::NAN,
        };
        assert!(config.validate().is_err());

        let mut schedule = CountdownSchedule::new();
        schedule.begin(t0, &config);
        assert_eq!(schedule.drain_due(t0), vec![CountdownStep::Show("GO!".into())]);
        let cap = Duration::from_secs_f32(MAX_STEP_SECS);
        assert!(schedule.drain_due(t0 + cap - ms(1)).is_empty());
        assert_eq!(
            schedule.drain_due(t0 + cap),
            vec![CountdownStep::Blank, CountdownStep::Start]
        );
    }

    #[test]
    fn default_timings_are_valid() {
        assert!(CountdownConfig::default().validate().is_ok());
    }

    #[test]
    fn cue_names() {
        assert_eq!(tick_cue_name("3"), "tick:3");
        assert_eq!(tick_cue_name("GO!"), "tick:go");
    }
}
