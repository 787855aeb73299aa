//! Race - Race clock and phase machine
//!
//! Owns the race phase, the countdown schedule, start timestamp and runners.
//! Everything advances from [`Race::update`], called once per rendered frame.
//! The race itself has no side effects: it reports what happened as
//! [`RaceEvent`]s and the session turns those into cues, actor playback
//! changes and scoreboard updates.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::engine::countdown::{CountdownConfig, CountdownSchedule, CountdownStep};
use crate::engine::runner::{Runner, RunnerSnapshot, RunnerState, SpeedRange};
use crate::engine::track::TrackLayout;

/// Race configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub track: TrackLayout,
    /// Distribution each runner's race speed is drawn from
    pub speed: SpeedRange,
    pub countdown: CountdownConfig,
    /// Upper bound on the per-frame delta (seconds)
    pub max_frame_delta: f32,
    /// Actor playback rate while running
    pub running_playback_speed: f32,
    /// Actor playback rate after crossing the line
    pub finished_playback_speed: f32,
    /// Seed for speed sampling, entropy when unset
    pub seed: Option<u64>,
    /// Model loaded for every lane's actor
    pub actor_model: String,
    /// Animation clip played by every actor
    pub actor_clip: String,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            track: TrackLayout::default(),
            speed: SpeedRange::default(),
            countdown: CountdownConfig::default(),
            max_frame_delta: 0.05,
            running_playback_speed: 2.2,
            finished_playback_speed: 0.6,
            seed: None,
            actor_model: "runner.glb".into(),
            actor_clip: "Run".into(),
        }
    }
}

/// Race phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacePhase {
    Idle,
    Countdown,
    Running,
    Finished,
}

/// Something that happened during a start, reset or frame update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RaceEvent {
    CountdownBegan,
    /// A countdown label went up
    CountdownLabel(String),
    /// The countdown overlay cleared between labels
    CountdownBlank,
    /// Start signal, the clock is running
    Started,
    RunnerFinished { lane: usize, finish_time: f32 },
    /// Every runner is across the line
    AllFinished { elapsed: f32 },
    Reset,
}

/// Complete race state
#[derive(Debug, Clone)]
pub struct Race {
    config: RaceConfig,
    phase: RacePhase,
    runners: Vec<RunnerState>,
    countdown: CountdownSchedule,
    /// Countdown label currently on screen
    overlay: Option<String>,
    start_timestamp: Option<Instant>,
    last_frame: Option<Instant>,
    /// Clock value frozen at the moment the last runner finished
    final_elapsed: Option<f32>,
    rng: StdRng,
}

impl Race {
    /// Create an idle race with speeds drawn from the configured range
    pub fn new(config: RaceConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut race = Self::empty(config, rng);
        race.setup_runners(None);
        race
    }

    /// Create an idle race with fixed speeds, one per lane.
    ///
    /// Lanes without an entry get the floor of the speed range. Later resets
    /// draw fresh speeds from the seeded generator.
    pub fn with_speeds(config: RaceConfig, speeds: &[f32]) -> Self {
        let rng = StdRng::seed_from_u64(config.seed.unwrap_or_default());
        let mut race = Self::empty(config, rng);
        race.setup_runners(Some(speeds));
        race
    }

    fn empty(config: RaceConfig, rng: StdRng) -> Self {
        Self {
            config,
            phase: RacePhase::Idle,
            runners: Vec::new(),
            countdown: CountdownSchedule::new(),
            overlay: None,
            start_timestamp: None,
            last_frame: None,
            final_elapsed: None,
            rng,
        }
    }

    fn setup_runners(&mut self, speeds: Option<&[f32]>) {
        let floor = self.config.speed.floor;
        self.runners = self
            .config
            .track
            .lane_offsets()
            .iter()
            .enumerate()
            .map(|(i, &offset)| {
                let speed = match speeds {
                    Some(fixed) => fixed.get(i).copied().unwrap_or(floor),
                    None => self.config.speed.sample(&mut self.rng),
                };
                RunnerState::new(i + 1, offset, speed)
            })
            .collect();
    }

    /// Put every runner back on the start line with a freshly drawn speed
    fn restore_runners(&mut self) {
        for runner in &mut self.runners {
            let speed = self.config.speed.sample(&mut self.rng);
            runner.reset(speed);
        }
        self.start_timestamp = None;
        self.final_elapsed = None;
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn track(&self) -> &TrackLayout {
        &self.config.track
    }

    pub fn phase(&self) -> RacePhase {
        self.phase
    }

    pub fn runners(&self) -> &[RunnerState] {
        &self.runners
    }

    /// Countdown label currently shown, if any
    pub fn overlay(&self) -> Option<&str> {
        self.overlay.as_deref()
    }

    /// Seconds since the start signal, frozen once everyone has finished
    pub fn elapsed(&self, now: Instant) -> f32 {
        match self.phase {
            RacePhase::Running => self
                .start_timestamp
                .map(|start| now.saturating_duration_since(start).as_secs_f32())
                .unwrap_or(0.0),
            RacePhase::Finished => self.final_elapsed.unwrap_or(0.0),
            RacePhase::Idle | RacePhase::Countdown => 0.0,
        }
    }

    /// Begin the countdown.
    ///
    /// Valid from Idle and Finished. A restart from Finished puts the field
    /// back on the start line first. While a countdown or race is already in
    /// progress this does nothing.
    pub fn start(&mut self, now: Instant) -> Vec<RaceEvent> {
        match self.phase {
            RacePhase::Countdown | RacePhase::Running => {
                log::debug!("Start ignored, race already in {:?}", self.phase);
                return Vec::new();
            }
            RacePhase::Finished => self.restore_runners(),
            RacePhase::Idle => {}
        }

        let generation = self.countdown.begin(now, &self.config.countdown);
        self.phase = RacePhase::Countdown;
        self.last_frame = Some(now);
        log::info!("Countdown started (generation {})", generation);

        let mut events = vec![RaceEvent::CountdownBegan];
        self.run_countdown(now, &mut events);
        events
    }

    /// Return to Idle from any phase, cancelling an in-flight countdown
    pub fn reset(&mut self, now: Instant) -> Vec<RaceEvent> {
        self.countdown.cancel();
        self.overlay = None;
        self.restore_runners();
        self.phase = RacePhase::Idle;
        self.last_frame = Some(now);
        log::info!("Race reset");
        vec![RaceEvent::Reset]
    }

    /// Clamped time since the previous frame
    fn frame_delta(&mut self, now: Instant) -> f32 {
        let delta = self
            .last_frame
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::ZERO);
        self.last_frame = Some(now);
        delta.as_secs_f32().min(self.config.max_frame_delta)
    }

    /// Update race state for one rendered frame
    pub fn update(&mut self, now: Instant) -> Vec<RaceEvent> {
        let delta = self.frame_delta(now);
        let mut events = Vec::new();

        match self.phase {
            RacePhase::Idle | RacePhase::Finished => {}

            RacePhase::Countdown => self.run_countdown(now, &mut events),

            RacePhase::Running => {
                let elapsed = self.elapsed(now);
                let finish_distance = self.config.track.finish_distance();

                for runner in &mut self.runners {
                    if runner.finished {
                        continue;
                    }
                    *runner = Runner::advance(runner, delta, finish_distance, elapsed);
                    if let Some(finish_time) = runner.finish_time {
                        log::debug!("Lane {} finished in {:.2}s", runner.lane, finish_time);
                        events.push(RaceEvent::RunnerFinished {
                            lane: runner.lane,
                            finish_time,
                        });
                    }
                }

                if self.runners.iter().all(|r| r.finished) {
                    self.phase = RacePhase::Finished;
                    self.final_elapsed = Some(elapsed);
                    log::info!("Race finished after {:.2}s", elapsed);
                    events.push(RaceEvent::AllFinished { elapsed });
                }
            }
        }

        events
    }

    fn run_countdown(&mut self, now: Instant, events: &mut Vec<RaceEvent>) {
        for step in self.countdown.drain_due(now) {
            match step {
                CountdownStep::Show(label) => {
                    log::debug!("Countdown {}", label);
                    self.overlay = Some(label.clone());
                    events.push(RaceEvent::CountdownLabel(label));
                }
                CountdownStep::Blank => {
                    self.overlay = None;
                    events.push(RaceEvent::CountdownBlank);
                }
                CountdownStep::Start => {
                    self.overlay = None;
                    self.start_timestamp = Some(now);
                    self.phase = RacePhase::Running;
                    log::info!("Race started");
                    events.push(RaceEvent::Started);
                }
            }
        }
    }

    /// Get compact runner snapshots for the renderer
    pub fn runner_snapshots(&self) -> Vec<RunnerSnapshot> {
        self.runners.iter().map(RunnerSnapshot::from).collect()
    }
}
