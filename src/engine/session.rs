//! Session - The race session object driven by the frame loop
//!
//! One session is constructed at application start and lives until exit. It
//! owns the race, the camera rig, the name and personal-best tables and the
//! external services, and turns race events into cues, actor playback changes
//! and scoreboard updates. All calls happen on the frame/event thread.

use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::engine::camera::{CameraConfig, CameraRig, CameraState};
use crate::engine::config::AppConfig;
use crate::engine::race::{Race, RaceEvent, RacePhase};
use crate::engine::runner::RunnerSnapshot;
use crate::engine::scoreboard::{rank, NameTable, PersonalBestTable, ScoreEntry};
use crate::engine::services::{ActorHandle, ActorService, Cue, CueService};
use crate::engine::store::KeyValueStore;

/// Number of frames the average frame time is taken over
const STATS_WINDOW: usize = 60;

/// Everything the renderer needs for one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub phase: RacePhase,
    /// Countdown label on screen, if any
    pub countdown_label: Option<String>,
    pub elapsed: f32,
    pub runners: Vec<RunnerSnapshot>,
    pub camera: CameraState,
    pub scoreboard: Vec<ScoreEntry>,
    /// Lanes that crossed the line during this frame
    pub finish_flashes: Vec<usize>,
    pub finisher_count: u32,
    /// Race events raised by this frame
    pub events: Vec<RaceEvent>,
}

/// Session statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub frames: u64,
    pub avg_frame_time_ms: f32,
    pub runner_count: u32,
    pub phase: RacePhase,
}

/// Explicit race session
pub struct RaceSession {
    race: Race,
    camera: CameraRig,
    names: NameTable,
    bests: PersonalBestTable,
    store: Box<dyn KeyValueStore + Send>,
    actors: Option<Box<dyn ActorService + Send>>,
    cues: Option<Box<dyn CueService + Send>>,
    /// Actor per lane, `None` where loading failed
    actor_handles: Vec<Option<ActorHandle>>,
    scoreboard: Vec<ScoreEntry>,
    /// Names whose best was set by the last finalized race
    records: Vec<String>,
    finish_flashes: Vec<usize>,
    frame_events: Vec<RaceEvent>,
    last_frame: Option<Instant>,
    frames: u64,
    frame_times: VecDeque<f32>,
}

impl RaceSession {
    /// Create a session from config, loading names and bests from `store`
    pub fn new(config: AppConfig, store: Box<dyn KeyValueStore + Send>) -> Self {
        Self::from_race(Race::new(config.race), config.camera, store)
    }

    /// Create a session around an existing race
    pub fn from_race(
        race: Race,
        camera: CameraConfig,
        store: Box<dyn KeyValueStore + Send>,
    ) -> Self {
        let lanes = race.track().lane_count();
        let names = NameTable::load(store.as_ref(), lanes);
        let bests = PersonalBestTable::load(store.as_ref());

        let mut session = Self {
            race,
            camera: CameraRig::new(camera),
            names,
            bests,
            store,
            actors: None,
            cues: None,
            actor_handles: vec![None; lanes],
            scoreboard: Vec::new(),
            records: Vec::new(),
            finish_flashes: Vec::new(),
            frame_events: Vec::new(),
            last_frame: None,
            frames: 0,
            frame_times: VecDeque::with_capacity(STATS_WINDOW),
        };
        session.refresh_scoreboard();
        log::info!(
            "Race session ready: {} lanes, {} personal bests on record",
            lanes,
            session.bests.len()
        );
        session
    }

    /// Attach the actor service and load one running actor per lane
    pub fn with_actors(mut self, mut actors: Box<dyn ActorService + Send>) -> Self {
        let config = self.race.config();
        for (i, slot) in self.actor_handles.iter_mut().enumerate() {
            let handle = match actors.load(&config.actor_model) {
                Ok(handle) => handle,
                Err(e) => {
                    log::warn!("Lane {} actor failed to load: {}", i + 1, e);
                    continue;
                }
            };
            let setup = actors
                .set_animation(handle, &config.actor_clip)
                .and_then(|_| actors.play(handle))
                .and_then(|_| actors.set_playback_speed(handle, config.running_playback_speed));
            if let Err(e) = setup {
                log::warn!("Lane {} actor setup failed: {}", i + 1, e);
            }
            *slot = Some(handle);
        }
        self.actors = Some(actors);
        self
    }

    /// Attach the cue service
    pub fn with_cues(mut self, cues: Box<dyn CueService + Send>) -> Self {
        self.cues = Some(cues);
        self
    }

    pub fn race(&self) -> &Race {
        &self.race
    }

    pub fn phase(&self) -> RacePhase {
        self.race.phase()
    }

    pub fn camera(&self) -> CameraState {
        self.camera.state()
    }

    pub fn names(&self) -> &NameTable {
        &self.names
    }

    pub fn personal_bests(&self) -> &PersonalBestTable {
        &self.bests
    }

    pub fn scoreboard(&self) -> &[ScoreEntry] {
        &self.scoreboard
    }

    /// Start-race trigger, ignored while a countdown or race is in progress
    pub fn start(&mut self, now: Instant) -> Vec<RaceEvent> {
        let events = self.race.start(now);
        self.handle_events(&events);
        events
    }

    /// Reset trigger, valid in every phase
    pub fn reset(&mut self, now: Instant) -> Vec<RaceEvent> {
        let events = self.race.reset(now);
        self.handle_events(&events);
        events
    }

    /// Name-editing commit
    pub fn commit_names(&mut self, names: &[String]) {
        self.names = NameTable::from_names(self.race.track().lane_count(), names);
        self.names.save(self.store.as_mut());
        self.refresh_scoreboard();
        log::info!("Names updated: {}", self.names.names().join(", "));
    }

    /// Advance one rendered frame and return what to draw
    pub fn frame(&mut self, now: Instant, aspect: f32) -> RaceSnapshot {
        let tick_start = Instant::now();
        self.finish_flashes.clear();

        let events = self.race.update(now);
        self.handle_events(&events);
        self.frame_events = events;

        let delta = self
            .last_frame
            .map(|last| now.saturating_duration_since(last).as_secs_f32())
            .unwrap_or(0.0)
            .min(self.race.config().max_frame_delta);
        self.last_frame = Some(now);
        let corridor = self.race.track().corridor_width();
        self.camera
            .update(self.race.runners(), aspect, corridor, delta);

        self.frames += 1;
        self.frame_times
            .push_back(tick_start.elapsed().as_secs_f32() * 1000.0);
        if self.frame_times.len() > STATS_WINDOW {
            self.frame_times.pop_front();
        }

        self.snapshot(now)
    }

    /// Current state without advancing anything
    pub fn snapshot(&self, now: Instant) -> RaceSnapshot {
        RaceSnapshot {
            phase: self.race.phase(),
            countdown_label: self.race.overlay().map(str::to_string),
            elapsed: self.race.elapsed(now),
            runners: self.race.runner_snapshots(),
            camera: self.camera.state(),
            scoreboard: self.scoreboard.clone(),
            finish_flashes: self.finish_flashes.clone(),
            finisher_count: self.race.runners().iter().filter(|r| r.finished).count() as u32,
            events: self.frame_events.clone(),
        }
    }

    pub fn stats(&self) -> SessionStats {
        let avg_frame_time_ms = if self.frame_times.is_empty() {
            0.0
        } else {
            self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32
        };

        SessionStats {
            frames: self.frames,
            avg_frame_time_ms,
            runner_count: self.race.runners().len() as u32,
            phase: self.race.phase(),
        }
    }

    fn handle_events(&mut self, events: &[RaceEvent]) {
        for event in events {
            match event {
                RaceEvent::CountdownBegan => {
                    self.records.clear();
                    self.refresh_scoreboard();
                }
                RaceEvent::CountdownBlank => {}
                RaceEvent::CountdownLabel(label) => self.fire(Cue::Tick(label.clone())),
                RaceEvent::Started => {
                    self.fire(Cue::Start);
                    let speed = self.race.config().running_playback_speed;
                    self.set_all_playback(speed);
                }
                RaceEvent::RunnerFinished { lane, .. } => {
                    self.fire(Cue::Finish);
                    self.finish_flashes.push(*lane);
                    let speed = self.race.config().finished_playback_speed;
                    self.set_playback(*lane, speed);
                    self.refresh_scoreboard();
                }
                RaceEvent::AllFinished { .. } => {
                    let improved = self.bests.merge_results(self.race.runners(), &self.names);
                    if !improved.is_empty() {
                        self.bests.save(self.store.as_mut());
                    }
                    self.records = improved;
                    self.refresh_scoreboard();
                }
                RaceEvent::Reset => {
                    self.records.clear();
                    let speed = self.race.config().running_playback_speed;
                    self.set_all_playback(speed);
                    self.refresh_scoreboard();
                }
            }
        }
    }

    fn refresh_scoreboard(&mut self) {
        self.scoreboard = rank(self.race.runners(), &self.names, &self.bests);
        // after finalization the table already holds this race's times
        for entry in &mut self.scoreboard {
            if self.records.contains(&entry.name) {
                entry.new_personal_best = true;
            }
        }
    }

    fn fire(&mut self, cue: Cue) {
        if let Some(cues) = self.cues.as_mut() {
            if let Err(e) = cues.fire(&cue) {
                log::warn!("Cue {} failed: {}", cue, e);
            }
        }
    }

    fn set_playback(&mut self, lane: usize, speed: f32) {
        let handle = lane
            .checked_sub(1)
            .and_then(|i| self.actor_handles.get(i).copied().flatten());
        if let (Some(actors), Some(handle)) = (self.actors.as_mut(), handle) {
            if let Err(e) = actors.set_playback_speed(handle, speed) {
                log::warn!("Lane {} playback speed change failed: {}", lane, e);
            }
        }
    }

    fn set_all_playback(&mut self, speed: f32) {
        for lane in 1..=self.actor_handles.len() {
            self.set_playback(lane, speed);
        }
    }
}
