//! Runner - Per-lane competitor state and kinematics
//!
//! Each runner holds its lane, position and race speed. Motion is constant
//! velocity along the track axis; the race drives [`Runner::advance`] once per
//! frame for every runner that has not finished yet.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::engine::track::TrackLayout;

/// Uniform speed distribution `[floor, floor + spread)` in m/s
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedRange {
    pub floor: f32,
    pub spread: f32,
}

impl SpeedRange {
    /// Draw one race speed
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        self.floor + rng.gen::<f32>() * self.spread.max(0.0)
    }
}

impl Default for SpeedRange {
    fn default() -> Self {
        Self {
            floor: 6.5,
            spread: 2.2,
        }
    }
}

/// Position on the track plane in meters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Lane offset, fixed for the runner's lifetime
    pub x: f32,
    /// Distance travelled along the track axis
    pub z: f32,
}

/// Complete state for a single runner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunnerState {
    /// 1-based lane number
    pub lane: usize,
    pub position: Position,
    /// Race speed (m/s), fixed for the duration of a race
    pub speed: f32,
    pub finished: bool,
    /// Elapsed race seconds at the moment the finish line was reached
    pub finish_time: Option<f32>,
}

impl RunnerState {
    /// Create a runner on the start line of its lane
    pub fn new(lane: usize, lane_offset: f32, speed: f32) -> Self {
        Self {
            lane,
            position: Position {
                x: lane_offset,
                z: TrackLayout::START_DISTANCE,
            },
            speed,
            finished: false,
            finish_time: None,
        }
    }

    /// Put the runner back on the start line and clear its result
    pub fn reset(&mut self, speed: f32) {
        self.position.z = TrackLayout::START_DISTANCE;
        self.speed = speed;
        self.finished = false;
        self.finish_time = None;
    }
}

/// Runner simulation logic
pub struct Runner;

impl Runner {
    /// Advance a runner by one frame.
    ///
    /// Finished runners are returned unchanged. A runner reaching the finish
    /// line is clamped exactly onto it and stamped with `elapsed`, the wall
    /// time since the start signal, rather than a time derived from its speed.
    pub fn advance(
        state: &RunnerState,
        delta: f32,
        finish_distance: f32,
        elapsed: f32,
    ) -> RunnerState {
        let mut next = *state;
        if next.finished {
            return next;
        }

        next.position.z += next.speed * delta.max(0.0);

        if next.position.z >= finish_distance {
            next.position.z = finish_distance;
            next.finished = true;
            next.finish_time = Some(elapsed);
        }

        next
    }
}

/// Compact runner state for the renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSnapshot {
    pub lane: usize,
    pub x: f32,
    pub z: f32,
    pub speed: f32,
    pub finished: bool,
    pub finish_time: Option<f32>,
    pub color: String,
}

impl From<&RunnerState> for RunnerSnapshot {
    fn from(state: &RunnerState) -> Self {
        Self {
            lane: state.lane,
            x: state.position.x,
            z: state.position.z,
            speed: state.speed,
            finished: state.finished,
            finish_time: state.finish_time,
            color: TrackLayout::lane_color(state.lane).to_string(),
        }
    }
}
