//! Camera - Aspect-aware framing of the trailing runner
//!
//! Every frame the rig works out how far back the camera has to sit for the
//! whole lane corridor to fit horizontally, then follows the rearmost runner
//! so a breakaway leader can never drag the rest of the field out of shot.

use serde::{Deserialize, Serialize};

use crate::engine::error::ConfigError;
use crate::engine::runner::RunnerState;

/// How the per-frame smoothing factor is applied
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SmoothingMode {
    /// Fixed factor every frame, so the easing rate depends on frame rate
    PerFrame,
    /// Factor rescaled by the frame delta to behave the same at any frame rate.
    /// At `reference_fps` it matches [`SmoothingMode::PerFrame`].
    DeltaScaled { reference_fps: f32 },
}

/// Camera framing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in radians
    pub v_fov: f32,
    /// Horizontal padding multiplier on the corridor width
    pub margin: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// How far ahead of the rearmost runner the camera aims (meters)
    pub lookahead: f32,
    pub min_height: f32,
    /// Camera height as a fraction of the fitted distance
    pub height_ratio: f32,
    /// How far behind the target the camera sits, as a fraction of the distance
    pub back_offset_ratio: f32,
    /// Height of the look-at point
    pub look_height: f32,
    /// Fraction of the remaining gap closed per frame
    pub smoothing: f32,
    pub smoothing_mode: SmoothingMode,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            v_fov: 55f32.to_radians(),
            margin: 1.1,
            min_distance: 7.0,
            max_distance: 16.0,
            lookahead: 2.0,
            min_height: 3.5,
            height_ratio: 0.45,
            back_offset_ratio: 0.9,
            look_height: 1.0,
            smoothing: 0.08,
            smoothing_mode: SmoothingMode::PerFrame,
        }
    }
}

impl CameraConfig {
    /// Reject an empty distance range
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = (self.min_distance, self.max_distance);
        // NaN bounds fail here as well
        if !(min <= max) {
            return Err(ConfigError::CameraRange { min, max });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    fn lerp(self, target: Vec3, t: f32) -> Vec3 {
        Vec3 {
            x: self.x + (target.x - self.x) * t,
            y: self.y + (target.y - self.y) * t,
            z: self.z + (target.z - self.z) * t,
        }
    }
}

/// Smoothed camera pose handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub position: Vec3,
    pub look_at: Vec3,
}

/// Distance needed to fit `corridor_width` horizontally, clamped to the
/// configured range. Degenerate aspect ratios resolve to the far end, as
/// does an inverted range.
pub fn fit_distance(aspect: f32, v_fov: f32, corridor_width: f32, config: &CameraConfig) -> f32 {
    let denom = (v_fov * 0.5).tan() * aspect;
    if !denom.is_finite() || denom <= 0.0 {
        return config.max_distance;
    }
    let d = (corridor_width * 0.5 * config.margin) / denom;
    if d.is_nan() {
        return config.max_distance;
    }
    d.max(config.min_distance).min(config.max_distance)
}

/// Camera rig following the field
#[derive(Debug, Clone)]
pub struct CameraRig {
    config: CameraConfig,
    state: CameraState,
}

impl CameraRig {
    pub fn new(config: CameraConfig) -> Self {
        let d = config.max_distance;
        let state = CameraState {
            position: Vec3::new(
                0.0,
                config.min_height.max(d * config.height_ratio),
                config.lookahead - d * config.back_offset_ratio,
            ),
            look_at: Vec3::new(0.0, config.look_height, config.lookahead),
        };
        Self { config, state }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    /// Target pose for the current field, before smoothing
    pub fn target(&self, runners: &[RunnerState], aspect: f32, corridor_width: f32) -> CameraState {
        let c = &self.config;
        let d = fit_distance(aspect, c.v_fov, corridor_width, c);

        let focus_z = runners
            .iter()
            .map(|r| r.position.z)
            .min_by(f32::total_cmp)
            .unwrap_or(0.0);
        let target_z = focus_z + c.lookahead;
        let target_y = c.min_height.max(d * c.height_ratio);

        CameraState {
            position: Vec3::new(0.0, target_y, target_z - d * c.back_offset_ratio),
            look_at: Vec3::new(0.0, c.look_height, target_z),
        }
    }

    fn blend_factor(&self, delta: f32) -> f32 {
        let k = self.config.smoothing.clamp(0.0, 1.0);
        match self.config.smoothing_mode {
            SmoothingMode::PerFrame => k,
            SmoothingMode::DeltaScaled { reference_fps } => {
                let frames = (delta.max(0.0) * reference_fps).max(0.0);
                1.0 - (1.0 - k).powf(frames)
            }
        }
    }

    /// Ease toward the target pose. The look-at point snaps to the target.
    pub fn update(
        &mut self,
        runners: &[RunnerState],
        aspect: f32,
        corridor_width: f32,
        delta: f32,
    ) -> CameraState {
        let target = self.target(runners, aspect, corridor_width);
        let t = self.blend_factor(delta);
        self.state.position = self.state.position.lerp(target.position, t);
        self.state.look_at = target.look_at;
        self.state
    }
}
