//! Track - Immutable lane geometry
//!
//! Lanes run along the +z axis from the start line at z = 0 to the finish line.
//! Each lane is identified by its 1-based number and sits at a fixed x offset.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::engine::error::LayoutError;

/// Display colors handed to the renderer, cycled when there are more lanes than colors
pub const LANE_COLORS: [&str; 4] = ["#e74c3c", "#3498db", "#2ecc71", "#f1c40f"];

/// Track geometry shared by every component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTrackLayout", into = "RawTrackLayout")]
pub struct TrackLayout {
    lane_offsets: Vec<f32>,
    finish_distance: f32,
    corridor_half_width: f32,
}

impl TrackLayout {
    /// Distance of the start line along the track axis
    pub const START_DISTANCE: f32 = 0.0;

    /// Build a validated layout
    pub fn new(
        lane_offsets: Vec<f32>,
        finish_distance: f32,
        corridor_half_width: f32,
    ) -> Result<Self, LayoutError> {
        if lane_offsets.is_empty() {
            return Err(LayoutError::NoLanes);
        }
        for (i, pair) in lane_offsets.windows(2).enumerate() {
            // NaN compares as None and is rejected too
            if pair[1].partial_cmp(&pair[0]) != Some(Ordering::Greater) {
                return Err(LayoutError::UnorderedLanes {
                    lane: i + 2,
                    offset: pair[1],
                    previous: pair[0],
                });
            }
        }
        if !finish_distance.is_finite() || finish_distance <= 0.0 {
            return Err(LayoutError::FinishDistance(finish_distance));
        }
        if !corridor_half_width.is_finite() || corridor_half_width <= 0.0 {
            return Err(LayoutError::CorridorHalfWidth(corridor_half_width));
        }

        Ok(Self {
            lane_offsets,
            finish_distance,
            corridor_half_width,
        })
    }

    pub fn lane_count(&self) -> usize {
        self.lane_offsets.len()
    }

    pub fn lane_offsets(&self) -> &[f32] {
        &self.lane_offsets
    }

    /// X offset of a 1-based lane, `None` when the lane does not exist
    pub fn lane_offset(&self, lane: usize) -> Option<f32> {
        lane.checked_sub(1)
            .and_then(|i| self.lane_offsets.get(i))
            .copied()
    }

    pub fn finish_distance(&self) -> f32 {
        self.finish_distance
    }

    /// Full corridor width used by the camera fit
    pub fn corridor_width(&self) -> f32 {
        self.corridor_half_width * 2.0
    }

    /// Display color of a 1-based lane
    pub fn lane_color(lane: usize) -> &'static str {
        LANE_COLORS[lane.saturating_sub(1) % LANE_COLORS.len()]
    }
}

impl Default for TrackLayout {
    /// Four 2 m wide lanes centred on x = 0 and a 100 m straight
    fn default() -> Self {
        Self {
            lane_offsets: vec![-3.0, -1.0, 1.0, 3.0],
            finish_distance: 100.0,
            corridor_half_width: 4.0,
        }
    }
}

/// Unvalidated serde form of [`TrackLayout`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawTrackLayout {
    lane_offsets: Vec<f32>,
    finish_distance: f32,
    corridor_half_width: f32,
}

impl TryFrom<RawTrackLayout> for TrackLayout {
    type Error = LayoutError;

    fn try_from(raw: RawTrackLayout) -> Result<Self, Self::Error> {
        TrackLayout::new(raw.lane_offsets, raw.finish_distance, raw.corridor_half_width)
    }
}

impl From<TrackLayout> for RawTrackLayout {
    fn from(layout: TrackLayout) -> Self {
        Self {
            lane_offsets: layout.lane_offsets,
            finish_distance: layout.finish_distance,
            corridor_half_width: layout.corridor_half_width,
        }
    }
}
