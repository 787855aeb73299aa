//! Error types for the race engine.
//!
//! Only configuration and track geometry errors ever reach a caller. Service and
//! store failures are reported by their implementations but the session logs and
//! drops them, so a broken speaker or a read-only disk never stalls a race.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Invalid track geometry
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error("track layout needs at least one lane")]
    NoLanes,
    #[error("lane offsets must be strictly increasing (lane {lane} at {offset} follows {previous})")]
    UnorderedLanes {
        lane: usize,
        offset: f32,
        previous: f32,
    },
    #[error("finish distance must be positive and finite, got {0}")]
    FinishDistance(f32),
    #[error("corridor half-width must be positive and finite, got {0}")]
    CorridorHalfWidth(f32),
}

/// Failure reported by a key-value store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store file {} could not be accessed: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("store contents are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store backend unavailable: {0}")]
    Unavailable(String),
}

/// Failure reported by an actor or cue service
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("service is not ready")]
    NotReady,
    #[error("unknown actor handle {0}")]
    UnknownActor(u32),
    #[error("service call failed: {0}")]
    Failed(String),
}

/// Failure while loading an application config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("camera distance range [{min}, {max}] is empty")]
    CameraRange { min: f32, max: f32 },
    #[error("countdown {field} must be between 0 and {max} seconds, got {value}")]
    CountdownTiming {
        field: &'static str,
        value: f32,
        max: f32,
    },
}
