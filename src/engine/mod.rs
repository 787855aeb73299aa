//! Race Engine Module
//!
//! Countdown, per-lane kinematics, finish detection, camera framing and
//! personal-best ranking for a four-lane sprint. Rendering, animation, sound
//! and storage stay outside and are reached through narrow traits.

pub mod camera;
pub mod config;
pub mod countdown;
pub mod error;
pub mod race;
pub mod runner;
pub mod scoreboard;
pub mod services;
pub mod session;
pub mod store;
pub mod track;

pub use camera::{fit_distance, CameraConfig, CameraRig, CameraState, SmoothingMode, Vec3};
pub use config::AppConfig;
pub use countdown::{CountdownConfig, CountdownSchedule, CountdownStep};
pub use error::{ConfigError, LayoutError, ServiceError, StoreError};
pub use race::{Race, RaceConfig, RaceEvent, RacePhase};
pub use runner::{Position, Runner, RunnerSnapshot, RunnerState, SpeedRange};
pub use scoreboard::{finalize, format_time, rank, Medal, NameTable, PersonalBestTable, ScoreEntry};
pub use services::{ActorHandle, ActorService, Cue, CueService};
pub use session::{RaceSession, RaceSnapshot, SessionStats};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use track::TrackLayout;
