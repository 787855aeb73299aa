//! Sprint Lanes - Race engine backend
//!
//! Four runners sprint down parallel lanes after a countdown while the camera
//! keeps the whole field in frame. The [`engine`] module holds the race state
//! machine, camera framing and personal-best ranking. With the `desktop`
//! feature the engine is served to a Tauri frontend through [`run`].

pub mod engine;

#[cfg(feature = "desktop")]
mod desktop;

pub use engine::{
    AppConfig, CameraConfig, Race, RaceConfig, RaceEvent, RacePhase, RaceSession, RaceSnapshot,
    TrackLayout,
};

#[cfg(feature = "desktop")]
pub use desktop::run;
