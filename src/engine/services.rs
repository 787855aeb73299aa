//! Services - Narrow interfaces to the animated actors and the sound cues
//!
//! Both services live outside the engine. Every call may fail or the service
//! may be missing entirely; the session logs the failure and carries on.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::countdown::tick_cue_name;
use crate::engine::error::ServiceError;

/// Opaque handle returned by [`ActorService::load`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorHandle(pub u32);

/// Animated character playback
pub trait ActorService {
    fn load(&mut self, model_ref: &str) -> Result<ActorHandle, ServiceError>;

    fn set_animation(&mut self, actor: ActorHandle, clip_ref: &str) -> Result<(), ServiceError>;

    fn play(&mut self, actor: ActorHandle) -> Result<(), ServiceError>;

    fn set_playback_speed(&mut self, actor: ActorHandle, scale: f32) -> Result<(), ServiceError>;
}

/// Discrete named sound or visual cue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cue {
    /// Countdown label, e.g. `"3"` or `"GO!"`
    Tick(String),
    Start,
    Finish,
}

impl Cue {
    /// Wire name: `"tick:3"`, `"tick:go"`, `"start"`, `"finish"`
    pub fn name(&self) -> String {
        match self {
            Cue::Tick(label) => tick_cue_name(label),
            Cue::Start => "start".to_string(),
            Cue::Finish => "finish".to_string(),
        }
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Fire-and-forget cue playback
pub trait CueService {
    fn fire(&mut self, cue: &Cue) -> Result<(), ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cue_names() {
        assert_eq!(Cue::Tick("3".into()).name(), "tick:3");
        assert_eq!(Cue::Tick("2".into()).name(), "tick:2");
        assert_eq!(Cue::Tick("1".into()).name(), "tick:1");
        assert_eq!(Cue::Tick("GO!".into()).name(), "tick:go");
        assert_eq!(Cue::Start.to_string(), "start");
        assert_eq!(Cue::Finish.to_string(), "finish");
    }
}
