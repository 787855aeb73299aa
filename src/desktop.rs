//! Desktop - Tauri commands and event-forwarding services
//!
//! The frontend drives the frame loop: it calls [`frame`] from its animation
//! callback and draws the returned snapshot. Cues and actor playback changes
//! are forwarded to it as Tauri events.

use std::sync::Mutex;
use std::time::Instant;

use serde::Serialize;
use tauri::{AppHandle, Emitter, Manager, State};

use crate::engine::{
    ActorHandle, ActorService, AppConfig, Cue, CueService, JsonFileStore, KeyValueStore,
    MemoryStore, RaceSession, RaceSnapshot, ScoreEntry, ServiceError, SessionStats,
};

const STORE_FILE: &str = "sprint-lanes.json";

fn emit_failed(e: tauri::Error) -> ServiceError {
    ServiceError::Failed(e.to_string())
}

/// Forwards cues to the frontend as `race-cue` events
struct TauriCueService {
    app: AppHandle,
}

impl CueService for TauriCueService {
    fn fire(&mut self, cue: &Cue) -> Result<(), ServiceError> {
        self.app.emit("race-cue", cue.name()).map_err(emit_failed)
    }
}

#[derive(Debug, Clone, Serialize)]
struct ActorPayload<'a> {
    handle: u32,
    model: Option<&'a str>,
    clip: Option<&'a str>,
    speed: Option<f32>,
}

impl ActorPayload<'_> {
    fn bare(handle: ActorHandle) -> Self {
        Self {
            handle: handle.0,
            model: None,
            clip: None,
            speed: None,
        }
    }
}

/// Forwards actor commands to the frontend, which owns the animated models
struct TauriActorService {
    app: AppHandle,
    next: u32,
}

impl ActorService for TauriActorService {
    fn load(&mut self, model_ref: &str) -> Result<ActorHandle, ServiceError> {
        let handle = ActorHandle(self.next);
        self.app
            .emit(
                "actor-load",
                ActorPayload {
                    model: Some(model_ref),
                    ..ActorPayload::bare(handle)
                },
            )
            .map_err(emit_failed)?;
        self.next += 1;
        Ok(handle)
    }

    fn set_animation(&mut self, actor: ActorHandle, clip_ref: &str) -> Result<(), ServiceError> {
        self.app
            .emit(
                "actor-animation",
                ActorPayload {
                    clip: Some(clip_ref),
                    ..ActorPayload::bare(actor)
                },
            )
            .map_err(emit_failed)
    }

    fn play(&mut self, actor: ActorHandle) -> Result<(), ServiceError> {
        self.app
            .emit("actor-play", ActorPayload::bare(actor))
            .map_err(emit_failed)
    }

    fn set_playback_speed(&mut self, actor: ActorHandle, scale: f32) -> Result<(), ServiceError> {
        self.app
            .emit(
                "actor-speed",
                ActorPayload {
                    speed: Some(scale),
                    ..ActorPayload::bare(actor)
                },
            )
            .map_err(emit_failed)
    }
}

/// Start the race countdown
#[tauri::command]
fn start_race(session: State<'_, Mutex<RaceSession>>) -> Result<(), String> {
    let mut session = session.lock().map_err(|e| e.to_string())?;
    session.start(Instant::now());
    Ok(())
}

/// Reset to the start line
#[tauri::command]
fn reset_race(session: State<'_, Mutex<RaceSession>>) -> Result<(), String> {
    let mut session = session.lock().map_err(|e| e.to_string())?;
    session.reset(Instant::now());
    Ok(())
}

/// Advance one frame and return what to draw
#[tauri::command]
fn frame(session: State<'_, Mutex<RaceSession>>, aspect: f32) -> Result<RaceSnapshot, String> {
    let mut session = session.lock().map_err(|e| e.to_string())?;
    Ok(session.frame(Instant::now(), aspect))
}

/// Get the current scoreboard
#[tauri::command]
fn get_scoreboard(session: State<'_, Mutex<RaceSession>>) -> Result<Vec<ScoreEntry>, String> {
    let session = session.lock().map_err(|e| e.to_string())?;
    Ok(session.scoreboard().to_vec())
}

/// Get the lane display names
#[tauri::command]
fn get_names(session: State<'_, Mutex<RaceSession>>) -> Result<Vec<String>, String> {
    let session = session.lock().map_err(|e| e.to_string())?;
    Ok(session.names().names().to_vec())
}

/// Save edited names, returning them as stored
#[tauri::command]
fn commit_names(
    session: State<'_, Mutex<RaceSession>>,
    names: Vec<String>,
) -> Result<Vec<String>, String> {
    let mut session = session.lock().map_err(|e| e.to_string())?;
    session.commit_names(&names);
    Ok(session.names().names().to_vec())
}

/// Get session statistics
#[tauri::command]
fn get_stats(session: State<'_, Mutex<RaceSession>>) -> Result<SessionStats, String> {
    let session = session.lock().map_err(|e| e.to_string())?;
    Ok(session.stats())
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .setup(|app| {
            if cfg!(debug_assertions) {
                app.handle().plugin(
                    tauri_plugin_log::Builder::default()
                        .level(log::LevelFilter::Info)
                        .build(),
                )?;
            }

            let store_path = app.path().app_data_dir()?.join(STORE_FILE);
            let store: Box<dyn KeyValueStore + Send> = match JsonFileStore::open(&store_path) {
                Ok(store) => Box::new(store),
                Err(e) => {
                    log::warn!("Falling back to in-memory store: {}", e);
                    Box::new(MemoryStore::new())
                }
            };

            let handle = app.handle().clone();
            let session = RaceSession::new(AppConfig::default(), store)
                .with_actors(Box::new(TauriActorService {
                    app: handle.clone(),
                    next: 0,
                }))
                .with_cues(Box::new(TauriCueService { app: handle }));
            app.manage(Mutex::new(session));

            log::info!("Sprint lanes race session initialized");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            start_race,
            reset_race,
            frame,
            get_scoreboard,
            get_names,
            commit_names,
            get_stats,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
