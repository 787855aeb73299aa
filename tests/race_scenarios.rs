use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sprint_lanes::engine::{
    rank, CameraConfig, Cue, CueService, JsonFileStore, MemoryStore, Race, RaceConfig, RacePhase,
    RaceSession, ServiceError,
};

const FRAME: Duration = Duration::from_micros(16_667);

#[derive(Clone, Default)]
struct RecordedCues(Arc<Mutex<Vec<String>>>);

impl RecordedCues {
    fn names(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl CueService for RecordedCues {
    fn fire(&mut self, cue: &Cue) -> Result<(), ServiceError> {
        self.0.lock().unwrap().push(cue.name());
        Ok(())
    }
}

fn session_with_speeds(speeds: &[f32]) -> RaceSession {
    RaceSession::from_race(
        Race::with_speeds(RaceConfig::default(), speeds),
        CameraConfig::default(),
        Box::new(MemoryStore::new()),
    )
}

/// Frame the session until it reaches `phase`, returning the last frame time
fn run_until(session: &mut RaceSession, mut now: Instant, phase: RacePhase) -> Instant {
    for _ in 0..200_000 {
        if session.phase() == phase {
            return now;
        }
        now += FRAME;
        session.frame(now, 16.0 / 9.0);
    }
    panic!("session never reached {:?}", phase);
}

#[test]
fn four_runner_reference_race() {
    let mut session = session_with_speeds(&[7.0, 7.5, 8.0, 6.8]);
    let t0 = Instant::now();
    session.start(t0);
    run_until(&mut session, t0, RacePhase::Finished);

    let runners = session.race().runners();
    let time = |lane: usize| runners[lane - 1].finish_time.unwrap();
    assert_abs_diff_eq!(time(3), 12.5, epsilon = 0.05);
    assert_abs_diff_eq!(time(4), 14.7, epsilon = 0.05);
    assert!(runners.iter().all(|r| time(3) <= r.finish_time.unwrap()));
    assert!(runners.iter().all(|r| time(4) >= r.finish_time.unwrap()));

    let order: Vec<_> = session.scoreboard().iter().map(|e| e.lane).collect();
    assert_eq!(order, vec![3, 2, 1, 4]);
    let direct: Vec<_> = rank(runners, session.names(), session.personal_bests())
        .iter()
        .map(|e| e.lane)
        .collect();
    assert_eq!(direct, order);
}

#[test]
fn personal_best_only_improves_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let names = vec!["Ana".to_string()];

    let mut best_after = Vec::new();
    for speed in [8.0, 100.0 / 13.0, 100.0 / 11.9] {
        let store = JsonFileStore::open(&path).unwrap();
        let mut session = RaceSession::from_race(
            Race::with_speeds(RaceConfig::default(), &[speed, 50.0, 50.0, 50.0]),
            CameraConfig::default(),
            Box::new(store),
        );
        session.commit_names(&names);
        let t0 = Instant::now();
        session.start(t0);
        run_until(&mut session, t0, RacePhase::Finished);
        best_after.push(session.personal_bests().get("Ana").unwrap());
    }

    assert_abs_diff_eq!(best_after[0], 12.5, epsilon = 0.05);
    assert_eq!(best_after[1], best_after[0]);
    assert_abs_diff_eq!(best_after[2], 11.9, epsilon = 0.05);

    let reopened = JsonFileStore::open(&path).unwrap();
    let restored = RaceSession::from_race(
        Race::with_speeds(RaceConfig::default(), &[7.0; 4]),
        CameraConfig::default(),
        Box::new(reopened),
    );
    assert_eq!(restored.names().name(1), "Ana");
    assert_eq!(restored.personal_bests().get("Ana"), Some(best_after[2]));
}

#[test]
fn reset_during_countdown_never_starts() {
    let cues = RecordedCues::default();
    let mut session = session_with_speeds(&[7.0, 7.5, 8.0, 6.8]).with_cues(Box::new(cues.clone()));
    let t0 = Instant::now();
    session.start(t0);

    // run until "1" is showing, well before "GO!"
    let mut now = t0;
    while session.race().overlay() != Some("1") {
        now += FRAME;
        session.frame(now, 1.5);
    }
    session.reset(now);
    assert_eq!(session.phase(), RacePhase::Idle);

    for _ in 0..600 {
        now += FRAME;
        let snapshot = session.frame(now, 1.5);
        assert_eq!(snapshot.phase, RacePhase::Idle);
        assert_eq!(snapshot.countdown_label, None);
        assert!(snapshot.runners.iter().all(|r| r.z == 0.0));
    }
    assert_eq!(cues.names(), vec!["tick:3", "tick:2", "tick:1"]);
}

#[test]
fn start_while_running_changes_nothing() {
    let cues = RecordedCues::default();
    let mut session = session_with_speeds(&[7.0, 7.5, 8.0, 6.8]).with_cues(Box::new(cues.clone()));
    let t0 = Instant::now();
    session.start(t0);
    let mut now = run_until(&mut session, t0, RacePhase::Running);
    now += FRAME * 30;
    session.frame(now, 1.5);

    let before = session.snapshot(now);
    let cue_count = cues.names().len();
    assert!(session.start(now).is_empty());

    let after = session.snapshot(now);
    assert_eq!(after.phase, RacePhase::Running);
    assert_eq!(after.elapsed, before.elapsed);
    let zs = |s: &sprint_lanes::RaceSnapshot| s.runners.iter().map(|r| r.z).collect::<Vec<_>>();
    assert_eq!(zs(&after), zs(&before));
    assert_eq!(cues.names().len(), cue_count);
}

#[test]
fn invariants_hold_under_frame_jitter() {
    let mut config = RaceConfig::default();
    config.seed = Some(2024);
    let mut session = RaceSession::from_race(
        Race::new(config),
        CameraConfig::default(),
        Box::new(MemoryStore::new()),
    );
    let mut jitter = StdRng::seed_from_u64(99);
    let finish = session.race().track().finish_distance();

    let mut now = Instant::now();
    session.start(now);
    let mut frozen: Vec<Option<(f32, f32)>> = vec![None; 4];
    while session.phase() != RacePhase::Finished {
        // mostly smooth frames with the odd long stall
        let ms = if jitter.gen_bool(0.05) {
            jitter.gen_range(100..400)
        } else {
            jitter.gen_range(8..34)
        };
        now += Duration::from_millis(ms);
        let snapshot = session.frame(now, jitter.gen_range(0.3..4.0));

        for (i, r) in snapshot.runners.iter().enumerate() {
            assert_eq!(r.finished, r.finish_time.is_some());
            assert_eq!(r.finished, r.z >= finish);
            assert!(r.z <= finish);
            match frozen[i] {
                Some((z, t)) => {
                    assert_eq!(r.z, z);
                    assert_eq!(r.finish_time, Some(t));
                }
                None => {
                    if let Some(t) = r.finish_time {
                        frozen[i] = Some((r.z, t));
                    }
                }
            }
        }

        let board = &snapshot.scoreboard;
        let finished: Vec<_> = board.iter().filter_map(|e| e.finish_time).collect();
        assert!(finished.windows(2).all(|w| w[0] <= w[1]));
        let first_unfinished = board.iter().position(|e| e.finish_time.is_none());
        if let Some(i) = first_unfinished {
            assert!(board[i..].iter().all(|e| e.finish_time.is_none()));
        }
    }
}

#[test]
fn camera_follows_trailing_runner() {
    let mut session = session_with_speeds(&[8.7, 8.5, 6.5, 8.0]);
    let t0 = Instant::now();
    session.start(t0);
    let mut now = run_until(&mut session, t0, RacePhase::Running);
    for _ in 0..600 {
        now += FRAME;
        session.frame(now, 16.0 / 9.0);
    }
    let snapshot = session.snapshot(now);
    let rear = snapshot
        .runners
        .iter()
        .map(|r| r.z)
        .fold(f32::INFINITY, f32::min);
    assert_abs_diff_eq!(snapshot.camera.look_at.z, rear + 2.0, epsilon = 0.05);
    assert!(snapshot.camera.position.z < rear);
}
