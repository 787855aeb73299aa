use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use sprint_lanes::engine::{
    format_time, AppConfig, Cue, CueService, JsonFileStore, KeyValueStore, Medal, MemoryStore,
    NameTable, RaceEvent, RacePhase, RaceSession, ScoreEntry, ServiceError,
};

/// Upper bound on simulated frames per race
const MAX_FRAMES: u64 = 1_000_000;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    name = "sprint-lanes",
    about = "Run four-lane sprint races headless and keep personal bests"
)]
struct Opts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Print every race event and cue as it happens
    #[clap(short, long)]
    verbose: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Path to a JSON config file
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Path to the names/personal-best store (kept in memory if not set)
    #[clap(short, long)]
    store: Option<PathBuf>,

    /// Seed for runner speeds
    #[clap(long)]
    seed: Option<u64>,

    /// Simulated frames per second
    #[clap(long, default_value = "60")]
    fps: f32,

    /// Viewport aspect ratio used for camera framing
    #[clap(long, default_value = "1.7777778")]
    aspect: f32,

    /// Comma separated lane names, e.g. Ana,Bo,Cy,Di
    #[clap(short, long, value_delimiter = ',')]
    names: Vec<String>,

    /// Number of races to run back to back
    #[clap(short, long, default_value = "1")]
    races: u32,
}

/// Prints cues to stdout
struct ConsoleCues;

impl CueService for ConsoleCues {
    fn fire(&mut self, cue: &Cue) -> Result<(), ServiceError> {
        println!("CUE: {}", cue);
        Ok(())
    }
}

fn medal_label(medal: Option<Medal>) -> &'static str {
    match medal {
        Some(Medal::Gold) => "gold",
        Some(Medal::Silver) => "silver",
        Some(Medal::Bronze) => "bronze",
        None => "",
    }
}

fn print_event(names: &NameTable, event: &RaceEvent) {
    match event {
        RaceEvent::CountdownBegan => println!("EVENT: Countdown started"),
        RaceEvent::CountdownLabel(label) => println!("EVENT: {}", label),
        RaceEvent::CountdownBlank => {}
        RaceEvent::Started => println!("EVENT: Race started"),
        RaceEvent::RunnerFinished { lane, finish_time } => println!(
            "EVENT: {} finished in {}",
            names.name(*lane),
            format_time(Some(*finish_time))
        ),
        RaceEvent::AllFinished { elapsed } => {
            println!("EVENT: All runners finished after {}", format_time(Some(*elapsed)))
        }
        RaceEvent::Reset => println!("EVENT: Race reset"),
    }
}

fn print_scoreboard(race_no: u32, board: &[ScoreEntry]) {
    println!("RESULT: Race {}", race_no);
    println!("{:>5}  {:>4}  {:<16} {:>9}  {:>9}  {}", "place", "lane", "name", "time", "best", "");
    for entry in board {
        let place = entry.place.map(|p| p.to_string()).unwrap_or_else(|| "-".into());
        println!(
            "{:>5}  {:>4}  {:<16} {:>9}  {:>9}  {}{}",
            place,
            entry.lane,
            entry.name,
            entry.display_time(),
            entry.display_best(),
            medal_label(entry.medal),
            if entry.new_personal_best { " PB" } else { "" }
        );
    }
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    let opts: Opts = Opts::parse();

    let mut config = if let Some(path) = &opts.config {
        println!("INFO: Reading config from {:?}", path);
        AppConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))?
    } else {
        AppConfig::default()
    };
    if opts.seed.is_some() {
        config.race.seed = opts.seed;
    }
    if !opts.fps.is_finite() || opts.fps <= 0.0 {
        anyhow::bail!("Frame rate must be positive, got {}", opts.fps);
    }

    let store: Box<dyn KeyValueStore + Send> = match &opts.store {
        Some(path) => Box::new(
            JsonFileStore::open(path)
                .with_context(|| format!("Failed to open store {}", path.display()))?,
        ),
        None => Box::new(MemoryStore::new()),
    };

    let mut session = RaceSession::new(config, store);
    if opts.verbose {
        session = session.with_cues(Box::new(ConsoleCues));
    }
    if !opts.names.is_empty() {
        session.commit_names(&opts.names);
    }

    println!(
        "INFO: Racing {} over {}m, {} race(s) at {} fps",
        session.names().names().join(", "),
        session.race().track().finish_distance(),
        opts.races,
        opts.fps
    );

    // EXECUTION -----------------------------------------------------------------------------------
    let frame = Duration::from_secs_f32(1.0 / opts.fps);
    let mut now = Instant::now();

    for race_no in 1..=opts.races {
        let events = session.start(now);
        if opts.verbose {
            events.iter().for_each(|e| print_event(session.names(), e));
        }

        let mut frames = 0u64;
        while session.phase() != RacePhase::Finished {
            if frames >= MAX_FRAMES {
                anyhow::bail!("Race {} did not finish within {} frames", race_no, MAX_FRAMES);
            }
            now += frame;
            frames += 1;
            let snapshot = session.frame(now, opts.aspect);
            if opts.verbose {
                snapshot.events.iter().for_each(|e| print_event(session.names(), e));
            }
        }

        print_scoreboard(race_no, session.scoreboard());
    }

    // POST-PROCESSING -----------------------------------------------------------------------------
    println!("RESULT: Personal bests");
    for (name, best) in session.personal_bests().iter() {
        println!("{:<16} {:>9}", name, format_time(Some(best)));
    }

    Ok(())
}
