//! Scoreboard - Ranking, display names and personal bests
//!
//! The scoreboard is derived from the runners on demand. Display names and the
//! personal-best table are the only pieces that outlive a race; both load from
//! and save to a [`KeyValueStore`], falling back to defaults on bad data.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::runner::RunnerState;
use crate::engine::store::{KeyValueStore, NAMES_KEY, PERSONAL_BESTS_KEY};
use crate::engine::track::TrackLayout;

/// Placeholder shown for a missing time
pub const UNSET_TIME: &str = "--";

/// Format seconds as `"12.50s"`, or the placeholder when unset
pub fn format_time(time: Option<f32>) -> String {
    match time {
        Some(t) => format!("{:.2}s", t),
        None => UNSET_TIME.to_string(),
    }
}

fn default_name(lane: usize) -> String {
    format!("Lane {}", lane)
}

/// One display name per lane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameTable {
    names: Vec<String>,
}

impl NameTable {
    /// Default `"Lane N"` names
    pub fn new(lanes: usize) -> Self {
        Self {
            names: (1..=lanes).map(default_name).collect(),
        }
    }

    /// Normalize user-entered names: trimmed, blanks replaced by the lane
    /// default, padded or truncated to the lane count
    pub fn from_names(lanes: usize, names: &[String]) -> Self {
        Self {
            names: (1..=lanes)
                .map(|lane| {
                    names
                        .get(lane - 1)
                        .map(|n| n.trim())
                        .filter(|n| !n.is_empty())
                        .map(str::to_string)
                        .unwrap_or_else(|| default_name(lane))
                })
                .collect(),
        }
    }

    /// Load stored names, using defaults when missing, unreadable or the wrong size
    pub fn load(store: &dyn KeyValueStore, lanes: usize) -> Self {
        let raw = match store.get(NAMES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::new(lanes),
            Err(e) => {
                log::warn!("Could not read stored names: {}", e);
                return Self::new(lanes);
            }
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(names) if names.len() == lanes => Self::from_names(lanes, &names),
            Ok(names) => {
                log::warn!(
                    "Stored names have {} entries for {} lanes, using defaults",
                    names.len(),
                    lanes
                );
                Self::new(lanes)
            }
            Err(e) => {
                log::warn!("Stored names are malformed, using defaults: {}", e);
                Self::new(lanes)
            }
        }
    }

    /// Persist the names, logging and dropping any store failure
    pub fn save(&self, store: &mut dyn KeyValueStore) {
        let result = serde_json::to_string(&self.names)
            .map_err(Into::into)
            .and_then(|json| store.set(NAMES_KEY, json));
        if let Err(e) = result {
            log::warn!("Could not save names: {}", e);
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Display name of a 1-based lane
    pub fn name(&self, lane: usize) -> String {
        lane.checked_sub(1)
            .and_then(|i| self.names.get(i))
            .cloned()
            .unwrap_or_else(|| default_name(lane))
    }
}

/// Best finish time ever recorded per display name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalBestTable {
    bests: BTreeMap<String, f32>,
}

impl PersonalBestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load stored bests, dropping entries that are not positive finite times
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let raw = match store.get(PERSONAL_BESTS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::new(),
            Err(e) => {
                log::warn!("Could not read stored personal bests: {}", e);
                return Self::new();
            }
        };
        match serde_json::from_str::<BTreeMap<String, f32>>(&raw) {
            Ok(mut bests) => {
                bests.retain(|_, t| t.is_finite() && *t > 0.0);
                Self { bests }
            }
            Err(e) => {
                log::warn!("Stored personal bests are malformed, starting empty: {}", e);
                Self::new()
            }
        }
    }

    /// Persist the table, logging and dropping any store failure
    pub fn save(&self, store: &mut dyn KeyValueStore) {
        let result = serde_json::to_string(&self.bests)
            .map_err(Into::into)
            .and_then(|json| store.set(PERSONAL_BESTS_KEY, json));
        if let Err(e) = result {
            log::warn!("Could not save personal bests: {}", e);
        }
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.bests.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.bests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bests.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.bests.iter().map(|(name, &t)| (name.as_str(), t))
    }

    /// Store `time` for `name` if it beats the current best, returning whether it did
    pub fn record(&mut self, name: &str, time: f32) -> bool {
        if !time.is_finite() || time <= 0.0 {
            return false;
        }
        match self.bests.get_mut(name) {
            Some(best) if time < *best => {
                *best = time;
                true
            }
            Some(_) => false,
            None => {
                self.bests.insert(name.to_string(), time);
                true
            }
        }
    }

    /// Min-merge every finished runner's time, returning the names that improved
    pub fn merge_results(&mut self, runners: &[RunnerState], names: &NameTable) -> Vec<String> {
        let mut improved = Vec::new();
        for runner in runners {
            let Some(time) = runner.finish_time else {
                continue;
            };
            let name = names.name(runner.lane);
            if self.record(&name, time) {
                log::info!("New personal best for {}: {}", name, format_time(Some(time)));
                improved.push(name);
            }
        }
        improved
    }
}

/// Fold a race's finish times into a copy of `table`
pub fn finalize(
    runners: &[RunnerState],
    names: &NameTable,
    table: &PersonalBestTable,
) -> PersonalBestTable {
    let mut next = table.clone();
    next.merge_results(runners, names);
    next
}

/// Podium tier for the first three finishers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Medal {
    Gold,
    Silver,
    Bronze,
}

impl Medal {
    fn for_place(place: usize) -> Option<Medal> {
        match place {
            1 => Some(Medal::Gold),
            2 => Some(Medal::Silver),
            3 => Some(Medal::Bronze),
            _ => None,
        }
    }
}

/// One row of the scoreboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub lane: usize,
    pub name: String,
    pub color: String,
    pub finish_time: Option<f32>,
    /// 1-based place among finishers
    pub place: Option<usize>,
    pub medal: Option<Medal>,
    pub personal_best: Option<f32>,
    /// Finish time beats the stored best, or no best exists yet
    pub new_personal_best: bool,
}

impl ScoreEntry {
    pub fn display_time(&self) -> String {
        format_time(self.finish_time)
    }

    pub fn display_best(&self) -> String {
        format_time(self.personal_best)
    }
}

fn by_finish_time(a: &RunnerState, b: &RunnerState) -> Ordering {
    match (a.finish_time, b.finish_time) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Rank runners by finish time. Unfinished runners follow every finisher in lane order.
pub fn rank(
    runners: &[RunnerState],
    names: &NameTable,
    bests: &PersonalBestTable,
) -> Vec<ScoreEntry> {
    let mut ordered: Vec<&RunnerState> = runners.iter().collect();
    ordered.sort_by(|a, b| by_finish_time(a, b));

    ordered
        .into_iter()
        .enumerate()
        .map(|(i, runner)| {
            let name = names.name(runner.lane);
            let personal_best = bests.get(&name);
            let place = runner.finish_time.map(|_| i + 1);
            ScoreEntry {
                lane: runner.lane,
                color: TrackLayout::lane_color(runner.lane).to_string(),
                finish_time: runner.finish_time,
                place,
                medal: place.and_then(Medal::for_place),
                personal_best,
                new_personal_best: runner
                    .finish_time
                    .is_some_and(|t| personal_best.map_or(true, |pb| t < pb)),
                name,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::store::MemoryStore;

    fn runner(lane: usize, finish_time: Option<f32>) -> RunnerState {
        let mut r = RunnerState::new(lane, 0.0, 7.0);
        if let Some(t) = finish_time {
            r.position.z = 100.0;
            r.finished = true;
            r.finish_time = Some(t);
        }
        r
    }

    #[test]
    fn ranks_by_time_with_unfinished_last() {
        let runners = vec![
            runner(1, None),
            runner(2, Some(13.3)),
            runner(3, Some(12.5)),
            runner(4, None),
        ];
        let board = rank(&runners, &NameTable::new(4), &PersonalBestTable::new());
        let lanes: Vec<_> = board.iter().map(|e| e.lane).collect();
        assert_eq!(lanes, vec![3, 2, 1, 4]);
        assert_eq!(board[0].medal, Some(Medal::Gold));
        assert_eq!(board[1].medal, Some(Medal::Silver));
        assert_eq!(board[2].medal, None);
        assert_eq!(board[2].place, None);
        assert_eq!(board[2].display_time(), "--");
        assert_eq!(board[0].display_time(), "12.50s");
    }

    #[test]
    fn only_three_medals() {
        let runners: Vec<_> = (1..=4).map(|l| runner(l, Some(10.0 + l as f32))).collect();
        let board = rank(&runners, &NameTable::new(4), &PersonalBestTable::new());
        let medals: Vec<_> = board.iter().map(|e| e.medal).collect();
        assert_eq!(
            medals,
            vec![Some(Medal::Gold), Some(Medal::Silver), Some(Medal::Bronze), None]
        );
        assert_eq!(board[3].place, Some(4));
    }

    #[test]
    fn personal_best_min_merge() {
        let names = NameTable::from_names(1, &["Ana".to_string()]);
        let mut table = PersonalBestTable::new();

        table = finalize(&[runner(1, Some(12.5))], &names, &table);
        assert_eq!(table.get("Ana"), Some(12.5));
        table = finalize(&[runner(1, Some(13.0))], &names, &table);
        assert_eq!(table.get("Ana"), Some(12.5));
        table = finalize(&[runner(1, Some(11.9))], &names, &table);
        assert_eq!(table.get("Ana"), Some(11.9));
    }

    #[test]
    fn finalize_is_idempotent() {
        let runners = vec![runner(1, Some(12.0)), runner(2, Some(14.0)), runner(3, None)];
        let names = NameTable::new(3);
        let once = finalize(&runners, &names, &PersonalBestTable::new());
        let twice = finalize(&runners, &names, &once);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn merge_reports_improvements_only() {
        let names = NameTable::new(2);
        let mut table = PersonalBestTable::new();
        table.record("Lane 2", 10.0);
        let improved = table.merge_results(&[runner(1, Some(12.0)), runner(2, Some(11.0))], &names);
        assert_eq!(improved, vec!["Lane 1".to_string()]);
        assert!(!table.record("Lane 1", f32::NAN));
    }

    #[test]
    fn scoreboard_shows_personal_bests_by_name() {
        let names = NameTable::from_names(2, &["Ana".to_string(), "Bo".to_string()]);
        let mut bests = PersonalBestTable::new();
        bests.record("Bo", 11.0);
        let board = rank(&[runner(1, Some(12.0)), runner(2, Some(12.5))], &names, &bests);
        assert_eq!(board[0].name, "Ana");
        assert_eq!(board[0].display_best(), "--");
        assert!(board[0].new_personal_best);
        assert_eq!(board[1].personal_best, Some(11.0));
        assert!(!board[1].new_personal_best);
    }

    #[test]
    fn tying_the_record_is_not_a_new_best() {
        let names = NameTable::from_names(1, &["Ana".to_string()]);
        let mut bests = PersonalBestTable::new();
        bests.record("Ana", 12.5);

        let runners = [runner(1, Some(12.5))];
        let board = rank(&runners, &names, &bests);
        assert!(!board[0].new_personal_best);
        assert!(bests.merge_results(&runners, &names).is_empty());
        assert!(rank(&[runner(1, Some(12.4))], &names, &bests)[0].new_personal_best);
    }

    #[test]
    fn names_are_normalized() {
        let names = NameTable::from_names(4, &["  Ana ".into(), "".into(), "   ".into()]);
        assert_eq!(names.names(), &["Ana", "Lane 2", "Lane 3", "Lane 4"]);
        assert_eq!(names.name(9), "Lane 9");
    }

    #[test]
    fn malformed_stored_records_fall_back_to_defaults() {
        let mut store = MemoryStore::new();
        store.set(NAMES_KEY, "[\"only one\"]".into()).unwrap();
        store.set(PERSONAL_BESTS_KEY, "not json".into()).unwrap();
        assert_eq!(NameTable::load(&store, 4), NameTable::new(4));
        assert!(PersonalBestTable::load(&store).is_empty());

        store.set(NAMES_KEY, "{\"a\":1}".into()).unwrap();
        store
            .set(PERSONAL_BESTS_KEY, "{\"Ana\":12.5,\"Bo\":-1.0}".into())
            .unwrap();
        assert_eq!(NameTable::load(&store, 4), NameTable::new(4));
        let bests = PersonalBestTable::load(&store);
        assert_eq!(bests.get("Ana"), Some(12.5));
        assert_eq!(bests.get("Bo"), None);
    }

    #[test]
    fn names_and_bests_round_trip_through_store() {
        let mut store = MemoryStore::new();
        let names = NameTable::from_names(4, &["Ana".into(), "Bo".into(), "Cy".into(), "Di".into()]);
        names.save(&mut store);
        assert_eq!(NameTable::load(&store, 4), names);

        let mut bests = PersonalBestTable::new();
        bests.record("Ana", 12.5);
        bests.save(&mut store);
        assert_eq!(PersonalBestTable::load(&store), bests);
    }
}
