use crate::clock::{Clock, SystemClock};
use crate::store::{SettingsStore, StoreError, StorePath, StoreRoot};
use chrono::{DateTime, Local};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::time::Duration;

/// Field names in the settings store
pub mod fields {
    pub const GAMES_STARTED: &str = "games_started";
    pub const GAMES_WON: &str = "games_won";
    pub const GAMES_LOST: &str = "games_lost";
    pub const GAMES_TIED: &str = "games_tied";
    pub const HIGHEST_SCORE: &str = "highest_score";
    pub const LEAST_MOVES_MADE: &str = "least_moves_made";
    pub const MOST_MOVES_MADE: &str = "most_moves_made";
    pub const QUICKEST_WIN_TIME: &str = "quickest_win_time";
    pub const LAST_PLAYED: &str = "last_played";
    pub const LAST_WON: &str = "last_won";

    /// Prefix reserved for caller-named counters
    pub const CUSTOM_PREFIX: &str = "custom.";

    pub const BUILT_IN: [&str; 10] = [
        GAMES_STARTED,
        GAMES_WON,
        GAMES_LOST,
        GAMES_TIED,
        HIGHEST_SCORE,
        LEAST_MOVES_MADE,
        MOST_MOVES_MADE,
        QUICKEST_WIN_TIME,
        LAST_PLAYED,
        LAST_WON,
    ];

    pub fn custom(name: &str) -> String {
        format!("{CUSTOM_PREFIX}{name}")
    }
}

/// Everything the engine tracks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticsState {
    pub game_name: String,
    pub games_started: u64,
    pub games_won: u64,
    pub games_lost: u64,
    pub games_tied: u64,
    pub highest_score: u64,
    pub moves_made: u64,
    pub least_moves_made: u64,
    pub most_moves_made: u64,
    pub quickest_win_time: Option<Duration>,
    pub last_played: Option<DateTime<Local>>,
    pub last_won: Option<DateTime<Local>>,
    pub start_time: Option<DateTime<Local>>,
    pub custom_stats: BTreeMap<String, i64>,
    pub stats_reset: bool,
}

impl StatisticsState {
    /// Games started but neither won, lost nor tied
    pub fn games_not_finished(&self) -> u64 {
        if self.games_started == 0 {
            return 0;
        }
        self.games_started
            .saturating_sub(self.games_won)
            .saturating_sub(self.games_lost)
            .saturating_sub(self.games_tied)
    }
}

/// Per-game statistics with best-effort persistence.
///
/// The engine is meant to be driven from a single owner thread. Every
/// mutating lifecycle call writes through to the store except move tracking.
#[derive(Debug)]
pub struct Statistics<S: SettingsStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
    path: StorePath,
    state: StatisticsState,
}

impl<S: SettingsStore> Statistics<S, SystemClock> {
    /// Load statistics from `store` under `root_path` (default root when `None` or empty)
    pub fn new(store: S, root_path: Option<&str>) -> Self {
        Self::with_clock(store, root_path, SystemClock)
    }
}

impl<S: SettingsStore, C: Clock> Statistics<S, C> {
    pub fn with_clock(store: S, root_path: Option<&str>, clock: C) -> Self {
        let path = StorePath::resolve(root_path);
        if path.root() == StoreRoot::Unsupported {
            warn!(
                "store root '{}' is unsupported; custom statistics cannot be listed or cleared",
                path
            );
        }

        let mut stats = Self {
            store,
            clock,
            path,
            state: StatisticsState::default(),
        };
        stats.load();
        stats
    }

    /// Best-effort load: a field that is missing or unreadable keeps its default.
    fn load(&mut self) {
        self.state.games_started = self.read_counter(fields::GAMES_STARTED);
        self.state.games_won = self.read_counter(fields::GAMES_WON);
        self.state.games_lost = self.read_counter(fields::GAMES_LOST);
        self.state.games_tied = self.read_counter(fields::GAMES_TIED);
        self.state.highest_score = self.read_counter(fields::HIGHEST_SCORE);
        self.state.least_moves_made = self.read_counter(fields::LEAST_MOVES_MADE);
        self.state.most_moves_made = self.read_counter(fields::MOST_MOVES_MADE);
        self.state.quickest_win_time = self
            .read_parsed(fields::QUICKEST_WIN_TIME, |v| v.parse::<u64>().ok())
            .map(Duration::from_micros);
        self.state.last_played = self.read_parsed(fields::LAST_PLAYED, parse_timestamp);
        self.state.last_won = self.read_parsed(fields::LAST_WON, parse_timestamp);

        match self.store.list_fields(&self.path, fields::CUSTOM_PREFIX) {
            Ok(names) => {
                for field in names {
                    let Some(name) = field.strip_prefix(fields::CUSTOM_PREFIX) else {
                        continue;
                    };
                    if name.is_empty() {
                        continue;
                    }
                    if let Some(value) = self.read_parsed(&field, |v| v.parse::<i64>().ok()) {
                        self.state.custom_stats.insert(name.to_string(), value);
                    }
                }
            }
            Err(StoreError::UnsupportedRoot(_)) => {}
            Err(e) => warn!("could not list custom statistics under '{}': {}", self.path, e),
        }
    }

    fn read_parsed<T>(&self, field: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        match self.store.get(&self.path, field) {
            Ok(Some(raw)) => {
                let parsed = parse(raw.trim());
                if parsed.is_none() {
                    warn!("ignoring unreadable value '{}' for {}", raw, field);
                }
                parsed
            }
            Ok(None) => None,
            Err(e) => {
                warn!("could not read {} from '{}': {}", field, self.path, e);
                None
            }
        }
    }

    fn read_counter(&self, field: &str) -> u64 {
        self.read_parsed(field, |v| v.parse::<u64>().ok())
            .unwrap_or(0)
    }

    pub fn state(&self) -> &StatisticsState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Hand the store back, e.g. to reload it into a fresh engine
    pub fn into_store(self) -> S {
        self.store
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    pub fn root(&self) -> StoreRoot {
        self.path.root()
    }

    pub fn game_name(&self) -> &str {
        &self.state.game_name
    }

    /// Set the report label. Empty names are ignored.
    pub fn set_game_name(&mut self, name: &str) {
        if !name.is_empty() {
            self.state.game_name = name.to_string();
        }
    }

    pub fn games_started(&self) -> u64 {
        self.state.games_started
    }

    pub fn games_won(&self) -> u64 {
        self.state.games_won
    }

    pub fn games_lost(&self) -> u64 {
        self.state.games_lost
    }

    pub fn games_tied(&self) -> u64 {
        self.state.games_tied
    }

    pub fn games_not_finished(&self) -> u64 {
        self.state.games_not_finished()
    }

    pub fn highest_score(&self) -> u64 {
        self.state.highest_score
    }

    pub fn moves_made(&self) -> u64 {
        self.state.moves_made
    }

    pub fn least_moves_made(&self) -> u64 {
        self.state.least_moves_made
    }

    pub fn most_moves_made(&self) -> u64 {
        self.state.most_moves_made
    }

    pub fn quickest_win_time(&self) -> Option<Duration> {
        self.state.quickest_win_time
    }

    pub fn last_played(&self) -> Option<DateTime<Local>> {
        self.state.last_played
    }

    pub fn last_won(&self) -> Option<DateTime<Local>> {
        self.state.last_won
    }

    pub fn start_time(&self) -> Option<DateTime<Local>> {
        self.state.start_time
    }

    /// True after a successful reset until the next game starts
    pub fn is_reset(&self) -> bool {
        self.state.stats_reset
    }

    pub fn custom_statistics(&self) -> impl Iterator<Item = (&str, i64)> {
        self.state
            .custom_stats
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
    }

    /// Start a game and count it in `games_started`
    pub fn start_game(&mut self, save_now: bool) {
        self.begin_game(true, save_now);
    }

    /// Start a game without counting it, for sessions finished with [`Self::game_done`]
    pub fn start_game_untracked(&mut self, save_now: bool) {
        self.begin_game(false, save_now);
    }

    fn begin_game(&mut self, track_started: bool, save_now: bool) {
        self.state.stats_reset = false;
        if track_started {
            self.state.games_started = self.state.games_started.saturating_add(1);
        }
        self.state.moves_made = 0;
        self.state.last_played = Some(self.clock.now());

        if save_now {
            self.persist();
        }

        self.state.start_time = Some(self.clock.now());
    }

    pub fn game_won(&mut self, score: u64) {
        let completed_at = self.clock.now();
        if self.state.stats_reset {
            return;
        }

        self.record_completion(completed_at);
        self.state.games_won = self.state.games_won.saturating_add(1);
        self.state.last_won = Some(completed_at);
        self.raise_highest_score(score);
        self.persist();
    }

    /// Count a loss. Move and time extrema are left alone.
    pub fn game_lost(&mut self, score: u64) {
        if self.state.stats_reset {
            return;
        }

        self.state.games_lost = self.state.games_lost.saturating_add(1);
        self.raise_highest_score(score);
        self.persist();
    }

    pub fn game_tied(&mut self) {
        if self.state.stats_reset {
            return;
        }

        self.state.games_tied = self.state.games_tied.saturating_add(1);
        self.persist();
    }

    /// Finish a game that has no winner or loser, updating only time and move extrema
    pub fn game_done(&mut self) {
        let completed_at = self.clock.now();
        if self.state.stats_reset {
            return;
        }

        self.record_completion(completed_at);
        self.persist();
    }

    // Counted even while reset; only a fresh start zeroes it.
    pub fn move_made(&mut self) {
        self.state.moves_made = self.state.moves_made.saturating_add(1);
    }

    pub fn zero_moves_made(&mut self) {
        self.state.moves_made = 0;
    }

    fn raise_highest_score(&mut self, score: u64) {
        if score > self.state.highest_score {
            self.state.highest_score = score;
        }
    }

    fn record_completion(&mut self, completed_at: DateTime<Local>) {
        let state = &mut self.state;

        if let Some(started) = state.start_time {
            let elapsed = (completed_at - started).to_std().unwrap_or_default();
            if state
                .quickest_win_time
                .is_none_or(|quickest| elapsed < quickest)
            {
                state.quickest_win_time = Some(elapsed);
            }
        }

        let moves = state.moves_made;
        if moves > 0 {
            if state.least_moves_made == 0 || moves < state.least_moves_made {
                state.least_moves_made = moves;
            }
            if moves > state.most_moves_made {
                state.most_moves_made = moves;
            }
        }
    }

    /// Write current state to the store. Skipped while reset.
    ///
    /// Every field is attempted; the first failure is returned.
    pub fn save_statistics(&mut self) -> Result<(), StoreError> {
        if self.state.stats_reset {
            return Ok(());
        }

        let state = &self.state;
        let mut writes: Vec<(String, String)> = Vec::new();
        let counters = [
            (fields::GAMES_STARTED, state.games_started),
            (fields::GAMES_WON, state.games_won),
            (fields::GAMES_LOST, state.games_lost),
            (fields::GAMES_TIED, state.games_tied),
            (fields::HIGHEST_SCORE, state.highest_score),
            (fields::LEAST_MOVES_MADE, state.least_moves_made),
            (fields::MOST_MOVES_MADE, state.most_moves_made),
        ];
        for (field, value) in counters {
            if value > 0 {
                writes.push((field.to_string(), value.to_string()));
            }
        }
        if let Some(quickest) = state.quickest_win_time {
            writes.push((
                fields::QUICKEST_WIN_TIME.to_string(),
                quickest.as_micros().to_string(),
            ));
        }
        if let Some(ts) = state.last_played {
            writes.push((fields::LAST_PLAYED.to_string(), ts.to_rfc3339()));
        }
        if let Some(ts) = state.last_won {
            writes.push((fields::LAST_WON.to_string(), ts.to_rfc3339()));
        }
        for (name, value) in &state.custom_stats {
            writes.push((fields::custom(name), value.to_string()));
        }

        let mut first_error = None;
        for (field, value) in writes {
            if let Err(e) = self.store.set(&self.path, &field, &value) {
                warn!("could not save {} to '{}': {}", field, self.path, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn persist(&mut self) {
        // failures are already logged per field
        let _ = self.save_statistics();
    }

    /// Clear everything in memory and in the store, then ignore lifecycle
    /// calls until the next game starts.
    ///
    /// Returns `false` and leaves state untouched if any stored field could not
    /// be deleted. `games_tied` survives a reset.
    pub fn reset_statistics(&mut self) -> bool {
        let mut targets: Vec<String> = fields::BUILT_IN.iter().map(|f| f.to_string()).collect();
        for name in self.state.custom_stats.keys() {
            targets.push(fields::custom(name));
        }
        match self.store.list_fields(&self.path, fields::CUSTOM_PREFIX) {
            Ok(stored) => targets.extend(stored),
            Err(e) => {
                warn!("reset of '{}' failed: {}", self.path, e);
                return false;
            }
        }
        targets.sort();
        targets.dedup();

        for field in &targets {
            if let Err(e) = self.store.delete(&self.path, field) {
                warn!("reset of '{}' failed deleting {}: {}", self.path, field, e);
                return false;
            }
        }

        let state = &mut self.state;
        state.games_started = 0;
        state.games_won = 0;
        state.games_lost = 0;
        state.highest_score = 0;
        state.moves_made = 0;
        state.least_moves_made = 0;
        state.most_moves_made = 0;
        state.quickest_win_time = None;
        state.last_played = None;
        state.last_won = None;
        state.start_time = None;
        state.custom_stats.clear();
        state.stats_reset = true;

        debug!("statistics under '{}' reset", self.path);
        true
    }

    /// Value of a custom counter, 0 if it was never created
    pub fn custom_statistic(&self, name: &str) -> i64 {
        self.state.custom_stats.get(name).copied().unwrap_or(0)
    }

    /// Set a custom counter, creating it if needed. Returns true if it was created.
    pub fn create_or_set_custom_statistic(&mut self, name: &str, value: i64) -> bool {
        if self.state.stats_reset {
            return false;
        }

        let created = self
            .state
            .custom_stats
            .insert(name.to_string(), value)
            .is_none();
        self.persist_custom(name, value);
        created
    }

    pub fn increment_custom_statistic(&mut self, name: &str) -> i64 {
        self.adjust_custom(name, 1)
    }

    pub fn decrement_custom_statistic(&mut self, name: &str) -> i64 {
        self.adjust_custom(name, -1)
    }

    fn adjust_custom(&mut self, name: &str, delta: i64) -> i64 {
        if self.state.stats_reset {
            return self.custom_statistic(name);
        }

        let entry = self.state.custom_stats.entry(name.to_string()).or_insert(0);
        *entry = entry.saturating_add(delta);
        let value = *entry;
        self.persist_custom(name, value);
        value
    }

    fn persist_custom(&mut self, name: &str, value: i64) {
        if let Err(e) = self
            .store
            .set(&self.path, &fields::custom(name), &value.to_string())
        {
            warn!("could not save custom statistic {}: {}", name, e);
        }
    }

    /// Remove a custom counter from the store, then from memory.
    ///
    /// The in-memory counter is kept if the store deletion fails.
    pub fn reset_custom_statistic(&mut self, name: &str) -> bool {
        match self.store.delete(&self.path, &fields::custom(name)) {
            Ok(()) => {
                self.state.custom_stats.remove(name);
                true
            }
            Err(e) => {
                warn!("could not reset custom statistic {}: {}", name, e);
                false
            }
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Local>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Local))
}
