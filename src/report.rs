use crate::clock::Clock;
use crate::statistics::{Statistics, StatisticsState};
use crate::store::SettingsStore;
use chrono::{DateTime, Local};
use log::error;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

pub const TITLE: &str = "Game Statistics";
pub const NO_STATISTICS: &str = "No statistics gathered.";
pub const MIN_RULE_WIDTH: usize = 30;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const SECS_PER_DAY: u64 = 86_400;

#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

pub fn format_timestamp(ts: &DateTime<Local>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// `Dd HH:MM:SS` from one day up, `HH:MM:SS.fff` below that
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let days = total / SECS_PER_DAY;
    let hours = (total % SECS_PER_DAY) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{days}d {hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!(
            "{hours:02}:{minutes:02}:{seconds:02}.{:03}",
            d.subsec_millis()
        )
    }
}

fn title(state: &StatisticsState) -> String {
    if state.game_name.is_empty() {
        TITLE.to_string()
    } else {
        format!("{} {TITLE}", state.game_name)
    }
}

fn timestamps_section(state: &StatisticsState) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(ts) = &state.last_played {
        lines.push(format!("Last played: {}", format_timestamp(ts)));
    }
    if let Some(ts) = &state.last_won {
        lines.push(format!("Last won: {}", format_timestamp(ts)));
    }
    lines
}

fn games_section(state: &StatisticsState) -> Vec<String> {
    let mut lines = Vec::new();
    let counters = [
        ("Games started", state.games_started),
        ("Games won", state.games_won),
        ("Games lost", state.games_lost),
        ("Games tied", state.games_tied),
    ];
    for (label, value) in counters {
        if value > 0 {
            lines.push(format!("{label}: {value}"));
        }
    }

    let not_finished = state.games_not_finished();
    if state.games_started > 0
        && (state.games_won > 0 || state.games_lost > 0)
        && not_finished > 0
    {
        lines.push(format!("Games aborted or not finished: {not_finished}"));
    }

    if state.highest_score > 0 {
        lines.push(format!("Highest score: {}", state.highest_score));
    }
    lines
}

fn moves_section(state: &StatisticsState) -> Vec<String> {
    [
        ("Moves made", state.moves_made),
        ("Least moves made", state.least_moves_made),
        ("Most moves made", state.most_moves_made),
    ]
    .into_iter()
    .filter(|(_, value)| *value > 0)
    .map(|(label, value)| format!("{label}: {value}"))
    .collect()
}

fn timing_section(state: &StatisticsState) -> Vec<String> {
    state
        .quickest_win_time
        .map(|d| vec![format!("Quickest time: {}", format_duration(d))])
        .unwrap_or_default()
}

fn custom_section(state: &StatisticsState) -> Vec<String> {
    state
        .custom_stats
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect()
}

/// Render the multi-section summary, lines separated by `\n`
pub fn render(state: &StatisticsState) -> String {
    let title = title(state);
    let width = title.chars().count().max(MIN_RULE_WIDTH);
    let divider = "-".repeat(width);

    let mut lines = vec![title, "=".repeat(width)];

    let sections: Vec<Vec<String>> = [
        timestamps_section(state),
        games_section(state),
        moves_section(state),
        timing_section(state),
        custom_section(state),
    ]
    .into_iter()
    .filter(|section| !section.is_empty())
    .collect();

    if sections.is_empty() {
        lines.push(NO_STATISTICS.to_string());
    } else {
        for (i, section) in sections.into_iter().enumerate() {
            if i > 0 {
                lines.push(divider.clone());
            }
            lines.extend(section);
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

impl<S: SettingsStore, C: Clock> Statistics<S, C> {
    pub fn to_display_string(&self) -> String {
        render(self.state())
    }

    /// Write the report to `path` using the platform line ending
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let report = self.to_display_string();
        let contents = report.replace('\n', LINE_ENDING);
        fs::write(path, contents)
    }

    /// Like [`Self::save_to_file`] but reduced to success or failure,
    /// logging the error when `report_errors` is set
    pub fn save_to_file_reporting<P: AsRef<Path>>(&self, path: P, report_errors: bool) -> bool {
        let path = path.as_ref();
        match self.save_to_file(path) {
            Ok(()) => true,
            Err(e) => {
                if report_errors {
                    error!("could not save statistics to {}: {}", path.display(), e);
                }
                false
            }
        }
    }
}
