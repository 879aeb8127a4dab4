use clap::{Parser, Subcommand, ValueEnum};
use gamestats::{
    config::{Config, ConfigStore, FileConfigStore},
    SqliteSettingsStore, Statistics,
};
use log::debug;
use std::{error::Error, path::PathBuf};

/// track per-game statistics and print a summary
#[derive(Parser, Debug)]
#[clap(
    version,
    about,
    long_about = "Tracks games started, won, lost and tied, move counts, best times, high scores and custom counters, persisted between runs."
)]
pub struct Cli {
    /// settings database to use (default: ~/.local/state/gamestats/settings.db)
    #[clap(long)]
    db: Option<PathBuf>,

    /// store root, `user/<name>` or `machine/<name>`
    #[clap(short = 'r', long)]
    root: Option<String>,

    /// game name shown in the report title
    #[clap(short = 'n', long)]
    name: Option<String>,

    /// config file to read defaults from
    #[clap(long)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// print the statistics report
    Show,
    /// record a game start
    Start {
        /// do not count the game in games started
        #[clap(long)]
        untracked: bool,
    },
    /// record a win (no timing or moves across separate runs, see `play`)
    Won { score: u64 },
    /// record a loss
    Lost { score: u64 },
    /// record a tie
    Tied,
    /// record a finished game without an outcome
    Done,
    /// play one whole game in this run: start, make moves, finish
    Play {
        outcome: Outcome,
        #[clap(short = 'm', long, default_value_t = 0)]
        moves: u64,
        #[clap(short = 's', long, default_value_t = 0)]
        score: u64,
        /// zero the move count before finishing, so the game adds no move extrema
        #[clap(long)]
        discard_moves: bool,
    },
    /// clear all statistics
    Reset,
    /// work with custom counters
    Custom {
        #[clap(subcommand)]
        action: CustomAction,
    },
    /// write the report to a file
    Export { path: PathBuf },
    /// print the effective configuration
    Config {
        /// store the effective configuration in the config file
        #[clap(long)]
        save: bool,
    },
}

#[derive(Subcommand, Debug)]
enum CustomAction {
    Get { name: String },
    Set { name: String, value: i64 },
    Incr { name: String },
    Decr { name: String },
    Reset { name: String },
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Outcome {
    Won,
    Lost,
    Tied,
    Done,
}

impl Cli {
    fn flag_config(&self) -> Config {
        Config {
            db_path: self.db.clone(),
            root_path: self.root.clone(),
            game_name: self.name.clone(),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let file_store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let config = cli.flag_config().or(file_store.load());
    debug!("using config {:?}", config);

    match cli.command {
        Command::Config { save } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if save {
                file_store.save(&config)?;
                debug!("config saved to {}", file_store.path().display());
            }
            Ok(())
        }
        command => run(command, &config),
    }
}

fn run(command: Command, config: &Config) -> Result<(), Box<dyn Error>> {
    let store = match &config.db_path {
        Some(path) => SqliteSettingsStore::open(path)?,
        None => SqliteSettingsStore::open_default()?,
    };
    let mut stats = Statistics::new(store, config.root_path.as_deref());
    if let Some(name) = &config.game_name {
        stats.set_game_name(name);
    }

    match command {
        Command::Show => print!("{}", stats.to_display_string()),
        Command::Start { untracked } => {
            if untracked {
                stats.start_game_untracked(true);
            } else {
                stats.start_game(true);
            }
        }
        Command::Won { score } => stats.game_won(score),
        Command::Lost { score } => stats.game_lost(score),
        Command::Tied => stats.game_tied(),
        Command::Done => stats.game_done(),
        Command::Play {
            outcome,
            moves,
            score,
            discard_moves,
        } => {
            if let Outcome::Done = outcome {
                stats.start_game_untracked(true);
            } else {
                stats.start_game(true);
            }
            for _ in 0..moves {
                stats.move_made();
            }
            if discard_moves {
                stats.zero_moves_made();
            }
            match outcome {
                Outcome::Won => stats.game_won(score),
                Outcome::Lost => stats.game_lost(score),
                Outcome::Tied => stats.game_tied(),
                Outcome::Done => stats.game_done(),
            }
        }
        Command::Reset => {
            if !stats.reset_statistics() {
                return Err(format!("could not reset statistics under '{}'", stats.path()).into());
            }
            println!("statistics reset");
        }
        Command::Custom { action } => match action {
            CustomAction::Get { name } => println!("{}", stats.custom_statistic(&name)),
            CustomAction::Set { name, value } => {
                stats.create_or_set_custom_statistic(&name, value);
                println!("{}", stats.custom_statistic(&name));
            }
            CustomAction::Incr { name } => println!("{}", stats.increment_custom_statistic(&name)),
            CustomAction::Decr { name } => println!("{}", stats.decrement_custom_statistic(&name)),
            CustomAction::Reset { name } => {
                if !stats.reset_custom_statistic(&name) {
                    return Err(format!("could not reset custom statistic '{name}'").into());
                }
            }
        },
        Command::Config { .. } => {}
        Command::Export { path } => {
            if !stats.save_to_file_reporting(&path, true) {
                return Err(format!("could not write {}", path.display()).into());
            }
        }
    }

    Ok(())
}
