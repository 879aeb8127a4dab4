// Library surface for the CLI and integration tests.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod report;
pub mod statistics;
pub mod store;

pub use statistics::{Statistics, StatisticsState};
pub use store::{MemorySettingsStore, SettingsStore, SqliteSettingsStore, StoreError, StoreRoot};
