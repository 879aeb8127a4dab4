use crate::app_dirs::AppDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Root path used when the caller does not supply one
pub const DEFAULT_ROOT_PATH: &str = "user/gamestats";

const USER_PREFIX: &str = "user";
const MACHINE_PREFIX: &str = "machine";

/// Persistence domain a namespace lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreRoot {
    User,
    Machine,
    /// Readable and writable by exact path, but fields cannot be listed or deleted
    Unsupported,
}

impl fmt::Display for StoreRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreRoot::User => write!(f, "{USER_PREFIX}"),
            StoreRoot::Machine => write!(f, "{MACHINE_PREFIX}"),
            StoreRoot::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// A resolved store namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorePath {
    root: StoreRoot,
    sub_path: String,
    raw: String,
}

impl StorePath {
    /// Resolve a caller-supplied root path such as `user/solitaire`.
    ///
    /// Empty or blank input falls back to [`DEFAULT_ROOT_PATH`].
    pub fn resolve(root_path: Option<&str>) -> Self {
        let raw = match root_path.map(str::trim) {
            Some(p) if !p.is_empty() => p.replace('\\', "/"),
            _ => DEFAULT_ROOT_PATH.to_string(),
        };

        let (head, rest) = match raw.split_once('/') {
            Some((head, rest)) => (head, rest),
            None => (raw.as_str(), ""),
        };

        let root = if head.eq_ignore_ascii_case(USER_PREFIX) {
            StoreRoot::User
        } else if head.eq_ignore_ascii_case(MACHINE_PREFIX) {
            StoreRoot::Machine
        } else {
            StoreRoot::Unsupported
        };

        let sub_path = match root {
            StoreRoot::Unsupported => raw.clone(),
            _ => rest.trim_matches('/').to_string(),
        };

        Self {
            root,
            sub_path,
            raw,
        }
    }

    pub fn root(&self) -> StoreRoot {
        self.root
    }

    pub fn sub_path(&self) -> &str {
        &self.sub_path
    }

    /// Path as given by the caller, separators normalised
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Key the backing store files fields under.
    ///
    /// Supported roots normalise the prefix so `User/x` and `user/x` share data.
    pub fn namespace_key(&self) -> String {
        match self.root {
            StoreRoot::Unsupported => self.raw.clone(),
            root => format!("{root}/{}", self.sub_path),
        }
    }

    pub fn supports_enumeration(&self) -> bool {
        self.root != StoreRoot::Unsupported
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
    /// Listing or deleting under a root that is not `user/` or `machine/`
    UnsupportedRoot(String),
    /// Backend refused the operation
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "settings database error: {e}"),
            StoreError::Io(e) => write!(f, "settings io error: {e}"),
            StoreError::UnsupportedRoot(path) => {
                write!(f, "store root of '{path}' does not support listing or deleting")
            }
            StoreError::Unavailable(msg) => write!(f, "settings store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Sqlite(e) => Some(e),
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// String-keyed persistence the statistics engine reads and writes through
pub trait SettingsStore {
    fn get(&self, path: &StorePath, field: &str) -> Result<Option<String>>;

    fn set(&mut self, path: &StorePath, field: &str, value: &str) -> Result<()>;

    /// Remove a field. Removing a field that is not present succeeds.
    fn delete(&mut self, path: &StorePath, field: &str) -> Result<()>;

    /// Field names under `path` starting with `prefix`, sorted
    fn list_fields(&self, path: &StorePath, prefix: &str) -> Result<Vec<String>>;

    /// Read a field, falling back to `default` when it is absent or unreadable
    fn get_or(&self, path: &StorePath, field: &str, default: &str) -> String {
        match self.get(path, field) {
            Ok(Some(value)) => value,
            _ => default.to_string(),
        }
    }
}

fn require_enumeration(path: &StorePath) -> Result<()> {
    if path.supports_enumeration() {
        Ok(())
    } else {
        Err(StoreError::UnsupportedRoot(path.raw().to_string()))
    }
}

const CREATE_SETTINGS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS settings (
        namespace TEXT NOT NULL,
        field TEXT NOT NULL,
        value TEXT NOT NULL,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (namespace, field)
    )
"#;

/// SQLite-backed settings store
#[derive(Debug)]
pub struct SqliteSettingsStore {
    conn: Connection,
}

impl SqliteSettingsStore {
    /// Open (or create) the settings database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open the database at the default application location
    pub fn open_default() -> Result<Self> {
        let path = Self::default_path()
            .ok_or_else(|| StoreError::Unavailable("no home or data directory".to_string()))?;
        Self::open(path)
    }

    pub fn default_path() -> Option<PathBuf> {
        AppDirs::db_path()
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(CREATE_SETTINGS_TABLE, [])?;
        Ok(Self { conn })
    }
}

impl SettingsStore for SqliteSettingsStore {
    fn get(&self, path: &StorePath, field: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE namespace = ?1 AND field = ?2",
                params![path.namespace_key(), field],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, path: &StorePath, field: &str, value: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO settings (namespace, field, value) VALUES (?1, ?2, ?3)
            ON CONFLICT(namespace, field)
            DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            "#,
            params![path.namespace_key(), field, value],
        )?;
        Ok(())
    }

    fn delete(&mut self, path: &StorePath, field: &str) -> Result<()> {
        require_enumeration(path)?;
        self.conn.execute(
            "DELETE FROM settings WHERE namespace = ?1 AND field = ?2",
            params![path.namespace_key(), field],
        )?;
        Ok(())
    }

    fn list_fields(&self, path: &StorePath, prefix: &str) -> Result<Vec<String>> {
        require_enumeration(path)?;
        let mut stmt = self.conn.prepare(
            "SELECT field FROM settings WHERE namespace = ?1 AND substr(field, 1, length(?2)) = ?2 ORDER BY field",
        )?;

        let field_iter = stmt.query_map(params![path.namespace_key(), prefix], |row| {
            row.get::<_, String>(0)
        })?;

        let mut fields = Vec::new();
        for field in field_iter {
            fields.push(field?);
        }
        Ok(fields)
    }
}

/// In-memory store for tests and throwaway sessions.
///
/// Writes and deletes can be switched to fail to exercise error paths.
#[derive(Debug, Default, Clone)]
pub struct MemorySettingsStore {
    values: HashMap<(String, String), String>,
    pub fail_writes: bool,
    pub fail_deletes: bool,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Store a raw value, bypassing the failure switches
    pub fn insert_raw(&mut self, path: &StorePath, field: &str, value: &str) {
        self.values
            .insert((path.namespace_key(), field.to_string()), value.to_string());
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, path: &StorePath, field: &str) -> Result<Option<String>> {
        Ok(self
            .values
            .get(&(path.namespace_key(), field.to_string()))
            .cloned())
    }

    fn set(&mut self, path: &StorePath, field: &str, value: &str) -> Result<()> {
        if self.fail_writes {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        self.insert_raw(path, field, value);
        Ok(())
    }

    fn delete(&mut self, path: &StorePath, field: &str) -> Result<()> {
        require_enumeration(path)?;
        if self.fail_deletes {
            return Err(StoreError::Unavailable("deletes disabled".to_string()));
        }
        self.values
            .remove(&(path.namespace_key(), field.to_string()));
        Ok(())
    }

    fn list_fields(&self, path: &StorePath, prefix: &str) -> Result<Vec<String>> {
        require_enumeration(path)?;
        let namespace = path.namespace_key();
        let mut fields: Vec<String> = self
            .values
            .keys()
            .filter(|(ns, field)| *ns == namespace && field.starts_with(prefix))
            .map(|(_, field)| field.clone())
            .collect();
        fields.sort();
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn resolve_user_and_machine_roots() {
        let user = StorePath::resolve(Some("user/solitaire"));
        assert_eq!(user.root(), StoreRoot::User);
        assert_eq!(user.sub_path(), "solitaire");

        let machine = StorePath::resolve(Some("MACHINE\\games\\mines"));
        assert_eq!(machine.root(), StoreRoot::Machine);
        assert_eq!(machine.sub_path(), "games/mines");
        assert_eq!(machine.namespace_key(), "machine/games/mines");
    }

    #[test]
    fn resolve_defaults_when_empty() {
        assert_eq!(StorePath::resolve(None).raw(), DEFAULT_ROOT_PATH);
        assert_eq!(StorePath::resolve(Some("   ")).raw(), DEFAULT_ROOT_PATH);
        assert_eq!(StorePath::resolve(Some("")).root(), StoreRoot::User);
    }

    #[test]
    fn resolve_unknown_prefix_is_unsupported() {
        let path = StorePath::resolve(Some("classes/solitaire"));
        assert_eq!(path.root(), StoreRoot::Unsupported);
        assert!(!path.supports_enumeration());
        assert_eq!(path.namespace_key(), "classes/solitaire");
    }

    #[test]
    fn prefix_case_shares_namespace() {
        let a = StorePath::resolve(Some("User/chess"));
        let b = StorePath::resolve(Some("user/chess"));
        assert_eq!(a.namespace_key(), b.namespace_key());
    }

    #[test]
    fn sqlite_set_get_overwrite() {
        let mut store = SqliteSettingsStore::open_in_memory().unwrap();
        let path = StorePath::resolve(Some("user/test"));

        assert_eq!(store.get(&path, "games_won").unwrap(), None);
        store.set(&path, "games_won", "1").unwrap();
        store.set(&path, "games_won", "2").unwrap();
        assert_eq!(store.get(&path, "games_won").unwrap().as_deref(), Some("2"));
        assert_eq!(store.get_or(&path, "missing", "0"), "0");
    }

    #[test]
    fn sqlite_list_and_delete() {
        let mut store = SqliteSettingsStore::open_in_memory().unwrap();
        let path = StorePath::resolve(Some("user/test"));
        let other = StorePath::resolve(Some("user/other"));

        store.set(&path, "custom.b", "2").unwrap();
        store.set(&path, "custom.a", "1").unwrap();
        store.set(&path, "games_won", "3").unwrap();
        store.set(&other, "custom.c", "9").unwrap();

        let fields = store.list_fields(&path, "custom.").unwrap();
        assert_eq!(fields, vec!["custom.a".to_string(), "custom.b".to_string()]);

        store.delete(&path, "custom.a").unwrap();
        store.delete(&path, "never_written").unwrap();
        assert_eq!(store.list_fields(&path, "custom.").unwrap(), vec!["custom.b"]);
        assert_eq!(store.get(&other, "custom.c").unwrap().as_deref(), Some("9"));
    }

    #[test]
    fn sqlite_prefix_is_literal() {
        let mut store = SqliteSettingsStore::open_in_memory().unwrap();
        let path = StorePath::resolve(Some("user/test"));
        store.set(&path, "custom_x", "1").unwrap();
        store.set(&path, "customs", "1").unwrap();

        assert!(store.list_fields(&path, "custom%").unwrap().is_empty());
        assert_eq!(store.list_fields(&path, "custom_").unwrap(), vec!["custom_x"]);
    }

    #[test]
    fn sqlite_unsupported_root_rejects_enumeration() {
        let mut store = SqliteSettingsStore::open_in_memory().unwrap();
        let path = StorePath::resolve(Some("elsewhere/test"));

        store.set(&path, "games_won", "1").unwrap();
        assert_eq!(store.get(&path, "games_won").unwrap().as_deref(), Some("1"));
        assert_matches!(
            store.list_fields(&path, ""),
            Err(StoreError::UnsupportedRoot(_))
        );
        assert_matches!(
            store.delete(&path, "games_won"),
            Err(StoreError::UnsupportedRoot(_))
        );
    }

    #[test]
    fn sqlite_persists_across_connections() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("settings.db");
        let path = StorePath::resolve(Some("machine/test"));

        {
            let mut store = SqliteSettingsStore::open(&db_path).unwrap();
            store.set(&path, "highest_score", "120").unwrap();
        }

        let store = SqliteSettingsStore::open(&db_path).unwrap();
        assert_eq!(
            store.get(&path, "highest_score").unwrap().as_deref(),
            Some("120")
        );
    }

    #[test]
    fn memory_store_failure_switches() {
        let mut store = MemorySettingsStore::new();
        let path = StorePath::resolve(None);

        store.set(&path, "games_won", "1").unwrap();
        store.fail_writes = true;
        assert_matches!(
            store.set(&path, "games_won", "2"),
            Err(StoreError::Unavailable(_))
        );
        assert_eq!(store.get(&path, "games_won").unwrap().as_deref(), Some("1"));

        store.fail_deletes = true;
        assert!(store.delete(&path, "games_won").is_err());
        assert_eq!(store.len(), 1);
    }
}
