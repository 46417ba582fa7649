//! File-backed cache of NSE session cookies.
//!
//! The exchange only answers API calls that carry cookies obtained from an
//! ordinary page visit. Those cookies are written to a small JSON file,
//! `{"cookie": {...}, "timestamp": "..."}`, and reused while they are younger
//! than the freshness window.
//!
//! The file is shared by every fetcher pointing at it. Writes go through a
//! temporary file and a rename, so readers never observe a partial document,
//! but there is no cross-process lock: two processes refreshing at once
//! simply race and the last writer wins.

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default cookie cache file name, resolved against the working directory.
pub const COOKIE_FILE: &str = "nse_cookie.json";

/// Hours a harvested cookie bundle stays fresh.
pub const DEFAULT_TTL_HOURS: i64 = 2;

/// Errors that can occur while reading or writing the cookie cache.
#[derive(Error, Debug)]
pub enum CookieError {
    /// No cache file exists yet.
    #[error("Cookie file '{0}' does not exist")]
    Missing(PathBuf),

    /// Failed to create the cache directory.
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        /// The path that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to read the cache file.
    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write the cache file.
    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        /// The path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to delete the cache file.
    #[error("Failed to delete file '{path}': {source}")]
    DeleteFile {
        /// The path that could not be deleted.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The cache file is not valid JSON of the expected shape.
    #[error("Failed to parse cookie file '{path}': {source}")]
    ParseJson {
        /// The path that could not be parsed.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Failed to serialize the bundle.
    #[error("Failed to serialize cookies: {0}")]
    SerializeJson(#[from] serde_json::Error),

    /// The capture timestamp is missing or unreadable.
    #[error("Invalid cookie timestamp: {0:?}")]
    InvalidTimestamp(Option<String>),
}

/// Result type for cookie cache operations.
pub type Result<T> = std::result::Result<T, CookieError>;

/// Name/value cookies captured together at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialBundle {
    cookies: BTreeMap<String, String>,
    captured_at: DateTime<Utc>,
}

impl CredentialBundle {
    /// Creates a bundle captured at the given instant.
    #[must_use]
    pub const fn new(cookies: BTreeMap<String, String>, captured_at: DateTime<Utc>) -> Self {
        Self {
            cookies,
            captured_at,
        }
    }

    /// Creates a bundle captured now.
    #[must_use]
    pub fn captured_now(cookies: BTreeMap<String, String>) -> Self {
        Self::new(cookies, Utc::now())
    }

    /// Returns the cookies.
    #[must_use]
    pub const fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    /// Consumes the bundle, returning the cookies.
    #[must_use]
    pub fn into_cookies(self) -> BTreeMap<String, String> {
        self.cookies
    }

    /// Returns the capture instant.
    #[must_use]
    pub const fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Returns the value of one cookie.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Returns true if no cookies were captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Returns true if the bundle is younger than `ttl` at `now`.
    #[must_use]
    pub fn is_fresh_at(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        now.signed_duration_since(self.captured_at) < ttl
    }

    /// Renders the cookies as a `Cookie` request header value.
    #[must_use]
    pub fn header_value(&self) -> Option<String> {
        cookie_header(&self.cookies)
    }
}

/// Renders cookies as `name=value; name2=value2`, or None when empty.
pub(crate) fn cookie_header(cookies: &BTreeMap<String, String>) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    Some(
        cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// On-disk layout of the cache file.
#[derive(Debug, Serialize, Deserialize)]
struct CookieFile {
    #[serde(default)]
    cookie: BTreeMap<String, String>,
    #[serde(default)]
    timestamp: Option<String>,
}

/// File-backed cookie cache with a freshness window.
#[derive(Debug, Clone)]
pub struct CookieStore {
    path: PathBuf,
    ttl: TimeDelta,
}

impl CookieStore {
    /// Creates a store backed by the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ttl: TimeDelta::hours(DEFAULT_TTL_HOURS),
        }
    }

    /// Creates a store backed by `nse_cookie.json` in the working directory.
    #[must_use]
    pub fn in_working_dir() -> Self {
        Self::new(COOKIE_FILE)
    }

    /// Creates a store in the per-user application data directory.
    ///
    /// - Linux: `~/.local/share/nsekit/nse_cookie.json`
    /// - macOS: `~/Library/Application Support/nsekit/nse_cookie.json`
    /// - Windows: `C:\Users\<User>\AppData\Roaming\nsekit\nse_cookie.json`
    ///
    /// Falls back to the working directory when no home directory is known.
    #[must_use]
    pub fn in_data_dir() -> Self {
        ProjectDirs::from("", "", "nsekit").map_or_else(Self::in_working_dir, |dirs| {
            Self::new(dirs.data_dir().join(COOKIE_FILE))
        })
    }

    /// Overrides the freshness window.
    #[must_use]
    pub fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns the cache file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the freshness window.
    #[must_use]
    pub const fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Loads the cached bundle if it is still fresh.
    ///
    /// Missing, unreadable, malformed or stale files all yield `None`.
    #[must_use]
    pub fn load(&self) -> Option<CredentialBundle> {
        self.load_at(Utc::now())
    }

    /// Loads the cached bundle if it is fresh at the given instant.
    #[must_use]
    pub fn load_at(&self, now: DateTime<Utc>) -> Option<CredentialBundle> {
        match self.read() {
            Ok(bundle) if bundle.is_empty() => {
                tracing::debug!(path = %self.path.display(), "cookie cache is empty");
                None
            }
            Ok(bundle) if bundle.is_fresh_at(now, self.ttl) => Some(bundle),
            Ok(bundle) => {
                tracing::debug!(
                    path = %self.path.display(),
                    captured_at = %bundle.captured_at(),
                    "cookie cache is stale"
                );
                None
            }
            Err(CookieError::Missing(_)) => None,
            Err(e) => {
                tracing::debug!(error = %e, "ignoring unusable cookie cache");
                None
            }
        }
    }

    /// Reads the cached bundle regardless of its age.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, malformed, or
    /// carries no valid timestamp.
    pub fn read(&self) -> Result<CredentialBundle> {
        if !self.path.exists() {
            return Err(CookieError::Missing(self.path.clone()));
        }
        let content = fs::read_to_string(&self.path).map_err(|e| CookieError::ReadFile {
            path: self.path.clone(),
            source: e,
        })?;
        let file: CookieFile =
            serde_json::from_str(&content).map_err(|e| CookieError::ParseJson {
                path: self.path.clone(),
                source: e,
            })?;

        let captured_at = file
            .timestamp
            .as_deref()
            .and_then(parse_timestamp)
            .ok_or(CookieError::InvalidTimestamp(file.timestamp.clone()))?;

        Ok(CredentialBundle::new(file.cookie, captured_at))
    }

    /// Persists a bundle, logging and discarding any failure.
    pub fn save(&self, bundle: &CredentialBundle) {
        if let Err(e) = self.try_save(bundle) {
            tracing::warn!(error = %e, "failed to persist cookies");
        }
    }

    /// Persists a bundle, replacing the file atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub fn try_save(&self, bundle: &CredentialBundle) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty())
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| CookieError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let file = CookieFile {
            cookie: bundle.cookies.clone(),
            timestamp: Some(bundle.captured_at.to_rfc3339()),
        };
        let json = serde_json::to_string(&file)?;

        let tmp = self.tmp_path();
        fs::write(&tmp, json).map_err(|e| CookieError::WriteFile {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            CookieError::WriteFile {
                path: self.path.clone(),
                source: e,
            }
        })?;

        tracing::debug!(path = %self.path.display(), count = bundle.cookies.len(), "saved cookies");
        Ok(())
    }

    /// Deletes the cache file if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be deleted.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| CookieError::DeleteFile {
                path: self.path.clone(),
                source: e,
            })?;
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Default for CookieStore {
    fn default() -> Self {
        Self::in_working_dir()
    }
}

/// Parses an RFC 3339 timestamp, or a naive ISO-8601 one read as local time.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bundle_at(captured_at: DateTime<Utc>) -> CredentialBundle {
        let cookies = BTreeMap::from([
            ("nseappid".to_string(), "app-token".to_string()),
            ("nsit".to_string(), "site-token".to_string()),
        ]);
        CredentialBundle::new(cookies, captured_at)
    }

    fn store(dir: &TempDir) -> CookieStore {
        CookieStore::new(dir.path().join(COOKIE_FILE))
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let bundle = CredentialBundle::captured_now(bundle_at(Utc::now()).into_cookies());

        store.try_save(&bundle).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.get("nsit"), Some("site-token"));
        assert_eq!(loaded.get("nseappid"), Some("app-token"));
        assert_eq!(loaded.captured_at().timestamp(), bundle.captured_at().timestamp());
    }

    #[test]
    fn test_freshness_boundary() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let captured = Utc::now();
        store.try_save(&bundle_at(captured)).unwrap();

        let almost = captured + TimeDelta::hours(2) - TimeDelta::seconds(1);
        assert!(store.load_at(almost).is_some());

        let expired = captured + TimeDelta::hours(2);
        assert!(store.load_at(expired).is_none());
    }

    #[test]
    fn test_custom_ttl() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).with_ttl(TimeDelta::minutes(5));
        let captured = Utc::now();
        store.try_save(&bundle_at(captured)).unwrap();

        assert!(store.load_at(captured + TimeDelta::minutes(4)).is_some());
        assert!(store.load_at(captured + TimeDelta::minutes(5)).is_none());
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(store.load().is_none());
        assert!(matches!(store.read(), Err(CookieError::Missing(_))));

        fs::write(store.path(), "not json").unwrap();
        assert!(store.load().is_none());
        assert!(matches!(store.read(), Err(CookieError::ParseJson { .. })));

        fs::write(store.path(), r#"{"cookie": {"nsit": "x"}}"#).unwrap();
        assert!(store.load().is_none());
        assert!(matches!(store.read(), Err(CookieError::InvalidTimestamp(None))));
    }

    #[test]
    fn test_naive_timestamp_is_accepted() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let now_local = Local::now().naive_local();
        let content = format!(
            r#"{{"cookie": {{"nsit": "abc"}}, "timestamp": "{}"}}"#,
            now_local.format("%Y-%m-%dT%H:%M:%S%.6f")
        );
        fs::write(store.path(), content).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.get("nsit"), Some("abc"));
    }

    #[test]
    fn test_empty_cookie_map_is_not_fresh() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store
            .try_save(&CredentialBundle::captured_now(BTreeMap::new()))
            .unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_failure_is_swallowed() {
        let dir = TempDir::new().unwrap();
        // The target is a directory, so the final rename fails.
        let store = CookieStore::new(dir.path());
        store.save(&bundle_at(Utc::now()));
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let store = CookieStore::new(dir.path().join("nested").join(COOKIE_FILE));
        store.try_save(&bundle_at(Utc::now())).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.try_save(&bundle_at(Utc::now())).unwrap();
        store.clear().unwrap();
        assert!(!store.path().exists());
        store.clear().unwrap();
    }

    #[test]
    fn test_header_value() {
        let bundle = bundle_at(Utc::now());
        assert_eq!(
            bundle.header_value().as_deref(),
            Some("nseappid=app-token; nsit=site-token")
        );
        assert_eq!(cookie_header(&BTreeMap::new()), None);
    }
}
