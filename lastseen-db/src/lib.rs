mod document;
mod error;
mod models;

pub use document::Document;
pub use error::{DbError, Result};
pub use models::{LAST_SEEN_STORE, LastSeenStatus, PlayerName, player_key};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// File extension of every store document.
pub const STORE_EXTENSION: &str = "yml";

/// File-backed key/value store for one YAML document.
///
/// Reads and writes are handed to tokio's blocking pool so the caller's task
/// never waits on the filesystem. Cloning is cheap and every clone shares the
/// same document and write lock.
#[derive(Clone)]
pub struct DataStorage {
  inner: Arc<Inner>,
}

struct Inner {
  path: PathBuf,
  document: RwLock<Document>,
  /// Held across mutation and the file write so the file always reflects
  /// some completed sequence of sets.
  write_lock: Mutex<()>,
}

impl DataStorage {
  /// Open the store `<dir>/<id>.yml`, creating the file if it is missing.
  ///
  /// Failures are logged and leave the store empty, matching the plugin's
  /// long-standing behaviour. Use [`DataStorage::try_open`] to see the error.
  pub fn open(id: &str, dir: impl AsRef<Path>) -> Self {
    let path = store_path(id, dir.as_ref());
    match load(&path) {
      Ok(document) => Self::from_parts(path, document),
      Err(e) => {
        error!(path = %path.display(), error = %e, "failed to open store, starting empty");
        Self::from_parts(path, Document::new())
      }
    }
  }

  /// Open the store `<dir>/<id>.yml`, reporting creation or parse failures.
  pub fn try_open(id: &str, dir: impl AsRef<Path>) -> Result<Self> {
    let path = store_path(id, dir.as_ref());
    let document = load(&path)?;
    Ok(Self::from_parts(path, document))
  }

  fn from_parts(path: PathBuf, document: Document) -> Self {
    info!(path = %path.display(), entries = document.leaf_count(), "store loaded");
    Self {
      inner: Arc::new(Inner {
        path,
        document: RwLock::new(document),
        write_lock: Mutex::new(()),
      }),
    }
  }

  /// Path of the backing file.
  pub fn path(&self) -> &Path {
    &self.inner.path
  }

  /// Read the integer stored at `key`.
  ///
  /// Returns `None` when the key is absent, holds a non-integer, or the read
  /// could not complete. With `measure_latency` set, one `info` line reports
  /// how long the lookup took from the moment it was scheduled.
  pub async fn get(&self, key: &str, measure_latency: bool) -> Option<i64> {
    let start = measure_latency.then(Instant::now);
    let inner = Arc::clone(&self.inner);
    let key = key.to_lowercase();

    let value = match tokio::task::spawn_blocking(move || inner.read(&key)).await {
      Ok(value) => value,
      Err(e) => {
        warn!(error = %e, "store read did not complete");
        None
      }
    };

    if let Some(start) = start {
      let elapsed_ms = start.elapsed().as_millis() as u64;
      info!(elapsed_ms, "[DEBUG] Completed {} ms later.", elapsed_ms);
    }

    value
  }

  /// Store `value` at `key` and persist the whole document.
  ///
  /// The key is lower-cased. Once scheduled the write runs to completion even
  /// if the returned future is dropped. Any failure is logged and returned;
  /// if only the file write failed, the in-memory value is kept.
  pub async fn set(&self, key: &str, value: i64) -> Result<()> {
    let inner = Arc::clone(&self.inner);
    let key = key.to_lowercase();
    let task_key = key.clone();

    let result = match tokio::task::spawn_blocking(move || inner.write(&task_key, value)).await {
      Ok(result) => result,
      Err(e) => Err(e.into()),
    };

    if let Err(e) = &result {
      error!(path = %self.inner.path.display(), %key, error = %e, "failed to save store");
    }
    result
  }
}

impl Inner {
  fn read(&self, key: &str) -> Option<i64> {
    let document = self.document.read().unwrap_or_else(|e| e.into_inner());
    document.get_i64(key)
  }

  fn write(&self, key: &str, value: i64) -> Result<()> {
    let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

    let contents = {
      let mut document = self.document.write().unwrap_or_else(|e| e.into_inner());
      document.set_i64(key, value)?;
      document.to_yaml()?
    };

    persist(&self.path, &contents)?;
    debug!(%key, value, "stored value");
    Ok(())
  }
}

fn store_path(id: &str, dir: &Path) -> PathBuf {
  dir.join(format!("{id}.{STORE_EXTENSION}"))
}

/// Create the file (and its directory) if needed, then parse it.
fn load(path: &Path) -> Result<Document> {
  if !path.exists() {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::File::create(path)?;
    debug!(path = %path.display(), "created empty store file");
    return Ok(Document::new());
  }

  let contents = fs::read_to_string(path)?;
  Document::parse(&contents)
}

/// Write to a sibling temp file, then rename it over the original.
fn persist(path: &Path, contents: &str) -> Result<()> {
  let temp_path = path.with_extension(format!("{STORE_EXTENSION}.tmp"));
  fs::write(&temp_path, contents)?;
  fs::rename(&temp_path, path)?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;
  use tempfile::tempdir;

  fn now() -> i64 {
    1700000000000 // Fixed timestamp for testing
  }

  #[tokio::test]
  async fn test_absent_key_reads_none() {
    let dir = tempdir().unwrap();
    let store = DataStorage::try_open(LAST_SEEN_STORE, dir.path()).unwrap();

    assert_eq!(store.get("players.bob.last-seen", false).await, None);
    assert_eq!(
      LastSeenStatus::from_stored(store.get("players.bob.last-seen", false).await),
      LastSeenStatus::Never
    );
  }

  #[tokio::test]
  async fn test_set_then_get() {
    let dir = tempdir().unwrap();
    let store = DataStorage::try_open(LAST_SEEN_STORE, dir.path()).unwrap();

    store.set("players.alice.last-seen", 1000).await.unwrap();
    assert_eq!(store.get("players.alice.last-seen", false).await, Some(1000));
  }

  #[tokio::test]
  async fn test_keys_are_case_insensitive() {
    let dir = tempdir().unwrap();
    let store = DataStorage::try_open(LAST_SEEN_STORE, dir.path()).unwrap();

    store.set(&player_key("Steve"), now()).await.unwrap();
    assert_eq!(store.get(&player_key("steve"), false).await, Some(now()));
    assert_eq!(store.get(&player_key("STEVE"), true).await, Some(now()));
  }

  #[tokio::test]
  async fn test_open_creates_missing_file_and_directory() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("plugins").join("LastSeen");

    let store = DataStorage::try_open(LAST_SEEN_STORE, &nested).unwrap();
    assert_eq!(store.path(), nested.join("last-seen.yml"));
    assert!(store.path().exists());
    assert_eq!(fs::read_to_string(store.path()).unwrap(), "");
  }

  #[tokio::test]
  async fn test_reopen_restores_persisted_values() {
    let dir = tempdir().unwrap();
    {
      let store = DataStorage::try_open(LAST_SEEN_STORE, dir.path()).unwrap();
      store.set(&player_key("alice"), now()).await.unwrap();
      store.set(&player_key("bob"), now() + 1).await.unwrap();
      store.set(&player_key("alice"), now() + 2).await.unwrap();
    }

    let store = DataStorage::try_open(LAST_SEEN_STORE, dir.path()).unwrap();
    assert_eq!(store.get(&player_key("alice"), false).await, Some(now() + 2));
    assert_eq!(store.get(&player_key("bob"), false).await, Some(now() + 1));
  }

  #[tokio::test]
  async fn test_file_is_readable_yaml() {
    let dir = tempdir().unwrap();
    let store = DataStorage::try_open(LAST_SEEN_STORE, dir.path()).unwrap();
    store.set(&player_key("alice"), 1000).await.unwrap();

    let contents = fs::read_to_string(store.path()).unwrap();
    let value: serde_yaml::Value = serde_yaml::from_str(&contents).unwrap();
    assert_eq!(value["players"]["alice"]["last-seen"].as_i64(), Some(1000));
    assert!(!store.path().with_extension("yml.tmp").exists());
  }

  #[tokio::test]
  async fn test_hand_edited_keys_are_preserved() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("last-seen.yml");
    let mut file = fs::File::create(&path).unwrap();
    writeln!(file, "# edited by an admin").unwrap();
    writeln!(file, "notes: keep me").unwrap();
    writeln!(file, "players:").unwrap();
    writeln!(file, "  notch:").unwrap();
    writeln!(file, "    last-seen: 1234").unwrap();
    drop(file);

    let store = DataStorage::try_open(LAST_SEEN_STORE, dir.path()).unwrap();
    assert_eq!(store.get(&player_key("notch"), false).await, Some(1234));
    store.set(&player_key("jeb_"), 5678).await.unwrap();

    let reopened = Document::parse(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
      reopened.get("notes").and_then(serde_yaml::Value::as_str),
      Some("keep me")
    );
    assert_eq!(reopened.get_i64("players.notch.last-seen"), Some(1234));
    assert_eq!(reopened.get_i64("players.jeb_.last-seen"), Some(5678));
  }

  #[tokio::test]
  async fn test_open_swallows_malformed_file() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("last-seen.yml"), "players: [oops").unwrap();

    assert!(DataStorage::try_open(LAST_SEEN_STORE, dir.path()).is_err());

    let store = DataStorage::open(LAST_SEEN_STORE, dir.path());
    assert_eq!(store.get(&player_key("steve"), false).await, None);
  }

  #[tokio::test]
  async fn test_set_reports_persistence_failure() {
    let dir = tempdir().unwrap();
    let store = DataStorage::try_open(LAST_SEEN_STORE, dir.path()).unwrap();

    // A directory squatting on the temp path makes the write fail.
    fs::create_dir(store.path().with_extension("yml.tmp")).unwrap();

    let result = store.set(&player_key("steve"), now()).await;
    assert!(matches!(result, Err(DbError::Io(_))));

    // The in-memory mutation is not rolled back.
    assert_eq!(store.get(&player_key("steve"), false).await, Some(now()));

    // Nothing reached the disk.
    let on_disk = DataStorage::try_open(LAST_SEEN_STORE, dir.path()).unwrap();
    assert_eq!(on_disk.get(&player_key("steve"), false).await, None);
  }

  #[tokio::test]
  async fn test_invalid_key_is_an_error() {
    let dir = tempdir().unwrap();
    let store = DataStorage::try_open(LAST_SEEN_STORE, dir.path()).unwrap();

    assert!(matches!(
      store.set("players..last-seen", 1).await,
      Err(DbError::InvalidKey(_))
    ));
    assert_eq!(store.get("players..last-seen", false).await, None);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn test_concurrent_sets_to_different_keys() {
    let dir = tempdir().unwrap();
    let store = DataStorage::try_open(LAST_SEEN_STORE, dir.path()).unwrap();

    let handles: Vec<_> = (0..32)
      .map(|i| {
        let store = store.clone();
        tokio::spawn(async move { store.set(&player_key(&format!("player{i}")), now() + i).await })
      })
      .collect();
    for handle in handles {
      handle.await.unwrap().unwrap();
    }

    for i in 0..32 {
      assert_eq!(
        store.get(&player_key(&format!("player{i}")), false).await,
        Some(now() + i)
      );
    }

    let reopened = DataStorage::try_open(LAST_SEEN_STORE, dir.path()).unwrap();
    for i in 0..32 {
      assert_eq!(
        reopened.get(&player_key(&format!("player{i}")), false).await,
        Some(now() + i)
      );
    }
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn test_concurrent_sets_to_same_key() {
    let dir = tempdir().unwrap();
    let store = DataStorage::try_open(LAST_SEEN_STORE, dir.path()).unwrap();
    let written: Vec<i64> = (1..=16).map(|i| now() + i).collect();

    let handles: Vec<_> = written
      .iter()
      .map(|&value| {
        let store = store.clone();
        tokio::spawn(async move { store.set(&player_key("steve"), value).await })
      })
      .collect();
    for handle in handles {
      handle.await.unwrap().unwrap();
    }

    let in_memory = store.get(&player_key("steve"), false).await.unwrap();
    assert!(written.contains(&in_memory));

    // Memory and disk agree once every set has completed.
    let reopened = DataStorage::try_open(LAST_SEEN_STORE, dir.path()).unwrap();
    assert_eq!(reopened.get(&player_key("steve"), false).await, Some(in_memory));
  }

  #[derive(Clone, Default)]
  struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

  impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
      self.0.lock().unwrap().extend_from_slice(buf);
      Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
      Ok(())
    }
  }

  impl CapturedLogs {
    fn lines_containing(&self, needle: &str) -> Vec<String> {
      String::from_utf8(self.0.lock().unwrap().clone())
        .unwrap()
        .lines()
        .filter(|line| line.contains(needle))
        .map(str::to_string)
        .collect()
    }

    fn latency_lines(&self) -> Vec<String> {
      self.lines_containing("elapsed_ms=")
    }

    fn install(&self) -> tracing::subscriber::DefaultGuard {
      let writer = self.clone();
      let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
      tracing::subscriber::set_default(subscriber)
    }
  }

  #[tokio::test]
  async fn test_latency_mode_logs_once_per_get() {
    let dir = tempdir().unwrap();
    let store = DataStorage::try_open(LAST_SEEN_STORE, dir.path()).unwrap();
    store.set(&player_key("alice"), 1000).await.unwrap();

    let logs = CapturedLogs::default();
    let _guard = logs.install();

    assert_eq!(store.get(&player_key("alice"), false).await, Some(1000));
    assert!(logs.latency_lines().is_empty());

    assert_eq!(store.get(&player_key("alice"), true).await, Some(1000));
    assert_eq!(logs.latency_lines().len(), 1);

    assert_eq!(store.get(&player_key("nobody"), true).await, None);
    let lines = logs.latency_lines();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|line| line.contains("Completed")));
  }

  #[tokio::test]
  async fn test_every_failed_set_is_logged() {
    let dir = tempdir().unwrap();
    let store = DataStorage::try_open(LAST_SEEN_STORE, dir.path()).unwrap();

    let logs = CapturedLogs::default();
    let _guard = logs.install();

    // Rejected before anything reaches the disk.
    assert!(store.set("players..last-seen", 1).await.is_err());
    assert_eq!(logs.lines_containing("failed to save store").len(), 1);

    // Rejected by the file write.
    fs::create_dir(store.path().with_extension("yml.tmp")).unwrap();
    assert!(store.set(&player_key("steve"), now()).await.is_err());
    assert_eq!(logs.lines_containing("failed to save store").len(), 2);

    // Successful writes stay quiet at this level.
    fs::remove_dir(store.path().with_extension("yml.tmp")).unwrap();
    store.set(&player_key("steve"), now()).await.unwrap();
    assert_eq!(logs.lines_containing("failed to save store").len(), 2);
  }

  #[tokio::test]
  async fn test_unfinished_set_may_be_lost() {
    let dir = tempdir().unwrap();
    {
      let store = DataStorage::try_open(LAST_SEEN_STORE, dir.path()).unwrap();
      // Simulated crash: the set future is dropped without being driven.
      let key = player_key("steve");
      let pending = store.set(&key, now());
      drop(pending);
    }

    let store = DataStorage::try_open(LAST_SEEN_STORE, dir.path()).unwrap();
    let value = store.get(&player_key("steve"), false).await;
    assert!(value.is_none() || value == Some(now()));
  }
}
