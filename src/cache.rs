use chrono::{DateTime, Utc};
use log::{info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::fs::create_dir_all;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::{ClassRegistry, RefreshPolicy};
use crate::fetcher::{FetchError, Fetcher};

#[derive(Debug)]
pub enum CacheError {
    /// The class identifier is not in the registry
    UnknownClass(String),

    /// The remote export could not be downloaded
    Fetch { class_id: String, source: FetchError },

    /// The cache file could not be written or read
    Io(io::Error),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::UnknownClass(class_id) => write!(f, "unknown class {:?}", class_id),
            CacheError::Fetch { class_id, source } => {
                write!(f, "download for class {:?} failed: {}", class_id, source)
            }
            CacheError::Io(e) => write!(f, "cache file error: {}", e),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CacheError::UnknownClass(_) => None,
            CacheError::Fetch { source, .. } => Some(source),
            CacheError::Io(e) => Some(e),
        }
    }
}

impl From<io::Error> for CacheError {
    fn from(e: io::Error) -> Self {
        CacheError::Io(e)
    }
}

/// State of one class's cache file
#[derive(Debug)]
struct CacheEntry {
    url: String,
    path: PathBuf,

    /// Time of the last successful fetch by this process
    fetched_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn is_fresh(&self, policy: RefreshPolicy, now: DateTime<Utc>) -> bool {
        let RefreshPolicy::MaxAge(max_age) = policy else {
            return false;
        };
        match self.fetched_at {
            Some(fetched_at) => (now - fetched_at)
                .to_std()
                .map(|age| age < max_age)
                .unwrap_or(false),
            None => false,
        }
    }
}

/// Per-class cache files under one directory
///
/// Each class has its own lock. A refresh holds it until the returned
/// [`CacheGuard`] is dropped, so a query's write and read of the file are
/// never interleaved with another query for the same class.
pub struct GradeCache {
    dir: PathBuf,
    fetcher: Fetcher,
    entries: HashMap<String, Arc<Mutex<CacheEntry>>>,
}

impl GradeCache {
    /// Create the cache directory if needed and one entry per registered class
    pub fn open(
        dir: impl Into<PathBuf>,
        registry: &ClassRegistry,
        fetcher: Fetcher,
    ) -> io::Result<Self> {
        let dir = dir.into();
        create_dir_all(&dir)?;

        let entries = registry
            .class_ids()
            .map(|class_id| {
                let entry = CacheEntry {
                    url: registry.url(class_id).unwrap_or_default().to_string(),
                    path: dir.join(format!("{}.csv", class_id)),
                    fetched_at: None,
                };
                (class_id.to_string(), Arc::new(Mutex::new(entry)))
            })
            .collect();

        Ok(Self {
            dir,
            fetcher,
            entries,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Make the class's cache file current according to `policy`
    ///
    /// Unknown classes fail before any filesystem access. A failed fetch
    /// leaves the existing file untouched.
    ///
    /// # Errors
    /// * `CacheError::UnknownClass` if the class is not registered
    /// * `CacheError::Fetch` if the download fails or the remote does not answer 200
    /// * `CacheError::Io` if the downloaded body cannot be written
    pub async fn refresh(
        &self,
        class_id: &str,
        policy: RefreshPolicy,
    ) -> Result<CacheGuard, CacheError> {
        let entry = self
            .entries
            .get(class_id)
            .ok_or_else(|| CacheError::UnknownClass(class_id.to_string()))?;
        let mut entry = Arc::clone(entry).lock_owned().await;

        if entry.is_fresh(policy, Utc::now())
            && tokio::fs::try_exists(&entry.path).await.unwrap_or(false)
        {
            return Ok(CacheGuard {
                entry,
                fetched: false,
            });
        }

        let body = match self.fetcher.fetch(&entry.url).await {
            Ok(body) => body,
            Err(source) => {
                warn!("Download for class {} failed: {}", class_id, source);
                return Err(CacheError::Fetch {
                    class_id: class_id.to_string(),
                    source,
                });
            }
        };

        let bytes = body.len();
        let dir = self.dir.clone();
        let path = entry.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&dir, &path, &body))
            .await
            .map_err(io::Error::other)??;

        entry.fetched_at = Some(Utc::now());
        info!("Cached {} bytes for class {}", bytes, class_id);

        Ok(CacheGuard {
            entry,
            fetched: true,
        })
    }
}

/// Exclusive access to a class's cache file after a refresh
pub struct CacheGuard {
    entry: OwnedMutexGuard<CacheEntry>,
    fetched: bool,
}

impl CacheGuard {
    pub fn path(&self) -> &Path {
        &self.entry.path
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.entry.fetched_at
    }

    /// Whether this refresh downloaded the file rather than reusing it
    pub fn was_fetched(&self) -> bool {
        self.fetched
    }

    /// The cached export as text; invalid UTF-8 is replaced rather than rejected
    pub async fn read_text(&self) -> io::Result<String> {
        let bytes = tokio::fs::read(&self.entry.path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

// Write through a temp file in the same directory, then rename over the target
fn write_atomically(dir: &Path, target: &Path, body: &[u8]) -> io::Result<()> {
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(body)?;
    file.flush()?;
    file.persist(target).map_err(|e| e.error)?;
    Ok(())
}
