use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// Constants
pub const DEFAULT_BIND: &str = "0.0.0.0:5050";
pub const DEFAULT_CACHE_DIR: &str = "grades";

const SHEET_EXPORT_BASE: &str =
    "https://docs.google.com/spreadsheets/d/1ejmk2yRoyIEPuXTBC5J32ulLtk1exMkv/gviz/tq?tqx=out:csv&gid=";

const DEFAULT_CLASSES: [(&str, &str); 5] = [
    ("901", "395731245"),
    ("904", "2067730854"),
    ("702", "454504113"),
    ("901生活", "2096141184"),
    ("904生活", "775589910"),
];

/// Mapping from class identifier to the URL of its published CSV export
///
/// Built once at startup and shared read-only afterwards. Class identifiers
/// double as cache file stems, so they never contain path separators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassRegistry {
    urls: BTreeMap<String, String>,
}

impl ClassRegistry {
    /// Build a registry from `(class_id, url)` pairs
    ///
    /// # Examples
    /// ```
    /// use gradebook::config::ClassRegistry;
    ///
    /// let registry = ClassRegistry::new([("901", "https://example.com/901.csv")]);
    /// assert_eq!(registry.url("901"), Some("https://example.com/901.csv"));
    /// assert_eq!(registry.url("999"), None);
    /// ```
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            urls: entries
                .into_iter()
                .map(|(class_id, url)| (class_id.into(), url.into()))
                .collect(),
        }
    }

    /// Load a registry from a JSON object of `"class id": "url"` pairs
    ///
    /// # Errors
    /// * Returns an error if the file cannot be read or parsed
    /// * Returns an error if a class identifier is empty or could escape the cache directory
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let data = fs::read_to_string(path)?;
        let registry: ClassRegistry = serde_json::from_str(&data)?;

        if let Some(bad) = registry.class_ids().find(|id| !is_valid_class_id(id)) {
            return Err(format!("Invalid class identifier: {:?}", bad).into());
        }

        Ok(registry)
    }

    pub fn url(&self, class_id: &str) -> Option<&str> {
        self.urls.get(class_id).map(String::as_str)
    }

    pub fn class_ids(&self) -> impl Iterator<Item = &str> {
        self.urls.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl Default for ClassRegistry {
    /// The classes served by the school deployment
    fn default() -> Self {
        Self::new(
            DEFAULT_CLASSES
                .iter()
                .map(|(class_id, gid)| (*class_id, format!("{}{}", SHEET_EXPORT_BASE, gid))),
        )
    }
}

fn is_valid_class_id(class_id: &str) -> bool {
    !class_id.is_empty()
        && class_id != "."
        && class_id != ".."
        && !class_id.contains(['/', '\\', '\0'])
}

/// How a query treats an existing cache file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Fetch on every query; a failed fetch fails the query
    #[default]
    Always,

    /// Reuse the cache file if it was fetched less than this long ago
    MaxAge(Duration),
}

/// Server settings, fixed for the lifetime of the process
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind: String,

    /// Directory holding one `<class_id>.csv` per class
    pub cache_dir: PathBuf,

    /// Refresh policy applied to every query
    pub refresh: RefreshPolicy,

    /// Timeout for each remote fetch (none by default)
    pub fetch_timeout: Option<Duration>,

    /// Class identifier to export URL mapping
    pub registry: ClassRegistry,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            refresh: RefreshPolicy::Always,
            fetch_timeout: None,
            registry: ClassRegistry::default(),
        }
    }
}

impl ServerConfig {
    /// Build the configuration from command-line arguments
    ///
    /// `args[0]` is the program name. Positional arguments are the bind
    /// address and the cache directory, in that order. Flags:
    /// `--classes <file.json>`, `--max-age <secs>`, `--timeout <secs>`.
    /// Unparseable numbers fall back to the defaults with a warning.
    ///
    /// # Errors
    /// * Returns an error if a flag is missing its value
    /// * Returns an error if the `--classes` file cannot be loaded
    pub fn from_args(args: &[String]) -> Result<Self, Box<dyn Error>> {
        let mut config = ServerConfig::default();
        let mut positional = 0;
        let mut iter = args.iter().skip(1);

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--classes" => {
                    let path = iter.next().ok_or("--classes requires a file path")?;
                    config.registry = ClassRegistry::from_json_file(path)?;
                }
                "--max-age" => {
                    let value = iter.next().ok_or("--max-age requires a number of seconds")?;
                    match value.parse::<u64>() {
                        Ok(secs) => config.refresh = RefreshPolicy::MaxAge(Duration::from_secs(secs)),
                        Err(_) => warn!("Ignoring invalid --max-age value {:?}", value),
                    }
                }
                "--timeout" => {
                    let value = iter.next().ok_or("--timeout requires a number of seconds")?;
                    match value.parse::<u64>() {
                        Ok(secs) => config.fetch_timeout = Some(Duration::from_secs(secs)),
                        Err(_) => warn!("Ignoring invalid --timeout value {:?}", value),
                    }
                }
                other => {
                    match positional {
                        0 => config.bind = other.to_string(),
                        1 => config.cache_dir = PathBuf::from(other),
                        _ => warn!("Ignoring extra argument {:?}", other),
                    }
                    positional += 1;
                }
            }
        }

        Ok(config)
    }
}
