use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::application::{Application, Category};

/// Newest catalog schema this build knows how to write.
const CATALOG_VERSION: u32 = 1;

/// On-disk shape of the catalog: one versioned document holding every
/// application record. The whole document is rewritten on save; there are no
/// partial writes.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogDocument {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default = "Utc::now")]
    last_modified: DateTime<Utc>,
    #[serde(default)]
    applications: Vec<Application>,
}

fn default_version() -> u32 {
    CATALOG_VERSION
}

/// Single source of truth for application categorization data.
///
/// Lookups are case-insensitive: records are keyed by the lowercased process
/// name. The repository is single-writer: it is owned by the main event loop
/// and every mutating operation takes `&mut self`; the background monitor
/// never touches it, it only emits events that are resolved here. Reads
/// during an in-progress save/load from another thread are not supported.
pub struct ApplicationRepository {
    /// Key: normalized process name.
    applications: HashMap<String, Application>,
    data_path: PathBuf,
    /// Set whenever in-memory state diverges from the persisted document.
    dirty: bool,
}

impl ApplicationRepository {
    /// Creates a repository bound to `data_path` and loads whatever is there.
    /// A missing file is the normal first-run case and yields an empty catalog.
    pub fn open(data_path: impl Into<PathBuf>) -> Self {
        let mut repo = Self {
            applications: HashMap::new(),
            data_path: data_path.into(),
            dirty: false,
        };
        repo.load();
        repo
    }

    // ── Core CRUD operations ──────────────────────────────────────────────────

    /// Case-normalized lookup, read-only.
    pub fn find(&self, process_name: &str) -> Option<&Application> {
        self.applications.get(&normalize(process_name))
    }

    /// Returns the record for `process_name`, creating an uncategorized one if
    /// absent. Repeated calls with any casing of the same name always resolve
    /// to the same logical record.
    pub fn find_or_create(&mut self, process_name: &str) -> &mut Application {
        match self.applications.entry(normalize(process_name)) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                log::debug!("Created new application: {process_name}");
                self.dirty = true;
                entry.insert(Application::new(process_name))
            }
        }
    }

    /// Upserts `app` by its normalized process name.
    pub fn save(&mut self, app: &Application) {
        let normalized = normalize(app.process_name());
        self.applications.insert(normalized, app.clone());
        self.dirty = true;
    }

    /// Deletes the record for `process_name`. Returns whether anything was
    /// removed; the store is marked dirty only when it was.
    pub fn remove(&mut self, process_name: &str) -> bool {
        if self.applications.remove(&normalize(process_name)).is_some() {
            self.dirty = true;
            log::debug!("Removed application: {process_name}");
            return true;
        }
        false
    }

    // ── Query methods ─────────────────────────────────────────────────────────

    pub fn find_all(&self) -> Vec<&Application> {
        self.applications.values().collect()
    }

    pub fn find_by_category(&self, category: Category) -> Vec<&Application> {
        self.applications
            .values()
            .filter(|app| app.category() == category)
            .collect()
    }

    /// Applications seen within the last `days`, most recent first.
    pub fn find_recently_used(&self, days: i64) -> Vec<&Application> {
        let cutoff = Utc::now() - Duration::days(days);
        let mut result: Vec<&Application> = self
            .applications
            .values()
            .filter(|app| app.last_seen() >= cutoff)
            .collect();
        result.sort_by(|a, b| b.last_seen().cmp(&a.last_seen()));
        result
    }

    /// Applications with at least `min_sessions` recorded sessions, most used
    /// first.
    pub fn find_frequently_used(&self, min_sessions: u32) -> Vec<&Application> {
        let mut result: Vec<&Application> = self
            .applications
            .values()
            .filter(|app| app.total_sessions() >= min_sessions)
            .collect();
        result.sort_by(|a, b| b.total_sessions().cmp(&a.total_sessions()));
        result
    }

    pub fn count(&self) -> usize {
        self.applications.len()
    }

    pub fn exists(&self, process_name: &str) -> bool {
        self.applications.contains_key(&normalize(process_name))
    }

    /// Drops every record (in memory only).
    pub fn clear(&mut self) {
        self.applications.clear();
        self.dirty = true;
    }

    /// Whether in-memory state has diverged from the persisted document.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // ── Persistence ───────────────────────────────────────────────────────────

    /// Writes the whole catalog document to disk. On failure the in-memory
    /// state stays dirty so the next save trigger retries; the daemon never
    /// crashes over a persistence error.
    pub fn save_all(&mut self) -> bool {
        let document = CatalogDocument {
            version: CATALOG_VERSION,
            last_modified: Utc::now(),
            applications: self.applications.values().cloned().collect(),
        };

        let json = match serde_json::to_string_pretty(&document) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Failed to serialize catalog: {e}");
                return false;
            }
        };

        if let Some(parent) = self.data_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::warn!("Failed to create directory {}: {e}", parent.display());
                return false;
            }
        }

        if let Err(e) = std::fs::write(&self.data_path, json) {
            log::warn!(
                "Failed to write catalog {}: {e}",
                self.data_path.display()
            );
            return false;
        }

        self.dirty = false;
        log::debug!(
            "Saved {} applications to {}",
            self.applications.len(),
            self.data_path.display()
        );
        true
    }

    /// Replaces in-memory state with the persisted document.
    ///
    /// A missing file succeeds with an empty catalog (first run). Unreadable
    /// or malformed content fails the load and leaves any prior in-memory
    /// state untouched.
    pub fn load(&mut self) -> bool {
        if !self.data_path.exists() {
            log::debug!(
                "Catalog file does not exist, starting empty: {}",
                self.data_path.display()
            );
            return true;
        }

        let content = match std::fs::read_to_string(&self.data_path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!(
                    "Failed to read catalog {}: {e}",
                    self.data_path.display()
                );
                return false;
            }
        };

        // Parse the whole document before touching current state so a
        // malformed file never leaves a half-loaded catalog behind.
        let document: CatalogDocument = match serde_json::from_str(&content) {
            Ok(document) => document,
            Err(e) => {
                log::warn!(
                    "Invalid catalog document {}: {e}",
                    self.data_path.display()
                );
                return false;
            }
        };

        if document.version > CATALOG_VERSION {
            log::warn!(
                "Catalog version {} is newer than supported version {}; loading best-effort",
                document.version,
                CATALOG_VERSION
            );
        }

        self.applications.clear();
        for app in document.applications {
            self.applications.insert(normalize(app.process_name()), app);
        }

        self.dirty = false;
        log::debug!(
            "Loaded {} applications from {}",
            self.applications.len(),
            self.data_path.display()
        );
        true
    }
}

/// Lowercases a process name for use as the catalog key.
fn normalize(process_name: &str) -> String {
    process_name.to_lowercase()
}
