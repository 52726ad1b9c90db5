//! Reading and writing the stored admin style settings.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::fs;
use tracing::{info, warn};

use crate::application::repos::{RepoError, SettingsStore};
use crate::application::stylesheet::GenerationError;
use crate::cache::{CacheTrigger, GenerationCache, RenderedStylesheet, rw_read, rw_write};
use crate::domain::error::ValidationError;
use crate::domain::snapshot::{Fingerprint, SettingsSnapshot, StoredOptions};

const SOURCE: &str = "application::settings";
const ARCHIVE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("failed to access settings archive `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings archive: {message}")]
    Archive { message: String },
}

impl SettingsError {
    fn archive(message: impl Into<String>) -> Self {
        Self::Archive {
            message: message.into(),
        }
    }
}

/// Result of a successful write.
#[derive(Debug, Clone)]
pub struct SavedSettings {
    pub snapshot: SettingsSnapshot,
    pub fingerprint: Fingerprint,
    /// Unknown keys that were skipped, by wire name.
    pub ignored: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SettingsArchive {
    meta: ArchiveMeta,
    #[serde(default)]
    settings: StoredOptions,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArchiveMeta {
    format_version: u32,
    #[serde(default)]
    exported_at: Option<String>,
    #[serde(default)]
    fingerprint: Option<String>,
}

pub struct SettingsService {
    store: Arc<dyn SettingsStore>,
    cache: Arc<GenerationCache>,
    trigger: CacheTrigger,
    last_served: RwLock<Option<RenderedStylesheet>>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn SettingsStore>, cache: Arc<GenerationCache>) -> Self {
        let trigger = CacheTrigger::new(Arc::clone(&cache));
        Self {
            store,
            cache,
            trigger,
            last_served: RwLock::new(None),
        }
    }

    pub fn cache(&self) -> &Arc<GenerationCache> {
        &self.cache
    }

    /// Current stored snapshot. Bad stored values read as their defaults.
    pub async fn snapshot(&self) -> Result<SettingsSnapshot, SettingsError> {
        let raw = self.store.load_options().await?;
        let (snapshot, issues) = SettingsSnapshot::from_stored(&raw);
        for issue in &issues {
            warn!(
                source = SOURCE,
                key = issue.key(),
                error = %issue,
                "Stored option ignored"
            );
        }
        Ok(snapshot)
    }

    /// Stylesheet for the stored snapshot. A failed render falls back to the
    /// last stylesheet this service delivered.
    pub async fn stylesheet(&self) -> Result<RenderedStylesheet, SettingsError> {
        let snapshot = self.snapshot().await?;
        match self.cache.get_or_generate(&snapshot).await {
            Ok(rendered) => {
                self.cache.record_last_good(&rendered.css);
                *rw_write(&self.last_served, SOURCE, "stylesheet.last_served") =
                    Some(rendered.clone());
                Ok(rendered)
            }
            Err(err) => {
                let previous = rw_read(&self.last_served, SOURCE, "stylesheet.fallback").clone();
                match previous {
                    Some(previous) => {
                        warn!(
                            source = SOURCE,
                            error = %err,
                            fingerprint = previous.fingerprint.short(),
                            "Serving previous stylesheet after generation failure"
                        );
                        Ok(previous)
                    }
                    None => Err(err.into()),
                }
            }
        }
    }

    /// Validate `patch` strictly against the stored snapshot and persist it.
    pub async fn update(&self, patch: &Map<String, Value>) -> Result<SavedSettings, SettingsError> {
        let base = self.snapshot().await?;
        let (snapshot, ignored) = base.apply_strict(patch)?;

        self.store.replace_options(&snapshot.to_stored()).await?;
        self.trigger.settings_updated();

        let fingerprint = snapshot.fingerprint();
        info!(
            source = SOURCE,
            fingerprint = fingerprint.short(),
            changed = patch.len() - ignored.len(),
            ignored = ignored.len(),
            "Settings updated"
        );
        Ok(SavedSettings {
            snapshot,
            fingerprint,
            ignored,
        })
    }

    pub async fn reset(&self) -> Result<SavedSettings, SettingsError> {
        self.store.clear_options().await?;
        self.trigger.settings_reset();

        let snapshot = SettingsSnapshot::defaults();
        let fingerprint = snapshot.fingerprint();
        info!(
            source = SOURCE,
            fingerprint = fingerprint.short(),
            "Settings reset to defaults"
        );
        Ok(SavedSettings {
            snapshot,
            fingerprint,
            ignored: Vec::new(),
        })
    }

    /// Write the stored snapshot to a TOML archive at `path`.
    pub async fn export(&self, path: &Path) -> Result<Fingerprint, SettingsError> {
        let snapshot = self.snapshot().await?;
        let fingerprint = snapshot.fingerprint();
        let archive = SettingsArchive {
            meta: ArchiveMeta {
                format_version: ARCHIVE_FORMAT_VERSION,
                exported_at: OffsetDateTime::now_utc().format(&Rfc3339).ok(),
                fingerprint: Some(fingerprint.to_string()),
            },
            settings: snapshot.to_stored(),
        };

        let encoded = toml::to_string_pretty(&archive)
            .map_err(|err| SettingsError::archive(format!("failed to encode archive: {err}")))?;
        fs::write(path, encoded)
            .await
            .map_err(|source| SettingsError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        info!(
            source = SOURCE,
            path = %path.display(),
            fingerprint = fingerprint.short(),
            "Settings exported"
        );
        Ok(fingerprint)
    }

    /// Replace the stored settings with the archive at `path`. Keys missing
    /// from the archive take their defaults.
    pub async fn import(&self, path: &Path) -> Result<SavedSettings, SettingsError> {
        let data = fs::read_to_string(path)
            .await
            .map_err(|source| SettingsError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let archive: SettingsArchive = toml::from_str(&data)
            .map_err(|err| SettingsError::archive(format!("failed to parse archive: {err}")))?;

        if archive.meta.format_version > ARCHIVE_FORMAT_VERSION {
            return Err(SettingsError::archive(format!(
                "archive format version {} is newer than supported version {ARCHIVE_FORMAT_VERSION}",
                archive.meta.format_version
            )));
        }

        let values: Map<String, Value> = archive.settings.into_iter().collect();
        let (snapshot, ignored) = SettingsSnapshot::defaults().apply_strict(&values)?;

        self.store.replace_options(&snapshot.to_stored()).await?;
        self.trigger.settings_imported();

        let fingerprint = snapshot.fingerprint();
        if let Some(expected) = archive.meta.fingerprint.as_deref()
            && expected != fingerprint.as_str()
        {
            warn!(
                source = SOURCE,
                expected,
                actual = fingerprint.short(),
                "Imported settings differ from the exported fingerprint"
            );
        }
        info!(
            source = SOURCE,
            path = %path.display(),
            fingerprint = fingerprint.short(),
            ignored = ignored.len(),
            "Settings imported"
        );
        Ok(SavedSettings {
            snapshot,
            fingerprint,
            ignored,
        })
    }

    pub async fn health_check(&self) -> Result<(), SettingsError> {
        self.store.health_check().await.map_err(SettingsError::from)
    }
}
