use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use super::item::{Catalogue, PracticeItem};

/// Where a successful load actually came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogueSource {
    /// The primary catalogue file.
    Primary,
    /// The last-known-good cached copy.
    Cache,
    /// A user-supplied import.
    Import,
}

#[derive(Debug, Clone)]
pub struct LoadedCatalogue {
    pub items: Vec<PracticeItem>,
    pub source: CatalogueSource,
}

/// Catalogue loader with the fallback chain
/// primary file → last-known-good cache → user-supplied import.
///
/// Every arm of the chain yields the same normalized item list; the session
/// core treats the three outcomes as equivalent input.
pub struct CatalogueLoader {
    primary_path: PathBuf,
    cache_path: PathBuf,
}

impl CatalogueLoader {
    pub fn new(primary_path: impl Into<PathBuf>, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            primary_path: primary_path.into(),
            cache_path: cache_path.into(),
        }
    }

    /// Walk the fallback chain. `Ok(None)` means neither the primary file nor
    /// a usable cache exists and an import is required.
    pub fn load(&self) -> Result<Option<LoadedCatalogue>> {
        match read_catalogue(&self.primary_path) {
            Ok(items) => {
                info!(
                    "Loaded catalogue from {} ({} items)",
                    self.primary_path.display(),
                    items.len()
                );
                self.save_cache(&items);
                return Ok(Some(LoadedCatalogue {
                    items,
                    source: CatalogueSource::Primary,
                }));
            }
            Err(e) => {
                warn!(
                    "Primary catalogue unavailable ({}): {:#}",
                    self.primary_path.display(),
                    e
                );
            }
        }

        if self.cache_path.exists() {
            match read_catalogue(&self.cache_path).and_then(|items| {
                if cache_invalid(&items) {
                    anyhow::bail!("Cached rows carry unusable durations");
                }
                Ok(items)
            }) {
                Ok(items) => {
                    info!("Loaded catalogue from cache ({} items)", items.len());
                    return Ok(Some(LoadedCatalogue {
                        items,
                        source: CatalogueSource::Cache,
                    }));
                }
                Err(e) => {
                    // A stale or legacy-format cache is dropped so the next
                    // run does not trip over it again.
                    warn!("Cached catalogue invalid, discarding: {:#}", e);
                    let _ = fs::remove_file(&self.cache_path);
                }
            }
        }

        Ok(None)
    }

    /// Import a catalogue file supplied by the user, refreshing the cache.
    pub fn import(&self, path: impl AsRef<Path>) -> Result<LoadedCatalogue> {
        let items = read_catalogue(path.as_ref())
            .with_context(|| format!("Failed to import {}", path.as_ref().display()))?;
        info!("Imported catalogue ({} items)", items.len());
        self.save_cache(&items);
        Ok(LoadedCatalogue {
            items,
            source: CatalogueSource::Import,
        })
    }

    fn save_cache(&self, items: &[PracticeItem]) {
        let catalogue = Catalogue {
            version: chrono::Utc::now().to_rfc3339(),
            source: "cache".to_string(),
            items: items.to_vec(),
        };
        match serde_json::to_vec_pretty(&catalogue) {
            Ok(bytes) => {
                if let Err(e) = fs::write(&self.cache_path, bytes) {
                    warn!("Failed to write catalogue cache: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize catalogue cache: {}", e),
        }
    }
}

/// Filter the catalogue down to a selection, preserving catalogue order and
/// dropping ids that no longer exist.
pub fn select_items(items: &[PracticeItem], selected_ids: &[String]) -> Vec<PracticeItem> {
    items
        .iter()
        .filter(|item| selected_ids.iter().any(|id| id == &item.id))
        .cloned()
        .collect()
}

fn read_catalogue(path: &Path) -> Result<Vec<PracticeItem>> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_catalogue(&bytes)
}

/// Parse and validate catalogue JSON. Accepts either the full catalogue
/// object or a bare item array (the cached shape).
pub fn parse_catalogue(bytes: &[u8]) -> Result<Vec<PracticeItem>> {
    let value: Value = serde_json::from_slice(bytes).context("Catalogue is not valid JSON")?;

    let rows = match &value {
        Value::Object(obj) => obj
            .get("items")
            .and_then(Value::as_array)
            .context("Catalogue object has no items array")?,
        Value::Array(rows) => rows,
        _ => anyhow::bail!("Catalogue must be an object or an array"),
    };

    if rows.is_empty() {
        anyhow::bail!("Catalogue contains no items");
    }

    for (i, row) in rows.iter().enumerate() {
        ensure_normalized(row).with_context(|| format!("Invalid catalogue row {}", i))?;
    }

    let items: Vec<PracticeItem> =
        serde_json::from_value(Value::Array(rows.clone())).context("Catalogue rows malformed")?;

    Ok(items)
}

/// Reject rows still in the legacy spreadsheet shape (capitalized `Date` /
/// `Time` columns). Normalized rows always carry a numeric `timeSec`.
fn ensure_normalized(row: &Value) -> Result<()> {
    let obj = match row.as_object() {
        Some(obj) => obj,
        None => anyhow::bail!("Row is not an object"),
    };
    if obj.contains_key("Date") || obj.contains_key("Time") || obj.contains_key("Time/s") {
        anyhow::bail!("Row uses legacy field names");
    }
    obj.get("timeSec")
        .and_then(Value::as_f64)
        .context("Row has no numeric timeSec")?;
    Ok(())
}

/// A cached copy is only trusted when every row still has a usable duration.
/// Fresh data with a bad duration is the controller's problem (it surfaces
/// `InvalidDuration` per item); a stale cache is simply refetched.
fn cache_invalid(items: &[PracticeItem]) -> bool {
    items.is_empty() || items.iter().any(|item| !item.has_valid_duration())
}
