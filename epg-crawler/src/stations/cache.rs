//! In-memory station lookup.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::domain::Station;
use crate::store::{Store, StoreError};

/// Thread-safe read-through cache of station metadata.
///
/// Loaded from the store once and kept for the life of the process. Writes
/// go to the store first; the cache is then reloaded from the store, so it
/// never holds a station the store does not.
#[derive(Clone)]
pub struct StationCache {
    inner: Arc<RwLock<HashMap<String, Station>>>,
    /// Serializes saves so two writers cannot interleave store and cache updates.
    write_gate: Arc<Mutex<()>>,
    store: Arc<dyn Store>,
}

impl StationCache {
    /// Create a StationCache by loading every station from the store.
    pub async fn load(store: Arc<dyn Store>) -> Result<Self, StoreError> {
        let stations = store.all_stations().await?;
        let map = build_map(stations);
        debug!(stations = map.len(), "Station cache loaded");

        Ok(Self {
            inner: Arc::new(RwLock::new(map)),
            write_gate: Arc::new(Mutex::new(())),
            store,
        })
    }

    /// Look up a station by canonical name.
    pub async fn get_by_name(&self, name: &str) -> Option<Station> {
        let guard = self.inner.read().await;
        guard.get(name).cloned()
    }

    /// Look up a station by the name shown to viewers.
    ///
    /// With a category, matches display name and category. Without one,
    /// only a station whose canonical name equals the display name matches.
    pub async fn get_by_display_name(
        &self,
        display_name: &str,
        classify: Option<&str>,
    ) -> Option<Station> {
        let guard = self.inner.read().await;
        match classify {
            Some(classify) => guard
                .values()
                .filter(|s| s.display_name == display_name && s.classify == classify)
                .min_by_key(|s| s.id)
                .cloned(),
            None => guard
                .get(display_name)
                .filter(|s| s.display_name == display_name)
                .cloned(),
        }
    }

    /// All cached stations, in id order.
    pub async fn get_all(&self) -> Vec<Station> {
        let guard = self.inner.read().await;
        let mut stations: Vec<Station> = guard.values().cloned().collect();
        stations.sort_by_key(|s| s.id);
        stations
    }

    pub async fn exists_by_name(&self, name: &str) -> bool {
        let guard = self.inner.read().await;
        guard.contains_key(name)
    }

    /// Get the number of cached stations.
    pub async fn len(&self) -> usize {
        let guard = self.inner.read().await;
        guard.len()
    }

    /// Check if the cache is empty.
    pub async fn is_empty(&self) -> bool {
        let guard = self.inner.read().await;
        guard.is_empty()
    }

    /// Save newly discovered stations.
    ///
    /// Stations already cached are skipped without touching the store.
    /// Returns the number of stations the store inserted.
    pub async fn save(&self, stations: &[Station]) -> Result<usize, StoreError> {
        let _gate = self.write_gate.lock().await;

        let new: Vec<Station> = {
            let guard = self.inner.read().await;
            stations
                .iter()
                .filter(|s| !guard.contains_key(&s.name))
                .cloned()
                .collect()
        };
        if new.is_empty() {
            return Ok(0);
        }

        let inserted = self.store.save_stations(&new).await?;
        self.reload().await?;
        debug!(inserted, "Saved new stations");
        Ok(inserted)
    }

    /// Reload the station data from the store.
    ///
    /// On failure, the existing mapping is preserved and the error is returned.
    async fn reload(&self) -> Result<usize, StoreError> {
        let stations = self.store.all_stations().await?;
        let map = build_map(stations);
        let count = map.len();

        let mut guard = self.inner.write().await;
        *guard = map;

        Ok(count)
    }
}

/// Build the name → station map.
fn build_map(stations: Vec<Station>) -> HashMap<String, Station> {
    stations.into_iter().map(|s| (s.name.clone(), s)).collect()
}
