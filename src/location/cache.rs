//! File-based cache of the reference region lists at
//! `<cache_dir>/imsakiyah/regions.json`.
//!
//! The province and city vocabularies change maybe once a year, so lists are
//! kept for `ttl` (30 days by default). Keys are case-insensitive province names.
//! Write failures are logged and otherwise ignored; the cache is an
//! optimization, never a source of truth.

use super::providers::RegionDirectory;
use super::types::ProviderError;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

pub const DEFAULT_TTL_DAYS: i64 = 30;

#[derive(Serialize, Deserialize, Clone, Debug)]
struct CachedList {
    names: Vec<String>,
    /// Unix millis when fetched.
    fetched_at: i64,
}

#[derive(Serialize, Deserialize, Default, Debug)]
struct CacheFile {
    #[serde(default)]
    provinces: Option<CachedList>,
    #[serde(default)]
    cities: HashMap<String, CachedList>,
}

/// The region list cache.
pub struct RegionCache {
    path: PathBuf,
    ttl: Duration,
    data: CacheFile,
}

impl RegionCache {
    /// Load cache from the default location.
    pub fn load(ttl_days: i64) -> Self {
        Self::load_from(Self::default_path(), ttl_days)
    }

    /// Load cache from a specific path (for testing).
    pub fn load_from(path: PathBuf, ttl_days: i64) -> Self {
        let data = Self::read_file(&path).unwrap_or_default();
        Self {
            path,
            ttl: Duration::days(ttl_days),
            data,
        }
    }

    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("imsakiyah")
            .join("regions.json")
    }

    fn read_file(path: &Path) -> Option<CacheFile> {
        let data = fs::read_to_string(path).ok()?;
        serde_json::from_str(&data).ok()
    }

    fn fresh(&self, list: &CachedList) -> bool {
        Utc::now().timestamp_millis() - list.fetched_at <= self.ttl.num_milliseconds()
    }

    fn stamp(names: &[String]) -> CachedList {
        CachedList {
            names: names.to_vec(),
            fetched_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn provinces(&self) -> Option<Vec<String>> {
        self.data
            .provinces
            .as_ref()
            .filter(|l| self.fresh(l))
            .map(|l| l.names.clone())
    }

    pub fn cities(&self, province: &str) -> Option<Vec<String>> {
        self.data
            .cities
            .get(&province.to_lowercase())
            .filter(|l| self.fresh(l))
            .map(|l| l.names.clone())
    }

    pub fn put_provinces(&mut self, names: &[String]) {
        self.data.provinces = Some(Self::stamp(names));
        self.persist();
    }

    pub fn put_cities(&mut self, province: &str, names: &[String]) {
        self.data
            .cities
            .insert(province.to_lowercase(), Self::stamp(names));
        self.persist();
    }

    fn persist(&self) {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(&self.data) {
            Ok(json) => {
                if let Err(e) = fs::write(&self.path, json) {
                    warn!(path = %self.path.display(), error = %e, "region cache not written");
                }
            }
            Err(e) => warn!(error = %e, "region cache not serialized"),
        }
    }

    /// Number of cached lists (for testing).
    pub fn len(&self) -> usize {
        usize::from(self.data.provinces.is_some()) + self.data.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A [`RegionDirectory`] that answers from [`RegionCache`] when it can.
/// Empty lists are never cached.
pub struct CachedDirectory<D> {
    inner: D,
    cache: Mutex<RegionCache>,
}

impl<D: RegionDirectory> CachedDirectory<D> {
    pub fn new(inner: D, cache: RegionCache) -> Self {
        Self {
            inner,
            cache: Mutex::new(cache),
        }
    }

    fn with_cache<T>(&self, f: impl FnOnce(&mut RegionCache) -> T) -> Option<T> {
        self.cache.lock().ok().map(|mut c| f(&mut c))
    }
}

#[async_trait]
impl<D: RegionDirectory> RegionDirectory for CachedDirectory<D> {
    async fn list_provinces(&self) -> Result<Vec<String>, ProviderError> {
        if let Some(names) = self.with_cache(|c| c.provinces()).flatten() {
            debug!(count = names.len(), "provinces served from cache");
            return Ok(names);
        }
        let names = self.inner.list_provinces().await?;
        if !names.is_empty() {
            self.with_cache(|c| c.put_provinces(&names));
        }
        Ok(names)
    }

    async fn list_cities(&self, province: &str) -> Result<Vec<String>, ProviderError> {
        if let Some(names) = self.with_cache(|c| c.cities(province)).flatten() {
            debug!(province, count = names.len(), "cities served from cache");
            return Ok(names);
        }
        let names = self.inner.list_cities(province).await?;
        if !names.is_empty() {
            self.with_cache(|c| c.put_cities(province, &names));
        }
        Ok(names)
    }
}
