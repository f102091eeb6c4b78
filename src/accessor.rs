//! Resolve indicator names to cleaned long-form datasets.
//!
//! By default every call re-reads and re-derives the source file. With
//! [`IndicatorAccessor::with_cache`] datasets are memoised per file identity
//! (path, length, modification time); callers still receive an owned copy.

use crate::catalog::{Catalog, IndicatorDescriptor};
use crate::error::{Error, Result};
use crate::loader;
use crate::models::LongDataset;
use ahash::AHashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Fingerprint {
    len: u64,
    modified: Option<SystemTime>,
}

impl Fingerprint {
    fn of(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

#[derive(Debug, Default)]
struct DatasetCache {
    // Entries are inserted fully built; readers clone out of the Arc.
    entries: RwLock<AHashMap<(PathBuf, String), (Fingerprint, Arc<LongDataset>)>>,
}

impl DatasetCache {
    fn get(&self, key: &(PathBuf, String), fp: &Fingerprint) -> Option<Arc<LongDataset>> {
        let map = self.entries.read().ok()?;
        map.get(key)
            .filter(|(cached_fp, _)| cached_fp == fp)
            .map(|(_, ds)| Arc::clone(ds))
    }

    fn put(&self, key: (PathBuf, String), fp: Fingerprint, ds: Arc<LongDataset>) {
        if let Ok(mut map) = self.entries.write() {
            map.insert(key, (fp, ds));
        }
    }
}

/// Catalog-backed access to indicator datasets.
#[derive(Debug)]
pub struct IndicatorAccessor {
    catalog: Catalog,
    cache: Option<DatasetCache>,
}

impl IndicatorAccessor {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            cache: None,
        }
    }

    /// Memoise loaded datasets, invalidated when the source file changes.
    pub fn with_cache(mut self) -> Self {
        self.cache = Some(DatasetCache::default());
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn descriptor(&self, indicator_name: &str) -> Result<&IndicatorDescriptor> {
        self.catalog
            .find(indicator_name)
            .ok_or_else(|| Error::NotFound {
                indicator: indicator_name.to_string(),
            })
    }

    /// Value-column name registered for `indicator_name`.
    pub fn get_value_column(&self, indicator_name: &str) -> Result<String> {
        Ok(self.descriptor(indicator_name)?.value_column.clone())
    }

    /// Load and clean the dataset registered for `indicator_name`.
    ///
    /// ### Errors
    /// - [`Error::NotFound`] for an unregistered name
    /// - [`Error::Schema`], [`Error::Read`], [`Error::Csv`] from the loader
    pub fn get_dataset(&self, indicator_name: &str) -> Result<LongDataset> {
        let desc = self.descriptor(indicator_name)?;
        let Some(cache) = &self.cache else {
            return loader::load_path(&desc.source, &desc.value_column);
        };

        let key = (desc.source.clone(), desc.value_column.clone());
        let fp = Fingerprint::of(&desc.source)?;
        if let Some(ds) = cache.get(&key, &fp) {
            log::debug!("cache hit for {}", desc.source.display());
            return Ok(ds.as_ref().clone());
        }
        let ds = Arc::new(loader::load_path(&desc.source, &desc.value_column)?);
        log::info!(
            "cached {} ({} records)",
            desc.source.display(),
            ds.len()
        );
        cache.put(key, fp, Arc::clone(&ds));
        Ok(ds.as_ref().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{IndicatorDescriptor, ValueScale};
    use tempfile::tempdir;

    fn accessor_for(dir: &Path) -> IndicatorAccessor {
        let catalog = Catalog::new(vec![IndicatorDescriptor::new(
            "Share",
            dir.join("share.csv"),
            "share",
            ValueScale::Percent,
        )])
        .unwrap();
        IndicatorAccessor::new(catalog)
    }

    #[test]
    fn unknown_indicator_is_not_found() {
        let dir = tempdir().unwrap();
        let acc = accessor_for(dir.path());
        assert!(matches!(
            acc.get_dataset("Nope"),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            acc.get_value_column("Nope"),
            Err(Error::NotFound { .. })
        ));
        assert_eq!(acc.get_value_column("Share").unwrap(), "share");
    }

    #[test]
    fn cached_dataset_is_refreshed_when_file_changes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("share.csv");
        std::fs::write(&path, "CountryName,CountryCode,Y2000\nA,AAA,1\n").unwrap();
        let acc = accessor_for(dir.path()).with_cache();

        let first = acc.get_dataset("Share").unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(acc.get_dataset("Share").unwrap(), first);

        // different length, so the fingerprint changes even with coarse mtimes
        std::fs::write(&path, "CountryName,CountryCode,Y2000\nA,AAA,1\nB,BBB,2\n").unwrap();
        assert_eq!(acc.get_dataset("Share").unwrap().len(), 2);
    }
}
