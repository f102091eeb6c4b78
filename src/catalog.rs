//! Registry of indicators: display name → source file + value-column name.
//!
//! A [`Catalog`] is a plain value handed to [`crate::IndicatorAccessor`], so
//! tests and alternative deployments can swap in their own entries.
//!
//! ### Example
//! ```no_run
//! # use sdg7_rs::Catalog;
//! let catalog = Catalog::reference("data");
//! let co2 = catalog.find(sdg7_rs::catalog::CO2_TOTAL).unwrap();
//! assert_eq!(co2.value_column, "co2_emissions_total");
//! ```

use crate::error::{Error, Result};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CO2_TOTAL: &str = "Total CO2 emissions (kt)";
pub const GDP_PER_CAPITA: &str = "GDP per capita (constant US$)";
pub const RENEWABLES_SHARE: &str = "Renewable energy share (% of final consumption)";
pub const ELECTRICITY_ACCESS: &str = "Access to electricity (% of population)";
pub const CLEAN_COOKING: &str = "Clean cooking fuels (% of population)";
pub const POPULATION_GROWTH: &str = "Population growth (annual %)";

/// How values of an indicator are scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueScale {
    /// 0–100 share; extrapolations are clamped to that interval.
    Percent,
    #[default]
    Absolute,
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorDescriptor {
    /// Human-readable, unique.
    pub name: String,
    /// Path of the wide-format source file.
    pub source: PathBuf,
    /// Column name given to values in the long form, unique.
    pub value_column: String,
    #[serde(default)]
    pub scale: ValueScale,
}

impl IndicatorDescriptor {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<PathBuf>,
        value_column: impl Into<String>,
        scale: ValueScale,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            value_column: value_column.into(),
            scale,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Catalog {
    entries: Vec<IndicatorDescriptor>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate names or value columns.
    pub fn new(entries: Vec<IndicatorDescriptor>) -> Result<Self> {
        Self::validated(entries, Path::new("<inline>"))
    }

    /// The six SDG 7 indicators of the reference deployment, read from `data_dir`.
    pub fn reference(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        let entry = |name: &str, file: &str, column: &str, scale| {
            IndicatorDescriptor::new(name, dir.join(file), column, scale)
        };
        Self {
            entries: vec![
                entry(CO2_TOTAL, "EmCO2Tot.csv", "co2_emissions_total", ValueScale::Absolute),
                entry(GDP_PER_CAPITA, "GDPercap.csv", "gdp_per_capita", ValueScale::Absolute),
                entry(RENEWABLES_SHARE, "RenEnergy.csv", "renewables_share", ValueScale::Percent),
                entry(ELECTRICITY_ACCESS, "AccesElec.csv", "electricity_access", ValueScale::Percent),
                entry(CLEAN_COOKING, "CleanFuelxCK.csv", "clean_cooking_fuels", ValueScale::Percent),
                // Annual growth rates can be negative or exceed 100.
                entry(POPULATION_GROWTH, "PopGrow.csv", "population_growth", ValueScale::Absolute),
            ],
        }
    }

    /// Read a JSON array of descriptors. Relative `source` paths resolve
    /// against the JSON file's directory.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut entries: Vec<IndicatorDescriptor> =
            serde_json::from_str(&text).map_err(|e| Error::Catalog {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for e in &mut entries {
            if e.source.is_relative() {
                e.source = base.join(&e.source);
            }
        }
        let catalog = Self::validated(entries, path)?;
        log::info!("loaded {} indicators from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    fn validated(entries: Vec<IndicatorDescriptor>, origin: &Path) -> Result<Self> {
        let mut names = AHashSet::new();
        let mut columns = AHashSet::new();
        for e in &entries {
            if !names.insert(e.name.as_str()) {
                return Err(Error::Catalog {
                    path: origin.to_path_buf(),
                    reason: format!("duplicate indicator name '{}'", e.name),
                });
            }
            if !columns.insert(e.value_column.as_str()) {
                return Err(Error::Catalog {
                    path: origin.to_path_buf(),
                    reason: format!("duplicate value column '{}'", e.value_column),
                });
            }
        }
        Ok(Self { entries })
    }

    /// Look up by display name.
    pub fn find(&self, name: &str) -> Option<&IndicatorDescriptor> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Look up by display name, then by value column (case-insensitive).
    pub fn resolve(&self, key: &str) -> Option<&IndicatorDescriptor> {
        let key = key.trim();
        self.find(key).or_else(|| {
            self.entries
                .iter()
                .find(|e| e.value_column.eq_ignore_ascii_case(key))
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn entries(&self) -> &[IndicatorDescriptor] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
