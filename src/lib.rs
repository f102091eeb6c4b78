//! sdg7_rs
//!
//! Load World Bank WDI indicator sheets (one column per year), reshape them to
//! tidy (country, year, value) rows, compare indicators, and project SDG 7
//! trends to 2030 with small least-squares models. Pairs with the `sdg7` CLI.
//!
//! ### Features
//! - Wide-to-long loading with WDI cleaning rules (countries only, 2000+, no gaps)
//! - Catalog of named indicators, passed in explicitly
//! - Inner join of two indicators on (country, year)
//! - Linear trend and `response ~ year + predictor` fits with R²
//! - Per-country projections that skip countries with too little data
//! - CSV/JSON export and SVG charts
//!
//! ### Example
//! ```no_run
//! use sdg7_rs::{Catalog, DateSpec, IndicatorAccessor, catalog, join, projection};
//!
//! let accessor = IndicatorAccessor::new(Catalog::reference("data"));
//! let co2 = accessor.get_dataset(catalog::CO2_TOTAL)?;
//! let ren = accessor.get_dataset(catalog::RENEWABLES_SHARE)?;
//! let joined = join::join(&co2, &ren);
//! let req = projection::ProjectionRequest::new(
//!     vec!["Brazil".into(), "CHL".into()],
//!     DateSpec::Range { start: 2005, end: 2021 },
//! );
//! let report = projection::project(&joined, &req);
//! for row in &report.rows {
//!     println!("{}: {:?}", row.country_name, row.response_at_target());
//! }
//! # Ok::<(), sdg7_rs::Error>(())
//! ```

pub mod accessor;
pub mod catalog;
pub mod chart;
pub mod error;
pub mod fit;
pub mod join;
pub mod loader;
pub mod models;
pub mod projection;
pub mod stats;
pub mod storage;
pub mod views;

pub use accessor::IndicatorAccessor;
pub use catalog::{Catalog, IndicatorDescriptor, ValueScale};
pub use error::{Error, Result, SchemaIssue};
pub use fit::FitUndefined;
pub use models::{DateSpec, JoinedDataset, JoinedRecord, LongDataset, LongRecord, RecordKey};
