//! `spp-recon`: tuition payment (SPP) reconciliation engine.
//!
//! Pure engine crate: normalizes raw payment rows, filters them by period,
//! and reconciles every student against the monthly fee.
//! No CLI or network dependencies.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod model;
pub mod money;
pub mod normalize;

pub use cache::DatasetCache;
pub use config::{ReportConfig, SourceSpec};
pub use engine::{run, ReportSettings};
pub use error::ReconError;
pub use model::{
    ClassFilter, Dataset, GroupingKey, PaymentRecord, PaymentStatus, Period, ReconciliationRow,
    Report, ReportQuery,
};
pub use normalize::{load_dataset, CsvLayout, RawRow};
