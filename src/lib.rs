//! vigilar - Statistical Data Drift Detection in Pure Rust
//!
//! Compares a reference snapshot and a production snapshot of the same
//! tabular schema and reports, per feature column, whether the production
//! distribution has statistically drifted from the reference distribution.
//! Built for monitoring deployed data pipelines where input or prediction
//! distributions may silently shift.
//!
//! # Design Principles
//!
//! 1. **Scores, not verdicts** - The summary carries raw p-values;
//!    significance thresholds and alerting policy stay with the caller
//! 2. **Pure Rust** - No Python, no FFI
//! 3. **Arrow-native** - Snapshots are Arrow `RecordBatch` collections,
//!    loadable from Parquet or CSV
//! 4. **Total output** - Degenerate feature data yields NaN sentinels, never
//!    a partially missing summary
//!
//! # Quick Start
//!
//! ```no_run
//! use vigilar::{compute_drift, ArrowDataset};
//!
//! let reference = ArrowDataset::from_parquet("data/reference.parquet").unwrap();
//! let production = ArrowDataset::from_parquet("data/production.parquet").unwrap();
//!
//! // Without a mapping, column roles are inferred from the reference schema
//! let summary = compute_drift(&reference, &production, None).unwrap();
//!
//! for (name, result) in &summary.numerical_features {
//!     println!("{name}: p = {}", result.p_value);
//! }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
// Allow common test patterns
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::cast_lossless,
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::float_cmp,
        clippy::similar_names,
        clippy::unreadable_literal
    )
)]
// Allow some pedantic lints for cleaner code
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::map_unwrap_or)]

pub mod columns;
pub mod dataset;
pub mod drift;
pub mod error;

// Re-exports for convenience
// Re-export arrow types commonly needed
pub use arrow::{
    array::RecordBatch,
    datatypes::{Schema, SchemaRef},
};
pub use columns::{classify, ColumnClassification, ColumnMapping, UtilityColumns};
pub use dataset::{ArrowDataset, Dataset};
pub use drift::{
    compute_drift, DriftAnalyzer, DriftSummary, FeatureDrift, FeatureType, Histogram,
};
pub use error::{Error, Result};
