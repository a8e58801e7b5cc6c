//! Statistical data drift computation.
//!
//! Compares a reference snapshot against a production snapshot of the same
//! schema and reports, per feature column, whether the production
//! distribution has drifted from the reference distribution. Numerical
//! features are compared with a two-sample Kolmogorov-Smirnov test,
//! categorical (numeric-coded) features with a chi-square goodness-of-fit
//! test over zero-filled category counts. Every feature also gets a pair of
//! ten-bin density histograms for rendering.
//!
//! The computation is stateless: it reads two datasets and an optional
//! [`ColumnMapping`] and returns one immutable [`DriftSummary`]. No drift
//! verdicts or thresholds are applied; the summary carries raw p-values and
//! leaves significance policy to the caller.
//!
//! # Example
//!
//! ```no_run
//! use vigilar::{compute_drift, ArrowDataset};
//!
//! let reference = ArrowDataset::from_parquet("data/reference.parquet").unwrap();
//! let production = ArrowDataset::from_parquet("data/production.parquet").unwrap();
//!
//! let summary = compute_drift(&reference, &production, None).unwrap();
//! for (name, result) in &summary.numerical_features {
//!     println!("{name}: p = {}", result.p_value);
//! }
//! ```

// Statistical computation requires casts, similar variable names, and float literals
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::suboptimal_flops)]

use std::collections::HashMap;

use arrow::{
    array::{Array, Float64Array},
    compute::cast,
    datatypes::DataType,
};
use serde::{Deserialize, Serialize};

use crate::{
    columns::{classify, ColumnMapping, UtilityColumns},
    dataset::{ArrowDataset, Dataset},
    error::{Error, Result},
};

/// Feature type resolved by column classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    /// Continuous numeric feature, compared with the KS test.
    Numerical,
    /// Numeric-coded categorical feature, compared with chi-square.
    Categorical,
}

/// A ten-bin density histogram over one dataset's finite values.
///
/// `bin_edges` holds eleven edges delimiting ten equal-width bins spanning
/// the dataset's own finite-value range; edges are never shared between the
/// reference and production histograms of a feature. `densities` is
/// normalized so that bin heights times bin widths sum to one.
///
/// A column with a single distinct value still gets ten bins: the range is
/// widened by half a unit on each side. A column with no finite values at
/// all yields an all-zero histogram over a unit span, so a summary stays
/// total and renderable even for degenerate data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Bin edges, `BINS + 1` entries in ascending order.
    pub bin_edges: Vec<f64>,
    /// Per-bin densities, `BINS` entries.
    pub densities: Vec<f64>,
}

impl Histogram {
    /// Fixed number of bins. Not configurable.
    pub const BINS: usize = 10;

    /// Builds a density histogram from finite values.
    ///
    /// The right-most bin is closed, so the maximum value is counted rather
    /// than dropped.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            let bin_edges = (0..=Self::BINS).map(|i| i as f64 / Self::BINS as f64).collect();
            return Self {
                bin_edges,
                densities: vec![0.0; Self::BINS],
            };
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let (lo, hi) = if min == max {
            (min - 0.5, max + 0.5)
        } else {
            (min, max)
        };
        let span = hi - lo;

        let bin_edges: Vec<f64> = (0..=Self::BINS)
            .map(|i| lo + span * i as f64 / Self::BINS as f64)
            .collect();

        let mut counts = vec![0u64; Self::BINS];
        for &v in values {
            let bin = (((v - lo) / span) * Self::BINS as f64) as usize;
            counts[bin.min(Self::BINS - 1)] += 1;
        }

        let n = values.len() as f64;
        let bin_width = span / Self::BINS as f64;
        let densities = counts.iter().map(|&c| c as f64 / (n * bin_width)).collect();

        Self {
            bin_edges,
            densities,
        }
    }

    /// Returns the number of bins.
    pub fn num_bins(&self) -> usize {
        self.densities.len()
    }
}

/// Drift comparison result for a single feature.
///
/// Created once per call and never mutated. A `p_value` of NaN marks a
/// degenerate feature (no finite values in one of the snapshots); it
/// serializes to JSON as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDrift {
    /// Whether the feature was compared as numerical or categorical.
    pub feature_type: FeatureType,
    /// Two-sided p-value of the statistical test, in `[0, 1]`, or NaN for
    /// degenerate data.
    pub p_value: f64,
    /// Density histogram of the reference snapshot.
    pub reference_histogram: Histogram,
    /// Density histogram of the production snapshot.
    pub production_histogram: Histogram,
}

/// Immutable top-level output of a drift computation.
///
/// The shape of this type is the compatibility contract renderers depend on:
/// resolved utility columns, the two feature-name lists, and one
/// [`FeatureDrift`] per classified feature, keyed by column name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftSummary {
    /// Resolved utility columns, excluded from comparison.
    pub utility_columns: UtilityColumns,
    /// Names of compared numerical features.
    pub numerical_feature_names: Vec<String>,
    /// Names of compared categorical features.
    pub categorical_feature_names: Vec<String>,
    /// Per-feature results for numerical features.
    pub numerical_features: HashMap<String, FeatureDrift>,
    /// Per-feature results for categorical features.
    pub categorical_features: HashMap<String, FeatureDrift>,
}

impl DriftSummary {
    /// Looks up a feature result by name in either map.
    pub fn feature(&self, name: &str) -> Option<&FeatureDrift> {
        self.numerical_features
            .get(name)
            .or_else(|| self.categorical_features.get(name))
    }

    /// Returns the total number of compared features.
    pub fn num_features(&self) -> usize {
        self.numerical_features.len() + self.categorical_features.len()
    }

    /// Serialize to JSON bytes.
    ///
    /// NaN p-values of degenerate features serialize as `null`.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Format(e.to_string()))
    }

    /// Deserialize from JSON bytes.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(|e| Error::Format(e.to_string()))
    }
}

/// Statistical drift analyzer holding the reference snapshot.
///
/// # Example
///
/// ```no_run
/// use vigilar::{ArrowDataset, ColumnMapping, DriftAnalyzer};
///
/// let reference = ArrowDataset::from_parquet("data/reference.parquet").unwrap();
/// let production = ArrowDataset::from_parquet("data/production.parquet").unwrap();
///
/// let mapping = ColumnMapping::new()
///     .with_target("target")
///     .with_numerical_features(vec!["age".to_string(), "income".to_string()]);
///
/// let analyzer = DriftAnalyzer::new(reference).with_mapping(mapping);
/// let summary = analyzer.analyze(&production).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct DriftAnalyzer {
    /// Reference dataset (baseline distribution).
    reference: ArrowDataset,
    /// Optional explicit column mapping.
    mapping: Option<ColumnMapping>,
}

impl DriftAnalyzer {
    /// Creates a new analyzer with a reference snapshot.
    pub fn new(reference: ArrowDataset) -> Self {
        Self {
            reference,
            mapping: None,
        }
    }

    /// Sets an explicit column mapping. Without one, column roles are
    /// inferred from the reference schema.
    #[must_use]
    pub fn with_mapping(mut self, mapping: ColumnMapping) -> Self {
        self.mapping = Some(mapping);
        self
    }

    /// Returns the reference snapshot.
    pub fn reference(&self) -> &ArrowDataset {
        &self.reference
    }

    /// Compares the production snapshot against the reference.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnNotFound`] if a classified feature column is
    /// absent from either snapshot. A missing declared feature fails the
    /// whole call rather than producing a silently incomplete summary.
    pub fn analyze(&self, production: &ArrowDataset) -> Result<DriftSummary> {
        compute_drift(&self.reference, production, self.mapping.as_ref())
    }
}

/// Computes per-feature drift between two dataset snapshots.
///
/// Classification runs once over the reference schema; each classified
/// feature is then compared independently and the results are merged into one
/// [`DriftSummary`]. Feature comparisons share no state, so their processing
/// order never affects the output.
///
/// # Errors
///
/// Returns [`Error::ColumnNotFound`] if a classified feature column is absent
/// from either snapshot.
pub fn compute_drift(
    reference: &ArrowDataset,
    production: &ArrowDataset,
    mapping: Option<&ColumnMapping>,
) -> Result<DriftSummary> {
    let schema = reference.schema();
    let classification = classify(&schema, mapping);

    let mut numerical_features = HashMap::new();
    for name in &classification.numerical_features {
        let ref_values = numeric_column(reference, name)?;
        let prod_values = numeric_column(production, name)?;
        numerical_features.insert(name.clone(), compare_numerical(&ref_values, &prod_values));
    }

    let mut categorical_features = HashMap::new();
    for name in &classification.categorical_features {
        let ref_values = numeric_column(reference, name)?;
        let prod_values = numeric_column(production, name)?;
        categorical_features.insert(name.clone(), compare_categorical(&ref_values, &prod_values));
    }

    Ok(DriftSummary {
        utility_columns: classification.utility,
        numerical_feature_names: classification.numerical_features,
        categorical_feature_names: classification.categorical_features,
        numerical_features,
        categorical_features,
    })
}

/// Extracts a column as f64 values, dropping nulls.
///
/// Columns are cast to Float64 before extraction; string-typed categorical
/// columns therefore yield values only for numeric-coded entries, and
/// non-numeric text becomes null and is dropped.
fn numeric_column(dataset: &ArrowDataset, name: &str) -> Result<Vec<f64>> {
    let schema = dataset.schema();
    let (index, _) = schema
        .column_with_name(name)
        .ok_or_else(|| Error::column_not_found(name))?;

    let mut values = Vec::with_capacity(dataset.len());
    for batch in dataset.iter() {
        let column = cast(batch.column(index), &DataType::Float64)?;
        let column = column.as_any().downcast_ref::<Float64Array>().ok_or_else(|| {
            Error::schema_mismatch(format!("Column '{name}' could not be read as Float64"))
        })?;
        for i in 0..column.len() {
            if !column.is_null(i) {
                values.push(column.value(i));
            }
        }
    }

    Ok(values)
}

/// Compares a numerical feature with the two-sample KS test.
///
/// Non-finite values are dropped from each snapshot independently before any
/// computation. Degenerate data (no finite values on either side) yields a
/// NaN p-value instead of an error.
fn compare_numerical(reference: &[f64], production: &[f64]) -> FeatureDrift {
    let ref_finite = finite_values(reference);
    let prod_finite = finite_values(production);

    let p_value = if ref_finite.is_empty() || prod_finite.is_empty() {
        f64::NAN
    } else {
        ks_two_sample(&ref_finite, &prod_finite)
    };

    FeatureDrift {
        feature_type: FeatureType::Numerical,
        p_value,
        reference_histogram: Histogram::from_values(&ref_finite),
        production_histogram: Histogram::from_values(&prod_finite),
    }
}

/// Compares a categorical feature with a chi-square goodness-of-fit test.
///
/// Category codes are aligned over the sorted union of distinct codes
/// observed in both snapshots; codes absent from one snapshot count as zero.
/// This zero-filled alignment is what lets two snapshots with different
/// category sets be compared at all. Degenerate data yields a NaN p-value.
fn compare_categorical(reference: &[f64], production: &[f64]) -> FeatureDrift {
    let ref_finite = finite_values(reference);
    let prod_finite = finite_values(production);

    let p_value = if ref_finite.is_empty() || prod_finite.is_empty() {
        f64::NAN
    } else {
        let universe = category_universe(&ref_finite, &prod_finite);
        let expected = category_counts(&ref_finite, &universe);
        let observed = category_counts(&prod_finite, &universe);
        chi_square_gof(&expected, &observed)
    };

    FeatureDrift {
        feature_type: FeatureType::Categorical,
        p_value,
        reference_histogram: Histogram::from_values(&ref_finite),
        production_histogram: Histogram::from_values(&prod_finite),
    }
}

fn finite_values(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Sorted union of distinct category codes across both snapshots.
fn category_universe(reference: &[f64], production: &[f64]) -> Vec<f64> {
    let mut codes: Vec<f64> = reference.iter().chain(production.iter()).copied().collect();
    codes.sort_by(f64::total_cmp);
    codes.dedup();
    codes
}

/// Counts occurrences of each universe code in sorted-code order.
///
/// Codes absent from `values` keep a count of zero.
fn category_counts(values: &[f64], universe: &[f64]) -> Vec<u64> {
    let mut counts = vec![0u64; universe.len()];
    for &v in values {
        let found = universe.binary_search_by(|code| {
            code.partial_cmp(&v).unwrap_or(std::cmp::Ordering::Equal)
        });
        if let Ok(index) = found {
            counts[index] += 1;
        }
    }
    counts
}

/// Two-sample Kolmogorov-Smirnov test.
///
/// Returns the two-sided asymptotic p-value for the hypothesis that both
/// samples come from the same continuous distribution. Both samples are used
/// at full size; no subsampling.
fn ks_two_sample(reference: &[f64], production: &[f64]) -> f64 {
    let mut ref_sorted = reference.to_vec();
    let mut prod_sorted = production.to_vec();
    ref_sorted.sort_by(f64::total_cmp);
    prod_sorted.sort_by(f64::total_cmp);

    let d = ks_statistic(&ref_sorted, &prod_sorted);

    let n1 = ref_sorted.len() as f64;
    let n2 = prod_sorted.len() as f64;
    let en = (n1 * n2 / (n1 + n2)).sqrt();

    kolmogorov_survival(d * en)
}

/// Maximum absolute difference between the two empirical CDFs.
///
/// Both inputs must be sorted ascending.
fn ks_statistic(ref_sorted: &[f64], prod_sorted: &[f64]) -> f64 {
    let n1 = ref_sorted.len();
    let n2 = prod_sorted.len();

    let mut i = 0;
    let mut j = 0;
    let mut max_diff = 0.0_f64;

    while i < n1 && j < n2 {
        let x = ref_sorted[i].min(prod_sorted[j]);
        while i < n1 && ref_sorted[i] <= x {
            i += 1;
        }
        while j < n2 && prod_sorted[j] <= x {
            j += 1;
        }
        let diff = (i as f64 / n1 as f64 - j as f64 / n2 as f64).abs();
        if diff > max_diff {
            max_diff = diff;
        }
    }

    max_diff
}

/// Survival function of the Kolmogorov distribution.
///
/// Asymptotic series: P(D > z) = 2 * sum_{k>=1} (-1)^(k-1) * exp(-2*k^2*z^2).
fn kolmogorov_survival(z: f64) -> f64 {
    if z <= 0.0 {
        return 1.0;
    }
    if z > 3.0 {
        return 0.0;
    }

    let mut p = 0.0;
    let z_sq = z * z;

    for k in 1..=100 {
        let k_f = f64::from(k);
        let term = (-1.0_f64).powi(k - 1) * (-2.0 * k_f * k_f * z_sq).exp();
        p += term;
        if term.abs() < 1e-12 {
            break;
        }
    }

    (2.0 * p).clamp(0.0, 1.0)
}

/// Chi-square goodness-of-fit test over aligned category counts.
///
/// Reference counts play the expected role, production counts the observed
/// role: statistic = sum((observed - expected)^2 / expected), with
/// k - 1 degrees of freedom. Totals are not normalized before comparison,
/// matching the raw-count construction of the test. A category with zero
/// expected count but nonzero observed count makes the statistic diverge and
/// yields a p-value of zero.
fn chi_square_gof(expected: &[u64], observed: &[u64]) -> f64 {
    let mut statistic = 0.0;

    for (&e, &o) in expected.iter().zip(observed) {
        let e = e as f64;
        let o = o as f64;
        if e == 0.0 {
            if o > 0.0 {
                return 0.0;
            }
            continue;
        }
        statistic += (o - e).powi(2) / e;
    }

    chi_square_p_value(statistic, expected.len().saturating_sub(1))
}

/// Approximate chi-square p-value using the Wilson-Hilferty transformation.
fn chi_square_p_value(statistic: f64, df: usize) -> f64 {
    if df == 0 {
        return 1.0;
    }

    let k = df as f64;
    let z = ((statistic / k).cbrt() - (1.0 - 2.0 / (9.0 * k))) / (2.0 / (9.0 * k)).sqrt();

    1.0 - standard_normal_cdf(z)
}

/// Standard normal CDF approximation.
fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Error function approximation (Abramowitz and Stegun).
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}
