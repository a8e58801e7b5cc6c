//! Column role and type classification.
//!
//! Before drift can be computed, every column of the reference snapshot is
//! resolved to a role (date, identifier, target, prediction, or feature) and
//! feature columns are resolved to a type (numerical or categorical). Roles
//! come either from an explicit [`ColumnMapping`] or are inferred from the
//! reference schema by [`classify`].

use arrow::datatypes::{DataType, Schema};
use serde::{Deserialize, Serialize};

/// Explicit declaration of column roles for a drift comparison.
///
/// All fields are optional; absent fields simply leave the corresponding role
/// unassigned. Feature lists are validated against the reference schema at
/// classification time: names whose reference column is missing or does not
/// hold numeric values are silently dropped, not errors. This tolerates loose
/// upstream configuration without failing the whole computation.
///
/// Categorical features must be numeric-coded (category codes stored as
/// integers or floats), which is why both lists are restricted to
/// numeric-typed columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Name of the date/time column, if any.
    pub date: Option<String>,
    /// Name of the row-identifier column, if any.
    pub id: Option<String>,
    /// Name of the target label column, if any.
    pub target: Option<String>,
    /// Name of the model prediction column, if any.
    pub prediction: Option<String>,
    /// Names of numerical feature columns to compare.
    pub numerical_features: Option<Vec<String>>,
    /// Names of categorical (numeric-coded) feature columns to compare.
    pub categorical_features: Option<Vec<String>>,
}

impl ColumnMapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the date column name.
    #[must_use]
    pub fn with_date(mut self, name: impl Into<String>) -> Self {
        self.date = Some(name.into());
        self
    }

    /// Sets the id column name.
    #[must_use]
    pub fn with_id(mut self, name: impl Into<String>) -> Self {
        self.id = Some(name.into());
        self
    }

    /// Sets the target column name.
    #[must_use]
    pub fn with_target(mut self, name: impl Into<String>) -> Self {
        self.target = Some(name.into());
        self
    }

    /// Sets the prediction column name.
    #[must_use]
    pub fn with_prediction(mut self, name: impl Into<String>) -> Self {
        self.prediction = Some(name.into());
        self
    }

    /// Sets the numerical feature list.
    #[must_use]
    pub fn with_numerical_features(mut self, names: Vec<String>) -> Self {
        self.numerical_features = Some(names);
        self
    }

    /// Sets the categorical feature list.
    #[must_use]
    pub fn with_categorical_features(mut self, names: Vec<String>) -> Self {
        self.categorical_features = Some(names);
        self
    }
}

/// Resolved utility columns: date, id, target, and prediction.
///
/// At most one column per role. Utility columns only exist to be excluded
/// from feature comparison; they are never statistically tested themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilityColumns {
    /// Resolved date column, if any.
    pub date: Option<String>,
    /// Resolved id column, if any.
    pub id: Option<String>,
    /// Resolved target column, if any.
    pub target: Option<String>,
    /// Resolved prediction column, if any.
    pub prediction: Option<String>,
}

impl UtilityColumns {
    /// Returns true if the given column name is assigned to any utility role.
    pub fn contains(&self, name: &str) -> bool {
        [&self.date, &self.id, &self.target, &self.prediction]
            .into_iter()
            .any(|c| c.as_deref() == Some(name))
    }
}

/// Output of column classification: resolved utility columns plus the two
/// feature-name lists to be compared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnClassification {
    /// Resolved utility columns.
    pub utility: UtilityColumns,
    /// Names of numerical feature columns, in declaration or schema order.
    pub numerical_features: Vec<String>,
    /// Names of categorical feature columns, in declaration or schema order.
    pub categorical_features: Vec<String>,
}

/// Resolves column roles and feature types from the reference schema.
///
/// With a mapping, utility columns are taken verbatim and the declared
/// feature lists are filtered to names whose reference column holds numeric
/// values (silent drop, no error). Without a mapping, roles are inferred by
/// well-known column names: a column literally named `datetime` becomes the
/// date column, `target` and `prediction` likewise; an id column is never
/// inferred. Remaining numeric-typed columns become numerical features and
/// remaining string-typed columns become categorical features, in schema
/// field order, so repeated calls over the same schema always yield the same
/// lists.
///
/// There are no error conditions; absent columns yield empty lists.
pub fn classify(schema: &Schema, mapping: Option<&ColumnMapping>) -> ColumnClassification {
    match mapping {
        Some(mapping) => classify_from_mapping(schema, mapping),
        None => classify_from_schema(schema),
    }
}

fn classify_from_mapping(schema: &Schema, mapping: &ColumnMapping) -> ColumnClassification {
    let utility = UtilityColumns {
        date: mapping.date.clone(),
        id: mapping.id.clone(),
        target: mapping.target.clone(),
        prediction: mapping.prediction.clone(),
    };

    // Defensive validation, not type conversion: declared names failing the
    // numeric check are dropped from consideration entirely.
    let numerical_features = filter_numeric(schema, mapping.numerical_features.as_deref());
    let categorical_features = filter_numeric(schema, mapping.categorical_features.as_deref());

    ColumnClassification {
        utility,
        numerical_features,
        categorical_features,
    }
}

fn classify_from_schema(schema: &Schema) -> ColumnClassification {
    let existing = |name: &str| -> Option<String> {
        schema.column_with_name(name).map(|_| name.to_string())
    };

    let utility = UtilityColumns {
        date: existing("datetime"),
        id: None,
        target: existing("target"),
        prediction: existing("prediction"),
    };

    let mut numerical_features = Vec::new();
    let mut categorical_features = Vec::new();

    for field in schema.fields() {
        if utility.contains(field.name()) {
            continue;
        }
        if is_numeric_type(field.data_type()) {
            numerical_features.push(field.name().clone());
        } else if is_string_type(field.data_type()) {
            categorical_features.push(field.name().clone());
        }
    }

    ColumnClassification {
        utility,
        numerical_features,
        categorical_features,
    }
}

fn filter_numeric(schema: &Schema, names: Option<&[String]>) -> Vec<String> {
    names
        .unwrap_or_default()
        .iter()
        .filter(|name| {
            schema
                .column_with_name(name)
                .is_some_and(|(_, field)| is_numeric_type(field.data_type()))
        })
        .cloned()
        .collect()
}

fn is_numeric_type(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float16
            | DataType::Float32
            | DataType::Float64
    )
}

fn is_string_type(data_type: &DataType) -> bool {
    matches!(data_type, DataType::Utf8 | DataType::LargeUtf8)
}
