use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GapfillError, Result};
use crate::method::FillMethod;

/// Per-variable imputation metadata, immutable for the duration of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Variable type-tag (`float`, `percentage`, `dict`, `bool`, `int`, ...).
    /// Absent means the metadata is incomplete and the column is skipped.
    #[serde(rename = "type", default)]
    pub var_type: Option<String>,
    /// When set, the variable is never imputed.
    #[serde(default)]
    pub no_impute: bool,
    /// Boolean expression selecting the rows that take part in imputation,
    /// as donors and as recipients.
    #[serde(default)]
    pub filter: Option<String>,
    /// Like `filter`, but takes precedence over it when both are present.
    #[serde(default)]
    pub impute_only: Option<String>,
    /// Explicit method override; wins over type-tag resolution.
    #[serde(default)]
    pub impute_method: Option<FillMethod>,
    /// Boolean expression marking rows that must stay missing this round.
    #[serde(default)]
    pub set_nan_eval: Option<String>,
}

impl VariableSpec {
    /// A spec with just a type-tag, the common case.
    pub fn of_type(type_tag: impl Into<String>) -> Self {
        Self {
            var_type: Some(type_tag.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_no_impute(mut self, no_impute: bool) -> Self {
        self.no_impute = no_impute;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn with_impute_only(mut self, impute_only: impl Into<String>) -> Self {
        self.impute_only = Some(impute_only.into());
        self
    }

    #[must_use]
    pub fn with_impute_method(mut self, method: FillMethod) -> Self {
        self.impute_method = Some(method);
        self
    }

    #[must_use]
    pub fn with_set_nan_eval(mut self, expression: impl Into<String>) -> Self {
        self.set_nan_eval = Some(expression.into());
        self
    }

    /// The type-tag, if present and non-empty.
    pub fn type_tag(&self) -> Option<&str> {
        self.var_type.as_deref().filter(|tag| !tag.is_empty())
    }

    /// The eligibility expression for this variable: `impute_only` when
    /// present, otherwise `filter`.
    pub fn eligibility_expression(&self) -> Option<&str> {
        self.impute_only.as_deref().or(self.filter.as_deref())
    }
}

/// Parse a metadata flag cell. Empty cells mean false.
pub fn parse_flag(field: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "" | "false" | "0" | "no" => Ok(false),
        "true" | "1" | "yes" => Ok(true),
        other => Err(GapfillError::InvalidFlag {
            field: field.to_string(),
            value: other.to_string(),
        }),
    }
}

/// All variable specs for a run, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableCatalog {
    variables: BTreeMap<String, VariableSpec>,
}

impl VariableCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: VariableSpec) {
        self.variables.insert(name.into(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&VariableSpec> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VariableSpec)> {
        self.variables.iter().map(|(name, spec)| (name.as_str(), spec))
    }
}

impl FromIterator<(String, VariableSpec)> for VariableCatalog {
    fn from_iter<I: IntoIterator<Item = (String, VariableSpec)>>(iter: I) -> Self {
        Self {
            variables: iter.into_iter().collect(),
        }
    }
}
