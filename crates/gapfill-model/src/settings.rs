use serde::{Deserialize, Serialize};

use crate::error::{GapfillError, Result};
use crate::method::MethodMap;

/// The stratification dimensions in order of importance, and whether
/// imputation falls back to coarser strata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupBySpec {
    /// Stratification columns, most significant first.
    pub dimensions: Vec<String>,
    /// When true, rounds continue with one dimension fewer until the whole
    /// table is a single stratum. When false, only the finest stratification
    /// is attempted.
    #[serde(default)]
    pub drop_dimensions: bool,
}

impl GroupBySpec {
    pub fn new(dimensions: Vec<String>, drop_dimensions: bool) -> Self {
        Self {
            dimensions,
            drop_dimensions,
        }
    }
}

/// Run-level imputation settings, the `general.imputation` section of the
/// settings file. CLI flags may override individual fields before the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputeSettings {
    /// Column that uniquely identifies a record.
    #[serde(default)]
    pub index_key: Option<String>,
    /// Seed for the random-pick generator. Omit for entropy seeding.
    #[serde(default)]
    pub set_seed: Option<u64>,
    /// Minimum number of valid donors required by donor-dependent methods.
    #[serde(default = "default_min_threshold")]
    pub min_threshold: usize,
    /// When true, values imputed in earlier rounds are excluded as donors in
    /// later rounds.
    #[serde(default)]
    pub track_imputed: bool,
    /// Stratification dimensions and fallback policy.
    #[serde(default)]
    pub group_by: Option<GroupBySpec>,
    /// Type-tag to method mapping.
    #[serde(default)]
    pub imputation_methods: MethodMap,
}

fn default_min_threshold() -> usize {
    1
}

impl Default for ImputeSettings {
    fn default() -> Self {
        Self {
            index_key: None,
            set_seed: None,
            min_threshold: default_min_threshold(),
            track_imputed: false,
            group_by: None,
            imputation_methods: MethodMap::default(),
        }
    }
}

impl ImputeSettings {
    /// The index key, required before a run can start.
    pub fn require_index_key(&self) -> Result<&str> {
        self.index_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                GapfillError::IncompleteSettings(
                    "no index key configured (settings `index_key` or --id)".to_string(),
                )
            })
    }

    /// The grouping dimensions, required before a run can start.
    pub fn require_group_by(&self) -> Result<&GroupBySpec> {
        self.group_by
            .as_ref()
            .filter(|spec| !spec.dimensions.is_empty())
            .ok_or_else(|| {
                GapfillError::IncompleteSettings(
                    "no grouping dimensions configured (settings `group_by.dimensions` or --group-by)"
                        .to_string(),
                )
            })
    }
}

/// Top-level settings file: the imputation section lives under `general`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsFile {
    pub general: GeneralSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneralSection {
    pub imputation: ImputeSettings,
}
