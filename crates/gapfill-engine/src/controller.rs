//! The imputation run driver.

use polars::prelude::DataFrame;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, info_span};

use gapfill_model::{MethodMap, VariableCatalog};

use crate::error::{EngineError, Result};
use crate::mask::InvalidDonorMask;
use crate::pass::{PassContext, impute_for_dimensions};
use crate::report::RunReport;

/// Tunables of an imputation run.
#[derive(Debug, Clone)]
pub struct ImputeOptions {
    /// Seed for the random generator behind `pick`. `None` draws fresh
    /// entropy, so repeated runs differ.
    pub seed: Option<u64>,
    /// Minimum number of donors a stratum needs before a donor-based method
    /// fills anything.
    pub min_threshold: usize,
    /// When set, cells filled in an earlier round never donate in a later
    /// one.
    pub track_imputed: bool,
}

impl Default for ImputeOptions {
    fn default() -> Self {
        Self {
            seed: None,
            min_threshold: 1,
            track_imputed: false,
        }
    }
}

/// Fills the gaps of a table, stratified by grouping dimensions.
///
/// Imputation runs in rounds. Round zero stratifies by all dimensions; when
/// dimension dropping is enabled each following round drops the
/// least-important (last) dimension, down to a final round over the whole
/// table. Gaps a round cannot fill are left for the next, coarser round.
#[derive(Debug, Clone)]
pub struct GapImputer {
    index_key: String,
    catalog: VariableCatalog,
    methods: MethodMap,
    options: ImputeOptions,
}

impl GapImputer {
    pub fn new(
        index_key: impl Into<String>,
        catalog: VariableCatalog,
        methods: MethodMap,
    ) -> Self {
        Self::with_options(index_key, catalog, methods, ImputeOptions::default())
    }

    pub fn with_options(
        index_key: impl Into<String>,
        catalog: VariableCatalog,
        methods: MethodMap,
        options: ImputeOptions,
    ) -> Self {
        let imputer = Self {
            index_key: index_key.into(),
            catalog,
            methods,
            options,
        };
        info!(
            index_key = %imputer.index_key,
            seed = ?imputer.options.seed,
            min_threshold = imputer.options.min_threshold,
            track_imputed = imputer.options.track_imputed,
            variables = imputer.catalog.len(),
            "gap imputation configured"
        );
        imputer
    }

    /// Impute the table in place. `group_by` orders the dimensions from most
    /// to least important; with `drop_dimensions` the run falls back to ever
    /// coarser strata until the table itself is one stratum.
    pub fn impute(
        &self,
        df: &mut DataFrame,
        group_by: &[String],
        drop_dimensions: bool,
    ) -> Result<RunReport> {
        for name in std::iter::once(self.index_key.as_str())
            .chain(group_by.iter().map(String::as_str))
        {
            if df.column(name).is_err() {
                return Err(EngineError::MissingColumn {
                    name: name.to_string(),
                });
            }
        }

        let mut rng = match self.options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mask = self
            .options
            .track_imputed
            .then(|| InvalidDonorMask::capture(df));
        let ctx = PassContext {
            catalog: &self.catalog,
            methods: &self.methods,
            min_threshold: self.options.min_threshold,
        };

        let mut report = RunReport::default();
        for round in 0..=group_by.len() {
            let active = &group_by[..group_by.len() - round];
            let span = info_span!("round", index = round, dimensions = ?active);
            let _guard = span.enter();
            debug!("starting imputation round");
            let round_report = impute_for_dimensions(df, &ctx, active, mask.as_ref(), &mut rng)?;
            report.rounds.push(round_report);
            if !drop_dimensions {
                break;
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use gapfill_model::{FillMethod, VariableSpec};
    use polars::prelude::*;

    use super::*;

    fn table() -> DataFrame {
        df! {
            "be_id" => &[1i64, 2, 3, 4],
            "gk" => &["A", "A", "B", "B"],
            "sbi" => &["C", "C", "D", "D"],
            "omzet" => &[Some(1.0), None, Some(3.0), None],
        }
        .unwrap()
    }

    fn imputer() -> GapImputer {
        let mut catalog = VariableCatalog::new();
        catalog.insert(
            "omzet".to_string(),
            VariableSpec::of_type("float").with_impute_method(FillMethod::Mean),
        );
        GapImputer::new("be_id", catalog, MethodMap::default())
    }

    #[test]
    fn missing_grouping_column_is_fatal() {
        let mut df = table();
        let error = imputer()
            .impute(&mut df, &["ontbreekt".to_string()], false)
            .unwrap_err();
        assert!(matches!(error, EngineError::MissingColumn { name } if name == "ontbreekt"));
    }

    #[test]
    fn missing_index_key_is_fatal() {
        let mut df = table().drop("be_id").unwrap();
        let error = imputer().impute(&mut df, &[], false).unwrap_err();
        assert!(matches!(error, EngineError::MissingColumn { name } if name == "be_id"));
    }

    #[test]
    fn without_dimension_dropping_only_one_round_runs() {
        let mut df = table();
        let dims = vec!["gk".to_string(), "sbi".to_string()];
        let report = imputer().impute(&mut df, &dims, false).unwrap();
        assert_eq!(report.rounds.len(), 1);
        assert_eq!(report.rounds[0].dimensions, dims);
    }

    #[test]
    fn dimension_dropping_ends_with_an_ungrouped_round() {
        let mut df = table();
        let dims = vec!["gk".to_string(), "sbi".to_string()];
        let report = imputer().impute(&mut df, &dims, true).unwrap();
        assert_eq!(report.rounds.len(), 3);
        assert_eq!(report.rounds[0].dimensions, dims);
        assert_eq!(report.rounds[1].dimensions, vec!["gk".to_string()]);
        assert!(report.rounds[2].dimensions.is_empty());
    }
}
