//! One imputation pass over every column of the table, for one set of
//! grouping dimensions.

use std::collections::HashMap;

use polars::prelude::*;
use tracing::{debug, info, warn};

use gapfill_model::{MethodMap, VariableCatalog};
use rand::rngs::StdRng;

use crate::error::Result;
use crate::expr::RowFilter;
use crate::fill::{FillOutcome, fill_missing_values};
use crate::mask::InvalidDonorMask;
use crate::report::{ColumnOutcome, Resolution, RoundReport};
use crate::values::{ColumnValues, key_component};

/// Shared, per-run inputs of a pass.
pub(crate) struct PassContext<'a> {
    pub catalog: &'a VariableCatalog,
    pub methods: &'a MethodMap,
    pub min_threshold: usize,
}

/// Impute every imputable column once, stratified by `group_by`. An empty
/// `group_by` treats the whole table as a single stratum.
///
/// Columns are skipped, never failed, when their metadata is absent or
/// unusable; data-quality issues surface as log records and in the returned
/// report.
pub(crate) fn impute_for_dimensions(
    df: &mut DataFrame,
    ctx: &PassContext<'_>,
    group_by: &[String],
    mask: Option<&InvalidDonorMask>,
    rng: &mut StdRng,
) -> Result<RoundReport> {
    let height = df.height();
    let column_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let mut outcomes = Vec::new();

    for column_name in &column_names {
        let Some(variable) = ctx.catalog.get(column_name) else {
            debug!(column = %column_name, "skip: no variable metadata");
            continue;
        };
        let Some(var_type) = variable.type_tag() else {
            info!(column = %column_name, "skip: variable metadata has no type");
            continue;
        };
        if variable.no_impute || ctx.methods.is_skipped(var_type) {
            debug!(column = %column_name, var_type, "skip: variable is not imputed");
            continue;
        }

        // Rows outside the eligibility filter neither receive fills nor
        // donate values.
        let mut eligible = vec![true; height];
        if let Some(expression) = variable.eligibility_expression() {
            match RowFilter::parse(expression).and_then(|filter| filter.evaluate(df)) {
                Ok(selected) => {
                    for (slot, value) in eligible.iter_mut().zip(&selected) {
                        *slot = value.unwrap_or(false);
                    }
                }
                Err(error) => {
                    warn!(
                        column = %column_name,
                        filter = expression,
                        %error,
                        "eligibility filter failed; imputing without it"
                    );
                }
            }
        }

        // Rows matching the set-nan rule must stay missing.
        let mut forced = vec![false; height];
        if let Some(expression) = variable.set_nan_eval.as_deref() {
            match RowFilter::parse(expression).and_then(|filter| filter.evaluate(df)) {
                Ok(selected) => {
                    for (slot, value) in forced.iter_mut().zip(&selected) {
                        *slot = value.unwrap_or(false);
                    }
                }
                Err(error) => {
                    warn!(
                        column = %column_name,
                        rule = expression,
                        %error,
                        "set-nan rule failed; no cell is forced to stay missing"
                    );
                }
            }
        }

        let working: Vec<usize> = (0..height)
            .filter(|&row| eligible[row] && !forced[row])
            .collect();

        let original = df.column(column_name)?.clone();
        let Some(mut values) = ColumnValues::extract(&original) else {
            debug!(column = %column_name, dtype = %original.dtype(), "skip: unsupported data type");
            continue;
        };

        let gaps_before = working
            .iter()
            .filter(|&&row| values.is_missing(row))
            .count();
        if gaps_before == 0 {
            debug!(column = %column_name, "skip: no missing values");
            continue;
        }
        if gaps_before == working.len() {
            debug!(column = %column_name, "skip: only missing values");
            continue;
        }
        let percent = (1000.0 * gaps_before as f64 / working.len() as f64).round() / 10.0;
        debug!(
            column = %column_name,
            gaps = gaps_before,
            rows = working.len(),
            percent,
            "filling gaps"
        );

        let resolved = variable
            .impute_method
            .or_else(|| ctx.methods.method_for_type(var_type));
        let Some(method) = resolved else {
            warn!(
                column = %column_name,
                var_type,
                "no imputation method for this variable; leaving its gaps"
            );
            continue;
        };
        debug!(column = %column_name, method = %method, "imputing from the valid values");

        let strata = if group_by.is_empty() {
            vec![(Vec::new(), working.clone())]
        } else {
            partition_rows(df, group_by, &working)?
        };
        let invalid = mask.and_then(|mask| mask.column(column_name));

        for (key, rows) in &strata {
            let outcome =
                fill_missing_values(&mut values, rows, invalid, method, ctx.min_threshold, rng);
            match outcome {
                FillOutcome::NoGaps => {}
                FillOutcome::Filled { filled } => {
                    debug!(
                        column = %column_name,
                        stratum = %stratum_label(key),
                        filled,
                        "filled stratum"
                    );
                }
                FillOutcome::Refused { reason } => {
                    warn!(
                        column = %column_name,
                        stratum = %stratum_label(key),
                        %reason,
                        "imputation not possible in this stratum"
                    );
                }
            }
        }

        let gaps_after = working
            .iter()
            .filter(|&&row| values.is_missing(row))
            .count();
        if gaps_after < gaps_before {
            df.with_column(values.into_column(&original)?)?;
        }

        let filled = gaps_before - gaps_after;
        let resolution = Resolution::classify(gaps_before, gaps_after);
        match resolution {
            Resolution::Unresolved => info!(
                column = %column_name,
                dimensions = ?group_by,
                remaining = gaps_after,
                "did not impute any gap"
            ),
            Resolution::Partial => info!(
                column = %column_name,
                dimensions = ?group_by,
                filled,
                remaining = gaps_after,
                "did not impute all gaps"
            ),
            Resolution::Full => info!(
                column = %column_name,
                dimensions = ?group_by,
                filled,
                rows = working.len(),
                percent,
                "imputed all gaps"
            ),
        }
        outcomes.push(ColumnOutcome {
            column: column_name.clone(),
            method,
            gaps_before,
            gaps_after,
            resolution,
        });
    }

    Ok(RoundReport {
        dimensions: group_by.to_vec(),
        outcomes,
    })
}

/// Split `rows` into strata keyed by the grouping columns, in order of first
/// appearance. Rows with a missing value in any grouping column belong to no
/// stratum and are left for a coarser round.
fn partition_rows(
    df: &DataFrame,
    group_by: &[String],
    rows: &[usize],
) -> Result<Vec<(Vec<String>, Vec<usize>)>> {
    let mut key_columns = Vec::with_capacity(group_by.len());
    for dimension in group_by {
        key_columns.push(df.column(dimension)?.clone());
    }

    let mut strata: Vec<(Vec<String>, Vec<usize>)> = Vec::new();
    let mut slots: HashMap<Vec<String>, usize> = HashMap::new();
    'rows: for &row in rows {
        let mut key = Vec::with_capacity(key_columns.len());
        for column in &key_columns {
            match key_component(&column.get(row).unwrap_or(AnyValue::Null)) {
                Some(part) => key.push(part),
                None => continue 'rows,
            }
        }
        match slots.get(&key) {
            Some(&slot) => strata[slot].1.push(row),
            None => {
                slots.insert(key.clone(), strata.len());
                strata.push((key, vec![row]));
            }
        }
    }
    Ok(strata)
}

fn stratum_label(key: &[String]) -> String {
    if key.is_empty() {
        "whole table".to_string()
    } else {
        key.join("/")
    }
}

#[cfg(test)]
mod tests {
    use gapfill_model::{FillMethod, VariableSpec};
    use rand::SeedableRng;

    use super::*;

    fn context<'a>(catalog: &'a VariableCatalog, methods: &'a MethodMap) -> PassContext<'a> {
        PassContext {
            catalog,
            methods,
            min_threshold: 1,
        }
    }

    fn numeric_catalog(column: &str) -> VariableCatalog {
        let mut catalog = VariableCatalog::new();
        catalog.insert(
            column.to_string(),
            VariableSpec::of_type("float").with_impute_method(FillMethod::Mean),
        );
        catalog
    }

    #[test]
    fn null_grouping_keys_leave_rows_unimputed() {
        let mut df = df! {
            "gk" => &[Some("A"), Some("A"), None],
            "omzet" => &[Some(10.0), None, None],
        }
        .unwrap();
        let catalog = numeric_catalog("omzet");
        let methods = MethodMap::default();
        let ctx = context(&catalog, &methods);
        let mut rng = StdRng::seed_from_u64(1);

        let report =
            impute_for_dimensions(&mut df, &ctx, &["gk".to_string()], None, &mut rng).unwrap();

        let omzet = df.column("omzet").unwrap().f64().unwrap();
        assert_eq!(omzet.get(1), Some(10.0));
        assert_eq!(omzet.get(2), None);
        assert_eq!(report.outcomes[0].resolution, Resolution::Partial);
    }

    #[test]
    fn eligibility_filter_scopes_both_donors_and_targets() {
        let mut df = df! {
            "actief" => &[1i64, 1, 0, 0],
            "omzet" => &[Some(4.0), None, Some(100.0), None],
        }
        .unwrap();
        let mut catalog = VariableCatalog::new();
        catalog.insert(
            "omzet".to_string(),
            VariableSpec::of_type("float")
                .with_impute_method(FillMethod::Mean)
                .with_filter("actief"),
        );
        let methods = MethodMap::default();
        let ctx = context(&catalog, &methods);
        let mut rng = StdRng::seed_from_u64(1);

        impute_for_dimensions(&mut df, &ctx, &[], None, &mut rng).unwrap();

        let omzet = df.column("omzet").unwrap().f64().unwrap();
        assert_eq!(omzet.get(1), Some(4.0));
        assert_eq!(omzet.get(3), None);
    }

    #[test]
    fn columns_without_metadata_are_left_alone() {
        let mut df = df! {
            "onbekend" => &[Some(1.0), None],
        }
        .unwrap();
        let catalog = VariableCatalog::new();
        let methods = MethodMap::default();
        let ctx = context(&catalog, &methods);
        let mut rng = StdRng::seed_from_u64(1);

        let report = impute_for_dimensions(&mut df, &ctx, &[], None, &mut rng).unwrap();
        assert!(report.outcomes.is_empty());
        assert_eq!(df.column("onbekend").unwrap().f64().unwrap().get(1), None);
    }
}
