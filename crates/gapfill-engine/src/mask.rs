//! Snapshot of which cells were missing before any imputation ran.

use std::collections::BTreeMap;

use polars::prelude::DataFrame;

use crate::values::ColumnValues;

/// Per-column missing flags, captured once before the first fill round.
///
/// With donor tracking enabled, a cell that was filled in an earlier round
/// never serves as a donor in a later round: later rounds see the original
/// gaps, not the imputed values.
#[derive(Debug, Clone, Default)]
pub struct InvalidDonorMask {
    columns: BTreeMap<String, Vec<bool>>,
}

impl InvalidDonorMask {
    /// Record the missing cells of every imputable column. Columns with
    /// unsupported data types carry no entry and are never masked.
    pub fn capture(df: &DataFrame) -> Self {
        let mut columns = BTreeMap::new();
        for column in df.get_columns() {
            if let Some(values) = ColumnValues::extract(column) {
                columns.insert(column.name().to_string(), values.missing_flags());
            }
        }
        Self { columns }
    }

    /// Flags for one column; `true` marks a cell that may not donate.
    pub fn column(&self, name: &str) -> Option<&[bool]> {
        self.columns.get(name).map(Vec::as_slice)
    }
}
