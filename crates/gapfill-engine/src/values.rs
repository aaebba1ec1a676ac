//! Typed access to table columns during imputation.

use polars::prelude::*;

/// Column contents lifted into plain vectors for the fill routines.
///
/// Numeric columns (integers, floats, booleans) are widened to `f64`; string
/// columns stay text. Other data types are not imputable and are skipped by
/// the caller. `NaN` in a float column counts as missing, matching the
/// behavior of the survey tooling this data comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnValues {
    /// Lift a column into plain vectors. Returns `None` for data types the
    /// fill routines cannot handle (dates, lists, nested types).
    pub fn extract(column: &Column) -> Option<Self> {
        match column.dtype() {
            DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Boolean => {
                let widened = column.cast(&DataType::Float64).ok()?;
                let values = widened.f64().ok()?.into_iter().collect();
                Some(Self::Numeric(values))
            }
            DataType::String => {
                let values = column
                    .str()
                    .ok()?
                    .into_iter()
                    .map(|value| value.map(str::to_string))
                    .collect();
                Some(Self::Text(values))
            }
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(values) => values.len(),
            Self::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            Self::Numeric(values) => values[row].is_none_or(f64::is_nan),
            Self::Text(values) => values[row].is_none(),
        }
    }

    /// Per-row missing flags, used to snapshot which cells held real values
    /// before any imputation ran.
    pub fn missing_flags(&self) -> Vec<bool> {
        (0..self.len()).map(|row| self.is_missing(row)).collect()
    }

    /// Rebuild a column in the original data type. Rows that held a value in
    /// `original` keep it verbatim; only rows the fill routines wrote move
    /// from missing to filled.
    pub fn into_column(self, original: &Column) -> PolarsResult<Column> {
        let name = original.name().clone();
        match self {
            Self::Numeric(values) => match original.dtype() {
                DataType::Float64 => Ok(Column::new(name, values)),
                DataType::Int64 => {
                    let kept = original.i64()?;
                    let merged: Vec<Option<i64>> = kept
                        .into_iter()
                        .zip(&values)
                        .map(|(kept, filled)| kept.or_else(|| filled.map(|value| value as i64)))
                        .collect();
                    Ok(Column::new(name, merged))
                }
                DataType::UInt64 => {
                    let kept = original.u64()?;
                    let merged: Vec<Option<u64>> = kept
                        .into_iter()
                        .zip(&values)
                        .map(|(kept, filled)| kept.or_else(|| filled.map(|value| value as u64)))
                        .collect();
                    Ok(Column::new(name, merged))
                }
                DataType::Boolean => {
                    let kept = original.bool()?;
                    let merged: Vec<Option<bool>> = kept
                        .into_iter()
                        .zip(&values)
                        .map(|(kept, filled)| kept.or_else(|| filled.map(|value| value != 0.0)))
                        .collect();
                    Ok(Column::new(name, merged))
                }
                // narrow integers and f32 round-trip through f64 exactly
                dtype => Column::new(name, values).cast(dtype),
            },
            Self::Text(values) => Ok(Column::new(name, values)),
        }
    }
}

/// Render a grouping value as a stratum key component. Missing values yield
/// `None`; a row with a missing grouping value sits outside every stratum
/// for that round.
pub fn key_component(value: &AnyValue) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::Float32(number) if number.is_nan() => None,
        AnyValue::Float64(number) if number.is_nan() => None,
        AnyValue::String(text) => Some((*text).to_string()),
        AnyValue::StringOwned(text) => Some(text.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_columns_widen_and_round_trip() {
        let column = Column::new("gk".into(), vec![Some(10i64), None, Some(30)]);
        let mut values = ColumnValues::extract(&column).unwrap();
        assert_eq!(values.missing_flags(), vec![false, true, false]);

        if let ColumnValues::Numeric(inner) = &mut values {
            inner[1] = Some(20.0);
        }
        let rebuilt = values.into_column(&column).unwrap();
        assert_eq!(rebuilt.dtype(), &DataType::Int64);
        let rebuilt = rebuilt.i64().unwrap();
        assert_eq!(rebuilt.get(1), Some(20));
    }

    #[test]
    fn fractional_fills_truncate_into_integer_columns() {
        let column = Column::new("omzet".into(), vec![None::<i64>, Some(7)]);
        let mut values = ColumnValues::extract(&column).unwrap();
        if let ColumnValues::Numeric(inner) = &mut values {
            inner[0] = Some(2.85);
        }
        let rebuilt = values.into_column(&column).unwrap();
        assert_eq!(rebuilt.i64().unwrap().get(0), Some(2));
        assert_eq!(rebuilt.i64().unwrap().get(1), Some(7));
    }

    #[test]
    fn nan_counts_as_missing_in_float_columns() {
        let column = Column::new("werkzame".into(), vec![Some(1.5), Some(f64::NAN), None]);
        let values = ColumnValues::extract(&column).unwrap();
        assert_eq!(values.missing_flags(), vec![false, true, true]);
    }

    #[test]
    fn text_columns_stay_text() {
        let column = Column::new("regio".into(), vec![Some("west"), None]);
        let values = ColumnValues::extract(&column).unwrap();
        assert!(matches!(values, ColumnValues::Text(_)));
        assert_eq!(values.missing_flags(), vec![false, true]);
    }

    #[test]
    fn unsupported_data_types_are_refused() {
        let column = Column::new("ts".into(), vec![Some(1i64), None])
            .cast(&DataType::Datetime(TimeUnit::Microseconds, None))
            .unwrap();
        assert!(ColumnValues::extract(&column).is_none());
    }

    #[test]
    fn key_components_treat_null_and_nan_as_missing() {
        assert_eq!(key_component(&AnyValue::Null), None);
        assert_eq!(key_component(&AnyValue::Float64(f64::NAN)), None);
        assert_eq!(key_component(&AnyValue::Int64(45)), Some("45".to_string()));
        assert_eq!(
            key_component(&AnyValue::String("C")),
            Some("C".to_string())
        );
    }
}
