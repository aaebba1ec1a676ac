//! Input loading for imputation runs: the records table, the variable
//! metadata table, and the settings file. Record tables are semicolon
//! separated, with column names on the first row.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use csv::StringRecord;
use polars::prelude::{
    CsvParseOptions, CsvReadOptions, CsvWriter, DataFrame, SerReader, SerWriter,
};
use tracing::debug;

use gapfill_model::{
    FillMethod, ImputeSettings, SettingsFile, VariableCatalog, VariableSpec, parse_flag,
};

/// Read the records table into a DataFrame. Column types are inferred from
/// the leading rows.
pub fn load_records(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .with_parse_options(CsvParseOptions::default().with_separator(b';'))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("Failed to open records file: {}", path.display()))?
        .finish()
        .with_context(|| format!("Failed to read records file: {}", path.display()))?;
    debug!(rows = df.height(), columns = df.width(), "records loaded");
    Ok(df)
}

/// Write the records table to `output`, or to stdout when no path is given.
pub fn write_records(df: &mut DataFrame, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            CsvWriter::new(&mut file)
                .with_separator(b';')
                .finish(df)
                .with_context(|| format!("Failed to write output file: {}", path.display()))?;
        }
        None => {
            let mut stdout = std::io::stdout();
            CsvWriter::new(&mut stdout)
                .with_separator(b';')
                .finish(df)
                .context("Failed to write records to stdout")?;
        }
    }
    Ok(())
}

/// Read the settings file and return its imputation section.
pub fn load_settings(path: &Path) -> Result<ImputeSettings> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open settings file: {}", path.display()))?;
    let settings: SettingsFile = serde_yaml::from_reader(file)
        .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;
    Ok(settings.general.imputation)
}

/// Read the variable metadata table into a catalog.
///
/// Only the `name` column is required; an empty cell means the property is
/// absent for that variable.
pub fn load_variables(path: &Path) -> Result<VariableCatalog> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b';')
        .from_path(path)
        .with_context(|| format!("Failed to open variables file: {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read variables file: {}", path.display()))?
        .clone();

    let idx_name = header_index(&headers, "name");
    let idx_type = header_index(&headers, "type");
    let idx_no_impute = header_index(&headers, "no_impute");
    let idx_filter = header_index(&headers, "filter");
    let idx_impute_only = header_index(&headers, "impute_only");
    let idx_impute_method = header_index(&headers, "impute_method");
    let idx_set_nan_eval = header_index(&headers, "set_nan_eval");
    if idx_name.is_none() {
        bail!("Variables file has no `name` column: {}", path.display());
    }

    let mut catalog = VariableCatalog::new();
    for (row, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("Failed to read variables file: {}", path.display()))?;
        let Some(name) = get_string(&record, idx_name) else {
            continue;
        };
        let line = row + 2;
        let no_impute = match get_string(&record, idx_no_impute) {
            Some(flag) => parse_flag("no_impute", &flag)
                .with_context(|| format!("Variable `{name}` on line {line}"))?,
            None => false,
        };
        let impute_method = get_string(&record, idx_impute_method)
            .map(|method| method.parse::<FillMethod>())
            .transpose()
            .with_context(|| format!("Variable `{name}` on line {line}"))?;
        let spec = VariableSpec {
            var_type: get_string(&record, idx_type),
            no_impute,
            filter: get_string(&record, idx_filter),
            impute_only: get_string(&record, idx_impute_only),
            impute_method,
            set_nan_eval: get_string(&record, idx_set_nan_eval),
        };
        catalog.insert(name, spec);
    }
    debug!(variables = catalog.len(), "variable metadata loaded");
    Ok(catalog)
}

fn header_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

fn get_string(row: &StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| row.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    #[test]
    fn variables_metadata_loads() {
        let file = create_temp_file(
            "name;type;no_impute;filter;impute_only;impute_method;set_nan_eval\n\
             be_id;index;1;;;;\n\
             telewerkers;percentage;;internet == 1;;;\n\
             omzet;float;;;;median;\n",
        );
        let catalog = load_variables(file.path()).unwrap();
        assert_eq!(catalog.len(), 3);
        assert!(catalog.get("be_id").unwrap().no_impute);
        assert_eq!(
            catalog.get("telewerkers").unwrap().filter.as_deref(),
            Some("internet == 1")
        );
        assert_eq!(
            catalog.get("omzet").unwrap().impute_method,
            Some(FillMethod::Median)
        );
        assert_eq!(catalog.get("omzet").unwrap().set_nan_eval, None);
    }

    #[test]
    fn unknown_impute_method_is_rejected() {
        let file = create_temp_file("name;impute_method\nomzet;average\n");
        let error = load_variables(file.path()).unwrap_err();
        assert!(error.to_string().contains("omzet"));
    }

    #[test]
    fn missing_name_column_is_rejected() {
        let file = create_temp_file("type;filter\nfloat;\n");
        assert!(load_variables(file.path()).is_err());
    }

    #[test]
    fn blank_metadata_rows_are_skipped() {
        let file = create_temp_file("name;type\nomzet;float\n;\n");
        let catalog = load_variables(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn settings_file_loads_imputation_section() {
        let file = create_temp_file(
            "general:\n  imputation:\n    index_key: be_id\n    group_by:\n      dimensions: [gk, sbi]\n      drop_dimensions: true\n",
        );
        let settings = load_settings(file.path()).unwrap();
        assert_eq!(settings.require_index_key().unwrap(), "be_id");
        assert!(settings.require_group_by().unwrap().drop_dimensions);
    }

    #[test]
    fn records_round_trip_through_semicolon_csv() {
        let file = create_temp_file("be_id;gk;omzet\n1;A;10.5\n2;B;\n");
        let mut df = load_records(file.path()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);
        assert!(df.column("omzet").unwrap().f64().unwrap().get(1).is_none());

        let out = NamedTempFile::new().unwrap();
        write_records(&mut df, Some(out.path())).unwrap();
        let back = load_records(out.path()).unwrap();
        assert_eq!(back.height(), 2);
        assert!(back.column("omzet").unwrap().f64().unwrap().get(1).is_none());
    }
}
