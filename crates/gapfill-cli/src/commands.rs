//! The imputation command: load inputs, run the imputer, write records.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use tracing::{info, info_span};

use gapfill_engine::{GapImputer, ImputeOptions, RunReport};
use gapfill_model::{GroupBySpec, ImputeSettings};

use crate::cli::Cli;
use crate::ingest::{load_records, load_settings, load_variables, write_records};

/// Everything the end-of-run summary needs.
pub struct RunOutcome {
    pub report: RunReport,
    pub rows: usize,
    pub dimensions: Vec<String>,
    pub output: Option<PathBuf>,
    pub duration_ms: u128,
}

pub fn run_impute(cli: &Cli) -> Result<RunOutcome> {
    let start = Instant::now();

    // =========================================================================
    // Stage 0: Settings and metadata, with CLI overrides folded in
    // =========================================================================
    let settings = load_settings(&cli.settings)?;
    let settings = apply_overrides(settings, cli);
    let index_key = settings.require_index_key()?.to_string();
    let group_by = settings.require_group_by()?.clone();
    let catalog = load_variables(&cli.variables)?;

    // =========================================================================
    // Stage 1: Records
    // =========================================================================
    let mut df = load_records(&cli.records)?;
    let rows = df.height();
    info!(
        records = %cli.records.display(),
        rows,
        columns = df.width(),
        "records loaded"
    );

    // =========================================================================
    // Stage 2: Impute
    // =========================================================================
    let options = ImputeOptions {
        seed: settings.set_seed,
        min_threshold: settings.min_threshold,
        track_imputed: settings.track_imputed,
    };
    let imputer = GapImputer::with_options(
        &index_key,
        catalog,
        settings.imputation_methods,
        options,
    );
    let impute_span = info_span!(
        "impute",
        index_key = %index_key,
        dimensions = ?group_by.dimensions
    );
    let impute_start = Instant::now();
    let report = impute_span
        .in_scope(|| imputer.impute(&mut df, &group_by.dimensions, group_by.drop_dimensions))?;
    info!(
        rounds = report.rounds.len(),
        filled = report.total_filled(),
        duration_ms = impute_start.elapsed().as_millis(),
        "imputation complete"
    );

    // =========================================================================
    // Stage 3: Write imputed records
    // =========================================================================
    write_records(&mut df, cli.output.as_deref())?;
    if let Some(path) = &cli.output {
        info!(output = %path.display(), "imputed records written");
    }

    Ok(RunOutcome {
        report,
        rows,
        dimensions: group_by.dimensions,
        output: cli.output.clone(),
        duration_ms: start.elapsed().as_millis(),
    })
}

/// Fold CLI flags into the settings. Explicit flags win over the file.
fn apply_overrides(mut settings: ImputeSettings, cli: &Cli) -> ImputeSettings {
    if let Some(id) = &cli.id {
        settings.index_key = Some(id.clone());
    }
    if let Some(seed) = cli.seed {
        settings.set_seed = Some(seed);
    }
    if let Some(min_threshold) = cli.min_threshold {
        settings.min_threshold = min_threshold;
    }
    if cli.track_imputed {
        settings.track_imputed = true;
    }
    if let Some(dimensions) = &cli.group_by {
        // Dimensions from the command line keep the configured fallback policy
        let drop_dimensions = settings
            .group_by
            .as_ref()
            .is_none_or(|group| group.drop_dimensions);
        settings.group_by = Some(GroupBySpec::new(dimensions.clone(), drop_dimensions));
    }
    if cli.no_drop_dimensions
        && let Some(group) = settings.group_by.as_mut()
    {
        group.drop_dimensions = false;
    }
    settings
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn parse(extra: &[&str]) -> Cli {
        let mut argv = vec![
            "gapfill",
            "records.csv",
            "--variables",
            "vars.csv",
            "--settings",
            "settings.yaml",
        ];
        argv.extend_from_slice(extra);
        Cli::parse_from(argv)
    }

    #[test]
    fn cli_flags_override_settings() {
        let cli = parse(&[
            "--id",
            "be_id",
            "--group-by",
            "gk,sbi",
            "--seed",
            "7",
            "--min-threshold",
            "3",
            "--track-imputed",
        ]);
        let settings = apply_overrides(ImputeSettings::default(), &cli);
        assert_eq!(settings.require_index_key().unwrap(), "be_id");
        let group_by = settings.require_group_by().unwrap();
        assert_eq!(group_by.dimensions, vec!["gk", "sbi"]);
        assert!(group_by.drop_dimensions);
        assert_eq!(settings.set_seed, Some(7));
        assert_eq!(settings.min_threshold, 3);
        assert!(settings.track_imputed);
    }

    #[test]
    fn no_drop_dimensions_disables_fallback() {
        let cli = parse(&["--group-by", "gk", "--no-drop-dimensions"]);
        let settings = apply_overrides(ImputeSettings::default(), &cli);
        assert!(!settings.require_group_by().unwrap().drop_dimensions);
    }

    #[test]
    fn settings_survive_when_no_flags_are_given() {
        let cli = parse(&[]);
        let mut base = ImputeSettings::default();
        base.index_key = Some("be_id".to_string());
        base.set_seed = Some(2);
        base.group_by = Some(GroupBySpec::new(vec!["gk".to_string()], true));
        let settings = apply_overrides(base.clone(), &cli);
        assert_eq!(settings, base);
    }
}
