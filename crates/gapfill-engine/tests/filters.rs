#![allow(missing_docs)]
//! Evaluation of metadata filter expressions against real tables.

use gapfill_engine::{FilterError, RowFilter};
use polars::prelude::*;

fn table() -> DataFrame {
    df! {
        "internet" => &[Some(1i64), Some(0), Some(1), None],
        "gk_sbs" => &[Some(10i64), Some(45), Some(81), Some(45)],
        "regio" => &[Some("west"), Some("oost"), Some("west"), None],
    }
    .unwrap()
}

#[test]
fn comparison_selects_matching_rows() {
    let filter = RowFilter::parse("gk_sbs < 20").unwrap();
    let selected = filter.evaluate(&table()).unwrap();
    assert_eq!(
        selected,
        vec![Some(true), Some(false), Some(false), Some(false)]
    );
}

#[test]
fn bare_column_selects_rows_equal_to_one() {
    let filter = RowFilter::parse("internet").unwrap();
    let selected = filter.evaluate(&table()).unwrap();
    assert_eq!(selected, vec![Some(true), Some(false), Some(true), None]);
}

#[test]
fn conjunction_and_disjunction() {
    let filter = RowFilter::parse("internet == 1 and gk_sbs >= 45").unwrap();
    let selected = filter.evaluate(&table()).unwrap();
    assert_eq!(
        selected,
        vec![Some(false), Some(false), Some(true), None]
    );

    let filter = RowFilter::parse("gk_sbs == 10 or regio == 'oost'").unwrap();
    let selected = filter.evaluate(&table()).unwrap();
    assert_eq!(selected[0], Some(true));
    assert_eq!(selected[1], Some(true));
    assert_eq!(selected[2], Some(false));
}

#[test]
fn string_equality_against_a_text_column() {
    let filter = RowFilter::parse("regio == 'west'").unwrap();
    let selected = filter.evaluate(&table()).unwrap();
    assert_eq!(selected, vec![Some(true), Some(false), Some(true), None]);
}

#[test]
fn missing_values_do_not_select() {
    // row 3 has no internet value; the comparison yields no decision
    let filter = RowFilter::parse("internet == 0").unwrap();
    let selected = filter.evaluate(&table()).unwrap();
    assert_eq!(selected[3], None);
}

#[test]
fn unknown_columns_are_reported_before_evaluation() {
    let filter = RowFilter::parse("onbekend == 1 and internet == 1").unwrap();
    let error = filter.evaluate(&table()).unwrap_err();
    match error {
        FilterError::UnknownColumns(names) => assert_eq!(names, "onbekend"),
        other => panic!("expected unknown-column error, got {other}"),
    }
}

#[test]
fn non_boolean_conjunction_fails_evaluation() {
    // `and` over two integer columns has no boolean meaning
    let filter = RowFilter::parse("internet and gk_sbs").unwrap();
    let error = filter.evaluate(&table()).unwrap_err();
    assert!(matches!(error, FilterError::Evaluation(_)));
}
