//! Per-stratum fill routines.
//!
//! A fill operates on one column restricted to one stratum (a set of row
//! positions). Donor-based methods (`mean`, `median`, `mode`, `pick`) compute
//! their fill from the values present in the stratum; constant methods
//! (`pick1`, `nan`) write fixed values and never look at donors.

use std::fmt;

use gapfill_model::FillMethod;
use rand::Rng;
use rand::rngs::StdRng;

use crate::values::ColumnValues;

/// What a single fill attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    /// The stratum had no missing cells for this column.
    NoGaps,
    /// Every missing cell in the stratum was written.
    Filled { filled: usize },
    /// The gaps were left in place; a later, coarser round may still fill
    /// them.
    Refused { reason: RefusalReason },
}

/// Why a fill attempt left its gaps untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefusalReason {
    /// No present value in the stratum can donate.
    NoDonors,
    /// Fewer donors than the configured minimum.
    TooFewDonors { donors: usize, required: usize },
    /// The donors have no most-frequent value.
    ModeIndeterminate,
    /// `mean`/`median` on a text column.
    NonNumeric,
}

impl fmt::Display for RefusalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDonors => write!(f, "no donor values in the stratum"),
            Self::TooFewDonors { donors, required } => {
                write!(f, "{donors} donor values where {required} are required")
            }
            Self::ModeIndeterminate => write!(f, "no most-frequent donor value"),
            Self::NonNumeric => write!(f, "method requires a numeric column"),
        }
    }
}

/// Fill the missing cells of `values` at the row positions in `rows`.
///
/// `invalid_donors`, when present, marks cells that were missing before the
/// first round; those cells never donate even if an earlier round filled
/// them. `min_threshold` gates every donor-based method; a stratum with
/// fewer donors is refused rather than filled from thin evidence.
pub fn fill_missing_values(
    values: &mut ColumnValues,
    rows: &[usize],
    invalid_donors: Option<&[bool]>,
    method: FillMethod,
    min_threshold: usize,
    rng: &mut StdRng,
) -> FillOutcome {
    let gaps: Vec<usize> = rows
        .iter()
        .copied()
        .filter(|&row| values.is_missing(row))
        .collect();
    if gaps.is_empty() {
        return FillOutcome::NoGaps;
    }

    let donor_rows: Vec<usize> = if method.is_donor_dependent() {
        let donors: Vec<usize> = rows
            .iter()
            .copied()
            .filter(|&row| !values.is_missing(row))
            .filter(|&row| !invalid_donors.is_some_and(|mask| mask[row]))
            .collect();
        if donors.is_empty() {
            return FillOutcome::Refused {
                reason: RefusalReason::NoDonors,
            };
        }
        if donors.len() < min_threshold {
            return FillOutcome::Refused {
                reason: RefusalReason::TooFewDonors {
                    donors: donors.len(),
                    required: min_threshold,
                },
            };
        }
        donors
    } else {
        Vec::new()
    };

    match values {
        ColumnValues::Numeric(cells) => {
            let donors: Vec<f64> = donor_rows.iter().filter_map(|&row| cells[row]).collect();
            match method {
                FillMethod::Mean => fill_constant(cells, &gaps, numeric_mean(&donors)),
                FillMethod::Median => fill_constant(cells, &gaps, numeric_median(donors)),
                FillMethod::Mode => {
                    let Some(mode) = numeric_mode(donors) else {
                        return FillOutcome::Refused {
                            reason: RefusalReason::ModeIndeterminate,
                        };
                    };
                    fill_constant(cells, &gaps, mode);
                }
                FillMethod::Pick => {
                    for &row in &gaps {
                        cells[row] = Some(donors[rng.gen_range(0..donors.len())]);
                    }
                }
                FillMethod::Pick1 => fill_constant(cells, &gaps, 1.0),
                FillMethod::Nan => fill_constant(cells, &gaps, 0.0),
            }
        }
        ColumnValues::Text(cells) => match method {
            FillMethod::Mean | FillMethod::Median => {
                return FillOutcome::Refused {
                    reason: RefusalReason::NonNumeric,
                };
            }
            FillMethod::Mode => {
                let donors: Vec<String> = donor_rows
                    .iter()
                    .filter_map(|&row| cells[row].clone())
                    .collect();
                let Some(mode) = text_mode(donors) else {
                    return FillOutcome::Refused {
                        reason: RefusalReason::ModeIndeterminate,
                    };
                };
                for &row in &gaps {
                    cells[row] = Some(mode.clone());
                }
            }
            FillMethod::Pick => {
                let donors: Vec<String> = donor_rows
                    .iter()
                    .filter_map(|&row| cells[row].clone())
                    .collect();
                for &row in &gaps {
                    cells[row] = Some(donors[rng.gen_range(0..donors.len())].clone());
                }
            }
            FillMethod::Pick1 => {
                for &row in &gaps {
                    cells[row] = Some("1".to_string());
                }
            }
            FillMethod::Nan => {
                for &row in &gaps {
                    cells[row] = Some("0".to_string());
                }
            }
        },
    }

    FillOutcome::Filled { filled: gaps.len() }
}

fn fill_constant(cells: &mut [Option<f64>], gaps: &[usize], value: f64) {
    for &row in gaps {
        cells[row] = Some(value);
    }
}

fn numeric_mean(donors: &[f64]) -> f64 {
    donors.iter().sum::<f64>() / donors.len() as f64
}

/// Median with the midpoint convention: an even donor count averages the two
/// central values.
fn numeric_median(mut donors: Vec<f64>) -> f64 {
    donors.sort_by(f64::total_cmp);
    let mid = donors.len() / 2;
    if donors.len() % 2 == 1 {
        donors[mid]
    } else {
        (donors[mid - 1] + donors[mid]) / 2.0
    }
}

/// Most frequent donor value; ties resolve to the smallest value.
fn numeric_mode(mut donors: Vec<f64>) -> Option<f64> {
    donors.sort_by(f64::total_cmp);
    longest_run(&donors).copied()
}

/// Most frequent donor string; ties resolve to the lexicographically first.
fn text_mode(mut donors: Vec<String>) -> Option<String> {
    donors.sort();
    longest_run(&donors).cloned()
}

fn longest_run<T: PartialEq>(sorted: &[T]) -> Option<&T> {
    if sorted.is_empty() {
        return None;
    }
    let mut best: Option<(&T, usize)> = None;
    let mut run_start = 0usize;
    for index in 0..=sorted.len() {
        if index == sorted.len() || sorted[index] != sorted[run_start] {
            let run_len = index - run_start;
            if best.is_none_or(|(_, len)| run_len > len) {
                best = Some((&sorted[run_start], run_len));
            }
            run_start = index;
        }
    }
    best.map(|(value, _)| value)
}
