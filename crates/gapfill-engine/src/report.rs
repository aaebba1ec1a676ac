//! Reporting of what a run filled, per round and per column.

use std::fmt;

use gapfill_model::FillMethod;
use serde::Serialize;

/// How far a column's gaps got within one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// No gaps remain.
    Full,
    /// Some strata filled, some refused.
    Partial,
    /// Every stratum refused; the gaps are unchanged.
    Unresolved,
}

impl Resolution {
    pub fn classify(gaps_before: usize, gaps_after: usize) -> Self {
        if gaps_after == 0 {
            Self::Full
        } else if gaps_after < gaps_before {
            Self::Partial
        } else {
            Self::Unresolved
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Partial => "partial",
            Self::Unresolved => "unresolved",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column's outcome within one round.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnOutcome {
    pub column: String,
    pub method: FillMethod,
    pub gaps_before: usize,
    pub gaps_after: usize,
    pub resolution: Resolution,
}

/// Everything one round did, keyed by the grouping dimensions it ran with.
#[derive(Debug, Clone, Serialize)]
pub struct RoundReport {
    /// Grouping dimensions of this round; empty means the whole table was
    /// one stratum.
    pub dimensions: Vec<String>,
    pub outcomes: Vec<ColumnOutcome>,
}

/// The full run, one report per executed round.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub rounds: Vec<RoundReport>,
}

/// Per-column numbers accumulated across rounds.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnTotal {
    pub column: String,
    pub method: FillMethod,
    pub gaps_before: usize,
    pub gaps_after: usize,
}

impl ColumnTotal {
    pub fn filled(&self) -> usize {
        self.gaps_before.saturating_sub(self.gaps_after)
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::classify(self.gaps_before, self.gaps_after)
    }
}

impl RunReport {
    /// Collapse the per-round outcomes into one row per column, in the order
    /// columns first appeared. `gaps_before` comes from the first round that
    /// touched the column, `gaps_after` from the last.
    pub fn column_totals(&self) -> Vec<ColumnTotal> {
        let mut totals: Vec<ColumnTotal> = Vec::new();
        for round in &self.rounds {
            for outcome in &round.outcomes {
                if let Some(total) = totals
                    .iter_mut()
                    .find(|total| total.column == outcome.column)
                {
                    total.gaps_after = outcome.gaps_after;
                } else {
                    totals.push(ColumnTotal {
                        column: outcome.column.clone(),
                        method: outcome.method,
                        gaps_before: outcome.gaps_before,
                        gaps_after: outcome.gaps_after,
                    });
                }
            }
        }
        totals
    }

    /// Cells written across all rounds and columns.
    pub fn total_filled(&self) -> usize {
        self.column_totals().iter().map(ColumnTotal::filled).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_boundaries() {
        assert_eq!(Resolution::classify(4, 0), Resolution::Full);
        assert_eq!(Resolution::classify(4, 2), Resolution::Partial);
        assert_eq!(Resolution::classify(4, 4), Resolution::Unresolved);
        assert_eq!(Resolution::classify(0, 0), Resolution::Full);
    }

    #[test]
    fn totals_merge_rounds_per_column() {
        let report = RunReport {
            rounds: vec![
                RoundReport {
                    dimensions: vec!["gk".to_string(), "sbi".to_string()],
                    outcomes: vec![
                        ColumnOutcome {
                            column: "omzet".to_string(),
                            method: FillMethod::Mean,
                            gaps_before: 10,
                            gaps_after: 4,
                            resolution: Resolution::Partial,
                        },
                        ColumnOutcome {
                            column: "internet".to_string(),
                            method: FillMethod::Mode,
                            gaps_before: 3,
                            gaps_after: 0,
                            resolution: Resolution::Full,
                        },
                    ],
                },
                RoundReport {
                    dimensions: vec!["gk".to_string()],
                    outcomes: vec![ColumnOutcome {
                        column: "omzet".to_string(),
                        method: FillMethod::Mean,
                        gaps_before: 4,
                        gaps_after: 1,
                        resolution: Resolution::Partial,
                    }],
                },
            ],
        };

        let totals = report.column_totals();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].column, "omzet");
        assert_eq!(totals[0].gaps_before, 10);
        assert_eq!(totals[0].gaps_after, 1);
        assert_eq!(totals[0].filled(), 9);
        assert_eq!(totals[0].resolution(), Resolution::Partial);
        assert_eq!(totals[1].column, "internet");
        assert_eq!(totals[1].filled(), 3);
        assert_eq!(report.total_filled(), 12);
    }
}
