use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GapfillError;

/// The closed set of fill methods.
///
/// Donor-dependent methods derive the fill value from valid donors inside the
/// stratum and are subject to the minimum-donor threshold. Constant methods
/// fill unconditionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMethod {
    /// Arithmetic mean of the valid donors.
    Mean,
    /// Median of the valid donors.
    Median,
    /// Most frequent donor value; ties break to the value that sorts first.
    Mode,
    /// Uniform random draw, with replacement, from the valid donors.
    Pick,
    /// The constant 1, regardless of donor availability.
    Pick1,
    /// The constant 0, regardless of donor availability.
    Nan,
}

impl FillMethod {
    /// Methods in resolution order. Type-tag lookup scans this order, so a
    /// tag listed under several methods resolves to the earliest one.
    pub const ALL: [FillMethod; 6] = [
        FillMethod::Mean,
        FillMethod::Median,
        FillMethod::Mode,
        FillMethod::Pick,
        FillMethod::Pick1,
        FillMethod::Nan,
    ];

    /// Returns true for methods that derive their fill value from donors
    /// and therefore honor the minimum-donor threshold.
    pub fn is_donor_dependent(&self) -> bool {
        matches!(
            self,
            FillMethod::Mean | FillMethod::Median | FillMethod::Mode | FillMethod::Pick
        )
    }

    /// Canonical lowercase name as used in settings files.
    pub fn as_str(&self) -> &'static str {
        match self {
            FillMethod::Mean => "mean",
            FillMethod::Median => "median",
            FillMethod::Mode => "mode",
            FillMethod::Pick => "pick",
            FillMethod::Pick1 => "pick1",
            FillMethod::Nan => "nan",
        }
    }
}

impl fmt::Display for FillMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FillMethod {
    type Err = GapfillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean" => Ok(FillMethod::Mean),
            "median" => Ok(FillMethod::Median),
            "mode" => Ok(FillMethod::Mode),
            "pick" => Ok(FillMethod::Pick),
            "pick1" => Ok(FillMethod::Pick1),
            "nan" => Ok(FillMethod::Nan),
            _ => Err(GapfillError::UnknownMethod(s.to_string())),
        }
    }
}

/// Maps variable type-tags to fill methods.
///
/// Each method carries an optional list of the type-tags it applies to; the
/// reserved `skip` list names tags that must never be imputed. The lists are
/// expected to be disjoint; an overlapping tag resolves to the earliest
/// method in [`FillMethod::ALL`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodMap {
    #[serde(default)]
    pub mean: Option<Vec<String>>,
    #[serde(default)]
    pub median: Option<Vec<String>>,
    #[serde(default)]
    pub mode: Option<Vec<String>>,
    #[serde(default)]
    pub pick: Option<Vec<String>>,
    #[serde(default)]
    pub pick1: Option<Vec<String>>,
    #[serde(default)]
    pub nan: Option<Vec<String>>,
    /// Type-tags that must never be imputed.
    #[serde(default)]
    pub skip: Option<Vec<String>>,
}

impl MethodMap {
    /// The type-tags configured for one method, if any.
    pub fn types_for(&self, method: FillMethod) -> Option<&[String]> {
        let list = match method {
            FillMethod::Mean => &self.mean,
            FillMethod::Median => &self.median,
            FillMethod::Mode => &self.mode,
            FillMethod::Pick => &self.pick,
            FillMethod::Pick1 => &self.pick1,
            FillMethod::Nan => &self.nan,
        };
        list.as_deref()
    }

    /// Resolves the fill method for a variable type-tag, scanning methods in
    /// resolution order. Returns `None` when no method lists the tag.
    pub fn method_for_type(&self, type_tag: &str) -> Option<FillMethod> {
        FillMethod::ALL.into_iter().find(|method| {
            self.types_for(*method)
                .is_some_and(|tags| tags.iter().any(|tag| tag == type_tag))
        })
    }

    /// Returns true when the tag is listed under `skip`.
    pub fn is_skipped(&self, type_tag: &str) -> bool {
        self.skip
            .as_deref()
            .is_some_and(|tags| tags.iter().any(|tag| tag == type_tag))
    }
}
