//! # Category
//!
//! The closed set of medal tiers that drives branch selection, and the branch
//! identifiers derived from it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::steps;

/// Medal tier a run aggregates. Chosen once per run and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Bronze,
    Silver,
    Gold,
}

impl Category {
    /// Every category, in declaration order
    pub const ALL: [Category; 3] = [Self::Bronze, Self::Silver, Self::Gold];

    /// Textual form stored in the source dataset and the output table
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
        }
    }

    /// Identifier of the aggregation branch dedicated to this category
    pub fn branch_id(&self) -> BranchId {
        BranchId(*self)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Bronze" => Ok(Self::Bronze),
            "Silver" => Ok(Self::Silver),
            "Gold" => Ok(Self::Gold),
            _ => Err(format!("Invalid category: {s}")),
        }
    }
}

/// Identifier of one aggregation branch (`calc_<Category>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct BranchId(Category);

impl BranchId {
    pub fn category(&self) -> Category {
        self.0
    }

    /// Step identifier of the branch inside the workflow graph
    pub fn as_str(&self) -> &'static str {
        match self.0 {
            Category::Bronze => steps::CALC_BRONZE,
            Category::Silver => steps::CALC_SILVER,
            Category::Gold => steps::CALC_GOLD,
        }
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<BranchId> for String {
    fn from(id: BranchId) -> Self {
        id.as_str().to_string()
    }
}

impl TryFrom<String> for BranchId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .strip_prefix(steps::CALC_PREFIX)
            .and_then(|category| category.parse::<Category>().ok())
            .map(BranchId)
            .ok_or_else(|| format!("Invalid branch identifier: {value}"))
    }
}
