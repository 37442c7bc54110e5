//! Aggregation policies and the strategy each one maps to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use videodb_core::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingPolicy {
    Min,
    Max,
    MeanMin,
    MeanMax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// How a group of per-chunk scores collapses into one parent score.
#[derive(Clone, Copy)]
pub struct Strategy {
    pub reduce: fn(&[f64]) -> f64,
    /// Index of the match whose timestamp represents the parent, if any.
    pub representative: Option<fn(&[f64]) -> usize>,
    pub direction: SortDirection,
}

impl RankingPolicy {
    pub const ALL: [RankingPolicy; 4] = [Self::Min, Self::Max, Self::MeanMin, Self::MeanMax];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::MeanMin => "mean_min",
            Self::MeanMax => "mean_max",
        }
    }

    // mean_min and mean_max share the reduction; only the ordering differs.
    pub fn strategy(self) -> Strategy {
        match self {
            Self::Min => Strategy { reduce: min_value, representative: Some(argmin), direction: SortDirection::Ascending },
            Self::Max => Strategy { reduce: max_value, representative: Some(argmax), direction: SortDirection::Descending },
            Self::MeanMin => Strategy { reduce: mean, representative: None, direction: SortDirection::Ascending },
            Self::MeanMax => Strategy { reduce: mean, representative: None, direction: SortDirection::Descending },
        }
    }
}

impl fmt::Display for RankingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankingPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| Error::InvalidConfiguration(format!("unknown ranking policy '{}'", s.trim())))
    }
}

/// First index attaining the minimum under IEEE total order.
fn argmin(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if v.total_cmp(&values[best]).is_lt() {
            best = i;
        }
    }
    best
}

/// First index attaining the maximum under IEEE total order.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if v.total_cmp(&values[best]).is_gt() {
            best = i;
        }
    }
    best
}

fn min_value(values: &[f64]) -> f64 {
    values.get(argmin(values)).copied().unwrap_or(f64::NAN)
}

fn max_value(values: &[f64]) -> f64 {
    values.get(argmax(values)).copied().unwrap_or(f64::NAN)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
