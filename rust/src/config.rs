//! Configuration types for chart layout.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::models::CategoryId;

/// Filter key a host uses for the implicit uncategorized bucket.
pub const UNCATEGORIZED_KEY: &str = "uncategorized";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown time scale unit: {0} (expected days, weeks or months)")]
    UnknownTimeScale(String),
    #[error("Invalid category filter key: {0}")]
    InvalidCategoryKey(String),
}

/// Unit of the time-axis gridlines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeScaleUnit {
    #[default]
    Days,
    Weeks,
    Months,
}

impl TimeScaleUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Days => "days",
            Self::Weeks => "weeks",
            Self::Months => "months",
        }
    }
}

impl FromStr for TimeScaleUnit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "days" => Ok(Self::Days),
            "weeks" => Ok(Self::Weeks),
            "months" => Ok(Self::Months),
            other => Err(ConfigError::UnknownTimeScale(other.to_string())),
        }
    }
}

impl fmt::Display for TimeScaleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scale and spacing of the rendered chart.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartConfig {
    /// Horizontal scale.
    pub pixels_per_day: f64,
    /// Height of a task bar and of a category heading.
    pub row_height: f64,
    /// Gap below each task row.
    pub row_spacing: f64,
    /// Gap below each category heading.
    pub heading_spacing: f64,
    /// Space reserved above the first row for the time scale.
    pub top_offset: f64,
    pub time_scale: TimeScaleUnit,
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    pub verbosity: u8,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            pixels_per_day: 30.0,
            row_height: 30.0,
            row_spacing: 5.0,
            heading_spacing: 10.0,
            top_offset: 60.0,
            time_scale: TimeScaleUnit::Days,
            verbosity: 0,
        }
    }
}

/// Grouping key for vertical layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryBucket {
    Category(CategoryId),
    Uncategorized,
}

/// Which category buckets are shown.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Selected {
        categories: FxHashSet<CategoryId>,
        uncategorized: bool,
    },
}

impl CategoryFilter {
    pub fn only(categories: impl IntoIterator<Item = CategoryId>, uncategorized: bool) -> Self {
        Self::Selected {
            categories: categories.into_iter().collect(),
            uncategorized,
        }
    }

    /// Build a filter from host keys: category ids as strings plus
    /// [`UNCATEGORIZED_KEY`].
    pub fn from_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Result<Self, ConfigError> {
        let mut categories = FxHashSet::default();
        let mut uncategorized = false;
        for key in keys {
            let key = key.trim();
            if key == UNCATEGORIZED_KEY {
                uncategorized = true;
            } else {
                let id = key
                    .parse::<CategoryId>()
                    .map_err(|_| ConfigError::InvalidCategoryKey(key.to_string()))?;
                categories.insert(id);
            }
        }
        Ok(Self::Selected {
            categories,
            uncategorized,
        })
    }

    pub fn includes(&self, bucket: CategoryBucket) -> bool {
        match (self, bucket) {
            (Self::All, _) => true,
            (Self::Selected { categories, .. }, CategoryBucket::Category(id)) => {
                categories.contains(&id)
            }
            (Self::Selected { uncategorized, .. }, CategoryBucket::Uncategorized) => {
                *uncategorized
            }
        }
    }
}
