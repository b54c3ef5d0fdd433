//! Forgiving field deserializers for hand-edited and older project files.
//!
//! Every function here accepts any YAML value and falls back to a default
//! instead of failing, so a single odd field never rejects a whole document.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

use crate::models::{parse_date, TaskStatus, MAX_DURATION_DAYS};

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        }
        _ => None,
    }
}

/// Strings, with scalars stringified and everything else empty.
pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// `YYYY-MM-DD` dates; anything unparsable becomes `None`.
pub fn date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => parse_date(&s),
        _ => None,
    })
}

/// Task duration in days; missing, non-numeric or non-positive values become 1
/// and oversized ones are capped at [`MAX_DURATION_DAYS`].
pub fn duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match as_integer(&value) {
        Some(days) if days >= 1 => {
            u32::try_from(days.min(i64::from(MAX_DURATION_DAYS))).unwrap_or(MAX_DURATION_DAYS)
        }
        _ => 1,
    })
}

pub fn default_duration() -> u32 {
    1
}

/// Non-negative integer positions; other entries are dropped.
pub fn indices<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<usize>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Sequence(items) => items
            .iter()
            .filter_map(as_integer)
            .filter_map(|i| usize::try_from(i).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Optional numeric id. Zero counts as absent, as in older files.
pub fn opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(as_integer(&value).filter(|&id| id != 0))
}

pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(as_integer(&value).unwrap_or(0))
}

/// List of numeric ids; other entries are dropped.
pub fn ids<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<i64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Sequence(items) => items.iter().filter_map(as_integer).collect(),
        _ => Vec::new(),
    })
}

pub fn status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TaskStatus, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => TaskStatus::parse_lenient(&s),
        _ => TaskStatus::default(),
    })
}

/// A list of records. Entries that do not decode become `T::default()` so
/// that positions (which other records may refer to) are preserved.
pub fn seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Sequence(items) => items
            .into_iter()
            .map(|item| serde_yaml::from_value(item).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}
