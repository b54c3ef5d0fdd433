//! Core data types for the project editor.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::TaskId;
use crate::lenient;

/// Category, person and milestone ids are numeric timestamps.
pub type CategoryId = i64;
pub type PersonId = i64;
pub type MilestoneId = i64;

pub const DEFAULT_PROJECT_NAME: &str = "Untitled Project";
pub const DEFAULT_TASK_NAME: &str = "Untitled Task";
pub const DEFAULT_MILESTONE_EMOJI: &str = "🚩";
pub const UNCATEGORIZED_NAME: &str = "Uncategorized";
pub const UNCATEGORIZED_COLOR: &str = "#999";
pub const DEFAULT_MILESTONE_COLOR: &str = "#000";
/// Longest task accepted, in days (about a century).
pub const MAX_DURATION_DAYS: u32 = 36_500;

/// Add whole days to a date, saturating at the end of the calendar.
pub fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}

/// Parse a `YYYY-MM-DD` date, ignoring surrounding whitespace.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok()
}

/// Progress status of a task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "on-track")]
    OnTrack,
    #[serde(rename = "some risk")]
    SomeRisk,
    #[serde(rename = "high risk")]
    HighRisk,
    #[serde(rename = "scrapped")]
    Scrapped,
    #[serde(rename = "finished")]
    Finished,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnTrack => "on-track",
            Self::SomeRisk => "some risk",
            Self::HighRisk => "high risk",
            Self::Scrapped => "scrapped",
            Self::Finished => "finished",
        }
    }

    /// Parse a status string; unknown values fall back to on-track.
    pub fn parse_lenient(text: &str) -> Self {
        match text.trim() {
            "some risk" => Self::SomeRisk,
            "high risk" => Self::HighRisk,
            "scrapped" => Self::Scrapped,
            "finished" => Self::Finished,
            _ => Self::OnTrack,
        }
    }

    /// Scrapped and finished tasks never become overdue.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Scrapped | Self::Finished)
    }

    /// Status shown on the chart: open tasks whose finish date has passed are high risk.
    pub fn displayed(&self, finish: NaiveDate, today: NaiveDate) -> Self {
        if !self.is_closed() && today >= finish {
            Self::HighRisk
        } else {
            *self
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task on the chart.
///
/// `dependencies` hold stable ids of prerequisite tasks; positions are only
/// used when the project is written back to a document.
#[derive(Clone, Debug, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    /// Declared start; `None` means "today" at resolve time.
    pub start: Option<NaiveDate>,
    /// Length in days, between 1 and [`MAX_DURATION_DAYS`].
    pub duration: u32,
    pub dependencies: Vec<TaskId>,
    pub category_id: Option<CategoryId>,
    pub status: TaskStatus,
    pub status_explanation: String,
    pub assigned_people: Vec<PersonId>,
    pub description: String,
    /// Fields this crate does not know about, kept for round-tripping.
    pub extra: serde_yaml::Mapping,
}

impl Task {
    pub fn new(id: TaskId, name: impl Into<String>, duration: u32) -> Self {
        Self {
            id,
            name: name.into(),
            start: None,
            duration: duration.clamp(1, MAX_DURATION_DAYS),
            dependencies: Vec::new(),
            category_id: None,
            status: TaskStatus::default(),
            status_explanation: String::new(),
            assigned_people: Vec::new(),
            description: String::new(),
            extra: serde_yaml::Mapping::new(),
        }
    }

    /// Declared start, or `today` when absent.
    pub fn declared_start(&self, today: NaiveDate) -> NaiveDate {
        self.start.unwrap_or(today)
    }

    /// Finish date for a given start.
    pub fn finish_from(&self, start: NaiveDate) -> NaiveDate {
        add_days(start, self.duration)
    }

    pub fn depends_on(&self, other: TaskId) -> bool {
        self.dependencies.contains(&other)
    }
}

/// A category heading; array order in the project is rendering order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: CategoryId,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub color: String,
    #[serde(flatten)]
    pub extra: serde_yaml::Mapping,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: PersonId,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_yaml::Mapping,
}

/// A dated marker on the time axis. Independent of the dependency graph.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: MilestoneId,
    #[serde(
        default,
        deserialize_with = "lenient::date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub category_id: Option<CategoryId>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub emoji: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(flatten)]
    pub extra: serde_yaml::Mapping,
}

impl Milestone {
    pub fn emoji_or_default(&self) -> &str {
        if self.emoji.trim().is_empty() {
            DEFAULT_MILESTONE_EMOJI
        } else {
            &self.emoji
        }
    }
}

/// Form input for creating or editing a task.
#[derive(Clone, Debug, Default)]
pub struct TaskDraft {
    pub name: String,
    /// Empty start defaults to today.
    pub start: Option<NaiveDate>,
    pub duration: i64,
    pub dependencies: Vec<TaskId>,
    pub category_id: Option<CategoryId>,
    pub status: TaskStatus,
    pub status_explanation: String,
    pub assigned_people: Vec<PersonId>,
    pub description: String,
}

impl TaskDraft {
    pub fn new(name: impl Into<String>, duration: i64) -> Self {
        Self {
            name: name.into(),
            duration,
            ..Default::default()
        }
    }

    pub fn starting(mut self, start: NaiveDate) -> Self {
        self.start = Some(start);
        self
    }

    pub fn after(mut self, dependencies: impl IntoIterator<Item = TaskId>) -> Self {
        self.dependencies = dependencies.into_iter().collect();
        self
    }

    pub fn in_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }
}

/// Form input for creating or editing a milestone.
#[derive(Clone, Debug, Default)]
pub struct MilestoneDraft {
    pub name: String,
    /// `YYYY-MM-DD`, validated on commit.
    pub date: String,
    pub category_id: Option<CategoryId>,
    pub emoji: String,
    pub description: String,
}

impl MilestoneDraft {
    pub fn new(name: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            date: date.into(),
            ..Default::default()
        }
    }
}
