//! Rust core of the Gantt chart editor.
//!
//! Provides dependency resolution, chart layout, time-axis ticks and the
//! editable project state. Rendering and persistence belong to the host.

// Allow clippy warning triggered by PyO3 macro expansion
#![cfg_attr(feature = "python", allow(clippy::useless_conversion))]

pub mod logging;

pub mod config;
pub mod dependency;
pub mod document;
pub mod ids;
pub mod layout;
mod lenient;
pub mod models;
pub mod project;
pub mod resize;
pub mod timescale;

#[cfg(feature = "python")]
mod python;

pub use config::{CategoryBucket, CategoryFilter, ChartConfig, ConfigError, TimeScaleUnit};
pub use dependency::{
    find_cycle_from, has_circular_dependency, resolve_starts, ResolveError, ResolvedStarts,
    StartResolver,
};
pub use document::{load_project, save_project, DocumentError};
pub use ids::{TaskId, TaskTable};
pub use layout::{
    layout, render_chart, ChartLayout, HeadingRow, MilestoneMarker, PositionedRow, TaskBar,
};
pub use models::{
    Category, CategoryId, Milestone, MilestoneDraft, MilestoneId, Person, PersonId, Task,
    TaskDraft, TaskStatus,
};
pub use project::{EditError, Project};
pub use resize::{ResizeEdge, ResizeOutcome, ResizeRejection, ResizeSession};
pub use timescale::{ticks, DateRange, Tick};
