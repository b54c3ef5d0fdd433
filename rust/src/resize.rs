//! Interactive drag-resize of task bars.
//!
//! A session records the task's resolved start and duration when the drag
//! begins. Each pointer move is applied relative to that snapshot; moves that
//! would break a constraint are ignored for that frame and the task keeps its
//! last valid schedule.

use chrono::{Days, NaiveDate};

use crate::config::ChartConfig;
use crate::dependency::StartResolver;
use crate::ids::TaskId;
use crate::models::MAX_DURATION_DAYS;
use crate::project::Project;
use crate::{log_checks, log_debug};

/// Which edge of the bar is being dragged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeEdge {
    /// Moves the start; the finish stays put.
    Left,
    /// Changes the duration; the start stays put.
    Right,
}

/// Why a resize frame was ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeRejection {
    DurationTooShort,
    BeforeDependency { floor: NaiveDate },
    UnknownTask,
    OutOfRange,
    /// The task's dependencies could not be resolved.
    Unresolvable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeOutcome {
    Applied { start: NaiveDate, duration: u32 },
    Ignored(ResizeRejection),
}

/// Whole days for a horizontal pointer movement, rounded to nearest.
pub fn delta_days(delta_px: f64, pixels_per_day: f64) -> i64 {
    if pixels_per_day <= 0.0 || !delta_px.is_finite() {
        return 0;
    }
    // Halves round up, so -1.5 days snaps to -1.
    (delta_px / pixels_per_day + 0.5).floor() as i64
}

fn shift_date(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    let magnitude = Days::new(days.unsigned_abs());
    if days >= 0 {
        date.checked_add_days(magnitude)
    } else {
        date.checked_sub_days(magnitude)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResizeSession {
    task_id: TaskId,
    edge: ResizeEdge,
    initial_start: NaiveDate,
    initial_duration: u32,
}

impl ResizeSession {
    /// Start dragging an edge of a task bar.
    ///
    /// Returns `None` if the task does not exist or its start cannot be
    /// resolved.
    pub fn begin(
        project: &Project,
        task_id: TaskId,
        edge: ResizeEdge,
        today: NaiveDate,
    ) -> Option<Self> {
        let task = project.task(task_id)?;
        let mut resolver =
            StartResolver::new(project.tasks(), today).with_verbosity(project.verbosity());
        let initial_start = resolver.resolve(task_id).ok()?;
        Some(Self {
            task_id,
            edge,
            initial_start,
            initial_duration: task.duration,
        })
    }

    /// Apply the pointer's total horizontal movement since the drag began.
    ///
    /// A right-edge drag only writes the duration; the declared start is
    /// left alone so the task can still follow its dependencies.
    pub fn update(
        &self,
        project: &mut Project,
        delta_px: f64,
        config: &ChartConfig,
        today: NaiveDate,
    ) -> ResizeOutcome {
        let outcome = self.evaluate(project, delta_px, config, today);
        if let ResizeOutcome::Applied { start, duration } = outcome {
            let written = match self.edge {
                ResizeEdge::Left => project.set_task_schedule(self.task_id, start, duration),
                ResizeEdge::Right => project.set_task_duration(self.task_id, duration),
            };
            if written.is_err() {
                return ResizeOutcome::Ignored(ResizeRejection::UnknownTask);
            }
            log_debug!(
                config.verbosity,
                "Resized {} to start {} for {} days",
                self.task_id,
                start,
                duration
            );
        }
        outcome
    }

    fn evaluate(
        &self,
        project: &Project,
        delta_px: f64,
        config: &ChartConfig,
        today: NaiveDate,
    ) -> ResizeOutcome {
        use ResizeOutcome::{Applied, Ignored};

        if !project.tasks().contains(self.task_id) {
            return Ignored(ResizeRejection::UnknownTask);
        }
        let delta = delta_days(delta_px, config.pixels_per_day);
        let duration = match self.edge {
            ResizeEdge::Left => i64::from(self.initial_duration) - delta,
            ResizeEdge::Right => i64::from(self.initial_duration) + delta,
        };
        if duration < 1 {
            return Ignored(ResizeRejection::DurationTooShort);
        }
        let Some(duration) = u32::try_from(duration)
            .ok()
            .filter(|&d| d <= MAX_DURATION_DAYS)
        else {
            return Ignored(ResizeRejection::OutOfRange);
        };

        let start = match self.edge {
            ResizeEdge::Right => self.initial_start,
            ResizeEdge::Left => {
                let Some(start) = shift_date(self.initial_start, delta) else {
                    return Ignored(ResizeRejection::OutOfRange);
                };
                let mut resolver = StartResolver::new(project.tasks(), today)
                    .with_verbosity(config.verbosity);
                match resolver.dependency_floor(self.task_id) {
                    Ok(Some(floor)) if start < floor => {
                        log_checks!(
                            config.verbosity,
                            "  Ignored resize of {}: {} is before dependency finish {}",
                            self.task_id,
                            start,
                            floor
                        );
                        return Ignored(ResizeRejection::BeforeDependency { floor });
                    }
                    Ok(_) => start,
                    Err(_) => return Ignored(ResizeRejection::Unresolvable),
                }
            }
        };
        Applied { start, duration }
    }
}
