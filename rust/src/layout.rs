//! Chart layout: positions category headings, task bars and milestones.
//!
//! Rows are grouped by category in the project's declared category order,
//! with the implicit uncategorized bucket last. Within a category, tasks are
//! ordered by resolved start (stable for equal starts). Each row's top offset
//! accumulates row height plus spacing; empty categories emit nothing.

use chrono::NaiveDate;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::config::{CategoryBucket, CategoryFilter, ChartConfig};
use crate::dependency::{resolve_starts, ResolveError, ResolvedStarts};
use crate::ids::TaskId;
use crate::models::{
    MilestoneId, Task, TaskStatus, DEFAULT_MILESTONE_COLOR, UNCATEGORIZED_COLOR,
    UNCATEGORIZED_NAME,
};
use crate::project::Project;
use crate::timescale::{ticks, DateRange, Tick};
use crate::{log_changes, log_debug};

/// A category heading row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeadingRow {
    pub bucket: CategoryBucket,
    pub name: String,
    pub color: String,
    pub top: f64,
    pub height: f64,
}

/// A positioned task bar.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TaskBar {
    pub task_id: TaskId,
    /// Position of the task in the project's task list.
    pub position: usize,
    pub name: String,
    pub start: NaiveDate,
    pub finish: NaiveDate,
    pub duration: u32,
    pub left: f64,
    pub width: f64,
    pub top: f64,
    pub height: f64,
    pub color: String,
    /// Declared status, or high risk once overdue.
    pub status: TaskStatus,
    /// First assigned person that still exists; `None` marks the bar unassigned.
    pub assignee: Option<String>,
    /// Start was pushed past the declared date by a dependency.
    pub shifted: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PositionedRow {
    Heading(HeadingRow),
    Task(TaskBar),
}

impl PositionedRow {
    pub fn top(&self) -> f64 {
        match self {
            Self::Heading(h) => h.top,
            Self::Task(t) => t.top,
        }
    }

    pub fn as_task(&self) -> Option<&TaskBar> {
        match self {
            Self::Task(t) => Some(t),
            Self::Heading(_) => None,
        }
    }
}

/// A milestone marker on the time axis.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MilestoneMarker {
    pub id: MilestoneId,
    pub name: String,
    pub date: NaiveDate,
    pub left: f64,
    pub emoji: String,
    pub color: String,
}

/// Result of one layout pass.
///
/// An empty layout (no `time_range`) means there is nothing to display.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ChartLayout {
    pub rows: Vec<PositionedRow>,
    pub time_range: Option<DateRange>,
    pub ticks: Vec<Tick>,
    pub milestones: Vec<MilestoneMarker>,
    /// Offset of today's marker when today is inside the range.
    pub today_offset: Option<f64>,
    pub width: f64,
    pub height: f64,
}

impl ChartLayout {
    pub fn is_empty(&self) -> bool {
        self.time_range.is_none()
    }

    pub fn task_bars(&self) -> impl Iterator<Item = &TaskBar> {
        self.rows.iter().filter_map(PositionedRow::as_task)
    }

    pub fn task_bar(&self, id: TaskId) -> Option<&TaskBar> {
        self.task_bars().find(|bar| bar.task_id == id)
    }
}

/// A visible task with its resolved dates.
struct Placed<'a> {
    position: usize,
    task: &'a Task,
    start: NaiveDate,
    finish: NaiveDate,
}

/// Bucket a task renders under: its category if that still exists.
pub fn bucket_of(task: &Task, project: &Project) -> CategoryBucket {
    match task.category_id {
        Some(id) if project.category(id).is_some() => CategoryBucket::Category(id),
        _ => CategoryBucket::Uncategorized,
    }
}

/// Lay out a project given resolved start dates.
pub fn layout(
    project: &Project,
    resolved: &ResolvedStarts,
    filter: &CategoryFilter,
    config: &ChartConfig,
    today: NaiveDate,
) -> ChartLayout {
    let verbosity = config.verbosity;
    let ppd = config.pixels_per_day;

    // Visibility filter and grouping
    let mut groups: FxHashMap<CategoryBucket, Vec<Placed>> = FxHashMap::default();
    for (position, task) in project.tasks().iter().enumerate() {
        let bucket = bucket_of(task, project);
        if !filter.includes(bucket) {
            continue;
        }
        let start = resolved
            .get(&task.id)
            .copied()
            .unwrap_or_else(|| task.declared_start(today));
        groups.entry(bucket).or_default().push(Placed {
            position,
            task,
            start,
            finish: task.finish_from(start),
        });
    }

    // Date range over visible tasks, widened by milestones
    let mut visible = groups.values().flatten();
    let Some(first) = visible.next() else {
        log_changes!(verbosity, "No tasks to display");
        return ChartLayout::default();
    };
    let mut range = DateRange::new(first.start, first.finish);
    for placed in visible {
        range.widen(placed.start);
        range.widen(placed.finish);
    }
    for milestone in project.milestones() {
        if let Some(date) = milestone.date {
            range.widen(date);
        }
    }

    for tasks in groups.values_mut() {
        tasks.sort_by_key(|p| p.start);
    }

    // Declared categories first, uncategorized last
    let mut order: Vec<(CategoryBucket, &str, &str)> = project
        .categories()
        .iter()
        .map(|c| {
            (
                CategoryBucket::Category(c.id),
                c.name.as_str(),
                c.color.as_str(),
            )
        })
        .collect();
    order.push((
        CategoryBucket::Uncategorized,
        UNCATEGORIZED_NAME,
        UNCATEGORIZED_COLOR,
    ));

    let mut rows = Vec::new();
    let mut emitted: FxHashSet<CategoryBucket> = FxHashSet::default();
    let mut top = config.top_offset;
    for (bucket, name, color) in order {
        let Some(tasks) = groups.get(&bucket) else {
            continue;
        };
        if tasks.is_empty() || !emitted.insert(bucket) {
            continue;
        }

        log_debug!(verbosity, "  Heading \"{}\" at {}", name, top);
        rows.push(PositionedRow::Heading(HeadingRow {
            bucket,
            name: name.to_string(),
            color: color.to_string(),
            top,
            height: config.row_height,
        }));
        top += config.row_height + config.heading_spacing;

        for placed in tasks {
            let task = placed.task;
            rows.push(PositionedRow::Task(TaskBar {
                task_id: task.id,
                position: placed.position,
                name: task.name.clone(),
                start: placed.start,
                finish: placed.finish,
                duration: task.duration,
                left: range.offset(placed.start, ppd),
                width: f64::from(task.duration) * ppd,
                top,
                height: config.row_height,
                color: color.to_string(),
                status: task.status.displayed(placed.finish, today),
                assignee: first_assignee(task, project),
                shifted: placed.start > task.declared_start(today),
            }));
            top += config.row_height + config.row_spacing;
        }
    }

    let milestones = project
        .milestones()
        .iter()
        .filter_map(|m| {
            let date = m.date?;
            let color = m
                .category_id
                .and_then(|id| project.category(id))
                .map(|c| c.color.clone())
                .unwrap_or_else(|| DEFAULT_MILESTONE_COLOR.to_string());
            Some(MilestoneMarker {
                id: m.id,
                name: m.name.clone(),
                date,
                left: range.offset(date, ppd),
                emoji: m.emoji_or_default().to_string(),
                color,
            })
        })
        .collect();

    log_changes!(
        verbosity,
        "Laid out {} rows from {} to {}",
        rows.len(),
        range.start,
        range.end
    );

    ChartLayout {
        rows,
        ticks: ticks(&range, config.time_scale, ppd),
        milestones,
        today_offset: range.contains(today).then(|| range.offset(today, ppd)),
        width: (range.days() + 1) as f64 * ppd,
        height: top,
        time_range: Some(range),
    }
}

fn first_assignee(task: &Task, project: &Project) -> Option<String> {
    let first = *task.assigned_people.first()?;
    project.person(first).map(|p| p.name.clone())
}

/// Full render pass: resolve start dates, then lay out.
///
/// The only failure is a dependency cycle already present in the project.
pub fn render_chart(
    project: &Project,
    filter: &CategoryFilter,
    config: &ChartConfig,
    today: NaiveDate,
) -> Result<ChartLayout, ResolveError> {
    let resolved = resolve_starts(project.tasks(), today, config.verbosity)?;
    Ok(layout(project, &resolved, filter, config, today))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MilestoneDraft, TaskDraft};

    fn make_date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn today() -> NaiveDate {
        make_date(2024, 1, 1)
    }

    fn small_config() -> ChartConfig {
        ChartConfig {
            pixels_per_day: 10.0,
            row_height: 20.0,
            row_spacing: 5.0,
            heading_spacing: 10.0,
            top_offset: 60.0,
            ..Default::default()
        }
    }

    /// Two categories ("Design" then "Build") plus uncategorized work.
    fn sample_project() -> (Project, i64, i64) {
        let mut project = Project::new("Sample");
        let design = project.add_category("Design", "#f00", 100).unwrap();
        let build = project.add_category("Build", "#0f0", 200).unwrap();
        let jan = |d| make_date(2024, 1, d);

        let sketch = project
            .add_task(TaskDraft::new("Sketch", 3).starting(jan(1)).in_category(design), today())
            .unwrap();
        project
            .add_task(
                TaskDraft::new("Code", 5)
                    .starting(jan(1))
                    .after([sketch])
                    .in_category(build),
                today(),
            )
            .unwrap();
        project
            .add_task(TaskDraft::new("Mockups", 2).starting(jan(2)).in_category(design), today())
            .unwrap();
        project
            .add_task(TaskDraft::new("Loose end", 1).starting(jan(10)), today())
            .unwrap();
        (project, design, build)
    }

    fn names(layout: &ChartLayout) -> Vec<String> {
        layout
            .rows
            .iter()
            .map(|row| match row {
                PositionedRow::Heading(h) => format!("[{}]", h.name),
                PositionedRow::Task(t) => t.name.clone(),
            })
            .collect()
    }

    #[test]
    fn test_rows_grouped_in_category_order() {
        let (project, _, _) = sample_project();
        let layout = render_chart(&project, &CategoryFilter::All, &small_config(), today()).unwrap();

        assert_eq!(
            names(&layout),
            vec![
                "[Design]",
                "Sketch",
                "Mockups",
                "[Build]",
                "Code",
                "[Uncategorized]",
                "Loose end"
            ]
        );
    }

    #[test]
    fn test_vertical_offsets_accumulate() {
        let (project, _, _) = sample_project();
        let layout = render_chart(&project, &CategoryFilter::All, &small_config(), today()).unwrap();
        let tops: Vec<f64> = layout.rows.iter().map(PositionedRow::top).collect();

        // heading +30, task +25
        assert_eq!(tops, vec![60.0, 90.0, 115.0, 140.0, 170.0, 195.0, 225.0]);
        assert!((layout.height - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_horizontal_placement_uses_resolved_start() {
        let (project, _, _) = sample_project();
        let layout = render_chart(&project, &CategoryFilter::All, &small_config(), today()).unwrap();
        let code = layout.task_bars().find(|b| b.name == "Code").unwrap();

        // Sketch finishes Jan 4, so Code starts there: 3 days in at 10 px/day
        assert_eq!(code.start, make_date(2024, 1, 4));
        assert!((code.left - 30.0).abs() < 1e-9);
        assert!((code.width - 50.0).abs() < 1e-9);
        assert!(code.shifted);

        let range = layout.time_range.unwrap();
        assert_eq!(range.start, make_date(2024, 1, 1));
        assert_eq!(range.end, make_date(2024, 1, 11));
        assert!((layout.width - 110.0).abs() < 1e-9);
    }

    #[test]
    fn test_sort_within_category_is_stable() {
        let mut project = Project::new("Ties");
        for name in ["first", "second", "third"] {
            project
                .add_task(TaskDraft::new(name, 1).starting(today()), today())
                .unwrap();
        }
        let layout = render_chart(&project, &CategoryFilter::All, &small_config(), today()).unwrap();
        assert_eq!(names(&layout), vec!["[Uncategorized]", "first", "second", "third"]);
    }

    #[test]
    fn test_filter_excluding_everything_reports_nothing_to_display() {
        let (mut project, design, _) = sample_project();
        project
            .add_milestone(MilestoneDraft::new("Launch", "2024-02-01"), 1)
            .unwrap();

        let filter = CategoryFilter::only([design + 12345], false);
        let layout = render_chart(&project, &filter, &small_config(), today()).unwrap();

        assert!(layout.is_empty());
        assert!(layout.rows.is_empty());
        assert!(layout.ticks.is_empty());
    }

    #[test]
    fn test_filtered_tasks_do_not_affect_range() {
        let (project, design, _) = sample_project();
        let filter = CategoryFilter::only([design], false);
        let layout = render_chart(&project, &filter, &small_config(), today()).unwrap();

        assert_eq!(names(&layout), vec!["[Design]", "Sketch", "Mockups"]);
        let range = layout.time_range.unwrap();
        assert_eq!(range.end, make_date(2024, 1, 4));
    }

    #[test]
    fn test_milestones_widen_range() {
        let (mut project, design, _) = sample_project();
        let mut draft = MilestoneDraft::new("Kickoff", "2023-12-25");
        draft.category_id = Some(design);
        project.add_milestone(draft, 1).unwrap();
        project
            .add_milestone(MilestoneDraft::new("Launch", "2024-02-01"), 2)
            .unwrap();

        let layout = render_chart(&project, &CategoryFilter::All, &small_config(), today()).unwrap();
        let range = layout.time_range.unwrap();
        assert_eq!(range.start, make_date(2023, 12, 25));
        assert_eq!(range.end, make_date(2024, 2, 1));

        let kickoff = &layout.milestones[0];
        assert!((kickoff.left - 0.0).abs() < 1e-9);
        assert_eq!(kickoff.color, "#f00");
        assert_eq!(kickoff.emoji, "🚩");
        assert_eq!(layout.milestones[1].color, DEFAULT_MILESTONE_COLOR);

        // Sketch now starts 7 days into the range
        let sketch = layout.task_bars().find(|b| b.name == "Sketch").unwrap();
        assert!((sketch.left - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_layout_is_idempotent() {
        let (project, _, _) = sample_project();
        let config = small_config();
        let first = render_chart(&project, &CategoryFilter::All, &config, today()).unwrap();
        let second = render_chart(&project, &CategoryFilter::All, &config, today()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_category_falls_back_to_uncategorized() {
        let mut project = Project::new("Orphans");
        project
            .add_task(TaskDraft::new("Orphan", 1).starting(today()).in_category(999), today())
            .unwrap();
        let layout = render_chart(&project, &CategoryFilter::All, &small_config(), today()).unwrap();
        assert_eq!(names(&layout), vec!["[Uncategorized]", "Orphan"]);
        assert_eq!(layout.task_bars().next().unwrap().color, UNCATEGORIZED_COLOR);
    }

    #[test]
    fn test_display_status_and_assignee() {
        let mut project = Project::new("People");
        let ada = project.add_person("Ada", 10).unwrap();
        let mut draft = TaskDraft::new("Old work", 2).starting(make_date(2023, 12, 1));
        draft.assigned_people = vec![ada];
        project.add_task(draft, today()).unwrap();
        project
            .add_task(TaskDraft::new("Fresh", 2).starting(today()), today())
            .unwrap();

        let layout = render_chart(&project, &CategoryFilter::All, &small_config(), today()).unwrap();
        let old = layout.task_bars().find(|b| b.name == "Old work").unwrap();
        let fresh = layout.task_bars().find(|b| b.name == "Fresh").unwrap();

        assert_eq!(old.status, TaskStatus::HighRisk);
        assert_eq!(old.assignee.as_deref(), Some("Ada"));
        assert_eq!(fresh.status, TaskStatus::OnTrack);
        assert_eq!(fresh.assignee, None);
        assert_eq!(layout.today_offset, Some(31.0 * 10.0));
    }

    #[test]
    fn test_cycle_in_loaded_data_fails_render() {
        let yaml = "tasks:\n  - {name: A, dependencies: [1]}\n  - {name: B, dependencies: [0]}\n";
        let project = crate::document::load_project(yaml, 0).unwrap();
        let result = render_chart(&project, &CategoryFilter::All, &small_config(), today());
        assert!(matches!(result, Err(ResolveError::CircularDependency { .. })));
    }
}
