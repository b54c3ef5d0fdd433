//! Editor session state and its mutation operations.
//!
//! Every mutating method either commits completely or returns an
//! [`EditError`] and leaves the project untouched. Task edits are validated
//! against a hypothetical copy of the task table before being committed.

use chrono::NaiveDate;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::dependency::has_circular_dependency;
use crate::ids::{TaskId, TaskTable};
use crate::models::{
    parse_date, Category, CategoryId, Milestone, MilestoneDraft, MilestoneId, Person, PersonId,
    Task, TaskDraft, DEFAULT_MILESTONE_EMOJI, DEFAULT_PROJECT_NAME, DEFAULT_TASK_NAME,
    MAX_DURATION_DAYS,
};
use crate::{log_changes, log_checks};

/// Errors that reject an edit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Circular dependency detected: \"{task}\" cannot depend on \"{dependency}\"")]
    CircularDependency { task: String, dependency: String },
    #[error("Cannot delete \"{task}\" because the following tasks depend on it: {}", .dependents.join(", "))]
    HasDependents {
        task: String,
        dependents: Vec<String>,
    },
    #[error("Task not found: {0}")]
    UnknownTask(TaskId),
    #[error("Dependency not found: {0}")]
    UnknownDependency(TaskId),
    #[error("Invalid duration {0}: must be between 1 and {} days", MAX_DURATION_DAYS)]
    InvalidDuration(i64),
    #[error("A {0} name cannot be empty")]
    EmptyName(&'static str),
    #[error("Category not found: {0}")]
    UnknownCategory(CategoryId),
    #[error("Person not found: {0}")]
    UnknownPerson(PersonId),
    #[error("Milestone not found: {0}")]
    UnknownMilestone(MilestoneId),
    #[error("Invalid date: {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

/// The project document owned by one editor session.
#[derive(Clone, Debug)]
pub struct Project {
    name: String,
    categories: Vec<Category>,
    tasks: TaskTable,
    people: Vec<Person>,
    milestones: Vec<Milestone>,
    /// Root-level fields this crate does not know about.
    extra: serde_yaml::Mapping,
    verbosity: u8,
}

impl Default for Project {
    fn default() -> Self {
        Self::new(DEFAULT_PROJECT_NAME)
    }
}

/// Bump a caller-supplied timestamp until it is unused.
fn unique_id(candidate: i64, taken: impl Fn(i64) -> bool) -> i64 {
    let mut id = candidate.max(1);
    while taken(id) {
        id += 1;
    }
    id
}

fn check_duration(days: i64) -> Result<(), EditError> {
    if (1..=i64::from(MAX_DURATION_DAYS)).contains(&days) {
        Ok(())
    } else {
        Err(EditError::InvalidDuration(days))
    }
}

fn project_name_or_default(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        DEFAULT_PROJECT_NAME.to_string()
    } else {
        name.to_string()
    }
}

impl Project {
    pub fn new(name: &str) -> Self {
        Self {
            name: project_name_or_default(name),
            categories: Vec::new(),
            tasks: TaskTable::default(),
            people: Vec::new(),
            milestones: Vec::new(),
            extra: serde_yaml::Mapping::new(),
            verbosity: 0,
        }
    }

    /// Assemble a project from already-normalized parts.
    pub(crate) fn from_parts(
        name: &str,
        categories: Vec<Category>,
        tasks: TaskTable,
        people: Vec<Person>,
        milestones: Vec<Milestone>,
        extra: serde_yaml::Mapping,
        verbosity: u8,
    ) -> Self {
        Self {
            name: project_name_or_default(name),
            categories,
            tasks,
            people,
            milestones,
            extra,
            verbosity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn tasks(&self) -> &TaskTable {
        &self.tasks
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    pub fn extra(&self) -> &serde_yaml::Mapping {
        &self.extra
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: u8) {
        self.verbosity = verbosity;
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn person(&self, id: PersonId) -> Option<&Person> {
        self.people.iter().find(|p| p.id == id)
    }

    pub fn milestone(&self, id: MilestoneId) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == id)
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Rename the project; blank names fall back to the default.
    pub fn rename(&mut self, name: &str) {
        self.name = project_name_or_default(name);
        log_changes!(self.verbosity, "Renamed project to \"{}\"", self.name);
    }

    // ----------------------------------------------------------------- tasks

    fn task_from_draft(
        &self,
        id: TaskId,
        draft: TaskDraft,
        today: NaiveDate,
    ) -> Result<Task, EditError> {
        check_duration(draft.duration)?;
        let mut seen = FxHashSet::default();
        let mut dependencies = Vec::with_capacity(draft.dependencies.len());
        for dep in draft.dependencies {
            // A self-reference is left in place for the cycle check to reject.
            if dep != id && !self.tasks.contains(dep) {
                return Err(EditError::UnknownDependency(dep));
            }
            if seen.insert(dep) {
                dependencies.push(dep);
            }
        }
        let name = draft.name.trim();

        let mut task = Task::new(
            id,
            if name.is_empty() { DEFAULT_TASK_NAME } else { name },
            u32::try_from(draft.duration).unwrap_or(u32::MAX),
        );
        task.start = Some(draft.start.unwrap_or(today));
        task.dependencies = dependencies;
        task.category_id = draft.category_id;
        task.status = draft.status;
        task.status_explanation = draft.status_explanation.trim().to_string();
        task.assigned_people = draft.assigned_people;
        task.description = draft.description.trim().to_string();
        Ok(task)
    }

    /// Commit `candidate` unless `id` now reaches a dependency cycle.
    ///
    /// The error names the first of `id`'s own dependencies that leads into
    /// the cycle, which may be an older cycle the edit merely reaches.
    fn commit_tasks(&mut self, candidate: TaskTable, id: TaskId) -> Result<(), EditError> {
        if has_circular_dependency(&candidate, id) {
            let task = candidate.name_of(id);
            let dependency = candidate
                .get(id)
                .and_then(|t| {
                    t.dependencies
                        .iter()
                        .copied()
                        .find(|&dep| dep == id || has_circular_dependency(&candidate, dep))
                })
                .map(|dep| candidate.name_of(dep))
                .unwrap_or_else(|| task.clone());
            log_checks!(
                self.verbosity,
                "  Rejected edit of \"{}\": cycle through \"{}\"",
                task,
                dependency
            );
            return Err(EditError::CircularDependency { task, dependency });
        }
        self.tasks = candidate;
        Ok(())
    }

    /// Add a task at the end of the task list.
    pub fn add_task(&mut self, draft: TaskDraft, today: NaiveDate) -> Result<TaskId, EditError> {
        let mut candidate = self.tasks.clone();
        let id = candidate.allocate_id();
        let task = self.task_from_draft(id, draft, today)?;
        let name = task.name.clone();
        candidate.push(task);

        self.commit_tasks(candidate, id)?;
        log_changes!(self.verbosity, "Added task \"{}\" ({})", name, id);
        Ok(id)
    }

    /// Replace a task's fields, keeping its id and position.
    ///
    /// Extra document fields of the existing task are preserved.
    pub fn update_task(
        &mut self,
        id: TaskId,
        draft: TaskDraft,
        today: NaiveDate,
    ) -> Result<(), EditError> {
        let existing = self.tasks.get(id).ok_or(EditError::UnknownTask(id))?;
        let extra = existing.extra.clone();
        let mut task = self.task_from_draft(id, draft, today)?;
        task.extra = extra;
        let name = task.name.clone();

        let mut candidate = self.tasks.clone();
        candidate.push(task);

        self.commit_tasks(candidate, id)?;
        log_changes!(self.verbosity, "Updated task \"{}\" ({})", name, id);
        Ok(())
    }

    /// Set a task's start and duration directly (drag-resize).
    ///
    /// Dependencies are unchanged, so no cycle check is needed.
    pub fn set_task_schedule(
        &mut self,
        id: TaskId,
        start: NaiveDate,
        duration: u32,
    ) -> Result<(), EditError> {
        check_duration(i64::from(duration))?;
        let task = self.tasks.get_mut(id).ok_or(EditError::UnknownTask(id))?;
        task.start = Some(start);
        task.duration = duration;
        Ok(())
    }

    /// Change only a task's duration. Its declared start, absent or not, is kept.
    pub fn set_task_duration(&mut self, id: TaskId, duration: u32) -> Result<(), EditError> {
        check_duration(i64::from(duration))?;
        let task = self.tasks.get_mut(id).ok_or(EditError::UnknownTask(id))?;
        task.duration = duration;
        Ok(())
    }

    /// Tasks that list `id` as a dependency.
    pub fn dependents_of(&self, id: TaskId) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.id != id && t.depends_on(id))
            .collect()
    }

    /// Names of the tasks `id` depends on.
    pub fn dependency_names(&self, id: TaskId) -> Vec<String> {
        self.tasks
            .get(id)
            .map(|t| {
                t.dependencies
                    .iter()
                    .filter_map(|&d| self.tasks.get(d))
                    .map(|d| d.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Names of the people assigned to `id` that still exist.
    pub fn assignee_names(&self, id: TaskId) -> Vec<String> {
        self.tasks
            .get(id)
            .map(|t| {
                t.assigned_people
                    .iter()
                    .filter_map(|&p| self.person(p))
                    .map(|p| p.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Delete a task. Rejected while other tasks depend on it.
    ///
    /// References are by id, so no other task needs renumbering.
    pub fn delete_task(&mut self, id: TaskId) -> Result<Task, EditError> {
        let task = self.tasks.get(id).ok_or(EditError::UnknownTask(id))?;
        let dependents: Vec<String> = self
            .dependents_of(id)
            .iter()
            .map(|t| t.name.clone())
            .collect();
        if !dependents.is_empty() {
            log_checks!(
                self.verbosity,
                "  Rejected deletion of \"{}\": {} dependents",
                task.name,
                dependents.len()
            );
            return Err(EditError::HasDependents {
                task: task.name.clone(),
                dependents,
            });
        }

        let removed = self.tasks.remove(id).ok_or(EditError::UnknownTask(id))?;
        log_changes!(self.verbosity, "Deleted task \"{}\" ({})", removed.name, id);
        Ok(removed)
    }

    // ------------------------------------------------------------ categories

    /// Add a category at the end of the rendering order.
    ///
    /// `id_hint` is usually a millisecond timestamp; it is bumped if taken.
    pub fn add_category(
        &mut self,
        name: &str,
        color: &str,
        id_hint: i64,
    ) -> Result<CategoryId, EditError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EditError::EmptyName("category"));
        }
        let id = unique_id(id_hint, |id| self.category(id).is_some());
        self.categories.push(Category {
            id,
            name: name.to_string(),
            color: color.to_string(),
            extra: serde_yaml::Mapping::new(),
        });
        log_changes!(self.verbosity, "Added category \"{}\" ({})", name, id);
        Ok(id)
    }

    pub fn update_category(
        &mut self,
        id: CategoryId,
        name: &str,
        color: &str,
    ) -> Result<(), EditError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EditError::EmptyName("category"));
        }
        let category = self
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(EditError::UnknownCategory(id))?;
        category.name = name.to_string();
        category.color = color.to_string();
        Ok(())
    }

    /// Delete a category. Its tasks and milestones become uncategorized.
    pub fn delete_category(&mut self, id: CategoryId) -> Result<Category, EditError> {
        let position = self
            .categories
            .iter()
            .position(|c| c.id == id)
            .ok_or(EditError::UnknownCategory(id))?;
        let removed = self.categories.remove(position);

        let mut cleared = 0usize;
        let task_ids: Vec<TaskId> = self.tasks.iter().map(|t| t.id).collect();
        for task_id in task_ids {
            if let Some(task) = self.tasks.get_mut(task_id) {
                if task.category_id == Some(id) {
                    task.category_id = None;
                    cleared += 1;
                }
            }
        }
        for milestone in &mut self.milestones {
            if milestone.category_id == Some(id) {
                milestone.category_id = None;
            }
        }
        log_changes!(
            self.verbosity,
            "Deleted category \"{}\" ({} tasks now uncategorized)",
            removed.name,
            cleared
        );
        Ok(removed)
    }

    /// Move a category to `new_position` in the rendering order.
    pub fn move_category(&mut self, id: CategoryId, new_position: usize) -> Result<(), EditError> {
        let position = self
            .categories
            .iter()
            .position(|c| c.id == id)
            .ok_or(EditError::UnknownCategory(id))?;
        let category = self.categories.remove(position);
        let new_position = new_position.min(self.categories.len());
        self.categories.insert(new_position, category);
        Ok(())
    }

    // ---------------------------------------------------------------- people

    pub fn add_person(&mut self, name: &str, id_hint: i64) -> Result<PersonId, EditError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EditError::EmptyName("person"));
        }
        let id = unique_id(id_hint, |id| self.person(id).is_some());
        self.people.push(Person {
            id,
            name: name.to_string(),
            extra: serde_yaml::Mapping::new(),
        });
        log_changes!(self.verbosity, "Added person \"{}\" ({})", name, id);
        Ok(id)
    }

    pub fn rename_person(&mut self, id: PersonId, name: &str) -> Result<(), EditError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EditError::EmptyName("person"));
        }
        let person = self
            .people
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(EditError::UnknownPerson(id))?;
        person.name = name.to_string();
        Ok(())
    }

    /// Tasks a person is assigned to.
    pub fn tasks_assigned_to(&self, id: PersonId) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.assigned_people.contains(&id))
            .collect()
    }

    /// Delete a person and remove them from every task's assignments.
    pub fn delete_person(&mut self, id: PersonId) -> Result<Person, EditError> {
        let position = self
            .people
            .iter()
            .position(|p| p.id == id)
            .ok_or(EditError::UnknownPerson(id))?;
        let removed = self.people.remove(position);

        let task_ids: Vec<TaskId> = self.tasks.iter().map(|t| t.id).collect();
        for task_id in task_ids {
            if let Some(task) = self.tasks.get_mut(task_id) {
                task.assigned_people.retain(|&p| p != id);
            }
        }
        log_changes!(self.verbosity, "Deleted person \"{}\"", removed.name);
        Ok(removed)
    }

    // ------------------------------------------------------------ milestones

    fn milestone_from_draft(
        id: MilestoneId,
        draft: MilestoneDraft,
        extra: serde_yaml::Mapping,
    ) -> Result<Milestone, EditError> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(EditError::EmptyName("milestone"));
        }
        let date = parse_date(&draft.date).ok_or_else(|| EditError::InvalidDate(draft.date.clone()))?;
        let emoji = draft.emoji.trim();
        Ok(Milestone {
            id,
            date: Some(date),
            name: name.to_string(),
            category_id: draft.category_id,
            emoji: if emoji.is_empty() {
                DEFAULT_MILESTONE_EMOJI.to_string()
            } else {
                emoji.to_string()
            },
            description: draft.description.trim().to_string(),
            extra,
        })
    }

    pub fn add_milestone(
        &mut self,
        draft: MilestoneDraft,
        id_hint: i64,
    ) -> Result<MilestoneId, EditError> {
        let id = unique_id(id_hint, |id| self.milestone(id).is_some());
        let milestone = Self::milestone_from_draft(id, draft, serde_yaml::Mapping::new())?;
        log_changes!(self.verbosity, "Added milestone \"{}\" ({})", milestone.name, id);
        self.milestones.push(milestone);
        Ok(id)
    }

    pub fn update_milestone(
        &mut self,
        id: MilestoneId,
        draft: MilestoneDraft,
    ) -> Result<(), EditError> {
        let position = self
            .milestones
            .iter()
            .position(|m| m.id == id)
            .ok_or(EditError::UnknownMilestone(id))?;
        let extra = self.milestones[position].extra.clone();
        self.milestones[position] = Self::milestone_from_draft(id, draft, extra)?;
        Ok(())
    }

    pub fn delete_milestone(&mut self, id: MilestoneId) -> Result<Milestone, EditError> {
        let position = self
            .milestones
            .iter()
            .position(|m| m.id == id)
            .ok_or(EditError::UnknownMilestone(id))?;
        let removed = self.milestones.remove(position);
        log_changes!(self.verbosity, "Deleted milestone \"{}\"", removed.name);
        Ok(removed)
    }
}
