//! Dependency resolution: effective start dates and cycle detection.
//!
//! Two independent cycle guards live here. [`find_cycle_from`] walks a
//! candidate task list before an edit is committed; [`StartResolver`] keeps a
//! path-sensitive in-progress marker while resolving, so a document that
//! already contains a cycle fails the render pass instead of recursing forever.

use chrono::NaiveDate;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::ids::{TaskId, TaskTable};
use crate::{log_checks, log_debug};

/// Resolved start date per task for one render pass.
pub type ResolvedStarts = FxHashMap<TaskId, NaiveDate>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Circular dependency detected at task \"{task}\": {}", .path.join(" -> "))]
    CircularDependency { task: String, path: Vec<String> },
}

/// Memoized, path-sensitive start-date resolver for a single pass.
///
/// A task's resolved start is the later of its declared start (today when
/// absent) and the latest finish of everything it depends on. Dependencies
/// only ever push a start later.
pub struct StartResolver<'a> {
    tasks: &'a TaskTable,
    today: NaiveDate,
    resolved: ResolvedStarts,
    in_progress: FxHashSet<TaskId>,
    path: Vec<TaskId>,
    verbosity: u8,
}

impl<'a> StartResolver<'a> {
    pub fn new(tasks: &'a TaskTable, today: NaiveDate) -> Self {
        Self {
            tasks,
            today,
            resolved: FxHashMap::with_capacity_and_hasher(tasks.len(), Default::default()),
            in_progress: FxHashSet::default(),
            path: Vec::new(),
            verbosity: 0,
        }
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Resolve one task's effective start.
    pub fn resolve(&mut self, id: TaskId) -> Result<NaiveDate, ResolveError> {
        if let Some(&start) = self.resolved.get(&id) {
            return Ok(start);
        }
        if !self.in_progress.insert(id) {
            return Err(self.cycle_error(id));
        }
        self.path.push(id);

        let result = self.compute(id);

        // Cleared on both success and failure so the check stays path-sensitive.
        self.path.pop();
        self.in_progress.remove(&id);

        let start = result?;
        self.resolved.insert(id, start);
        Ok(start)
    }

    /// Resolved start plus duration.
    pub fn finish(&mut self, id: TaskId) -> Result<NaiveDate, ResolveError> {
        let start = self.resolve(id)?;
        Ok(match self.tasks.get(id) {
            Some(task) => task.finish_from(start),
            None => start,
        })
    }

    /// Latest finish across a task's dependencies, if it has any.
    pub fn dependency_floor(&mut self, id: TaskId) -> Result<Option<NaiveDate>, ResolveError> {
        let tasks = self.tasks;
        let Some(task) = tasks.get(id) else {
            return Ok(None);
        };
        let mut latest: Option<NaiveDate> = None;
        for &dep in &task.dependencies {
            if !tasks.contains(dep) {
                log_checks!(
                    self.verbosity,
                    "  Task \"{}\" references missing task {}, ignoring",
                    task.name,
                    dep
                );
                continue;
            }
            let finish = self.finish(dep)?;
            latest = Some(latest.map_or(finish, |l| l.max(finish)));
        }
        Ok(latest)
    }

    fn compute(&mut self, id: TaskId) -> Result<NaiveDate, ResolveError> {
        let tasks = self.tasks;
        let Some(task) = tasks.get(id) else {
            return Ok(self.today);
        };
        let declared = task.declared_start(self.today);

        let start = match self.dependency_floor(id)? {
            Some(floor) if floor > declared => floor,
            _ => declared,
        };

        log_debug!(
            self.verbosity,
            "  Resolved \"{}\": declared {}, start {}",
            task.name,
            declared,
            start
        );
        Ok(start)
    }

    fn cycle_error(&self, id: TaskId) -> ResolveError {
        let from = self.path.iter().position(|&p| p == id).unwrap_or(0);
        let mut path: Vec<String> = self.path[from..]
            .iter()
            .map(|&p| self.tasks.name_of(p))
            .collect();
        path.push(self.tasks.name_of(id));
        ResolveError::CircularDependency {
            task: self.tasks.name_of(id),
            path,
        }
    }

    pub fn into_resolved(self) -> ResolvedStarts {
        self.resolved
    }
}

/// Resolve every task's start for one render pass.
pub fn resolve_starts(
    tasks: &TaskTable,
    today: NaiveDate,
    verbosity: u8,
) -> Result<ResolvedStarts, ResolveError> {
    let mut resolver = StartResolver::new(tasks, today).with_verbosity(verbosity);
    for task in tasks {
        resolver.resolve(task.id)?;
    }
    Ok(resolver.into_resolved())
}

/// Find a dependency cycle reachable from `start`.
///
/// Returns the cycle as a path whose last element repeats an earlier one,
/// e.g. `[a, b, a]`, or `[a, a]` for a self-dependency.
pub fn find_cycle_from(tasks: &TaskTable, start: TaskId) -> Option<Vec<TaskId>> {
    let mut done: FxHashSet<TaskId> = FxHashSet::default();
    let mut on_path: FxHashSet<TaskId> = FxHashSet::default();
    // (task, index of the next dependency to visit)
    let mut stack: Vec<(TaskId, usize)> = vec![(start, 0)];
    on_path.insert(start);

    while let Some(&(current, next)) = stack.last() {
        let deps: &[TaskId] = tasks
            .get(current)
            .map(|t| t.dependencies.as_slice())
            .unwrap_or(&[]);

        let Some(&dep) = deps.get(next) else {
            stack.pop();
            on_path.remove(&current);
            done.insert(current);
            continue;
        };
        if let Some(top) = stack.last_mut() {
            top.1 += 1;
        }

        if on_path.contains(&dep) {
            let from = stack.iter().position(|&(id, _)| id == dep).unwrap_or(0);
            let mut cycle: Vec<TaskId> = stack[from..].iter().map(|&(id, _)| id).collect();
            cycle.push(dep);
            return Some(cycle);
        }
        if done.contains(&dep) || !tasks.contains(dep) {
            continue;
        }
        on_path.insert(dep);
        stack.push((dep, 0));
    }

    None
}

/// True if `start` (transitively) depends on itself or reaches any cycle.
pub fn has_circular_dependency(tasks: &TaskTable, start: TaskId) -> bool {
    find_cycle_from(tasks, start).is_some()
}
