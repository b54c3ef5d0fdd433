//! Stable task identifiers and the position lookup table.
//!
//! Tasks keep their display order in a `Vec`, while references between tasks
//! use `TaskId`s that survive deletion and reordering. Positions only matter
//! when a project is written back to a document.

use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt;

use crate::models::Task;

/// Stable task identifier (u32 for compact storage and fast hashing).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(u32);

impl TaskId {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered task list with an id -> position index.
#[derive(Debug, Clone, Default)]
pub struct TaskTable {
    tasks: Vec<Task>,
    positions: FxHashMap<TaskId, usize>,
    next_id: u32,
}

impl TaskTable {
    /// Create an empty table with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tasks: Vec::with_capacity(capacity),
            positions: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            next_id: 0,
        }
    }

    /// Hand out a fresh id. Ids are never reused within a table's lifetime.
    pub fn allocate_id(&mut self) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Append a task at the end of the display order.
    ///
    /// A task whose id is already present replaces the existing entry in place.
    pub fn push(&mut self, task: Task) {
        if let Some(&position) = self.positions.get(&task.id) {
            self.tasks[position] = task;
            return;
        }
        self.next_id = self.next_id.max(task.id.0.saturating_add(1));
        self.positions.insert(task.id, self.tasks.len());
        self.tasks.push(task);
    }

    /// Remove a task, shifting later tasks up one position.
    pub fn remove(&mut self, id: TaskId) -> Option<Task> {
        let position = self.positions.remove(&id)?;
        let task = self.tasks.remove(position);
        for later in &self.tasks[position..] {
            if let Some(p) = self.positions.get_mut(&later.id) {
                *p -= 1;
            }
        }
        Some(task)
    }

    #[inline]
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.positions.get(&id).map(|&p| &self.tasks[p])
    }

    #[inline]
    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        let position = *self.positions.get(&id)?;
        self.tasks.get_mut(position)
    }

    #[inline]
    pub fn contains(&self, id: TaskId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Current display position of a task.
    #[inline]
    pub fn position(&self, id: TaskId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Id of the task at a display position.
    #[inline]
    pub fn id_at(&self, position: usize) -> Option<TaskId> {
        self.tasks.get(position).map(|t| t.id)
    }

    /// Display name of a task, for messages.
    pub fn name_of(&self, id: TaskId) -> String {
        self.get(id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<'a> IntoIterator for &'a TaskTable {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}
