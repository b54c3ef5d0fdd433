//! YAML project documents.
//!
//! On disk, task dependencies are positions in the task list. In memory they
//! are [`TaskId`]s; the translation happens here and nowhere else.

use chrono::NaiveDate;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use thiserror::Error;

use crate::ids::{TaskId, TaskTable};
use crate::lenient;
use crate::models::{
    Category, CategoryId, Milestone, Person, PersonId, Task, TaskStatus, DEFAULT_PROJECT_NAME,
    DEFAULT_TASK_NAME,
};
use crate::project::Project;
use crate::{log_checks, log_debug};

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to parse project YAML: {0}")]
    Parse(#[source] serde_yaml::Error),
    #[error("Project document must be a mapping, found {0}")]
    NotAMapping(&'static str),
    #[error("Failed to serialize project: {0}")]
    Serialize(#[source] serde_yaml::Error),
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

fn default_project_name() -> String {
    DEFAULT_PROJECT_NAME.to_string()
}

/// A task as stored in a document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    #[serde(default, deserialize_with = "lenient::string")]
    name: String,
    #[serde(
        default,
        deserialize_with = "lenient::date",
        skip_serializing_if = "Option::is_none"
    )]
    start: Option<NaiveDate>,
    #[serde(
        default = "lenient::default_duration",
        deserialize_with = "lenient::duration"
    )]
    duration: u32,
    #[serde(default, deserialize_with = "lenient::indices")]
    dependencies: Vec<usize>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    category_id: Option<CategoryId>,
    #[serde(default, deserialize_with = "lenient::status")]
    status: TaskStatus,
    #[serde(default, deserialize_with = "lenient::string")]
    status_explanation: String,
    #[serde(default, deserialize_with = "lenient::ids")]
    assigned_people: Vec<PersonId>,
    #[serde(default, deserialize_with = "lenient::string")]
    description: String,
    #[serde(flatten)]
    extra: serde_yaml::Mapping,
}

/// The whole document as stored on disk.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectDocument {
    #[serde(default = "default_project_name", deserialize_with = "lenient::string")]
    project_name: String,
    #[serde(default, deserialize_with = "lenient::seq")]
    categories: Vec<Category>,
    #[serde(default, deserialize_with = "lenient::seq")]
    tasks: Vec<TaskRecord>,
    #[serde(default, deserialize_with = "lenient::seq")]
    people: Vec<Person>,
    #[serde(default, deserialize_with = "lenient::seq")]
    milestones: Vec<Milestone>,
    #[serde(flatten)]
    extra: serde_yaml::Mapping,
}

impl Default for ProjectDocument {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            categories: Vec::new(),
            tasks: Vec::new(),
            people: Vec::new(),
            milestones: Vec::new(),
            extra: serde_yaml::Mapping::new(),
        }
    }
}

impl ProjectDocument {
    fn into_project(self, verbosity: u8) -> Project {
        let count = self.tasks.len();
        let mut tasks = TaskTable::with_capacity(count);
        let ids: Vec<TaskId> = (0..count).map(|_| tasks.allocate_id()).collect();

        for (position, record) in self.tasks.into_iter().enumerate() {
            let id = ids[position];
            let name = record.name.trim();
            let mut task = Task::new(
                id,
                if name.is_empty() { DEFAULT_TASK_NAME } else { name },
                record.duration,
            );

            let mut seen = FxHashSet::default();
            for index in record.dependencies {
                match ids.get(index) {
                    Some(&dep) if seen.insert(dep) => task.dependencies.push(dep),
                    Some(_) => {}
                    None => log_checks!(
                        verbosity,
                        "  Task \"{}\": dropping out-of-range dependency index {}",
                        task.name,
                        index
                    ),
                }
            }

            task.start = record.start;
            task.category_id = record.category_id;
            task.status = record.status;
            task.status_explanation = record.status_explanation;
            task.assigned_people = record.assigned_people;
            task.description = record.description;
            task.extra = record.extra;
            tasks.push(task);
        }

        log_debug!(
            verbosity,
            "Loaded {} tasks, {} categories, {} milestones",
            tasks.len(),
            self.categories.len(),
            self.milestones.len()
        );

        Project::from_parts(
            &self.project_name,
            self.categories,
            tasks,
            self.people,
            self.milestones,
            self.extra,
            verbosity,
        )
    }

    fn from_project(project: &Project) -> Self {
        let table = project.tasks();
        let tasks = table
            .iter()
            .map(|task| TaskRecord {
                name: task.name.clone(),
                start: task.start,
                duration: task.duration,
                dependencies: task
                    .dependencies
                    .iter()
                    .filter_map(|&dep| table.position(dep))
                    .collect(),
                category_id: task.category_id,
                status: task.status,
                status_explanation: task.status_explanation.clone(),
                assigned_people: task.assigned_people.clone(),
                description: task.description.clone(),
                extra: task.extra.clone(),
            })
            .collect();

        Self {
            project_name: project.name().to_string(),
            categories: project.categories().to_vec(),
            tasks,
            people: project.people().to_vec(),
            milestones: project.milestones().to_vec(),
            extra: project.extra().clone(),
        }
    }
}

/// Parse a project document.
///
/// Missing or malformed fields take their defaults; an empty document is an
/// empty project. Dependency cycles are not rejected here, they surface when
/// the chart is rendered.
pub fn load_project(yaml: &str, verbosity: u8) -> Result<Project, DocumentError> {
    let value: Value = serde_yaml::from_str(yaml).map_err(DocumentError::Parse)?;
    let document = match value {
        Value::Null => ProjectDocument::default(),
        Value::Mapping(_) => serde_yaml::from_value(value).map_err(DocumentError::Parse)?,
        other => return Err(DocumentError::NotAMapping(kind_of(&other))),
    };
    Ok(document.into_project(verbosity))
}

/// Serialize a project, writing dependencies as current positions.
pub fn save_project(project: &Project) -> Result<String, DocumentError> {
    serde_yaml::to_string(&ProjectDocument::from_project(project)).map_err(DocumentError::Serialize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskDraft;
    use proptest::prelude::*;

    fn make_date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn saved_dependencies(yaml: &str) -> Vec<Vec<usize>> {
        let document: ProjectDocument = serde_yaml::from_str(yaml).unwrap();
        document.tasks.into_iter().map(|t| t.dependencies).collect()
    }

    #[test]
    fn test_empty_document_is_empty_project() {
        let project = load_project("", 0).unwrap();
        assert_eq!(project.name(), DEFAULT_PROJECT_NAME);
        assert!(project.tasks().is_empty());
        assert!(project.categories().is_empty());
        assert!(project.people().is_empty());
        assert!(project.milestones().is_empty());
    }

    #[test]
    fn test_older_document_without_optional_sections() {
        let yaml = "\
projectName: Legacy
tasks:
  - name: Only
    start: 2024-01-01
    duration: 3
";
        let project = load_project(yaml, 0).unwrap();
        assert_eq!(project.name(), "Legacy");
        let task = project.tasks().iter().next().unwrap();
        assert_eq!(task.start, Some(make_date(2024, 1, 1)));
        assert_eq!(task.duration, 3);
        assert_eq!(task.status, TaskStatus::OnTrack);
        assert!(task.assigned_people.is_empty());
    }

    #[test]
    fn test_non_mapping_rejected() {
        assert!(matches!(
            load_project("- a\n- b\n", 0),
            Err(DocumentError::NotAMapping("a list"))
        ));
        assert!(matches!(
            load_project("tasks: [", 0),
            Err(DocumentError::Parse(_))
        ));
    }

    #[test]
    fn test_malformed_fields_take_defaults() {
        let yaml = "\
tasks:
  - {name: '', duration: zero, start: someday, dependencies: [7, 0, 0]}
  - not a task
";
        let project = load_project(yaml, 0).unwrap();
        assert_eq!(project.tasks().len(), 2);
        let first = project.tasks().id_at(0).unwrap();
        let task = project.task(first).unwrap();
        assert_eq!(task.name, DEFAULT_TASK_NAME);
        assert_eq!(task.duration, 1);
        assert_eq!(task.start, None);
        // Out-of-range index dropped, duplicate collapsed
        assert_eq!(task.dependencies, vec![first]);
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let yaml = "\
projectName: Keep
theme: dark
tasks:
  - name: A
    duration: 2
    color: teal
categories:
  - id: 1
    name: Design
    color: '#f00'
    icon: pencil
";
        let project = load_project(yaml, 0).unwrap();
        let saved = save_project(&project).unwrap();
        let reloaded: Value = serde_yaml::from_str(&saved).unwrap();

        assert_eq!(reloaded["theme"], Value::String("dark".into()));
        assert_eq!(reloaded["tasks"][0]["color"], Value::String("teal".into()));
        assert_eq!(
            reloaded["categories"][0]["icon"],
            Value::String("pencil".into())
        );
    }

    #[test]
    fn test_save_writes_dates_and_positions() {
        let yaml = "\
tasks:
  - {name: A, start: 2024-01-01, duration: 3}
  - {name: B, start: 2024-01-02, duration: 2, dependencies: [0]}
";
        let project = load_project(yaml, 0).unwrap();
        let saved = save_project(&project).unwrap();
        let value: Value = serde_yaml::from_str(&saved).unwrap();

        assert_eq!(value["tasks"][0]["start"], Value::String("2024-01-01".into()));
        assert_eq!(saved_dependencies(&saved), vec![vec![], vec![0]]);
    }

    #[test]
    fn test_delete_reindexes_saved_dependencies() {
        let yaml = "\
tasks:
  - {name: A, duration: 1}
  - {name: B, duration: 1}
  - {name: C, duration: 1, dependencies: [0]}
  - {name: D, duration: 1, dependencies: [2, 0]}
";
        let mut project = load_project(yaml, 0).unwrap();
        let b = project.tasks().id_at(1).unwrap();
        project.delete_task(b).unwrap();

        let saved = save_project(&project).unwrap();
        assert_eq!(saved_dependencies(&saved), vec![vec![], vec![0], vec![1, 0]]);
    }

    /// Acyclic dependency lists: task i may only depend on tasks 0..i.
    fn acyclic_dependencies() -> impl Strategy<Value = Vec<Vec<usize>>> {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), 1..10).prop_map(
            |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, deps)| {
                        let mut deps: Vec<usize> = if i == 0 {
                            Vec::new()
                        } else {
                            deps.into_iter().map(|d| d % i).collect()
                        };
                        deps.sort_unstable();
                        deps.dedup();
                        deps
                    })
                    .collect()
            },
        )
    }

    fn document_yaml(dependencies: &[Vec<usize>]) -> String {
        let mut yaml = String::from("tasks:\n");
        for (i, deps) in dependencies.iter().enumerate() {
            let deps: Vec<String> = deps.iter().map(|d| d.to_string()).collect();
            yaml.push_str(&format!(
                "  - {{name: t{}, duration: 1, dependencies: [{}]}}\n",
                i,
                deps.join(", ")
            ));
        }
        yaml
    }

    proptest! {
        #[test]
        fn prop_delete_shifts_later_references_down(
            dependencies in acyclic_dependencies(),
            which in any::<usize>(),
        ) {
            // Tasks nothing depends on can be deleted; the last one always qualifies
            let deletable: Vec<usize> = (0..dependencies.len())
                .filter(|k| !dependencies.iter().any(|deps| deps.contains(k)))
                .collect();
            let k = deletable[which % deletable.len()];

            let mut project = load_project(&document_yaml(&dependencies), 0).unwrap();
            let target = project.tasks().id_at(k).unwrap();
            project.delete_task(target).unwrap();
            let saved = save_project(&project).unwrap();

            let expected: Vec<Vec<usize>> = dependencies
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != k)
                .map(|(_, deps)| deps.iter().map(|&d| if d > k { d - 1 } else { d }).collect())
                .collect();
            prop_assert_eq!(saved_dependencies(&saved), expected);
        }
    }

    #[test]
    fn test_added_task_saved_with_positions() {
        let mut project = load_project("tasks: [{name: A}]", 0).unwrap();
        let a = project.tasks().id_at(0).unwrap();
        project
            .add_task(TaskDraft::new("B", 2).after([a]), make_date(2024, 1, 1))
            .unwrap();

        let saved = save_project(&project).unwrap();
        assert_eq!(saved_dependencies(&saved), vec![vec![], vec![0]]);
    }

    #[test]
    fn test_cyclic_document_still_loads() {
        let yaml = "tasks:\n  - {name: A, dependencies: [1]}\n  - {name: B, dependencies: [0]}\n";
        let project = load_project(yaml, 0).unwrap();
        assert_eq!(project.tasks().len(), 2);
    }
}
