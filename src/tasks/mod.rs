//! Task graphs exported by the `bd` issue tracker.
//!
//! `bd graph --all --json` emits an array of graph objects, each holding an
//! `Issues` list and a `Dependencies` list of typed edges. [`TaskGraph`]
//! flattens them into an arena of [`Task`]s linked by index:
//!
//! - `parent-child` edges build the ownership forest (a child has at most one
//!   parent, edges that would close a cycle are dropped)
//! - `blocks` edges mark the blocked task while its blocker is not closed

pub mod card;
pub mod leaf;
pub mod tree;

use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskInputError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

/// Workflow status of a task. Unknown values are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum TaskStatus {
    Open,
    InProgress,
    Deferred,
    Closed,
    Other(String),
}

impl TaskStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Deferred => "deferred",
            Self::Closed => "closed",
            Self::Other(s) => s,
        }
    }

    /// Sibling ordering rank: in progress first, then open, then deferred.
    #[must_use]
    pub fn sort_rank(&self) -> u8 {
        match self {
            Self::InProgress => 0,
            Self::Open => 1,
            Self::Deferred => 2,
            _ => 99,
        }
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "open" => Self::Open,
            "in_progress" => Self::InProgress,
            "deferred" => Self::Deferred,
            "closed" => Self::Closed,
            _ => Self::Other(s),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of issue. Unknown values are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum IssueType {
    Epic,
    Feature,
    Bug,
    #[default]
    Task,
    Chore,
    Other(String),
}

impl IssueType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Epic => "epic",
            Self::Feature => "feature",
            Self::Bug => "bug",
            Self::Task => "task",
            Self::Chore => "chore",
            Self::Other(s) => s,
        }
    }
}

/// Only the exact lowercase names are known types; anything else is kept
/// verbatim for display.
impl From<String> for IssueType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "epic" => Self::Epic,
            "feature" => Self::Feature,
            "bug" => Self::Bug,
            "task" => Self::Task,
            "chore" => Self::Chore,
            _ => Self::Other(s),
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dependency as listed by `bd show --json`.
#[derive(Debug, Clone, Deserialize)]
pub struct DependencyRef {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default = "default_dependency_type")]
    pub dependency_type: String,
}

fn default_dependency_type() -> String {
    "dependency".to_string()
}

fn default_priority() -> u32 {
    2
}

/// Treat an explicit JSON `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    /// Lower is more urgent.
    #[serde(default = "default_priority")]
    pub priority: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub issue_type: IssueType,
    #[serde(default, deserialize_with = "nullable")]
    pub labels: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub owner: String,
    #[serde(default, deserialize_with = "nullable")]
    pub dependencies: Vec<DependencyRef>,

    #[serde(skip)]
    parent: Option<usize>,
    #[serde(skip)]
    children: Vec<usize>,
    #[serde(skip)]
    is_blocked: bool,
}

impl Task {
    /// Whether an unclosed `blocks` dependency points at this task.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.is_blocked
    }

    #[must_use]
    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }
}

/// Typed edge between two issues.
#[derive(Debug, Clone, Deserialize)]
pub struct Edge {
    pub issue_id: String,
    pub depends_on_id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One element of the `bd graph --json` array.
#[derive(Debug, Default, Deserialize)]
pub struct Graph {
    #[serde(rename = "Issues", default, deserialize_with = "nullable")]
    pub issues: Vec<Task>,
    #[serde(rename = "Dependencies", default, deserialize_with = "nullable")]
    pub dependencies: Vec<Edge>,
}

/// Flat arena of tasks in input order with parent/child links by index.
#[derive(Debug, Default)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
}

impl TaskGraph {
    /// Parse the JSON array produced by `bd graph --all --json`. Blank input
    /// is an empty graph.
    pub fn from_json(input: &str) -> Result<Self, TaskInputError> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        let graphs: Option<Vec<Graph>> = serde_json::from_str(input)?;
        Ok(Self::from_graphs(graphs.unwrap_or_default()))
    }

    #[must_use]
    pub fn from_graphs(graphs: Vec<Graph>) -> Self {
        let mut graph = Self::default();
        // child -> parent; a later edge for the same child replaces the parent
        // but keeps the position of the first one
        let mut parent_order: Vec<String> = Vec::new();
        let mut parent_of: HashMap<String, String> = HashMap::new();
        let mut blocks: Vec<Edge> = Vec::new();

        for g in graphs {
            for task in g.issues {
                graph.insert(task);
            }
            for edge in g.dependencies {
                match edge.kind.as_str() {
                    "parent-child" => {
                        if parent_of
                            .insert(edge.issue_id.clone(), edge.depends_on_id)
                            .is_none()
                        {
                            parent_order.push(edge.issue_id);
                        }
                    }
                    "blocks" => blocks.push(edge),
                    _ => {}
                }
            }
        }

        for child_id in parent_order {
            let Some(parent_id) = parent_of.get(&child_id) else {
                continue;
            };
            let (Some(&child), Some(&parent)) =
                (graph.index.get(&child_id), graph.index.get(parent_id))
            else {
                continue;
            };
            if graph.is_ancestor_or_self(child, parent) {
                tracing::warn!("ignoring parent-child edge {child_id} -> {parent_id}: cycle");
                continue;
            }
            graph.tasks[child].parent = Some(parent);
            graph.tasks[parent].children.push(child);
        }

        for edge in blocks {
            let blocker_open = graph
                .get(&edge.depends_on_id)
                .is_some_and(|t| t.status != TaskStatus::Closed);
            if blocker_open && let Some(&blocked) = graph.index.get(&edge.issue_id) {
                graph.tasks[blocked].is_blocked = true;
            }
        }

        graph
    }

    fn insert(&mut self, task: Task) {
        if let Some(&idx) = self.index.get(&task.id) {
            self.tasks[idx] = task;
        } else {
            self.index.insert(task.id.clone(), self.tasks.len());
            self.tasks.push(task);
        }
    }

    /// True if `candidate` is `node` or one of its ancestors.
    fn is_ancestor_or_self(&self, candidate: usize, node: usize) -> bool {
        let mut current = Some(node);
        while let Some(idx) = current {
            if idx == candidate {
                return true;
            }
            current = self.tasks[idx].parent;
        }
        false
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.index.get(id).map(|&idx| &self.tasks[idx])
    }

    /// Tasks in input order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn children<'a>(&'a self, task: &'a Task) -> impl Iterator<Item = &'a Task> + 'a {
        task.children.iter().map(|&idx| &self.tasks[idx])
    }

    #[must_use]
    pub fn parent(&self, task: &Task) -> Option<&Task> {
        task.parent.map(|idx| &self.tasks[idx])
    }

    /// Find a task by exact id, falling back to a dash-prefixed suffix match.
    ///
    /// `"5dl"` finds `"proj-5dl"` but never `"proj-a5dl"`.
    #[must_use]
    pub fn find_task_by_id(&self, task_id: &str) -> Option<&Task> {
        if let Some(task) = self.get(task_id) {
            return Some(task);
        }
        let suffix = format!("-{task_id}");
        self.tasks.iter().find(|t| t.id.ends_with(&suffix))
    }
}
