//! Leaf in-progress tasks, as printed by `statuskit continue`.
//!
//! A task is a leaf when it is in progress and none of its children are. These
//! are the tasks worth resuming: a parent with an active child is only
//! context.

use super::{Task, TaskGraph, TaskStatus};

/// In-progress tasks with no in-progress child, ordered by priority then id.
///
/// With `owner` set, only tasks owned by that user are returned.
#[must_use]
pub fn find_leaf_in_progress<'a>(graph: &'a TaskGraph, owner: Option<&str>) -> Vec<&'a Task> {
    let mut leaves: Vec<&Task> = graph
        .iter()
        .filter(|t| t.status == TaskStatus::InProgress)
        .filter(|t| owner.is_none_or(|o| t.owner == o))
        .filter(|t| {
            !graph
                .children(t)
                .any(|c| c.status == TaskStatus::InProgress)
        })
        .collect();
    leaves.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
    leaves
}

fn sanitize(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ").replace('\r', "")
}

/// `id|issue_type|title|P<priority>|first_label`
#[must_use]
pub fn format_leaf_line(task: &Task) -> String {
    let label = task.labels.first().map(String::as_str).unwrap_or_default();
    format!(
        "{}|{}|{}|P{}|{}",
        task.id,
        task.issue_type,
        sanitize(&task.title),
        task.priority,
        sanitize(label)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::fixtures::{graph, issue, parent_child};
    use serde_json::json;

    fn ids(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn test_filters_non_in_progress() {
        let g = graph(
            vec![issue("t-1", "Open", "open", 2), issue("t-2", "Working", "in_progress", 2)],
            vec![],
        );
        assert_eq!(ids(&find_leaf_in_progress(&g, None)), ["t-2"]);
    }

    #[test]
    fn test_parent_with_in_progress_child_is_not_leaf() {
        let g = graph(
            vec![issue("parent", "P", "in_progress", 1), issue("child", "C", "in_progress", 2)],
            vec![parent_child("child", "parent")],
        );
        assert_eq!(ids(&find_leaf_in_progress(&g, None)), ["child"]);
    }

    #[test]
    fn test_parent_is_leaf_when_children_idle() {
        let g = graph(
            vec![issue("parent", "P", "in_progress", 1), issue("child", "C", "open", 2)],
            vec![parent_child("child", "parent")],
        );
        assert_eq!(ids(&find_leaf_in_progress(&g, None)), ["parent"]);
    }

    #[test]
    fn test_deep_hierarchy_finds_deepest() {
        let g = graph(
            vec![
                issue("a", "A", "in_progress", 1),
                issue("b", "B", "in_progress", 1),
                issue("c", "C", "in_progress", 1),
            ],
            vec![parent_child("b", "a"), parent_child("c", "b")],
        );
        assert_eq!(ids(&find_leaf_in_progress(&g, None)), ["c"]);
    }

    #[test]
    fn test_owner_filter() {
        let g = graph(
            vec![
                json!({"id": "t-1", "title": "Mine", "status": "in_progress", "owner": "alice"}),
                json!({"id": "t-2", "title": "Theirs", "status": "in_progress", "owner": "bob"}),
            ],
            vec![],
        );
        assert_eq!(ids(&find_leaf_in_progress(&g, Some("alice"))), ["t-1"]);
        assert_eq!(find_leaf_in_progress(&g, None).len(), 2);
    }

    #[test]
    fn test_sorted_by_priority_then_id() {
        let g = graph(
            vec![
                issue("t-low", "L", "in_progress", 3),
                issue("t-med-b", "M", "in_progress", 2),
                issue("t-high", "H", "in_progress", 0),
                issue("t-med-a", "M", "in_progress", 2),
            ],
            vec![],
        );
        assert_eq!(
            ids(&find_leaf_in_progress(&g, None)),
            ["t-high", "t-med-a", "t-med-b", "t-low"]
        );
    }

    #[test]
    fn test_format_leaf_line() {
        let task: Task = serde_json::from_value(json!({
            "id": "t-1", "title": "My Task", "status": "in_progress",
            "issue_type": "feature", "labels": ["flow", "cli"]
        }))
        .unwrap();
        assert_eq!(format_leaf_line(&task), "t-1|feature|My Task|P2|flow");
    }

    #[test]
    fn test_format_leaf_line_escapes() {
        let task: Task = serde_json::from_value(json!({
            "id": "t-1", "title": "a|b\nc\r", "status": "in_progress"
        }))
        .unwrap();
        assert_eq!(format_leaf_line(&task), "t-1|task|a\\|b c|P2|");
    }
}
