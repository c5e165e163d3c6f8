//! Hierarchical task tree, as printed by `statuskit tree`.
//!
//! ```text
//! 1. 📦 [E] Release 2.0 (proj-1) | P1 · in_progress
//! ├─ 1.1 🚀 [F] Config loader (proj-2) | P1 · open | #core
//! └─ 1.2 ❌ [B] Crash on empty input (proj-3) | P2 · open
//! ```
//!
//! Only actionable work is listed: closed and blocked tasks are hidden, and a
//! deferred task appears only as context for displayed descendants. Every
//! task sharing the most urgent displayed priority is wrapped in `**bold**`.


use super::{IssueType, Task, TaskGraph, TaskStatus};
use std::collections::HashSet;

/// Filters and layout switches for [`build_tree`].
#[derive(Debug, Clone, Default)]
pub struct TreeOptions {
    /// Case-insensitive match on title, id, or any label.
    pub search: Option<String>,
    /// Maximum number of root tasks after sorting.
    pub limit: Option<usize>,
    /// Stop at nodes with displayed children and show a `[+N]` count.
    pub collapse: bool,
    /// Render only the subtree of this task (exact id or `-suffix` match).
    pub root: Option<String>,
    /// Include blocked tasks.
    pub show_blocked: bool,
}

const CONNECTOR_MID: &str = "├─ ";
const CONNECTOR_LAST: &str = "└─ ";
const CONTINUE_MID: &str = "│  ";
const CONTINUE_LAST: &str = "   ";

fn type_letter(issue_type: &IssueType) -> &'static str {
    match issue_type {
        IssueType::Epic => "E",
        IssueType::Feature => "F",
        IssueType::Bug => "B",
        IssueType::Chore => "C",
        IssueType::Task | IssueType::Other(_) => "T",
    }
}

fn type_emoji(issue_type: &IssueType) -> &'static str {
    match issue_type {
        IssueType::Epic => "📦",
        IssueType::Feature => "🚀",
        IssueType::Bug => "❌",
        IssueType::Task => "📋",
        IssueType::Chore => "⚙️",
        IssueType::Other(s) => match IssueType::from(s.to_lowercase()) {
            IssueType::Other(_) => "❔",
            known => type_emoji(&known),
        },
    }
}

fn sort_tasks(tasks: &mut [&Task]) {
    tasks.sort_by_key(|t| (t.status.sort_rank(), t.priority));
}

fn matches_search(task: &Task, needle: &str) -> bool {
    task.title.to_lowercase().contains(needle)
        || task.id.to_lowercase().contains(needle)
        || task.labels.iter().any(|l| l.to_lowercase().contains(needle))
}

struct TreeRenderer<'a> {
    graph: &'a TaskGraph,
    show_blocked: bool,
    collapse: bool,
    search_ids: Option<HashSet<&'a str>>,
    min_priority: Option<u32>,
}

impl<'a> TreeRenderer<'a> {
    fn new(graph: &'a TaskGraph, opts: &TreeOptions) -> Self {
        Self {
            graph,
            show_blocked: opts.show_blocked,
            collapse: opts.collapse,
            search_ids: None,
            min_priority: None,
        }
    }

    /// Open, in progress, or deferred, and neither closed nor blocked.
    fn should_show(&self, task: &Task) -> bool {
        if task.status == TaskStatus::Closed {
            return false;
        }
        if task.is_blocked() && !self.show_blocked {
            return false;
        }
        matches!(
            task.status,
            TaskStatus::Open | TaskStatus::InProgress | TaskStatus::Deferred
        )
    }

    fn is_displayed(&self, task: &Task) -> bool {
        if task.status == TaskStatus::Deferred {
            self.has_displayed_descendants(task)
        } else {
            self.should_show(task)
        }
    }

    fn has_displayed_descendants(&self, task: &Task) -> bool {
        self.graph.children(task).any(|child| {
            (child.status != TaskStatus::Deferred && self.should_show(child))
                || self.has_displayed_descendants(child)
        })
    }

    fn min_displayed_priority<'t>(&self, tasks: impl Iterator<Item = &'t Task>) -> Option<u32> {
        tasks
            .filter(|t| self.is_displayed(t))
            .map(|t| t.priority)
            .min()
    }

    fn collect_subtree(&self, root: &'a Task, out: &mut Vec<&'a Task>) {
        out.push(root);
        for child in self.graph.children(root) {
            self.collect_subtree(child, out);
        }
    }

    /// Ids of matching tasks plus their ancestors and descendants.
    fn matching_ids(&self, search: &str) -> HashSet<&'a str> {
        let needle = search.to_lowercase();
        let mut ids = HashSet::new();
        for task in self.graph.iter().filter(|t| matches_search(t, &needle)) {
            let mut current = Some(task);
            while let Some(t) = current {
                ids.insert(t.id.as_str());
                current = self.graph.parent(t);
            }
            let mut subtree = Vec::new();
            self.collect_subtree(task, &mut subtree);
            ids.extend(subtree.into_iter().map(|t| t.id.as_str()));
        }
        ids
    }

    fn in_search(&self, task: &Task) -> bool {
        self.search_ids
            .as_ref()
            .is_none_or(|ids| ids.contains(task.id.as_str()))
    }

    fn format_line(&self, task: &Task, prefix: &str, number: &str, is_root: bool) -> String {
        let number = if is_root {
            format!("{number}.")
        } else {
            number.to_string()
        };
        let mut content = format!(
            "{number} {} [{}] {} ({}) | P{} · {}",
            type_emoji(&task.issue_type),
            type_letter(&task.issue_type),
            task.title,
            task.id,
            task.priority,
            task.status,
        );
        if !task.labels.is_empty() {
            let labels: Vec<String> = task.labels.iter().map(|l| format!("#{l}")).collect();
            content.push_str(" | ");
            content.push_str(&labels.join(" "));
        }
        if self.min_priority == Some(task.priority) {
            content = format!("**{content}**");
        }
        format!("{prefix}{content}")
    }

    /// Lines for `task` and its displayed descendants.
    ///
    /// `prefix` is the continuation inherited from ancestors, `connector` the
    /// branch glyph for this line only.
    fn render_node(
        &self,
        task: &Task,
        prefix: &str,
        connector: &str,
        number: &str,
        is_last: bool,
        is_root: bool,
    ) -> Vec<String> {
        if !self.in_search(task) || !self.is_displayed(task) {
            return Vec::new();
        }

        let line_prefix = format!("{prefix}{connector}");
        let mut lines = vec![self.format_line(task, &line_prefix, number, is_root)];

        let mut children: Vec<&Task> = self
            .graph
            .children(task)
            .filter(|c| self.is_displayed(c))
            .collect();

        if self.collapse && !children.is_empty() {
            if let Some(last) = lines.last_mut() {
                last.push_str(&format!(" [+{}]", children.len()));
            }
            return lines;
        }

        sort_tasks(&mut children);
        children.retain(|c| self.in_search(c));

        let child_prefix = if is_root {
            String::new()
        } else {
            format!("{prefix}{}", if is_last { CONTINUE_LAST } else { CONTINUE_MID })
        };

        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            let child_is_last = i + 1 == count;
            lines.extend(self.render_node(
                child,
                &child_prefix,
                if child_is_last { CONNECTOR_LAST } else { CONNECTOR_MID },
                &format!("{number}.{}", i + 1),
                child_is_last,
                false,
            ));
        }
        lines
    }
}

/// Build the tree lines for `graph`.
///
/// An unknown `root` or a search without matches falls back to the full
/// tree, prefixed with a notice. Returns no lines when nothing is displayed.
#[must_use]
pub fn build_tree(graph: &TaskGraph, opts: &TreeOptions) -> Vec<String> {
    let mut renderer = TreeRenderer::new(graph, opts);

    let mut notice = Vec::new();
    if let Some(root_id) = opts.root.as_deref() {
        if let Some(root) = graph.find_task_by_id(root_id) {
            let mut subtree = Vec::new();
            renderer.collect_subtree(root, &mut subtree);
            renderer.min_priority = renderer.min_displayed_priority(subtree.into_iter());
            return renderer.render_node(root, "", "", "1", true, true);
        }
        notice.push(format!("Task \"{root_id}\" not found. Showing full tree."));
        notice.push(String::new());
    }

    let mut roots: Vec<&Task> = graph.iter().filter(|t| !t.has_parent()).collect();
    sort_tasks(&mut roots);

    if let Some(search) = opts.search.as_deref().filter(|s| !s.is_empty()) {
        let ids = renderer.matching_ids(search);
        if ids.is_empty() {
            notice.extend([
                format!("Search \"{search}\" found no tasks."),
                String::new(),
                "All available tasks:".to_string(),
                String::new(),
            ]);
        } else {
            renderer.search_ids = Some(ids);
        }
    }

    if let Some(limit) = opts.limit.filter(|&n| n > 0) {
        roots.truncate(limit);
    }

    renderer.min_priority = renderer.min_displayed_priority(graph.iter());

    let mut lines: Vec<String> = Vec::new();
    let count = roots.len();
    for (i, root) in roots.into_iter().enumerate() {
        let block = renderer.render_node(root, "", "", &(i + 1).to_string(), i + 1 == count, true);
        if block.is_empty() {
            continue;
        }
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.extend(block);
    }

    if lines.is_empty() {
        return lines;
    }
    notice.extend(lines);
    notice
}

/// Full `statuskit tree` output, including the empty-result explanations.
#[must_use]
pub fn render_tree(graph: &TaskGraph, opts: &TreeOptions) -> String {
    if graph.is_empty() {
        return "No tasks available.".to_string();
    }
    let lines = build_tree(graph, opts);
    if lines.is_empty() {
        return [
            "No tasks match the filter criteria.",
            "",
            "Possible reasons:",
            "- All tasks are closed",
            "- All open tasks are blocked",
            "- All tasks are deferred",
        ]
        .join("\n");
    }
    lines.join("\n")
}
