//! Bordered task card, as printed by `statuskit card`.
//!
//! ```text
//! ┌─ Feature ─────────────────────┐
//! │ Title                         │
//! │                               │
//! │ #label                        │
//! ├───────────────────────────────┤
//! │ ID: proj-1                    │
//! │ Priority: P1  Status: open  … │
//! ├───────────────────────────────┤
//! │ DESCRIPTION                   │
//! │ …                             │
//! └───────────────────────────────┘
//! ```
//!
//! Every line has the same display width. The card is widened past
//! [`CARD_WIDTH`] when a single token would not fit, so wrapping never has
//! to split a word.

use super::{DependencyRef, IssueType, Task, TaskInputError};
use crate::text::{pad_right, str_width, wrap_text};

/// Default outer width of a card.
pub const CARD_WIDTH: usize = 120;

/// `"│ "` plus `" │"`.
const BORDER_OVERHEAD: usize = 4;

const LINK_MARKERS: [&str; 2] = ["Design:", "Plan:"];
const HIDDEN_MARKER: &str = "Git:";

/// Word shown in the top border for an issue type.
#[must_use]
pub fn type_word(issue_type: &IssueType) -> String {
    match issue_type {
        IssueType::Epic => "Epic".into(),
        IssueType::Feature => "Feature".into(),
        IssueType::Bug => "Bug".into(),
        IssueType::Task => "Task".into(),
        IssueType::Chore => "Chore".into(),
        IssueType::Other(s) => capitalize(s),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn dependency_header(dependency_type: &str) -> String {
    match dependency_type {
        "parent-child" => "Parent:".into(),
        "dependency" => "Depends on:".into(),
        other => format!("{other}:"),
    }
}

fn dependency_line(dep: &DependencyRef) -> String {
    format!("  → {}: {} ({})", dep.id, dep.title, dep.status)
}

fn metadata_line(task: &Task) -> String {
    format!(
        "Priority: P{}  Status: {}  Type: {}",
        task.priority, task.status, task.issue_type
    )
}

fn labels_line(labels: &[String]) -> String {
    labels
        .iter()
        .map(|l| format!("#{l}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a description into its body and its link lines.
///
/// `Design:` and `Plan:` lines become links (in source order), `Git:` lines
/// are dropped, and trailing blank lines are removed from the body.
#[must_use]
pub fn extract_links(description: &str) -> (String, Vec<String>) {
    let mut links = Vec::new();
    let mut body: Vec<&str> = Vec::new();

    for line in description.split('\n') {
        let stripped = line.trim();
        if LINK_MARKERS.iter().any(|m| stripped.starts_with(m)) {
            links.push(stripped.to_string());
        } else if !stripped.starts_with(HIDDEN_MARKER) {
            body.push(line);
        }
    }

    while body.last().is_some_and(|l| l.trim().is_empty()) {
        body.pop();
    }

    (body.join("\n"), links)
}

/// Widest line `text` can produce when every word is forced onto its own
/// line, continuation indent included.
fn widest_word(text: &str) -> usize {
    wrap_text(text, 0)
        .iter()
        .map(|l| str_width(l))
        .max()
        .unwrap_or(0)
}

/// Outer card width needed so no token has to be split.
#[must_use]
pub fn compute_card_width(task: &Task) -> usize {
    let (body, links) = extract_links(&task.description);

    let widest = [
        widest_word(&task.title),
        widest_word(&labels_line(&task.labels)),
        str_width(&format!("ID: {}", task.id)),
        str_width(&metadata_line(task)),
        body.split('\n').map(widest_word).max().unwrap_or(0),
        links.iter().map(|l| widest_word(l)).max().unwrap_or(0),
        task.dependencies
            .iter()
            .map(|d| widest_word(&dependency_line(d)))
            .max()
            .unwrap_or(0),
    ]
    .into_iter()
    .max()
    .unwrap_or(0);

    CARD_WIDTH.max(widest + BORDER_OVERHEAD)
}

/// Line builder for a card of fixed outer width.
struct CardLayout {
    width: usize,
    lines: Vec<String>,
}

impl CardLayout {
    fn new(width: usize) -> Self {
        Self {
            width,
            lines: Vec::new(),
        }
    }

    fn content_width(&self) -> usize {
        self.width - BORDER_OVERHEAD
    }

    fn top_border(&mut self, label: &str) {
        let label = format!(" {label} ");
        let fill = self.width.saturating_sub(3 + str_width(&label));
        self.lines.push(format!("┌─{label}{}┐", "─".repeat(fill)));
    }

    fn separator(&mut self) {
        self.lines.push(format!("├{}┤", "─".repeat(self.width - 2)));
    }

    fn bottom_border(&mut self) {
        self.lines.push(format!("└{}┘", "─".repeat(self.width - 2)));
    }

    fn content(&mut self, text: &str) {
        let padded = pad_right(text, self.content_width());
        self.lines.push(format!("│ {padded} │"));
    }

    fn wrapped(&mut self, text: &str) {
        for line in wrap_text(text, self.content_width()) {
            self.content(&line);
        }
    }

    fn section(&mut self, header: &str) {
        self.separator();
        self.content(header);
    }
}

/// The task to show from `bd show --json` output (an array, first element
/// wins) or a bare task object. Empty input yields `None`.
pub fn card_task_from_json(input: &str) -> Result<Option<Task>, TaskInputError> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value = serde_json::from_str(input)?;
    let value = match value {
        serde_json::Value::Array(items) => match items.into_iter().next() {
            Some(first) => first,
            None => return Ok(None),
        },
        serde_json::Value::Object(map) if map.is_empty() => return Ok(None),
        serde_json::Value::Null => return Ok(None),
        other => other,
    };
    Ok(Some(serde_json::from_value(value)?))
}

/// Render the full card for `task`.
#[must_use]
pub fn render_card(task: &Task) -> String {
    let mut card = CardLayout::new(compute_card_width(task));

    card.top_border(&type_word(&task.issue_type));
    card.wrapped(&task.title);

    if !task.labels.is_empty() {
        card.content("");
        card.wrapped(&labels_line(&task.labels));
    }

    card.separator();
    card.content(&format!("ID: {}", task.id));
    card.content(&metadata_line(task));

    let (body, links) = extract_links(&task.description);

    if !body.trim().is_empty() {
        card.section("DESCRIPTION");
        for line in body.split('\n') {
            card.wrapped(line);
        }
    }

    if !links.is_empty() {
        card.section("LINKS");
        for link in &links {
            card.wrapped(link);
        }
    }

    if !task.dependencies.is_empty() {
        card.section("DEPENDENCIES");
        let mut groups: Vec<(&str, Vec<&DependencyRef>)> = Vec::new();
        for dep in &task.dependencies {
            match groups.iter_mut().find(|(t, _)| *t == dep.dependency_type) {
                Some((_, group)) => group.push(dep),
                None => groups.push((dep.dependency_type.as_str(), vec![dep])),
            }
        }
        for (dependency_type, group) in groups {
            card.content(&dependency_header(dependency_type));
            for dep in group {
                card.wrapped(&dependency_line(dep));
            }
        }
    }

    card.bottom_border();
    card.lines.join("\n")
}
