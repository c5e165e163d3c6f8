//! Git branch, upstream, working tree, and last commit.
//!
//! ```text
//! [statuskit/src] main ↑2 ↓1 +1 ~3 ?2
//! a1b2c3d 2h
//! ```

mod runner;

pub use runner::{GitRunner, SystemGit};

use super::style::{Tone, paint};
use super::{Module, RenderContext};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Upstream tracking state of the current branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamStatus {
    NoUpstream,
    Tracking { ahead: u32, behind: u32 },
}

/// Working tree change counts from `git status --porcelain`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    pub staged: u32,
    pub modified: u32,
    pub untracked: u32,
}

impl ChangeCounts {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }

    /// Classify porcelain v1 lines.
    ///
    /// A path can be both staged and modified (`MM`).
    pub fn from_porcelain(output: &str) -> Self {
        let mut counts = Self::default();
        for line in output.lines() {
            let mut codes = line.chars();
            let (Some(index), Some(worktree)) = (codes.next(), codes.next()) else {
                continue;
            };
            if index == '?' && worktree == '?' {
                counts.untracked += 1;
                continue;
            }
            if !matches!(index, ' ' | '?') {
                counts.staged += 1;
            }
            if !matches!(worktree, ' ' | '?') {
                counts.modified += 1;
            }
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastCommit {
    pub hash: String,
    /// Relative age as git prints it, e.g. `2 hours ago`.
    pub age: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeFormat {
    #[default]
    Compact,
    Relative,
}

fn unit_suffix(unit: &str) -> Option<&'static str> {
    Some(match unit {
        "second" | "seconds" => "s",
        "minute" | "minutes" => "m",
        "hour" | "hours" => "h",
        "day" | "days" => "d",
        "week" | "weeks" => "w",
        "month" | "months" => "mo",
        "year" | "years" => "y",
        _ => return None,
    })
}

/// Render a git relative age.
///
/// Compact turns `2 years, 3 months ago` into `2y 3mo`. Text that does not
/// look like `<n> <unit>` pairs is returned unchanged.
#[must_use]
pub fn format_age(age: &str, format: AgeFormat) -> String {
    if format == AgeFormat::Relative {
        return age.to_string();
    }
    let trimmed = age.trim();
    let trimmed = trimmed.strip_suffix("ago").unwrap_or(trimmed);
    let words: Vec<&str> = trimmed
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() || words.len() % 2 != 0 {
        return age.to_string();
    }

    let mut parts = Vec::with_capacity(words.len() / 2);
    for pair in words.chunks(2) {
        let (count, unit) = (pair[0], pair[1]);
        match unit_suffix(unit) {
            Some(suffix) if count.chars().all(|c| c.is_ascii_digit()) => {
                parts.push(format!("{count}{suffix}"));
            }
            _ => return age.to_string(),
        }
    }
    parts.join(" ")
}

/// Git queries over a [`GitRunner`].
pub struct GitCollector {
    runner: Box<dyn GitRunner>,
}

impl GitCollector {
    pub fn new(runner: Box<dyn GitRunner>) -> Self {
        Self { runner }
    }

    /// Current branch, or the short commit hash when detached.
    pub async fn branch(&self) -> Option<String> {
        let branch = self.runner.run(&["branch", "--show-current"]).await?;
        let branch = branch.trim();
        if !branch.is_empty() {
            return Some(branch.to_string());
        }
        let hash = self.runner.run(&["rev-parse", "--short", "HEAD"]).await?;
        Some(hash.trim().to_string())
    }

    pub async fn upstream(&self) -> Option<UpstreamStatus> {
        if self
            .runner
            .run(&["rev-parse", "--abbrev-ref", "@{upstream}"])
            .await
            .is_none()
        {
            return Some(UpstreamStatus::NoUpstream);
        }
        let counts = self
            .runner
            .run(&["rev-list", "--left-right", "--count", "@{upstream}...HEAD"])
            .await?;
        let mut fields = counts.split_whitespace().map(str::parse::<u32>);
        match (fields.next(), fields.next()) {
            (Some(Ok(behind)), Some(Ok(ahead))) => Some(UpstreamStatus::Tracking { ahead, behind }),
            _ => None,
        }
    }

    pub async fn changes(&self) -> Option<ChangeCounts> {
        let output = self.runner.run(&["status", "--porcelain"]).await?;
        Some(ChangeCounts::from_porcelain(&output))
    }

    pub async fn last_commit(&self) -> Option<LastCommit> {
        let output = self
            .runner
            .run(&["log", "-1", "--format=%h%x1f%cr"])
            .await?;
        let (hash, age) = output.trim().split_once('\x1f')?;
        if hash.is_empty() {
            return None;
        }
        Some(LastCommit {
            hash: hash.to_string(),
            age: age.to_string(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitOptions {
    pub show_location: bool,
    pub show_upstream: bool,
    pub show_changes: bool,
    pub show_last_commit: bool,
    pub commit_age_format: AgeFormat,
}

impl Default for GitOptions {
    fn default() -> Self {
        Self {
            show_location: true,
            show_upstream: true,
            show_changes: true,
            show_last_commit: true,
            commit_age_format: AgeFormat::Compact,
        }
    }
}

/// Project name plus the path of the working directory inside it.
fn location(ctx: &RenderContext) -> Option<String> {
    let workspace = ctx.data.workspace.as_ref();
    let current = ctx.data.working_dir()?;
    let project = workspace
        .map(|w| w.project_dir.as_str())
        .filter(|p| !p.is_empty())
        .unwrap_or(current);

    let project_path = Path::new(project);
    let name = project_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| project.to_string());
    match Path::new(current).strip_prefix(project_path) {
        Ok(rel) if !rel.as_os_str().is_empty() => Some(format!("{name}/{}", rel.display())),
        Ok(_) => Some(name),
        Err(_) => Path::new(current)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned()),
    }
}

pub struct GitModule {
    git: GitCollector,
    options: GitOptions,
    location: Option<String>,
    colors: bool,
}

impl GitModule {
    pub fn new(ctx: &RenderContext, options: GitOptions) -> Self {
        let cwd: Option<PathBuf> = ctx.data.working_dir().map(PathBuf::from);
        Self::with_runner(ctx, options, Box::new(SystemGit::new(cwd)))
    }

    pub fn with_runner(
        ctx: &RenderContext,
        options: GitOptions,
        runner: Box<dyn GitRunner>,
    ) -> Self {
        Self {
            git: GitCollector::new(runner),
            location: location(ctx),
            options,
            colors: ctx.colors,
        }
    }

    fn format_upstream(&self, status: UpstreamStatus) -> Option<String> {
        match status {
            UpstreamStatus::NoUpstream => Some(paint("(local)", Tone::Dim, self.colors)),
            UpstreamStatus::Tracking { ahead: 0, behind: 0 } => None,
            UpstreamStatus::Tracking { ahead, behind } => {
                let mut parts = Vec::new();
                if ahead > 0 {
                    parts.push(paint(&format!("↑{ahead}"), Tone::Green, self.colors));
                }
                if behind > 0 {
                    parts.push(paint(&format!("↓{behind}"), Tone::Red, self.colors));
                }
                Some(parts.join(" "))
            }
        }
    }

    fn format_changes(&self, counts: ChangeCounts) -> Option<String> {
        if counts.is_clean() {
            return None;
        }
        let mut parts = Vec::new();
        if counts.staged > 0 {
            parts.push(paint(&format!("+{}", counts.staged), Tone::Green, self.colors));
        }
        if counts.modified > 0 {
            parts.push(paint(&format!("~{}", counts.modified), Tone::Yellow, self.colors));
        }
        if counts.untracked > 0 {
            parts.push(paint(&format!("?{}", counts.untracked), Tone::Red, self.colors));
        }
        Some(parts.join(" "))
    }
}

#[async_trait]
impl Module for GitModule {
    fn name(&self) -> &'static str {
        "git"
    }

    async fn render(&self) -> anyhow::Result<Option<String>> {
        let Some(branch) = self.git.branch().await else {
            return Ok(None);
        };

        let mut line = Vec::new();
        if self.options.show_location
            && let Some(location) = &self.location
        {
            line.push(paint(&format!("[{location}]"), Tone::Cyan, self.colors));
        }
        line.push(paint(&branch, Tone::Magenta, self.colors));
        if self.options.show_upstream
            && let Some(upstream) = self.git.upstream().await.and_then(|s| self.format_upstream(s))
        {
            line.push(upstream);
        }
        if self.options.show_changes
            && let Some(changes) = self.git.changes().await.and_then(|c| self.format_changes(c))
        {
            line.push(changes);
        }

        let mut lines = vec![line.join(" ")];
        if self.options.show_last_commit
            && let Some(commit) = self.git.last_commit().await
        {
            let age = format_age(&commit.age, self.options.commit_age_format);
            lines.push(format!(
                "{} {}",
                paint(&commit.hash, Tone::Yellow, self.colors),
                paint(&age, Tone::Dim, self.colors)
            ));
        }
        Ok(Some(lines.join("\n")))
    }
}
