//! Model name, session duration, and context window usage.
//!
//! ```text
//! [Opus] | 2h 15m | Context: 150,000 free (75.0%)
//! ```

use super::input::{ContextWindow, StatusInput};
use super::style::{Tone, paint};
use super::{Module, RenderContext};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextFormat {
    #[default]
    Free,
    Used,
    Ratio,
    Bar,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    pub show_duration: bool,
    pub show_context: bool,
    pub context_format: ContextFormat,
    pub context_compact: bool,
    /// Percent free above which context is green.
    pub context_threshold_green: f64,
    /// Percent free above which context is yellow; red below.
    pub context_threshold_yellow: f64,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            show_duration: true,
            show_context: true,
            context_format: ContextFormat::Free,
            context_compact: false,
            context_threshold_green: 50.0,
            context_threshold_yellow: 25.0,
        }
    }
}

/// `45s`, `12m`, or `2h 15m`. Zero is not a duration.
#[must_use]
pub fn format_duration(ms: u64) -> Option<String> {
    if ms == 0 {
        return None;
    }
    let secs = ms / 1000;
    if secs < 60 {
        return Some(format!("{secs}s"));
    }
    let (hours, minutes) = (secs / 3600, secs % 3600 / 60);
    Some(if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    })
}

/// `150,000`
#[must_use]
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `1.5M`, `150k`, or the plain number below a thousand.
#[must_use]
pub fn compact_number(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.0}k", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

fn context_bar(pct_free: f64, width: usize) -> String {
    let filled = ((pct_free / 100.0 * width as f64).max(0.0) as usize).min(width);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(width - filled))
}

pub struct ModelModule {
    display_name: Option<String>,
    duration_ms: Option<u64>,
    context: Option<ContextWindow>,
    options: ModelOptions,
    colors: bool,
}

impl ModelModule {
    pub fn new(ctx: &RenderContext, options: ModelOptions) -> Self {
        let StatusInput {
            model,
            cost,
            context_window,
            ..
        } = &ctx.data;
        Self {
            display_name: model.as_ref().map(|m| m.display_name.clone()),
            duration_ms: cost.as_ref().and_then(|c| c.total_duration_ms),
            context: context_window.clone(),
            options,
            colors: ctx.colors,
        }
    }

    fn tone(&self, pct_free: f64) -> Tone {
        if pct_free > self.options.context_threshold_green {
            Tone::Green
        } else if pct_free > self.options.context_threshold_yellow {
            Tone::Yellow
        } else {
            Tone::Red
        }
    }

    fn format_context(&self) -> Option<String> {
        let window = self.context.as_ref()?;
        let usage = window.current_usage.as_ref()?;
        let total = window.context_window_size.filter(|&t| t > 0)?;

        let used = usage.context_tokens();
        let free = total.saturating_sub(used);
        let pct_free = free as f64 / total as f64 * 100.0;
        let pct_used = used as f64 / total as f64 * 100.0;

        let fmt = if self.options.context_compact {
            compact_number
        } else {
            group_thousands
        };
        let precision = if self.options.context_compact { 0 } else { 1 };

        let text = match self.options.context_format {
            ContextFormat::Free => format!("{} free ({pct_free:.precision$}%)", fmt(free)),
            ContextFormat::Used => format!("{} used ({pct_used:.precision$}%)", fmt(used)),
            ContextFormat::Ratio => {
                format!("{}/{} ({pct_used:.precision$}%)", fmt(used), fmt(total))
            }
            ContextFormat::Bar => format!("{} {pct_free:.0}%", context_bar(pct_free, 10)),
        };
        Some(paint(&text, self.tone(pct_free), self.colors))
    }
}

#[async_trait]
impl Module for ModelModule {
    fn name(&self) -> &'static str {
        "model"
    }

    async fn render(&self) -> anyhow::Result<Option<String>> {
        let mut parts = Vec::new();
        if let Some(name) = &self.display_name {
            parts.push(format!("[{name}]"));
        }
        if self.options.show_duration
            && let Some(duration) = self.duration_ms.and_then(format_duration)
        {
            parts.push(duration);
        }
        if self.options.show_context
            && let Some(context) = self.format_context()
        {
            parts.push(format!("Context: {context}"));
        }
        Ok((!parts.is_empty()).then(|| parts.join(" | ")))
    }
}
