//! Subscription usage limits (5-hour session, weekly, Sonnet-only weekly).
//!
//! ```text
//! Usage:
//! ├ Session: 42% (2h 30m)
//! └ Weekly:  17% (Thu 17:00)
//! ```
//!
//! Data comes from the OAuth usage endpoint and is cached on disk. Fetches are
//! throttled by the time of the last attempt, successful or not, so a failing
//! endpoint is not hammered by every statusline refresh.

mod cache;
mod client;
mod format;

pub use cache::{CACHE_FILENAME, CachedUsage, UsageCache};
pub use client::{
    AnthropicBackend, UsageBackend, credentials_path, parse_api_response, resolve_token,
};
pub use format::{
    Urgency, calculate_color, format_progress_bar, format_remaining_time, format_reset_at,
};

use super::style::{Tone, paint};
use super::{Module, RenderContext};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const SESSION_WINDOW_HOURS: f64 = 5.0;
const WEEKLY_WINDOW_HOURS: f64 = 7.0 * 24.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLimit {
    /// Percent of the window used, 0-100.
    pub utilization: f64,
    /// Unset before the window is first used.
    pub resets_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsageData {
    pub session: Option<UsageLimit>,
    pub weekly: Option<UsageLimit>,
    pub sonnet: Option<UsageLimit>,
    pub fetched_at: DateTime<Utc>,
}

/// What the refresh policy decided, for debug output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshNote {
    NoToken,
    RateLimited,
    ApiFailed,
    NoData,
}

impl RefreshNote {
    pub fn message(self) -> &'static str {
        match self {
            Self::NoToken => "No token, using cache",
            Self::RateLimited => "Rate limited, using cache",
            Self::ApiFailed => "API failed, using cache",
            Self::NoData => "No data available",
        }
    }
}

/// Result of [`refresh_usage`].
#[derive(Debug, Default)]
pub struct Refresh {
    pub data: Option<UsageData>,
    pub notes: Vec<RefreshNote>,
}

/// Fresh data when allowed and available, otherwise whatever is cached.
pub async fn refresh_usage(
    backend: &dyn UsageBackend,
    cache: Option<&UsageCache>,
    now: DateTime<Utc>,
) -> Refresh {
    let mut notes = Vec::new();
    let cached = cache.and_then(UsageCache::load);

    let Some(token) = backend.token().await else {
        notes.push(RefreshNote::NoToken);
        return Refresh {
            data: cached.and_then(|c| c.data),
            notes,
        };
    };

    let rate_limited = match (cache, &cached) {
        (Some(cache), Some(hit)) => cache.is_rate_limited(hit, now),
        _ => false,
    };
    if rate_limited {
        notes.push(RefreshNote::RateLimited);
        return Refresh {
            data: cached.and_then(|c| c.data),
            notes,
        };
    }

    let fresh = backend.fetch(&token).await;
    if fresh.is_none() {
        notes.push(RefreshNote::ApiFailed);
    }
    let data = fresh.or(cached.and_then(|c| c.data));

    if let Some(cache) = cache
        && let Err(e) = cache.save(data.as_ref(), now)
    {
        warn!("Failed to write usage cache {}: {e}", cache.path().display());
    }
    if data.is_none() {
        notes.push(RefreshNote::NoData);
    }
    debug!(?notes, "usage refresh");
    Refresh { data, notes }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    /// Time left, e.g. `2h 30m`.
    Remaining,
    /// Local reset time, e.g. `Thu 17:00`.
    ResetAt,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UsageOptions {
    pub show_session: bool,
    pub show_weekly: bool,
    pub show_sonnet: bool,
    pub show_reset_time: bool,
    pub multiline: bool,
    pub show_progress_bar: bool,
    pub bar_width: usize,
    pub session_time_format: TimeFormat,
    pub weekly_time_format: TimeFormat,
    pub sonnet_time_format: TimeFormat,
    /// Minimum seconds between fetch attempts.
    pub rate_limit: u64,
}

impl Default for UsageOptions {
    fn default() -> Self {
        Self {
            show_session: true,
            show_weekly: true,
            show_sonnet: false,
            show_reset_time: true,
            multiline: true,
            show_progress_bar: false,
            bar_width: 10,
            session_time_format: TimeFormat::Remaining,
            weekly_time_format: TimeFormat::ResetAt,
            sonnet_time_format: TimeFormat::ResetAt,
            rate_limit: 30,
        }
    }
}

struct Item<'a> {
    label: &'static str,
    short_label: &'static str,
    limit: &'a UsageLimit,
    window_hours: f64,
    time_format: TimeFormat,
}

pub struct UsageModule {
    backend: Box<dyn UsageBackend>,
    cache: Option<UsageCache>,
    options: UsageOptions,
    debug: bool,
    colors: bool,
}

impl UsageModule {
    pub fn new(ctx: &RenderContext, options: UsageOptions) -> Self {
        Self::with_backend(ctx, options, Box::new(AnthropicBackend::new()))
    }

    pub fn with_backend(
        ctx: &RenderContext,
        options: UsageOptions,
        backend: Box<dyn UsageBackend>,
    ) -> Self {
        Self {
            backend,
            cache: ctx
                .cache_dir
                .as_deref()
                .map(|dir| UsageCache::new(dir, options.rate_limit)),
            options,
            debug: ctx.debug,
            colors: ctx.colors,
        }
    }

    fn items<'a>(&self, data: &'a UsageData) -> Vec<Item<'a>> {
        let o = &self.options;
        let session = (o.show_session, &data.session, o.session_time_format);
        let weekly = (o.show_weekly, &data.weekly, o.weekly_time_format);
        let sonnet = (o.show_sonnet, &data.sonnet, o.sonnet_time_format);
        [
            (session, "Session:", "5h", SESSION_WINDOW_HOURS),
            (weekly, "Weekly:", "7d", WEEKLY_WINDOW_HOURS),
            (sonnet, "Sonnet:", "Sonnet", WEEKLY_WINDOW_HOURS),
        ]
        .into_iter()
        .filter_map(|((show, limit, time_format), label, short_label, window_hours)| {
            let limit = limit.as_ref().filter(|_| show)?;
            Some(Item {
                label,
                short_label,
                limit,
                window_hours,
                time_format,
            })
        })
        .collect()
    }

    fn dim(&self, text: &str) -> String {
        paint(text, Tone::Dim, self.colors)
    }

    /// `<label> [bar] NN% (time)`
    fn format_item(
        &self,
        label: &str,
        item: &Item<'_>,
        bar_width: usize,
        now: DateTime<Utc>,
    ) -> String {
        let percent = format!("{:.0}%", item.limit.utilization);
        let bar = if self.options.show_progress_bar {
            format!(" {}", format_progress_bar(item.limit.utilization, bar_width))
        } else {
            String::new()
        };

        let Some(resets_at) = item.limit.resets_at else {
            let time = if self.options.show_reset_time {
                self.dim(" (—)")
            } else {
                String::new()
            };
            return format!("{}{bar} {}{time}", self.dim(label), self.dim(&percent));
        };

        let remaining =
            (resets_at.signed_duration_since(now).num_seconds() as f64 / 3600.0).max(0.0);
        let tone = match calculate_color(item.limit.utilization, remaining, item.window_hours) {
            Urgency::High => Tone::Red,
            Urgency::Medium => Tone::Yellow,
            Urgency::Low => Tone::Green,
        };
        let time = if self.options.show_reset_time {
            let when = match item.time_format {
                TimeFormat::Remaining => format_remaining_time(remaining),
                TimeFormat::ResetAt => format_reset_at(resets_at),
            };
            self.dim(&format!(" ({when})"))
        } else {
            String::new()
        };
        format!("{}{bar} {}{time}", self.dim(label), paint(&percent, tone, self.colors))
    }

    fn render_multiline(&self, data: &UsageData, now: DateTime<Utc>) -> String {
        let items = self.items(data);
        let mut lines = vec![self.dim("Usage:")];
        for (i, item) in items.iter().enumerate() {
            let prefix = if i + 1 == items.len() { "└" } else { "├" };
            let label = format!("{:<8}", item.label);
            lines.push(format!(
                "{} {}",
                self.dim(prefix),
                self.format_item(&label, item, self.options.bar_width, now)
            ));
        }
        lines.join("\n")
    }

    fn render_single_line(&self, data: &UsageData, now: DateTime<Utc>) -> String {
        let parts: Vec<String> = self
            .items(data)
            .iter()
            .map(|item| self.format_item(item.short_label, item, self.options.bar_width / 2, now))
            .collect();
        format!("{}{}", self.dim("Usage: "), parts.join(self.dim(" | ").as_str()))
    }

    /// Render against a fixed clock.
    pub async fn render_at(&self, now: DateTime<Utc>) -> Option<String> {
        let refresh = refresh_usage(self.backend.as_ref(), self.cache.as_ref(), now).await;

        let mut parts = Vec::new();
        if let Some(data) = &refresh.data {
            parts.push(if self.options.multiline {
                self.render_multiline(data, now)
            } else {
                self.render_single_line(data, now)
            });
        }
        if self.debug {
            parts.extend(refresh.notes.iter().map(|note| {
                paint(&format!("[usage_limits] {}", note.message()), Tone::Yellow, self.colors)
            }));
        }
        (!parts.is_empty()).then(|| parts.join("\n"))
    }
}

#[async_trait]
impl Module for UsageModule {
    fn name(&self) -> &'static str {
        "usage_limits"
    }

    async fn render(&self) -> anyhow::Result<Option<String>> {
        Ok(self.render_at(Utc::now()).await)
    }
}

#[cfg(test)]
mod tests;
