use chrono::{DateTime, Local, Utc};

const HOURS_PER_DAY: f64 = 24.0;
/// Points below the elapsed-time line that still count as "close".
const URGENCY_MARGIN: f64 = 10.0;

/// How far usage runs ahead of the elapsed share of its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    /// Usage exceeds the elapsed share of the window.
    High,
    /// Within ten points of it.
    Medium,
    Low,
}

#[must_use]
pub fn calculate_color(utilization: f64, remaining_hours: f64, window_hours: f64) -> Urgency {
    let time_percent = (1.0 - remaining_hours / window_hours) * 100.0;
    if utilization > time_percent {
        Urgency::High
    } else if utilization > time_percent - URGENCY_MARGIN {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

/// `45m`, `2h 30m`, or `5d 3h`.
#[must_use]
pub fn format_remaining_time(hours: f64) -> String {
    if hours < 1.0 {
        return format!("{}m", (hours * 60.0) as u64);
    }
    if hours < HOURS_PER_DAY {
        let h = hours.trunc();
        return format!("{}h {}m", h as u64, ((hours - h) * 60.0) as u64);
    }
    let days = (hours / HOURS_PER_DAY) as u64;
    format!("{days}d {}h", (hours % HOURS_PER_DAY) as u64)
}

/// Weekday and local time of the reset, e.g. `Thu 17:00`.
#[must_use]
pub fn format_reset_at(reset: DateTime<Utc>) -> String {
    reset.with_timezone(&Local).format("%a %H:%M").to_string()
}

/// `[███░░░░░░░]`, rounded down and clamped to the bar width.
#[must_use]
pub fn format_progress_bar(utilization: f64, width: usize) -> String {
    let filled = ((utilization / 100.0 * width as f64).floor().max(0.0) as usize).min(width);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(width - filled))
}
