//! Rounding, report titles and window bounds

use crate::timeline::TimeRange;

/// Round to two decimals.
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Per-second rate rounded to two decimals and truncated; 0 for no time.
#[inline]
pub fn rate(total: i64, seconds: f64) -> i64 {
    if seconds > 0.0 {
        round2(total as f64 / seconds) as i64
    } else {
        0
    }
}

/// `part / whole` as a percentage rounded to two decimals; 0 for no whole.
#[inline]
pub fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { round2(part / whole * 100.0) } else { 0.0 }
}

/// 999, 1.5K, 2.35M, 1B
pub fn format_totals(total: i64) -> String {
    let abs = total.unsigned_abs();
    let (scaled, suffix) = if abs < 1_000 {
        return total.to_string();
    } else if abs < 1_000_000 {
        (total as f64 / 1_000.0, "K")
    } else if abs < 1_000_000_000 {
        (total as f64 / 1_000_000.0, "M")
    } else {
        (total as f64 / 1_000_000_000.0, "B")
    };

    let text = format!("{:.2}", round2(scaled));
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text}{suffix}")
}

pub fn time_title(seconds: f64) -> String {
    format!("in {seconds}s")
}

pub fn total_title(total: i64, label: &str, per_second: i64) -> String {
    format!("{} {} @{}", format_totals(total), label, format_totals(per_second))
}

pub fn target_title(first_name: &str, fight_count: usize) -> String {
    if fight_count > 1 {
        format!("Combined ({fight_count}): {first_name}")
    } else {
        first_name.to_string()
    }
}

/// `target time, totals`, skipping empty parts.
pub fn format_title(target: &str, time: &str, totals: &str) -> String {
    let mut title = target.to_string();
    if !time.is_empty() {
        title.push(' ');
        title.push_str(time);
    }
    if !totals.is_empty() {
        title.push_str(", ");
        title.push_str(totals);
    }
    title
}

/// Whether a relative `[min, max]` window narrows a selection lasting
/// `max_time` seconds.
pub fn window_applies(min: Option<f64>, max: Option<f64>, max_time: f64) -> bool {
    max.is_some_and(|m| m >= 0.0 && m < max_time && m != max_time.trunc())
        || min.is_some_and(|m| m > 0.0 && m < max_time)
}

/// Translate seconds into the fight (counted on the bridged raid timeline)
/// into absolute start and stop times.
pub fn window_bounds(raid: &TimeRange, min: Option<f64>, max: Option<f64>) -> (Option<f64>, Option<f64>) {
    let mut start = None;
    let mut stop = None;
    let mut accum = 0.0;

    for seg in raid.bridged().segments() {
        let total = seg.total();
        if start.is_none()
            && let Some(min) = min.filter(|m| *m > 0.0)
            && accum + total > min
        {
            start = Some(seg.begin + (min - accum));
        }
        if stop.is_none()
            && let Some(max) = max
            && accum + total >= max
        {
            stop = Some(seg.begin + (max - accum) - 1.0);
        }
        accum += total;
    }

    (start, stop)
}
