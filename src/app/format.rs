pub(crate) fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}

/// `m:ss`, or `h:mm:ss` past the hour.
pub(crate) fn format_position(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

pub(crate) fn format_saved(position: Option<f64>) -> String {
    position
        .map(format_position)
        .unwrap_or_else(|| "-".to_string())
}

pub(crate) fn format_rating(rating: f64) -> String {
    format!("{rating:.1}")
}

pub(crate) fn build_progress_gauge(position: f64, duration: f64) -> Option<(f64, String)> {
    if !duration.is_finite() || duration <= 0.0 {
        return None;
    }
    let ratio = (position / duration).clamp(0.0, 1.0);
    Some((
        ratio,
        format!(
            "{} / {}",
            format_position(position),
            format_position(duration)
        ),
    ))
}
