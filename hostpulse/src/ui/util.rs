//! Small UI helpers.

/// Percentage for a gauge; out-of-range and NaN values pin to the ends.
pub fn gauge_pct(v: f64) -> u16 {
    if v.is_nan() {
        return 0;
    }
    v.clamp(0.0, 100.0).round() as u16
}

pub fn truncate_middle(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max <= 3 {
        return "...".into();
    }
    let chars: Vec<char> = s.chars().collect();
    let keep = max - 3;
    let left = keep / 2;
    let right = keep - left;
    let head: String = chars[..left].iter().collect();
    let tail: String = chars[chars.len() - right..].iter().collect();
    format!("{head}...{tail}")
}
