/// Client-side state derived from delivered events.
///
/// Updated for every event, with or without a registered listener.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedState {
    pub prepared: bool,
    pub video_width: i32,
    pub video_height: i32,
    pub video_sar_num: i32,
    pub video_sar_den: i32,
    pub buffering_percent: i32,
    pub data_source: Option<String>,
}

/// Converts a buffered position into a percentage of `duration`.
pub(crate) fn buffering_percent(position: i64, duration: i64) -> i32 {
    if duration <= 0 {
        return 0;
    }
    let percent = position.max(0).saturating_mul(100) / duration;
    i32::try_from(percent.clamp(0, 100)).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::buffering_percent;

    #[test]
    fn percent_is_clamped() {
        assert_eq!(buffering_percent(-5, 1000), 0);
        assert_eq!(buffering_percent(250, 1000), 25);
        assert_eq!(buffering_percent(5000, 1000), 100);
        assert_eq!(buffering_percent(i64::MAX, 1), 100);
    }

    #[test]
    fn unknown_duration_reports_zero() {
        assert_eq!(buffering_percent(400, 0), 0);
        assert_eq!(buffering_percent(400, -1), 0);
    }
}
