use chrono::{DateTime, Local, Offset, TimeZone};

/// Current wall-clock time as `YYYY-MM-DDThh:mm:ss±hh:mm`.
pub fn now_timestamp() -> String {
    format_timestamp(&Local::now())
}

/// Render `at` in its own zone, seconds precision, explicit UTC offset.
pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    let east_secs = at.offset().fix().local_minus_utc();
    // Raw offset follows the "minutes behind UTC" convention: positive west.
    let raw_offset_minutes = -east_secs / 60;
    format!(
        "{}{}",
        at.naive_local().format("%Y-%m-%dT%H:%M:%S"),
        format_utc_offset(raw_offset_minutes)
    )
}

/// `raw_offset_minutes` is minutes to add to local time to reach UTC, so its
/// sign is the negation of the printed one: -120 prints `+02:00`.
pub fn format_utc_offset(raw_offset_minutes: i32) -> String {
    let sign = if raw_offset_minutes <= 0 { '+' } else { '-' };
    let abs = raw_offset_minutes.unsigned_abs();
    format!("{sign}{:02}:{:02}", abs / 60, abs % 60)
}
