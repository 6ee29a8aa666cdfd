use chrono::{DateTime, TimeZone, Utc};

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 86_400_000;
const WEEK_MS: i64 = 604_800_000;

/// Formats `then` relative to `now`. Past a week the calendar date is shown in
/// `now`'s time zone.
pub fn format_relative<Tz: TimeZone>(then: DateTime<Utc>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let elapsed = now
        .with_timezone(&Utc)
        .signed_duration_since(then)
        .num_milliseconds();

    if elapsed < MINUTE_MS {
        return "just now".to_string();
    }
    if elapsed < HOUR_MS {
        return format!("{} minutes ago", elapsed / MINUTE_MS);
    }
    if elapsed < DAY_MS {
        return format!("{} hours ago", elapsed / HOUR_MS);
    }
    if elapsed < WEEK_MS {
        return format!("{} days ago", elapsed / DAY_MS);
    }

    then.with_timezone(&now.timezone())
        .format("%Y/%-m/%-d")
        .to_string()
}
