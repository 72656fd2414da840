use time::{format_description::FormatItem, macros::format_description, OffsetDateTime, UtcOffset};

const ISO_MILLIS: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

/// Current UTC time as ISO-8601 with millisecond precision.
pub fn now_iso() -> Result<String, time::error::Format> {
    format_iso(OffsetDateTime::now_utc())
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i128 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000
}

pub fn format_iso(at: OffsetDateTime) -> Result<String, time::error::Format> {
    at.to_offset(UtcOffset::UTC).format(ISO_MILLIS)
}
