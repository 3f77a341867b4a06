use time::{Date, OffsetDateTime};

/// Local wall-clock time. Falls back to UTC when the local offset can't be
/// determined (the `time` crate refuses on some multi-threaded platforms).
pub fn now_local() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

pub fn local_today() -> Date {
    now_local().date()
}
