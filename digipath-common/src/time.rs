//! Clock helpers

use chrono::{DateTime, NaiveDate, Utc};

/// Current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC calendar date
///
/// Upcoming/past listings split on this date: a session dated today is
/// still upcoming.
pub fn today() -> NaiveDate {
    now().date_naive()
}
