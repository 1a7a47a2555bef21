use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Calendar date of an ISO-8601 date or date-time string.
///
/// Time of day and any UTC offset are dropped; the date is taken as written, so
/// `2024-01-01T23:30:00-05:00` is 2024-01-01.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();

    if let Ok(d) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return Some(d);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local().date());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, day)
    }

    #[test]
    fn plain_date() {
        assert_eq!(parse_calendar_date("2024-01-01"), d(2024, 1, 1));
        assert_eq!(parse_calendar_date(" 2024-12-31 "), d(2024, 12, 31));
    }

    #[test]
    fn datetime_without_offset() {
        assert_eq!(parse_calendar_date("2024-01-07T00:00:00"), d(2024, 1, 7));
        assert_eq!(parse_calendar_date("2024-01-07T13:45:10.123"), d(2024, 1, 7));
        assert_eq!(parse_calendar_date("2024-01-07 08:00:00"), d(2024, 1, 7));
    }

    #[test]
    fn offset_is_ignored() {
        assert_eq!(parse_calendar_date("2024-01-07T10:00:00Z"), d(2024, 1, 7));
        assert_eq!(parse_calendar_date("2024-01-07T23:30:00-05:00"), d(2024, 1, 7));
        assert_eq!(parse_calendar_date("2024-01-07T01:00:00+07:00"), d(2024, 1, 7));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_calendar_date(""), None);
        assert_eq!(parse_calendar_date("yesterday"), None);
        assert_eq!(parse_calendar_date("2024-13-01"), None);
        assert_eq!(parse_calendar_date("2024-02-30"), None);
    }
}
