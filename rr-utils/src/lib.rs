//! Shared utility functions for RiverRunner crates.

/// Date and timestamp utility functions
pub mod dates {
    use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    /// Timestamp format used for every `date_time`/`timestamp` column in the
    /// database. Always UTC, so lexical order equals chronological order.
    pub const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// Day format used for prediction rows and CLI arguments.
    pub const DAY_FORMAT: &str = "%Y-%m-%d";

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format(DAY_FORMAT).to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s.trim(), DAY_FORMAT)?)
    }

    /// Format a UTC timestamp for storage.
    pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
        ts.format(DB_TIMESTAMP_FORMAT).to_string()
    }

    /// Parse a timestamp coming from a CSV file, an API response or the database.
    ///
    /// Accepted shapes, all normalized to UTC:
    /// - RFC 3339 with offset, e.g. `2018-05-01T12:00:00.000-07:00` (USGS)
    /// - `YYYY-MM-DD HH:MM:SS+HH:MM`
    /// - naive `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DDTHH:MM:SS`, read as UTC
    /// - bare `YYYY-MM-DD`, read as midnight UTC
    pub fn parse_timestamp(s: &str) -> anyhow::Result<DateTime<Utc>> {
        let s = s.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
            return Ok(ts.with_timezone(&Utc));
        }
        if let Ok(ts) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
            return Ok(ts.with_timezone(&Utc));
        }
        for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(Utc.from_utc_datetime(&naive));
            }
        }
        match NaiveDate::parse_from_str(s, DAY_FORMAT) {
            Ok(day) => Ok(midnight_utc(day)),
            Err(_) => anyhow::bail!("unrecognized timestamp: {:?}", s),
        }
    }

    /// Midnight UTC at the start of `day`.
    pub fn midnight_utc(day: NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
    }

    /// The `[start, end)` window covering `days` whole days before the day of `now`.
    ///
    /// `end` is midnight of the current day, so today's partial data is excluded.
    pub fn lookback_window(now: DateTime<Utc>, days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
        let end = midnight_utc(now.date_naive());
        let start = end - Duration::days(i64::from(days));
        (start, end)
    }

    /// An iterator over consecutive calendar days, inclusive on both ends.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DayRange {
        next: NaiveDate,
        last: NaiveDate,
    }

    impl DayRange {
        pub fn inclusive(first: NaiveDate, last: NaiveDate) -> Self {
            DayRange { next: first, last }
        }

        /// The `count` days immediately after `day`.
        pub fn following(day: NaiveDate, count: u32) -> Self {
            DayRange {
                next: day + Duration::days(1),
                last: day + Duration::days(i64::from(count)),
            }
        }
    }

    impl Iterator for DayRange {
        type Item = NaiveDate;

        fn next(&mut self) -> Option<Self::Item> {
            if self.next > self.last {
                return None;
            }
            let current = self.next;
            match current.succ_opt() {
                Some(next) => self.next = next,
                None => self.last = NaiveDate::MIN,
            }
            Some(current)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::Timelike;

        #[test]
        fn test_parse_usgs_offset_timestamp() {
            let ts = parse_timestamp("2018-05-01T12:15:00.000-07:00").unwrap();
            assert_eq!(format_timestamp(&ts), "2018-05-01 19:15:00");
        }

        #[test]
        fn test_parse_naive_timestamp_is_utc() {
            let ts = parse_timestamp("2018-05-01 23:59:59").unwrap();
            assert_eq!(ts.hour(), 23);
            assert_eq!(ts.date_naive(), NaiveDate::from_ymd_opt(2018, 5, 1).unwrap());

            let t = parse_timestamp("2018-05-01T06:00:00").unwrap();
            assert_eq!(t.hour(), 6);
        }

        #[test]
        fn test_parse_bare_date_is_midnight() {
            let ts = parse_timestamp("2018-05-01").unwrap();
            assert_eq!(format_timestamp(&ts), "2018-05-01 00:00:00");
        }

        #[test]
        fn test_parse_garbage_fails() {
            assert!(parse_timestamp("yesterday").is_err());
            assert!(parse_timestamp("").is_err());
        }

        #[test]
        fn test_stored_format_round_trips() {
            let ts = parse_timestamp("2020-02-29 08:30:00").unwrap();
            assert_eq!(parse_timestamp(&format_timestamp(&ts)).unwrap(), ts);
        }

        #[test]
        fn test_lookback_window_excludes_today() {
            let now = parse_timestamp("2018-05-10T15:42:00Z").unwrap();
            let (start, end) = lookback_window(now, 4 * 365);
            assert_eq!(format_timestamp(&end), "2018-05-10 00:00:00");
            assert_eq!((end - start).num_days(), 1460);
        }

        #[test]
        fn test_day_range_inclusive() {
            let start = NaiveDate::from_ymd_opt(2022, 1, 30).unwrap();
            let end = NaiveDate::from_ymd_opt(2022, 2, 2).unwrap();
            let days: Vec<NaiveDate> = DayRange::inclusive(start, end).collect();
            assert_eq!(days.len(), 4);
            assert_eq!(days[3], end);
        }

        #[test]
        fn test_day_range_following() {
            let origin = NaiveDate::from_ymd_opt(2018, 12, 28).unwrap();
            let days: Vec<NaiveDate> = DayRange::following(origin, 7).collect();
            assert_eq!(days.len(), 7);
            assert_eq!(days[0], NaiveDate::from_ymd_opt(2018, 12, 29).unwrap());
            assert_eq!(days[6], NaiveDate::from_ymd_opt(2019, 1, 4).unwrap());
            assert_eq!(DayRange::following(origin, 0).count(), 0);
        }

        #[test]
        fn test_format_and_parse() {
            let date = NaiveDate::from_ymd_opt(2023, 6, 15).unwrap();
            let formatted = format_date(&date);
            assert_eq!(formatted, "2023-06-15");
            assert_eq!(parse_date(&formatted).unwrap(), date);
        }
    }
}

/// Numeric helpers
pub mod numeric {
    /// Round to one decimal place, the precision predictions are stored with.
    pub fn round1(value: f64) -> f64 {
        (value * 10.0).round() / 10.0
    }

    /// Arithmetic mean, `None` for an empty slice.
    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }

}
