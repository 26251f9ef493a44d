use chrono::{DateTime, Datelike, Timelike};

const MICROS_PER_SECOND: i64 = 1_000_000;

/// Whole seconds since the epoch, flooring sub-second precision.
pub fn epoch_seconds(micros: i64) -> i64 {
    micros.div_euclid(MICROS_PER_SECOND)
}

/// Hour of day (0..=23) in UTC.
pub fn hour_of(micros: i64) -> Option<u32> {
    DateTime::from_timestamp_micros(micros).map(|dt| dt.hour())
}

/// Day of week in UTC, 0 = Monday … 6 = Sunday.
pub fn day_of_week(micros: i64) -> Option<u32> {
    DateTime::from_timestamp_micros(micros).map(|dt| dt.weekday().num_days_from_monday())
}

/// Hour and weekday of each pickup, computed once per batch and shared by
/// every calendar flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickupCalendar {
    pub hours: Vec<Option<u32>>,
    pub days: Vec<Option<u32>>,
}

impl PickupCalendar {
    pub fn from_micros<I>(pickups: I) -> Self
    where
        I: IntoIterator<Item = Option<i64>>,
    {
        let (hours, days) = pickups
            .into_iter()
            .map(|ts| (ts.and_then(hour_of), ts.and_then(day_of_week)))
            .unzip();
        PickupCalendar { hours, days }
    }

    pub fn len(&self) -> usize {
        self.hours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> i64 {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s)
            .single()
            .unwrap()
            .timestamp_micros()
    }

    #[test]
    fn test_epoch_seconds_floors() {
        assert_eq!(epoch_seconds(1_500_000), 1);
        assert_eq!(epoch_seconds(-1), -1);
        assert_eq!(epoch_seconds(-1_000_000), -1);
        assert_eq!(epoch_seconds(0), 0);
    }

    #[test]
    fn test_hour_of_every_hour() {
        for h in 0..24 {
            assert_eq!(hour_of(ts(2013, 9, 1, h, 30, 0)), Some(h));
        }
    }

    #[test]
    fn test_day_of_week_all_buckets() {
        // 2013-09-02 was a Monday
        let expected = [
            (2, 0), // Monday
            (3, 1),
            (4, 2),
            (5, 3),
            (6, 4),
            (7, 5),
            (8, 6), // Sunday
        ];
        for (day, dow) in expected {
            assert_eq!(day_of_week(ts(2013, 9, day, 12, 0, 0)), Some(dow), "day {}", day);
        }
        // the last microsecond of Sunday is still Sunday
        assert_eq!(day_of_week(ts(2013, 9, 9, 0, 0, 0) - 1), Some(6));
    }

    #[test]
    fn test_pickup_calendar_nulls() {
        let cal = PickupCalendar::from_micros(vec![Some(ts(2013, 9, 1, 23, 59, 59)), None]);
        assert_eq!(cal.len(), 2);
        assert_eq!(cal.hours, vec![Some(23), None]);
        assert_eq!(cal.days, vec![Some(6), None]);
    }
}
