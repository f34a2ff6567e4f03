//! Working-day window resolution.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Working window `[start, end)` of one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Resolve local working hours on `date` into UTC instants.
    ///
    /// An end time at or before the start time is taken to fall on the next
    /// day (e.g. 22:00 to 02:00). Returns `None` if the local time does not
    /// exist at that offset.
    pub fn resolve(
        date: NaiveDate,
        day_start: NaiveTime,
        day_end: NaiveTime,
        offset: FixedOffset,
    ) -> Option<Self> {
        let start = offset
            .from_local_datetime(&date.and_time(day_start))
            .single()?
            .with_timezone(&Utc);
        let mut end = offset
            .from_local_datetime(&date.and_time(day_end))
            .single()?
            .with_timezone(&Utc);

        if end <= start {
            end += Duration::days(1);
        }

        Some(Self { start, end })
    }

    /// The part of the window at or after `now`. `None` once the window has passed.
    pub fn remaining_after(&self, now: DateTime<Utc>) -> Option<Self> {
        let start = self.start.max(now);
        (start < self.end).then_some(Self {
            start,
            end: self.end,
        })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Local working hours at a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    pub day_start: NaiveTime,
    pub day_end: NaiveTime,
    pub offset: FixedOffset,
}

impl WorkingHours {
    pub fn new(day_start: NaiveTime, day_end: NaiveTime, offset: FixedOffset) -> Self {
        Self {
            day_start,
            day_end,
            offset,
        }
    }

    /// Working window of `date`.
    pub fn window_for(&self, date: NaiveDate) -> Option<DayWindow> {
        DayWindow::resolve(date, self.day_start, self.day_end, self.offset)
    }

    /// The local calendar day of `date`, stretched to the end of a working
    /// window that runs past midnight. Blocks filed under `date` lie here.
    pub fn day_span(&self, date: NaiveDate) -> Option<DayWindow> {
        let day = DayWindow::resolve(date, NaiveTime::MIN, NaiveTime::MIN, self.offset)?;
        let work = self.window_for(date)?;
        Some(DayWindow {
            start: day.start.min(work.start),
            end: day.end.max(work.end),
        })
    }
}

impl Default for WorkingHours {
    /// 08:00 to 18:00 UTC
    fn default() -> Self {
        Self {
            day_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            day_end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
            offset: Utc.fix(),
        }
    }
}

/// Parse an `HH:MM` wall-clock time.
pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    let (hour, minute) = value.trim().split_once(':')?;
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn test_resolve_utc_window() {
        let w = DayWindow::resolve(
            date(),
            parse_hhmm("08:00").unwrap(),
            parse_hhmm("18:00").unwrap(),
            FixedOffset::east_opt(0).unwrap(),
        )
        .unwrap();
        assert_eq!(w.start, Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap());
        assert_eq!(w.duration(), Duration::hours(10));
    }

    #[test]
    fn test_resolve_with_offset() {
        // 09:00 at UTC+09:00 is 00:00 UTC
        let w = DayWindow::resolve(
            date(),
            parse_hhmm("09:00").unwrap(),
            parse_hhmm("17:00").unwrap(),
            FixedOffset::east_opt(9 * 3600).unwrap(),
        )
        .unwrap();
        assert_eq!(w.start, Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(w.end, Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_resolve_crosses_midnight() {
        let w = DayWindow::resolve(
            date(),
            parse_hhmm("22:00").unwrap(),
            parse_hhmm("02:00").unwrap(),
            FixedOffset::east_opt(0).unwrap(),
        )
        .unwrap();
        assert_eq!(w.end, Utc.with_ymd_and_hms(2025, 3, 11, 2, 0, 0).unwrap());
    }

    #[test]
    fn test_remaining_after() {
        let w = DayWindow {
            start: Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 3, 10, 18, 0, 0).unwrap(),
        };
        let noon = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(w.remaining_after(noon).unwrap().start, noon);

        let early = Utc.with_ymd_and_hms(2025, 3, 10, 6, 0, 0).unwrap();
        assert_eq!(w.remaining_after(early).unwrap(), w);

        let late = Utc.with_ymd_and_hms(2025, 3, 10, 19, 0, 0).unwrap();
        assert!(w.remaining_after(late).is_none());
    }

    #[test]
    fn test_default_working_hours() {
        let w = WorkingHours::default().window_for(date()).unwrap();
        assert_eq!(w.start, Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap());
        assert_eq!(w.end, Utc.with_ymd_and_hms(2025, 3, 10, 18, 0, 0).unwrap());
    }

    #[test]
    fn test_day_span_covers_late_working_hours() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let plain = WorkingHours::default().day_span(date()).unwrap();
        assert_eq!(plain.start, Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(plain.end, Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap());

        let night = WorkingHours::new(parse_hhmm("22:00").unwrap(), parse_hhmm("02:00").unwrap(), utc);
        let span = night.day_span(date()).unwrap();
        assert_eq!(span.start, plain.start);
        assert_eq!(span.end, Utc.with_ymd_and_hms(2025, 3, 11, 2, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_hhmm() {
        assert_eq!(parse_hhmm("07:30"), NaiveTime::from_hms_opt(7, 30, 0));
        assert!(parse_hhmm("7").is_none());
        assert!(parse_hhmm("25:00").is_none());
        assert!(parse_hhmm("ab:cd").is_none());
    }
}
