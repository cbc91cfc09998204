use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};

use crate::api::Time;

fn sunday_on_or_before(d: NaiveDate) -> Option<NaiveDate> {
    d.checked_sub_signed(Duration::days(i64::from(
        d.weekday().num_days_from_sunday(),
    )))
}

/// Wall-clock time of `time` in timezone `tz`, if it is within chrono's range
pub fn local_datetime<Tz: TimeZone>(time: Time, tz: &Tz) -> Option<NaiveDateTime> {
    let utc = Utc.timestamp_opt(time, 0).single()?.naive_utc();
    let offset = tz.offset_from_utc_datetime(&utc).fix();
    utc.checked_add_signed(Duration::seconds(i64::from(offset.local_minus_utc())))
}

/// Week of the year of `time` as seen from timezone `tz`
///
/// Weeks run from Sunday to Saturday, and week 1 is the one containing
/// January 1st. This means the last days of December can be in week 1 of
/// the following year, and that some years have a week 53.
///
/// Returns `None` if `time` or its week cannot be represented as a date.
pub fn week_of_year<Tz: TimeZone>(time: Time, tz: &Tz) -> Option<u32> {
    let date = local_datetime(time, tz)?.date();
    let week_start = sunday_on_or_before(date)?;
    if date.month() == 12 && date.day() > 25 {
        let next_year = NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)?;
        if next_year <= week_start.checked_add_signed(Duration::days(6))? {
            return Some(1);
        }
    }
    let year_start = sunday_on_or_before(NaiveDate::from_ymd_opt(date.year(), 1, 1)?)?;
    let weeks = (date - year_start).num_days() / 7;
    u32::try_from(weeks + 1).ok()
}
