use chrono::{Datelike, Duration, FixedOffset, NaiveDate, Utc, Weekday};

///
/// The current game day in the given timezone
///
pub fn today_in(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}

///
/// Monday of the Monday–Sunday week containing `date`
///
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

pub fn week_end(date: NaiveDate) -> NaiveDate {
    week_start(date) + Duration::days(6)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 { (date.year() + 1, 1) } else { (date.year(), date.month() + 1) };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

pub fn next_month_start(date: NaiveDate) -> NaiveDate {
    last_day_of_month(date) + Duration::days(1)
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

///
/// The first day of the closing window of the month (third-to-last day)
///
pub fn month_window_start(date: NaiveDate) -> NaiveDate {
    last_day_of_month(date) - Duration::days(2)
}

///
/// The first Saturday strictly after `date`
///
pub fn next_saturday_after(date: NaiveDate) -> NaiveDate {
    let mut d = date + Duration::days(1);
    while d.weekday() != Weekday::Sat {
        d += Duration::days(1);
    }
    d
}
