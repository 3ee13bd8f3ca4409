use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::calendar::{
    is_weekend, month_start, month_window_start, next_month_start, next_saturday_after, week_end, week_start,
    last_day_of_month,
};
use crate::models::quest_models::{Recurrence, SideQuestEvent};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub available: bool,
    pub reason: String,
    ///
    /// The next date at which the quest may be submitted. Equal to the
    /// queried date when it is available now; `None` when no future
    /// window is known (eg. a sidequest without a scheduled event)
    ///
    pub next_available: Option<NaiveDate>,
}

impl Availability {
    fn open(date: NaiveDate) -> Self {
        Self { available: true, reason: "Available".to_string(), next_available: Some(date) }
    }

    fn closed(reason: impl Into<String>, next_available: Option<NaiveDate>) -> Self {
        Self { available: false, reason: reason.into(), next_available }
    }
}

///
/// The span within which a quest may be accepted at most once
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

///
/// Decides whether a quest of the given recurrence class may accept a
/// submission on `date`. Pure: the same inputs always yield the same answer,
/// so ingestion and any later lock check agree on every boundary date.
///
/// `event` is the sidequest event covering the quest, if one has been
/// generated. It is ignored for the other classes.
///
pub fn is_available(recurrence: Recurrence, date: NaiveDate, event: Option<&SideQuestEvent>) -> Availability {
    match recurrence {
        Recurrence::Daily => Availability::open(date),
        Recurrence::Weekly => {
            if is_weekend(date) {
                Availability::open(date)
            } else {
                Availability::closed("Weekly quests open on Saturday and Sunday", Some(next_saturday_after(date)))
            }
        }
        Recurrence::Monthly => {
            let window = month_window_start(date);
            if date >= window {
                Availability::open(date)
            } else {
                Availability::closed("Monthly quests open during the last 3 days of the month", Some(window))
            }
        }
        Recurrence::Sidequest => match event {
            Some(ev) if ev.is_open_on(date) => Availability::open(date),
            Some(ev) if ev.starts_on > date => Availability::closed("Sidequest event has not started", Some(ev.starts_on)),
            Some(_) => Availability::closed("Sidequest event has expired", None),
            None => Availability::closed("No active sidequest event", None),
        },
    }
}

///
/// The exclusivity period of a quest submitted on `date`
///
pub fn period_bounds(recurrence: Recurrence, date: NaiveDate, event: Option<&SideQuestEvent>) -> Period {
    match recurrence {
        Recurrence::Daily => Period { start: date, end: date },
        Recurrence::Weekly => Period { start: week_start(date), end: week_end(date) },
        Recurrence::Monthly => Period { start: month_start(date), end: last_day_of_month(date) },
        Recurrence::Sidequest => match event {
            Some(ev) => Period { start: ev.starts_on, end: ev.expires_on },
            None => Period { start: date, end: date },
        },
    }
}

///
/// The first date at which the quest opens again once the period containing
/// `date` has been used up
///
pub fn next_period_opening(recurrence: Recurrence, date: NaiveDate) -> Option<NaiveDate> {
    match recurrence {
        Recurrence::Daily => Some(date + Duration::days(1)),
        Recurrence::Weekly => Some(next_saturday_after(week_end(date))),
        Recurrence::Monthly => Some(month_window_start(next_month_start(date))),
        Recurrence::Sidequest => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn daily_is_always_available() {
        for day in 1..=31 {
            assert!(is_available(Recurrence::Daily, d(2024, 5, day), None).available);
        }
    }

    #[test]
    fn weekly_opens_on_weekend_only() {
        // 2024-05-17 is a Friday
        let fri = is_available(Recurrence::Weekly, d(2024, 5, 17), None);
        assert!(!fri.available);
        assert_eq!(fri.next_available, Some(d(2024, 5, 18)));

        assert!(is_available(Recurrence::Weekly, d(2024, 5, 18), None).available);
        assert!(is_available(Recurrence::Weekly, d(2024, 5, 19), None).available);
        assert!(!is_available(Recurrence::Weekly, d(2024, 5, 20), None).available);
    }

    #[test]
    fn monthly_opens_in_last_three_days() {
        // May has 31 days: 29th, 30th, 31st are open
        let third_to_last = is_available(Recurrence::Monthly, d(2024, 5, 29), None);
        assert!(third_to_last.available);
        assert!(is_available(Recurrence::Monthly, d(2024, 5, 31), None).available);

        let fourth_to_last = is_available(Recurrence::Monthly, d(2024, 5, 28), None);
        assert!(!fourth_to_last.available);
        assert_eq!(fourth_to_last.next_available, Some(d(2024, 5, 29)));
    }

    #[test]
    fn sidequest_requires_open_event() {
        let date = d(2024, 5, 10);
        assert!(!is_available(Recurrence::Sidequest, date, None).available);

        let ev = SideQuestEvent { id: 1, quest_id: 1, starts_on: d(2024, 5, 9), expires_on: d(2024, 5, 11) };
        assert!(is_available(Recurrence::Sidequest, date, Some(&ev)).available);
        assert!(!is_available(Recurrence::Sidequest, d(2024, 5, 12), Some(&ev)).available);

        let later = is_available(Recurrence::Sidequest, d(2024, 5, 1), Some(&ev));
        assert_eq!(later.next_available, Some(d(2024, 5, 9)));
    }

    #[test]
    fn unknown_recurrence_behaves_as_daily() {
        let r = Recurrence::parse("fortnightly");
        assert_eq!(r, Recurrence::Daily);
        assert!(is_available(r, d(2024, 5, 15), None).available);
    }

    #[test]
    fn gate_is_pure() {
        for day in 1..=31 {
            let date = d(2024, 5, day);
            for r in [Recurrence::Daily, Recurrence::Weekly, Recurrence::Monthly, Recurrence::Sidequest] {
                assert_eq!(is_available(r, date, None), is_available(r, date, None));
            }
        }
    }

    #[test]
    fn period_bounds_per_class() {
        let sat = d(2024, 5, 18);
        assert_eq!(period_bounds(Recurrence::Daily, sat, None), Period { start: sat, end: sat });
        assert_eq!(period_bounds(Recurrence::Weekly, sat, None), Period { start: d(2024, 5, 13), end: d(2024, 5, 19) });
        assert_eq!(period_bounds(Recurrence::Monthly, sat, None), Period { start: d(2024, 5, 1), end: d(2024, 5, 31) });
    }

    #[test]
    fn next_period_openings() {
        assert_eq!(next_period_opening(Recurrence::Daily, d(2024, 5, 31)), Some(d(2024, 6, 1)));
        assert_eq!(next_period_opening(Recurrence::Weekly, d(2024, 5, 18)), Some(d(2024, 5, 25)));
        assert_eq!(next_period_opening(Recurrence::Monthly, d(2024, 5, 30)), Some(d(2024, 6, 28)));
        assert_eq!(next_period_opening(Recurrence::Sidequest, d(2024, 5, 30)), None);
    }
}
