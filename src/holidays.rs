//! French Public Holidays
//!
//! The eleven non-working public holidays of metropolitan France, three of
//! which move with Easter.

use chrono::{Datelike, Days, NaiveDate, Weekday};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: &'static str,
}

/// Gregorian years with a four-digit date key
const COMPUTUS_YEARS: std::ops::RangeInclusive<i32> = 1583..=9999;

/// Easter Sunday (anonymous Gregorian computus); `None` outside 1583..=9999
pub fn easter(year: i32) -> Option<NaiveDate> {
    if !COMPUTUS_YEARS.contains(&year) {
        return None;
    }
    let g = year % 19;
    let c = year / 100;
    let h = (c - c / 4 - (8 * c + 13) / 25 + 19 * g + 15) % 30;
    let i = h - (h / 28) * (1 - (29 / (h + 1)) * ((21 - g) / 11));
    let j = (year + year / 4 + i + 2 - c + c / 4) % 7;
    let l = i - j;
    let month = 3 + (l + 40) / 44;
    let day = l + 28 - 31 * (month / 4);
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

pub fn french_holidays(year: i32) -> Vec<Holiday> {
    let fixed = [
        (1, 1, "Jour de l'An"),
        (5, 1, "Fête du Travail"),
        (5, 8, "Victoire 1945"),
        (7, 14, "Fête Nationale"),
        (8, 15, "Assomption"),
        (11, 1, "Toussaint"),
        (11, 11, "Armistice 1918"),
        (12, 25, "Noël"),
    ];
    let movable = [
        (1, "Lundi de Pâques"),
        (39, "Ascension"),
        (50, "Lundi de Pentecôte"),
    ];

    let mut holidays: Vec<Holiday> = fixed
        .iter()
        .filter_map(|&(month, day, name)| {
            NaiveDate::from_ymd_opt(year, month, day).map(|date| Holiday { date, name })
        })
        .collect();
    if let Some(easter) = easter(year) {
        holidays.extend(movable.iter().filter_map(|&(offset, name)| {
            easter
                .checked_add_days(Days::new(offset))
                .map(|date| Holiday { date, name })
        }));
    }
    holidays.sort_by_key(|holiday| holiday.date);
    holidays
}

pub fn holiday_on(date: NaiveDate) -> Option<Holiday> {
    french_holidays(date.year())
        .into_iter()
        .find(|holiday| holiday.date == date)
}

/// Weekend or public holiday
pub fn is_off_day(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun) || holiday_on(date).is_some()
}

/// Working days of a month, excluding weekends and public holidays
pub fn billable_days_in_month(year: i32, month: u32) -> u32 {
    let holidays = french_holidays(year);
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return 0;
    };

    first
        .iter_days()
        .take_while(|date| date.month() == month)
        .filter(|date| !matches!(date.weekday(), Weekday::Sat | Weekday::Sun))
        .filter(|date| !holidays.iter().any(|holiday| holiday.date == *date))
        .count() as u32
}
