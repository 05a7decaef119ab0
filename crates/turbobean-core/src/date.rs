//! Calendar date operations layered over [`chrono::NaiveDate`].
//!
//! ISO-week, quarter, month-name, and successor operations are added here
//! as an extension trait rather than a new date type, wrapping the
//! ecosystem type instead of replacing it.

use chrono::{Datelike, Months, NaiveDate};

/// Calendar-query and successor operations on [`NaiveDate`].
pub trait DateExt: Sized {
    /// The ISO 8601 week number (1..=53).
    fn iso_week_number(&self) -> u32;

    /// The calendar quarter (1..=4).
    fn quarter(&self) -> u32;

    /// The English month name, e.g. `"January"`.
    fn month_name(&self) -> &'static str;

    /// The next calendar day.
    fn next_day(&self) -> Option<Self>;

    /// The same weekday one week later.
    fn next_week(&self) -> Option<Self>;

    /// The same day-of-month one month later (clamped to the shorter month).
    fn next_month(&self) -> Option<Self>;

    /// The first day of the next quarter.
    fn next_quarter(&self) -> Option<Self>;

    /// The same month and day one year later.
    fn next_year(&self) -> Option<Self>;
}

impl DateExt for NaiveDate {
    fn iso_week_number(&self) -> u32 {
        self.iso_week().week()
    }

    fn quarter(&self) -> u32 {
        (self.month0() / 3) + 1
    }

    fn month_name(&self) -> &'static str {
        const NAMES: [&str; 12] = [
            "January",
            "February",
            "March",
            "April",
            "May",
            "June",
            "July",
            "August",
            "September",
            "October",
            "November",
            "December",
        ];
        NAMES[self.month0() as usize]
    }

    fn next_day(&self) -> Option<Self> {
        self.succ_opt()
    }

    fn next_week(&self) -> Option<Self> {
        self.checked_add_days(chrono::Days::new(7))
    }

    fn next_month(&self) -> Option<Self> {
        self.checked_add_months(Months::new(1))
    }

    fn next_quarter(&self) -> Option<Self> {
        let quarter_start_month0 = (self.quarter() - 1) * 3;
        let this_quarter_start = NaiveDate::from_ymd_opt(self.year(), quarter_start_month0 + 1, 1)?;
        this_quarter_start.checked_add_months(Months::new(3))
    }

    fn next_year(&self) -> Option<Self> {
        NaiveDate::from_ymd_opt(self.year() + 1, self.month(), self.day())
    }
}
