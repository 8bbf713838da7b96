//! Expansion of weekly rules and exceptions into a service roster.

use chrono::{Datelike, Weekday};
use tracing::debug;

use super::ServiceCalendar;
use crate::feed::{CalendarDateRow, CalendarRow, ExceptionType};

const WEEK: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Builds a [`ServiceCalendar`] from calendar rules and exceptions.
///
/// Rules are expanded over `[start_date, end_date)`: the end date itself is
/// never produced by weekly expansion. Every date in that range gets an
/// entry, even when the rule does not run on it. Exceptions are applied in
/// the order given; an added service is appended (creating the date's
/// entry), a removed service loses its first listing, and removing a
/// service that was never listed does nothing.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use ttime::calendar::CalendarResolver;
/// use ttime::feed::CalendarRow;
///
/// let weekdays = CalendarRow {
///     service_id: "A".into(),
///     monday: true,
///     tuesday: false,
///     wednesday: false,
///     thursday: false,
///     friday: false,
///     saturday: false,
///     sunday: false,
///     start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///     end_date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
/// };
///
/// let calendar = CalendarResolver::new().with_rules([&weekdays]).finish();
///
/// let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let next_monday = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
/// assert!(calendar.runs_on(monday, "A"));
/// assert_eq!(calendar.on(next_monday), None);
/// ```
#[derive(Debug, Default)]
pub struct CalendarResolver {
    calendar: ServiceCalendar,
    rules: usize,
    exceptions: usize,
}

impl CalendarResolver {
    /// Creates a resolver with an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expands one weekly rule into the roster.
    pub fn add_rule(&mut self, rule: &CalendarRow) {
        self.rules += 1;

        // A rule valid for a single day is a special case, not regular service.
        if !rule.is_single_day() {
            for day in WEEK {
                if rule.runs_on(day) {
                    self.calendar.push_weekday(day, rule.service_id.clone());
                }
            }
        }

        let range = rule
            .start_date
            .iter_days()
            .take_while(|date| *date < rule.end_date);
        for date in range {
            let services = self.calendar.touch(date);
            if rule.runs_on(date.weekday()) {
                services.push(rule.service_id.clone());
            }
        }
    }

    /// Applies one single-date exception to the roster.
    pub fn apply_exception(&mut self, exception: &CalendarDateRow) {
        self.exceptions += 1;
        match exception.exception_type {
            ExceptionType::Added => {
                self.calendar
                    .touch(exception.date)
                    .push(exception.service_id.clone());
            }
            ExceptionType::Removed => {
                if !self.calendar.remove(exception.date, &exception.service_id) {
                    debug!(
                        service = %exception.service_id,
                        date = %exception.date,
                        "removed service was not scheduled"
                    );
                }
            }
        }
    }

    /// Expands every rule in `rules`.
    pub fn with_rules<'a>(mut self, rules: impl IntoIterator<Item = &'a CalendarRow>) -> Self {
        for rule in rules {
            self.add_rule(rule);
        }
        self
    }

    /// Applies every exception in `exceptions`, in order.
    pub fn with_exceptions<'a>(
        mut self,
        exceptions: impl IntoIterator<Item = &'a CalendarDateRow>,
    ) -> Self {
        for exception in exceptions {
            self.apply_exception(exception);
        }
        self
    }

    /// Returns the resolved roster.
    pub fn finish(self) -> ServiceCalendar {
        debug!(
            rules = self.rules,
            exceptions = self.exceptions,
            dates = self.calendar.dates().len(),
            "resolved calendar"
        );
        self.calendar
    }
}
