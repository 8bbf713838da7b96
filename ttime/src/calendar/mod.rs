//! Calendar resolution: which services run on which dates.
//!
//! Weekly rules from calendar.txt are expanded day by day into a
//! date-keyed roster, then single-date exceptions from calendar_dates.txt
//! add or remove services on top. A second, weekday-keyed summary records
//! which services run on a given day of the week in general.

mod resolver;
mod roster;

pub use resolver::CalendarResolver;
pub use roster::{ServiceCalendar, weekday_bucket};
