//! The resolved service roster.

use std::collections::{BTreeMap, HashSet};

use chrono::{NaiveDate, Weekday};

use crate::domain::ServiceId;

/// Index of a weekday bucket, counting from Sunday as 0.
///
/// # Examples
///
/// ```
/// use chrono::Weekday;
/// use ttime::calendar::weekday_bucket;
///
/// assert_eq!(weekday_bucket(Weekday::Sun), 0);
/// assert_eq!(weekday_bucket(Weekday::Mon), 1);
/// assert_eq!(weekday_bucket(Weekday::Sat), 6);
/// ```
pub fn weekday_bucket(day: Weekday) -> usize {
    day.num_days_from_sunday() as usize
}

/// Services active per date, plus a per-weekday summary of regular service.
///
/// The date entries are the exception-adjusted answer. The weekday buckets
/// only list services with a multi-day validity window; one-off services are
/// left out so they are not mistaken for regular weekly service.
///
/// Lists may hold a service more than once until
/// [`ServiceCalendar::retain_services`] is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceCalendar {
    weekdays: [Vec<ServiceId>; 7],
    dates: BTreeMap<NaiveDate, Vec<ServiceId>>,
}

impl ServiceCalendar {
    /// Creates an empty calendar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Services running on this day of the week in general.
    pub fn weekday(&self, day: Weekday) -> &[ServiceId] {
        &self.weekdays[weekday_bucket(day)]
    }

    /// Services active on `date`, or `None` when no rule touched it.
    pub fn on(&self, date: NaiveDate) -> Option<&[ServiceId]> {
        self.dates.get(&date).map(Vec::as_slice)
    }

    /// Every touched date with its active services, in date order.
    pub fn dates(&self) -> &BTreeMap<NaiveDate, Vec<ServiceId>> {
        &self.dates
    }

    /// Whether `service` is listed on `date`.
    pub fn runs_on(&self, date: NaiveDate, service: &str) -> bool {
        self.on(date)
            .is_some_and(|services| services.iter().any(|s| s == service))
    }

    pub(crate) fn push_weekday(&mut self, day: Weekday, service: ServiceId) {
        self.weekdays[weekday_bucket(day)].push(service);
    }

    /// Returns the date's list, creating it empty on first touch.
    pub(crate) fn touch(&mut self, date: NaiveDate) -> &mut Vec<ServiceId> {
        self.dates.entry(date).or_default()
    }

    /// Removes the first listing of `service` on `date`, if any.
    ///
    /// Returns whether anything was removed. A date that was never touched
    /// stays untouched.
    pub(crate) fn remove(&mut self, date: NaiveDate, service: &str) -> bool {
        let Some(services) = self.dates.get_mut(&date) else {
            return false;
        };
        match services.iter().position(|s| s == service) {
            Some(index) => {
                services.remove(index);
                true
            }
            None => false,
        }
    }

    /// Prunes every bucket down to the services in `realized`.
    ///
    /// Repeated listings collapse to the first one. Dates whose list ends
    /// up empty keep their (empty) entry.
    pub fn retain_services(&mut self, realized: &HashSet<ServiceId>) {
        let lists = self.weekdays.iter_mut().chain(self.dates.values_mut());
        for services in lists {
            let mut seen = HashSet::new();
            services.retain(|s| realized.contains(s) && seen.insert(s.clone()));
        }
    }

    /// Flattens the roster into one string-keyed map.
    ///
    /// Weekday buckets are keyed `"0"` to `"6"` and dates `YYYY-MM-DD`.
    pub fn to_keyed(&self) -> BTreeMap<String, Vec<ServiceId>> {
        let buckets = self
            .weekdays
            .iter()
            .enumerate()
            .map(|(i, services)| (i.to_string(), services.clone()));
        let dates = self
            .dates
            .iter()
            .map(|(date, services)| (date.format("%Y-%m-%d").to_string(), services.clone()));
        buckets.chain(dates).collect()
    }
}
