//! Row schemas, one per feed table.
//!
//! Each row is validated once when it is deserialized; a value that does not
//! fit its column (a non-numeric sequence, a malformed date) fails the whole
//! table read.

use chrono::{NaiveDate, Weekday};
use serde::de::{self, Deserialize, Deserializer};

use crate::domain::ArrivalTime;

/// A row of agency.txt.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct AgencyRow {
    /// Optional for single-agency feeds
    #[serde(default)]
    pub agency_id: Option<String>,
    pub agency_name: String,
}

/// A row of routes.txt.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct RouteRow {
    pub route_id: String,
    #[serde(default)]
    pub agency_id: Option<String>,
    #[serde(default)]
    pub route_short_name: String,
    #[serde(default)]
    pub route_long_name: String,
}

/// A row of trips.txt.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct TripRow {
    pub route_id: String,
    pub service_id: String,
    pub trip_id: String,
    #[serde(default)]
    pub trip_headsign: String,
}

/// A row of stop_times.txt.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct StopTimeRow {
    pub trip_id: String,
    #[serde(default, deserialize_with = "deserialize_optional_time")]
    pub arrival_time: Option<ArrivalTime>,
    #[serde(default, deserialize_with = "deserialize_optional_time")]
    pub departure_time: Option<ArrivalTime>,
    pub stop_id: String,
    pub stop_sequence: u32,
    #[serde(default)]
    pub pickup_type: Option<String>,
    #[serde(default)]
    pub drop_off_type: Option<String>,
}

impl StopTimeRow {
    /// False when the row forbids pickup or drop-off ("1" in either column).
    pub fn is_accessible(&self) -> bool {
        self.pickup_type.as_deref() != Some("1") && self.drop_off_type.as_deref() != Some("1")
    }

    /// Arrival time, or the departure time when arrival is left blank.
    pub fn scheduled_time(&self) -> Option<&ArrivalTime> {
        self.arrival_time.as_ref().or(self.departure_time.as_ref())
    }
}

/// A row of stops.txt.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct StopRow {
    pub stop_id: String,
    #[serde(default)]
    pub stop_name: String,
}

/// A row of calendar.txt: a weekly rule over a date range.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct CalendarRow {
    pub service_id: String,
    #[serde(deserialize_with = "deserialize_bool")]
    pub monday: bool,
    #[serde(deserialize_with = "deserialize_bool")]
    pub tuesday: bool,
    #[serde(deserialize_with = "deserialize_bool")]
    pub wednesday: bool,
    #[serde(deserialize_with = "deserialize_bool")]
    pub thursday: bool,
    #[serde(deserialize_with = "deserialize_bool")]
    pub friday: bool,
    #[serde(deserialize_with = "deserialize_bool")]
    pub saturday: bool,
    #[serde(deserialize_with = "deserialize_bool")]
    pub sunday: bool,
    #[serde(deserialize_with = "deserialize_date")]
    pub start_date: NaiveDate,
    #[serde(deserialize_with = "deserialize_date")]
    pub end_date: NaiveDate,
}

impl CalendarRow {
    /// Whether the weekly rule runs on the given day of the week.
    pub fn runs_on(&self, weekday: Weekday) -> bool {
        match weekday {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }

    /// A rule whose range starts and ends on the same day.
    pub fn is_single_day(&self) -> bool {
        self.start_date == self.end_date
    }
}

/// Whether a calendar exception adds or removes service on its date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionType {
    /// "1": service runs on the date
    Added,
    /// "2": service does not run on the date
    Removed,
}

impl<'de> Deserialize<'de> for ExceptionType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "1" => Ok(ExceptionType::Added),
            "2" => Ok(ExceptionType::Removed),
            other => Err(de::Error::custom(format!(
                "invalid exception_type '{other}', expected 1 or 2"
            ))),
        }
    }
}

/// A row of calendar_dates.txt: a single-date exception.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct CalendarDateRow {
    pub service_id: String,
    #[serde(deserialize_with = "deserialize_date")]
    pub date: NaiveDate,
    pub exception_type: ExceptionType,
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    NaiveDate::parse_from_str(&s, "%Y%m%d").map_err(de::Error::custom)
}

fn deserialize_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    match s.as_str() {
        "1" => Ok(true),
        "0" | "" => Ok(false),
        other => Err(de::Error::custom(format!(
            "invalid day flag '{other}', expected 0 or 1"
        ))),
    }
}

fn deserialize_optional_time<'de, D>(deserializer: D) -> Result<Option<ArrivalTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) if !s.trim().is_empty() => ArrivalTime::parse(&s)
            .map(Some)
            .map_err(de::Error::custom),
        _ => Ok(None),
    }
}
