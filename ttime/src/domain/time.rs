//! Scheduled arrival times.
//!
//! Feeds give times as "H:MM:SS" or "HH:MM:SS" measured from the start of the
//! service day. Trips running past midnight keep counting, so "25:10:00" is a
//! legitimate value and the text is never converted to a clock time.

use serde::{Deserialize, Deserializer};
use std::cmp::Ordering;
use std::fmt;

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time '{value}': {reason}")]
pub struct TimeError {
    value: String,
    reason: &'static str,
}

impl TimeError {
    fn new(value: &str, reason: &'static str) -> Self {
        Self {
            value: value.to_string(),
            reason,
        }
    }
}

/// A scheduled arrival time, kept in its feed text form.
///
/// Ordering is by elapsed seconds since the start of the service day, so
/// "9:00:00" sorts before "10:00:00" and "24:30:00" after "23:59:00".
///
/// # Examples
///
/// ```
/// use ttime::domain::ArrivalTime;
///
/// let early = ArrivalTime::parse("9:05:00").unwrap();
/// let late = ArrivalTime::parse("25:10:00").unwrap();
/// assert!(early < late);
/// assert_eq!(late.as_str(), "25:10:00");
/// assert_eq!(early.display(false), "9:05");
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ArrivalTime {
    raw: String,
    seconds: u32,
}

impl ArrivalTime {
    /// Parse a time in "H:MM:SS" or "HH:MM:SS" format.
    ///
    /// # Examples
    ///
    /// ```
    /// use ttime::domain::ArrivalTime;
    ///
    /// assert!(ArrivalTime::parse("08:15:00").is_ok());
    /// assert!(ArrivalTime::parse("8:15:00").is_ok());
    /// assert!(ArrivalTime::parse("26:00:00").is_ok());
    ///
    /// assert!(ArrivalTime::parse("8:15").is_err());
    /// assert!(ArrivalTime::parse("08:75:00").is_err());
    /// assert!(ArrivalTime::parse("ab:cd:ef").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        let s = s.trim();
        let mut parts = s.split(':');
        let (Some(h), Some(m), Some(sec), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TimeError::new(s, "expected H:MM:SS format"));
        };

        if h.is_empty() || h.len() > 2 {
            return Err(TimeError::new(s, "hour must have one or two digits"));
        }
        let hour = parse_digits(h).ok_or_else(|| TimeError::new(s, "invalid hour digits"))?;

        if m.len() != 2 {
            return Err(TimeError::new(s, "minute must have two digits"));
        }
        let minute = parse_digits(m).ok_or_else(|| TimeError::new(s, "invalid minute digits"))?;
        if minute > 59 {
            return Err(TimeError::new(s, "minute must be 0-59"));
        }

        if sec.len() != 2 {
            return Err(TimeError::new(s, "second must have two digits"));
        }
        let second = parse_digits(sec).ok_or_else(|| TimeError::new(s, "invalid second digits"))?;
        if second > 59 {
            return Err(TimeError::new(s, "second must be 0-59"));
        }

        Ok(Self {
            raw: s.to_string(),
            seconds: hour * 3600 + minute * 60 + second,
        })
    }

    /// Returns the time exactly as written in the feed.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Seconds elapsed since the start of the service day.
    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    /// Hours since the start of the service day (may exceed 23).
    pub fn hours(&self) -> u32 {
        self.seconds / 3600
    }

    /// Minute within the hour.
    pub fn minutes(&self) -> u32 {
        self.seconds % 3600 / 60
    }

    /// Compact rendering for timetables.
    ///
    /// Seconds are dropped and the hour loses its leading zero. In 12-hour
    /// mode hours wrap at noon and midnight and get an `a`/`p` suffix.
    ///
    /// # Examples
    ///
    /// ```
    /// use ttime::domain::ArrivalTime;
    ///
    /// let t = ArrivalTime::parse("08:05:00").unwrap();
    /// assert_eq!(t.display(false), "8:05");
    /// assert_eq!(t.display(true), "8:05a");
    ///
    /// let t = ArrivalTime::parse("24:40:00").unwrap();
    /// assert_eq!(t.display(false), "24:40");
    /// assert_eq!(t.display(true), "12:40a");
    /// ```
    pub fn display(&self, twelve_hour: bool) -> String {
        if !twelve_hour {
            return format!("{}:{:02}", self.hours(), self.minutes());
        }
        let hour = self.hours() % 24;
        let suffix = if hour < 12 { 'a' } else { 'p' };
        let wrapped = match hour % 12 {
            0 => 12,
            h => h,
        };
        format!("{}:{:02}{}", wrapped, self.minutes(), suffix)
    }
}

impl Ord for ArrivalTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.seconds
            .cmp(&other.seconds)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for ArrivalTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for ArrivalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArrivalTime({})", self.raw)
    }
}

impl fmt::Display for ArrivalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for ArrivalTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ArrivalTime::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn parse_digits(s: &str) -> Option<u32> {
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
