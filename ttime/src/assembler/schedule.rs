//! The finished report structure handed to renderers.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{Route, ServiceId, StopId, Trip};
use crate::settings::Settings;

/// A single stop of a trip as shown in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopVisit {
    pub name: String,
    pub time: String,
}

/// One route of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSchedule {
    pub id: String,
    pub agency: String,
    pub short_name: String,
    pub long_name: String,
    pub referred_to: String,
    /// Direction to ordered `[display name, stop id]` pairs
    pub stops: BTreeMap<String, Vec<(String, StopId)>>,
    /// Service, then direction, to trips in schedule order
    pub schedules: BTreeMap<ServiceId, BTreeMap<String, Vec<Vec<StopVisit>>>>,
}

impl RouteSchedule {
    /// Exports a finalized route, rendering times in the given clock format.
    pub fn from_route(route: &Route, twelve_hour: bool) -> Self {
        let schedules = route
            .schedules()
            .iter()
            .map(|(service, directions)| {
                let directions = directions
                    .iter()
                    .map(|(direction, trips)| {
                        let trips = trips.iter().map(|t| visits(t, twelve_hour)).collect();
                        (direction.clone(), trips)
                    })
                    .collect();
                (service.clone(), directions)
            })
            .collect();

        Self {
            id: route.id.clone(),
            agency: route.agency.clone(),
            short_name: route.short_name.clone(),
            long_name: route.long_name.clone(),
            referred_to: route.referred_to.clone(),
            stops: route.stops_by_direction().clone(),
            schedules,
        }
    }
}

fn visits(trip: &Trip, twelve_hour: bool) -> Vec<StopVisit> {
    trip.stops()
        .iter()
        .map(|stop| StopVisit {
            name: stop.label().to_string(),
            time: stop.arrival_time.display(twelve_hour),
        })
        .collect()
}

/// The complete report for a feed.
#[derive(Debug, Clone, Serialize)]
pub struct Schedule {
    pub title: String,
    /// When the report was generated, RFC 2822
    pub generated: String,
    pub twelve_hour_clock: bool,
    /// Routes ordered by referred-to key
    pub routes: Vec<RouteSchedule>,
    /// Weekday buckets `"0"`-`"6"` and `YYYY-MM-DD` dates to active services
    pub dates: BTreeMap<String, Vec<ServiceId>>,
    /// Settings the report was generated with
    pub settings: Settings,
}
