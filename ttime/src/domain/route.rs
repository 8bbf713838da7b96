//! Routes and their derived stop topology.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ExcludeStops, RouteId, ServiceId, StopId, Trip};

/// Which routes.txt column serves as the human-facing route key.
///
/// Selection and stop exclusion are both keyed by this value rather than by
/// the feed's internal `route_id`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RouteKeyField {
    /// `route_short_name`
    #[default]
    ShortName,
    /// `route_long_name`
    LongName,
    /// `route_id`
    RouteId,
}

impl RouteKeyField {
    /// Picks the key out of a route's identity columns.
    pub fn select<'a>(&self, route_id: &'a str, short_name: &'a str, long_name: &'a str) -> &'a str {
        match self {
            RouteKeyField::ShortName => short_name,
            RouteKeyField::LongName => long_name,
            RouteKeyField::RouteId => route_id,
        }
    }
}

/// Trips of one service, grouped by direction.
pub type DirectionTrips = BTreeMap<String, Vec<Trip>>;

/// A selected route with its trips and derived per-direction stop list.
///
/// `schedules` is filled by [`Route::add_trip`]. `stops_by_direction` is
/// derived by [`Route::finalize`] and never edited by hand; [`Route::reset`]
/// drops both while keeping the route's identity.
#[derive(Debug, Clone)]
pub struct Route {
    /// Feed identifier of the route
    pub id: RouteId,
    /// Operating agency (agency id, or the feed's agency name when absent)
    pub agency: String,
    /// Short name, e.g. "Red"
    pub short_name: String,
    /// Long name, e.g. "Red Line"
    pub long_name: String,
    /// Human-facing key used for selection and exclusion
    pub referred_to: String,
    schedules: BTreeMap<ServiceId, DirectionTrips>,
    stops_by_direction: BTreeMap<String, Vec<(String, StopId)>>,
}

impl Route {
    /// Creates a route with no trips.
    pub fn new(
        id: impl Into<RouteId>,
        agency: impl Into<String>,
        short_name: impl Into<String>,
        long_name: impl Into<String>,
        referred_to: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            agency: agency.into(),
            short_name: short_name.into(),
            long_name: long_name.into(),
            referred_to: referred_to.into(),
            schedules: BTreeMap::new(),
            stops_by_direction: BTreeMap::new(),
        }
    }

    /// Files a trip under its service and direction.
    pub fn add_trip(&mut self, trip: Trip) {
        self.schedules
            .entry(trip.service_id.clone())
            .or_default()
            .entry(trip.direction.clone())
            .or_default()
            .push(trip);
    }

    /// Drops all trips and derived state, keeping the route's identity.
    pub fn reset(&mut self) {
        self.schedules.clear();
        self.stops_by_direction.clear();
    }

    /// Finalizes every trip, then rebuilds the stop topology.
    ///
    /// Trips left without stops after exclusion are removed, along with any
    /// service or direction bucket they leave empty. Each remaining bucket
    /// is sorted by [`Trip::cmp_schedule`]. The topology is built in a second
    /// pass so it only reflects stops that survived exclusion: for each
    /// direction, stop labels are appended in first-encountered order,
    /// skipping labels already listed.
    ///
    /// Returns the number of trips dropped.
    pub fn finalize(&mut self, exclude: &ExcludeStops) -> usize {
        let referred_to = &self.referred_to;
        let mut dropped = 0;

        for directions in self.schedules.values_mut() {
            for trips in directions.values_mut() {
                trips.retain_mut(|trip| match trip.finalize(exclude, referred_to) {
                    Ok(()) => true,
                    Err(e) => {
                        debug!(route = %referred_to, error = %e, "dropping trip");
                        dropped += 1;
                        false
                    }
                });
                trips.sort_by(Trip::cmp_schedule);
            }
            directions.retain(|_, trips| !trips.is_empty());
        }
        self.schedules.retain(|_, directions| !directions.is_empty());

        self.stops_by_direction.clear();
        for trip in self.schedules.values().flat_map(|d| d.values()).flatten() {
            let listed = self
                .stops_by_direction
                .entry(trip.direction.clone())
                .or_default();
            for stop in trip.stops() {
                let label = stop.label();
                if !listed.iter().any(|(name, _)| name == label) {
                    listed.push((label.to_string(), stop.stop_id.clone()));
                }
            }
        }

        dropped
    }

    /// Trips keyed by service id, then direction.
    pub fn schedules(&self) -> &BTreeMap<ServiceId, DirectionTrips> {
        &self.schedules
    }

    /// Ordered (display name, stop id) pairs per direction.
    pub fn stops_by_direction(&self) -> &BTreeMap<String, Vec<(String, StopId)>> {
        &self.stops_by_direction
    }

    /// Service ids with at least one trip on this route.
    pub fn services(&self) -> impl Iterator<Item = &ServiceId> {
        self.schedules.keys()
    }

    /// Total number of trips held.
    pub fn trip_count(&self) -> usize {
        self.schedules
            .values()
            .flat_map(|d| d.values())
            .map(Vec::len)
            .sum()
    }

    /// Every stop served in any direction, as (stop id, display name).
    ///
    /// Follows `stops_by_direction` order; a stop id seen again in a later
    /// direction keeps its first position and takes the later name.
    pub fn all_stops(&self) -> Vec<(StopId, String)> {
        let mut stops: Vec<(StopId, String)> = Vec::new();
        for (name, stop_id) in self.stops_by_direction.values().flatten() {
            match stops.iter_mut().find(|(id, _)| id == stop_id) {
                Some(existing) => existing.1 = name.clone(),
                None => stops.push((stop_id.clone(), name.clone())),
            }
        }
        stops
    }

    /// Distinct display names across all directions, in [`Route::all_stops`] order.
    pub fn stop_choices(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for (_, name) in self.all_stops() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Orders routes by their referred-to key, then by route id.
    pub fn cmp_by_key(a: &Route, b: &Route) -> Ordering {
        a.referred_to
            .cmp(&b.referred_to)
            .then_with(|| a.id.cmp(&b.id))
    }
}
