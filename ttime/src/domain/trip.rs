//! Trips: ordered owners of stops.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::{ArrivalTime, DomainError, ExcludeStops, RouteId, ServiceId, Stop, StopId, TripId};

/// One run of a vehicle along a route under a calendar service.
///
/// Stops are kept in row order while the stop-time table is scanned.
/// [`Trip::finalize`] applies exclusions, sorts by sequence and fixes the
/// representative time used to rank trips against each other.
#[derive(Debug, Clone)]
pub struct Trip {
    /// Route this trip runs on
    pub route_id: RouteId,
    /// Calendar service the trip runs under
    pub service_id: ServiceId,
    /// Feed identifier of the trip
    pub trip_id: TripId,
    /// Headsign, used as the direction grouping key
    pub direction: String,
    representative_time: Option<ArrivalTime>,
    stops: Vec<Stop>,
}

impl Trip {
    /// Creates a trip with no stops.
    pub fn new(
        route_id: impl Into<RouteId>,
        service_id: impl Into<ServiceId>,
        trip_id: impl Into<TripId>,
        direction: impl Into<String>,
    ) -> Self {
        Self {
            route_id: route_id.into(),
            service_id: service_id.into(),
            trip_id: trip_id.into(),
            direction: direction.into(),
            representative_time: None,
            stops: Vec::new(),
        }
    }

    /// Appends a stop in arrival order of the source rows.
    pub fn add_stop(&mut self, stop: Stop) {
        self.stops.push(stop);
    }

    /// Returns the stops. Sorted by sequence only after finalize.
    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// Returns true if the trip has no stops.
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Time of the first remaining stop, set by finalize.
    pub fn representative_time(&self) -> Option<&ArrivalTime> {
        self.representative_time.as_ref()
    }

    /// Attaches display names to every stop found in `names`.
    pub fn attach_names(&mut self, names: &HashMap<StopId, String>) {
        for stop in &mut self.stops {
            if let Some(name) = names.get(&stop.stop_id) {
                stop.set_display_name(name.clone());
            }
        }
    }

    /// Drops excluded stops, sorts by sequence and sets the representative time.
    ///
    /// `referred_to` is the owning route's referred-to key, which is how
    /// `exclude` is indexed. Calling this again with the same exclusions
    /// leaves the trip unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::EmptyTrip`] when no stops remain. The
    /// representative time is cleared and the trip should be dropped.
    pub fn finalize(&mut self, exclude: &ExcludeStops, referred_to: &str) -> Result<(), DomainError> {
        if let Some(excluded) = exclude.get(referred_to) {
            self.stops.retain(|stop| !excluded.contains(&stop.stop_id));
        }
        self.stops.sort_by_key(Stop::sort_key);

        match self.stops.first() {
            Some(first) => {
                self.representative_time = Some(first.arrival_time.clone());
                Ok(())
            }
            None => {
                self.representative_time = None;
                Err(DomainError::EmptyTrip {
                    trip_id: self.trip_id.clone(),
                })
            }
        }
    }

    /// Ranking key: service, route, direction, then representative time.
    pub fn sort_key(&self) -> (&str, &str, &str, Option<&ArrivalTime>) {
        (
            self.service_id.as_str(),
            self.route_id.as_str(),
            self.direction.as_str(),
            self.representative_time.as_ref(),
        )
    }

    /// Compares two trips by [`Trip::sort_key`].
    pub fn cmp_schedule(a: &Trip, b: &Trip) -> Ordering {
        a.sort_key().cmp(&b.sort_key())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn time_for(minutes: u32) -> ArrivalTime {
        ArrivalTime::parse(&format!("{}:{:02}:00", minutes / 60, minutes % 60)).unwrap()
    }

    /// Stops as (stop index, sequence, minutes since midnight).
    fn stops_strategy() -> impl Strategy<Value = Vec<(u8, u32, u32)>> {
        prop::collection::vec((0u8..8, 0u32..50, 0u32..(30 * 60)), 0..20)
    }

    proptest! {
        #[test]
        fn finalize_is_idempotent(
            stops in stops_strategy(),
            excluded in prop::collection::btree_set(0u8..8, 0..4),
        ) {
            let mut trip = Trip::new("R", "S", "T", "D");
            for (idx, seq, mins) in &stops {
                trip.add_stop(Stop::new(format!("S{idx}"), time_for(*mins), *seq));
            }
            let set: BTreeSet<StopId> = excluded.iter().map(|i| format!("S{i}")).collect();
            let exclude = ExcludeStops::from([("K".to_string(), set)]);

            let first = trip.finalize(&exclude, "K");
            let once: Vec<Stop> = trip.stops().to_vec();
            let once_time = trip.representative_time().cloned();

            let second = trip.finalize(&exclude, "K");
            prop_assert_eq!(first.is_ok(), second.is_ok());
            prop_assert_eq!(trip.stops(), once.as_slice());
            prop_assert_eq!(trip.representative_time().cloned(), once_time);
        }

        #[test]
        fn finalize_leaves_sorted_unexcluded_stops(
            stops in stops_strategy(),
            excluded in prop::collection::btree_set(0u8..8, 0..4),
        ) {
            let mut trip = Trip::new("R", "S", "T", "D");
            for (idx, seq, mins) in &stops {
                trip.add_stop(Stop::new(format!("S{idx}"), time_for(*mins), *seq));
            }
            let set: BTreeSet<StopId> = excluded.iter().map(|i| format!("S{i}")).collect();
            let exclude = ExcludeStops::from([("K".to_string(), set.clone())]);

            let result = trip.finalize(&exclude, "K");

            for stop in trip.stops() {
                prop_assert!(!set.contains(&stop.stop_id));
            }
            for pair in trip.stops().windows(2) {
                prop_assert!(pair[0].sequence <= pair[1].sequence);
            }
            match trip.stops().first() {
                Some(first) => {
                    prop_assert!(result.is_ok());
                    prop_assert_eq!(trip.representative_time(), Some(&first.arrival_time));
                }
                None => prop_assert!(result.is_err()),
            }
        }
    }
}
