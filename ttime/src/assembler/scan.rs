//! Attaching stop-time rows to the trips that own them.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::AddAssign;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::domain::{RouteId, Stop, StopId, Trip, TripId};
use crate::feed::StopTimeRow;

/// Counts from a stop-time scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    /// Stops attached to a trip
    pub stops: usize,
    /// Rows dropped for forbidding pickup or drop-off
    pub inaccessible: usize,
    /// Rows dropped for carrying neither arrival nor departure time
    pub untimed: usize,
}

impl AddAssign for ScanStats {
    fn add_assign(&mut self, other: Self) {
        self.stops += other.stops;
        self.inaccessible += other.inaccessible;
        self.untimed += other.untimed;
    }
}

/// Attaches every row belonging to a trip in `trips` as a stop.
///
/// Rows for other trips are skipped. Rows with neither arrival nor
/// departure time are left out with a warning naming the trip and stop.
/// The ids of attached stops are added to `seen` so their names can be
/// looked up afterwards.
pub fn scan_stop_times<'a>(
    trips: &mut HashMap<TripId, Trip>,
    rows: impl IntoIterator<Item = &'a StopTimeRow>,
    seen: &mut HashSet<StopId>,
) -> ScanStats {
    let mut stats = ScanStats::default();
    for row in rows {
        let Some(trip) = trips.get_mut(&row.trip_id) else {
            continue;
        };
        if !row.is_accessible() {
            stats.inaccessible += 1;
            continue;
        }
        let Some(time) = row.scheduled_time() else {
            warn!(
                trip = %row.trip_id,
                stop = %row.stop_id,
                sequence = row.stop_sequence,
                "stop time has no arrival or departure; stop left off the trip"
            );
            stats.untimed += 1;
            continue;
        };
        trip.add_stop(Stop::new(row.stop_id.clone(), time.clone(), row.stop_sequence));
        seen.insert(row.stop_id.clone());
        stats.stops += 1;
    }
    stats
}

/// Splits trips into `workers` groups, keeping each route's trips together.
fn partition_by_route(
    trips: &mut HashMap<TripId, Trip>,
    workers: usize,
) -> Vec<HashMap<TripId, Trip>> {
    let workers = workers.max(1);
    let mut routes: BTreeMap<RouteId, usize> = BTreeMap::new();
    for trip in trips.values() {
        routes.entry(trip.route_id.clone()).or_default();
    }
    for (i, group) in routes.values_mut().enumerate() {
        *group = i % workers;
    }

    let mut groups: Vec<HashMap<TripId, Trip>> = (0..workers).map(|_| HashMap::new()).collect();
    for (trip_id, trip) in trips.drain() {
        let group = routes.get(&trip.route_id).copied().unwrap_or_default();
        groups[group].insert(trip_id, trip);
    }
    groups
}

/// Scans stop times on blocking worker tasks, one group of routes each.
///
/// Every worker reads the same shared rows and owns the trips of its
/// routes outright. All workers are awaited before the trips are put back
/// into `trips`, so the result matches [`scan_stop_times`].
///
/// # Errors
///
/// Returns the join error of a worker that panicked.
pub async fn scan_stop_times_parallel(
    trips: &mut HashMap<TripId, Trip>,
    rows: Arc<[StopTimeRow]>,
    seen: &mut HashSet<StopId>,
    workers: usize,
) -> Result<ScanStats, tokio::task::JoinError> {
    let groups = partition_by_route(trips, workers);
    debug!(workers = groups.len(), rows = rows.len(), "scanning stop times");

    let handles: Vec<_> = groups
        .into_iter()
        .map(|mut group| {
            let rows = Arc::clone(&rows);
            tokio::task::spawn_blocking(move || {
                let mut seen = HashSet::new();
                let stats = scan_stop_times(&mut group, rows.iter(), &mut seen);
                (group, seen, stats)
            })
        })
        .collect();

    let mut total = ScanStats::default();
    for result in join_all(handles).await {
        let (group, group_seen, stats) = result?;
        trips.extend(group);
        seen.extend(group_seen);
        total += stats;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ArrivalTime;

    fn row(trip: &str, stop: &str, seq: u32, time: Option<&str>) -> StopTimeRow {
        StopTimeRow {
            trip_id: trip.into(),
            arrival_time: time.map(|t| ArrivalTime::parse(t).unwrap()),
            departure_time: None,
            stop_id: stop.into(),
            stop_sequence: seq,
            pickup_type: None,
            drop_off_type: None,
        }
    }

    fn trips(specs: &[(&str, &str)]) -> HashMap<TripId, Trip> {
        specs
            .iter()
            .map(|(trip, route)| (trip.to_string(), Trip::new(*route, "WK", *trip, "Out")))
            .collect()
    }

    fn stop_ids(trips: &HashMap<TripId, Trip>, trip: &str) -> Vec<String> {
        trips[trip].stops().iter().map(|s| s.stop_id.clone()).collect()
    }

    #[test]
    fn attaches_rows_of_known_trips_only() {
        let mut trips = trips(&[("T1", "R1")]);
        let rows = vec![
            row("T1", "A", 1, Some("8:00:00")),
            row("T9", "Z", 1, Some("8:00:00")),
            row("T1", "B", 2, Some("8:05:00")),
        ];
        let mut seen = HashSet::new();

        let stats = scan_stop_times(&mut trips, &rows, &mut seen);

        assert_eq!(stats.stops, 2);
        assert_eq!(stop_ids(&trips, "T1"), vec!["A", "B"]);
        assert!(seen.contains("A") && !seen.contains("Z"));
    }

    #[test]
    fn drops_inaccessible_rows() {
        let mut trips = trips(&[("T1", "R1")]);
        let mut no_pickup = row("T1", "B", 2, Some("8:05:00"));
        no_pickup.pickup_type = Some("1".into());
        let mut no_drop_off = row("T1", "C", 3, Some("8:10:00"));
        no_drop_off.drop_off_type = Some("1".into());
        let rows = vec![row("T1", "A", 1, Some("8:00:00")), no_pickup, no_drop_off];
        let mut seen = HashSet::new();

        let stats = scan_stop_times(&mut trips, &rows, &mut seen);

        assert_eq!(stats.inaccessible, 2);
        assert_eq!(stop_ids(&trips, "T1"), vec!["A"]);
        assert!(!seen.contains("B"));
    }

    #[test]
    fn untimed_rows_are_counted_and_skipped() {
        let mut trips = trips(&[("T1", "R1")]);
        let mut departs_only = row("T1", "B", 2, None);
        departs_only.departure_time = Some(ArrivalTime::parse("8:06:00").unwrap());
        let rows = vec![row("T1", "A", 1, None), departs_only];
        let mut seen = HashSet::new();

        let stats = scan_stop_times(&mut trips, &rows, &mut seen);

        assert_eq!(stats.untimed, 1);
        assert_eq!(trips["T1"].stops()[0].arrival_time.as_str(), "8:06:00");
    }

    #[test]
    fn partition_keeps_routes_together() {
        let mut all = trips(&[("T1", "R1"), ("T2", "R2"), ("T3", "R1"), ("T4", "R3")]);

        let groups = partition_by_route(&mut all, 2);

        assert!(all.is_empty());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups.iter().map(HashMap::len).sum::<usize>(), 4);
        let with_t1 = groups.iter().find(|g| g.contains_key("T1")).unwrap();
        assert!(with_t1.contains_key("T3"));
    }

    #[tokio::test]
    async fn parallel_scan_matches_sequential() {
        let specs = [("T1", "R1"), ("T2", "R2"), ("T3", "R3"), ("T4", "R1")];
        let rows: Vec<StopTimeRow> = (0..40)
            .map(|i| {
                let trip = format!("T{}", i % 5 + 1);
                let time = format!("8:{:02}:00", i % 60);
                row(&trip, &format!("S{i}"), 40 - i, Some(time.as_str()))
            })
            .collect();

        let mut sequential = trips(&specs);
        let mut seen_seq = HashSet::new();
        let expected = scan_stop_times(&mut sequential, &rows, &mut seen_seq);

        let mut parallel = trips(&specs);
        let mut seen_par = HashSet::new();
        let stats = scan_stop_times_parallel(&mut parallel, Arc::from(rows), &mut seen_par, 3)
            .await
            .unwrap();

        assert_eq!(stats, expected);
        assert_eq!(seen_par, seen_seq);
        for (trip, _) in specs {
            assert_eq!(parallel[trip].stops(), sequential[trip].stops());
        }
    }
}
