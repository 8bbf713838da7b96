//! Schedule assembly: from feed rows to the finished report.
//!
//! A [`ScheduleAssembler`] owns every piece of state for one run. Rows are
//! fed to it table by table: routes pick the selection, trips bind to
//! selected routes, stop times attach to known trips, and stop names and
//! the calendar are resolved last. [`ScheduleAssembler::finalize`] then
//! applies exclusions, orders everything and prunes the calendar to the
//! services that still have trips. It can be called again with different
//! exclusions without re-reading the feed.

mod config;
mod error;
mod identity;
mod scan;
mod schedule;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tracing::{debug, info, warn};

use crate::calendar::{CalendarResolver, ServiceCalendar};
use crate::domain::{ExcludeStops, Route, RouteId, ServiceId, StopId, Trip, TripId};
use crate::feed::{
    CalendarDateRow, CalendarRow, FeedError, FeedErrorKind, FeedSource, RouteRow, StopRow,
    StopTimeRow, Table, TripRow,
};
use crate::settings::Settings;

pub use config::AssemblerConfig;
pub use error::AssembleError;
pub use identity::FeedIdentity;
pub use scan::{ScanStats, scan_stop_times, scan_stop_times_parallel};
pub use schedule::{RouteSchedule, Schedule, StopVisit};

/// Trims a trailing " station" (any case) from a stop name.
///
/// # Examples
///
/// ```
/// use ttime::assembler::display_name;
///
/// assert_eq!(display_name("Alewife Station"), "Alewife");
/// assert_eq!(display_name("Back Bay STATION"), "Back Bay");
/// assert_eq!(display_name("Stationery Row"), "Stationery Row");
/// ```
pub fn display_name(stop_name: &str) -> &str {
    const SUFFIX: &[u8] = b" station";
    let bytes = stop_name.as_bytes();
    match bytes.len().checked_sub(SUFFIX.len()) {
        Some(cut) if bytes[cut..].eq_ignore_ascii_case(SUFFIX) => &stop_name[..cut],
        _ => stop_name,
    }
}

/// Builds the route, trip and calendar model for one report.
#[derive(Debug)]
pub struct ScheduleAssembler {
    config: AssemblerConfig,
    agency_name: String,
    routes: BTreeMap<RouteId, Route>,
    trips: HashMap<TripId, Trip>,
    /// Trip ids in trips.txt order
    trip_order: Vec<TripId>,
    seen_stops: HashSet<StopId>,
    stop_names: HashMap<StopId, String>,
    calendar: ServiceCalendar,
    resolved: ServiceCalendar,
}

impl ScheduleAssembler {
    /// Creates an empty assembler.
    ///
    /// `agency_name` is the agency recorded for routes that name none.
    pub fn new(config: AssemblerConfig, agency_name: impl Into<String>) -> Self {
        Self {
            config,
            agency_name: agency_name.into(),
            routes: BTreeMap::new(),
            trips: HashMap::new(),
            trip_order: Vec::new(),
            seen_stops: HashSet::new(),
            stop_names: HashMap::new(),
            calendar: ServiceCalendar::new(),
            resolved: ServiceCalendar::new(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Reads a whole feed into a new assembler, ready to finalize.
    ///
    /// Table reads run on the blocking pool. With more than one configured
    /// worker the stop times are collected first and scanned by
    /// [`ScheduleAssembler::scan_stop_times_parallel`]; otherwise the whole
    /// feed is read by [`ScheduleAssembler::read`].
    pub async fn load(
        source: &FeedSource,
        config: AssemblerConfig,
        agency_name: impl Into<String>,
        settings: &Settings,
    ) -> Result<Self, AssembleError> {
        let source = source.clone();
        let settings = settings.clone();
        let agency_name = agency_name.into();

        if !config.is_parallel() {
            let assembler = tokio::task::spawn_blocking(move || {
                Self::read(&source, config, agency_name, &settings)
            })
            .await??;
            return Ok(assembler);
        }

        let (mut assembler, rows, source) = tokio::task::spawn_blocking(move || {
            let mut assembler = Self::new(config, agency_name);
            assembler.read_routes_and_trips(&source, &settings)?;
            let mut rows = Vec::new();
            source.for_each_row(Table::StopTimes, |row: StopTimeRow| {
                if assembler.trips.contains_key(&row.trip_id) {
                    rows.push(row);
                }
            })?;
            Ok::<_, FeedError>((assembler, rows, source))
        })
        .await??;

        let stats = assembler.scan_stop_times_parallel(Arc::from(rows)).await?;
        log_scan(&stats);

        let assembler = tokio::task::spawn_blocking(move || {
            assembler.read_names_and_calendar(&source)?;
            Ok::<_, FeedError>(assembler)
        })
        .await??;
        Ok(assembler)
    }

    /// Reads a whole feed on the calling thread, scanning stop times as
    /// they stream in.
    ///
    /// A missing or unreadable calendar_dates.txt only logs a warning;
    /// every other table is required.
    pub fn read(
        source: &FeedSource,
        config: AssemblerConfig,
        agency_name: impl Into<String>,
        settings: &Settings,
    ) -> Result<Self, FeedError> {
        let mut assembler = Self::new(config, agency_name);
        assembler.read_routes_and_trips(source, settings)?;

        let mut stats = ScanStats::default();
        source.for_each_row(Table::StopTimes, |row: StopTimeRow| {
            stats += assembler.scan_stop_times([&row]);
        })?;
        log_scan(&stats);

        assembler.read_names_and_calendar(source)?;
        Ok(assembler)
    }

    fn read_routes_and_trips(
        &mut self,
        source: &FeedSource,
        settings: &Settings,
    ) -> Result<(), FeedError> {
        let routes: Vec<RouteRow> = source.read_table(Table::Routes)?;
        let selected = self.select_routes(routes, settings);
        info!(routes = selected, "routes read");

        source.for_each_row(Table::Trips, |row: TripRow| {
            self.accept_trip(row);
        })?;
        info!(trips = self.trips.len(), "trips read");
        Ok(())
    }

    fn read_names_and_calendar(&mut self, source: &FeedSource) -> Result<(), FeedError> {
        let stops: Vec<StopRow> = source.read_table(Table::Stops)?;
        let named = self.resolve_stop_names(stops);
        info!(named, "stops read");

        let rules: Vec<CalendarRow> = source.read_table(Table::Calendar)?;
        let mut resolver = CalendarResolver::new().with_rules(&rules);
        match source.read_table::<CalendarDateRow>(Table::CalendarDates) {
            Ok(exceptions) => resolver = resolver.with_exceptions(&exceptions),
            Err(e) if e.kind() == FeedErrorKind::MissingRequiredFile => warn!(
                file = Table::CalendarDates.file_name(),
                "file does not exist; exceptions to regularly scheduled service will not be considered"
            ),
            Err(e) => warn!(
                error = %e,
                "exceptions to regularly scheduled service will not be considered"
            ),
        }
        self.set_calendar(resolver.finish());
        Ok(())
    }

    /// Creates a route for every row whose referred-to key is selected.
    ///
    /// Returns the number of routes selected.
    pub fn select_routes(
        &mut self,
        rows: impl IntoIterator<Item = RouteRow>,
        settings: &Settings,
    ) -> usize {
        for row in rows {
            self.accept_route(row, settings);
        }
        for wanted in &settings.selected_routes {
            if !self.routes.values().any(|r| &r.referred_to == wanted) {
                warn!(route = %wanted, "selected route is not in the feed");
            }
        }
        self.routes.len()
    }

    /// Creates a route from one row if it is selected.
    pub fn accept_route(&mut self, row: RouteRow, settings: &Settings) -> bool {
        let key = self
            .config
            .route_key
            .select(&row.route_id, &row.route_short_name, &row.route_long_name)
            .to_string();
        if !settings.is_selected(&key) {
            return false;
        }
        let agency = match row.agency_id {
            Some(id) if !id.is_empty() => id,
            _ => self.agency_name.clone(),
        };
        let route = Route::new(
            row.route_id.clone(),
            agency,
            row.route_short_name,
            row.route_long_name,
            key,
        );
        self.routes.insert(row.route_id, route);
        true
    }

    /// Binds every trip row of a selected route; others are discarded.
    ///
    /// Returns the number of trips bound.
    pub fn bind_trips(&mut self, rows: impl IntoIterator<Item = TripRow>) -> usize {
        let mut bound = 0;
        for row in rows {
            if self.accept_trip(row) {
                bound += 1;
            }
        }
        bound
    }

    /// Binds one trip row if its route is selected.
    pub fn accept_trip(&mut self, row: TripRow) -> bool {
        if !self.routes.contains_key(&row.route_id) {
            return false;
        }
        let trip = Trip::new(row.route_id, row.service_id, row.trip_id.clone(), row.trip_headsign);
        if self.trips.insert(row.trip_id.clone(), trip).is_none() {
            self.trip_order.push(row.trip_id);
        }
        true
    }

    /// Attaches stop-time rows to bound trips on the calling task.
    pub fn scan_stop_times<'a>(
        &mut self,
        rows: impl IntoIterator<Item = &'a StopTimeRow>,
    ) -> ScanStats {
        scan_stop_times(&mut self.trips, rows, &mut self.seen_stops)
    }

    /// Attaches stop-time rows to bound trips using the configured workers.
    pub async fn scan_stop_times_parallel(
        &mut self,
        rows: Arc<[StopTimeRow]>,
    ) -> Result<ScanStats, AssembleError> {
        let workers = self.config.worker_count();
        let stats =
            scan_stop_times_parallel(&mut self.trips, rows, &mut self.seen_stops, workers).await?;
        Ok(stats)
    }

    /// Names every stop a bound trip visits, then labels the trips' stops.
    ///
    /// Returns the number of stops named.
    pub fn resolve_stop_names(&mut self, rows: impl IntoIterator<Item = StopRow>) -> usize {
        for row in rows {
            if self.seen_stops.contains(&row.stop_id) {
                let name = display_name(&row.stop_name).to_string();
                self.stop_names.insert(row.stop_id, name);
            }
        }
        for trip in self.trips.values_mut() {
            trip.attach_names(&self.stop_names);
        }
        let unnamed = self.seen_stops.len().saturating_sub(self.stop_names.len());
        if unnamed > 0 {
            debug!(unnamed, "stops without a stops.txt entry are labelled by id");
        }
        self.stop_names.len()
    }

    /// Sets the resolved (unpruned) calendar.
    pub fn set_calendar(&mut self, calendar: ServiceCalendar) {
        self.calendar = calendar;
    }

    /// Rebuilds every route from the bound trips and applies `exclude`.
    ///
    /// Routes are reset first, so calling this again with new exclusions
    /// starts from the full trip set. Afterwards the calendar is pruned to
    /// services with at least one remaining trip. Returns the number of
    /// trips dropped because exclusion left them without stops.
    pub fn finalize(&mut self, exclude: &ExcludeStops) -> usize {
        for route in self.routes.values_mut() {
            route.reset();
        }
        for trip_id in &self.trip_order {
            let Some(trip) = self.trips.get(trip_id) else {
                continue;
            };
            if let Some(route) = self.routes.get_mut(&trip.route_id) {
                route.add_trip(trip.clone());
            }
        }

        let dropped: usize = self
            .routes
            .values_mut()
            .map(|route| route.finalize(exclude))
            .sum();

        let realized: HashSet<ServiceId> = self
            .routes
            .values()
            .flat_map(Route::services)
            .cloned()
            .collect();
        let mut resolved = self.calendar.clone();
        resolved.retain_services(&realized);
        self.resolved = resolved;

        info!(
            routes = self.routes.len(),
            services = realized.len(),
            dropped,
            "schedules assigned"
        );
        dropped
    }

    /// Routes ordered by referred-to key, then route id.
    pub fn routes(&self) -> Vec<&Route> {
        let mut routes: Vec<&Route> = self.routes.values().collect();
        routes.sort_by(|a, b| Route::cmp_by_key(a, b));
        routes
    }

    /// Looks up a route by its referred-to key.
    ///
    /// Several routes may share a key; the one with the lowest route id is
    /// returned.
    pub fn route(&self, referred_to: &str) -> Option<&Route> {
        let mut matching = self.routes.values().filter(|r| r.referred_to == referred_to);
        let first = matching.next()?;
        let others = matching.count();
        if others > 0 {
            warn!(
                route = %referred_to,
                chosen = %first.id,
                others,
                "route key is shared by several routes"
            );
        }
        Some(first)
    }

    /// The calendar pruned by the last [`ScheduleAssembler::finalize`].
    pub fn calendar(&self) -> &ServiceCalendar {
        &self.resolved
    }

    /// Exports the finalized model as a report.
    pub fn export(
        &self,
        title: &str,
        settings: &Settings,
        generated: DateTime<FixedOffset>,
    ) -> Schedule {
        let twelve_hour = settings.twelve_hour_clock;
        Schedule {
            title: title.to_string(),
            generated: generated.to_rfc2822(),
            twelve_hour_clock: twelve_hour,
            routes: self
                .routes()
                .into_iter()
                .map(|route| RouteSchedule::from_route(route, twelve_hour))
                .collect(),
            dates: self.resolved.to_keyed(),
            settings: settings.clone(),
        }
    }
}

fn log_scan(stats: &ScanStats) {
    info!(
        stops = stats.stops,
        inaccessible = stats.inaccessible,
        untimed = stats.untimed,
        "stop times read"
    );
}

#[cfg(test)]
#[path = "assemble_tests.rs"]
mod tests;
