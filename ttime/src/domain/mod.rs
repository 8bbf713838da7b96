//! Domain types for the schedule report.
//!
//! A feed is reduced to routes, the trips they own and the stops each trip
//! makes. Identifiers stay as the feed's own strings; only values with real
//! structure (arrival times) are validated into dedicated types.

use std::collections::{BTreeMap, BTreeSet};

mod error;
mod route;
mod stop;
mod time;
mod trip;

pub use error::DomainError;
pub use route::{Route, RouteKeyField};
pub use stop::Stop;
pub use time::{ArrivalTime, TimeError};
pub use trip::Trip;

/// Feed identifier of a stop (`stop_id`).
pub type StopId = String;

/// Feed identifier of a calendar service (`service_id`).
pub type ServiceId = String;

/// Feed identifier of a trip (`trip_id`).
pub type TripId = String;

/// Feed identifier of a route (`route_id`).
pub type RouteId = String;

/// Stops to omit, keyed by a route's referred-to key.
pub type ExcludeStops = BTreeMap<String, BTreeSet<StopId>>;
