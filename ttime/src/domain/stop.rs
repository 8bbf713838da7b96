//! Scheduled stop events.

use super::{ArrivalTime, StopId};

/// A single scheduled arrival of a trip at a stop.
///
/// Stops order by `sequence` only; two stops are equal when id, time and
/// sequence all match. The display name is looked up separately and
/// attached once after the stop table has been read.
#[derive(Debug, Clone)]
pub struct Stop {
    /// Feed identifier of the stop
    pub stop_id: StopId,
    /// Scheduled arrival at this stop
    pub arrival_time: ArrivalTime,
    /// Position within the trip
    pub sequence: u32,
    display_name: Option<String>,
}

impl Stop {
    /// Creates a stop with no display name yet.
    pub fn new(stop_id: impl Into<StopId>, arrival_time: ArrivalTime, sequence: u32) -> Self {
        Self {
            stop_id: stop_id.into(),
            arrival_time,
            sequence,
            display_name: None,
        }
    }

    /// Returns the resolved display name, if any.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Attaches the display name resolved from the stop table.
    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.display_name = Some(name.into());
    }

    /// Name to show for this stop, falling back to the stop id when the
    /// stop table had no entry for it.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.stop_id)
    }

    /// Key for ordering stops within a trip.
    pub fn sort_key(&self) -> u32 {
        self.sequence
    }
}

impl PartialEq for Stop {
    fn eq(&self, other: &Self) -> bool {
        self.stop_id == other.stop_id
            && self.arrival_time == other.arrival_time
            && self.sequence == other.sequence
    }
}

impl Eq for Stop {}
