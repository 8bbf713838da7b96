//! Assembly configuration.

use crate::domain::RouteKeyField;

/// Configuration parameters for schedule assembly.
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Number of workers scanning stop times.
    /// One scans on the calling task without spawning.
    pub workers: usize,

    /// Which routes.txt column is the referred-to key used for
    /// selection and exclusion.
    pub route_key: RouteKeyField,
}

impl AssemblerConfig {
    /// Create a new configuration with the given parameters.
    pub fn new(workers: usize, route_key: RouteKeyField) -> Self {
        Self { workers, route_key }
    }

    /// Set the number of stop-time workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the referred-to key column.
    pub fn with_route_key(mut self, route_key: RouteKeyField) -> Self {
        self.route_key = route_key;
        self
    }

    /// Returns the worker count, never less than one.
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }

    /// Returns true if stop times are scanned by spawned workers.
    pub fn is_parallel(&self) -> bool {
        self.worker_count() > 1
    }
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            route_key: RouteKeyField::ShortName,
        }
    }
}
