//! Persisted report settings: route selection, stop exclusions, clock format.
//!
//! Settings survive between runs as a small JSON object. A previous report
//! embeds the same object under its `settings` key, so either a bare
//! settings file or an old report can seed the next run.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ExcludeStops, Route, StopId};

/// Errors from loading or saving settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The settings file could not be read or written
    #[error("settings file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid settings JSON
    #[error("settings file {} is not valid: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Which routes to report and which of their stops to leave out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Referred-to keys of the routes to include; empty means every route
    #[serde(rename = "selectedRoutes", default)]
    pub selected_routes: Vec<String>,

    /// Stop ids to omit, per referred-to key
    #[serde(rename = "excludeStops", default)]
    pub exclude_stops: ExcludeStops,

    /// Render times as 12-hour clock
    #[serde(rename = "_12hourClock", default = "default_twelve_hour_clock")]
    pub twelve_hour_clock: bool,
}

fn default_twelve_hour_clock() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            selected_routes: Vec::new(),
            exclude_stops: ExcludeStops::new(),
            twelve_hour_clock: default_twelve_hour_clock(),
        }
    }
}

impl Settings {
    /// Whether the route with this referred-to key is part of the report.
    pub fn is_selected(&self, referred_to: &str) -> bool {
        self.selected_routes.is_empty() || self.selected_routes.iter().any(|r| r == referred_to)
    }

    /// Excludes every stop of `route` whose display name is not in `kept`.
    ///
    /// Replaces any earlier exclusions for the route. Stop names are taken
    /// from the route's current topology, so the route must have been
    /// finalized without exclusions for every stop to be considered.
    pub fn exclude_unkept(&mut self, route: &Route, kept: &[String]) {
        let excluded: BTreeSet<StopId> = route
            .all_stops()
            .into_iter()
            .filter(|(_, name)| !kept.contains(name))
            .map(|(stop_id, _)| stop_id)
            .collect();
        debug!(route = %route.referred_to, excluded = excluded.len(), "updated exclusions");
        self.exclude_stops.insert(route.referred_to.clone(), excluded);
    }

    /// Layers command-line choices over these settings.
    ///
    /// Each field of `overrides` that was given replaces the stored value
    /// as a whole.
    pub fn apply(&mut self, overrides: SettingsOverrides) {
        if !overrides.routes.is_empty() {
            self.selected_routes = overrides.routes;
        }
        if !overrides.exclude.is_empty() {
            let mut exclude_stops = ExcludeStops::new();
            for (route, stop_id) in overrides.exclude {
                exclude_stops.entry(route).or_default().insert(stop_id);
            }
            self.exclude_stops = exclude_stops;
        }
        if let Some(twelve_hour_clock) = overrides.twelve_hour_clock {
            self.twelve_hour_clock = twelve_hour_clock;
        }
    }
}

/// Settings supplied for a single run, taking precedence over stored ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    /// Routes to select, by referred-to key
    pub routes: Vec<String>,
    /// (referred-to key, stop id) pairs to exclude
    pub exclude: Vec<(String, StopId)>,
    /// Clock format
    pub twelve_hour_clock: Option<bool>,
}

/// Somewhere settings are kept between runs.
pub trait SettingsStore {
    /// Loads stored settings, or `None` when nothing has been stored yet.
    fn load(&self) -> Result<Option<Settings>, SettingsError>;

    /// Stores settings, replacing what was there.
    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}

/// Settings kept in a JSON file.
///
/// Loading also accepts a previous report, whose `settings` field holds
/// the settings it was generated with.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn json_error(&self, source: serde_json::Error) -> SettingsError {
        SettingsError::Json {
            path: self.path.clone(),
            source,
        }
    }

    fn io_error(&self, source: std::io::Error) -> SettingsError {
        SettingsError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<Option<Settings>, SettingsError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        let mut value: serde_json::Value =
            serde_json::from_str(&contents).map_err(|e| self.json_error(e))?;

        // A previous report carries its settings in a nested block.
        if let Some(embedded) = value.get_mut("settings") {
            value = embedded.take();
        }
        let settings = serde_json::from_value(value).map_err(|e| self.json_error(e))?;
        Ok(Some(settings))
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_string_pretty(settings).map_err(|e| self.json_error(e))?;
        std::fs::write(&self.path, json).map_err(|e| self.io_error(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArrivalTime, Stop, Trip};
    use tempfile::tempdir;

    fn settings() -> Settings {
        Settings {
            selected_routes: vec!["Red".into()],
            exclude_stops: ExcludeStops::from([(
                "Red".to_string(),
                BTreeSet::from(["70061".to_string()]),
            )]),
            twelve_hour_clock: false,
        }
    }

    #[test]
    fn default_settings() {
        let settings = Settings::default();

        assert!(settings.selected_routes.is_empty());
        assert!(settings.exclude_stops.is_empty());
        assert!(settings.twelve_hour_clock);
    }

    #[test]
    fn empty_selection_selects_everything() {
        assert!(Settings::default().is_selected("Anything"));

        let settings = settings();
        assert!(settings.is_selected("Red"));
        assert!(!settings.is_selected("Blue"));
    }

    #[test]
    fn json_uses_legacy_keys() {
        let json = serde_json::to_value(settings()).unwrap();

        assert_eq!(json["selectedRoutes"], serde_json::json!(["Red"]));
        assert_eq!(json["excludeStops"]["Red"], serde_json::json!(["70061"]));
        assert_eq!(json["_12hourClock"], serde_json::json!(false));
    }

    #[test]
    fn missing_keys_take_defaults() {
        let parsed: Settings = serde_json::from_str(r#"{"selectedRoutes":["1"]}"#).unwrap();

        assert_eq!(parsed.selected_routes, vec!["1"]);
        assert!(parsed.exclude_stops.is_empty());
        assert!(parsed.twelve_hour_clock);
    }

    #[test]
    fn overrides_replace_given_fields_only() {
        let mut settings = settings();

        settings.apply(SettingsOverrides {
            routes: vec![],
            exclude: vec![
                ("Blue".into(), "B1".into()),
                ("Blue".into(), "B2".into()),
            ],
            twelve_hour_clock: None,
        });

        assert_eq!(settings.selected_routes, vec!["Red"]);
        assert!(!settings.exclude_stops.contains_key("Red"));
        assert_eq!(settings.exclude_stops["Blue"].len(), 2);
        assert!(!settings.twelve_hour_clock);

        settings.apply(SettingsOverrides {
            routes: vec!["Blue".into(), "Green".into()],
            twelve_hour_clock: Some(true),
            ..SettingsOverrides::default()
        });

        assert_eq!(settings.selected_routes, vec!["Blue", "Green"]);
        assert_eq!(settings.exclude_stops["Blue"].len(), 2);
        assert!(settings.twelve_hour_clock);
    }

    #[test]
    fn exclude_unkept_turns_kept_names_into_exclusions() {
        let mut route = Route::new("R1", "MBTA", "Red", "Red Line", "Red");
        let mut trip = Trip::new("R1", "WK", "T1", "Ashmont");
        for (seq, (id, name)) in [("A", "Alewife"), ("D", "Davis"), ("P", "Porter")]
            .into_iter()
            .enumerate()
        {
            let mut stop = Stop::new(id, ArrivalTime::parse("8:00:00").unwrap(), seq as u32);
            stop.set_display_name(name);
            trip.add_stop(stop);
        }
        route.add_trip(trip);
        route.finalize(&ExcludeStops::new());

        let mut settings = settings();
        settings.exclude_unkept(&route, &["Alewife".to_string(), "Porter".to_string()]);

        assert_eq!(
            settings.exclude_stops["Red"],
            BTreeSet::from(["D".to_string()])
        );
    }

    #[test]
    fn store_round_trip() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("settings.json"));

        store.save(&settings()).unwrap();

        assert_eq!(store.load().unwrap(), Some(settings()));
    }

    #[test]
    fn store_missing_file_is_none() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));

        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn store_reads_settings_embedded_in_a_report() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mbta.json");
        let report = serde_json::json!({
            "title": "MBTA",
            "routes": [],
            "settings": settings(),
        });
        std::fs::write(&path, report.to_string()).unwrap();

        let loaded = JsonFileStore::new(&path).load().unwrap();

        assert_eq!(loaded, Some(settings()));
    }

    #[test]
    fn store_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "<html>not json</html>").unwrap();

        let err = JsonFileStore::new(&path).load().unwrap_err();

        assert!(matches!(err, SettingsError::Json { .. }));
        assert!(err.to_string().contains("settings.json"));
    }
}
