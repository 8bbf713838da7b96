use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Local;
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ttime::assembler::{AssembleError, AssemblerConfig, FeedIdentity, ScheduleAssembler};
use ttime::domain::{ExcludeStops, RouteKeyField};
use ttime::feed::{AgencyRow, FeedError, FeedSource, Table};
use ttime::settings::{JsonFileStore, Settings, SettingsOverrides, SettingsStore};

/// Exit status when the report or settings cannot be written.
const CANNOT_CREATE: u8 = 73;

/// Build per-route timetables and a service calendar from a GTFS feed.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// GTFS directory or zip archive
    #[arg(default_value = ".")]
    feed: PathBuf,

    /// Report file; defaults to `<agency id>.json`
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Settings file to read and save; defaults to reading the previous report
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Report title; defaults to the agency name
    #[arg(long)]
    title: Option<String>,

    /// Route to include, by route key (repeatable; none means all)
    #[arg(long = "route")]
    routes: Vec<String>,

    /// Stop to leave out of a route, as ROUTE=STOP_ID (repeatable)
    #[arg(long, value_parser = parse_pair)]
    exclude: Vec<(String, String)>,

    /// Stop to keep on a route, as ROUTE=NAME; every other stop of that route is excluded
    #[arg(long, value_parser = parse_pair)]
    keep: Vec<(String, String)>,

    /// Print each route's stop choices and exit
    #[arg(long)]
    list_stops: bool,

    /// routes.txt column used as the route key
    #[arg(long, value_enum, default_value_t = RouteKey::ShortName)]
    route_key: RouteKey,

    /// Worker tasks used to read stop times
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Render times on a 12-hour clock
    #[arg(long)]
    twelve_hour_clock: Option<bool>,
}

/// Command-line names for [`RouteKeyField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RouteKey {
    ShortName,
    LongName,
    RouteId,
}

impl From<RouteKey> for RouteKeyField {
    fn from(key: RouteKey) -> Self {
        match key {
            RouteKey::ShortName => RouteKeyField::ShortName,
            RouteKey::LongName => RouteKeyField::LongName,
            RouteKey::RouteId => RouteKeyField::RouteId,
        }
    }
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() && !value.is_empty() => {
            Ok((key.to_string(), value.to_string()))
        }
        _ => Err(format!("expected ROUTE=VALUE, got `{s}`")),
    }
}

#[derive(Debug, thiserror::Error)]
enum Failure {
    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("failed to write {path}: {reason}")]
    Output { path: String, reason: String },
}

impl Failure {
    fn exit_code(&self) -> u8 {
        match self {
            Failure::Assemble(e) => e.exit_code(),
            Failure::Feed(e) => e.kind().exit_code(),
            Failure::Output { .. } => CANNOT_CREATE,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "failed to build schedule");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), Failure> {
    let source = FeedSource::open(&cli.feed)?;
    let agencies: Vec<AgencyRow> = source.read_table(Table::Agency)?;
    let identity = FeedIdentity::from_agencies(&agencies, cli.title.clone());
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(identity.output_file_name()));

    let store = JsonFileStore::new(cli.settings.clone().unwrap_or_else(|| output.clone()));
    let mut settings = match store.load() {
        Ok(Some(settings)) => {
            info!(path = %store.path().display(), "loaded settings");
            settings
        }
        Ok(None) => Settings::default(),
        Err(e) => {
            warn!(error = %e, "ignoring unreadable settings");
            Settings::default()
        }
    };
    settings.apply(SettingsOverrides {
        routes: cli.routes,
        exclude: cli.exclude,
        twelve_hour_clock: cli.twelve_hour_clock,
    });

    let config = AssemblerConfig::default()
        .with_workers(cli.workers)
        .with_route_key(cli.route_key.into());
    let mut assembler =
        ScheduleAssembler::load(&source, config, identity.agency.clone(), &settings).await?;

    if cli.list_stops || !cli.keep.is_empty() {
        assembler.finalize(&ExcludeStops::new());
        if cli.list_stops {
            for route in assembler.routes() {
                println!("{}: {}", route.referred_to, route.stop_choices().join(", "));
            }
            return Ok(());
        }
        let mut kept: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (route, name) in cli.keep {
            kept.entry(route).or_default().push(name);
        }
        for (key, names) in &kept {
            match assembler.route(key) {
                Some(route) => settings.exclude_unkept(route, names),
                None => warn!(route = %key, "cannot keep stops of an unselected route"),
            }
        }
    }

    assembler.finalize(&settings.exclude_stops);
    let schedule = assembler.export(&identity.title, &settings, Local::now().into());

    let json = serde_json::to_string_pretty(&schedule).map_err(|e| Failure::Output {
        path: output.display().to_string(),
        reason: e.to_string(),
    })?;
    std::fs::write(&output, json).map_err(|e| Failure::Output {
        path: output.display().to_string(),
        reason: e.to_string(),
    })?;

    if cli.settings.is_some() {
        store.save(&settings).map_err(|e| Failure::Output {
            path: store.path().display().to_string(),
            reason: e.to_string(),
        })?;
    }

    info!(
        path = %output.display(),
        routes = schedule.routes.len(),
        "wrote schedule"
    );
    Ok(())
}
