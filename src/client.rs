use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

use tally_entry::*;

use crate::client::config_reader::*;
use crate::client::exports::*;
use crate::client::import_runner::*;
use crate::client::io_common::*;
use crate::client::lookups::*;
use crate::client::replay::*;
use crate::client::transport::*;

pub mod config_reader;
pub mod exports;
pub mod import_runner;
pub mod io_common;
pub mod lookups;
pub mod printed;
pub mod replay;
pub mod transport;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ClientError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Missing setting {name}"))]
    MissingSetting { name: String },
    #[snafu(display("Invalid header value for {name}"))]
    InvalidHeader {
        source: reqwest::header::InvalidHeaderValue,
        name: String,
    },
    #[snafu(display("Error building the HTTP client"))]
    BuildingClient { source: reqwest::Error },
    #[snafu(display("Error reaching {url}"))]
    Transport { source: reqwest::Error, url: String },
    #[snafu(display("Server answered {status} for {url}"))]
    HttpStatus { status: u16, url: String },
    #[snafu(display("Server answered with an unreadable body for {url}"))]
    ParsingReply {
        source: serde_json::Error,
        url: String,
    },
    #[snafu(display("Invalid import settings"))]
    InvalidImport { source: TrackerError },
    #[snafu(display("Import failed: {message} (back to {redirect})"))]
    ImportFailed { message: String, redirect: String },
    #[snafu(display("Center details do not match"))]
    CenterMismatch { source: CenterDetailsMismatch },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error + Send + Sync>, Some)))]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ClientError {
    /// Errors after which the same request may be sent again.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Transport { .. } => true,
            ClientError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

// ********* Batch import **********

/// Drives a batch import to its end. A failed import is returned as an error.
pub async fn run_import(config: &ClientConfig) -> ClientResult<String> {
    let mut tracker = config.import.build_tracker()?;
    let endpoint = HttpImportEndpoint::from_config(config)?;
    let settings = RunnerSettings {
        network_retries: config.import.network_retries(),
        retry_delay: config.import.retry_delay(),
    };
    let bars = StepBars::new(&tracker);
    let outcome = drive_import(&endpoint, &mut tracker, &settings, &bars).await?;
    match outcome {
        ImportOutcome::Completed { destination } => {
            info!("run_import: import done, destination: {}", destination);
            Ok(destination)
        }
        ImportOutcome::Failed { message, redirect } => {
            ImportFailedSnafu { message, redirect }.fail()
        }
    }
}

// ********* Lookups **********

pub async fn run_centers_stations(
    config: &ClientConfig,
    center_ids: &[u64],
) -> ClientResult<CentersStations> {
    let route = config
        .routes
        .centers_stations
        .as_deref()
        .context(MissingSettingSnafu {
            name: "routes.centersStations",
        })?;
    let url = config.server.url(route)?;
    let client = build_client(&config.server)?;
    let query = CentersStationsQuery {
        center_ids: center_ids.to_vec(),
        tally_id: config.tally_id()?,
    };
    fetch_centers_stations(&client, &url, &query).await
}

pub async fn run_regions(
    config: &ClientConfig,
    names: &[String],
) -> ClientResult<RegionHierarchy> {
    let route = config
        .routes
        .regions
        .as_deref()
        .context(MissingSettingSnafu {
            name: "routes.regions",
        })?;
    let url = config.server.url(route)?;
    let client = build_client(&config.server)?;
    let query = RegionsQuery {
        region_names: names.to_vec(),
        tally_id: config.tally_id()?,
    };
    fetch_regions(&client, &url, &query).await
}

// ********* Exports **********

/// Downloads an export into `out_dir`. `filters` is an optional JSON object merged into the
/// request payload.
pub async fn run_export(
    config: &ClientConfig,
    kind: ExportKind,
    filters: Option<&str>,
    out_dir: &Path,
) -> ClientResult<PathBuf> {
    let route = config
        .routes
        .exports
        .get(kind.name())
        .context(MissingSettingSnafu {
            name: format!("routes.exports.{}", kind.name()),
        })?;
    let url = config.server.url(route)?;
    let mut payload: JSMap<String, JSValue> = match filters {
        Some(s) => {
            let v: JSValue = serde_json::from_str(s).context(ParsingJsonSnafu {})?;
            match v {
                JSValue::Object(m) => m,
                x => whatever!("Filters must be a JSON object, got {}", x),
            }
        }
        None => JSMap::new(),
    };
    payload.insert("tally_id".to_string(), JSValue::from(config.tally_id()?));
    debug!("run_export: {:?} payload: {:?}", kind, payload);

    let client = build_client(&config.server)?;
    download_export(
        &client,
        &url,
        kind,
        &JSValue::Object(payload),
        out_dir,
        chrono::Utc::now(),
    )
    .await
}

// ********* Barcode entry **********

pub fn run_replay(config: &ClientConfig, script_path: &str) -> ClientResult<EntryReport> {
    let contents =
        fs::read_to_string(script_path).context(OpeningFileSnafu { path: script_path })?;
    let events: Vec<EntryEvent> =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    info!("run_replay: {} events from {}", events.len(), script_path);
    Ok(replay_events(config.entry.rules(), &events))
}

pub fn run_verify_center(
    center: &str,
    center_copy: &str,
    station: &str,
    station_copy: &str,
) -> ClientResult<()> {
    let details = CenterDetails {
        center_number: CopyPair::new(center, center_copy),
        station_number: CopyPair::new(station, station_copy),
    };
    for (name, pair, rule) in [
        ("center number", &details.center_number, LengthRule::CENTER_NUMBER),
        ("station number", &details.station_number, LengthRule::STATION_NUMBER),
    ] {
        match check_copy(&pair.value, &pair.copy, rule) {
            CopyCheck::Incomplete => warn!("{}: copy not complete yet", name),
            c => debug!("{}: {:?}", name, c),
        }
    }
    details.verify().context(CenterMismatchSnafu {})
}
