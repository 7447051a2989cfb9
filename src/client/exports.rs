use crate::client::*;

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use reqwest::Client;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ExportFormat {
    Json,
    Pptx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Pptx => "pptx",
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ExportKind {
    ResultForms,
    FormResults,
    CandidatesList,
    CentersAndStationsList,
    OfficesList,
    RegionsList,
    ResultsPresentation,
}

impl ExportKind {
    pub const ALL: [ExportKind; 7] = [
        ExportKind::ResultForms,
        ExportKind::FormResults,
        ExportKind::CandidatesList,
        ExportKind::CentersAndStationsList,
        ExportKind::OfficesList,
        ExportKind::RegionsList,
        ExportKind::ResultsPresentation,
    ];

    /// The name used in file names and in the `routes.exports` configuration.
    pub fn name(&self) -> &'static str {
        match self {
            ExportKind::ResultForms => "result_forms",
            ExportKind::FormResults => "form_results",
            ExportKind::CandidatesList => "candidates_list",
            ExportKind::CentersAndStationsList => "centers_and_stations_list",
            ExportKind::OfficesList => "offices_list",
            ExportKind::RegionsList => "regions_list",
            ExportKind::ResultsPresentation => "results_presentation",
        }
    }

    pub fn format(&self) -> ExportFormat {
        match self {
            ExportKind::ResultsPresentation => ExportFormat::Pptx,
            _ => ExportFormat::Json,
        }
    }
}

impl Display for ExportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ExportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.replace('-', "_");
        ExportKind::ALL
            .iter()
            .find(|k| k.name() == s)
            .copied()
            .ok_or_else(|| {
                let names: Vec<&str> = ExportKind::ALL.iter().map(|k| k.name()).collect();
                format!("unknown export {}, expected one of: {}", s, names.join(", "))
            })
    }
}

/// `<kind>_<milliseconds since epoch>.<extension>`
pub fn export_file_name(kind: ExportKind, at: DateTime<Utc>) -> String {
    format!(
        "{}_{}.{}",
        kind.name(),
        at.timestamp_millis(),
        kind.format().extension()
    )
}

/// Fetches an export and writes it under `out_dir`.
///
/// JSON exports are checked to be valid JSON and written back compactly; presentations are
/// written as received.
pub async fn download_export(
    client: &Client,
    url: &str,
    kind: ExportKind,
    payload: &JSValue,
    out_dir: &Path,
    at: DateTime<Utc>,
) -> ClientResult<PathBuf> {
    let body = get_data_bytes(client, url, payload).await?;
    let contents = encode_export(kind, &body, url)?;
    write_file(out_dir, &export_file_name(kind, at), &contents)
}

fn encode_export(kind: ExportKind, body: &[u8], url: &str) -> ClientResult<Vec<u8>> {
    match kind.format() {
        ExportFormat::Json => {
            let value: JSValue = serde_json::from_slice(body).context(ParsingReplySnafu { url })?;
            serde_json::to_vec(&value).context(ParsingJsonSnafu {})
        }
        ExportFormat::Pptx => {
            if body.is_empty() {
                whatever!("Empty presentation from {}", url);
            }
            Ok(body.to_vec())
        }
    }
}
