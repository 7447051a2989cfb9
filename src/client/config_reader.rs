use crate::client::*;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tally_entry::builder::ImportBuilder;
use tally_entry::{EntryRules, ImportJobProgress};

pub const DEFAULT_TOTAL_STEPS: u32 = 5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(rename = "baseUrl")]
    pub base_url: Option<String>,
    #[serde(rename = "csrfToken")]
    pub csrf_token: Option<String>,
    /// Raw `Cookie` header sent with every request (session and CSRF cookies).
    #[serde(rename = "cookie")]
    pub cookie: Option<String>,
    #[serde(rename = "timeoutMs")]
    pub timeout_ms: Option<u64>,
}

impl ServerSettings {
    pub fn timeout(&self) -> Duration {
        self.timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Resolves a route against the base URL. Absolute routes are kept as they are.
    pub fn url(&self, route: &str) -> ClientResult<String> {
        if route.starts_with("http://") || route.starts_with("https://") {
            return Ok(route.to_string());
        }
        let base = self
            .base_url
            .as_deref()
            .context(MissingSettingSnafu { name: "server.baseUrl" })?;
        Ok(join_url(base, route))
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSettings {
    #[serde(rename = "route")]
    pub route: Option<String>,
    #[serde(rename = "taskRoute")]
    pub task_route: Option<String>,
    #[serde(rename = "destination")]
    pub destination: Option<String>,
    #[serde(rename = "fallback")]
    pub fallback: Option<String>,
    #[serde(rename = "totalSteps")]
    pub total_steps: Option<u32>,
    #[serde(rename = "totals")]
    pub totals: Option<Vec<u64>>,
    #[serde(rename = "offsets")]
    pub offsets: Option<Vec<u64>>,
    #[serde(rename = "pollDelayMs")]
    pub poll_delay_ms: Option<u64>,
    #[serde(rename = "maxTaskPolls")]
    pub max_task_polls: Option<u32>,
    #[serde(rename = "networkRetries")]
    pub network_retries: Option<u32>,
    #[serde(rename = "retryDelayMs")]
    pub retry_delay_ms: Option<u64>,
}

impl ImportSettings {
    pub fn build_tracker(&self) -> ClientResult<ImportJobProgress> {
        let destination = self
            .destination
            .as_deref()
            .context(MissingSettingSnafu { name: "import.destination" })?;
        let fallback = self
            .fallback
            .as_deref()
            .context(MissingSettingSnafu { name: "import.fallback" })?;
        let total_steps = self.total_steps.unwrap_or(DEFAULT_TOTAL_STEPS);

        let mut builder = ImportBuilder::new(total_steps, destination, fallback)
            .context(InvalidImportSnafu {})?
            .max_task_polls(self.max_task_polls);
        if let Some(ms) = self.poll_delay_ms {
            builder = builder.poll_delay(Duration::from_millis(ms));
        }
        if let Some(totals) = &self.totals {
            builder = builder.totals(totals).context(InvalidImportSnafu {})?;
        }
        for (idx, offset) in self.offsets.iter().flatten().enumerate() {
            builder = builder
                .offset(idx as u32 + 1, *offset)
                .context(InvalidImportSnafu {})?;
        }
        builder.build().context(InvalidImportSnafu {})
    }

    pub fn network_retries(&self) -> u32 {
        self.network_retries.unwrap_or(0)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms.unwrap_or(1_000))
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntrySettings {
    #[serde(rename = "typingThresholdMs")]
    pub typing_threshold_ms: Option<u64>,
    #[serde(rename = "scanDebounceMs")]
    pub scan_debounce_ms: Option<u64>,
    #[serde(rename = "minBarcodeLength")]
    pub min_barcode_length: Option<usize>,
}

impl EntrySettings {
    pub fn rules(&self) -> EntryRules {
        let d = EntryRules::DEFAULT_RULES;
        EntryRules {
            typing_threshold: self
                .typing_threshold_ms
                .map(Duration::from_millis)
                .unwrap_or(d.typing_threshold),
            scan_debounce: self
                .scan_debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(d.scan_debounce),
            min_barcode_length: self.min_barcode_length.unwrap_or(d.min_barcode_length),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteSettings {
    #[serde(rename = "centersStations")]
    pub centers_stations: Option<String>,
    #[serde(rename = "regions")]
    pub regions: Option<String>,
    /// Export routes, by export name (`result_forms`, `candidates_list`, ...).
    #[serde(rename = "exports", default)]
    pub exports: BTreeMap<String, String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(rename = "server", default)]
    pub server: ServerSettings,
    #[serde(rename = "tallyId")]
    pub tally_id: Option<u64>,
    #[serde(rename = "import", default)]
    pub import: ImportSettings,
    #[serde(rename = "entry", default)]
    pub entry: EntrySettings,
    #[serde(rename = "routes", default)]
    pub routes: RouteSettings,
}

impl ClientConfig {
    pub fn read(path: &str) -> ClientResult<ClientConfig> {
        let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
        let config: ClientConfig =
            serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
        debug!("read config: {:?}", config);
        Ok(config)
    }

    pub fn tally_id(&self) -> ClientResult<u64> {
        self.tally_id.context(MissingSettingSnafu { name: "tallyId" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_has_defaults() {
        let c: ClientConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(c, ClientConfig::default());
        assert_eq!(c.entry.rules(), EntryRules::DEFAULT_RULES);
        assert!(c.tally_id().is_err());
    }

    #[test]
    fn reads_camel_case_keys() {
        let c: ClientConfig = serde_json::from_str(
            r#"{
                "server": {"baseUrl": "https://tally.example.org/", "csrfToken": "tok"},
                "tallyId": 3,
                "import": {"route": "/data/batch", "destination": "/done", "fallback": "/upload",
                           "totalSteps": 7, "totals": [1, 2], "pollDelayMs": 10},
                "entry": {"typingThresholdMs": 50},
                "routes": {"exports": {"result_forms": "/ajax/result-forms"}}
            }"#,
        )
        .unwrap();
        assert_eq!(c.tally_id().unwrap(), 3);
        assert_eq!(c.entry.rules().typing_threshold, Duration::from_millis(50));
        assert_eq!(
            c.server.url("/data/batch").unwrap(),
            "https://tally.example.org/data/batch"
        );
        assert_eq!(
            c.routes.exports.get("result_forms").map(|s| s.as_str()),
            Some("/ajax/result-forms")
        );

        let t = c.import.build_tracker().unwrap();
        assert_eq!(t.total_steps(), 7);
        assert_eq!(t.step(2).unwrap().total, Some(2));
        assert_eq!(t.step(3).unwrap().total, None);
        assert_eq!(t.plan().poll_delay, Duration::from_millis(10));
    }

    #[test]
    fn tracker_needs_redirects() {
        let settings = ImportSettings::default();
        assert!(matches!(
            settings.build_tracker(),
            Err(ClientError::MissingSetting { .. })
        ));
    }

    #[test]
    fn absolute_routes_skip_the_base_url() {
        let s = ServerSettings::default();
        assert_eq!(
            s.url("http://other.example/ping").unwrap(),
            "http://other.example/ping"
        );
        assert!(s.url("/relative").is_err());
    }
}
