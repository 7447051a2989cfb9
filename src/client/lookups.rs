//! Cascading selections of the report filters: the stations of the selected centers, and the
//! constituencies and sub-constituencies of the selected regions.

use crate::client::*;

use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CentersStationsQuery {
    pub center_ids: Vec<u64>,
    pub tally_id: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct CentersStations {
    #[serde(default)]
    pub station_ids: Vec<u64>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RegionsQuery {
    pub region_names: Vec<String>,
    pub tally_id: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionHierarchy {
    #[serde(default)]
    pub constituency_names: Vec<String>,
    #[serde(default)]
    pub sub_constituencies_code: Vec<String>,
}

/// The stations of the given centers. An empty selection clears the stations without asking
/// the server.
pub async fn fetch_centers_stations(
    client: &Client,
    url: &str,
    query: &CentersStationsQuery,
) -> ClientResult<CentersStations> {
    if query.center_ids.is_empty() {
        debug!("fetch_centers_stations: no center selected");
        return Ok(CentersStations::default());
    }
    let res: CentersStations = get_data_json(client, url, query).await?;
    info!(
        "fetch_centers_stations: {} stations for {} centers",
        res.station_ids.len(),
        query.center_ids.len()
    );
    Ok(res)
}

/// The constituencies and sub-constituencies of the given regions. An empty selection clears
/// both lists without asking the server.
pub async fn fetch_regions(
    client: &Client,
    url: &str,
    query: &RegionsQuery,
) -> ClientResult<RegionHierarchy> {
    if query.region_names.is_empty() {
        debug!("fetch_regions: no region selected");
        return Ok(RegionHierarchy::default());
    }
    let res: RegionHierarchy = get_data_json(client, url, query).await?;
    info!(
        "fetch_regions: {} constituencies, {} sub-constituencies",
        res.constituency_names.len(),
        res.sub_constituencies_code.len()
    );
    Ok(res)
}
