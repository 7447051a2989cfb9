use crate::client::*;

use std::time::Duration;

use reqwest::Client;

pub const PRINTED_TIMEOUT: Duration = Duration::from_secs(10);

/// Tells the server that a cover was printed.
///
/// Pages without a print button have no URL and send nothing. Failures are logged and never
/// retried. Returns true when the server acknowledged the ping.
pub async fn set_as_printed(client: &Client, url: Option<&str>) -> bool {
    let url = match url {
        Some(u) => u,
        None => {
            debug!("set_as_printed: no printed URL");
            return false;
        }
    };
    let res = client.get(url).timeout(PRINTED_TIMEOUT).send().await;
    match res {
        Ok(r) if r.status().is_success() => {
            info!("set_as_printed: {} acknowledged", url);
            true
        }
        Ok(r) => {
            warn!("set_as_printed: {} answered {}", url, r.status());
            false
        }
        Err(e) => {
            warn!("set_as_printed: {} failed: {}", url, e);
            false
        }
    }
}
