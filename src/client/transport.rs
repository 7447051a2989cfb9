use crate::client::*;

use async_trait::async_trait;
use reqwest::header::REFERER;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Where the import requests go.
///
/// The runner only sees this trait, so that imports can be driven against a scripted server.
#[async_trait]
pub trait ImportEndpoint {
    async fn send(&self, request: &ImportRequest) -> ClientResult<StepReply>;
}

/// The import endpoints of a tally server: a form POST per request.
pub struct HttpImportEndpoint {
    client: Client,
    step_url: String,
    task_url: Option<String>,
}

impl HttpImportEndpoint {
    pub fn new(client: Client, step_url: String, task_url: Option<String>) -> HttpImportEndpoint {
        HttpImportEndpoint {
            client,
            step_url,
            task_url,
        }
    }

    pub fn from_config(config: &ClientConfig) -> ClientResult<HttpImportEndpoint> {
        let route = config
            .import
            .route
            .as_deref()
            .context(MissingSettingSnafu { name: "import.route" })?;
        let step_url = config.server.url(route)?;
        let task_url = match config.import.task_route.as_deref() {
            Some(r) => Some(config.server.url(r)?),
            None => None,
        };
        let client = build_client(&config.server)?;
        Ok(HttpImportEndpoint::new(client, step_url, task_url))
    }

    fn target(
        &self,
        request: &ImportRequest,
    ) -> ClientResult<(&str, Vec<(&'static str, String)>)> {
        match request {
            ImportRequest::Step { offset, step } => Ok((
                self.step_url.as_str(),
                vec![("offset", offset.to_string()), ("step", step.to_string())],
            )),
            ImportRequest::PollTask { step, task_id } => {
                let url = self
                    .task_url
                    .as_deref()
                    .context(MissingSettingSnafu { name: "import.taskRoute" })?;
                Ok((
                    url,
                    vec![("step", step.to_string()), ("task_id", task_id.clone())],
                ))
            }
        }
    }
}

#[async_trait]
impl ImportEndpoint for HttpImportEndpoint {
    async fn send(&self, request: &ImportRequest) -> ClientResult<StepReply> {
        let (url, form) = self.target(request)?;
        debug!("send: POST {} {:?}", url, form);
        let response = self
            .client
            .post(url)
            // Django checks the referer of secure POSTs against the CSRF token.
            .header(REFERER, url)
            .form(&form)
            .send()
            .await
            .context(TransportSnafu { url })?;
        read_json(response, url).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, url: &str) -> ClientResult<T> {
    let bytes = read_bytes(response, url).await?;
    serde_json::from_slice(&bytes).context(ParsingReplySnafu { url })
}

async fn read_bytes(response: Response, url: &str) -> ClientResult<Vec<u8>> {
    let status = response.status();
    if !status.is_success() {
        return HttpStatusSnafu {
            status: status.as_u16(),
            url,
        }
        .fail();
    }
    let bytes = response.bytes().await.context(TransportSnafu { url })?;
    Ok(bytes.to_vec())
}

async fn get_data<Q: Serialize>(client: &Client, url: &str, query: &Q) -> ClientResult<Response> {
    let data = data_param(query)?;
    debug!("get_data: GET {} data={}", url, data);
    client
        .get(url)
        .query(&[("data", data.as_str())])
        .send()
        .await
        .context(TransportSnafu { url })
}

/// A GET with a `data` parameter, answered with JSON.
pub async fn get_data_json<Q: Serialize, R: DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &Q,
) -> ClientResult<R> {
    let response = get_data(client, url, query).await?;
    read_json(response, url).await
}

/// A GET with a `data` parameter, answered with a file.
pub async fn get_data_bytes<Q: Serialize>(
    client: &Client,
    url: &str,
    query: &Q,
) -> ClientResult<Vec<u8>> {
    let response = get_data(client, url, query).await?;
    read_bytes(response, url).await
}
