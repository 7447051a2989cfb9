use crate::client::*;

use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::Client;
use serde::Serialize;

pub const CSRF_HEADER: &str = "x-csrftoken";

/// Joins a route to a base URL, with exactly one slash between them.
pub fn join_url(base: &str, route: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        route.trim_start_matches('/')
    )
}

/// The lookup and export endpoints take their arguments as a JSON document in a `data`
/// query parameter.
pub fn data_param<T: Serialize>(payload: &T) -> ClientResult<String> {
    serde_json::to_string(payload).context(ParsingJsonSnafu {})
}

/// An HTTP client that sends the session cookie and the CSRF token with every request.
pub fn build_client(server: &ServerSettings) -> ClientResult<Client> {
    let mut headers = HeaderMap::new();
    if let Some(token) = &server.csrf_token {
        let v = HeaderValue::from_str(token).context(InvalidHeaderSnafu { name: CSRF_HEADER })?;
        headers.insert(CSRF_HEADER, v);
    }
    if let Some(cookie) = &server.cookie {
        let mut v = HeaderValue::from_str(cookie).context(InvalidHeaderSnafu { name: "Cookie" })?;
        v.set_sensitive(true);
        headers.insert(COOKIE, v);
    }
    Client::builder()
        .user_agent(concat!("tallyclient/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .cookie_store(true)
        .timeout(server.timeout())
        .build()
        .context(BuildingClientSnafu {})
}

/// Writes a downloaded file, creating the directory if needed.
pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> ClientResult<PathBuf> {
    fs::create_dir_all(dir).context(WritingFileSnafu {
        path: dir.display().to_string(),
    })?;
    let path = dir.join(name);
    fs::write(&path, contents).context(WritingFileSnafu {
        path: path.display().to_string(),
    })?;
    info!("write_file: {} bytes written to {:?}", contents.len(), path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(join_url("http://h", "a/b"), "http://h/a/b");
        assert_eq!(join_url("http://h/", "/a/b"), "http://h/a/b");
        assert_eq!(join_url("http://h/tally", "ajax"), "http://h/tally/ajax");
    }

    #[test]
    fn data_param_is_compact_json() {
        let s = data_param(&json!({"center_ids": [1, 2], "tally_id": 4})).unwrap();
        assert_eq!(s, r#"{"center_ids":[1,2],"tally_id":4}"#);
    }

    #[test]
    fn rejects_bad_header_values() {
        let server = ServerSettings {
            csrf_token: Some("bad\ntoken".to_string()),
            ..ServerSettings::default()
        };
        assert!(matches!(
            build_client(&server),
            Err(ClientError::InvalidHeader { .. })
        ));
        assert!(build_client(&ServerSettings::default()).is_ok());
    }

    #[test]
    fn write_file_creates_the_directory() {
        let dir = std::env::temp_dir()
            .join(format!("tally-write-{}", std::process::id()))
            .join("nested");
        let path = write_file(&dir, "x.json", b"{}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
        fs::remove_dir_all(dir.parent().unwrap()).unwrap();
    }
}
