use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::EffectiveConfig;

const USER_AGENT: &str = concat!("empowerctl/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid controller URL `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("building HTTP client")]
    Builder(#[source] reqwest::Error),
    #[error("{method} {url} failed")]
    Transport {
        method: Method,
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {url} returned HTTP {actual}, expected {expected}{}", body_suffix(.body))]
    UnexpectedStatus {
        method: Method,
        url: Url,
        expected: StatusCode,
        actual: StatusCode,
        body: String,
    },
    #[error("unexpected response body from {url}")]
    Decode {
        url: Url,
        #[source]
        source: serde_json::Error,
    },
}

fn body_suffix(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return String::new();
    }
    if body.chars().count() > 200 {
        let head: String = body.chars().take(200).collect();
        format!("\n\nResponse: {head}...")
    } else {
        format!("\n\nResponse: {body}")
    }
}

#[derive(Debug, Clone)]
pub struct ResponseData {
    pub url: Url,
    pub status: u16,
    pub body: String,
}

impl ResponseData {
    /// Decodes the body into `T`, naming the endpoint on failure.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|source| ApiError::Decode {
            url: self.url.clone(),
            source,
        })
    }
}

/// Blocking client for the controller's REST API.
///
/// Each call names the status it expects; any other status is an error.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: Client,
    username: String,
    password: String,
}

impl ApiClient {
    pub fn new(config: &EffectiveConfig) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(&config.url).map_err(|e| ApiError::InvalidBaseUrl {
            url: config.url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl {
                url: config.url.clone(),
                reason: "not a base URL".into(),
            });
        }
        // Url::join replaces the last segment unless the path ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .user_agent(HeaderValue::from_static(USER_AGENT))
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(ApiError::Builder)?;

        Ok(Self {
            base_url,
            http,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn get(&self, path: &str, expected: StatusCode) -> Result<ResponseData, ApiError> {
        self.request(Method::GET, path, Option::<&()>::None, expected)
    }

    pub fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        expected: StatusCode,
    ) -> Result<ResponseData, ApiError> {
        self.request(Method::POST, path, Some(body), expected)
    }

    pub fn delete(&self, path: &str, expected: StatusCode) -> Result<ResponseData, ApiError> {
        self.request(Method::DELETE, path, Option::<&()>::None, expected)
    }

    fn request<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&T>,
        expected: StatusCode,
    ) -> Result<ResponseData, ApiError> {
        let url = self.url_for(path)?;

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(%method, %url, "sending request");
        let response = request.send().map_err(|source| ApiError::Transport {
            method: method.clone(),
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        let text = response.text().map_err(|source| ApiError::Transport {
            method: method.clone(),
            url: url.clone(),
            source,
        })?;
        debug!(%method, %url, status = status.as_u16(), "received response");

        if status != expected {
            return Err(ApiError::UnexpectedStatus {
                method,
                url,
                expected,
                actual: status,
                body: text,
            });
        }

        Ok(ResponseData {
            url,
            status: status.as_u16(),
            body: text,
        })
    }

    fn url_for(&self, path: &str) -> Result<Url, ApiError> {
        let normalized = path.trim_start_matches('/');
        self.base_url
            .join(normalized)
            .map_err(|e| ApiError::InvalidBaseUrl {
                url: format!("{}{}", self.base_url, normalized),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::{Value, json};

    fn config(url: &str) -> EffectiveConfig {
        EffectiveConfig {
            url: url.to_string(),
            username: "root".into(),
            password: "root".into(),
        }
    }

    #[test]
    fn sends_basic_auth_and_reads_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/projects")
                .header("Authorization", "Basic cm9vdDpyb290")
                .header("Accept", "application/json");
            then.status(200).json_body(json!({"ok": true}));
        });

        let client = ApiClient::new(&config(&server.base_url())).unwrap();
        let response = client.get("/api/v1/projects", StatusCode::OK).unwrap();

        mock.assert();
        assert_eq!(response.status, 200);
        let json: Value = response.decode().unwrap();
        assert_eq!(json["ok"], true);
    }

    #[test]
    fn posts_json_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/projects/p/wifi_slices")
                .json_body(json!({"version": "1.0", "slice_id": 2}));
            then.status(201);
        });

        let client = ApiClient::new(&config(&server.base_url())).unwrap();
        let response = client
            .post_json(
                "/api/v1/projects/p/wifi_slices",
                &json!({"version": "1.0", "slice_id": 2}),
                StatusCode::CREATED,
            )
            .unwrap();

        mock.assert();
        assert_eq!(response.status, 201);
    }

    #[test]
    fn keeps_base_path_prefix() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(DELETE).path("/empower/api/v1/projects/p/wifi_slices/3");
            then.status(204);
        });

        let client = ApiClient::new(&config(&server.url("/empower"))).unwrap();
        client
            .delete("/api/v1/projects/p/wifi_slices/3", StatusCode::NO_CONTENT)
            .unwrap();

        mock.assert();
    }

    #[test]
    fn rejects_unexpected_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path("/api/v1/projects/p/wifi_slices/3");
            then.status(404).body("slice 3 not found");
        });

        let client = ApiClient::new(&config(&server.base_url())).unwrap();
        let err = client
            .delete("/api/v1/projects/p/wifi_slices/3", StatusCode::NO_CONTENT)
            .unwrap_err();

        match &err {
            ApiError::UnexpectedStatus {
                expected, actual, ..
            } => {
                assert_eq!(*expected, StatusCode::NO_CONTENT);
                assert_eq!(*actual, StatusCode::NOT_FOUND);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let message = err.to_string();
        assert!(message.contains("HTTP 404 Not Found, expected 204 No Content"));
        assert!(message.contains("slice 3 not found"));
    }

    #[test]
    fn decode_errors_name_the_endpoint() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/projects/p");
            then.status(200).body("<html>oops</html>");
        });

        let client = ApiClient::new(&config(&server.base_url())).unwrap();
        let response = client.get("/api/v1/projects/p", StatusCode::OK).unwrap();
        let err = response.decode::<Value>().unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
        assert!(err.to_string().contains("/api/v1/projects/p"));
    }

    #[test]
    fn rejects_invalid_base_url() {
        let err = ApiClient::new(&config("not a url")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn truncates_long_error_bodies() {
        let long = "x".repeat(500);
        let suffix = body_suffix(&long);
        assert!(suffix.ends_with("..."));
        assert_eq!(suffix.matches('x').count(), 200);
        assert_eq!(body_suffix("  "), "");
    }
}
