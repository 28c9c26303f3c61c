//! SmartThings REST client.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::SmartThingsConfig;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::source::DeviceSource;

/// Path of the endpoint discovery resource, relative to the API URL.
const ENDPOINTS_PATH: &str = "/api/smartapps/endpoints";

/// OAuth token as stored by the registration flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl OAuthToken {
    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    /// Whether the token had expired at `now`.
    ///
    /// Tokens without an expiry are stored with the zero time and never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) if expiry.year() > 1 => expiry <= now,
            _ => false,
        }
    }
}

/// Load an OAuth token from a JSON file.
pub fn load_token(path: impl AsRef<Path>) -> Result<OAuthToken> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Token(format!(
            "Failed to read token file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let token: OAuthToken = serde_json::from_str(&content)?;
    if token.access_token.trim().is_empty() {
        return Err(Error::Token(format!(
            "Token file '{}' has an empty access token",
            path.display()
        )));
    }
    if token.is_expired_at(Utc::now()) {
        return Err(Error::Token(format!(
            "Token file '{}' holds a token that expired at {}",
            path.display(),
            token.expiry.map(|e| e.to_rfc3339()).unwrap_or_default()
        )));
    }

    Ok(token)
}

#[derive(Debug, Deserialize)]
struct EndpointInfo {
    uri: String,
}

/// Authenticated client bound to one SmartApp installation.
#[derive(Debug, Clone)]
pub struct SmartThingsClient {
    http: reqwest::Client,
    endpoint: String,
}

impl SmartThingsClient {
    /// Build a client for a known endpoint.
    pub fn new(
        token: &OAuthToken,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = build_http_client(token, timeout)?;
        Ok(Self {
            http,
            endpoint: trim_endpoint(endpoint.into()),
        })
    }

    /// Load the token, resolve the SmartApp endpoint and verify the connection.
    pub async fn connect(config: &SmartThingsConfig) -> Result<Self> {
        let token_file = config
            .token_file
            .as_ref()
            .ok_or_else(|| Error::Config("smartthings.token_file is not set".to_string()))?;
        let token = load_token(token_file)?;
        let timeout = Duration::from_secs(config.timeout_secs);

        let client = match &config.endpoint {
            Some(endpoint) => Self::new(&token, endpoint.clone(), timeout)?,
            None => {
                let http = build_http_client(&token, timeout)?;
                let endpoint = discover_endpoint(&http, &config.api_url).await?;
                Self {
                    http,
                    endpoint: trim_endpoint(endpoint),
                }
            }
        };

        tracing::info!(endpoint = %client.endpoint, "Verifying SmartThings endpoint");
        let devices = client.fetch_devices().await?;
        tracing::info!(
            endpoint = %client.endpoint,
            devices = devices.len(),
            "Connected to SmartThings"
        );

        Ok(client)
    }

    /// The SmartApp endpoint URI.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch the device list from `{endpoint}/devices`.
    pub async fn fetch_devices(&self) -> Result<Vec<Device>> {
        let url = format!("{}/devices", self.endpoint);
        get_json(&self.http, &url).await
    }
}

#[async_trait]
impl DeviceSource for SmartThingsClient {
    async fn devices(&self) -> Result<Vec<Device>> {
        self.fetch_devices().await
    }
}

/// Resolve the first SmartApp endpoint installed for the token.
pub async fn discover_endpoint(http: &reqwest::Client, api_url: &str) -> Result<String> {
    let url = format!("{}{}", api_url.trim_end_matches('/'), ENDPOINTS_PATH);
    let endpoints: Vec<EndpointInfo> = get_json(http, &url).await?;

    let endpoint = endpoints
        .into_iter()
        .next()
        .map(|e| e.uri)
        .ok_or(Error::NoEndpoint)?;

    tracing::debug!(%endpoint, "Discovered SmartApp endpoint");
    Ok(endpoint)
}

fn build_http_client(token: &OAuthToken, timeout: Duration) -> Result<reqwest::Client> {
    let mut auth = HeaderValue::from_str(&token.authorization())
        .map_err(|e| Error::Token(format!("Invalid access token: {}", e)))?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);

    let client = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

async fn get_json<T: DeserializeOwned>(http: &reqwest::Client, url: &str) -> Result<T> {
    let response = http.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(response.json().await?)
}

fn trim_endpoint(mut endpoint: String) -> String {
    while endpoint.ends_with('/') {
        endpoint.pop();
    }
    endpoint
}
