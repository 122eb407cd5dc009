//! HTTP client for Marathon API communication.

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::CliError;

/// Query parameters attached to a request.
pub type Query<'a> = &'a [(&'a str, &'a str)];

/// API client for communicating with Marathon.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client from config.
    pub fn new(config: &Config, url_override: Option<&str>) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = config.token() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("token={}", token))
                    .context("Invalid token format")?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config
                .marathon_url(url_override)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    /// Build a URL for an endpoint.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Make a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: Query<'_>) -> Result<T, CliError> {
        let response = self.send(Method::GET, path, query, None).await?;
        parse_json(response).await
    }

    /// Make a GET request and return the body as text.
    pub async fn get_text(&self, path: &str) -> Result<String, CliError> {
        let response = self.send(Method::GET, path, &[], None).await?;
        response
            .text()
            .await
            .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to read response: {}", e)))
    }

    /// Make a POST request.
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Query<'_>,
        body: &Value,
    ) -> Result<T, CliError> {
        let response = self.send(Method::POST, path, query, Some(body)).await?;
        parse_json(response).await
    }

    /// Make a PUT request.
    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Query<'_>,
        body: &Value,
    ) -> Result<T, CliError> {
        let response = self.send(Method::PUT, path, query, Some(body)).await?;
        parse_json(response).await
    }

    /// Make a DELETE request. An empty body decodes as JSON `null`.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str, query: Query<'_>) -> Result<T, CliError> {
        let response = self.send(Method::DELETE, path, query, None).await?;
        parse_json(response).await
    }

    /// Send a request and turn non-success statuses into [`CliError::Api`].
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: Query<'_>,
        body: Option<&Value>,
    ) -> Result<reqwest::Response, CliError> {
        let url = self.url(path);
        debug!(method = %method, url = %url, "Sending request");

        let mut request = self.client.request(method.clone(), &url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|source| CliError::Connection {
            method: method.to_string(),
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        debug!(method = %method, url = %url, status = status.as_u16(), "Received response");

        if status.is_success() {
            Ok(response)
        } else {
            Err(self.handle_error(method, response).await)
        }
    }

    /// Handle an error response.
    async fn handle_error(&self, method: Method, response: reqwest::Response) -> CliError {
        let status = response.status();
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();

        CliError::api(
            status.as_u16(),
            render_error(
                method.as_str(),
                &url,
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
                &body,
            ),
        )
    }
}

/// Decode a success body, treating an empty body as `null`.
async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, CliError> {
    let text = response
        .text()
        .await
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to read response: {}", e)))?;
    let text = if text.trim().is_empty() { "null" } else { text.as_str() };
    serde_json::from_str(text)
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to parse response: {}", e)))
}

/// Render the user-facing message for a failed request.
pub fn render_error(method: &str, url: &str, status: u16, reason: &str, body: &str) -> String {
    let prefix = format!("Error on request [{} {}]: HTTP {}: {}", method, url, status, reason);

    let Ok(payload) = serde_json::from_str::<Value>(body) else {
        return prefix;
    };
    if !payload.is_object() {
        return prefix;
    }

    if status == 409 && payload.get("deployments").is_some() {
        return "Changes blocked: deployment already in progress for app.".to_string();
    }

    // Validation failures carry structured details worth showing verbatim
    if status == 400 || status == 422 {
        return format!("{}:\n{}", prefix, body.trim());
    }

    if let Some(message) = payload.get("message").and_then(Value::as_str) {
        return format!("Error: {}", message);
    }

    if let Some(errors) = payload.get("errors").and_then(Value::as_array) {
        let details: Vec<String> = errors
            .iter()
            .filter_map(|e| e.get("error").and_then(Value::as_str).map(str::to_string))
            .collect();
        if !details.is_empty() {
            return format!("{}: {}", prefix, details.join("; "));
        }
    }

    prefix
}
