use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::error::{ApiError, Result};

/// Used when neither the provider block nor TRACEFORCE_ENDPOINT sets one
pub const DEFAULT_ENDPOINT: &str = "https://api.traceforce.co";

const API_PREFIX: &str = "/api/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Traceforce REST API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    auth_header: String,
}

impl Client {
    /// Create a client for `endpoint`, falling back to [`DEFAULT_ENDPOINT`]
    /// when it is empty
    pub fn new(api_key: &str, endpoint: &str) -> Result<Self> {
        let endpoint = match endpoint.trim() {
            "" => DEFAULT_ENDPOINT,
            trimmed => trimmed,
        };

        let parsed = Url::parse(endpoint)
            .map_err(|e| ApiError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidEndpoint(format!(
                "unsupported scheme '{}' in {}",
                parsed.scheme(),
                endpoint
            )));
        }

        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(
                "terraform-provider-traceforce/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        let base_url = format!("{}{}", endpoint.trim_end_matches('/'), API_PREFIX);
        let auth_header = format!("Bearer {}", api_key);

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                auth_header,
            }),
        })
    }

    /// Root every request path is joined onto, including the API version
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute(Method::GET, path, None::<&()>).await?;
        self.parse_success_response(response).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.execute(Method::POST, path, Some(body)).await?;
        self.parse_success_response(response).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.execute(Method::PUT, path, Some(body)).await?;
        self.parse_success_response(response).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.execute(Method::PATCH, path, Some(body)).await?;
        self.parse_success_response(response).await
    }

    /// DELETE ignores whatever body the server sends back
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.execute(Method::DELETE, path, None::<&()>)
            .await
            .map(|_| ())
    }

    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.inner.base_url, path);
        tracing::debug!(method = %method, url = %url, "sending API request");

        let mut request = self
            .inner
            .http_client
            .request(method, &url)
            .header(AUTHORIZATION, &self.inner.auth_header)
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!(status = status.as_u16(), url = %url, "received API response");

        if status.is_success() {
            Ok(response)
        } else {
            Err(self.handle_error_response(response).await)
        }
    }

    /// Accepts both bare payloads and payloads wrapped in `{"data": ...}`
    async fn parse_success_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let text = response.text().await?;
        tracing::trace!(body = %text, "API response body");

        match serde_json::from_str::<ApiResponse<T>>(&text) {
            Ok(wrapper) => Ok(wrapper.data),
            Err(_) => serde_json::from_str::<T>(&text).map_err(|e| {
                tracing::error!(error = %e, body = %text, "failed to deserialize response");
                ApiError::Parse(e.to_string())
            }),
        }
    }

    async fn handle_error_response(&self, response: reqwest::Response) -> ApiError {
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let message = error_message(&text).unwrap_or_else(|| match text.trim() {
            "" => status.to_string(),
            trimmed => trimmed.to_string(),
        });

        if status == StatusCode::NOT_FOUND {
            tracing::debug!(message = %message, "API resource not found");
            return ApiError::NotFound(message);
        }

        tracing::error!(status = status.as_u16(), message = %message, "API error response");
        ApiError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed.error.or(parsed.message)
}
