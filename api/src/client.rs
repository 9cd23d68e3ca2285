use crate::oracle::{OracleRequest, OracleResponse};
use reqwest::Client;
use std::fmt;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

pub const DEFAULT_ORACLE_URL: &str = "http://127.0.0.1:8790/optimize";

/// HTTP client for the external scheduling oracle.
///
/// No timeout is applied unless one is configured: a hung oracle is the
/// caller's cancellation concern.
#[derive(Debug, Clone)]
pub struct OracleClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Option<Duration>,
}

impl Default for OracleClient {
    fn default() -> Self {
        Self::new(DEFAULT_ORACLE_URL)
    }
}

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    Api(reqwest::Error, String),
    Parsing(reqwest::Error, String),
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Api(e, url) => write!(f, "API error for {url}: {e}"),
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
            ApiError::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Network(e, _) | ApiError::Api(e, _) | ApiError::Parsing(e, _) => Some(e),
            ApiError::Other(_) => None,
        }
    }
}

impl OracleClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!("campus-fixtures/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            api_key: None,
            timeout: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ask the oracle to place venues and times for the request's matches.
    ///
    /// An empty `optimized_matches` list is returned as-is; deciding that it
    /// means infeasibility is the caller's job.
    pub async fn optimize(&self, request: &OracleRequest) -> ApiResult<OracleResponse> {
        let url = self.endpoint.as_str();
        let mut builder = self.client.post(url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        response
            .error_for_status()
            .map_err(|e| ApiError::Api(e, url.to_owned()))?
            .json::<OracleResponse>()
            .await
            .map_err(|e| ApiError::Parsing(e, url.to_owned()))
    }
}
