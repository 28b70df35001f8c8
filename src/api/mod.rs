//! Backend API addressing.
//!
//! Normalizes the configured base origin and builds stream URLs. Server-push
//! connections cannot carry an `Authorization` header, so the bearer token is
//! appended as the `auth_token` query parameter (percent-encoded by the URL
//! serializer).

use reqwest::Url;
use std::fmt;
use thiserror::Error;

/// Query parameter carrying the bearer token.
pub const AUTH_QUERY_PARAM: &str = "auth_token";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("invalid API base URL '{url}': {message}")]
    InvalidBase { url: String, message: String },

    #[error("invalid stream path '{0}'")]
    InvalidPath(String),
}

/// Normalized API origin.
///
/// Stores the base without a trailing slash and remembers whether it already
/// ends in `/api`, so `/api/...` paths are not doubled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBase {
    base: Url,
    has_api_suffix: bool,
}

impl ApiBase {
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let trimmed = raw.trim().trim_end_matches('/');
        let invalid = |message: String| ApiError::InvalidBase {
            url: raw.to_string(),
            message,
        };
        let base = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(invalid(format!("unsupported scheme '{}'", base.scheme())));
        }

        let has_api_suffix = base
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map_or(false, |last| last == "api");

        Ok(Self {
            base,
            has_api_suffix,
        })
    }

    pub fn as_str(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    /// Append path segments to the base, each percent-encoded on its own.
    ///
    /// A leading `api` segment is skipped when the base already ends in `/api`.
    pub fn url_for<I, S>(&self, segments: I) -> Result<Url, ApiError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut segments = segments.into_iter().peekable();
        if self.has_api_suffix && segments.peek().map_or(false, |s| s.as_ref() == "api") {
            segments.next();
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidPath(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Full stream URL for an endpoint with the token attached.
    pub fn stream_url(&self, endpoint: &StreamEndpoint, token: &str) -> Result<Url, ApiError> {
        let mut url = self.url_for(endpoint.segments())?;
        url.query_pairs_mut().append_pair(AUTH_QUERY_PARAM, token);
        Ok(url)
    }
}

/// The server-push resources this client subscribes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamEndpoint {
    /// Incremental log batches for one container
    ContainerLogs { container_id: String },
    /// Cumulative log blob for one application
    AppLogs { app_id: String },
    /// Dashboard-wide metrics snapshots
    DashboardMetrics,
}

impl StreamEndpoint {
    pub fn container_logs(container_id: impl Into<String>) -> Self {
        Self::ContainerLogs {
            container_id: container_id.into(),
        }
    }

    pub fn app_logs(app_id: impl Into<String>) -> Self {
        Self::AppLogs {
            app_id: app_id.into(),
        }
    }

    /// Resource path below the origin, one entry per segment, unencoded.
    pub fn segments(&self) -> Vec<&str> {
        match self {
            StreamEndpoint::ContainerLogs { container_id } => {
                vec!["api", "containers", container_id, "logs", "stream"]
            }
            StreamEndpoint::AppLogs { app_id } => vec!["api", "apps", app_id, "logs", "stream"],
            StreamEndpoint::DashboardMetrics => vec!["api", "dashboard", "metrics", "stream"],
        }
    }
}

impl fmt::Display for StreamEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamEndpoint::ContainerLogs { container_id } => {
                write!(f, "container-logs:{}", container_id)
            }
            StreamEndpoint::AppLogs { app_id } => write!(f, "app-logs:{}", app_id),
            StreamEndpoint::DashboardMetrics => f.write_str("dashboard-metrics"),
        }
    }
}
