use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, LINK};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;
use tracing::debug;

use super::source::{EnrollmentState, Gradebook};
use super::types::{Assignment, AssignmentGroup, Course};

const PER_PAGE: &str = "100";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_ATTEMPTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("Authentication failed. Your Canvas token may be invalid or expired.")]
    Unauthorized,

    #[error("GET {url} failed: {status} {body}")]
    Status { status: u16, url: String, body: String },

    #[error("Canvas request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to parse Canvas response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CanvasError {
    /// Errors worth another attempt: connection trouble, throttling, 5xx
    pub fn is_transient(&self) -> bool {
        match self {
            CanvasError::Request(_) => true,
            CanvasError::Status { status, .. } => *status == 429 || *status >= 500,
            CanvasError::Unauthorized | CanvasError::Decode { .. } => false,
        }
    }
}

/// Canvas REST API client authenticated with a personal access token
pub struct CanvasClient {
    http: reqwest::Client,
    base_url: String,
    backoff_millis: u64,
}

impl CanvasClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .context("Canvas token contains characters not allowed in a header")?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create Canvas client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            backoff_millis: 100,
        })
    }

    /// Override the base delay of the retry backoff
    pub fn with_backoff_millis(mut self, millis: u64) -> Self {
        self.backoff_millis = millis;
        self
    }

    async fn send_once(&self, url: &str, query: &[(&str, &str)]) -> Result<Response, CanvasError> {
        let mut request = self.http.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(CanvasError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CanvasError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }
        Ok(response)
    }

    async fn send(&self, url: &str, query: &[(&str, &str)]) -> Result<Response, CanvasError> {
        let strategy = ExponentialBackoff::from_millis(self.backoff_millis)
            .max_delay(Duration::from_secs(5))
            .take(RETRY_ATTEMPTS);

        RetryIf::spawn(strategy, || self.send_once(url, query), CanvasError::is_transient).await
    }

    async fn get_one<T: DeserializeOwned>(&self, path: &str) -> Result<T, CanvasError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.send(&url, &[]).await?;
        decode(response, &url).await
    }

    /// GET a list endpoint, following `rel="next"` links until exhausted.
    /// Query parameters are sent on the first page only; Canvas bakes them
    /// into the next links.
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, CanvasError> {
        let mut url = format!("{}{}", self.base_url, path);
        let mut params = query;
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let response = self.send(&url, params).await?;
            let next = response
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_next_link);

            let batch: Vec<T> = decode(response, &url).await?;
            debug!(path, page, count = batch.len(), "Fetched page");
            items.extend(batch);

            match next {
                Some(next_url) => {
                    url = next_url;
                    params = &[];
                    page += 1;
                }
                None => break,
            }
        }

        Ok(items)
    }
}

async fn decode<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, CanvasError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|source| CanvasError::Decode {
        url: url.to_string(),
        source,
    })
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header
pub fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut segments = part.split(';');
        let target = segments.next()?.trim();
        let url = target.strip_prefix('<')?.strip_suffix('>')?;
        let is_next = segments.any(|param| {
            let param = param.trim();
            param == r#"rel="next""# || param == "rel=next"
        });
        is_next.then(|| url.to_string())
    })
}

#[async_trait]
impl Gradebook for CanvasClient {
    async fn list_courses(&self, state: EnrollmentState) -> Result<Vec<Course>> {
        let courses = self
            .get_all(
                "/api/v1/courses",
                &[("enrollment_state", state.as_str()), ("per_page", PER_PAGE)],
            )
            .await?;
        Ok(courses)
    }

    async fn get_course(&self, course_id: u64) -> Result<Course> {
        let course = self
            .get_one(&format!("/api/v1/courses/{}", course_id))
            .await?;
        Ok(course)
    }

    async fn assignment_groups(&self, course_id: u64) -> Result<Vec<AssignmentGroup>> {
        let groups = self
            .get_all(
                &format!("/api/v1/courses/{}/assignment_groups", course_id),
                &[("per_page", PER_PAGE)],
            )
            .await?;
        Ok(groups)
    }

    async fn assignments_with_submissions(&self, course_id: u64) -> Result<Vec<Assignment>> {
        let assignments = self
            .get_all(
                &format!("/api/v1/courses/{}/assignments", course_id),
                &[("include[]", "submission"), ("per_page", PER_PAGE)],
            )
            .await?;
        Ok(assignments)
    }
}
