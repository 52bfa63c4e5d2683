//! HTTP client for the Love Simulator backend.
//!
//! This crate provides a focused client for the scenario and ranking API with:
//! - Typed scene, scenario and ranking payloads
//! - Automatic retry with exponential backoff for idempotent reads
//! - Single-shot ranking submission (never retried, to avoid duplicate entries)

use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Identifier of a scene inside a scenario.
pub type SceneId = u32;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether an idempotent request that failed this way may be sent again.
    ///
    /// Network failures, timeouts, 5xx and 429 are transient; every other
    /// status is a client error and surfaces immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) | Error::Timeout => true,
            Error::Api { status, .. } => *status == 429 || *status >= 500,
            Error::Parse(_) | Error::Config(_) => false,
        }
    }

    /// The message the server attached to an error response, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Error::Api { message, .. } => Some(message),
            _ => None,
        }
    }

    /// HTTP status of an error response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(e.to_string())
        }
    }
}

/// Backoff schedule for retried reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for every further attempt.
    pub base_delay: Duration,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

/// Love Simulator API client.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl Client {
    /// Create a client for the given base URL with default timeout and retry policy.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        Self::with_settings(base_url, DEFAULT_TIMEOUT, RetryPolicy::default())
    }

    /// Create a client with an explicit per-request timeout and retry policy.
    pub fn with_settings(
        base_url: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("'{base_url}' cannot be a base URL")));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            retry,
        })
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The retry policy used for reads.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Fetch a scene. `Ok(None)` means the scene does not exist, which callers
    /// treat as the end of the content rather than as a failure.
    pub async fn get_scene(
        &self,
        scenario_id: &str,
        scene_id: SceneId,
    ) -> Result<Option<Scene>, Error> {
        let url = self.endpoint(&["api", scenario_id, &scene_id.to_string()])?;
        match self.get_json(url, &[]).await {
            Ok(scene) => Ok(Some(scene)),
            Err(Error::Api { status: 404, .. }) => {
                debug!(scenario_id, scene_id, "scene not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// List the scenarios the server knows about.
    pub async fn get_scenarios(&self) -> Result<Vec<ScenarioSummary>, Error> {
        let url = self.endpoint(&["api", "scenarios"])?;
        self.get_json(url, &[]).await
    }

    /// Fetch the leaderboard, highest score first.
    pub async fn get_rankings(
        &self,
        filter: Option<&RankingFilter>,
    ) -> Result<Vec<RankingEntry>, Error> {
        let url = self.endpoint(&["api", "rankings"])?;
        let query: Vec<(&str, &str)> = filter
            .map(|f| vec![("scenario", f.scenario_title.as_str())])
            .unwrap_or_default();

        let mut entries: Vec<RankingEntry> = self.get_json(url, &query).await?;

        // The server may ignore the query parameter.
        if let Some(filter) = filter {
            entries.retain(|entry| filter.matches(entry));
        }
        Ok(entries)
    }

    /// Submit a finished game to the leaderboard.
    ///
    /// Not retried: a failure after the server accepted the entry would
    /// otherwise create duplicates.
    pub async fn submit_ranking(
        &self,
        submission: &RankingSubmission,
    ) -> Result<RankingReceipt, Error> {
        let url = self.endpoint(&["api", "rankings"])?;
        let response = self.send(self.http.post(url).json(submission)).await?;
        read_json(response).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("'{}' cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, Error> {
        let mut attempt = 1;
        loop {
            let request = self.http.get(url.clone()).query(query);
            // The body read sits inside the loop so a connection dropped mid-body is retried.
            let outcome = match self.send(request).await {
                Ok(response) => read_json(response).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        %url,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, Error> {
        let response = request.send().await.map_err(Error::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        Ok(response)
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, Error> {
    let bytes = response.bytes().await.map_err(Error::from_reqwest)?;
    serde_json::from_slice(&bytes).map_err(|e| Error::Parse(e.to_string()))
}

/// Extract the server-provided message from an error body, falling back to the status line.
fn error_message(status: StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| match status.canonical_reason() {
            Some(reason) => format!("HTTP {}: {reason}", status.as_u16()),
            None => format!("HTTP {}", status.as_u16()),
        })
}

// ============================================================================
// Public types
// ============================================================================

/// A single narrative beat served by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    #[serde(default)]
    pub scene_id: Option<SceneId>,
    pub ai_line: String,
    #[serde(default)]
    pub character_image: Option<String>,
    #[serde(default)]
    pub character_mood: Option<String>,
    /// Choices offered to the player; empty for terminal scenes.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub user_cards: Vec<Choice>,
}

impl Scene {
    /// A scene without choices ends the session.
    pub fn is_terminal(&self) -> bool {
        self.user_cards.is_empty()
    }
}

/// One selectable option in a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub text: String,
    #[serde(rename = "favorability")]
    pub favorability_delta: i32,
    pub next_scene_id: SceneId,
}

impl Choice {
    pub fn new(text: impl Into<String>, favorability_delta: i32, next_scene_id: SceneId) -> Self {
        Self {
            text: text.into(),
            favorability_delta,
            next_scene_id,
        }
    }
}

/// Scenario metadata from `GET /api/scenarios`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub nickname: String,
    pub score: u8,
    pub scenario_title: String,
    #[serde(default)]
    pub play_time: Option<u64>,
    #[serde(default)]
    pub choices_count: Option<u32>,
}

/// Body of `POST /api/rankings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingSubmission {
    pub nickname: String,
    pub score: u8,
    pub scenario_title: String,
    pub play_time: u64,
    pub choices_count: u32,
}

/// Server acknowledgement of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingReceipt {
    pub rank: u32,
    #[serde(default)]
    pub message: Option<String>,
}

/// Restricts a leaderboard query to a single scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingFilter {
    pub scenario_title: String,
}

impl RankingFilter {
    pub fn for_scenario(title: impl Into<String>) -> Self {
        Self {
            scenario_title: title.into(),
        }
    }

    pub fn matches(&self, entry: &RankingEntry) -> bool {
        entry.scenario_title == self.scenario_title
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(4), Duration::from_millis(5000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(5000));
    }

    #[test]
    fn test_retry_policy_never_below_one_attempt() {
        let policy = RetryPolicy::default().with_max_attempts(0);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(RetryPolicy::none().max_attempts, 1);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(Error::Network("reset".into()).is_retryable());
        assert!(Error::Timeout.is_retryable());
        for status in [429, 500, 502, 503] {
            let err = Error::Api {
                status,
                message: String::new(),
            };
            assert!(err.is_retryable(), "status {status} should be retried");
        }
        for status in [400, 401, 403, 404, 422] {
            let err = Error::Api {
                status,
                message: String::new(),
            };
            assert!(!err.is_retryable(), "status {status} should not be retried");
        }
        assert!(!Error::Parse("bad".into()).is_retryable());
    }

    #[test]
    fn test_error_message_prefers_server_message() {
        let msg = error_message(StatusCode::BAD_REQUEST, r#"{"message":"invalid score"}"#);
        assert_eq!(msg, "invalid score");
    }

    #[test]
    fn test_error_message_falls_back_to_status() {
        let msg = error_message(StatusCode::SERVICE_UNAVAILABLE, "<html>down</html>");
        assert_eq!(msg, "HTTP 503: Service Unavailable");

        let msg = error_message(StatusCode::BAD_REQUEST, r#"{"message":"  "}"#);
        assert_eq!(msg, "HTTP 400: Bad Request");
    }

    #[test]
    fn test_scene_deserialization() {
        let json = r#"{
            "sceneId": 1,
            "aiLine": "Hi! Long time no see.",
            "characterMood": "happy",
            "characterImage": "sujin_smile.png",
            "userCards": [
                {"text": "Wave back", "favorability": 5, "nextSceneId": 2},
                {"text": "Ignore her", "favorability": -10, "nextSceneId": 3}
            ]
        }"#;
        let scene: Scene = serde_json::from_str(json).unwrap();
        assert_eq!(scene.scene_id, Some(1));
        assert_eq!(scene.character_mood.as_deref(), Some("happy"));
        assert_eq!(scene.user_cards.len(), 2);
        assert_eq!(scene.user_cards[1].favorability_delta, -10);
        assert_eq!(scene.user_cards[1].next_scene_id, 3);
        assert!(!scene.is_terminal());
    }

    #[test]
    fn test_scene_without_cards_is_terminal() {
        let absent: Scene = serde_json::from_str(r#"{"aiLine": "The end."}"#).unwrap();
        assert!(absent.is_terminal());

        let null: Scene =
            serde_json::from_str(r#"{"aiLine": "The end.", "userCards": null}"#).unwrap();
        assert!(null.is_terminal());

        let empty: Scene =
            serde_json::from_str(r#"{"aiLine": "The end.", "userCards": []}"#).unwrap();
        assert!(empty.is_terminal());
    }

    #[test]
    fn test_choice_serializes_wire_names() {
        let value = serde_json::to_value(Choice::new("Smile", 15, 4)).unwrap();
        assert_eq!(value["favorability"], 15);
        assert_eq!(value["nextSceneId"], 4);
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = Client::new("http://localhost:8000/").unwrap();
        let url = client.endpoint(&["api", "female-friend", "12"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/female-friend/12");

        let url = client.endpoint(&["api", "my scenario", "1"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/my%20scenario/1");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = Client::new("https://example.com/game").unwrap();
        let url = client.endpoint(&["api", "rankings"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/game/api/rankings");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(Client::new("not a url"), Err(Error::Config(_))));
        assert!(matches!(Client::new("mailto:someone"), Err(Error::Config(_))));
    }

    #[test]
    fn test_ranking_filter() {
        let filter = RankingFilter::for_scenario("Teacher's Favorite");
        let entry = RankingEntry {
            nickname: "player".into(),
            score: 80,
            scenario_title: "Teacher's Favorite".into(),
            play_time: None,
            choices_count: None,
        };
        assert!(filter.matches(&entry));

        let other = RankingEntry {
            scenario_title: "Something else".into(),
            ..entry
        };
        assert!(!filter.matches(&other));
    }
}
