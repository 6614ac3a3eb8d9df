//! Blocking client for IBM watsonx.ai text generation.
//!
//! An IBM Cloud API key is exchanged for a bearer token at the IAM endpoint;
//! the token is cached until shortly before it expires.

use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use url::Url;

use studymate_core::config::WatsonxSettings;
use studymate_core::error::{Error, Result};
use studymate_core::traits::Generator;

const API_VERSION: &str = "2023-05-29";
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;
const TOKEN_REFRESH_MARGIN_SECS: u64 = 60;
const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model_id: &'a str,
    project_id: &'a str,
    input: &'a str,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    decoding_method: &'static str,
    max_new_tokens: u32,
    repetition_penalty: f32,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    results: Vec<GenerationResult>,
}

#[derive(Debug, Deserialize)]
struct GenerationResult {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Expiry as unix seconds.
    expiration: Option<u64>,
}

struct CachedToken {
    value: String,
    expires_at: u64,
}

pub struct WatsonxClient {
    generation_url: Url,
    token_url: Url,
    api_key: String,
    project_id: String,
    model_id: String,
    max_new_tokens: u32,
    agent: ureq::Agent,
    retry_attempts: u32,
    token: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for WatsonxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatsonxClient")
            .field("generation_url", &self.generation_url.as_str())
            .field("model_id", &self.model_id)
            .field("retry_attempts", &self.retry_attempts)
            .finish_non_exhaustive()
    }
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

fn required(value: &Option<String>, name: &str) -> Result<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidConfig(format!("watsonx.{name} is not set")))
}

fn parse_url(raw: &str, path: &str) -> Result<Url> {
    Url::parse(raw)
        .and_then(|base| base.join(path))
        .map_err(|e| Error::InvalidConfig(format!("invalid URL '{raw}': {e}")))
}

impl WatsonxClient {
    pub fn new(settings: &WatsonxSettings) -> Result<Self> {
        let api_key = required(&settings.api_key, "api_key")?;
        let project_id = required(&settings.project_id, "project_id")?;
        let mut generation_url = parse_url(&settings.url, "/ml/v1/text/generation")?;
        generation_url.set_query(Some(&format!("version={API_VERSION}")));
        let token_url = parse_url(&settings.iam_url, "/identity/token")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .build()
            .into();

        Ok(Self {
            generation_url,
            token_url,
            api_key,
            project_id,
            model_id: settings.model_id.clone(),
            max_new_tokens: settings.max_new_tokens,
            agent,
            retry_attempts: settings.retry_attempts.max(1),
            token: Mutex::new(None),
        })
    }

    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    pub fn model_id(&self) -> &str { &self.model_id }

    fn access_token(&self) -> Result<String> {
        let mut cached = self
            .token
            .lock()
            .map_err(|e| Error::Operation(format!("token cache poisoned: {e}")))?;
        if let Some(token) = cached.as_ref() {
            if unix_now() + TOKEN_REFRESH_MARGIN_SECS < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        debug!("requesting IAM token from {}", self.token_url);
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", APIKEY_GRANT_TYPE)
            .append_pair("apikey", &self.api_key)
            .finish();
        let response_text = self.make_request_with_retry(&self.token_url, || {
            self.agent
                .post(self.token_url.as_str())
                .header("Content-Type", "application/x-www-form-urlencoded")
                .header("Accept", "application/json")
                .send(&body)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;
        let token: TokenResponse = serde_json::from_str(&response_text)
            .map_err(|e| Error::Generation(format!("failed to parse IAM token response: {e}")))?;

        let value = token.access_token;
        // Without an expiry the token is used for this request only.
        let expires_at = token.expiration.unwrap_or(0);
        *cached = Some(CachedToken { value: value.clone(), expires_at });
        Ok(value)
    }

    fn make_request_with_retry<F>(&self, target: &Url, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> std::result::Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => return Ok(response_text),
                Err(err) => {
                    let should_retry = match &err {
                        ureq::Error::StatusCode(status) if *status >= 500 => {
                            warn!("Server error (status {}), attempt {}/{}", status, attempt, self.retry_attempts);
                            true
                        }
                        ureq::Error::StatusCode(status) => {
                            warn!("Client error (status {}), not retrying", status);
                            return Err(Error::Generation(format!("{target}: client error: HTTP {status}")));
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!("Transport error: {}, attempt {}/{}", err, attempt, self.retry_attempts);
                            true
                        }
                        _ => false,
                    };

                    if !should_retry {
                        return Err(Error::Generation(format!("{target}: non-retryable error: {err}")));
                    }
                    last_error = Some(err.to_string());

                    if attempt < self.retry_attempts {
                        let delay = Duration::from_millis(EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!("All retry attempts failed for request to {}", target);
        Err(Error::Generation(format!(
            "{target}: {}",
            last_error.unwrap_or_else(|| "request failed after retries".to_string())
        )))
    }
}

impl Generator for WatsonxClient {
    fn generate(&self, prompt: &str) -> Result<String> {
        let token = self.access_token()?;
        let request = GenerationRequest {
            model_id: &self.model_id,
            project_id: &self.project_id,
            input: prompt,
            parameters: GenerationParameters {
                decoding_method: "greedy",
                max_new_tokens: self.max_new_tokens,
                repetition_penalty: 1.05,
            },
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| Error::Generation(format!("failed to serialize request: {e}")))?;

        let response_text = self.make_request_with_retry(&self.generation_url, || {
            self.agent
                .post(self.generation_url.as_str())
                .header("Content-Type", "application/json")
                .header("Accept", "application/json")
                .header("Authorization", format!("Bearer {token}"))
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;
        let response: GenerationResponse = serde_json::from_str(&response_text)
            .map_err(|e| Error::Generation(format!("failed to parse generation response: {e}")))?;

        let text = response
            .results
            .into_iter()
            .next()
            .map(|r| r.generated_text.trim().to_string())
            .ok_or_else(|| Error::Generation("response contained no results".into()))?;
        info!(model = %self.model_id, chars = text.chars().count(), "generated answer");
        Ok(text)
    }
}
