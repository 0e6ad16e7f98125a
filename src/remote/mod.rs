//! Blocking HTTP client for the local synthesis service.
//!
//! The service speaks a small JSON contract: `GET /health` for availability,
//! `POST /synthesize` returning a WAV body, and `GET /voices`. The cast relay
//! endpoints live in [`cast`].

pub mod cast;

use anyhow::{Context, Result};
use read_aloud_core::{PlaybackError, RemoteHealth};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// JSON body of `POST /synthesize`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisBody<'a> {
    pub text: &'a str,
    pub rate: f32,
    pub engine: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct HealthReply {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    engines: BTreeMap<String, bool>,
}

/// One entry of the `GET /voices` reply. Model-file voices carry no language.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteVoice {
    pub name: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VoicesReply {
    #[serde(default)]
    engine: Option<String>,
    #[serde(default)]
    voices: Vec<RemoteVoice>,
}

#[derive(Clone)]
pub struct RemoteClient {
    base_url: String,
    health: Client,
    synthesis: Client,
}

impl RemoteClient {
    pub fn new(
        base_url: &str,
        health_timeout: Duration,
        synthesis_timeout: Duration,
    ) -> Result<Self> {
        let health = Client::builder()
            .timeout(health_timeout)
            .build()
            .context("Building health-check HTTP client")?;
        let synthesis = Client::builder()
            .timeout(synthesis_timeout)
            .build()
            .context("Building synthesis HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            health,
            synthesis,
        })
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn control_client(&self) -> &Client {
        &self.health
    }

    pub(crate) fn transfer_client(&self) -> &Client {
        &self.synthesis
    }

    /// Bounded `GET /health`; any non-200 reply or timeout is unavailability.
    pub fn health(&self) -> Result<RemoteHealth, String> {
        let url = self.url("/health");
        debug!(%url, "Probing remote synthesis service");
        let response = self.health.get(&url).send().map_err(|err| err.to_string())?;
        if response.status() != StatusCode::OK {
            return Err(format!("health check returned {}", response.status()));
        }
        let body = response.text().map_err(|err| err.to_string())?;
        Ok(parse_health(&body))
    }

    /// `POST /synthesize` and return the WAV bytes.
    pub fn synthesize(
        &self,
        text: &str,
        rate: f32,
        voice: Option<&str>,
    ) -> Result<Vec<u8>, PlaybackError> {
        let body = SynthesisBody {
            text,
            rate,
            engine: "auto",
            voice,
        };
        let url = self.url("/synthesize");
        debug!(%url, chars = text.len(), rate, "Requesting synthesis");
        let response = self
            .synthesis
            .post(&url)
            .json(&body)
            .send()
            .map_err(|err| PlaybackError::SynthesisRequest(err.to_string()))?;
        let status = response.status();
        if status != StatusCode::OK {
            warn!(%status, "Synthesis request rejected");
            return Err(PlaybackError::SynthesisRequest(server_error_message(status)));
        }
        let bytes = response
            .bytes()
            .map_err(|err| PlaybackError::SynthesisRequest(err.to_string()))?;
        info!(bytes = bytes.len(), "Received synthesized audio");
        Ok(bytes.to_vec())
    }

    /// `GET /voices` for the service's default engine.
    pub fn voices(&self) -> Result<Vec<RemoteVoice>> {
        let url = self.url("/voices");
        let response = self
            .health
            .get(&url)
            .send()
            .with_context(|| format!("Requesting {url}"))?
            .error_for_status()
            .context("Listing remote voices")?;
        let reply: VoicesReply = response.json().context("Parsing voice list")?;
        debug!(engine = ?reply.engine, voices = reply.voices.len(), "Fetched remote voices");
        Ok(reply.voices)
    }
}

/// Keep only engines the service reports as installed.
pub fn parse_health(body: &str) -> RemoteHealth {
    match serde_json::from_str::<HealthReply>(body) {
        Ok(reply) => {
            debug!(status = ?reply.status, "Parsed health reply");
            RemoteHealth {
                engines: reply
                    .engines
                    .into_iter()
                    .filter_map(|(name, available)| available.then_some(name))
                    .collect(),
            }
        }
        Err(err) => {
            debug!("Health body was not JSON: {err}");
            RemoteHealth::default()
        }
    }
}

pub fn server_error_message(status: StatusCode) -> String {
    format!(
        "TTS server error: {}",
        status.canonical_reason().unwrap_or(status.as_str())
    )
}
