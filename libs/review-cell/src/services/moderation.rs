// libs/review-cell/src/services/moderation.rs
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::warn;

use shared_config::AppConfig;

const MODEL_NAME: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationVerdict {
    pub blocked: bool,
    pub reason: Option<String>,
}

impl ModerationVerdict {
    pub fn allowed() -> Self {
        Self {
            blocked: false,
            reason: None,
        }
    }
}

/// Decides whether review text is abusive. Implementations must fail
/// open: a moderation outage never blocks review submission.
#[async_trait]
pub trait ReviewModeration: Send + Sync {
    async fn moderate(&self, text: &str) -> ModerationVerdict;
}

/// Gemini-backed moderation. The model is asked to answer with a small
/// JSON object which is extracted from its free-form reply.
pub struct GeminiModeration {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiModeration {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.moderation_api_key.clone(),
            base_url: config.moderation_base_url.clone(),
        }
    }

    async fn try_moderate(&self, text: &str) -> anyhow::Result<Option<ModerationVerdict>> {
        let prompt = format!(
            "You are a content moderation system for a veterinary clinic review site. \
             Decide if the text contains insults, hate, harassment, profanity, or abuse. \
             Reply ONLY with JSON: {{\"blocked\":true|false,\"reason\":\"short reason or empty\"}}. \
             Text: {}",
            text
        );

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, MODEL_NAME, self.api_key
        );

        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}]
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("moderation API returned {}", status);
        }

        let payload: Value = response.json().await?;
        let reply = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default();

        Ok(extract_verdict(reply))
    }
}

#[async_trait]
impl ReviewModeration for GeminiModeration {
    async fn moderate(&self, text: &str) -> ModerationVerdict {
        if text.trim().is_empty() {
            return ModerationVerdict::allowed();
        }
        if self.api_key.is_empty() || self.base_url.is_empty() {
            return ModerationVerdict::allowed();
        }

        match self.try_moderate(text).await {
            Ok(Some(verdict)) => verdict,
            Ok(None) => ModerationVerdict::allowed(),
            Err(e) => {
                warn!("Moderation unavailable, allowing review: {}", e);
                ModerationVerdict::allowed()
            }
        }
    }
}

/// Pulls the first `{...}` span out of the model reply and reads the
/// `blocked`/`reason` fields from it.
fn extract_verdict(raw: &str) -> Option<ModerationVerdict> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }

    let parsed: Value = serde_json::from_str(&raw[start..=end]).ok()?;
    let blocked = parsed["blocked"].as_bool()?;
    let reason = parsed["reason"]
        .as_str()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(String::from);

    Some(ModerationVerdict { blocked, reason })
}
