//! Reqwest adapters for the collaborator interfaces.
//!
//! The classifier and completion adapters speak the OpenAI-style
//! `/chat/completions` wire format; the bookkeeping adapter talks to the
//! companion platform's internal REST API. All of them take a shared
//! [`reqwest::Client`] so connection pools and timeouts are configured once.

use async_trait::async_trait;
use serde_json::Value;

use crate::engine::EngineMode;
use crate::types::conversation::{ChatTurn, ConversationState, Language};
use crate::types::emotion::Classification;
use crate::types::trust::TrustSnapshot;

use super::{
    CompletionProvider, ConversationTracker, EmotionClassifier, MemoryService,
    TimelineService, TrustService,
};

// ============================================================================
// Constants
// ============================================================================

/// Reply token budget for the fast engine.
const FAST_MAX_TOKENS: u32 = 512;

/// Reply token budget for the core deep engine.
const DEEP_MAX_TOKENS: u32 = 1024;

/// Reply token budget for the premium deep engine.
const PREMIUM_MAX_TOKENS: u32 = 2048;

/// System prompt for the classifier call. The model must answer with one
/// JSON object; anything around it is stripped before parsing.
const CLASSIFIER_PROMPT: &str = r#"You are an emotion classifier for a companion chat service. Read the user's latest message in its conversation context and answer with exactly one JSON object, no prose:
{"emotion": {"primary": "SAD|ANXIOUS|ANGRY|LONELY|HOPEFUL|GRATEFUL|NEUTRAL", "intensity": 0-5, "confidence": 0.0-1.0}, "severity": "CASUAL|VENTING|SUPPORT|HIGH_RISK", "triggers": [{"topic": "...", "emotion": "...", "score": 0.0-1.0}]}
Use HIGH_RISK only for danger to self or others. Messages may be in English or Arabic."#;

// ============================================================================
// Wire helpers
// ============================================================================

/// Build an OpenAI-style chat body: system prompt first, then the turns.
fn build_chat_body(
    model: &str,
    system_prompt: &str,
    messages: &[ChatTurn],
    max_tokens: u32,
) -> Value {
    let mut wire = Vec::with_capacity(messages.len() + 1);
    wire.push(serde_json::json!({ "role": "system", "content": system_prompt }));
    for turn in messages {
        wire.push(serde_json::json!({ "role": turn.role, "content": turn.content }));
    }
    serde_json::json!({
        "model": model,
        "messages": wire,
        "max_tokens": max_tokens,
    })
}

/// Pull the assistant text out of a chat-completions response.
fn extract_content(json: &Value) -> Option<String> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
}

/// Trim a model answer down to the outermost JSON object. Models like to
/// wrap JSON in code fences or a sentence of preamble.
fn extract_json_object(content: &str) -> &str {
    match (content.find('{'), content.rfind('}')) {
        (Some(start), Some(end)) if end >= start => &content[start..=end],
        _ => content,
    }
}

async fn post_chat(
    http: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    body: &Value,
) -> Result<String, anyhow::Error> {
    let resp = http
        .post(format!("{}/chat/completions", base_url))
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("HTTP error: {}", e))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        return Err(anyhow::anyhow!("completion API returned {}: {}", status, text));
    }

    let json: Value = resp
        .json()
        .await
        .map_err(|e| anyhow::anyhow!("JSON parse error: {}", e))?;

    extract_content(&json).ok_or_else(|| anyhow::anyhow!("no content in completion response"))
}

// ============================================================================
// Completion adapter
// ============================================================================

/// Chat-completions adapter. Picks the model and token budget from the
/// engine mode; everything else is fixed at construction.
#[derive(Debug, Clone)]
pub struct HttpCompletion {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    fast_model: String,
    deep_model: String,
}

impl HttpCompletion {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        fast_model: impl Into<String>,
        deep_model: impl Into<String>,
    ) -> Self {
        HttpCompletion {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            fast_model: fast_model.into(),
            deep_model: deep_model.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for HttpCompletion {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ChatTurn],
        mode: EngineMode,
    ) -> Result<String, anyhow::Error> {
        let (model, max_tokens) = match mode {
            EngineMode::CoreFast => (self.fast_model.as_str(), FAST_MAX_TOKENS),
            EngineMode::CoreDeep => (self.deep_model.as_str(), DEEP_MAX_TOKENS),
            EngineMode::PremiumDeep => (self.deep_model.as_str(), PREMIUM_MAX_TOKENS),
        };
        let body = build_chat_body(model, system_prompt, messages, max_tokens);
        post_chat(&self.http, &self.base_url, &self.api_key, &body).await
    }
}

// ============================================================================
// Classifier adapter
// ============================================================================

/// Classifier adapter. Rides the same chat-completions wire format with a
/// fixed instruction prompt and parses the JSON the model answers with.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpClassifier {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        HttpClassifier {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl EmotionClassifier for HttpClassifier {
    async fn classify(
        &self,
        message: &str,
        recent: &[ChatTurn],
        language: Language,
    ) -> Result<Classification, anyhow::Error> {
        let mut turns: Vec<ChatTurn> = recent.to_vec();
        turns.push(ChatTurn::user(message));
        let prompt = format!(
            "{}\nConversation language hint: {}.",
            CLASSIFIER_PROMPT,
            language.code()
        );
        let body = build_chat_body(&self.model, &prompt, &turns, FAST_MAX_TOKENS);
        let content = post_chat(&self.http, &self.base_url, &self.api_key, &body).await?;
        Ok(Classification::parse_lenient(extract_json_object(&content)))
    }
}

// ============================================================================
// Bookkeeping adapter
// ============================================================================

/// One client for the platform's internal bookkeeping API: conversation
/// state, trust, timeline, and memory all live behind the same base URL.
#[derive(Debug, Clone)]
pub struct HttpBookkeeping {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpBookkeeping {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        HttpBookkeeping {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn get_value(&self, path: &str) -> Result<Value, anyhow::Error> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("HTTP error: {}", e))?;

        if !resp.status().is_success() {
            return Err(anyhow::anyhow!(
                "bookkeeping API returned {} for {}",
                resp.status(),
                path
            ));
        }

        resp.json()
            .await
            .map_err(|e| anyhow::anyhow!("JSON parse error: {}", e))
    }

    async fn post_ok(&self, path: &str, body: &Value) -> Result<(), anyhow::Error> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("HTTP error: {}", e))?;

        if !resp.status().is_success() {
            return Err(anyhow::anyhow!(
                "bookkeeping API returned {} for {}",
                resp.status(),
                path
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationTracker for HttpBookkeeping {
    async fn current_state(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<ConversationState, anyhow::Error> {
        let json = self
            .get_value(&format!(
                "/conversations/{}/sessions/{}/state",
                user_id, session_id
            ))
            .await?;
        Ok(serde_json::from_value(json["state"].clone()).unwrap_or_default())
    }
}

#[async_trait]
impl TrustService for HttpBookkeeping {
    async fn snapshot(&self, user_id: &str) -> Result<TrustSnapshot, anyhow::Error> {
        let json = self.get_value(&format!("/trust/{}", user_id)).await?;
        serde_json::from_value(json).map_err(|e| anyhow::anyhow!("JSON parse error: {}", e))
    }

    async fn record_interaction(
        &self,
        user_id: &str,
        severity: &str,
    ) -> Result<(), anyhow::Error> {
        self.post_ok(
            &format!("/trust/{}/interactions", user_id),
            &serde_json::json!({ "severity": severity }),
        )
        .await
    }
}

#[async_trait]
impl TimelineService for HttpBookkeeping {
    async fn record(
        &self,
        user_id: &str,
        kind: &str,
        summary: &str,
    ) -> Result<(), anyhow::Error> {
        self.post_ok(
            "/timeline/events",
            &serde_json::json!({
                "user_id": user_id,
                "kind": kind,
                "summary": summary,
            }),
        )
        .await
    }
}

#[async_trait]
impl MemoryService for HttpBookkeeping {
    async fn record(
        &self,
        user_id: &str,
        user_message: &str,
        reply: &str,
    ) -> Result<(), anyhow::Error> {
        self.post_ok(
            "/memory/entries",
            &serde_json::json!({
                "user_id": user_id,
                "user_message": user_message,
                "reply": reply,
            }),
        )
        .await
    }
}

// ============================================================================
// Tests
// ============================================================================
