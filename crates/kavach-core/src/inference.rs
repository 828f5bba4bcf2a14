//! Inference gateway: the seam to the external generative model.
//!
//! The core never talks HTTP directly; it builds an [`InferenceRequest`] of typed
//! [`ContentPart`]s and hands it to an [`InferenceGateway`]. [`OpenRouterGateway`] speaks the
//! OpenAI-compatible chat-completions protocol. [`PlaceholderGateway`] and
//! [`ScriptedGateway`] stand in for it offline and in tests.

use crate::error::InferenceError;
use crate::schema::SchemaKind;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";
const DEFAULT_FAST_MODEL: &str = "google/gemini-2.5-flash";
const DEFAULT_REASONING_MODEL: &str = "google/gemini-2.5-pro";

/// One piece of prompt content.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    Audio { data: Vec<u8>, mime: String },
    Image { data: Vec<u8>, mime: String },
}

impl ContentPart {
    pub fn text(s: impl Into<String>) -> Self {
        ContentPart::Text(s.into())
    }
}

/// Which model class should serve the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// Single-shot forensic classification.
    Fast,
    /// Multi-turn honeypot reasoning.
    Reasoning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub tier: ModelTier,
    pub system: Option<String>,
    pub parts: Vec<ContentPart>,
    /// Expected structured output; `None` means freeform text.
    pub schema: Option<SchemaKind>,
}

impl InferenceRequest {
    pub fn new(tier: ModelTier) -> Self {
        Self {
            tier,
            system: None,
            parts: Vec::new(),
            schema: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_part(mut self, part: ContentPart) -> Self {
        self.parts.push(part);
        self
    }

    pub fn with_schema(mut self, schema: SchemaKind) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Concatenated text parts (used by offline gateways and logging).
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// External generative capability. Returns raw text; the schema contract decides
/// whether it can be trusted.
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    async fn generate(&self, request: InferenceRequest) -> Result<String, InferenceError>;
}

/// Run one inference call under a bounded timeout. Never retries.
pub async fn invoke(
    gateway: &dyn InferenceGateway,
    request: InferenceRequest,
    timeout: Duration,
) -> Result<String, InferenceError> {
    match tokio::time::timeout(timeout, gateway.generate(request)).await {
        Ok(result) => result,
        Err(_) => Err(InferenceError::Timeout(timeout)),
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible chat-completions client (OpenRouter by default)
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<MessageContent>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MessageContent {
    Text { text: String },
    InputAudio { input_audio: InputAudio },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct InputAudio {
    data: String,
    format: String,
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// `audio/mp3` -> `mp3`, `audio/x-wav` -> `wav`.
fn audio_format(mime: &str) -> String {
    let sub = mime.rsplit('/').next().unwrap_or(mime);
    let sub = sub.trim_start_matches("x-");
    match sub {
        "mpeg" => "mp3".to_string(),
        "wave" => "wav".to_string(),
        other => other.to_string(),
    }
}

fn to_content(part: &ContentPart) -> MessageContent {
    match part {
        ContentPart::Text(text) => MessageContent::Text { text: text.clone() },
        ContentPart::Audio { data, mime } => MessageContent::InputAudio {
            input_audio: InputAudio {
                data: BASE64_STANDARD.encode(data),
                format: audio_format(mime),
            },
        },
        ContentPart::Image { data, mime } => MessageContent::ImageUrl {
            image_url: ImageUrl {
                url: format!("data:{};base64,{}", mime, BASE64_STANDARD.encode(data)),
            },
        },
    }
}

/// Chat-completions gateway for OpenRouter or any OpenAI-compatible endpoint.
pub struct OpenRouterGateway {
    api_key: String,
    api_base: String,
    fast_model: String,
    reasoning_model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

impl OpenRouterGateway {
    pub fn new(api_key: impl Into<String>) -> Result<Self, InferenceError> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(InferenceError::Config("API key is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            api_key,
            api_base: DEFAULT_API_BASE.to_string(),
            fast_model: DEFAULT_FAST_MODEL.to_string(),
            reasoning_model: DEFAULT_REASONING_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
            client,
        })
    }

    /// Base URL without trailing slash, e.g. `https://openrouter.ai/api/v1`.
    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_models(mut self, fast: &str, reasoning: &str) -> Self {
        self.fast_model = fast.to_string();
        self.reasoning_model = reasoning.to_string();
        self
    }

    pub fn with_sampling(mut self, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast_model,
            ModelTier::Reasoning => &self.reasoning_model,
        }
    }

    fn build_body(&self, request: &InferenceRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: vec![MessageContent::Text { text: system.clone() }],
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.parts.iter().map(to_content).collect(),
        });

        let response_format = request.schema.map(|kind| {
            json!({
                "type": "json_schema",
                "json_schema": {
                    "name": kind.name(),
                    "strict": false,
                    "schema": kind.json_schema(),
                }
            })
        });

        ChatRequest {
            model: self.model_for(request.tier).to_string(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format,
        }
    }
}

#[async_trait]
impl InferenceGateway for OpenRouterGateway {
    async fn generate(&self, request: InferenceRequest) -> Result<String, InferenceError> {
        let body = self.build_body(&request);
        tracing::debug!(model = %body.model, parts = request.parts.len(), "inference request");

        let res = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .header("X-Title", "KAVACH")
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(InferenceError::Status(status.as_u16(), text));
        }

        let parsed: ChatResponse = res.json().await?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(InferenceError::EmptyResponse)?;

        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(InferenceError::Refused("content filter".to_string()));
        }
        let message = choice.message.ok_or(InferenceError::EmptyResponse)?;
        if let Some(refusal) = message.refusal.filter(|r| !r.trim().is_empty()) {
            return Err(InferenceError::Refused(refusal));
        }
        message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or(InferenceError::EmptyResponse)
    }
}

// ---------------------------------------------------------------------------
// Offline gateways
// ---------------------------------------------------------------------------

/// Offline gateway: returns schema-valid canned output. Use for running the service
/// without a model key.
#[derive(Debug, Default)]
pub struct PlaceholderGateway;

impl PlaceholderGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl InferenceGateway for PlaceholderGateway {
    async fn generate(&self, request: InferenceRequest) -> Result<String, InferenceError> {
        let out = match request.schema {
            Some(SchemaKind::VoiceAnalysis) => json!({
                "classification": "HUMAN",
                "confidence": 0.5,
                "explanation": "[placeholder analysis: connect an inference backend]",
                "languageDetected": "unknown",
                "signals": {
                    "pitchVariation": 0.5,
                    "breathRandomness": 0.5,
                    "spectralFlatness": 0.5,
                    "neuralArtifacts": 0.5
                },
                "anomaliesTimeline": []
            }),
            Some(SchemaKind::HoneypotReply) => json!({
                "reply": "Sorry, I did not understand. Can you explain again?",
                "strategyUsed": "Passive Listening",
                "detectedIntelligence": {}
            }),
            None => Value::String(format!(
                "[placeholder reply: {} chars received]",
                request.text().len()
            )),
        };
        Ok(match out {
            Value::String(s) => s,
            other => other.to_string(),
        })
    }
}

/// Replays queued responses in order and records every request it receives.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    responses: Mutex<VecDeque<Result<String, InferenceError>>>,
    requests: Mutex<Vec<InferenceRequest>>,
    latency: Option<Duration>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated per-call latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn push_ok(&self, raw: impl Into<String>) -> &Self {
        self.push(Ok(raw.into()))
    }

    pub fn push_err(&self, err: InferenceError) -> &Self {
        self.push(Err(err))
    }

    fn push(&self, item: Result<String, InferenceError>) -> &Self {
        if let Ok(mut q) = self.responses.lock() {
            q.push_back(item);
        }
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<InferenceRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl InferenceGateway for ScriptedGateway {
    async fn generate(&self, request: InferenceRequest) -> Result<String, InferenceError> {
        if let Ok(mut r) = self.requests.lock() {
            r.push(request);
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.responses
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or(Err(InferenceError::Exhausted))
    }
}
