//! Voice authenticity analyzer: single-shot synthetic-vs-human classification with an
//! auditable signal breakdown. Stateless; every call is independent.

use crate::error::{FailureCause, KavachError, KavachResult};
use crate::inference::{self, ContentPart, InferenceGateway, InferenceRequest, ModelTier};
use crate::prompts::{forensic_user_prompt, FORENSIC_SYSTEM};
use crate::schema::{self, SchemaKind, Validated};
use crate::types::{Language, VoiceAnalysisResult};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_AUDIO_MIME: &str = "audio/mp3";

/// Audio sample, opaque to the analyzer.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioPayload {
    pub data: Vec<u8>,
    pub mime: String,
}

impl AudioPayload {
    pub fn new(data: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            data,
            mime: mime.into(),
        }
    }

    pub fn mp3(data: Vec<u8>) -> Self {
        Self::new(data, DEFAULT_AUDIO_MIME)
    }
}

pub struct VoiceAnalyzer {
    gateway: Arc<dyn InferenceGateway>,
    timeout: Duration,
}

impl VoiceAnalyzer {
    pub fn new(gateway: Arc<dyn InferenceGateway>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    /// Classify one sample. `language` only steers the prompt.
    pub async fn analyze(&self, language: Language, audio: AudioPayload) -> KavachResult<VoiceAnalysisResult> {
        self.analyze_validated(language, audio)
            .await
            .map(Validated::into_inner)
    }

    /// Like [`analyze`](Self::analyze) but keeps the record of clamped scores.
    pub async fn analyze_validated(
        &self,
        language: Language,
        audio: AudioPayload,
    ) -> KavachResult<Validated<VoiceAnalysisResult>> {
        if audio.data.is_empty() {
            return Err(KavachError::InvalidRequest("audio payload is empty".to_string()));
        }

        let request = InferenceRequest::new(ModelTier::Fast)
            .with_system(FORENSIC_SYSTEM)
            .with_part(ContentPart::Audio {
                data: audio.data,
                mime: audio.mime,
            })
            .with_part(ContentPart::text(forensic_user_prompt(language.name())))
            .with_schema(SchemaKind::VoiceAnalysis);

        let raw = inference::invoke(self.gateway.as_ref(), request, self.timeout)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "voice analysis inference failed");
                KavachError::AnalysisFailed(FailureCause::Inference(e))
            })?;

        let validated = schema::validate_voice_analysis(&raw).map_err(|v| {
            tracing::warn!(field = %v.field, reason = %v.reason, "voice analysis contract violation");
            KavachError::AnalysisFailed(FailureCause::Contract(v))
        })?;

        tracing::info!(
            language = %language,
            classification = validated.value.classification.label(),
            confidence = validated.value.confidence,
            clamps = validated.clamps.len(),
            "voice analyzed"
        );
        Ok(validated)
    }
}
