//! JSON request and response shapes exposed to the operator UI.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use kavach_core::{
    AudioPayload, ChannelMeta, Engagement, ExtractedIntelligence, Language, Message, MessageMetadata, Sender,
    Session, VoiceAnalysisResult, DEFAULT_AUDIO_MIME,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceAnalyzeRequest {
    pub language: Language,
    pub audio_base64: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl VoiceAnalyzeRequest {
    /// Decode the audio. Accepts a bare base64 string or a `data:<mime>;base64,` URL.
    pub fn audio(&self) -> Result<AudioPayload, ApiError> {
        let raw = self.audio_base64.trim();
        let (url_mime, encoded) = match raw.strip_prefix("data:").and_then(|rest| rest.split_once(";base64,")) {
            Some((mime, data)) => (Some(mime), data),
            None => (None, raw),
        };
        let data = BASE64_STANDARD
            .decode(encoded)
            .map_err(|e| ApiError::bad_request(format!("audioBase64 is not valid base64: {e}")))?;
        let mime = self
            .mime_type
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .or(url_mime)
            .unwrap_or(DEFAULT_AUDIO_MIME);
        Ok(AudioPayload::new(data, mime))
    }
}

#[derive(Debug, Serialize)]
pub struct VoiceAnalyzeResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub result: VoiceAnalysisResult,
}

/// Message as the UI sends it. Id and timestamp are filled in when absent.
#[derive(Debug, Deserialize)]
pub struct WireMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub sender: Sender,
    pub text: String,
    /// RFC 3339.
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub metadata: Option<MessageMetadata>,
}

impl WireMessage {
    pub fn into_message(self) -> Result<Message, ApiError> {
        let mut msg = Message::new(self.sender, self.text);
        if let Some(id) = self.id.filter(|id| !id.trim().is_empty()) {
            msg.id = id;
        }
        if let Some(ts) = self.timestamp.as_deref().filter(|ts| !ts.trim().is_empty()) {
            msg.timestamp = parse_timestamp(ts)?;
        }
        msg.metadata = self.metadata;
        Ok(msg)
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ApiError::bad_request(format!("message.timestamp {s:?} is not RFC 3339: {e}")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoneypotRequest {
    pub session_id: String,
    pub message: WireMessage,
    /// Accepted for compatibility; the server-side session history is authoritative.
    #[serde(default)]
    pub conversation_history: Vec<WireMessage>,
    pub metadata: ChannelMeta,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoneypotResponse {
    pub status: &'static str,
    pub reply: String,
    pub strategy_used: String,
    pub detected_intelligence: ExtractedIntelligence,
    pub accumulated_intelligence: ExtractedIntelligence,
    pub turn: usize,
}

impl From<Engagement> for HoneypotResponse {
    fn from(e: Engagement) -> Self {
        Self {
            status: "success",
            reply: e.reply,
            strategy_used: e.strategy_used,
            detected_intelligence: e.intelligence_delta,
            accumulated_intelligence: e.accumulated_intelligence,
            turn: e.turn,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub status: &'static str,
    pub session: Session,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_accepts_data_urls_and_defaults_mime() {
        let req: VoiceAnalyzeRequest =
            serde_json::from_str(r#"{"language":"Hindi","audioBase64":"data:audio/wav;base64,AQID"}"#).unwrap();
        let audio = req.audio().unwrap();
        assert_eq!(audio.data, vec![1, 2, 3]);
        assert_eq!(audio.mime, "audio/wav");

        let req: VoiceAnalyzeRequest = serde_json::from_str(r#"{"language":"English","audioBase64":"AQID"}"#).unwrap();
        assert_eq!(req.audio().unwrap().mime, "audio/mp3");
    }

    #[test]
    fn bad_base64_is_a_bad_request() {
        let req: VoiceAnalyzeRequest =
            serde_json::from_str(r#"{"language":"English","audioBase64":"not base64!!"}"#).unwrap();
        assert_eq!(req.audio().unwrap_err().kind, "invalid_request");
    }

    #[test]
    fn wire_message_keeps_client_id_and_timestamp() {
        let wire: WireMessage = serde_json::from_str(
            r#"{"id":"m-1","sender":"scammer","text":"pay","timestamp":"2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        let msg = wire.into_message().unwrap();
        assert_eq!(msg.id, "m-1");
        assert_eq!(msg.sender, Sender::Adversary);
        assert_eq!(msg.timestamp.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn unparsable_timestamp_is_a_bad_request() {
        let wire: WireMessage =
            serde_json::from_str(r#"{"sender":"scammer","text":"pay","timestamp":"yesterday"}"#).unwrap();
        let err = wire.into_message().unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
        assert!(err.message.contains("yesterday"));
    }

    #[test]
    fn missing_or_blank_timestamp_is_stamped_now() {
        let before = Utc::now();
        let wire: WireMessage = serde_json::from_str(r#"{"sender":"scammer","text":"pay","timestamp":" "}"#).unwrap();
        assert!(wire.into_message().unwrap().timestamp >= before);
    }
}
