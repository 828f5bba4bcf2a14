//! Honeypot conversational engine: one in-character reply and one intelligence delta per
//! adversary message, conditioned on the full session history.
//!
//! The session's turn lock is held from the history read until the commit, so a turn always
//! sees every earlier turn on its session. Snapshot reads of the session do not wait on it.
//! Nothing is written unless the model output passed the contract.

use crate::error::{FailureCause, KavachError, KavachResult};
use crate::inference::{self, ContentPart, InferenceGateway, InferenceRequest, ModelTier};
use crate::intelligence;
use crate::prompts::{honeypot_user_prompt, HONEYPOT_PERSONA_SYSTEM};
use crate::schema::{self, SchemaKind};
use crate::session::{ConflictPolicy, SessionStore};
use crate::types::{ChannelMeta, ExtractedIntelligence, Message, Sender};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one honeypot turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    pub reply: String,
    pub strategy_used: String,
    /// Normalized indicators extracted from this turn only.
    pub intelligence_delta: ExtractedIntelligence,
    /// Session total after this turn's merge.
    pub accumulated_intelligence: ExtractedIntelligence,
    /// 1-based index of this turn within the session.
    pub turn: usize,
}

pub struct HoneypotEngine {
    gateway: Arc<dyn InferenceGateway>,
    store: Arc<SessionStore>,
    timeout: Duration,
    policy: ConflictPolicy,
}

impl HoneypotEngine {
    pub fn new(gateway: Arc<dyn InferenceGateway>, store: Arc<SessionStore>, timeout: Duration) -> Self {
        Self {
            gateway,
            store,
            timeout,
            policy: ConflictPolicy::default(),
        }
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub async fn engage(
        &self,
        session_id: &str,
        meta: &ChannelMeta,
        incoming: Message,
    ) -> KavachResult<Engagement> {
        if session_id.trim().is_empty() {
            return Err(KavachError::InvalidRequest("session id is empty".to_string()));
        }
        if incoming.sender != Sender::Adversary {
            return Err(KavachError::InvalidRequest(
                "incoming message must come from the scammer".to_string(),
            ));
        }
        if incoming.text.trim().is_empty() {
            return Err(KavachError::InvalidRequest("incoming message text is empty".to_string()));
        }

        let turn = self.store.begin_turn(session_id, meta, self.policy).await?;
        let session = turn.session();

        let prompt = honeypot_user_prompt(
            session.meta.channel.label(),
            &session.meta.language,
            &session.meta.locale,
            &session.history,
            &incoming.text,
        );
        tracing::debug!(
            session = session_id,
            history = session.history.len(),
            prompt_chars = prompt.len(),
            "honeypot prompt built"
        );

        let request = InferenceRequest::new(ModelTier::Reasoning)
            .with_system(HONEYPOT_PERSONA_SYSTEM)
            .with_part(ContentPart::Text(prompt))
            .with_schema(SchemaKind::HoneypotReply);

        let raw = inference::invoke(self.gateway.as_ref(), request, self.timeout)
            .await
            .map_err(|e| {
                tracing::warn!(session = session_id, error = %e, "honeypot inference failed");
                KavachError::EngagementFailed(FailureCause::Inference(e))
            })?;

        let reply = schema::validate_honeypot_reply(&raw)
            .map_err(|v| {
                tracing::warn!(session = session_id, field = %v.field, reason = %v.reason, "honeypot contract violation");
                KavachError::EngagementFailed(FailureCause::Contract(v))
            })?
            .into_inner();

        let mut outgoing = Message::agent(reply.reply.clone());
        if let Some(metadata) = reply.metadata.clone() {
            outgoing = outgoing.with_metadata(metadata);
        }
        let delta = intelligence::normalized(&reply.detected_intelligence);

        let updated = turn.commit(incoming, outgoing, &delta, &reply.strategy_used)?;

        Ok(Engagement {
            reply: reply.reply,
            strategy_used: reply.strategy_used,
            intelligence_delta: delta,
            accumulated_intelligence: updated.intelligence.clone(),
            turn: updated.turns(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InferenceError;
    use crate::inference::ScriptedGateway;
    use crate::types::Channel;

    fn meta() -> ChannelMeta {
        ChannelMeta {
            channel: Channel::WhatsApp,
            language: "English".into(),
            locale: "en-IN".into(),
        }
    }

    fn engine(gw: Arc<ScriptedGateway>) -> HoneypotEngine {
        HoneypotEngine::new(gw, Arc::new(SessionStore::new()), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn rejects_agent_authored_incoming() {
        let gw = Arc::new(ScriptedGateway::new());
        let err = engine(gw.clone())
            .engage("s1", &meta(), Message::agent("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, KavachError::InvalidRequest(_)));
        assert!(gw.requests().is_empty());
    }

    #[tokio::test]
    async fn prompt_carries_persona_and_history() {
        let gw = Arc::new(ScriptedGateway::new());
        gw.push_ok(r#"{"reply":"Who is this?","strategyUsed":"Passive Listening"}"#)
            .push_ok(r#"{"reply":"Which bank?","strategyUsed":"Verification Probing"}"#);
        let eng = engine(gw.clone());
        eng.engage("s1", &meta(), Message::adversary("Hello dear")).await.unwrap();
        let second = eng.engage("s1", &meta(), Message::adversary("Your account is blocked")).await.unwrap();
        assert_eq!(second.turn, 2);

        let req = &gw.requests()[1];
        assert_eq!(req.tier, ModelTier::Reasoning);
        assert_eq!(req.system.as_deref(), Some(HONEYPOT_PERSONA_SYSTEM));
        let text = req.text();
        assert!(text.contains("scammer: Hello dear\nhoneypot: Who is this?"));
        assert!(text.contains("\"Your account is blocked\""));
    }

    #[tokio::test]
    async fn timeout_fails_without_mutation() {
        let gw = Arc::new(ScriptedGateway::new().with_latency(Duration::from_millis(200)));
        gw.push_ok(r#"{"reply":"late"}"#);
        let eng = HoneypotEngine::new(gw, Arc::new(SessionStore::new()), Duration::from_millis(20));
        let err = eng.engage("s1", &meta(), Message::adversary("pay")).await.unwrap_err();
        assert!(matches!(
            err,
            KavachError::EngagementFailed(FailureCause::Inference(InferenceError::Timeout(_)))
        ));
        assert!(eng.store().get("s1").unwrap().history.is_empty());
    }

    #[tokio::test]
    async fn outgoing_message_keeps_model_metadata() {
        let gw = Arc::new(ScriptedGateway::new());
        gw.push_ok(r#"{"reply":"Really?","strategyUsed":"Stall","intent":"urgency","emotion":"worried"}"#);
        let eng = engine(gw);
        eng.engage("s1", &meta(), Message::adversary("Act now")).await.unwrap();
        let s = eng.store().get("s1").unwrap();
        let meta = s.history[1].metadata.clone().unwrap();
        assert_eq!(meta.intent, "urgency");
        assert_eq!(meta.emotion, "worried");
    }
}
