//! KAVACH core library.
//! Voice authenticity analysis, the honeypot engine and the shared schema contract,
//! session store and intelligence aggregation behind them.

pub mod config;
pub mod error;
pub mod honeypot;
pub mod inference;
pub mod intelligence;
pub mod prompts;
pub mod schema;
pub mod session;
pub mod types;
pub mod voice;

pub use config::{KavachConfig, LlmMode};
pub use error::{ContractViolation, FailureCause, InferenceError, KavachError, KavachResult};
pub use honeypot::{Engagement, HoneypotEngine};
pub use inference::{
    ContentPart, InferenceGateway, InferenceRequest, ModelTier, OpenRouterGateway, PlaceholderGateway,
    ScriptedGateway,
};
pub use schema::{SchemaKind, Validated};
pub use session::{ConflictPolicy, SessionStore, TurnGuard};
pub use types::{
    Channel, ChannelMeta, Classification, ExtractedIntelligence, HoneypotReply, IndicatorKind, Language,
    Message, MessageMetadata, Sender, Session, SignalVector, VoiceAnalysisResult,
};
pub use voice::{AudioPayload, VoiceAnalyzer, DEFAULT_AUDIO_MIME};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
