//! Domain types: sessions, messages, extracted intelligence and voice analysis results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Target languages the operator UI offers for voice analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    English,
    Hindi,
    Tamil,
    Telugu,
    Malayalam,
    Spanish,
    French,
    German,
    Chinese,
    Arabic,
    Russian,
    Japanese,
    Portuguese,
    Bengali,
    Korean,
}

impl Language {
    pub const ALL: [Language; 15] = [
        Language::English,
        Language::Hindi,
        Language::Tamil,
        Language::Telugu,
        Language::Malayalam,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Chinese,
        Language::Arabic,
        Language::Russian,
        Language::Japanese,
        Language::Portuguese,
        Language::Bengali,
        Language::Korean,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Tamil => "Tamil",
            Language::Telugu => "Telugu",
            Language::Malayalam => "Malayalam",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
            Language::Chinese => "Chinese",
            Language::Arabic => "Arabic",
            Language::Russian => "Russian",
            Language::Japanese => "Japanese",
            Language::Portuguese => "Portuguese",
            Language::Bengali => "Bengali",
            Language::Korean => "Korean",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Channel the adversary reached the honeypot on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "SMS")]
    Sms,
    WhatsApp,
    Email,
    Chat,
}

impl Channel {
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Sms => "SMS",
            Channel::WhatsApp => "WhatsApp",
            Channel::Email => "Email",
            Channel::Chat => "Chat",
        }
    }
}

/// Session metadata supplied with every honeypot request. Only the first call's
/// values are kept for a given session id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMeta {
    pub channel: Channel,
    pub language: String,
    pub locale: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sender {
    #[serde(rename = "scammer", alias = "adversary")]
    Adversary,
    #[serde(rename = "honeypot", alias = "agent")]
    Agent,
}

impl Sender {
    pub fn label(&self) -> &'static str {
        match self {
            Sender::Adversary => "scammer",
            Sender::Agent => "honeypot",
        }
    }
}

/// Free-form labels attached by the engine; not independently validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub intent: String,
    pub emotion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    /// Adversary message stamped now with a fresh id.
    pub fn adversary(text: impl Into<String>) -> Self {
        Self::new(Sender::Adversary, text)
    }

    /// Agent (honeypot) message stamped now with a fresh id.
    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Sender::Agent, text)
    }

    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender,
            text: text.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Indicator categories tracked per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    BankAccount,
    UpiId,
    PhishingLink,
    PhoneNumber,
    SuspiciousKeyword,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 5] = [
        IndicatorKind::BankAccount,
        IndicatorKind::UpiId,
        IndicatorKind::PhishingLink,
        IndicatorKind::PhoneNumber,
        IndicatorKind::SuspiciousKeyword,
    ];

    /// Wire field name inside `detectedIntelligence`.
    pub fn field(&self) -> &'static str {
        match self {
            IndicatorKind::BankAccount => "bankAccounts",
            IndicatorKind::UpiId => "upiIds",
            IndicatorKind::PhishingLink => "phishingLinks",
            IndicatorKind::PhoneNumber => "phoneNumbers",
            IndicatorKind::SuspiciousKeyword => "suspiciousKeywords",
        }
    }
}

/// Five indicator sets. Accumulated intelligence only ever holds normalized values;
/// a raw per-turn delta may still hold values as the model emitted them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedIntelligence {
    #[serde(default)]
    pub bank_accounts: BTreeSet<String>,
    #[serde(default)]
    pub upi_ids: BTreeSet<String>,
    #[serde(default)]
    pub phishing_links: BTreeSet<String>,
    #[serde(default)]
    pub phone_numbers: BTreeSet<String>,
    #[serde(default)]
    pub suspicious_keywords: BTreeSet<String>,
}

impl ExtractedIntelligence {
    pub fn set(&self, kind: IndicatorKind) -> &BTreeSet<String> {
        match kind {
            IndicatorKind::BankAccount => &self.bank_accounts,
            IndicatorKind::UpiId => &self.upi_ids,
            IndicatorKind::PhishingLink => &self.phishing_links,
            IndicatorKind::PhoneNumber => &self.phone_numbers,
            IndicatorKind::SuspiciousKeyword => &self.suspicious_keywords,
        }
    }

    pub(crate) fn set_mut(&mut self, kind: IndicatorKind) -> &mut BTreeSet<String> {
        match kind {
            IndicatorKind::BankAccount => &mut self.bank_accounts,
            IndicatorKind::UpiId => &mut self.upi_ids,
            IndicatorKind::PhishingLink => &mut self.phishing_links,
            IndicatorKind::PhoneNumber => &mut self.phone_numbers,
            IndicatorKind::SuspiciousKeyword => &mut self.suspicious_keywords,
        }
    }

    /// Total indicators across all five categories.
    pub fn total(&self) -> usize {
        IndicatorKind::ALL.iter().map(|k| self.set(*k).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// One ongoing honeypot conversation. Owned by the session store; callers only
/// ever see snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub meta: ChannelMeta,
    pub created_at: DateTime<Utc>,
    pub history: Vec<Message>,
    pub intelligence: ExtractedIntelligence,
    pub strategies: Vec<String>,
}

impl Session {
    pub(crate) fn new(id: &str, meta: ChannelMeta) -> Self {
        Self {
            id: id.to_string(),
            meta,
            created_at: Utc::now(),
            history: Vec::new(),
            intelligence: ExtractedIntelligence::default(),
            strategies: Vec::new(),
        }
    }

    /// Completed turns (one adversary + one agent message each).
    pub fn turns(&self) -> usize {
        self.strategies.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "AI_GENERATED")]
    AiGenerated,
    #[serde(rename = "HUMAN")]
    Human,
}

impl Classification {
    pub fn label(&self) -> &'static str {
        match self {
            Classification::AiGenerated => "AI_GENERATED",
            Classification::Human => "HUMAN",
        }
    }
}

/// Forensic signal breakdown, every score in [0,1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalVector {
    pub pitch_variation: f64,
    pub breath_randomness: f64,
    pub spectral_flatness: f64,
    pub neural_artifacts: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    pub time: String,
    pub event: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceAnalysisResult {
    pub classification: Classification,
    pub confidence: f64,
    pub explanation: String,
    pub language_detected: String,
    pub signals: SignalVector,
    pub anomalies_timeline: Vec<AnomalyEvent>,
}

/// Validated honeypot model output for a single turn.
#[derive(Debug, Clone, PartialEq)]
pub struct HoneypotReply {
    pub reply: String,
    pub strategy_used: String,
    pub detected_intelligence: ExtractedIntelligence,
    pub metadata: Option<MessageMetadata>,
}
