//! Schema contract: declares the output shape expected from each inference use case and
//! validates raw inference text against it before anything else trusts it.
//!
//! Validation is pure. A result is either fully populated and range-checked, or a
//! [`ContractViolation`] naming the offending field. Bounded scores are clamped into [0,1]
//! and every clamp is recorded on the [`Validated`] wrapper.

use crate::error::ContractViolation;
use crate::types::{
    AnomalyEvent, Classification, ExtractedIntelligence, HoneypotReply, IndicatorKind,
    MessageMetadata, SignalVector, VoiceAnalysisResult,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

/// Markdown code fence some models wrap JSON in despite a JSON response mode.
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```[a-zA-Z]*\s*(.*?)\s*```\s*$").expect("valid fence regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    VoiceAnalysis,
    HoneypotReply,
}

impl SchemaKind {
    /// Schema name sent alongside structured-output requests.
    pub fn name(&self) -> &'static str {
        match self {
            SchemaKind::VoiceAnalysis => "voice_analysis",
            SchemaKind::HoneypotReply => "honeypot_reply",
        }
    }

    /// JSON schema describing the expected output.
    pub fn json_schema(&self) -> Value {
        match self {
            SchemaKind::VoiceAnalysis => json!({
                "type": "object",
                "properties": {
                    "classification": { "type": "string", "enum": ["AI_GENERATED", "HUMAN"] },
                    "confidence": { "type": "number", "minimum": 0, "maximum": 1 },
                    "explanation": { "type": "string" },
                    "languageDetected": { "type": "string" },
                    "signals": {
                        "type": "object",
                        "properties": {
                            "pitchVariation": { "type": "number" },
                            "breathRandomness": { "type": "number" },
                            "spectralFlatness": { "type": "number" },
                            "neuralArtifacts": { "type": "number" }
                        },
                        "required": ["pitchVariation", "breathRandomness", "spectralFlatness", "neuralArtifacts"]
                    },
                    "anomaliesTimeline": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "time": { "type": "string" },
                                "event": { "type": "string" }
                            }
                        }
                    }
                },
                "required": ["classification", "confidence", "explanation", "languageDetected", "signals"]
            }),
            SchemaKind::HoneypotReply => {
                let string_list = json!({ "type": "array", "items": { "type": "string" } });
                let intel: Map<String, Value> = IndicatorKind::ALL
                    .iter()
                    .map(|k| (k.field().to_string(), string_list.clone()))
                    .collect();
                json!({
                    "type": "object",
                    "properties": {
                        "reply": { "type": "string" },
                        "strategyUsed": { "type": "string" },
                        "intent": { "type": "string" },
                        "emotion": { "type": "string" },
                        "detectedIntelligence": { "type": "object", "properties": intel }
                    },
                    "required": ["reply"]
                })
            }
        }
    }
}

/// A bounded numeric field that arrived outside [0,1].
#[derive(Debug, Clone, PartialEq)]
pub struct Clamp {
    pub field: String,
    pub original: f64,
    pub clamped: f64,
}

/// Fully validated value plus any clamps applied along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated<T> {
    pub value: T,
    pub clamps: Vec<Clamp>,
}

impl<T> Validated<T> {
    pub fn was_clamped(&self) -> bool {
        !self.clamps.is_empty()
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedResult {
    VoiceAnalysis(Validated<VoiceAnalysisResult>),
    HoneypotReply(Validated<HoneypotReply>),
}

/// Validate raw inference output against `kind`.
pub fn validate(raw: &str, kind: SchemaKind) -> Result<ValidatedResult, ContractViolation> {
    match kind {
        SchemaKind::VoiceAnalysis => validate_voice_analysis(raw).map(ValidatedResult::VoiceAnalysis),
        SchemaKind::HoneypotReply => validate_honeypot_reply(raw).map(ValidatedResult::HoneypotReply),
    }
}

pub fn validate_voice_analysis(raw: &str) -> Result<Validated<VoiceAnalysisResult>, ContractViolation> {
    let root = parse_object(raw)?;
    let mut fields = Fields::new(&root, "", raw);

    let classification = parse_classification(&fields.required_str("classification")?)
        .ok_or_else(|| fields.violation("classification", "expected AI_GENERATED or HUMAN"))?;
    let confidence = fields.required_score("confidence")?;
    let explanation = fields.required_str("explanation")?;
    let language_detected = fields.required_str("languageDetected")?;

    let signals_obj = fields.required_object("signals")?;
    let mut sig = Fields::new(signals_obj, "signals.", raw);
    let signals = SignalVector {
        pitch_variation: sig.required_score("pitchVariation")?,
        breath_randomness: sig.required_score("breathRandomness")?,
        spectral_flatness: sig.required_score("spectralFlatness")?,
        neural_artifacts: sig.required_score("neuralArtifacts")?,
    };
    fields.clamps.append(&mut sig.clamps);

    let mut anomalies_timeline = Vec::new();
    for (i, item) in fields.optional_array("anomaliesTimeline")?.iter().enumerate() {
        let prefix = format!("anomaliesTimeline[{i}].");
        let obj = item
            .as_object()
            .ok_or_else(|| ContractViolation::new(prefix.trim_end_matches('.'), "expected object", &item.to_string()))?;
        let entry = Fields::new(obj, &prefix, raw);
        anomalies_timeline.push(AnomalyEvent {
            time: entry.optional_str("time")?,
            event: entry.optional_str("event")?,
        });
    }

    let value = VoiceAnalysisResult {
        classification,
        confidence,
        explanation,
        language_detected,
        signals,
        anomalies_timeline,
    };
    Ok(fields.finish(value))
}

pub fn validate_honeypot_reply(raw: &str) -> Result<Validated<HoneypotReply>, ContractViolation> {
    let root = parse_object(raw)?;
    let fields = Fields::new(&root, "", raw);

    let reply = fields.required_str("reply")?;
    if reply.trim().is_empty() {
        return Err(fields.violation("reply", "must not be empty"));
    }
    let strategy_used = fields.optional_str("strategyUsed")?.trim().to_string();

    let intent = fields.optional_str("intent")?;
    let emotion = fields.optional_str("emotion")?;
    let metadata = if intent.is_empty() && emotion.is_empty() {
        None
    } else {
        Some(MessageMetadata { intent, emotion })
    };

    let mut detected_intelligence = ExtractedIntelligence::default();
    if let Some(intel_obj) = fields.optional_object("detectedIntelligence")? {
        let intel = Fields::new(intel_obj, "detectedIntelligence.", raw);
        for kind in IndicatorKind::ALL {
            *detected_intelligence.set_mut(kind) = intel.optional_string_set(kind.field())?;
        }
    }

    let value = HoneypotReply {
        reply: reply.trim().to_string(),
        strategy_used,
        detected_intelligence,
        metadata,
    };
    Ok(fields.finish(value))
}

fn parse_object(raw: &str) -> Result<Map<String, Value>, ContractViolation> {
    let body = match CODE_FENCE.captures(raw) {
        Some(c) => c.get(1).map(|m| m.as_str()).unwrap_or_default(),
        None => raw.trim(),
    };
    if body.is_empty() {
        return Err(ContractViolation::new("$", "empty payload", raw));
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ContractViolation::new(
            "$",
            format!("expected JSON object, got {}", type_name(&other)),
            raw,
        )),
        Err(e) => Err(ContractViolation::new("$", format!("unparsable JSON: {e}"), raw)),
    }
}

fn parse_classification(s: &str) -> Option<Classification> {
    let norm: String = s
        .trim()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_uppercase() })
        .collect();
    match norm.as_str() {
        "AI_GENERATED" | "AI" | "SYNTHETIC" => Some(Classification::AiGenerated),
        "HUMAN" => Some(Classification::Human),
        _ => None,
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Field accessor over one JSON object, tracking its path prefix and clamps.
struct Fields<'a> {
    obj: &'a Map<String, Value>,
    prefix: String,
    raw: &'a str,
    clamps: Vec<Clamp>,
}

impl<'a> Fields<'a> {
    fn new(obj: &'a Map<String, Value>, prefix: &str, raw: &'a str) -> Self {
        Self {
            obj,
            prefix: prefix.to_string(),
            raw,
            clamps: Vec::new(),
        }
    }

    fn path(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn violation(&self, key: &str, reason: &str) -> ContractViolation {
        let fragment = self
            .obj
            .get(key)
            .map(|v| v.to_string())
            .unwrap_or_else(|| self.raw.to_string());
        ContractViolation::new(self.path(key), reason, &fragment)
    }

    /// Present and not null.
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.obj.get(key).filter(|v| !v.is_null())
    }

    fn required(&self, key: &str) -> Result<&'a Value, ContractViolation> {
        self.get(key)
            .ok_or_else(|| self.violation(key, "missing required field"))
    }

    fn required_str(&self, key: &str) -> Result<String, ContractViolation> {
        match self.required(key)? {
            Value::String(s) => Ok(s.clone()),
            _ => Err(self.violation(key, "expected string")),
        }
    }

    fn optional_str(&self, key: &str) -> Result<String, ContractViolation> {
        match self.get(key) {
            None => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(self.violation(key, "expected string")),
        }
    }

    fn required_object(&self, key: &str) -> Result<&'a Map<String, Value>, ContractViolation> {
        self.required(key)?
            .as_object()
            .ok_or_else(|| self.violation(key, "expected object"))
    }

    fn optional_object(&self, key: &str) -> Result<Option<&'a Map<String, Value>>, ContractViolation> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Object(m)) => Ok(Some(m)),
            Some(_) => Err(self.violation(key, "expected object")),
        }
    }

    fn optional_array(&self, key: &str) -> Result<&'a [Value], ContractViolation> {
        match self.get(key) {
            None => Ok(&[]),
            Some(Value::Array(items)) => Ok(items.as_slice()),
            Some(_) => Err(self.violation(key, "expected array")),
        }
    }

    /// Array of strings; numbers are accepted and rendered as text (account numbers
    /// and phone numbers frequently arrive unquoted).
    fn optional_string_set(&self, key: &str) -> Result<BTreeSet<String>, ContractViolation> {
        let mut out = BTreeSet::new();
        for item in self.optional_array(key)? {
            match item {
                Value::String(s) => {
                    out.insert(s.clone());
                }
                Value::Number(n) => {
                    out.insert(n.to_string());
                }
                Value::Null => {}
                other => {
                    return Err(ContractViolation::new(
                        self.path(key),
                        format!("expected string items, got {}", type_name(other)),
                        &other.to_string(),
                    ))
                }
            }
        }
        Ok(out)
    }

    /// Number in [0,1]. Numeric strings are coerced; out-of-range values are clamped
    /// and recorded; NaN or non-numeric values are a violation.
    fn required_score(&mut self, key: &str) -> Result<f64, ContractViolation> {
        let value = self.required(key)?;
        let n = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|n| n.is_finite())
        .ok_or_else(|| self.violation(key, "expected number"))?;

        let clamped = n.clamp(0.0, 1.0);
        if clamped != n {
            tracing::warn!(field = %self.path(key), original = n, "clamped out-of-range score");
            self.clamps.push(Clamp {
                field: self.path(key),
                original: n,
                clamped,
            });
        }
        Ok(clamped)
    }

    fn finish<T>(self, value: T) -> Validated<T> {
        Validated {
            value,
            clamps: self.clamps,
        }
    }
}
