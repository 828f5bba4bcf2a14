//! Forensic voice analysis: instructs the model to classify one audio sample as synthetic
//! or human and to score four micro-signals.

/// System instruction for the forensic classifier.
pub const FORENSIC_SYSTEM: &str = r#"You are a forensic voice analyst for an anti-fraud operations desk.
You decide whether a voice sample is AI_GENERATED or HUMAN and justify the decision with measurable signals.
Never guess a classification without scoring the signals. Answer with JSON only."#;

/// User prompt template: `{language}` is replaced with the target language hint.
pub const FORENSIC_USER_TEMPLATE: &str = r#"Conduct a forensic voice analysis of the attached audio.
Target language: {language}.
Detect: AI_GENERATED or HUMAN.

Analyze micro-signals, each scored from 0 to 1:
1. pitchVariation: randomness of pitch (jitter). Natural speech varies irregularly.
2. breathRandomness: consistency of breath gaps. Synthetic voices often lack natural pauses.
3. spectralFlatness: flatness of the spectrum across voiced segments.
4. neuralArtifacts: neural vocoder artifacts (high-frequency spectral patterns).

Return JSON with:
- classification (AI_GENERATED or HUMAN)
- confidence (0 to 1)
- explanation (detailed reason)
- languageDetected
- signals: { pitchVariation, breathRandomness, spectralFlatness, neuralArtifacts }
- anomaliesTimeline: array of { time, event } (empty if none)"#;

/// Build the user prompt for the given target language.
pub fn forensic_user_prompt(language: &str) -> String {
    super::fill(FORENSIC_USER_TEMPLATE, &[("language", language)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_is_substituted() {
        let p = forensic_user_prompt("Tamil");
        assert!(p.contains("Target language: Tamil."));
        assert!(!p.contains("{language}"));
    }
}
