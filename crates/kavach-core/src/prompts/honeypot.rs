//! Honeypot persona and per-turn prompt.
//!
//! The persona forbids repeating an earlier agent sentence verbatim. That rule lives only in
//! the prompt; nothing downstream checks the model's phrasing.

use crate::types::Message;

/// Fixed persona directive sent as the system message on every turn.
pub const HONEYPOT_PERSONA_SYSTEM: &str = r#"Role: KAVACH honeypot agent.
Context: you are engaging a suspected scammer to extract intelligence for fraud investigators.
Persona: an ordinary person. Human-like, slightly confused but interested, with realistic hesitation.
Rules:
- Stay in character. Never reveal that you are an automated agent or that you suspect fraud.
- Never repeat a sentence you already said earlier in the conversation, word for word.
- Adapt your tone to the scammer's; keep replies short, like a real message on this channel.
- Steer the scammer into revealing payment details: bank accounts, UPI ids, links, phone numbers.
- Never send money, credentials or real personal data.
Answer with JSON only."#;

/// Per-turn template. `{channel}`, `{language}`, `{locale}`, `{history}` and `{message}` are replaced.
pub const HONEYPOT_USER_TEMPLATE: &str = r#"Channel: {channel}. Language: {language}. Locale: {locale}.

Conversation history:
{history}

New scammer message:
"{message}"

Return JSON:
- reply: your natural response
- strategyUsed: short label for your tactic (e.g. "Verification Probing", "Passive Listening")
- intent: the scammer's apparent intent in this message
- emotion: the emotion your reply conveys
- detectedIntelligence: { bankAccounts, upiIds, phishingLinks, phoneNumbers, suspiciousKeywords }
  listing only indicators that appear in the new scammer message"#;

/// History as `sender: text` lines in arrival order.
pub fn render_history(history: &[Message]) -> String {
    if history.is_empty() {
        return "(no prior messages)".to_string();
    }
    history
        .iter()
        .map(|m| format!("{}: {}", m.sender.label(), m.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn honeypot_user_prompt(
    channel: &str,
    language: &str,
    locale: &str,
    history: &[Message],
    incoming: &str,
) -> String {
    let history = render_history(history);
    super::fill(
        HONEYPOT_USER_TEMPLATE,
        &[
            ("channel", channel),
            ("language", language),
            ("locale", locale),
            ("history", &history),
            ("message", incoming),
        ],
    )
}
