//! Prompt templates for voice forensics and honeypot engagement.

pub mod forensic;
pub mod honeypot;

pub use forensic::{forensic_user_prompt, FORENSIC_SYSTEM, FORENSIC_USER_TEMPLATE};
pub use honeypot::{
    honeypot_user_prompt, render_history, HONEYPOT_PERSONA_SYSTEM, HONEYPOT_USER_TEMPLATE,
};

/// Substitute `{name}` placeholders in one scan of `template`. Substituted text is never
/// rescanned, so braces inside values come through verbatim. Unknown placeholders are kept.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let value = tail[1..].find('}').and_then(|close| {
            let name = &tail[1..1 + close];
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v, close + 2))
        });
        match value {
            Some((v, consumed)) => {
                out.push_str(v);
                rest = &tail[consumed..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_does_not_rescan_values() {
        let out = fill("a={a} b={b}", &[("a", "{b}"), ("b", "x")]);
        assert_eq!(out, "a={b} b=x");
    }

    #[test]
    fn fill_keeps_unknown_and_unclosed_braces() {
        assert_eq!(fill("{x} {a} {", &[("a", "1")]), "{x} 1 {");
        assert_eq!(fill("{\"reply\": {a}}", &[("a", "\"hi\"")]), "{\"reply\": \"hi\"}");
    }
}
