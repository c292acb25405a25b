// Input validator (component A) — sanitizes hostile or obfuscated input
// before any other stage runs. Regex set compiled once via `LazyLock`,
// grounded on the teacher's const-automaton-at-init idiom (`cot_automaton()`
// style) generalized from Aho-Corasick to a small regex set since these are
// structural (script tag shapes, escape shapes), not literal pattern lists.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::types::{ReasonCode, ValidationOutcome, ValidatorRisk};

pub const MAX_INPUT_LEN_DEFAULT: usize = 10_000;

const ZERO_WIDTH: [char; 5] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

static SUSPICIOUS_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("script_tag",   Regex::new(r"(?i)<\s*script[^>]*>").unwrap()),
        ("js_protocol",  Regex::new(r"(?i)javascript:").unwrap()),
        ("data_base64",  Regex::new(r"(?i)data:[^,]*;base64,").unwrap()),
        ("hex_escape",   Regex::new(r"(?i)\\x[0-9a-f]{2}").unwrap()),
        ("url_escape",   Regex::new(r"%[0-9a-f]{2}").unwrap()),
        ("html_entity",  Regex::new(r"&#x?[0-9a-f]+;").unwrap()),
    ]
});

static LATIN_DIGIT_CONFUSABLES: &[(char, char)] =
    &[('0', 'o'), ('1', 'l'), ('3', 'e'), ('5', 's')];

static CYRILLIC_LATIN_CONFUSABLES: &[(char, char)] =
    &[('а', 'a'), ('о', 'o'), ('р', 'p'), ('е', 'e')];

fn is_cyrillic(c: char) -> bool {
    matches!(c, '\u{0400}'..='\u{04FF}')
}

fn is_latin_letter(c: char) -> bool {
    c.is_ascii_alphabetic()
}

fn has_cyrillic(s: &str) -> bool {
    s.chars().any(is_cyrillic)
}

fn has_latin(s: &str) -> bool {
    s.chars().any(is_latin_letter)
}

fn is_control_to_strip(c: char) -> bool {
    if c == '\n' || c == '\r' || c == '\t' {
        return false;
    }
    matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}'..='\u{009F}')
}

fn is_zero_width(c: char) -> bool {
    ZERO_WIDTH.contains(&c)
}

pub struct ValidatorOptions {
    pub strict_mode:       bool,
    pub remove_homoglyphs: bool,
    pub max_input_len:     usize,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self { strict_mode: false, remove_homoglyphs: true, max_input_len: MAX_INPUT_LEN_DEFAULT }
    }
}

/// Reject non-UTF8 input is impossible to express (Rust `&str` already is),
/// so rule 1 collapses to a length check. Returns `Ok` unless strict mode
/// rejects the input outright — the orchestrator consults the ABORT rule on
/// that error per spec §4.L / §7.
pub fn validate(text: &str, opts: &ValidatorOptions) -> Result<ValidationOutcome, String> {
    let mut warnings = Vec::new();
    let mut blocked_patterns = Vec::new();
    let mut risk = ValidatorRisk::Low;

    // 1. length
    let mut working = text.to_string();
    if working.chars().count() > opts.max_input_len {
        if opts.strict_mode {
            return Err(format!("input exceeds max length {}", opts.max_input_len));
        }
        working = working.chars().take(opts.max_input_len).collect();
        warnings.push("input truncated to max length".to_string());
        risk = risk.max(ValidatorRisk::Medium);
    }

    // 2. suspicious patterns
    for (name, re) in SUSPICIOUS_PATTERNS.iter() {
        if re.is_match(&working) {
            if opts.strict_mode {
                return Err(format!("blocked pattern detected: {name}"));
            }
            blocked_patterns.push(name.to_string());
            risk = ValidatorRisk::High;
        }
    }
    if !blocked_patterns.is_empty() {
        // strip the offending spans so the remainder can still be screened
        for (_, re) in SUSPICIOUS_PATTERNS.iter() {
            working = re.replace_all(&working, "").into_owned();
        }
    }

    // 3. strip control + zero-width chars
    let had_control_or_zw = working.chars().any(|c| is_control_to_strip(c) || is_zero_width(c));
    let has_zwsp = working.chars().any(is_zero_width);
    working = working.chars().filter(|&c| !is_control_to_strip(c) && !is_zero_width(c)).collect();

    // 4. homoglyph policy — script-aware
    let cyrillic = has_cyrillic(&working);
    let latin = has_latin(&working);
    let mixed_script = cyrillic && latin;
    let mut homoglyph_applied = false;

    if opts.remove_homoglyphs {
        if latin && !cyrillic {
            for &(digit, letter) in LATIN_DIGIT_CONFUSABLES {
                if working.contains(digit) {
                    working = working.replace(digit, &letter.to_string());
                    homoglyph_applied = true;
                }
            }
        } else if mixed_script {
            for &(cy, la) in CYRILLIC_LATIN_CONFUSABLES {
                if working.contains(cy) {
                    working = working.replace(cy, &la.to_string());
                    homoglyph_applied = true;
                }
            }
        }
        // pure Cyrillic: left untouched to preserve identity for language detection
    }

    // 5. collapse whitespace, trim, NFC-normalize — never fail, best-effort
    let collapsed = working.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim().to_string();
    let nfc: String = trimmed.nfc().collect();
    let sanitized_text = if nfc.is_empty() && !trimmed.is_empty() { trimmed } else { nfc };

    // suppress benign-sanitization warnings (Open Question #2): only warn
    // when control chars were actually present, not for plain whitespace/NFC cleanup
    if had_control_or_zw {
        warnings.push("text modified during sanitization (control/zero-width removed)".to_string());
    }

    // 6. anomaly reason codes (separate scan, on the original text so mixed-script
    // detection isn't masked by the homoglyph pass above)
    let mut anomaly_codes = Vec::new();
    if has_cyrillic(text) && has_latin(text) {
        anomaly_codes.push(ReasonCode::RcMixedScript);
    }
    if mixed_script && homoglyph_applied {
        anomaly_codes.push(ReasonCode::RcHomoglyph);
    }
    if has_zwsp {
        anomaly_codes.push(ReasonCode::RcZwsp);
    }

    let is_valid = !sanitized_text.is_empty();

    Ok(ValidationOutcome {
        is_valid,
        sanitized_text,
        warnings,
        blocked_patterns,
        risk_level: risk,
        anomaly_codes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_cyrillic_untouched_by_homoglyph_pass() {
        let opts = ValidatorOptions::default();
        let out = validate("Петро Порошенко", &opts).unwrap();
        assert_eq!(out.sanitized_text, "Петро Порошенко");
        assert!(out.sanitized_text.chars().all(|c| !c.is_ascii_alphabetic()));
    }

    #[test]
    fn mixed_script_flags_homoglyph_and_mixed_script() {
        let opts = ValidatorOptions::default();
        // Cyrillic а/о mixed into an otherwise Latin name
        let out = validate("Pаvlоv", &opts).unwrap();
        assert!(out.anomaly_codes.contains(&ReasonCode::RcMixedScript));
        assert!(out.anomaly_codes.contains(&ReasonCode::RcHomoglyph));
        assert_eq!(out.sanitized_text, "Pavlov");
    }

    #[test]
    fn script_tag_non_strict_is_stripped_and_flagged() {
        let opts = ValidatorOptions::default();
        let out = validate("<script>alert(1)</script>Petro", &opts).unwrap();
        assert!(!out.blocked_patterns.is_empty());
        assert_eq!(out.risk_level, ValidatorRisk::High);
        assert_eq!(out.sanitized_text, "Petro");
    }

    #[test]
    fn script_tag_strict_mode_rejects() {
        let opts = ValidatorOptions { strict_mode: true, ..Default::default() };
        assert!(validate("<script>alert(1)</script>Petro", &opts).is_err());
    }

    #[test]
    fn zero_width_chars_flagged_and_stripped() {
        let opts = ValidatorOptions::default();
        let out = validate("Pe\u{200B}tro", &opts).unwrap();
        assert!(out.anomaly_codes.contains(&ReasonCode::RcZwsp));
        assert_eq!(out.sanitized_text, "Petro");
    }

    #[test]
    fn empty_input_is_invalid() {
        let opts = ValidatorOptions::default();
        let out = validate("   ", &opts).unwrap();
        assert!(!out.is_valid);
    }

    #[test]
    fn over_length_truncates_in_non_strict_mode() {
        let opts = ValidatorOptions { max_input_len: 5, ..Default::default() };
        let out = validate("abcdefgh", &opts).unwrap();
        assert_eq!(out.risk_level, ValidatorRisk::Medium);
        assert!(out.sanitized_text.chars().count() <= 5);
    }
}
