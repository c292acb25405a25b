// Legal-form and individual-entrepreneur marker tables (component E context
// detection: FOP/IP/ИП stripping, company-vs-person routing).

/// Individual-entrepreneur markers — uk/ru/en. Matching is case-insensitive
/// and the marker is stripped before role-tagging the remainder as a person.
pub const IE_MARKERS: &[&str] = &["фоп", "fop", "ип", "ie", "i.e."];

/// Legal-form tokens and a normalized "stem" used for `legal_form_key`
/// blocking (spec §4.H) — `(surface, stem)`.
pub const LEGAL_FORMS: &[(&str, &str)] = &[
    ("тов", "тов"),
    ("пп", "пп"),
    ("ооо", "ооо"),
    ("зат", "зат"),
    ("оао", "оао"),
    ("пат", "пат"),
    ("llc", "llc"),
    ("ltd", "ltd"),
    ("inc", "inc"),
    ("corp", "corp"),
    ("gmbh", "gmbh"),
];

pub fn is_ie_marker(token_lower: &str) -> bool {
    IE_MARKERS.contains(&token_lower)
}

pub fn legal_form_stem(token_lower: &str) -> Option<&'static str> {
    LEGAL_FORMS.iter().find(|(form, _)| *form == token_lower).map(|(_, stem)| *stem)
}

pub fn is_legal_form(token_lower: &str) -> bool {
    legal_form_stem(token_lower).is_some()
}

/// Payment-context trigger words used both by the normalizer (phrase
/// extraction) and the AC tier-1 builder (contextual full-name patterns).
pub const PAYMENT_CONTEXT_TRIGGERS: &[&str] = &[
    "оплата", "платеж", "платіж", "переказ", "перевод", "payment", "recipient",
    "отримувач", "получатель", "договору", "договор", "рахунок", "счет", "rent",
];

/// Reverse-transliteration cue words — presence picks uk vs ru reading of a
/// romanized payload (spec §4.E).
pub const UK_ROMANIZED_CUES: &[&str] = &["vid", "perekaz", "otrymuvach", "rakhunok"];
pub const RU_ROMANIZED_CUES: &[&str] = &["ot", "perevod", "poluchatel", "schet", "platezh"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_fop() {
        assert!(is_ie_marker("фоп"));
        assert!(is_ie_marker("fop"));
    }

    #[test]
    fn legal_form_stem_lookup() {
        assert_eq!(legal_form_stem("тов"), Some("тов"));
        assert_eq!(legal_form_stem("xyz"), None);
    }
}
