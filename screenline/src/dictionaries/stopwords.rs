// Stop-word and boundary-phrase tables — union of ru+uk+en, used for phrase
// boundary stripping (spec §4.E: "not interior").

pub const STOP_WORDS: &[&str] = &[
    // prepositions / conjunctions / articles
    "від", "от", "из", "із", "для", "по", "на", "за", "до", "the", "a", "an",
    "of", "to", "from", "for", "and", "и", "та", "або", "or", "в", "у",
    // payment-phrase filler
    "оплата", "платеж", "платіж", "переказ", "перевод", "payment", "рахунок",
    "счет", "договору", "договор", "номер", "№", "сумма", "сума",
];

/// Long legal/boilerplate phrases stripped as whole units at phrase
/// boundaries before tokenization proper.
pub const LEGAL_PHRASES: &[&str] = &[
    "згідно з договором", "согласно договору", "по договору №",
    "за договором", "по договору",
];

pub fn is_stop_word(token_lower: &str) -> bool {
    STOP_WORDS.contains(&token_lower)
}

pub fn strip_boundary_stop_words<'a>(tokens: &[&'a str]) -> Vec<&'a str> {
    let mut start = 0;
    let mut end = tokens.len();
    while start < end && is_stop_word(&tokens[start].to_lowercase()) {
        start += 1;
    }
    while end > start && is_stop_word(&tokens[end - 1].to_lowercase()) {
        end -= 1;
    }
    tokens[start..end].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_only_boundary_stop_words() {
        let tokens = vec!["від", "Петро", "Порошенко"];
        let out = strip_boundary_stop_words(&tokens);
        assert_eq!(out, vec!["Петро", "Порошенко"]);
    }

    #[test]
    fn interior_stop_word_kept() {
        // "для" sits between two name-shaped words; boundary stripping must
        // not remove interior tokens.
        let tokens = vec!["Петро", "для", "Порошенко"];
        let out = strip_boundary_stop_words(&tokens);
        assert_eq!(out, tokens);
    }
}
