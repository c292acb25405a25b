// Given-name, surname-morphology, patronymic and diminutive seed tables.

use crate::types::Gender;

/// Ukrainian given names (lowercase, nominative). Seed sample, not exhaustive.
pub const UK_GIVEN_NAMES: &[(&str, Gender)] = &[
    ("петро", Gender::Masculine),
    ("іван", Gender::Masculine),
    ("андрій", Gender::Masculine),
    ("олександр", Gender::Masculine),
    ("володимир", Gender::Masculine),
    ("богдан", Gender::Masculine),
    ("тарас", Gender::Masculine),
    ("назар", Gender::Masculine),
    ("оксана", Gender::Feminine),
    ("наталія", Gender::Feminine),
    ("тетяна", Gender::Feminine),
    ("ірина", Gender::Feminine),
    ("олена", Gender::Feminine),
    ("марія", Gender::Feminine),
    ("юлія", Gender::Feminine),
];

/// Russian given names (lowercase, nominative). Seed sample, not exhaustive.
pub const RU_GIVEN_NAMES: &[(&str, Gender)] = &[
    ("пётр", Gender::Masculine),
    ("петр", Gender::Masculine),
    ("иван", Gender::Masculine),
    ("андрей", Gender::Masculine),
    ("александр", Gender::Masculine),
    ("владимир", Gender::Masculine),
    ("дмитрий", Gender::Masculine),
    ("сергей", Gender::Masculine),
    ("оксана", Gender::Feminine),
    ("наталья", Gender::Feminine),
    ("татьяна", Gender::Feminine),
    ("ирина", Gender::Feminine),
    ("елена", Gender::Feminine),
    ("мария", Gender::Feminine),
    ("юлия", Gender::Feminine),
];

/// English given names (lowercase). Seed sample, not exhaustive.
pub const EN_GIVEN_NAMES: &[(&str, Gender)] = &[
    ("peter", Gender::Masculine),
    ("john", Gender::Masculine),
    ("andrew", Gender::Masculine),
    ("alexander", Gender::Masculine),
    ("vladimir", Gender::Masculine),
    ("oksana", Gender::Feminine),
    ("natalia", Gender::Feminine),
    ("irina", Gender::Feminine),
    ("elena", Gender::Feminine),
    ("maria", Gender::Feminine),
];

/// Ukrainian surname suffixes (role tagging, §4.E step 2) — longest first so
/// greedy suffix matching prefers the most specific ending.
pub const UK_SURNAME_SUFFIXES: &[&str] = &[
    "енко", "ко", "ук", "юк", "чук", "ський", "цький", "зький",
    "ська", "цька", "зька", "ишин", "ич", "ак", "як",
];

/// Russian surname suffixes.
pub const RU_SURNAME_SUFFIXES: &[&str] = &[
    "ов", "ова", "ев", "ева", "ин", "ина", "ский", "ская", "цкий", "цкая",
];

/// Patronymic suffixes (ru + uk) — these are near-unambiguous role markers.
pub const PATRONYMIC_SUFFIXES: &[&str] = &[
    "ович", "евич", "івна", "овна", "ївна", "инична",
];

/// Diminutive -> canonical given-name lemma. Lookup is case-insensitive by
/// convention (callers lowercase before probing).
pub const DIMINUTIVES: &[(&str, &str)] = &[
    ("петя", "петро"),
    ("петруся", "петро"),
    ("ваня", "іван"),
    ("ванюша", "іван"),
    ("саша", "олександр"),
    ("шура", "олександр"),
    ("вова", "володимир"),
    ("вовчик", "володимир"),
    ("дима", "дмитрий"),
    ("митя", "дмитрий"),
    ("сережа", "сергей"),
    ("серёжа", "сергей"),
    ("таня", "тетяна"),
    ("таня", "татьяна"),
    ("оля", "олена"),
    ("лена", "елена"),
    ("маша", "мария"),
    ("маруся", "мария"),
    ("юля", "юлія"),
    ("ира", "ирина"),
    ("наташа", "наталія"),
    ("наташа", "наталья"),
];

pub fn diminutive_to_lemma(token_lower: &str) -> Option<&'static str> {
    DIMINUTIVES.iter().find(|(dim, _)| *dim == token_lower).map(|(_, lemma)| *lemma)
}

fn lookup_gender(table: &[(&str, Gender)], token_lower: &str) -> Option<Gender> {
    table.iter().find(|(n, _)| *n == token_lower).map(|(_, g)| *g)
}

pub fn is_given_name(token_lower: &str) -> Option<Gender> {
    lookup_gender(UK_GIVEN_NAMES, token_lower)
        .or_else(|| lookup_gender(RU_GIVEN_NAMES, token_lower))
        .or_else(|| lookup_gender(EN_GIVEN_NAMES, token_lower))
}

pub fn has_uk_surname_suffix(token_lower: &str) -> bool {
    UK_SURNAME_SUFFIXES.iter().any(|suf| token_lower.ends_with(suf) && token_lower.len() > suf.len() + 1)
}

pub fn has_ru_surname_suffix(token_lower: &str) -> bool {
    RU_SURNAME_SUFFIXES.iter().any(|suf| token_lower.ends_with(suf) && token_lower.len() > suf.len() + 1)
}

pub fn has_patronymic_suffix(token_lower: &str) -> bool {
    PATRONYMIC_SUFFIXES.iter().any(|suf| token_lower.ends_with(suf))
}

/// ru/uk noun case endings used to strip declension back to a nominative-ish
/// stem for surnames (spec §4.E: for surnames, take the nominative form).
/// Small table, longest-suffix-first; conservative (only strips when the
/// remaining stem is long enough to still look like a name).
pub const SURNAME_CASE_ENDINGS: &[&str] = &[
    "ому", "ів", "ем", "им", "им", "ою", "ою", "у", "а", "ем", "ом",
];

pub fn strip_case_ending(token_lower: &str) -> String {
    for ending in SURNAME_CASE_ENDINGS {
        if token_lower.ends_with(ending) && token_lower.len() > ending.len() + 3 {
            return token_lower[..token_lower.len() - ending.len()].to_string();
        }
    }
    token_lower.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_ukrainian_surname_suffix() {
        assert!(has_uk_surname_suffix("порошенко"));
        assert!(has_uk_surname_suffix("шевчук"));
    }

    #[test]
    fn recognizes_patronymic() {
        assert!(has_patronymic_suffix("іванович"));
        assert!(has_patronymic_suffix("петрівна"));
    }

    #[test]
    fn diminutive_resolves_to_canonical() {
        assert_eq!(diminutive_to_lemma("вова"), Some("володимир"));
    }
}
