// Visual-confusable, keyboard-adjacency and phonetic-digraph tables used by
// the variant generator (component F, *generating* attack-surface patterns —
// the opposite direction from the validator's defensive homoglyph stripping)
// and by the blocking-key phonetic surname computation (component H).

/// Latin <-> Cyrillic visual confusables, keyed by the Latin letter (the
/// direction the variant generator needs: take a canonical Latin transliteration
/// and produce the Cyrillic-lookalike spoofed form an adversary might submit).
pub const VISUAL_CONFUSABLES: &[(char, char)] = &[
    ('a', 'а'), ('e', 'е'), ('o', 'о'), ('p', 'р'), ('c', 'с'),
    ('x', 'х'), ('y', 'у'), ('i', 'і'), ('k', 'к'), ('m', 'м'), ('h', 'н'),
];

/// QWERTY-adjacency pairs for single-character typo-variant generation.
/// Symmetric: callers should treat `(a, b)` as implying `(b, a)`.
pub const KEYBOARD_ADJACENCY: &[(char, char)] = &[
    ('q', 'w'), ('w', 'e'), ('e', 'r'), ('r', 't'), ('t', 'y'), ('y', 'u'),
    ('u', 'i'), ('i', 'o'), ('o', 'p'),
    ('a', 's'), ('s', 'd'), ('d', 'f'), ('f', 'g'), ('g', 'h'), ('h', 'j'),
    ('j', 'k'), ('k', 'l'),
    ('z', 'x'), ('x', 'c'), ('c', 'v'), ('v', 'b'), ('b', 'n'), ('n', 'm'),
];

pub fn adjacent_keys(c: char) -> Vec<char> {
    let lower = c.to_ascii_lowercase();
    let mut out = Vec::new();
    for &(a, b) in KEYBOARD_ADJACENCY {
        if a == lower { out.push(b); }
        if b == lower { out.push(a); }
    }
    out
}

/// Coarse phonetic code: a Soundex-family algorithm good enough to bucket
/// surnames for blocking (not a precision signal; confirmed by later tiers).
/// Works over an ASCII-transliterated surname — callers transliterate first.
pub fn simple_soundex(word: &str) -> String {
    let word = word.to_ascii_lowercase();
    let mut chars = word.chars().filter(|c| c.is_ascii_alphabetic());
    let first = match chars.next() {
        Some(c) => c,
        None => return String::new(),
    };

    let code_for = |c: char| -> Option<char> {
        match c {
            'b' | 'f' | 'p' | 'v' => Some('1'),
            'c' | 'g' | 'j' | 'k' | 'q' | 's' | 'x' | 'z' => Some('2'),
            'd' | 't' => Some('3'),
            'l' => Some('4'),
            'm' | 'n' => Some('5'),
            'r' => Some('6'),
            _ => None,
        }
    };

    let mut out = String::new();
    out.push(first.to_ascii_uppercase());
    let mut last_code = code_for(first);

    for c in chars {
        let code = code_for(c);
        if let Some(code_char) = code {
            if Some(code_char) != last_code {
                out.push(code_char);
            }
        }
        last_code = code;
        if out.len() >= 4 {
            break;
        }
    }
    while out.len() < 4 {
        out.push('0');
    }
    out
}

/// A lighter-weight phonetic key than Soundex: first letter + vowel-stripped
/// consonant skeleton, used as a secondary bucket alongside Soundex to widen
/// recall for the `phonetic_surname` blocking key (component H).
pub fn consonant_skeleton(word: &str) -> String {
    word.to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphabetic() && !"aeiouy".contains(*c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soundex_groups_similar_surnames() {
        assert_eq!(simple_soundex("Poroshenko"), simple_soundex("Porosenko"));
    }

    #[test]
    fn adjacency_is_found_both_directions() {
        assert!(adjacent_keys('w').contains(&'q'));
        assert!(adjacent_keys('q').contains(&'w'));
    }

    #[test]
    fn consonant_skeleton_strips_vowels() {
        assert_eq!(consonant_skeleton("Poroshenko"), "prshnk");
    }
}
