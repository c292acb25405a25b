// Signals Extractor (component K) — detects persons, organizations,
// document IDs, dates and financial amounts in the *original* sanitized
// text. Grounded on original source's `signal_service.py`
// `signal_patterns` regex dict; re-expressed as `LazyLock<Regex>` statics in
// the validator's own style (`SUSPICIOUS_PATTERNS`) rather than a runtime
// dict lookup.

use std::sync::LazyLock;

use regex::Regex;

use crate::dictionaries::{is_given_name, LEGAL_FORMS};
use crate::types::SignalsResult;

static FULL_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-ZА-ЯІЇЄҐ][a-zа-яіїєґ'-]+(?:\s+[A-ZА-ЯІЇЄҐ][a-zа-яіїєґ'-]+){1,2}\b").unwrap()
});

static INITIALS_SURNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-ZА-ЯІЇЄҐ]\.\s*[A-ZА-ЯІЇЄҐ]?\.?\s*[A-ZА-ЯІЇЄҐ][a-zа-яіїєґ]+\b").unwrap()
});

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:\d{1,2}\.\d{1,2}\.\d{4}|\d{4}-\d{1,2}-\d{1,2}|\d{1,2}\s+(?:січня|лютого|березня|квітня|травня|червня|липня|серпня|вересня|жовтня|листопада|грудня|января|февраля|марта|апреля|мая|июня|июля|августа|сентября|октября|ноября|декабря|January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{4})\b").unwrap()
});

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d+[.,]?\d*\s*(?:USD|EUR|UAH|RUB|GBP|грн|гривень|гривня|рублів|рубль|долар|долларов|доллар|евро|euro)\b").unwrap()
});

static DOCUMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    // document-number shapes: 8-digit EDRPOU, 10-digit tax id, 2-letter+6-digit
    // passport, IBAN-shaped 2-letter+2-digit+alnum.
    Regex::new(r"\b(?:[A-Z]{2}\d{6}|\d{10}|\d{8}|[A-Z]{2}\d{2}[A-Z0-9]{10,30})\b").unwrap()
});

static ORG_FORM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:ТОВ|ПАТ|АТ|КП|ДП|ФОП|ІП|ООО|АО|ПАО|ЗАО|ОАО|ИП|LLC|Inc|Corp|Ltd|PLC|AG|GmbH)\b").unwrap()
});

fn extract_persons(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for m in FULL_NAME_RE.find_iter(text) {
        out.push(m.as_str().to_string());
    }
    for m in INITIALS_SURNAME_RE.find_iter(text) {
        out.push(m.as_str().to_string());
    }
    // dictionary-hit single tokens not already covered by a bigram above
    for word in text.split_whitespace() {
        let trimmed: String = word.chars().filter(|c| c.is_alphabetic()).collect();
        if is_given_name(&trimmed.to_lowercase()).is_some()
            && !out.iter().any(|p| p.contains(&trimmed))
        {
            out.push(trimmed);
        }
    }
    out.sort();
    out.dedup();
    out
}

fn extract_organizations(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for m in ORG_FORM_RE.find_iter(text) {
        let form_end = m.end();
        let tail = text[form_end..].trim_start();
        let next_word: String = tail.chars().take_while(|c| c.is_alphanumeric() || *c == '"' || *c == '\'').collect();
        if next_word.is_empty() {
            out.push(m.as_str().to_string());
        } else {
            out.push(format!("{} {}", m.as_str(), next_word));
        }
    }
    out.sort();
    out.dedup();
    out
}

fn extract_documents(text: &str) -> Vec<String> {
    DOCUMENT_RE.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

fn extract_dates(text: &str) -> Vec<String> {
    DATE_RE.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

fn extract_amounts(text: &str) -> Vec<String> {
    AMOUNT_RE.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

pub fn extract(text: &str) -> SignalsResult {
    let _ = LEGAL_FORMS; // shares vocabulary with component E's legal-form stems
    SignalsResult {
        persons:       extract_persons(text),
        organizations: extract_organizations(text),
        documents:     extract_documents(text),
        dates:         extract_dates(text),
        amounts:       extract_amounts(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_full_name() {
        let s = extract("Оплата від Петро Порошенко за послуги");
        assert!(s.persons.iter().any(|p| p.contains("Петро")));
    }

    #[test]
    fn extracts_organization_with_legal_form() {
        let s = extract("ТОВ Альфа уклало договір");
        assert!(s.organizations.iter().any(|o| o.starts_with("ТОВ")));
    }

    #[test]
    fn extracts_document_number_shape() {
        let s = extract("EDRPOU 12345678 registered");
        assert!(s.documents.contains(&"12345678".to_string()));
    }

    #[test]
    fn extracts_date() {
        let s = extract("Договір від 15.03.2023 набирає чинності");
        assert!(s.dates.contains(&"15.03.2023".to_string()));
    }

    #[test]
    fn extracts_currency_amount() {
        let s = extract("Сума 500 USD переказано");
        assert!(s.amounts.iter().any(|a| a.contains("USD")));
    }
}
