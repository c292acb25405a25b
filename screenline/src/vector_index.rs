// Vector Index / kNN (component I) — character n-gram (3..5) TF-IDF, cosine
// similarity. Two modes: a persistent index built once over the whole
// watchlist, and an ephemeral ad-hoc index built from the current request's
// tier-1/2 AC pattern pool when no persistent index is ready. Snapshot
// storage follows the teacher's `Arc<RwLock<_>>`-per-entry shape
// (`state/window.rs`'s `DashMap<String, Arc<RwLock<AccountWindow>>>`); here
// the whole index is one snapshot behind one lock since reload replaces or
// overlays the entire structure, not per-entity slices.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::ReasonCode;

pub type SparseVector = HashMap<String, f32>;

fn ngrams(text: &str, n: usize) -> Vec<String> {
    let chars: Vec<char> = text.to_lowercase().chars().collect();
    if chars.len() < n {
        return if chars.is_empty() { Vec::new() } else { vec![chars.iter().collect()] };
    }
    (0..=chars.len() - n).map(|i| chars[i..i + n].iter().collect()).collect()
}

fn all_ngrams(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for n in 3..=5 {
        out.extend(ngrams(text, n));
    }
    out
}

fn l2_normalize(v: &mut SparseVector) {
    let norm: f32 = v.values().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in v.values_mut() {
            *val /= norm;
        }
    }
}

fn cosine(a: &SparseVector, b: &SparseVector) -> f32 {
    let (smaller, larger) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    smaller.iter().map(|(k, v)| v * larger.get(k).copied().unwrap_or(0.0)).sum()
}

#[derive(Clone)]
struct DocEntry {
    doc_id:     String,
    name:       String,
    word_count: usize,
    vector:     SparseVector,
}

/// One built corpus: document frequencies plus per-doc TF-IDF vectors.
#[derive(Clone)]
struct Corpus {
    doc_freq: HashMap<String, usize>,
    doc_count: usize,
    docs:     Vec<DocEntry>,
}

impl Corpus {
    fn build(entries: &[(String, String)]) -> Self {
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut raw: Vec<(String, String, HashMap<String, usize>)> = Vec::new();

        for (doc_id, name) in entries {
            let mut term_count: HashMap<String, usize> = HashMap::new();
            for gram in all_ngrams(name) {
                *term_count.entry(gram).or_insert(0) += 1;
            }
            for term in term_count.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            raw.push((doc_id.clone(), name.clone(), term_count));
        }

        let doc_count = entries.len();
        let docs = raw.into_iter().map(|(doc_id, name, term_count)| {
            let total: usize = term_count.values().sum();
            let mut vector: SparseVector = term_count.iter().map(|(term, count)| {
                let tf = *count as f32 / total.max(1) as f32;
                let df = *doc_freq.get(term).unwrap_or(&1) as f32;
                let idf = ((doc_count as f32 + 1.0) / (df + 1.0)).ln() + 1.0;
                (term.clone(), tf * idf)
            }).collect();
            l2_normalize(&mut vector);
            DocEntry { doc_id, name, word_count: total, vector }
        }).collect();

        Self { doc_freq, doc_count, docs }
    }

    fn vectorize_query(&self, text: &str) -> SparseVector {
        let mut term_count: HashMap<String, usize> = HashMap::new();
        for gram in all_ngrams(text) {
            *term_count.entry(gram).or_insert(0) += 1;
        }
        let total: usize = term_count.values().sum();
        let mut vector: SparseVector = term_count.iter().map(|(term, count)| {
            let tf = *count as f32 / total.max(1) as f32;
            let df = *self.doc_freq.get(term).unwrap_or(&1) as f32;
            let idf = ((self.doc_count as f32 + 1.0) / (df + 1.0)).ln() + 1.0;
            (term.clone(), tf * idf)
        }).collect();
        l2_normalize(&mut vector);
        vector
    }

    fn search(&self, text: &str, k: usize) -> Vec<(String, f32)> {
        let query = self.vectorize_query(text);
        let mut scored: Vec<(String, f32)> = self.docs.iter()
            .map(|d| (d.doc_id.clone(), cosine(&query, &d.vector)))
            .filter(|(_, s)| *s > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        scored.truncate(k);
        scored
    }

    fn word_count_for(&self, doc_id: &str) -> usize {
        self.docs.iter().find(|d| d.doc_id == doc_id).map(|d| d.word_count).unwrap_or(1)
    }

    fn name_for(&self, doc_id: &str) -> Option<String> {
        self.docs.iter().find(|d| d.doc_id == doc_id).map(|d| d.name.clone())
    }
}

pub enum ReloadMode {
    AtomicReplace,
    Overlay,
}

/// Persistent watchlist-backed index. Holds the whole corpus behind one
/// `RwLock` so reload (replace or overlay) is a single write-lock critical
/// section; in-flight `search` calls that already acquired a read guard see
/// a consistent snapshot (spec §4.I "in-flight search calls see a consistent
/// version").
pub struct VectorIndex {
    corpus: RwLock<Arc<Corpus>>,
}

impl VectorIndex {
    pub fn build(entries: &[(String, String)]) -> Self {
        Self { corpus: RwLock::new(Arc::new(Corpus::build(entries))) }
    }

    pub fn empty() -> Self {
        Self { corpus: RwLock::new(Arc::new(Corpus::build(&[]))) }
    }

    pub fn reload(&self, entries: &[(String, String)], mode: ReloadMode) {
        let new_entries: Vec<(String, String)> = match mode {
            ReloadMode::AtomicReplace => entries.to_vec(),
            ReloadMode::Overlay => {
                let existing = self.corpus.read();
                let mut merged: Vec<(String, String)> = existing.docs.iter()
                    .map(|d| (d.doc_id.clone(), d.name.clone()))
                    .collect();
                merged.extend(entries.iter().cloned());
                merged
            }
        };
        let rebuilt = Arc::new(Corpus::build(&new_entries));
        *self.corpus.write() = rebuilt;
    }

    pub fn len(&self) -> usize {
        self.corpus.read().doc_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(doc_id, cosine, name, reason_code)` sorted descending by cosine.
    pub fn search(&self, text: &str, k: usize) -> Vec<(String, f32, String, ReasonCode)> {
        let snapshot = self.corpus.read().clone();
        snapshot.search(text, k).into_iter().map(|(doc_id, cosine)| {
            let name = snapshot.name_for(&doc_id).unwrap_or_default();
            let multi_word = snapshot.word_count_for(&doc_id) > 1;
            let reason = if multi_word { ReasonCode::RcAlias } else { ReasonCode::RcTypo };
            (doc_id, cosine, name, reason)
        }).collect()
    }
}

/// Maps a raw cosine similarity to candidate confidence (spec §4.I).
pub fn cosine_to_confidence(cosine: f32) -> f32 {
    0.40 + 0.50 * cosine.clamp(0.0, 1.0)
}

/// Build a small ad-hoc index from the current request's own candidate pool
/// when no persistent watchlist index is ready (ephemeral mode, §4.I).
pub fn ephemeral_search(pool: &[(String, String)], text: &str, k: usize) -> Vec<(String, f32, String, ReasonCode)> {
    let corpus = Corpus::build(pool);
    corpus.search(text, k).into_iter().map(|(doc_id, cosine)| {
        let name = corpus.name_for(&doc_id).unwrap_or_default();
        let multi_word = corpus.word_count_for(&doc_id) > 1;
        let reason = if multi_word { ReasonCode::RcAlias } else { ReasonCode::RcTypo };
        (doc_id, cosine, name, reason)
    }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_name_scores_near_one() {
        let idx = VectorIndex::build(&[
            ("e1".to_string(), "Petro Poroshenko".to_string()),
            ("e2".to_string(), "Volodymyr Zelensky".to_string()),
        ]);
        let results = idx.search("Petro Poroshenko", 5);
        assert_eq!(results[0].0, "e1");
        assert!(results[0].1 > 0.9);
    }

    #[test]
    fn typo_variant_still_scores_above_unrelated_entries() {
        let idx = VectorIndex::build(&[
            ("e1".to_string(), "Poroshenko".to_string()),
            ("e2".to_string(), "Zelensky".to_string()),
        ]);
        let results = idx.search("Porosenko", 5);
        assert_eq!(results[0].0, "e1");
    }

    #[test]
    fn atomic_replace_drops_old_entries() {
        let idx = VectorIndex::build(&[("e1".to_string(), "Poroshenko".to_string())]);
        idx.reload(&[("e2".to_string(), "Zelensky".to_string())], ReloadMode::AtomicReplace);
        assert_eq!(idx.len(), 1);
        assert!(idx.search("Poroshenko", 5).iter().all(|(id, ..)| id != "e1"));
    }

    #[test]
    fn overlay_keeps_old_entries_and_adds_new() {
        let idx = VectorIndex::build(&[("e1".to_string(), "Poroshenko".to_string())]);
        idx.reload(&[("e2".to_string(), "Zelensky".to_string())], ReloadMode::Overlay);
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn cosine_confidence_mapping_is_bounded() {
        assert!((cosine_to_confidence(0.0) - 0.40).abs() < 1e-6);
        assert!((cosine_to_confidence(1.0) - 0.90).abs() < 1e-6);
    }
}
