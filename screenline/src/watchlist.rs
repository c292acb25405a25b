// Watchlist snapshot management — owns the read-many/write-rarely data the
// screening cascade consults: the raw docs, the AC pattern index (G), the
// blocking bucket index (H) and the kNN vector index (I). One version
// number ties all three together so a reload either installs a fully
// consistent new snapshot or is rejected outright (spec §5: "a reload
// either fully installs a new index atomically or is rejected").
//
// Grounded on the teacher's `Arc<RwLock<_>>` snapshot idiom
// (`state/window.rs`); unlike the teacher's per-account windows, the whole
// watchlist is one snapshot behind one lock since reload always touches the
// full structure rather than a single key's slice.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::blocking::BlockingIndex;
use crate::language::detect;
use crate::morphology::{normalize, NormalizationOptions};
use crate::patterns::{PatternFilterConfig, PatternIndex};
use crate::types::{Language, WatchlistDoc};
use crate::vector_index::{ReloadMode as VectorReloadMode, VectorIndex};

pub enum ReloadMode {
    AtomicReplace,
    Overlay,
}

pub struct WatchlistSnapshot {
    pub docs:           Vec<WatchlistDoc>,
    pub version:        u64,
    pub pattern_index:  PatternIndex,
    pub blocking_index: BlockingIndex,
    pub vector_index:   VectorIndex,
}

fn build_snapshot(docs: Vec<WatchlistDoc>, version: u64, cfg: &PatternFilterConfig) -> WatchlistSnapshot {
    let pattern_index = PatternIndex::build(&docs, cfg);

    let blocking_entries = docs.iter().map(|doc| {
        let detection = detect(&doc.text, None);
        let language = if detection.language == Language::Unknown { Language::Ru } else { detection.language };
        let outcome = normalize(&doc.text, language, &NormalizationOptions::default());
        (doc.doc_id.clone(), doc.text.clone(), outcome.tokens, doc.metadata.clone())
    }).collect();
    let blocking_index = BlockingIndex::build(blocking_entries);

    let vector_entries: Vec<(String, String)> = docs.iter().map(|d| (d.doc_id.clone(), d.text.clone())).collect();
    let vector_index = VectorIndex::build(&vector_entries);

    WatchlistSnapshot { docs, version, pattern_index, blocking_index, vector_index }
}

/// Public status surfaced by `get_watchlist_status` (§6).
#[derive(Debug, Clone)]
pub struct WatchlistStatus {
    pub doc_count:      usize,
    pub version:        u64,
    pub pattern_count:  usize,
}

pub struct Watchlist {
    snapshot: RwLock<Arc<WatchlistSnapshot>>,
    cfg:      PatternFilterConfig,
}

impl Watchlist {
    pub fn new(docs: Vec<WatchlistDoc>) -> Self {
        let cfg = PatternFilterConfig::default();
        let snapshot = build_snapshot(docs, 1, &cfg);
        Self { snapshot: RwLock::new(Arc::new(snapshot)), cfg }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Readers take a cheap `Arc` clone; in-flight holders keep seeing the
    /// version they started with even if a reload lands mid-request.
    pub fn current(&self) -> Arc<WatchlistSnapshot> {
        self.snapshot.read().clone()
    }

    pub fn reload(&self, new_docs: Vec<WatchlistDoc>, mode: ReloadMode) -> WatchlistStatus {
        let current = self.current();
        let merged = match mode {
            ReloadMode::AtomicReplace => new_docs,
            ReloadMode::Overlay => {
                let mut merged = current.docs.clone();
                let existing_ids: std::collections::HashSet<&str> =
                    merged.iter().map(|d| d.doc_id.as_str()).collect();
                for doc in new_docs {
                    if !existing_ids.contains(doc.doc_id.as_str()) {
                        merged.push(doc);
                    }
                }
                merged
            }
        };

        let next_version = current.version + 1;
        let snapshot = build_snapshot(merged, next_version, &self.cfg);
        let status = WatchlistStatus {
            doc_count: snapshot.docs.len(),
            version: snapshot.version,
            pattern_count: snapshot.pattern_index.len(),
        };
        *self.snapshot.write() = Arc::new(snapshot);
        status
    }

    pub fn status(&self) -> WatchlistStatus {
        let snapshot = self.current();
        WatchlistStatus {
            doc_count: snapshot.docs.len(),
            version: snapshot.version,
            pattern_count: snapshot.pattern_index.len(),
        }
    }
}

/// Bridge to the vector index's own reload modes, used when a caller wants
/// to refresh only the kNN index without touching patterns/blocking (rare;
/// `Watchlist::reload` above is the normal path).
pub fn vector_reload_mode(mode: &ReloadMode) -> VectorReloadMode {
    match mode {
        ReloadMode::AtomicReplace => VectorReloadMode::AtomicReplace,
        ReloadMode::Overlay => VectorReloadMode::Overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityType, WatchlistMetadata};

    fn doc(id: &str, text: &str) -> WatchlistDoc {
        WatchlistDoc { doc_id: id.to_string(), text: text.to_string(), entity_type: EntityType::Person, metadata: WatchlistMetadata::default() }
    }

    #[test]
    fn new_watchlist_starts_at_version_one() {
        let wl = Watchlist::new(vec![doc("e1", "Petro Poroshenko")]);
        assert_eq!(wl.status().version, 1);
        assert_eq!(wl.status().doc_count, 1);
    }

    #[test]
    fn atomic_replace_increments_version_and_drops_old_docs() {
        let wl = Watchlist::new(vec![doc("e1", "Petro Poroshenko")]);
        let status = wl.reload(vec![doc("e2", "Volodymyr Zelensky")], ReloadMode::AtomicReplace);
        assert_eq!(status.version, 2);
        assert_eq!(status.doc_count, 1);
        assert_eq!(wl.current().docs[0].doc_id, "e2");
    }

    #[test]
    fn overlay_merges_without_duplicating_existing_ids() {
        let wl = Watchlist::new(vec![doc("e1", "Petro Poroshenko")]);
        let status = wl.reload(vec![doc("e1", "duplicate ignored"), doc("e2", "Volodymyr Zelensky")], ReloadMode::Overlay);
        assert_eq!(status.doc_count, 2);
    }

    #[test]
    fn in_flight_snapshot_handle_survives_a_concurrent_reload() {
        let wl = Watchlist::new(vec![doc("e1", "Petro Poroshenko")]);
        let held = wl.current();
        wl.reload(vec![doc("e2", "Volodymyr Zelensky")], ReloadMode::AtomicReplace);
        assert_eq!(held.docs.len(), 1);
        assert_eq!(held.docs[0].doc_id, "e1");
    }
}
