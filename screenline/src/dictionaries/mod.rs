// Static dictionary bundle: given names, surname/patronymic morphology,
// diminutives, stop words, legal forms, transliteration and phonetic tables.
//
// Dictionary *content* is explicitly out of scope per spec §1 ("dictionary
// content — words are data, not code"); these are representative, non-
// exhaustive seed tables keyed the same way the original Python dict
// modules are (`european_names.py`, `arabic_names.py` in original_source),
// re-expressed as the teacher's `&'static [(&str, &str)]` const-slice idiom
// (cf. `workers/cot.rs`'s `COT_PATTERNS`). All tables are plain slices —
// immutable, loaded once, no `LazyLock` needed since they are already const.

pub mod legal;
pub mod names;
pub mod phonetic;
pub mod stopwords;
pub mod translit;

pub use legal::*;
pub use names::*;
pub use phonetic::*;
pub use stopwords::*;
pub use translit::*;
