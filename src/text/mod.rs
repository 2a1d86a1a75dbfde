// Text canonicalization and fuzzy comparison for OCR output

pub mod normalize;
pub mod similarity;

pub use normalize::{is_short_target, normalize, shadowed_word_fixes};
pub use similarity::{partial_ratio, ratio, text_similarity, token_set_ratio};
