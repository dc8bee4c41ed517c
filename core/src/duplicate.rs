use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

/// 128-bit SimHash over a token multiset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u128);

impl Fingerprint {
    pub const BITS: u32 = 128;

    /// Each token votes on every bit with its frequency as weight; a bit is set
    /// when the weighted votes are positive.
    pub fn of(frequencies: &HashMap<String, u32>) -> Self {
        let mut counts = [0i64; Self::BITS as usize];
        for (token, &freq) in frequencies {
            let hash = token_hash(token);
            for (i, count) in counts.iter_mut().enumerate() {
                if hash & (1u128 << i) != 0 {
                    *count += freq as i64;
                } else {
                    *count -= freq as i64;
                }
            }
        }
        let mut bits = 0u128;
        for (i, count) in counts.iter().enumerate() {
            if *count > 0 {
                bits |= 1u128 << i;
            }
        }
        Fingerprint(bits)
    }

    pub fn distance(self, other: Fingerprint) -> u32 { (self.0 ^ other.0).count_ones() }
}

fn token_hash(token: &str) -> u128 {
    let mut low = DefaultHasher::new();
    token.hash(&mut low);
    let mut high = DefaultHasher::new();
    (token, 0x9e37_79b9u32).hash(&mut high);
    ((high.finish() as u128) << 64) | low.finish() as u128
}

/// Distinct tokens a page needs before it takes part in near-duplicate
/// matching. Below this the vote counts are too coarse: half-overlapping pages
/// of a handful of tokens can land under the threshold. Smaller pages are only
/// matched exactly.
pub const NEAR_MATCH_MIN_TOKENS: usize = 16;

/// Remembers the fingerprint of every accepted document.
pub struct DuplicateDetector {
    threshold: u32,
    exact: HashSet<Fingerprint>,
    seen: Vec<Fingerprint>,
}

impl DuplicateDetector {
    pub fn new(threshold: u32) -> Self {
        Self { threshold, exact: HashSet::new(), seen: Vec::new() }
    }

    /// True when the document matches, or is within the Hamming threshold of,
    /// any previously accepted document. Only non-duplicates are remembered.
    ///
    /// Pages with fewer than [`NEAR_MATCH_MIN_TOKENS`] distinct tokens are
    /// compared by exact fingerprint only, and only large pages are kept for
    /// near matching.
    pub fn is_duplicate(&mut self, frequencies: &HashMap<String, u32>) -> bool {
        let fingerprint = Fingerprint::of(frequencies);
        if self.exact.contains(&fingerprint) {
            return true;
        }
        let near_eligible = frequencies.len() >= NEAR_MATCH_MIN_TOKENS;
        if near_eligible && self.seen.iter().any(|f| f.distance(fingerprint) < self.threshold) {
            return true;
        }
        self.exact.insert(fingerprint);
        if near_eligible {
            self.seen.push(fingerprint);
        }
        false
    }

    /// Number of accepted documents.
    pub fn len(&self) -> usize { self.exact.len() }

    pub fn is_empty(&self) -> bool { self.exact.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag(words: impl IntoIterator<Item = String>) -> HashMap<String, u32> {
        words.into_iter().map(|w| (w, 1)).collect()
    }

    fn corpus(shared: usize, distinct: usize, tag: &str) -> HashMap<String, u32> {
        bag((0..shared)
            .map(|i| format!("word{i}"))
            .chain((0..distinct).map(|i| format!("{tag}{i}"))))
    }

    fn corpus_tagged(pair: usize, shared: usize, distinct: usize, tag: &str) -> HashMap<String, u32> {
        bag((0..shared)
            .map(|i| format!("p{pair}shared{i}"))
            .chain((0..distinct).map(|i| format!("p{pair}{tag}{i}"))))
    }

    #[test]
    fn identical_documents_are_duplicates() {
        let mut d = DuplicateDetector::new(24);
        let doc = corpus(40, 0, "x");
        assert!(!d.is_duplicate(&doc));
        assert!(d.is_duplicate(&doc));
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn near_identical_documents_fall_inside_threshold() {
        let a = corpus(200, 0, "a");
        let b = corpus(190, 10, "b");
        let distance = Fingerprint::of(&a).distance(Fingerprint::of(&b));
        assert!(distance < 24, "distance {distance}");
        let mut d = DuplicateDetector::new(24);
        assert!(!d.is_duplicate(&a));
        assert!(d.is_duplicate(&b));
    }

    #[test]
    fn small_half_overlapping_pages_are_never_near_duplicates() {
        let mut d = DuplicateDetector::new(24);
        let mut accepted = 0;
        for pair in 0..400usize {
            let size = 4 + pair % 8;
            let half = size / 2;
            let a = corpus_tagged(pair, half, size - half, "a");
            let b = corpus_tagged(pair, half, size - half, "b");
            assert!(!d.is_duplicate(&a), "pair {pair} first page");
            assert!(!d.is_duplicate(&b), "pair {pair} second page");
            accepted += 2;
        }
        assert_eq!(d.len(), accepted);
    }

    #[test]
    fn small_identical_pages_still_match_exactly() {
        let mut d = DuplicateDetector::new(24);
        let page = corpus(5, 0, "x");
        assert!(!d.is_duplicate(&page));
        assert!(d.is_duplicate(&page));
    }

    #[test]
    fn half_overlapping_documents_are_distinct() {
        let a = corpus(200, 0, "a");
        let b = corpus(100, 100, "b");
        let distance = Fingerprint::of(&a).distance(Fingerprint::of(&b));
        assert!(distance >= 24, "distance {distance}");
        let mut d = DuplicateDetector::new(24);
        assert!(!d.is_duplicate(&a));
        assert!(!d.is_duplicate(&b));
        assert_eq!(d.len(), 2);
    }
}
