/// Knobs for the partitioned build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Number of partial indexes the corpus is split into.
    pub partitions: usize,
    /// Hamming distance under which two fingerprints are near-duplicates.
    pub duplicate_threshold: u32,
    /// Leave `partitions/index_p*.txt` on disk after the merge.
    pub keep_partitions: bool,
    /// Words kept by the truncation summary.
    pub summary_words: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { partitions: 3, duplicate_threshold: 24, keep_partitions: false, summary_words: 20 }
    }
}

/// Knobs for query serving.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Query count at which a token's postings are kept in memory.
    pub promote_after: u32,
    /// Upper bound on cached tokens.
    pub cache_capacity: usize,
    /// Documents that receive a proximity score.
    pub proximity_candidates: usize,
    /// Boolean mode relaxes the AND until at least this many documents match.
    pub min_boolean_results: usize,
    pub result_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            promote_after: 5,
            cache_capacity: 4096,
            proximity_candidates: 100,
            min_boolean_results: 5,
            result_limit: 5,
        }
    }
}
