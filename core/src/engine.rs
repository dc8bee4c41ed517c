use crate::cache::{CacheStats, HotTermCache};
use crate::config::EngineConfig;
use crate::directory::TermDirectory;
use crate::persist::{load_doc_records, load_meta, load_summaries, DocRecords, IndexPaths};
use crate::posting::{decode_line, idf, line_token, Posting};
use crate::ranking::{order_by_weight, rank, relaxed_intersection, QueryTerm};
use crate::summary::DocSummary;
use crate::tokenizer::query_terms;
use crate::DocId;
use anyhow::{Context, Result};
use memmap2::Mmap;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    #[default]
    Ranked,
    Boolean,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f32,
    pub url: String,
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub total_hits: usize,
    pub took: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStats {
    pub cache: CacheStats,
    pub index_reads: u64,
}

/// Read-only query engine over a built index.
///
/// The merged index is memory-mapped, so concurrent queries read it without
/// sharing a file cursor. The mapping is released when the engine is dropped.
pub struct SearchEngine {
    config: EngineConfig,
    index: Option<Mmap>,
    directory: TermDirectory,
    documents: DocRecords,
    summaries: BTreeMap<DocId, DocSummary>,
    total_docs: u32,
    cache: HotTermCache,
    index_reads: AtomicU64,
}

fn map_index(path: &Path) -> Result<Option<Mmap>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    if file.metadata()?.len() == 0 {
        return Ok(None);
    }
    // SAFETY: the index is immutable once built; nothing writes to it while
    // the engine is alive.
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(Some(mmap))
}

fn or_empty<T: Default>(artifact: &str, loaded: Result<T>) -> T {
    loaded.unwrap_or_else(|err| {
        tracing::warn!(artifact, error = %err, "artifact unavailable, starting empty");
        T::default()
    })
}

impl SearchEngine {
    /// Open the artifacts under `paths`. A missing or unreadable artifact is
    /// replaced by an empty structure, which makes every query return nothing.
    pub fn open(paths: &IndexPaths, config: EngineConfig) -> Self {
        let index = or_empty("merged index", map_index(&paths.merged_index()));
        let directory = or_empty("term directory", TermDirectory::load(&paths.term_directory()));
        let documents = or_empty("document records", load_doc_records(paths));
        let summaries = load_summaries(paths).unwrap_or_else(|err| {
            tracing::debug!(error = %err, "no summaries, results will carry only urls");
            BTreeMap::new()
        });
        let total_docs = match load_meta(paths) {
            Ok(meta) => meta.num_docs,
            Err(_) => documents.len() as u32,
        };
        tracing::info!(terms = directory.len(), docs = total_docs, mapped = index.is_some(), "search engine ready");
        Self::from_parts(config, index, directory, documents, summaries, total_docs)
    }

    fn from_parts(
        config: EngineConfig,
        index: Option<Mmap>,
        directory: TermDirectory,
        documents: DocRecords,
        summaries: BTreeMap<DocId, DocSummary>,
        total_docs: u32,
    ) -> Self {
        let cache = HotTermCache::new(config.promote_after, config.cache_capacity);
        Self { config, index, directory, documents, summaries, total_docs, cache, index_reads: AtomicU64::new(0) }
    }

    pub fn total_docs(&self) -> u32 { self.total_docs }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn stats(&self) -> EngineStats {
        EngineStats { cache: self.cache.stats(), index_reads: self.index_reads.load(Ordering::Relaxed) }
    }

    /// Postings for `token`, stored at `offset` in the merged index.
    ///
    /// A line whose token does not match is treated as no postings.
    pub fn find_postings(&self, token: &str, offset: u64) -> Arc<Vec<Posting>> {
        if let Some(hit) = self.cache.get(token) {
            tracing::debug!(token, "hot-term cache hit");
            return hit;
        }
        let postings = Arc::new(self.read_postings(token, offset));
        if !postings.is_empty() {
            self.cache.offer(token, &postings);
        }
        postings
    }

    fn read_postings(&self, token: &str, offset: u64) -> Vec<Posting> {
        self.index_reads.fetch_add(1, Ordering::Relaxed);
        let Some(line) = self.line_at(offset) else {
            tracing::warn!(token, offset, "term directory points past the merged index");
            return Vec::new();
        };
        let found = line_token(line);
        if found != token {
            tracing::warn!(token, found, offset, "term directory does not match merged index");
            return Vec::new();
        }
        match decode_line(line) {
            Ok((_, postings)) => postings,
            Err(err) => {
                tracing::warn!(token, offset, error = %err, "unreadable posting list");
                Vec::new()
            }
        }
    }

    fn line_at(&self, offset: u64) -> Option<&str> {
        let data: &[u8] = self.index.as_deref()?;
        let start = usize::try_from(offset).ok()?;
        let rest = data.get(start..)?;
        if rest.is_empty() {
            return None;
        }
        let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
        std::str::from_utf8(&rest[..end]).ok()
    }

    /// Resolve the query tokens found in the term directory, counting each
    /// distinct token once towards cache promotion.
    fn resolve(&self, tokens: &[String]) -> Vec<QueryTerm> {
        let mut terms = Vec::with_capacity(tokens.len());
        for token in tokens {
            self.cache.record_query(token);
            let Some(offset) = self.directory.offset(token) else { continue };
            let postings = self.find_postings(token, offset);
            if postings.is_empty() {
                continue;
            }
            terms.push(QueryTerm {
                token: token.clone(),
                idf: idf(postings.len(), self.total_docs),
                postings,
            });
        }
        terms
    }

    /// Ranked docIDs, best first.
    pub fn process(&self, raw_query: &str) -> Vec<DocId> {
        self.process_scored(raw_query).into_iter().map(|(d, _)| d).collect()
    }

    fn process_scored(&self, raw_query: &str) -> Vec<(DocId, f32)> {
        if raw_query.trim().is_empty() {
            return Vec::new();
        }
        let tokens = query_terms(raw_query);
        let terms = self.resolve(&tokens);
        if terms.is_empty() {
            return Vec::new();
        }
        if tokens.len() == 1 {
            let docs: Vec<DocId> = terms[0].postings.iter().map(|p| p.doc_id).collect();
            return order_by_weight(&docs, &terms);
        }
        rank(&terms, self.config.proximity_candidates)
    }

    /// Boolean AND over the query tokens, relaxed until enough documents match.
    pub fn process_boolean(&self, raw_query: &str) -> Vec<DocId> {
        self.process_boolean_scored(raw_query).into_iter().map(|(d, _)| d).collect()
    }

    fn process_boolean_scored(&self, raw_query: &str) -> Vec<(DocId, f32)> {
        if raw_query.trim().is_empty() {
            return Vec::new();
        }
        let terms = self.resolve(&query_terms(raw_query));
        if terms.is_empty() {
            return Vec::new();
        }
        let (docs, kept) = relaxed_intersection(&terms, self.config.min_boolean_results);
        order_by_weight(&docs, &kept)
    }

    /// Run a query and attach URL, title and summary to the top `limit` hits.
    pub fn search(&self, raw_query: &str, mode: QueryMode, limit: usize) -> SearchResults {
        let start = Instant::now();
        let scored = match mode {
            QueryMode::Ranked => self.process_scored(raw_query),
            QueryMode::Boolean => self.process_boolean_scored(raw_query),
        };
        let total_hits = scored.len();
        let hits = scored
            .into_iter()
            .filter_map(|(doc_id, score)| {
                let url = self.documents.get(&doc_id)?.clone();
                let summary = self.summaries.get(&doc_id).cloned().unwrap_or_default();
                Some(SearchHit { doc_id, score, url, title: summary.title, summary: summary.summary })
            })
            .take(limit)
            .collect();
        SearchResults { hits, total_hits, took: start.elapsed() }
    }

    pub fn document(&self, doc_id: DocId) -> Option<(&str, Option<&DocSummary>)> {
        let url = self.documents.get(&doc_id)?;
        Some((url.as_str(), self.summaries.get(&doc_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posting::{encode_line, Fields};

    fn engine_over(lines: &[(&str, Vec<Posting>)], directory: TermDirectory) -> (tempfile::TempDir, SearchEngine) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.txt");
        let text: String = lines.iter().map(|(t, p)| encode_line(t, p).unwrap()).collect();
        std::fs::write(&path, text).unwrap();
        let index = map_index(&path).unwrap();
        let documents: DocRecords = (0..4).map(|d| (d, format!("https://{d}.example/"))).collect();
        let engine = SearchEngine::from_parts(EngineConfig::default(), index, directory, documents, BTreeMap::new(), 4);
        (dir, engine)
    }

    #[test]
    fn mismatched_offset_yields_no_postings() {
        let cat = vec![Posting::new(0, 1, Fields::empty(), vec![1])];
        let dog = vec![Posting::new(1, 1, Fields::empty(), vec![1])];
        let directory: TermDirectory = [("cat".to_string(), 0), ("dog".to_string(), 0)].into_iter().collect();
        let (_dir, engine) = engine_over(&[("cat", cat.clone()), ("dog", dog)], directory);
        assert_eq!(*engine.find_postings("cat", 0), cat);
        assert!(engine.find_postings("dog", 0).is_empty());
        assert!(engine.find_postings("dog", 10_000).is_empty());
    }

    #[test]
    fn blank_queries_touch_nothing() {
        let (_dir, engine) = engine_over(&[], TermDirectory::default());
        assert!(engine.process("   \t").is_empty());
        assert!(engine.process_boolean("").is_empty());
        assert_eq!(engine.stats().index_reads, 0);
    }

    #[test]
    fn single_token_query_orders_by_weight() {
        let mut low = Posting::new(0, 1, Fields::empty(), vec![1]);
        low.weight = 0.1;
        let mut high = Posting::new(2, 1, Fields::empty(), vec![1]);
        high.weight = 0.9;
        let directory: TermDirectory = [("cat".to_string(), 0)].into_iter().collect();
        let (_dir, engine) = engine_over(&[("cat", vec![low, high])], directory);
        assert_eq!(engine.process("cats"), vec![2, 0]);
    }

    #[test]
    fn missing_artifacts_give_empty_engine() {
        let dir = tempfile::tempdir().unwrap();
        let engine = SearchEngine::open(&IndexPaths::new(dir.path().join("nowhere")), EngineConfig::default());
        assert_eq!(engine.total_docs(), 0);
        assert!(engine.process("anything at all").is_empty());
        assert!(engine.search("cat", QueryMode::Ranked, 5).hits.is_empty());
    }
}
