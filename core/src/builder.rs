use crate::config::BuildConfig;
use crate::directory::TermDirectory;
use crate::duplicate::DuplicateDetector;
use crate::html;
use crate::merge::merge_partitions;
use crate::persist::{save_doc_records, save_meta, save_summaries, DocRecords, IndexPaths, MetaFile, FORMAT_VERSION};
use crate::posting::{encode_line, Posting};
use crate::summary::{summarize_or_truncate, DocSummary, Summarizer, Truncate};
use crate::tokenizer::tokenize;
use crate::DocId;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
struct RawPage {
    url: String,
    content: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub indexed: u32,
    pub duplicates: usize,
    pub skipped: usize,
    pub partitions: usize,
    pub terms: usize,
}

/// What happened to one input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    Indexed(DocId),
    Duplicate,
    Skipped,
}

/// Split the `.json` files under `root` into at most `partitions` groups.
///
/// Files are visited in sorted path order. Whole directories are kept
/// together and the directory count is divided evenly; a corpus living in a
/// single directory is divided by file instead.
pub fn discover(root: &Path, partitions: usize) -> Vec<Vec<PathBuf>> {
    let mut units: Vec<(PathBuf, Vec<PathBuf>)> = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
        let p = entry.path();
        if !p.is_file() || p.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        let parent = p.parent().map(Path::to_path_buf).unwrap_or_default();
        match units.last_mut() {
            Some((dir, files)) if *dir == parent => files.push(p.to_path_buf()),
            _ => units.push((parent, vec![p.to_path_buf()])),
        }
    }
    let units: Vec<Vec<PathBuf>> = if units.len() == 1 {
        units.remove(0).1.into_iter().map(|f| vec![f]).collect()
    } else {
        units.into_iter().map(|(_, files)| files).collect()
    };
    if units.is_empty() {
        return Vec::new();
    }
    let quota = units.len().div_ceil(partitions.max(1));
    units.chunks(quota).map(|chunk| chunk.concat()).collect()
}

/// Accumulates one partition in memory at a time.
pub struct IndexBuilder<'a> {
    paths: &'a IndexPaths,
    summarizer: &'a dyn Summarizer,
    fallback: Truncate,
    detector: DuplicateDetector,
    partial: BTreeMap<String, Vec<Posting>>,
    partition_files: Vec<PathBuf>,
    documents: DocRecords,
    summaries: BTreeMap<DocId, DocSummary>,
    next_doc_id: DocId,
    report: BuildReport,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(paths: &'a IndexPaths, config: &BuildConfig, summarizer: &'a dyn Summarizer) -> Self {
        Self {
            paths,
            summarizer,
            fallback: Truncate { words: config.summary_words },
            detector: DuplicateDetector::new(config.duplicate_threshold),
            partial: BTreeMap::new(),
            partition_files: Vec::new(),
            documents: DocRecords::new(),
            summaries: BTreeMap::new(),
            next_doc_id: 0,
            report: BuildReport::default(),
        }
    }

    /// Index one page file. Files that cannot be read or parsed are logged and
    /// skipped.
    pub fn add_file(&mut self, path: &Path) -> Ingest {
        let page = fs::read(path)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| serde_json::from_slice::<RawPage>(&bytes).map_err(anyhow::Error::from));
        match page {
            Ok(page) => self.add_page(&page.url, &page.content),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping unreadable page");
                self.report.skipped += 1;
                Ingest::Skipped
            }
        }
    }

    pub fn add_page(&mut self, url: &str, markup: &str) -> Ingest {
        let page = html::extract(markup);
        let stats = tokenize(&page.text);
        if self.detector.is_duplicate(&stats.frequencies) {
            tracing::debug!(url, "near-duplicate dropped");
            self.report.duplicates += 1;
            return Ingest::Duplicate;
        }

        let doc_id = self.next_doc_id;
        self.next_doc_id += 1;
        let mut positions = stats.positions;
        for (token, freq) in stats.frequencies {
            let fields = page.fields_of(&token);
            let at = positions.remove(&token).unwrap_or_default();
            self.partial.entry(token).or_default().push(Posting::new(doc_id, freq, fields, at));
        }

        let summary = summarize_or_truncate(self.summarizer, &self.fallback, &page.title, &page.text);
        self.summaries.insert(doc_id, DocSummary::new(&page.title, &summary));
        self.documents.insert(doc_id, url.to_string());
        self.report.indexed += 1;
        Ingest::Indexed(doc_id)
    }

    /// Write the in-memory partial index, sorted by token, and clear it.
    pub fn flush_partition(&mut self) -> Result<PathBuf> {
        let path = self.paths.partition(self.partition_files.len() + 1);
        fs::create_dir_all(self.paths.partitions_dir())?;
        let f = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        let mut w = BufWriter::new(f);
        let terms = self.partial.len();
        for (token, postings) in std::mem::take(&mut self.partial) {
            w.write_all(encode_line(&token, &postings)?.as_bytes())?;
        }
        w.flush()?;
        tracing::info!(partition = %path.display(), terms, docs = self.next_doc_id, "partition flushed");
        self.partition_files.push(path.clone());
        Ok(path)
    }

    /// Merge the flushed partitions and write every artifact.
    pub fn finish(mut self, keep_partitions: bool) -> Result<BuildReport> {
        if !self.partial.is_empty() {
            self.flush_partition()?;
        }
        let merged = self.paths.merged_index();
        let total = self.next_doc_id;
        let stats = merge_partitions(&self.partition_files, &merged, total)?;

        let directory = TermDirectory::build(&merged)?;
        directory.save(&self.paths.term_directory())?;
        save_doc_records(self.paths, &self.documents)?;
        save_summaries(self.paths, &self.summaries)?;

        self.report.partitions = self.partition_files.len();
        self.report.terms = stats.terms;
        let meta = MetaFile {
            num_docs: total,
            num_terms: stats.terms,
            partitions: self.report.partitions,
            created_at: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default(),
            version: FORMAT_VERSION,
        };
        save_meta(self.paths, &meta)?;

        if !keep_partitions {
            for p in &self.partition_files {
                fs::remove_file(p).with_context(|| format!("removing {}", p.display()))?;
            }
            fs::remove_dir(self.paths.partitions_dir()).ok();
        }
        Ok(self.report)
    }
}

/// Build every artifact for the pages under `input`.
pub fn build_index(input: &Path, paths: &IndexPaths, config: &BuildConfig, summarizer: &dyn Summarizer) -> Result<BuildReport> {
    fs::create_dir_all(&paths.root)?;
    let groups = discover(input, config.partitions);
    tracing::info!(input = %input.display(), partitions = groups.len(), "building index");

    let mut builder = IndexBuilder::new(paths, config, summarizer);
    for group in &groups {
        for file in group {
            builder.add_file(file);
        }
        builder.flush_partition()?;
    }
    let report = builder.finish(config.keep_partitions)?;
    tracing::info!(indexed = report.indexed, duplicates = report.duplicates, skipped = report.skipped, terms = report.terms, "index build complete");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "{}").unwrap();
    }

    #[test]
    fn discover_groups_by_directory() {
        let dir = tempfile::tempdir().unwrap();
        for d in ["a", "b", "c", "d"] {
            touch(&dir.path().join(d).join("1.json"));
            touch(&dir.path().join(d).join("2.json"));
        }
        touch(&dir.path().join("a").join("notes.txt"));
        let groups = discover(dir.path(), 3);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 4);
        assert!(groups[0][0].ends_with("a/1.json"));
        assert!(groups[1][3].ends_with("d/2.json"));
    }

    #[test]
    fn discover_splits_flat_directory_by_file() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..7 {
            touch(&dir.path().join(format!("{i}.json")));
        }
        let groups = discover(dir.path(), 3);
        assert_eq!(groups.iter().map(Vec::len).collect::<Vec<_>>(), vec![3, 3, 1]);
    }

    #[test]
    fn duplicates_and_bad_files_do_not_consume_ids() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path().join("out"));
        let bad = dir.path().join("bad.json");
        fs::write(&bad, "not json").unwrap();
        let missing_content = dir.path().join("partial.json");
        fs::write(&missing_content, r#"{"url": "https://x.example/"}"#).unwrap();

        let summarizer = Truncate::default();
        let mut b = IndexBuilder::new(&paths, &BuildConfig::default(), &summarizer);
        assert_eq!(b.add_page("https://a.example/", "<p>search engines rank documents</p>"), Ingest::Indexed(0));
        assert_eq!(b.add_page("https://a.example/copy", "<p>search engines rank documents</p>"), Ingest::Duplicate);
        assert_eq!(b.add_file(&bad), Ingest::Skipped);
        assert_eq!(b.add_file(&missing_content), Ingest::Skipped);
        assert_eq!(b.add_page("https://b.example/", "<p>crawlers fetch pages over http politely</p>"), Ingest::Indexed(1));

        let report = b.finish(false).unwrap();
        assert_eq!(report.indexed, 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.skipped, 2);
        assert!(!paths.partitions_dir().exists());
    }
}
