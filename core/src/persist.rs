use crate::summary::DocSummary;
use crate::DocId;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: usize,
    pub partitions: usize,
    pub created_at: String,
    pub version: u32,
}

/// docID → URL
pub type DocRecords = BTreeMap<DocId, String>;

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn merged_index(&self) -> PathBuf { self.root.join("index.txt") }
    pub fn term_directory(&self) -> PathBuf { self.root.join("term_directory.json") }
    pub fn doc_records(&self) -> PathBuf { self.root.join("doc_ids.json") }
    pub fn summaries(&self) -> PathBuf { self.root.join("summaries.json") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn partitions_dir(&self) -> PathBuf { self.root.join("partitions") }
    pub fn partition(&self, n: usize) -> PathBuf { self.partitions_dir().join(format!("index_p{n}.txt")) }
}

pub(crate) fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer(&mut w, value)?;
    w.flush()?;
    Ok(())
}

pub(crate) fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let value = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(value)
}

pub fn save_doc_records(paths: &IndexPaths, docs: &DocRecords) -> Result<()> {
    save_json(&paths.doc_records(), docs)
}

pub fn load_doc_records(paths: &IndexPaths) -> Result<DocRecords> {
    load_json(&paths.doc_records())
}

pub fn save_summaries(paths: &IndexPaths, summaries: &BTreeMap<DocId, DocSummary>) -> Result<()> {
    let encoded: BTreeMap<DocId, String> = summaries.iter().map(|(id, s)| (*id, s.encode())).collect();
    save_json(&paths.summaries(), &encoded)
}

pub fn load_summaries(paths: &IndexPaths) -> Result<BTreeMap<DocId, DocSummary>> {
    let raw: BTreeMap<DocId, String> = load_json(&paths.summaries())?;
    Ok(raw.into_iter().map(|(id, s)| (id, DocSummary::decode(&s))).collect())
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    std::fs::write(paths.meta(), json)?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    load_json(&paths.meta())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_records_use_string_keys() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let docs: DocRecords = [(0, "https://a.example/".to_string()), (1, "https://b.example/".to_string())].into();
        save_doc_records(&paths, &docs).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(paths.doc_records()).unwrap()).unwrap();
        assert_eq!(raw["1"], "https://b.example/");
        assert_eq!(load_doc_records(&paths).unwrap(), docs);
    }

    #[test]
    fn summaries_round_trip_through_single_string() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let summaries: BTreeMap<DocId, DocSummary> = [(3, DocSummary::new("Home", "Welcome page"))].into();
        save_summaries(&paths, &summaries).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(paths.summaries()).unwrap()).unwrap();
        assert_eq!(raw["3"], "Home : Welcome page");
        assert_eq!(load_summaries(&paths).unwrap(), summaries);
    }
}
