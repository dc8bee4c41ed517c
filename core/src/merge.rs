use crate::posting::{decode_line, encode_line, Posting};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    pub terms: usize,
    pub postings: usize,
}

/// Holds exactly one decoded line of a partial index.
struct PartitionReader {
    path: PathBuf,
    reader: BufReader<File>,
    current: Option<(String, Vec<Posting>)>,
    buf: String,
}

impl PartitionReader {
    fn open(path: &Path) -> Result<Self> {
        let f = File::open(path).with_context(|| format!("opening partition {}", path.display()))?;
        let mut reader = Self { path: path.to_path_buf(), reader: BufReader::new(f), current: None, buf: String::new() };
        reader.advance()?;
        Ok(reader)
    }

    fn advance(&mut self) -> Result<()> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                self.current = None;
                return Ok(());
            }
            if self.buf.trim().is_empty() {
                continue;
            }
            let line = decode_line(&self.buf)
                .with_context(|| format!("reading partition {}", self.path.display()))?;
            self.current = Some(line);
            return Ok(());
        }
    }

    fn token(&self) -> Option<&str> {
        self.current.as_ref().map(|(t, _)| t.as_str())
    }

    fn take(&mut self) -> Result<Vec<Posting>> {
        let postings = self.current.take().map(|(_, p)| p).unwrap_or_default();
        self.advance()?;
        Ok(postings)
    }
}

/// Merge sorted partial indexes into one sorted index with final tf-idf weights.
///
/// Inputs must be given in docID order: a token's merged list is the
/// concatenation of its per-partition lists in input order.
pub fn merge_partitions(inputs: &[PathBuf], output: &Path, total_documents: u32) -> Result<MergeStats> {
    let mut readers = inputs.iter().map(|p| PartitionReader::open(p)).collect::<Result<Vec<_>>>()?;
    let f = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let mut out = BufWriter::new(f);
    let mut stats = MergeStats::default();

    while let Some(min) = readers.iter().filter_map(PartitionReader::token).min().map(str::to_string) {
        let mut merged: Vec<Posting> = Vec::new();
        for reader in readers.iter_mut() {
            if reader.token() == Some(min.as_str()) {
                merged.extend(reader.take()?);
            }
        }
        debug_assert!(merged.windows(2).all(|w| w[0].doc_id < w[1].doc_id), "partitions out of docID order for {min}");

        let df = merged.len();
        for posting in merged.iter_mut() {
            posting.finalize(df, total_documents);
        }
        out.write_all(encode_line(&min, &merged)?.as_bytes())?;
        stats.terms += 1;
        stats.postings += df;
    }
    out.flush()?;
    tracing::info!(partitions = inputs.len(), terms = stats.terms, postings = stats.postings, "partitions merged");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posting::{tf_idf, Fields};

    fn write_partition(path: &Path, lines: &[(&str, Vec<Posting>)]) {
        let mut s = String::new();
        for (token, postings) in lines {
            s.push_str(&encode_line(token, postings).unwrap());
        }
        std::fs::write(path, s).unwrap();
    }

    fn raw(doc_id: u32, freq: u32) -> Posting {
        Posting::new(doc_id, freq, Fields::empty(), vec![1])
    }

    #[test]
    fn merges_shared_tokens_and_finalizes_weights() {
        let dir = tempfile::tempdir().unwrap();
        let p1 = dir.path().join("p1.txt");
        let p2 = dir.path().join("p2.txt");
        let p3 = dir.path().join("p3.txt");
        write_partition(&p1, &[("apple", vec![raw(0, 2)]), ("pear", vec![raw(0, 1), raw(1, 1)])]);
        write_partition(&p2, &[("banana", vec![raw(2, 1)]), ("pear", vec![raw(2, 3)])]);
        write_partition(&p3, &[]);
        let out = dir.path().join("index.txt");

        let stats = merge_partitions(&[p1, p2, p3], &out, 4).unwrap();
        assert_eq!(stats, MergeStats { terms: 3, postings: 5 });

        let text = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<_> = text.lines().map(|l| decode_line(l).unwrap()).collect();
        let tokens: Vec<_> = lines.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(tokens, vec!["apple", "banana", "pear"]);

        let pear = &lines[2].1;
        assert_eq!(pear.iter().map(|p| p.doc_id).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!((pear[2].weight - tf_idf(3.0, 3, 4)).abs() < 1e-6);
        assert!((lines[0].1[0].weight - tf_idf(2.0, 1, 4)).abs() < 1e-6);
    }

    #[test]
    fn no_partitions_yield_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("index.txt");
        assert_eq!(merge_partitions(&[], &out, 0).unwrap(), MergeStats::default());
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "");
    }
}
