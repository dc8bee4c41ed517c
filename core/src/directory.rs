use crate::persist::{load_json, save_json};
use crate::posting::line_token;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// token → byte offset of the token's line in the merged index.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermDirectory {
    offsets: BTreeMap<String, u64>,
}

impl TermDirectory {
    /// One pass over the merged index. Offsets count bytes, not characters.
    pub fn build(merged_index: &Path) -> Result<Self> {
        let f = File::open(merged_index)
            .with_context(|| format!("opening {}", merged_index.display()))?;
        let mut reader = BufReader::new(f);
        let mut offsets = BTreeMap::new();
        let mut offset = 0u64;
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = reader.read_until(b'\n', &mut line)?;
            if read == 0 {
                break;
            }
            let text = std::str::from_utf8(&line)
                .with_context(|| format!("line at byte {offset} is not UTF-8"))?;
            let token = line_token(text);
            if !token.is_empty() {
                offsets.insert(token.to_string(), offset);
            }
            offset += read as u64;
        }
        tracing::info!(terms = offsets.len(), bytes = offset, "term directory built");
        Ok(Self { offsets })
    }

    pub fn save(&self, path: &Path) -> Result<()> { save_json(path, self) }

    pub fn load(path: &Path) -> Result<Self> { load_json(path) }

    pub fn offset(&self, token: &str) -> Option<u64> { self.offsets.get(token).copied() }

    pub fn len(&self) -> usize { self.offsets.len() }

    pub fn is_empty(&self) -> bool { self.offsets.is_empty() }
}

impl FromIterator<(String, u64)> for TermDirectory {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self { offsets: iter.into_iter().collect() }
    }
}
