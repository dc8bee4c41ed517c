use crate::error::FormatError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type DocId = u32;

/// Structural regions a token was seen in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Fields(u8);

impl Fields {
    pub const TITLE: Fields = Fields(0b001);
    pub const HEADING: Fields = Fields(0b010);
    pub const EMPHASIS: Fields = Fields(0b100);

    const NAMES: [(Fields, &'static str); 3] = [
        (Fields::TITLE, "title"),
        (Fields::HEADING, "h1"),
        (Fields::EMPHASIS, "bold"),
    ];

    pub fn empty() -> Self { Fields(0) }

    pub fn is_empty(self) -> bool { self.0 == 0 }

    pub fn contains(self, other: Fields) -> bool { self.0 & other.0 == other.0 && !other.is_empty() }

    pub fn insert(&mut self, other: Fields) { self.0 |= other.0; }
}

impl std::ops::BitOr for Fields {
    type Output = Fields;
    fn bitor(self, rhs: Fields) -> Fields { Fields(self.0 | rhs.0) }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&names.join(" "))
    }
}

impl From<Fields> for String {
    fn from(fields: Fields) -> String { fields.to_string() }
}

impl TryFrom<String> for Fields {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let mut fields = Fields::empty();
        for name in value.split_whitespace() {
            let (flag, _) = Self::NAMES
                .iter()
                .find(|(_, n)| *n == name)
                .ok_or_else(|| FormatError::UnknownField(name.to_string()))?;
            fields.insert(*flag);
        }
        Ok(fields)
    }
}

/// One document's entry in a token's posting list.
///
/// `weight` holds the raw term frequency until the merge finalizes it into a
/// tf-idf score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    #[serde(rename = "docID")]
    pub doc_id: DocId,
    #[serde(rename = "tfidf")]
    pub weight: f32,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default)]
    pub positions: Vec<u32>,
}

impl Posting {
    pub fn new(doc_id: DocId, raw_frequency: u32, fields: Fields, positions: Vec<u32>) -> Self {
        Self { doc_id, weight: raw_frequency as f32, fields, positions }
    }

    /// Replace the raw frequency with its tf-idf weight.
    pub fn finalize(&mut self, document_frequency: usize, total_documents: u32) {
        self.weight = tf_idf(self.weight, document_frequency, total_documents);
    }
}

pub fn idf(document_frequency: usize, total_documents: u32) -> f32 {
    if document_frequency == 0 || total_documents == 0 {
        return 0.0;
    }
    (total_documents as f32 / document_frequency as f32).log10()
}

pub fn tf_idf(raw_frequency: f32, document_frequency: usize, total_documents: u32) -> f32 {
    let tf = if raw_frequency > 0.0 { 1.0 + raw_frequency.log10() } else { 0.0 };
    tf * idf(document_frequency, total_documents)
}

/// `<token> <json postings>\n`
pub fn encode_line(token: &str, postings: &[Posting]) -> serde_json::Result<String> {
    let json = serde_json::to_string(postings)?;
    Ok(format!("{token} {json}\n"))
}

pub fn line_token(line: &str) -> &str {
    line.split_once(' ').map_or(line.trim_end(), |(token, _)| token)
}

pub fn decode_line(line: &str) -> Result<(String, Vec<Posting>), FormatError> {
    let line = line.trim_end_matches(['\n', '\r']);
    let (token, json) = line.split_once(' ').ok_or(FormatError::MissingPostings)?;
    let postings: Vec<Posting> = serde_json::from_str(json)
        .map_err(|source| FormatError::Json { token: token.to_string(), source })?;
    for (i, p) in postings.iter().enumerate() {
        if !p.weight.is_finite() {
            return Err(FormatError::NonFiniteWeight { token: token.to_string(), doc_id: p.doc_id });
        }
        if i > 0 && postings[i - 1].doc_id >= p.doc_id {
            return Err(FormatError::Unsorted { token: token.to_string(), doc_id: p.doc_id });
        }
    }
    Ok((token.to_string(), postings))
}
