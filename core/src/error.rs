use crate::DocId;
use thiserror::Error;

/// Errors raised while decoding an index line.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("index line has no posting list")]
    MissingPostings,

    #[error("malformed posting list for `{token}`: {source}")]
    Json {
        token: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("postings for `{token}` are not ascending by docID at {doc_id}")]
    Unsorted { token: String, doc_id: DocId },

    #[error("non-finite weight for `{token}` in document {doc_id}")]
    NonFiniteWeight { token: String, doc_id: DocId },

    #[error("unknown field flag `{0}`")]
    UnknownField(String),
}
