//! Partitioned inverted index construction and query processing for a
//! corpus of crawled pages.

pub mod builder;
pub mod cache;
pub mod config;
pub mod directory;
pub mod duplicate;
pub mod engine;
pub mod error;
pub mod html;
pub mod merge;
pub mod persist;
pub mod posting;
pub mod ranking;
pub mod summary;
pub mod tokenizer;

pub use config::{BuildConfig, EngineConfig};
pub use engine::{QueryMode, SearchEngine, SearchHit, SearchResults};
pub use posting::{DocId, Fields, Posting};
