use lazy_static::lazy_static;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;
use std::collections::{BTreeSet, HashMap, HashSet};

lazy_static! {
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// Per-document token statistics: raw counts and 1-based positions.
#[derive(Debug, Default, Clone)]
pub struct TokenStats {
    pub frequencies: HashMap<String, u32>,
    pub positions: HashMap<String, Vec<u32>>,
}

impl TokenStats {
    pub fn is_empty(&self) -> bool { self.frequencies.is_empty() }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize { self.frequencies.len() }

    fn push(&mut self, token: String, position: u32) {
        *self.frequencies.entry(token.clone()).or_insert(0) += 1;
        self.positions.entry(token).or_default().push(position);
    }
}

pub fn is_stopword(word: &str) -> bool { STOPWORDS.contains(word) }

pub fn stem(word: &str) -> String {
    STEMMER.stem(&word.to_lowercase()).into_owned()
}

/// Tokenize text into frequencies and positions.
///
/// A maximal run of alphanumeric characters is a candidate; anything else is a
/// delimiter. Candidates of a single character are dropped without advancing the
/// position counter. Survivors are lower-cased and stemmed.
pub fn tokenize(text: &str) -> TokenStats {
    let mut stats = TokenStats::default();
    let mut position = 0u32;
    for candidate in candidates(text) {
        position += 1;
        stats.push(stem(&candidate), position);
    }
    stats
}

/// Distinct stemmed tokens of `text`.
pub fn terms(text: &str) -> BTreeSet<String> {
    candidates(text).iter().map(|c| stem(c)).collect()
}

fn candidates(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>();
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = 0usize;
    for ch in normalized.chars().chain(std::iter::once(' ')) {
        if ch.is_alphanumeric() {
            current.push(ch);
            chars += 1;
            continue;
        }
        if chars > 1 {
            out.push(std::mem::take(&mut current));
        } else {
            current.clear();
        }
        chars = 0;
    }
    out
}

/// Strip stop words from a query unless fewer than two words would remain.
pub fn remove_stop_words(query: &str) -> String {
    let words: Vec<&str> = query.split_whitespace().collect();
    let kept: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| !is_stopword(&bare_word(w)))
        .collect();
    if kept.len() < 2 {
        return query.to_string();
    }
    kept.join(" ")
}

/// Lower-cased word with surrounding punctuation removed; inner apostrophes stay.
fn bare_word(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase()
}

/// Distinct query tokens in the order they first appear.
pub fn query_terms(query: &str) -> Vec<String> {
    let cleaned = remove_stop_words(query);
    let mut seen = HashSet::new();
    candidates(&cleaned)
        .iter()
        .map(|c| stem(c))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
