use crate::posting::{Fields, Posting};
use crate::DocId;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

pub const TITLE_BOOST: f32 = 0.5;
pub const HEADING_BOOST: f32 = 0.3;
pub const EMPHASIS_BOOST: f32 = 0.2;

/// A resolved query token.
#[derive(Debug, Clone)]
pub struct QueryTerm {
    pub token: String,
    pub idf: f32,
    pub postings: Arc<Vec<Posting>>,
}

pub fn field_score(fields: Fields) -> f32 {
    let mut score = 0.0;
    if fields.contains(Fields::TITLE) { score += TITLE_BOOST; }
    if fields.contains(Fields::HEADING) { score += HEADING_BOOST; }
    if fields.contains(Fields::EMPHASIS) { score += EMPHASIS_BOOST; }
    score
}

/// Bonus for query tokens occurring close together.
///
/// The list with the fewest positions is the reference. Each occurrence of
/// another token within `query_terms + 1` positions of any reference position
/// adds `1 / (occurrences of that token * window)`.
pub fn proximity_score(position_lists: &[&[u32]], query_terms: usize) -> f32 {
    if position_lists.len() < 2 {
        return 0.0;
    }
    let window = query_terms as u32 + 1;
    let reference = position_lists
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.is_empty())
        .min_by_key(|(_, l)| l.len())
        .map(|(i, _)| i);
    let Some(reference) = reference else { return 0.0 };
    let anchors = position_lists[reference];

    let mut score = 0.0;
    for (i, list) in position_lists.iter().enumerate() {
        if i == reference || list.is_empty() {
            continue;
        }
        let unit = 1.0 / (list.len() as f32 * window as f32);
        for &p in list.iter() {
            if near(anchors, p, window) {
                score += unit;
            }
        }
    }
    score
}

fn near(sorted: &[u32], position: u32, window: u32) -> bool {
    let i = sorted.partition_point(|&r| r < position.saturating_sub(window));
    sorted.get(i).is_some_and(|&r| r <= position.saturating_add(window))
}

fn by_score_desc(a: &(DocId, f32), b: &(DocId, f32)) -> Ordering {
    b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0))
}

/// Score every document matching at least one term.
///
/// relevance = cosine(query idf vector, document tf-idf vector) + field boosts
/// + proximity, where only the best `proximity_candidates` documents by the
/// first two signals get a proximity score.
pub fn rank(terms: &[QueryTerm], proximity_candidates: usize) -> Vec<(DocId, f32)> {
    let query_norm = terms.iter().map(|t| t.idf * t.idf).sum::<f32>().sqrt();

    let mut matches: HashMap<DocId, Vec<(usize, &Posting)>> = HashMap::new();
    for (i, term) in terms.iter().enumerate() {
        for posting in term.postings.iter() {
            matches.entry(posting.doc_id).or_default().push((i, posting));
        }
    }

    let mut scored: Vec<(DocId, f32)> = matches
        .iter()
        .map(|(&doc_id, hits)| {
            let dot: f32 = hits.iter().map(|(i, p)| terms[*i].idf * p.weight).sum();
            let doc_norm = hits.iter().map(|(_, p)| p.weight * p.weight).sum::<f32>().sqrt();
            let cosine = if query_norm > 0.0 && doc_norm > 0.0 { dot / (query_norm * doc_norm) } else { 0.0 };
            let fields: f32 = hits.iter().map(|(_, p)| field_score(p.fields)).sum();
            (doc_id, cosine + fields)
        })
        .collect();
    scored.sort_by(by_score_desc);

    for (doc_id, score) in scored.iter_mut().take(proximity_candidates) {
        let hits = &matches[&*doc_id];
        if hits.len() < 2 {
            continue;
        }
        let lists: Vec<&[u32]> = hits.iter().map(|(_, p)| p.positions.as_slice()).collect();
        *score += proximity_score(&lists, terms.len());
    }
    scored.sort_by(by_score_desc);
    scored
}

/// Documents present in every list. Lists must be ascending by docID.
pub fn intersect(lists: &[&[Posting]]) -> Vec<DocId> {
    let Some(shortest) = (0..lists.len()).min_by_key(|&i| lists[i].len()) else {
        return Vec::new();
    };
    let others: Vec<&[Posting]> = lists
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != shortest)
        .map(|(_, l)| *l)
        .collect();
    let mut cursors = vec![0usize; others.len()];
    let mut result = Vec::new();

    'docs: for posting in lists[shortest] {
        let doc = posting.doc_id;
        for (list, cursor) in others.iter().zip(cursors.iter_mut()) {
            while *cursor < list.len() && list[*cursor].doc_id < doc {
                *cursor += 1;
            }
            match list.get(*cursor) {
                None => break 'docs,
                Some(p) if p.doc_id != doc => continue 'docs,
                Some(_) => {}
            }
        }
        result.push(doc);
    }
    result
}

/// AND the terms together, dropping the least selective (lowest idf) term
/// until at least `min_results` documents match or a single term is left.
/// Returns the matching docIDs and the terms that were kept.
pub fn relaxed_intersection(terms: &[QueryTerm], min_results: usize) -> (Vec<DocId>, Vec<QueryTerm>) {
    let mut kept: Vec<QueryTerm> = terms.to_vec();
    loop {
        let lists: Vec<&[Posting]> = kept.iter().map(|t| t.postings.as_slice()).collect();
        let docs = intersect(&lists);
        if docs.len() >= min_results || kept.len() <= 1 {
            return (docs, kept);
        }
        let weakest = kept
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.idf.partial_cmp(&b.1.idf).unwrap_or(Ordering::Equal))
            .map(|(i, _)| i)
            .unwrap_or(kept.len() - 1);
        tracing::debug!(dropped = %kept[weakest].token, matched = docs.len(), "relaxing conjunction");
        kept.remove(weakest);
    }
}

/// Order docIDs by the summed weight of `terms` in each document.
pub fn order_by_weight(doc_ids: &[DocId], terms: &[QueryTerm]) -> Vec<(DocId, f32)> {
    let mut totals: HashMap<DocId, f32> = doc_ids.iter().map(|&d| (d, 0.0)).collect();
    for term in terms {
        for p in term.postings.iter() {
            if let Some(total) = totals.get_mut(&p.doc_id) {
                *total += p.weight;
            }
        }
    }
    let mut scored: Vec<(DocId, f32)> = totals.into_iter().collect();
    scored.sort_by(by_score_desc);
    scored
}
