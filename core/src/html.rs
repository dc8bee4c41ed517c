use crate::posting::Fields;
use crate::tokenizer::terms;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;

lazy_static! {
    static ref TITLE: Selector = Selector::parse("title").expect("valid selector");
    static ref HEADING: Selector = Selector::parse("h1, h2, h3").expect("valid selector");
    static ref EMPHASIS: Selector = Selector::parse("b, strong, em").expect("valid selector");
}

const HIDDEN: &[&str] = &["script", "style", "noscript", "template"];

/// Plain text of a page plus the stemmed tokens seen in each structural field.
#[derive(Debug, Default, Clone)]
pub struct Page {
    pub title: String,
    pub text: String,
    pub title_terms: BTreeSet<String>,
    pub heading_terms: BTreeSet<String>,
    pub emphasis_terms: BTreeSet<String>,
}

impl Page {
    pub fn fields_of(&self, token: &str) -> Fields {
        let mut fields = Fields::empty();
        if self.title_terms.contains(token) { fields.insert(Fields::TITLE); }
        if self.heading_terms.contains(token) { fields.insert(Fields::HEADING); }
        if self.emphasis_terms.contains(token) { fields.insert(Fields::EMPHASIS); }
        fields
    }
}

pub fn extract(markup: &str) -> Page {
    let doc = Html::parse_document(markup);
    let title = doc
        .select(&TITLE)
        .next()
        .map(|t| collapse(&element_text(t)))
        .unwrap_or_default();
    Page {
        title_terms: terms(&title),
        heading_terms: field_terms(&doc, &HEADING),
        emphasis_terms: field_terms(&doc, &EMPHASIS),
        text: visible_text(&doc),
        title,
    }
}

fn field_terms(doc: &Html, selector: &Selector) -> BTreeSet<String> {
    doc.select(selector).flat_map(|el| terms(&element_text(el))).collect()
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ")
}

fn visible_text(doc: &Html) -> String {
    let mut out = String::new();
    for node in doc.tree.nodes() {
        let Some(text) = node.value().as_text() else { continue };
        let hidden = node.ancestors().any(|a| {
            a.value().as_element().is_some_and(|e| HIDDEN.contains(&e.name()))
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    out
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
