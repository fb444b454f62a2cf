//! Candidate discovery from page markup.
//!
//! Structural sources (header/footer/head images, `link rel` icons, OpenGraph
//! images) are always collected. Every `<img>` with alt text then runs through
//! a three-tier cascade whose looser tiers close once earlier elements have
//! filled the aggregate.

use std::collections::{BTreeMap, BTreeSet};

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::fetch::PageRenderer;
use crate::types::{Candidate, LogoError, LogoResult, OriginTag};

/// Alt text closer than this edit distance to "{name} {kind}" matches tier B.
const ALT_EDIT_DISTANCE_LIMIT: usize = 5;

/// Tier C stays open while fewer than this many references were collected.
const NAME_ONLY_LIMIT: usize = 2;

/// De-duplicated discovery result keyed by absolute URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    entries: BTreeMap<String, BTreeSet<OriginTag>>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: String, tag: OriginTag) {
        self.entries.entry(url).or_default().insert(tag);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Candidate URLs in stable (lexicographic) order.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn into_candidates(self) -> Vec<Candidate> {
        self.entries
            .into_iter()
            .map(|(source_url, origin_tags)| Candidate {
                source_url,
                origin_tags,
            })
            .collect()
    }
}

/// Running collection of resolved references, in the order they were found.
///
/// Duplicates are kept here on purpose: the cascade's size checks count every
/// reference added so far, not distinct URLs.
#[derive(Debug, Default)]
pub struct Aggregate {
    found: Vec<(String, OriginTag)>,
}

impl Aggregate {
    pub fn len(&self) -> usize {
        self.found.len()
    }

    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }

    pub fn push(&mut self, url: String, tag: OriginTag) {
        self.found.push((url, tag));
    }

    pub fn into_set(self) -> CandidateSet {
        let mut set = CandidateSet::new();
        for (url, tag) in self.found {
            set.insert(url, tag);
        }
        set
    }
}

/// Which alt-text tiers an element satisfied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierHits {
    pub a: bool,
    pub b: bool,
    pub c: bool,
}

impl TierHits {
    pub fn any(&self) -> bool {
        self.a || self.b || self.c
    }
}

/// Case-folded matcher for the alt-text cascade.
#[derive(Debug, Clone)]
pub struct AltTextMatcher {
    name: String,
    kind: String,
    phrase: String,
}

impl AltTextMatcher {
    pub fn new(entity_name: &str, entity_kind: &str) -> Self {
        let name = entity_name.to_lowercase();
        let kind = entity_kind.to_lowercase();
        let phrase = format!("{name} {kind}");
        Self { name, kind, phrase }
    }

    /// Evaluate one element's alt text.
    ///
    /// `size_before` is the aggregate size before this element was looked at;
    /// it gates tier B. `running_size` returns the aggregate size after any
    /// additions already made for this element; it gates tier C. Tier C is only
    /// reachable through the tier B gate.
    pub fn evaluate(
        &self,
        alt_text: &str,
        size_before: usize,
        running_size: impl Fn(&TierHits) -> usize,
    ) -> TierHits {
        let alt = alt_text.to_lowercase();
        let mut hits = TierHits::default();

        if alt.contains(&self.name) && alt.contains(&self.kind) {
            hits.a = true;
        }

        if size_before == 0 {
            if !alt.trim().is_empty()
                && strsim::levenshtein(&self.phrase, &alt) < ALT_EDIT_DISTANCE_LIMIT
            {
                hits.b = true;
            }

            if running_size(&hits) < NAME_ONLY_LIMIT && alt.contains(&self.name) {
                hits.c = true;
            }
        }

        hits
    }
}

/// Always-collected sources, in collection order: (selector, attribute, origin).
const STRUCTURAL_SOURCES: [(&str, &str, OriginTag); 6] = [
    ("header img", "src", OriginTag::Header),
    ("footer img", "src", OriginTag::Footer),
    ("head img", "src", OriginTag::Head),
    (r#"link[rel~="image_src"]"#, "href", OriginTag::LinkRel),
    (r#"link[rel~="icon"]"#, "href", OriginTag::LinkRel),
    (r#"meta[property="og:image"]"#, "content", OriginTag::MetaOg),
];

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

fn resolve(base: &Url, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    match base.join(reference) {
        Ok(u) => Some(u.to_string()),
        Err(e) => {
            tracing::debug!("Skipping unresolvable reference {reference:?}: {e}");
            None
        }
    }
}

fn collect_attr(
    document: &Html,
    css: &str,
    attr: &str,
    base: &Url,
    tag: OriginTag,
    agg: &mut Aggregate,
) {
    let sel = selector(css);
    for el in document.select(&sel) {
        if let Some(url) = el.value().attr(attr).and_then(|r| resolve(base, r)) {
            agg.push(url, tag);
        }
    }
}

fn alt_text<'a>(el: &ElementRef<'a>) -> Option<&'a str> {
    el.value()
        .attr("alt")
        .filter(|alt| !alt.trim().is_empty() && !alt.eq_ignore_ascii_case("none"))
}

/// Extract logo candidates from page markup.
pub fn extract_candidates(
    html: &str,
    page_url: &Url,
    entity_name: &str,
    entity_kind: &str,
) -> CandidateSet {
    let document = Html::parse_document(html);
    let mut agg = Aggregate::default();

    for (css, attr, tag) in STRUCTURAL_SOURCES {
        collect_attr(&document, css, attr, page_url, tag, &mut agg);
    }

    // Alt-text cascade
    let matcher = AltTextMatcher::new(entity_name, entity_kind);
    let img_sel = selector("img");
    for el in document.select(&img_sel) {
        let Some(alt) = alt_text(&el) else {
            continue;
        };
        let src = el.value().attr("src").and_then(|r| resolve(page_url, r));
        let size_before = agg.len();
        let added_per_hit = usize::from(src.is_some());

        let hits = matcher.evaluate(alt, size_before, |hits| {
            size_before + added_per_hit * (usize::from(hits.a) + usize::from(hits.b))
        });

        if let Some(url) = src {
            for _ in 0..(usize::from(hits.a) + usize::from(hits.b) + usize::from(hits.c)) {
                agg.push(url.clone(), OriginTag::AltTextMatch);
            }
        }
    }

    let set = agg.into_set();
    tracing::debug!("Discovered {} candidate(s) on {page_url}", set.len());
    set
}

/// Render `page_url` and extract candidates from it.
///
/// A failed render or a non-2xx status yields an empty set. Only an invalid
/// `page_url` is reported as an error.
pub async fn discover(
    renderer: &dyn PageRenderer,
    page_url: &str,
    entity_name: &str,
    entity_kind: &str,
) -> LogoResult<CandidateSet> {
    let base = Url::parse(page_url)
        .map_err(|e| LogoError::InvalidInput(format!("Invalid page URL {page_url:?}: {e}")))?;

    let page = match renderer.render(base.as_str()).await {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!("Failed to render {page_url}: {e}");
            return Ok(CandidateSet::new());
        }
    };

    if !page.is_success() {
        tracing::info!("Page {page_url} returned status {}; no candidates", page.status);
        return Ok(CandidateSet::new());
    }

    Ok(extract_candidates(&page.html, &base, entity_name, entity_kind))
}
