//! Stable, URL-derived storage keys.

use url::Url;

/// Derive the storage identifier for a candidate URL.
///
/// Host, path, and query are joined with `-`, path separators are dropped, and
/// dots become dashes, so the same URL always maps to the same key.
pub fn identifier_for(source_url: &str) -> String {
    let raw = match Url::parse(source_url) {
        Ok(u) => {
            let mut parts = Vec::with_capacity(3);
            if let Some(host) = u.host_str() {
                parts.push(host.to_string());
            }
            let path = u.path().trim_matches('/');
            if !path.is_empty() {
                parts.push(path.to_string());
            }
            if let Some(query) = u.query().filter(|q| !q.is_empty()) {
                parts.push(query.to_string());
            }
            parts.join("-")
        }
        Err(_) => source_url.to_string(),
    };

    let slug: String = raw
        .replace('/', "")
        .replace('.', "-")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '=') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if slug.is_empty() {
        "image".to_string()
    } else {
        slug
    }
}
