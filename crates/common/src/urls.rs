use url::Url;

/// Query parameters stripped before a URL is used as a dedup key.
const TRACKING_PARAMS: [&str; 9] = [
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "ref",
    "fbclid",
    "gclid",
    "msclkid",
];

/// Host of a URL, lowercased, with a leading `www.` stripped.
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(host.trim_start_matches("www.").to_string())
}

/// Canonical form of a URL for deduplication: lowercased scheme and host,
/// fragment dropped, known tracking parameters removed.
///
/// Unparseable input is returned unchanged so it still participates in
/// exact-match dedup.
pub fn canonicalize_url(url: &str) -> String {
    let mut parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(_) => return url.to_string(),
    };

    parsed.set_fragment(None);

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.to_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        let query = kept
            .iter()
            .map(|(k, v)| {
                if v.is_empty() {
                    k.clone()
                } else {
                    format!("{k}={v}")
                }
            })
            .collect::<Vec<_>>()
            .join("&");
        parsed.set_query(Some(&query));
    }

    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_strips_www_and_lowercases() {
        assert_eq!(
            host_of("https://WWW.Example.COM/path"),
            Some("example.com".to_string())
        );
        assert_eq!(
            host_of("https://news.ycombinator.com/item?id=1"),
            Some("news.ycombinator.com".to_string())
        );
        assert_eq!(host_of("not a url"), None);
    }

    #[test]
    fn canonicalize_drops_tracking_and_fragment() {
        assert_eq!(
            canonicalize_url("https://example.com/a?utm_source=rss&id=7#section"),
            "https://example.com/a?id=7"
        );
        assert_eq!(
            canonicalize_url("https://example.com/a?utm_source=rss"),
            "https://example.com/a"
        );
    }

    #[test]
    fn canonicalize_keeps_meaningful_query() {
        assert_eq!(
            canonicalize_url("https://example.com/watch?v=abc123"),
            "https://example.com/watch?v=abc123"
        );
    }

    #[test]
    fn canonicalize_passes_through_garbage() {
        assert_eq!(canonicalize_url("not a url"), "not a url");
    }
}
