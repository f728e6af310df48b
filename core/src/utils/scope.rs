//! URL canonicalization and crawl-scope decisions.
//!
//! Same-site is decided on host strings with a leading `www.` folded away,
//! so `www.example.com` and `example.com` are one site. This is a heuristic,
//! not a public-suffix comparison.

use url::Url;

use crate::error::SentinelError;

/// Resolves `href` against `base`. Absolute, scheme-relative and
/// path-relative forms are all accepted; the fragment is dropped.
/// Returns `None` for anything that does not parse.
pub fn normalize(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let mut url = base.join(href).ok()?;
    url.set_fragment(None);
    Some(url)
}

pub fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

pub fn fold_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// True when `candidate` is http(s) and lives on the same folded host as
/// `origin`. Ports are not compared.
pub fn is_internal(candidate: &Url, origin: &Url) -> bool {
    if !is_http(candidate) {
        return false;
    }

    match (candidate.host_str(), origin.host_str()) {
        (Some(candidate_host), Some(origin_host)) => {
            fold_www(candidate_host) == fold_www(origin_host)
        }
        _ => false,
    }
}

/// Hostname of a discovered URL, for the port prober.
pub fn host_of(raw: &str) -> Result<String, SentinelError> {
    let url = Url::parse(raw)
        .map_err(|e| SentinelError::MalformedInput(format!("'{}': {}", raw, e)))?;

    url.host_str()
        .map(|host| host.trim_start_matches('[').trim_end_matches(']').to_string())
        .ok_or_else(|| SentinelError::MalformedInput(format!("'{}' has no host", raw)))
}
