//! Search Console property variants for a site.
//!
//! A site can be verified in Search Console as a domain property or as any of several URL-prefix
//! properties. Given the URL the dashboard stored for a site, we derive the bare host and list the
//! variants in the order they should be tried.

use url::{Host, Url};

/// Bare host of a stored site URL: no scheme, leading `www.`, path or port, and IPv6 addresses
/// without brackets. `None` when nothing host-like can be found.
pub fn site_host(stored_site_url: &str) -> Option<String> {
    let trimmed = stored_site_url.trim();
    if trimmed.is_empty() {
        return None;
    }

    let with_scheme = if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let host = match Url::parse(&with_scheme).ok()?.host()? {
        Host::Domain(domain) => domain.to_string(),
        Host::Ipv4(addr) => addr.to_string(),
        Host::Ipv6(addr) => addr.to_string(),
    };

    let host = match host.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => host,
    };

    Some(host)
}

/// `true` when `input` opens with `scheme://`. A `://` later in the path or query does not count.
fn has_scheme(input: &str) -> bool {
    let Some((scheme, _)) = input.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Property identifiers to try for `host`, highest priority first, without duplicates.
pub fn candidates(host: &str) -> Vec<String> {
    let variants = [
        format!("sc-domain:{host}"),
        format!("https://{host}"),
        format!("https://www.{host}"),
        format!("http://{host}"),
        format!("http://www.{host}"),
        format!("https://{host}/"),
    ];

    let mut out: Vec<String> = Vec::with_capacity(variants.len());
    for variant in variants {
        if !out.contains(&variant) {
            out.push(variant);
        }
    }
    out
}

/// Percent-encode a property identifier for use as a single path segment.
pub fn encode_property(candidate: &str) -> String {
    url::form_urlencoded::byte_serialize(candidate.as_bytes()).collect()
}
