//! Linked account normalization
//!
//! Linked accounts are stored as bare handles. Users paste profile URLs into
//! the forms that feed the store, so every entry goes through
//! [`remove_domain_name`] first.

/// Scheme and subdomain prefixes stripped from linked account entries.
const SCHEME_PREFIXES: &[&str] = &["https://", "http://", "www."];

/// Hosts and host paths stripped from linked account entries, longest first.
/// An entry consisting of nothing but one of these normalizes to empty.
const HOST_PREFIXES: &[&str] = &[
    "quay.io/organization",
    "quay.io/repository",
    "quay.io/user",
    "quay.io",
    "github.com/orgs",
    "github.com",
];

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    value
        .get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &value[prefix.len()..])
}

/// Strip scheme, host and known path prefixes from a linked account entry.
///
/// The result is a fixed point: applying the function to its own output
/// returns the same string. A bare host such as `https://github.com/`
/// yields the empty string.
pub fn remove_domain_name(value: &str) -> String {
    let mut current = value.trim();

    loop {
        let before = current.len();

        for scheme in SCHEME_PREFIXES {
            if let Some(rest) = strip_prefix_ignore_case(current, scheme) {
                current = rest;
            }
        }

        current = current
            .trim_end_matches('/')
            .trim_start_matches(['.', '/'])
            .trim();

        for host in HOST_PREFIXES {
            let Some(rest) = strip_prefix_ignore_case(current, host) else {
                continue;
            };
            if rest.is_empty() {
                current = rest;
                break;
            }
            if let Some(rest) = rest.strip_prefix('/') {
                current = rest;
                break;
            }
        }

        if current.len() == before {
            return current.to_string();
        }
    }
}

/// Normalize a list of linked accounts, dropping entries that end up empty.
pub fn normalize_accounts<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| remove_domain_name(v.as_ref()))
        .filter(|v| !v.is_empty())
        .collect()
}
