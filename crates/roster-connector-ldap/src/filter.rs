//! Search filters
//!
//! A small filter model that renders to RFC 4515 strings for the LDAP
//! backend and evaluates directly against entries for the in-memory one.

use std::fmt;

use crate::entry::DirectoryEntry;

/// Directory search filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `(attr=value)`
    Equals { attribute: String, value: String },
    /// `(attr=p0*p1*...*pn)`; empty first or last part means unanchored.
    Wildcard {
        attribute: String,
        parts: Vec<String>,
    },
    /// `(attr=*)`
    Present { attribute: String },
    And { filters: Vec<Filter> },
    Or { filters: Vec<Filter> },
    Not { filter: Box<Filter> },
}

impl Filter {
    pub fn eq(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// `(attr=*value*)`
    pub fn contains(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Wildcard {
            attribute: attribute.into(),
            parts: vec![String::new(), value.into(), String::new()],
        }
    }

    pub fn wildcard<I, S>(attribute: impl Into<String>, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::Wildcard {
            attribute: attribute.into(),
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    pub fn present(attribute: impl Into<String>) -> Self {
        Filter::Present {
            attribute: attribute.into(),
        }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { filters }
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or { filters }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Self {
        Filter::Not {
            filter: Box::new(filter),
        }
    }

    /// Render as an LDAP filter string.
    pub fn to_ldap(&self) -> String {
        match self {
            Filter::Equals { attribute, value } => {
                format!("({}={})", attribute, escape_ldap_value(value))
            }
            Filter::Wildcard { attribute, parts } => {
                let inner: Vec<String> = parts.iter().map(|p| escape_ldap_value(p)).collect();
                format!("({}={})", attribute, inner.join("*"))
            }
            Filter::Present { attribute } => format!("({}=*)", attribute),
            Filter::And { filters } => {
                let inner: Vec<String> = filters.iter().map(Filter::to_ldap).collect();
                format!("(&{})", inner.join(""))
            }
            Filter::Or { filters } => {
                let inner: Vec<String> = filters.iter().map(Filter::to_ldap).collect();
                format!("(|{})", inner.join(""))
            }
            Filter::Not { filter } => format!("(!{})", filter.to_ldap()),
        }
    }

    /// Evaluate against an entry. Attribute names and values compare
    /// case-insensitively, as the directory does.
    pub fn matches(&self, entry: &DirectoryEntry) -> bool {
        match self {
            Filter::Equals { attribute, value } => entry
                .values(attribute)
                .iter()
                .any(|v| v.eq_ignore_ascii_case(value)),
            Filter::Wildcard { attribute, parts } => entry
                .values(attribute)
                .iter()
                .any(|v| wildcard_matches(&v.to_lowercase(), parts)),
            Filter::Present { attribute } => !entry.values(attribute).is_empty(),
            Filter::And { filters } => filters.iter().all(|f| f.matches(entry)),
            Filter::Or { filters } => filters.iter().any(|f| f.matches(entry)),
            Filter::Not { filter } => !filter.matches(entry),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ldap())
    }
}

fn wildcard_matches(value: &str, parts: &[String]) -> bool {
    let Some((first, rest)) = parts.split_first() else {
        return false;
    };
    let first = first.to_lowercase();
    let Some(mut remaining) = value.strip_prefix(first.as_str()) else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        // single part: plain equality
        return remaining.is_empty();
    };

    for part in middle {
        let part = part.to_lowercase();
        match remaining.find(part.as_str()) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last.to_lowercase().as_str())
}

/// Escape special characters in LDAP filter values (RFC 4515).
pub fn escape_ldap_value(value: &str) -> String {
    value
        .replace('\\', "\\5c")
        .replace('*', "\\2a")
        .replace('(', "\\28")
        .replace(')', "\\29")
        .replace('\0', "\\00")
}
