//! Label level name handling: splitting, hostname syntax, and root domain matching.

use crate::error::Error;
use trust_dns_server::client::rr::{LowerName, Name};

const MAX_HOSTNAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Split a query name into its lower-cased labels, e.g. `ABC.dexih.com.` becomes
/// `["abc", "dexih", "com"]`. The root name has no labels.
pub fn labels(name: &LowerName) -> Vec<String> {
    Name::from(name)
        .iter()
        .map(|label| String::from_utf8_lossy(label).to_lowercase())
        .collect()
}

/// Split a configured hostname into lower-cased labels, ignoring a trailing dot.
pub fn split_hostname(hostname: &str) -> Vec<String> {
    let hostname = hostname.trim_end_matches('.');
    if hostname.is_empty() {
        return Vec::new();
    }
    hostname.split('.').map(str::to_lowercase).collect()
}

/// Whether `s` is a syntactically valid DNS hostname: letters, digits and hyphens, labels of
/// 1 to 63 characters that don't begin or end with a hyphen, at most 253 characters overall. A
/// single trailing dot is accepted. Names made only of digit labels, such as IPv4 literals, are
/// rejected.
pub fn is_hostname(s: &str) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);
    if s.is_empty() || s.len() > MAX_HOSTNAME_LEN {
        return false;
    }
    if s
        .split('.')
        .all(|label| label.bytes().all(|b| b.is_ascii_digit()))
    {
        return false;
    }
    s.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

/// Parse a validated hostname into a fully qualified [`Name`].
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] naming `field` when `hostname` isn't a valid hostname.
pub fn fqdn(field: &'static str, hostname: &str) -> Result<Name, Error> {
    if !is_hostname(hostname) {
        return Err(Error::invalid_config(field, hostname));
    }
    let absolute = format!("{}.", hostname.trim_end_matches('.'));
    Name::from_ascii(&absolute).map_err(|_| Error::invalid_config(field, hostname))
}

/// Match `query` against the `root` domain labels.
///
/// Returns the dot-joined prefix left over once `root` is removed from the end of `query`
/// (empty for the apex), or `None` if `query` doesn't end with every label of `root`.
pub fn match_root(query: &[String], root: &[String]) -> Option<String> {
    if query.len() < root.len() {
        return None;
    }
    let (prefix, suffix) = query.split_at(query.len() - root.len());
    suffix
        .iter()
        .zip(root)
        .all(|(q, r)| q.eq_ignore_ascii_case(r))
        .then(|| prefix.join("."))
}

/// Whether the labels of `suffix` end `name`, compared case-insensitively.
pub fn ends_with(name: &[String], suffix: &[String]) -> bool {
    match_root(name, suffix).is_some()
}
