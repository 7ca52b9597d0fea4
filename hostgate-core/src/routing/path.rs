//! Path classification for the application host

use crate::config::PublicPaths;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// Reachable without a session
    Public,
    /// Requires an authenticated, authorized session
    Protected,
}

/// True when `path` equals `prefix` or lies beneath it on a segment boundary.
///
/// `/portal` covers `/portal` and `/portal/x` but not `/portals`.
pub fn is_under(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn matches_entry(path: &str, entry: &str) -> bool {
    if entry.ends_with('/') {
        // Reserved prefix: everything beneath it, plus the bare segment.
        path.starts_with(entry) || path == entry.trim_end_matches('/')
    } else {
        is_under(path, entry)
    }
}

/// Classify a request path against the configured public set. Anything not
/// listed is protected.
pub fn classify_path(path: &str, public_paths: &PublicPaths) -> PathClass {
    if public_paths
        .entries()
        .iter()
        .any(|entry| matches_entry(path, entry))
    {
        PathClass::Public
    } else {
        PathClass::Protected
    }
}

/// Prefix `path` with an internal namespace; `/` maps to the namespace root.
pub fn namespaced(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    match path {
        "" | "/" if prefix.is_empty() => "/".to_string(),
        "" | "/" => prefix.to_string(),
        _ => format!("{}{}", prefix, path),
    }
}
