//! Host classification
//!
//! Maps the raw `Host` header to the area of the deployment it addresses.
//! Hosts that do not belong to the deployment are never routed verbatim:
//! they are canonicalized to the root domain.

use thiserror::Error;

use crate::config::{Environment, RoutingConfig};

/// Area of the deployment addressed by a host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostClass {
    /// Apex domain, or any unrecognized/malformed host
    Marketing,
    /// Operator dashboard and portal host
    ReservedApp,
    /// Subdomain or registered custom domain, carrying the full host as label
    TenantCandidate(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("Missing host")]
    Missing,
    #[error("Malformed host: {0}")]
    Malformed(String),
}

/// Lowercased host name without trailing dot, and its port if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedHost {
    pub name: String,
    pub port: Option<u16>,
}

impl NormalizedHost {
    /// Host name with the port re-attached
    pub fn authority(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.name, port),
            None => self.name.clone(),
        }
    }
}

pub(crate) fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && label
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Parse and normalize a raw host header value
pub fn normalize_host(raw: Option<&str>) -> Result<NormalizedHost, HostError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(HostError::Missing)?;

    if !raw.is_ascii() {
        return Err(HostError::Malformed(raw.to_string()));
    }

    let lower = raw.to_ascii_lowercase();
    let (name, port) = match lower.rsplit_once(':') {
        Some((name, port)) => {
            let port: u16 = port
                .parse()
                .map_err(|_| HostError::Malformed(raw.to_string()))?;
            (name, Some(port))
        }
        None => (lower.as_str(), None),
    };

    let name = name.strip_suffix('.').unwrap_or(name);
    if name.is_empty() || name.len() > 253 || !name.split('.').all(is_valid_label) {
        return Err(HostError::Malformed(raw.to_string()));
    }

    Ok(NormalizedHost {
        name: name.to_string(),
        port,
    })
}

/// Rewrite development and preview hosts onto the root domain
fn effective_name(name: &str, config: &RoutingConfig) -> String {
    if config.environment == Environment::Development {
        if name == "localhost" {
            return config.root_domain.clone();
        }
        if let Some(sub) = name.strip_suffix(".localhost") {
            return format!("{}.{}", sub, config.root_domain);
        }
    }

    if let Some(suffix) = &config.preview_deployment_suffix {
        if let Some(deployment) = name.strip_suffix(suffix.as_str()) {
            if let Some((label, _branch)) = deployment
                .strip_suffix('.')
                .and_then(|d| d.split_once("---"))
            {
                if !label.is_empty() {
                    return format!("{}.{}", label, config.root_domain);
                }
            }
        }
    }

    name.to_string()
}

/// Classify a normalized host name; `None` when the host is not part of the
/// deployment.
pub fn resolve_host_name(name: &str, config: &RoutingConfig) -> Option<HostClass> {
    let name = effective_name(name, config);
    let root = config.root_domain.as_str();

    if name == root {
        return Some(HostClass::Marketing);
    }
    if name == config.app_host() {
        return Some(HostClass::ReservedApp);
    }
    if name
        .strip_suffix(root)
        .is_some_and(|rest| rest.len() > 1 && rest.ends_with('.'))
    {
        return Some(HostClass::TenantCandidate(name));
    }
    if config.custom_domains.contains(&name) {
        return Some(HostClass::TenantCandidate(name));
    }
    None
}

/// Classify a raw host header. Missing, malformed and unrecognized hosts are
/// canonicalized to the root domain.
pub fn classify_host(raw: Option<&str>, config: &RoutingConfig) -> HostClass {
    let host = match normalize_host(raw) {
        Ok(host) => host,
        Err(e) => {
            tracing::debug!("Canonicalizing to root domain: {}", e);
            return HostClass::Marketing;
        }
    };

    resolve_host_name(&host.name, config).unwrap_or_else(|| {
        tracing::debug!(host = %host.name, "Unrecognized host, canonicalizing to root domain");
        HostClass::Marketing
    })
}
