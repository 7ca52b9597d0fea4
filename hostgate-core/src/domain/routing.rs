//! Request context and routing decision models

use axum::http::StatusCode;

use super::profile::Role;
use super::session::{Credential, CredentialUpdate};

/// Immutable per-request input to the router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    host: Option<String>,
    path: String,
    query: Option<String>,
    credential: Option<Credential>,
}

impl RequestContext {
    pub fn new(
        host: Option<String>,
        path: impl Into<String>,
        query: Option<String>,
        credential: Option<Credential>,
    ) -> Self {
        let path = path.into();
        Self {
            host,
            path: if path.is_empty() { "/".to_string() } else { path },
            query: query.filter(|q| !q.is_empty()),
            credential,
        }
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Path with the original query string appended
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }
}

/// The single routing action taken for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Serve the request unchanged
    PassThrough,
    /// Answer with a redirect; `location` is absolute or host-relative
    Redirect { location: String, status: StatusCode },
    /// Serve `path` internally; the query string is carried over by the caller
    InternalRewrite { path: String },
}

impl RoutingDecision {
    pub fn kind(&self) -> &'static str {
        match self {
            RoutingDecision::PassThrough => "pass_through",
            RoutingDecision::Redirect { .. } => "redirect",
            RoutingDecision::InternalRewrite { .. } => "rewrite",
        }
    }
}

/// Logical area a request was routed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteArea {
    PassThrough,
    /// `www.` canonicalization
    Canonical,
    App,
    Marketing,
    Tenant { label: String },
}

impl RouteArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteArea::PassThrough => "pass_through",
            RouteArea::Canonical => "canonical",
            RouteArea::App => "app",
            RouteArea::Marketing => "marketing",
            RouteArea::Tenant { .. } => "tenant",
        }
    }
}

/// Identity allowed into the application host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedIdentity {
    pub identity_id: String,
    pub role: Role,
}

/// Router output: the decision plus the credential change applied with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteOutcome {
    pub decision: RoutingDecision,
    pub credential: Option<CredentialUpdate>,
    pub area: RouteArea,
    pub identity: Option<AuthorizedIdentity>,
}

impl RouteOutcome {
    pub fn new(decision: RoutingDecision, area: RouteArea) -> Self {
        Self {
            decision,
            credential: None,
            area,
            identity: None,
        }
    }

    pub fn with_credential(mut self, credential: Option<CredentialUpdate>) -> Self {
        self.credential = credential;
        self
    }

    pub fn with_identity(mut self, identity: Option<AuthorizedIdentity>) -> Self {
        self.identity = identity;
        self
    }
}
