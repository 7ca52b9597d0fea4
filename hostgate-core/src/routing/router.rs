//! Edge router
//!
//! Produces exactly one [`RoutingDecision`] per request from the host, path
//! and credential. Rules are evaluated in order and the first match wins:
//!
//! 0. configured pass-through paths are served unchanged
//! 1. `www.` hosts are permanently redirected to the bare host
//! 2. the application host goes through the identity gate
//! 3. the marketing host is rewritten into the marketing namespace
//! 4. tenant hosts are rewritten into the tenant namespace

use std::sync::Arc;

use axum::http::StatusCode;
use metrics::counter;

use super::gate::{AuthDecision, IdentityGate};
use super::host::{classify_host, normalize_host, resolve_host_name, HostClass};
use super::path::{classify_path, is_under, namespaced, PathClass};
use crate::config::RoutingConfig;
use crate::domain::{RequestContext, RouteArea, RouteOutcome, RoutingDecision};
use crate::identity::IdentityProvider;
use crate::repository::ProfileRepository;

pub struct EdgeRouter<I: IdentityProvider, P: ProfileRepository> {
    config: Arc<RoutingConfig>,
    gate: IdentityGate<I, P>,
}

impl<I: IdentityProvider, P: ProfileRepository> EdgeRouter<I, P> {
    pub fn new(config: Arc<RoutingConfig>, gate: IdentityGate<I, P>) -> Self {
        Self { config, gate }
    }

    pub async fn route(&self, ctx: &RequestContext) -> RouteOutcome {
        let outcome = self.decide(ctx).await;

        counter!(
            "hostgate_route_decisions_total",
            "area" => outcome.area.as_str(),
            "decision" => outcome.decision.kind()
        )
        .increment(1);
        tracing::debug!(
            area = outcome.area.as_str(),
            decision = ?outcome.decision,
            "Routed request"
        );

        outcome
    }

    async fn decide(&self, ctx: &RequestContext) -> RouteOutcome {
        if self.is_passthrough(ctx.path()) {
            return RouteOutcome::new(RoutingDecision::PassThrough, RouteArea::PassThrough);
        }

        if let Some(location) = self.www_redirect(ctx) {
            return RouteOutcome::new(
                RoutingDecision::Redirect {
                    location,
                    status: StatusCode::PERMANENT_REDIRECT,
                },
                RouteArea::Canonical,
            );
        }

        match classify_host(ctx.host(), &self.config) {
            HostClass::ReservedApp => self.route_app(ctx).await,
            HostClass::Marketing => RouteOutcome::new(
                rewrite(&self.config.marketing_route_prefix, ctx.path()),
                RouteArea::Marketing,
            ),
            HostClass::TenantCandidate(label) => RouteOutcome::new(
                rewrite(&format!("/{}", label), ctx.path()),
                RouteArea::Tenant { label },
            ),
        }
    }

    fn is_passthrough(&self, path: &str) -> bool {
        self.config.passthrough_prefixes.iter().any(|prefix| {
            if prefix.ends_with('/') {
                path.starts_with(prefix.as_str())
            } else {
                is_under(path, prefix)
            }
        })
    }

    /// Location for a `www.` host whose bare form belongs to the deployment.
    /// Unrecognized `www.` hosts fall through to canonicalization.
    fn www_redirect(&self, ctx: &RequestContext) -> Option<String> {
        let host = normalize_host(ctx.host()).ok()?;
        let bare = host.name.strip_prefix("www.")?;
        resolve_host_name(bare, &self.config)?;

        let authority = match host.port {
            Some(port) => format!("{}:{}", bare, port),
            None => bare.to_string(),
        };
        Some(format!(
            "{}://{}{}",
            self.config.environment.scheme(),
            authority,
            ctx.path_and_query()
        ))
    }

    async fn route_app(&self, ctx: &RequestContext) -> RouteOutcome {
        let path = ctx.path();
        let path_class = if self.gate.is_login_path(path) {
            PathClass::Public
        } else {
            classify_path(path, &self.config.public_paths)
        };

        let gate = self.gate.authorize(ctx.credential(), path).await;

        let (decision, identity) = match (gate.decision, path_class) {
            (AuthDecision::Anonymous | AuthDecision::SessionInvalid, PathClass::Protected) => {
                (redirect(&self.config.login_path), None)
            }
            (AuthDecision::AlreadyAuthenticated, _) => (redirect(&self.config.home_path), None),
            (AuthDecision::AuthenticatedGeneral, _) => (redirect(&self.config.portal_url()), None),
            (AuthDecision::Anonymous | AuthDecision::SessionInvalid, PathClass::Public) => {
                (rewrite(&self.config.app_route_prefix, path), None)
            }
            (AuthDecision::Authorized(identity), _) => {
                (rewrite(&self.config.app_route_prefix, path), Some(identity))
            }
        };

        RouteOutcome::new(decision, RouteArea::App)
            .with_credential(gate.credential)
            .with_identity(identity)
    }
}

fn redirect(location: &str) -> RoutingDecision {
    RoutingDecision::Redirect {
        location: location.to_string(),
        status: StatusCode::TEMPORARY_REDIRECT,
    }
}

fn rewrite(prefix: &str, path: &str) -> RoutingDecision {
    RoutingDecision::InternalRewrite {
        path: namespaced(prefix, path),
    }
}
