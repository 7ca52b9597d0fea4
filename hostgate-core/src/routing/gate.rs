//! Identity gate for the application host
//!
//! Turns the request credential into an authorization decision by consulting
//! the identity provider and the profile store. Every external call is bounded
//! by the configured timeout; a provider that is slow or down never blocks a
//! request, it only degrades the decision to [`AuthDecision::SessionInvalid`].

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use metrics::{counter, histogram};

use super::path::is_under;
use crate::domain::{AuthorizedIdentity, Credential, CredentialUpdate, Role, Session};
use crate::identity::IdentityProvider;
use crate::repository::ProfileRepository;

/// Authorization result for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// No credential, or one the provider rejected
    Anonymous,
    /// The provider or profile store could not be consulted
    SessionInvalid,
    /// Authenticated user requesting the login page
    AlreadyAuthenticated,
    /// Authenticated general-tier user outside the portal
    AuthenticatedGeneral,
    Authorized(AuthorizedIdentity),
}

impl AuthDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthDecision::Anonymous => "anonymous",
            AuthDecision::SessionInvalid => "session_invalid",
            AuthDecision::AlreadyAuthenticated => "already_authenticated",
            AuthDecision::AuthenticatedGeneral => "authenticated_general",
            AuthDecision::Authorized(_) => "authorized",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub decision: AuthDecision,
    /// Credential change to apply to the response, whatever the decision
    pub credential: Option<CredentialUpdate>,
}

impl GateOutcome {
    fn new(decision: AuthDecision, credential: Option<CredentialUpdate>) -> Self {
        Self {
            decision,
            credential,
        }
    }
}

enum SessionLookup {
    Active(Session),
    Refreshed(Session, Credential),
    Rejected,
    Failed,
}

pub struct IdentityGate<I: IdentityProvider, P: ProfileRepository> {
    provider: Arc<I>,
    profiles: Arc<P>,
    timeout: Duration,
    refresh_skew: chrono::Duration,
    login_path: String,
    portal_prefix: String,
}

impl<I: IdentityProvider, P: ProfileRepository> IdentityGate<I, P> {
    pub fn new(
        provider: Arc<I>,
        profiles: Arc<P>,
        timeout: Duration,
        refresh_skew: Duration,
        login_path: impl Into<String>,
        portal_prefix: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            profiles,
            timeout,
            refresh_skew: chrono::Duration::from_std(refresh_skew)
                .unwrap_or_else(|_| chrono::Duration::zero()),
            login_path: login_path.into(),
            portal_prefix: portal_prefix.into(),
        }
    }

    /// The login page, with or without a trailing slash
    pub fn is_login_path(&self, path: &str) -> bool {
        let login = self.login_path.trim_end_matches('/');
        path == login || path.strip_prefix(login) == Some("/")
    }

    /// Decide whether the credential may reach `path` on the application host.
    pub async fn authorize(&self, credential: Option<&Credential>, path: &str) -> GateOutcome {
        let Some(credential) = credential else {
            return GateOutcome::new(AuthDecision::Anonymous, None);
        };

        let (session, update) = match self.resolve_session(credential).await {
            SessionLookup::Active(session) => (session, None),
            SessionLookup::Refreshed(session, refreshed) => {
                (session, Some(CredentialUpdate::Set(refreshed)))
            }
            SessionLookup::Rejected => {
                return GateOutcome::new(AuthDecision::Anonymous, Some(CredentialUpdate::Clear))
            }
            SessionLookup::Failed => return GateOutcome::new(AuthDecision::SessionInvalid, None),
        };

        if self.is_login_path(path) {
            return GateOutcome::new(AuthDecision::AlreadyAuthenticated, update);
        }

        let identity_id = match session.identity_id {
            Some(id) => id,
            None => {
                let active = match &update {
                    Some(CredentialUpdate::Set(refreshed)) => refreshed,
                    _ => credential,
                };
                match self
                    .bounded("get_current_user", self.provider.get_current_user(active))
                    .await
                {
                    Some(Some(identity)) => identity.id,
                    Some(None) => {
                        return GateOutcome::new(
                            AuthDecision::Anonymous,
                            Some(CredentialUpdate::Clear),
                        )
                    }
                    None => return GateOutcome::new(AuthDecision::SessionInvalid, update),
                }
            }
        };

        let role = match self
            .bounded("find_profile", self.profiles.find_by_identity(&identity_id))
            .await
        {
            Some(Some(profile)) => profile.role,
            Some(None) => {
                tracing::warn!(identity_id = %identity_id, "No profile for identity, treating as general");
                Role::General
            }
            None => return GateOutcome::new(AuthDecision::SessionInvalid, update),
        };

        if !role.is_elevated() && !is_under(path, &self.portal_prefix) {
            return GateOutcome::new(AuthDecision::AuthenticatedGeneral, update);
        }

        GateOutcome::new(
            AuthDecision::Authorized(AuthorizedIdentity { identity_id, role }),
            update,
        )
    }

    /// Current session, refreshing it at most once when expired or unknown.
    async fn resolve_session(&self, credential: &Credential) -> SessionLookup {
        let current = match self
            .bounded("get_session", self.provider.get_session(credential))
            .await
        {
            Some(current) => current,
            None => return SessionLookup::Failed,
        };

        if let Some(session) = current {
            if !session.is_expired(Utc::now(), self.refresh_skew) {
                return SessionLookup::Active(session);
            }
        }

        let Some(refresh_token) = credential.refresh_token.as_deref() else {
            return SessionLookup::Rejected;
        };

        match self
            .bounded("refresh_session", self.provider.refresh_session(refresh_token))
            .await
        {
            Some(Some((session, refreshed))) => SessionLookup::Refreshed(session, refreshed),
            Some(None) => SessionLookup::Rejected,
            None => SessionLookup::Failed,
        }
    }

    /// Run one collaborator call under the timeout. `None` means it failed.
    async fn bounded<T, E, F>(&self, operation: &'static str, call: F) -> Option<T>
    where
        E: Display,
        F: Future<Output = Result<T, E>>,
    {
        let start = Instant::now();
        let result = tokio::time::timeout(self.timeout, call).await;
        histogram!("hostgate_identity_request_duration_seconds", "operation" => operation)
            .record(start.elapsed().as_secs_f64());

        let (outcome, value) = match result {
            Ok(Ok(value)) => ("ok", Some(value)),
            Ok(Err(e)) => {
                tracing::warn!(operation, "Identity lookup failed: {}", e);
                ("error", None)
            }
            Err(_) => {
                tracing::warn!(operation, timeout_ms = self.timeout.as_millis() as u64, "Identity lookup timed out");
                ("timeout", None)
            }
        };
        counter!("hostgate_identity_requests_total", "operation" => operation, "outcome" => outcome)
            .increment(1);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Identity, UserProfile};
    use crate::error::AppError;
    use crate::identity::{IdentityError, IdentityResult, MockIdentityProvider};
    use crate::repository::profile::MockProfileRepository;
    use async_trait::async_trait;
    use mockall::predicate::*;

    fn credential() -> Credential {
        Credential::new("access-1", Some("refresh-1".to_string()))
    }

    fn live_session(identity_id: Option<&str>) -> Session {
        Session {
            identity_id: identity_id.map(str::to_string),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        }
    }

    fn expired_session() -> Session {
        Session {
            identity_id: Some("user-1".to_string()),
            expires_at: Utc::now() - chrono::Duration::minutes(5),
        }
    }

    fn profile(role: Role) -> UserProfile {
        UserProfile {
            identity_id: "user-1".to_string(),
            role,
            account_id: None,
        }
    }

    fn gate<I: IdentityProvider, P: ProfileRepository>(
        provider: I,
        profiles: P,
    ) -> IdentityGate<I, P> {
        IdentityGate::new(
            Arc::new(provider),
            Arc::new(profiles),
            Duration::from_millis(500),
            Duration::from_secs(30),
            "/login",
            "/portal",
        )
    }

    fn profiles_with(role: Role) -> MockProfileRepository {
        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_find_by_identity()
            .with(eq("user-1"))
            .returning(move |_| Ok(Some(profile(role))));
        profiles
    }

    #[tokio::test]
    async fn test_no_credential_is_anonymous_without_calls() {
        let provider = MockIdentityProvider::new();
        let profiles = MockProfileRepository::new();

        let outcome = gate(provider, profiles).authorize(None, "/dashboard").await;

        assert_eq!(outcome.decision, AuthDecision::Anonymous);
        assert!(outcome.credential.is_none());
    }

    #[tokio::test]
    async fn test_elevated_role_authorized() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_get_session()
            .times(1)
            .returning(|_| Ok(Some(live_session(Some("user-1")))));
        provider.expect_get_current_user().never();
        provider.expect_refresh_session().never();

        let outcome = gate(provider, profiles_with(Role::Admin))
            .authorize(Some(&credential()), "/dashboard")
            .await;

        assert_eq!(
            outcome.decision,
            AuthDecision::Authorized(AuthorizedIdentity {
                identity_id: "user-1".to_string(),
                role: Role::Admin,
            })
        );
        assert!(outcome.credential.is_none());
    }

    #[tokio::test]
    async fn test_general_role_outside_portal() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_get_session()
            .returning(|_| Ok(Some(live_session(Some("user-1")))));

        let outcome = gate(provider, profiles_with(Role::General))
            .authorize(Some(&credential()), "/dashboard")
            .await;

        assert_eq!(outcome.decision, AuthDecision::AuthenticatedGeneral);
    }

    #[tokio::test]
    async fn test_general_role_inside_portal_authorized() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_get_session()
            .returning(|_| Ok(Some(live_session(Some("user-1")))));

        let outcome = gate(provider, profiles_with(Role::General))
            .authorize(Some(&credential()), "/portal/sites")
            .await;

        assert!(matches!(
            outcome.decision,
            AuthDecision::Authorized(AuthorizedIdentity {
                role: Role::General,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_missing_profile_treated_as_general() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_get_session()
            .returning(|_| Ok(Some(live_session(Some("user-1")))));
        let mut profiles = MockProfileRepository::new();
        profiles.expect_find_by_identity().returning(|_| Ok(None));

        let outcome = gate(provider, profiles)
            .authorize(Some(&credential()), "/dashboard")
            .await;

        assert_eq!(outcome.decision, AuthDecision::AuthenticatedGeneral);
    }

    #[tokio::test]
    async fn test_login_path_with_session_already_authenticated() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_get_session()
            .returning(|_| Ok(Some(live_session(Some("user-1")))));
        let mut profiles = MockProfileRepository::new();
        profiles.expect_find_by_identity().never();

        let gate = gate(provider, profiles);
        for path in ["/login", "/login/"] {
            let outcome = gate.authorize(Some(&credential()), path).await;
            assert_eq!(outcome.decision, AuthDecision::AlreadyAuthenticated);
        }
    }

    #[tokio::test]
    async fn test_session_without_identity_uses_current_user() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_get_session()
            .returning(|_| Ok(Some(live_session(None))));
        provider.expect_get_current_user().times(1).returning(|_| {
            Ok(Some(Identity {
                id: "user-1".to_string(),
                email: Some("owner@acme.test".to_string()),
            }))
        });

        let outcome = gate(provider, profiles_with(Role::Owner))
            .authorize(Some(&credential()), "/")
            .await;

        assert!(matches!(
            outcome.decision,
            AuthDecision::Authorized(AuthorizedIdentity {
                role: Role::Owner,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_unknown_current_user_clears_credential() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_get_session()
            .returning(|_| Ok(Some(live_session(None))));
        provider.expect_get_current_user().returning(|_| Ok(None));

        let outcome = gate(provider, MockProfileRepository::new())
            .authorize(Some(&credential()), "/")
            .await;

        assert_eq!(outcome.decision, AuthDecision::Anonymous);
        assert_eq!(outcome.credential, Some(CredentialUpdate::Clear));
    }

    #[tokio::test]
    async fn test_expired_session_refreshes_once() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_get_session()
            .times(1)
            .returning(|_| Ok(Some(expired_session())));
        provider
            .expect_refresh_session()
            .with(eq("refresh-1"))
            .times(1)
            .returning(|_| {
                Ok(Some((
                    live_session(Some("user-1")),
                    Credential::new("access-2", Some("refresh-2".to_string())),
                )))
            });

        let outcome = gate(provider, profiles_with(Role::Member))
            .authorize(Some(&credential()), "/dashboard")
            .await;

        assert!(matches!(outcome.decision, AuthDecision::Authorized(_)));
        assert_eq!(
            outcome.credential,
            Some(CredentialUpdate::Set(Credential::new(
                "access-2",
                Some("refresh-2".to_string())
            )))
        );
    }

    #[tokio::test]
    async fn test_unknown_session_refreshes() {
        let mut provider = MockIdentityProvider::new();
        provider.expect_get_session().returning(|_| Ok(None));
        provider.expect_refresh_session().times(1).returning(|_| {
            Ok(Some((
                live_session(Some("user-1")),
                Credential::new("access-2", None),
            )))
        });

        let outcome = gate(provider, profiles_with(Role::General))
            .authorize(Some(&credential()), "/dashboard")
            .await;

        assert_eq!(outcome.decision, AuthDecision::AuthenticatedGeneral);
        assert!(matches!(outcome.credential, Some(CredentialUpdate::Set(_))));
    }

    #[tokio::test]
    async fn test_rejected_refresh_clears_credential() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_get_session()
            .returning(|_| Ok(Some(expired_session())));
        provider.expect_refresh_session().returning(|_| Ok(None));

        let outcome = gate(provider, MockProfileRepository::new())
            .authorize(Some(&credential()), "/dashboard")
            .await;

        assert_eq!(outcome.decision, AuthDecision::Anonymous);
        assert_eq!(outcome.credential, Some(CredentialUpdate::Clear));
    }

    #[tokio::test]
    async fn test_expired_without_refresh_token_clears_credential() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_get_session()
            .returning(|_| Ok(Some(expired_session())));
        provider.expect_refresh_session().never();

        let outcome = gate(provider, MockProfileRepository::new())
            .authorize(Some(&Credential::new("access-1", None)), "/dashboard")
            .await;

        assert_eq!(outcome.decision, AuthDecision::Anonymous);
        assert_eq!(outcome.credential, Some(CredentialUpdate::Clear));
    }

    #[tokio::test]
    async fn test_provider_error_is_session_invalid() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_get_session()
            .returning(|_| Err(IdentityError::Unavailable("503".to_string())));
        provider.expect_refresh_session().never();

        let outcome = gate(provider, MockProfileRepository::new())
            .authorize(Some(&credential()), "/dashboard")
            .await;

        assert_eq!(outcome.decision, AuthDecision::SessionInvalid);
        assert!(outcome.credential.is_none());
    }

    #[tokio::test]
    async fn test_refresh_error_is_session_invalid() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_get_session()
            .returning(|_| Ok(Some(expired_session())));
        provider
            .expect_refresh_session()
            .returning(|_| Err(IdentityError::Timeout));

        let outcome = gate(provider, MockProfileRepository::new())
            .authorize(Some(&credential()), "/dashboard")
            .await;

        assert_eq!(outcome.decision, AuthDecision::SessionInvalid);
        assert!(outcome.credential.is_none());
    }

    #[tokio::test]
    async fn test_profile_error_keeps_refreshed_credential() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_get_session()
            .returning(|_| Ok(Some(expired_session())));
        provider.expect_refresh_session().returning(|_| {
            Ok(Some((
                live_session(Some("user-1")),
                Credential::new("access-2", Some("refresh-2".to_string())),
            )))
        });
        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_find_by_identity()
            .returning(|_| Err(AppError::Internal(anyhow::anyhow!("pool closed"))));

        let outcome = gate(provider, profiles)
            .authorize(Some(&credential()), "/dashboard")
            .await;

        assert_eq!(outcome.decision, AuthDecision::SessionInvalid);
        assert!(matches!(outcome.credential, Some(CredentialUpdate::Set(_))));
    }

    struct SlowProvider;

    #[async_trait]
    impl IdentityProvider for SlowProvider {
        async fn get_session(&self, _credential: &Credential) -> IdentityResult<Option<Session>> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(Some(live_session(Some("user-1"))))
        }

        async fn get_current_user(
            &self,
            _credential: &Credential,
        ) -> IdentityResult<Option<Identity>> {
            Ok(None)
        }

        async fn refresh_session(
            &self,
            _refresh_token: &str,
        ) -> IdentityResult<Option<(Session, Credential)>> {
            Ok(None)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out() {
        let outcome = gate(SlowProvider, MockProfileRepository::new())
            .authorize(Some(&credential()), "/dashboard")
            .await;

        assert_eq!(outcome.decision, AuthDecision::SessionInvalid);
        assert!(outcome.credential.is_none());
    }

    #[test]
    fn test_decision_labels() {
        assert_eq!(AuthDecision::Anonymous.as_str(), "anonymous");
        assert_eq!(AuthDecision::SessionInvalid.as_str(), "session_invalid");
    }
}
