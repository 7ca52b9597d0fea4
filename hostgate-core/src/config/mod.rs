//! Configuration management for Hostgate Core

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::routing::host::is_valid_label;
use crate::routing::path::is_under;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Host/path routing configuration
    pub routing: RoutingConfig,
    /// Identity provider configuration
    pub identity: IdentityConfig,
    /// Session cookie configuration
    pub session_cookie: SessionCookieConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Redis configuration
    pub redis: RedisConfig,
    /// Rendering upstream configuration
    pub upstream: UpstreamConfig,
    /// Telemetry configuration
    pub telemetry: TelemetryConfig,
}

/// Deployment environment; governs URL schemes and cookie security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn scheme(&self) -> &'static str {
        match self {
            Environment::Production => "https",
            Environment::Development => "http",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" => Ok(Environment::Development),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Development => write!(f, "development"),
        }
    }
}

/// Paths exempt from authentication on the application host.
///
/// Entries ending in `/` are reserved public prefixes; any other entry is a
/// named utility path matched on segment boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicPaths {
    entries: Vec<String>,
}

impl PublicPaths {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

impl Default for PublicPaths {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLIC_PATHS.iter().copied())
    }
}

const DEFAULT_PUBLIC_PATHS: &[&str] = &[
    "/login",
    "/forgot-password",
    "/reset-password",
    "/auth/callback",
    "/p/",
];

const DEFAULT_PASSTHROUGH_PREFIXES: &[&str] =
    &["/health", "/ready", "/metrics", "/_static/", "/favicon.ico"];

#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// Deployment apex, e.g. `example.com`
    pub root_domain: String,
    pub environment: Environment,
    pub public_paths: PublicPaths,
    /// Label of the reserved application host (`app` → `app.example.com`)
    pub app_subdomain: String,
    pub login_path: String,
    pub home_path: String,
    pub portal_prefix: String,
    /// Internal route prefix for the application host
    pub app_route_prefix: String,
    /// Internal route prefix for the apex/marketing host
    pub marketing_route_prefix: String,
    /// Absolute base URL for cross-host redirects into the application host
    pub app_base_url: String,
    /// Registered custom domains that route as tenants
    pub custom_domains: HashSet<String>,
    /// Preview deployment host suffix (`<label>---<branch>.<suffix>`)
    pub preview_deployment_suffix: Option<String>,
    /// Paths served as-is without routing
    pub passthrough_prefixes: Vec<String>,
}

impl RoutingConfig {
    /// Build a routing config with defaults for everything except the root
    /// domain and environment.
    pub fn new(root_domain: impl Into<String>, environment: Environment) -> Self {
        let root_domain = root_domain.into().trim().to_lowercase();
        let app_subdomain = "app".to_string();
        let app_base_url = default_app_base_url(&root_domain, &app_subdomain, environment, 3000);
        Self {
            root_domain,
            environment,
            public_paths: PublicPaths::default(),
            app_subdomain,
            login_path: "/login".to_string(),
            home_path: "/".to_string(),
            portal_prefix: "/portal".to_string(),
            app_route_prefix: "/app".to_string(),
            marketing_route_prefix: "/home".to_string(),
            app_base_url,
            custom_domains: HashSet::new(),
            preview_deployment_suffix: None,
            passthrough_prefixes: DEFAULT_PASSTHROUGH_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Fully qualified reserved application host, e.g. `app.example.com`
    pub fn app_host(&self) -> String {
        format!("{}.{}", self.app_subdomain, self.root_domain)
    }

    /// Absolute URL of the portal root on the application host
    pub fn portal_url(&self) -> String {
        format!(
            "{}{}",
            self.app_base_url.trim_end_matches('/'),
            self.portal_prefix
        )
    }

    /// Reject configurations that would let a pass-through path reach an
    /// internal namespace without routing.
    pub fn validate(&self) -> Result<()> {
        if self.root_domain.is_empty() {
            bail!("ROOT_DOMAIN must not be empty");
        }
        for (name, value) in [
            ("LOGIN_PATH", &self.login_path),
            ("HOME_PATH", &self.home_path),
            ("PORTAL_PREFIX", &self.portal_prefix),
            ("APP_ROUTE_PREFIX", &self.app_route_prefix),
            ("MARKETING_ROUTE_PREFIX", &self.marketing_route_prefix),
        ] {
            if !value.starts_with('/') {
                bail!("{} must start with '/': {}", name, value);
            }
        }
        for prefix in &self.passthrough_prefixes {
            if !prefix.starts_with('/') {
                bail!("PASSTHROUGH_PREFIXES entry must start with '/': {}", prefix);
            }
            for internal in [&self.app_route_prefix, &self.marketing_route_prefix] {
                let internal = internal.trim_end_matches('/');
                if prefix == "/"
                    || prefix.trim_end_matches('/') == internal
                    || prefix.starts_with(&format!("{}/", internal))
                {
                    bail!(
                        "PASSTHROUGH_PREFIXES entry {} overlaps internal prefix {}",
                        prefix,
                        internal
                    );
                }
            }
        }
        let app_host = self.app_host();
        for domain in &self.custom_domains {
            if !domain.contains('.') || !domain.split('.').all(is_valid_label) {
                bail!("CUSTOM_DOMAINS entry must be a dotted hostname: {}", domain);
            }
            if *domain == self.root_domain || *domain == app_host {
                bail!("CUSTOM_DOMAINS entry {} shadows a reserved host", domain);
            }
            let namespace = format!("/{}", domain);
            for internal in [&self.app_route_prefix, &self.marketing_route_prefix] {
                if is_under(&namespace, internal) {
                    bail!(
                        "CUSTOM_DOMAINS entry {} overlaps internal prefix {}",
                        domain,
                        internal
                    );
                }
            }
        }
        Ok(())
    }
}

fn default_app_base_url(
    root_domain: &str,
    app_subdomain: &str,
    environment: Environment,
    http_port: u16,
) -> String {
    match environment {
        Environment::Production => format!("https://{}.{}", app_subdomain, root_domain),
        Environment::Development => format!("http://{}.localhost:{}", app_subdomain, http_port),
    }
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Identity provider base URL
    pub url: String,
    /// Optional project key sent as the `apikey` header
    pub api_key: Option<String>,
    /// Bound applied to every provider call
    pub timeout: Duration,
    /// Sessions expiring within this window are refreshed
    pub refresh_skew: Duration,
}

#[derive(Debug, Clone)]
pub struct SessionCookieConfig {
    pub name: String,
    pub domain: Option<String>,
    pub max_age_secs: i64,
    pub secure: bool,
}

impl Default for SessionCookieConfig {
    fn default() -> Self {
        Self {
            name: "hostgate-session".to_string(),
            domain: None,
            max_age_secs: 604800,
            secure: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    /// Whether tenant descriptors are cached in Redis
    pub tenant_cache_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the rendering service receiving rewritten requests
    pub url: String,
    pub timeout: Duration,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub metrics_enabled: bool,
    pub tracing_enabled: bool,
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
    /// "text" or "json"
    pub log_format: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            tracing_enabled: false,
            otlp_endpoint: None,
            service_name: "hostgate".to_string(),
            log_format: "text".to_string(),
        }
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Parse a numeric variable, falling back to `default` only when unset.
fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", name)),
        Err(_) => Ok(default),
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|s| s.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let http_port: u16 = env_parse("HTTP_PORT", 8080)?;

        let environment: Environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "production".to_string())
            .parse()
            .map_err(anyhow::Error::msg)
            .context("Invalid ENVIRONMENT")?;

        let routing = {
            let root_domain = env::var("ROOT_DOMAIN").context("ROOT_DOMAIN is required")?;
            let mut routing = RoutingConfig::new(root_domain, environment);

            if let Ok(paths) = env::var("PUBLIC_PATHS") {
                routing.public_paths = PublicPaths::new(parse_list(&paths));
            }
            if let Ok(label) = env::var("APP_SUBDOMAIN") {
                routing.app_subdomain = label.trim().to_lowercase();
            }
            if let Ok(path) = env::var("LOGIN_PATH") {
                routing.login_path = path;
            }
            if let Ok(path) = env::var("HOME_PATH") {
                routing.home_path = path;
            }
            if let Ok(prefix) = env::var("PORTAL_PREFIX") {
                routing.portal_prefix = prefix;
            }
            if let Ok(prefix) = env::var("APP_ROUTE_PREFIX") {
                routing.app_route_prefix = prefix;
            }
            if let Ok(prefix) = env::var("MARKETING_ROUTE_PREFIX") {
                routing.marketing_route_prefix = prefix;
            }
            routing.app_base_url = env::var("APP_BASE_URL").unwrap_or_else(|_| {
                default_app_base_url(
                    &routing.root_domain,
                    &routing.app_subdomain,
                    environment,
                    http_port,
                )
            });
            routing.custom_domains = env::var("CUSTOM_DOMAINS")
                .map(|s| parse_list(&s).into_iter().map(|d| d.to_lowercase()).collect())
                .unwrap_or_default();
            routing.preview_deployment_suffix = env::var("PREVIEW_DEPLOYMENT_SUFFIX")
                .ok()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty());
            if let Ok(prefixes) = env::var("PASSTHROUGH_PREFIXES") {
                routing.passthrough_prefixes = parse_list(&prefixes);
            }

            routing.validate()?;
            routing
        };

        Ok(Self {
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port,
            routing,
            identity: IdentityConfig {
                url: env::var("IDENTITY_URL").context("IDENTITY_URL is required")?,
                api_key: env::var("IDENTITY_API_KEY").ok().filter(|s| !s.is_empty()),
                timeout: Duration::from_millis(
                    env_parse("IDENTITY_TIMEOUT_MS", 1500)?,
                ),
                refresh_skew: Duration::from_secs(
                    env_parse("IDENTITY_REFRESH_SKEW_SECS", 30)?,
                ),
            },
            session_cookie: SessionCookieConfig {
                name: env::var("SESSION_COOKIE_NAME")
                    .unwrap_or_else(|_| "hostgate-session".to_string()),
                domain: env::var("SESSION_COOKIE_DOMAIN")
                    .ok()
                    .filter(|s| !s.is_empty()),
                max_age_secs: env_parse("SESSION_COOKIE_MAX_AGE_SECS", 604800)?,
                secure: environment.is_production(),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10)?,
                min_connections: env_parse("DATABASE_MIN_CONNECTIONS", 2)?,
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
                tenant_cache_enabled: env_bool("TENANT_CACHE_ENABLED", true),
            },
            upstream: UpstreamConfig {
                url: env::var("UPSTREAM_URL").context("UPSTREAM_URL is required")?,
                timeout: Duration::from_secs(
                    env_parse("UPSTREAM_TIMEOUT_SECS", 30)?,
                ),
                max_body_bytes: env_parse("UPSTREAM_MAX_BODY_BYTES", 10 * 1024 * 1024)?,
            },
            telemetry: TelemetryConfig {
                metrics_enabled: env_bool("METRICS_ENABLED", true),
                tracing_enabled: env_bool("OTEL_TRACING_ENABLED", false),
                otlp_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
                service_name: env::var("OTEL_SERVICE_NAME")
                    .unwrap_or_else(|_| "hostgate".to_string()),
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
            },
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}
