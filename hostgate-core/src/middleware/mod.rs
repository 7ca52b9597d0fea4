//! HTTP middleware
//!
//! - Edge routing (host/path/session → redirect, rewrite or pass-through)
//! - Dot-segment guard
//! - Request ID propagation and HTTP metrics
//! - Sanitized request spans

pub mod edge;
pub mod metrics;
pub mod path_guard;
pub mod trace;

pub use edge::{edge_router_middleware, EdgeState};
pub use metrics::ObservabilityLayer;
pub use path_guard::path_guard_middleware;
pub use trace::SanitizedMakeSpan;
