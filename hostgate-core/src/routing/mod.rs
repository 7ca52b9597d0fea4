//! Host and path based request routing

pub mod gate;
pub mod host;
pub mod path;
pub mod router;

pub use gate::{AuthDecision, GateOutcome, IdentityGate};
pub use host::{classify_host, normalize_host, HostClass};
pub use path::{classify_path, PathClass};
pub use router::EdgeRouter;
