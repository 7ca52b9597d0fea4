//! Domain models shared by the router, the identity gate and the serving shell

pub mod profile;
pub mod routing;
pub mod session;
pub mod tenant;

pub use profile::{Role, UserProfile};
pub use routing::{
    AuthorizedIdentity, RequestContext, RouteArea, RouteOutcome, RoutingDecision,
};
pub use session::{Credential, CredentialUpdate, Identity, Session};
pub use tenant::TenantDescriptor;
