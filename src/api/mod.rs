//! The API layer: routing, middleware, extractors and error translation.

pub mod error_mapping;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod security;

pub use error_mapping::{Dispatch, RULES, dispatch};
pub use extract::{AppPath, AppQuery, CurrentActor, MaybePrincipal, ValidatedJson};
pub use router::{build_router, create_router, create_router_with_rate_limit};
pub use security::{OriginPattern, cors_layer, is_public_path};
