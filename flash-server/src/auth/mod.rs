//! JWT 认证

pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, CurrentUser, JwtService};
pub use middleware::require_auth;
