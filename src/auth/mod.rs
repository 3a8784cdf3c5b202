pub mod cookies;
pub mod handlers;
pub mod middleware;
pub mod token;

pub use middleware::require_auth;
pub use token::{Claims, TokenError, TokenKeys};
