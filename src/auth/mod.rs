//! Password hashing, session tokens and the request-level authentication layer.

pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

pub use extractors::AuthenticatedUser;
pub use middleware::{AuthMiddleware, TOKEN_COOKIE};
pub use password::{hash_password, verify_password};
pub use token::{Claims, Identity, TokenIssuer};
