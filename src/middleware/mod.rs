// Middleware modules
pub mod jwt_auth;

// Export JWT auth middleware components
pub use jwt_auth::{jwt_auth_middleware, ActorIdentity};
