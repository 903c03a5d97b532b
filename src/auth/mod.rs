// Authentication module
// JWT-based login, token verification and role-gated route middleware

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use handlers::{login_handler, me_handler};
pub use middleware::{authenticate, AuthenticatedUser, RequireRole};
pub use models::{AccountKind, AccountResponse, LoginRequest, LoginResponse, Role, SessionResponse};
pub use password::PasswordService;
pub use repository::AccountRepository;
pub use service::AuthService;
pub use token::TokenService;
