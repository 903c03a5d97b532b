// Authentication and authorization middleware for protected routes

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::auth::{
    error::AuthError,
    models::{AccountKind, Role},
    token::{Claims, TokenService},
};

/// Identity attached to a request by [`authenticate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub role: Role,
    pub kind: AccountKind,
}

impl AuthenticatedUser {
    pub fn is_broker(&self) -> bool {
        self.kind == AccountKind::BrokerAccount
    }
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.id,
            role: claims.role,
            kind: claims.kind,
        }
    }
}

/// Reads the identity placed in request extensions by [`authenticate`].
///
/// Tokens are decoded in exactly one place; handlers never parse headers.
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

/// Extract the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidToken)
}

/// Authentication middleware: verifies the bearer token and attaches the
/// decoded identity to the request. Rejects with 401 on any failure.
pub async fn authenticate(
    State(tokens): State<Arc<TokenService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let endpoint = request.uri().path().to_string();

    let claims = bearer_token(request.headers())
        .and_then(|token| tokens.verify(token))
        .map_err(|err| {
            warn!("Authentication failed for {}: {}", endpoint, err);
            err
        })?;

    let user = AuthenticatedUser::from(claims);
    debug!(
        "Authenticated account {} ({}) for {}",
        user.id, user.role, endpoint
    );
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Authorization middleware that requires one of a fixed set of roles
///
/// Must be layered inside [`authenticate`]. A request without an attached
/// identity is rejected with 403.
#[derive(Debug, Clone, Copy)]
pub struct RequireRole {
    allowed: &'static [Role],
}

impl RequireRole {
    /// Allow any role in `allowed`
    pub const fn any_of(allowed: &'static [Role]) -> Self {
        Self { allowed }
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed.contains(&role)
    }

    /// Middleware function that validates role-based access
    pub async fn middleware(self, request: Request, next: Next) -> Result<Response, AuthError> {
        let endpoint = request.uri().path().to_string();

        let user = request
            .extensions()
            .get::<AuthenticatedUser>()
            .ok_or_else(|| {
                warn!("Authorization without identity for endpoint: {}", endpoint);
                AuthError::MissingIdentity
            })?;

        if !self.allows(user.role) {
            warn!(
                "Authorization failed: account_id={}, role={}, allowed={:?}, endpoint={}",
                user.id, user.role, self.allowed, endpoint
            );
            return Err(AuthError::InsufficientPermissions { actual: user.role });
        }

        debug!(
            "Authorization successful: account_id={}, role={}, endpoint={}",
            user.id, user.role, endpoint
        );
        Ok(next.run(request).await)
    }
}
