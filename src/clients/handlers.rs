// HTTP handlers for client endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::auth::AuthenticatedUser;
use crate::clients::{Client, CreateClientRequest};
use crate::error::ApiError;
use crate::AppState;

/// Handler for GET /clients
#[utoipa::path(
    get,
    path = "/clients",
    responses(
        (status = 200, description = "Clients visible to the caller", body = [Client]),
        (status = 403, description = "Role not allowed")
    ),
    security(("bearer" = [])),
    tag = "clients"
)]
pub async fn list_clients_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Client>>, ApiError> {
    let clients = state.client_service.list(&user).await?;
    Ok(Json(clients))
}

/// Handler for POST /clients
#[utoipa::path(
    post,
    path = "/clients",
    request_body = CreateClientRequest,
    responses(
        (status = 201, description = "Client created", body = Client),
        (status = 400, description = "Validation failed or email taken")
    ),
    security(("bearer" = [])),
    tag = "clients"
)]
pub async fn create_client_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    let client = state.client_service.create(&user, request).await?;
    Ok((StatusCode::CREATED, Json(client)))
}
