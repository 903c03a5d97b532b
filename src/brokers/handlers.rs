// HTTP handlers for broker endpoints

use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header, StatusCode},
    Json,
};

use crate::brokers::{BrokerResponse, CreateBrokerRequest, UpdateBrokerRequest};
use crate::error::ApiError;
use crate::forms::read_form;
use crate::AppState;

/// Multipart field carrying the profile picture on create
pub const BROKER_PICTURE_FIELD: &str = "picture";

/// Multipart field carrying a replacement profile picture on update
pub const BROKER_PROFILE_PICTURE_FIELD: &str = "profilePicture";

fn broker_id(raw: &str) -> Result<i32, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid broker ID"))
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim_start().starts_with("multipart/form-data"))
}

/// Handler for GET /brokers
#[utoipa::path(
    get,
    path = "/brokers",
    responses(
        (status = 200, description = "Brokers with nested records", body = [BrokerResponse]),
        (status = 403, description = "Role not allowed")
    ),
    security(("bearer" = [])),
    tag = "brokers"
)]
pub async fn list_brokers_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<BrokerResponse>>, ApiError> {
    let brokers = state.broker_service.list().await?;
    Ok(Json(brokers))
}

/// Handler for POST /brokers
/// Accepts a JSON body, or multipart fields with arrays as JSON strings and
/// an optional `picture` file
#[utoipa::path(
    post,
    path = "/brokers",
    request_body = CreateBrokerRequest,
    responses(
        (status = 201, description = "Broker created", body = BrokerResponse),
        (status = 400, description = "Validation failed or email taken")
    ),
    security(("bearer" = [])),
    tag = "brokers"
)]
pub async fn create_broker_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<(StatusCode, Json<BrokerResponse>), ApiError> {
    let (body, picture) = if is_multipart(&request) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        let mut form = read_form(multipart, BROKER_PICTURE_FIELD, 1).await?;
        let picture = form.files.pop();
        (CreateBrokerRequest::from_form(form)?, picture)
    } else {
        let Json(body) = Json::<CreateBrokerRequest>::from_request(request, &state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        (body, None)
    };

    let broker = state.broker_service.create(body, picture).await?;
    Ok((StatusCode::CREATED, Json(broker)))
}

/// Handler for PUT /brokers/:id
/// Accepts a JSON body, or multipart fields with an optional `profilePicture`
/// file that replaces the stored picture
#[utoipa::path(
    put,
    path = "/brokers/{id}",
    params(("id" = i32, Path, description = "Broker ID")),
    request_body = UpdateBrokerRequest,
    responses(
        (status = 200, description = "Broker updated", body = BrokerResponse),
        (status = 400, description = "Invalid broker ID, validation failed or email taken"),
        (status = 403, description = "Role not allowed"),
        (status = 404, description = "Broker not found")
    ),
    security(("bearer" = [])),
    tag = "brokers"
)]
pub async fn update_broker_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<BrokerResponse>, ApiError> {
    let id = broker_id(&id)?;

    let (body, picture) = if is_multipart(&request) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        let mut form = read_form(multipart, BROKER_PROFILE_PICTURE_FIELD, 1).await?;
        let picture = form.files.pop();
        (UpdateBrokerRequest::from_form(form)?, picture)
    } else {
        let Json(body) = Json::<UpdateBrokerRequest>::from_request(request, &state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        (body, None)
    };

    let broker = state.broker_service.update(id, body, picture).await?;
    Ok(Json(broker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_id_parsing() {
        assert_eq!(broker_id("5").unwrap(), 5);
        for bad in ["x", "", "-"] {
            assert_eq!(broker_id(bad).unwrap_err().status_code(), StatusCode::BAD_REQUEST);
        }
    }
}
