// HTTP handlers for unit endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};

use crate::error::ApiError;
use crate::forms::read_form;
use crate::units::{
    parse::parse_id_list, MessageResponse, UnitFields, UnitResponse, UnitStats,
};
use crate::AppState;

/// Multipart field carrying unit images
pub const UNIT_IMAGES_FIELD: &str = "unitImages";

/// Most images accepted in one request
pub const MAX_UNIT_IMAGES: usize = 10;

fn unit_id(raw: &str) -> Result<i32, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid unit ID"))
}

/// Handler for GET /units
#[utoipa::path(
    get,
    path = "/units",
    responses(
        (status = 200, description = "All units, newest first", body = [UnitResponse]),
        (status = 401, description = "Missing, invalid or expired token"),
        (status = 403, description = "Role not allowed")
    ),
    security(("bearer" = [])),
    tag = "units"
)]
pub async fn list_units_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<UnitResponse>>, ApiError> {
    let units = state.unit_service.list().await?;
    Ok(Json(units))
}

/// Handler for GET /units/:id
#[utoipa::path(
    get,
    path = "/units/{id}",
    params(("id" = i32, Path, description = "Unit ID")),
    responses(
        (status = 200, description = "Unit found", body = UnitResponse),
        (status = 400, description = "Invalid unit ID"),
        (status = 404, description = "Unit not found")
    ),
    security(("bearer" = [])),
    tag = "units"
)]
pub async fn get_unit_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UnitResponse>, ApiError> {
    let unit = state.unit_service.get(unit_id(&id)?).await?;
    Ok(Json(unit))
}

/// Handler for POST /units
/// Multipart form with unit fields and up to ten `unitImages` files
#[utoipa::path(
    post,
    path = "/units",
    request_body(content = String, content_type = "multipart/form-data", description = "unitType, roomNo, size, floor, price, installmentPerMonth, unitStatus and unitImages files"),
    responses(
        (status = 201, description = "Unit created", body = UnitResponse),
        (status = 400, description = "Missing required fields or too many files"),
        (status = 403, description = "Role not allowed")
    ),
    security(("bearer" = [])),
    tag = "units"
)]
pub async fn create_unit_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UnitResponse>), ApiError> {
    let mut form = read_form(multipart, UNIT_IMAGES_FIELD, MAX_UNIT_IMAGES).await?;
    let fields = UnitFields::from_form(&mut form);

    let unit = state.unit_service.create(fields, form.files).await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

/// Handler for PUT /units/:id
/// Partial update; `deletedImages` is a JSON array of picture ids to drop
#[utoipa::path(
    put,
    path = "/units/{id}",
    params(("id" = i32, Path, description = "Unit ID")),
    request_body(content = String, content_type = "multipart/form-data", description = "Any unit field, new unitImages files and deletedImages"),
    responses(
        (status = 200, description = "Unit updated", body = UnitResponse),
        (status = 400, description = "Invalid unit ID or form"),
        (status = 404, description = "Unit not found")
    ),
    security(("bearer" = [])),
    tag = "units"
)]
pub async fn update_unit_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<UnitResponse>, ApiError> {
    let id = unit_id(&id)?;
    let mut form = read_form(multipart, UNIT_IMAGES_FIELD, MAX_UNIT_IMAGES).await?;
    let deleted = parse_id_list(form.take("deletedImages").as_deref());
    let fields = UnitFields::from_form(&mut form);

    let unit = state
        .unit_service
        .update(id, fields, form.files, deleted)
        .await?;
    Ok(Json(unit))
}

/// Handler for DELETE /units/:id
#[utoipa::path(
    delete,
    path = "/units/{id}",
    params(("id" = i32, Path, description = "Unit ID")),
    responses(
        (status = 200, description = "Unit deleted", body = MessageResponse),
        (status = 400, description = "Invalid unit ID"),
        (status = 404, description = "Unit not found")
    ),
    security(("bearer" = [])),
    tag = "units"
)]
pub async fn delete_unit_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.unit_service.delete(unit_id(&id)?).await?;
    Ok(Json(MessageResponse {
        message: "Unit deleted successfully".to_string(),
    }))
}

/// Handler for GET /units/stats
#[utoipa::path(
    get,
    path = "/units/stats",
    responses(
        (status = 200, description = "Occupancy summary", body = UnitStats),
        (status = 403, description = "Role not allowed")
    ),
    security(("bearer" = [])),
    tag = "units"
)]
pub async fn unit_stats_handler(
    State(state): State<AppState>,
) -> Result<Json<UnitStats>, ApiError> {
    let stats = state.unit_service.stats().await?;
    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_id_parsing() {
        assert_eq!(unit_id("12").unwrap(), 12);
        assert_eq!(unit_id(" 7 ").unwrap(), 7);
        for bad in ["abc", "1.5", "", "99999999999"] {
            assert_eq!(unit_id(bad).unwrap_err().status_code(), StatusCode::BAD_REQUEST);
        }
    }
}
