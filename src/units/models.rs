use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::clients::Client;
use crate::error::ApiError;
use crate::forms::FormData;
use crate::units::parse::{parse_decimal_lenient, parse_int_lenient};

/// Status given to a unit created without one
pub const DEFAULT_UNIT_STATUS: &str = "available";

/// Status counted as occupied in the statistics summary
pub const OCCUPIED_STATUS: &str = "occupied";

/// Unit row as stored in the database
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Unit {
    pub id: i32,
    pub unit_type: String,
    pub room_no: String,
    pub size: Option<String>,
    pub floor: Option<i32>,
    pub price: Option<Decimal>,
    pub installment_per_month: Option<Decimal>,
    pub unit_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Image attached to a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnitPicture {
    pub id: i32,
    pub unit_id: i32,
    /// Relative path, `uploads/<filename>`
    pub image_path: String,
}

/// Unit with its pictures and related clients
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnitResponse {
    pub id: i32,
    pub unit_type: String,
    pub room_no: String,
    pub size: Option<String>,
    pub floor: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub installment_per_month: Option<Decimal>,
    pub unit_status: String,
    pub unit_pictures: Vec<UnitPicture>,
    pub clients: Vec<Client>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UnitResponse {
    pub fn new(unit: Unit, unit_pictures: Vec<UnitPicture>, clients: Vec<Client>) -> Self {
        Self {
            id: unit.id,
            unit_type: unit.unit_type,
            room_no: unit.room_no,
            size: unit.size,
            floor: unit.floor,
            price: unit.price,
            installment_per_month: unit.installment_per_month,
            unit_status: unit.unit_status,
            unit_pictures,
            clients,
            created_at: unit.created_at,
            updated_at: unit.updated_at,
        }
    }
}

/// Column values written on insert or update
#[derive(Debug, Clone, PartialEq)]
pub struct UnitValues {
    pub unit_type: String,
    pub room_no: String,
    pub size: Option<String>,
    pub floor: Option<i32>,
    pub price: Option<Decimal>,
    pub installment_per_month: Option<Decimal>,
    pub unit_status: String,
}

/// Raw text fields of a unit form; `None` means the field was not sent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitFields {
    pub unit_type: Option<String>,
    pub room_no: Option<String>,
    pub size: Option<String>,
    pub floor: Option<String>,
    pub price: Option<String>,
    pub installment_per_month: Option<String>,
    pub unit_status: Option<String>,
}

impl UnitFields {
    /// Take the unit fields out of a multipart form
    pub fn from_form(form: &mut FormData) -> Self {
        Self {
            unit_type: form.take("unitType"),
            room_no: form.take("roomNo"),
            size: form.take("size"),
            floor: form.take("floor"),
            price: form.take("price"),
            installment_per_month: form.take("installmentPerMonth"),
            unit_status: form.take("unitStatus"),
        }
    }

    /// Values for a new unit. `unitType` and `roomNo` are required.
    pub fn into_values(self) -> Result<UnitValues, ApiError> {
        let unit_type = non_blank(self.unit_type);
        let room_no = non_blank(self.room_no);
        let (Some(unit_type), Some(room_no)) = (unit_type, room_no) else {
            return Err(ApiError::bad_request("unitType and roomNo are required"));
        };

        Ok(UnitValues {
            unit_type,
            room_no,
            size: non_blank(self.size),
            floor: self.floor.as_deref().and_then(parse_int_lenient),
            price: money("price", self.price.as_deref())?,
            installment_per_month: money(
                "installmentPerMonth",
                self.installment_per_month.as_deref(),
            )?,
            unit_status: non_blank(self.unit_status)
                .unwrap_or_else(|| DEFAULT_UNIT_STATUS.to_string()),
        })
    }

    /// Merge the sent fields over `existing`.
    ///
    /// Absent fields keep their stored value. A sent numeric field that does
    /// not parse clears the column.
    pub fn merge_into(self, existing: &Unit) -> Result<UnitValues, ApiError> {
        let unit_type = match self.unit_type {
            Some(value) => non_blank(Some(value))
                .ok_or_else(|| ApiError::bad_request("unitType cannot be empty"))?,
            None => existing.unit_type.clone(),
        };
        let room_no = match self.room_no {
            Some(value) => non_blank(Some(value))
                .ok_or_else(|| ApiError::bad_request("roomNo cannot be empty"))?,
            None => existing.room_no.clone(),
        };

        Ok(UnitValues {
            unit_type,
            room_no,
            size: match self.size {
                Some(value) => non_blank(Some(value)),
                None => existing.size.clone(),
            },
            floor: match self.floor {
                Some(value) => parse_int_lenient(&value),
                None => existing.floor,
            },
            price: match self.price {
                Some(value) => money("price", Some(&value))?,
                None => existing.price,
            },
            installment_per_month: match self.installment_per_month {
                Some(value) => money("installmentPerMonth", Some(&value))?,
                None => existing.installment_per_month,
            },
            unit_status: non_blank(self.unit_status).unwrap_or_else(|| existing.unit_status.clone()),
        })
    }
}

/// Money columns are NUMERIC(14, 2)
const MONEY_INTEGER_DIGITS: u32 = 12;

/// Parse a money field leniently, rounded to cents.
/// A number too large for the column is a 400, not a NULL.
fn money(field: &str, value: Option<&str>) -> Result<Option<Decimal>, ApiError> {
    let Some(amount) = value.and_then(parse_decimal_lenient) else {
        return Ok(None);
    };
    let amount = amount.round_dp(2);
    if amount.abs() >= Decimal::from(10_i64.pow(MONEY_INTEGER_DIGITS)) {
        return Err(ApiError::bad_request(format!("{} is too large", field)));
    }
    Ok(Some(amount))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Occupied units on one floor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct FloorOccupancy {
    pub floor: Option<i32>,
    pub occupied: i64,
}

/// Occupancy summary for the statistics dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnitStats {
    pub total: i64,
    pub occupied: i64,
    pub available: i64,
    pub occupied_by_floor: Vec<FloorOccupancy>,
}

/// Body returned after a unit is deleted
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
