use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::ApiError;
use crate::forms::FormData;
use crate::validation::validate_not_blank;

/// Broker row without the password hash
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Broker {
    pub id: i32,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub birth_date: Option<String>,
    pub home_address: Option<String>,
    pub email: String,
    pub employer_name: Option<String>,
    pub position: Option<String>,
    pub business_address: Option<String>,
    pub brokers_license: Option<String>,
    pub tin: Option<String>,
    pub primary_contact: Option<String>,
    pub viber: Option<String>,
    pub whatsapp: Option<String>,
    pub messenger: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_no: Option<String>,
    pub emergency_relationship: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BrokerPicture {
    pub id: i32,
    pub broker_id: i32,
    pub image_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CharacterReference {
    pub id: i32,
    pub broker_id: i32,
    pub name: String,
    pub relationship: Option<String>,
    pub contact_no: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EducationBackground {
    pub id: i32,
    pub broker_id: i32,
    pub high_school: Option<String>,
    pub high_school_year: Option<String>,
    pub college: Option<String>,
    pub college_year: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Seminar {
    pub id: i32,
    pub broker_id: i32,
    pub title: String,
    pub date: Option<String>,
    pub venue: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesExperience {
    pub id: i32,
    pub broker_id: i32,
    pub company: String,
    pub position: Option<String>,
    pub years: Option<String>,
}

/// Broker with every nested collection; never carries the password
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BrokerResponse {
    pub id: i32,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub birth_date: Option<String>,
    pub home_address: Option<String>,
    pub email: String,
    pub employer_name: Option<String>,
    pub position: Option<String>,
    pub business_address: Option<String>,
    pub brokers_license: Option<String>,
    pub tin: Option<String>,
    pub primary_contact: Option<String>,
    pub viber: Option<String>,
    pub whatsapp: Option<String>,
    pub messenger: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_no: Option<String>,
    pub emergency_relationship: Option<String>,
    pub broker_pictures: Vec<BrokerPicture>,
    pub character_references: Vec<CharacterReference>,
    pub educ_backgrounds: Vec<EducationBackground>,
    pub seminars: Vec<Seminar>,
    pub sales_experiences: Vec<SalesExperience>,
    pub client_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Child rows of one broker
#[derive(Debug, Clone, Default)]
pub struct BrokerRelations {
    pub broker_pictures: Vec<BrokerPicture>,
    pub character_references: Vec<CharacterReference>,
    pub educ_backgrounds: Vec<EducationBackground>,
    pub seminars: Vec<Seminar>,
    pub sales_experiences: Vec<SalesExperience>,
    pub client_count: i64,
}

impl BrokerResponse {
    pub fn new(broker: Broker, relations: BrokerRelations) -> Self {
        Self {
            id: broker.id,
            first_name: broker.first_name,
            middle_name: broker.middle_name,
            last_name: broker.last_name,
            birth_date: broker.birth_date,
            home_address: broker.home_address,
            email: broker.email,
            employer_name: broker.employer_name,
            position: broker.position,
            business_address: broker.business_address,
            brokers_license: broker.brokers_license,
            tin: broker.tin,
            primary_contact: broker.primary_contact,
            viber: broker.viber,
            whatsapp: broker.whatsapp,
            messenger: broker.messenger,
            emergency_contact_name: broker.emergency_contact_name,
            emergency_contact_no: broker.emergency_contact_no,
            emergency_relationship: broker.emergency_relationship,
            broker_pictures: relations.broker_pictures,
            character_references: relations.character_references,
            educ_backgrounds: relations.educ_backgrounds,
            seminars: relations.seminars,
            sales_experiences: relations.sales_experiences,
            client_count: relations.client_count,
            created_at: broker.created_at,
            updated_at: broker.updated_at,
        }
    }
}

/// Accepts a string, a number or null; numbers are kept as their text
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct CharacterReferenceInput {
    #[serde(deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub relationship: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub contact_no: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct SeminarInput {
    #[serde(deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub venue: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct SalesExperienceInput {
    #[serde(deserialize_with = "lenient_text")]
    pub company: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub position: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub years: Option<String>,
}

/// Request body for POST /brokers, as JSON or as multipart fields
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateBrokerRequest {
    #[validate(custom(function = "validate_not_blank", message = "firstName is required"))]
    pub first_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub middle_name: Option<String>,
    #[validate(custom(function = "validate_not_blank", message = "lastName is required"))]
    pub last_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub birth_date: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub home_address: Option<String>,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    #[serde(deserialize_with = "lenient_text")]
    pub employer_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub position: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub business_address: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub brokers_license: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub tin: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub primary_contact: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub viber: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub whatsapp: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub messenger: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub emergency_contact_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub emergency_contact_no: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub emergency_relationship: Option<String>,
    pub character_references: Vec<CharacterReferenceInput>,
    #[serde(deserialize_with = "lenient_text")]
    pub high_school: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub high_school_year: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub college: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub college_year: Option<String>,
    pub seminars: Vec<SeminarInput>,
    pub sales_experience: Vec<SalesExperienceInput>,
}

/// Multipart fields that carry JSON-encoded arrays
const ARRAY_FIELDS: [&str; 3] = ["characterReferences", "seminars", "salesExperience"];

impl CreateBrokerRequest {
    /// Build a request from multipart text fields.
    ///
    /// Array fields arrive as JSON strings; every other field is plain text.
    pub fn from_form(form: FormData) -> Result<Self, ApiError> {
        let mut body = Map::new();

        for (name, value) in form.fields {
            let value = if ARRAY_FIELDS.contains(&name.as_str()) {
                if value.trim().is_empty() {
                    continue;
                }
                serde_json::from_str::<Value>(&value).map_err(|err| ApiError::BadRequest {
                    message: format!("{} must be a JSON array", name),
                    details: Some(err.to_string()),
                })?
            } else {
                Value::String(value)
            };
            body.insert(name, value);
        }

        serde_json::from_value(Value::Object(body)).map_err(|err| ApiError::BadRequest {
            message: "Invalid broker form".to_string(),
            details: Some(err.to_string()),
        })
    }
}

/// Request body for PUT /brokers/:id, as JSON or multipart text fields.
/// Fields left out keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateBrokerRequest {
    #[serde(deserialize_with = "lenient_text")]
    #[validate(custom(function = "validate_not_blank", message = "firstName cannot be empty"))]
    pub first_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    #[validate(custom(function = "validate_not_blank", message = "lastName cannot be empty"))]
    pub last_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    #[validate(email(message = "A valid email is required"))]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub primary_contact: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub brokers_license: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub employer_name: Option<String>,
}

impl UpdateBrokerRequest {
    pub fn from_form(form: FormData) -> Result<Self, ApiError> {
        let body: Map<String, Value> = form
            .fields
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect();

        serde_json::from_value(Value::Object(body)).map_err(|err| ApiError::BadRequest {
            message: "Invalid broker form".to_string(),
            details: Some(err.to_string()),
        })
    }

    /// New email, trimmed, when one was sent
    pub fn new_email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim)
    }

    /// Merge the sent fields over `existing`. Blank optional text clears the
    /// column; required fields were checked by validation.
    pub fn merge_into(&self, existing: &Broker) -> BrokerChanges {
        let required = |sent: &Option<String>, stored: &String| {
            clean(sent.clone()).unwrap_or_else(|| stored.clone())
        };
        let optional = |sent: &Option<String>, stored: &Option<String>| match sent {
            Some(_) => clean(sent.clone()),
            None => stored.clone(),
        };

        BrokerChanges {
            first_name: required(&self.first_name, &existing.first_name),
            last_name: required(&self.last_name, &existing.last_name),
            email: required(&self.email, &existing.email),
            primary_contact: optional(&self.primary_contact, &existing.primary_contact),
            brokers_license: optional(&self.brokers_license, &existing.brokers_license),
            employer_name: optional(&self.employer_name, &existing.employer_name),
        }
    }
}

/// Column values written by a broker update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerChanges {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub primary_contact: Option<String>,
    pub brokers_license: Option<String>,
    pub employer_name: Option<String>,
}

/// Broker values ready to insert, with empty nested entries removed
#[derive(Debug, Clone)]
pub struct NewBroker {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub birth_date: Option<String>,
    pub home_address: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub employer_name: Option<String>,
    pub position: Option<String>,
    pub business_address: Option<String>,
    pub brokers_license: Option<String>,
    pub tin: Option<String>,
    pub primary_contact: Option<String>,
    pub viber: Option<String>,
    pub whatsapp: Option<String>,
    pub messenger: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_no: Option<String>,
    pub emergency_relationship: Option<String>,
    pub character_references: Vec<NewCharacterReference>,
    pub education: Option<NewEducation>,
    pub seminars: Vec<NewSeminar>,
    pub sales_experiences: Vec<NewSalesExperience>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCharacterReference {
    pub name: String,
    pub relationship: Option<String>,
    pub contact_no: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEducation {
    pub high_school: Option<String>,
    pub high_school_year: Option<String>,
    pub college: Option<String>,
    pub college_year: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSeminar {
    pub title: String,
    pub date: Option<String>,
    pub venue: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSalesExperience {
    pub company: String,
    pub position: Option<String>,
    pub years: Option<String>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl NewBroker {
    /// Normalize a validated request. Blank optional text becomes NULL and
    /// nested entries without their key field are dropped.
    pub fn from_request(request: CreateBrokerRequest, password_hash: String) -> Self {
        let education = NewEducation {
            high_school: clean(request.high_school),
            high_school_year: clean(request.high_school_year),
            college: clean(request.college),
            college_year: clean(request.college_year),
        };
        let has_education = education.high_school.is_some()
            || education.high_school_year.is_some()
            || education.college.is_some()
            || education.college_year.is_some();

        Self {
            first_name: request.first_name.trim().to_string(),
            middle_name: clean(request.middle_name),
            last_name: request.last_name.trim().to_string(),
            birth_date: clean(request.birth_date),
            home_address: clean(request.home_address),
            email: request.email.trim().to_string(),
            password_hash,
            employer_name: clean(request.employer_name),
            position: clean(request.position),
            business_address: clean(request.business_address),
            brokers_license: clean(request.brokers_license),
            tin: clean(request.tin),
            primary_contact: clean(request.primary_contact),
            viber: clean(request.viber),
            whatsapp: clean(request.whatsapp),
            messenger: clean(request.messenger),
            emergency_contact_name: clean(request.emergency_contact_name),
            emergency_contact_no: clean(request.emergency_contact_no),
            emergency_relationship: clean(request.emergency_relationship),
            character_references: request
                .character_references
                .into_iter()
                .filter_map(|r| {
                    Some(NewCharacterReference {
                        name: clean(r.name)?,
                        relationship: clean(r.relationship),
                        contact_no: clean(r.contact_no),
                        email: clean(r.email),
                    })
                })
                .collect(),
            education: has_education.then_some(education),
            seminars: request
                .seminars
                .into_iter()
                .filter_map(|s| {
                    Some(NewSeminar {
                        title: clean(s.title)?,
                        date: clean(s.date),
                        venue: clean(s.venue),
                    })
                })
                .collect(),
            sales_experiences: request
                .sales_experience
                .into_iter()
                .filter_map(|e| {
                    Some(NewSalesExperience {
                        company: clean(e.company)?,
                        position: clean(e.position),
                        years: clean(e.years),
                    })
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> FormData {
        let mut form = FormData::default();
        for (key, value) in pairs {
            form.fields.insert(key.to_string(), value.to_string());
        }
        form
    }

    #[test]
    fn test_json_body_with_nested_arrays() {
        let request: CreateBrokerRequest = serde_json::from_value(serde_json::json!({
            "firstName": "Maria",
            "lastName": "Santos",
            "email": "maria@example.com",
            "password": "secret",
            "highSchoolYear": 2008,
            "characterReferences": [{"name": "Jo", "contactNo": "0917"}],
            "salesExperience": [{"company": "Ayala", "years": 3}]
        }))
        .unwrap();

        assert!(request.validate().is_ok());
        assert_eq!(request.high_school_year.as_deref(), Some("2008"));
        assert_eq!(request.character_references[0].contact_no.as_deref(), Some("0917"));
        assert_eq!(request.sales_experience[0].years.as_deref(), Some("3"));
    }

    #[test]
    fn test_missing_required_fields_fail_validation() {
        let request: CreateBrokerRequest =
            serde_json::from_value(serde_json::json!({"firstName": "Maria"})).unwrap();
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("last_name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_blank_names_fail_validation() {
        let request: CreateBrokerRequest = serde_json::from_value(serde_json::json!({
            "firstName": "   ",
            "lastName": "\t",
            "email": "maria@example.com",
            "password": "secret"
        }))
        .unwrap();
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("first_name"));
        assert!(fields.contains_key("last_name"));
    }

    #[test]
    fn test_multipart_fields_decode_json_arrays() {
        let request = CreateBrokerRequest::from_form(form(&[
            ("firstName", "Maria"),
            ("lastName", "Santos"),
            ("email", "maria@example.com"),
            ("password", "secret"),
            ("seminars", r#"[{"title": "Sales 101", "venue": "Makati"}]"#),
            ("characterReferences", ""),
        ]))
        .unwrap();

        assert_eq!(request.seminars.len(), 1);
        assert_eq!(request.seminars[0].title.as_deref(), Some("Sales 101"));
        assert!(request.character_references.is_empty());
    }

    #[test]
    fn test_multipart_rejects_malformed_arrays() {
        let err = CreateBrokerRequest::from_form(form(&[("seminars", "[{oops")])).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_new_broker_drops_empty_entries() {
        let request: CreateBrokerRequest = serde_json::from_value(serde_json::json!({
            "firstName": " Maria ",
            "lastName": "Santos",
            "email": "maria@example.com",
            "password": "secret",
            "middleName": "  ",
            "characterReferences": [{"name": ""}, {"name": "Jo"}],
            "seminars": [{}],
            "salesExperience": []
        }))
        .unwrap();

        let broker = NewBroker::from_request(request, "hash".to_string());
        assert_eq!(broker.first_name, "Maria");
        assert_eq!(broker.middle_name, None);
        assert_eq!(broker.character_references.len(), 1);
        assert!(broker.seminars.is_empty());
        assert!(broker.sales_experiences.is_empty());
        assert!(broker.education.is_none());
    }

    fn stored_broker() -> Broker {
        Broker {
            id: 1,
            first_name: "Maria".to_string(),
            middle_name: None,
            last_name: "Santos".to_string(),
            birth_date: None,
            home_address: None,
            email: "maria@example.com".to_string(),
            employer_name: Some("Ayala Land".to_string()),
            position: None,
            business_address: None,
            brokers_license: Some("PRC-1234".to_string()),
            tin: None,
            primary_contact: Some("0917".to_string()),
            viber: None,
            whatsapp: None,
            messenger: None,
            emergency_contact_name: None,
            emergency_contact_no: None,
            emergency_relationship: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_update_merges_sent_fields_only() {
        let request = UpdateBrokerRequest::from_form(form(&[
            ("lastName", " Reyes "),
            ("employerName", ""),
            ("primaryContact", "0998"),
        ]))
        .unwrap();
        assert!(request.validate().is_ok());

        let changes = request.merge_into(&stored_broker());
        assert_eq!(changes.first_name, "Maria");
        assert_eq!(changes.last_name, "Reyes");
        assert_eq!(changes.email, "maria@example.com");
        assert_eq!(changes.primary_contact.as_deref(), Some("0998"));
        assert_eq!(changes.brokers_license.as_deref(), Some("PRC-1234"));
        assert_eq!(changes.employer_name, None);
    }

    #[test]
    fn test_update_rejects_blank_names_and_bad_email() {
        let request = UpdateBrokerRequest::from_form(form(&[
            ("firstName", "  "),
            ("email", "not-an-email"),
        ]))
        .unwrap();
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("first_name"));
        assert!(fields.contains_key("email"));
        assert!(!fields.contains_key("last_name"));
    }

    #[test]
    fn test_response_never_serializes_password() {
        let broker = Broker {
            id: 1,
            first_name: "Maria".to_string(),
            middle_name: None,
            last_name: "Santos".to_string(),
            birth_date: None,
            home_address: None,
            email: "maria@example.com".to_string(),
            employer_name: None,
            position: None,
            business_address: None,
            brokers_license: None,
            tin: None,
            primary_contact: None,
            viber: None,
            whatsapp: None,
            messenger: None,
            emergency_contact_name: None,
            emergency_contact_no: None,
            emergency_relationship: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(BrokerResponse::new(broker, BrokerRelations::default()))
            .unwrap();

        assert!(json.get("password").is_none());
        assert!(json.get("passwordHash").is_none());
        assert!(json["brokerPictures"].is_array());
        assert!(json["educBackgrounds"].is_array());
        assert!(json["salesExperiences"].is_array());
        assert_eq!(json["clientCount"], 0);
    }
}
