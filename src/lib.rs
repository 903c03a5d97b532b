// Brokerage back-office API
// Router, shared state and OpenAPI document

pub mod auth;
pub mod brokers;
pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod storage;
pub mod units;
pub mod validation;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware::{self, Next},
    routing::{delete, get, post, put, MethodRouter},
    Router,
};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{authenticate, AccountRepository, AuthService, RequireRole, Role, TokenService};
use crate::brokers::{BrokerRepository, BrokerService};
use crate::clients::{ClientRepository, ClientService};
use crate::config::Config;
use crate::storage::UploadStore;
use crate::units::{UnitRepository, UnitService};

/// Any role may read units
pub const UNIT_READERS: RequireRole =
    RequireRole::any_of(&[Role::Admin, Role::Manager, Role::Agent, Role::Client]);

/// Roles allowed to list units into the inventory
pub const UNIT_CREATORS: RequireRole = RequireRole::any_of(&[Role::Admin, Role::Agent]);

/// Administrators and managers
pub const STAFF: RequireRole = RequireRole::any_of(&[Role::Admin, Role::Manager]);

pub const CLIENT_READERS: RequireRole =
    RequireRole::any_of(&[Role::Admin, Role::Manager, Role::Agent]);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub auth_service: Arc<AuthService>,
    pub unit_service: UnitService,
    pub broker_service: BrokerService,
    pub client_service: ClientService,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Self {
        let tokens = Arc::new(TokenService::new(&config.jwt_secret));
        let uploads = UploadStore::new(&config.upload_dir);
        let accounts = AccountRepository::new(pool.clone());

        Self {
            auth_service: Arc::new(AuthService::new(accounts.clone(), tokens.clone())),
            unit_service: UnitService::new(UnitRepository::new(pool.clone()), uploads.clone()),
            broker_service: BrokerService::new(BrokerRepository::new(pool.clone()), accounts, uploads),
            client_service: ClientService::new(ClientRepository::new(pool)),
            tokens,
        }
    }
}

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::handlers::login_handler,
        auth::handlers::me_handler,
        brokers::handlers::list_brokers_handler,
        brokers::handlers::create_broker_handler,
        brokers::handlers::update_broker_handler,
        clients::handlers::list_clients_handler,
        clients::handlers::create_client_handler,
        units::handlers::list_units_handler,
        units::handlers::get_unit_handler,
        units::handlers::create_unit_handler,
        units::handlers::update_unit_handler,
        units::handlers::delete_unit_handler,
        units::handlers::unit_stats_handler,
    ),
    components(schemas(
        auth::LoginRequest,
        auth::LoginResponse,
        auth::AccountResponse,
        auth::SessionResponse,
        auth::Role,
        auth::AccountKind,
        brokers::BrokerResponse,
        brokers::BrokerPicture,
        brokers::CharacterReference,
        brokers::EducationBackground,
        brokers::Seminar,
        brokers::SalesExperience,
        brokers::CreateBrokerRequest,
        brokers::UpdateBrokerRequest,
        brokers::CharacterReferenceInput,
        brokers::SeminarInput,
        brokers::SalesExperienceInput,
        clients::Client,
        clients::CreateClientRequest,
        units::UnitResponse,
        units::UnitPicture,
        units::UnitStats,
        units::FloorOccupancy,
        units::MessageResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login and session"),
        (name = "brokers", description = "Broker profiles"),
        (name = "clients", description = "Client records"),
        (name = "units", description = "Property units and image galleries")
    ),
    info(
        title = "Brokerage API",
        version = "1.0.0",
        description = "Back-office API for a real-estate brokerage"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Put a role allow-list in front of one method route
fn gated(route: MethodRouter<AppState>, roles: RequireRole) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn(move |req: Request, next: Next| {
        roles.middleware(req, next)
    }))
}

/// API routes without state or outer layers.
///
/// `authenticate` is the outermost route layer of the protected routes, so
/// it always runs before any per-route [`RequireRole`].
fn api_routes(tokens: Arc<TokenService>) -> Router<AppState> {
    let public = Router::new().route("/auth/login", post(auth::login_handler));

    let protected = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route(
            "/brokers",
            gated(get(brokers::list_brokers_handler), STAFF)
                .merge(post(brokers::create_broker_handler)),
        )
        .route("/brokers/:id", gated(put(brokers::update_broker_handler), STAFF))
        .route(
            "/clients",
            gated(get(clients::list_clients_handler), CLIENT_READERS)
                .merge(post(clients::create_client_handler)),
        )
        .route(
            "/units",
            gated(get(units::list_units_handler), UNIT_READERS)
                .merge(gated(post(units::create_unit_handler), UNIT_CREATORS)),
        )
        .route("/units/stats", gated(get(units::unit_stats_handler), STAFF))
        .route(
            "/units/:id",
            gated(get(units::get_unit_handler), UNIT_READERS)
                .merge(gated(put(units::update_unit_handler), STAFF))
                .merge(gated(delete(units::delete_unit_handler), STAFF)),
        )
        .route_layer(middleware::from_fn_with_state(tokens, authenticate));

    public.merge(protected)
}

/// Creates and configures the application router
///
/// Every API route and the uploads directory are served at the root and
/// again under `/api`.
pub fn create_router(state: AppState, config: &Config) -> Router {
    let routes = api_routes(state.tokens.clone());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(routes.clone())
        .nest("/api", routes)
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .nest_service("/api/uploads", ServeDir::new(&config.upload_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(config.max_upload_bytes)),
        )
        .with_state(state)
}


#[cfg(test)]
mod api_doc_tests {
    use super::*;

    #[test]
    fn test_openapi_document_lists_broker_routes_and_schemas() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/brokers"));
        assert!(doc.paths.paths.contains_key("/brokers/{id}"));

        let components = doc.components.expect("components are generated");
        for schema in ["CreateBrokerRequest", "UpdateBrokerRequest", "SeminarInput"] {
            assert!(components.schemas.contains_key(schema), "{}", schema);
        }
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
