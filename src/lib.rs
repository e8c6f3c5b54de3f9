pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod models;
pub mod utils;

use crate::config::AppConfig;
use crate::infrastructure::documents::DocumentStore;
use axum::{
    Router,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::auth::login,
        api::handlers::auth::register,
        api::handlers::auth::verify,
        api::handlers::auth::logout,
        api::handlers::clients::list_clients,
        api::handlers::clients::search_clients,
        api::handlers::clients::create_client,
        api::handlers::clients::get_client,
        api::handlers::clients::update_client,
        api::handlers::clients::delete_client,
        api::handlers::clients::get_profile,
        api::handlers::clients::update_profile,
        api::handlers::cases::list_cases,
        api::handlers::cases::list_client_cases,
        api::handlers::cases::create_client_case,
        api::handlers::cases::list_processes,
        api::handlers::cases::update_process,
        api::handlers::cases::delete_process,
        api::handlers::cases::my_cases,
        api::handlers::files::upload_process_file,
        api::handlers::files::list_process_files,
        api::handlers::files::download_process_file,
        api::handlers::files::delete_process_file,
        api::handlers::files::my_files,
        api::handlers::files::download_my_file,
        api::handlers::services::list_services,
        api::handlers::services::list_categories,
        api::handlers::services::services_by_category,
        api::handlers::services::get_service,
        api::handlers::services::create_service,
        api::handlers::services::update_service,
        api::handlers::services::delete_service,
        api::handlers::favorites::list_favorites,
        api::handlers::favorites::add_favorite,
        api::handlers::favorites::remove_favorite,
        api::handlers::favorites::check_favorite,
        api::handlers::consultations::book_consultation,
        api::handlers::consultations::my_consultations,
        api::handlers::consultations::list_consultations,
        api::handlers::consultations::update_consultation,
        api::handlers::reports::client_stats,
        api::handlers::reports::admin_stats,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::MessageResponse,
            api::handlers::auth::LoginRequest,
            api::handlers::auth::LoginResponse,
            api::handlers::auth::RegisterRequest,
            api::handlers::auth::UserSummary,
            api::handlers::auth::VerifyResponse,
            api::handlers::clients::ClientResponse,
            api::handlers::clients::ClientDetailResponse,
            api::handlers::clients::ClientEnvelope,
            api::handlers::clients::ProfileEnvelope,
            api::handlers::clients::CreateClientRequest,
            api::handlers::clients::UpdateClientRequest,
            api::handlers::cases::CaseResponse,
            api::handlers::cases::AdminCaseResponse,
            api::handlers::cases::CaseEnvelope,
            api::handlers::cases::ProcessEnvelope,
            api::handlers::cases::ProcessPageResponse,
            api::handlers::cases::CreateCaseRequest,
            api::handlers::cases::UpdateProcessRequest,
            api::handlers::cases::CaseFileSummary,
            api::handlers::cases::ClientCaseResponse,
            api::handlers::files::FileResponse,
            api::handlers::files::AdminFileResponse,
            api::handlers::files::ClientFileResponse,
            api::handlers::files::FileEnvelope,
            api::handlers::services::ServiceResponse,
            api::handlers::services::CategoryResponse,
            api::handlers::services::CreateServiceRequest,
            api::handlers::services::UpdateServiceRequest,
            api::handlers::favorites::AddFavoriteRequest,
            api::handlers::favorites::FavoriteStatusResponse,
            api::handlers::consultations::ConsultationResponse,
            api::handlers::consultations::AdminConsultationResponse,
            api::handlers::consultations::BookConsultationRequest,
            api::handlers::consultations::UpdateConsultationRequest,
            api::handlers::reports::ClientStatsResponse,
            api::handlers::reports::AdminStatsResponse,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "auth", description = "Login, registro e verificação de sessão"),
        (name = "clients", description = "Administração de clientes"),
        (name = "cases", description = "Administração de processos"),
        (name = "files", description = "Documentos de processos"),
        (name = "services", description = "Catálogo de serviços jurídicos"),
        (name = "favorites", description = "Serviços favoritos do cliente"),
        (name = "consultations", description = "Agendamento de consultas"),
        (name = "reports", description = "Estatísticas e painéis"),
        (name = "client", description = "Portal do cliente"),
        (name = "system", description = "Saúde do serviço")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub documents: Arc<DocumentStore>,
    pub config: AppConfig,
}

pub fn create_app(state: AppState) -> Router {
    let cors = if state.config.allowed_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(Any)
    };

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(api::handlers::health::health_check))
        .route("/api/auth/login", post(api::handlers::auth::login))
        .route("/api/auth/register", post(api::handlers::auth::register))
        .route(
            "/api/services/categories",
            get(api::handlers::services::list_categories),
        )
        .route(
            "/api/auth/verify",
            get(api::handlers::auth::verify).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::auth_middleware,
            )),
        )
        .route(
            "/api/auth/logout",
            post(api::handlers::auth::logout).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::auth_middleware,
            )),
        )
        .route(
            "/api/services",
            get(api::handlers::services::list_services).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::auth_middleware,
            )),
        )
        .route(
            "/api/services/category/:category",
            get(api::handlers::services::services_by_category).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::auth_middleware,
            )),
        )
        .route(
            "/api/services/:id",
            get(api::handlers::services::get_service).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::auth_middleware,
            )),
        )
        .route(
            "/api/services",
            post(api::handlers::services::create_service).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::admin_middleware,
            )),
        )
        .route(
            "/api/services/:id",
            axum::routing::put(api::handlers::services::update_service)
                .delete(api::handlers::services::delete_service)
                .layer(from_fn_with_state(
                    state.clone(),
                    api::middleware::auth::admin_middleware,
                )),
        )
        .route(
            "/api/favorites",
            get(api::handlers::favorites::list_favorites)
                .post(api::handlers::favorites::add_favorite)
                .layer(from_fn_with_state(
                    state.clone(),
                    api::middleware::auth::auth_middleware,
                )),
        )
        .route(
            "/api/favorites/:service_id",
            axum::routing::delete(api::handlers::favorites::remove_favorite).layer(
                from_fn_with_state(state.clone(), api::middleware::auth::auth_middleware),
            ),
        )
        .route(
            "/api/favorites/:service_id/check",
            get(api::handlers::favorites::check_favorite).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::auth_middleware,
            )),
        )
        .route(
            "/api/client/profile",
            get(api::handlers::clients::get_profile)
                .put(api::handlers::clients::update_profile)
                .layer(from_fn_with_state(
                    state.clone(),
                    api::middleware::auth::auth_middleware,
                )),
        )
        .route(
            "/api/client/cases",
            get(api::handlers::cases::my_cases).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::auth_middleware,
            )),
        )
        .route(
            "/api/client/files",
            get(api::handlers::files::my_files).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::auth_middleware,
            )),
        )
        .route(
            "/api/client/files/:id/download",
            get(api::handlers::files::download_my_file).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::auth_middleware,
            )),
        )
        .route(
            "/api/client/stats",
            get(api::handlers::reports::client_stats).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::auth_middleware,
            )),
        )
        .route(
            "/api/client/consultations",
            get(api::handlers::consultations::my_consultations)
                .post(api::handlers::consultations::book_consultation)
                .layer(from_fn_with_state(
                    state.clone(),
                    api::middleware::auth::auth_middleware,
                )),
        )
        .route(
            "/api/admin/clients",
            get(api::handlers::clients::list_clients)
                .post(api::handlers::clients::create_client)
                .layer(from_fn_with_state(
                    state.clone(),
                    api::middleware::auth::admin_middleware,
                )),
        )
        .route(
            "/api/admin/clients/search",
            get(api::handlers::clients::search_clients).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::admin_middleware,
            )),
        )
        .route(
            "/api/admin/clients/:id",
            get(api::handlers::clients::get_client)
                .put(api::handlers::clients::update_client)
                .delete(api::handlers::clients::delete_client)
                .layer(from_fn_with_state(
                    state.clone(),
                    api::middleware::auth::admin_middleware,
                )),
        )
        .route(
            "/api/admin/clients/:id/cases",
            get(api::handlers::cases::list_client_cases)
                .post(api::handlers::cases::create_client_case)
                .layer(from_fn_with_state(
                    state.clone(),
                    api::middleware::auth::admin_middleware,
                )),
        )
        .route(
            "/api/admin/cases",
            get(api::handlers::cases::list_cases).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::admin_middleware,
            )),
        )
        .route(
            "/api/admin/processes",
            get(api::handlers::cases::list_processes).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::admin_middleware,
            )),
        )
        .route(
            "/api/admin/processes/:id",
            axum::routing::put(api::handlers::cases::update_process)
                .delete(api::handlers::cases::delete_process)
                .layer(from_fn_with_state(
                    state.clone(),
                    api::middleware::auth::admin_middleware,
                )),
        )
        .route(
            "/api/admin/process-files",
            get(api::handlers::files::list_process_files)
                .post(api::handlers::files::upload_process_file)
                .layer(axum::extract::DefaultBodyLimit::max(
                    state.config.max_upload_size + 10 * 1024 * 1024, // Add 10MB buffer for multipart overhead
                ))
                .layer(from_fn_with_state(
                    state.clone(),
                    api::middleware::auth::admin_middleware,
                )),
        )
        .route(
            "/api/admin/process-files/:id",
            axum::routing::delete(api::handlers::files::delete_process_file).layer(
                from_fn_with_state(state.clone(), api::middleware::auth::admin_middleware),
            ),
        )
        .route(
            "/api/admin/process-files/:id/download",
            get(api::handlers::files::download_process_file).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::admin_middleware,
            )),
        )
        .route(
            "/api/admin/stats",
            get(api::handlers::reports::admin_stats).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::admin_middleware,
            )),
        )
        .route(
            "/api/admin/consultations",
            get(api::handlers::consultations::list_consultations).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::admin_middleware,
            )),
        )
        .route(
            "/api/admin/consultations/:id",
            axum::routing::put(api::handlers::consultations::update_consultation).layer(
                from_fn_with_state(state.clone(), api::middleware::auth::admin_middleware),
            ),
        )
        .layer(from_fn(api::middleware::security::security_headers))
        .layer(cors)
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_upload_size + 10 * 1024 * 1024,
        ))
        .with_state(state)
}
