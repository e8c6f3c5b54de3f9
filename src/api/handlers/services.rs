use crate::api::error::AppError;
use crate::api::handlers::MessageResponse;
use crate::entities::{client_cases, prelude::*, services};
use crate::models::ServiceCategory;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Serialize, ToSchema)]
pub struct ServiceResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: Option<Decimal>,
    pub duration_days: Option<i32>,
    pub active: bool,
    pub created_at: chrono::DateTime<Utc>,
}

impl From<services::Model> for ServiceResponse {
    fn from(service: services::Model) -> Self {
        Self {
            id: service.id,
            name: service.name,
            description: service.description,
            category: service.category,
            price: service.price,
            duration_days: service.duration_days,
            active: service.active,
            created_at: service.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CategoryResponse {
    pub value: String,
    pub name: String,
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct CreateServiceRequest {
    #[validate(length(min = 1, max = 120, message = "Campo obrigatório ausente ou vazio: name"))]
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: Option<Decimal>,
    pub duration_days: Option<i32>,
    pub active: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub duration_days: Option<i32>,
    pub active: Option<bool>,
}

#[derive(Deserialize)]
pub struct ListServicesQuery {
    pub category: Option<String>,
}

fn parse_category(raw: &str) -> Result<ServiceCategory, AppError> {
    ServiceCategory::parse(raw).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Categoria inválida: '{}'. Valores aceitos: {}",
            raw,
            ServiceCategory::valid_values()
        ))
    })
}

// "multas" -> "Multas", the label the frontend shows untranslated
fn display_name(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[utoipa::path(
    get,
    path = "/api/services",
    params(("category" = Option<String>, Query, description = "Restrict to one category")),
    responses(
        (status = 200, description = "Active services", body = [ServiceResponse]),
        (status = 400, description = "Invalid category"),
        (status = 401, description = "Unauthorized")
    ),
    security(("jwt" = [])),
    tag = "services"
)]
pub async fn list_services(
    State(state): State<crate::AppState>,
    Query(query): Query<ListServicesQuery>,
) -> Result<Json<Vec<ServiceResponse>>, AppError> {
    let mut select = Services::find().filter(services::Column::Active.eq(true));
    if let Some(raw) = query.category.as_deref() {
        let category = parse_category(raw)?;
        select = select.filter(services::Column::Category.eq(category.as_str()));
    }

    let rows = select
        .order_by_asc(services::Column::Name)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(ServiceResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/services/categories",
    responses(
        (status = 200, description = "Available categories", body = [CategoryResponse])
    ),
    tag = "services"
)]
pub async fn list_categories() -> Json<Vec<CategoryResponse>> {
    let categories = ServiceCategory::ALL
        .iter()
        .map(|c| CategoryResponse {
            value: c.as_str().to_string(),
            name: display_name(c.as_str()),
        })
        .collect();
    Json(categories)
}

#[utoipa::path(
    get,
    path = "/api/services/category/{category}",
    params(("category" = String, Path, description = "Category value")),
    responses(
        (status = 200, description = "Active services in the category", body = [ServiceResponse]),
        (status = 400, description = "Invalid category"),
        (status = 401, description = "Unauthorized")
    ),
    security(("jwt" = [])),
    tag = "services"
)]
pub async fn services_by_category(
    State(state): State<crate::AppState>,
    Path(raw): Path<String>,
) -> Result<Json<Vec<ServiceResponse>>, AppError> {
    let category = parse_category(&raw)?;

    let rows = Services::find()
        .filter(services::Column::Category.eq(category.as_str()))
        .filter(services::Column::Active.eq(true))
        .order_by_asc(services::Column::Name)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(ServiceResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/services/{id}",
    params(("id" = i32, Path, description = "Service ID")),
    responses(
        (status = 200, description = "Service details", body = ServiceResponse),
        (status = 404, description = "Service not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("jwt" = [])),
    tag = "services"
)]
pub async fn get_service(
    State(state): State<crate::AppState>,
    Path(service_id): Path<i32>,
) -> Result<Json<ServiceResponse>, AppError> {
    let service = Services::find_by_id(service_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Serviço não encontrado".to_string()))?;

    Ok(Json(ServiceResponse::from(service)))
}

#[utoipa::path(
    post,
    path = "/api/services",
    request_body = CreateServiceRequest,
    responses(
        (status = 201, description = "Service created", body = ServiceResponse),
        (status = 400, description = "Missing name or invalid category"),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "services"
)]
pub async fn create_service(
    State(state): State<crate::AppState>,
    Json(payload): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<ServiceResponse>), AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let category = parse_category(&payload.category)?;

    let service = services::ActiveModel {
        name: Set(payload.name),
        description: Set(payload.description),
        category: Set(category.as_str().to_string()),
        price: Set(payload.price),
        duration_days: Set(payload.duration_days),
        active: Set(payload.active.unwrap_or(true)),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let service = service.insert(&state.db).await?;

    Ok((StatusCode::CREATED, Json(ServiceResponse::from(service))))
}

#[utoipa::path(
    put,
    path = "/api/services/{id}",
    params(("id" = i32, Path, description = "Service ID")),
    request_body = UpdateServiceRequest,
    responses(
        (status = 200, description = "Service updated", body = ServiceResponse),
        (status = 400, description = "Invalid category"),
        (status = 404, description = "Service not found"),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "services"
)]
pub async fn update_service(
    State(state): State<crate::AppState>,
    Path(service_id): Path<i32>,
    Json(payload): Json<UpdateServiceRequest>,
) -> Result<Json<ServiceResponse>, AppError> {
    let service = Services::find_by_id(service_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Serviço não encontrado".to_string()))?;

    let mut active: services::ActiveModel = service.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(raw) = payload.category.as_deref() {
        let category = parse_category(raw)?;
        active.category = Set(category.as_str().to_string());
    }
    if let Some(price) = payload.price {
        active.price = Set(Some(price));
    }
    if let Some(duration_days) = payload.duration_days {
        active.duration_days = Set(Some(duration_days));
    }
    if let Some(is_active) = payload.active {
        active.active = Set(is_active);
    }
    let service = active.update(&state.db).await?;

    Ok(Json(ServiceResponse::from(service)))
}

#[utoipa::path(
    delete,
    path = "/api/services/{id}",
    params(("id" = i32, Path, description = "Service ID")),
    responses(
        (status = 200, description = "Service removed or deactivated", body = MessageResponse),
        (status = 404, description = "Service not found"),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "services"
)]
pub async fn delete_service(
    State(state): State<crate::AppState>,
    Path(service_id): Path<i32>,
) -> Result<Json<MessageResponse>, AppError> {
    let service = Services::find_by_id(service_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Serviço não encontrado".to_string()))?;

    // Cases keep their service reference, so a referenced catalog entry is
    // retired instead of removed
    let referencing_cases = ClientCases::find()
        .filter(client_cases::Column::ServiceId.eq(service.id))
        .count(&state.db)
        .await?;

    if referencing_cases > 0 {
        let mut active: services::ActiveModel = service.into();
        active.active = Set(false);
        active.update(&state.db).await?;
        return Ok(Json(MessageResponse::new(
            "Serviço desativado: existem processos vinculados",
        )));
    }

    Services::delete_by_id(service.id).exec(&state.db).await?;
    Ok(Json(MessageResponse::new("Serviço removido com sucesso")))
}
