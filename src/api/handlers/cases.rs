use crate::api::error::AppError;
use crate::api::handlers::MessageResponse;
use crate::entities::{client_cases, prelude::*, process_files, users};
use crate::models::{CaseStatus, UserRole};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Serialize, ToSchema)]
pub struct CaseResponse {
    pub id: i32,
    pub user_id: i32,
    pub service_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl From<client_cases::Model> for CaseResponse {
    fn from(case: client_cases::Model) -> Self {
        Self {
            id: case.id,
            user_id: case.user_id,
            service_id: case.service_id,
            title: case.title,
            description: case.description,
            status: case.status,
            created_at: case.created_at,
            updated_at: case.updated_at,
        }
    }
}

/// Case row joined with the owning client, the shape the back-office tables use
#[derive(Serialize, ToSchema)]
pub struct AdminCaseResponse {
    #[serde(flatten)]
    pub case: CaseResponse,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CaseEnvelope {
    pub message: String,
    pub case: CaseResponse,
}

#[derive(Serialize, ToSchema)]
pub struct ProcessEnvelope {
    pub message: String,
    pub process: CaseResponse,
}

#[derive(Serialize, ToSchema)]
pub struct ProcessPageResponse {
    pub processes: Vec<AdminCaseResponse>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct CreateCaseRequest {
    #[validate(length(min = 1, max = 255, message = "Título é obrigatório"))]
    pub title: String,
    pub description: Option<String>,
    /// Catalog entry the case is filed under; the first entry when omitted
    pub service_id: Option<i32>,
    pub status: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateProcessRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub service_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct ProcessFilter {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub client_id: Option<i32>,
    pub status: Option<String>,
    pub search: Option<String>,
}

/// Summary of a document attached to a case, as embedded in case listings
#[derive(Serialize, ToSchema)]
pub struct CaseFileSummary {
    pub id: i32,
    pub original_filename: String,
    pub file_size: i64,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
}

impl From<process_files::Model> for CaseFileSummary {
    fn from(file: process_files::Model) -> Self {
        Self {
            id: file.id,
            original_filename: file.original_filename,
            file_size: file.file_size,
            description: file.description,
            created_at: file.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ClientCaseResponse {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub service_name: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
    pub files: Vec<CaseFileSummary>,
}

pub(crate) fn parse_status(raw: &str) -> Result<CaseStatus, AppError> {
    CaseStatus::parse(raw).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Status inválido: '{}'. Valores aceitos: {}",
            raw,
            CaseStatus::valid_values()
        ))
    })
}

#[utoipa::path(
    get,
    path = "/api/admin/cases",
    responses(
        (status = 200, description = "All cases with client info", body = [AdminCaseResponse]),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "cases"
)]
pub async fn list_cases(
    State(state): State<crate::AppState>,
) -> Result<Json<Vec<AdminCaseResponse>>, AppError> {
    let cases = ClientCases::find()
        .find_also_related(Users)
        .order_by_desc(client_cases::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let result = cases
        .into_iter()
        .map(|(case, client)| AdminCaseResponse {
            case: CaseResponse::from(case),
            client_name: client.as_ref().map(|c| c.name.clone()),
            client_email: client.map(|c| c.email),
        })
        .collect();

    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/api/admin/clients/{id}/cases",
    params(("id" = i32, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Cases of one client", body = [CaseResponse]),
        (status = 404, description = "Client not found"),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "cases"
)]
pub async fn list_client_cases(
    State(state): State<crate::AppState>,
    Path(client_id): Path<i32>,
) -> Result<Json<Vec<CaseResponse>>, AppError> {
    let client = Users::find_by_id(client_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Cliente não encontrado".to_string()))?;

    if client.role != UserRole::Cliente.as_str() {
        return Err(AppError::BadRequest("Usuário não é um cliente".to_string()));
    }

    let cases = ClientCases::find()
        .filter(client_cases::Column::UserId.eq(client_id))
        .order_by_desc(client_cases::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(cases.into_iter().map(CaseResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/admin/clients/{id}/cases",
    params(("id" = i32, Path, description = "Client ID")),
    request_body = CreateCaseRequest,
    responses(
        (status = 201, description = "Case created", body = CaseEnvelope),
        (status = 400, description = "Invalid status"),
        (status = 404, description = "Client or service not found"),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "cases"
)]
pub async fn create_client_case(
    State(state): State<crate::AppState>,
    Path(client_id): Path<i32>,
    Json(payload): Json<CreateCaseRequest>,
) -> Result<(StatusCode, Json<CaseEnvelope>), AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let client = Users::find_by_id(client_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Cliente não encontrado".to_string()))?;

    let service_id = payload.service_id.unwrap_or(1);
    Services::find_by_id(service_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Serviço não encontrado".to_string()))?;

    let status = match payload.status.as_deref() {
        Some(raw) => parse_status(raw)?,
        None => CaseStatus::Pendente,
    };

    let now = Utc::now();
    let case = client_cases::ActiveModel {
        user_id: Set(client.id),
        service_id: Set(service_id),
        title: Set(payload.title),
        description: Set(payload.description),
        status: Set(status.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let case = case.insert(&state.db).await?;

    Ok((
        StatusCode::CREATED,
        Json(CaseEnvelope {
            message: "Caso criado com sucesso".to_string(),
            case: CaseResponse::from(case),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/processes",
    params(
        ("page" = Option<u64>, Query, description = "1-based page, default 1"),
        ("limit" = Option<u64>, Query, description = "Page size, default 10"),
        ("client_id" = Option<i32>, Query, description = "Restrict to one client"),
        ("status" = Option<String>, Query, description = "Restrict to one status"),
        ("search" = Option<String>, Query, description = "Substring matched against title or description")
    ),
    responses(
        (status = 200, description = "Paginated processes", body = ProcessPageResponse),
        (status = 400, description = "Invalid status filter"),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "cases"
)]
pub async fn list_processes(
    State(state): State<crate::AppState>,
    Query(filter): Query<ProcessFilter>,
) -> Result<Json<ProcessPageResponse>, AppError> {
    let page = filter.page.unwrap_or(1).max(1);
    let limit = filter.limit.unwrap_or(10).clamp(1, 100);

    let mut query = ClientCases::find();

    if let Some(client_id) = filter.client_id {
        query = query.filter(client_cases::Column::UserId.eq(client_id));
    }
    if let Some(raw) = filter.status.as_deref() {
        let status = parse_status(raw)?;
        query = query.filter(client_cases::Column::Status.eq(status.as_str()));
    }
    if let Some(search) = filter.search.as_deref() {
        let search = search.trim();
        if !search.is_empty() {
            query = query.filter(
                Condition::any()
                    .add(client_cases::Column::Title.contains(search))
                    .add(client_cases::Column::Description.contains(search)),
            );
        }
    }

    let paginator = query
        .order_by_desc(client_cases::Column::CreatedAt)
        .find_also_related(Users)
        .paginate(&state.db, limit);

    let totals = paginator.num_items_and_pages().await?;
    let rows = paginator.fetch_page(page - 1).await?;

    let processes = rows
        .into_iter()
        .map(|(case, client)| AdminCaseResponse {
            case: CaseResponse::from(case),
            client_name: client.as_ref().map(|c| c.name.clone()),
            client_email: client.map(|c| c.email),
        })
        .collect();

    Ok(Json(ProcessPageResponse {
        processes,
        total: totals.number_of_items,
        page,
        limit,
        total_pages: totals.number_of_pages,
    }))
}

#[utoipa::path(
    put,
    path = "/api/admin/processes/{id}",
    params(("id" = i32, Path, description = "Case ID")),
    request_body = UpdateProcessRequest,
    responses(
        (status = 200, description = "Process updated", body = ProcessEnvelope),
        (status = 400, description = "Invalid status"),
        (status = 404, description = "Process or service not found"),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "cases"
)]
pub async fn update_process(
    State(state): State<crate::AppState>,
    Path(process_id): Path<i32>,
    Json(payload): Json<UpdateProcessRequest>,
) -> Result<Json<ProcessEnvelope>, AppError> {
    let case = ClientCases::find_by_id(process_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Processo não encontrado".to_string()))?;

    if let Some(service_id) = payload.service_id {
        Services::find_by_id(service_id)
            .one(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Serviço não encontrado".to_string()))?;
    }

    let mut active: client_cases::ActiveModel = case.into();
    if let Some(title) = payload.title {
        active.title = Set(title);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(raw) = payload.status.as_deref() {
        let status = parse_status(raw)?;
        active.status = Set(status.as_str().to_string());
    }
    if let Some(service_id) = payload.service_id {
        active.service_id = Set(service_id);
    }
    active.updated_at = Set(Utc::now());
    let case = active.update(&state.db).await?;

    Ok(Json(ProcessEnvelope {
        message: "Processo atualizado com sucesso".to_string(),
        process: CaseResponse::from(case),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/admin/processes/{id}",
    params(("id" = i32, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Process and its documents deleted", body = MessageResponse),
        (status = 404, description = "Process not found"),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "cases"
)]
pub async fn delete_process(
    State(state): State<crate::AppState>,
    Path(process_id): Path<i32>,
) -> Result<Json<MessageResponse>, AppError> {
    let case = ClientCases::find_by_id(process_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Processo não encontrado".to_string()))?;

    // Documents first: rows, then the bytes on disk
    let files = ProcessFiles::find()
        .filter(process_files::Column::CaseId.eq(case.id))
        .all(&state.db)
        .await?;

    ProcessFiles::delete_many()
        .filter(process_files::Column::CaseId.eq(case.id))
        .exec(&state.db)
        .await?;

    ClientCases::delete_by_id(case.id).exec(&state.db).await?;

    for file in files {
        state.documents.remove(&file.filename).await;
    }

    Ok(Json(MessageResponse::new("Processo excluído com sucesso")))
}

#[utoipa::path(
    get,
    path = "/api/client/cases",
    responses(
        (status = 200, description = "Caller's cases with documents", body = [ClientCaseResponse]),
        (status = 401, description = "Unauthorized")
    ),
    security(("jwt" = [])),
    tag = "client"
)]
pub async fn my_cases(
    State(state): State<crate::AppState>,
    Extension(user): Extension<users::Model>,
) -> Result<Json<Vec<ClientCaseResponse>>, AppError> {
    let cases = ClientCases::find()
        .filter(client_cases::Column::UserId.eq(user.id))
        .order_by_desc(client_cases::Column::CreatedAt)
        .find_also_related(Services)
        .all(&state.db)
        .await?;

    // One query for every document, grouped per case afterwards
    let files = ProcessFiles::find()
        .filter(process_files::Column::UserId.eq(user.id))
        .order_by_desc(process_files::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let mut files_by_case: HashMap<i32, Vec<CaseFileSummary>> = HashMap::new();
    for file in files {
        if let Some(case_id) = file.case_id {
            files_by_case
                .entry(case_id)
                .or_default()
                .push(CaseFileSummary::from(file));
        }
    }

    let result = cases
        .into_iter()
        .map(|(case, service)| ClientCaseResponse {
            id: case.id,
            title: case.title,
            description: case.description,
            status: case.status,
            service_name: service.map(|s| s.name),
            created_at: case.created_at,
            updated_at: case.updated_at,
            files: files_by_case.remove(&case.id).unwrap_or_default(),
        })
        .collect();

    Ok(Json(result))
}
