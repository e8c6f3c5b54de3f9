use crate::api::error::AppError;
use crate::entities::{client_cases, prelude::*, users};
use crate::models::{CaseStatus, UserRole};
use axum::{Extension, Json, extract::State};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct ClientStatsResponse {
    pub total_cases: u64,
    pub pending_cases: u64,
    pub active_cases: u64,
    pub completed_cases: u64,
    pub total_files: u64,
}

#[derive(Serialize, ToSchema)]
pub struct AdminStatsResponse {
    pub total_clients: u64,
    pub total_cases: u64,
    pub pending_cases: u64,
    pub active_cases: u64,
    pub completed_cases: u64,
    pub total_files: u64,
    pub total_services: u64,
}

async fn count_cases_with_status(
    db: &DatabaseConnection,
    user_id: Option<i32>,
    status: Option<CaseStatus>,
) -> Result<u64, AppError> {
    let mut query = ClientCases::find();
    if let Some(user_id) = user_id {
        query = query.filter(client_cases::Column::UserId.eq(user_id));
    }
    if let Some(status) = status {
        query = query.filter(client_cases::Column::Status.eq(status.as_str()));
    }
    Ok(query.count(db).await?)
}

#[utoipa::path(
    get,
    path = "/api/client/stats",
    responses(
        (status = 200, description = "Caller's aggregate counts", body = ClientStatsResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("jwt" = [])),
    tag = "reports"
)]
pub async fn client_stats(
    State(state): State<crate::AppState>,
    Extension(user): Extension<users::Model>,
) -> Result<Json<ClientStatsResponse>, AppError> {
    let user_id = Some(user.id);

    let total_cases = count_cases_with_status(&state.db, user_id, None).await?;
    let pending_cases =
        count_cases_with_status(&state.db, user_id, Some(CaseStatus::Pendente)).await?;
    let active_cases =
        count_cases_with_status(&state.db, user_id, Some(CaseStatus::EmAndamento)).await?;
    let completed_cases =
        count_cases_with_status(&state.db, user_id, Some(CaseStatus::Concluido)).await?;

    let total_files = ProcessFiles::find()
        .filter(crate::entities::process_files::Column::UserId.eq(user.id))
        .count(&state.db)
        .await?;

    Ok(Json(ClientStatsResponse {
        total_cases,
        pending_cases,
        active_cases,
        completed_cases,
        total_files,
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "System-wide aggregate counts", body = AdminStatsResponse),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "reports"
)]
pub async fn admin_stats(
    State(state): State<crate::AppState>,
) -> Result<Json<AdminStatsResponse>, AppError> {
    let total_clients = Users::find()
        .filter(users::Column::Role.eq(UserRole::Cliente.as_str()))
        .count(&state.db)
        .await?;

    let total_cases = count_cases_with_status(&state.db, None, None).await?;
    let pending_cases = count_cases_with_status(&state.db, None, Some(CaseStatus::Pendente)).await?;
    let active_cases =
        count_cases_with_status(&state.db, None, Some(CaseStatus::EmAndamento)).await?;
    let completed_cases =
        count_cases_with_status(&state.db, None, Some(CaseStatus::Concluido)).await?;

    let total_files = ProcessFiles::find().count(&state.db).await?;
    let total_services = Services::find().count(&state.db).await?;

    Ok(Json(AdminStatsResponse {
        total_clients,
        total_cases,
        pending_cases,
        active_cases,
        completed_cases,
        total_files,
        total_services,
    }))
}
