use crate::api::error::AppError;
use crate::api::handlers::cases::parse_status;
use crate::entities::{consultations, prelude::*, users};
use crate::models::CaseStatus;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct ConsultationResponse {
    pub id: i32,
    pub user_id: i32,
    pub service_id: i32,
    pub service_name: Option<String>,
    pub scheduled_date: chrono::DateTime<Utc>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
}

impl ConsultationResponse {
    fn new(consultation: consultations::Model, service_name: Option<String>) -> Self {
        Self {
            id: consultation.id,
            user_id: consultation.user_id,
            service_id: consultation.service_id,
            service_name,
            scheduled_date: consultation.scheduled_date,
            status: consultation.status,
            notes: consultation.notes,
            created_at: consultation.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AdminConsultationResponse {
    #[serde(flatten)]
    pub consultation: ConsultationResponse,
    pub client_name: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct BookConsultationRequest {
    pub service_id: i32,
    pub scheduled_date: chrono::DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateConsultationRequest {
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/client/consultations",
    request_body = BookConsultationRequest,
    responses(
        (status = 201, description = "Consultation booked", body = ConsultationResponse),
        (status = 404, description = "Service not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("jwt" = [])),
    tag = "consultations"
)]
pub async fn book_consultation(
    State(state): State<crate::AppState>,
    Extension(user): Extension<users::Model>,
    Json(payload): Json<BookConsultationRequest>,
) -> Result<(StatusCode, Json<ConsultationResponse>), AppError> {
    let service = Services::find_by_id(payload.service_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Serviço não encontrado".to_string()))?;

    let consultation = consultations::ActiveModel {
        user_id: Set(user.id),
        service_id: Set(service.id),
        scheduled_date: Set(payload.scheduled_date),
        status: Set(CaseStatus::Pendente.as_str().to_string()),
        notes: Set(payload.notes),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let consultation = consultation.insert(&state.db).await?;

    Ok((
        StatusCode::CREATED,
        Json(ConsultationResponse::new(consultation, Some(service.name))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/client/consultations",
    responses(
        (status = 200, description = "Caller's consultations", body = [ConsultationResponse]),
        (status = 401, description = "Unauthorized")
    ),
    security(("jwt" = [])),
    tag = "consultations"
)]
pub async fn my_consultations(
    State(state): State<crate::AppState>,
    Extension(user): Extension<users::Model>,
) -> Result<Json<Vec<ConsultationResponse>>, AppError> {
    let rows = Consultations::find()
        .filter(consultations::Column::UserId.eq(user.id))
        .order_by_desc(consultations::Column::CreatedAt)
        .find_also_related(Services)
        .all(&state.db)
        .await?;

    let result = rows
        .into_iter()
        .map(|(consultation, service)| {
            ConsultationResponse::new(consultation, service.map(|s| s.name))
        })
        .collect();

    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/api/admin/consultations",
    responses(
        (status = 200, description = "All consultations with client and service names", body = [AdminConsultationResponse]),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "consultations"
)]
pub async fn list_consultations(
    State(state): State<crate::AppState>,
) -> Result<Json<Vec<AdminConsultationResponse>>, AppError> {
    let rows = Consultations::find()
        .order_by_desc(consultations::Column::CreatedAt)
        .find_also_related(Services)
        .all(&state.db)
        .await?;

    let user_ids: Vec<i32> = rows.iter().map(|(c, _)| c.user_id).collect();
    let clients: HashMap<i32, String> = if user_ids.is_empty() {
        HashMap::new()
    } else {
        Users::find()
            .filter(crate::entities::users::Column::Id.is_in(user_ids))
            .all(&state.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect()
    };

    let result = rows
        .into_iter()
        .map(|(consultation, service)| AdminConsultationResponse {
            client_name: clients.get(&consultation.user_id).cloned(),
            consultation: ConsultationResponse::new(consultation, service.map(|s| s.name)),
        })
        .collect();

    Ok(Json(result))
}

#[utoipa::path(
    put,
    path = "/api/admin/consultations/{id}",
    params(("id" = i32, Path, description = "Consultation ID")),
    request_body = UpdateConsultationRequest,
    responses(
        (status = 200, description = "Consultation updated", body = ConsultationResponse),
        (status = 400, description = "Invalid status"),
        (status = 404, description = "Consultation not found"),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "consultations"
)]
pub async fn update_consultation(
    State(state): State<crate::AppState>,
    Path(consultation_id): Path<i32>,
    Json(payload): Json<UpdateConsultationRequest>,
) -> Result<Json<ConsultationResponse>, AppError> {
    let consultation = Consultations::find_by_id(consultation_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Consulta não encontrada".to_string()))?;

    let mut active: consultations::ActiveModel = consultation.into();
    if let Some(raw) = payload.status.as_deref() {
        let status = parse_status(raw)?;
        active.status = Set(status.as_str().to_string());
    }
    if let Some(notes) = payload.notes {
        active.notes = Set(Some(notes));
    }
    let consultation = active.update(&state.db).await?;

    let service_name = Services::find_by_id(consultation.service_id)
        .one(&state.db)
        .await?
        .map(|s| s.name);

    Ok(Json(ConsultationResponse::new(consultation, service_name)))
}
