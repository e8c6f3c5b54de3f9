use crate::api::error::AppError;
use crate::api::handlers::MessageResponse;
use crate::api::handlers::services::ServiceResponse;
use crate::entities::{favorites, prelude::*, users};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct AddFavoriteRequest {
    pub service_id: i32,
}

#[derive(Serialize, ToSchema)]
pub struct FavoriteStatusResponse {
    pub is_favorite: bool,
}

#[utoipa::path(
    get,
    path = "/api/favorites",
    responses(
        (status = 200, description = "Caller's favorite services", body = [ServiceResponse]),
        (status = 401, description = "Unauthorized")
    ),
    security(("jwt" = [])),
    tag = "favorites"
)]
pub async fn list_favorites(
    State(state): State<crate::AppState>,
    Extension(user): Extension<users::Model>,
) -> Result<Json<Vec<ServiceResponse>>, AppError> {
    let rows = Favorites::find()
        .filter(favorites::Column::UserId.eq(user.id))
        .order_by_desc(favorites::Column::CreatedAt)
        .find_also_related(Services)
        .all(&state.db)
        .await?;

    let services = rows
        .into_iter()
        .filter_map(|(_, service)| service)
        .map(ServiceResponse::from)
        .collect();

    Ok(Json(services))
}

#[utoipa::path(
    post,
    path = "/api/favorites",
    request_body = AddFavoriteRequest,
    responses(
        (status = 201, description = "Service favorited", body = MessageResponse),
        (status = 404, description = "Service not found"),
        (status = 409, description = "Already a favorite"),
        (status = 401, description = "Unauthorized")
    ),
    security(("jwt" = [])),
    tag = "favorites"
)]
pub async fn add_favorite(
    State(state): State<crate::AppState>,
    Extension(user): Extension<users::Model>,
    Json(payload): Json<AddFavoriteRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    Services::find_by_id(payload.service_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Serviço não encontrado".to_string()))?;

    let existing = Favorites::find_by_id((user.id, payload.service_id))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "Serviço já está nos favoritos".to_string(),
        ));
    }

    let favorite = favorites::ActiveModel {
        user_id: Set(user.id),
        service_id: Set(payload.service_id),
        created_at: Set(Utc::now()),
    };
    favorite.insert(&state.db).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Serviço adicionado aos favoritos")),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/favorites/{service_id}",
    params(("service_id" = i32, Path, description = "Service ID")),
    responses(
        (status = 200, description = "Favorite removed", body = MessageResponse),
        (status = 404, description = "Not a favorite"),
        (status = 401, description = "Unauthorized")
    ),
    security(("jwt" = [])),
    tag = "favorites"
)]
pub async fn remove_favorite(
    State(state): State<crate::AppState>,
    Extension(user): Extension<users::Model>,
    Path(service_id): Path<i32>,
) -> Result<Json<MessageResponse>, AppError> {
    let favorite = Favorites::find_by_id((user.id, service_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Serviço não está nos favoritos".to_string()))?;

    Favorites::delete_by_id((favorite.user_id, favorite.service_id))
        .exec(&state.db)
        .await?;

    Ok(Json(MessageResponse::new("Serviço removido dos favoritos")))
}

#[utoipa::path(
    get,
    path = "/api/favorites/{service_id}/check",
    params(("service_id" = i32, Path, description = "Service ID")),
    responses(
        (status = 200, description = "Whether the service is a favorite", body = FavoriteStatusResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("jwt" = [])),
    tag = "favorites"
)]
pub async fn check_favorite(
    State(state): State<crate::AppState>,
    Extension(user): Extension<users::Model>,
    Path(service_id): Path<i32>,
) -> Result<Json<FavoriteStatusResponse>, AppError> {
    let favorite = Favorites::find_by_id((user.id, service_id))
        .one(&state.db)
        .await?;

    Ok(Json(FavoriteStatusResponse {
        is_favorite: favorite.is_some(),
    }))
}
