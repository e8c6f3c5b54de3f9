use crate::api::error::AppError;
use crate::utils::auth::validate_jwt;
use crate::{AppState, entities::prelude::Users, entities::users};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sea_orm::EntityTrait;
use serde::Deserialize;

#[derive(Deserialize)]
struct AuthQuery {
    token: Option<String>,
}

/// Validates the bearer token and loads the user row. The fresh row is what
/// authorization decisions run against, so a deleted account or a changed
/// role takes effect immediately, not at token expiry.
async fn authenticate(state: &AppState, req: &mut Request) -> Result<users::Model, AppError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|s| s.to_string());

    let token = if let Some(t) = auth_header {
        Some(t)
    } else {
        // Try query parameter, used by direct download links
        let query = req.uri().query().unwrap_or_default();
        serde_urlencoded::from_str::<AuthQuery>(query)
            .ok()
            .and_then(|q| q.token)
    };

    let token = token.ok_or_else(|| AppError::Unauthorized("Token não fornecido".to_string()))?;

    let claims = validate_jwt(&token, &state.config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Token inválido ou expirado".to_string()))?;

    let user = Users::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Usuário não encontrado".to_string()))?;

    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(user.clone());

    Ok(user)
}

/// Any authenticated user
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    authenticate(&state, &mut req).await?;
    Ok(next.run(req).await)
}

/// Admin accounts only. The client surface has no mirror-image gate: those
/// endpoints are scoped to the caller's own row, so any authenticated user
/// sees at most their own data there.
pub async fn admin_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&state, &mut req).await?;

    if user.role != "admin" {
        return Err(AppError::Forbidden(
            "Acesso negado: apenas administradores".to_string(),
        ));
    }

    Ok(next.run(req).await)
}
