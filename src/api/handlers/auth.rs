use crate::api::error::AppError;
use crate::api::handlers::MessageResponse;
use crate::entities::{prelude::*, users};
use crate::models::UserRole;
use crate::utils::auth::create_jwt;
use crate::utils::password::{hash_password, is_legacy_hash, verify_password};
use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Email address or username
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct UserSummary {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<&users::Model> for UserSummary {
    fn from(user: &users::Model) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub user: UserSummary,
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 120, message = "Nome é obrigatório"))]
    pub name: String,
    #[validate(email(message = "Email inválido"))]
    pub email: String,
    #[validate(length(min = 6, message = "Senha deve ter pelo menos 6 caracteres"))]
    pub password: String,
    pub username: Option<String>,
    pub cpf: Option<String>,
    pub phone: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: UserSummary,
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let identifier = payload.email.trim();
    if identifier.is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email e senha são obrigatórios".to_string(),
        ));
    }

    // The login form has a single identifier field: email or username
    let mut user = Users::find()
        .filter(
            Condition::any()
                .add(users::Column::Email.eq(identifier))
                .add(users::Column::Username.eq(identifier)),
        )
        .one(&state.db)
        .await?;

    if user.is_none()
        && state.config.bootstrap_admin
        && identifier == "admin"
        && payload.password == "admin123"
    {
        user = Some(bootstrap_admin(&state).await?);
    }

    let user = user.ok_or_else(|| AppError::Unauthorized("Credenciais inválidas".to_string()))?;

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(AppError::Unauthorized("Credenciais inválidas".to_string()));
    }

    // Stamp the login; rows still carrying a legacy hash are rewritten with
    // argon2 now that the plaintext is known to match
    let legacy = is_legacy_hash(&user.password_hash);
    let mut active: users::ActiveModel = user.into();
    active.last_login = Set(Some(Utc::now()));
    if legacy {
        active.password_hash = Set(hash_password(&payload.password)?);
    }
    let user = active.update(&state.db).await?;
    if legacy {
        tracing::info!("Upgraded legacy password hash for user {}", user.id);
    }

    let token = create_jwt(
        user.id,
        &user.email,
        &user.role,
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )?;

    Ok(Json(LoginResponse {
        token,
        token_type: "bearer".to_string(),
        user: UserSummary::from(&user),
    }))
}

/// Legacy auto-provisioning carried over from the first deployment: logging
/// in as `admin`/`admin123` against a database with no admin account creates
/// one. Only active with BOOTSTRAP_ADMIN=true; the sanctioned path is the
/// `create-admin` subcommand.
async fn bootstrap_admin(state: &crate::AppState) -> Result<users::Model, AppError> {
    let existing_admin = Users::find()
        .filter(users::Column::Role.eq(UserRole::Admin.as_str()))
        .one(&state.db)
        .await?;
    if existing_admin.is_some() {
        return Err(AppError::Unauthorized("Credenciais inválidas".to_string()));
    }

    tracing::warn!("⚠️ No admin account found, bootstrapping default admin (BOOTSTRAP_ADMIN=true)");

    let admin = users::ActiveModel {
        name: Set("Administrador".to_string()),
        username: Set(Some("admin".to_string())),
        email: Set("admin@admin.com".to_string()),
        password_hash: Set(hash_password("admin123")?),
        role: Set(UserRole::Admin.as_str().to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    Ok(admin.insert(&state.db).await?)
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = LoginResponse),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email already registered")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<crate::AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let email_taken = Users::find()
        .filter(users::Column::Email.eq(payload.email.as_str()))
        .one(&state.db)
        .await?
        .is_some();
    if email_taken {
        return Err(AppError::Conflict("Email já cadastrado".to_string()));
    }

    if let Some(username) = payload.username.as_deref() {
        let username_taken = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&state.db)
            .await?
            .is_some();
        if username_taken {
            return Err(AppError::Conflict(
                "Nome de usuário já cadastrado".to_string(),
            ));
        }
    }

    let user = users::ActiveModel {
        name: Set(payload.name),
        username: Set(payload.username),
        email: Set(payload.email),
        password_hash: Set(hash_password(&payload.password)?),
        role: Set(UserRole::Cliente.as_str().to_string()),
        cpf: Set(payload.cpf),
        phone: Set(payload.phone),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let user = user.insert(&state.db).await?;

    let token = create_jwt(
        user.id,
        &user.email,
        &user.role,
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )?;

    Ok((
        StatusCode::CREATED,
        Json(LoginResponse {
            token,
            token_type: "bearer".to_string(),
            user: UserSummary::from(&user),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/auth/verify",
    responses(
        (status = 200, description = "Token is valid", body = VerifyResponse),
        (status = 401, description = "Missing, invalid or expired token")
    ),
    security(("jwt" = [])),
    tag = "auth"
)]
pub async fn verify(Extension(user): Extension<users::Model>) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        valid: true,
        user: UserSummary::from(&user),
    })
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logout acknowledged", body = MessageResponse)
    ),
    security(("jwt" = [])),
    tag = "auth"
)]
pub async fn logout() -> Json<MessageResponse> {
    // Tokens are stateless; discarding the client copy is the whole logout
    Json(MessageResponse::new("Logout realizado com sucesso"))
}
