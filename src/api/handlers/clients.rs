use crate::api::error::AppError;
use crate::api::handlers::MessageResponse;
use crate::api::handlers::cases::CaseResponse;
use crate::entities::{prelude::*, process_files, users};
use crate::models::UserRole;
use crate::utils::password::hash_password;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Full client profile, the shape every client-facing and admin listing uses
#[derive(Serialize, ToSchema)]
pub struct ClientResponse {
    pub id: i32,
    pub name: String,
    pub username: Option<String>,
    pub email: String,
    pub role: String,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub last_login: Option<chrono::DateTime<Utc>>,
}

impl From<users::Model> for ClientResponse {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            username: user.username,
            email: user.email,
            role: user.role,
            cpf: user.cpf,
            phone: user.phone,
            address: user.address,
            city: user.city,
            state: user.state,
            zip_code: user.zip_code,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ClientDetailResponse {
    #[serde(flatten)]
    pub client: ClientResponse,
    pub cases: Vec<CaseResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct ClientEnvelope {
    pub message: String,
    pub client: ClientResponse,
}

#[derive(Serialize, ToSchema)]
pub struct ProfileEnvelope {
    pub message: String,
    pub user: ClientResponse,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<u64>,
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 120, message = "Nome é obrigatório"))]
    pub name: String,
    #[validate(email(message = "Email inválido"))]
    pub email: String,
    /// Falls back to the configured temporary password when omitted
    pub password: Option<String>,
    pub username: Option<String>,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

async fn email_in_use_by_other(
    db: &sea_orm::DatabaseConnection,
    email: &str,
    user_id: i32,
) -> Result<bool, AppError> {
    let existing = Users::find()
        .filter(users::Column::Email.eq(email))
        .filter(users::Column::Id.ne(user_id))
        .one(db)
        .await?;
    Ok(existing.is_some())
}

fn apply_profile_fields(active: &mut users::ActiveModel, payload: &UpdateClientRequest) {
    if let Some(name) = &payload.name {
        active.name = Set(name.clone());
    }
    if let Some(username) = &payload.username {
        active.username = Set(Some(username.clone()));
    }
    if let Some(cpf) = &payload.cpf {
        active.cpf = Set(Some(cpf.clone()));
    }
    if let Some(phone) = &payload.phone {
        active.phone = Set(Some(phone.clone()));
    }
    if let Some(address) = &payload.address {
        active.address = Set(Some(address.clone()));
    }
    if let Some(city) = &payload.city {
        active.city = Set(Some(city.clone()));
    }
    if let Some(state) = &payload.state {
        active.state = Set(Some(state.clone()));
    }
    if let Some(zip_code) = &payload.zip_code {
        active.zip_code = Set(Some(zip_code.clone()));
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/clients",
    responses(
        (status = 200, description = "All clients, newest first", body = [ClientResponse]),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "clients"
)]
pub async fn list_clients(
    State(state): State<crate::AppState>,
) -> Result<Json<Vec<ClientResponse>>, AppError> {
    let clients = Users::find()
        .filter(users::Column::Role.eq(UserRole::Cliente.as_str()))
        .order_by_desc(users::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(clients.into_iter().map(ClientResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/admin/clients/search",
    params(
        ("q" = String, Query, description = "Substring matched against name or email"),
        ("limit" = Option<u64>, Query, description = "Maximum results, default 10")
    ),
    responses(
        (status = 200, description = "Matching clients", body = [ClientResponse]),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "clients"
)]
pub async fn search_clients(
    State(state): State<crate::AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ClientResponse>>, AppError> {
    let q = query.q.trim();
    if q.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let clients = Users::find()
        .filter(users::Column::Role.eq(UserRole::Cliente.as_str()))
        .filter(
            Condition::any()
                .add(users::Column::Name.contains(q))
                .add(users::Column::Email.contains(q)),
        )
        .order_by_desc(users::Column::CreatedAt)
        .limit(query.limit.unwrap_or(10))
        .all(&state.db)
        .await?;

    Ok(Json(clients.into_iter().map(ClientResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/admin/clients",
    request_body = CreateClientRequest,
    responses(
        (status = 201, description = "Client created", body = ClientEnvelope),
        (status = 409, description = "Email already registered"),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "clients"
)]
pub async fn create_client(
    State(state): State<crate::AppState>,
    Json(payload): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<ClientEnvelope>), AppError> {
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

    // Clients created by the firm start with a temporary password the lawyer
    // hands over out of band
    let password = payload
        .password
        .unwrap_or_else(|| state.config.default_client_password.clone());

    let client = users::ActiveModel {
        name: Set(payload.name),
        username: Set(payload.username),
        email: Set(payload.email),
        password_hash: Set(hash_password(&password)?),
        role: Set(UserRole::Cliente.as_str().to_string()),
        cpf: Set(payload.cpf),
        phone: Set(payload.phone),
        address: Set(payload.address),
        city: Set(payload.city),
        state: Set(payload.state),
        zip_code: Set(payload.zip_code),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let client = client.insert(&state.db).await?;

    Ok((
        StatusCode::CREATED,
        Json(ClientEnvelope {
            message: "Cliente criado com sucesso".to_string(),
            client: ClientResponse::from(client),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/clients/{id}",
    params(("id" = i32, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Client with embedded cases", body = ClientDetailResponse),
        (status = 404, description = "Client not found"),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "clients"
)]
pub async fn get_client(
    State(state): State<crate::AppState>,
    Path(client_id): Path<i32>,
) -> Result<Json<ClientDetailResponse>, AppError> {
    let client = Users::find_by_id(client_id)
        .filter(users::Column::Role.eq(UserRole::Cliente.as_str()))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Cliente não encontrado".to_string()))?;

    let cases = ClientCases::find()
        .filter(crate::entities::client_cases::Column::UserId.eq(client_id))
        .order_by_desc(crate::entities::client_cases::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(ClientDetailResponse {
        client: ClientResponse::from(client),
        cases: cases.into_iter().map(CaseResponse::from).collect(),
    }))
}

#[utoipa::path(
    put,
    path = "/api/admin/clients/{id}",
    params(("id" = i32, Path, description = "Client ID")),
    request_body = UpdateClientRequest,
    responses(
        (status = 200, description = "Client updated", body = ClientEnvelope),
        (status = 404, description = "Client not found"),
        (status = 409, description = "Email belongs to another user"),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "clients"
)]
pub async fn update_client(
    State(state): State<crate::AppState>,
    Path(client_id): Path<i32>,
    Json(payload): Json<UpdateClientRequest>,
) -> Result<Json<ClientEnvelope>, AppError> {
    let client = Users::find_by_id(client_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Cliente não encontrado".to_string()))?;

    if let Some(email) = payload.email.as_deref() {
        if email != client.email && email_in_use_by_other(&state.db, email, client.id).await? {
            return Err(AppError::Conflict("Email já cadastrado".to_string()));
        }
    }

    let mut active: users::ActiveModel = client.into();
    if let Some(email) = &payload.email {
        active.email = Set(email.clone());
    }
    apply_profile_fields(&mut active, &payload);
    let client = active.update(&state.db).await?;

    Ok(Json(ClientEnvelope {
        message: "Cliente atualizado com sucesso".to_string(),
        client: ClientResponse::from(client),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/admin/clients/{id}",
    params(("id" = i32, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Client deleted", body = MessageResponse),
        (status = 400, description = "User is not a client"),
        (status = 404, description = "Client not found"),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "clients"
)]
pub async fn delete_client(
    State(state): State<crate::AppState>,
    Path(client_id): Path<i32>,
) -> Result<Json<MessageResponse>, AppError> {
    let client = Users::find_by_id(client_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Cliente não encontrado".to_string()))?;

    if client.role != UserRole::Cliente.as_str() {
        return Err(AppError::BadRequest("Usuário não é um cliente".to_string()));
    }

    // Stored names must be collected before the cascade wipes the rows
    let files = ProcessFiles::find()
        .filter(process_files::Column::UserId.eq(client_id))
        .all(&state.db)
        .await?;

    Users::delete_by_id(client_id).exec(&state.db).await?;

    for file in files {
        state.documents.remove(&file.filename).await;
    }

    Ok(Json(MessageResponse::new("Cliente excluído com sucesso")))
}

#[utoipa::path(
    get,
    path = "/api/client/profile",
    responses(
        (status = 200, description = "Caller's own profile", body = ClientResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("jwt" = [])),
    tag = "client"
)]
pub async fn get_profile(Extension(user): Extension<users::Model>) -> Json<ClientResponse> {
    Json(ClientResponse::from(user))
}

#[utoipa::path(
    put,
    path = "/api/client/profile",
    request_body = UpdateClientRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileEnvelope),
        (status = 409, description = "Email belongs to another user"),
        (status = 401, description = "Unauthorized")
    ),
    security(("jwt" = [])),
    tag = "client"
)]
pub async fn update_profile(
    State(state): State<crate::AppState>,
    Extension(user): Extension<users::Model>,
    Json(payload): Json<UpdateClientRequest>,
) -> Result<Json<ProfileEnvelope>, AppError> {
    if let Some(email) = payload.email.as_deref() {
        if email != user.email && email_in_use_by_other(&state.db, email, user.id).await? {
            return Err(AppError::Conflict("Email já cadastrado".to_string()));
        }
    }

    let mut active: users::ActiveModel = user.into();
    if let Some(email) = &payload.email {
        active.email = Set(email.clone());
    }
    apply_profile_fields(&mut active, &payload);
    let user = active.update(&state.db).await?;

    Ok(Json(ProfileEnvelope {
        message: "Perfil atualizado com sucesso".to_string(),
        user: ClientResponse::from(user),
    }))
}
