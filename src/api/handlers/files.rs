use crate::api::error::AppError;
use crate::api::handlers::MessageResponse;
use crate::entities::{client_cases, prelude::*, process_files, users};
use crate::models::UserRole;
use crate::utils::validation::{
    content_type_for, sanitize_filename, stored_filename, validate_extension, validate_file_size,
};
use axum::{
    Extension, Json,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio_util::io::ReaderStream;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct FileResponse {
    pub id: i32,
    pub user_id: i32,
    pub case_id: Option<i32>,
    pub filename: String,
    pub original_filename: String,
    pub file_size: i64,
    pub description: Option<String>,
    pub uploaded_by: Option<i32>,
    pub created_at: chrono::DateTime<Utc>,
}

impl From<process_files::Model> for FileResponse {
    fn from(file: process_files::Model) -> Self {
        Self {
            id: file.id,
            user_id: file.user_id,
            case_id: file.case_id,
            filename: file.filename,
            original_filename: file.original_filename,
            file_size: file.file_size,
            description: file.description,
            uploaded_by: file.uploaded_by,
            created_at: file.created_at,
        }
    }
}

/// File row joined with client and case info for the back-office listing
#[derive(Serialize, ToSchema)]
pub struct AdminFileResponse {
    #[serde(flatten)]
    pub file: FileResponse,
    pub client_name: Option<String>,
    pub case_title: Option<String>,
}

/// File row with case context, the shape the client portal lists
#[derive(Serialize, ToSchema)]
pub struct ClientFileResponse {
    #[serde(flatten)]
    pub file: FileResponse,
    pub case_title: Option<String>,
    pub case_status: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct FileEnvelope {
    pub message: String,
    pub file: FileResponse,
}

#[derive(Deserialize)]
pub struct FileFilter {
    pub client_id: Option<i32>,
    pub case_id: Option<i32>,
}

#[utoipa::path(
    post,
    path = "/api/admin/process-files",
    request_body(content = Vec<u8>, description = "file plus client_id, optional case_id and description", content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Document stored", body = FileEnvelope),
        (status = 400, description = "Missing file, bad extension or case mismatch"),
        (status = 404, description = "Client or case not found"),
        (status = 413, description = "Document exceeds the size limit"),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "files"
)]
pub async fn upload_process_file(
    State(state): State<crate::AppState>,
    Extension(admin): Extension<users::Model>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FileEnvelope>), AppError> {
    let mut original_filename = None;
    let mut data: Option<Vec<u8>> = None;
    let mut client_id: Option<i32> = None;
    let mut case_id: Option<i32> = None;
    let mut description: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        let err_msg = e.to_string();
        if err_msg.contains("length limit exceeded") {
            AppError::PayloadTooLarge("Arquivo excede o tamanho máximo permitido".to_string())
        } else {
            AppError::BadRequest(err_msg)
        }
    })? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                let raw_name = field.file_name().unwrap_or("").to_string();
                original_filename = Some(
                    sanitize_filename(&raw_name)
                        .map_err(|e| AppError::BadRequest(e.to_string()))?,
                );
                let bytes = field.bytes().await.map_err(|e| {
                    let err_msg = e.to_string();
                    if err_msg.contains("length limit exceeded") {
                        AppError::PayloadTooLarge(
                            "Arquivo excede o tamanho máximo permitido".to_string(),
                        )
                    } else {
                        AppError::BadRequest(err_msg)
                    }
                })?;
                data = Some(bytes.to_vec());
            }
            "client_id" => {
                let text = field.text().await.unwrap_or_default();
                client_id = text.trim().parse().ok();
            }
            "case_id" => {
                let text = field.text().await.unwrap_or_default();
                if !text.trim().is_empty() && text != "null" {
                    case_id = Some(text.trim().parse().map_err(|_| {
                        AppError::BadRequest("case_id inválido".to_string())
                    })?);
                }
            }
            "description" => {
                let text = field.text().await.unwrap_or_default();
                if !text.is_empty() {
                    description = Some(text);
                }
            }
            _ => {}
        }
    }

    let original_filename = original_filename
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::BadRequest("Nenhum arquivo enviado".to_string()))?;
    let data =
        data.ok_or_else(|| AppError::BadRequest("Nenhum arquivo enviado".to_string()))?;
    let client_id = client_id
        .ok_or_else(|| AppError::BadRequest("ID do cliente é obrigatório".to_string()))?;

    let extension =
        validate_extension(&original_filename).map_err(|e| AppError::BadRequest(e.to_string()))?;
    validate_file_size(data.len(), state.config.max_upload_size)
        .map_err(|e| AppError::PayloadTooLarge(e.to_string()))?;

    let client = Users::find_by_id(client_id)
        .one(&state.db)
        .await?
        .filter(|u| u.role == UserRole::Cliente.as_str())
        .ok_or_else(|| AppError::NotFound("Cliente não encontrado".to_string()))?;

    if let Some(case_id) = case_id {
        let case = ClientCases::find_by_id(case_id)
            .one(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Processo não encontrado".to_string()))?;
        if case.user_id != client.id {
            return Err(AppError::BadRequest(
                "Processo não pertence ao cliente".to_string(),
            ));
        }
    }

    // Stage to a temp file, record the row, then rename into place. An
    // aborted request drops the staged file; a failed rename rolls the row
    // back. The disk never keeps a document the database does not know.
    let staged = state.documents.stage(&data).await?;
    let stored_name = stored_filename(&extension);
    let dest = state.documents.path_for(&stored_name);

    let record = process_files::ActiveModel {
        user_id: Set(client.id),
        case_id: Set(case_id),
        filename: Set(stored_name.clone()),
        original_filename: Set(original_filename),
        file_path: Set(dest.to_string_lossy().into_owned()),
        file_size: Set(data.len() as i64),
        description: Set(description),
        uploaded_by: Set(Some(admin.id)),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let record = record.insert(&state.db).await?;

    if let Err(e) = state.documents.commit(staged, &stored_name) {
        let _ = ProcessFiles::delete_by_id(record.id).exec(&state.db).await;
        return Err(AppError::Internal(format!(
            "Failed to persist document: {}",
            e
        )));
    }

    Ok((
        StatusCode::CREATED,
        Json(FileEnvelope {
            message: "Arquivo enviado com sucesso".to_string(),
            file: FileResponse::from(record),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/process-files",
    params(
        ("client_id" = Option<i32>, Query, description = "Restrict to one client"),
        ("case_id" = Option<i32>, Query, description = "Restrict to one case")
    ),
    responses(
        (status = 200, description = "Document metadata", body = [AdminFileResponse]),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "files"
)]
pub async fn list_process_files(
    State(state): State<crate::AppState>,
    Query(filter): Query<FileFilter>,
) -> Result<Json<Vec<AdminFileResponse>>, AppError> {
    let mut query = ProcessFiles::find();
    if let Some(client_id) = filter.client_id {
        query = query.filter(process_files::Column::UserId.eq(client_id));
    }
    if let Some(case_id) = filter.case_id {
        query = query.filter(process_files::Column::CaseId.eq(case_id));
    }

    let files = query
        .order_by_desc(process_files::Column::CreatedAt)
        .find_also_related(Users)
        .all(&state.db)
        .await?;

    let case_titles = case_titles_for(&state.db, files.iter().map(|(f, _)| f)).await?;

    let result = files
        .into_iter()
        .map(|(file, client)| AdminFileResponse {
            case_title: file
                .case_id
                .and_then(|id| case_titles.get(&id).cloned()),
            client_name: client.map(|c| c.name),
            file: FileResponse::from(file),
        })
        .collect();

    Ok(Json(result))
}

async fn case_titles_for<'a>(
    db: &sea_orm::DatabaseConnection,
    files: impl Iterator<Item = &'a process_files::Model>,
) -> Result<HashMap<i32, String>, AppError> {
    let case_ids: Vec<i32> = files.filter_map(|f| f.case_id).collect();
    if case_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let cases = ClientCases::find()
        .filter(client_cases::Column::Id.is_in(case_ids))
        .all(db)
        .await?;
    Ok(cases.into_iter().map(|c| (c.id, c.title)).collect())
}

#[utoipa::path(
    get,
    path = "/api/admin/process-files/{id}/download",
    params(("id" = i32, Path, description = "File ID")),
    responses(
        (status = 200, description = "Document byte stream"),
        (status = 404, description = "File not found"),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "files"
)]
pub async fn download_process_file(
    State(state): State<crate::AppState>,
    Path(file_id): Path<i32>,
) -> Result<Response, AppError> {
    let record = ProcessFiles::find_by_id(file_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Arquivo não encontrado".to_string()))?;

    stream_document(&state, &record).await
}

#[utoipa::path(
    delete,
    path = "/api/admin/process-files/{id}",
    params(("id" = i32, Path, description = "File ID")),
    responses(
        (status = 200, description = "Document deleted", body = MessageResponse),
        (status = 404, description = "File not found"),
        (status = 403, description = "Admin only")
    ),
    security(("jwt" = [])),
    tag = "files"
)]
pub async fn delete_process_file(
    State(state): State<crate::AppState>,
    Path(file_id): Path<i32>,
) -> Result<Json<MessageResponse>, AppError> {
    let record = ProcessFiles::find_by_id(file_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Arquivo não encontrado".to_string()))?;

    ProcessFiles::delete_by_id(record.id).exec(&state.db).await?;
    state.documents.remove(&record.filename).await;

    Ok(Json(MessageResponse::new("Arquivo excluído com sucesso")))
}

#[utoipa::path(
    get,
    path = "/api/client/files",
    responses(
        (status = 200, description = "Caller's documents with case context", body = [ClientFileResponse]),
        (status = 401, description = "Unauthorized")
    ),
    security(("jwt" = [])),
    tag = "client"
)]
pub async fn my_files(
    State(state): State<crate::AppState>,
    Extension(user): Extension<users::Model>,
) -> Result<Json<Vec<ClientFileResponse>>, AppError> {
    let files = ProcessFiles::find()
        .filter(process_files::Column::UserId.eq(user.id))
        .order_by_desc(process_files::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let case_ids: Vec<i32> = files.iter().filter_map(|f| f.case_id).collect();
    let cases: HashMap<i32, client_cases::Model> = if case_ids.is_empty() {
        HashMap::new()
    } else {
        ClientCases::find()
            .filter(client_cases::Column::Id.is_in(case_ids))
            .all(&state.db)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect()
    };

    let result = files
        .into_iter()
        .map(|file| {
            let case = file.case_id.and_then(|id| cases.get(&id));
            ClientFileResponse {
                case_title: case.map(|c| c.title.clone()),
                case_status: case.map(|c| c.status.clone()),
                file: FileResponse::from(file),
            }
        })
        .collect();

    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/api/client/files/{id}/download",
    params(("id" = i32, Path, description = "File ID")),
    responses(
        (status = 200, description = "Document byte stream"),
        (status = 404, description = "File not found or not owned by the caller"),
        (status = 401, description = "Unauthorized")
    ),
    security(("jwt" = [])),
    tag = "client"
)]
pub async fn download_my_file(
    State(state): State<crate::AppState>,
    Extension(user): Extension<users::Model>,
    Path(file_id): Path<i32>,
) -> Result<Response, AppError> {
    // Another client's file id answers exactly like a missing one
    let record = ProcessFiles::find_by_id(file_id)
        .filter(process_files::Column::UserId.eq(user.id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Arquivo não encontrado".to_string()))?;

    stream_document(&state, &record).await
}

async fn stream_document(
    state: &crate::AppState,
    record: &process_files::Model,
) -> Result<Response, AppError> {
    let (file, len) = state.documents.open(&record.filename).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::NotFound("Arquivo não encontrado no servidor".to_string())
        } else {
            AppError::Io(e)
        }
    })?;

    let content_type = content_type_for(&record.original_filename);

    let ascii_filename: String = record
        .original_filename
        .chars()
        .filter(|c| c.is_ascii() && !c.is_control() && *c != '"' && *c != '\\' && *c != ';')
        .collect();
    let fallback = if ascii_filename.is_empty() {
        "documento"
    } else {
        &ascii_filename
    };
    let encoded = utf8_percent_encode(&record.original_filename, NON_ALPHANUMERIC).to_string();
    let content_disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    );

    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_LENGTH, len.to_string()),
            (header::CONTENT_DISPOSITION, content_disposition),
        ],
        body,
    )
        .into_response())
}
