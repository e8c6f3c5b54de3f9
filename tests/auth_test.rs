use advocacia_backend::config::AppConfig;
use advocacia_backend::entities::{prelude::*, users};
use advocacia_backend::infrastructure::{database, documents::DocumentStore};
use advocacia_backend::utils::password::hash_password;
use advocacia_backend::{AppState, create_app};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use http_body_util::BodyExt;
use sea_orm::{ActiveModelTrait, ColumnTrait, Database, EntityTrait, QueryFilter, Set};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

async fn setup_app(bootstrap_admin: bool) -> (Router, sea_orm::DatabaseConnection, tempfile::TempDir) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    database::run_migrations(&db).await.unwrap();

    let upload_dir = tempfile::tempdir().unwrap();
    let documents = Arc::new(DocumentStore::new(upload_dir.path()));
    documents.ensure_root().await.unwrap();

    let mut config = AppConfig::development();
    config.jwt_secret = "test_secret".to_string();
    config.upload_dir = upload_dir.path().to_string_lossy().to_string();
    config.bootstrap_admin = bootstrap_admin;

    let state = AppState {
        db: db.clone(),
        documents,
        config,
    };
    (create_app(state), db, upload_dir)
}

async fn post_json(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn get_with_token(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_register_login_verify() {
    let (app, _db, _dir) = setup_app(false).await;

    let (status, json) = post_json(
        &app,
        "/api/auth/register",
        r#"{"name": "Maria Souza", "email": "maria@gmail.com", "password": "senha_maria"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["user"]["role"], "cliente");
    assert_eq!(json["token_type"], "bearer");

    let (status, json) = post_json(
        &app,
        "/api/auth/login",
        r#"{"email": "maria@gmail.com", "password": "senha_maria"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = json["token"].as_str().unwrap().to_string();

    let (status, json) = get_with_token(&app, "/api/auth/verify", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["valid"], true);
    assert_eq!(json["user"]["email"], "maria@gmail.com");
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let (app, _db, _dir) = setup_app(false).await;

    let body = r#"{"name": "Maria", "email": "maria@gmail.com", "password": "senha_maria"}"#;
    let (status, _) = post_json(&app, "/api/auth/register", body).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = post_json(&app, "/api/auth/register", body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "Email já cadastrado");
}

#[tokio::test]
async fn test_register_short_password_rejected() {
    let (app, _db, _dir) = setup_app(false).await;

    let (status, json) = post_json(
        &app,
        "/api/auth/register",
        r#"{"name": "Maria", "email": "maria@gmail.com", "password": "123"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .contains("Senha deve ter pelo menos 6 caracteres")
    );
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let (app, _db, _dir) = setup_app(false).await;

    post_json(
        &app,
        "/api/auth/register",
        r#"{"name": "Maria", "email": "maria@gmail.com", "password": "senha_maria"}"#,
    )
    .await;

    let (status, json) = post_json(
        &app,
        "/api/auth/login",
        r#"{"email": "maria@gmail.com", "password": "errada"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Credenciais inválidas");

    let (status, json) = post_json(&app, "/api/auth/login", r#"{"email": "", "password": ""}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Email e senha são obrigatórios");
}

#[tokio::test]
async fn test_login_by_username() {
    let (app, db, _dir) = setup_app(false).await;

    users::ActiveModel {
        name: Set("Carlos Lima".to_string()),
        username: Set(Some("carlim".to_string())),
        email: Set("carlos@gmail.com".to_string()),
        password_hash: Set(hash_password("senha_carlos").unwrap()),
        role: Set("cliente".to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();

    let (status, json) = post_json(
        &app,
        "/api/auth/login",
        r#"{"email": "carlim", "password": "senha_carlos"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user"]["email"], "carlos@gmail.com");
}

#[tokio::test]
async fn test_bootstrap_admin_disabled_by_default() {
    let (app, _db, _dir) = setup_app(false).await;

    let (status, _) = post_json(
        &app,
        "/api/auth/login",
        r#"{"email": "admin", "password": "admin123"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bootstrap_admin_provisioning() {
    let (app, db, _dir) = setup_app(true).await;

    // First login against an empty user table creates the account
    let (status, json) = post_json(
        &app,
        "/api/auth/login",
        r#"{"email": "admin", "password": "admin123"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user"]["role"], "admin");
    let token = json["token"].as_str().unwrap().to_string();

    let admin = Users::find()
        .filter(users::Column::Username.eq("admin"))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(admin.email, "admin@admin.com");
    assert!(admin.password_hash.starts_with("$argon2"));

    // The token passes the admin gate
    let (status, _) = get_with_token(&app, "/api/admin/clients", &token).await;
    assert_eq!(status, StatusCode::OK);

    // Second login hits the stored row, not the bootstrap path
    let (status, _) = post_json(
        &app,
        "/api/auth/login",
        r#"{"email": "admin", "password": "admin123"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Once an admin exists, bootstrap never fires for other identifiers
    let (status, _) = post_json(
        &app,
        "/api/auth/login",
        r#"{"email": "admin", "password": "outra_senha"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_legacy_hash_login_upgrades_to_argon2() {
    let (app, db, _dir) = setup_app(false).await;

    // Hash format carried over from the previous system
    let legacy =
        "pbkdf2:sha256:260000$Xp9KmT2w$bcc5dadc36d20039fc59b49f66bc0ddcf8e7727094d337347d251ed092e2ca6e";
    let user = users::ActiveModel {
        name: Set("Antiga Cliente".to_string()),
        email: Set("antiga@gmail.com".to_string()),
        password_hash: Set(legacy.to_string()),
        role: Set("cliente".to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();

    let (status, _) = post_json(
        &app,
        "/api/auth/login",
        r#"{"email": "antiga@gmail.com", "password": "senha123"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let refreshed = Users::find_by_id(user.id).one(&db).await.unwrap().unwrap();
    assert!(refreshed.password_hash.starts_with("$argon2"));
    assert!(refreshed.last_login.is_some());

    // The upgraded hash still accepts the same password
    let (status, _) = post_json(
        &app,
        "/api/auth/login",
        r#"{"email": "antiga@gmail.com", "password": "senha123"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_routes_reject_clients_and_anonymous() {
    let (app, _db, _dir) = setup_app(false).await;

    let (_, json) = post_json(
        &app,
        "/api/auth/register",
        r#"{"name": "Maria", "email": "maria@gmail.com", "password": "senha_maria"}"#,
    )
    .await;
    let client_token = json["token"].as_str().unwrap().to_string();

    // Client token on an admin route
    let (status, json) = get_with_token(&app, "/api/admin/clients", &client_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "Acesso negado: apenas administradores");

    // No token at all
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/admin/clients")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Garbage token
    let (status, _) = get_with_token(&app, "/api/client/cases", "nonsense.token.here").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_token_works_on_client_portal_routes() {
    let (app, db, _dir) = setup_app(false).await;

    users::ActiveModel {
        name: Set("Dra. Paula".to_string()),
        email: Set("paula@escritorio.com".to_string()),
        password_hash: Set(hash_password("senha_da_paula").unwrap()),
        role: Set("admin".to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();

    let (_, json) = post_json(
        &app,
        "/api/auth/login",
        r#"{"email": "paula@escritorio.com", "password": "senha_da_paula"}"#,
    )
    .await;
    let token = json["token"].as_str().unwrap().to_string();

    // Portal routes are scoped per account, so an admin just sees empty data
    let (status, json) = get_with_token(&app, "/api/client/cases", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 0);

    let (status, json) = get_with_token(&app, "/api/client/stats", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_cases"], 0);
}

#[tokio::test]
async fn test_logout_and_token_in_query() {
    let (app, _db, _dir) = setup_app(false).await;

    let (_, json) = post_json(
        &app,
        "/api/auth/register",
        r#"{"name": "Maria", "email": "maria@gmail.com", "password": "senha_maria"}"#,
    )
    .await;
    let token = json["token"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Download links pass the token as a query parameter instead of a header
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/auth/verify?token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
