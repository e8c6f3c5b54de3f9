use advocacia_backend::config::AppConfig;
use advocacia_backend::entities::{prelude::*, users};
use advocacia_backend::infrastructure::{database, documents::DocumentStore, seed};
use advocacia_backend::utils::password::hash_password;
use advocacia_backend::{AppState, create_app};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use http_body_util::BodyExt;
use sea_orm::{ActiveModelTrait, Database, EntityTrait, Set};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

async fn setup_app() -> (Router, sea_orm::DatabaseConnection, tempfile::TempDir) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    database::run_migrations(&db).await.unwrap();
    seed::seed_services(&db).await.unwrap();

    let upload_dir = tempfile::tempdir().unwrap();
    let documents = Arc::new(DocumentStore::new(upload_dir.path()));
    documents.ensure_root().await.unwrap();

    let mut config = AppConfig::development();
    config.jwt_secret = "test_secret".to_string();
    config.upload_dir = upload_dir.path().to_string_lossy().to_string();
    config.bootstrap_admin = false;

    let state = AppState {
        db: db.clone(),
        documents,
        config,
    };
    (create_app(state), db, upload_dir)
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = if let Some(body) = body {
        builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    } else {
        builder.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn seed_admin_token(app: &Router, db: &sea_orm::DatabaseConnection) -> String {
    users::ActiveModel {
        name: Set("Dra. Paula".to_string()),
        email: Set("paula@escritorio.com".to_string()),
        password_hash: Set(hash_password("senha_da_paula").unwrap()),
        role: Set("admin".to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();

    let (_, json) = request(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(r#"{"email": "paula@escritorio.com", "password": "senha_da_paula"}"#),
    )
    .await;
    json["token"].as_str().unwrap().to_string()
}

async fn register_client_token(app: &Router, email: &str) -> String {
    let body = format!(
        r#"{{"name": "Cliente Teste", "email": "{}", "password": "senha_cliente"}}"#,
        email
    );
    let (status, json) = request(app, "POST", "/api/auth/register", None, Some(&body)).await;
    assert_eq!(status, StatusCode::CREATED);
    json["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_categories_are_public() {
    let (app, _db, _dir) = setup_app().await;

    let (status, json) = request(&app, "GET", "/api/services/categories", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let categories = json.as_array().unwrap();
    assert_eq!(categories.len(), 5);
    assert!(categories.iter().any(|c| c["value"] == "multas"));
    assert!(
        categories
            .iter()
            .any(|c| c["value"] == "multas" && c["name"] == "Multas")
    );
}

#[tokio::test]
async fn test_catalog_listing_requires_auth() {
    let (app, _db, _dir) = setup_app().await;

    let (status, _) = request(&app, "GET", "/api/services", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = register_client_token(&app, "cliente@gmail.com").await;
    let (status, json) = request(&app, "GET", "/api/services", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let services = json.as_array().unwrap();
    assert_eq!(services.len(), 5);

    // Ordered by name
    let names: Vec<&str> = services.iter().map(|s| s["name"].as_str().unwrap()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[tokio::test]
async fn test_category_filter_and_validation() {
    let (app, _db, _dir) = setup_app().await;
    let token = register_client_token(&app, "cliente@gmail.com").await;

    let (status, json) = request(
        &app,
        "GET",
        "/api/services/category/cnh",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let services = json.as_array().unwrap();
    assert_eq!(services.len(), 2);
    assert!(services.iter().all(|s| s["category"] == "cnh"));

    let (status, json) = request(
        &app,
        "GET",
        "/api/services/category/imposto",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .contains("Categoria inválida: 'imposto'")
    );
}

#[tokio::test]
async fn test_service_crud_is_admin_only() {
    let (app, db, _dir) = setup_app().await;
    let admin = seed_admin_token(&app, &db).await;
    let client = register_client_token(&app, "cliente@gmail.com").await;

    let body = r#"{"name": "Recurso especial", "category": "recursos", "price": 1500.00, "duration_days": 30}"#;

    let (status, _) = request(&app, "POST", "/api/services", Some(&client), Some(body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = request(&app, "POST", "/api/services", Some(&admin), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    let service_id = json["id"].as_i64().unwrap();
    assert_eq!(json["name"], "Recurso especial");
    assert_eq!(json["active"], true);

    // Partial update
    let (status, json) = request(
        &app,
        "PUT",
        &format!("/api/services/{}", service_id),
        Some(&admin),
        Some(r#"{"price": 1800.00}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["price"].as_f64().unwrap(), 1800.0);
    assert_eq!(json["name"], "Recurso especial");

    // Unknown category on create
    let (status, _) = request(
        &app,
        "POST",
        "/api/services",
        Some(&admin),
        Some(r#"{"name": "Serviço estranho", "category": "tributario"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Clients can read it
    let (status, json) = request(
        &app,
        "GET",
        &format!("/api/services/{}", service_id),
        Some(&client),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Recurso especial");
}

#[tokio::test]
async fn test_delete_service_deactivates_when_referenced() {
    let (app, db, _dir) = setup_app().await;
    let admin = seed_admin_token(&app, &db).await;

    let (_, json) = request(
        &app,
        "POST",
        "/api/admin/clients",
        Some(&admin),
        Some(r#"{"name": "João", "email": "joao@gmail.com"}"#),
    )
    .await;
    let client_id = json["client"]["id"].as_i64().unwrap();

    let (_, json) = request(
        &app,
        "POST",
        "/api/services",
        Some(&admin),
        Some(r#"{"name": "Defesa de pontuação", "category": "multas"}"#),
    )
    .await;
    let linked_id = json["id"].as_i64().unwrap();

    let case_body = format!(
        r#"{{"title": "Recurso", "service_id": {}}}"#,
        linked_id
    );
    let (status, _) = request(
        &app,
        "POST",
        &format!("/api/admin/clients/{}/cases", client_id),
        Some(&admin),
        Some(&case_body),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Referenced by a case: retired, not removed
    let (status, json) = request(
        &app,
        "DELETE",
        &format!("/api/services/{}", linked_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["message"],
        "Serviço desativado: existem processos vinculados"
    );

    let retired = Services::find_by_id(linked_id as i32)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert!(!retired.active);

    // Unreferenced service goes away for real
    let (_, json) = request(
        &app,
        "POST",
        "/api/services",
        Some(&admin),
        Some(r#"{"name": "Serviço sem uso", "category": "consultoria"}"#),
    )
    .await;
    let orphan_id = json["id"].as_i64().unwrap();

    let (status, json) = request(
        &app,
        "DELETE",
        &format!("/api/services/{}", orphan_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Serviço removido com sucesso");
    assert!(
        Services::find_by_id(orphan_id as i32)
            .one(&db)
            .await
            .unwrap()
            .is_none()
    );

    // Retired services drop out of the catalog listing
    let client = register_client_token(&app, "cliente@gmail.com").await;
    let (_, json) = request(&app, "GET", "/api/services", Some(&client), None).await;
    let listed: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert!(!listed.contains(&"Defesa de pontuação"));
}

#[tokio::test]
async fn test_favorites_round_trip() {
    let (app, db, _dir) = setup_app().await;
    let token = register_client_token(&app, "cliente@gmail.com").await;

    let service = Services::find().one(&db).await.unwrap().unwrap();
    let body = format!(r#"{{"service_id": {}}}"#, service.id);

    let (status, json) = request(&app, "POST", "/api/favorites", Some(&token), Some(&body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["message"], "Serviço adicionado aos favoritos");

    // Same favorite twice conflicts
    let (status, json) = request(&app, "POST", "/api/favorites", Some(&token), Some(&body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "Serviço já está nos favoritos");

    let (status, json) = request(
        &app,
        "GET",
        &format!("/api/favorites/{}/check", service.id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_favorite"], true);

    let (status, json) = request(&app, "GET", "/api/favorites", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let favorites = json.as_array().unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0]["id"].as_i64().unwrap(), service.id as i64);

    let (status, json) = request(
        &app,
        "DELETE",
        &format!("/api/favorites/{}", service.id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Serviço removido dos favoritos");

    let (status, json) = request(
        &app,
        "DELETE",
        &format!("/api/favorites/{}", service.id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Serviço não está nos favoritos");

    let (_, json) = request(
        &app,
        "GET",
        &format!("/api/favorites/{}/check", service.id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(json["is_favorite"], false);
}

#[tokio::test]
async fn test_favorite_requires_existing_service() {
    let (app, _db, _dir) = setup_app().await;
    let token = register_client_token(&app, "cliente@gmail.com").await;

    let (status, json) = request(
        &app,
        "POST",
        "/api/favorites",
        Some(&token),
        Some(r#"{"service_id": 9999}"#),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Serviço não encontrado");
}

#[tokio::test]
async fn test_consultation_booking_flow() {
    let (app, db, _dir) = setup_app().await;
    let admin = seed_admin_token(&app, &db).await;
    let token = register_client_token(&app, "cliente@gmail.com").await;

    let service = Services::find().one(&db).await.unwrap().unwrap();
    let body = format!(
        r#"{{"service_id": {}, "scheduled_date": "2026-09-01T14:00:00Z", "notes": "Prefere horário de almoço"}}"#,
        service.id
    );

    let (status, json) = request(
        &app,
        "POST",
        "/api/client/consultations",
        Some(&token),
        Some(&body),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["status"], "pendente");
    assert_eq!(json["service_name"], service.name);
    let consultation_id = json["id"].as_i64().unwrap();

    let (status, json) = request(&app, "GET", "/api/client/consultations", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);

    // The firm sees it with the client name attached
    let (status, json) = request(&app, "GET", "/api/admin/consultations", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["client_name"], "Cliente Teste");

    let (status, json) = request(
        &app,
        "PUT",
        &format!("/api/admin/consultations/{}", consultation_id),
        Some(&admin),
        Some(r#"{"status": "concluido"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "concluido");

    let (status, _) = request(
        &app,
        "PUT",
        &format!("/api/admin/consultations/{}", consultation_id),
        Some(&admin),
        Some(r#"{"status": "encerrado"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = request(
        &app,
        "PUT",
        "/api/admin/consultations/9999",
        Some(&admin),
        Some(r#"{"status": "concluido"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Consulta não encontrada");
}

#[tokio::test]
async fn test_booking_unknown_service_is_404() {
    let (app, _db, _dir) = setup_app().await;
    let token = register_client_token(&app, "cliente@gmail.com").await;

    let (status, json) = request(
        &app,
        "POST",
        "/api/client/consultations",
        Some(&token),
        Some(r#"{"service_id": 9999, "scheduled_date": "2026-09-01T14:00:00Z"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Serviço não encontrado");
}

#[tokio::test]
async fn test_admin_stats_shape() {
    let (app, db, _dir) = setup_app().await;
    let admin = seed_admin_token(&app, &db).await;

    let (_, json) = request(
        &app,
        "POST",
        "/api/admin/clients",
        Some(&admin),
        Some(r#"{"name": "João", "email": "joao@gmail.com"}"#),
    )
    .await;
    let client_id = json["client"]["id"].as_i64().unwrap();

    for status in ["pendente", "em_andamento", "concluido"] {
        let body = format!(r#"{{"title": "Processo {}", "status": "{}"}}"#, status, status);
        let (code, _) = request(
            &app,
            "POST",
            &format!("/api/admin/clients/{}/cases", client_id),
            Some(&admin),
            Some(&body),
        )
        .await;
        assert_eq!(code, StatusCode::CREATED);
    }

    let (status, json) = request(&app, "GET", "/api/admin/stats", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_clients"], 1);
    assert_eq!(json["total_cases"], 3);
    assert_eq!(json["pending_cases"], 1);
    assert_eq!(json["active_cases"], 1);
    assert_eq!(json["completed_cases"], 1);
    assert_eq!(json["total_services"], 5);
    assert_eq!(json["total_files"], 0);
}
