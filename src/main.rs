use advocacia_backend::config::AppConfig;
use advocacia_backend::entities::{prelude::*, users};
use advocacia_backend::infrastructure::{database, documents::DocumentStore, seed};
use advocacia_backend::models::UserRole;
use advocacia_backend::utils::password::hash_password;
use advocacia_backend::{AppState, create_app};
use chrono::Utc;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Port for the API server
    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API server (default)
    Serve,
    /// Create the database schema and exit
    InitDb,
    /// Insert the standard service catalog
    Seed,
    /// Create an administrator account, or promote an existing one
    CreateAdmin {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        username: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initial Environment & Logging Setup
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "advocacia_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, args.port).await,
        Command::InitDb => {
            let db = database::connect(&config).await?;
            database::run_migrations(&db).await?;
            info!("✅ Schema created.");
            Ok(())
        }
        Command::Seed => {
            let db = database::connect(&config).await?;
            database::run_migrations(&db).await?;
            seed::seed_services(&db).await?;
            Ok(())
        }
        Command::CreateAdmin {
            name,
            email,
            password,
            username,
        } => {
            let db = database::connect(&config).await?;
            database::run_migrations(&db).await?;
            create_admin(&db, name, email, password, username).await
        }
    }
}

async fn serve(config: AppConfig, port: u16) -> anyhow::Result<()> {
    info!("🚀 Starting Advocacia Backend...");

    // 2. Setup Common Infrastructure
    let db = database::setup_database(&config).await?;

    let documents = Arc::new(DocumentStore::new(&config.upload_dir));
    documents.ensure_root().await?;

    info!(
        "🛡️  Upload limits: Max Size={}MB, Allowed origins={}",
        config.max_upload_size / 1024 / 1024,
        config.allowed_origins.join(", ")
    );

    let state = AppState {
        db,
        documents,
        config,
    };

    // Configure tracing layer for HTTP requests
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::http::Response<_>,
             latency: std::time::Duration,
             _span: &tracing::Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    let app = create_app(state).layer(trace_layer);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("✅ API Server listening on: http://0.0.0.0:{}", port);
    info!(
        "📖 Swagger UI documentation: http://localhost:{}/swagger-ui",
        port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Backend exited cleanly.");
    Ok(())
}

async fn create_admin(
    db: &sea_orm::DatabaseConnection,
    name: String,
    email: String,
    password: String,
    username: Option<String>,
) -> anyhow::Result<()> {
    let hash = hash_password(&password)?;

    match Users::find()
        .filter(users::Column::Email.eq(email.as_str()))
        .one(db)
        .await?
    {
        Some(user) => {
            let mut active: users::ActiveModel = user.into();
            active.name = Set(name);
            active.password_hash = Set(hash);
            active.role = Set(UserRole::Admin.as_str().to_string());
            active.update(db).await?;
            info!("🔑 Existing account {} promoted to administrator", email);
        }
        None => {
            let username = username.unwrap_or_else(|| {
                email
                    .split('@')
                    .next()
                    .unwrap_or("admin")
                    .to_string()
            });
            let admin = users::ActiveModel {
                name: Set(name),
                username: Set(Some(username)),
                email: Set(email.clone()),
                password_hash: Set(hash),
                role: Set(UserRole::Admin.as_str().to_string()),
                created_at: Set(Utc::now()),
                ..Default::default()
            };
            admin.insert(db).await?;
            info!("🔑 Administrator {} created", email);
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
