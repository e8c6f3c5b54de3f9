use crate::config::AppConfig;
use crate::entities::{client_cases, consultations, favorites, process_files, services, users};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::time::Duration;
use tracing::info;

pub async fn connect(config: &AppConfig) -> anyhow::Result<DatabaseConnection> {
    info!("📂 Database: {}", config.database_url);

    let mut opt = ConnectOptions::new(&config.database_url);
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    Ok(db)
}

pub async fn setup_database(config: &AppConfig) -> anyhow::Result<DatabaseConnection> {
    let db = connect(config).await?;

    run_migrations(&db).await?;

    crate::infrastructure::seed::seed_services(&db).await?;

    Ok(db)
}

/// Schema is derived from the entities on every boot. Existing tables are
/// left untouched; the legacy MySQL database already matches this layout.
pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    info!("🔄 Running schema migrations...");

    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    // Parents before children, the FK constraints depend on it
    let stmts = vec![
        schema
            .create_table_from_entity(users::Entity)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(services::Entity)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(client_cases::Entity)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(process_files::Entity)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(favorites::Entity)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(consultations::Entity)
            .if_not_exists()
            .to_owned(),
    ];

    for stmt in stmts {
        let stmt = builder.build(&stmt);
        let _ = db.execute(stmt).await;
    }

    // Lookup indexes for the hot admin filters
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_client_cases_user_id ON client_cases(user_id);",
        "CREATE INDEX IF NOT EXISTS idx_client_cases_status ON client_cases(status);",
        "CREATE INDEX IF NOT EXISTS idx_process_files_user_id ON process_files(user_id);",
        "CREATE INDEX IF NOT EXISTS idx_process_files_case_id ON process_files(case_id);",
    ];
    for sql in indexes {
        let _ = db
            .execute(sea_orm::Statement::from_string(builder, sql.to_string()))
            .await;
    }

    Ok(())
}
