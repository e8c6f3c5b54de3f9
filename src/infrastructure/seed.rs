use crate::entities::{prelude::*, services};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::info;

/// Idempotently insert the firm's standard catalog. Prices are in BRL.
pub async fn seed_services(db: &DatabaseConnection) -> anyhow::Result<()> {
    info!("🌱 Seeding service catalog...");

    let catalog = vec![
        (
            "Suspensão de CNH",
            "Defesa administrativa e judicial contra a suspensão do direito de dirigir",
            "cnh",
            Decimal::new(150000, 2),
            90,
        ),
        (
            "Cassação de CNH",
            "Defesa em processos de cassação da carteira de habilitação",
            "cnh",
            Decimal::new(200000, 2),
            120,
        ),
        (
            "Multa de Trânsito",
            "Recursos contra multas de trânsito em todas as instâncias",
            "multas",
            Decimal::new(50000, 2),
            60,
        ),
        (
            "Acidente de Trânsito",
            "Assessoria jurídica completa em casos de acidente de trânsito",
            "acidentes",
            Decimal::new(250000, 2),
            180,
        ),
        (
            "Habilitação Especial",
            "Consultoria para obtenção de habilitação em casos especiais",
            "consultoria",
            Decimal::new(120000, 2),
            45,
        ),
    ];

    for (name, description, category, price, duration_days) in catalog {
        let exists = Services::find()
            .filter(services::Column::Name.eq(name))
            .one(db)
            .await?;

        if exists.is_none() {
            let model = services::ActiveModel {
                name: Set(name.to_string()),
                description: Set(Some(description.to_string())),
                category: Set(category.to_string()),
                price: Set(Some(price)),
                duration_days: Set(Some(duration_days)),
                active: Set(true),
                created_at: Set(Utc::now()),
                ..Default::default()
            };
            model.insert(db).await?;
        }
    }

    info!("✅ Seeding completed.");
    Ok(())
}
