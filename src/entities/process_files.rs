use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "process_files")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub case_id: Option<i32>,
    pub filename: String,
    pub original_filename: String,
    pub file_path: String,
    pub file_size: i64,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub uploaded_by: Option<i32>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Owner,
    #[sea_orm(
        belongs_to = "super::client_cases::Entity",
        from = "Column::CaseId",
        to = "super::client_cases::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    ClientCases,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UploadedBy",
        to = "super::users::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Uploader,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::client_cases::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClientCases.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
