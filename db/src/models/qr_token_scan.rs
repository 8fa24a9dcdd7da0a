use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// Append-only log of accepted scans. The composite primary key forbids a
/// second scan row for the same student on the same code.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "qr_token_scans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub token_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i64,

    pub scanned_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::qr_token::Entity",
        from = "Column::TokenId",
        to = "super::qr_token::Column::Id"
    )]
    Token,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StudentId",
        to = "super::user::Column::Id"
    )]
    Student,
}

impl Related<super::qr_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Token.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}
