use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

/// Pending finalization for one QR code, persisted at issuance so a restart
/// cannot lose the sweep. `completed_at` doubles as the cancellation marker:
/// a manual deactivation completes the row and the worker skips it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "finalize_queue")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub token_id: i64,
    pub due_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::qr_token::Entity",
        from = "Column::TokenId",
        to = "super::qr_token::Column::Id"
    )]
    Token,
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

impl Model {
    pub async fn schedule<C: ConnectionTrait>(
        db: &C,
        token_id: i64,
        due_at: DateTime<Utc>,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let task = ActiveModel {
            token_id: Set(token_id),
            due_at: Set(due_at),
            completed_at: Set(None),
            attempts: Set(0),
            last_error: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        task.insert(db).await
    }

    /// Open tasks whose due time has passed, oldest first.
    pub async fn due<C: ConnectionTrait>(
        db: &C,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self>, DbErr> {
        use sea_orm::QueryOrder;

        Entity::find()
            .filter(Column::CompletedAt.is_null())
            .filter(Column::DueAt.lte(now))
            .order_by_asc(Column::DueAt)
            .all(db)
            .await
    }

    pub async fn mark_completed<C: ConnectionTrait>(
        db: &C,
        token_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        use sea_orm::sea_query::Expr;

        Entity::update_many()
            .col_expr(Column::CompletedAt, Expr::value(now))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::TokenId.eq(token_id))
            .filter(Column::CompletedAt.is_null())
            .exec(db)
            .await?;
        Ok(())
    }

    /// Records a failed attempt so the next poll retries and operators can
    /// reconcile tokens that keep failing.
    pub async fn mark_failed<C: ConnectionTrait>(
        db: &C,
        token_id: i64,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        use sea_orm::sea_query::Expr;

        Entity::update_many()
            .col_expr(Column::Attempts, Expr::col(Column::Attempts).add(1))
            .col_expr(Column::LastError, Expr::value(error))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::TokenId.eq(token_id))
            .exec(db)
            .await?;
        Ok(())
    }
}
