use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set};

/// Enrollment snapshot for one QR code, frozen at issuance. Students who
/// enroll after the code is issued do not appear here and cannot scan it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "qr_token_roster")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub token_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i64,
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

impl Model {
    /// Writes the frozen roster for a freshly issued code.
    pub async fn snapshot<C: ConnectionTrait>(
        db: &C,
        token_id: i64,
        student_ids: &[i64],
    ) -> Result<(), DbErr> {
        if student_ids.is_empty() {
            return Ok(());
        }

        let rows = student_ids.iter().map(|student_id| ActiveModel {
            token_id: Set(token_id),
            student_id: Set(*student_id),
        });

        Entity::insert_many(rows).exec(db).await?;
        Ok(())
    }

    pub async fn contains<C: ConnectionTrait>(
        db: &C,
        token_id: i64,
        student_id: i64,
    ) -> Result<bool, DbErr> {
        let found = Entity::find()
            .filter(Column::TokenId.eq(token_id))
            .filter(Column::StudentId.eq(student_id))
            .one(db)
            .await?;
        Ok(found.is_some())
    }

    pub async fn student_ids<C: ConnectionTrait>(
        db: &C,
        token_id: i64,
    ) -> Result<Vec<i64>, DbErr> {
        Entity::find()
            .select_only()
            .column(Column::StudentId)
            .filter(Column::TokenId.eq(token_id))
            .into_tuple::<i64>()
            .all(db)
            .await
    }
}
