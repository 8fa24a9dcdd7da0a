use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set,
};
use serde::Serialize;

/// A taught course. Each subject has exactly one assigned instructor.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "subjects")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub code: String,
    pub name: String,
    pub teacher_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::TeacherId",
        to = "super::user::Column::Id"
    )]
    Teacher,
    #[sea_orm(has_many = "super::subject_enrollment::Entity")]
    Enrollments,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Teacher.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl Related<super::subject_enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollments.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DatabaseConnection,
        code: &str,
        name: &str,
        teacher_id: i64,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let subject = ActiveModel {
            code: Set(code.to_owned()),
            name: Set(name.to_owned()),
            teacher_id: Set(teacher_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        subject.insert(db).await
    }

    /// Current enrollment of the subject. Callers that need a stable roster
    /// must snapshot this list themselves; it changes as students enroll.
    pub async fn enrolled_student_ids(
        db: &DatabaseConnection,
        subject_id: i64,
    ) -> Result<Vec<i64>, DbErr> {
        super::subject_enrollment::Entity::find()
            .select_only()
            .column(super::subject_enrollment::Column::StudentId)
            .filter(super::subject_enrollment::Column::SubjectId.eq(subject_id))
            .into_tuple::<i64>()
            .all(db)
            .await
    }
}
