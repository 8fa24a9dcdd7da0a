use chrono::{DateTime, Duration, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use serde::Serialize;
use uuid::Uuid;

/// One issued QR attendance code and its lifecycle state.
///
/// The opaque `token` string is the only payload encoded into the scannable
/// image. Rows are never deleted; an expired or deactivated code is kept for
/// audit and reporting.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "qr_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Opaque, unguessable identifier embedded in the QR image.
    pub token: String,
    pub subject_id: i64,
    /// Teacher who issued the code. Immutable once written.
    pub issued_by: i64,
    pub title: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
    /// Maximum accepted scans; 0 means unlimited.
    pub max_uses: i32,
    pub uses: i32,
    pub active: bool,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::subject::Entity",
        from = "Column::SubjectId",
        to = "super::subject::Column::Id"
    )]
    Subject,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::IssuedBy",
        to = "super::user::Column::Id"
    )]
    Issuer,
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    Records,
    #[sea_orm(has_many = "super::qr_token_scan::Entity")]
    Scans,
    #[sea_orm(has_many = "super::qr_token_roster::Entity")]
    Roster,
}

impl Related<super::subject::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subject.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Inserts a new code with a random opaque token and a validity window
    /// ending at `issued_at + duration_minutes`.
    #[allow(clippy::too_many_arguments)]
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        subject_id: i64,
        issued_by: i64,
        title: &str,
        latitude: f64,
        longitude: f64,
        radius_meters: f64,
        duration_minutes: i64,
        max_uses: i32,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        let row = ActiveModel {
            token: Set(Uuid::new_v4().to_string()),
            subject_id: Set(subject_id),
            issued_by: Set(issued_by),
            title: Set(title.to_owned()),
            latitude: Set(latitude),
            longitude: Set(longitude),
            radius_meters: Set(radius_meters),
            max_uses: Set(max_uses),
            uses: Set(0),
            active: Set(true),
            issued_at: Set(now),
            expires_at: Set(now + Duration::minutes(duration_minutes)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        row.insert(db).await
    }

    pub async fn find_by_token<C: ConnectionTrait>(
        db: &C,
        token: &str,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find().filter(Column::Token.eq(token)).one(db).await
    }

    /// A code accepts scans while it is active, unexpired, and under its
    /// usage cap.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        if now > self.expires_at {
            return false;
        }
        if self.max_uses > 0 && self.uses >= self.max_uses {
            return false;
        }
        true
    }
}
