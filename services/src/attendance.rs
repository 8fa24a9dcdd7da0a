use std::collections::HashMap;

use db::models::{
    attendance_record::{self, Status},
    qr_token, user,
};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::Serialize;

use crate::error::AttendanceError;

/// Read-only aggregation over one QR code's records.
#[derive(Debug, Serialize)]
pub struct AttendanceSummary {
    pub token: qr_token::Model,
    pub present: i64,
    pub absent: i64,
    pub records: Vec<attendance_record::Model>,
}

/// Who is asking for a record listing. Students only ever see their own
/// records; teachers see the records they issued.
#[derive(Debug, Clone, Copy)]
pub enum Viewer {
    Student(i64),
    Teacher(i64),
    Admin,
}

#[derive(Debug, Clone, Default)]
pub struct AttendanceFilter {
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    pub subject_id: Option<i64>,
    /// Honored for teachers and admins only.
    pub student_id: Option<i64>,
}

/// One row of the per-student attendance report.
#[derive(Debug, Serialize)]
pub struct StudentAttendanceReport {
    pub student_id: i64,
    pub username: String,
    pub email: String,
    pub total: i64,
    pub attended: i64,
    pub absent: i64,
    pub percentage: f64,
}

pub struct AttendanceService;

impl AttendanceService {
    pub async fn summary(
        db: &DatabaseConnection,
        token_id: i64,
    ) -> Result<AttendanceSummary, AttendanceError> {
        let token = qr_token::Entity::find_by_id(token_id)
            .one(db)
            .await?
            .ok_or(AttendanceError::NotFound)?;

        let records = attendance_record::Entity::find()
            .filter(attendance_record::Column::TokenId.eq(token.id))
            .order_by_asc(attendance_record::Column::StudentId)
            .all(db)
            .await?;

        let present = records.iter().filter(|r| r.status == Status::Present).count() as i64;
        let absent = records.iter().filter(|r| r.status == Status::Absent).count() as i64;

        Ok(AttendanceSummary {
            token,
            present,
            absent,
            records,
        })
    }

    /// Lists records scoped to the viewer's role.
    pub async fn list(
        db: &DatabaseConnection,
        viewer: Viewer,
        filter: AttendanceFilter,
    ) -> Result<Vec<attendance_record::Model>, AttendanceError> {
        let mut query = attendance_record::Entity::find();

        match viewer {
            Viewer::Student(id) => {
                query = query.filter(attendance_record::Column::StudentId.eq(id));
            }
            Viewer::Teacher(id) => {
                query = query.filter(attendance_record::Column::TeacherId.eq(id));
                if let Some(student_id) = filter.student_id {
                    query = query.filter(attendance_record::Column::StudentId.eq(student_id));
                }
            }
            Viewer::Admin => {
                if let Some(student_id) = filter.student_id {
                    query = query.filter(attendance_record::Column::StudentId.eq(student_id));
                }
            }
        }

        if let Some(date) = filter.date {
            query = query.filter(attendance_record::Column::Date.eq(date));
        }
        if let Some(subject_id) = filter.subject_id {
            query = query.filter(attendance_record::Column::SubjectId.eq(subject_id));
        }

        let records = query
            .order_by_desc(attendance_record::Column::TakenAt)
            .all(db)
            .await?;
        Ok(records)
    }

    /// Per-student attendance percentages over all records, optionally
    /// bounded to a date range (inclusive).
    pub async fn admin_report(
        db: &DatabaseConnection,
        from: Option<String>,
        to: Option<String>,
    ) -> Result<Vec<StudentAttendanceReport>, AttendanceError> {
        #[derive(FromQueryResult)]
        struct Row {
            student_id: i64,
            cnt: i64,
        }

        let counts = |status: Option<Status>| {
            let mut query = attendance_record::Entity::find()
                .select_only()
                .column(attendance_record::Column::StudentId)
                .column_as(
                    Expr::expr(Func::count(Expr::col(attendance_record::Column::Id))),
                    "cnt",
                )
                .group_by(attendance_record::Column::StudentId);

            if let Some(status) = status {
                query = query.filter(attendance_record::Column::Status.eq(status));
            }
            if let Some(from) = &from {
                query = query.filter(attendance_record::Column::Date.gte(from.clone()));
            }
            if let Some(to) = &to {
                query = query.filter(attendance_record::Column::Date.lte(to.clone()));
            }

            query.into_model::<Row>().all(db)
        };

        let totals: Vec<Row> = counts(None).await?;
        let present: HashMap<i64, i64> = counts(Some(Status::Present))
            .await?
            .into_iter()
            .map(|r| (r.student_id, r.cnt))
            .collect();

        let student_ids: Vec<i64> = totals.iter().map(|r| r.student_id).collect();
        let students: HashMap<i64, user::Model> = user::Entity::find()
            .filter(user::Column::Id.is_in(student_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let mut report: Vec<StudentAttendanceReport> = totals
            .into_iter()
            .map(|row| {
                let (username, email) = students
                    .get(&row.student_id)
                    .map(|u| (u.username.clone(), u.email.clone()))
                    .unwrap_or_default();
                let total = row.cnt;
                let attended = present.get(&row.student_id).copied().unwrap_or(0);
                let percentage = if total == 0 {
                    0.0
                } else {
                    attended as f64 / total as f64 * 100.0
                };
                StudentAttendanceReport {
                    student_id: row.student_id,
                    username,
                    email,
                    total,
                    attended,
                    absent: total - attended,
                    percentage,
                }
            })
            .collect();

        report.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(report)
    }
}
