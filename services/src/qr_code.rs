use std::collections::HashSet;

use chrono::Utc;
use db::models::{
    attendance_record::{self, Status},
    finalize_task, qr_token, qr_token_roster, qr_token_scan, subject,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Serialize;

use crate::error::{AttendanceError, is_unique_violation};
use crate::geo::{self, Coordinate};

/// Parameters for issuing a new QR attendance code.
#[derive(Debug, Clone)]
pub struct IssueQr {
    pub teacher_id: i64,
    pub subject_id: i64,
    pub title: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Falls back to the configured default radius when absent.
    pub radius_meters: Option<f64>,
    /// Falls back to the configured default window when absent.
    pub duration_minutes: Option<i64>,
    /// 0 = unlimited scans.
    pub max_uses: i32,
}

/// Parameters for a student scanning a code.
#[derive(Debug, Clone)]
pub struct ScanQr {
    pub student_id: i64,
    pub token: String,
    pub latitude: f64,
    pub longitude: f64,
    pub selfie_url: Option<String>,
    pub device_id: Option<String>,
}

/// Outcome of a finalization sweep.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FinalizeSummary {
    pub present: i64,
    pub absent: i64,
}

pub struct QrCodeService;

impl QrCodeService {
    /// Issues a QR code for a subject taught by `teacher_id`.
    ///
    /// The subject's current enrollment is frozen into the code's roster in
    /// the same transaction, and a finalization task is scheduled for the
    /// expiry instant. Students enrolling afterwards cannot scan this code.
    pub async fn issue(
        db: &DatabaseConnection,
        params: IssueQr,
    ) -> Result<qr_token::Model, AttendanceError> {
        let subject = subject::Entity::find_by_id(params.subject_id)
            .one(db)
            .await?
            .ok_or(AttendanceError::NotFound)?;

        if subject.teacher_id != params.teacher_id {
            return Err(AttendanceError::NotAuthorized);
        }

        if params.title.trim().is_empty() {
            return Err(AttendanceError::InvalidInput("title is required".into()));
        }

        let radius = params
            .radius_meters
            .unwrap_or_else(common::config::qr_radius_meters);
        geo::validate_geofence(params.latitude, params.longitude, radius)?;

        let duration = params
            .duration_minutes
            .unwrap_or_else(common::config::qr_duration_minutes);
        if duration <= 0 {
            return Err(AttendanceError::InvalidInput(
                "duration_minutes must be positive".into(),
            ));
        }
        if params.max_uses < 0 {
            return Err(AttendanceError::InvalidInput(
                "max_uses cannot be negative".into(),
            ));
        }

        let roster = subject::Model::enrolled_student_ids(db, subject.id).await?;

        let txn = db.begin().await?;
        let token = qr_token::Model::create(
            &txn,
            subject.id,
            params.teacher_id,
            params.title.trim(),
            params.latitude,
            params.longitude,
            radius,
            duration,
            params.max_uses,
        )
        .await?;
        qr_token_roster::Model::snapshot(&txn, token.id, &roster).await?;
        finalize_task::Model::schedule(&txn, token.id, token.expires_at).await?;
        txn.commit().await?;

        log::info!(
            "issued QR code {} for subject {} ({} student(s) on roster)",
            token.id,
            subject.code,
            roster.len()
        );

        Ok(token)
    }

    /// Records a student's scan as a Present attendance record.
    ///
    /// The unique (student, token, date) index on attendance records is the
    /// arbiter against a concurrent finalization sweep: whichever write
    /// commits first wins and the loser is reported as `AlreadyMarked`.
    pub async fn scan(
        db: &DatabaseConnection,
        params: ScanQr,
    ) -> Result<attendance_record::Model, AttendanceError> {
        let now = Utc::now();

        let token = qr_token::Model::find_by_token(db, &params.token)
            .await?
            .ok_or(AttendanceError::NotFound)?;

        if !token.is_valid(now) {
            return Err(AttendanceError::Expired);
        }

        let here = Coordinate::new(params.latitude, params.longitude);
        if !here.in_physical_range() {
            return Err(AttendanceError::InvalidInput(
                "latitude/longitude out of physical range".into(),
            ));
        }

        let center = Coordinate::new(token.latitude, token.longitude);
        let distance = geo::distance_meters(here, center);
        let allowed = token.radius_meters + common::config::geofence_buffer_meters();
        if distance > allowed {
            return Err(AttendanceError::OutOfRange { distance, allowed });
        }

        if !qr_token_roster::Model::contains(db, token.id, params.student_id).await? {
            return Err(AttendanceError::NotEnrolled);
        }

        let date = attendance_record::Model::date_of(now);
        let existing = attendance_record::Entity::find()
            .filter(attendance_record::Column::StudentId.eq(params.student_id))
            .filter(attendance_record::Column::TokenId.eq(token.id))
            .filter(attendance_record::Column::Date.eq(date.clone()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(AttendanceError::AlreadyMarked);
        }

        let txn = db.begin().await?;

        // Usage accounting is one conditional UPDATE so concurrent scans can
        // neither exceed the cap nor resurrect a deactivated code. Zero rows
        // affected means the code went invalid since we loaded it.
        let bumped = qr_token::Entity::update_many()
            .col_expr(
                qr_token::Column::Uses,
                Expr::col(qr_token::Column::Uses).add(1),
            )
            .col_expr(qr_token::Column::UpdatedAt, Expr::value(now))
            .filter(qr_token::Column::Id.eq(token.id))
            .filter(qr_token::Column::Active.eq(true))
            .filter(qr_token::Column::ExpiresAt.gte(now))
            .filter(
                Condition::any()
                    .add(qr_token::Column::MaxUses.eq(0))
                    .add(Expr::col(qr_token::Column::Uses).lt(Expr::col(qr_token::Column::MaxUses))),
            )
            .exec(&txn)
            .await?;
        if bumped.rows_affected == 0 {
            return Err(AttendanceError::Expired);
        }

        // Cap reached: no further scans are permitted.
        qr_token::Entity::update_many()
            .col_expr(qr_token::Column::Active, Expr::value(false))
            .filter(qr_token::Column::Id.eq(token.id))
            .filter(qr_token::Column::MaxUses.gt(0))
            .filter(Expr::col(qr_token::Column::Uses).gte(Expr::col(qr_token::Column::MaxUses)))
            .exec(&txn)
            .await?;

        let record = attendance_record::ActiveModel {
            token_id: Set(token.id),
            student_id: Set(params.student_id),
            subject_id: Set(token.subject_id),
            teacher_id: Set(token.issued_by),
            status: Set(Status::Present),
            remarks: Set(Some("On time".into())),
            date: Set(date),
            taken_at: Set(now),
            latitude: Set(Some(params.latitude)),
            longitude: Set(Some(params.longitude)),
            selfie_url: Set(params.selfie_url.clone()),
            device_id: Set(params.device_id.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let record = match record.insert(&txn).await {
            Ok(record) => record,
            // Lost the race against another writer; dropping the transaction
            // rolls back the usage bump.
            Err(e) if is_unique_violation(&e) => return Err(AttendanceError::AlreadyMarked),
            Err(e) => return Err(e.into()),
        };

        let scan_row = qr_token_scan::ActiveModel {
            token_id: Set(token.id),
            student_id: Set(params.student_id),
            scanned_at: Set(now),
            latitude: Set(params.latitude),
            longitude: Set(params.longitude),
        };
        if let Err(e) = scan_row.insert(&txn).await {
            if is_unique_violation(&e) {
                return Err(AttendanceError::AlreadyMarked);
            }
            return Err(e.into());
        }

        txn.commit().await?;

        log::info!(
            "student {} marked present on QR code {}",
            params.student_id,
            token.id
        );

        Ok(record)
    }

    /// Closes a code and marks every roster member without a record as
    /// Absent.
    ///
    /// Idempotent: re-invocation finds nothing left to insert and leaves the
    /// counts unchanged. `acting_teacher` is `None` on the worker path, which
    /// bypasses the ownership check; manual deactivation must pass the
    /// caller's identity.
    pub async fn finalize(
        db: &DatabaseConnection,
        token_id: i64,
        acting_teacher: Option<i64>,
    ) -> Result<FinalizeSummary, AttendanceError> {
        let token = qr_token::Entity::find_by_id(token_id)
            .one(db)
            .await?
            .ok_or(AttendanceError::NotFound)?;

        if let Some(teacher_id) = acting_teacher {
            if token.issued_by != teacher_id {
                return Err(AttendanceError::NotAuthorized);
            }
        }

        let now = Utc::now();
        let roster = qr_token_roster::Model::student_ids(db, token.id).await?;
        let marked: HashSet<i64> = attendance_record::Entity::find()
            .filter(attendance_record::Column::TokenId.eq(token.id))
            .all(db)
            .await?
            .into_iter()
            .map(|r| r.student_id)
            .collect();

        let date = attendance_record::Model::date_of(now);
        for student_id in roster {
            if marked.contains(&student_id) {
                continue;
            }

            let absent = attendance_record::ActiveModel {
                token_id: Set(token.id),
                student_id: Set(student_id),
                subject_id: Set(token.subject_id),
                teacher_id: Set(token.issued_by),
                status: Set(Status::Absent),
                remarks: Set(Some("Did not scan QR within allowed time".into())),
                date: Set(date.clone()),
                taken_at: Set(now),
                latitude: Set(None),
                longitude: Set(None),
                selfie_url: Set(None),
                device_id: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            match absent.insert(db).await {
                Ok(_) => {}
                // A last-moment scan got there first; their Present row wins.
                Err(e) if is_unique_violation(&e) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        qr_token::Entity::update_many()
            .col_expr(qr_token::Column::Active, Expr::value(false))
            .col_expr(qr_token::Column::UpdatedAt, Expr::value(now))
            .filter(qr_token::Column::Id.eq(token.id))
            .filter(qr_token::Column::Active.eq(true))
            .exec(db)
            .await?;

        finalize_task::Model::mark_completed(db, token.id, now).await?;

        let summary = Self::record_counts(db, token.id).await?;
        log::info!(
            "finalized QR code {}: {} present, {} absent",
            token.id,
            summary.present,
            summary.absent
        );

        Ok(summary)
    }

    async fn record_counts(
        db: &DatabaseConnection,
        token_id: i64,
    ) -> Result<FinalizeSummary, AttendanceError> {
        use sea_orm::PaginatorTrait;

        let present = attendance_record::Entity::find()
            .filter(attendance_record::Column::TokenId.eq(token_id))
            .filter(attendance_record::Column::Status.eq(Status::Present))
            .count(db)
            .await? as i64;
        let absent = attendance_record::Entity::find()
            .filter(attendance_record::Column::TokenId.eq(token_id))
            .filter(attendance_record::Column::Status.eq(Status::Absent))
            .count(db)
            .await? as i64;

        Ok(FinalizeSummary { present, absent })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::models::user::{self, Role};
    use db::test_utils::setup_test_db;
    use sea_orm::{ActiveModelTrait, IntoActiveModel};

    // University gate coordinates used across these tests.
    const CENTER_LAT: f64 = 26.223084;
    const CENTER_LON: f64 = 68.330521;

    struct TestCtx {
        teacher: user::Model,
        students: Vec<user::Model>,
        subject: subject::Model,
    }

    async fn seed(db: &DatabaseConnection, n_students: usize) -> TestCtx {
        let teacher = user::Model::create(db, "t_aslam", "aslam@test.edu", "password", Role::Teacher)
            .await
            .expect("create teacher");

        let subject = subject::Model::create(db, "CS-301", "Operating Systems", teacher.id)
            .await
            .expect("create subject");

        let mut students = Vec::new();
        for i in 0..n_students {
            let student = user::Model::create(
                db,
                &format!("s_{i:03}"),
                &format!("s{i:03}@test.edu"),
                "password",
                Role::Student,
            )
            .await
            .expect("create student");
            db::models::subject_enrollment::Model::enroll(db, subject.id, student.id)
                .await
                .expect("enroll student");
            students.push(student);
        }

        TestCtx {
            teacher,
            students,
            subject,
        }
    }

    fn issue_params(ctx: &TestCtx) -> IssueQr {
        IssueQr {
            teacher_id: ctx.teacher.id,
            subject_id: ctx.subject.id,
            title: "Lecture 5".into(),
            latitude: CENTER_LAT,
            longitude: CENTER_LON,
            radius_meters: Some(40.0),
            duration_minutes: Some(1),
            max_uses: 0,
        }
    }

    fn scan_params(student_id: i64, token: &qr_token::Model) -> ScanQr {
        ScanQr {
            student_id,
            token: token.token.clone(),
            // ~10 m north of the geofence center
            latitude: CENTER_LAT + 0.00009,
            longitude: CENTER_LON,
            selfie_url: None,
            device_id: Some("test-device".into()),
        }
    }

    async fn expire_token(db: &DatabaseConnection, token: &qr_token::Model) {
        let mut am = token.clone().into_active_model();
        am.expires_at = Set(Utc::now() - chrono::Duration::minutes(5));
        am.update(db).await.expect("expire token");
    }

    #[tokio::test]
    async fn issue_freezes_roster_and_schedules_finalization() {
        let db = setup_test_db().await;
        let ctx = seed(&db, 3).await;

        let token = QrCodeService::issue(&db, issue_params(&ctx))
            .await
            .expect("issue");

        assert!(token.active);
        assert_eq!(token.uses, 0);
        assert!(token.expires_at > token.issued_at);

        let roster = qr_token_roster::Model::student_ids(&db, token.id)
            .await
            .unwrap();
        assert_eq!(roster.len(), 3);

        let task = finalize_task::Entity::find_by_id(token.id)
            .one(&db)
            .await
            .unwrap()
            .expect("finalize task scheduled");
        assert_eq!(task.due_at, token.expires_at);
        assert!(task.completed_at.is_none());
    }

    #[tokio::test]
    async fn issue_rejects_foreign_subject_and_bad_geofence() {
        let db = setup_test_db().await;
        let ctx = seed(&db, 1).await;

        let other = user::Model::create(&db, "t_other", "other@test.edu", "password", Role::Teacher)
            .await
            .unwrap();

        let mut params = issue_params(&ctx);
        params.teacher_id = other.id;
        assert!(matches!(
            QrCodeService::issue(&db, params).await,
            Err(AttendanceError::NotAuthorized)
        ));

        let mut params = issue_params(&ctx);
        params.subject_id = 9999;
        assert!(matches!(
            QrCodeService::issue(&db, params).await,
            Err(AttendanceError::NotFound)
        ));

        let mut params = issue_params(&ctx);
        params.latitude = 95.0;
        assert!(matches!(
            QrCodeService::issue(&db, params).await,
            Err(AttendanceError::InvalidInput(_))
        ));

        let mut params = issue_params(&ctx);
        params.radius_meters = Some(0.0);
        assert!(matches!(
            QrCodeService::issue(&db, params).await,
            Err(AttendanceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn scan_succeeds_once_then_reports_already_marked() {
        let db = setup_test_db().await;
        let ctx = seed(&db, 2).await;
        let token = QrCodeService::issue(&db, issue_params(&ctx)).await.unwrap();

        let record = QrCodeService::scan(&db, scan_params(ctx.students[0].id, &token))
            .await
            .expect("first scan");
        assert_eq!(record.status, Status::Present);
        assert_eq!(record.student_id, ctx.students[0].id);
        assert_eq!(record.token_id, token.id);

        let dup = QrCodeService::scan(&db, scan_params(ctx.students[0].id, &token)).await;
        assert!(matches!(dup, Err(AttendanceError::AlreadyMarked)));

        // the duplicate attempt must not bump the usage counter
        let fresh = qr_token::Entity::find_by_id(token.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fresh.uses, 1);
    }

    #[tokio::test]
    async fn scan_out_of_range_leaves_no_record() {
        let db = setup_test_db().await;
        let ctx = seed(&db, 1).await;
        let token = QrCodeService::issue(&db, issue_params(&ctx)).await.unwrap();

        let mut params = scan_params(ctx.students[0].id, &token);
        // ~100 m away, radius is 40 m
        params.latitude = CENTER_LAT + 0.0009;

        match QrCodeService::scan(&db, params).await {
            Err(AttendanceError::OutOfRange { distance, allowed }) => {
                assert!(distance > allowed);
            }
            other => panic!("expected OutOfRange, got {other:?}"),
        }

        let records = attendance_record::Entity::find()
            .filter(attendance_record::Column::TokenId.eq(token.id))
            .all(&db)
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn scan_rejects_students_outside_frozen_roster() {
        let db = setup_test_db().await;
        let ctx = seed(&db, 1).await;
        let token = QrCodeService::issue(&db, issue_params(&ctx)).await.unwrap();

        // enrolls only after issuance: not on the frozen roster
        let latecomer =
            user::Model::create(&db, "s_late", "late@test.edu", "password", Role::Student)
                .await
                .unwrap();
        db::models::subject_enrollment::Model::enroll(&db, ctx.subject.id, latecomer.id)
            .await
            .unwrap();

        let result = QrCodeService::scan(&db, scan_params(latecomer.id, &token)).await;
        assert!(matches!(result, Err(AttendanceError::NotEnrolled)));
    }

    #[tokio::test]
    async fn scan_unknown_or_expired_token_fails_cleanly() {
        let db = setup_test_db().await;
        let ctx = seed(&db, 1).await;
        let token = QrCodeService::issue(&db, issue_params(&ctx)).await.unwrap();

        let mut params = scan_params(ctx.students[0].id, &token);
        params.token = "no-such-token".into();
        assert!(matches!(
            QrCodeService::scan(&db, params).await,
            Err(AttendanceError::NotFound)
        ));

        expire_token(&db, &token).await;
        let result = QrCodeService::scan(&db, scan_params(ctx.students[0].id, &token)).await;
        assert!(matches!(result, Err(AttendanceError::Expired)));
    }

    #[tokio::test]
    async fn usage_cap_exhausts_token_immediately() {
        let db = setup_test_db().await;
        let ctx = seed(&db, 2).await;

        let mut params = issue_params(&ctx);
        params.max_uses = 1;
        let token = QrCodeService::issue(&db, params).await.unwrap();

        QrCodeService::scan(&db, scan_params(ctx.students[0].id, &token))
            .await
            .expect("first scan fills the cap");

        let fresh = qr_token::Entity::find_by_id(token.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fresh.uses, 1);
        assert!(!fresh.active, "cap reached must deactivate the code");

        let second = QrCodeService::scan(&db, scan_params(ctx.students[1].id, &token)).await;
        assert!(matches!(second, Err(AttendanceError::Expired)));
    }

    #[tokio::test]
    async fn finalize_marks_absentees_and_is_idempotent() {
        let db = setup_test_db().await;
        let ctx = seed(&db, 3).await;
        let token = QrCodeService::issue(&db, issue_params(&ctx)).await.unwrap();

        QrCodeService::scan(&db, scan_params(ctx.students[0].id, &token))
            .await
            .expect("scan");

        let summary = QrCodeService::finalize(&db, token.id, Some(ctx.teacher.id))
            .await
            .expect("finalize");
        assert_eq!(summary.present, 1);
        assert_eq!(summary.absent, 2);

        let records = attendance_record::Entity::find()
            .filter(attendance_record::Column::TokenId.eq(token.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(records.len(), 3, "one record per roster member");

        let fresh = qr_token::Entity::find_by_id(token.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert!(!fresh.active);

        // Second invocation: same counts, no extra rows, no error.
        let again = QrCodeService::finalize(&db, token.id, Some(ctx.teacher.id))
            .await
            .expect("finalize twice");
        assert_eq!(again.present, 1);
        assert_eq!(again.absent, 2);

        let records = attendance_record::Entity::find()
            .filter(attendance_record::Column::TokenId.eq(token.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn finalize_checks_ownership_only_for_manual_calls() {
        let db = setup_test_db().await;
        let ctx = seed(&db, 1).await;
        let token = QrCodeService::issue(&db, issue_params(&ctx)).await.unwrap();

        let intruder =
            user::Model::create(&db, "t_intruder", "intruder@test.edu", "password", Role::Teacher)
                .await
                .unwrap();

        let denied = QrCodeService::finalize(&db, token.id, Some(intruder.id)).await;
        assert!(matches!(denied, Err(AttendanceError::NotAuthorized)));

        // Worker path carries no identity and is allowed through.
        QrCodeService::finalize(&db, token.id, None)
            .await
            .expect("worker finalize");
    }

    #[tokio::test]
    async fn finalize_completes_the_scheduled_task() {
        let db = setup_test_db().await;
        let ctx = seed(&db, 1).await;
        let token = QrCodeService::issue(&db, issue_params(&ctx)).await.unwrap();

        QrCodeService::finalize(&db, token.id, Some(ctx.teacher.id))
            .await
            .unwrap();

        let task = finalize_task::Entity::find_by_id(token.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert!(task.completed_at.is_some());
    }

    #[tokio::test]
    async fn late_scan_after_finalization_is_rejected() {
        let db = setup_test_db().await;
        let ctx = seed(&db, 2).await;
        let token = QrCodeService::issue(&db, issue_params(&ctx)).await.unwrap();

        QrCodeService::finalize(&db, token.id, Some(ctx.teacher.id))
            .await
            .unwrap();

        // Auto-absence never upgrades to Present: the code is closed.
        let late = QrCodeService::scan(&db, scan_params(ctx.students[0].id, &token)).await;
        assert!(matches!(late, Err(AttendanceError::Expired)));

        let absent = attendance_record::Entity::find()
            .filter(attendance_record::Column::TokenId.eq(token.id))
            .filter(attendance_record::Column::StudentId.eq(ctx.students[0].id))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(absent.status, Status::Absent);
    }

    #[tokio::test]
    async fn sweep_skips_students_who_won_the_write_race() {
        let db = setup_test_db().await;
        let ctx = seed(&db, 2).await;
        let token = QrCodeService::issue(&db, issue_params(&ctx)).await.unwrap();

        // Simulate a scan committing between the sweep's read and its write:
        // the Present row already exists when finalize runs.
        QrCodeService::scan(&db, scan_params(ctx.students[1].id, &token))
            .await
            .unwrap();

        let summary = QrCodeService::finalize(&db, token.id, None).await.unwrap();
        assert_eq!(summary.present, 1);
        assert_eq!(summary.absent, 1);

        let winner = attendance_record::Entity::find()
            .filter(attendance_record::Column::TokenId.eq(token.id))
            .filter(attendance_record::Column::StudentId.eq(ctx.students[1].id))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(winner.status, Status::Present, "Present row must survive the sweep");
    }
}
