use anyhow::Context;
use chrono::{Duration, NaiveDate};
use sqlx::{PgPool, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{EventKind, StudentEvent, StudentSnapshot, StudentStatus};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

async fn upsert_student(
    pool: &PgPool,
    course_id: i64,
    full_name: &str,
    email: &str,
    enrolled_on: NaiveDate,
    status: Option<StudentStatus>,
) -> anyhow::Result<i64> {
    // a missing status keeps the stored one, or defaults to active on insert
    let id: i64 = sqlx::query(
        r#"
        INSERT INTO session_booking.students (course_id, full_name, email, enrolled_on, status)
        VALUES ($1, $2, $3, $4, COALESCE($5, 'active'))
        ON CONFLICT (course_id, email) DO UPDATE
        SET full_name = EXCLUDED.full_name,
            status = COALESCE($5, session_booking.students.status)
        RETURNING id
        "#,
    )
    .bind(course_id)
    .bind(full_name)
    .bind(email)
    .bind(enrolled_on)
    .bind(status.map(StudentStatus::as_str))
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

/// Returns true when the event was new.
async fn insert_event(
    pool: &PgPool,
    student_id: i64,
    event: &StudentEvent,
    source_key: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO session_booking.student_events
        (id, student_id, event_type, occurred_on, note, source_key)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(event.kind.as_str())
    .bind(event.occurred_on)
    .bind(&event.note)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let course_id = 101;
    let students = vec![
        (
            "Avery Lee",
            "avery.lee@example.com",
            NaiveDate::from_ymd_opt(2026, 6, 1).context("invalid date")?,
            StudentStatus::Active,
        ),
        (
            "Jules Moreno",
            "jules.moreno@example.com",
            NaiveDate::from_ymd_opt(2026, 7, 15).context("invalid date")?,
            StudentStatus::Active,
        ),
        (
            "Kiara Patel",
            "kiara.patel@example.com",
            NaiveDate::from_ymd_opt(2026, 9, 20).context("invalid date")?,
            StudentStatus::Active,
        ),
        (
            "Sam Okafor",
            "sam.okafor@example.com",
            NaiveDate::from_ymd_opt(2026, 3, 2).context("invalid date")?,
            StudentStatus::OnHold,
        ),
    ];

    for (name, email, enrolled_on, status) in &students {
        upsert_student(pool, course_id, name, email, *enrolled_on, Some(*status)).await?;
    }

    let events = vec![
        ("seed-001", "avery.lee@example.com", EventKind::Session, (2026, 8, 28), "Circuits at EGLL"),
        ("seed-002", "avery.lee@example.com", EventKind::Lesson, (2026, 8, 28), "Lesson 3 complete"),
        ("seed-003", "avery.lee@example.com", EventKind::Activity, (2026, 10, 2), "Quiz attempt"),
        ("seed-004", "jules.moreno@example.com", EventKind::Session, (2026, 10, 5), "Holding patterns"),
        ("seed-005", "jules.moreno@example.com", EventKind::Slot, (2026, 10, 10), "Weekend evening"),
        ("seed-006", "jules.moreno@example.com", EventKind::Slot, (2026, 10, 12), "Weekday morning"),
        ("seed-007", "kiara.patel@example.com", EventKind::Activity, (2026, 10, 1), "Ground school video"),
    ];

    for (source_key, email, kind, (year, month, day), note) in events {
        let student_id: i64 = sqlx::query(
            "SELECT id FROM session_booking.students WHERE course_id = $1 AND email = $2",
        )
        .bind(course_id)
        .bind(email)
        .fetch_one(pool)
        .await?
        .get("id");

        let event = StudentEvent {
            student_email: email.to_string(),
            kind,
            occurred_on: NaiveDate::from_ymd_opt(year, month, day).context("invalid date")?,
            note: note.to_string(),
        };
        insert_event(pool, student_id, &event, source_key).await?;
    }

    info!(course_id, students = students.len(), "seeded course");
    Ok(())
}

/// First day counted by the activity window ending on `today`.
pub fn activity_cutoff(today: NaiveDate, activity_window_days: i64) -> anyhow::Result<NaiveDate> {
    Duration::try_days(activity_window_days.max(1))
        .and_then(|window| today.checked_sub_signed(window))
        .with_context(|| {
            format!("activity window of {activity_window_days} days reaches before the calendar start")
        })
}

/// Days waited since `wait_date`. A future anchor (e.g. a pre-registered
/// enrolment) counts as zero.
pub fn days_waiting(student_id: i64, today: NaiveDate, wait_date: NaiveDate) -> i64 {
    let days = (today - wait_date).num_days();
    if days < 0 {
        warn!(student_id, %wait_date, "wait anchor is in the future, counting as 0 days");
        return 0;
    }
    days
}

/// Puts snapshots in the roster's base order: longest wait first, then most
/// slots posted, then student id. Ranking is stable, so this decides ties.
pub fn sort_by_wait(snapshots: &mut [StudentSnapshot]) {
    snapshots.sort_by(|a, b| {
        b.recency_days
            .cmp(&a.recency_days)
            .then_with(|| b.slot_count.cmp(&a.slot_count))
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
}

/// Builds one snapshot per active student of the course, longest wait first.
///
/// The recency anchor is the last flown session, or the enrolment date when
/// the student has not flown yet. Slots count from that anchor; activity
/// counts over the trailing `activity_window_days`.
pub async fn fetch_snapshots(
    pool: &PgPool,
    course_id: i64,
    today: NaiveDate,
    activity_window_days: i64,
) -> anyhow::Result<Vec<StudentSnapshot>> {
    let activity_since = activity_cutoff(today, activity_window_days)?;

    let rows = sqlx::query(
        r#"
        WITH last_session AS (
            SELECT student_id, MAX(occurred_on) AS last_date
            FROM session_booking.student_events
            WHERE event_type = 'session'
            GROUP BY student_id
        )
        SELECT st.id AS student_id,
               st.full_name,
               COALESCE(ls.last_date, st.enrolled_on) AS wait_date,
               COUNT(e.id) FILTER (
                   WHERE e.event_type = 'slot'
                   AND e.occurred_on >= COALESCE(ls.last_date, st.enrolled_on)
               ) AS slot_count,
               COUNT(e.id) FILTER (
                   WHERE e.event_type = 'activity' AND e.occurred_on >= $2
               ) AS activity_count,
               COUNT(e.id) FILTER (WHERE e.event_type = 'lesson') AS completions
        FROM session_booking.students st
        LEFT JOIN last_session ls ON ls.student_id = st.id
        LEFT JOIN session_booking.student_events e ON e.student_id = st.id
        WHERE st.course_id = $1 AND st.status = 'active'
        GROUP BY st.id, st.full_name, st.enrolled_on, ls.last_date
        ORDER BY wait_date ASC, slot_count DESC, st.id
        "#,
    )
    .bind(course_id)
    .bind(activity_since)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to load students for course {course_id}"))?;

    let mut snapshots = Vec::with_capacity(rows.len());
    for row in rows {
        let student_id: i64 = row.get("student_id");
        let wait_date: NaiveDate = row.get("wait_date");
        snapshots.push(StudentSnapshot {
            student_id,
            name: row.get("full_name"),
            recency_days: days_waiting(student_id, today, wait_date),
            slot_count: row.get("slot_count"),
            activity_count: row.get("activity_count"),
            completions: row.get("completions"),
        });
    }

    // future anchors clamp to zero, so reapply the order on the final figures
    sort_by_wait(&mut snapshots);
    debug!(course_id, count = snapshots.len(), "fetched snapshots");
    Ok(snapshots)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        course_id: i64,
        full_name: String,
        email: String,
        enrolled_on: NaiveDate,
        #[serde(default)]
        status: Option<StudentStatus>,
        event_type: EventKind,
        occurred_on: NaiveDate,
        note: String,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let student_id = upsert_student(
            pool,
            row.course_id,
            &row.full_name,
            &row.email,
            row.enrolled_on,
            row.status,
        )
        .await?;

        let source_key = row
            .source_key
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));
        let event = StudentEvent {
            student_email: row.email,
            kind: row.event_type,
            occurred_on: row.occurred_on,
            note: row.note,
        };

        if insert_event(pool, student_id, &event, &source_key).await? {
            inserted += 1;
        } else {
            debug!(source_key = %source_key, student = %event.student_email, "skipped duplicate event");
        }
    }

    Ok(inserted)
}
