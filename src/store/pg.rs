use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::{Store, StoreResult};
use crate::models::{
    Attendance, AttendanceRow, NewSeminar, NewStudent, Seminar, SeminarStatus, Student, Totals,
    Upserted,
};

#[derive(Debug, Clone)]
pub struct PgStore {
    pg: PgPool,
}

impl PgStore {
    /// Connects and brings the schema up to date.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pg = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        sqlx::migrate!("./migrations").run(&pg).await?;
        Ok(Self { pg })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pg).await?;
        Ok(())
    }

    async fn totals(&self) -> StoreResult<Totals> {
        let totals = sqlx::query_as::<_, Totals>(
            "SELECT (SELECT COUNT(*) FROM students) AS students, \
                    (SELECT COUNT(*) FROM seminars) AS seminars, \
                    (SELECT COUNT(*) FROM attendance) AS attendance",
        )
        .fetch_one(&self.pg)
        .await?;
        Ok(totals)
    }

    async fn find_student(&self, student_id: &str) -> StoreResult<Option<Student>> {
        let student =
            sqlx::query_as::<_, Student>("SELECT * FROM students WHERE student_id = $1 LIMIT 1")
                .bind(student_id)
                .fetch_optional(&self.pg)
                .await?;
        Ok(student)
    }

    async fn list_students(&self, search: Option<&str>) -> StoreResult<Vec<Student>> {
        let students = match search {
            Some(term) => {
                sqlx::query_as::<_, Student>(
                    "SELECT * FROM students \
                     WHERE student_id ILIKE $1 ESCAPE '\\' OR name ILIKE $1 ESCAPE '\\' \
                     OR email ILIKE $1 ESCAPE '\\' OR course ILIKE $1 ESCAPE '\\' \
                     ORDER BY student_id",
                )
                .bind(contains_pattern(term))
                .fetch_all(&self.pg)
                .await?
            }
            None => {
                sqlx::query_as::<_, Student>("SELECT * FROM students ORDER BY student_id")
                    .fetch_all(&self.pg)
                    .await?
            }
        };
        Ok(students)
    }

    async fn upsert_student(&self, student: NewStudent) -> StoreResult<Upserted> {
        // xmax is zero only for a freshly inserted tuple
        let inserted: bool = sqlx::query_scalar(
            "INSERT INTO students (student_id, name, email, phone, course) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (student_id) DO UPDATE \
             SET name = EXCLUDED.name, email = EXCLUDED.email, \
                 phone = EXCLUDED.phone, course = EXCLUDED.course \
             RETURNING (xmax = 0)",
        )
        .bind(&student.student_id)
        .bind(&student.name)
        .bind(&student.email)
        .bind(&student.phone)
        .bind(&student.course)
        .fetch_one(&self.pg)
        .await?;

        Ok(if inserted {
            Upserted::Created
        } else {
            Upserted::Updated
        })
    }

    async fn delete_student(&self, student_id: &str) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM students WHERE student_id = $1")
            .bind(student_id)
            .execute(&self.pg)
            .await?;
        Ok(res.rows_affected() >= 1)
    }

    async fn find_seminar(&self, seminar_id: &str) -> StoreResult<Option<Seminar>> {
        let seminar =
            sqlx::query_as::<_, Seminar>("SELECT * FROM seminars WHERE seminar_id = $1 LIMIT 1")
                .bind(seminar_id)
                .fetch_optional(&self.pg)
                .await?;
        Ok(seminar)
    }

    async fn list_seminars(&self) -> StoreResult<Vec<Seminar>> {
        let seminars =
            sqlx::query_as::<_, Seminar>("SELECT * FROM seminars ORDER BY created_at DESC, id DESC")
                .fetch_all(&self.pg)
                .await?;
        Ok(seminars)
    }

    async fn active_seminars(&self) -> StoreResult<Vec<Seminar>> {
        let seminars = sqlx::query_as::<_, Seminar>(
            "SELECT * FROM seminars WHERE status = $1 ORDER BY start_time, id",
        )
        .bind(SeminarStatus::Active)
        .fetch_all(&self.pg)
        .await?;
        Ok(seminars)
    }

    async fn create_seminar(&self, seminar: NewSeminar) -> StoreResult<Seminar> {
        let created = sqlx::query_as::<_, Seminar>(
            "INSERT INTO seminars (seminar_id, title, start_time, end_time, status) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(&seminar.seminar_id)
        .bind(&seminar.title)
        .bind(seminar.start_time)
        .bind(seminar.end_time)
        .bind(seminar.status)
        .fetch_one(&self.pg)
        .await?;
        Ok(created)
    }

    async fn set_seminar_status(
        &self,
        seminar_id: &str,
        status: SeminarStatus,
    ) -> StoreResult<Option<Seminar>> {
        let updated = sqlx::query_as::<_, Seminar>(
            "UPDATE seminars SET status = $2 WHERE seminar_id = $1 RETURNING *",
        )
        .bind(seminar_id)
        .bind(status)
        .fetch_optional(&self.pg)
        .await?;
        Ok(updated)
    }

    async fn find_attendance(&self, student: i64, seminar: i64) -> StoreResult<Option<Attendance>> {
        let attendance = sqlx::query_as::<_, Attendance>(
            "SELECT * FROM attendance WHERE student = $1 AND seminar = $2 LIMIT 1",
        )
        .bind(student)
        .bind(seminar)
        .fetch_optional(&self.pg)
        .await?;
        Ok(attendance)
    }

    async fn insert_attendance(&self, student: i64, seminar: i64) -> StoreResult<Attendance> {
        let attendance = sqlx::query_as::<_, Attendance>(
            "INSERT INTO attendance (student, seminar) VALUES ($1, $2) RETURNING *",
        )
        .bind(student)
        .bind(seminar)
        .fetch_one(&self.pg)
        .await?;
        Ok(attendance)
    }

    async fn count_attendance(&self, seminar: i64) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance WHERE seminar = $1")
            .bind(seminar)
            .fetch_one(&self.pg)
            .await?;
        Ok(count)
    }

    async fn seminar_attendance(&self, seminar: i64) -> StoreResult<Vec<AttendanceRow>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            "SELECT s.student_id, s.name, s.email, s.phone, s.course, a.marked_at \
             FROM attendance a JOIN students s ON s.id = a.student \
             WHERE a.seminar = $1 \
             ORDER BY a.marked_at, a.id",
        )
        .bind(seminar)
        .fetch_all(&self.pg)
        .await?;
        Ok(rows)
    }
}

/// `ILIKE` pattern matching `term` literally anywhere in the value.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use chrono::{Duration, Utc};

    #[test]
    fn search_wildcards_are_literal() {
        assert_eq!(contains_pattern("asha"), "%asha%");
        assert_eq!(contains_pattern("_"), "%\\_%");
        assert_eq!(contains_pattern("50%"), "%50\\%%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    async fn connect() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        PgStore::connect(&url, 2).await.expect("connect to postgres")
    }

    #[tokio::test]
    #[ignore = "needs a PostgreSQL database in DATABASE_URL"]
    async fn duplicate_attendance_hits_unique_constraint() {
        let store = connect().await;
        let suffix = Utc::now().timestamp_subsec_micros() % 1_000_000;
        let student_id = format!("PGT{:06}", suffix);
        let seminar_id = format!("PG-{}", suffix);

        store
            .upsert_student(NewStudent {
                student_id: student_id.clone(),
                name: "Pg Test".into(),
                email: "pg@example.com".into(),
                phone: None,
                course: "DB".into(),
            })
            .await
            .unwrap();
        let now = Utc::now();
        let seminar = store
            .create_seminar(NewSeminar {
                seminar_id,
                title: "Constraint check".into(),
                start_time: now,
                end_time: now + Duration::hours(1),
                status: SeminarStatus::Active,
            })
            .await
            .unwrap();
        let student = store.find_student(&student_id).await.unwrap().unwrap();

        store.insert_attendance(student.id, seminar.id).await.unwrap();
        let second = store.insert_attendance(student.id, seminar.id).await;
        assert!(matches!(second, Err(StoreError::Conflict(_))));
        assert_eq!(store.count_attendance(seminar.id).await.unwrap(), 1);

        assert!(store.delete_student(&student_id).await.unwrap());
        assert_eq!(store.count_attendance(seminar.id).await.unwrap(), 0);
    }
}
