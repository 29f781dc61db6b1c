use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Attendance, AttendanceRow, NewSeminar, NewStudent, Seminar, SeminarStatus, Student, Totals,
    Upserted,
};

/// In-process store for demo runs and tests. Holding the mutex across a
/// check-and-write stands in for the database's unique constraints.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    students: Vec<Student>,
    seminars: Vec<Seminar>,
    attendance: HashMap<(i64, i64), Attendance>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_search(student: &Student, needle: &str) -> bool {
    [
        &student.student_id,
        &student.name,
        &student.email,
        &student.course,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn totals(&self) -> StoreResult<Totals> {
        let tables = self.tables.lock().await;
        Ok(Totals {
            students: tables.students.len() as i64,
            seminars: tables.seminars.len() as i64,
            attendance: tables.attendance.len() as i64,
        })
    }

    async fn find_student(&self, student_id: &str) -> StoreResult<Option<Student>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .students
            .iter()
            .find(|s| s.student_id == student_id)
            .cloned())
    }

    async fn list_students(&self, search: Option<&str>) -> StoreResult<Vec<Student>> {
        let tables = self.tables.lock().await;
        let needle = search.map(str::to_lowercase);
        let mut students: Vec<Student> = tables
            .students
            .iter()
            .filter(|s| needle.as_deref().map_or(true, |n| matches_search(s, n)))
            .cloned()
            .collect();
        students.sort_by(|a, b| a.student_id.cmp(&b.student_id));
        Ok(students)
    }

    async fn upsert_student(&self, student: NewStudent) -> StoreResult<Upserted> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables
            .students
            .iter_mut()
            .find(|s| s.student_id == student.student_id)
        {
            existing.name = student.name;
            existing.email = student.email;
            existing.phone = student.phone;
            existing.course = student.course;
            return Ok(Upserted::Updated);
        }

        let id = tables.next_id();
        tables.students.push(Student {
            id,
            student_id: student.student_id,
            name: student.name,
            email: student.email,
            phone: student.phone,
            course: student.course,
        });
        Ok(Upserted::Created)
    }

    async fn delete_student(&self, student_id: &str) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let Some(pos) = tables.students.iter().position(|s| s.student_id == student_id) else {
            return Ok(false);
        };
        let removed = tables.students.remove(pos);
        tables
            .attendance
            .retain(|(student, _), _| *student != removed.id);
        Ok(true)
    }

    async fn find_seminar(&self, seminar_id: &str) -> StoreResult<Option<Seminar>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .seminars
            .iter()
            .find(|s| s.seminar_id == seminar_id)
            .cloned())
    }

    async fn list_seminars(&self) -> StoreResult<Vec<Seminar>> {
        let tables = self.tables.lock().await;
        let mut seminars = tables.seminars.clone();
        seminars.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(seminars)
    }

    async fn active_seminars(&self) -> StoreResult<Vec<Seminar>> {
        let tables = self.tables.lock().await;
        let mut seminars: Vec<Seminar> = tables
            .seminars
            .iter()
            .filter(|s| s.is_active())
            .cloned()
            .collect();
        seminars.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        Ok(seminars)
    }

    async fn create_seminar(&self, seminar: NewSeminar) -> StoreResult<Seminar> {
        let mut tables = self.tables.lock().await;
        if tables
            .seminars
            .iter()
            .any(|s| s.seminar_id == seminar.seminar_id)
        {
            return Err(StoreError::Conflict(format!(
                "seminar `{}` already exists",
                seminar.seminar_id
            )));
        }

        let created = Seminar {
            id: tables.next_id(),
            seminar_id: seminar.seminar_id,
            title: seminar.title,
            start_time: seminar.start_time,
            end_time: seminar.end_time,
            status: seminar.status,
            created_at: Utc::now(),
        };
        tables.seminars.push(created.clone());
        Ok(created)
    }

    async fn set_seminar_status(
        &self,
        seminar_id: &str,
        status: SeminarStatus,
    ) -> StoreResult<Option<Seminar>> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .seminars
            .iter_mut()
            .find(|s| s.seminar_id == seminar_id)
            .map(|seminar| {
                seminar.status = status;
                seminar.clone()
            }))
    }

    async fn find_attendance(&self, student: i64, seminar: i64) -> StoreResult<Option<Attendance>> {
        let tables = self.tables.lock().await;
        Ok(tables.attendance.get(&(student, seminar)).cloned())
    }

    async fn insert_attendance(&self, student: i64, seminar: i64) -> StoreResult<Attendance> {
        let mut tables = self.tables.lock().await;
        if tables.attendance.contains_key(&(student, seminar)) {
            return Err(StoreError::Conflict(format!(
                "attendance for student {} in seminar {} already exists",
                student, seminar
            )));
        }

        let attendance = Attendance {
            id: tables.next_id(),
            student,
            seminar,
            marked_at: Utc::now(),
        };
        tables
            .attendance
            .insert((student, seminar), attendance.clone());
        Ok(attendance)
    }

    async fn count_attendance(&self, seminar: i64) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .attendance
            .keys()
            .filter(|(_, s)| *s == seminar)
            .count() as i64)
    }

    async fn seminar_attendance(&self, seminar: i64) -> StoreResult<Vec<AttendanceRow>> {
        let tables = self.tables.lock().await;
        let mut marks: Vec<&Attendance> = tables
            .attendance
            .values()
            .filter(|a| a.seminar == seminar)
            .collect();
        marks.sort_by(|a, b| a.marked_at.cmp(&b.marked_at).then(a.id.cmp(&b.id)));

        Ok(marks
            .into_iter()
            .filter_map(|mark| {
                tables
                    .students
                    .iter()
                    .find(|s| s.id == mark.student)
                    .map(|s| AttendanceRow {
                        student_id: s.student_id.clone(),
                        name: s.name.clone(),
                        email: s.email.clone(),
                        phone: s.phone.clone(),
                        course: s.course.clone(),
                        marked_at: mark.marked_at,
                    })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn student(id: &str) -> NewStudent {
        NewStudent {
            student_id: id.to_string(),
            name: format!("Student {}", id),
            email: format!("{}@example.edu", id.to_lowercase()),
            phone: None,
            course: "CS".to_string(),
        }
    }

    fn seminar(id: &str, status: SeminarStatus) -> NewSeminar {
        let now = Utc::now();
        NewSeminar {
            seminar_id: id.to_string(),
            title: format!("Seminar {}", id),
            start_time: now,
            end_time: now + Duration::hours(1),
            status,
        }
    }

    #[tokio::test]
    async fn upsert_reports_created_then_updated() {
        let store = MemoryStore::new();
        assert_eq!(
            store.upsert_student(student("SBU000001")).await.unwrap(),
            Upserted::Created
        );

        let mut changed = student("SBU000001");
        changed.course = "Physics".to_string();
        assert_eq!(store.upsert_student(changed).await.unwrap(), Upserted::Updated);

        let found = store.find_student("SBU000001").await.unwrap().unwrap();
        assert_eq!(found.course, "Physics");
        assert_eq!(store.totals().await.unwrap().students, 1);
    }

    #[tokio::test]
    async fn attendance_pair_is_unique() {
        let store = MemoryStore::new();
        store.upsert_student(student("SBU000001")).await.unwrap();
        let s = store.find_student("SBU000001").await.unwrap().unwrap();
        let m = store
            .create_seminar(seminar("SEM001", SeminarStatus::Active))
            .await
            .unwrap();

        store.insert_attendance(s.id, m.id).await.unwrap();
        let again = store.insert_attendance(s.id, m.id).await;
        assert!(matches!(again, Err(StoreError::Conflict(_))));
        assert_eq!(store.count_attendance(m.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_seminar_code_conflicts() {
        let store = MemoryStore::new();
        store
            .create_seminar(seminar("SEM001", SeminarStatus::Inactive))
            .await
            .unwrap();
        let again = store
            .create_seminar(seminar("SEM001", SeminarStatus::Active))
            .await;
        assert!(matches!(again, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn deleting_student_cascades_attendance() {
        let store = MemoryStore::new();
        store.upsert_student(student("SBU000001")).await.unwrap();
        let s = store.find_student("SBU000001").await.unwrap().unwrap();
        let m = store
            .create_seminar(seminar("SEM001", SeminarStatus::Active))
            .await
            .unwrap();
        store.insert_attendance(s.id, m.id).await.unwrap();

        assert!(store.delete_student("SBU000001").await.unwrap());
        assert!(!store.delete_student("SBU000001").await.unwrap());
        assert_eq!(store.count_attendance(m.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn search_is_case_insensitive() {
        let store = MemoryStore::new();
        store.upsert_student(student("SBU000002")).await.unwrap();
        store.upsert_student(student("SBU000001")).await.unwrap();

        let all = store.list_students(None).await.unwrap();
        assert_eq!(all[0].student_id, "SBU000001");
        let hits = store.list_students(Some("sbu000002")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].student_id, "SBU000002");
    }
}
