use super::{fold_keyword, matches_folded};
use crate::db::Database;
use crate::model::{Student, StudentInput};
use rusqlite::{OptionalExtension, Row};

const COLUMNS: &str = "id, name, roll_no, department, semester, class_name, created_at";
const ORDER: &str = "ORDER BY class_name, roll_no, id";

fn student_from_row(r: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: r.get(0)?,
        name: r.get(1)?,
        roll_no: r.get(2)?,
        department: r.get(3)?,
        semester: r.get(4)?,
        class_name: r.get(5)?,
        created_at: r.get(6)?,
    })
}

#[derive(Debug, Clone)]
pub struct StudentRepository {
    db: Database,
}

impl StudentRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Inserts a student and returns the id the store assigned.
    pub fn add(&self, input: &StudentInput) -> Option<i64> {
        self.db.run("add student", |conn| {
            conn.execute(
                "INSERT INTO students(name, roll_no, department, semester, class_name)
                 VALUES(?, ?, ?, ?, ?)",
                (
                    &input.name,
                    &input.roll_no,
                    &input.department,
                    input.semester,
                    input.class_name.as_deref(),
                ),
            )?;
            let id = conn.last_insert_rowid();
            tracing::info!(student_id = id, roll_no = %input.roll_no, "student added");
            Ok(id)
        })
    }

    pub fn update(&self, id: i64, input: &StudentInput) -> bool {
        self.db
            .run("update student", |conn| {
                let changed = conn.execute(
                    "UPDATE students
                     SET name = ?, roll_no = ?, department = ?, semester = ?, class_name = ?
                     WHERE id = ?",
                    (
                        &input.name,
                        &input.roll_no,
                        &input.department,
                        input.semester,
                        input.class_name.as_deref(),
                        id,
                    ),
                )?;
                Ok(changed > 0)
            })
            .unwrap_or(false)
    }

    /// Deletes a student; attendance rows go with it through the FK cascade.
    pub fn delete(&self, id: i64) -> bool {
        self.db
            .run("delete student", |conn| {
                let changed = conn.execute("DELETE FROM students WHERE id = ?", [id])?;
                if changed > 0 {
                    tracing::info!(student_id = id, "student deleted");
                }
                Ok(changed > 0)
            })
            .unwrap_or(false)
    }

    pub fn get_by_id(&self, id: i64) -> Option<Student> {
        self.db
            .run("get student by id", |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {COLUMNS} FROM students WHERE id = ?"),
                        [id],
                        student_from_row,
                    )
                    .optional()?)
            })
            .flatten()
    }

    pub fn get_by_roll_no(&self, roll_no: &str) -> Option<Student> {
        self.db
            .run("get student by roll number", |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {COLUMNS} FROM students WHERE roll_no = ? COLLATE NOCASE"),
                        [roll_no],
                        student_from_row,
                    )
                    .optional()?)
            })
            .flatten()
    }

    pub fn list_all(&self) -> Vec<Student> {
        self.select("list students", "", &[])
    }

    /// Case-insensitive substring match on name or roll number. A blank
    /// keyword lists everyone.
    pub fn search(&self, keyword: &str) -> Vec<Student> {
        let all = self.list_all();
        let Some(folded) = fold_keyword(keyword) else {
            return all;
        };
        all.into_iter()
            .filter(|s| matches_folded(&s.name, &folded) || matches_folded(&s.roll_no, &folded))
            .collect()
    }

    pub fn list_by_department(&self, department: &str) -> Vec<Student> {
        self.select(
            "list students by department",
            "WHERE department = ?1",
            &[&department],
        )
    }

    pub fn list_by_semester(&self, semester: i64) -> Vec<Student> {
        self.select(
            "list students by semester",
            "WHERE semester = ?1",
            &[&semester],
        )
    }

    /// True when another student (not `exclude_id`) already holds `roll_no`,
    /// ignoring case.
    /// Pass 0 when adding.
    pub fn roll_no_exists(&self, roll_no: &str, exclude_id: i64) -> bool {
        self.db
            .run("check roll number", |conn| {
                let n: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM students WHERE roll_no = ? COLLATE NOCASE AND id != ?",
                    (roll_no, exclude_id),
                    |r| r.get(0),
                )?;
                Ok(n > 0)
            })
            .unwrap_or(false)
    }

    fn select(
        &self,
        op: &'static str,
        filter: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Vec<Student> {
        self.db
            .run(op, |conn| {
                let mut stmt =
                    conn.prepare(&format!("SELECT {COLUMNS} FROM students {filter} {ORDER}"))?;
                let rows = stmt
                    .query_map(params, student_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .unwrap_or_default()
    }
}
