use super::{fold_keyword, matches_folded};
use crate::db::Database;
use crate::model::{Subject, SubjectInput};
use rusqlite::{OptionalExtension, Row};

const COLUMNS: &str = "id, subject_code, subject_name, semester, created_at";
const ORDER: &str = "ORDER BY semester, subject_code, id";

fn subject_from_row(r: &Row<'_>) -> rusqlite::Result<Subject> {
    Ok(Subject {
        id: r.get(0)?,
        subject_code: r.get(1)?,
        subject_name: r.get(2)?,
        semester: r.get(3)?,
        created_at: r.get(4)?,
    })
}

#[derive(Debug, Clone)]
pub struct SubjectRepository {
    db: Database,
}

impl SubjectRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn add(&self, input: &SubjectInput) -> Option<i64> {
        self.db.run("add subject", |conn| {
            conn.execute(
                "INSERT INTO subjects(subject_code, subject_name, semester) VALUES(?, ?, ?)",
                (&input.subject_code, &input.subject_name, input.semester),
            )?;
            let id = conn.last_insert_rowid();
            tracing::info!(subject_id = id, code = %input.subject_code, "subject added");
            Ok(id)
        })
    }

    pub fn update(&self, id: i64, input: &SubjectInput) -> bool {
        self.db
            .run("update subject", |conn| {
                let changed = conn.execute(
                    "UPDATE subjects SET subject_code = ?, subject_name = ?, semester = ? WHERE id = ?",
                    (&input.subject_code, &input.subject_name, input.semester, id),
                )?;
                Ok(changed > 0)
            })
            .unwrap_or(false)
    }

    pub fn delete(&self, id: i64) -> bool {
        self.db
            .run("delete subject", |conn| {
                let changed = conn.execute("DELETE FROM subjects WHERE id = ?", [id])?;
                if changed > 0 {
                    tracing::info!(subject_id = id, "subject deleted");
                }
                Ok(changed > 0)
            })
            .unwrap_or(false)
    }

    pub fn get_by_id(&self, id: i64) -> Option<Subject> {
        self.db
            .run("get subject by id", |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {COLUMNS} FROM subjects WHERE id = ?"),
                        [id],
                        subject_from_row,
                    )
                    .optional()?)
            })
            .flatten()
    }

    pub fn get_by_code(&self, code: &str) -> Option<Subject> {
        self.db
            .run("get subject by code", |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {COLUMNS} FROM subjects WHERE subject_code = ? COLLATE NOCASE"),
                        [code],
                        subject_from_row,
                    )
                    .optional()?)
            })
            .flatten()
    }

    pub fn list_all(&self) -> Vec<Subject> {
        self.select("list subjects", "", &[])
    }

    /// Case-insensitive substring match on code or name. A blank keyword
    /// lists every subject.
    pub fn search(&self, keyword: &str) -> Vec<Subject> {
        let all = self.list_all();
        let Some(folded) = fold_keyword(keyword) else {
            return all;
        };
        all.into_iter()
            .filter(|s| {
                matches_folded(&s.subject_code, &folded) || matches_folded(&s.subject_name, &folded)
            })
            .collect()
    }

    pub fn list_by_semester(&self, semester: i64) -> Vec<Subject> {
        self.select(
            "list subjects by semester",
            "WHERE semester = ?1",
            &[&semester],
        )
    }

    pub fn code_exists(&self, code: &str, exclude_id: i64) -> bool {
        self.db
            .run("check subject code", |conn| {
                let n: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM subjects WHERE subject_code = ? COLLATE NOCASE AND id != ?",
                    (code, exclude_id),
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
    ) -> Vec<Subject> {
        self.db
            .run(op, |conn| {
                let mut stmt =
                    conn.prepare(&format!("SELECT {COLUMNS} FROM subjects {filter} {ORDER}"))?;
                let rows = stmt
                    .query_map(params, subject_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .unwrap_or_default()
    }
}
