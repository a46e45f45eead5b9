use crate::db::Database;
use crate::model::{AttendanceDisplay, AttendanceRecord, AttendanceStats, AttendanceStatus};
use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{OptionalExtension, Row, ToSql};

impl ToSql for AttendanceStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AttendanceStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

const JOINED: &str = "SELECT a.id, a.student_id, a.subject_id, a.date, a.status,
            s.name, s.roll_no, sub.subject_code, sub.subject_name
     FROM attendance a
     JOIN students s ON a.student_id = s.id
     JOIN subjects sub ON a.subject_id = sub.id";

fn record_from_row(r: &Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    Ok(AttendanceRecord {
        id: r.get(0)?,
        student_id: r.get(1)?,
        subject_id: r.get(2)?,
        date: r.get(3)?,
        status: r.get(4)?,
        display: None,
    })
}

fn joined_from_row(r: &Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    let mut rec = record_from_row(r)?;
    rec.display = Some(AttendanceDisplay {
        student_name: r.get(5)?,
        roll_no: r.get(6)?,
        subject_code: r.get(7)?,
        subject_name: r.get(8)?,
    });
    Ok(rec)
}

#[derive(Debug, Clone)]
pub struct AttendanceRepository {
    db: Database,
}

impl AttendanceRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn add(&self, record: &AttendanceRecord) -> Option<i64> {
        self.db.run("add attendance", |conn| {
            conn.execute(
                "INSERT INTO attendance(student_id, subject_id, date, status) VALUES(?, ?, ?, ?)",
                (
                    record.student_id,
                    record.subject_id,
                    record.date,
                    record.status,
                ),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Inserts every record in one transaction. Any failing row rolls the
    /// whole batch back.
    pub fn batch_add(&self, records: &[AttendanceRecord]) -> bool {
        if records.is_empty() {
            return true;
        }
        self.db
            .run("batch add attendance", |conn| {
                // Dropping the guard without commit rolls back on every exit path.
                let tx = conn.unchecked_transaction()?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO attendance(student_id, subject_id, date, status)
                         VALUES(?, ?, ?, ?)",
                    )?;
                    for r in records {
                        stmt.execute((r.student_id, r.subject_id, r.date, r.status))?;
                    }
                }
                tx.commit()?;
                tracing::info!(rows = records.len(), "attendance batch committed");
                Ok(())
            })
            .is_some()
    }

    /// Rewrites the status of the row with `record.id`.
    pub fn update(&self, record: &AttendanceRecord) -> bool {
        self.db
            .run("update attendance", |conn| {
                let changed = conn.execute(
                    "UPDATE attendance SET status = ? WHERE id = ?",
                    (record.status, record.id),
                )?;
                Ok(changed > 0)
            })
            .unwrap_or(false)
    }

    /// Rewrites the status for the key. Affects zero rows when the key is
    /// missing, which reports `false`.
    pub fn update_by_key(
        &self,
        student_id: i64,
        subject_id: i64,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> bool {
        self.db
            .run("update attendance by key", |conn| {
                let changed = conn.execute(
                    "UPDATE attendance SET status = ?
                     WHERE student_id = ? AND subject_id = ? AND date = ?",
                    (status, student_id, subject_id, date),
                )?;
                Ok(changed > 0)
            })
            .unwrap_or(false)
    }

    pub fn delete(&self, id: i64) -> bool {
        self.db
            .run("delete attendance", |conn| {
                Ok(conn.execute("DELETE FROM attendance WHERE id = ?", [id])? > 0)
            })
            .unwrap_or(false)
    }

    pub fn delete_by_subject_and_date(&self, subject_id: i64, date: NaiveDate) -> bool {
        self.db
            .run("delete attendance by subject and date", |conn| {
                let changed = conn.execute(
                    "DELETE FROM attendance WHERE subject_id = ? AND date = ?",
                    (subject_id, date),
                )?;
                tracing::info!(subject_id, %date, rows = changed, "attendance deleted");
                Ok(changed > 0)
            })
            .unwrap_or(false)
    }

    pub fn exists_for_key(&self, student_id: i64, subject_id: i64, date: NaiveDate) -> bool {
        self.key_exists(student_id, subject_id, date).unwrap_or(false)
    }

    /// Like [`Self::exists_for_key`], but a failed read is `None` rather than `false`.
    pub fn key_exists(&self, student_id: i64, subject_id: i64, date: NaiveDate) -> Option<bool> {
        self.db.run("check attendance key", |conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM attendance
                 WHERE student_id = ? AND subject_id = ? AND date = ?",
                (student_id, subject_id, date),
                |r| r.get(0),
            )?;
            Ok(n > 0)
        })
    }

    /// Whether the (subject, date) session has any rows; `None` when the read failed.
    pub fn session_exists(&self, subject_id: i64, date: NaiveDate) -> Option<bool> {
        self.db.run("check attendance session", |conn| {
            Ok(conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM attendance WHERE subject_id = ? AND date = ?)",
                (subject_id, date),
                |r| r.get::<_, bool>(0),
            )?)
        })
    }

    /// Primary-key lookup; display fields stay empty.
    pub fn get_by_id(&self, id: i64) -> Option<AttendanceRecord> {
        self.db
            .run("get attendance by id", |conn| {
                Ok(conn
                    .query_row(
                        "SELECT id, student_id, subject_id, date, status
                         FROM attendance WHERE id = ?",
                        [id],
                        record_from_row,
                    )
                    .optional()?)
            })
            .flatten()
    }

    pub fn get_by_student(&self, student_id: i64) -> Vec<AttendanceRecord> {
        self.select(
            "attendance by student",
            "WHERE a.student_id = ?1 ORDER BY a.date DESC, sub.subject_name, a.id",
            &[&student_id],
        )
    }

    pub fn get_by_subject(&self, subject_id: i64) -> Vec<AttendanceRecord> {
        self.select(
            "attendance by subject",
            "WHERE a.subject_id = ?1 ORDER BY a.date DESC, s.name, a.id",
            &[&subject_id],
        )
    }

    pub fn get_by_date(&self, date: NaiveDate) -> Vec<AttendanceRecord> {
        self.select(
            "attendance by date",
            "WHERE a.date = ?1 ORDER BY sub.subject_name, s.name, a.id",
            &[&date],
        )
    }

    pub fn get_by_subject_and_date(&self, subject_id: i64, date: NaiveDate) -> Vec<AttendanceRecord> {
        self.select(
            "attendance by subject and date",
            "WHERE a.subject_id = ?1 AND a.date = ?2 ORDER BY s.roll_no, a.id",
            &[&subject_id, &date],
        )
    }

    /// Inclusive on both ends.
    pub fn get_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<AttendanceRecord> {
        self.select(
            "attendance by date range",
            "WHERE a.date BETWEEN ?1 AND ?2 ORDER BY a.date DESC, sub.subject_name, s.name, a.id",
            &[&start, &end],
        )
    }

    /// Counts for one student, scoped to a subject or across all of them.
    /// A storage failure reads as zero classes.
    pub fn stats(&self, student_id: i64, subject_id: Option<i64>) -> AttendanceStats {
        self.db
            .run("attendance stats", |conn| {
                let sql = "SELECT COUNT(*),
                        COALESCE(SUM(CASE WHEN status = 'Present' THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN status = 'Absent' THEN 1 ELSE 0 END), 0)
                 FROM attendance
                 WHERE student_id = ?1 AND (?2 IS NULL OR subject_id = ?2)";
                Ok(conn.query_row(sql, (student_id, subject_id), |r| {
                    Ok(AttendanceStats {
                        total: r.get(0)?,
                        present: r.get(1)?,
                        absent: r.get(2)?,
                    })
                })?)
            })
            .unwrap_or_default()
    }

    fn select(
        &self,
        op: &'static str,
        tail: &str,
        params: &[&dyn ToSql],
    ) -> Vec<AttendanceRecord> {
        self.db
            .run(op, |conn| {
                let mut stmt = conn.prepare(&format!("{JOINED} {tail}"))?;
                let rows = stmt
                    .query_map(params, joined_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .unwrap_or_default()
    }
}
