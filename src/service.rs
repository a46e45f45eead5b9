use crate::db::Database;
use crate::model::{
    attendance_percentage, AttendanceRecord, AttendanceStatus, OverallSummaryRow, StudentInput,
    StudentReportRow, SubjectInput, SubjectReportRow,
};
use crate::repo::{AttendanceRepository, StudentRepository, SubjectRepository};
use crate::validate::{self, ValidationError};
use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("storage failure during {op}")]
    Storage { op: &'static str },
}

/// Attendance bookkeeping over the three repositories.
#[derive(Debug, Clone)]
pub struct AttendanceService {
    db: Database,
    students: StudentRepository,
    subjects: SubjectRepository,
    attendance: AttendanceRepository,
}

impl AttendanceService {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            students: StudentRepository::new(db.clone()),
            subjects: SubjectRepository::new(db.clone()),
            attendance: AttendanceRepository::new(db.clone()),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn students(&self) -> &StudentRepository {
        &self.students
    }

    pub fn subjects(&self) -> &SubjectRepository {
        &self.subjects
    }

    pub fn attendance(&self) -> &AttendanceRepository {
        &self.attendance
    }

    /// Records one status per student for a class session.
    ///
    /// The first marking of a (subject, date) session goes in as a single
    /// all-or-nothing batch. Once the session has rows, every entry goes
    /// through [`Self::update_attendance`], so students missing from the
    /// earlier marking get a row instead of being skipped. Those writes are
    /// independent: a failure is logged and reported, the rest stand. If the
    /// session state cannot be read, nothing is written.
    pub fn mark_attendance(
        &self,
        subject_id: i64,
        date: NaiveDate,
        statuses: &BTreeMap<i64, AttendanceStatus>,
    ) -> bool {
        let Some(already_marked) = self.attendance.session_exists(subject_id, date) else {
            tracing::error!(subject_id, %date, "could not read session state; marking aborted");
            return false;
        };
        if !already_marked {
            let records: Vec<AttendanceRecord> = statuses
                .iter()
                .map(|(&student_id, &status)| {
                    AttendanceRecord::new(student_id, subject_id, date, status)
                })
                .collect();
            tracing::info!(subject_id, %date, rows = records.len(), "first marking for session");
            return self.attendance.batch_add(&records);
        }

        tracing::info!(
            subject_id,
            %date,
            incoming = statuses.len(),
            "re-marking session"
        );
        let mut all_ok = true;
        for (&student_id, &status) in statuses {
            if !self.update_attendance(student_id, subject_id, date, status) {
                tracing::error!(student_id, subject_id, %date, "attendance write failed");
                all_ok = false;
            }
        }
        all_ok
    }

    /// Upsert on (student, subject, date): rewrite the status when the row
    /// exists, insert it otherwise. A failed existence read writes nothing.
    pub fn update_attendance(
        &self,
        student_id: i64,
        subject_id: i64,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> bool {
        match self.attendance.key_exists(student_id, subject_id, date) {
            Some(true) => self
                .attendance
                .update_by_key(student_id, subject_id, date, status),
            Some(false) => {
                let record = AttendanceRecord::new(student_id, subject_id, date, status);
                self.attendance.add(&record).is_some()
            }
            None => false,
        }
    }

    pub fn attendance_percentage(&self, student_id: i64, subject_id: i64) -> f64 {
        self.attendance
            .stats(student_id, Some(subject_id))
            .percentage()
    }

    pub fn overall_attendance_percentage(&self, student_id: i64) -> f64 {
        self.attendance.stats(student_id, None).percentage()
    }

    /// One row per subject, including subjects the student has no records in.
    pub fn student_report(&self, student_id: i64) -> Vec<StudentReportRow> {
        self.subjects
            .list_all()
            .into_iter()
            .map(|subject| {
                let stats = self.attendance.stats(student_id, Some(subject.id));
                StudentReportRow {
                    subject_id: subject.id,
                    subject_code: subject.subject_code,
                    subject_name: subject.subject_name,
                    total: stats.total,
                    present: stats.present,
                    absent: stats.absent,
                    percentage: attendance_percentage(stats.present, stats.total),
                }
            })
            .collect()
    }

    /// One row per student, including students with no records in the subject.
    pub fn subject_report(&self, subject_id: i64) -> Vec<SubjectReportRow> {
        self.students
            .list_all()
            .into_iter()
            .map(|student| {
                let stats = self.attendance.stats(student.id, Some(subject_id));
                SubjectReportRow {
                    student_id: student.id,
                    student_name: student.name,
                    roll_no: student.roll_no,
                    department: student.department,
                    total: stats.total,
                    present: stats.present,
                    absent: stats.absent,
                    percentage: stats.percentage(),
                }
            })
            .collect()
    }

    pub fn overall_summary(&self) -> Vec<OverallSummaryRow> {
        self.students
            .list_all()
            .into_iter()
            .map(|student| {
                let stats = self.attendance.stats(student.id, None);
                OverallSummaryRow {
                    student_id: student.id,
                    roll_no: student.roll_no,
                    student_name: student.name,
                    department: student.department,
                    semester: student.semester,
                    total: stats.total,
                    present: stats.present,
                    absent: stats.absent,
                    percentage: stats.percentage(),
                }
            })
            .collect()
    }

    pub fn attendance_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<AttendanceRecord> {
        self.attendance.get_by_date_range(start, end)
    }

    pub fn delete_attendance(&self, subject_id: i64, date: NaiveDate) -> bool {
        self.attendance.delete_by_subject_and_date(subject_id, date)
    }

    pub fn validate_student(
        &self,
        input: &StudentInput,
        exclude_id: i64,
    ) -> Result<(), ValidationError> {
        validate::validate_student(input, exclude_id, &self.students)
    }

    pub fn validate_subject(
        &self,
        input: &SubjectInput,
        exclude_id: i64,
    ) -> Result<(), ValidationError> {
        validate::validate_subject(input, exclude_id, &self.subjects)
    }

    pub fn create_student(&self, input: &StudentInput) -> Result<i64, ServiceError> {
        let input = normalize_student(input);
        self.validate_student(&input, 0)?;
        self.students
            .add(&input)
            .ok_or(ServiceError::Storage { op: "add student" })
    }

    pub fn update_student(&self, id: i64, input: &StudentInput) -> Result<(), ServiceError> {
        if self.students.get_by_id(id).is_none() {
            return Err(ServiceError::NotFound("student"));
        }
        let input = normalize_student(input);
        self.validate_student(&input, id)?;
        if !self.students.update(id, &input) {
            return Err(ServiceError::Storage {
                op: "update student",
            });
        }
        Ok(())
    }

    pub fn create_subject(&self, input: &SubjectInput) -> Result<i64, ServiceError> {
        let input = normalize_subject(input);
        self.validate_subject(&input, 0)?;
        self.subjects
            .add(&input)
            .ok_or(ServiceError::Storage { op: "add subject" })
    }

    pub fn update_subject(&self, id: i64, input: &SubjectInput) -> Result<(), ServiceError> {
        if self.subjects.get_by_id(id).is_none() {
            return Err(ServiceError::NotFound("subject"));
        }
        let input = normalize_subject(input);
        self.validate_subject(&input, id)?;
        if !self.subjects.update(id, &input) {
            return Err(ServiceError::Storage {
                op: "update subject",
            });
        }
        Ok(())
    }
}

fn normalize_student(input: &StudentInput) -> StudentInput {
    StudentInput {
        name: input.name.trim().to_string(),
        roll_no: input.roll_no.trim().to_string(),
        department: input.department.trim().to_string(),
        semester: input.semester,
        class_name: input
            .class_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    }
}

fn normalize_subject(input: &SubjectInput) -> SubjectInput {
    SubjectInput {
        subject_code: input.subject_code.trim().to_string(),
        subject_name: input.subject_name.trim().to_string(),
        semester: input.semester,
    }
}
