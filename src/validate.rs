//! Form validation. Every check runs in a fixed order and stops at the first
//! failure; the `Display` text is what the user sees.

use crate::model::{AttendanceStatus, StudentInput, SubjectInput};
use crate::repo::{StudentRepository, SubjectRepository};

pub const MIN_SEMESTER: i64 = 1;
pub const MAX_SEMESTER: i64 = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Student name is required")]
    StudentNameRequired,
    #[error("Roll number is required")]
    RollNoRequired,
    #[error("Department is required")]
    DepartmentRequired,
    #[error("Semester must be between 1 and 8")]
    SemesterOutOfRange,
    #[error("Roll number already exists")]
    DuplicateRollNo,
    #[error("Subject code is required")]
    SubjectCodeRequired,
    #[error("Subject name is required")]
    SubjectNameRequired,
    #[error("Subject code already exists")]
    DuplicateSubjectCode,
    #[error("Attendance status is required")]
    StatusRequired,
    #[error("Attendance status must be either 'Present' or 'Absent'")]
    InvalidStatus,
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn semester_in_range(semester: i64) -> bool {
    (MIN_SEMESTER..=MAX_SEMESTER).contains(&semester)
}

/// `exclude_id` is the student's own id on update and 0 on add.
pub fn validate_student(
    input: &StudentInput,
    exclude_id: i64,
    students: &StudentRepository,
) -> Result<(), ValidationError> {
    if blank(&input.name) {
        return Err(ValidationError::StudentNameRequired);
    }
    if blank(&input.roll_no) {
        return Err(ValidationError::RollNoRequired);
    }
    if blank(&input.department) {
        return Err(ValidationError::DepartmentRequired);
    }
    if !semester_in_range(input.semester) {
        return Err(ValidationError::SemesterOutOfRange);
    }
    if students.roll_no_exists(&input.roll_no, exclude_id) {
        return Err(ValidationError::DuplicateRollNo);
    }
    Ok(())
}

pub fn validate_subject(
    input: &SubjectInput,
    exclude_id: i64,
    subjects: &SubjectRepository,
) -> Result<(), ValidationError> {
    if blank(&input.subject_code) {
        return Err(ValidationError::SubjectCodeRequired);
    }
    if blank(&input.subject_name) {
        return Err(ValidationError::SubjectNameRequired);
    }
    if !semester_in_range(input.semester) {
        return Err(ValidationError::SemesterOutOfRange);
    }
    if subjects.code_exists(&input.subject_code, exclude_id) {
        return Err(ValidationError::DuplicateSubjectCode);
    }
    Ok(())
}

/// Exact, case-sensitive match against the two stored values.
pub fn validate_attendance_status(status: Option<&str>) -> Result<AttendanceStatus, ValidationError> {
    let Some(s) = status.filter(|s| !blank(s)) else {
        return Err(ValidationError::StatusRequired);
    };
    s.parse().map_err(|_| ValidationError::InvalidStatus)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_requires_exact_value() {
        assert_eq!(
            validate_attendance_status(Some("Present")),
            Ok(AttendanceStatus::Present)
        );
        assert_eq!(
            validate_attendance_status(Some("Absent")),
            Ok(AttendanceStatus::Absent)
        );
        assert_eq!(
            validate_attendance_status(None),
            Err(ValidationError::StatusRequired)
        );
        assert_eq!(
            validate_attendance_status(Some("   ")),
            Err(ValidationError::StatusRequired)
        );
        assert_eq!(
            validate_attendance_status(Some("present")),
            Err(ValidationError::InvalidStatus)
        );
        assert_eq!(
            validate_attendance_status(Some("Late")),
            Err(ValidationError::InvalidStatus)
        );
    }

    #[test]
    fn messages_are_user_facing() {
        assert_eq!(
            ValidationError::SemesterOutOfRange.to_string(),
            "Semester must be between 1 and 8"
        );
        assert_eq!(
            ValidationError::DuplicateSubjectCode.to_string(),
            "Subject code already exists"
        );
    }

    #[test]
    fn semester_bounds_are_inclusive() {
        assert!(!semester_in_range(0));
        assert!(semester_in_range(1));
        assert!(semester_in_range(8));
        assert!(!semester_in_range(9));
    }
}
