use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub roll_no: String,
    pub department: String,
    pub semester: i64,
    pub class_name: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

/// Editable student fields, as collected from a form.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub roll_no: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub semester: i64,
    #[serde(default)]
    pub class_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: i64,
    pub subject_code: String,
    pub subject_name: String,
    pub semester: i64,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectInput {
    #[serde(default)]
    pub subject_code: String,
    #[serde(default)]
    pub subject_name: String,
    #[serde(default)]
    pub semester: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown attendance status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for AttendanceStatus {
    type Err = UnknownStatus;

    // Case-sensitive on purpose: "present" is not a stored value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Present" => Ok(AttendanceStatus::Present),
            "Absent" => Ok(AttendanceStatus::Absent),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Display fields only present on rows read through a join.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceDisplay {
    pub student_name: String,
    pub roll_no: String,
    pub subject_code: String,
    pub subject_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: i64,
    pub student_id: i64,
    pub subject_id: i64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<AttendanceDisplay>,
}

impl AttendanceRecord {
    /// A record not yet persisted; `id` is assigned on insert.
    pub fn new(student_id: i64, subject_id: i64, date: NaiveDate, status: AttendanceStatus) -> Self {
        Self {
            id: 0,
            student_id,
            subject_id,
            date,
            status,
            display: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceStats {
    pub total: i64,
    pub present: i64,
    pub absent: i64,
}

impl AttendanceStats {
    pub fn percentage(&self) -> f64 {
        attendance_percentage(self.present, self.total)
    }
}

/// `present * 100 / total`, or exactly 0.0 when no classes were held.
pub fn attendance_percentage(present: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (present as f64 * 100.0) / total as f64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReportRow {
    pub subject_id: i64,
    pub subject_code: String,
    pub subject_name: String,
    pub total: i64,
    pub present: i64,
    pub absent: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectReportRow {
    pub student_id: i64,
    pub student_name: String,
    pub roll_no: String,
    pub department: String,
    pub total: i64,
    pub present: i64,
    pub absent: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallSummaryRow {
    pub student_id: i64,
    pub roll_no: String,
    pub student_name: String,
    pub department: String,
    pub semester: i64,
    pub total: i64,
    pub present: i64,
    pub absent: i64,
    pub percentage: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_is_zero_without_classes() {
        assert_eq!(attendance_percentage(0, 0), 0.0);
        assert_eq!(AttendanceStats::default().percentage(), 0.0);
    }

    #[test]
    fn percentage_uses_present_over_total() {
        assert_eq!(attendance_percentage(3, 4), 75.0);
        assert_eq!(attendance_percentage(4, 4), 100.0);
        assert!((attendance_percentage(1, 3) - 33.333_333_333).abs() < 1e-6);
    }

    #[test]
    fn status_parse_is_case_sensitive() {
        assert_eq!("Present".parse(), Ok(AttendanceStatus::Present));
        assert_eq!("Absent".parse(), Ok(AttendanceStatus::Absent));
        assert!("present".parse::<AttendanceStatus>().is_err());
        assert!(" Absent".parse::<AttendanceStatus>().is_err());
        assert!("Late".parse::<AttendanceStatus>().is_err());
    }

    #[test]
    fn join_fields_are_omitted_when_absent() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let rec = AttendanceRecord::new(1, 2, date, AttendanceStatus::Present);
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["date"], "2024-01-10");
        assert_eq!(v["status"], "Present");
        assert!(v.get("display").is_none());
    }
}
