//! CSV report files: a few descriptive lines, a blank line, a header row,
//! then one row per record.

use crate::model::{
    AttendanceRecord, OverallSummaryRow, Student, StudentReportRow, Subject, SubjectReportRow,
};
use anyhow::Context;
use chrono::NaiveDate;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

fn is_line_break(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Collapses each line break (CRLF counts as one) to a space, then quotes the
/// field if it holds a comma or either quote character. Only `"` is doubled.
pub fn escape_field(raw: &str) -> String {
    let mut flat = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\r' && chars.peek() == Some(&'\n') {
            chars.next();
            flat.push(' ');
        } else if is_line_break(ch) {
            flat.push(' ');
        } else {
            flat.push(ch);
        }
    }
    if flat.contains([',', '"', '\'']) {
        format!("\"{}\"", flat.replace('"', "\"\""))
    } else {
        flat
    }
}

fn percent(p: f64) -> String {
    format!("{p:.2}%")
}

pub fn write_student_report<W: Write>(
    w: &mut W,
    student: &Student,
    rows: &[StudentReportRow],
    generated_on: NaiveDate,
) -> io::Result<()> {
    writeln!(w, "Student Attendance Report")?;
    writeln!(w, "Student Name: {}", student.name)?;
    writeln!(w, "Roll Number: {}", student.roll_no)?;
    writeln!(w, "Generated On: {generated_on}")?;
    writeln!(w)?;
    writeln!(w, "Subject Code,Subject Name,Total Classes,Present,Absent,Percentage")?;
    for r in rows {
        writeln!(
            w,
            "{},{},{},{},{},{}",
            escape_field(&r.subject_code),
            escape_field(&r.subject_name),
            r.total,
            r.present,
            r.absent,
            percent(r.percentage)
        )?;
    }
    Ok(())
}

pub fn write_subject_report<W: Write>(
    w: &mut W,
    subject: &Subject,
    rows: &[SubjectReportRow],
    generated_on: NaiveDate,
) -> io::Result<()> {
    writeln!(w, "Subject Attendance Report")?;
    writeln!(
        w,
        "Subject: {} - {}",
        subject.subject_code, subject.subject_name
    )?;
    writeln!(w, "Generated On: {generated_on}")?;
    writeln!(w)?;
    writeln!(
        w,
        "Roll No,Student Name,Department,Total Classes,Present,Absent,Percentage"
    )?;
    for r in rows {
        writeln!(
            w,
            "{},{},{},{},{},{},{}",
            escape_field(&r.roll_no),
            escape_field(&r.student_name),
            escape_field(&r.department),
            r.total,
            r.present,
            r.absent,
            percent(r.percentage)
        )?;
    }
    Ok(())
}

pub fn write_attendance_range<W: Write>(
    w: &mut W,
    start: NaiveDate,
    end: NaiveDate,
    records: &[AttendanceRecord],
    generated_on: NaiveDate,
) -> io::Result<()> {
    writeln!(w, "Attendance Records Report")?;
    writeln!(w, "Date Range: {start} to {end}")?;
    writeln!(w, "Generated On: {generated_on}")?;
    writeln!(w)?;
    writeln!(w, "Date,Roll No,Student Name,Subject Code,Subject Name,Status")?;
    for r in records {
        let (roll_no, student_name, code, subject_name) = match &r.display {
            Some(d) => (
                d.roll_no.as_str(),
                d.student_name.as_str(),
                d.subject_code.as_str(),
                d.subject_name.as_str(),
            ),
            None => ("", "", "", ""),
        };
        writeln!(
            w,
            "{},{},{},{},{},{}",
            r.date,
            escape_field(roll_no),
            escape_field(student_name),
            escape_field(code),
            escape_field(subject_name),
            r.status
        )?;
    }
    Ok(())
}

pub fn write_overall_summary<W: Write>(
    w: &mut W,
    rows: &[OverallSummaryRow],
    generated_on: NaiveDate,
) -> io::Result<()> {
    writeln!(w, "Overall Attendance Summary")?;
    writeln!(w, "Generated On: {generated_on}")?;
    writeln!(w)?;
    writeln!(
        w,
        "Roll No,Student Name,Department,Semester,Total Classes,Present,Absent,Percentage"
    )?;
    for r in rows {
        writeln!(
            w,
            "{},{},{},{},{},{},{},{}",
            escape_field(&r.roll_no),
            escape_field(&r.student_name),
            escape_field(&r.department),
            r.semester,
            r.total,
            r.present,
            r.absent,
            percent(r.percentage)
        )?;
    }
    Ok(())
}

/// Creates `path` (and its parent directories) and hands a buffered writer to `write`.
pub fn write_file<F>(path: &Path, write: F) -> anyhow::Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let file = File::create(path)
        .with_context(|| format!("failed to create output file {}", path.to_string_lossy()))?;
    let mut out = BufWriter::new(file);
    write(&mut out).with_context(|| format!("failed to write {}", path.to_string_lossy()))?;
    out.flush()
        .with_context(|| format!("failed to flush {}", path.to_string_lossy()))?;
    tracing::info!(path = %path.to_string_lossy(), "csv report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttendanceDisplay, AttendanceStatus};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn escape_quotes_on_comma_and_single_quote() {
        assert_eq!(escape_field("O'Brien, A."), "\"O'Brien, A.\"");
        assert_eq!(escape_field("O'Brien"), "\"O'Brien\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field(""), "");
    }

    #[test]
    fn escape_collapses_line_breaks_before_quoting() {
        assert_eq!(escape_field("two\nlines"), "two lines");
        assert_eq!(escape_field("crlf\r\nonce"), "crlf once");
        assert_eq!(escape_field("a\n,b"), "\"a ,b\"");
    }

    #[test]
    fn student_report_layout() {
        let student = Student {
            id: 1,
            name: "Asha".into(),
            roll_no: "R1".into(),
            department: "CS".into(),
            semester: 3,
            class_name: Some("A".into()),
            created_at: None,
        };
        let rows = vec![StudentReportRow {
            subject_id: 7,
            subject_code: "S3-01".into(),
            subject_name: "Math, Applied".into(),
            total: 3,
            present: 2,
            absent: 1,
            percentage: 200.0 / 3.0,
        }];
        let mut out = Vec::new();
        write_student_report(&mut out, &student, &rows, day(2024, 2, 1)).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Student Attendance Report\n\
             Student Name: Asha\n\
             Roll Number: R1\n\
             Generated On: 2024-02-01\n\
             \n\
             Subject Code,Subject Name,Total Classes,Present,Absent,Percentage\n\
             S3-01,\"Math, Applied\",3,2,1,66.67%\n"
        );
    }

    #[test]
    fn range_report_writes_status_and_display_fields() {
        let rec = AttendanceRecord {
            id: 1,
            student_id: 1,
            subject_id: 2,
            date: day(2024, 1, 10),
            status: AttendanceStatus::Absent,
            display: Some(AttendanceDisplay {
                student_name: "O'Brien, A.".into(),
                roll_no: "R9".into(),
                subject_code: "PHY".into(),
                subject_name: "Physics".into(),
            }),
        };
        let mut out = Vec::new();
        write_attendance_range(&mut out, day(2024, 1, 1), day(2024, 1, 31), &[rec], day(2024, 2, 1))
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "Date Range: 2024-01-01 to 2024-01-31");
        assert_eq!(lines[3], "");
        assert_eq!(lines[5], "2024-01-10,R9,\"O'Brien, A.\",PHY,Physics,Absent");
    }

    #[test]
    fn overall_summary_formats_zero_percent() {
        let rows = vec![OverallSummaryRow {
            student_id: 1,
            roll_no: "R1".into(),
            student_name: "Asha".into(),
            department: "CS".into(),
            semester: 3,
            total: 0,
            present: 0,
            absent: 0,
            percentage: 0.0,
        }];
        let mut out = Vec::new();
        write_overall_summary(&mut out, &rows, day(2024, 2, 1)).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("R1,Asha,CS,3,0,0,0,0.00%\n"), "{text}");
    }
}
