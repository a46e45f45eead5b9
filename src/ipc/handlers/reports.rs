use crate::export;
use crate::ipc::helpers::{
    dispatch, optional_id, required_date, required_id, required_str, to_json, HandlerErr,
    HandlerFn,
};
use crate::ipc::types::{AppState, Request};
use crate::service::AttendanceService;
use chrono::Local;
use serde_json::json;
use std::path::PathBuf;

fn reports_percentage(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_id(params, "studentId")?;
    let percentage = match optional_id(params, "subjectId")? {
        Some(subject_id) => svc.attendance_percentage(student_id, subject_id),
        None => svc.overall_attendance_percentage(student_id),
    };
    Ok(json!({ "percentage": percentage }))
}

fn reports_student(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_id(params, "studentId")?;
    if svc.students().get_by_id(student_id).is_none() {
        return Err(HandlerErr::not_found("student"));
    }
    Ok(json!({
        "rows": to_json(&svc.student_report(student_id))?,
        "overallPercentage": svc.overall_attendance_percentage(student_id),
    }))
}

fn reports_subject(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = required_id(params, "subjectId")?;
    if svc.subjects().get_by_id(subject_id).is_none() {
        return Err(HandlerErr::not_found("subject"));
    }
    Ok(json!({ "rows": to_json(&svc.subject_report(subject_id))? }))
}

fn reports_overall(svc: &AttendanceService, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({ "rows": to_json(&svc.overall_summary())? }))
}

fn export_failed(e: anyhow::Error) -> HandlerErr {
    HandlerErr::new("export_failed", format!("{e:#}"))
}

fn reports_export_csv(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let kind = required_str(params, "kind")?;
    let out_path = PathBuf::from(required_str(params, "outPath")?);
    let today = Local::now().date_naive();

    let row_count = match kind.as_str() {
        "student" => {
            let student_id = required_id(params, "studentId")?;
            let student = svc
                .students()
                .get_by_id(student_id)
                .ok_or_else(|| HandlerErr::not_found("student"))?;
            let rows = svc.student_report(student_id);
            export::write_file(&out_path, |w| {
                export::write_student_report(w, &student, &rows, today)
            })
            .map_err(export_failed)?;
            rows.len()
        }
        "subject" => {
            let subject_id = required_id(params, "subjectId")?;
            let subject = svc
                .subjects()
                .get_by_id(subject_id)
                .ok_or_else(|| HandlerErr::not_found("subject"))?;
            let rows = svc.subject_report(subject_id);
            export::write_file(&out_path, |w| {
                export::write_subject_report(w, &subject, &rows, today)
            })
            .map_err(export_failed)?;
            rows.len()
        }
        "range" => {
            let start = required_date(params, "startDate")?;
            let end = required_date(params, "endDate")?;
            if end < start {
                return Err(HandlerErr::bad_params("endDate must not precede startDate"));
            }
            let records = svc.attendance_by_date_range(start, end);
            export::write_file(&out_path, |w| {
                export::write_attendance_range(w, start, end, &records, today)
            })
            .map_err(export_failed)?;
            records.len()
        }
        "overall" => {
            let rows = svc.overall_summary();
            export::write_file(&out_path, |w| {
                export::write_overall_summary(w, &rows, today)
            })
            .map_err(export_failed)?;
            rows.len()
        }
        other => {
            return Err(HandlerErr {
                code: "bad_params",
                message: "kind must be one of: student, subject, range, overall".to_string(),
                details: Some(json!({ "kind": other })),
            })
        }
    };

    Ok(json!({
        "path": out_path.to_string_lossy(),
        "rowCount": row_count,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: HandlerFn = match req.method.as_str() {
        "reports.percentage" => reports_percentage,
        "reports.student" => reports_student,
        "reports.subject" => reports_subject,
        "reports.overall" => reports_overall,
        "reports.exportCsv" => reports_export_csv,
        _ => return None,
    };
    Some(dispatch(state, req, f))
}
