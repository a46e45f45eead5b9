use crate::ipc::helpers::{
    dispatch, optional_id, optional_str, required_date, required_id, to_json, HandlerErr,
    HandlerFn,
};
use crate::ipc::types::{AppState, Request};
use crate::model::AttendanceStatus;
use crate::service::AttendanceService;
use crate::validate::validate_attendance_status;
use serde_json::json;
use std::collections::BTreeMap;

fn required_status(params: &serde_json::Value) -> Result<AttendanceStatus, HandlerErr> {
    Ok(validate_attendance_status(
        optional_str(params, "status").as_deref(),
    )?)
}

/// `{"<studentId>": "Present", ...}`; every status is validated before any write.
fn parse_statuses(
    params: &serde_json::Value,
) -> Result<BTreeMap<i64, AttendanceStatus>, HandlerErr> {
    let Some(obj) = params.get("statuses").and_then(|v| v.as_object()) else {
        return Err(HandlerErr::bad_params("missing statuses"));
    };
    let mut out = BTreeMap::new();
    for (key, value) in obj {
        let student_id = key.trim().parse::<i64>().map_err(|_| HandlerErr {
            code: "bad_params",
            message: "statuses keys must be student ids".to_string(),
            details: Some(json!({ "key": key })),
        })?;
        let status = validate_attendance_status(value.as_str()).map_err(|e| HandlerErr {
            code: "validation_failed",
            message: e.to_string(),
            details: Some(json!({ "studentId": student_id })),
        })?;
        out.insert(student_id, status);
    }
    Ok(out)
}

fn attendance_mark(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = required_id(params, "subjectId")?;
    let date = required_date(params, "date")?;
    let statuses = parse_statuses(params)?;
    if svc.subjects().get_by_id(subject_id).is_none() {
        return Err(HandlerErr::not_found("subject"));
    }
    if !svc.mark_attendance(subject_id, date, &statuses) {
        return Err(HandlerErr::db_failed("mark attendance"));
    }
    Ok(json!({ "ok": true, "count": statuses.len() }))
}

fn attendance_update(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_id(params, "studentId")?;
    let subject_id = required_id(params, "subjectId")?;
    let date = required_date(params, "date")?;
    let status = required_status(params)?;
    if !svc.update_attendance(student_id, subject_id, date, status) {
        return Err(HandlerErr::db_failed("update attendance"));
    }
    Ok(json!({ "ok": true }))
}

fn attendance_for_subject_date(
    svc: &AttendanceService,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = required_id(params, "subjectId")?;
    let date = required_date(params, "date")?;
    let records = svc.attendance().get_by_subject_and_date(subject_id, date);
    Ok(json!({ "records": to_json(&records)? }))
}

fn attendance_by_student(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_id(params, "studentId")?;
    Ok(json!({ "records": to_json(&svc.attendance().get_by_student(student_id))? }))
}

fn attendance_by_subject(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = required_id(params, "subjectId")?;
    Ok(json!({ "records": to_json(&svc.attendance().get_by_subject(subject_id))? }))
}

fn attendance_by_date(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let date = required_date(params, "date")?;
    Ok(json!({ "records": to_json(&svc.attendance().get_by_date(date))? }))
}

fn attendance_range(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let start = required_date(params, "startDate")?;
    let end = required_date(params, "endDate")?;
    if end < start {
        return Err(HandlerErr::bad_params("endDate must not precede startDate"));
    }
    Ok(json!({ "records": to_json(&svc.attendance_by_date_range(start, end))? }))
}

fn attendance_delete(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = required_id(params, "subjectId")?;
    let date = required_date(params, "date")?;
    Ok(json!({ "deleted": svc.delete_attendance(subject_id, date) }))
}

fn attendance_stats(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_id(params, "studentId")?;
    let subject_id = optional_id(params, "subjectId")?;
    let stats = svc.attendance().stats(student_id, subject_id);
    Ok(json!({
        "total": stats.total,
        "present": stats.present,
        "absent": stats.absent,
        "percentage": stats.percentage(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: HandlerFn = match req.method.as_str() {
        "attendance.mark" => attendance_mark,
        "attendance.update" => attendance_update,
        "attendance.forSubjectDate" => attendance_for_subject_date,
        "attendance.byStudent" => attendance_by_student,
        "attendance.bySubject" => attendance_by_subject,
        "attendance.byDate" => attendance_by_date,
        "attendance.range" => attendance_range,
        "attendance.delete" => attendance_delete,
        "attendance.stats" => attendance_stats,
        _ => return None,
    };
    Some(dispatch(state, req, f))
}
