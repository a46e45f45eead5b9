use crate::ipc::helpers::{dispatch, required_id, required_str, to_json, HandlerErr, HandlerFn};
use crate::ipc::types::{AppState, Request};
use crate::model::SubjectInput;
use crate::service::AttendanceService;
use serde_json::json;

fn subject_input(params: &serde_json::Value) -> Result<SubjectInput, HandlerErr> {
    serde_json::from_value(params.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid subject fields: {e}")))
}

fn subjects_list(svc: &AttendanceService, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({ "subjects": to_json(&svc.subjects().list_all())? }))
}

fn subjects_search(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let keyword = required_str(params, "keyword")?;
    Ok(json!({ "subjects": to_json(&svc.subjects().search(&keyword))? }))
}

fn subjects_by_semester(
    svc: &AttendanceService,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let semester = required_id(params, "semester")?;
    Ok(json!({ "subjects": to_json(&svc.subjects().list_by_semester(semester))? }))
}

fn subjects_get(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let id = required_id(params, "subjectId")?;
    let subject = svc
        .subjects()
        .get_by_id(id)
        .ok_or_else(|| HandlerErr::not_found("subject"))?;
    Ok(json!({ "subject": to_json(&subject)? }))
}

fn subjects_get_by_code(
    svc: &AttendanceService,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let code = required_str(params, "subjectCode")?;
    let subject = svc
        .subjects()
        .get_by_code(code.trim())
        .ok_or_else(|| HandlerErr::not_found("subject"))?;
    Ok(json!({ "subject": to_json(&subject)? }))
}

fn subjects_create(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let input = subject_input(params)?;
    let subject_id = svc.create_subject(&input)?;
    Ok(json!({ "subjectId": subject_id }))
}

fn subjects_update(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let id = required_id(params, "subjectId")?;
    let input = subject_input(params)?;
    svc.update_subject(id, &input)?;
    Ok(json!({ "ok": true }))
}

fn subjects_delete(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let id = required_id(params, "subjectId")?;
    Ok(json!({ "deleted": svc.subjects().delete(id) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: HandlerFn = match req.method.as_str() {
        "subjects.list" => subjects_list,
        "subjects.search" => subjects_search,
        "subjects.bySemester" => subjects_by_semester,
        "subjects.get" => subjects_get,
        "subjects.getByCode" => subjects_get_by_code,
        "subjects.create" => subjects_create,
        "subjects.update" => subjects_update,
        "subjects.delete" => subjects_delete,
        _ => return None,
    };
    Some(dispatch(state, req, f))
}
