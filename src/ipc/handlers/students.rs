use crate::ipc::helpers::{dispatch, required_id, required_str, to_json, HandlerErr, HandlerFn};
use crate::ipc::types::{AppState, Request};
use crate::model::StudentInput;
use crate::service::AttendanceService;
use serde_json::json;

fn student_input(params: &serde_json::Value) -> Result<StudentInput, HandlerErr> {
    serde_json::from_value(params.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid student fields: {e}")))
}

fn students_list(svc: &AttendanceService, _params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({ "students": to_json(&svc.students().list_all())? }))
}

fn students_search(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let keyword = required_str(params, "keyword")?;
    Ok(json!({ "students": to_json(&svc.students().search(&keyword))? }))
}

fn students_by_department(
    svc: &AttendanceService,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let department = required_str(params, "department")?;
    Ok(json!({ "students": to_json(&svc.students().list_by_department(&department))? }))
}

fn students_by_semester(
    svc: &AttendanceService,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let semester = required_id(params, "semester")?;
    Ok(json!({ "students": to_json(&svc.students().list_by_semester(semester))? }))
}

fn students_get(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let id = required_id(params, "studentId")?;
    let student = svc
        .students()
        .get_by_id(id)
        .ok_or_else(|| HandlerErr::not_found("student"))?;
    Ok(json!({ "student": to_json(&student)? }))
}

fn students_get_by_roll_no(
    svc: &AttendanceService,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let roll_no = required_str(params, "rollNo")?;
    let student = svc
        .students()
        .get_by_roll_no(roll_no.trim())
        .ok_or_else(|| HandlerErr::not_found("student"))?;
    Ok(json!({ "student": to_json(&student)? }))
}

fn students_create(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let input = student_input(params)?;
    let student_id = svc.create_student(&input)?;
    Ok(json!({ "studentId": student_id }))
}

fn students_update(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let id = required_id(params, "studentId")?;
    let input = student_input(params)?;
    svc.update_student(id, &input)?;
    Ok(json!({ "ok": true }))
}

fn students_delete(svc: &AttendanceService, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let id = required_id(params, "studentId")?;
    Ok(json!({ "deleted": svc.students().delete(id) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: HandlerFn = match req.method.as_str() {
        "students.list" => students_list,
        "students.search" => students_search,
        "students.byDepartment" => students_by_department,
        "students.bySemester" => students_by_semester,
        "students.get" => students_get,
        "students.getByRollNo" => students_get_by_roll_no,
        "students.create" => students_create,
        "students.update" => students_update,
        "students.delete" => students_delete,
        _ => return None,
    };
    Some(dispatch(state, req, f))
}
