use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn write_config(dir: &Path) -> PathBuf {
    let db_path = dir.join("data").join("attendance.sqlite3");
    let cfg = dir.join("config.properties");
    std::fs::write(
        &cfg,
        format!(
            "# smoke test\ndb.url=jdbc:sqlite:{}\ndb.username=registrar\ndb.password=secret\n",
            db_path.to_string_lossy()
        ),
    )
    .expect("write config");
    cfg
}

fn spawn_sidecar(config: &Path) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_attendanced");
    let mut child = Command::new(exe)
        .arg(config)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn attendanced");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or(serde_json::Value::Null)
}

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("attendanced-router-smoke");
    let cfg = write_config(&workspace);
    let csv_out = workspace.join("exports").join("overall.csv");

    let (mut child, mut stdin, mut reader) = spawn_sidecar(&cfg);

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["databaseReachable"], json!(true));
    assert!(health["startupError"].is_null());

    let student = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({
            "name": "Asha",
            "rollNo": "R1",
            "department": "CS",
            "semester": 3,
            "className": "A"
        }),
    );
    let student_id = student["studentId"].as_i64().expect("studentId");

    let subject = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "subjects.create",
        json!({ "subjectCode": "S3-01", "subjectName": "Math", "semester": 3 }),
    );
    let subject_id = subject["subjectId"].as_i64().expect("subjectId");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.mark",
        json!({
            "subjectId": subject_id,
            "date": "2024-01-10",
            "statuses": { student_id.to_string(): "Present" }
        }),
    );
    let pct = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "reports.percentage",
        json!({ "studentId": student_id, "subjectId": subject_id }),
    );
    assert_eq!(pct["percentage"].as_f64(), Some(100.0));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "attendance.update",
        json!({
            "studentId": student_id,
            "subjectId": subject_id,
            "date": "2024-01-10",
            "status": "Absent"
        }),
    );
    let records = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "attendance.forSubjectDate",
        json!({ "subjectId": subject_id, "date": "2024-01-10" }),
    );
    let records = records["records"].as_array().expect("records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], json!("Absent"));

    let stats = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "attendance.stats",
        json!({ "studentId": student_id }),
    );
    assert_eq!(stats["total"], json!(1));
    assert_eq!(stats["percentage"].as_f64(), Some(0.0));

    let report = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "reports.student",
        json!({ "studentId": student_id }),
    );
    assert_eq!(report["rows"].as_array().map(|r| r.len()), Some(1));

    let export = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "reports.exportCsv",
        json!({ "kind": "overall", "outPath": csv_out.to_string_lossy() }),
    );
    assert_eq!(export["rowCount"], json!(1));
    let text = std::fs::read_to_string(&csv_out).expect("read csv");
    assert!(text.starts_with("Overall Attendance Summary\n"), "{text}");
    assert!(text.contains("R1,Asha,CS,3,1,0,1,0.00%"), "{text}");

    for (id, method) in [
        ("11", "students.list"),
        ("12", "subjects.list"),
        ("13", "reports.overall"),
    ] {
        let _ = request_ok(&mut stdin, &mut reader, id, method, json!({}));
    }

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn errors_come_back_as_envelopes() {
    let workspace = temp_dir("attendanced-router-errors");
    let cfg = write_config(&workspace);
    let (mut child, mut stdin, mut reader) = spawn_sidecar(&cfg);

    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "students.create",
        json!({ "name": "Asha", "rollNo": "R1", "department": "CS", "semester": 9 }),
    );
    assert_eq!(error_code(&resp), Some("validation_failed"));
    assert_eq!(
        resp["error"]["message"],
        json!("Semester must be between 1 and 8")
    );

    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.update",
        json!({ "studentId": 1, "subjectId": 1, "date": "2024-01-10", "status": "Late" }),
    );
    assert_eq!(error_code(&resp), Some("validation_failed"));

    let resp = request(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.mark",
        json!({ "subjectId": 42, "date": "2024-01-10", "statuses": {} }),
    );
    assert_eq!(error_code(&resp), Some("not_found"));

    let resp = request(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.range",
        json!({ "startDate": "2024-02-01", "endDate": "2024-01-01" }),
    );
    assert_eq!(error_code(&resp), Some("bad_params"));

    let resp = request(&mut stdin, &mut reader, "5", "grades.compute", json!({}));
    assert_eq!(error_code(&resp), Some("not_implemented"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn missing_config_answers_no_database_until_loaded() {
    let workspace = temp_dir("attendanced-router-noconfig");
    let (mut child, mut stdin, mut reader) = spawn_sidecar(&workspace.join("absent.properties"));

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["databaseReachable"], json!(false));
    assert!(health["startupError"].is_string());

    let resp = request(&mut stdin, &mut reader, "2", "students.list", json!({}));
    assert_eq!(error_code(&resp), Some("no_database"));

    let cfg = write_config(&workspace);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "config.load",
        json!({ "path": cfg.to_string_lossy() }),
    );
    let list = request_ok(&mut stdin, &mut reader, "4", "students.list", json!({}));
    assert_eq!(list["students"], json!([]));

    drop(stdin);
    let _ = child.wait();
}
