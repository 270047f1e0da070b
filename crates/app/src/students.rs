use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use metrics::counter;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use placement_core::{EligibilityReport, JobListing, Student, StudentApplication};

use crate::payload;
use crate::problem::ProblemResponse;
use crate::router::AppState;

#[derive(Debug, Deserialize)]
pub struct EligibilityQuery {
    #[serde(default)]
    student_id: Option<String>,
    #[serde(default)]
    job_id: Option<String>,
}

/// `GET /eligibility` — delegates the verdict to the
/// `check_student_eligibility` stored procedure.
pub async fn check_eligibility(
    State(state): State<AppState>,
    Query(query): Query<EligibilityQuery>,
) -> Result<Json<EligibilityReport>, ProblemResponse> {
    let (Some(student_raw), Some(job_raw)) = (query.student_id, query.job_id) else {
        return Err(ProblemResponse::validation(
            "student_id and job_id are required",
        ));
    };
    let (Ok(student_id), Ok(job_id)) = (student_raw.parse::<i64>(), job_raw.parse::<i64>()) else {
        return Err(ProblemResponse::validation(
            "student_id and job_id must be integers",
        ));
    };

    let report = state
        .storage()
        .placements()
        .check_eligibility(student_id, job_id)
        .await?
        .ok_or_else(|| ProblemResponse::not_found("No eligibility result found"))?;

    counter!("eligibility_checks_total", "verdict" => report.status.as_str()).increment(1);
    Ok(Json(report))
}

/// `POST /apply` — delegates validation and the insert to the
/// `apply_for_job` stored procedure.
pub async fn apply(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ProblemResponse> {
    let body = payload::parse(&body);
    let (Some(student_value), Some(job_value)) = (body.get("student_id"), body.get("job_id"))
    else {
        return Err(ProblemResponse::validation(
            "student_id and job_id are required",
        ));
    };
    let (Some(student_id), Some(job_id)) = (
        payload::as_integer(student_value),
        payload::as_integer(job_value),
    ) else {
        return Err(ProblemResponse::validation(
            "student_id and job_id must be integers",
        ));
    };

    state
        .storage()
        .placements()
        .apply_for_job(student_id, job_id)
        .await?;

    counter!("applications_submitted_total").increment(1);
    info!(stage = "apply", student_id, job_id, "application recorded");
    Ok(Json(json!({"message": "Application successful"})))
}

/// `GET /students/{id}` — student profile.
pub async fn profile(
    State(state): State<AppState>,
    Path(student_id): Path<i64>,
) -> Result<Json<Student>, ProblemResponse> {
    let student = state
        .storage()
        .students()
        .fetch(student_id)
        .await?
        .ok_or_else(|| ProblemResponse::not_found("Student not found"))?;

    Ok(Json(student))
}

/// `GET /applications/{id}` — the student's application history.
pub async fn applications(
    State(state): State<AppState>,
    Path(student_id): Path<i64>,
) -> Result<Json<Vec<StudentApplication>>, ProblemResponse> {
    let applications = state
        .storage()
        .applications()
        .for_student(student_id)
        .await?;

    Ok(Json(applications))
}

/// `GET /jobs` — every open job role with its company.
pub async fn jobs(
    State(state): State<AppState>,
) -> Result<Json<Vec<JobListing>>, ProblemResponse> {
    let jobs = state.storage().jobs().list_with_companies().await?;
    Ok(Json(jobs))
}
