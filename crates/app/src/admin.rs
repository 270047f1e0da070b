use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use metrics::counter;
use serde_json::{json, Value};
use tracing::info;

use placement_core::{
    ApplicationDetail, Company, CompanyPlacementStats, OfferStatus, Student,
    StudentPlacementStatus,
};
use placement_storage::{
    NewCompany, NewJobRole, NewOffer, NewStudent, StudentUpdate, StudentUpdateOutcome,
};

use crate::payload;
use crate::problem::ProblemResponse;
use crate::router::AppState;

fn graduation_year(value: i64) -> Result<i32, ProblemResponse> {
    i32::try_from(value)
        .map_err(|_| ProblemResponse::validation("graduation_year must be an integer"))
}

/// `GET /admin/students`
pub async fn list_students(
    State(state): State<AppState>,
) -> Result<Json<Vec<Student>>, ProblemResponse> {
    let students = state.storage().students().list().await?;
    Ok(Json(students))
}

/// `POST /admin/students`
pub async fn create_student(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ProblemResponse> {
    let body = payload::parse(&body);
    let roll_no = payload::require_string(&body, "roll_no")?;
    let name = payload::require_string(&body, "name")?;
    let email = payload::require_string(&body, "email")?;
    let department = payload::require_string(&body, "department")?;
    let cgpa = payload::require_number(&body, "cgpa")?;
    let graduation_year = graduation_year(payload::require_integer(&body, "graduation_year")?)?;

    let student_id = state
        .storage()
        .students()
        .insert(NewStudent {
            roll_no: &roll_no,
            name: &name,
            email: &email,
            department: &department,
            cgpa,
            graduation_year,
        })
        .await?;

    counter!("admin_mutations_total", "entity" => "student", "op" => "create").increment(1);
    info!(stage = "admin", student_id, "student created");
    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "Student created successfully", "student_id": student_id})),
    ))
}

/// `PUT /admin/students/{id}` — partial update over the allowed field set.
pub async fn update_student(
    State(state): State<AppState>,
    Path(student_id): Path<i64>,
    body: Bytes,
) -> Result<Json<Value>, ProblemResponse> {
    let body = payload::parse(&body);
    let update = StudentUpdate {
        roll_no: payload::optional_string(&body, "roll_no")?,
        name: payload::optional_string(&body, "name")?,
        email: payload::optional_string(&body, "email")?,
        department: payload::optional_string(&body, "department")?,
        cgpa: payload::optional_number(&body, "cgpa")?,
        graduation_year: payload::optional_integer(&body, "graduation_year")?
            .map(graduation_year)
            .transpose()?,
    };

    match state.storage().students().update(student_id, &update).await? {
        StudentUpdateOutcome::NoFields => {
            Err(ProblemResponse::validation("No fields to update"))
        }
        StudentUpdateOutcome::NotFound => Err(ProblemResponse::not_found("Student not found")),
        StudentUpdateOutcome::Updated => {
            counter!("admin_mutations_total", "entity" => "student", "op" => "update")
                .increment(1);
            Ok(Json(json!({"message": "Student updated successfully"})))
        }
    }
}

/// `DELETE /admin/students/{id}`
pub async fn delete_student(
    State(state): State<AppState>,
    Path(student_id): Path<i64>,
) -> Result<Json<Value>, ProblemResponse> {
    if !state.storage().students().delete(student_id).await? {
        return Err(ProblemResponse::not_found("Student not found"));
    }

    counter!("admin_mutations_total", "entity" => "student", "op" => "delete").increment(1);
    Ok(Json(json!({"message": "Student deleted successfully"})))
}

/// `GET /admin/companies`
pub async fn list_companies(
    State(state): State<AppState>,
) -> Result<Json<Vec<Company>>, ProblemResponse> {
    let companies = state.storage().companies().list().await?;
    Ok(Json(companies))
}

/// `POST /admin/companies`
pub async fn create_company(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ProblemResponse> {
    let body = payload::parse(&body);
    let company_name = payload::require_string(&body, "company_name")?;
    let location = payload::require_string(&body, "location")?;
    let package_lpa = payload::require_number(&body, "package_lpa")?;

    let company_id = state
        .storage()
        .companies()
        .insert(NewCompany {
            company_name: &company_name,
            location: &location,
            package_lpa,
        })
        .await?;

    counter!("admin_mutations_total", "entity" => "company", "op" => "create").increment(1);
    info!(stage = "admin", company_id, "company created");
    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "Company created successfully", "company_id": company_id})),
    ))
}

/// `DELETE /admin/companies/{id}`
pub async fn delete_company(
    State(state): State<AppState>,
    Path(company_id): Path<i64>,
) -> Result<Json<Value>, ProblemResponse> {
    if !state.storage().companies().delete(company_id).await? {
        return Err(ProblemResponse::not_found("Company not found"));
    }

    counter!("admin_mutations_total", "entity" => "company", "op" => "delete").increment(1);
    Ok(Json(json!({"message": "Company deleted successfully"})))
}

/// `POST /admin/jobs`
pub async fn create_job(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ProblemResponse> {
    let body = payload::parse(&body);
    let company_id = payload::require_integer(&body, "company_id")?;
    let role_name = payload::require_string(&body, "role_name")?;
    let min_cgpa = payload::require_number(&body, "min_cgpa")?;
    let eligible_branches = payload::require_string(&body, "eligible_branches")?;

    let job_id = state
        .storage()
        .jobs()
        .insert(NewJobRole {
            company_id,
            role_name: &role_name,
            min_cgpa,
            eligible_branches: &eligible_branches,
        })
        .await?;

    counter!("admin_mutations_total", "entity" => "job", "op" => "create").increment(1);
    info!(stage = "admin", job_id, "job role created");
    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "Job role created successfully", "job_id": job_id})),
    ))
}

/// `DELETE /admin/jobs/{id}`
pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
) -> Result<Json<Value>, ProblemResponse> {
    if !state.storage().jobs().delete(job_id).await? {
        return Err(ProblemResponse::not_found("Job not found"));
    }

    counter!("admin_mutations_total", "entity" => "job", "op" => "delete").increment(1);
    Ok(Json(json!({"message": "Job deleted successfully"})))
}

/// `POST /admin/offers` — the AFTER INSERT trigger flips the matching
/// application to OFFERED; the handler only performs the insert.
pub async fn create_offer(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ProblemResponse> {
    let body = payload::parse(&body);
    let student_id = payload::require_integer(&body, "student_id")?;
    let job_id = payload::require_integer(&body, "job_id")?;
    let raw_status = payload::require_string(&body, "offer_status")?;
    let status = OfferStatus::parse(&raw_status)
        .map_err(|err| ProblemResponse::validation(err.to_string()))?;

    let offer_id = state
        .storage()
        .offers()
        .insert(NewOffer {
            student_id,
            job_id,
            status,
        })
        .await?;

    counter!("offers_created_total", "status" => status.as_str()).increment(1);
    info!(stage = "admin", offer_id, student_id, job_id, "offer created");
    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "Offer created successfully", "offer_id": offer_id})),
    ))
}

/// `GET /admin/applications`
pub async fn list_applications(
    State(state): State<AppState>,
) -> Result<Json<Vec<ApplicationDetail>>, ProblemResponse> {
    let applications = state.storage().applications().list_all().await?;
    Ok(Json(applications))
}

/// `GET /admin/stats/placement`
pub async fn placement_stats(
    State(state): State<AppState>,
) -> Result<Json<Vec<CompanyPlacementStats>>, ProblemResponse> {
    let stats = state.storage().placements().company_stats().await?;
    Ok(Json(stats))
}

/// `GET /admin/stats/student-placements`
pub async fn student_placements(
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentPlacementStatus>>, ProblemResponse> {
    let placements = state.storage().placements().student_placements().await?;
    Ok(Json(placements))
}
