use chrono::NaiveDate;
use sqlx::{migrate::MigrateError, mysql::MySqlPoolOptions, MySqlPool};
use thiserror::Error;

use placement_core::{
    ApplicationDetail, ApplicationStatus, Company, CompanyPlacementStats, EligibilityReport,
    EligibilityStatus, JobListing, OfferStatus, Student, StudentApplication,
    StudentPlacementStatus,
};

const POOL_MAX_CONNECTIONS: u32 = 5;

/// Top-level database handle that owns the MySQL connection pool.
#[derive(Clone)]
pub struct Database {
    pool: MySqlPool,
}

impl Database {
    /// Establishes a new MySQL connection pool for the provided connection string.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(POOL_MAX_CONNECTIONS)
            .connect(database_url)
            .await
            .map_err(StorageError::Connect)?;

        Ok(Self { pool })
    }

    /// Builds the pool without dialing the server; connections are opened on
    /// first use. Handler tests rely on this to exercise request validation
    /// without a running MySQL instance.
    pub fn connect_lazy(database_url: &str) -> Result<Self, StorageError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(POOL_MAX_CONNECTIONS)
            .connect_lazy(database_url)
            .map_err(StorageError::Connect)?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle for operating on students.
    pub fn students(&self) -> StudentRepository {
        StudentRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for operating on companies.
    pub fn companies(&self) -> CompanyRepository {
        CompanyRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for operating on job roles.
    pub fn jobs(&self) -> JobRepository {
        JobRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for reading applications.
    pub fn applications(&self) -> ApplicationRepository {
        ApplicationRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for creating offers.
    pub fn offers(&self) -> OfferRepository {
        OfferRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for the placement procedures and reporting views.
    pub fn placements(&self) -> PlacementRepository {
        PlacementRepository {
            pool: self.pool.clone(),
        }
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to mysql: {0}")]
    Connect(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    /// Message surfaced to API clients. Database-raised failures (constraint
    /// violations, SIGNALs from stored procedures) keep the engine's own
    /// wording, matching the uniform error contract.
    pub fn detail(&self) -> String {
        match self {
            Self::Database(sqlx::Error::Database(db_err)) => db_err.message().to_string(),
            other => other.to_string(),
        }
    }
}

/// Data required to insert a student row.
pub struct NewStudent<'a> {
    pub roll_no: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub department: &'a str,
    pub cgpa: f64,
    pub graduation_year: i32,
}

/// Partial update payload for a student row. `None` fields are left untouched.
#[derive(Debug, Default)]
pub struct StudentUpdate {
    pub roll_no: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub cgpa: Option<f64>,
    pub graduation_year: Option<i32>,
}

impl StudentUpdate {
    pub fn is_empty(&self) -> bool {
        self.roll_no.is_none()
            && self.name.is_none()
            && self.email.is_none()
            && self.department.is_none()
            && self.cgpa.is_none()
            && self.graduation_year.is_none()
    }
}

/// Result of attempting a partial student update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentUpdateOutcome {
    Updated,
    NoFields,
    NotFound,
}

/// Repository for the `students` table.
#[derive(Clone)]
pub struct StudentRepository {
    pool: MySqlPool,
}

impl StudentRepository {
    /// Lists every student, newest first.
    pub async fn list(&self) -> Result<Vec<Student>, StorageError> {
        let rows = sqlx::query_as::<_, Student>(
            "SELECT student_id, roll_no, name, email, department, cgpa, graduation_year \
             FROM students ORDER BY student_id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Fetches a single student profile.
    pub async fn fetch(&self, student_id: i64) -> Result<Option<Student>, StorageError> {
        let row = sqlx::query_as::<_, Student>(
            "SELECT student_id, roll_no, name, email, department, cgpa, graduation_year \
             FROM students WHERE student_id = ?",
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Inserts a new student and returns the generated id.
    pub async fn insert(&self, student: NewStudent<'_>) -> Result<i64, StorageError> {
        let result = sqlx::query(
            "INSERT INTO students (roll_no, name, email, department, cgpa, graduation_year) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(student.roll_no)
        .bind(student.name)
        .bind(student.email)
        .bind(student.department)
        .bind(student.cgpa)
        .bind(student.graduation_year)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_id() as i64)
    }

    /// Applies a partial update, building the SET clause from the fields
    /// actually present.
    pub async fn update(
        &self,
        student_id: i64,
        update: &StudentUpdate,
    ) -> Result<StudentUpdateOutcome, StorageError> {
        if update.is_empty() {
            return Ok(StudentUpdateOutcome::NoFields);
        }

        let mut assignments = Vec::new();
        if update.roll_no.is_some() {
            assignments.push("roll_no = ?");
        }
        if update.name.is_some() {
            assignments.push("name = ?");
        }
        if update.email.is_some() {
            assignments.push("email = ?");
        }
        if update.department.is_some() {
            assignments.push("department = ?");
        }
        if update.cgpa.is_some() {
            assignments.push("cgpa = ?");
        }
        if update.graduation_year.is_some() {
            assignments.push("graduation_year = ?");
        }

        let sql = format!(
            "UPDATE students SET {} WHERE student_id = ?",
            assignments.join(", ")
        );

        let mut query = sqlx::query(&sql);
        if let Some(roll_no) = &update.roll_no {
            query = query.bind(roll_no);
        }
        if let Some(name) = &update.name {
            query = query.bind(name);
        }
        if let Some(email) = &update.email {
            query = query.bind(email);
        }
        if let Some(department) = &update.department {
            query = query.bind(department);
        }
        if let Some(cgpa) = update.cgpa {
            query = query.bind(cgpa);
        }
        if let Some(graduation_year) = update.graduation_year {
            query = query.bind(graduation_year);
        }

        let result = query.bind(student_id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Ok(StudentUpdateOutcome::NotFound);
        }

        Ok(StudentUpdateOutcome::Updated)
    }

    /// Deletes a student, reporting whether a row was removed.
    pub async fn delete(&self, student_id: i64) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM students WHERE student_id = ?")
            .bind(student_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Data required to insert a company row.
pub struct NewCompany<'a> {
    pub company_name: &'a str,
    pub location: &'a str,
    pub package_lpa: f64,
}

/// Repository for the `companies` table.
#[derive(Clone)]
pub struct CompanyRepository {
    pool: MySqlPool,
}

impl CompanyRepository {
    /// Lists every company, newest first.
    pub async fn list(&self) -> Result<Vec<Company>, StorageError> {
        let rows = sqlx::query_as::<_, Company>(
            "SELECT company_id, company_name, location, package_lpa \
             FROM companies ORDER BY company_id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Inserts a new company and returns the generated id.
    pub async fn insert(&self, company: NewCompany<'_>) -> Result<i64, StorageError> {
        let result = sqlx::query(
            "INSERT INTO companies (company_name, location, package_lpa) VALUES (?, ?, ?)",
        )
        .bind(company.company_name)
        .bind(company.location)
        .bind(company.package_lpa)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_id() as i64)
    }

    /// Deletes a company, reporting whether a row was removed. Job roles and
    /// their applications cascade away with it.
    pub async fn delete(&self, company_id: i64) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM companies WHERE company_id = ?")
            .bind(company_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Data required to insert a job role row.
pub struct NewJobRole<'a> {
    pub company_id: i64,
    pub role_name: &'a str,
    pub min_cgpa: f64,
    pub eligible_branches: &'a str,
}

/// Repository for the `job_roles` table.
#[derive(Clone)]
pub struct JobRepository {
    pool: MySqlPool,
}

impl JobRepository {
    /// Lists every job role joined with its company.
    pub async fn list_with_companies(&self) -> Result<Vec<JobListing>, StorageError> {
        let rows = sqlx::query_as::<_, JobListing>(
            "SELECT j.job_id, j.company_id, j.role_name, j.min_cgpa, j.eligible_branches, \
                    c.company_name, c.location, c.package_lpa \
               FROM job_roles j \
               JOIN companies c ON c.company_id = j.company_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Inserts a new job role and returns the generated id.
    pub async fn insert(&self, job: NewJobRole<'_>) -> Result<i64, StorageError> {
        let result = sqlx::query(
            "INSERT INTO job_roles (company_id, role_name, min_cgpa, eligible_branches) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(job.company_id)
        .bind(job.role_name)
        .bind(job.min_cgpa)
        .bind(job.eligible_branches)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_id() as i64)
    }

    /// Deletes a job role, reporting whether a row was removed.
    pub async fn delete(&self, job_id: i64) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM job_roles WHERE job_id = ?")
            .bind(job_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Row shape for the student-facing application history query.
#[derive(Debug, sqlx::FromRow)]
struct StudentApplicationRow {
    application_id: i64,
    student_id: i64,
    job_id: i64,
    applied_date: NaiveDate,
    status: String,
    role_name: String,
    company_name: String,
    package_lpa: f64,
}

impl StudentApplicationRow {
    fn into_domain(self) -> StudentApplication {
        StudentApplication {
            application_id: self.application_id,
            student_id: self.student_id,
            job_id: self.job_id,
            applied_date: self.applied_date,
            status: ApplicationStatus::from_db(&self.status),
            role_name: self.role_name,
            company_name: self.company_name,
            package_lpa: self.package_lpa,
        }
    }
}

/// Row shape for the admin application listing.
#[derive(Debug, sqlx::FromRow)]
struct ApplicationDetailRow {
    application_id: i64,
    student_id: i64,
    job_id: i64,
    applied_date: NaiveDate,
    status: String,
    student_name: String,
    role_name: String,
    company_name: String,
}

impl ApplicationDetailRow {
    fn into_domain(self) -> ApplicationDetail {
        ApplicationDetail {
            application_id: self.application_id,
            student_id: self.student_id,
            job_id: self.job_id,
            applied_date: self.applied_date,
            status: ApplicationStatus::from_db(&self.status),
            student_name: self.student_name,
            role_name: self.role_name,
            company_name: self.company_name,
        }
    }
}

/// Repository for reading the `applications` table. Writes happen inside the
/// `apply_for_job` procedure and the offer trigger, never here.
#[derive(Clone)]
pub struct ApplicationRepository {
    pool: MySqlPool,
}

impl ApplicationRepository {
    /// Lists one student's applications joined with role and company,
    /// newest first.
    pub async fn for_student(
        &self,
        student_id: i64,
    ) -> Result<Vec<StudentApplication>, StorageError> {
        let rows = sqlx::query_as::<_, StudentApplicationRow>(
            "SELECT a.application_id, a.student_id, a.job_id, a.applied_date, a.status, \
                    j.role_name, c.company_name, c.package_lpa \
               FROM applications a \
               JOIN job_roles j ON a.job_id = j.job_id \
               JOIN companies c ON j.company_id = c.company_id \
              WHERE a.student_id = ? \
              ORDER BY a.applied_date DESC",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StudentApplicationRow::into_domain).collect())
    }

    /// Lists every application joined with student, role and company,
    /// newest first.
    pub async fn list_all(&self) -> Result<Vec<ApplicationDetail>, StorageError> {
        let rows = sqlx::query_as::<_, ApplicationDetailRow>(
            "SELECT a.application_id, a.student_id, a.job_id, a.applied_date, a.status, \
                    s.name AS student_name, j.role_name, c.company_name \
               FROM applications a \
               JOIN students s ON a.student_id = s.student_id \
               JOIN job_roles j ON a.job_id = j.job_id \
               JOIN companies c ON j.company_id = c.company_id \
              ORDER BY a.applied_date DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ApplicationDetailRow::into_domain).collect())
    }
}

/// Data required to insert an offer. The offer date is the database's
/// current date; the AFTER INSERT trigger flips the matching application
/// to OFFERED.
pub struct NewOffer {
    pub student_id: i64,
    pub job_id: i64,
    pub status: OfferStatus,
}

/// Repository for the `offers` table.
#[derive(Clone)]
pub struct OfferRepository {
    pool: MySqlPool,
}

impl OfferRepository {
    /// Inserts a new offer and returns the generated id.
    pub async fn insert(&self, offer: NewOffer) -> Result<i64, StorageError> {
        let result = sqlx::query(
            "INSERT INTO offers (student_id, job_id, offer_date, offer_status) \
             VALUES (?, ?, CURDATE(), ?)",
        )
        .bind(offer.student_id)
        .bind(offer.job_id)
        .bind(offer.status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_id() as i64)
    }
}

/// Row shape returned by `check_student_eligibility`.
#[derive(Debug, sqlx::FromRow)]
struct EligibilityRow {
    student_id: i64,
    job_id: i64,
    role_name: String,
    company_name: String,
    cgpa: f64,
    min_cgpa: f64,
    status: String,
}

impl EligibilityRow {
    fn into_domain(self) -> EligibilityReport {
        EligibilityReport {
            student_id: self.student_id,
            job_id: self.job_id,
            role_name: self.role_name,
            company_name: self.company_name,
            cgpa: self.cgpa,
            min_cgpa: self.min_cgpa,
            status: EligibilityStatus::from_db(&self.status),
        }
    }
}

/// Repository wrapping the placement stored procedures and reporting views.
#[derive(Clone)]
pub struct PlacementRepository {
    pool: MySqlPool,
}

impl PlacementRepository {
    /// Calls `check_student_eligibility`. `None` means the student or job
    /// does not exist.
    pub async fn check_eligibility(
        &self,
        student_id: i64,
        job_id: i64,
    ) -> Result<Option<EligibilityReport>, StorageError> {
        let row = sqlx::query_as::<_, EligibilityRow>("CALL check_student_eligibility(?, ?)")
            .bind(student_id)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(EligibilityRow::into_domain))
    }

    /// Calls `apply_for_job`. Eligibility failures and duplicate
    /// applications surface as database errors raised by the procedure.
    pub async fn apply_for_job(&self, student_id: i64, job_id: i64) -> Result<(), StorageError> {
        sqlx::query("CALL apply_for_job(?, ?)")
            .bind(student_id)
            .bind(job_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Reads the `company_placement_stats` view.
    pub async fn company_stats(&self) -> Result<Vec<CompanyPlacementStats>, StorageError> {
        let rows = sqlx::query_as::<_, CompanyPlacementStats>(
            "SELECT company_id, company_name, location, package_lpa, \
                    total_roles, total_offers, accepted_offers \
             FROM company_placement_stats",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Reads the `student_placement_status` view.
    pub async fn student_placements(&self) -> Result<Vec<StudentPlacementStatus>, StorageError> {
        let rows = sqlx::query_as::<_, StudentPlacementStatus>(
            "SELECT student_id, roll_no, name, department, cgpa, \
                    placement_status, offers_received, best_package_lpa \
             FROM student_placement_status",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests need a disposable MySQL instance; point TEST_DATABASE_URL
    // at one to run them. Without it they skip so the suite stays green in
    // environments that have no database server.
    async fn test_db() -> Option<Database> {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set; skipping database test");
            return None;
        };
        let db = Database::connect(&url).await.expect("connect");
        db.run_migrations().await.expect("migrations");
        Some(db)
    }

    #[tokio::test]
    async fn insert_student_returns_generated_id() {
        let Some(db) = test_db().await else { return };
        let repo = db.students();

        let id = repo
            .insert(NewStudent {
                roll_no: "ST-INS-1",
                name: "Asha Rao",
                email: "asha.rao@campus.example",
                department: "CSE",
                cgpa: 8.4,
                graduation_year: 2026,
            })
            .await
            .expect("insert student");
        assert!(id > 0);

        let student = repo
            .fetch(id)
            .await
            .expect("fetch student")
            .expect("student exists");
        assert_eq!(student.roll_no, "ST-INS-1");
        assert_eq!(student.graduation_year, 2026);

        assert!(repo.delete(id).await.expect("delete student"));
    }

    #[tokio::test]
    async fn update_with_no_fields_reports_no_fields() {
        let Some(db) = test_db().await else { return };
        let repo = db.students();

        let outcome = repo
            .update(1, &StudentUpdate::default())
            .await
            .expect("update");
        assert_eq!(outcome, StudentUpdateOutcome::NoFields);
    }

    #[tokio::test]
    async fn delete_of_missing_student_reports_false() {
        let Some(db) = test_db().await else { return };
        let deleted = db.students().delete(i64::MAX).await.expect("delete");
        assert!(!deleted);
    }

    #[tokio::test]
    async fn placement_flow_applies_and_flips_status_on_offer() {
        let Some(db) = test_db().await else { return };

        let student_id = db
            .students()
            .insert(NewStudent {
                roll_no: "ST-FLOW-1",
                name: "Nilay Shah",
                email: "nilay.shah@campus.example",
                department: "IT",
                cgpa: 9.1,
                graduation_year: 2026,
            })
            .await
            .expect("insert student");
        let company_id = db
            .companies()
            .insert(NewCompany {
                company_name: "Globex Flow",
                location: "Pune",
                package_lpa: 14.0,
            })
            .await
            .expect("insert company");
        let job_id = db
            .jobs()
            .insert(NewJobRole {
                company_id,
                role_name: "Platform Engineer",
                min_cgpa: 8.0,
                eligible_branches: "CSE, IT",
            })
            .await
            .expect("insert job");

        let report = db
            .placements()
            .check_eligibility(student_id, job_id)
            .await
            .expect("eligibility call")
            .expect("eligibility row");
        assert_eq!(report.status, EligibilityStatus::Eligible);

        db.placements()
            .apply_for_job(student_id, job_id)
            .await
            .expect("apply");

        let applications = db
            .applications()
            .for_student(student_id)
            .await
            .expect("list applications");
        assert_eq!(applications.len(), 1);
        assert_eq!(applications[0].status, ApplicationStatus::Applied);

        // A second application hits the unique key and is refused by the DB.
        assert!(db
            .placements()
            .apply_for_job(student_id, job_id)
            .await
            .is_err());

        let offer_id = db
            .offers()
            .insert(NewOffer {
                student_id,
                job_id,
                status: OfferStatus::Accepted,
            })
            .await
            .expect("insert offer");
        assert!(offer_id > 0);

        let applications = db
            .applications()
            .for_student(student_id)
            .await
            .expect("list applications");
        assert_eq!(applications[0].status, ApplicationStatus::Offered);

        let placements = db
            .placements()
            .student_placements()
            .await
            .expect("placement view");
        let row = placements
            .iter()
            .find(|row| row.student_id == student_id)
            .expect("student appears in view");
        assert_eq!(row.placement_status, "PLACED");
        assert_eq!(row.offers_received, 1);

        // Cleanup cascades through job roles, applications and offers.
        assert!(db.companies().delete(company_id).await.expect("delete company"));
        assert!(db.students().delete(student_id).await.expect("delete student"));
    }

    #[tokio::test]
    async fn ineligible_student_is_refused_by_the_procedure() {
        let Some(db) = test_db().await else { return };

        let student_id = db
            .students()
            .insert(NewStudent {
                roll_no: "ST-LOW-1",
                name: "Ravi Menon",
                email: "ravi.menon@campus.example",
                department: "MECH",
                cgpa: 6.2,
                graduation_year: 2025,
            })
            .await
            .expect("insert student");
        let company_id = db
            .companies()
            .insert(NewCompany {
                company_name: "Initech Labs",
                location: "Bengaluru",
                package_lpa: 21.0,
            })
            .await
            .expect("insert company");
        let job_id = db
            .jobs()
            .insert(NewJobRole {
                company_id,
                role_name: "Compiler Engineer",
                min_cgpa: 8.5,
                eligible_branches: "CSE",
            })
            .await
            .expect("insert job");

        let report = db
            .placements()
            .check_eligibility(student_id, job_id)
            .await
            .expect("eligibility call")
            .expect("eligibility row");
        assert_eq!(report.status, EligibilityStatus::NotEligible);

        let err = db
            .placements()
            .apply_for_job(student_id, job_id)
            .await
            .expect_err("procedure refuses ineligible student");
        assert!(err.detail().contains("not eligible"));

        assert!(db.companies().delete(company_id).await.expect("delete company"));
        assert!(db.students().delete(student_id).await.expect("delete student"));
    }
}
