use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

/// Application status persisted in the `applications` table.
///
/// `OFFERED` is only ever written by the database trigger that fires on
/// offer creation; the service itself never transitions applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Applied,
    Offered,
}

impl ApplicationStatus {
    /// Returns the canonical database representation for the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "APPLIED",
            Self::Offered => "OFFERED",
        }
    }

    /// Maps a raw database value onto the status, treating anything
    /// unrecognised as a plain application.
    pub fn from_db(value: &str) -> Self {
        match value {
            "OFFERED" => Self::Offered,
            _ => Self::Applied,
        }
    }
}

/// Offer status accepted by `POST /admin/offers` and stored verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
}

impl OfferStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Parses the client-supplied status string.
    pub fn parse(value: &str) -> Result<Self, InvalidOfferStatus> {
        match value {
            "PENDING" => Ok(Self::Pending),
            "ACCEPTED" => Ok(Self::Accepted),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(InvalidOfferStatus(other.to_string())),
        }
    }
}

/// Error raised for offer status values outside the known vocabulary.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("offer_status must be one of PENDING, ACCEPTED or REJECTED (got {0})")]
pub struct InvalidOfferStatus(pub String);

/// Verdict computed by the `check_student_eligibility` stored procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EligibilityStatus {
    #[serde(rename = "ELIGIBLE")]
    Eligible,
    #[serde(rename = "NOT ELIGIBLE")]
    NotEligible,
}

impl EligibilityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eligible => "ELIGIBLE",
            Self::NotEligible => "NOT ELIGIBLE",
        }
    }

    /// Maps the procedure's result column, defaulting to not eligible for
    /// anything unrecognised.
    pub fn from_db(value: &str) -> Self {
        match value {
            "ELIGIBLE" => Self::Eligible,
            _ => Self::NotEligible,
        }
    }
}

/// Student profile row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub student_id: i64,
    pub roll_no: String,
    pub name: String,
    pub email: String,
    pub department: String,
    pub cgpa: f64,
    pub graduation_year: i32,
}

/// Company row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub company_id: i64,
    pub company_name: String,
    pub location: String,
    pub package_lpa: f64,
}

/// Job role joined with its company, as served by `GET /jobs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct JobListing {
    pub job_id: i64,
    pub company_id: i64,
    pub role_name: String,
    pub min_cgpa: f64,
    pub eligible_branches: String,
    pub company_name: String,
    pub location: String,
    pub package_lpa: f64,
}

/// One application from the student's own history view, joined with the job
/// role and company it targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentApplication {
    pub application_id: i64,
    pub student_id: i64,
    pub job_id: i64,
    pub applied_date: NaiveDate,
    pub status: ApplicationStatus,
    pub role_name: String,
    pub company_name: String,
    pub package_lpa: f64,
}

/// One application from the admin listing, joined with the student, job role
/// and company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDetail {
    pub application_id: i64,
    pub student_id: i64,
    pub job_id: i64,
    pub applied_date: NaiveDate,
    pub status: ApplicationStatus,
    pub student_name: String,
    pub role_name: String,
    pub company_name: String,
}

/// Row returned by the `check_student_eligibility` stored procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityReport {
    pub student_id: i64,
    pub job_id: i64,
    pub role_name: String,
    pub company_name: String,
    pub cgpa: f64,
    pub min_cgpa: f64,
    pub status: EligibilityStatus,
}

/// Row of the `company_placement_stats` view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CompanyPlacementStats {
    pub company_id: i64,
    pub company_name: String,
    pub location: String,
    pub package_lpa: f64,
    pub total_roles: i64,
    pub total_offers: i64,
    pub accepted_offers: i64,
}

/// Row of the `student_placement_status` view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StudentPlacementStatus {
    pub student_id: i64,
    pub roll_no: String,
    pub name: String,
    pub department: String,
    pub cgpa: f64,
    pub placement_status: String,
    pub offers_received: i64,
    pub best_package_lpa: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn application_status_round_trips_database_strings() {
        assert_eq!(ApplicationStatus::Applied.as_str(), "APPLIED");
        assert_eq!(ApplicationStatus::Offered.as_str(), "OFFERED");
        assert_eq!(
            ApplicationStatus::from_db("OFFERED"),
            ApplicationStatus::Offered
        );
        // Unknown values fall back to the initial state.
        assert_eq!(
            ApplicationStatus::from_db("SHORTLISTED"),
            ApplicationStatus::Applied
        );
    }

    #[test]
    fn offer_status_rejects_unknown_values() {
        assert_eq!(OfferStatus::parse("ACCEPTED"), Ok(OfferStatus::Accepted));
        assert_eq!(OfferStatus::parse("PENDING"), Ok(OfferStatus::Pending));
        let err = OfferStatus::parse("accepted").unwrap_err();
        assert_eq!(err, InvalidOfferStatus("accepted".to_string()));
    }

    #[test]
    fn eligibility_status_serializes_with_a_space() {
        let value = serde_json::to_value(EligibilityStatus::NotEligible).expect("serialize");
        assert_eq!(value, json!("NOT ELIGIBLE"));
        assert_eq!(
            EligibilityStatus::from_db("ELIGIBLE"),
            EligibilityStatus::Eligible
        );
        assert_eq!(
            EligibilityStatus::from_db("anything else"),
            EligibilityStatus::NotEligible
        );
    }

    #[test]
    fn student_application_serializes_screaming_status() {
        let application = StudentApplication {
            application_id: 7,
            student_id: 1,
            job_id: 3,
            applied_date: NaiveDate::from_ymd_opt(2025, 6, 2).expect("valid date"),
            status: ApplicationStatus::Offered,
            role_name: "Backend Engineer".to_string(),
            company_name: "Initech".to_string(),
            package_lpa: 12.5,
        };

        let value = serde_json::to_value(&application).expect("serialize");
        assert_eq!(value["status"], json!("OFFERED"));
        assert_eq!(value["applied_date"], json!("2025-06-02"));
    }
}
