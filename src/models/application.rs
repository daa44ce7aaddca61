use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::{job::JobResponse, user::UserSummary, Ref};

#[derive(Debug, Clone, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub candidate_id: Uuid,
    pub resume: String,
    pub cover_letter: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

/// Any status may follow any other; there is no transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "application_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Reviewing,
    Rejected,
    Interview,
    Hired,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Reviewing => "reviewing",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Hired => "hired",
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApplicationStatus::Pending),
            "reviewing" => Ok(ApplicationStatus::Reviewing),
            "rejected" => Ok(ApplicationStatus::Rejected),
            "interview" => Ok(ApplicationStatus::Interview),
            "hired" => Ok(ApplicationStatus::Hired),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub job_id: Uuid,
    pub candidate_id: Uuid,
    pub resume: String,
    pub cover_letter: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationRequest {
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Resume is required"))]
    pub resume: String,
    pub cover_letter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

/// Raw query string of `GET /api/applications`.
#[derive(Debug, Default, Deserialize)]
pub struct ApplicationQuery {
    pub job: Option<String>,
    pub status: Option<String>,
}

/// Selection for listing applications. Results are always newest first.
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub candidate: Option<Uuid>,
    /// Restricts to applications whose job is in this set.
    pub jobs: Option<Vec<Uuid>>,
    pub status: Option<ApplicationStatus>,
}

impl ApplicationFilter {
    pub fn matches(&self, application: &Application) -> bool {
        if let Some(candidate) = self.candidate {
            if application.candidate_id != candidate {
                return false;
            }
        }
        if let Some(jobs) = &self.jobs {
            if !jobs.contains(&application.job_id) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if application.status != status {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub job: Ref<JobResponse>,
    pub candidate: Ref<UserSummary>,
    pub resume: String,
    pub cover_letter: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

impl ApplicationResponse {
    pub fn populated(
        application: Application,
        job: Option<JobResponse>,
        candidate: Option<UserSummary>,
    ) -> Self {
        let mut response = Self::from(application);
        if let Some(job) = job {
            response.job = Ref::Populated(job);
        }
        if let Some(candidate) = candidate {
            response.candidate = Ref::Populated(candidate);
        }
        response
    }
}

impl From<Application> for ApplicationResponse {
    fn from(app: Application) -> Self {
        Self {
            id: app.id,
            job: Ref::Id(app.job_id),
            candidate: Ref::Id(app.candidate_id),
            resume: app.resume,
            cover_letter: app.cover_letter,
            status: app.status,
            created_at: app.created_at,
        }
    }
}
