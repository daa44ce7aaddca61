use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use super::{parse_body, parse_id, JsonBody, QueryParams};
use crate::{
    middleware::auth::AuthUser,
    models::{
        application::{
            Application, ApplicationFilter, ApplicationQuery, ApplicationResponse,
            ApplicationStatus, CreateApplicationRequest, NewApplication, UpdateStatusRequest,
        },
        job::{Job, JobFilter, JobResponse},
        user::UserSummary,
    },
    store::StoreError,
    utils::{
        errors::AppError,
        logger::{event_meta, LOGGER},
    },
    AppState,
};

fn already_applied() -> AppError {
    AppError::BadRequest("You have already applied for this job".to_string())
}

fn application_not_found() -> AppError {
    AppError::NotFound("Application not found".to_string())
}

pub async fn create_application(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Json<ApplicationResponse>), AppError> {
    if !auth_user.is_candidate() {
        return Err(AppError::Forbidden(
            "Only candidates can apply for jobs".to_string(),
        ));
    }

    let payload: CreateApplicationRequest = parse_body(body)?;
    payload.validate()?;

    let job_id = parse_id(&payload.job_id).ok_or_else(AppError::job_not_found)?;
    let job = state
        .store
        .find_job(job_id)
        .await?
        .ok_or_else(AppError::job_not_found)?;

    if state
        .store
        .find_application_for(job.id, auth_user.id)
        .await?
        .is_some()
    {
        return Err(already_applied());
    }

    let application = state
        .store
        .insert_application(NewApplication {
            job_id: job.id,
            candidate_id: auth_user.id,
            resume: payload.resume,
            cover_letter: payload.cover_letter.filter(|letter| !letter.trim().is_empty()),
        })
        .await
        .map_err(|e| match e {
            // lost the race against a concurrent submission
            StoreError::Conflict(_) => already_applied(),
            other => other.into(),
        })?;

    LOGGER.log_business_event(
        "application_submitted",
        Some(auth_user.id),
        event_meta([
            ("application_id", json!(application.id)),
            ("job_id", json!(job.id)),
        ]),
    );

    Ok((StatusCode::CREATED, Json(ApplicationResponse::from(application))))
}

pub async fn list_applications(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    QueryParams(query): QueryParams<ApplicationQuery>,
) -> Result<Json<Vec<ApplicationResponse>>, AppError> {
    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            raw.parse::<ApplicationStatus>()
                .map_err(|_| AppError::BadRequest("Invalid status".to_string()))?,
        ),
        None => None,
    };
    let job_filter = match query.job.as_deref().filter(|j| !j.is_empty()) {
        Some(raw) => match parse_id(raw) {
            Some(id) => Some(id),
            None => return Ok(Json(Vec::new())),
        },
        None => None,
    };

    if auth_user.is_admin() {
        list_for_admin(&state, &auth_user, job_filter, status).await
    } else {
        list_for_candidate(&state, &auth_user, job_filter, status).await
    }
}

/// Applications to the caller's own postings, with job and candidate populated.
async fn list_for_admin(
    state: &AppState,
    auth_user: &AuthUser,
    job_filter: Option<Uuid>,
    status: Option<ApplicationStatus>,
) -> Result<Json<Vec<ApplicationResponse>>, AppError> {
    let posted = state
        .store
        .list_jobs(&JobFilter {
            posted_by: Some(auth_user.id),
            ..Default::default()
        })
        .await?;
    let jobs: HashMap<Uuid, Job> = posted
        .into_iter()
        .filter(|job| job_filter.map_or(true, |id| job.id == id))
        .map(|job| (job.id, job))
        .collect();

    let applications = state
        .store
        .list_applications(&ApplicationFilter {
            jobs: Some(jobs.keys().copied().collect()),
            status,
            ..Default::default()
        })
        .await?;

    let candidate_ids = unique(applications.iter().map(|a| a.candidate_id));
    let candidates: HashMap<Uuid, UserSummary> = state
        .store
        .find_users(&candidate_ids)
        .await?
        .iter()
        .map(|user| (user.id, UserSummary::contact(user)))
        .collect();

    let responses = applications
        .into_iter()
        .map(|application| {
            let job = jobs.get(&application.job_id).cloned().map(JobResponse::from);
            let candidate = candidates.get(&application.candidate_id).cloned();
            ApplicationResponse::populated(application, job, candidate)
        })
        .collect();

    Ok(Json(responses))
}

/// The caller's own applications, with the job populated.
async fn list_for_candidate(
    state: &AppState,
    auth_user: &AuthUser,
    job_filter: Option<Uuid>,
    status: Option<ApplicationStatus>,
) -> Result<Json<Vec<ApplicationResponse>>, AppError> {
    let applications = state
        .store
        .list_applications(&ApplicationFilter {
            candidate: Some(auth_user.id),
            jobs: job_filter.map(|id| vec![id]),
            status,
        })
        .await?;

    let job_ids = unique(applications.iter().map(|a| a.job_id));
    let jobs: HashMap<Uuid, Job> = state
        .store
        .find_jobs(&job_ids)
        .await?
        .into_iter()
        .map(|job| (job.id, job))
        .collect();

    let responses = applications
        .into_iter()
        .map(|application| {
            let job = jobs.get(&application.job_id).cloned().map(JobResponse::from);
            ApplicationResponse::populated(application, job, None)
        })
        .collect();

    Ok(Json(responses))
}

fn unique(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = ids.collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<Json<ApplicationResponse>, AppError> {
    let payload: UpdateStatusRequest = parse_body(body)?;
    let status = payload
        .status
        .as_deref()
        .and_then(|raw| raw.parse::<ApplicationStatus>().ok())
        .ok_or_else(|| AppError::BadRequest("Invalid status".to_string()))?;

    let id = parse_id(&id).ok_or_else(application_not_found)?;
    let application: Application = state
        .store
        .find_application(id)
        .await?
        .ok_or_else(application_not_found)?;

    let job = state
        .store
        .find_job(application.job_id)
        .await?
        .filter(|job| job.posted_by == auth_user.id)
        .ok_or_else(|| {
            AppError::Forbidden("Not authorized to update this application".to_string())
        })?;

    let updated = state
        .store
        .update_application_status(application.id, status)
        .await?
        .ok_or_else(application_not_found)?;

    LOGGER.log_business_event(
        "application_status_changed",
        Some(auth_user.id),
        event_meta([
            ("application_id", json!(updated.id)),
            ("from", json!(application.status.as_str())),
            ("to", json!(status.as_str())),
        ]),
    );

    Ok(Json(ApplicationResponse::populated(
        updated,
        Some(JobResponse::from(job)),
        None,
    )))
}
