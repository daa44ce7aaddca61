use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::json;
use std::collections::HashMap;
use validator::Validate;

use super::{parse_body, parse_id, JsonBody, MessageResponse, QueryParams};
use crate::{
    middleware::auth::AuthUser,
    models::{
        job::{CreateJobRequest, JobFilter, JobPatch, JobQuery, JobResponse},
        user::UserSummary,
    },
    utils::{
        errors::AppError,
        logger::{event_meta, LOGGER},
    },
    AppState,
};

fn invalid_updates() -> AppError {
    AppError::BadRequest("Invalid updates".to_string())
}

pub async fn list_jobs(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<JobQuery>,
) -> Result<Json<Vec<JobResponse>>, AppError> {
    let filter = JobFilter::from_query(query)
        .map_err(|e| AppError::BadRequest(format!("Invalid search pattern: {}", e)))?;

    let jobs = state.store.list_jobs(&filter).await?;

    let mut poster_ids: Vec<_> = jobs.iter().map(|job| job.posted_by).collect();
    poster_ids.sort_unstable();
    poster_ids.dedup();
    let posters: HashMap<_, _> = state
        .store
        .find_users(&poster_ids)
        .await?
        .iter()
        .map(|user| (user.id, UserSummary::name_only(user)))
        .collect();

    let responses = jobs
        .into_iter()
        .map(|job| {
            let poster = posters.get(&job.posted_by).cloned();
            JobResponse::with_poster(job, poster)
        })
        .collect();

    Ok(Json(responses))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, AppError> {
    let id = parse_id(&id).ok_or_else(AppError::job_not_found)?;
    let job = state
        .store
        .find_job(id)
        .await?
        .ok_or_else(AppError::job_not_found)?;

    let poster = state
        .store
        .find_user(job.posted_by)
        .await?
        .map(|user| UserSummary::contact(&user));

    Ok(Json(JobResponse::with_poster(job, poster)))
}

pub async fn create_job(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Json<JobResponse>), AppError> {
    let payload: CreateJobRequest = parse_body(body)?;
    payload.validate()?;

    let job = state
        .store
        .insert_job(payload.into_new_job(auth_user.id))
        .await?;

    LOGGER.log_business_event(
        "job_posted",
        Some(auth_user.id),
        event_meta([("job_id", json!(job.id)), ("company", json!(job.company))]),
    );

    Ok((StatusCode::CREATED, Json(JobResponse::from(job))))
}

pub async fn update_job(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<Json<JobResponse>, AppError> {
    let keys_ok = body
        .as_object()
        .map(|fields| JobPatch::keys_allowed(fields.keys()))
        .unwrap_or(false);
    if !keys_ok {
        return Err(invalid_updates());
    }

    let id = parse_id(&id).ok_or_else(AppError::job_not_found)?;
    let mut job = state
        .store
        .find_job(id)
        .await?
        .filter(|job| job.posted_by == auth_user.id)
        .ok_or_else(AppError::job_not_found)?;

    let patch: JobPatch = parse_body(body)?;
    patch.validate()?;
    patch.apply(&mut job);
    // deleted between the lookup and the write
    if !state.store.save_job(&job).await? {
        return Err(AppError::job_not_found());
    }

    LOGGER.log_business_event(
        "job_updated",
        Some(auth_user.id),
        event_meta([("job_id", json!(job.id))]),
    );

    Ok(Json(JobResponse::from(job)))
}

pub async fn delete_job(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id).ok_or_else(AppError::job_not_found)?;
    if !state.store.delete_job(id, auth_user.id).await? {
        return Err(AppError::job_not_found());
    }

    LOGGER.log_business_event(
        "job_deleted",
        Some(auth_user.id),
        event_meta([("job_id", json!(id))]),
    );

    Ok(Json(MessageResponse {
        message: "Job deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::test_support::TestApp;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_should_let_admin_post_job() {
        let app = TestApp::new();
        let admin = app.register_admin("boss@example.com").await;

        let (status, body) = app
            .post(
                "/api/jobs",
                Some(&admin),
                json!({
                    "title": "Rust Engineer",
                    "company": "Acme",
                    "location": "Remote",
                    "description": "Write services",
                    "requirements": ["Rust", "SQL"],
                    "salary": "100k",
                    "type": "Full-time",
                    "category": "Engineering",
                    "deadline": "2030-01-31"
                }),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["title"], "Rust Engineer");
        assert_eq!(body["requirements"], json!(["Rust", "SQL"]));
        assert_eq!(body["type"], "Full-time");
        assert!(body["postedBy"].is_string());
        assert!(body["deadline"].as_str().unwrap().starts_with("2030-01-31T00:00:00"));
    }

    #[tokio::test]
    async fn test_should_gate_job_creation_by_role() {
        let app = TestApp::new();
        let candidate = app.register_candidate("ada@example.com").await;

        let (status, body) = app.post("/api/jobs", Some(&candidate), TestApp::job_body("X")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Access denied: Admin rights required");

        let (status, _) = app.post("/api/jobs", None, TestApp::job_body("X")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_should_reject_job_with_missing_fields_or_bad_type() {
        let app = TestApp::new();
        let admin = app.register_admin("boss@example.com").await;

        let (status, body) = app
            .post("/api/jobs", Some(&admin), json!({"title": "Only a title"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"]["company"].is_array());

        let mut job = TestApp::job_body("X");
        job["type"] = json!("Gig");
        let (status, _) = app.post("/api/jobs", Some(&admin), job).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_should_populate_poster_on_listing_and_detail() {
        let app = TestApp::new();
        let admin = app.register_admin("boss@example.com").await;
        let job_id = app.create_job(&admin, "Rust Engineer").await;

        let (status, body) = app.get("/api/jobs", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["postedBy"]["name"], "Test User");
        assert!(body[0]["postedBy"].get("email").is_none());

        let (status, body) = app.get(&format!("/api/jobs/{}", job_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["postedBy"]["email"], "boss@example.com");

        let (status, body) = app.get("/api/jobs/not-an-id", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Job not found");

        let (status, _) = app
            .get(&format!("/api/jobs/{}", uuid::Uuid::new_v4()), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_should_search_and_sort_jobs() {
        let app = TestApp::new();
        let admin = app.register_admin("boss@example.com").await;
        let other = app.register_admin("other@example.com").await;

        let mut backend = TestApp::job_body("Backend Developer");
        backend["location"] = json!("Berlin");
        backend["category"] = json!("Engineering");
        backend["type"] = json!("Contract");
        app.post("/api/jobs", Some(&admin), backend).await;

        let mut designer = TestApp::job_body("Product Designer");
        designer["company"] = json!("Pixel Corp");
        designer["location"] = json!("Lisbon");
        app.post("/api/jobs", Some(&other), designer).await;

        let (_, body) = app.get("/api/jobs?q=developer", None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["title"], "Backend Developer");

        let (_, body) = app.get("/api/jobs?q=pixel", None).await;
        assert_eq!(body[0]["title"], "Product Designer");

        let (_, body) = app.get("/api/jobs?location=BERLIN&type=Contract", None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (_, body) = app.get("/api/jobs?category=engineering", None).await;
        assert!(body.as_array().unwrap().is_empty());

        let (_, body) = app.get("/api/jobs?sort=newest", None).await;
        assert_eq!(body[0]["title"], "Product Designer");

        let (_, body) = app.get("/api/jobs?sort=oldest", None).await;
        assert_eq!(body[0]["title"], "Backend Developer");

        let (status, body) = app.get("/api/jobs?q=(broken", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().starts_with("Invalid search pattern"));
    }

    #[tokio::test]
    async fn test_should_filter_jobs_by_poster() {
        let app = TestApp::new();
        let admin = app.register_admin("boss@example.com").await;
        let other = app.register_admin("other@example.com").await;
        app.create_job(&admin, "Mine").await;
        app.create_job(&other, "Theirs").await;

        let (_, me) = app.get("/api/auth/me", Some(&admin)).await;
        let (_, body) = app
            .get(&format!("/api/jobs?postedBy={}", me["_id"].as_str().unwrap()), None)
            .await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["title"], "Mine");

        let (_, body) = app.get("/api/jobs?postedBy=nobody", None).await;
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_should_update_only_allowed_fields_of_own_job() {
        let app = TestApp::new();
        let admin = app.register_admin("boss@example.com").await;
        let other = app.register_admin("other@example.com").await;
        let job_id = app.create_job(&admin, "Rust Engineer").await;
        let path = format!("/api/jobs/{}", job_id);

        let (status, body) = app
            .patch(&path, Some(&admin), json!({"title": "Lead", "postedBy": "x"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid updates");

        let (status, body) = app.patch(&path, Some(&other), json!({"title": "Stolen"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Job not found");

        let (status, body) = app
            .patch(&path, Some(&admin), json!({"title": "Lead Rust Engineer", "salary": null}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Lead Rust Engineer");
        assert!(body["salary"].is_null());
        assert_eq!(body["company"], "Acme");

        let (_, body) = app.get(&path, None).await;
        assert_eq!(body["title"], "Lead Rust Engineer");
    }

    #[tokio::test]
    async fn test_should_delete_own_job_and_its_applications() {
        let app = TestApp::new();
        let admin = app.register_admin("boss@example.com").await;
        let other = app.register_admin("other@example.com").await;
        let candidate = app.register_candidate("ada@example.com").await;
        let job_id = app.create_job(&admin, "Rust Engineer").await;
        app.apply(&candidate, &job_id).await;
        let path = format!("/api/jobs/{}", job_id);

        let (status, _) = app.delete(&path, Some(&other)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = app.delete(&path, Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Job deleted successfully");

        let (status, _) = app.get(&path, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = app.get("/api/applications", Some(&candidate)).await;
        assert!(body.as_array().unwrap().is_empty());
    }
}
