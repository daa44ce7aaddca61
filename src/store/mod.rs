//! Persistence boundary. Handlers talk to a [`Store`]; the Postgres
//! implementation is used in deployments, the in-memory one for local runs
//! without a database and for tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    application::{Application, ApplicationFilter, ApplicationStatus, NewApplication},
    job::{Job, JobFilter, NewJob},
    user::{NewUser, User, UserRole},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Conflict: {0}")]
    Conflict(String),
    /// The database refused a search pattern the service accepted.
    #[error("Invalid search pattern: {0}")]
    InvalidPattern(String),
    #[error("Database error: {0}")]
    Database(String),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Looks up an account by email, optionally restricted to one role.
    async fn find_user_by_email(
        &self,
        email: &str,
        role: Option<UserRole>,
    ) -> Result<Option<User>, StoreError>;

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the email is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, StoreError>;

    async fn find_job(&self, id: Uuid) -> Result<Option<Job>, StoreError>;

    async fn find_jobs(&self, ids: &[Uuid]) -> Result<Vec<Job>, StoreError>;

    async fn insert_job(&self, job: NewJob) -> Result<Job, StoreError>;

    /// Overwrites every mutable column of an existing job. Returns `false`
    /// when the job no longer exists.
    async fn save_job(&self, job: &Job) -> Result<bool, StoreError>;

    /// Removes a job owned by `owner` together with its applications.
    /// Returns `false` when no such job exists for that owner.
    async fn delete_job(&self, id: Uuid, owner: Uuid) -> Result<bool, StoreError>;

    async fn find_application(&self, id: Uuid) -> Result<Option<Application>, StoreError>;

    async fn find_application_for(
        &self,
        job_id: Uuid,
        candidate_id: Uuid,
    ) -> Result<Option<Application>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the pair already applied.
    async fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, StoreError>;

    /// Newest first.
    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, StoreError>;

    async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Option<Application>, StoreError>;
}
