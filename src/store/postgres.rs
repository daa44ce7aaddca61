use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};
use std::time::Instant;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::{
    application::{Application, ApplicationFilter, ApplicationStatus, NewApplication},
    job::{Job, JobFilter, JobSort, NewJob},
    user::{NewUser, User, UserRole},
};
use crate::utils::logger::LOGGER;

const JOB_COLUMNS: &str = "id, title, company, location, description, requirements, salary, \
     job_type, category, posted_by, deadline, created_at";

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// SQLSTATE raised when `~*` cannot compile its pattern.
const INVALID_REGEX: &str = "2201B";

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict("Resource already exists".to_string())
            }
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(INVALID_REGEX) => {
                StoreError::InvalidPattern(db_err.message().to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn record(query: &str, started: Instant, result_count: Option<usize>) {
    LOGGER.log_database_query(query, started.elapsed().as_millis(), result_count);
}

#[async_trait]
impl Store for PgStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(
        &self,
        email: &str,
        role: Option<UserRole>,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = $1 AND ($2::user_role IS NULL OR role = $2)",
        )
        .bind(email)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::Conflict(_) => StoreError::Conflict("User already exists".to_string()),
            other => other,
        })?;
        Ok(user)
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, StoreError> {
        if filter.matches_nothing {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM jobs WHERE TRUE", JOB_COLUMNS));
        if let Some(text) = &filter.text {
            qb.push(" AND (title ~* ")
                .push_bind(text.raw.clone())
                .push(" OR company ~* ")
                .push_bind(text.raw.clone())
                .push(" OR description ~* ")
                .push_bind(text.raw.clone())
                .push(")");
        }
        if let Some(location) = &filter.location {
            qb.push(" AND location ~* ").push_bind(location.raw.clone());
        }
        if let Some(category) = &filter.category {
            qb.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(job_type) = filter.job_type {
            qb.push(" AND job_type = ").push_bind(job_type);
        }
        if let Some(owner) = filter.posted_by {
            qb.push(" AND posted_by = ").push_bind(owner);
        }
        match filter.sort {
            JobSort::Newest => {
                qb.push(" ORDER BY created_at DESC");
            }
            JobSort::Oldest => {
                qb.push(" ORDER BY created_at ASC");
            }
            JobSort::Unspecified => {}
        }

        let started = Instant::now();
        let jobs = qb.build_query_as::<Job>().fetch_all(&self.pool).await?;
        record(qb.sql(), started, Some(jobs.len()));
        Ok(jobs)
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        let job = sqlx::query_as::<_, Job>(&format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    async fn find_jobs(&self, ids: &[Uuid]) -> Result<Vec<Job>, StoreError> {
        let jobs = sqlx::query_as::<_, Job>(&format!(
            "SELECT {} FROM jobs WHERE id = ANY($1)",
            JOB_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(jobs)
    }

    async fn insert_job(&self, job: NewJob) -> Result<Job, StoreError> {
        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            INSERT INTO jobs (id, title, company, location, description, requirements,
                              salary, job_type, category, posted_by, deadline)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.description)
        .bind(&job.requirements)
        .bind(&job.salary)
        .bind(job.job_type)
        .bind(&job.category)
        .bind(job.posted_by)
        .bind(job.deadline)
        .fetch_one(&self.pool)
        .await?;
        Ok(job)
    }

    async fn save_job(&self, job: &Job) -> Result<bool, StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE jobs
            SET title = $2,
                company = $3,
                location = $4,
                description = $5,
                requirements = $6,
                salary = $7,
                job_type = $8,
                category = $9,
                deadline = $10
            WHERE id = $1
            "#,
        )
        .bind(job.id)
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.description)
        .bind(&job.requirements)
        .bind(&job.salary)
        .bind(job.job_type)
        .bind(&job.category)
        .bind(job.deadline)
        .execute(&self.pool)
        .await?;
        Ok(updated.rows_affected() > 0)
    }

    async fn delete_job(&self, id: Uuid, owner: Uuid) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM jobs WHERE id = $1 AND posted_by = $2")
            .bind(id)
            .bind(owner)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM applications WHERE job_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn find_application(&self, id: Uuid) -> Result<Option<Application>, StoreError> {
        let application =
            sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(application)
    }

    async fn find_application_for(
        &self,
        job_id: Uuid,
        candidate_id: Uuid,
    ) -> Result<Option<Application>, StoreError> {
        let application = sqlx::query_as::<_, Application>(
            "SELECT * FROM applications WHERE job_id = $1 AND candidate_id = $2",
        )
        .bind(job_id)
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(application)
    }

    async fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, StoreError> {
        let application = sqlx::query_as::<_, Application>(
            r#"
            INSERT INTO applications (id, job_id, candidate_id, resume, cover_letter)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(application.job_id)
        .bind(application.candidate_id)
        .bind(&application.resume)
        .bind(&application.cover_letter)
        .fetch_one(&self.pool)
        .await?;
        Ok(application)
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, StoreError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM applications WHERE TRUE");
        if let Some(candidate) = filter.candidate {
            qb.push(" AND candidate_id = ").push_bind(candidate);
        }
        if let Some(jobs) = &filter.jobs {
            qb.push(" AND job_id = ANY(").push_bind(jobs.clone()).push(")");
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        qb.push(" ORDER BY created_at DESC");

        let started = Instant::now();
        let applications = qb
            .build_query_as::<Application>()
            .fetch_all(&self.pool)
            .await?;
        record(qb.sql(), started, Some(applications.len()));
        Ok(applications)
    }

    async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Option<Application>, StoreError> {
        let application = sqlx::query_as::<_, Application>(
            "UPDATE applications SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(application)
    }
}
