use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::{
    application::{Application, ApplicationFilter, ApplicationStatus, NewApplication},
    job::{Job, JobFilter, JobSort, NewJob},
    user::{NewUser, User, UserRole},
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    jobs: Vec<Job>,
    applications: Vec<Application>,
}

/// Process-local store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(
        &self,
        email: &str,
        role: Option<UserRole>,
    ) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.email == email && role.map_or(true, |r| u.role == r))
            .cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("User already exists".to_string()));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, StoreError> {
        let tables = self.tables.read().await;
        let mut jobs: Vec<Job> = match filter.sort {
            // later inserts win ties on equal timestamps
            JobSort::Newest => tables.jobs.iter().rev().filter(|j| filter.matches(j)).cloned().collect(),
            _ => tables.jobs.iter().filter(|j| filter.matches(j)).cloned().collect(),
        };
        match filter.sort {
            JobSort::Newest => jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            JobSort::Oldest => jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            JobSort::Unspecified => {}
        }
        Ok(jobs)
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn find_jobs(&self, ids: &[Uuid]) -> Result<Vec<Job>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .jobs
            .iter()
            .filter(|j| ids.contains(&j.id))
            .cloned()
            .collect())
    }

    async fn insert_job(&self, job: NewJob) -> Result<Job, StoreError> {
        let job = Job {
            id: Uuid::new_v4(),
            title: job.title,
            company: job.company,
            location: job.location,
            description: job.description,
            requirements: job.requirements,
            salary: job.salary,
            job_type: job.job_type,
            category: job.category,
            posted_by: job.posted_by,
            deadline: job.deadline,
            created_at: Utc::now(),
        };
        self.tables.write().await.jobs.push(job.clone());
        Ok(job)
    }

    async fn save_job(&self, job: &Job) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.jobs.iter_mut().find(|j| j.id == job.id) {
            Some(existing) => {
                *existing = job.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_job(&self, id: Uuid, owner: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.jobs.len();
        tables.jobs.retain(|j| !(j.id == id && j.posted_by == owner));
        if tables.jobs.len() == before {
            return Ok(false);
        }
        tables.applications.retain(|a| a.job_id != id);
        Ok(true)
    }

    async fn find_application(&self, id: Uuid) -> Result<Option<Application>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.applications.iter().find(|a| a.id == id).cloned())
    }

    async fn find_application_for(
        &self,
        job_id: Uuid,
        candidate_id: Uuid,
    ) -> Result<Option<Application>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .applications
            .iter()
            .find(|a| a.job_id == job_id && a.candidate_id == candidate_id)
            .cloned())
    }

    async fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .applications
            .iter()
            .any(|a| a.job_id == application.job_id && a.candidate_id == application.candidate_id)
        {
            return Err(StoreError::Conflict(
                "Application already exists".to_string(),
            ));
        }
        let application = Application {
            id: Uuid::new_v4(),
            job_id: application.job_id,
            candidate_id: application.candidate_id,
            resume: application.resume,
            cover_letter: application.cover_letter,
            status: ApplicationStatus::default(),
            created_at: Utc::now(),
        };
        tables.applications.push(application.clone());
        Ok(application)
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, StoreError> {
        let tables = self.tables.read().await;
        let mut applications: Vec<Application> = tables
            .applications
            .iter()
            .rev()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(applications)
    }

    async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Option<Application>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .applications
            .iter_mut()
            .find(|a| a.id == id)
            .map(|a| {
                a.status = status;
                a.clone()
            }))
    }
}
