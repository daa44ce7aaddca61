use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::{user::UserSummary, Ref};

/// Keys a PATCH body may carry.
pub const ALLOWED_UPDATES: &[&str] = &[
    "title",
    "company",
    "location",
    "description",
    "requirements",
    "salary",
    "type",
    "category",
    "deadline",
];

#[derive(Debug, Clone, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub salary: Option<String>,
    pub job_type: Option<JobType>,
    pub category: Option<String>,
    pub posted_by: Uuid,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_type")]
pub enum JobType {
    #[serde(rename = "Full-time")]
    #[sqlx(rename = "Full-time")]
    FullTime,
    #[serde(rename = "Part-time")]
    #[sqlx(rename = "Part-time")]
    PartTime,
    Contract,
    Internship,
}

impl FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Full-time" => Ok(JobType::FullTime),
            "Part-time" => Ok(JobType::PartTime),
            "Contract" => Ok(JobType::Contract),
            "Internship" => Ok(JobType::Internship),
            other => Err(format!("unknown job type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub salary: Option<String>,
    pub job_type: Option<JobType>,
    pub category: Option<String>,
    pub posted_by: Uuid,
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateJobRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Company is required"))]
    pub company: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    pub salary: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<JobType>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "deadline::optional")]
    pub deadline: Option<DateTime<Utc>>,
}

impl CreateJobRequest {
    pub fn into_new_job(self, posted_by: Uuid) -> NewJob {
        NewJob {
            title: self.title,
            company: self.company,
            location: self.location,
            description: self.description,
            requirements: self.requirements,
            salary: self.salary,
            job_type: self.job_type,
            category: self.category,
            posted_by,
            deadline: self.deadline,
        }
    }
}

/// Partial update. Optional columns distinguish "absent" (outer `None`) from
/// an explicit `null` that clears the value.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct JobPatch {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Company cannot be empty"))]
    pub company: Option<String>,
    #[validate(length(min = 1, message = "Location cannot be empty"))]
    pub location: Option<String>,
    #[validate(length(min = 1, message = "Description cannot be empty"))]
    pub description: Option<String>,
    pub requirements: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub salary: Option<Option<String>>,
    #[serde(default, rename = "type", deserialize_with = "nullable")]
    pub job_type: Option<Option<JobType>>,
    #[serde(default, deserialize_with = "nullable")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "deadline::nullable")]
    pub deadline: Option<Option<DateTime<Utc>>>,
}

impl JobPatch {
    pub fn keys_allowed<'a>(mut keys: impl Iterator<Item = &'a String>) -> bool {
        keys.all(|key| ALLOWED_UPDATES.contains(&key.as_str()))
    }

    pub fn apply(self, job: &mut Job) {
        if let Some(title) = self.title {
            job.title = title;
        }
        if let Some(company) = self.company {
            job.company = company;
        }
        if let Some(location) = self.location {
            job.location = location;
        }
        if let Some(description) = self.description {
            job.description = description;
        }
        if let Some(requirements) = self.requirements {
            job.requirements = requirements;
        }
        if let Some(salary) = self.salary {
            job.salary = salary;
        }
        if let Some(job_type) = self.job_type {
            job.job_type = job_type;
        }
        if let Some(category) = self.category {
            job.category = category;
        }
        if let Some(deadline) = self.deadline {
            job.deadline = deadline;
        }
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Deadlines arrive either as RFC 3339 timestamps or as bare `YYYY-MM-DD`
/// dates from a date input. An empty string means "no deadline".
pub mod deadline {
    use super::*;

    pub fn parse(raw: &str) -> Result<Option<DateTime<Utc>>, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(Some(ts.with_timezone(&Utc)));
        }
        let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| format!("invalid deadline '{}'", raw))?;
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| format!("invalid deadline '{}'", raw))?;
        Ok(Some(Utc.from_utc_datetime(&midnight)))
    }

    pub fn optional<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse(&raw).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }

    pub fn nullable<'de, D>(deserializer: D) -> Result<Option<Option<DateTime<Utc>>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        optional(deserializer).map(Some)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobSort {
    Newest,
    Oldest,
    #[default]
    Unspecified,
}

/// Case-insensitive regular expression supplied by a searcher.
#[derive(Debug, Clone)]
pub struct SearchPattern {
    pub raw: String,
    regex: Regex,
}

impl SearchPattern {
    pub fn new(raw: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(raw).case_insensitive(true).build()?;
        Ok(Self {
            raw: raw.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }
}

/// Raw query string of `GET /api/jobs`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobQuery {
    pub q: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub sort: Option<String>,
    pub posted_by: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub text: Option<SearchPattern>,
    pub location: Option<SearchPattern>,
    pub category: Option<String>,
    pub job_type: Option<JobType>,
    pub posted_by: Option<Uuid>,
    pub sort: JobSort,
    /// Set when an exact-match parameter can never match anything.
    pub matches_nothing: bool,
}

impl JobFilter {
    pub fn from_query(query: JobQuery) -> Result<Self, regex::Error> {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
        let mut filter = JobFilter {
            text: non_empty(query.q).map(|q| SearchPattern::new(&q)).transpose()?,
            location: non_empty(query.location)
                .map(|l| SearchPattern::new(&l))
                .transpose()?,
            category: non_empty(query.category),
            sort: match query.sort.as_deref() {
                Some("newest") => JobSort::Newest,
                Some("oldest") => JobSort::Oldest,
                _ => JobSort::Unspecified,
            },
            ..Default::default()
        };
        if let Some(raw) = non_empty(query.job_type) {
            match raw.parse::<JobType>() {
                Ok(job_type) => filter.job_type = Some(job_type),
                Err(_) => filter.matches_nothing = true,
            }
        }
        if let Some(raw) = non_empty(query.posted_by) {
            match raw.parse::<Uuid>() {
                Ok(owner) => filter.posted_by = Some(owner),
                Err(_) => filter.matches_nothing = true,
            }
        }
        Ok(filter)
    }

    pub fn matches(&self, job: &Job) -> bool {
        if self.matches_nothing {
            return false;
        }
        if let Some(text) = &self.text {
            if !(text.is_match(&job.title)
                || text.is_match(&job.company)
                || text.is_match(&job.description))
            {
                return false;
            }
        }
        if let Some(location) = &self.location {
            if !location.is_match(&job.location) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if job.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if self.job_type.is_some() && job.job_type != self.job_type {
            return false;
        }
        if let Some(owner) = self.posted_by {
            if job.posted_by != owner {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub salary: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<JobType>,
    pub category: Option<String>,
    pub posted_by: Ref<UserSummary>,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl JobResponse {
    pub fn with_poster(job: Job, poster: Option<UserSummary>) -> Self {
        let posted_by = match poster {
            Some(summary) => Ref::Populated(summary),
            None => Ref::Id(job.posted_by),
        };
        let mut response = Self::from(job);
        response.posted_by = posted_by;
        response
    }
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            title: job.title,
            company: job.company,
            location: job.location,
            description: job.description,
            requirements: job.requirements,
            salary: job.salary,
            job_type: job.job_type,
            category: job.category,
            posted_by: Ref::Id(job.posted_by),
            deadline: job.deadline,
            created_at: job.created_at,
        }
    }
}
