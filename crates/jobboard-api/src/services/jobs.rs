//! Job queries, including the per-job application counts.

use futures_util::future::try_join_all;
use serde_json::{Map, Value};
use tracing::info;

use jobboard_firestore::{ApplicationRepository, JobRepository};
use jobboard_models::{InsertResult, Job, JobId, POSTER_FIELD};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct JobService {
    jobs: JobRepository,
    applications: ApplicationRepository,
}

impl JobService {
    pub fn new(jobs: JobRepository, applications: ApplicationRepository) -> Self {
        Self { jobs, applications }
    }

    /// All jobs, or only those posted by `poster`.
    pub async fn list_jobs(&self, poster: Option<&str>) -> ApiResult<Vec<Job>> {
        Ok(self.jobs.list(poster).await?)
    }

    /// A single job by the string form of its ID.
    pub async fn get_job(&self, id: &str) -> ApiResult<Job> {
        let id = JobId::parse(id)?;
        self.find_job(&id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("job {}", id)))
    }

    pub async fn find_job(&self, id: &JobId) -> ApiResult<Option<Job>> {
        Ok(self.jobs.get(id).await?)
    }

    /// The poster's jobs, each with the number of applications referencing it.
    ///
    /// Counts run concurrently. Any failed count fails the whole call, and
    /// the result keeps the order of the job list.
    pub async fn list_jobs_with_application_counts(&self, poster: &str) -> ApiResult<Vec<Job>> {
        let jobs = self.jobs.list(Some(poster)).await?;

        let counted = try_join_all(jobs.into_iter().map(|job| async move {
            let count = self.applications.count_by_job(&job.job_ref()).await?;
            Ok::<_, ApiError>(job.with_applications_count(count))
        }))
        .await?;

        Ok(counted)
    }

    /// Store a job posted by `caller`.
    ///
    /// A payload naming a different poster is rejected; a payload naming
    /// none is stamped with the caller's identity.
    pub async fn create_job(
        &self,
        caller: &AuthUser,
        mut payload: Map<String, Value>,
    ) -> ApiResult<InsertResult> {
        match payload.get(POSTER_FIELD) {
            None | Some(Value::Null) => {
                payload.insert(POSTER_FIELD.to_string(), Value::String(caller.email.clone()));
            }
            Some(Value::String(email)) if *email == caller.email => {}
            Some(_) => {
                return Err(ApiError::forbidden(
                    "jobs can only be posted under your own identity",
                ));
            }
        }

        let id = self.jobs.create(payload).await?;
        info!(job_id = %id, poster = %caller.email, "Job posted");
        Ok(InsertResult::new(id.to_string()))
    }

    /// Resolve a job and check that `caller` posted it.
    pub async fn authorize_poster(&self, caller: &AuthUser, id: &JobId) -> ApiResult<Job> {
        let job = self
            .find_job(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("job {}", id)))?;

        if !job.is_posted_by(&caller.email) {
            return Err(ApiError::forbidden("only the poster of this job may do that"));
        }
        Ok(job)
    }
}
