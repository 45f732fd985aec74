//! Application queries and status updates.

use futures_util::future::join_all;
use tracing::{info, warn};

use jobboard_firestore::ApplicationRepository;
use jobboard_models::{
    Application, ApplicationId, InsertResult, Job, JobRef, NewApplication, UpdateResult,
};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::JobService;

#[derive(Clone)]
pub struct ApplicationService {
    jobs: JobService,
    applications: ApplicationRepository,
}

impl ApplicationService {
    pub fn new(jobs: JobService, applications: ApplicationRepository) -> Self {
        Self { jobs, applications }
    }

    /// The caller's own applications, each with its job attached.
    ///
    /// `requested` is the identity named by the request and must be the
    /// caller's. Job lookups run concurrently; one that fails or finds
    /// nothing leaves that application's `job` unset.
    pub async fn list_my_applications(
        &self,
        requested: Option<&str>,
        caller: &AuthUser,
    ) -> ApiResult<Vec<Application>> {
        caller.ensure_is(requested)?;

        let applications = self.applications.list_by_applicant(&caller.email).await?;

        let enriched = join_all(applications.into_iter().map(|app| async move {
            let job = self.resolve_job(&app).await;
            app.with_job(job)
        }))
        .await;

        Ok(enriched)
    }

    async fn resolve_job(&self, app: &Application) -> Option<Job> {
        let found = match app.job_id.to_job_id() {
            Ok(id) => self.jobs.find_job(&id).await,
            Err(e) => {
                warn!(application_id = %app.id, "Cannot resolve job: {}", e);
                metrics::record_enrichment_miss();
                return None;
            }
        };

        match found {
            Ok(Some(job)) => Some(job),
            Ok(None) => {
                warn!(application_id = %app.id, job_id = %app.job_id, "Referenced job no longer exists");
                metrics::record_enrichment_miss();
                None
            }
            Err(e) => {
                warn!(application_id = %app.id, job_id = %app.job_id, "Job lookup failed: {}", e);
                metrics::record_enrichment_miss();
                None
            }
        }
    }

    /// Applications whose stored job reference equals `job_ref` textually.
    ///
    /// The job must exist and have been posted by the caller.
    pub async fn list_applications_for_job(
        &self,
        caller: &AuthUser,
        job_ref: &JobRef,
    ) -> ApiResult<Vec<Application>> {
        let job_id = job_ref.to_job_id()?;
        self.jobs.authorize_poster(caller, &job_id).await?;

        Ok(self.applications.list_by_job(job_ref).await?)
    }

    /// Store an application. Duplicates are allowed.
    pub async fn create_application(&self, application: NewApplication) -> ApiResult<InsertResult> {
        let id = self.applications.create(application).await?;
        Ok(InsertResult::new(id.to_string()))
    }

    /// Set an application's status on behalf of the poster of its job.
    ///
    /// Repeating the same status matches without modifying anything.
    pub async fn update_application_status(
        &self,
        caller: &AuthUser,
        id: &str,
        status: &str,
    ) -> ApiResult<UpdateResult> {
        let id = ApplicationId::parse(id)?;
        let application = self
            .applications
            .get(&id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("application {}", id)))?;

        let job = match application.job_id.to_job_id() {
            Ok(job_id) => self.jobs.find_job(&job_id).await?,
            Err(_) => None,
        };
        match job {
            Some(job) if job.is_posted_by(&caller.email) => {}
            _ => {
                return Err(ApiError::forbidden(
                    "only the poster of the referenced job may review this application",
                ));
            }
        }

        let result = self.applications.update_status(&id, status).await?;
        info!(application_id = %id, status = %status, reviewer = %caller.email, "Application reviewed");
        Ok(result)
    }
}
