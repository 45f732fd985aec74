//! Typed repositories for jobs and applications.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{info, warn};

use jobboard_models::{
    Application, ApplicationId, Job, JobId, JobRef, NewApplication, UpdateResult,
};
use jobboard_models::{APPLICANT_FIELD, JOB_ID_FIELD, POSTER_FIELD, STATUS_FIELD};

use crate::error::FirestoreResult;
use crate::metrics::record_malformed_document;
use crate::store::{DocumentStore, FieldFilter, StoredDocument};

pub const JOBS_COLLECTION: &str = "jobs";
pub const APPLICATIONS_COLLECTION: &str = "applications";

/// Repository for job documents.
#[derive(Clone)]
pub struct JobRepository {
    store: Arc<dyn DocumentStore>,
}

impl JobRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// All jobs, or only those posted by `poster`.
    ///
    /// Documents whose ID is not a job ID are skipped.
    pub async fn list(&self, poster: Option<&str>) -> FirestoreResult<Vec<Job>> {
        let filter = poster.map(|p| FieldFilter::eq(POSTER_FIELD, p));
        let docs = self.store.find(JOBS_COLLECTION, filter.as_ref()).await?;

        Ok(docs.into_iter().filter_map(decode_job).collect())
    }

    /// Get a job by ID.
    pub async fn get(&self, id: &JobId) -> FirestoreResult<Option<Job>> {
        let doc = self.store.get(JOBS_COLLECTION, &id.to_string()).await?;
        Ok(doc.map(|d| Job::from_fields(*id, d.fields)))
    }

    /// Store a new job and return its generated ID.
    pub async fn create(&self, mut fields: Map<String, Value>) -> FirestoreResult<JobId> {
        let id = JobId::new();
        fields.remove("id");
        self.store
            .insert(JOBS_COLLECTION, &id.to_string(), fields)
            .await?;
        info!(job_id = %id, "Created job");
        Ok(id)
    }
}

fn decode_job(doc: StoredDocument) -> Option<Job> {
    match JobId::parse(&doc.id) {
        Ok(id) => Some(Job::from_fields(id, doc.fields)),
        Err(e) => {
            warn!(doc_id = %doc.id, "Skipping job document: {}", e);
            record_malformed_document(JOBS_COLLECTION);
            None
        }
    }
}

/// Repository for application documents.
#[derive(Clone)]
pub struct ApplicationRepository {
    store: Arc<dyn DocumentStore>,
}

impl ApplicationRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Applications submitted by `applicant`.
    pub async fn list_by_applicant(&self, applicant: &str) -> FirestoreResult<Vec<Application>> {
        let filter = FieldFilter::eq(APPLICANT_FIELD, applicant);
        self.find(&filter).await
    }

    /// Applications whose stored job reference equals `job_ref` exactly.
    pub async fn list_by_job(&self, job_ref: &JobRef) -> FirestoreResult<Vec<Application>> {
        let filter = FieldFilter::eq(JOB_ID_FIELD, job_ref.as_str());
        self.find(&filter).await
    }

    /// Number of applications whose stored job reference equals `job_ref`.
    pub async fn count_by_job(&self, job_ref: &JobRef) -> FirestoreResult<u64> {
        let filter = FieldFilter::eq(JOB_ID_FIELD, job_ref.as_str());
        self.store.count(APPLICATIONS_COLLECTION, Some(&filter)).await
    }

    /// Get an application by ID.
    pub async fn get(&self, id: &ApplicationId) -> FirestoreResult<Option<Application>> {
        let doc = self
            .store
            .get(APPLICATIONS_COLLECTION, &id.to_string())
            .await?;

        match doc {
            Some(d) => Ok(Some(Application::from_fields(*id, d.fields)?)),
            None => Ok(None),
        }
    }

    /// Store a new application and return its generated ID.
    pub async fn create(&self, application: NewApplication) -> FirestoreResult<ApplicationId> {
        let id = ApplicationId::new();
        let mut fields = application.into_fields();
        fields.remove("id");
        self.store
            .insert(APPLICATIONS_COLLECTION, &id.to_string(), fields)
            .await?;
        info!(application_id = %id, "Created application");
        Ok(id)
    }

    /// Set the status field, leaving every other field untouched.
    pub async fn update_status(
        &self,
        id: &ApplicationId,
        status: &str,
    ) -> FirestoreResult<UpdateResult> {
        let mut fields = Map::new();
        fields.insert(STATUS_FIELD.to_string(), Value::String(status.to_string()));

        let result = self
            .store
            .update_fields(APPLICATIONS_COLLECTION, &id.to_string(), fields)
            .await?;
        info!(
            application_id = %id,
            modified = result.is_modified(),
            "Updated application status"
        );
        Ok(result)
    }

    async fn find(&self, filter: &FieldFilter) -> FirestoreResult<Vec<Application>> {
        let docs = self
            .store
            .find(APPLICATIONS_COLLECTION, Some(filter))
            .await?;

        Ok(docs.into_iter().filter_map(decode_application).collect())
    }
}

fn decode_application(doc: StoredDocument) -> Option<Application> {
    let decoded = ApplicationId::parse(&doc.id)
        .and_then(|id| Application::from_fields(id, doc.fields));

    match decoded {
        Ok(app) => Some(app),
        Err(e) => {
            warn!(doc_id = %doc.id, "Skipping application document: {}", e);
            record_malformed_document(APPLICATIONS_COLLECTION);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FirestoreError;
    use crate::memory::MemoryStore;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn repos() -> (Arc<MemoryStore>, JobRepository, ApplicationRepository) {
        let store = Arc::new(MemoryStore::new());
        let jobs = JobRepository::new(store.clone());
        let applications = ApplicationRepository::new(store.clone());
        (store, jobs, applications)
    }

    fn application(applicant: &str, job_ref: JobRef) -> NewApplication {
        NewApplication {
            applicant: applicant.to_string(),
            job_id: job_ref,
            status: None,
            fields: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_job_create_get_list() {
        let (_, jobs, _) = repos();
        let a = jobs
            .create(fields(json!({ "email": "hr@x.com", "title": "A", "id": "ignored" })))
            .await
            .unwrap();
        jobs.create(fields(json!({ "email": "other@x.com", "title": "B" })))
            .await
            .unwrap();

        let job = jobs.get(&a).await.unwrap().unwrap();
        assert_eq!(job.id, a);
        assert_eq!(job.poster.as_deref(), Some("hr@x.com"));
        assert!(!job.fields.contains_key("id"));

        assert_eq!(jobs.list(None).await.unwrap().len(), 2);
        let mine = jobs.list(Some("hr@x.com")).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, a);
        assert!(jobs.get(&JobId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_skips_foreign_document_ids() {
        let (store, jobs, _) = repos();
        store
            .insert(JOBS_COLLECTION, "legacy-id", fields(json!({ "title": "old" })))
            .await
            .unwrap();
        jobs.create(Map::new()).await.unwrap();

        assert_eq!(jobs.list(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_applications_match_job_ref_textually() {
        let (_, _, applications) = repos();
        let job_id = JobId::new();
        let canonical = JobRef::from(&job_id);
        let shouting = JobRef::new(job_id.to_string().to_uppercase());

        applications
            .create(application("a@x.com", canonical.clone()))
            .await
            .unwrap();
        applications
            .create(application("b@x.com", shouting.clone()))
            .await
            .unwrap();

        assert_eq!(applications.count_by_job(&canonical).await.unwrap(), 1);
        let listed = applications.list_by_job(&canonical).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].applicant, "a@x.com");
        assert_eq!(applications.count_by_job(&shouting).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_by_applicant() {
        let (_, _, applications) = repos();
        let job_ref = JobRef::from(&JobId::new());
        applications
            .create(application("a@x.com", job_ref.clone()))
            .await
            .unwrap();
        applications
            .create(application("a@x.com", job_ref.clone()))
            .await
            .unwrap();
        applications
            .create(application("b@x.com", job_ref))
            .await
            .unwrap();

        assert_eq!(applications.list_by_applicant("a@x.com").await.unwrap().len(), 2);
        assert!(applications.list_by_applicant("c@x.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_status() {
        let (_, _, applications) = repos();
        let id = applications
            .create(application("a@x.com", JobRef::new("j")))
            .await
            .unwrap();

        let first = applications.update_status(&id, "accepted").await.unwrap();
        assert!(first.is_modified());
        let again = applications.update_status(&id, "accepted").await.unwrap();
        assert_eq!(again, UpdateResult::matched(false));

        let app = applications.get(&id).await.unwrap().unwrap();
        assert_eq!(app.status.as_deref(), Some("accepted"));
        assert_eq!(app.applicant, "a@x.com");

        let err = applications
            .update_status(&ApplicationId::new(), "accepted")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_get_malformed_application_is_an_error() {
        let (store, _, applications) = repos();
        let id = ApplicationId::new();
        store
            .insert(APPLICATIONS_COLLECTION, &id.to_string(), fields(json!({ "jobId": "j" })))
            .await
            .unwrap();

        let err = applications.get(&id).await.unwrap_err();
        assert!(matches!(err, FirestoreError::MalformedDocument(_)));
        assert!(applications.list_by_job(&JobRef::new("j")).await.unwrap().is_empty());
    }
}
