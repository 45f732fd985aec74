//! Job application models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};
use crate::job::{Job, JobRef};

pub const APPLICANT_FIELD: &str = "applicant";
pub const JOB_ID_FIELD: &str = "jobId";
pub const STATUS_FIELD: &str = "status";

/// Unique identifier for an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(Uuid);

impl ApplicationId {
    /// Generate a new random application ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an application ID from its string form.
    pub fn parse(s: &str) -> ModelResult<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ModelError::invalid_id("application", s))
    }
}

impl Default for ApplicationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ApplicationId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A stored application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: ApplicationId,

    /// Identity of whoever applied.
    pub applicant: String,

    /// String form of the referenced job's ID.
    pub job_id: JobRef,

    /// Free-form review status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// The referenced job, when it has been resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<Job>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Application {
    /// Build an application from stored fields.
    pub fn from_fields(id: ApplicationId, mut fields: Map<String, Value>) -> ModelResult<Self> {
        let applicant = take_string(&mut fields, APPLICANT_FIELD)?
            .ok_or(ModelError::MissingField(APPLICANT_FIELD))?;
        let job_id = take_string(&mut fields, JOB_ID_FIELD)?
            .map(JobRef::new)
            .ok_or(ModelError::MissingField(JOB_ID_FIELD))?;
        let status = take_string(&mut fields, STATUS_FIELD)?;
        fields.remove("id");
        fields.remove("job");

        Ok(Self {
            id,
            applicant,
            job_id,
            status,
            job: None,
            fields,
        })
    }

    pub fn with_job(mut self, job: Option<Job>) -> Self {
        self.job = job;
        self
    }
}

/// Payload submitted to create an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplication {
    pub applicant: String,
    pub job_id: JobRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl NewApplication {
    /// Flatten into the field map written to the store.
    pub fn into_fields(self) -> Map<String, Value> {
        let mut fields = self.fields;
        fields.insert(APPLICANT_FIELD.to_string(), Value::String(self.applicant));
        fields.insert(
            JOB_ID_FIELD.to_string(),
            Value::String(self.job_id.as_str().to_string()),
        );
        if let Some(status) = self.status {
            fields.insert(STATUS_FIELD.to_string(), Value::String(status));
        }
        fields
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &'static str) -> ModelResult<Option<String>> {
    match fields.remove(key) {
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(ModelError::NotAString(key)),
    }
}
