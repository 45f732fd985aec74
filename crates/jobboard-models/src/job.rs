//! Job posting models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};

/// JSON key holding the poster identity on a job document.
pub const POSTER_FIELD: &str = "email";

/// JSON key of the derived application count.
pub const APPLICATIONS_COUNT_FIELD: &str = "applicationsCount";

/// Native identifier of a job, assigned by the store on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a job ID from its string form.
    pub fn parse(s: &str) -> ModelResult<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ModelError::invalid_id("job", s))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Reference to a job as stored on an application: the job ID rendered as
/// a string.
///
/// Equality is plain string equality. Two refs that parse to the same
/// [`JobId`] but differ textually (e.g. in letter case) are different refs,
/// which is also how the store compares them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobRef(String);

impl JobRef {
    /// Wrap a raw string without validating it.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve the native job ID this ref points at.
    pub fn to_job_id(&self) -> ModelResult<JobId> {
        JobId::parse(&self.0)
    }
}

impl From<&JobId> for JobRef {
    fn from(id: &JobId) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for JobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A job posting.
///
/// Only the poster identity is interpreted; every other field is carried
/// through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,

    /// Identity of whoever posted the job.
    #[serde(rename = "email", default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,

    /// Number of applications referencing this job, when computed.
    #[serde(
        rename = "applicationsCount",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub applications_count: Option<u64>,

    /// Opaque posting payload (title, description, ...).
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Job {
    /// Build a job from stored fields.
    pub fn from_fields(id: JobId, mut fields: Map<String, Value>) -> Self {
        let poster = match fields.remove(POSTER_FIELD) {
            Some(Value::String(s)) => Some(s),
            Some(other) => {
                // Not an identity; keep it as opaque payload.
                fields.insert(POSTER_FIELD.to_string(), other);
                None
            }
            None => None,
        };
        fields.remove("id");
        fields.remove(APPLICATIONS_COUNT_FIELD);

        Self {
            id,
            poster,
            applications_count: None,
            fields,
        }
    }

    /// String form of this job's ID, as applications store it.
    pub fn job_ref(&self) -> JobRef {
        JobRef::from(&self.id)
    }

    pub fn is_posted_by(&self, identity: &str) -> bool {
        self.poster.as_deref() == Some(identity)
    }

    pub fn with_applications_count(mut self, count: u64) -> Self {
        self.applications_count = Some(count);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_job_id_parse() {
        let id = JobId::new();
        assert_eq!(JobId::parse(&id.to_string()).unwrap(), id);
        assert!(JobId::parse("not-an-id").unwrap_err().is_invalid_id());
        assert!(JobId::parse("").is_err());
    }

    #[test]
    fn test_job_ref_is_string_form() {
        let id = JobId::new();
        let job_ref = JobRef::from(&id);
        assert_eq!(job_ref.as_str(), id.to_string());
        assert_eq!(job_ref.to_job_id().unwrap(), id);
    }

    #[test]
    fn test_job_ref_compares_text_not_identity() {
        let id = JobId::new();
        let canonical = JobRef::from(&id);
        let shouting = JobRef::new(id.to_string().to_uppercase());

        // Both resolve to the same native ID...
        assert_eq!(shouting.to_job_id().unwrap(), id);
        // ...but they are not the same reference.
        assert_ne!(canonical, shouting);
    }

    #[test]
    fn test_from_fields_extracts_poster() {
        let id = JobId::new();
        let job = Job::from_fields(
            id,
            fields(json!({ "email": "hr@x.com", "title": "Rust dev", "salary": 10 })),
        );

        assert_eq!(job.poster.as_deref(), Some("hr@x.com"));
        assert!(job.is_posted_by("hr@x.com"));
        assert!(!job.is_posted_by("other@x.com"));
        assert_eq!(job.fields.get("title"), Some(&json!("Rust dev")));
        assert!(!job.fields.contains_key("email"));
    }

    #[test]
    fn test_from_fields_keeps_non_string_email_as_payload() {
        let job = Job::from_fields(JobId::new(), fields(json!({ "email": 42 })));
        assert!(job.poster.is_none());
        assert_eq!(job.fields.get("email"), Some(&json!(42)));
    }

    #[test]
    fn test_job_serializes_flat() {
        let id = JobId::new();
        let job = Job::from_fields(id, fields(json!({ "email": "hr@x.com", "title": "T" })))
            .with_applications_count(3);

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(
            value,
            json!({
                "id": id.to_string(),
                "email": "hr@x.com",
                "applicationsCount": 3,
                "title": "T",
            })
        );
    }

    #[test]
    fn test_count_is_omitted_until_computed() {
        let job = Job::from_fields(JobId::new(), Map::new());
        let value = serde_json::to_value(&job).unwrap();
        assert!(value.get("applicationsCount").is_none());
        assert!(value.get("email").is_none());
    }
}
