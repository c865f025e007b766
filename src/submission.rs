//! The persisted submission record and the key scheme it is stored under.

use crate::feedback::Feedback;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Prefix of every submission key in the key-value store.
pub const KEY_PREFIX: &str = "resume:";

/// Key-value key for a submission id: `resume:<id>`.
pub fn record_key(id: &str) -> String {
    format!("{KEY_PREFIX}{id}")
}

/// Route of the results view for a submission.
pub fn result_route(id: &str) -> String {
    format!("/resume/{id}")
}

/// One resume, its rendered image, the job it targets, and (eventually) its
/// feedback.
///
/// Written once as a draft with no feedback, then overwritten exactly once
/// when inference completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub resume_path: String,
    pub image_path: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub job_description: String,
    /// Stored as `""` while pending, matching records written by the web app.
    #[serde(with = "feedback_slot", default)]
    pub feedback: Option<Feedback>,
}

impl Submission {
    /// A draft with a fresh random id and no feedback.
    pub fn draft(
        resume_path: impl Into<String>,
        image_path: impl Into<String>,
        company_name: impl Into<String>,
        job_title: impl Into<String>,
        job_description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            resume_path: resume_path.into(),
            image_path: image_path.into(),
            company_name: company_name.into(),
            job_title: job_title.into(),
            job_description: job_description.into(),
            feedback: None,
        }
    }

    pub fn key(&self) -> String {
        record_key(&self.id)
    }

    pub fn is_pending(&self) -> bool {
        self.feedback.is_none()
    }
}

mod feedback_slot {
    use super::*;
    use serde_json::Value;

    pub fn serialize<S: Serializer>(value: &Option<Feedback>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(fb) => fb.serialize(s),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Feedback>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(other)) => Err(serde::de::Error::custom(format!(
                "feedback must be an object or empty, got {other:?}"
            ))),
            Some(value) => Ok(Some(Feedback::from_json(&value))),
        }
    }
}
