use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

use super::user::ResumeMeta;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Applied,
    Withdrawn,
    #[serde(rename = "in review")]
    InReview,
    Shortlisted,
    Rejected,
    Hired,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Withdrawn => "withdrawn",
            ApplicationStatus::InReview => "in review",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Hired => "hired",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Application {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub job: ObjectId,
    pub candidate: ObjectId,
    /// Snapshot taken at apply time; later profile edits don't touch it.
    pub resume: ResumeMeta,
    pub cover_letter: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ApplyDto {
    pub resume: ResumeMeta,
    pub cover_letter: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateApplicationStatusDto {
    pub status: ApplicationStatus,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ApplicationResponse {
    pub id: String,
    pub job: String,
    pub candidate: String,
    pub resume: ResumeMeta,
    pub cover_letter: Option<String>,
    pub status: String,
}

impl From<Application> for ApplicationResponse {
    fn from(app: Application) -> Self {
        ApplicationResponse {
            id: app.id.map(|id| id.to_hex()).unwrap_or_default(),
            job: app.job.to_hex(),
            candidate: app.candidate.to_hex(),
            resume: app.resume,
            cover_letter: app.cover_letter,
            status: app.status.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_review_keeps_its_spaced_wire_format() {
        assert_eq!(
            serde_json::to_string(&ApplicationStatus::InReview).unwrap(),
            "\"in review\""
        );
        let parsed: ApplicationStatus = serde_json::from_str("\"in review\"").unwrap();
        assert_eq!(parsed, ApplicationStatus::InReview);
    }

    #[test]
    fn unknown_status_fails_to_parse() {
        assert!(serde_json::from_str::<ApplicationStatus>("\"archived\"").is_err());
    }
}
