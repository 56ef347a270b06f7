use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

use super::company::ModerationStatus;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    FullTime,
    PartTime,
    Internship,
    Contract,
}

impl Default for JobType {
    fn default() -> Self {
        JobType::FullTime
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
pub enum JobCategory {
    IT,
    Marketing,
    Design,
    Finance,
    Education,
    Healthcare,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct SalaryRange {
    pub min: i64,
    pub max: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "INR".to_string()
}

impl SalaryRange {
    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Job {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub skills: Vec<String>,
    pub salary: SalaryRange,
    pub location: String,
    pub category: Option<JobCategory>,
    pub job_type: JobType,
    /// Weak reference: the company may be soft-deleted later; listings
    /// resolve it to null rather than dropping the job.
    pub company: ObjectId,
    pub posted_by: ObjectId,
    pub status: ModerationStatus,
    /// `true` implies `status == Approved`.
    pub is_verified: bool,
    pub verified_by: Option<ObjectId>,
    pub verified_at: Option<DateTime>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime>,
    pub deadline: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum VerifyAction {
    Approve,
    Reject,
}

/// `$set` fields for an admin approve/reject on a job listing.
pub fn verification_update(action: VerifyAction, admin_id: ObjectId) -> Document {
    let (verified, status) = match action {
        VerifyAction::Approve => (true, ModerationStatus::Approved),
        VerifyAction::Reject => (false, ModerationStatus::Rejected),
    };
    doc! {
        "is_verified": verified,
        "status": status.as_str(),
        "verified_by": admin_id,
        "verified_at": DateTime::now(),
        "updated_at": DateTime::now(),
    }
}

/// `$set` fields forcing re-review after an owning recruiter edits a job.
pub fn verification_reset() -> Document {
    doc! {
        "is_verified": false,
        "status": ModerationStatus::Pending.as_str(),
        "verified_by": mongodb::bson::Bson::Null,
        "verified_at": mongodb::bson::Bson::Null,
        "updated_at": DateTime::now(),
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateJobDto {
    pub title: String,
    pub description: String,
    pub requirements: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub salary: SalaryRange,
    pub location: String,
    pub category: Option<JobCategory>,
    pub job_type: Option<JobType>,
    pub deadline: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateJobDto {
    pub title: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<Vec<String>>,
    pub skills: Option<Vec<String>>,
    pub salary: Option<SalaryRange>,
    pub location: Option<String>,
    pub category: Option<JobCategory>,
    pub job_type: Option<JobType>,
    pub deadline: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct VerifyJobDto {
    pub action: VerifyAction,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct JobResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub skills: Vec<String>,
    pub salary: SalaryRange,
    pub location: String,
    pub category: Option<JobCategory>,
    pub job_type: JobType,
    pub company: String,
    pub posted_by: String,
    pub status: String,
    pub is_verified: bool,
    pub deadline: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        JobResponse {
            id: job.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: job.title,
            description: job.description,
            requirements: job.requirements,
            skills: job.skills,
            salary: job.salary,
            location: job.location,
            category: job.category,
            job_type: job.job_type,
            company: job.company.to_hex(),
            posted_by: job.posted_by.to_hex(),
            status: job.status.as_str().to_string(),
            is_verified: job.is_verified,
            deadline: job.deadline.map(|d| d.to_chrono()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::Bson;

    #[test]
    fn salary_range_rejects_inverted_bounds() {
        let bad = SalaryRange { min: 50_000, max: 20_000, currency: "INR".into() };
        assert!(!bad.is_valid());
        let ok = SalaryRange { min: 20_000, max: 50_000, currency: "INR".into() };
        assert!(ok.is_valid());
        let flat = SalaryRange { min: 30_000, max: 30_000, currency: "INR".into() };
        assert!(flat.is_valid());
    }

    #[test]
    fn job_type_wire_format_is_kebab_case() {
        assert_eq!(serde_json::to_string(&JobType::FullTime).unwrap(), "\"full-time\"");
        assert_eq!(serde_json::to_string(&JobType::PartTime).unwrap(), "\"part-time\"");
        let parsed: JobType = serde_json::from_str("\"internship\"").unwrap();
        assert_eq!(parsed, JobType::Internship);
    }

    #[test]
    fn approve_action_sets_verified_state() {
        let admin = ObjectId::new();
        let update = verification_update(VerifyAction::Approve, admin);
        assert_eq!(update.get_bool("is_verified").unwrap(), true);
        assert_eq!(update.get_str("status").unwrap(), "approved");
        assert_eq!(update.get_object_id("verified_by").unwrap(), admin);
    }

    #[test]
    fn reject_action_clears_verified_flag() {
        let update = verification_update(VerifyAction::Reject, ObjectId::new());
        assert_eq!(update.get_bool("is_verified").unwrap(), false);
        assert_eq!(update.get_str("status").unwrap(), "rejected");
        assert!(update.get_datetime("verified_at").is_ok());
    }

    #[test]
    fn recruiter_edit_always_resets_verification() {
        let update = verification_reset();
        assert_eq!(update.get_bool("is_verified").unwrap(), false);
        assert_eq!(update.get_str("status").unwrap(), "pending");
        assert_eq!(update.get("verified_by"), Some(&Bson::Null));
    }
}
