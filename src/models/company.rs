use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct LogoMeta {
    pub url: String,
    pub file_name: Option<String>,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Company {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Normalized lowercase key, unique across the collection.
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub logo: Option<LogoMeta>,
    /// Always contains `created_by`.
    pub recruiters: Vec<ObjectId>,
    pub created_by: ObjectId,
    pub status: ModerationStatus,
    /// `true` implies `status == Approved`.
    pub verified: bool,
    pub verified_by: Option<ObjectId>,
    pub verified_at: Option<DateTime>,
    pub is_deleted: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Company {
    pub fn normalize_name(raw: &str) -> String {
        raw.trim().to_lowercase()
    }
}

/// `$set` fields for an admin approve/reject transition.
pub fn moderation_update(approve: bool, admin_id: ObjectId) -> Document {
    let status = if approve {
        ModerationStatus::Approved
    } else {
        ModerationStatus::Rejected
    };
    doc! {
        "status": status.as_str(),
        "verified": approve,
        "verified_by": admin_id,
        "verified_at": DateTime::now(),
        "updated_at": DateTime::now(),
    }
}

/// `$set` fields forcing a re-review after an owner edit. Merged into every
/// recruiter-initiated update, whatever the payload said.
pub fn resubmit_reset() -> Document {
    doc! {
        "status": ModerationStatus::Pending.as_str(),
        "verified": false,
        "verified_by": mongodb::bson::Bson::Null,
        "verified_at": mongodb::bson::Bson::Null,
        "updated_at": DateTime::now(),
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateCompanyDto {
    pub name: String,
    pub description: String,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub logo: Option<LogoMeta>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateCompanyDto {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub logo: Option<LogoMeta>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct CompanyResponse {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub logo: Option<LogoMeta>,
    pub status: String,
    pub verified: bool,
    pub recruiters: Vec<String>,
    pub created_by: String,
}

impl From<Company> for CompanyResponse {
    fn from(company: Company) -> Self {
        CompanyResponse {
            id: company.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: company.name,
            display_name: company.display_name,
            description: company.description,
            location: company.location,
            industry: company.industry,
            website: company.website,
            logo: company.logo,
            status: company.status.as_str().to_string(),
            verified: company.verified,
            recruiters: company.recruiters.iter().map(|id| id.to_hex()).collect(),
            created_by: company.created_by.to_hex(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::Bson;

    #[test]
    fn approve_sets_verified_and_verifier() {
        let admin = ObjectId::new();
        let update = moderation_update(true, admin);
        assert_eq!(update.get_str("status").unwrap(), "approved");
        assert_eq!(update.get_bool("verified").unwrap(), true);
        assert_eq!(update.get_object_id("verified_by").unwrap(), admin);
        assert!(update.get_datetime("verified_at").is_ok());
    }

    #[test]
    fn reject_clears_verified_but_records_verifier() {
        let admin = ObjectId::new();
        let update = moderation_update(false, admin);
        assert_eq!(update.get_str("status").unwrap(), "rejected");
        assert_eq!(update.get_bool("verified").unwrap(), false);
        assert_eq!(update.get_object_id("verified_by").unwrap(), admin);
    }

    #[test]
    fn resubmit_clears_all_verification_fields() {
        let update = resubmit_reset();
        assert_eq!(update.get_str("status").unwrap(), "pending");
        assert_eq!(update.get_bool("verified").unwrap(), false);
        assert_eq!(update.get("verified_by"), Some(&Bson::Null));
        assert_eq!(update.get("verified_at"), Some(&Bson::Null));
    }

    #[test]
    fn name_normalization_is_lowercase_trimmed() {
        assert_eq!(Company::normalize_name("  Acme Corp "), "acme corp");
    }
}
