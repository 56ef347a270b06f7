use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Candidate,
    Recruiter,
    Admin,
}

impl Role {
    /// Pure capability check behind every role-gated route.
    pub fn allowed(self, allowed: &[Role]) -> bool {
        allowed.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Candidate => "candidate",
            Role::Recruiter => "recruiter",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct ResumeMeta {
    pub url: String,
    pub file_name: String,
    pub file_type: String,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    /// Stored lowercased; uniqueness is enforced by a case-insensitive index.
    pub email: String,
    pub password: String,
    /// Immutable after registration.
    pub role: Role,
    pub company: Option<ObjectId>,
    pub resume: Option<ResumeMeta>,
    pub profile_pic: Option<String>,
    pub wishlist: Vec<ObjectId>,
    pub is_deleted: bool,
    pub is_suspended: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String, role: Role) -> Self {
        User {
            id: None,
            name,
            email: email.to_lowercase(),
            password: password_hash,
            role,
            company: None,
            resume: None,
            profile_pic: None,
            wishlist: Vec::new(),
            is_deleted: false,
            is_suspended: false,
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        }
    }

    /// A record the access guard will let back in.
    pub fn is_active(&self) -> bool {
        !self.is_deleted && !self.is_suspended
    }
}

/// `$addToSet` alone, nothing else in the update: adding a job that is
/// already saved must leave the document unmodified, which is how the
/// handler detects the duplicate via `modified_count`.
pub fn wishlist_add_update(job_id: ObjectId) -> Document {
    doc! { "$addToSet": { "wishlist": job_id } }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RegisterDto {
    pub name: String,
    pub email: String,
    pub password: String,
    pub profile_pic: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LoginDto {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateProfileDto {
    pub name: Option<String>,
    pub email: Option<String>,
    pub resume: Option<ResumeMeta>,
    pub profile_pic: Option<String>,
    pub wishlist: Option<Vec<String>>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Admin edit of another user. Role and password are deliberately absent.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AdminUpdateUserDto {
    pub name: Option<String>,
    pub resume: Option<ResumeMeta>,
    pub profile_pic: Option<String>,
    pub company: Option<String>,
    pub wishlist: Option<Vec<String>>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub company: Option<String>,
    pub resume: Option<ResumeMeta>,
    pub profile_pic: Option<String>,
    pub wishlist: Vec<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: user.name,
            email: user.email,
            role: user.role.as_str().to_string(),
            company: user.company.map(|id| id.to_hex()),
            resume: user.resume,
            profile_pic: user.profile_pic,
            wishlist: user.wishlist.iter().map(|id| id.to_hex()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_gate_truth_table() {
        assert!(Role::Admin.allowed(&[Role::Admin]));
        assert!(Role::Recruiter.allowed(&[Role::Admin, Role::Recruiter]));
        assert!(!Role::Candidate.allowed(&[Role::Admin, Role::Recruiter]));
        assert!(!Role::Recruiter.allowed(&[]));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Candidate).unwrap(), "\"candidate\"");
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn new_user_normalizes_email() {
        let user = User::new(
            "Ada".into(),
            "Ada@Example.COM".into(),
            "hash".into(),
            Role::Candidate,
        );
        assert_eq!(user.email, "ada@example.com");
        assert!(user.is_active());
    }

    #[test]
    fn wishlist_add_carries_no_other_mutation() {
        let job = ObjectId::new();
        let update = wishlist_add_update(job);
        let add = update.get_document("$addToSet").unwrap();
        assert_eq!(add.get_object_id("wishlist").unwrap(), job);
        // no $set alongside, or a duplicate add would still modify the
        // document and slip past the modified_count check
        assert_eq!(update.keys().count(), 1);
    }

    #[test]
    fn suspended_or_deleted_user_is_inactive() {
        let mut user = User::new("x".into(), "x@x.com".into(), "h".into(), Role::Recruiter);
        user.is_suspended = true;
        assert!(!user.is_active());
        user.is_suspended = false;
        user.is_deleted = true;
        assert!(!user.is_active());
    }
}
