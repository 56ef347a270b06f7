use rocket::serde::json::Json;
use rocket::State;
use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use rocket_okapi::openapi;

use crate::db::DbConn;
use crate::guards::{AdminGuard, CandidateGuard, StaffGuard};
use crate::models::{
    Application, ApplicationResponse, ApplicationStatus, ApplyDto, Job, Role,
    UpdateApplicationStatusDto,
};
use crate::pipeline::{lookup, unwind_preserve};
use crate::utils::{is_duplicate_key_error, ApiError, ApiResponse};

async fn collect_applications(
    db: &DbConn,
    pipeline: Vec<Document>,
) -> Result<Vec<Document>, ApiError> {
    let mut cursor = db
        .collection::<Document>("applications")
        .aggregate(pipeline, None)
        .await
        .map_err(ApiError::db)?;

    let mut applications = Vec::new();
    while cursor.advance().await.map_err(ApiError::db)? {
        let app = cursor.deserialize_current().map_err(|e| {
            error!("application decode failed: {}", e);
            ApiError::internal_error("Database error")
        })?;
        applications.push(app);
    }
    Ok(applications)
}

/// Apply to a job. The resume in the payload is stored as a snapshot, so a
/// later profile change leaves past applications untouched. The unique
/// (job, candidate) index rejects double applications.
#[openapi(tag = "Application")]
#[post("/application/<job_id>", data = "<dto>")]
pub async fn apply_to_job(
    db: &State<DbConn>,
    guard: CandidateGuard,
    job_id: String,
    dto: Json<ApplyDto>,
) -> Result<Json<ApiResponse<ApplicationResponse>>, ApiError> {
    let job_oid = ObjectId::parse_str(&job_id).map_err(|_| ApiError::bad_request("Invalid job ID"))?;

    if dto.resume.url.trim().is_empty() {
        return Err(ApiError::bad_request("Resume is required to apply"));
    }

    let job = db
        .collection::<Job>("jobs")
        .find_one(
            doc! { "_id": job_oid, "is_deleted": false, "is_verified": true },
            None,
        )
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    if let Some(deadline) = job.deadline {
        if deadline < DateTime::now() {
            return Err(ApiError::bad_request("Application deadline has passed"));
        }
    }

    let mut application = Application {
        id: None,
        job: job_oid,
        candidate: guard.auth.user_id,
        resume: dto.resume.clone(),
        cover_letter: dto.cover_letter.clone(),
        status: ApplicationStatus::Applied,
        created_at: DateTime::now(),
        updated_at: DateTime::now(),
    };

    let result = db
        .collection::<Application>("applications")
        .insert_one(&application, None)
        .await
        .map_err(|e| {
            if is_duplicate_key_error(&e) {
                ApiError::conflict("You have already applied to this job")
            } else {
                ApiError::db(e)
            }
        })?;
    application.id = result.inserted_id.as_object_id();

    Ok(Json(ApiResponse::success_with_message(
        "Application submitted".to_string(),
        application.into(),
    )))
}

#[openapi(tag = "Application")]
#[get("/application/me")]
pub async fn get_my_applications(
    db: &State<DbConn>,
    guard: CandidateGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let pipeline = vec![
        doc! { "$match": { "candidate": guard.auth.user_id } },
        lookup("jobs", "job", "_id", "job"),
        unwind_preserve("job"),
        lookup("companies", "job.company", "_id", "company"),
        unwind_preserve("company"),
        doc! {
            "$project": {
                "status": 1,
                "resume": 1,
                "cover_letter": 1,
                "created_at": 1,
                "job": { "_id": 1, "title": 1, "location": 1, "job_type": 1, "salary": 1 },
                "company": { "display_name": 1, "logo": 1 },
            }
        },
        doc! { "$sort": { "created_at": -1 } },
    ];

    let applications = collect_applications(db, pipeline).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "count": applications.len(),
        "applications": applications,
    }))))
}

#[openapi(tag = "Application")]
#[put("/application/<application_id>/withdraw")]
pub async fn withdraw_application(
    db: &State<DbConn>,
    guard: CandidateGuard,
    application_id: String,
) -> Result<Json<ApiResponse<ApplicationResponse>>, ApiError> {
    let object_id = ObjectId::parse_str(&application_id)
        .map_err(|_| ApiError::bad_request("Invalid application ID"))?;

    let application = db
        .collection::<Application>("applications")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Application not found"))?;

    if application.candidate != guard.auth.user_id {
        return Err(ApiError::forbidden("You are not authorized to withdraw this application"));
    }
    if application.status == ApplicationStatus::Withdrawn {
        return Err(ApiError::bad_request("Application is already withdrawn"));
    }

    db.collection::<Application>("applications")
        .update_one(
            doc! { "_id": object_id },
            doc! { "$set": { "status": ApplicationStatus::Withdrawn.as_str(), "updated_at": DateTime::now() } },
            None,
        )
        .await
        .map_err(ApiError::db)?;

    let updated = db
        .collection::<Application>("applications")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Application not found"))?;

    Ok(Json(ApiResponse::success_with_message(
        "Application withdrawn".to_string(),
        updated.into(),
    )))
}

/// Applications received for one job. Admins see any job's applications;
/// a recruiter only their own postings'.
#[openapi(tag = "Application")]
#[get("/application/job/<job_id>")]
pub async fn get_applications_for_job(
    db: &State<DbConn>,
    guard: StaffGuard,
    job_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let auth = guard.auth;
    let job_oid = ObjectId::parse_str(&job_id).map_err(|_| ApiError::bad_request("Invalid job ID"))?;

    let job = db
        .collection::<Job>("jobs")
        .find_one(doc! { "_id": job_oid }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    if auth.role == Role::Recruiter && job.posted_by != auth.user_id {
        return Err(ApiError::forbidden("You are not authorized to view these applications"));
    }

    let pipeline = vec![
        doc! { "$match": { "job": job_oid } },
        lookup("users", "candidate", "_id", "candidate"),
        unwind_preserve("candidate"),
        doc! {
            "$project": {
                "status": 1,
                "resume": 1,
                "cover_letter": 1,
                "created_at": 1,
                "candidate": { "_id": 1, "name": 1, "email": 1, "profile_pic": 1 },
            }
        },
        doc! { "$sort": { "created_at": -1 } },
    ];

    let applications = collect_applications(db, pipeline).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "count": applications.len(),
        "applications": applications,
    }))))
}

#[openapi(tag = "Application")]
#[get("/application/<application_id>")]
pub async fn get_application_by_id(
    db: &State<DbConn>,
    guard: StaffGuard,
    application_id: String,
) -> Result<Json<ApiResponse<ApplicationResponse>>, ApiError> {
    let auth = guard.auth;
    let object_id = ObjectId::parse_str(&application_id)
        .map_err(|_| ApiError::bad_request("Invalid application ID"))?;

    let application = db
        .collection::<Application>("applications")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Application not found"))?;

    if auth.role == Role::Recruiter {
        let job = db
            .collection::<Job>("jobs")
            .find_one(doc! { "_id": application.job }, None)
            .await
            .map_err(ApiError::db)?
            .ok_or_else(|| ApiError::not_found("Job not found"))?;
        if job.posted_by != auth.user_id {
            return Err(ApiError::forbidden("You are not authorized to view this application"));
        }
    }

    Ok(Json(ApiResponse::success(application.into())))
}

/// Move an application through the review states. A withdrawn application
/// is out of the recruiter's hands, and "withdrawn" itself is something
/// only the candidate can do.
#[openapi(tag = "Application")]
#[put("/application/<application_id>/status", data = "<dto>")]
pub async fn update_application_status(
    db: &State<DbConn>,
    guard: StaffGuard,
    application_id: String,
    dto: Json<UpdateApplicationStatusDto>,
) -> Result<Json<ApiResponse<ApplicationResponse>>, ApiError> {
    let auth = guard.auth;
    let object_id = ObjectId::parse_str(&application_id)
        .map_err(|_| ApiError::bad_request("Invalid application ID"))?;

    if dto.status == ApplicationStatus::Withdrawn || dto.status == ApplicationStatus::Applied {
        return Err(ApiError::bad_request("Invalid status transition"));
    }

    let application = db
        .collection::<Application>("applications")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Application not found"))?;

    if auth.role == Role::Recruiter {
        let job = db
            .collection::<Job>("jobs")
            .find_one(doc! { "_id": application.job }, None)
            .await
            .map_err(ApiError::db)?
            .ok_or_else(|| ApiError::not_found("Job not found"))?;
        if job.posted_by != auth.user_id {
            return Err(ApiError::forbidden("You are not authorized to update this application"));
        }
    }

    if application.status == ApplicationStatus::Withdrawn {
        return Err(ApiError::bad_request("Cannot update a withdrawn application"));
    }

    db.collection::<Application>("applications")
        .update_one(
            doc! { "_id": object_id },
            doc! { "$set": { "status": dto.status.as_str(), "updated_at": DateTime::now() } },
            None,
        )
        .await
        .map_err(ApiError::db)?;

    let updated = db
        .collection::<Application>("applications")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Application not found"))?;

    Ok(Json(ApiResponse::success_with_message(
        "Application status updated".to_string(),
        updated.into(),
    )))
}

#[openapi(tag = "Application - Admin")]
#[delete("/application/<application_id>")]
pub async fn delete_application(
    db: &State<DbConn>,
    _guard: AdminGuard,
    application_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id = ObjectId::parse_str(&application_id)
        .map_err(|_| ApiError::bad_request("Invalid application ID"))?;

    let result = db
        .collection::<Application>("applications")
        .delete_one(doc! { "_id": object_id }, None)
        .await
        .map_err(ApiError::db)?;

    if result.deleted_count == 0 {
        return Err(ApiError::not_found("Application not found"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Application deleted"
    }))))
}
