use rocket::serde::json::Json;
use rocket::State;
use mongodb::bson::{doc, oid::ObjectId, DateTime, Document};
use rocket_okapi::openapi;

use crate::db::DbConn;
use crate::guards::{AdminGuard, AuthGuard, RecruiterGuard, StaffGuard};
use crate::models::job::{verification_reset, verification_update};
use crate::models::{
    Company, CreateJobDto, Job, JobResponse, JobType, ModerationStatus, Role, UpdateJobDto, User,
    VerifyJobDto,
};
use crate::pipeline::job::{
    job_stats_pipeline, recruiter_jobs_pipeline, AdminJobListSpec, JobListQuery, PublicJobListSpec,
};
use crate::pipeline::run_paged;
use crate::utils::{ApiError, ApiResponse};

#[openapi(tag = "Job")]
#[get("/job/all?<query..>")]
pub async fn get_all_jobs(
    db: &State<DbConn>,
    query: JobListQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let spec = PublicJobListSpec::from(query);
    let page = run_paged(db, "jobs", spec.pipeline())
        .await
        .map_err(ApiError::db)?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "count": page.total,
        "jobs": page.items,
    }))))
}

#[openapi(tag = "Job")]
#[post("/job", data = "<dto>")]
pub async fn create_job(
    db: &State<DbConn>,
    guard: RecruiterGuard,
    dto: Json<CreateJobDto>,
) -> Result<Json<ApiResponse<JobResponse>>, ApiError> {
    let auth = guard.auth;

    if dto.title.trim().is_empty() || dto.description.trim().is_empty() || dto.location.trim().is_empty() {
        return Err(ApiError::bad_request("Title, description and location are required"));
    }
    if !dto.salary.is_valid() {
        return Err(ApiError::bad_request("Invalid salary range"));
    }

    let recruiter = db
        .collection::<User>("users")
        .find_one(doc! { "_id": auth.user_id }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Recruiter not found"))?;

    let company_id = recruiter.company.ok_or_else(|| {
        ApiError::forbidden("Recruiter must join a company before posting jobs")
    })?;

    let company = db
        .collection::<Company>("companies")
        .find_one(doc! { "_id": company_id, "is_deleted": false }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Company not found"))?;

    if company.status != ModerationStatus::Approved {
        return Err(ApiError::forbidden("Company must be approved before posting jobs"));
    }

    let mut job = Job {
        id: None,
        title: dto.title.clone(),
        description: dto.description.clone(),
        requirements: dto.requirements.clone(),
        skills: dto.skills.clone(),
        salary: dto.salary.clone(),
        location: dto.location.clone(),
        category: dto.category,
        job_type: dto.job_type.unwrap_or(JobType::FullTime),
        company: company_id,
        posted_by: auth.user_id,
        status: ModerationStatus::Pending,
        is_verified: false,
        verified_by: None,
        verified_at: None,
        is_deleted: false,
        deleted_at: None,
        deadline: dto.deadline.map(DateTime::from_chrono),
        created_at: DateTime::now(),
        updated_at: DateTime::now(),
    };

    let result = db
        .collection::<Job>("jobs")
        .insert_one(&job, None)
        .await
        .map_err(ApiError::db)?;
    job.id = result.inserted_id.as_object_id();

    Ok(Json(ApiResponse::success_with_message(
        "Job created successfully".to_string(),
        job.into(),
    )))
}

/// Edit a listing. A recruiter can only touch their own postings, and any
/// recruiter edit sends the job back to review; the payload has no way to
/// set verification fields directly.
#[openapi(tag = "Job")]
#[put("/job/<job_id>", data = "<dto>")]
pub async fn update_job(
    db: &State<DbConn>,
    guard: StaffGuard,
    job_id: String,
    dto: Json<UpdateJobDto>,
) -> Result<Json<ApiResponse<JobResponse>>, ApiError> {
    let auth = guard.auth;
    let object_id = ObjectId::parse_str(&job_id).map_err(|_| ApiError::bad_request("Invalid job ID"))?;

    let job = db
        .collection::<Job>("jobs")
        .find_one(doc! { "_id": object_id, "is_deleted": false }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    if auth.role == Role::Recruiter && job.posted_by != auth.user_id {
        return Err(ApiError::forbidden("You are not authorized to update this job"));
    }

    if let Some(ref salary) = dto.salary {
        if !salary.is_valid() {
            return Err(ApiError::bad_request("Invalid salary range"));
        }
    }

    let mut update_doc = if auth.role == Role::Recruiter {
        verification_reset()
    } else {
        doc! { "updated_at": DateTime::now() }
    };

    if let Some(ref title) = dto.title {
        update_doc.insert("title", title);
    }
    if let Some(ref description) = dto.description {
        update_doc.insert("description", description);
    }
    if let Some(ref requirements) = dto.requirements {
        update_doc.insert("requirements", requirements);
    }
    if let Some(ref skills) = dto.skills {
        update_doc.insert("skills", skills);
    }
    if let Some(ref salary) = dto.salary {
        update_doc.insert(
            "salary",
            mongodb::bson::to_bson(salary)
                .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?,
        );
    }
    if let Some(ref location) = dto.location {
        update_doc.insert("location", location);
    }
    if let Some(category) = dto.category {
        update_doc.insert(
            "category",
            mongodb::bson::to_bson(&category)
                .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?,
        );
    }
    if let Some(job_type) = dto.job_type {
        update_doc.insert(
            "job_type",
            mongodb::bson::to_bson(&job_type)
                .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?,
        );
    }
    if let Some(deadline) = dto.deadline {
        update_doc.insert("deadline", DateTime::from_chrono(deadline));
    }

    db.collection::<Job>("jobs")
        .update_one(doc! { "_id": object_id }, doc! { "$set": update_doc }, None)
        .await
        .map_err(ApiError::db)?;

    let updated = db
        .collection::<Job>("jobs")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    Ok(Json(ApiResponse::success_with_message(
        "Job updated successfully".to_string(),
        updated.into(),
    )))
}

#[openapi(tag = "Job")]
#[put("/job/<job_id>/soft-delete")]
pub async fn soft_delete_job(
    db: &State<DbConn>,
    guard: StaffGuard,
    job_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let auth = guard.auth;
    let object_id = ObjectId::parse_str(&job_id).map_err(|_| ApiError::bad_request("Invalid job ID"))?;

    let job = db
        .collection::<Job>("jobs")
        .find_one(doc! { "_id": object_id, "is_deleted": false }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    if auth.role == Role::Recruiter && job.posted_by != auth.user_id {
        return Err(ApiError::forbidden("You are not authorized to delete this job"));
    }

    db.collection::<Job>("jobs")
        .update_one(
            doc! { "_id": object_id },
            doc! {
                "$set": {
                    "is_deleted": true,
                    "deleted_at": DateTime::now(),
                    "updated_at": DateTime::now(),
                }
            },
            None,
        )
        .await
        .map_err(ApiError::db)?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Job deleted successfully"
    }))))
}

#[openapi(tag = "Job")]
#[get("/job/recruiter/me")]
pub async fn get_jobs_by_recruiter(
    db: &State<DbConn>,
    guard: RecruiterGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let pipeline = recruiter_jobs_pipeline(guard.auth.user_id);

    let mut cursor = db
        .collection::<Document>("jobs")
        .aggregate(pipeline, None)
        .await
        .map_err(ApiError::db)?;

    let mut jobs = Vec::new();
    while cursor.advance().await.map_err(ApiError::db)? {
        let job = cursor.deserialize_current().map_err(|e| {
            error!("job decode failed: {}", e);
            ApiError::internal_error("Database error")
        })?;
        jobs.push(job);
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "count": jobs.len(),
        "jobs": jobs,
    }))))
}

#[openapi(tag = "Job - Admin")]
#[get("/job/admin/all?<query..>")]
pub async fn get_all_jobs_admin(
    db: &State<DbConn>,
    _guard: AdminGuard,
    query: JobListQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let spec = AdminJobListSpec::from(query);
    let page = run_paged(db, "jobs", spec.pipeline())
        .await
        .map_err(ApiError::db)?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "count": page.total,
        "jobs": page.items,
    }))))
}

#[openapi(tag = "Job - Admin")]
#[get("/job/admin/stats")]
pub async fn get_job_stats(
    db: &State<DbConn>,
    _guard: AdminGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let mut cursor = db
        .collection::<Document>("jobs")
        .aggregate(job_stats_pipeline(), None)
        .await
        .map_err(ApiError::db)?;

    if !cursor.advance().await.map_err(ApiError::db)? {
        return Err(ApiError::internal_error("Stats query returned nothing"));
    }
    let stats = cursor.deserialize_current().map_err(|e| {
        error!("stats decode failed: {}", e);
        ApiError::internal_error("Database error")
    })?;

    let count = |key: &str| -> i64 {
        stats
            .get_array(key)
            .ok()
            .and_then(|arr| arr.first())
            .and_then(|entry| entry.as_document())
            .and_then(|d| {
                d.get_i64("count")
                    .or_else(|_| d.get_i32("count").map(i64::from))
                    .ok()
            })
            .unwrap_or(0)
    };

    Ok(Json(ApiResponse::success(serde_json::json!({
        "total_jobs": count("total"),
        "verified_jobs": count("verified"),
        "pending_jobs": count("pending"),
        "rejected_jobs": count("rejected"),
        "deleted_jobs": count("deleted"),
        "active_jobs": count("active"),
    }))))
}

/// Admin approve/reject. The update is conditional on the status read just
/// before, so concurrent moderation surfaces as a conflict instead of a
/// silent overwrite.
#[openapi(tag = "Job - Admin")]
#[put("/job/admin/<job_id>/verify", data = "<dto>")]
pub async fn verify_job(
    db: &State<DbConn>,
    guard: AdminGuard,
    job_id: String,
    dto: Json<VerifyJobDto>,
) -> Result<Json<ApiResponse<JobResponse>>, ApiError> {
    let object_id = ObjectId::parse_str(&job_id).map_err(|_| ApiError::bad_request("Invalid job ID"))?;

    let job = db
        .collection::<Job>("jobs")
        .find_one(doc! { "_id": object_id, "is_deleted": false }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    let result = db
        .collection::<Job>("jobs")
        .update_one(
            doc! { "_id": object_id, "status": job.status.as_str() },
            doc! { "$set": verification_update(dto.action, guard.auth.user_id) },
            None,
        )
        .await
        .map_err(ApiError::db)?;

    if result.matched_count == 0 {
        return Err(ApiError::conflict("Job was modified concurrently, retry"));
    }

    let updated = db
        .collection::<Job>("jobs")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    Ok(Json(ApiResponse::success_with_message(
        "Job verification updated".to_string(),
        updated.into(),
    )))
}

/// Public lookup. Unverified listings stay invisible to candidates and
/// anonymous callers; recruiters and admins can fetch them.
#[openapi(tag = "Job")]
#[get("/job/<job_id>")]
pub async fn get_job_by_id(
    db: &State<DbConn>,
    auth: Option<AuthGuard>,
    job_id: String,
) -> Result<Json<ApiResponse<JobResponse>>, ApiError> {
    let object_id = ObjectId::parse_str(&job_id).map_err(|_| ApiError::bad_request("Invalid job ID"))?;

    let mut filter = doc! { "_id": object_id, "is_deleted": false };
    let is_staff = matches!(
        auth.as_ref().map(|a| a.role),
        Some(Role::Recruiter) | Some(Role::Admin)
    );
    if !is_staff {
        filter.insert("is_verified", true);
    }

    let job = db
        .collection::<Job>("jobs")
        .find_one(filter, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    Ok(Json(ApiResponse::success(job.into())))
}
