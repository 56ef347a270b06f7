use rocket::serde::json::Json;
use rocket::State;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use rocket_okapi::openapi;

use crate::db::DbConn;
use crate::guards::{AuthGuard, CandidateGuard};
use crate::models::user::wishlist_add_update;
use crate::models::{Job, JobResponse, LoginDto, RegisterDto, Role, UpdateProfileDto, User, UserResponse};
use crate::services::{JwtService, PasswordService};
use crate::utils::{is_duplicate_key_error, validate_email, ApiError, ApiResponse};

/// Registers a user with a fixed role. Shared by the candidate and
/// recruiter registration endpoints; the role never comes from the payload.
pub async fn register_user(
    db: &DbConn,
    dto: &RegisterDto,
    role: Role,
) -> Result<(User, String), ApiError> {
    if dto.name.trim().is_empty() {
        return Err(ApiError::bad_request("Please provide name"));
    }
    if !validate_email(&dto.email) {
        return Err(ApiError::bad_request("Please provide a valid email"));
    }
    if dto.password.is_empty() {
        return Err(ApiError::bad_request("Please provide password"));
    }

    let hashed = PasswordService::hash(&dto.password).map_err(|e| {
        error!("password hashing failed: {}", e);
        ApiError::internal_error("Registration failed")
    })?;

    let mut user = User::new(dto.name.clone(), dto.email.clone(), hashed, role);
    user.profile_pic = dto.profile_pic.clone();

    // The unique index decides; no check-then-insert race.
    let result = db
        .collection::<User>("users")
        .insert_one(&user, None)
        .await
        .map_err(|e| {
            if is_duplicate_key_error(&e) {
                ApiError::conflict("Email already in use")
            } else {
                ApiError::db(e)
            }
        })?;

    let id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::internal_error("Registration failed"))?;
    user.id = Some(id);

    let token = JwtService::generate_token(&id, role).map_err(|e| {
        error!("token generation failed: {}", e);
        ApiError::internal_error("Registration failed")
    })?;

    Ok((user, token))
}

pub async fn login_user(db: &DbConn, dto: &LoginDto, role: Role) -> Result<(User, String), ApiError> {
    let user = db
        .collection::<User>("users")
        .find_one(doc! { "email": dto.email.to_lowercase(), "role": role.as_str() }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !PasswordService::verify(&dto.password, &user.password) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    if !user.is_active() {
        return Err(ApiError::unauthorized("Account inactive"));
    }

    let id = user.id.ok_or_else(|| ApiError::internal_error("Login failed"))?;
    let token = JwtService::generate_token(&id, user.role).map_err(|e| {
        error!("token generation failed: {}", e);
        ApiError::internal_error("Login failed")
    })?;

    Ok((user, token))
}

#[openapi(tag = "Candidate")]
#[post("/candidate/register", data = "<dto>")]
pub async fn register_candidate(
    db: &State<DbConn>,
    dto: Json<RegisterDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let (user, token) = register_user(db, &dto, Role::Candidate).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Registered successfully".to_string(),
        serde_json::json!({
            "token": token,
            "candidate": UserResponse::from(user),
        }),
    )))
}

#[openapi(tag = "Candidate")]
#[post("/candidate/login", data = "<dto>")]
pub async fn login_candidate(
    db: &State<DbConn>,
    dto: Json<LoginDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let (user, token) = login_user(db, &dto, Role::Candidate).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Login successful".to_string(),
        serde_json::json!({
            "token": token,
            "candidate": UserResponse::from(user),
        }),
    )))
}

#[openapi(tag = "Candidate")]
#[get("/candidate/profile")]
pub async fn get_profile(
    db: &State<DbConn>,
    auth: AuthGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let user = db
        .collection::<User>("users")
        .find_one(doc! { "_id": auth.user_id }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    // Resolve wishlist references; jobs deleted since they were saved
    // simply drop out.
    let mut wishlist_jobs = Vec::new();
    if !user.wishlist.is_empty() {
        let mut cursor = db
            .collection::<Job>("jobs")
            .find(doc! { "_id": { "$in": &user.wishlist }, "is_deleted": false }, None)
            .await
            .map_err(ApiError::db)?;
        while cursor.advance().await.map_err(ApiError::db)? {
            let job = cursor.deserialize_current().map_err(|e| {
                error!("wishlist job decode failed: {}", e);
                ApiError::internal_error("Database error")
            })?;
            wishlist_jobs.push(JobResponse::from(job));
        }
    }

    let mut data = serde_json::to_value(UserResponse::from(user))
        .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?;
    data["wishlist_jobs"] = serde_json::json!(wishlist_jobs);

    Ok(Json(ApiResponse::success(data)))
}

#[openapi(tag = "Candidate")]
#[put("/candidate/profile", data = "<dto>")]
pub async fn update_profile(
    db: &State<DbConn>,
    guard: CandidateGuard,
    dto: Json<UpdateProfileDto>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let auth = guard.auth;

    let user = db
        .collection::<User>("users")
        .find_one(doc! { "_id": auth.user_id }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let mut update_doc = doc! { "updated_at": DateTime::now() };

    if let Some(ref new_password) = dto.new_password {
        let current = dto
            .current_password
            .as_deref()
            .ok_or_else(|| ApiError::bad_request("Current password is required to change password"))?;
        if !PasswordService::verify(current, &user.password) {
            return Err(ApiError::unauthorized("Current password is incorrect"));
        }
        let hashed = PasswordService::hash(new_password).map_err(|e| {
            error!("password hashing failed: {}", e);
            ApiError::internal_error("Profile update failed")
        })?;
        update_doc.insert("password", hashed);
    }

    if let Some(ref name) = dto.name {
        update_doc.insert("name", name);
    }
    if let Some(ref email) = dto.email {
        if !validate_email(email) {
            return Err(ApiError::bad_request("Please provide a valid email"));
        }
        update_doc.insert("email", email.to_lowercase());
    }
    if let Some(ref resume) = dto.resume {
        update_doc.insert(
            "resume",
            mongodb::bson::to_bson(resume)
                .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?,
        );
    }
    if let Some(ref profile_pic) = dto.profile_pic {
        update_doc.insert("profile_pic", profile_pic);
    }
    if let Some(ref wishlist) = dto.wishlist {
        let ids = wishlist
            .iter()
            .map(|raw| ObjectId::parse_str(raw))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ApiError::bad_request("Invalid job ID in wishlist"))?;
        update_doc.insert("wishlist", ids);
    }

    db.collection::<User>("users")
        .update_one(doc! { "_id": auth.user_id }, doc! { "$set": update_doc }, None)
        .await
        .map_err(|e| {
            if is_duplicate_key_error(&e) {
                ApiError::conflict("Email already in use")
            } else {
                ApiError::db(e)
            }
        })?;

    let updated = db
        .collection::<User>("users")
        .find_one(doc! { "_id": auth.user_id }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::success_with_message(
        "Profile updated successfully".to_string(),
        updated.into(),
    )))
}

#[openapi(tag = "Candidate")]
#[put("/candidate/profile/delete")]
pub async fn delete_profile(
    db: &State<DbConn>,
    guard: CandidateGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    db.collection::<User>("users")
        .update_one(
            doc! { "_id": guard.auth.user_id },
            doc! { "$set": { "is_deleted": true, "updated_at": DateTime::now() } },
            None,
        )
        .await
        .map_err(ApiError::db)?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Profile marked as deleted"
    }))))
}

#[openapi(tag = "Candidate")]
#[post("/candidate/wishlist/<job_id>")]
pub async fn add_to_wishlist(
    db: &State<DbConn>,
    guard: CandidateGuard,
    job_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let job_oid = ObjectId::parse_str(&job_id).map_err(|_| ApiError::bad_request("Invalid job ID"))?;

    db.collection::<Job>("jobs")
        .find_one(doc! { "_id": job_oid, "is_deleted": false }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    // $addToSet only: any other field in the update would make a duplicate
    // add count as a modification.
    let result = db
        .collection::<User>("users")
        .update_one(
            doc! { "_id": guard.auth.user_id },
            wishlist_add_update(job_oid),
            None,
        )
        .await
        .map_err(ApiError::db)?;

    if result.modified_count == 0 {
        return Err(ApiError::bad_request("Job already in wishlist"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Job added to wishlist"
    }))))
}

#[openapi(tag = "Candidate")]
#[delete("/candidate/wishlist/<job_id>")]
pub async fn remove_from_wishlist(
    db: &State<DbConn>,
    guard: CandidateGuard,
    job_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let job_oid = ObjectId::parse_str(&job_id).map_err(|_| ApiError::bad_request("Invalid job ID"))?;

    db.collection::<User>("users")
        .update_one(
            doc! { "_id": guard.auth.user_id },
            doc! { "$pull": { "wishlist": job_oid }, "$set": { "updated_at": DateTime::now() } },
            None,
        )
        .await
        .map_err(ApiError::db)?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Job removed from wishlist"
    }))))
}
