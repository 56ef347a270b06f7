use rocket::serde::json::Json;
use rocket::State;
use mongodb::bson::{doc, DateTime};
use rocket_okapi::openapi;

use crate::db::DbConn;
use crate::guards::RecruiterGuard;
use crate::models::{Company, CompanyResponse, LoginDto, RegisterDto, Role, UpdateProfileDto, User, UserResponse};
use crate::services::PasswordService;
use crate::utils::{is_duplicate_key_error, validate_email, ApiError, ApiResponse};

use super::auth::{login_user, register_user};

#[openapi(tag = "Recruiter")]
#[post("/recruiter/register", data = "<dto>")]
pub async fn register_recruiter(
    db: &State<DbConn>,
    dto: Json<RegisterDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let (user, token) = register_user(db, &dto, Role::Recruiter).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Registered successfully".to_string(),
        serde_json::json!({
            "token": token,
            "recruiter": UserResponse::from(user),
        }),
    )))
}

#[openapi(tag = "Recruiter")]
#[post("/recruiter/login", data = "<dto>")]
pub async fn login_recruiter(
    db: &State<DbConn>,
    dto: Json<LoginDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let (user, token) = login_user(db, &dto, Role::Recruiter).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Login successful".to_string(),
        serde_json::json!({
            "token": token,
            "recruiter": UserResponse::from(user),
        }),
    )))
}

#[openapi(tag = "Recruiter")]
#[get("/recruiter/profile")]
pub async fn get_recruiter_profile(
    db: &State<DbConn>,
    guard: RecruiterGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let user = db
        .collection::<User>("users")
        .find_one(doc! { "_id": guard.auth.user_id }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Recruiter not found"))?;

    // Linked company resolved inline; a dangling reference reads as null.
    let company = match user.company {
        Some(company_id) => db
            .collection::<Company>("companies")
            .find_one(doc! { "_id": company_id }, None)
            .await
            .map_err(ApiError::db)?
            .map(CompanyResponse::from),
        None => None,
    };

    let mut data = serde_json::to_value(UserResponse::from(user))
        .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?;
    data["company_profile"] = serde_json::json!(company);

    Ok(Json(ApiResponse::success(data)))
}

#[openapi(tag = "Recruiter")]
#[put("/recruiter/profile", data = "<dto>")]
pub async fn update_recruiter_profile(
    db: &State<DbConn>,
    guard: RecruiterGuard,
    dto: Json<UpdateProfileDto>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let auth = guard.auth;

    let user = db
        .collection::<User>("users")
        .find_one(doc! { "_id": auth.user_id }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Recruiter not found"))?;

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
    if let Some(ref profile_pic) = dto.profile_pic {
        update_doc.insert("profile_pic", profile_pic);
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
        .ok_or_else(|| ApiError::not_found("Recruiter not found"))?;

    Ok(Json(ApiResponse::success_with_message(
        "Profile updated".to_string(),
        updated.into(),
    )))
}

#[openapi(tag = "Recruiter")]
#[put("/recruiter/profile/delete")]
pub async fn delete_recruiter_profile(
    db: &State<DbConn>,
    guard: RecruiterGuard,
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
