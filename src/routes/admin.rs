use rocket::serde::json::Json;
use rocket::State;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use rocket_okapi::openapi;

use crate::db::DbConn;
use crate::guards::{AdminGuard, StaffGuard};
use crate::models::{AdminUpdateUserDto, User, UserResponse};
use crate::pipeline::run_paged;
use crate::pipeline::user::{UserListQuery, UserListSpec};
use crate::utils::{ApiError, ApiResponse};

#[openapi(tag = "Admin")]
#[get("/admin/users?<query..>")]
pub async fn get_all_users(
    db: &State<DbConn>,
    _guard: AdminGuard,
    query: UserListQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let spec = UserListSpec::from(query);
    let page = run_paged(db, "users", spec.pipeline())
        .await
        .map_err(ApiError::db)?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "count": page.total,
        "users": page.items,
    }))))
}

/// Single-user lookup. Recruiters get this too, to review an applicant's
/// profile; soft-deleted accounts read as gone.
#[openapi(tag = "Admin")]
#[get("/admin/users/<user_id>")]
pub async fn get_user_by_id(
    db: &State<DbConn>,
    _guard: StaffGuard,
    user_id: String,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let object_id =
        ObjectId::parse_str(&user_id).map_err(|_| ApiError::bad_request("Invalid user ID"))?;

    let user = db
        .collection::<User>("users")
        .find_one(doc! { "_id": object_id, "is_deleted": false }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::success(user.into())))
}

/// Admin edit of a user record. Role and password are deliberately absent
/// from the payload type, so neither can be changed here.
#[openapi(tag = "Admin")]
#[put("/admin/users/<user_id>", data = "<dto>")]
pub async fn update_user(
    db: &State<DbConn>,
    _guard: AdminGuard,
    user_id: String,
    dto: Json<AdminUpdateUserDto>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let object_id =
        ObjectId::parse_str(&user_id).map_err(|_| ApiError::bad_request("Invalid user ID"))?;

    db.collection::<User>("users")
        .find_one(doc! { "_id": object_id, "is_deleted": false }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let mut update_doc = doc! { "updated_at": DateTime::now() };
    if let Some(ref name) = dto.name {
        update_doc.insert("name", name);
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
    if let Some(ref company) = dto.company {
        let company_id = ObjectId::parse_str(company)
            .map_err(|_| ApiError::bad_request("Invalid company ID"))?;
        update_doc.insert("company", company_id);
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
        .update_one(doc! { "_id": object_id }, doc! { "$set": update_doc }, None)
        .await
        .map_err(ApiError::db)?;

    let updated = db
        .collection::<User>("users")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::success_with_message(
        "User updated".to_string(),
        updated.into(),
    )))
}

async fn set_suspended(
    db: &DbConn,
    user_id: &str,
    suspended: bool,
) -> Result<UserResponse, ApiError> {
    let object_id =
        ObjectId::parse_str(user_id).map_err(|_| ApiError::bad_request("Invalid user ID"))?;

    let result = db
        .collection::<User>("users")
        .update_one(
            doc! { "_id": object_id, "is_deleted": false },
            doc! { "$set": { "is_suspended": suspended, "updated_at": DateTime::now() } },
            None,
        )
        .await
        .map_err(ApiError::db)?;

    if result.matched_count == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    let user = db
        .collection::<User>("users")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(user.into())
}

#[openapi(tag = "Admin")]
#[put("/admin/users/<user_id>/suspend")]
pub async fn suspend_user(
    db: &State<DbConn>,
    _guard: AdminGuard,
    user_id: String,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = set_suspended(db, &user_id, true).await?;
    Ok(Json(ApiResponse::success_with_message(
        "User suspended".to_string(),
        user,
    )))
}

#[openapi(tag = "Admin")]
#[put("/admin/users/<user_id>/unsuspend")]
pub async fn unsuspend_user(
    db: &State<DbConn>,
    _guard: AdminGuard,
    user_id: String,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = set_suspended(db, &user_id, false).await?;
    Ok(Json(ApiResponse::success_with_message(
        "User unsuspended".to_string(),
        user,
    )))
}

#[openapi(tag = "Admin")]
#[put("/admin/users/<user_id>/soft-delete")]
pub async fn soft_delete_user(
    db: &State<DbConn>,
    _guard: AdminGuard,
    user_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id =
        ObjectId::parse_str(&user_id).map_err(|_| ApiError::bad_request("Invalid user ID"))?;

    let result = db
        .collection::<User>("users")
        .update_one(
            doc! { "_id": object_id, "is_deleted": false },
            doc! { "$set": { "is_deleted": true, "updated_at": DateTime::now() } },
            None,
        )
        .await
        .map_err(ApiError::db)?;

    if result.matched_count == 0 {
        return Err(ApiError::not_found("User not found"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "User marked as deleted"
    }))))
}
