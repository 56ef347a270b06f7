use rocket::serde::json::Json;
use rocket::State;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use rocket_okapi::openapi;

use crate::db::DbConn;
use crate::guards::{AdminGuard, AuthGuard, RecruiterGuard};
use crate::models::company::{moderation_update, resubmit_reset};
use crate::models::{Company, CompanyResponse, CreateCompanyDto, ModerationStatus, UpdateCompanyDto, User};
use crate::pipeline::company::{CompanyListQuery, CompanyListSpec};
use crate::pipeline::run_paged;
use crate::utils::{is_duplicate_key_error, ApiError, ApiResponse};

/// Create a company request, or join an existing one when the normalized
/// name already exists. Either way the caller ends up linked.
#[openapi(tag = "Company")]
#[post("/company", data = "<dto>")]
pub async fn create_company(
    db: &State<DbConn>,
    guard: RecruiterGuard,
    dto: Json<CreateCompanyDto>,
) -> Result<Json<ApiResponse<CompanyResponse>>, ApiError> {
    let auth = guard.auth;
    let normalized = Company::normalize_name(&dto.name);
    if normalized.is_empty() {
        return Err(ApiError::bad_request("Please provide a company name"));
    }

    if let Some(existing) = db
        .collection::<Company>("companies")
        .find_one(doc! { "name": &normalized, "is_deleted": false }, None)
        .await
        .map_err(ApiError::db)?
    {
        let company_id = existing
            .id
            .ok_or_else(|| ApiError::internal_error("Company request failed"))?;

        if existing.recruiters.contains(&auth.user_id) {
            return Ok(Json(ApiResponse::success_with_message(
                "You are already linked to this company".to_string(),
                existing.into(),
            )));
        }

        db.collection::<Company>("companies")
            .update_one(
                doc! { "_id": company_id },
                doc! {
                    "$addToSet": { "recruiters": auth.user_id },
                    "$set": { "updated_at": DateTime::now() },
                },
                None,
            )
            .await
            .map_err(ApiError::db)?;

        link_recruiter(db, auth.user_id, company_id).await?;

        let linked = db
            .collection::<Company>("companies")
            .find_one(doc! { "_id": company_id }, None)
            .await
            .map_err(ApiError::db)?
            .ok_or_else(|| ApiError::not_found("Company not found"))?;

        return Ok(Json(ApiResponse::success_with_message(
            "You have been linked to the company".to_string(),
            linked.into(),
        )));
    }

    let mut company = Company {
        id: None,
        name: normalized,
        display_name: dto.name.trim().to_string(),
        description: dto.description.clone(),
        location: dto.location.clone(),
        industry: dto.industry.clone(),
        website: dto.website.clone(),
        logo: dto.logo.clone(),
        recruiters: vec![auth.user_id],
        created_by: auth.user_id,
        status: ModerationStatus::Pending,
        verified: false,
        verified_by: None,
        verified_at: None,
        is_deleted: false,
        created_at: DateTime::now(),
        updated_at: DateTime::now(),
    };

    let result = db
        .collection::<Company>("companies")
        .insert_one(&company, None)
        .await
        .map_err(|e| {
            if is_duplicate_key_error(&e) {
                ApiError::conflict("Company name already taken")
            } else {
                ApiError::db(e)
            }
        })?;

    let company_id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::internal_error("Company request failed"))?;
    company.id = Some(company_id);

    link_recruiter(db, auth.user_id, company_id).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Company request submitted".to_string(),
        company.into(),
    )))
}

async fn link_recruiter(db: &DbConn, user_id: ObjectId, company_id: ObjectId) -> Result<(), ApiError> {
    db.collection::<User>("users")
        .update_one(
            doc! { "_id": user_id },
            doc! { "$set": { "company": company_id, "updated_at": DateTime::now() } },
            None,
        )
        .await
        .map_err(ApiError::db)?;
    Ok(())
}

#[openapi(tag = "Company")]
#[get("/company/me")]
pub async fn get_my_company(
    db: &State<DbConn>,
    guard: RecruiterGuard,
) -> Result<Json<ApiResponse<CompanyResponse>>, ApiError> {
    let user = db
        .collection::<User>("users")
        .find_one(doc! { "_id": guard.auth.user_id }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Recruiter not found"))?;

    let company_id = user
        .company
        .ok_or_else(|| ApiError::not_found("No company linked to this recruiter"))?;

    let company = db
        .collection::<Company>("companies")
        .find_one(doc! { "_id": company_id, "is_deleted": false }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Company not found"))?;

    Ok(Json(ApiResponse::success(company.into())))
}

/// Owner edit. Always sends the company back through review, whatever
/// fields changed.
#[openapi(tag = "Company")]
#[put("/company/me", data = "<dto>")]
pub async fn update_my_company(
    db: &State<DbConn>,
    guard: RecruiterGuard,
    dto: Json<UpdateCompanyDto>,
) -> Result<Json<ApiResponse<CompanyResponse>>, ApiError> {
    let auth = guard.auth;

    let user = db
        .collection::<User>("users")
        .find_one(doc! { "_id": auth.user_id }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Recruiter not found"))?;

    let company_id = user
        .company
        .ok_or_else(|| ApiError::not_found("No company linked to this recruiter"))?;

    let company = db
        .collection::<Company>("companies")
        .find_one(doc! { "_id": company_id, "is_deleted": false }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Company not found"))?;

    if company.created_by != auth.user_id {
        return Err(ApiError::forbidden("Only the company creator can edit it"));
    }

    let mut update_doc = resubmit_reset();
    if let Some(ref name) = dto.name {
        let normalized = Company::normalize_name(name);
        if normalized.is_empty() {
            return Err(ApiError::bad_request("Please provide a company name"));
        }
        update_doc.insert("name", normalized);
        update_doc.insert("display_name", name.trim());
    }
    if let Some(ref description) = dto.description {
        update_doc.insert("description", description);
    }
    if let Some(ref location) = dto.location {
        update_doc.insert("location", location);
    }
    if let Some(ref industry) = dto.industry {
        update_doc.insert("industry", industry);
    }
    if let Some(ref website) = dto.website {
        update_doc.insert("website", website);
    }
    if let Some(ref logo) = dto.logo {
        update_doc.insert(
            "logo",
            mongodb::bson::to_bson(logo)
                .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?,
        );
    }

    db.collection::<Company>("companies")
        .update_one(doc! { "_id": company_id }, doc! { "$set": update_doc }, None)
        .await
        .map_err(|e| {
            if is_duplicate_key_error(&e) {
                ApiError::conflict("Company name already taken")
            } else {
                ApiError::db(e)
            }
        })?;

    let updated = db
        .collection::<Company>("companies")
        .find_one(doc! { "_id": company_id }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Company not found"))?;

    Ok(Json(ApiResponse::success_with_message(
        "Company updated successfully".to_string(),
        updated.into(),
    )))
}

#[openapi(tag = "Company")]
#[get("/company/approved")]
pub async fn list_approved_companies(
    db: &State<DbConn>,
    _auth: AuthGuard,
) -> Result<Json<ApiResponse<Vec<CompanyResponse>>>, ApiError> {
    let mut cursor = db
        .collection::<Company>("companies")
        .find(doc! { "status": "approved", "is_deleted": false }, None)
        .await
        .map_err(ApiError::db)?;

    let mut companies = Vec::new();
    while cursor.advance().await.map_err(ApiError::db)? {
        let company = cursor.deserialize_current().map_err(|e| {
            error!("company decode failed: {}", e);
            ApiError::internal_error("Database error")
        })?;
        companies.push(CompanyResponse::from(company));
    }

    Ok(Json(ApiResponse::success(companies)))
}

#[openapi(tag = "Company")]
#[get("/company/admin/all?<query..>")]
pub async fn list_all_companies(
    db: &State<DbConn>,
    _guard: AdminGuard,
    query: CompanyListQuery,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let spec = CompanyListSpec::from(query);
    let page = run_paged(db, "companies", spec.pipeline())
        .await
        .map_err(ApiError::db)?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "count": page.total,
        "companies": page.items,
    }))))
}

#[openapi(tag = "Company")]
#[put("/company/<company_id>/approve")]
pub async fn approve_company(
    db: &State<DbConn>,
    guard: AdminGuard,
    company_id: String,
) -> Result<Json<ApiResponse<CompanyResponse>>, ApiError> {
    moderate_company(db, guard, company_id, true, "Company approved").await
}

#[openapi(tag = "Company")]
#[put("/company/<company_id>/reject")]
pub async fn reject_company(
    db: &State<DbConn>,
    guard: AdminGuard,
    company_id: String,
) -> Result<Json<ApiResponse<CompanyResponse>>, ApiError> {
    moderate_company(db, guard, company_id, false, "Company rejected").await
}

async fn moderate_company(
    db: &DbConn,
    guard: AdminGuard,
    company_id: String,
    approve: bool,
    message: &str,
) -> Result<Json<ApiResponse<CompanyResponse>>, ApiError> {
    let object_id =
        ObjectId::parse_str(&company_id).map_err(|_| ApiError::bad_request("Invalid company ID"))?;

    let company = db
        .collection::<Company>("companies")
        .find_one(doc! { "_id": object_id, "is_deleted": false }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Company not found"))?;

    // Conditional on the status we just read, so two concurrent admin
    // actions can't silently overwrite each other.
    let result = db
        .collection::<Company>("companies")
        .update_one(
            doc! { "_id": object_id, "status": company.status.as_str() },
            doc! { "$set": moderation_update(approve, guard.auth.user_id) },
            None,
        )
        .await
        .map_err(ApiError::db)?;

    if result.matched_count == 0 {
        return Err(ApiError::conflict("Company was modified concurrently, retry"));
    }

    let updated = db
        .collection::<Company>("companies")
        .find_one(doc! { "_id": object_id }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Company not found"))?;

    Ok(Json(ApiResponse::success_with_message(
        message.to_string(),
        updated.into(),
    )))
}

#[openapi(tag = "Company")]
#[put("/company/<company_id>/soft-delete")]
pub async fn soft_delete_company(
    db: &State<DbConn>,
    _guard: AdminGuard,
    company_id: String,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let object_id =
        ObjectId::parse_str(&company_id).map_err(|_| ApiError::bad_request("Invalid company ID"))?;

    let result = db
        .collection::<Company>("companies")
        .update_one(
            doc! { "_id": object_id },
            doc! { "$set": { "is_deleted": true, "updated_at": DateTime::now() } },
            None,
        )
        .await
        .map_err(ApiError::db)?;

    if result.matched_count == 0 {
        return Err(ApiError::not_found("Company not found"));
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Company deleted successfully"
    }))))
}

#[openapi(tag = "Company")]
#[get("/company/<company_id>")]
pub async fn get_company_by_id(
    db: &State<DbConn>,
    company_id: String,
) -> Result<Json<ApiResponse<CompanyResponse>>, ApiError> {
    let object_id =
        ObjectId::parse_str(&company_id).map_err(|_| ApiError::bad_request("Invalid company ID"))?;

    let company = db
        .collection::<Company>("companies")
        .find_one(doc! { "_id": object_id, "is_deleted": false }, None)
        .await
        .map_err(ApiError::db)?
        .ok_or_else(|| ApiError::not_found("Company not found"))?;

    Ok(Json(ApiResponse::success(company.into())))
}
