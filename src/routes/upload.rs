use rocket::fs::TempFile;
use rocket::serde::json::Json;
use rocket_okapi::openapi;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

use crate::config::Config;
use crate::guards::{AuthGuard, RecruiterGuard};
use crate::utils::{ApiError, ApiResponse};

fn extension_from_filename(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "application/pdf" => Some("pdf"),
        _ => None,
    }
}

fn is_image_extension(ext: &str) -> bool {
    matches!(ext, "jpg" | "jpeg" | "png" | "webp")
}

fn is_document_extension(ext: &str) -> bool {
    matches!(ext, "pdf" | "jpg" | "jpeg" | "png")
}

fn resolve_extension(file: &TempFile<'_>) -> Result<String, ApiError> {
    if let Some(ext) = file.name().and_then(extension_from_filename) {
        return Ok(ext);
    }
    if let Some(ct) = file.content_type() {
        if let Some(ext) = extension_from_content_type(&ct.to_string()) {
            return Ok(ext.to_string());
        }
    }
    Err(ApiError::bad_request(
        "Cannot determine file type from filename or content type",
    ))
}

/// Persists the uploaded file under `<upload_dir>/<folder>/` with a
/// uuid-based name; the original filename never touches the filesystem.
async fn store_file(
    file: &mut TempFile<'_>,
    folder: &str,
    extension: &str,
) -> Result<serde_json::Value, ApiError> {
    let dir = format!("{}/{}", Config::upload_dir(), folder);
    fs::create_dir_all(&dir).await.map_err(|e| {
        error!("upload dir creation failed: {}", e);
        ApiError::internal_error("File upload failed")
    })?;

    let original_name = file.name().unwrap_or("file").to_string();
    let filename = format!("{}.{}", Uuid::new_v4(), extension);
    let filepath = format!("{}/{}", dir, filename);

    file.persist_to(&filepath).await.map_err(|e| {
        error!("file persist failed: {}", e);
        ApiError::internal_error("File upload failed")
    })?;

    Ok(serde_json::json!({
        "url": format!("/{}", filepath),
        "file_name": original_name,
        "file_type": extension,
        "uploaded_at": chrono::Utc::now(),
    }))
}

#[openapi(tag = "Upload")]
#[post("/upload/resume", data = "<file>")]
pub async fn upload_resume(
    _auth: AuthGuard,
    mut file: TempFile<'_>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let extension = resolve_extension(&file)?;
    if !is_document_extension(&extension) {
        return Err(ApiError::bad_request(
            "Only PDF, JPEG or PNG resumes are allowed",
        ));
    }

    let meta = store_file(&mut file, "resumes", &extension).await?;
    Ok(Json(ApiResponse::success_with_message(
        "Resume uploaded".to_string(),
        meta,
    )))
}

#[openapi(tag = "Upload")]
#[post("/upload/profile-pic", data = "<file>")]
pub async fn upload_profile_pic(
    _auth: AuthGuard,
    mut file: TempFile<'_>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let extension = resolve_extension(&file)?;
    if !is_image_extension(&extension) {
        return Err(ApiError::bad_request(
            "Only JPEG, PNG or WebP images are allowed",
        ));
    }

    let meta = store_file(&mut file, "profile-pics", &extension).await?;
    Ok(Json(ApiResponse::success_with_message(
        "Profile picture uploaded".to_string(),
        meta,
    )))
}

#[openapi(tag = "Upload")]
#[post("/upload/company-logo", data = "<file>")]
pub async fn upload_company_logo(
    _guard: RecruiterGuard,
    mut file: TempFile<'_>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let extension = resolve_extension(&file)?;
    if !is_image_extension(&extension) {
        return Err(ApiError::bad_request(
            "Only JPEG, PNG or WebP images are allowed",
        ));
    }

    let meta = store_file(&mut file, "logos", &extension).await?;
    Ok(Json(ApiResponse::success_with_message(
        "Company logo uploaded".to_string(),
        meta,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_extension_is_lowercased() {
        assert_eq!(extension_from_filename("CV.PDF").as_deref(), Some("pdf"));
        assert_eq!(extension_from_filename("photo.jpeg").as_deref(), Some("jpeg"));
        assert_eq!(extension_from_filename("noext"), None);
    }

    #[test]
    fn content_type_fallback_covers_the_accepted_types() {
        assert_eq!(extension_from_content_type("image/png"), Some("png"));
        assert_eq!(extension_from_content_type("application/pdf"), Some("pdf"));
        assert_eq!(extension_from_content_type("text/html"), None);
    }

    #[test]
    fn image_and_document_rules_differ_on_pdf_and_webp() {
        assert!(is_document_extension("pdf"));
        assert!(!is_image_extension("pdf"));
        assert!(is_image_extension("webp"));
        assert!(!is_document_extension("webp"));
    }
}
