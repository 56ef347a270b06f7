#[macro_use]
extern crate rocket;
#[macro_use]
extern crate log;

mod config;
mod db;
mod guards;
mod models;
mod pipeline;
mod routes;
mod services;
mod utils;

use dotenvy::dotenv;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::fs::FileServer;
use rocket::http::Header;
use rocket::{Build, Request, Response, Rocket};
use rocket_okapi::openapi_get_routes;
use rocket_okapi::swagger_ui::{make_swagger_ui, SwaggerUIConfig};

/* ----------------------------- CORS ----------------------------- */

pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        if let Some(origin) = request.headers().get_one("Origin") {
            response.set_header(Header::new("Access-Control-Allow-Origin", origin));
        }

        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, DELETE, OPTIONS",
        ));

        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization",
        ));

        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

/* ----------------------------- OPTIONS ----------------------------- */

#[options("/<_..>")]
fn options_handler() {}

/* ----------------------------- ERRORS ----------------------------- */

#[catch(401)]
fn unauthorized() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Authentication required"
    })
}

#[catch(403)]
fn forbidden() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "You do not have permission to access this resource"
    })
}

#[catch(422)]
fn unprocessable_entity() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Invalid request payload"
    })
}

#[catch(404)]
fn not_found() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Resource not found (check /api/v1 prefix)"
    })
}

#[catch(500)]
fn internal_error() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": "Internal server error"
    })
}

/* ----------------------------- SWAGGER ----------------------------- */

fn swagger_config() -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: "/api/v1/openapi.json".to_string(),
        ..Default::default()
    }
}

/* ----------------------------- LAUNCH ----------------------------- */

#[launch]
fn rocket() -> Rocket<Build> {
    dotenv().ok();
    env_logger::init();

    info!("Job portal API starting");
    info!("Swagger UI → http://localhost:8000/api/docs");

    rocket::build()
        .attach(db::init())
        .attach(CORS)
        .mount("/", routes![options_handler])
        .mount(
            "/api/v1",
            openapi_get_routes![
                // Candidate
                routes::auth::register_candidate,
                routes::auth::login_candidate,
                routes::auth::get_profile,
                routes::auth::update_profile,
                routes::auth::delete_profile,
                routes::auth::add_to_wishlist,
                routes::auth::remove_from_wishlist,
                // Recruiter
                routes::recruiter::register_recruiter,
                routes::recruiter::login_recruiter,
                routes::recruiter::get_recruiter_profile,
                routes::recruiter::update_recruiter_profile,
                routes::recruiter::delete_recruiter_profile,
                // Company
                routes::company::create_company,
                routes::company::get_my_company,
                routes::company::update_my_company,
                routes::company::list_approved_companies,
                routes::company::list_all_companies,
                routes::company::approve_company,
                routes::company::reject_company,
                routes::company::soft_delete_company,
                routes::company::get_company_by_id,
                // Job
                routes::job::get_all_jobs,
                routes::job::get_job_by_id,
                routes::job::create_job,
                routes::job::update_job,
                routes::job::soft_delete_job,
                routes::job::get_jobs_by_recruiter,
                routes::job::get_all_jobs_admin,
                routes::job::get_job_stats,
                routes::job::verify_job,
                // Application
                routes::application::apply_to_job,
                routes::application::get_my_applications,
                routes::application::withdraw_application,
                routes::application::get_applications_for_job,
                routes::application::get_application_by_id,
                routes::application::update_application_status,
                routes::application::delete_application,
                // Admin user management
                routes::admin::get_all_users,
                routes::admin::get_user_by_id,
                routes::admin::update_user,
                routes::admin::suspend_user,
                routes::admin::unsuspend_user,
                routes::admin::soft_delete_user,
                // Uploads
                routes::upload::upload_resume,
                routes::upload::upload_profile_pic,
                routes::upload::upload_company_logo,
            ],
        )
        .mount("/uploads", FileServer::from(config::Config::upload_dir()))
        .mount("/api/docs", make_swagger_ui(&swagger_config()))
        .register(
            "/",
            catchers![
                unauthorized,
                forbidden,
                not_found,
                unprocessable_entity,
                internal_error
            ],
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_payload_catcher_keeps_the_envelope() {
        let body = unprocessable_entity();
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("Invalid"));
    }

    #[test]
    fn error_catchers_never_claim_success() {
        for body in [unauthorized(), forbidden(), not_found(), internal_error()] {
            assert_eq!(body["success"], false);
            assert!(!body["message"].as_str().unwrap().is_empty());
        }
    }
}
