use rocket::request::{self, FromRequest, Request, Outcome};
use rocket::http::Status;
use rocket::State;
use mongodb::bson::{doc, oid::ObjectId};

use crate::db::DbConn;
use crate::models::{Role, User};

// === OpenAPI (compatible with rocket_okapi 0.8.0 / 0.8.1) ===
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use rocket_okapi::r#gen::OpenApiGenerator;

/// Resolved caller identity. Verifies the bearer token, then loads the user
/// record so a suspended or soft-deleted account is rejected here, on its
/// next request, not merely hidden from listings.
pub struct AuthGuard {
    pub user_id: ObjectId,
    pub role: Role,
    pub name: String,
    pub email: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let token = match req.headers().get_one("Authorization") {
            Some(t) => t.trim_start_matches("Bearer "),
            None => return Outcome::Error((Status::Unauthorized, ())),
        };

        let claims = match crate::services::JwtService::verify_token(token) {
            Ok(claims) => claims,
            Err(_) => return Outcome::Error((Status::Unauthorized, ())),
        };

        let user_id = match ObjectId::parse_str(&claims.sub) {
            Ok(id) => id,
            Err(_) => return Outcome::Error((Status::Unauthorized, ())),
        };

        let db = match req.guard::<&State<DbConn>>().await {
            Outcome::Success(db) => db,
            _ => return Outcome::Error((Status::InternalServerError, ())),
        };

        let user = db
            .collection::<User>("users")
            .find_one(doc! { "_id": user_id }, None)
            .await;

        match user {
            Ok(Some(user)) if user.is_active() => Outcome::Success(AuthGuard {
                user_id,
                role: user.role,
                name: user.name,
                email: user.email,
            }),
            // Deleted/suspended accounts fail authentication, not authorization
            Ok(_) => Outcome::Error((Status::Unauthorized, ())),
            Err(e) => {
                error!("auth guard lookup failed: {}", e);
                Outcome::Error((Status::InternalServerError, ()))
            }
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for AuthGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}
