use rocket::request::{self, Request, FromRequest, Outcome};
use rocket::http::Status;

use crate::guards::AuthGuard;
use crate::models::Role;

use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use rocket_okapi::r#gen::OpenApiGenerator;

/// Role-gated guards layered on `AuthGuard`. Authentication failures stay
/// 401; an authenticated caller with the wrong role gets 403, so the two
/// cases remain distinguishable.
macro_rules! role_guard {
    ($name:ident, $allowed:expr) => {
        pub struct $name {
            pub auth: AuthGuard,
        }

        #[rocket::async_trait]
        impl<'r> FromRequest<'r> for $name {
            type Error = ();

            async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
                match req.guard::<AuthGuard>().await {
                    Outcome::Success(auth) => {
                        if auth.role.allowed(&$allowed) {
                            Outcome::Success($name { auth })
                        } else {
                            Outcome::Error((Status::Forbidden, ()))
                        }
                    }
                    Outcome::Error(e) => Outcome::Error(e),
                    Outcome::Forward(f) => Outcome::Forward(f),
                }
            }
        }

        impl<'a> OpenApiFromRequest<'a> for $name {
            fn from_request_input(
                _gen: &mut OpenApiGenerator,
                _name: String,
                _required: bool,
            ) -> rocket_okapi::Result<RequestHeaderInput> {
                Ok(RequestHeaderInput::None)
            }
        }
    };
}

role_guard!(AdminGuard, [Role::Admin]);
role_guard!(RecruiterGuard, [Role::Recruiter]);
role_guard!(CandidateGuard, [Role::Candidate]);
role_guard!(StaffGuard, [Role::Admin, Role::Recruiter]);
