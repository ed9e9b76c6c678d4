use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::token::Identity;
use crate::error::{AppError, AuthError};

/// The caller's verified identity, placed in the request extensions by `AuthMiddleware`.
///
/// Extraction fails with 401 when the middleware did not run for the route.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Identity>().cloned() {
            Some(identity) => ready(Ok(AuthenticatedUser(identity))),
            None => ready(Err(AppError::from(AuthError::MissingToken).into())),
        }
    }
}
