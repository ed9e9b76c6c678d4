use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::{get, post, web, HttpResponse};
use serde_json::json;
use validator::Validate;

use crate::auth::{AuthenticatedUser, TOKEN_COOKIE};
use crate::config::Config;
use crate::error::AppError;
use crate::models::{ApiResponse, LoginRequest, RegisterRequest};
use crate::services::AuthService;

fn session_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE, token)
        .path("/")
        .http_only(true)
        .secure(config.production)
        .same_site(if config.production {
            SameSite::None
        } else {
            SameSite::Lax
        })
        .max_age(time::Duration::days(config.token_ttl_days))
        .finish()
}

/// Register a new user
///
/// Creates a new account. The client logs in separately.
#[post("/register")]
pub async fn register(
    auth: web::Data<AuthService>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let user = auth
        .register(&body.email, &body.name, &body.password)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(json!({ "user": user }))))
}

/// Login user
///
/// Returns the user and a session token, and sets the token as an http-only cookie.
#[post("/login")]
pub async fn login(
    auth: web::Data<AuthService>,
    config: web::Data<Config>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let outcome = auth.login(&body.email, &body.password).await?;
    Ok(HttpResponse::Ok()
        .cookie(session_cookie(outcome.token.clone(), &config))
        .json(ApiResponse::ok(outcome)))
}

#[post("/logout")]
pub async fn logout(config: web::Data<Config>) -> HttpResponse {
    let mut cookie = session_cookie(String::new(), &config);
    cookie.make_removal();
    HttpResponse::Ok()
        .cookie(cookie)
        .json(ApiResponse::ok(json!({ "message": "Logged out successfully" })))
}

#[get("/me")]
pub async fn me(
    auth: web::Data<AuthService>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let user = auth.get_user_by_id(user.0.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "user": user }))))
}
