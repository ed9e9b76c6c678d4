#![allow(dead_code)]

use actix_cors::Cors;
use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServerHandle, ServiceResponse};
use actix_web::http::{header, StatusCode};
use actix_web::middleware::Logger;
use actix_web::{rt, test, App, Error, HttpServer};
use serde_json::{json, Value};
use std::net::TcpListener;
use uuid::Uuid;

use taskhub::{AppState, Config};

pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "JWT_SECRET" => Some("integration_test_secret".to_string()),
        "BCRYPT_COST" => Some("4".to_string()),
        _ => None,
    })
    .expect("test config is valid")
}

pub fn test_state() -> AppState {
    AppState::in_memory(test_config())
}

pub async fn init_app(
    state: &AppState,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error> {
    let state = state.clone();
    test::init_service(
        App::new()
            .wrap(Logger::default())
            .configure(move |cfg| state.configure(cfg)),
    )
    .await
}

/// Serves `state` on a random local port. Stop it with `handle.stop(false)`.
pub fn spawn_server(state: &AppState) -> (u16, ServerHandle) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().expect("Listener has an address").port();

    let server_state = state.clone();
    let server = HttpServer::new(move || {
        let state = server_state.clone();
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(move |cfg| state.configure(cfg))
    })
    .workers(1)
    .listen(listener)
    .expect("Failed to listen")
    .run();
    let handle = server.handle();
    rt::spawn(server);
    (port, handle)
}

pub async fn send(
    app: &impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error>,
    req: test::TestRequest,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let req = match token {
        Some(token) => req.append_header((header::AUTHORIZATION, format!("Bearer {}", token))),
        None => req,
    };
    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|e| {
            panic!("Non-JSON body ({}): {}", e, String::from_utf8_lossy(&body))
        })
    };
    (status, json)
}

pub async fn register_and_login_user(
    app: &impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error>,
    email: &str,
    name: &str,
) -> TestUser {
    let password = "Password123!";
    let (status, body) = send(
        app,
        test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({ "email": email, "name": name, "password": password })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

    let (status, body) = send(
        app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": email, "password": password })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);

    TestUser {
        id: body["data"]["user"]["id"]
            .as_str()
            .and_then(|id| id.parse().ok())
            .expect("login returns the user id"),
        token: body["data"]["token"]
            .as_str()
            .expect("login returns a token")
            .to_string(),
    }
}

pub fn task_payload(title: &str, due_in_days: i64) -> Value {
    json!({
        "title": title,
        "description": "Test description",
        "dueDate": (chrono::Utc::now() + chrono::Duration::days(due_in_days)).to_rfc3339(),
        "priority": "HIGH"
    })
}

pub async fn create_task(
    app: &impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error>,
    user: &TestUser,
    payload: Value,
) -> Value {
    let (status, body) = send(
        app,
        test::TestRequest::post().uri("/api/tasks").set_json(payload),
        Some(&user.token),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    body["data"]["task"].clone()
}
