use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument};

use crate::{
    auth::{
        dto::{
            ErrorResponse, LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest,
            UserEnvelope,
        },
        extractors::{AdminUser, AppJson, AuthUser},
        repo_types::{PublicUser, UserStats},
    },
    errors::AppError,
    state::AppState,
};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::NotFound => (StatusCode::NOT_FOUND, "User not found".to_string()),
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
            }
            AppError::Token(_) => (
                StatusCode::UNAUTHORIZED,
                "Invalid or expired token".to_string(),
            ),
            AppError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "Missing or invalid Authorization header".to_string(),
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Admin access required".to_string()),
            AppError::Hashing(_) | AppError::Signing(_) => {
                error!(error = %self, "internal auth failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/users", get(list_users))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/stats", get(get_stats))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserEnvelope>), AppError> {
    let user = state.auth.register_user(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserEnvelope {
            message: "User registered successfully",
            user,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    Ok(Json(state.auth.login(payload).await?))
}

#[instrument(skip_all, fields(user_id = claim.subject_id))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(claim): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    Ok(Json(state.auth.get_profile(claim.subject_id).await?))
}

#[instrument(skip_all, fields(user_id = claim.subject_id))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(claim): AuthUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<UserEnvelope>, AppError> {
    let user = state.auth.update_profile(claim.subject_id, payload).await?;
    Ok(Json(UserEnvelope {
        message: "Profile updated successfully",
        user,
    }))
}

#[instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(_claim): AuthUser,
) -> Json<Vec<PublicUser>> {
    Json(state.auth.list_users().await)
}

#[instrument(skip_all)]
pub async fn get_stats(
    State(state): State<AppState>,
    AdminUser(_claim): AdminUser,
) -> Json<UserStats> {
    Json(state.auth.get_stats().await)
}

#[cfg(test)]
mod tests {
    use crate::{app::build_app, auth::dto::RegisterRequest, state::AppState};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register_and_login(app: &Router, email: &str, username: &str) -> String {
        let (status, _) = call(
            app,
            Method::POST,
            "/api/register",
            None,
            Some(json!({"email": email, "username": username, "password": "pw123456"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = call(
            app,
            Method::POST,
            "/api/login",
            None,
            Some(json!({"email": email, "password": "pw123456"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn register_returns_user_without_credentials() {
        let app = build_app(AppState::fake());
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/register",
            None,
            Some(json!({
                "email": "a@x.com",
                "username": "alice",
                "password": "pw123456",
                "full_name": "Alice"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["email"], "a@x.com");
        assert_eq!(body["user"]["role"], "user");
        assert!(body["user"].get("password_hash").is_none());
        assert!(body["user"].get("password").is_none());
    }

    #[tokio::test]
    async fn register_maps_conflict_and_validation() {
        let app = build_app(AppState::fake());
        register_and_login(&app, "a@x.com", "alice").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/register",
            None,
            Some(json!({"email": "a@x.com", "username": "other", "password": "pw123456"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "email already exists");

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/register",
            None,
            Some(json!({"email": "bad", "username": "bob", "password": "pw123456"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unreadable_bodies_are_400_with_error_envelope() {
        let app = build_app(AppState::fake());

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/register",
            None,
            Some(json!({"email": "a@x.com", "username": "alice"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("password"));

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].is_string());

        let token = register_and_login(&app, "b@x.com", "bobby").await;
        let (status, body) = call(
            &app,
            Method::PUT,
            "/api/profile",
            Some(&token),
            Some(json!({"username": 42})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_are_both_401() {
        let app = build_app(AppState::fake());
        register_and_login(&app, "a@x.com", "alice").await;

        let (s1, b1) = call(
            &app,
            Method::POST,
            "/api/login",
            None,
            Some(json!({"email": "a@x.com", "password": "wrong-one"})),
        )
        .await;
        let (s2, b2) = call(
            &app,
            Method::POST,
            "/api/login",
            None,
            Some(json!({"email": "nobody@x.com", "password": "pw123456"})),
        )
        .await;
        assert_eq!(s1, StatusCode::UNAUTHORIZED);
        assert_eq!(s2, StatusCode::UNAUTHORIZED);
        assert_eq!(b1, b2);
    }

    #[tokio::test]
    async fn profile_requires_token_and_updates_partially() {
        let app = build_app(AppState::fake());
        let (status, _) = call(&app, Method::GET, "/api/profile", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, Method::GET, "/api/profile", Some("x.y.z"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = register_and_login(&app, "a@x.com", "alice").await;
        let (status, body) = call(&app, Method::GET, "/api/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice");

        let (status, body) = call(
            &app,
            Method::PUT,
            "/api/profile",
            Some(&token),
            Some(json!({"full_name": "Alice L."})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["full_name"], "Alice L.");
        assert_eq!(body["user"]["username"], "alice");
    }

    #[tokio::test]
    async fn users_listing_and_admin_stats_gate() {
        let state = AppState::fake();
        state
            .auth
            .provision_admin(RegisterRequest {
                email: "root@x.com".into(),
                username: "root".into(),
                password: "pw123456".into(),
                full_name: String::new(),
            })
            .await
            .unwrap();
        let app = build_app(state);

        let user_token = register_and_login(&app, "a@x.com", "alice").await;
        register_and_login(&app, "b@x.com", "bob").await;

        let (status, body) = call(&app, Method::GET, "/api/users", Some(&user_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);

        let (status, _) =
            call(&app, Method::GET, "/api/admin/stats", Some(&user_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, login) = call(
            &app,
            Method::POST,
            "/api/login",
            None,
            Some(json!({"email": "root@x.com", "password": "pw123456"})),
        )
        .await;
        let admin_token = login["token"].as_str().unwrap().to_string();
        let (status, body) =
            call(&app, Method::GET, "/api/admin/stats", Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"total_users": 3, "users_by_role": {"user": 2, "admin": 1}})
        );
    }
}
