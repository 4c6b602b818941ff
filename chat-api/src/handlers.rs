use axum::{
    async_trait,
    extract::{rejection::JsonRejection, Extension, Form, FromRequest, Query, Request},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use chat_core::{ChatContext, StoreError, User};
use chat_messaging::MessagingService;
use serde::Deserialize;
use tracing;

pub type ApiError = (StatusCode, String);
pub type ApiResult<T = Json<serde_json::Value>> = Result<T, ApiError>;

fn store_error(e: StoreError) -> ApiError {
    if e.is_validation() {
        tracing::debug!("Rejected request: {}", e);
        (StatusCode::BAD_REQUEST, e.to_string())
    } else {
        tracing::error!("Storage error: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

fn invalid_json(rejection: JsonRejection) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        format!("Invalid JSON: {}", rejection.body_text()),
    )
}

/// Dashboard link for `user_id`, with the id percent-encoded.
fn dashboard_location(user_id: &str) -> String {
    format!("/dashboard?userId={}", urlencoding::encode(user_id))
}

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "chat-api"
    }))
}

/// Login/registration payload, sent either as JSON by the dashboard scripts or
/// as a plain HTML form post.
pub struct Credentials {
    pub user: User,
    pub is_ajax: bool,
}

#[derive(Deserialize)]
struct CredentialsForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    email: String,
}

#[async_trait]
impl<S> FromRequest<S> for Credentials
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_ajax = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));

        if is_ajax {
            let Json(user) = Json::<User>::from_request(req, state)
                .await
                .map_err(invalid_json)?;
            return Ok(Credentials { user, is_ajax });
        }

        let Form(form) = Form::<CredentialsForm>::from_request(req, state)
            .await
            .map_err(|e| {
                (
                    StatusCode::BAD_REQUEST,
                    format!("Error parsing form data: {}", e.body_text()),
                )
            })?;

        tracing::debug!("Form data parsed - Username: {}, Email: {}", form.username, form.email);

        Ok(Credentials {
            user: User {
                user_id: form.username,
                password: form.password,
                email: form.email,
            },
            is_ajax,
        })
    }
}

pub async fn register(
    Extension(ctx): Extension<ChatContext>,
    credentials: Credentials,
) -> ApiResult<Response> {
    let Credentials { user, is_ajax } = credentials;
    let user_id = user.user_id.clone();

    let added = ctx.users.register(user).await.map_err(store_error)?;

    if is_ajax {
        return Ok(Json(serde_json::json!({ "success": added })).into_response());
    }

    if added {
        Ok(found(dashboard_location(&user_id)))
    } else {
        Ok(found("/?error=user_exists".to_string()))
    }
}

pub async fn login(
    Extension(ctx): Extension<ChatContext>,
    credentials: Credentials,
) -> ApiResult<Response> {
    let Credentials { user, is_ajax } = credentials;

    let authenticated = ctx
        .users
        .authenticate(&user.user_id, &user.password)
        .await
        .map_err(store_error)?;

    let response = match (authenticated, is_ajax) {
        (Some(user), true) => Json(serde_json::json!({
            "success": true,
            "redirectTo": dashboard_location(&user.user_id),
            "userId": user.user_id,
            "email": user.email,
        }))
        .into_response(),
        (Some(user), false) => found(dashboard_location(&user.user_id)),
        (None, true) => Json(serde_json::json!({ "success": false })).into_response(),
        (None, false) => found("/?error=invalid_credentials".to_string()),
    };

    Ok(response)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub search_term: String,
}

pub async fn search_users(
    Extension(ctx): Extension<ChatContext>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = payload.map_err(invalid_json)?;

    let users = ctx.users.search(&req.search_term).await.map_err(store_error)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "users": users,
    })))
}

#[derive(Deserialize)]
pub struct SenderQuery {
    #[serde(default)]
    pub sender: String,
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub receiver: String,
    #[serde(default)]
    pub content: String,
}

pub async fn send_message(
    Extension(service): Extension<MessagingService>,
    Query(params): Query<SenderQuery>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> ApiResult {
    if params.sender.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Sender is required".to_string()));
    }
    let Json(req) = payload.map_err(invalid_json)?;

    service
        .send_message(&params.sender, &req.receiver, &req.content)
        .await
        .map_err(store_error)?;

    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Deserialize)]
pub struct ConversationQuery {
    #[serde(default)]
    pub user1: String,
    #[serde(default)]
    pub user2: String,
}

pub async fn get_messages(
    Extension(service): Extension<MessagingService>,
    Query(params): Query<ConversationQuery>,
) -> ApiResult {
    if params.user1.is_empty() || params.user2.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Both user IDs are required".to_string()));
    }

    let messages = service
        .conversation(&params.user1, &params.user2)
        .await
        .map_err(store_error)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "messages": messages,
    })))
}

#[derive(Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    pub user: String,
}

pub async fn get_all_messages(
    Extension(service): Extension<MessagingService>,
    Query(params): Query<UserQuery>,
) -> ApiResult {
    let all = service.all_messages(&params.user).await.map_err(store_error)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "messages": all.messages,
        "recentChats": all.recent_chats,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentChatsQuery {
    #[serde(default)]
    pub user_id: String,
}

pub async fn get_recent_chats(
    Extension(service): Extension<MessagingService>,
    Query(params): Query<RecentChatsQuery>,
) -> ApiResult {
    let chats = service
        .recent_chats(&params.user_id)
        .await
        .map_err(store_error)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "recentChats": chats,
    })))
}

#[derive(Deserialize)]
pub struct MarkReadQuery {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub contact: String,
}

pub async fn mark_messages_read(
    Extension(service): Extension<MessagingService>,
    Query(params): Query<MarkReadQuery>,
) -> ApiResult {
    if params.user.is_empty() || params.contact.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Missing user or contact ID".to_string()));
    }

    let marked = service
        .mark_read(&params.user, &params.contact)
        .await
        .map_err(store_error)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "marked": marked,
    })))
}

pub async fn goto_dashboard() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Redirecting...</title>
    <meta http-equiv="refresh" content="0;url=/dashboard">
</head>
<body>
    <p>Redirecting to dashboard...</p>
    <script>
        window.location.replace("/dashboard");
    </script>
</body>
</html>"#,
    )
}
