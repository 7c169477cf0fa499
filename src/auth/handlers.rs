use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use tower_sessions::Session;
use tracing::{info, instrument};

use crate::{
    auth::{
        avatar::{self, MAX_AVATAR_BYTES},
        dto::{
            ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, PublicUser,
            RegisterRequest, ResetPasswordRequest,
        },
        repo_types::User,
        reset_token::ResetTokenKeys,
        services,
        session::{self, CurrentUser},
    },
    error::{AppError, AppResult},
    extract::AppJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).delete(delete_me))
        .route("/me/password", post(change_password))
        .route(
            "/me/avatar",
            put(upload_avatar)
                .get(get_avatar)
                .layer(DefaultBodyLimit::max(MAX_AVATAR_BYTES + 64 * 1024)),
        )
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<PublicUser>)> {
    let user = services::register(&state.db, payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, session, payload))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<PublicUser>> {
    let user = services::authenticate(&state.db, &payload.username, &payload.password).await?;
    session::login(&session, &user).await?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(user.into()))
}

#[instrument(skip(session))]
pub async fn logout(session: Session) -> AppResult<StatusCode> {
    session::logout(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, keys, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    State(keys): State<ResetTokenKeys>,
    AppJson(payload): AppJson<ForgotPasswordRequest>,
) -> AppResult<StatusCode> {
    services::forgot_password(&state, &keys, &payload.email).await?;
    Ok(StatusCode::ACCEPTED)
}

#[instrument(skip(state, keys, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    State(keys): State<ResetTokenKeys>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> AppResult<StatusCode> {
    services::reset_password(&state.db, &keys, &payload.token, &payload.new_password).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    services::change_password(
        &state.db,
        user_id,
        &payload.current_password,
        &payload.new_password,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, session))]
pub async fn delete_me(
    State(state): State<AppState>,
    session: Session,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<StatusCode> {
    services::delete_account(&state, user_id).await?;
    session::logout(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /me/avatar (multipart, field `avatar`)
#[instrument(skip(state, mp))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    mut mp: Multipart,
) -> AppResult<StatusCode> {
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(e.body_text()))?
    {
        if field.name() != Some("avatar") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?;
        avatar::upload_avatar(&state, user_id, &content_type, data).await?;
        return Ok(StatusCode::NO_CONTENT);
    }
    Err(AppError::bad_request("avatar field is required"))
}

#[instrument(skip(state))]
pub async fn get_avatar(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<impl IntoResponse> {
    let avatar = avatar::load_avatar(&state, user_id).await?;
    Ok(([(header::CONTENT_TYPE, avatar.content_type)], avatar.body))
}
