use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::session::CurrentUser,
    error::AppResult,
    extract::AppJson,
    records::{
        dto::{ExpenseInput, Favorites, HomeSummary, NameInput, Page, Pagination},
        repo_types::{Expense, Food, Owned, Payload, Place, Show},
        services,
    },
    state::AppState,
};

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/home", get(home))
        .route("/favorites", get(favorites))
        .route("/export.csv", get(export_csv))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list_records::<Expense>).post(create_expense))
        .route(
            "/expenses/{id}",
            axum::routing::put(update_expense).delete(delete_record::<Expense>),
        )
        .merge(named_routes::<Place>("places"))
        .merge(named_routes::<Food>("foods"))
        .merge(named_routes::<Show>("shows"))
}

/// List/create and update/delete routes for a kind whose payload is a name.
fn named_routes<P>(collection: &str) -> Router<AppState>
where
    P: Payload + From<String>,
{
    Router::new()
        .route(
            &format!("/{collection}"),
            get(list_records::<P>).post(create_named::<P>),
        )
        .route(
            &format!("/{collection}/{{id}}"),
            axum::routing::put(update_named::<P>).delete(delete_record::<P>),
        )
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn home(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(p): Query<Pagination>,
) -> AppResult<Json<HomeSummary>> {
    let summary = services::home_summary(
        &state.db,
        user_id,
        state.config.monthly_budget,
        services::today(),
        p,
    )
    .await?;
    Ok(Json(summary))
}

#[instrument(skip(state))]
pub async fn favorites(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<Favorites>> {
    Ok(Json(services::favorites(&state.db, user_id).await?))
}

#[instrument(skip(state))]
pub async fn export_csv(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<impl IntoResponse> {
    let body = services::export_csv(&state.db, user_id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"journal.csv\""),
        ],
        body,
    ))
}

#[instrument(skip(state))]
pub async fn list_records<P: Payload>(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(p): Query<Pagination>,
) -> AppResult<Json<Page<Owned<P>>>> {
    Ok(Json(services::list_owned::<P>(&state.db, user_id, p).await?))
}

#[instrument(skip(state, body))]
pub async fn create_expense(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    AppJson(body): AppJson<ExpenseInput>,
) -> AppResult<(StatusCode, Json<Owned<Expense>>)> {
    let payload = body.into_payload(services::today())?;
    let record = services::create_owned(&state.db, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[instrument(skip(state, body))]
pub async fn update_expense(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
    AppJson(body): AppJson<ExpenseInput>,
) -> AppResult<Json<Owned<Expense>>> {
    Ok(Json(services::update_expense(&state.db, id, user_id, body).await?))
}

#[instrument(skip(state, body))]
pub async fn create_named<P: Payload + From<String>>(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    AppJson(body): AppJson<NameInput>,
) -> AppResult<(StatusCode, Json<Owned<P>>)> {
    let payload = body.into_payload::<P>()?;
    let record = services::create_owned(&state.db, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[instrument(skip(state, body))]
pub async fn update_named<P: Payload + From<String>>(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
    AppJson(body): AppJson<NameInput>,
) -> AppResult<Json<Owned<P>>> {
    let payload = body.into_payload::<P>()?;
    Ok(Json(services::update_owned(&state.db, id, user_id, payload).await?))
}

#[instrument(skip(state))]
pub async fn delete_record<P: Payload>(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    services::delete_owned::<P>(&state.db, id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
