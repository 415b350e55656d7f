//! Contest handler implementations

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use tracing::debug;

use crate::{
    error::{AppError, AppResult},
    middleware::auth::AdminUser,
    models::{Contest, ContestPage},
    services::ContestService,
    state::AppState,
    utils::FieldViolation,
};

use super::request::{CreateContestRequest, ListContestsQuery};

/// List contests (filtered, paginated, cached)
pub async fn list_contests(
    State(state): State<AppState>,
    query: Result<Query<ListContestsQuery>, QueryRejection>,
) -> AppResult<Json<ContestPage>> {
    let Query(query) = query.map_err(|rejection| {
        AppError::InvalidQuery(vec![FieldViolation::whole(
            "invalid_type",
            rejection.body_text(),
        )])
    })?;

    let filter = query.into_filter().map_err(AppError::InvalidQuery)?;
    let page = ContestService::list_contests(&state, filter).await?;

    Ok(Json(page))
}

/// Create a new contest (admin only)
pub async fn create_contest(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    body: Bytes,
) -> AppResult<(StatusCode, Json<Contest>)> {
    let contest = CreateContestRequest::from_body(&body)
        .and_then(CreateContestRequest::into_new_contest)
        .map_err(AppError::Validation)?;

    debug!(admin = %admin.subject, sport = %contest.sport, "Creating contest");

    let created = ContestService::create_contest(&state, contest).await?;

    Ok((StatusCode::CREATED, Json(created)))
}
