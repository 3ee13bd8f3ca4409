use std::sync::Arc;

use axum::{Router, routing::{get, post}, extract::{FromRef, Query, State}, Json, middleware};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    middleware::auth_middleware::{auth_middleware, AuthContext, AuthState},
    services::submission_service::{
        error::Result,
        models::{QuestAvailabilityModel, SubmissionRequest, SubmissionResponse},
        SubmissionService,
    },
};

#[derive(Clone, FromRef)]
pub struct SubmissionRoutesState {
    submission_service: Arc<dyn SubmissionService>,
}

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    date: Option<NaiveDate>,
}

pub fn routes(submission_service: Arc<dyn SubmissionService>, auth: AuthState) -> Router {
    Router::new()
        // Routes
        .route("/submissions", post(submit))
        .route("/quests/availability", get(availability))
        // Auth middleware
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
        // State
        .with_state(SubmissionRoutesState { submission_service })
}

async fn submit(
    State(submission_service): State<Arc<dyn SubmissionService>>,
    ctx: AuthContext,
    Json(request): Json<SubmissionRequest>,
) -> Result<Json<SubmissionResponse>> {
    Ok(Json(submission_service.submit(ctx.user_id, request).await?))
}

async fn availability(
    State(submission_service): State<Arc<dyn SubmissionService>>,
    ctx: AuthContext,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<QuestAvailabilityModel>>> {
    Ok(Json(submission_service.availability(ctx.user_id, query.date).await?))
}
