use std::sync::Arc;

use axum::{Router, routing::get, extract::{FromRef, Query, State}, Json, middleware};
use chrono::FixedOffset;
use serde::Deserialize;

use crate::{
    calendar::today_in,
    middleware::auth_middleware::{auth_middleware, AuthContext, AuthState},
    services::boss_service::{error::Result, models::BossStatus, parse_month, BossService},
};

#[derive(Clone, FromRef)]
pub struct BossRoutesState {
    boss_service: Arc<dyn BossService>,
    game_tz: FixedOffset,
}

#[derive(Deserialize)]
pub struct BossQuery {
    ///
    /// `YYYY-MM`, defaults to the current month
    ///
    month: Option<String>,
}

pub fn routes(boss_service: Arc<dyn BossService>, game_tz: FixedOffset, auth: AuthState) -> Router {
    Router::new()
        // Routes
        .route("/", get(boss_status))
        // Auth middleware
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
        // State
        .with_state(BossRoutesState { boss_service, game_tz })
}

async fn boss_status(
    State(state): State<BossRoutesState>,
    _ctx: AuthContext,
    Query(query): Query<BossQuery>,
) -> Result<Json<BossStatus>> {
    let date = match query.month {
        Some(month) => parse_month(&month)?,
        None => today_in(state.game_tz),
    };
    Ok(Json(state.boss_service.status(date).await?))
}
