use std::sync::Arc;

use axum::{Router, routing::get, extract::{FromRef, Path, State}, Json, middleware};

use crate::{
    middleware::auth_middleware::{auth_middleware, AuthContext, AuthState},
    services::{
        settlement_service::{error::SettlementServiceError, models::NarrativeRecord, SettlementService},
        tournament_service::{error::TournamentServiceError, models::WeeklyResult, TournamentService},
    },
};

#[derive(Clone, FromRef)]
pub struct CombatRoutesState {
    settlement_service: Arc<dyn SettlementService>,
    tournament_service: Arc<dyn TournamentService>,
}

pub fn routes(
    settlement_service: Arc<dyn SettlementService>,
    tournament_service: Arc<dyn TournamentService>,
    auth: AuthState,
) -> Router {
    Router::new()
        // Routes
        .route("/:instance_id/narratives", get(narratives))
        .route("/:instance_id/tournaments", get(tournaments))
        // Auth middleware
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
        // State
        .with_state(CombatRoutesState { settlement_service, tournament_service })
}

async fn narratives(
    State(settlement_service): State<Arc<dyn SettlementService>>,
    Path(instance_id): Path<i64>,
    ctx: AuthContext,
) -> Result<Json<Vec<NarrativeRecord>>, SettlementServiceError> {
    Ok(Json(settlement_service.narratives(ctx.user_id, instance_id).await?))
}

async fn tournaments(
    State(tournament_service): State<Arc<dyn TournamentService>>,
    Path(instance_id): Path<i64>,
    ctx: AuthContext,
) -> Result<Json<Vec<WeeklyResult>>, TournamentServiceError> {
    Ok(Json(tournament_service.results(ctx.user_id, instance_id).await?))
}
