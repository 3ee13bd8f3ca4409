use std::sync::Arc;

use axum::{Router, routing::post, extract::{FromRef, Path, State}, Json, middleware, http::StatusCode};

use crate::{
    middleware::auth_middleware::{auth_middleware, AdminContext, AuthState},
    services::settlement_service::{
        error::Result,
        models::{SettlementReport, SettlementRequest},
        SettlementService,
    },
};

#[derive(Clone, FromRef)]
pub struct SettlementRoutesState {
    settlement_service: Arc<dyn SettlementService>,
}

pub fn routes(settlement_service: Arc<dyn SettlementService>, auth: AuthState) -> Router {
    Router::new()
        // Routes
        .route("/", post(settle))
        .route("/reset/:instance_id", post(reset_instance))
        // Auth middleware
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
        // State
        .with_state(SettlementRoutesState { settlement_service })
}

async fn settle(
    State(settlement_service): State<Arc<dyn SettlementService>>,
    _admin: AdminContext,
    request: Option<Json<SettlementRequest>>,
) -> Result<Json<SettlementReport>> {
    let date = request.and_then(|Json(r)| r.date);
    Ok(Json(settlement_service.run(date).await?))
}

async fn reset_instance(
    State(settlement_service): State<Arc<dyn SettlementService>>,
    _admin: AdminContext,
    Path(instance_id): Path<i64>,
) -> Result<StatusCode> {
    settlement_service.reset_instance(instance_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
